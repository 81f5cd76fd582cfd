//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model, optimizer and
//! training layers. Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for training runs
#[derive(Error, Debug)]
pub enum TrainerError {
    /// Unsupported or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed dataset contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Dataset files missing and downloading disabled
    #[error("Dataset not found at '{0}' (enable downloading or fetch it with the `download` command)")]
    DatasetNotFound(PathBuf),

    /// Failure while fetching or unpacking a dataset archive
    #[error("Download error: {0}")]
    Download(String),

    /// Fault during a train or eval pass
    #[error("Training error: {0}")]
    Training(String),

    /// Failure while writing or reading a checkpoint
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for training operations
pub type Result<T> = std::result::Result<T, TrainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainerError::Config("unknown optimizer 'RMSprop'".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: unknown optimizer 'RMSprop'"
        );
    }

    #[test]
    fn test_dataset_not_found_mentions_path() {
        let err = TrainerError::DatasetNotFound(PathBuf::from("data/cifar-10-batches-bin"));
        assert!(format!("{}", err).contains("cifar-10-batches-bin"));
    }
}
