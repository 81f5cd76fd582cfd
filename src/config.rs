//! Run Configuration Module
//!
//! Everything that defines one training run: what to train, with which
//! optimizer, for how long, where data and artifacts live, and on which
//! device. Serializable so a run can be described in a JSON file and
//! overridden from the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::ComputeDevice;
use crate::dataset::{AugmentationConfig, DataConfig, DatasetName};
use crate::model::Architecture;
use crate::optim::OptimizerKind;
use crate::training::checkpoint::RunKey;
use crate::training::scheduler::MilestoneSchedule;
use crate::utils::error::{Result, TrainerError};

/// Training run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub dataset: DatasetName,
    pub architecture: Architecture,
    pub optimizer: OptimizerKind,

    /// Initial learning rate
    pub learning_rate: f64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of epochs, numbered from 1
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default)]
    pub schedule: MilestoneSchedule,

    #[serde(default)]
    pub augmentation: AugmentationConfig,

    /// Directory holding the extracted CIFAR archives
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Parent of the checkpoint and curve directories
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Seed for shuffling and augmentation
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Fetch the dataset when it is missing
    #[serde(default = "default_download")]
    pub download: bool,

    #[serde(default)]
    pub device: ComputeDevice,
}

fn default_batch_size() -> usize {
    128
}

fn default_epochs() -> usize {
    200
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_seed() -> u64 {
    42
}

fn default_download() -> bool {
    true
}

impl RunConfig {
    /// A run with the default batch size, epochs and schedule
    pub fn new(
        dataset: DatasetName,
        architecture: Architecture,
        optimizer: OptimizerKind,
        learning_rate: f64,
    ) -> Self {
        Self {
            dataset,
            architecture,
            optimizer,
            learning_rate,
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            schedule: MilestoneSchedule::default(),
            augmentation: AugmentationConfig::default(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            seed: default_seed(),
            download: default_download(),
            device: ComputeDevice::default(),
        }
    }

    pub fn key(&self) -> RunKey {
        RunKey::new(self.dataset, self.architecture, self.optimizer)
    }

    pub fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }

    /// Data provider settings derived from this run
    pub fn data_config(&self) -> DataConfig {
        DataConfig {
            dataset: self.dataset,
            data_dir: self.data_dir.clone(),
            batch_size: self.batch_size,
            seed: self.seed,
            download: self.download,
            augmentation: self.augmentation.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TrainerError::Config(format!(
                "learning_rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }

        if self.epochs == 0 {
            return Err(TrainerError::Config("epochs must be > 0".into()));
        }

        self.schedule.validate()?;
        self.data_config().validate()?;

        if self.schedule.milestone > self.epochs {
            tracing::warn!(
                "milestone epoch {} is after the last epoch {}, the learning rate will not decay",
                self.schedule.milestone,
                self.epochs
            );
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrainerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig::new(
            DatasetName::Cifar100,
            Architecture::Vgg,
            OptimizerKind::Sgd,
            0.1,
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.epochs, 200);
        assert_eq!(config.schedule.milestone, 150);
        assert_eq!(config.schedule.gamma, 0.1);
        assert!(!config.schedule.reset);
        assert_eq!(config.num_classes(), 100);
        assert_eq!(config.key().to_string(), "CIFAR-100_VGG_SGD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut bad_lr = config();
        bad_lr.learning_rate = 0.0;
        assert!(matches!(bad_lr.validate(), Err(TrainerError::Config(_))));

        let mut bad_batch = config();
        bad_batch.batch_size = 0;
        assert!(bad_batch.validate().is_err());

        let mut bad_epochs = config();
        bad_epochs.epochs = 0;
        assert!(bad_epochs.validate().is_err());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "dataset": "CIFAR-10",
            "architecture": "ResNet",
            "optimizer": "AdaBelief",
            "learning_rate": 0.001
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dataset, DatasetName::Cifar10);
        assert_eq!(config.architecture, Architecture::ResNet);
        assert_eq!(config.optimizer, OptimizerKind::AdaBelief);
        assert_eq!(config.epochs, 200);
        assert_eq!(config.device, ComputeDevice::Auto);
    }

    #[test]
    fn test_unknown_optimizer_in_json_fails() {
        let json = r#"{
            "dataset": "CIFAR-10",
            "architecture": "VGG",
            "optimizer": "RMSprop",
            "learning_rate": 0.001
        }"#;
        assert!(serde_json::from_str::<RunConfig>(json).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let config = config();
        config.save(&path).unwrap();
        assert_eq!(RunConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_schedule_in_json() {
        let json = r#"{
            "dataset": "CIFAR-10",
            "architecture": "VGG",
            "optimizer": "SGD",
            "learning_rate": 0.1,
            "schedule": {"reset": true}
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.schedule.reset);
        assert_eq!(config.schedule.milestone, 150);
        assert_eq!(config.schedule.gamma, 0.1);
    }
}
