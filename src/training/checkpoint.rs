//! Best-model checkpoints and run artifacts
//!
//! Layout below the output directory, for a run key
//! `{dataset}_{architecture}_{optimizer}`:
//!
//! ```text
//! Best_trained_models/{key}.mpk      model record
//! Best_trained_models/{key}.json     accuracy, epoch and run identity
//! Plot_curves/{key}.json             train/test accuracy and loss per epoch
//! Plot_curves/{key}_accuracy.svg
//! Plot_curves/{key}_loss.svg
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::DatasetName;
use crate::model::Architecture;
use crate::optim::OptimizerKind;
use crate::utils::error::{Result, TrainerError};
use crate::utils::metrics::MetricHistory;

/// Full precision, so a reloaded checkpoint is the exact model that scored `acc`
type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

pub const CHECKPOINT_DIR: &str = "Best_trained_models";
pub const CURVES_DIR: &str = "Plot_curves";

/// Identity of a run, used to name every artifact it writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunKey {
    pub dataset: DatasetName,
    pub architecture: Architecture,
    pub optimizer: OptimizerKind,
}

impl RunKey {
    pub fn new(dataset: DatasetName, architecture: Architecture, optimizer: OptimizerKind) -> Self {
        Self {
            dataset,
            architecture,
            optimizer,
        }
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.dataset, self.architecture, self.optimizer)
    }
}

/// Metadata stored next to the model record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Test accuracy in percent
    pub acc: f64,
    /// 1-based epoch that produced the model
    pub epoch: usize,
    pub dataset: DatasetName,
    pub architecture: Architecture,
    pub optimizer: OptimizerKind,
    pub created_at: String,
}

/// Strictly-increasing best test accuracy, starting at 0
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: f64,
    epoch: Option<usize>,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an epoch's accuracy; true when it beats every earlier one
    pub fn observe(&mut self, accuracy: f64, epoch: usize) -> bool {
        if accuracy > self.best {
            self.best = accuracy;
            self.epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// None until some epoch scored above 0
    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }
}

/// Where a run's artifacts live
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    checkpoint_dir: PathBuf,
    curves_dir: PathBuf,
    key: RunKey,
}

impl ArtifactStore {
    pub fn new(output_dir: &Path, key: RunKey) -> Self {
        Self {
            checkpoint_dir: output_dir.join(CHECKPOINT_DIR),
            curves_dir: output_dir.join(CURVES_DIR),
            key,
        }
    }

    pub fn key(&self) -> RunKey {
        self.key
    }

    /// Model record path; the recorder appends `.mpk`
    pub fn model_stem(&self) -> PathBuf {
        self.checkpoint_dir.join(self.key.to_string())
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_stem().with_extension("mpk")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.model_stem().with_extension("json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.curves_dir.join(format!("{}.json", self.key))
    }

    pub fn curves_dir(&self) -> &Path {
        &self.curves_dir
    }

    /// Overwrite the best checkpoint of this run key
    pub fn save_checkpoint<B: Backend, M: Module<B>>(
        &self,
        model: &M,
        accuracy: f64,
        epoch: usize,
    ) -> Result<()> {
        fs::create_dir_all(&self.checkpoint_dir)?;

        model
            .clone()
            .save_file(self.model_stem(), &CheckpointRecorder::new())
            .map_err(|e| TrainerError::Checkpoint(format!("failed to save model: {:?}", e)))?;

        let meta = CheckpointMeta {
            acc: accuracy,
            epoch,
            dataset: self.key.dataset,
            architecture: self.key.architecture,
            optimizer: self.key.optimizer,
            created_at: chrono::Local::now().to_rfc3339(),
        };
        fs::write(self.meta_path(), serde_json::to_string_pretty(&meta)?)?;

        info!(
            "Saved checkpoint {} ({:.2}% at epoch {})",
            self.model_path().display(),
            accuracy,
            epoch
        );
        Ok(())
    }

    pub fn load_meta(&self) -> Result<CheckpointMeta> {
        let path = self.meta_path();
        let json = fs::read_to_string(&path).map_err(|e| {
            TrainerError::Checkpoint(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the stored record into a freshly built model of the same shape
    pub fn load_checkpoint<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        if !self.model_path().exists() {
            return Err(TrainerError::Checkpoint(format!(
                "no checkpoint at {}",
                self.model_path().display()
            )));
        }

        model
            .load_file(self.model_stem(), &CheckpointRecorder::new(), device)
            .map_err(|e| TrainerError::Checkpoint(format!("failed to load model: {:?}", e)))
    }

    /// Write the history JSON and both curve charts
    pub fn save_history(&self, history: &MetricHistory) -> Result<()> {
        fs::create_dir_all(&self.curves_dir)?;
        history.save(&self.history_path())?;
        history.plot(&self.curves_dir, &self.key.to_string())?;
        info!("Saved training curves to {}", self.history_path().display());
        Ok(())
    }
}
