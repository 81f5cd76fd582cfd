//! # CIFAR Trainer
//!
//! A training and evaluation driver for VGG and ResNet image classifiers on
//! CIFAR-10 and CIFAR-100, built on the Burn framework.
//!
//! ## Features
//!
//! - **Datasets**: CIFAR binary archives, downloaded on demand, with padded
//!   random-crop and flip augmentation
//! - **Networks**: VGG-11 with BatchNorm and a BasicBlock ResNet
//! - **Optimizers**: SGD with momentum, Adam, and AdaBelief, all resettable
//! - **Runs**: milestone learning-rate decay, best-model checkpoints and
//!   persisted accuracy/loss curves
//!
//! ## Modules
//!
//! - `dataset`: Data loading, augmentation, batching
//! - `model`: Network definitions and the model factory
//! - `optim`: Optimizer factory and the AdaBelief update rule
//! - `training`: Epoch passes, scheduling, checkpoints, orchestration
//! - `config`: Run configuration
//! - `backend`: Compute device selection
//! - `utils`: Logging, metrics, charts, and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cifar_trainer::backend::{CpuTrainingBackend, ComputeDevice, ResolvedDevice};
//! use cifar_trainer::{RunConfig, DatasetName, Architecture, OptimizerKind};
//!
//! let config = RunConfig::new(DatasetName::Cifar10, Architecture::ResNet, OptimizerKind::Sgd, 0.1);
//! if let ResolvedDevice::Cpu(device) = ComputeDevice::Cpu.resolve()? {
//!     let summary = cifar_trainer::training::run::<CpuTrainingBackend>(&config, &device)?;
//!     println!("best accuracy {:.2}%", summary.best_accuracy);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod model;
pub mod optim;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::RunConfig;
pub use dataset::{get_data, ClassificationBatch, DataConfig, DatasetName, SplitLoader};
pub use model::{build_model, Architecture, CifarClassifier, ImageClassifier};
pub use optim::{initialize_optimizer, OptimizerKind, ResettableOptimizer, TrainingOptimizer};
pub use training::{
    adjust_learning_rate, test_epoch, train_epoch, MilestoneSchedule, Orchestrator, RunSummary,
};
pub use utils::error::{Result, TrainerError};
pub use utils::metrics::{EpochMetrics, MetricHistory};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
