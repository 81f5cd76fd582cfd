//! Training module
//!
//! This module contains:
//! - The training and evaluation passes over a split
//! - Learning-rate decay and optimizer reset
//! - Best-model checkpoints and persisted curves
//! - The orchestrator that runs a whole job

pub mod checkpoint;
pub mod epoch;
pub mod orchestrator;
pub mod scheduler;

pub use checkpoint::{ArtifactStore, BestTracker, CheckpointMeta, RunKey};
pub use epoch::{count_correct, evaluate, test_epoch, train_epoch};
pub use orchestrator::{evaluate_checkpoint, run, Orchestrator, RunSummary};
pub use scheduler::{adjust_learning_rate, MilestoneSchedule};
