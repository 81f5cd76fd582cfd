//! Training orchestration
//!
//! Runs the epoch loop: learning-rate decay at the milestone, one training
//! pass, one evaluation pass, a checkpoint whenever the test accuracy
//! improves, and the metric history once the run is over.

use burn::{
    module::{AutodiffModule, Module},
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::checkpoint::{ArtifactStore, BestTracker, CheckpointMeta, RunKey};
use super::epoch::{evaluate, test_epoch, train_epoch};
use super::scheduler::{adjust_learning_rate, MilestoneSchedule};
use crate::config::RunConfig;
use crate::dataset::burn_dataset::get_test_data;
use crate::dataset::{get_data, SplitLoader};
use crate::model::{build_model, CifarClassifier, ImageClassifier};
use crate::optim::{initialize_optimizer, ResettableOptimizer};
use crate::utils::error::Result;
use crate::utils::format_number;
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::{EpochMetrics, MetricHistory};

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub key: RunKey,
    pub epochs: usize,
    /// Best test accuracy in percent, 0 when no epoch scored above 0
    pub best_accuracy: f64,
    pub best_epoch: Option<usize>,
    pub final_learning_rate: f64,
    pub history: MetricHistory,
}

/// Owns the epoch loop of one run
#[derive(Debug, Clone)]
pub struct Orchestrator {
    epochs: usize,
    schedule: MilestoneSchedule,
    store: ArtifactStore,
}

impl Orchestrator {
    pub fn new(epochs: usize, schedule: MilestoneSchedule, store: ArtifactStore) -> Self {
        Self {
            epochs,
            schedule,
            store,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.epochs,
            config.schedule,
            ArtifactStore::new(&config.output_dir, config.key()),
        )
    }

    /// Train `model` for every epoch and return it with the run summary
    pub fn fit<B, M, O>(
        &self,
        mut model: M,
        optimizer: &mut O,
        train: &mut SplitLoader,
        test: &mut SplitLoader,
        device: &B::Device,
    ) -> Result<(M, RunSummary)>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + ImageClassifier<B>,
        M::InnerModule: ImageClassifier<B::InnerBackend>,
        O: ResettableOptimizer<M, B> + ?Sized,
    {
        let train_loss: CrossEntropyLoss<B> = CrossEntropyLossConfig::new().init(device);
        let test_loss: CrossEntropyLoss<B::InnerBackend> = CrossEntropyLossConfig::new().init(device);

        let mut history = MetricHistory::new();
        let mut best = BestTracker::new();
        let mut logger = TrainingLogger::new(self.epochs);

        info!(
            "Training {} for {} epochs ({} train / {} test images, batch size {})",
            self.store.key(),
            self.epochs,
            format_number(train.len()),
            format_number(test.len()),
            train.batch_size()
        );

        for epoch in 1..=self.epochs {
            if self.schedule.triggers(epoch) {
                let previous = optimizer.learning_rate();
                let current = adjust_learning_rate(optimizer, self.schedule.gamma, self.schedule.reset);
                warn!(
                    "Epoch {}: learning rate {} -> {}{}",
                    epoch,
                    previous,
                    current,
                    if self.schedule.reset {
                        " (optimizer state reset)"
                    } else {
                        ""
                    }
                );
            }

            logger.start_epoch(epoch);

            let (trained, train_metrics) =
                train_epoch(model, epoch, train.iter::<B>(device), optimizer, &train_loss)?;
            model = trained;

            let test_metrics = test_epoch::<B, M, _>(
                &model,
                test.iter::<B::InnerBackend>(device),
                &test_loss,
            )?;

            if best.observe(test_metrics.accuracy, epoch) {
                logger.log_new_best(test_metrics.accuracy, epoch);
                self.store
                    .save_checkpoint::<B, M>(&model, test_metrics.accuracy, epoch)?;
            }

            history.push(&train_metrics, &test_metrics);
            logger.end_epoch(
                epoch,
                (train_metrics.accuracy, train_metrics.loss),
                (test_metrics.accuracy, test_metrics.loss),
                optimizer.learning_rate(),
            );
        }

        self.store.save_history(&history)?;
        logger.log_complete(best.best(), best.epoch());

        let summary = RunSummary {
            key: self.store.key(),
            epochs: self.epochs,
            best_accuracy: best.best(),
            best_epoch: best.epoch(),
            final_learning_rate: optimizer.learning_rate(),
            history,
        };

        Ok((model, summary))
    }
}

/// Run a full training job described by `config` on `device`
pub fn run<B: AutodiffBackend>(config: &RunConfig, device: &B::Device) -> Result<RunSummary> {
    config.validate()?;

    let (mut train, mut test) = get_data(&config.data_config())?;

    let model: CifarClassifier<B> = build_model(config.architecture, config.num_classes(), device);
    info!(
        "Model: {} with {} parameters",
        config.architecture,
        format_number(model.num_params())
    );

    let mut optimizer =
        initialize_optimizer::<B, CifarClassifier<B>>(config.optimizer, config.learning_rate);
    info!(
        "Optimizer: {} (learning rate {})",
        config.optimizer, config.learning_rate
    );

    let orchestrator = Orchestrator::from_config(config);
    let (_model, summary) =
        orchestrator.fit(model, &mut optimizer, &mut train, &mut test, device)?;

    Ok(summary)
}

/// Load the best checkpoint of `config`'s run key and evaluate it on the test split
pub fn evaluate_checkpoint<B: Backend>(
    config: &RunConfig,
    device: &B::Device,
) -> Result<(CheckpointMeta, EpochMetrics)> {
    let store = ArtifactStore::new(&config.output_dir, config.key());
    let meta = store.load_meta()?;

    let model: CifarClassifier<B> = build_model(config.architecture, config.num_classes(), device);
    let model = store.load_checkpoint::<B, _>(model, device)?;

    let mut test = get_test_data(&config.data_config())?;
    let loss: CrossEntropyLoss<B> = CrossEntropyLossConfig::new().init(device);
    let metrics = evaluate(&model, test.iter::<B>(device), &loss)?;

    info!(
        "Checkpoint {} (epoch {}, stored accuracy {:.2}%): test accuracy {:.2}%",
        store.model_path().display(),
        meta.epoch,
        meta.acc,
        metrics.accuracy
    );

    Ok((meta, metrics))
}
