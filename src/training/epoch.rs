//! One pass over a split: the training step and the evaluation step

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLoss,
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tracing::debug;

use crate::dataset::ClassificationBatch;
use crate::model::ImageClassifier;
use crate::optim::ResettableOptimizer;
use crate::utils::error::{Result, TrainerError};
use crate::utils::logging::BatchProgress;
use crate::utils::metrics::{AccuracyTracker, EpochMetrics};

/// Number of rows whose arg-max equals the target
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = logits.argmax(1).squeeze::<1>(1);
    let correct: i64 = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

/// Train for one traversal of `batches`
///
/// For every batch: forward, mean cross-entropy, backward, one optimizer
/// step. Gradients are produced fresh by each backward pass, so nothing
/// accumulates across batches. The reported loss is the sum of the batch
/// losses.
pub fn train_epoch<B, M, O, I>(
    mut model: M,
    epoch: usize,
    batches: I,
    optimizer: &mut O,
    loss_fn: &CrossEntropyLoss<B>,
) -> Result<(M, EpochMetrics)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    O: ResettableOptimizer<M, B> + ?Sized,
    I: IntoIterator<Item = ClassificationBatch<B>>,
{
    let mut tracker = AccuracyTracker::new();
    let mut progress = BatchProgress::new("train");

    for batch in batches {
        let batch_size = batch.targets.dims()[0];

        let output = model.forward(batch.images);
        let loss = loss_fn.forward(output.clone(), batch.targets.clone());

        let loss_value: f64 = loss.clone().into_scalar().elem();
        if !loss_value.is_finite() {
            return Err(TrainerError::Training(format!(
                "non-finite loss {} in epoch {} after {} batches",
                loss_value,
                epoch,
                tracker.batches()
            )));
        }

        let correct = count_correct(output, batch.targets);

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optimizer.step(model, grads);

        tracker.add_batch(loss_value, correct, batch_size);
        progress.update(loss_value, tracker.accuracy());
    }

    let metrics = tracker.finish("train")?;
    debug!(
        "Epoch {} train: {}/{} correct over {} batches",
        epoch,
        metrics.correct,
        metrics.total,
        progress.batches()
    );

    Ok((model, metrics))
}

/// Evaluate a non-autodiff model over `batches`
pub fn evaluate<B, M, I>(model: &M, batches: I, loss_fn: &CrossEntropyLoss<B>) -> Result<EpochMetrics>
where
    B: Backend,
    M: ImageClassifier<B>,
    I: IntoIterator<Item = ClassificationBatch<B>>,
{
    let mut tracker = AccuracyTracker::new();
    let mut progress = BatchProgress::new("test");

    for batch in batches {
        let batch_size = batch.targets.dims()[0];

        let output = model.forward(batch.images);
        let loss = loss_fn.forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();

        let correct = count_correct(output, batch.targets);
        tracker.add_batch(loss_value, correct, batch_size);
        progress.update(loss_value, tracker.accuracy());
    }

    tracker.finish("test")
}

/// Evaluate the training model in inference mode
///
/// Runs on `model.valid()`: the inner backend tracks no gradients and
/// layers such as batch norm use their running statistics. The training
/// model itself is not modified.
pub fn test_epoch<B, M, I>(
    model: &M,
    batches: I,
    loss_fn: &CrossEntropyLoss<B::InnerBackend>,
) -> Result<EpochMetrics>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
    I: IntoIterator<Item = ClassificationBatch<B::InnerBackend>>,
{
    let inner = model.valid();
    evaluate(&inner, batches, loss_fn)
}
