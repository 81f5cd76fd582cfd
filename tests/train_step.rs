//! Single-epoch training and evaluation passes on a tiny linear model.

mod common;

use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};

use cifar_trainer::optim::{OptimizerSpec, TrainingOptimizer};
use cifar_trainer::{test_epoch, train_epoch, ClassificationBatch};

use common::{assert_close, device, max_abs_diff, vector_batch, ADBackend, InnerBackend, LinearHead};

type Head = LinearHead<ADBackend>;

fn plain_sgd(lr: f64) -> TrainingOptimizer<Head, ADBackend> {
    TrainingOptimizer::new(
        OptimizerSpec::Sgd {
            momentum: None,
            weight_decay: None,
        },
        lr,
    )
}

fn one_hot(index: usize) -> Vec<f32> {
    let mut row = vec![0.0; 4];
    row[index] = 1.0;
    row
}

#[test]
fn sgd_epoch_matches_closed_form() {
    let device = device();
    let model = Head::zeros(4, 2, &device);
    let mut optimizer = plain_sgd(0.1);
    let loss_fn: CrossEntropyLoss<ADBackend> = CrossEntropyLossConfig::new().init(&device);

    // Each batch touches disjoint weight rows, so both steps start from zero logits
    let batches = vec![
        vector_batch::<ADBackend>(&[one_hot(0), one_hot(1)], &[0, 1], &device),
        vector_batch::<ADBackend>(&[one_hot(2), one_hot(3)], &[1, 0], &device),
    ];

    let (model, metrics) = train_epoch(model, 1, batches, &mut optimizer, &loss_fn).unwrap();

    assert_eq!(metrics.total, 4);
    assert!((metrics.loss - 2.0 * std::f64::consts::LN_2).abs() < 1e-4);

    // Mean cross-entropy at zero logits has gradient (softmax - onehot) / batch
    #[rustfmt::skip]
    let expected = [
         0.025, -0.025,
        -0.025,  0.025,
        -0.025,  0.025,
         0.025, -0.025,
    ];
    assert_close(&model.weights(), &expected, 1e-6);
}

#[test]
fn training_step_updates_parameters() {
    let device = device();
    let model = Head::random(4, 2, &device);
    let before = model.weights();
    let mut optimizer = plain_sgd(0.5);
    let loss_fn: CrossEntropyLoss<ADBackend> = CrossEntropyLossConfig::new().init(&device);

    let batches = vec![vector_batch::<ADBackend>(
        &[vec![1.0, 2.0, -1.0, 0.5], vec![-0.5, 0.0, 3.0, 1.0]],
        &[1, 0],
        &device,
    )];
    let (model, metrics) = train_epoch(model, 1, batches, &mut optimizer, &loss_fn).unwrap();

    assert_eq!(metrics.total, 2);
    assert!(metrics.loss.is_finite());
    assert!(max_abs_diff(&before, &model.weights()) > 1e-4);
}

#[test]
fn evaluation_pass_leaves_parameters_untouched() {
    let device = device();
    let model = Head::random(4, 2, &device);
    let before = model.weights();
    let loss_fn: CrossEntropyLoss<InnerBackend> = CrossEntropyLossConfig::new().init(&device);

    let batches = vec![
        vector_batch::<InnerBackend>(&[one_hot(0), one_hot(1)], &[0, 1], &device),
        vector_batch::<InnerBackend>(&[one_hot(2)], &[1], &device),
    ];
    let metrics = test_epoch::<ADBackend, _, _>(&model, batches, &loss_fn).unwrap();

    assert_eq!(metrics.total, 3);
    assert!(metrics.correct <= 3);
    assert!((0.0..=100.0).contains(&metrics.accuracy));
    assert_eq!(before, model.weights());
}

#[test]
fn empty_training_pass_is_an_error() {
    let device = device();
    let model = Head::zeros(4, 2, &device);
    let mut optimizer = plain_sgd(0.1);
    let loss_fn: CrossEntropyLoss<ADBackend> = CrossEntropyLossConfig::new().init(&device);

    let batches: Vec<ClassificationBatch<ADBackend>> = Vec::new();
    assert!(train_epoch(model, 1, batches, &mut optimizer, &loss_fn).is_err());
}

#[test]
fn empty_evaluation_pass_is_an_error() {
    let device = device();
    let model = Head::zeros(4, 2, &device);
    let loss_fn: CrossEntropyLoss<InnerBackend> = CrossEntropyLossConfig::new().init(&device);

    let batches: Vec<ClassificationBatch<InnerBackend>> = Vec::new();
    assert!(test_epoch::<ADBackend, _, _>(&model, batches, &loss_fn).is_err());
}
