//! Learning-rate decay with and without an optimizer state reset.

mod common;

use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};

use cifar_trainer::optim::{OptimizerSpec, TrainingOptimizer};
use cifar_trainer::{adjust_learning_rate, train_epoch, OptimizerKind, ResettableOptimizer};

use common::{assert_close, device, max_abs_diff, vector_batch, ADBackend, LinearHead};

type Head = LinearHead<ADBackend>;
type Opt = TrainingOptimizer<Head, ADBackend>;

const LR: f64 = 0.05;
const GAMMA: f64 = 0.1;

fn step(model: Head, optimizer: &mut Opt) -> Head {
    let device = device();
    let loss_fn: CrossEntropyLoss<ADBackend> = CrossEntropyLossConfig::new().init(&device);
    let batch = vector_batch::<ADBackend>(
        &[
            vec![1.0, -2.0, 0.5, 0.0],
            vec![0.3, 0.7, -1.0, 2.0],
            vec![-1.5, 0.2, 0.0, 1.0],
        ],
        &[2, 0, 1],
        &device,
    );
    let (model, _) = train_epoch(model, 1, vec![batch], optimizer, &loss_fn).unwrap();
    model
}

/// Two steps at `LR`, then decay, returning the model and the decayed optimizer
fn warmed_up(kind: OptimizerKind, reset: bool) -> (Head, Opt) {
    let model = Head::random(4, 3, &device());
    let mut optimizer = Opt::new(OptimizerSpec::defaults(kind), LR);
    let model = step(model, &mut optimizer);
    let model = step(model, &mut optimizer);

    let lr = adjust_learning_rate::<Head, ADBackend, _>(&mut optimizer, GAMMA, reset);
    assert!((lr - LR * GAMMA).abs() < 1e-12);
    assert!((optimizer.learning_rate() - LR * GAMMA).abs() < 1e-12);

    (model, optimizer)
}

fn check_reset_matches_fresh(kind: OptimizerKind) {
    let (model, mut reset) = warmed_up(kind, true);
    let mut fresh = Opt::new(OptimizerSpec::defaults(kind), LR * GAMMA);

    let after_reset = step(model.clone(), &mut reset);
    let after_fresh = step(model, &mut fresh);

    assert_close(&after_reset.weights(), &after_fresh.weights(), 1e-6);
}

fn check_without_reset_keeps_state(kind: OptimizerKind) {
    let (model, mut kept) = warmed_up(kind, false);
    let mut fresh = Opt::new(OptimizerSpec::defaults(kind), LR * GAMMA);

    let after_kept = step(model.clone(), &mut kept);
    let after_fresh = step(model, &mut fresh);

    assert!(
        max_abs_diff(&after_kept.weights(), &after_fresh.weights()) > 1e-6,
        "{} without reset behaved like a fresh optimizer",
        kind
    );
}

#[test]
fn sgd_reset_behaves_like_fresh_optimizer() {
    check_reset_matches_fresh(OptimizerKind::Sgd);
}

#[test]
fn adam_reset_behaves_like_fresh_optimizer() {
    check_reset_matches_fresh(OptimizerKind::Adam);
}

#[test]
fn adabelief_reset_behaves_like_fresh_optimizer() {
    check_reset_matches_fresh(OptimizerKind::AdaBelief);
}

#[test]
fn decay_without_reset_keeps_momentum() {
    for kind in [OptimizerKind::Sgd, OptimizerKind::Adam, OptimizerKind::AdaBelief] {
        check_without_reset_keeps_state(kind);
    }
}
