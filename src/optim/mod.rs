//! Optimizer module
//!
//! Maps an optimizer name and a learning rate to a ready-to-use optimizer
//! with the hyperparameters the training driver uses:
//!
//! - SGD: momentum 0.9, dampening 0, weight decay 5e-4
//! - Adam: epsilon 1e-8, weight decay 5e-4
//! - AdaBelief: epsilon 1e-16, no weight decay
//!
//! Every optimizer is wrapped in a [`TrainingOptimizer`], which owns the
//! current learning rate and can discard its accumulated statistics
//! ([`ResettableOptimizer::reset`]) without touching the parameters.

pub mod adabelief;

use std::fmt;
use std::str::FromStr;

use burn::{
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, momentum::MomentumConfig, AdamConfig, GradientsParams,
        Optimizer, SgdConfig,
    },
    tensor::backend::AutodiffBackend,
    LearningRate,
};
use serde::{Deserialize, Serialize};

use crate::utils::error::TrainerError;

pub use adabelief::{AdaBelief, AdaBeliefConfig, AdaBeliefState};

/// L2 penalty used by SGD and Adam
pub const WEIGHT_DECAY: f32 = 5e-4;

/// SGD momentum factor
pub const SGD_MOMENTUM: f64 = 0.9;

/// Adam denominator epsilon
pub const ADAM_EPSILON: f32 = 1e-8;

/// Supported optimizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizerKind {
    #[serde(rename = "SGD")]
    Sgd,
    #[serde(rename = "Adam")]
    Adam,
    #[serde(rename = "AdaBelief")]
    AdaBelief,
}

impl OptimizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerKind::Sgd => "SGD",
            OptimizerKind::Adam => "Adam",
            OptimizerKind::AdaBelief => "AdaBelief",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerKind {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "adam" => Ok(OptimizerKind::Adam),
            "adabelief" => Ok(OptimizerKind::AdaBelief),
            _ => Err(TrainerError::Config(format!(
                "unsupported optimizer '{}' (expected SGD, Adam or AdaBelief)",
                s
            ))),
        }
    }
}

/// Hyperparameters of one optimizer instance
#[derive(Debug, Clone)]
pub enum OptimizerSpec {
    Sgd {
        momentum: Option<f64>,
        weight_decay: Option<f32>,
    },
    Adam {
        epsilon: f32,
        weight_decay: Option<f32>,
    },
    AdaBelief(AdaBeliefConfig),
}

impl OptimizerSpec {
    /// The hyperparameters the driver trains with
    pub fn defaults(kind: OptimizerKind) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerSpec::Sgd {
                momentum: Some(SGD_MOMENTUM),
                weight_decay: Some(WEIGHT_DECAY),
            },
            OptimizerKind::Adam => OptimizerSpec::Adam {
                epsilon: ADAM_EPSILON,
                weight_decay: Some(WEIGHT_DECAY),
            },
            OptimizerKind::AdaBelief => OptimizerSpec::AdaBelief(AdaBeliefConfig::new()),
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerSpec::Sgd { .. } => OptimizerKind::Sgd,
            OptimizerSpec::Adam { .. } => OptimizerKind::Adam,
            OptimizerSpec::AdaBelief(_) => OptimizerKind::AdaBelief,
        }
    }

    fn build<M, B>(&self) -> Box<dyn StepModule<M, B>>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + 'static,
    {
        match self {
            OptimizerSpec::Sgd {
                momentum,
                weight_decay,
            } => {
                let config = SgdConfig::new()
                    .with_momentum(momentum.map(|momentum| {
                        MomentumConfig::new()
                            .with_momentum(momentum)
                            .with_dampening(0.0)
                    }))
                    .with_weight_decay(weight_decay.map(WeightDecayConfig::new));
                boxed(config.init())
            }
            OptimizerSpec::Adam {
                epsilon,
                weight_decay,
            } => {
                let config = AdamConfig::new()
                    .with_epsilon(*epsilon)
                    .with_weight_decay(weight_decay.map(WeightDecayConfig::new));
                boxed(config.init())
            }
            OptimizerSpec::AdaBelief(config) => boxed(config.init()),
        }
    }
}

/// Object-safe view of a burn optimizer bound to one module type
trait StepModule<M, B>: Send {
    fn step(&mut self, lr: LearningRate, module: M, grads: GradientsParams) -> M;
}

impl<M, B, O> StepModule<M, B> for O
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn step(&mut self, lr: LearningRate, module: M, grads: GradientsParams) -> M {
        Optimizer::step(self, lr, module, grads)
    }
}

fn boxed<M, B, O>(optimizer: O) -> Box<dyn StepModule<M, B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
    O: Optimizer<M, B> + 'static,
{
    Box::new(optimizer)
}

/// An optimizer that owns its learning rate and can forget its state
pub trait ResettableOptimizer<M, B>: Send
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    /// Apply one update and return the updated module
    fn step(&mut self, module: M, grads: GradientsParams) -> M;

    fn learning_rate(&self) -> LearningRate;

    fn set_learning_rate(&mut self, learning_rate: LearningRate);

    /// Discard accumulated statistics (momentum buffers, moment estimates,
    /// step counters). Parameters are not affected; the next step behaves
    /// like the first step of a fresh optimizer.
    fn reset(&mut self);
}

/// The optimizer used by the training loop
pub struct TrainingOptimizer<M, B> {
    spec: OptimizerSpec,
    learning_rate: LearningRate,
    inner: Box<dyn StepModule<M, B>>,
}

impl<M, B> TrainingOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    pub fn new(spec: OptimizerSpec, learning_rate: LearningRate) -> Self {
        let inner = spec.build();
        Self {
            spec,
            learning_rate,
            inner,
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        self.spec.kind()
    }
}

impl<M, B> ResettableOptimizer<M, B> for TrainingOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    fn step(&mut self, module: M, grads: GradientsParams) -> M {
        self.inner.step(self.learning_rate, module, grads)
    }

    fn learning_rate(&self) -> LearningRate {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: LearningRate) {
        self.learning_rate = learning_rate;
    }

    fn reset(&mut self) {
        tracing::debug!("Resetting {} optimizer state", self.spec.kind());
        self.inner = self.spec.build();
    }
}

impl<M, B> fmt::Debug for TrainingOptimizer<M, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingOptimizer")
            .field("spec", &self.spec)
            .field("learning_rate", &self.learning_rate)
            .finish()
    }
}

/// Create the optimizer for `kind` with the driver's hyperparameters
pub fn initialize_optimizer<B, M>(
    kind: OptimizerKind,
    learning_rate: LearningRate,
) -> TrainingOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    TrainingOptimizer::new(OptimizerSpec::defaults(kind), learning_rate)
}
