//! Learning Rate Scheduler Module
//!
//! A single step decay: at the milestone epoch the learning rate is
//! multiplied by `gamma` and, optionally, the optimizer forgets its
//! accumulated statistics.

use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend, LearningRate};
use serde::{Deserialize, Serialize};

use crate::optim::ResettableOptimizer;
use crate::utils::error::{Result, TrainerError};

/// Multiply the optimizer's learning rate by `gamma`, then, when `reset`
/// is set, discard its accumulated statistics. Returns the new rate.
pub fn adjust_learning_rate<M, B, O>(optimizer: &mut O, gamma: f64, reset: bool) -> LearningRate
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: ResettableOptimizer<M, B> + ?Sized,
{
    let learning_rate = optimizer.learning_rate() * gamma;
    optimizer.set_learning_rate(learning_rate);

    if reset {
        optimizer.reset();
    }

    learning_rate
}

/// When and how the learning rate is decayed during a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneSchedule {
    /// 1-based epoch at whose start the decay is applied
    pub milestone: usize,
    pub gamma: f64,
    /// Reset optimizer statistics together with the decay
    pub reset: bool,
}

impl Default for MilestoneSchedule {
    fn default() -> Self {
        Self {
            milestone: 150,
            gamma: 0.1,
            reset: false,
        }
    }
}

impl MilestoneSchedule {
    pub fn new(milestone: usize, gamma: f64, reset: bool) -> Self {
        Self {
            milestone,
            gamma,
            reset,
        }
    }

    /// Whether the adjustment fires before training `epoch`
    pub fn triggers(&self, epoch: usize) -> bool {
        epoch == self.milestone
    }

    /// Learning rate in effect during `epoch` for a run started at `initial_lr`
    pub fn lr_at(&self, epoch: usize, initial_lr: LearningRate) -> LearningRate {
        if epoch >= self.milestone {
            initial_lr * self.gamma
        } else {
            initial_lr
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.milestone == 0 {
            return Err(TrainerError::Config("milestone epochs are 1-based".into()));
        }
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(TrainerError::Config(format!(
                "gamma must be a positive finite number, got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::optim::GradientsParams;

    use crate::model::CifarClassifier;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;
    type TestModel = CifarClassifier<TestBackend>;

    /// Records calls without owning any tensors
    #[derive(Default)]
    struct RecordingOptimizer {
        learning_rate: f64,
        resets: usize,
    }

    impl ResettableOptimizer<TestModel, TestBackend> for RecordingOptimizer {
        fn step(&mut self, module: TestModel, _grads: GradientsParams) -> TestModel {
            module
        }

        fn learning_rate(&self) -> f64 {
            self.learning_rate
        }

        fn set_learning_rate(&mut self, learning_rate: f64) {
            self.learning_rate = learning_rate;
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn test_adjust_multiplies_by_gamma() {
        let mut optimizer = RecordingOptimizer {
            learning_rate: 0.1,
            resets: 0,
        };

        let lr = adjust_learning_rate::<TestModel, TestBackend, _>(&mut optimizer, 0.1, false);
        assert!((lr - 0.01).abs() < 1e-12);
        assert!((optimizer.learning_rate - 0.01).abs() < 1e-12);
        assert_eq!(optimizer.resets, 0);
    }

    #[test]
    fn test_adjust_with_reset() {
        let mut optimizer = RecordingOptimizer {
            learning_rate: 0.001,
            resets: 0,
        };

        adjust_learning_rate::<TestModel, TestBackend, _>(&mut optimizer, 0.5, true);
        assert!((optimizer.learning_rate - 0.0005).abs() < 1e-12);
        assert_eq!(optimizer.resets, 1);
    }

    #[test]
    fn test_milestone_schedule() {
        let schedule = MilestoneSchedule::default();
        assert!(!schedule.triggers(149));
        assert!(schedule.triggers(150));
        assert!(!schedule.triggers(151));
        assert!(!schedule.reset);

        assert_eq!(schedule.lr_at(1, 0.1), 0.1);
        assert!((schedule.lr_at(150, 0.1) - 0.01).abs() < 1e-12);
        assert!((schedule.lr_at(200, 0.1) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_validation() {
        assert!(MilestoneSchedule::default().validate().is_ok());
        assert!(MilestoneSchedule::new(0, 0.1, false).validate().is_err());
        assert!(MilestoneSchedule::new(10, 0.0, false).validate().is_err());
        assert!(MilestoneSchedule::new(10, f64::NAN, true).validate().is_err());
    }

    #[test]
    fn test_partial_schedule_uses_defaults() {
        let schedule: MilestoneSchedule = serde_json::from_str(r#"{"reset": true}"#).unwrap();
        assert_eq!(schedule, MilestoneSchedule::new(150, 0.1, true));
    }
}
