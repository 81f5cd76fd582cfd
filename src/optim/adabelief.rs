//! AdaBelief optimizer
//!
//! Adam-style update where the second moment tracks the variance of the
//! gradient around its running mean (the "belief") instead of the raw
//! squared gradient:
//!
//! ```text
//! m = b1 * m + (1 - b1) * g
//! s = b2 * s + (1 - b2) * (g - m)^2 + eps
//! p = p - lr / (1 - b1^t) * m / (sqrt(s / (1 - b2^t)) + eps)
//! ```
//!
//! Weight decay, when enabled, is decoupled (`p *= 1 - lr * wd`).

use burn::{
    config::Config,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, SimpleOptimizer},
    record::Record,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
    LearningRate,
};

/// Configuration to create the [AdaBelief](AdaBelief) optimizer.
#[derive(Config, Debug)]
pub struct AdaBeliefConfig {
    /// Decay rate of the first moment
    #[config(default = "0.9")]
    pub beta_1: f32,
    /// Decay rate of the belief (centered second moment)
    #[config(default = "0.999")]
    pub beta_2: f32,
    /// Added to the belief and to the denominator
    #[config(default = "1e-16")]
    pub epsilon: f32,
    /// Decoupled weight decay factor, 0 disables it
    #[config(default = "0.0")]
    pub weight_decay: f32,
}

/// AdaBelief update rule, shared by every parameter
#[derive(Clone, Debug)]
pub struct AdaBelief {
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
    weight_decay: Option<f32>,
}

/// Per-parameter optimizer state
#[derive(Record, Clone)]
pub struct AdaBeliefState<B: Backend, const D: usize> {
    pub exp_avg: Tensor<B, D>,
    pub exp_avg_var: Tensor<B, D>,
    /// Number of updates applied so far
    pub step: usize,
}

impl AdaBeliefConfig {
    pub fn build(&self) -> AdaBelief {
        AdaBelief {
            beta_1: self.beta_1,
            beta_2: self.beta_2,
            epsilon: self.epsilon,
            weight_decay: (self.weight_decay > 0.0).then_some(self.weight_decay),
        }
    }

    /// Wrap the update rule for a whole module
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> OptimizerAdaptor<AdaBelief, M, B> {
        OptimizerAdaptor::from(self.build())
    }
}

impl<B: Backend> SimpleOptimizer<B> for AdaBelief {
    type State<const D: usize> = AdaBeliefState<B, D>;

    fn step<const D: usize>(
        &self,
        lr: LearningRate,
        tensor: Tensor<B, D>,
        grad: Tensor<B, D>,
        state: Option<Self::State<D>>,
    ) -> (Tensor<B, D>, Option<Self::State<D>>) {
        let beta_1 = self.beta_1 as f64;
        let beta_2 = self.beta_2 as f64;

        let (exp_avg, prev_var, step) = match state {
            Some(state) => (
                state
                    .exp_avg
                    .mul_scalar(beta_1)
                    .add(grad.clone().mul_scalar(1.0 - beta_1)),
                Some(state.exp_avg_var),
                state.step + 1,
            ),
            None => (grad.clone().mul_scalar(1.0 - beta_1), None, 1),
        };

        let belief = (grad - exp_avg.clone())
            .powf_scalar(2.0)
            .mul_scalar(1.0 - beta_2);
        let exp_avg_var = match prev_var {
            Some(var) => var.mul_scalar(beta_2).add(belief),
            None => belief,
        }
        .add_scalar(self.epsilon);

        let bias_correction_1 = 1.0 - beta_1.powi(step as i32);
        let bias_correction_2 = 1.0 - beta_2.powi(step as i32);

        let denom = exp_avg_var
            .clone()
            .div_scalar(bias_correction_2)
            .sqrt()
            .add_scalar(self.epsilon);
        let update = exp_avg
            .clone()
            .div(denom)
            .mul_scalar(lr / bias_correction_1);

        let tensor = match self.weight_decay {
            Some(decay) => tensor.mul_scalar(1.0 - lr * decay as f64),
            None => tensor,
        };

        let state = AdaBeliefState {
            exp_avg,
            exp_avg_var,
            step,
        };

        (tensor - update, Some(state))
    }

    fn to_device<const D: usize>(mut state: Self::State<D>, device: &B::Device) -> Self::State<D> {
        state.exp_avg = state.exp_avg.to_device(device);
        state.exp_avg_var = state.exp_avg_var.to_device(device);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn values(tensor: Tensor<TestBackend, 1>) -> Vec<f32> {
        tensor.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_default_hyperparameters() {
        let config = AdaBeliefConfig::new();
        assert_eq!(config.beta_1, 0.9);
        assert_eq!(config.beta_2, 0.999);
        assert_eq!(config.epsilon, 1e-16);
        assert!(config.build().weight_decay.is_none());
    }

    #[test]
    fn test_first_step_moves_by_lr_over_beta1() {
        let device = Default::default();
        let optim = AdaBeliefConfig::new().build();

        let param = Tensor::<TestBackend, 1>::from_floats([1.0, -2.0, 0.5], &device);
        let grad = Tensor::<TestBackend, 1>::from_floats([0.3, -0.6, 2.0], &device);

        let (updated, state) =
            SimpleOptimizer::<TestBackend>::step(&optim, 0.01, param, grad, None);

        // m = 0.1 g, s = 0.001 * 0.81 g^2, so the update is lr * sign(g) / 0.9
        let step = 0.01 / 0.9;
        let expected = [1.0 - step, -2.0 + step, 0.5 - step];
        for (got, want) in values(updated).iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{} vs {}", got, want);
        }
        assert_eq!(state.unwrap().step, 1);
    }

    #[test]
    fn test_state_accumulates_steps() {
        let device = Default::default();
        let optim = AdaBeliefConfig::new().build();

        let mut param = Tensor::<TestBackend, 1>::from_floats([0.0, 0.0], &device);
        let mut state = None;
        for _ in 0..3 {
            let grad = Tensor::<TestBackend, 1>::from_floats([1.0, -1.0], &device);
            let (p, s) = SimpleOptimizer::<TestBackend>::step(&optim, 0.1, param, grad, state);
            param = p;
            state = s;
        }

        assert_eq!(state.as_ref().map(|s| s.step), Some(3));
        let p = values(param);
        assert!(p[0] < 0.0 && p[1] > 0.0);
    }

    #[test]
    fn test_decoupled_weight_decay_shrinks_parameters() {
        let device = Default::default();
        let plain = AdaBeliefConfig::new().build();
        let decayed = AdaBeliefConfig::new().with_weight_decay(0.5).build();

        let param = Tensor::<TestBackend, 1>::from_data(TensorData::from([4.0f32]), &device);
        let grad = Tensor::<TestBackend, 1>::from_data(TensorData::from([1.0f32]), &device);

        let (a, _) = SimpleOptimizer::<TestBackend>::step(&plain, 0.1, param.clone(), grad.clone(), None);
        let (b, _) = SimpleOptimizer::<TestBackend>::step(&decayed, 0.1, param, grad, None);

        // 4 * (1 - 0.1 * 0.5) = 3.8 before the shared update
        let diff = values(a)[0] - values(b)[0];
        assert!((diff - 0.2).abs() < 1e-5, "diff = {}", diff);
    }
}
