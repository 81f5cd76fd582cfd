#![allow(dead_code)]

use std::sync::Arc;

use burn::backend::{ndarray::NdArray, Autodiff};
use burn::module::Module;
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;

use cifar_trainer::dataset::{CifarDataset, CifarItem, PIXELS_PER_IMAGE};
use cifar_trainer::{ClassificationBatch, DatasetName, ImageClassifier};

pub type ADBackend = Autodiff<NdArray<f32>>;
pub type InnerBackend = NdArray<f32>;

pub fn device() -> <ADBackend as Backend>::Device {
    Default::default()
}

/// Flattens the image and applies a single linear layer
#[derive(Module, Debug)]
pub struct LinearHead<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> LinearHead<B> {
    /// Zero weights, no bias
    pub fn zeros(features: usize, classes: usize, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(features, classes)
                .with_bias(false)
                .with_initializer(Initializer::Zeros)
                .init(device),
        }
    }

    pub fn random(features: usize, classes: usize, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(features, classes).init(device),
        }
    }

    /// Row-major `[features, classes]` weights
    pub fn weights(&self) -> Vec<f32> {
        self.linear
            .weight
            .val()
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap()
    }
}

impl<B: Backend> ImageClassifier<B> for LinearHead<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, channels, height, width] = images.dims();
        self.linear
            .forward(images.reshape([batch_size, channels * height * width]))
    }
}

/// A batch of `[n, 1, 1, features]` images
pub fn vector_batch<B: Backend>(
    rows: &[Vec<f32>],
    labels: &[i64],
    device: &B::Device,
) -> ClassificationBatch<B> {
    let features = rows[0].len();
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    ClassificationBatch {
        images: Tensor::from_floats(TensorData::new(data, [rows.len(), 1, 1, features]), device),
        targets: Tensor::from_data(TensorData::new(labels.to_vec(), [labels.len()]), device),
    }
}

/// Black images labelled 0, white images labelled 1
pub fn black_and_white(n: usize) -> Arc<CifarDataset> {
    let items = (0..n)
        .map(|i| {
            let label = i % 2;
            let value = if label == 0 { 0u8 } else { 255u8 };
            CifarItem::new(vec![value; PIXELS_PER_IMAGE], label)
        })
        .collect();
    Arc::new(CifarDataset::from_items(DatasetName::Cifar10, items))
}

pub fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "index {}: got {}, expected {}",
            i,
            a,
            e
        );
    }
}

pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}
