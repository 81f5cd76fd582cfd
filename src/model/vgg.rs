//! VGG for 32x32 inputs
//!
//! Every convolution is a 3x3, padding-1 conv followed by BatchNorm and
//! ReLU; a max pool halves the resolution. After five pools a 32x32 input
//! is reduced to a single 512-channel pixel, which feeds the classifier.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// One entry of a VGG layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VggLayer {
    /// 3x3 conv + BatchNorm + ReLU with this many output channels
    Conv(usize),
    /// 2x2 max pool, stride 2
    MaxPool,
}

use VggLayer::{Conv, MaxPool};

/// VGG-11: `[64, M, 128, M, 256, 256, M, 512, 512, M, 512, 512, M]`
pub const VGG11: &[VggLayer] = &[
    Conv(64),
    MaxPool,
    Conv(128),
    MaxPool,
    Conv(256),
    Conv(256),
    MaxPool,
    Conv(512),
    Conv(512),
    MaxPool,
    Conv(512),
    Conv(512),
    MaxPool,
];

/// Configuration for the VGG network
#[derive(Config, Debug)]
pub struct VggConfig {
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,
}

/// A conv block with Conv2d, BatchNorm, ReLU, and optional MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, with_pool: bool, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        let pool = if with_pool {
            Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
        } else {
            None
        };

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);

        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// VGG feature extractor plus a single linear classifier
#[derive(Module, Debug)]
pub struct Vgg<B: Backend> {
    pub features: Vec<ConvBlock<B>>,
    pub classifier: Linear<B>,
    num_classes: usize,
}

impl VggConfig {
    /// VGG-11 on `device`
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vgg<B> {
        Vgg::from_layout(VGG11, self.in_channels, self.num_classes, device)
    }
}

impl<B: Backend> Vgg<B> {
    /// Build from a layout. Each pool is folded into the conv block before
    /// it; the layout must start with a convolution.
    pub fn from_layout(
        layout: &[VggLayer],
        in_channels: usize,
        num_classes: usize,
        device: &B::Device,
    ) -> Self {
        let mut features = Vec::new();
        let mut channels = in_channels;

        for (i, layer) in layout.iter().enumerate() {
            if let Conv(width) = *layer {
                let with_pool = matches!(layout.get(i + 1), Some(MaxPool));
                features.push(ConvBlock::new(channels, width, with_pool, device));
                channels = width;
            }
        }

        let classifier = LinearConfig::new(channels, num_classes).init(device);

        Self {
            features,
            classifier,
            num_classes,
        }
    }

    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, 32, 32]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self
            .features
            .iter()
            .fold(x, |x, block| block.forward(x));

        // Flatten: [B, C, 1, 1] -> [B, C]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        self.classifier.forward(x)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
