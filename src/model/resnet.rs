//! BasicBlock ResNet for 32x32 inputs
//!
//! Stem: 3x3 conv (stride 1) + BatchNorm + ReLU, no initial max pool.
//! Four stages of BasicBlocks with widths 64/128/256/512 and strides
//! 1/2/2/2. Global average pooling feeds a linear classifier.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

const STAGE_WIDTHS: [usize; 4] = [64, 128, 256, 512];
const STAGE_STRIDES: [usize; 4] = [1, 2, 2, 2];

/// Configuration for the ResNet
#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub num_classes: usize,

    /// BasicBlocks per stage
    #[config(default = "[3, 4, 6, 4]")]
    pub stage_depths: [usize; 4],

    #[config(default = "3")]
    pub in_channels: usize,
}

fn conv3x3<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

/// 1x1 projection used when a block changes resolution or width
#[derive(Module, Debug)]
pub struct Shortcut<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Shortcut<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Two 3x3 convs with a residual connection
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    shortcut: Option<Shortcut<B>>,
    activation: Relu,
}

impl<B: Backend> BasicBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let shortcut = if stride != 1 || in_channels != out_channels {
            Some(Shortcut::new(in_channels, out_channels, stride, device))
        } else {
            None
        };

        Self {
            conv1: conv3x3(in_channels, out_channels, stride, device),
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2: conv3x3(out_channels, out_channels, 1, device),
            bn2: BatchNormConfig::new(out_channels).init(device),
            shortcut,
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.shortcut {
            Some(shortcut) => shortcut.forward(input.clone()),
            None => input.clone(),
        };

        let mut x = self.conv1.forward(input);
        x = self.bn1.forward(x);
        x = self.activation.forward(x);
        x = self.conv2.forward(x);
        x = self.bn2.forward(x);
        x = x.add(identity);
        self.activation.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem: Conv2d<B>,
    stem_bn: BatchNorm<B, 2>,
    blocks: Vec<BasicBlock<B>>,
    avgpool: AdaptiveAvgPool2d,
    fc: Linear<B>,
    activation: Relu,
    num_classes: usize,
}

impl ResNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let stem = conv3x3(self.in_channels, STAGE_WIDTHS[0], 1, device);
        let stem_bn = BatchNormConfig::new(STAGE_WIDTHS[0]).init(device);

        let mut blocks = Vec::with_capacity(self.stage_depths.iter().sum());
        let mut channels = STAGE_WIDTHS[0];
        for ((&depth, &width), &stride) in self
            .stage_depths
            .iter()
            .zip(STAGE_WIDTHS.iter())
            .zip(STAGE_STRIDES.iter())
        {
            for i in 0..depth {
                // Only the first block of a stage downsamples
                let block_stride = if i == 0 { stride } else { 1 };
                blocks.push(BasicBlock::new(channels, width, block_stride, device));
                channels = width;
            }
        }

        ResNet {
            stem,
            stem_bn,
            blocks,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(channels, self.num_classes).init(device),
            activation: Relu::new(),
            num_classes: self.num_classes,
        }
    }
}

impl<B: Backend> ResNet<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stem.forward(input);
        let x = self.stem_bn.forward(x);
        let x = self.activation.forward(x);

        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));

        let x = self.avgpool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        self.fc.forward(x)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}
