//! Model module for CIFAR classification
//!
//! This module contains:
//! - VGG-11 with BatchNorm
//! - BasicBlock ResNet (stage depths 3/4/6/4)
//! - The `ImageClassifier` seam the training and evaluation steps use
//! - `build_model`, the factory that maps an architecture name to a network

pub mod resnet;
pub mod vgg;

use std::fmt;
use std::str::FromStr;

use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::utils::error::TrainerError;

pub use resnet::{BasicBlock, ResNet, ResNetConfig};
pub use vgg::{ConvBlock, Vgg, VggConfig, VggLayer, VGG11};

/// Anything that maps a batch of images to class logits
pub trait ImageClassifier<B: Backend> {
    /// `[batch, 3, H, W]` images to `[batch, num_classes]` logits
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

/// Supported network families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "VGG")]
    Vgg,
    #[serde(rename = "ResNet")]
    ResNet,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Vgg => "VGG",
            Architecture::ResNet => "ResNet",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vgg" | "vgg11" => Ok(Architecture::Vgg),
            "resnet" => Ok(Architecture::ResNet),
            _ => Err(TrainerError::Config(format!(
                "unsupported architecture '{}' (expected VGG or ResNet)",
                s
            ))),
        }
    }
}

#[derive(Module, Debug)]
pub enum Backbone<B: Backend> {
    Vgg(Vgg<B>),
    ResNet(ResNet<B>),
}

/// The network trained by the driver
#[derive(Module, Debug)]
pub struct CifarClassifier<B: Backend> {
    backbone: Backbone<B>,
    num_classes: usize,
}

impl<B: Backend> CifarClassifier<B> {
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn architecture(&self) -> Architecture {
        match self.backbone {
            Backbone::Vgg(_) => Architecture::Vgg,
            Backbone::ResNet(_) => Architecture::ResNet,
        }
    }
}

impl<B: Backend> ImageClassifier<B> for CifarClassifier<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        match &self.backbone {
            Backbone::Vgg(net) => net.forward(images),
            Backbone::ResNet(net) => net.forward(images),
        }
    }
}

/// Build a freshly initialized network on `device`
pub fn build_model<B: Backend>(
    architecture: Architecture,
    num_classes: usize,
    device: &B::Device,
) -> CifarClassifier<B> {
    let backbone = match architecture {
        Architecture::Vgg => Backbone::Vgg(VggConfig::new(num_classes).init(device)),
        Architecture::ResNet => Backbone::ResNet(ResNetConfig::new(num_classes).init(device)),
    };

    tracing::debug!("Built {} with {} classes", architecture, num_classes);

    CifarClassifier {
        backbone,
        num_classes,
    }
}
