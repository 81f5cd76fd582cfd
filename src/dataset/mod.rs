//! Dataset module for CIFAR-10 / CIFAR-100
//!
//! This module handles:
//! - Downloading and unpacking the binary CIFAR archives
//! - Parsing the fixed-size binary records
//! - Training-time augmentation (padded random crop, horizontal flip)
//! - Batching into normalized tensors and the train/test loaders

pub mod augmentation;
pub mod burn_dataset;
pub mod cifar;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::error::TrainerError;

pub use augmentation::{AugmentationConfig, Augmenter};
pub use burn_dataset::{
    get_data, CifarBatcher, CifarDataset, CifarItem, ClassificationBatch, DataConfig, SplitLoader,
};

/// Image side length in pixels
pub const IMAGE_SIZE: usize = 32;

/// Color channels per image
pub const CHANNELS: usize = 3;

/// Pixel bytes per image, stored planar (R plane, G plane, B plane)
pub const PIXELS_PER_IMAGE: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// Per-channel mean of the CIFAR training images (RGB)
pub const CIFAR_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];

/// Per-channel standard deviation used for normalization (RGB)
pub const CIFAR_STD: [f32; 3] = [0.2023, 0.1994, 0.2010];

/// CIFAR-10 class names
pub const CIFAR10_CLASSES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Supported datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetName {
    #[serde(rename = "CIFAR-10")]
    Cifar10,
    #[serde(rename = "CIFAR-100")]
    Cifar100,
}

impl DatasetName {
    pub fn num_classes(&self) -> usize {
        match self {
            DatasetName::Cifar10 => 10,
            DatasetName::Cifar100 => 100,
        }
    }

    /// Canonical name, also used in output file names
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetName::Cifar10 => "CIFAR-10",
            DatasetName::Cifar100 => "CIFAR-100",
        }
    }

    /// Bytes preceding the pixels in each record
    pub fn label_bytes(&self) -> usize {
        match self {
            DatasetName::Cifar10 => 1,
            // coarse label, fine label
            DatasetName::Cifar100 => 2,
        }
    }

    pub fn record_size(&self) -> usize {
        self.label_bytes() + PIXELS_PER_IMAGE
    }

    pub fn archive_url(&self) -> &'static str {
        match self {
            DatasetName::Cifar10 => "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz",
            DatasetName::Cifar100 => "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz",
        }
    }

    pub fn archive_name(&self) -> &'static str {
        match self {
            DatasetName::Cifar10 => "cifar-10-binary.tar.gz",
            DatasetName::Cifar100 => "cifar-100-binary.tar.gz",
        }
    }

    /// Directory created by unpacking the archive
    pub fn extracted_dir(&self) -> &'static str {
        match self {
            DatasetName::Cifar10 => "cifar-10-batches-bin",
            DatasetName::Cifar100 => "cifar-100-binary",
        }
    }

    pub fn train_files(&self) -> &'static [&'static str] {
        match self {
            DatasetName::Cifar10 => &[
                "data_batch_1.bin",
                "data_batch_2.bin",
                "data_batch_3.bin",
                "data_batch_4.bin",
                "data_batch_5.bin",
            ],
            DatasetName::Cifar100 => &["train.bin"],
        }
    }

    pub fn test_files(&self) -> &'static [&'static str] {
        match self {
            DatasetName::Cifar10 => &["test_batch.bin"],
            DatasetName::Cifar100 => &["test.bin"],
        }
    }

    /// Human-readable class name, when the dataset ships a name table here
    pub fn class_name(&self, label: usize) -> Option<&'static str> {
        match self {
            DatasetName::Cifar10 => CIFAR10_CLASSES.get(label).copied(),
            DatasetName::Cifar100 => None,
        }
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetName {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "CIFAR-10" | "CIFAR10" => Ok(DatasetName::Cifar10),
            "CIFAR-100" | "CIFAR100" => Ok(DatasetName::Cifar100),
            _ => Err(TrainerError::Config(format!(
                "unsupported dataset '{}' (expected CIFAR-10 or CIFAR-100)",
                s
            ))),
        }
    }
}

/// Which part of the dataset to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn files(&self, dataset: DatasetName) -> &'static [&'static str] {
        match self {
            Split::Train => dataset.train_files(),
            Split::Test => dataset.test_files(),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}
