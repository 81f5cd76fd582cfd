//! Burn Dataset Integration for CIFAR
//!
//! This module implements Burn's Dataset trait and Batcher for the CIFAR
//! splits, plus the loaders that turn a split into a sequence of batches.
//!
//! ## Loaders
//!
//! - Training loader: reshuffled on every traversal, augmented on the fly
//! - Test loader: fixed file order, no augmentation

use std::path::PathBuf;
use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::augmentation::{AugmentationConfig, Augmenter};
use super::{cifar, DatasetName, Split, CHANNELS, CIFAR_MEAN, CIFAR_STD, IMAGE_SIZE};
use crate::utils::error::{Result, TrainerError};

/// A single CIFAR example
#[derive(Clone, Debug, PartialEq)]
pub struct CifarItem {
    /// Raw pixel bytes, planar CHW [3 * 32 * 32]
    pub image: Vec<u8>,
    /// Class label
    pub label: usize,
}

impl CifarItem {
    pub fn new(image: Vec<u8>, label: usize) -> Self {
        Self { image, label }
    }
}

/// One split of CIFAR held in memory
#[derive(Debug, Clone)]
pub struct CifarDataset {
    dataset: DatasetName,
    items: Vec<CifarItem>,
}

impl CifarDataset {
    pub fn from_items(dataset: DatasetName, items: Vec<CifarItem>) -> Self {
        Self { dataset, items }
    }

    /// Load a split from an extracted dataset directory
    pub fn load(dataset_dir: &std::path::Path, dataset: DatasetName, split: Split) -> Result<Self> {
        let items = cifar::load_split(dataset_dir, dataset, split)?;
        let loaded = Self::from_items(dataset, items);
        loaded.log_stats(split);
        Ok(loaded)
    }

    pub fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }

    pub fn class_counts(&self) -> Vec<usize> {
        cifar::class_counts(&self.items, self.num_classes())
    }

    fn log_stats(&self, split: Split) {
        let counts = self.class_counts();
        let min = counts.iter().copied().min().unwrap_or(0);
        let max = counts.iter().copied().max().unwrap_or(0);
        info!(
            "{} {} split: {} images, {} classes ({}-{} per class)",
            self.dataset,
            split,
            crate::utils::format_number(self.items.len()),
            self.num_classes(),
            min,
            max
        );
        for (label, count) in counts.iter().enumerate() {
            let name = self.dataset.class_name(label).unwrap_or("-");
            debug!("  class {:>3} {:<12} {}", label, name, count);
        }
    }
}

impl Dataset<CifarItem> for CifarDataset {
    fn get(&self, index: usize) -> Option<CifarItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of images ready for the model
#[derive(Clone, Debug)]
pub struct ClassificationBatch<B: Backend> {
    /// Normalized images with shape [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher that scales pixels to [0, 1] and applies the CIFAR
/// per-channel normalization
#[derive(Clone, Debug)]
pub struct CifarBatcher {
    image_size: usize,
}

impl CifarBatcher {
    pub fn new() -> Self {
        Self {
            image_size: IMAGE_SIZE,
        }
    }
}

impl Default for CifarBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Batcher<B, CifarItem, ClassificationBatch<B>> for CifarBatcher {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> ClassificationBatch<B> {
        let batch_size = items.len();
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().map(|&p| p as f32 / 255.0))
            .collect();
        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, CHANNELS, height, width]),
            device,
        );

        // (x - mean) / std
        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(CIFAR_MEAN.to_vec(), [1, CHANNELS, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(CIFAR_STD.to_vec(), [1, CHANNELS, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        ClassificationBatch { images, targets }
    }
}

/// How a loader walks its split
#[derive(Debug, Clone)]
enum Traversal {
    /// File order, raw images
    Sequential,
    /// New permutation every traversal, augmented images
    Shuffled {
        rng: ChaCha8Rng,
        augmenter: Augmenter,
    },
}

/// Produces the batches of one split, one traversal per call to [`SplitLoader::iter`]
#[derive(Debug, Clone)]
pub struct SplitLoader {
    dataset: Arc<CifarDataset>,
    batcher: CifarBatcher,
    batch_size: usize,
    traversal: Traversal,
}

impl SplitLoader {
    /// Shuffling, augmenting loader for the training split
    pub fn train(
        dataset: Arc<CifarDataset>,
        batch_size: usize,
        augmentation: AugmentationConfig,
        seed: u64,
    ) -> Self {
        Self {
            dataset,
            batcher: CifarBatcher::new(),
            batch_size: batch_size.max(1),
            traversal: Traversal::Shuffled {
                rng: ChaCha8Rng::seed_from_u64(seed),
                augmenter: Augmenter::new(augmentation, IMAGE_SIZE as u32),
            },
        }
    }

    /// Fixed-order loader for the test split
    pub fn test(dataset: Arc<CifarDataset>, batch_size: usize) -> Self {
        Self {
            dataset,
            batcher: CifarBatcher::new(),
            batch_size: batch_size.max(1),
            traversal: Traversal::Sequential,
        }
    }

    /// Number of examples per traversal
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per traversal, the last one possibly partial
    pub fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size)
    }

    /// Start a traversal, yielding batches on `device`
    pub fn iter<B: Backend>(
        &mut self,
        device: &B::Device,
    ) -> impl Iterator<Item = ClassificationBatch<B>> + '_ {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if let Traversal::Shuffled { rng, .. } = &mut self.traversal {
            indices.shuffle(rng);
        }

        let chunks: Vec<Vec<usize>> = indices
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        let device = device.clone();

        chunks
            .into_iter()
            .map(move |chunk| self.load_batch::<B>(&chunk, &device))
    }

    fn load_batch<B: Backend>(
        &mut self,
        indices: &[usize],
        device: &B::Device,
    ) -> ClassificationBatch<B> {
        let dataset = &self.dataset;
        let traversal = &mut self.traversal;

        let items: Vec<CifarItem> = indices
            .iter()
            .filter_map(|&index| dataset.get(index))
            .map(|item| match traversal {
                Traversal::Sequential => item,
                Traversal::Shuffled { rng, augmenter } => {
                    CifarItem::new(augmenter.augment_planar(&item.image, rng), item.label)
                }
            })
            .collect();

        self.batcher.batch(items, device)
    }
}

/// Everything the data provider needs to build both loaders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset: DatasetName,
    /// Directory holding (or receiving) the extracted archives
    pub data_dir: PathBuf,
    pub batch_size: usize,
    /// Seed of the training shuffle and augmentation stream
    pub seed: u64,
    /// Fetch the archive when the files are missing
    pub download: bool,
    pub augmentation: AugmentationConfig,
}

impl DataConfig {
    pub fn new(dataset: DatasetName, data_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            dataset,
            data_dir: data_dir.into(),
            batch_size,
            seed: 42,
            download: true,
            augmentation: AugmentationConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TrainerError::Config("batch_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.augmentation.horizontal_flip_prob) {
            return Err(TrainerError::Config(
                "horizontal_flip_prob must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Build the training and test loaders for a dataset
pub fn get_data(config: &DataConfig) -> Result<(SplitLoader, SplitLoader)> {
    config.validate()?;

    let dataset_dir = cifar::ensure_dataset(&config.data_dir, config.dataset, config.download)?;
    let train = CifarDataset::load(&dataset_dir, config.dataset, Split::Train)?;
    let test = CifarDataset::load(&dataset_dir, config.dataset, Split::Test)?;

    Ok((
        SplitLoader::train(
            Arc::new(train),
            config.batch_size,
            config.augmentation.clone(),
            config.seed,
        ),
        SplitLoader::test(Arc::new(test), config.batch_size),
    ))
}

/// Build only the test loader (used when evaluating a checkpoint)
pub fn get_test_data(config: &DataConfig) -> Result<SplitLoader> {
    config.validate()?;

    let dataset_dir = cifar::ensure_dataset(&config.data_dir, config.dataset, config.download)?;
    let test = CifarDataset::load(&dataset_dir, config.dataset, Split::Test)?;
    Ok(SplitLoader::test(Arc::new(test), config.batch_size))
}
