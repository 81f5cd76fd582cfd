//! Data Augmentation Module
//!
//! Training-time augmentation for 32x32 CIFAR images: zero-padded random
//! crop followed by a random horizontal flip.
//!
//! # Augmentation Strategy
//!
//! - **Training**: pad, random crop back to the original size, maybe flip
//! - **Test / evaluation**: no augmentation (clean, deterministic input)

use image::{imageops, Rgb, RgbImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Configuration for data augmentation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Zero padding added on every side before cropping (0 = no crop)
    pub crop_padding: u32,
    /// Probability of applying horizontal flip (0.0 - 1.0)
    pub horizontal_flip_prob: f32,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            crop_padding: 4,
            horizontal_flip_prob: 0.5,
        }
    }
}

impl AugmentationConfig {
    /// Disable all augmentations
    pub fn none() -> Self {
        Self {
            crop_padding: 0,
            horizontal_flip_prob: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.crop_padding == 0 && self.horizontal_flip_prob <= 0.0
    }
}

/// Image augmenter that applies random transformations
#[derive(Clone, Debug)]
pub struct Augmenter {
    config: AugmentationConfig,
    image_size: u32,
}

impl Augmenter {
    pub fn new(config: AugmentationConfig, image_size: u32) -> Self {
        Self { config, image_size }
    }

    /// Augment a planar (CHW) RGB byte image and return it in the same layout
    pub fn augment_planar(&self, planar: &[u8], rng: &mut ChaCha8Rng) -> Vec<u8> {
        if self.config.is_identity() {
            return planar.to_vec();
        }
        let img = planar_to_rgb(planar, self.image_size);
        rgb_to_planar(&self.augment(img, rng))
    }

    /// Apply the configured augmentations to an image
    pub fn augment(&self, img: RgbImage, rng: &mut ChaCha8Rng) -> RgbImage {
        let mut result = self.random_crop(img, rng);

        if rng.gen::<f32>() < self.config.horizontal_flip_prob {
            result = imageops::flip_horizontal(&result);
        }

        result
    }

    /// Pad with zeros on every side, then cut a window of the original size
    /// at a uniformly random offset
    fn random_crop(&self, img: RgbImage, rng: &mut ChaCha8Rng) -> RgbImage {
        let padding = self.config.crop_padding;
        if padding == 0 {
            return img;
        }

        let (width, height) = img.dimensions();
        let mut canvas = RgbImage::new(width + 2 * padding, height + 2 * padding);
        imageops::replace(&mut canvas, &img, padding as i64, padding as i64);

        let x = rng.gen_range(0..=2 * padding);
        let y = rng.gen_range(0..=2 * padding);
        imageops::crop_imm(&canvas, x, y, width, height).to_image()
    }
}

/// Planar CHW bytes to an interleaved RGB image
pub fn planar_to_rgb(planar: &[u8], size: u32) -> RgbImage {
    let plane = (size * size) as usize;
    RgbImage::from_fn(size, size, |x, y| {
        let i = (y * size + x) as usize;
        Rgb([planar[i], planar[plane + i], planar[2 * plane + i]])
    })
}

/// Interleaved RGB image to planar CHW bytes
pub fn rgb_to_planar(img: &RgbImage) -> Vec<u8> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut planar = vec![0u8; 3 * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let i = (y * width + x) as usize;
        planar[i] = pixel[0];
        planar[plane + i] = pixel[1];
        planar[2 * plane + i] = pixel[2];
    }

    planar
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const SIZE: u32 = 32;

    fn gradient_planar() -> Vec<u8> {
        let plane = (SIZE * SIZE) as usize;
        let mut planar = vec![0u8; 3 * plane];
        for i in 0..plane {
            planar[i] = (i % 256) as u8;
            planar[plane + i] = ((i / 32) * 7 % 256) as u8;
            planar[2 * plane + i] = 255 - (i % 256) as u8;
        }
        planar
    }

    #[test]
    fn test_planar_round_trip() {
        let planar = gradient_planar();
        let img = planar_to_rgb(&planar, SIZE);
        assert_eq!(img.get_pixel(1, 0)[0], 1);
        assert_eq!(rgb_to_planar(&img), planar);
    }

    #[test]
    fn test_no_augmentation_is_identity() {
        let augmenter = Augmenter::new(AugmentationConfig::none(), SIZE);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let planar = gradient_planar();
        assert_eq!(augmenter.augment_planar(&planar, &mut rng), planar);
    }

    #[test]
    fn test_forced_flip_mirrors_rows() {
        let config = AugmentationConfig {
            crop_padding: 0,
            horizontal_flip_prob: 1.0,
        };
        let augmenter = Augmenter::new(config, SIZE);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let original = planar_to_rgb(&gradient_planar(), SIZE);
        let flipped = augmenter.augment(original.clone(), &mut rng);
        for y in 0..SIZE {
            for x in 0..SIZE {
                assert_eq!(flipped.get_pixel(x, y), original.get_pixel(SIZE - 1 - x, y));
            }
        }
    }

    #[test]
    fn test_padded_crop_keeps_size_and_most_content() {
        let config = AugmentationConfig {
            crop_padding: 4,
            horizontal_flip_prob: 0.0,
        };
        let augmenter = Augmenter::new(config, SIZE);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let white = vec![255u8; (3 * SIZE * SIZE) as usize];

        for _ in 0..20 {
            let out = augmenter.augment_planar(&white, &mut rng);
            assert_eq!(out.len(), white.len());

            // A shift of at most 4 px in each direction leaves a 28x28 core
            let bright = out.iter().filter(|&&p| p == 255).count();
            assert!(bright >= 3 * 28 * 28, "only {} bright bytes", bright);
            assert!(out.iter().all(|&p| p == 0 || p == 255));
        }
    }

    #[test]
    fn test_same_seed_same_augmentation() {
        let augmenter = Augmenter::new(AugmentationConfig::default(), SIZE);
        let planar = gradient_planar();

        let mut rng_a = ChaCha8Rng::seed_from_u64(7);
        let mut rng_b = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(
            augmenter.augment_planar(&planar, &mut rng_a),
            augmenter.augment_planar(&planar, &mut rng_b)
        );
    }
}
