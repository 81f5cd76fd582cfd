//! CIFAR binary format loader and downloader
//!
//! Records are fixed size: one label byte (CIFAR-10) or a coarse and a fine
//! label byte (CIFAR-100), followed by 3072 pixel bytes laid out as the
//! 1024-byte red plane, then green, then blue.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::{CifarItem, DatasetName, Split, PIXELS_PER_IMAGE};
use crate::utils::error::{Result, TrainerError};

/// Parse a buffer of concatenated records
pub fn parse_records(bytes: &[u8], dataset: DatasetName) -> Result<Vec<CifarItem>> {
    let record_size = dataset.record_size();
    if bytes.len() % record_size != 0 {
        return Err(TrainerError::Dataset(format!(
            "{} buffer of {} bytes is not a whole number of {}-byte records",
            dataset,
            bytes.len(),
            record_size
        )));
    }

    let label_offset = dataset.label_bytes() - 1;
    let num_classes = dataset.num_classes();

    bytes
        .chunks_exact(record_size)
        .enumerate()
        .map(|(i, record)| {
            let label = record[label_offset] as usize;
            if label >= num_classes {
                return Err(TrainerError::Dataset(format!(
                    "record {} has label {} outside 0..{}",
                    i, label, num_classes
                )));
            }
            let pixels = &record[dataset.label_bytes()..];
            debug_assert_eq!(pixels.len(), PIXELS_PER_IMAGE);
            Ok(CifarItem::new(pixels.to_vec(), label))
        })
        .collect()
}

/// Load one binary file
pub fn load_file(path: &Path, dataset: DatasetName) -> Result<Vec<CifarItem>> {
    let bytes = fs::read(path).map_err(|e| {
        TrainerError::Dataset(format!("failed to read {}: {}", path.display(), e))
    })?;
    let items = parse_records(&bytes, dataset)
        .map_err(|e| TrainerError::Dataset(format!("{}: {}", path.display(), e)))?;
    debug!("Loaded {} records from {}", items.len(), path.display());
    Ok(items)
}

/// Load every file of a split, in file order
pub fn load_split(dataset_dir: &Path, dataset: DatasetName, split: Split) -> Result<Vec<CifarItem>> {
    let mut items = Vec::new();
    for file in split.files(dataset) {
        items.extend(load_file(&dataset_dir.join(file), dataset)?);
    }
    Ok(items)
}

/// Whether every train and test file of the dataset is present
pub fn is_available(dataset_dir: &Path, dataset: DatasetName) -> bool {
    dataset
        .train_files()
        .iter()
        .chain(dataset.test_files())
        .all(|file| dataset_dir.join(file).is_file())
}

/// Make sure the binary files exist below `data_dir`, downloading and
/// unpacking the archive when allowed. Returns the extracted directory.
pub fn ensure_dataset(data_dir: &Path, dataset: DatasetName, download: bool) -> Result<PathBuf> {
    let dataset_dir = data_dir.join(dataset.extracted_dir());
    if is_available(&dataset_dir, dataset) {
        return Ok(dataset_dir);
    }
    if !download {
        return Err(TrainerError::DatasetNotFound(dataset_dir));
    }

    fs::create_dir_all(data_dir)?;
    let archive_path = data_dir.join(dataset.archive_name());
    if archive_path.exists() {
        info!("{} archive already present, skipping download", dataset);
    } else {
        download_archive(dataset.archive_url(), &archive_path)?;
    }

    info!("Extracting {}...", archive_path.display());
    extract_tar_gz(&archive_path, data_dir)?;

    if !is_available(&dataset_dir, dataset) {
        return Err(TrainerError::Dataset(format!(
            "archive {} did not contain the expected files under {}",
            archive_path.display(),
            dataset_dir.display()
        )));
    }
    Ok(dataset_dir)
}

fn download_archive(url: &str, destination: &Path) -> Result<()> {
    info!("Downloading {}...", url);

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| TrainerError::Download(format!("{}: {}", url, e)))?;

    let pb = match response.content_length() {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    // Write to a sibling file first so an interrupted download is never
    // mistaken for a complete archive
    let partial = destination.with_extension("part");
    let file = File::create(&partial)?;
    let mut writer = pb.wrap_write(file);
    let written = response
        .copy_to(&mut writer)
        .map_err(|e| TrainerError::Download(format!("failed to read response body: {}", e)))?;
    writer.flush()?;
    pb.finish_and_clear();

    fs::rename(&partial, destination)?;

    info!("Downloaded {} bytes to {}", written, destination.display());
    Ok(())
}

fn extract_tar_gz(archive_path: &Path, output_dir: &Path) -> Result<()> {
    let tar_gz = File::open(archive_path)?;
    let decompressor = flate2::read::GzDecoder::new(tar_gz);
    let mut archive = tar::Archive::new(decompressor);

    archive.unpack(output_dir).map_err(|e| {
        TrainerError::Dataset(format!("failed to extract {}: {}", archive_path.display(), e))
    })
}

/// Per-class example counts
pub fn class_counts(items: &[CifarItem], num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; num_classes];
    for item in items {
        if let Some(count) = counts.get_mut(item.label) {
            *count += 1;
        }
    }
    counts
}
