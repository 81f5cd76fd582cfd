//! Metrics Module
//!
//! Per-epoch accuracy/loss accumulation and the run-long metric history
//! that is persisted next to the checkpoints.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::charts::{self, DataSeries, YAxis, COLOR_TEST, COLOR_TRAIN};
use super::error::{Result, TrainerError};

/// Accuracy and loss of one pass over a split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Percentage of correctly classified examples, `100 * correct / total`
    pub accuracy: f64,
    /// Sum of the per-batch mean losses
    pub loss: f64,
    pub correct: usize,
    pub total: usize,
}

/// Accumulates batch results into [`EpochMetrics`]
#[derive(Debug, Clone, Default)]
pub struct AccuracyTracker {
    correct: usize,
    total: usize,
    loss_sum: f64,
    batches: usize,
}

impl AccuracyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch: its mean loss, number of correct predictions and size
    pub fn add_batch(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss;
        self.correct += correct;
        self.total += batch_size;
        self.batches += 1;
    }

    /// Running accuracy in percent (0 before any example was seen)
    pub fn accuracy(&self) -> f64 {
        if self.total > 0 {
            100.0 * self.correct as f64 / self.total as f64
        } else {
            0.0
        }
    }

    pub fn count(&self) -> usize {
        self.total
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Finish the pass. Fails when no example was traversed.
    pub fn finish(self, phase: &str) -> Result<EpochMetrics> {
        if self.total == 0 {
            return Err(TrainerError::Training(format!(
                "{} pass traversed no examples",
                phase
            )));
        }

        Ok(EpochMetrics {
            accuracy: self.accuracy(),
            loss: self.loss_sum,
            correct: self.correct,
            total: self.total,
        })
    }
}

/// Train/test accuracy and loss curves, one entry per completed epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricHistory {
    pub train_acc: Vec<f64>,
    pub test_acc: Vec<f64>,
    pub train_loss: Vec<f64>,
    pub test_loss: Vec<f64>,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the results of one epoch to all four curves
    pub fn push(&mut self, train: &EpochMetrics, test: &EpochMetrics) {
        self.train_acc.push(train.accuracy);
        self.test_acc.push(test.accuracy);
        self.train_loss.push(train.loss);
        self.test_loss.push(test.loss);
    }

    /// Number of completed epochs
    pub fn len(&self) -> usize {
        self.train_acc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_acc.is_empty()
    }

    /// Best test accuracy and its 1-based epoch
    pub fn best_test(&self) -> Option<(f64, usize)> {
        self.test_acc
            .iter()
            .enumerate()
            .fold(None, |best: Option<(f64, usize)>, (i, &acc)| match best {
                Some((b, _)) if b >= acc => best,
                _ => Some((acc, i + 1)),
            })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write `{stem}_accuracy.svg` and `{stem}_loss.svg` into `dir`
    pub fn plot(&self, dir: &Path, stem: &str) -> Result<()> {
        charts::write_line_chart(
            &format!("{} accuracy", stem),
            "Epoch",
            "Accuracy",
            YAxis::Percent,
            &[
                DataSeries::new("train", &self.train_acc, COLOR_TRAIN),
                DataSeries::new("test", &self.test_acc, COLOR_TEST),
            ],
            &dir.join(format!("{}_accuracy.svg", stem)),
        )?;

        charts::write_line_chart(
            &format!("{} loss", stem),
            "Epoch",
            "Summed batch loss",
            YAxis::Auto,
            &[
                DataSeries::new("train", &self.train_loss, COLOR_TRAIN),
                DataSeries::new("test", &self.test_loss, COLOR_TEST),
            ],
            &dir.join(format!("{}_loss.svg", stem)),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_tracker() {
        let mut tracker = AccuracyTracker::new();
        tracker.add_batch(0.7, 2, 3);
        tracker.add_batch(0.5, 1, 1);

        let metrics = tracker.finish("train").unwrap();
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.correct, 3);
        assert!((metrics.accuracy - 75.0).abs() < 1e-9);
        assert!((metrics.loss - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_pass_is_an_error() {
        assert!(AccuracyTracker::new().finish("test").is_err());
    }

    #[test]
    fn test_history_lengths_follow_epochs() {
        let mut history = MetricHistory::new();
        let m = EpochMetrics { accuracy: 50.0, loss: 1.0, correct: 1, total: 2 };
        history.push(&m, &m);
        history.push(&m, &m);

        assert_eq!(history.len(), 2);
        assert_eq!(history.test_loss.len(), 2);
        assert_eq!(history.train_acc.len(), 2);
    }

    #[test]
    fn test_best_test_prefers_first_maximum() {
        let history = MetricHistory {
            train_acc: vec![0.0; 4],
            test_acc: vec![10.0, 40.0, 40.0, 30.0],
            train_loss: vec![0.0; 4],
            test_loss: vec![0.0; 4],
        };
        assert_eq!(history.best_test(), Some((40.0, 2)));
        assert_eq!(MetricHistory::new().best_test(), None);
    }

    #[test]
    fn test_history_json_keys() {
        let history = MetricHistory {
            train_acc: vec![10.0],
            test_acc: vec![11.0],
            train_loss: vec![2.0],
            test_loss: vec![2.1],
        };
        let value: serde_json::Value = serde_json::to_value(&history).unwrap();
        for key in ["train_acc", "test_acc", "train_loss", "test_loss"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_history_save_load_and_plot() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = MetricHistory::new();
        let train = EpochMetrics { accuracy: 30.0, loss: 80.0, correct: 3, total: 10 };
        let test = EpochMetrics { accuracy: 25.0, loss: 20.0, correct: 1, total: 4 };
        history.push(&train, &test);

        let path = dir.path().join("curves.json");
        history.save(&path).unwrap();
        assert_eq!(MetricHistory::load(&path).unwrap(), history);

        history.plot(dir.path(), "CIFAR-10_VGG_SGD").unwrap();
        assert!(dir.path().join("CIFAR-10_VGG_SGD_accuracy.svg").exists());
        assert!(dir.path().join("CIFAR-10_VGG_SGD_loss.svg").exists());
    }
}
