//! Logging Module
//!
//! Structured logging built on the `tracing` crate, plus the epoch and
//! batch progress loggers used by the training loop.

use std::time::{Duration, Instant};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use super::error::{Result, TrainerError};

/// Subscriber settings chosen by the CLI
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Prefix each line with the emitting module
    pub show_target: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            show_target: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Batch-level progress and module paths
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            show_target: true,
            ..Self::default()
        }
    }

    /// Warnings and errors only
    pub fn quiet() -> Self {
        Self {
            level: Level::WARN,
            ..Self::default()
        }
    }
}

/// Install the global `tracing` subscriber
///
/// Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_target(config.show_target)
        .with_ansi(config.ansi)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| TrainerError::Config(format!("logging already initialized: {}", e)))
}

/// Batch progress within one pass over a split
pub struct BatchProgress {
    phase: &'static str,
    log_interval: usize,
    batches: usize,
    start_time: Instant,
}

impl BatchProgress {
    pub fn new(phase: &'static str) -> Self {
        Self {
            phase,
            log_interval: 50,
            batches: 0,
            start_time: Instant::now(),
        }
    }

    /// Log every `interval` batches instead of the default 50
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval.max(1);
        self
    }

    /// Record one processed batch with its loss and the running accuracy
    pub fn update(&mut self, batch_loss: f64, running_accuracy: f64) {
        self.batches += 1;

        if self.batches % self.log_interval == 0 {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            tracing::debug!(
                "{} batch {:>5}: loss = {:.4}, acc = {:.2}% ({:.1} batches/s)",
                self.phase,
                self.batches,
                batch_loss,
                running_accuracy,
                self.batches as f64 / elapsed.max(f64::EPSILON)
            );
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }
}

/// Epoch-level progress for a full run
pub struct TrainingLogger {
    total_epochs: usize,
    run_start: Instant,
    epoch_start: Instant,
    elapsed_epochs: Duration,
}

impl TrainingLogger {
    pub fn new(total_epochs: usize) -> Self {
        let now = Instant::now();
        Self {
            total_epochs,
            run_start: now,
            epoch_start: now,
            elapsed_epochs: Duration::ZERO,
        }
    }

    /// Epochs are numbered from 1
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch_start = Instant::now();
        tracing::info!("Epoch {}/{}", epoch, self.total_epochs);
    }

    /// `train` and `test` are `(accuracy, loss)` pairs
    pub fn end_epoch(
        &mut self,
        epoch: usize,
        train: (f64, f64),
        test: (f64, f64),
        learning_rate: f64,
    ) {
        let took = self.epoch_start.elapsed();
        self.elapsed_epochs += took;

        let remaining = self.total_epochs.saturating_sub(epoch) as u32;
        let eta = self.elapsed_epochs / epoch.max(1) as u32 * remaining;

        tracing::info!(
            "Epoch {}/{} [{}] train {:.2}% / {:.4} | test {:.2}% / {:.4} | lr {:.6} | eta {}",
            epoch,
            self.total_epochs,
            super::format_duration(took.as_secs_f64()),
            train.0,
            train.1,
            test.0,
            test.1,
            learning_rate,
            super::format_duration(eta.as_secs_f64())
        );
    }

    pub fn log_new_best(&self, accuracy: f64, epoch: usize) {
        tracing::info!("New best test accuracy {:.2}% at epoch {}", accuracy, epoch);
    }

    pub fn log_complete(&self, best_accuracy: f64, best_epoch: Option<usize>) {
        let best = match best_epoch {
            Some(epoch) => format!("{:.2}% at epoch {}", best_accuracy, epoch),
            None => "none".to_string(),
        };
        tracing::info!(
            "Finished {} epochs in {}, best test accuracy {}",
            self.total_epochs,
            super::format_duration(self.run_start.elapsed().as_secs_f64()),
            best
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_presets() {
        assert_eq!(LogConfig::default().level, Level::INFO);
        assert_eq!(LogConfig::verbose().level, Level::DEBUG);
        assert!(LogConfig::verbose().show_target);
        assert_eq!(LogConfig::quiet().level, Level::WARN);
    }

    #[test]
    fn test_training_logger_tracks_epochs() {
        let mut logger = TrainingLogger::new(3);
        logger.start_epoch(1);
        logger.end_epoch(1, (50.0, 10.0), (55.0, 2.0), 0.1);
        logger.start_epoch(2);
        logger.end_epoch(2, (60.0, 8.0), (58.0, 1.8), 0.1);
        assert!(logger.elapsed_epochs <= logger.run_start.elapsed());
    }

    #[test]
    fn test_batch_progress_counts() {
        let mut progress = BatchProgress::new("train").with_interval(0);
        progress.update(2.3, 10.0);
        progress.update(2.1, 12.5);
        assert_eq!(progress.batches(), 2);
    }
}
