//! CIFAR Trainer CLI
//!
//! Entry point for training, evaluating and downloading. The compute
//! device is resolved once here and handed to the library.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cifar_trainer::backend::{ComputeDevice, CpuBackend, CpuTrainingBackend, ResolvedDevice};
#[cfg(feature = "cuda")]
use cifar_trainer::backend::{CudaBackend, CudaTrainingBackend};
use cifar_trainer::dataset::cifar;
use cifar_trainer::model::Architecture;
use cifar_trainer::optim::OptimizerKind;
use cifar_trainer::training::{self, RunSummary};
use cifar_trainer::utils::format_duration;
use cifar_trainer::utils::logging::{init_logging, LogConfig};
use cifar_trainer::{DatasetName, RunConfig};

/// CIFAR-10 / CIFAR-100 image classification with Burn
#[derive(Parser, Debug)]
#[command(name = "cifar_trainer")]
#[command(version)]
#[command(about = "Train and evaluate VGG/ResNet classifiers on CIFAR", long_about = None)]
struct Cli {
    /// Enable verbose logging (batch-level progress)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a network and keep its best checkpoint
    Train(TrainArgs),

    /// Evaluate the best checkpoint of a run on the test split
    Evaluate {
        dataset: DatasetName,
        architecture: Architecture,
        optimizer: OptimizerKind,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Download and unpack a dataset
    Download {
        dataset: DatasetName,

        /// Directory receiving the extracted archive
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },
}

/// Run identity and hyperparameters for `train`
///
/// With `--config` the positionals may be omitted and are taken from the
/// file; any that are given override it.
#[derive(Args, Debug)]
struct TrainArgs {
    /// CIFAR-10 or CIFAR-100
    #[arg(required_unless_present = "config")]
    dataset: Option<DatasetName>,

    /// VGG or ResNet
    #[arg(required_unless_present = "config")]
    architecture: Option<Architecture>,

    /// SGD, Adam or AdaBelief
    #[arg(required_unless_present = "config")]
    optimizer: Option<OptimizerKind>,

    /// Initial learning rate
    #[arg(required_unless_present = "config")]
    learning_rate: Option<f64>,

    /// Base configuration file (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Epoch at which the learning rate is decayed
    #[arg(long)]
    milestone: Option<usize>,

    /// Decay factor applied at the milestone
    #[arg(long)]
    gamma: Option<f64>,

    /// Reset optimizer state when the learning rate is decayed
    #[arg(long, default_value = "false")]
    reset_at_milestone: bool,

    /// Random seed for shuffling and augmentation
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective configuration to this file before training
    #[arg(long)]
    save_config: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

impl TrainArgs {
    /// Merge the config file (if any) with the command-line overrides
    fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => match (self.dataset, self.architecture, self.optimizer, self.learning_rate) {
                (Some(dataset), Some(architecture), Some(optimizer), Some(learning_rate)) => {
                    RunConfig::new(dataset, architecture, optimizer, learning_rate)
                }
                _ => anyhow::bail!(
                    "dataset, architecture, optimizer and learning rate are required without --config"
                ),
            },
        };

        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(architecture) = self.architecture {
            config.architecture = architecture;
        }
        if let Some(optimizer) = self.optimizer {
            config.optimizer = optimizer;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(milestone) = self.milestone {
            config.schedule.milestone = milestone;
        }
        if let Some(gamma) = self.gamma {
            config.schedule.gamma = gamma;
        }
        if self.reset_at_milestone {
            config.schedule.reset = true;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        self.common.apply(&mut config);

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Batch size
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Directory holding the CIFAR archives
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Parent directory of Best_trained_models/ and Plot_curves/
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Compute device
    #[arg(long, value_enum)]
    device: Option<ComputeDevice>,

    /// Fail instead of downloading a missing dataset
    #[arg(long, default_value = "false")]
    no_download: bool,
}

impl CommonArgs {
    fn apply(self, config: &mut RunConfig) {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if self.no_download {
            config.download = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train(args) => {
            let save_config = args.save_config.clone();
            let run_config = args.into_config()?;
            if let Some(path) = save_config {
                run_config.save(&path)?;
                info!("Saved run configuration to {}", path.display());
            }

            cmd_train(&run_config)?;
        }

        Commands::Evaluate {
            dataset,
            architecture,
            optimizer,
            common,
        } => {
            // The learning rate is irrelevant for evaluation
            let mut run_config = RunConfig::new(dataset, architecture, optimizer, 1.0);
            common.apply(&mut run_config);
            cmd_evaluate(&run_config)?;
        }

        Commands::Download { dataset, data_dir } => {
            let dir = cifar::ensure_dataset(&data_dir, dataset, true)?;
            println!(
                "{} {} is ready in {}",
                "✓".green(),
                dataset,
                dir.display()
            );
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════╗
 ║   CIFAR Trainer                                      ║
 ║   VGG / ResNet image classification with Burn        ║
 ╚══════════════════════════════════════════════════════╝"#
            .green()
    );
    println!("  {}\n", format!("v{}", cifar_trainer::VERSION).dimmed());
}

fn cmd_train(config: &RunConfig) -> Result<()> {
    let device = config.device.resolve()?;

    println!("{}", "Run Configuration:".cyan().bold());
    println!("  Run:            {}", config.key());
    println!("  Learning rate:  {}", config.learning_rate);
    println!("  Epochs:         {}", config.epochs);
    println!("  Batch size:     {}", config.batch_size);
    println!(
        "  LR decay:       x{} at epoch {}{}",
        config.schedule.gamma,
        config.schedule.milestone,
        if config.schedule.reset { " (reset)" } else { "" }
    );
    println!(
        "  Last-epoch LR:  {}",
        config.schedule.lr_at(config.epochs, config.learning_rate)
    );
    println!("  Backend:        {}", device.backend_name());
    println!();

    let start = std::time::Instant::now();
    let summary = match device {
        ResolvedDevice::Cpu(device) => training::run::<CpuTrainingBackend>(config, &device)?,
        #[cfg(feature = "cuda")]
        ResolvedDevice::Cuda(device) => training::run::<CudaTrainingBackend>(config, &device)?,
    };

    print_summary(&summary, start.elapsed().as_secs_f64());
    Ok(())
}

fn print_summary(summary: &RunSummary, seconds: f64) {
    println!();
    println!("{}", "Training complete!".green().bold());
    println!("  Run:            {}", summary.key);
    println!("  Epochs:         {}", summary.epochs);
    match summary.best_epoch {
        Some(epoch) => println!(
            "  Best accuracy:  {:.2}% (epoch {})",
            summary.best_accuracy, epoch
        ),
        None => println!("  Best accuracy:  {}", "no checkpoint written".yellow()),
    }
    println!("  Final LR:       {}", summary.final_learning_rate);
    println!("  Duration:       {}", format_duration(seconds));
}

fn cmd_evaluate(config: &RunConfig) -> Result<()> {
    let device = config.device.resolve()?;

    let (meta, metrics) = match device {
        ResolvedDevice::Cpu(device) => training::evaluate_checkpoint::<CpuBackend>(config, &device)?,
        #[cfg(feature = "cuda")]
        ResolvedDevice::Cuda(device) => training::evaluate_checkpoint::<CudaBackend>(config, &device)?,
    };

    println!("{}", "Evaluation:".cyan().bold());
    println!("  Run:            {}", config.key());
    println!("  Saved at epoch: {} ({:.2}%)", meta.epoch, meta.acc);
    println!(
        "  Test accuracy:  {:.2}% ({}/{})",
        metrics.accuracy, metrics.correct, metrics.total
    );
    println!("  Test loss:      {:.4}", metrics.loss);
    Ok(())
}
