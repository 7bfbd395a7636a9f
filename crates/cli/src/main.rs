use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{DataPaths, Partition, PartitionCode, arrays, partition};
use models::{BiasModel, RatingModel};
use runner::{ExperimentRunner, RunConfig, RunOutcome};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Rating Harness - train and evaluate rating prediction models
#[derive(Parser)]
#[command(name = "rating-harness")]
#[command(about = "Experiment harness for rating prediction models", long_about = None)]
struct Cli {
    #[command(flatten)]
    layout: Layout,

    #[command(subcommand)]
    command: Commands,
}

/// Where inputs are read from and artifacts written to
#[derive(Args)]
struct Layout {
    /// Workspace root; the other directories default to subdirectories of it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Directory holding `<name>.npy` arrays and `<name>_stats.json` files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for RMSE reports and predictions
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Directory for saved models
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Directory for submission files
    #[arg(long, global = true)]
    submissions_dir: Option<PathBuf>,

    /// Full whitespace-separated dataset file
    #[arg(long, global = true)]
    all_data: Option<PathBuf>,

    /// Partition index file aligned with the dataset
    #[arg(long, global = true)]
    all_index: Option<PathBuf>,
}

impl Layout {
    fn paths(&self) -> DataPaths {
        let mut paths = DataPaths::new(&self.root);
        if let Some(dir) = &self.data_dir {
            paths = paths.with_data_dir(dir);
        }
        if let Some(dir) = &self.results_dir {
            paths = paths.with_results_dir(dir);
        }
        if let Some(dir) = &self.models_dir {
            paths = paths.with_models_dir(dir);
        }
        if let Some(dir) = &self.submissions_dir {
            paths = paths.with_submissions_dir(dir);
        }
        if let Some(file) = &self.all_data {
            paths = paths.with_all_data_file(file);
        }
        if let Some(file) = &self.all_index {
            paths = paths.with_all_index_file(file);
        }
        paths
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train a bias model, evaluate it and save the artifacts
    Run {
        /// Training set name (loads `<name>.npy` and `<name>_stats.json`)
        #[arg(long)]
        train: String,

        /// Test set name (loads `<name>.npy`)
        #[arg(long)]
        test: String,

        /// Number of epochs to train
        #[arg(long)]
        epochs: Option<usize>,

        /// Number of latent features (logged only)
        #[arg(long)]
        features: Option<usize>,

        /// Use the model's feature/epoch ordered training
        #[arg(long)]
        feature_epoch_order: bool,

        /// Do not save the model or RMSE report
        #[arg(long)]
        no_files: bool,

        /// Train one epoch at a time and record RMSE after each
        #[arg(long)]
        multi: bool,

        /// SGD learning rate
        #[arg(long, default_value = "0.005")]
        learning_rate: f32,

        /// Bias regularization
        #[arg(long, default_value = "0.02")]
        regularization: f32,
    },

    /// Epoch-by-epoch training with legacy `svd_...` report names
    LegacyMulti {
        #[arg(long)]
        train: String,

        #[arg(long)]
        test: String,

        #[arg(long)]
        epochs: usize,

        #[arg(long)]
        features: Option<usize>,
    },

    /// Predict an array with a saved model and write a submission file
    Submit {
        /// Saved model file
        #[arg(long)]
        model: PathBuf,

        /// Array to predict
        #[arg(long, default_value = "qual")]
        qual: String,

        /// Submission file name
        #[arg(long)]
        out: String,
    },

    /// Stream the records of one partition
    Partition {
        /// Partition code (1 base, 2 valid, 3 hidden, 4 probe, 5 qual)
        #[arg(long, allow_negative_numbers = true)]
        code: PartitionCode,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Save one partition as `<name>.npy` plus `<name>_stats.json`
    Export {
        #[arg(long, allow_negative_numbers = true)]
        code: PartitionCode,

        #[arg(long)]
        name: String,
    },

    /// Verify index alignment and count records per partition
    CheckPartitions,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = cli.layout.paths();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Run {
            train,
            test,
            epochs,
            features,
            feature_epoch_order,
            no_files,
            multi,
            learning_rate,
            regularization,
        } => {
            let mut model = BiasModel::new()
                .with_learning_rate(learning_rate)
                .with_regularization(regularization);
            let mut config = RunConfig::new(train, test)
                .feature_epoch_order(feature_epoch_order)
                .create_files(!no_files)
                .run_multi(multi);
            config.epochs = epochs;
            config.features = features;
            handle_run(paths, &mut model, &config)?
        }
        Commands::LegacyMulti {
            train,
            test,
            epochs,
            features,
        } => handle_legacy_multi(paths, &train, &test, epochs, features)?,
        Commands::Submit { model, qual, out } => handle_submit(paths, &model, &qual, &out)?,
        Commands::Partition { code, limit } => handle_partition(paths, code, limit)?,
        Commands::Export { code, name } => handle_export(paths, code, &name)?,
        Commands::CheckPartitions => handle_check_partitions(paths)?,
    }

    Ok(())
}

/// Handle the 'run' command
fn handle_run(paths: DataPaths, model: &mut dyn RatingModel, config: &RunConfig) -> Result<()> {
    let mut runner = ExperimentRunner::new(paths);
    let start = Instant::now();

    match runner.run(model, config)? {
        RunOutcome::Aborted => println!("{}", "Run aborted, nothing was trained".yellow()),
        RunOutcome::Completed(report) => {
            println!("{} Run finished in {:?}", "✓".green(), start.elapsed());
            for (epoch, rmse) in report.epoch_rmses.iter().enumerate() {
                println!("  Epoch {:>3}: RMSE {:.5}", epoch + 1, rmse);
            }
            if let Some(rmse) = report.final_rmse {
                println!("{}", format!("Final RMSE: {:.5}", rmse).bold().blue());
            }
            if let Some(path) = report.rmse_path {
                println!("{}RMSE report: {}", "• ".cyan(), path.display());
            }
            if let Some(path) = report.model_path {
                println!("{}Model: {}", "• ".cyan(), path.display());
            }
        }
    }
    Ok(())
}

/// Handle the 'legacy-multi' command
fn handle_legacy_multi(
    paths: DataPaths,
    train: &str,
    test: &str,
    epochs: usize,
    features: Option<usize>,
) -> Result<()> {
    let mut runner = ExperimentRunner::new(paths);
    let mut model = BiasModel::new();

    let rmses = runner.old_run_multi(&mut model, train, test, epochs, features)?;
    for (epoch, rmse) in rmses.iter().enumerate() {
        println!("  Epoch {:>3}: RMSE {:.5}", epoch + 1, rmse);
    }
    Ok(())
}

/// Handle the 'submit' command
fn handle_submit(paths: DataPaths, model_path: &Path, qual: &str, out: &str) -> Result<()> {
    let model = BiasModel::load(model_path)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    let points = arrays::load_array(&paths.array_path(qual))
        .with_context(|| format!("Failed to load \"{}\" array", qual))?;

    info!("Predicting {} points from \"{}\"", points.nrows(), qual);
    let predictions = model.predict(&points)?;
    paths
        .ensure_output_dirs()
        .context("Failed to create output directories")?;
    let path = data_loader::write_submission(&paths, predictions.iter().copied(), out)?;

    println!(
        "{} Wrote {} predictions to {}",
        "✓".green(),
        predictions.len(),
        path.display()
    );
    Ok(())
}

/// Handle the 'partition' command
fn handle_partition(paths: DataPaths, code: PartitionCode, limit: Option<usize>) -> Result<()> {
    let stream = partition::stream_partition(&paths, code)?;
    let limit = limit.unwrap_or(usize::MAX);

    for record in stream.take(limit) {
        let (user, movie, time, rating) = record?.fields();
        println!("{} {} {} {}", user, movie, time, rating);
    }
    Ok(())
}

/// Handle the 'export' command
fn handle_export(paths: DataPaths, code: PartitionCode, name: &str) -> Result<()> {
    let start = Instant::now();
    let points = arrays::collect_points(partition::stream_partition(&paths, code)?)
        .with_context(|| format!("Failed to read partition {}", code))?;
    if points.nrows() == 0 {
        bail!("Partition {} has no records", code);
    }

    info!("Collected {} points from partition {}", points.nrows(), code);
    let stats = arrays::compute_stats(&points);
    arrays::save_array(&paths.array_path(name), &points)?;
    arrays::save_stats(&paths.stats_path(name), &stats)?;

    println!(
        "{} Exported {} points as \"{}\" in {:?}",
        "✓".green(),
        points.nrows(),
        name,
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'check-partitions' command
fn handle_check_partitions(paths: DataPaths) -> Result<()> {
    let lines = partition::validate_alignment(&paths)?;
    println!("{} Index file aligned with {} records", "✓".green(), lines);

    let counts = partition::count_partitions(&paths)?;
    println!("{}", "Partition sizes:".bold().blue());
    for p in Partition::ALL {
        let count = counts.get(p);
        println!("  - {:<7} (code {}): {}", p.to_string(), p.code(), count);
    }

    let unassigned = counts.unassigned();
    if unassigned > 0 {
        println!(
            "{}",
            format!("{} records carry an unknown partition code", unassigned).yellow()
        );
    }
    println!("  Total: {}", counts.total);
    Ok(())
}
