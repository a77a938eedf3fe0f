//! EMA Command Line Interface
//!
//! Evaluates the EMA classifier online over encoded sparse datasets or raw
//! Greenberg command logs, and encodes Greenberg logs into the sparse format.

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use ema::api::OnlineSession;
use ema::core::{EmaConfig, Result};
use ema::data::sparse::write_example;
use ema::report::{format_summary, OutcomeWriter, SummaryReport};
use ema::GreenbergFeaturizer;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "ema")]
#[command(about = "Online sparse multiclass classification with EMA")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "EMA Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate encoded sparse datasets (predict, then learn)
    Run(RunArgs),
    /// Evaluate raw Greenberg command logs
    Greenberg(RunArgs),
    /// Encode Greenberg command logs into the sparse format
    Encode(EncodeArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Input files, each evaluated with a fresh classifier
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON file with hyperparameters; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Boost value b, 0 < b <= 1
    #[arg(short, long)]
    boost: Option<f64>,

    /// Margin threshold d
    #[arg(short, long)]
    margin: Option<f64>,

    /// Pruning threshold for small weights
    #[arg(short, long)]
    prune: Option<f64>,

    /// Initial number of feature rows
    #[arg(long)]
    rows: Option<usize>,

    /// Initial number of class columns
    #[arg(long)]
    cols: Option<usize>,

    /// Maximum number of examples per file
    #[arg(short, long)]
    limit: Option<usize>,

    /// Write per-example outcomes to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save JSON summaries of every file to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl RunArgs {
    /// Defaults, then the config file, then explicit flags
    fn to_config(&self) -> Result<EmaConfig> {
        let mut config = match &self.config {
            Some(path) => EmaConfig::from_json_file(path)?,
            None => EmaConfig::default(),
        };
        if let Some(boost) = self.boost {
            config.boost = boost;
        }
        if let Some(margin) = self.margin {
            config.margin = margin;
        }
        if let Some(prune) = self.prune {
            config.prune_threshold = prune;
        }
        if self.rows.is_some() || self.cols.is_some() {
            let (rows, cols) = config.initial_shape.unwrap_or((1, 1));
            config.initial_shape = Some((self.rows.unwrap_or(rows), self.cols.unwrap_or(cols)));
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
struct EncodeArgs {
    /// Greenberg log files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Maximum number of examples per file
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save the vocabulary of the last file as JSON
    #[arg(long)]
    vocabulary: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum InputFormat {
    Sparse,
    Greenberg,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Run(args) => run_command(args, InputFormat::Sparse),
        Commands::Greenberg(args) => run_command(args, InputFormat::Greenberg),
        Commands::Encode(args) => encode_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(args: RunArgs, format: InputFormat) -> Result<()> {
    let config = args.to_config()?;
    info!(
        "Parameters: boost={}, margin={}, prune={}",
        config.boost, config.margin, config.prune_threshold
    );

    let mut session = OnlineSession::new().with_config(config);
    if let Some(limit) = args.limit {
        session = session.with_limit(limit);
    }

    let mut writer = match &args.output {
        Some(path) => Some(OutcomeWriter::create(path)?),
        None => None,
    };
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        info!("Processing {path:?}");
        let started = Utc::now();

        let result = match format {
            InputFormat::Sparse => session.run_file(path, writer.as_mut())?,
            InputFormat::Greenberg => {
                let mut featurizer = GreenbergFeaturizer::new();
                let result = session.run_greenberg_file(path, &mut featurizer, writer.as_mut())?;
                info!(
                    "Vocabulary: {} classes, {} features",
                    featurizer.n_classes(),
                    featurizer.n_features()
                );
                result
            }
        };

        let elapsed = Utc::now() - started;
        info!(
            "Time spent: {:.3}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
        info!(
            "Examples: {}, updates: {}",
            result.summary.examples, result.summary.updates
        );
        println!("{}", format_summary(&result.summary));

        reports.push(SummaryReport::new(
            path.display().to_string(),
            &result.summary,
            &result.classifier,
            started,
        ));
    }

    if let Some(writer) = writer.as_mut() {
        writer.flush()?;
    }
    if let Some(path) = &args.report {
        SummaryReport::save_all(&reports, path)?;
        info!("Report saved to: {path:?}");
    }

    Ok(())
}

fn encode_command(args: EncodeArgs) -> Result<()> {
    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let limit = args.limit.unwrap_or(usize::MAX);

    let mut last_featurizer = None;
    for path in &args.files {
        info!("Encoding {path:?}");
        // Every file gets its own vocabulary
        let mut featurizer = GreenbergFeaturizer::new();
        let reader = BufReader::new(File::open(path)?);
        for example in featurizer.encode(reader).take(limit) {
            write_example(&mut output, &example?)?;
        }
        last_featurizer = Some(featurizer);
    }
    output.flush()?;

    if let (Some(path), Some(featurizer)) = (&args.vocabulary, &last_featurizer) {
        featurizer.save_vocabulary(path)?;
        info!("Vocabulary saved to: {path:?}");
    }

    Ok(())
}
