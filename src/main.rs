use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cgm_meal_rs::config::{CovarianceSum, CrossCovariance, MealDetectorConfig, RowAlignment};
use cgm_meal_rs::input::{self, DEFAULT_FIELD};
use cgm_meal_rs::output::{ResultTableWriter, TraceWriter};
use cgm_meal_rs::MealDetector;

#[derive(Parser, Debug)]
#[command(name = "cgm_meal")]
#[command(about = "UKF-based meal detection over a CGM glucose series", long_about = None)]
struct Args {
    /// CGM samples (.json, .json.gz, or plain text numbers)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Name of the sample array inside a JSON object
    #[arg(long, default_value = DEFAULT_FIELD)]
    field: String,

    /// Result table path
    #[arg(long, default_value = "resultKalmanFilter/result.csv")]
    output: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write every filter intermediate as JSON lines
    #[arg(long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Prior covariance accumulation
    #[arg(long, value_enum)]
    covariance_sum: Option<CovarianceSum>,

    /// Cross-covariance deviations
    #[arg(long, value_enum)]
    cross_covariance: Option<CrossCovariance>,

    /// Filter index reported on each row
    #[arg(long, value_enum)]
    row_alignment: Option<RowAlignment>,

    /// Sigma point spread
    #[arg(long, allow_negative_numbers = true)]
    alpha: Option<f64>,

    /// Distribution prior (2.0 for Gaussian)
    #[arg(long, allow_negative_numbers = true)]
    beta: Option<f64>,

    /// Secondary scaling
    #[arg(long, allow_negative_numbers = true)]
    kappa: Option<f64>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn build_config(&self) -> Result<MealDetectorConfig> {
        let mut config = match &self.config {
            Some(path) => MealDetectorConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => MealDetectorConfig::default(),
        };

        if let Some(sum) = self.covariance_sum {
            config.variants.covariance_sum = sum;
        }
        if let Some(cross) = self.cross_covariance {
            config.variants.cross_covariance = cross;
        }
        if let Some(alignment) = self.row_alignment {
            config.variants.row_alignment = alignment;
        }
        if let Some(alpha) = self.alpha {
            config.unscented.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            config.unscented.beta = beta;
        }
        if let Some(kappa) = self.kappa {
            config.unscented.kappa = kappa;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = args.build_config()?;
    log::info!("Configuration: {}", serde_json::to_string(&config)?);

    let samples = input::load_samples(&args.input, &args.field)?;
    log::info!("Loaded {} samples from {}", samples.len(), args.input.display());

    let detector = MealDetector::new(&config, &samples)?;
    let mut table = ResultTableWriter::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let summary = match &args.trace {
        Some(path) => {
            let mut trace = TraceWriter::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            detector.run_with_trace(&mut table, &mut trace)
        }
        None => detector.run(&mut table),
    }
    .with_context(|| format!("writing {}", args.output.display()))?;

    log::info!("Results written to {} ({} rows)", args.output.display(), summary.rows_written);
    Ok(())
}
