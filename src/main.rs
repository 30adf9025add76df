//! Thin CLI over the inference library.
//!
//! Reads pre-ingested storm track JSON (produced by the ingestion
//! collaborator), loads model artifacts, runs single-pass or batch
//! inference, and writes forecast result JSON for reporting collaborators.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hurricane_inference::{
    forecast_all_anchors, forecast_fleet, ForecastConfig, ForecastModel, HorizonPredictor,
    ModelDescriptor, ModelVariant, RobustScaler, SingularEnsemble, StormTrack, TargetVariable,
    UniversalModel,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Model configuration descriptor filename inside an artifact directory.
const DESCRIPTOR_FILE: &str = "hyperparameters.json";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Multi-horizon hurricane intensity and track inference"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Single-pass inference for every storm in an ingested track file
    Live {
        /// Directory containing serialized artifacts (models, scalers)
        #[arg(long)]
        base_dir: PathBuf,

        /// Model weights filename inside the base directory
        #[arg(long)]
        model_file: String,

        /// Scaler artifact filename inside the base directory
        #[arg(long)]
        scaler_file: String,

        /// Ingested storm tracks (JSON array)
        #[arg(long)]
        storms: PathBuf,

        /// Output path for the forecast results
        #[arg(long, default_value = "results/forecasts.json")]
        output: PathBuf,
    },

    /// Batch evaluation over every eligible anchor timestamp
    Batch {
        /// Run configuration file
        #[arg(long)]
        config: PathBuf,

        /// Historical storm tracks (JSON array)
        #[arg(long)]
        track: PathBuf,

        /// Restrict the run to one storm id
        #[arg(long)]
        storm: Option<String>,

        /// Directory for per-storm result files
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

/// Batch run configuration. Key names follow the deployed config files.
#[derive(Debug, Deserialize)]
struct RunConfig {
    base_directory: PathBuf,
    model_file: String,
    scaler_file: String,
    #[serde(default)]
    univariate: Option<UnivariateConfig>,
    #[serde(default)]
    lag: Option<usize>,
    #[serde(default)]
    horizons: Option<Vec<i64>>,
}

/// Artifact set for the singular (one variable per model) ensemble.
#[derive(Debug, Deserialize)]
struct UnivariateConfig {
    base_directory: PathBuf,
    scaler_file: String,
    wind_model: String,
    lat_model: String,
    lon_model: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Command::Live {
            base_dir,
            model_file,
            scaler_file,
            storms,
            output,
        } => run_live(&base_dir, &model_file, &scaler_file, &storms, &output),
        Command::Batch {
            config,
            track,
            storm,
            output_dir,
        } => run_batch(&config, &track, storm.as_deref(), &output_dir),
    }
}

fn run_live(
    base_dir: &Path,
    model_file: &str,
    scaler_file: &str,
    storms: &Path,
    output: &Path,
) -> Result<()> {
    let mut model = load_universal(base_dir, model_file, scaler_file)?;
    let tracks = load_tracks(storms)?;
    let config = ForecastConfig::default();

    let outcome = forecast_fleet(&tracks, &mut model, &config)?;
    for forecast in &outcome.forecasts {
        info!(storm = %forecast.storm_id, anchor = %forecast.anchor_time, "forecast issued");
        for horizon in &forecast.horizons {
            info!(
                "  +{:>2}h  {:6.1} kt  ({:7.2}, {:7.2})",
                horizon.horizon_hours,
                horizon.forecast.wind,
                horizon.forecast.lat,
                horizon.forecast.lon
            );
        }
    }

    write_json(output, &outcome)?;
    info!(
        forecasts = outcome.forecasts.len(),
        skipped = outcome.skipped.len(),
        path = %output.display(),
        "live run complete"
    );
    Ok(())
}

fn run_batch(
    config_path: &Path,
    track_path: &Path,
    storm: Option<&str>,
    output_dir: &Path,
) -> Result<()> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let run_config: RunConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", config_path.display()))?;

    let config = ForecastConfig {
        lag: run_config.lag.unwrap_or(5),
        horizons: run_config
            .horizons
            .clone()
            .unwrap_or_else(|| vec![6, 12, 24, 36, 48]),
    };

    let mut universal = load_universal(
        &run_config.base_directory,
        &run_config.model_file,
        &run_config.scaler_file,
    )?;
    let mut singular = run_config
        .univariate
        .as_ref()
        .map(load_singular)
        .transpose()?;

    let tracks = load_tracks(track_path)?;
    for track in tracks
        .iter()
        .filter(|t| storm.map_or(true, |id| t.id == id))
    {
        info!(storm = %track.id, name = %track.name, "running batch inference");
        run_batch_variant(track, &mut universal, &config, output_dir, "universal")?;
        if let Some(ensemble) = singular.as_mut() {
            run_batch_variant(track, ensemble, &config, output_dir, "singular")?;
        }
    }
    Ok(())
}

fn run_batch_variant<P: HorizonPredictor>(
    track: &StormTrack,
    predictor: &mut P,
    config: &ForecastConfig,
    output_dir: &Path,
    variant: &str,
) -> Result<()> {
    match forecast_all_anchors(track, predictor, config) {
        Ok(results) => {
            let path = output_dir.join(format!("{}_{variant}.json", track.id));
            write_json(&path, &results)?;
            info!(anchors = results.len(), path = %path.display(), "batch results written");
            Ok(())
        }
        Err(e @ hurricane_inference::Error::InsufficientData { .. }) => {
            warn!(storm = %track.id, "skipping storm: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn load_universal(base_dir: &Path, model_file: &str, scaler_file: &str) -> Result<UniversalModel> {
    let descriptor = ModelDescriptor::load(&base_dir.join(DESCRIPTOR_FILE))?;
    let variant = descriptor
        .variant()
        .context("descriptor does not select a model variant")?;
    let scaler = RobustScaler::load(&base_dir.join(scaler_file))?;
    let model = ForecastModel::load(
        &base_dir.join(model_file),
        variant,
        descriptor.forecast_steps,
        scaler,
    )?;
    Ok(UniversalModel::new(model)?)
}

fn load_singular(config: &UnivariateConfig) -> Result<SingularEnsemble> {
    let base = &config.base_directory;
    let descriptor = ModelDescriptor::load(&base.join(DESCRIPTOR_FILE))?;
    let steps = descriptor.forecast_steps;

    let load_one = |file: &str, target: TargetVariable| -> Result<ForecastModel> {
        let scaler = RobustScaler::load(&base.join(&config.scaler_file))?;
        Ok(ForecastModel::load(
            &base.join(file),
            ModelVariant::Singular(target),
            steps,
            scaler,
        )?)
    };

    Ok(SingularEnsemble::new(
        load_one(&config.wind_model, TargetVariable::Wind)?,
        load_one(&config.lat_model, TargetVariable::Lat)?,
        load_one(&config.lon_model, TargetVariable::Lon)?,
    )?)
}

fn load_tracks(path: &Path) -> Result<Vec<StormTrack>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read storm tracks {}", path.display()))?;
    let tracks: Vec<StormTrack> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse storm tracks {}", path.display()))?;
    info!(count = tracks.len(), path = %path.display(), "loaded storm tracks");
    Ok(tracks)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
