//! Command implementations for vigilctl

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use vigil_common::{
    publish, Collector, HealthReport, Pipeline, ReportSink, SensorSource, Snapshot, VigilConfig,
    VigilError,
};

use crate::cli::{CheckArgs, Cli, Commands};
use crate::host;
use crate::sinks::{colors_enabled, ConsoleSink, JsonFileSink, JsonStdoutSink};
use crate::sinks::console::render_host;
use crate::sources;

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        None => check(config, &CheckArgs::default()).await.map(|_| ()),
        Some(Commands::Check(args)) => check(config, &args).await.map(|_| ()),
        Some(Commands::Readings { output }) => readings(&config, output.as_deref()).await,
        Some(Commands::Host { json }) => show_host(json).await,
        Some(Commands::Config { default, write }) => show_config(&config, default, write),
    }
}

/// An explicit `--config` must load; the search path falls back to defaults
pub fn load_config(explicit: Option<&Path>) -> Result<VigilConfig> {
    let Some(path) = explicit else {
        return Ok(VigilConfig::load());
    };
    VigilConfig::load_from_path(path)
        .map_err(|e| match e {
            VigilError::Io(io) => {
                VigilError::InvalidConfig(format!("cannot read {}: {}", path.display(), io))
            }
            other => other,
        })
        .with_context(|| format!("loading config {}", path.display()))
}

/// Fold command-line overrides into the loaded config
pub fn apply_check_overrides(mut config: VigilConfig, args: &CheckArgs) -> Result<VigilConfig> {
    if let Some(ms) = args.deadline_ms {
        config.collection.pass_deadline_ms = ms;
    }
    if let Some(dir) = &args.log_dir {
        config.report.log_dir = dir.clone();
    }
    if args.no_log {
        config.report.write_log = false;
    }
    config.validate()?;
    Ok(config)
}

fn check_sinks(config: &VigilConfig, args: &CheckArgs) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();
    if args.json {
        sinks.push(Box::new(JsonStdoutSink));
    } else {
        sinks.push(Box::new(ConsoleSink::new(colors_enabled(args.no_color))));
    }
    if config.report.write_log {
        sinks.push(Box::new(JsonFileSink::new(config.report.log_dir.clone())));
    }
    sinks
}

fn source_for(args: &CheckArgs) -> Result<Arc<dyn SensorSource>> {
    match &args.snapshot {
        Some(path) => sources::from_snapshot(path),
        None => Ok(sources::detect()),
    }
}

/// Run one health check and publish it
pub async fn check(config: VigilConfig, args: &CheckArgs) -> Result<HealthReport> {
    let config = apply_check_overrides(config, args)?;
    let source = source_for(args)?;

    let pipeline = Pipeline::new(&config);
    let report = pipeline.run(source).await?;
    debug!(
        "Report assembled: score {:?}, {} findings",
        report.score(),
        report.findings().len()
    );

    publish(&report, &check_sinks(&config, args))?;
    Ok(report)
}

/// Collect without scoring and emit the reading set as a snapshot
pub async fn readings(config: &VigilConfig, output: Option<&Path>) -> Result<()> {
    let source = sources::detect();
    let snapshot = capture(config, source).await;
    let json = serde_json::to_string_pretty(&snapshot)?;

    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!("Wrote {} readings to {}", snapshot.readings.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn capture(config: &VigilConfig, source: Arc<dyn SensorSource>) -> Snapshot {
    let name = source.name().to_string();
    let collection = Collector::from_config(&config.collection)
        .collect(source)
        .await;
    Snapshot {
        captured_at: collection.timestamp,
        source: name,
        readings: collection.readings,
        host: collection.host,
    }
}

async fn show_host(json: bool) -> Result<()> {
    let info = tokio::task::spawn_blocking(host::probe)
        .await
        .context("host probe failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", render_host(&info, colors_enabled(false)));
    }
    Ok(())
}

fn show_config(config: &VigilConfig, default: bool, write: Option<PathBuf>) -> Result<()> {
    if let Some(path) = write {
        VigilConfig::save_default(&path)
            .with_context(|| format!("cannot write default config to {}", path.display()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let toml = if default {
        VigilConfig::default().to_toml_string()?
    } else {
        config.to_toml_string()?
    };
    print!("{}", toml);
    Ok(())
}
