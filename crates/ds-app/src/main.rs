use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use ds_audio::decode::FileSource;
use ds_audio::tone::ToneSource;
use ds_core::config::{PipelineConfig, load_config};
use ds_core::traits::SampleSource;
use ds_pipeline::runtime::spawn_pipeline;
use ds_pipeline::sink::UdpSink;

pub mod cli;
pub mod observe;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider la source
    cli.validate_source()?;

    // Mode observateur
    if let Some(addr) = cli.observe {
        let stop = Arc::new(AtomicBool::new(false));
        install_ctrlc(Arc::clone(&stop))?;
        let observer = observe::Observer::bind(addr)?;
        let frames = observe::run(observer, &stop, cli.max_frames)?;
        println!("frames={frames}");
        return Ok(());
    }

    // 4. Charger la config
    let mut config = resolve_config(&cli)?;

    // 4b. Appliquer les overrides CLI
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(capacity) = cli.queue_capacity {
        config.queue_capacity = capacity;
    }
    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);

    // 5. Source et sink
    let source = open_source(&cli, &config)?;
    let sink = UdpSink::bind(cli.targets.clone())?;

    // 6. Démarrer producteur et consommateur
    let handle = spawn_pipeline(config, source, sink, cli.max_frames)?;
    install_ctrlc(handle.stop_flag())?;

    // 7. Attendre la fin et afficher les compteurs
    let stats = handle.join()?;
    println!("{stats}");
    Ok(())
}

fn install_ctrlc(stop: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Interruption reçue, arrêt en cours...");
        stop.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl-C handler")
}

/// Build the sample source selected on the command line.
fn open_source(cli: &cli::Cli, config: &PipelineConfig) -> Result<Box<dyn SampleSource>> {
    if let Some(freq) = cli.tone {
        log::info!("Tone source: {freq}Hz, amplitude {}", cli.amplitude);
        return Ok(Box::new(
            ToneSource::new(freq, cli.amplitude, config.sample_rate).paced(),
        ));
    }
    if let Some(ref path) = cli.file {
        return Ok(Box::new(FileSource::open(path, cli.looping)?.paced()));
    }
    open_mic(config.sample_count)
}

#[cfg(feature = "mic")]
fn open_mic(block: usize) -> Result<Box<dyn SampleSource>> {
    Ok(Box::new(ds_audio::capture::MicSource::start_default(block)?))
}

#[cfg(not(feature = "mic"))]
fn open_mic(_block: usize) -> Result<Box<dyn SampleSource>> {
    anyhow::bail!("--mic requiert --features mic")
}

/// Resolve config: --config file, defaults if missing.
fn resolve_config(cli: &cli::Cli) -> Result<PipelineConfig> {
    if cli.config.exists() {
        load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(PipelineConfig::default())
    }
}
