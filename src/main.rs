use anyhow::{Context, Result};
use clap::Parser;
use lexis_core::{AudioChunk, HostConfig, LocaleDefinition, ResultKind};
use lexis_engine::{ModelCache, NullRecognizer, RecognizerRegistry};
use lexis_host::{ImmediateReadiness, SpeechHost};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lexis", about = "Streaming speech recognition session engine demo")]
struct Cli {
    /// Path to the locale configuration file. Without one, a self-contained
    /// demo configuration using the built-in null recognizer is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How many 100 ms audio chunks to feed the session
    #[arg(long, default_value_t = 10)]
    chunks: usize,
}

fn demo_config() -> Result<HostConfig> {
    let model_root = std::env::temp_dir().join("lexis-demo-models");
    let model_dir = model_root.join("null").join("models").join("en-us-demo");
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("failed to create demo model folder {model_dir:?}"))?;

    Ok(HostConfig {
        log_level: "info".to_string(),
        model_root,
        default_locale: Some("en-us".to_string()),
        locales: vec![LocaleDefinition {
            recognizer: "null".to_string(),
            locale: "en-us".to_string(),
            model_folder: "en-us-demo".to_string(),
            priority: 0,
        }],
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HostConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path:?}"))?,
        None => demo_config()?,
    };

    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("lexis starting");

    let mut registry = RecognizerRegistry::new();
    registry.register(Arc::new(NullRecognizer::with_utterance_chunks(4)));
    let registry = Arc::new(registry);
    let cache = Arc::new(ModelCache::new());
    cache.subscribe_model_loaded(|locale| tracing::info!(locale, "model loaded"));

    let readiness = Arc::new(ImmediateReadiness::new(config.model_root.clone()));
    let host = SpeechHost::new(&config, registry, cache, readiness);
    host.subscribe(|event| tracing::info!(?event, "locale event"));

    let available = host.available_locales();
    anyhow::ensure!(!available.is_empty(), "no usable locales configured");
    for status in &available {
        tracing::info!(
            locale = %status.definition.locale,
            recognizer = %status.definition.recognizer,
            ready = status.model_ready,
            "locale available"
        );
    }

    let session = host
        .create_session(None, None)
        .context("failed to create a recognition session")?;
    session.start_listening(false);

    // Feed 100 ms blocks of a 440 Hz tone, the shape a capture tap delivers
    let sample_rate = 48_000u32;
    let block = sample_rate as usize / 10;
    for index in 0..cli.chunks {
        let samples: Vec<f32> = (0..block)
            .map(|frame| {
                let t = (index * block + frame) as f32 / sample_rate as f32;
                (t * 440.0 * std::f32::consts::TAU).sin() * 0.5
            })
            .collect();
        session.push_audio(AudioChunk::mono(samples, sample_rate));
        std::thread::sleep(Duration::from_millis(20));

        for result in session.fetch_results() {
            print_result(&result);
        }
    }

    session.stop_listening();
    std::thread::sleep(Duration::from_millis(200));
    for result in session.fetch_results() {
        print_result(&result);
    }

    session.terminate_session();
    tracing::info!("lexis done");
    Ok(())
}

fn print_result(result: &lexis_core::SpeechResult) {
    let kind = match result.kind {
        ResultKind::Partial => "partial",
        ResultKind::Final => "final",
    };
    println!(
        "[{kind}] {:.2} {} ({} words)",
        result.confidence,
        result.sentence,
        result.words.len()
    );
}
