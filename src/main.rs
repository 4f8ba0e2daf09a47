//! Heartcheck: heart disease risk screening
//!
//! Main entry point for the terminal application.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartcheck::adapters::artifacts::{load_verifying_key, FsArtifactStore, VerificationPolicy};
use heartcheck::adapters::sanitize::SanitizingMakeWriter;
use heartcheck::application::InferenceService;
use heartcheck::config::AppConfig;
use heartcheck::ports::MODEL_REGISTRY;
use heartcheck::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env();

    // Logging to the terminal would corrupt the TUI, so an interactive
    // session logs to a file unless told otherwise.
    let (writer, _guard) = if config.log_mode.use_file(std::io::stdout().is_terminal()) {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Heartcheck...");

    let service = match load_service(&config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };
    tracing::info!("Models ready: {}", service.model_names().join(", "));

    App::new(&service).run()?;

    tracing::info!("Heartcheck shutdown complete.");
    Ok(())
}

fn load_service(config: &AppConfig) -> Result<InferenceService> {
    let verifying_key = config
        .signing_pubkey_file
        .as_deref()
        .map(load_verifying_key)
        .transpose()
        .context("Failed to load model signing public key")?;

    let policy = VerificationPolicy {
        require_signed: config.require_signed_models,
        verifying_key,
    };

    let store = FsArtifactStore::open(&config.model_path, &policy).with_context(|| {
        format!(
            "Failed to open model directory {:?}. Set HEARTCHECK_MODEL_PATH to a directory \
             containing scalers.json and the model files.",
            config.model_path
        )
    })?;

    Ok(InferenceService::load(&store, &MODEL_REGISTRY)?)
}
