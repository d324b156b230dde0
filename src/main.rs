use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxdraft::integration::{resolve_api_key, ConsoleConfig, CredentialStore, API_KEY_ENV};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxdraft=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting voxdraft console check");

    let config = match std::env::args().nth(1) {
        Some(path) => ConsoleConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => ConsoleConfig::default(),
    };

    if config.requires_api_key() {
        let store = CredentialStore::for_config(&config)?;
        let key = resolve_api_key(&store, std::env::var(API_KEY_ENV).ok(), prompt_api_key)?;
        match key {
            Some(_) => info!("API key available ({})", store.path().display()),
            None => warn!("No API key supplied; set {} or enter one", API_KEY_ENV),
        }
    } else if let Some(url) = &config.relay_server_url {
        info!("Using relay server {}", url);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    runtime.block_on(check_devices(&config))?;

    info!("Embed SessionOrchestrator with a RealtimeSessionClient to start a conversation");
    Ok(())
}

fn prompt_api_key() -> voxdraft::Result<String> {
    print!("OpenAI API key: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(feature = "audio-io")]
async fn check_devices(config: &ConsoleConfig) -> Result<()> {
    use voxdraft::audio::{AnalysisKind, AudioCapture, AudioPlayback, MicrophoneCapture, SpeakerPlayback};

    let mut capture = MicrophoneCapture::new()?;
    capture.begin().await?;
    info!(
        "Microphone: {} ({} Hz, {} channel(s))",
        capture.device_name(),
        capture.sample_rate(),
        capture.channels()
    );

    let mut peak: f32 = 0.0;
    let mut interval = tokio::time::interval(config.visualization_interval());
    let frames = (1000 / config.visualization_interval_ms).max(1);
    for _ in 0..frames {
        interval.tick().await;
        peak = peak.max(capture.frequencies(AnalysisKind::Voice)?.peak());
    }
    info!("Voice band peak over ~1s: {:.2}", peak);
    capture.end().await?;

    let mut playback = SpeakerPlayback::new()?;
    playback.connect().await?;
    info!(
        "Speaker: {} ({} Hz, {} channel(s))",
        playback.device_name(),
        playback.sample_rate(),
        playback.channels()
    );
    playback.interrupt().await?;

    Ok(())
}

#[cfg(not(feature = "audio-io"))]
async fn check_devices(_config: &ConsoleConfig) -> Result<()> {
    warn!("Built without audio-io; skipping device check");
    Ok(())
}
