mod action;
mod app;
mod app_state;
mod caption;
mod component;
mod components;
mod core;
mod focus;
mod machine;
mod theme;
mod visualizer;
mod widgets;

use std::sync::Arc;

use clap::Parser;
use deck_audio::graph::GraphConfig;
use deck_audio::media::{BlobRegistry, FfmpegElement, MediaEvent};
use deck_proto::config::Config;
use deck_proto::prefs::Preferences;
use deck_proto::protocol::{Command, Skin, VisualizerMode};
use deck_proto::state::StateManager;
use deck_proto::store::FileStore;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// What the PlayerCore broadcasts to the UI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The snapshot changed; receivers fetch it from the StateManager.
    StateUpdated,
    /// A WARN/ERROR log line.
    Log(String),
}

/// Forwards WARN and ERROR events into the UI log strip.
struct BroadcastLayer {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl BroadcastLayer {
    fn new(sender: broadcast::Sender<BroadcastMessage>) -> Self {
        Self { sender }
    }
}

impl<S> tracing_subscriber::Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // no receivers is fine
        let _ = self.sender.send(BroadcastMessage::Log(message));
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "deckradio", version, about = "Internet radio in your terminal")]
struct Cli {
    /// Visualizer mode: bars, wave, scope, orb or particles.
    #[arg(long)]
    mode: Option<VisualizerMode>,

    /// Chassis skin.
    #[arg(long, value_parser = parse_skin)]
    skin: Option<Skin>,

    /// Station id to tune to on startup.
    #[arg(long)]
    station: Option<String>,

    /// Use the built-in captions only.
    #[arg(long)]
    no_captions: bool,
}

fn parse_skin(s: &str) -> Result<Skin, String> {
    match s.to_ascii_lowercase().as_str() {
        "ipod" => Ok(Skin::Ipod),
        "cyberpunk" => Ok(Skin::Cyberpunk),
        "retro" => Ok(Skin::Retro),
        other => Err(format!("unknown skin '{other}' (ipod, cyberpunk, retro)")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = config.paths.data_dir.clone();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("deckradio.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(BroadcastLayer::new(broadcast_tx.clone()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,deckradio=debug")),
        )
        .init();

    eprintln!("deckradio log: {}", log_path.display());
    info!("deckradio starting, config {:?}", Config::config_path());

    // ── Collaborators ────────────────────────────────────────────────────────
    let store = Arc::new(FileStore::new(&data_dir));
    let blobs = Arc::new(BlobRegistry::new());
    let (media_tx, mut media_rx) = mpsc::unbounded_channel::<MediaEvent>();
    let media = Arc::new(FfmpegElement::new(
        config.audio.sample_rate,
        Arc::clone(&blobs),
        media_tx,
    ));
    let captions = Arc::from(caption::from_config(&config.captions, !cli.no_captions));
    let state_manager = Arc::new(StateManager::default());
    let (analyser_tx, analyser_rx) = watch::channel(None);

    let configured_mode = config.visualizer.mode.parse::<VisualizerMode>().unwrap_or_else(|e| {
        warn!("{}, using wave", e);
        VisualizerMode::Wave
    });
    let preferences = Preferences {
        visualizer_mode: configured_mode,
        volume: config.audio.default_volume.clamp(0.0, 1.0),
        ..Preferences::default()
    };
    let stations_override = config
        .paths
        .stations_toml
        .exists()
        .then_some(config.paths.stations_toml.as_path());

    // ── PlayerEvent channel (UI / media / tasks -> PlayerCore) ──────────────
    let (event_tx, event_rx) = mpsc::channel::<core::PlayerEvent>(1024);

    let player = core::PlayerCore::new(
        core::CoreSettings {
            default_stations: deck_proto::catalog::default_stations(stations_override),
            preferences,
            graph: GraphConfig {
                fft_size: config.audio.fft_size,
                smoothing: config.audio.smoothing,
            },
        },
        core::CoreDeps {
            media,
            store,
            captions,
            blobs,
            state_manager: Arc::clone(&state_manager),
            broadcast_tx: broadcast_tx.clone(),
            event_tx: event_tx.clone(),
            analyser_tx,
        },
    );

    // ── Media event pump ─────────────────────────────────────────────────────
    let pump_tx = event_tx.clone();
    tokio::spawn(async move {
        while let Some(evt) = media_rx.recv().await {
            if pump_tx.send(core::PlayerEvent::Media(evt)).await.is_err() {
                break;
            }
        }
    });

    let core_handle = tokio::spawn(async move {
        if let Err(e) = player.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {:#}", e);
        }
    });

    // ── Startup overrides from the command line ──────────────────────────────
    let mut startup = Vec::new();
    if let Some(mode) = cli.mode {
        startup.push(Command::SetVisualizerMode { mode });
    }
    if let Some(skin) = cli.skin {
        startup.push(Command::SetSkin { skin });
    }
    if let Some(station_id) = cli.station {
        startup.push(Command::Select { station_id });
    }
    for cmd in startup {
        event_tx.send(core::PlayerEvent::Command(cmd)).await?;
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(
        app::AppConfig {
            log_path,
            fps: config.visualizer.fps,
        },
        event_tx.clone(),
        state_manager,
        analyser_rx,
    );
    let result = app.run(broadcast_rx).await;

    let _ = event_tx.send(core::PlayerEvent::Shutdown).await;
    let _ = core_handle.await;
    info!("deckradio stopped");
    result
}
