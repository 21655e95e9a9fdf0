//! calmwave - render or play relaxation sessions from the command line
//!
//! ```bash
//! # Two minutes of the 432 Hz track over rain, to a WAV file
//! calmwave render --mode scale --preset 4 --ambient rain --seconds 120 --out session.wav
//!
//! # Alpha binaural beat with fire and wind, on the default device
//! calmwave play --mode binaural --preset 2 --ambient fire --ambient wind
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use calmwave_core::render::{self, SessionPlan};
use calmwave_core::{EngineConfig, PlaybackMode, PresetTable};

#[derive(Parser)]
#[command(name = "calmwave")]
#[command(about = "Golden-ratio melodies, binaural beats and ambient soundscapes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a session to a 16-bit stereo WAV file
    Render {
        #[command(flatten)]
        session: SessionArgs,

        /// Output file
        #[arg(short, long, default_value = "session.wav")]
        out: PathBuf,
    },

    /// Play a session on the default audio device
    #[cfg(feature = "realtime")]
    Play {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// Track kind: scale (solfeggio) or binaural (binaural-beat); "none" for ambient only
    #[arg(short, long, default_value = "scale")]
    mode: String,

    /// Index into the preset table for the chosen mode
    #[arg(short, long, default_value_t = 4)]
    preset: usize,

    /// Ambient layer to add; repeat for more
    #[arg(short, long)]
    ambient: Vec<String>,

    /// Session length in seconds
    #[arg(short, long, default_value_t = 60.0)]
    seconds: f64,

    /// Main volume, 0-100
    #[arg(long)]
    volume: Option<f64>,

    /// Ambient submix volume, 0-100
    #[arg(long)]
    ambient_volume: Option<f64>,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset tables (JSON)
    #[arg(long)]
    presets: Option<PathBuf>,
}

impl SessionArgs {
    fn plan(&self) -> Result<SessionPlan> {
        let mode = match self.mode.as_str() {
            "none" => None,
            other => Some(other.parse::<PlaybackMode>()?),
        };
        Ok(SessionPlan {
            mode,
            preset: self.preset,
            ambient: self.ambient.clone(),
            main_volume: self.volume,
            ambient_volume: self.ambient_volume,
        })
    }

    fn config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Ok(EngineConfig::from_json(&json)?)
            }
            None => Ok(EngineConfig::default()),
        }
    }

    fn presets(&self) -> Result<PresetTable> {
        match &self.presets {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading presets {}", path.display()))?;
                Ok(PresetTable::from_json(&json)?)
            }
            None => Ok(PresetTable::default()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render { session, out } => {
            let plan = session.plan()?;
            let wav = render::render_wav(session.config()?, session.presets()?, &plan, session.seconds)?;
            fs::write(&out, wav).with_context(|| format!("writing {}", out.display()))?;
            tracing::info!("wrote {}", out.display());
        }
        #[cfg(feature = "realtime")]
        Commands::Play { session } => play(&session)?,
    }
    Ok(())
}

#[cfg(feature = "realtime")]
fn play(session: &SessionArgs) -> Result<()> {
    use std::time::{Duration, Instant};

    use calmwave_core::output::AudioOutput;

    let plan = session.plan()?;
    let output = AudioOutput::open(session.config()?, session.presets()?)?;
    let engine = output.engine();
    // Textures render before the engine lock is taken for the controls below.
    for id in plan.ambient_ids() {
        if !output.toggle_ambient(id)? {
            tracing::warn!("unknown ambient sound '{id}'");
        }
    }
    {
        let mut engine = engine
            .lock()
            .map_err(|_| anyhow::anyhow!("engine lock poisoned"))?;
        if let Some(v) = plan.main_volume {
            engine.set_main_volume(v);
        }
        if let Some(v) = plan.ambient_volume {
            engine.set_ambient_master_volume(v);
        }
        if let Some(mode) = plan.mode {
            engine.start(mode, plan.preset)?;
        }
    }

    tracing::info!(sample_rate = output.sample_rate(), "playing for {} s", session.seconds);
    let deadline = Instant::now() + Duration::from_secs_f64(session.seconds.max(0.0));
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
        let closed = engine
            .lock()
            .map(|e| e.context_state() == calmwave_core::ContextState::Closed)
            .unwrap_or(true);
        if closed {
            anyhow::bail!("audio backend failed during playback");
        }
    }

    if let Ok(mut engine) = engine.lock() {
        engine.stop(true);
    }
    // let release tails ring out
    std::thread::sleep(Duration::from_millis(1500));
    Ok(())
}
