//! pv-cli: offline rendering and tuning-bank inspection for polyvoice.
//!
//! Usage:
//!   pv-cli render --out chord.wav --notes 60,64,67 --seconds 2
//!   pv-cli tunings

use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use pv_master::{chord_script, Session, Settings, SineVoice};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "Polyphonic MIDI voice engine for single-voice DSP units."
)]
struct Cli {
    /// YAML settings file. `POLYVOICE_*` environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders a chord on the built-in sine voice to a WAV file.
    Render {
        /// Output WAV path.
        #[arg(short, long)]
        out: PathBuf,
        /// Voice count, overriding the settings file.
        #[arg(short, long)]
        voices: Option<usize>,
        /// Comma-separated MIDI note numbers.
        #[arg(short, long, value_delimiter = ',', default_value = "60,64,67")]
        notes: Vec<u8>,
        /// Length of the render. Notes are released at three quarters.
        #[arg(short, long, default_value_t = 2.0)]
        seconds: f32,
        /// Tuning bank entry to select (0 is equal temperament).
        #[arg(short, long, default_value_t = 0)]
        tuning: usize,
        /// A `.syx` octave tuning to apply before rendering.
        #[arg(long)]
        tuning_file: Option<PathBuf>,
    },
    /// Lists the tunings found in the tuning directory.
    Tunings {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            out,
            voices,
            notes,
            seconds,
            tuning,
            tuning_file,
        } => {
            if voices.is_some() {
                settings.voices = voices;
            }
            let mut session = Session::new(SineVoice::new, &settings)?;
            session.engine_mut().select_tuning(tuning);
            if let Some(path) = tuning_file {
                session.apply_tuning_file(&path)?;
            }

            let frames = (seconds.max(0.0) * settings.sample_rate as f32) as usize;
            let script = chord_script(&notes, 100, frames * 3 / 4);
            let wav = session.render_to_wav(&script, frames);
            std::fs::write(&out, wav)?;
            info!(path = %out.display(), frames, "wrote wav");
        }
        Commands::Tunings {} => {
            let bank = settings.tuning_bank();
            if bank.is_empty() {
                println!("No tunings found.");
                return Ok(());
            }
            println!("Tunings (count: {}):", bank.len());
            println!("  0: equal temperament");
            for (i, frame) in bank.iter().enumerate() {
                println!("  {}: {}", i + 1, frame.name);
            }
        }
    }
    Ok(())
}
