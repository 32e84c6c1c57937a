use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use native_midi::{
    AudioCallbackControl, CpalHost, MAX_VOLUME, NativeMidi, NativeMidiConfig, NoHostAudio,
    SoftwarePlatform, list_output_ports,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command-line arguments for the MIDI file player
#[derive(Parser, Debug)]
#[command(name = "native_midi")]
#[command(about = "Play a Standard MIDI File through a MIDI output port")]
#[command(version)]
struct Args {
    /// MIDI file to play
    #[arg(required_unless_present = "list_ports")]
    file: Option<PathBuf>,

    /// Output port name (defaults to the first port)
    #[arg(short, long)]
    port: Option<String>,

    /// Volume, 0 to 128
    #[arg(short, long, value_parser = clap::value_parser!(i32).range(0..=MAX_VOLUME as i64))]
    volume: Option<i32>,

    /// Start position, in beats
    #[arg(long)]
    start_at: Option<f64>,

    /// RON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List MIDI output ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "native_midi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match NativeMidiConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Cannot read {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => NativeMidiConfig::default(),
    };
    if let Some(port) = &args.port {
        config.output_port = Some(port.clone());
    }

    if args.list_ports {
        let ports = list_output_ports(&config.client_name);
        if ports.is_empty() {
            println!("No MIDI output ports");
        }
        for port in ports {
            let marker = if port.is_default { " (default)" } else { "" };
            println!("{}: {}{}", port.index, port.name, marker);
        }
        return ExitCode::SUCCESS;
    }

    let Some(file) = args.file.clone() else {
        return ExitCode::FAILURE;
    };

    let platform = SoftwarePlatform::new(&config);

    // The mixer side renders silence; notes go out through the MIDI port
    match CpalHost::new(|_frame, _channels| {}) {
        Ok(host) => play(platform, host, &config, &args, file),
        Err(e) => {
            warn!("Audio output unavailable ({}), playing without a host", e);
            play(platform, NoHostAudio, &config, &args, file)
        }
    }
}

fn play<H: AudioCallbackControl>(
    platform: SoftwarePlatform,
    host: H,
    config: &NativeMidiConfig,
    args: &Args,
    file: PathBuf,
) -> ExitCode {
    let mut midi = match NativeMidi::with_config(platform, host, config) {
        Ok(midi) => midi,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let song = match midi.load_path(&file) {
        Ok(song) => song,
        Err(e) => {
            error!("Cannot load {}: {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(volume) = args.volume {
        midi.set_volume(volume);
    }

    info!(
        "Playing {} ({:.1} beats)",
        file.display(),
        midi.end_time(song).unwrap_or_default()
    );
    midi.start(song);

    if let Some(beat) = args.start_at
        && let Err(e) = midi.seek(song, beat)
    {
        warn!("{}", e);
    }

    while midi.is_active() {
        thread::sleep(POLL_INTERVAL);
    }

    midi.stop();
    midi.free(song);
    info!("Playback finished");
    ExitCode::SUCCESS
}
