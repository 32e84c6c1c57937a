// Native MIDI - sequencer playback bridge for an audio mixer

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use bridge::{NativeMidi, Song, SongId};
pub use config::{MAX_VOLUME, NativeMidiConfig};
pub use error::{ConfigError, HostError, LoadStep, NativeMidiError, PlatformError};
pub use host::{AudioCallbackControl, CallbackGate, CallbackSuspension, CpalHost, NoHostAudio};
pub use midi::{MidiEvent, MidiSink, MidirSink, NullSink, list_output_ports};
pub use sequencer::soft::{SoftwarePlatform, SoftPlayer, SoftSequence, SoftUnit};
pub use sequencer::{
    END_OF_TRACK, MusicPlayer, MusicSequence, MusicTimeStamp, NodeDescription, OutputUnit,
    SequencerPlatform,
};
