// Software sequencer platform
//
// Portable implementation of the sequencer handles: sequences import Standard
// MIDI Files, players keep a tempo-mapped beat clock and push the song's
// channel messages to a MIDI sink from a dispatch thread. The routing graph is
// a synth node feeding the default output node; the output node's volume
// scales note velocities.

mod player;

pub use player::SoftPlayer;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::NativeMidiConfig;
use crate::error::PlatformError;
use crate::midi::output::{MidiSink, MidirSink, NullSink};
use crate::sequencer::smf::SongData;
use crate::sequencer::{
    ComponentSubType, ComponentType, MusicSequence, MusicTimeStamp, NodeDescription, OutputUnit,
    SequencerPlatform,
};

/// Sink shared by every player of a platform
pub type SharedSink = Arc<Mutex<Box<dyn MidiSink>>>;

/// Lock-free f32 volume parameter shared with the dispatch thread
#[derive(Clone, Debug)]
pub struct SoftUnit {
    gain: Arc<AtomicU32>,
}

impl SoftUnit {
    fn new() -> Self {
        Self {
            gain: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        }
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }
}

impl OutputUnit for SoftUnit {
    fn set_volume(&self, volume: f32) -> Result<(), PlatformError> {
        if !volume.is_finite() {
            return Err(PlatformError::Status {
                operation: "set_volume",
                status: -1,
            });
        }
        self.gain
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
        Ok(())
    }
}

struct GraphNode {
    description: NodeDescription,
    unit: SoftUnit,
}

/// Imported song plus its routing graph
pub struct SoftSequence {
    data: Option<Arc<SongData>>,
    graph: Vec<GraphNode>,
    default_bpm: f64,
}

impl SoftSequence {
    fn new(default_bpm: f64) -> Self {
        let graph = vec![
            GraphNode {
                description: NodeDescription::new(
                    ComponentType::MusicDevice,
                    ComponentSubType::Synth,
                ),
                unit: SoftUnit::new(),
            },
            GraphNode {
                description: NodeDescription::default_output(),
                unit: SoftUnit::new(),
            },
        ];

        Self {
            data: None,
            graph,
            default_bpm,
        }
    }

    pub fn data(&self) -> Option<&Arc<SongData>> {
        self.data.as_ref()
    }

    /// Volume parameter of the default output node
    fn output_unit(&self) -> SoftUnit {
        self.graph
            .iter()
            .find(|node| node.description.is_default_output())
            .map(|node| node.unit.clone())
            .unwrap_or_else(SoftUnit::new)
    }
}

impl MusicSequence for SoftSequence {
    type Unit = SoftUnit;

    fn load_data(&mut self, data: &[u8]) -> Result<(), PlatformError> {
        let song = SongData::parse(data, self.default_bpm)?;
        debug!(
            "Imported {} tracks, {} channel events",
            song.track_count(),
            song.timeline().len()
        );
        self.data = Some(Arc::new(song));
        Ok(())
    }

    fn track_count(&self) -> Result<usize, PlatformError> {
        Ok(self.data.as_ref().map_or(0, |data| data.track_count()))
    }

    fn track_length(&self, index: usize) -> Result<MusicTimeStamp, PlatformError> {
        self.data
            .as_ref()
            .and_then(|data| data.track_length(index))
            .ok_or(PlatformError::OutOfRange {
                what: "track",
                index,
            })
    }

    fn node_count(&self) -> Result<usize, PlatformError> {
        Ok(self.graph.len())
    }

    fn node(&self, index: usize) -> Result<(NodeDescription, SoftUnit), PlatformError> {
        self.graph
            .get(index)
            .map(|node| (node.description, node.unit.clone()))
            .ok_or(PlatformError::OutOfRange {
                what: "graph node",
                index,
            })
    }
}

enum SinkSource {
    Midir {
        client_name: String,
        port_name: Option<String>,
    },
    Ready(SharedSink),
}

/// Factory for software sequences and players
pub struct SoftwarePlatform {
    sink: SinkSource,
    default_bpm: f64,
    dispatch_interval: Duration,
}

impl SoftwarePlatform {
    /// Play through midir, connecting on the first player allocation
    pub fn new(config: &NativeMidiConfig) -> Self {
        Self {
            sink: SinkSource::Midir {
                client_name: config.client_name.clone(),
                port_name: config.output_port.clone(),
            },
            default_bpm: config.default_tempo_bpm,
            dispatch_interval: config.dispatch_interval(),
        }
    }

    /// Play into a caller-provided sink
    pub fn with_sink(config: &NativeMidiConfig, sink: Box<dyn MidiSink>) -> Self {
        Self {
            sink: SinkSource::Ready(Arc::new(Mutex::new(sink))),
            default_bpm: config.default_tempo_bpm,
            dispatch_interval: config.dispatch_interval(),
        }
    }

    /// Keep the clock running without any output
    pub fn silent(config: &NativeMidiConfig) -> Self {
        Self::with_sink(config, Box::new(NullSink))
    }

    fn shared_sink(&mut self) -> Result<SharedSink, PlatformError> {
        if let SinkSource::Midir {
            client_name,
            port_name,
        } = &self.sink
        {
            let sink = MidirSink::connect(client_name, port_name.as_deref()).map_err(|e| {
                warn!("MIDI output unavailable: {}", e);
                e
            })?;
            self.sink = SinkSource::Ready(Arc::new(Mutex::new(Box::new(sink))));
        }

        match &self.sink {
            SinkSource::Ready(sink) => Ok(Arc::clone(sink)),
            SinkSource::Midir { .. } => Err(PlatformError::Device(
                "MIDI output not connected".to_string(),
            )),
        }
    }
}

impl SequencerPlatform for SoftwarePlatform {
    type Sequence = SoftSequence;
    type Player = SoftPlayer;

    fn new_player(&mut self) -> Result<SoftPlayer, PlatformError> {
        let sink = self.shared_sink()?;
        Ok(SoftPlayer::new(sink, self.default_bpm, self.dispatch_interval))
    }

    fn new_sequence(&mut self) -> Result<SoftSequence, PlatformError> {
        Ok(SoftSequence::new(self.default_bpm))
    }
}
