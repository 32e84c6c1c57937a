// Sequencer platform - handles the bridge drives
//
// A platform provides three kinds of handles: a sequence (the imported song
// with its routing graph), a player (the transport advancing a sequence's
// clock) and output units (nodes of the routing graph that accept a volume).
// Handles release their native resources when dropped.

pub mod smf;
pub mod soft;

use crate::error::PlatformError;

/// Sequencer time, in beats (quarter notes)
pub type MusicTimeStamp = f64;

/// Clock value a player reports once it has run past the end of its tracks
pub const END_OF_TRACK: MusicTimeStamp = 1_000_000_000.0;

/// Component type of a routing graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Output,
    MusicDevice,
    Mixer,
    Effect,
}

/// Component subtype of a routing graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSubType {
    DefaultOutput,
    GenericOutput,
    Synth,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescription {
    pub component_type: ComponentType,
    pub component_subtype: ComponentSubType,
}

impl NodeDescription {
    pub const fn new(component_type: ComponentType, component_subtype: ComponentSubType) -> Self {
        Self {
            component_type,
            component_subtype,
        }
    }

    pub const fn default_output() -> Self {
        Self::new(ComponentType::Output, ComponentSubType::DefaultOutput)
    }

    /// The node sequencer volume is applied to
    pub fn is_default_output(&self) -> bool {
        self.component_type == ComponentType::Output
            && self.component_subtype == ComponentSubType::DefaultOutput
    }
}

/// A routing graph node accepting a volume parameter
pub trait OutputUnit {
    /// Set the output volume, 0.0 (silent) to 1.0 (full scale)
    fn set_volume(&self, volume: f32) -> Result<(), PlatformError>;
}

/// Container of timed tracks plus the routing graph rendering them
pub trait MusicSequence {
    type Unit: OutputUnit;

    /// Replace the sequence content with a MIDI byte stream
    fn load_data(&mut self, data: &[u8]) -> Result<(), PlatformError>;

    fn track_count(&self) -> Result<usize, PlatformError>;

    /// Length of one track, in beats
    fn track_length(&self, index: usize) -> Result<MusicTimeStamp, PlatformError>;

    /// Number of nodes in the routing graph; may be zero until the sequence is
    /// bound to a player
    fn node_count(&self) -> Result<usize, PlatformError>;

    fn node(&self, index: usize) -> Result<(NodeDescription, Self::Unit), PlatformError>;
}

/// Transport advancing a sequence's clock
pub trait MusicPlayer {
    type Sequence: MusicSequence;

    fn set_sequence(&mut self, sequence: &Self::Sequence) -> Result<(), PlatformError>;

    /// Warm up the player so that `start` begins without latency
    fn preroll(&mut self) -> Result<(), PlatformError>;

    fn set_time(&mut self, time: MusicTimeStamp) -> Result<(), PlatformError>;

    fn time(&self) -> Result<MusicTimeStamp, PlatformError>;

    fn start(&mut self) -> Result<(), PlatformError>;

    fn stop(&mut self) -> Result<(), PlatformError>;
}

/// Factory for sequences and players
pub trait SequencerPlatform {
    type Sequence: MusicSequence;
    type Player: MusicPlayer<Sequence = Self::Sequence>;

    /// Whether this platform can play anything at all
    fn detect(&self) -> bool {
        true
    }

    fn new_player(&mut self) -> Result<Self::Player, PlatformError>;

    fn new_sequence(&mut self) -> Result<Self::Sequence, PlatformError>;
}

/// Output unit type of a platform's sequences
pub type UnitOf<P> = <<P as SequencerPlatform>::Sequence as MusicSequence>::Unit;
