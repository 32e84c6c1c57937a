// Song - a sequence/player pair built from one MIDI byte stream

use tracing::{debug, warn};

use crate::error::{LoadStep, NativeMidiError, PlatformError};
use crate::host::{AudioCallbackControl, CallbackSuspension};
use crate::sequencer::{
    MusicPlayer, MusicSequence, MusicTimeStamp, SequencerPlatform, UnitOf,
};

/// Opaque handle to a song in a `NativeMidi` registry
///
/// Handles are never reused, so a handle to a freed song stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SongId(pub(crate) u64);

pub struct Song<P: SequencerPlatform> {
    // Drop order: the sequence is released before the player
    sequence: P::Sequence,
    player: P::Player,
    end_time: MusicTimeStamp,
    output: Option<UnitOf<P>>,
}

impl<P: SequencerPlatform> Song<P> {
    /// Build a playback-ready song
    ///
    /// Any handle allocated before a failing step is released on return.
    pub(crate) fn load<H>(platform: &mut P, host: &H, data: &[u8]) -> Result<Self, NativeMidiError>
    where
        H: AudioCallbackControl + ?Sized,
    {
        if data.is_empty() {
            return Err(NativeMidiError::load(
                LoadStep::ImportData,
                PlatformError::InvalidData("empty MIDI stream".to_string()),
            ));
        }

        let mut player = platform
            .new_player()
            .map_err(|e| NativeMidiError::load(LoadStep::AllocatePlayer, e))?;
        let mut sequence = platform
            .new_sequence()
            .map_err(|e| NativeMidiError::load(LoadStep::AllocateSequence, e))?;

        sequence
            .load_data(data)
            .map_err(|e| NativeMidiError::load(LoadStep::ImportData, e))?;

        let end_time = sequence_length(&sequence)?;

        {
            let _suspended = CallbackSuspension::new(host);
            player
                .set_sequence(&sequence)
                .map_err(|e| NativeMidiError::load(LoadStep::BindSequence, e))?;
        }

        Ok(Self {
            sequence,
            player,
            end_time,
            output: None,
        })
    }

    pub fn end_time(&self) -> MusicTimeStamp {
        self.end_time
    }

    /// Whether the output node has been found
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub(crate) fn player(&self) -> &P::Player {
        &self.player
    }

    pub(crate) fn player_mut(&mut self) -> &mut P::Player {
        &mut self.player
    }

    pub(crate) fn output(&self) -> Option<&UnitOf<P>> {
        self.output.as_ref()
    }

    pub(crate) fn stop(&mut self) {
        if let Err(e) = self.player.stop() {
            warn!("Failed to stop MIDI player: {}", e);
        }
    }

    /// Pre-roll, rewind to zero and start, then look up the output node
    pub(crate) fn play_from_start(&mut self) {
        if let Err(e) = self.player.preroll() {
            warn!("MIDI player preroll failed: {}", e);
        }
        if let Err(e) = self.player.set_time(0.0) {
            warn!("MIDI player rewind failed: {}", e);
        }
        if let Err(e) = self.player.start() {
            warn!("MIDI player start failed: {}", e);
        }

        match find_output_unit(&self.sequence) {
            Some(unit) => self.output = Some(unit),
            None => debug!("No default output node in sequence graph"),
        }
    }
}

/// Longest track of the sequence
fn sequence_length<S: MusicSequence>(sequence: &S) -> Result<MusicTimeStamp, NativeMidiError> {
    let tracks = sequence
        .track_count()
        .map_err(|e| NativeMidiError::load(LoadStep::TrackCount, e))?;

    let mut length: MusicTimeStamp = 0.0;
    for index in 0..tracks {
        let track_length = sequence
            .track_length(index)
            .map_err(|e| NativeMidiError::load(LoadStep::TrackLength(index), e))?;
        if length < track_length {
            length = track_length;
        }
    }
    Ok(length)
}

/// First graph node identifying itself as the default output
fn find_output_unit<S: MusicSequence>(sequence: &S) -> Option<S::Unit> {
    let count = match sequence.node_count() {
        Ok(count) => count,
        Err(e) => {
            debug!("Cannot read sequence graph: {}", e);
            return None;
        }
    };

    (0..count).find_map(|index| match sequence.node(index) {
        Ok((description, unit)) if description.is_default_output() => Some(unit),
        _ => None,
    })
}
