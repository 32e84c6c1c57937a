//! Scripted sequencer platform and audio host for bridge tests
//!
//! Every call made on the mock handles and the mock host lands in one shared
//! journal, so tests can assert on the relative order of callback suspension
//! and sequencer mutations.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use native_midi::sequencer::{ComponentSubType, ComponentType};
use native_midi::{
    AudioCallbackControl, MusicPlayer, MusicSequence, MusicTimeStamp, NodeDescription,
    OutputUnit, PlatformError, SequencerPlatform,
};

/// Platform call made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NewPlayer,
    NewSequence,
    LoadData,
    TrackCount,
    TrackLength(usize),
    SetSequence,
    SetVolume,
}

#[derive(Debug)]
pub struct MockState {
    pub journal: Vec<String>,
    pub live_players: i32,
    pub live_sequences: i32,
    pub allocations: usize,
    pub fail: Option<Failure>,
    pub track_lengths: Vec<MusicTimeStamp>,
    /// Clock reported by every player when set
    pub clock: Option<MusicTimeStamp>,
    /// Largest accepted `set_time` value
    pub seek_limit: MusicTimeStamp,
    /// Graph stays empty until a player has been started
    pub graph_after_start: bool,
    pub started_any: bool,
    /// Whether the graph contains a default output node at all
    pub with_output: bool,
    pub volumes: Vec<f32>,
    pub host_locked: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            journal: Vec::new(),
            live_players: 0,
            live_sequences: 0,
            allocations: 0,
            fail: None,
            track_lengths: vec![4.0],
            clock: None,
            seek_limit: f64::MAX,
            graph_after_start: false,
            started_any: false,
            with_output: true,
            volumes: Vec::new(),
            // The mixer holds its audio lock while calling into the bridge
            host_locked: true,
        }
    }
}

pub type Shared = Rc<RefCell<MockState>>;

fn log(state: &Shared, entry: impl Into<String>) {
    state.borrow_mut().journal.push(entry.into());
}

fn fails(state: &Shared, failure: Failure) -> bool {
    state.borrow().fail == Some(failure)
}

fn status(operation: &'static str) -> PlatformError {
    PlatformError::Status {
        operation,
        status: -50,
    }
}

pub struct MockPlatform {
    pub state: Shared,
    pub available: bool,
    next_player: usize,
}

impl MockPlatform {
    pub fn new(state: &Shared) -> Self {
        Self {
            state: Rc::clone(state),
            available: true,
            next_player: 0,
        }
    }
}

impl SequencerPlatform for MockPlatform {
    type Sequence = MockSequence;
    type Player = MockPlayer;

    fn detect(&self) -> bool {
        self.available
    }

    fn new_player(&mut self) -> Result<MockPlayer, PlatformError> {
        if fails(&self.state, Failure::NewPlayer) {
            return Err(status("NewMusicPlayer"));
        }
        let id = self.next_player;
        self.next_player += 1;

        let mut state = self.state.borrow_mut();
        state.live_players += 1;
        state.allocations += 1;
        state.journal.push(format!("new_player#{}", id));
        drop(state);

        Ok(MockPlayer {
            state: Rc::clone(&self.state),
            id,
            time: 0.0,
            bound: false,
        })
    }

    fn new_sequence(&mut self) -> Result<MockSequence, PlatformError> {
        if fails(&self.state, Failure::NewSequence) {
            return Err(status("NewMusicSequence"));
        }

        let mut state = self.state.borrow_mut();
        state.live_sequences += 1;
        state.allocations += 1;
        drop(state);

        Ok(MockSequence {
            state: Rc::clone(&self.state),
            tracks: Vec::new(),
        })
    }
}

pub struct MockSequence {
    state: Shared,
    tracks: Vec<MusicTimeStamp>,
}

impl Drop for MockSequence {
    fn drop(&mut self) {
        self.state.borrow_mut().live_sequences -= 1;
    }
}

impl MusicSequence for MockSequence {
    type Unit = MockUnit;

    fn load_data(&mut self, data: &[u8]) -> Result<(), PlatformError> {
        if fails(&self.state, Failure::LoadData) || !data.starts_with(b"MThd") {
            return Err(PlatformError::InvalidData("not a MIDI file".to_string()));
        }
        self.tracks = self.state.borrow().track_lengths.clone();
        Ok(())
    }

    fn track_count(&self) -> Result<usize, PlatformError> {
        if fails(&self.state, Failure::TrackCount) {
            return Err(status("MusicSequenceGetTrackCount"));
        }
        Ok(self.tracks.len())
    }

    fn track_length(&self, index: usize) -> Result<MusicTimeStamp, PlatformError> {
        if fails(&self.state, Failure::TrackLength(index)) {
            return Err(status("MusicTrackGetProperty"));
        }
        self.tracks
            .get(index)
            .copied()
            .ok_or(PlatformError::OutOfRange {
                what: "track",
                index,
            })
    }

    fn node_count(&self) -> Result<usize, PlatformError> {
        let state = self.state.borrow();
        if state.graph_after_start && !state.started_any {
            return Ok(0);
        }
        Ok(if state.with_output { 3 } else { 2 })
    }

    fn node(&self, index: usize) -> Result<(NodeDescription, MockUnit), PlatformError> {
        let description = match index {
            0 => NodeDescription::new(ComponentType::MusicDevice, ComponentSubType::Synth),
            1 => NodeDescription::new(ComponentType::Output, ComponentSubType::GenericOutput),
            2 if self.state.borrow().with_output => NodeDescription::default_output(),
            _ => {
                return Err(PlatformError::OutOfRange {
                    what: "graph node",
                    index,
                });
            }
        };
        Ok((
            description,
            MockUnit {
                state: Rc::clone(&self.state),
            },
        ))
    }
}

pub struct MockUnit {
    state: Shared,
}

impl OutputUnit for MockUnit {
    fn set_volume(&self, volume: f32) -> Result<(), PlatformError> {
        log(&self.state, format!("set_volume({})", volume));
        if fails(&self.state, Failure::SetVolume) {
            return Err(status("AudioUnitSetParameter"));
        }
        self.state.borrow_mut().volumes.push(volume);
        Ok(())
    }
}

pub struct MockPlayer {
    state: Shared,
    pub id: usize,
    time: MusicTimeStamp,
    bound: bool,
}

impl Drop for MockPlayer {
    fn drop(&mut self) {
        self.state.borrow_mut().live_players -= 1;
    }
}

impl MusicPlayer for MockPlayer {
    type Sequence = MockSequence;

    fn set_sequence(&mut self, _sequence: &MockSequence) -> Result<(), PlatformError> {
        log(&self.state, format!("set_sequence#{}", self.id));
        if fails(&self.state, Failure::SetSequence) {
            return Err(status("MusicPlayerSetSequence"));
        }
        self.bound = true;
        Ok(())
    }

    fn preroll(&mut self) -> Result<(), PlatformError> {
        log(&self.state, format!("preroll#{}", self.id));
        Ok(())
    }

    fn set_time(&mut self, time: MusicTimeStamp) -> Result<(), PlatformError> {
        log(&self.state, format!("set_time#{}({})", self.id, time));
        if time > self.state.borrow().seek_limit {
            return Err(PlatformError::InvalidTime(time));
        }
        self.time = time;
        Ok(())
    }

    fn time(&self) -> Result<MusicTimeStamp, PlatformError> {
        Ok(self.state.borrow().clock.unwrap_or(self.time))
    }

    fn start(&mut self) -> Result<(), PlatformError> {
        log(&self.state, format!("start#{}", self.id));
        self.state.borrow_mut().started_any = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlatformError> {
        log(&self.state, format!("stop#{}", self.id));
        Ok(())
    }
}

/// Host callback journaling pause/lock traffic
pub struct MockHost {
    pub state: Shared,
}

impl MockHost {
    pub fn new(state: &Shared) -> Self {
        Self {
            state: Rc::clone(state),
        }
    }
}

impl AudioCallbackControl for MockHost {
    fn pause(&self, paused: bool) {
        log(&self.state, if paused { "pause" } else { "resume" });
    }

    fn lock(&self) {
        log(&self.state, "lock");
        self.state.borrow_mut().host_locked = true;
    }

    fn unlock(&self) -> bool {
        log(&self.state, "unlock");
        std::mem::replace(&mut self.state.borrow_mut().host_locked, false)
    }
}

pub fn shared_state() -> Shared {
    Rc::new(RefCell::new(MockState::default()))
}

/// Bytes the mock sequence accepts as a MIDI file
pub const MIDI_BYTES: &[u8] = b"MThd\0\0\0\x06\0\x01\0\x01\0\x60";

/// Take the journal, leaving it empty
pub fn drain_journal(state: &Shared) -> Vec<String> {
    std::mem::take(&mut state.borrow_mut().journal)
}
