// Software player - beat clock and dispatch thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{SharedSink, SoftSequence, SoftUnit};
use crate::error::PlatformError;
use crate::midi::event::MidiEvent;
use crate::sequencer::smf::{SongData, TempoMap};
use crate::sequencer::{END_OF_TRACK, MusicPlayer, MusicTimeStamp};

/// Clock position: `anchor` beats plus the wall time elapsed since `started`
#[derive(Debug, Clone, Copy)]
struct Clock {
    anchor: MusicTimeStamp,
    started: Option<Instant>,
    /// Bumped on every `set_time` so the dispatch thread can resync
    generation: u64,
}

impl Clock {
    fn now(&self, tempo: &TempoMap) -> MusicTimeStamp {
        match self.started {
            Some(started) => {
                let seconds = tempo.beats_to_seconds(self.anchor) + started.elapsed().as_secs_f64();
                tempo.seconds_to_beats(seconds)
            }
            None => self.anchor,
        }
    }
}

struct PlayerShared {
    clock: Mutex<Clock>,
    running: AtomicBool,
}

impl PlayerShared {
    fn clock(&self) -> Clock {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_clock(&self, f: impl FnOnce(&mut Clock)) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut clock);
    }
}

struct Bound {
    song: Arc<SongData>,
    output: SoftUnit,
}

pub struct SoftPlayer {
    shared: Arc<PlayerShared>,
    sink: SharedSink,
    bound: Option<Bound>,
    default_tempo: TempoMap,
    interval: Duration,
    worker: Option<JoinHandle<()>>,
}

impl SoftPlayer {
    pub(super) fn new(sink: SharedSink, default_bpm: f64, interval: Duration) -> Self {
        Self {
            shared: Arc::new(PlayerShared {
                clock: Mutex::new(Clock {
                    anchor: 0.0,
                    started: None,
                    generation: 0,
                }),
                running: AtomicBool::new(false),
            }),
            sink,
            bound: None,
            default_tempo: TempoMap::constant(default_bpm),
            interval,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn tempo(&self) -> &TempoMap {
        self.bound
            .as_ref()
            .map_or(&self.default_tempo, |bound| bound.song.tempo())
    }
}

impl MusicPlayer for SoftPlayer {
    type Sequence = SoftSequence;

    fn set_sequence(&mut self, sequence: &SoftSequence) -> Result<(), PlatformError> {
        let song = sequence.data().cloned().ok_or(PlatformError::NoSequence)?;
        self.stop()?;

        self.bound = Some(Bound {
            song,
            output: sequence.output_unit(),
        });
        self.shared.update_clock(|clock| clock.anchor = 0.0);
        Ok(())
    }

    fn preroll(&mut self) -> Result<(), PlatformError> {
        if self.bound.is_none() {
            return Err(PlatformError::NoSequence);
        }
        Ok(())
    }

    fn set_time(&mut self, time: MusicTimeStamp) -> Result<(), PlatformError> {
        if !time.is_finite() || !(0.0..=END_OF_TRACK).contains(&time) {
            return Err(PlatformError::InvalidTime(time));
        }

        self.shared.update_clock(|clock| {
            clock.anchor = time;
            if clock.started.is_some() {
                clock.started = Some(Instant::now());
            }
            clock.generation += 1;
        });
        Ok(())
    }

    fn time(&self) -> Result<MusicTimeStamp, PlatformError> {
        Ok(self.shared.clock().now(self.tempo()))
    }

    fn start(&mut self) -> Result<(), PlatformError> {
        let Some(bound) = &self.bound else {
            return Err(PlatformError::NoSequence);
        };
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.shared
            .update_clock(|clock| clock.started = Some(Instant::now()));

        let shared = Arc::clone(&self.shared);
        let song = Arc::clone(&bound.song);
        let output = bound.output.clone();
        let sink = Arc::clone(&self.sink);
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("native-midi-dispatch".to_string())
            .spawn(move || dispatch(shared, song, output, sink, interval));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.update_clock(|clock| clock.started = None);
                Err(PlatformError::Device(format!(
                    "cannot spawn dispatch thread: {}",
                    e
                )))
            }
        }
    }

    fn stop(&mut self) -> Result<(), PlatformError> {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("MIDI dispatch thread panicked");
        }

        let tempo = self.tempo().clone();
        self.shared.update_clock(|clock| {
            clock.anchor = clock.now(&tempo);
            clock.started = None;
        });
        Ok(())
    }
}

impl Drop for SoftPlayer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn send(sink: &SharedSink, event: MidiEvent) {
    let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = sink.send(event.to_bytes().as_slice()) {
        debug!("MIDI send failed: {}", e);
    }
}

fn silence(sink: &SharedSink) {
    for channel in 0..16 {
        send(sink, MidiEvent::all_notes_off(channel));
    }
}

/// Dispatch thread body: send every event whose beat has been reached
fn dispatch(
    shared: Arc<PlayerShared>,
    song: Arc<SongData>,
    output: SoftUnit,
    sink: SharedSink,
    interval: Duration,
) {
    let tempo = song.tempo();
    let timeline = song.timeline();

    // Events on the anchor beat are due as soon as the player runs
    let clock = shared.clock();
    let mut generation = clock.generation;
    let mut cursor = song.cursor_at(clock.anchor);

    while shared.running.load(Ordering::Acquire) {
        let clock = shared.clock();
        let now = clock.now(tempo);

        if clock.generation != generation {
            generation = clock.generation;
            silence(&sink);
            cursor = song.cursor_at(clock.anchor);
        }

        let gain = output.volume();
        while let Some(timed) = timeline.get(cursor).filter(|timed| timed.beat <= now) {
            send(&sink, timed.event.scaled(gain));
            cursor += 1;
        }

        thread::sleep(interval);
    }

    silence(&sink);
}
