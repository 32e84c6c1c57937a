// Standard MIDI File import - tracks, tempo map and the merged event timeline

use midly::{MetaMessage, Smf, Timing, TrackEventKind};

use crate::error::PlatformError;
use crate::midi::event::MidiEvent;
use crate::sequencer::MusicTimeStamp;

/// Channel message placed on the beat timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub beat: MusicTimeStamp,
    pub track: usize,
    pub event: MidiEvent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TempoSegment {
    beat: MusicTimeStamp,
    seconds: f64,
    seconds_per_beat: f64,
}

/// Piecewise-linear mapping between beats and seconds
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    pub fn constant(bpm: f64) -> Self {
        Self {
            segments: vec![TempoSegment {
                beat: 0.0,
                seconds: 0.0,
                seconds_per_beat: 60.0 / bpm,
            }],
        }
    }

    /// Build from `(beat, microseconds per quarter note)` changes
    ///
    /// Several changes on the same beat keep the last one.
    pub fn from_changes(default_bpm: f64, mut changes: Vec<(MusicTimeStamp, u32)>) -> Self {
        changes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut map = Self::constant(default_bpm);
        for (beat, micros) in changes {
            if micros == 0 {
                continue;
            }
            let seconds_per_beat = micros as f64 / 1_000_000.0;
            let seconds = map.beats_to_seconds(beat);

            match map.segments.last_mut() {
                Some(last) if last.beat == beat => last.seconds_per_beat = seconds_per_beat,
                _ => map.segments.push(TempoSegment {
                    beat,
                    seconds,
                    seconds_per_beat,
                }),
            }
        }
        map
    }

    pub fn beats_to_seconds(&self, beat: MusicTimeStamp) -> f64 {
        let index = self
            .segments
            .partition_point(|s| s.beat <= beat)
            .saturating_sub(1);
        let segment = &self.segments[index];
        segment.seconds + (beat - segment.beat) * segment.seconds_per_beat
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> MusicTimeStamp {
        let index = self
            .segments
            .partition_point(|s| s.seconds <= seconds)
            .saturating_sub(1);
        let segment = &self.segments[index];
        segment.beat + (seconds - segment.seconds) / segment.seconds_per_beat
    }
}

/// Imported song: per-track lengths, tempo map and one merged timeline
#[derive(Debug, Clone)]
pub struct SongData {
    track_lengths: Vec<MusicTimeStamp>,
    timeline: Vec<TimedEvent>,
    tempo: TempoMap,
}

impl SongData {
    /// Parse a Standard MIDI File
    pub fn parse(data: &[u8], default_bpm: f64) -> Result<Self, PlatformError> {
        let smf = Smf::parse(data).map_err(|e| PlatformError::InvalidData(e.to_string()))?;

        let ticks_to_beats: f64 = match smf.header.timing {
            Timing::Metrical(ppq) => {
                let ppq = ppq.as_int();
                if ppq == 0 {
                    return Err(PlatformError::InvalidData(
                        "zero ticks per quarter note".to_string(),
                    ));
                }
                1.0 / ppq as f64
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_second = fps.as_f32() as f64 * subframes as f64;
                if ticks_per_second <= 0.0 {
                    return Err(PlatformError::InvalidData(
                        "zero ticks per second".to_string(),
                    ));
                }
                default_bpm / 60.0 / ticks_per_second
            }
        };
        let metrical = matches!(smf.header.timing, Timing::Metrical(_));

        let mut track_lengths = Vec::with_capacity(smf.tracks.len());
        let mut timeline = Vec::new();
        let mut tempo_changes = Vec::new();

        for (track_index, track) in smf.tracks.iter().enumerate() {
            let mut ticks: u64 = 0;
            let mut length: MusicTimeStamp = 0.0;

            for event in track.iter() {
                ticks += event.delta.as_int() as u64;
                let beat = ticks as f64 * ticks_to_beats;
                length = length.max(beat);

                match &event.kind {
                    TrackEventKind::Midi { channel, message } => timeline.push(TimedEvent {
                        beat,
                        track: track_index,
                        event: MidiEvent::from_midly(channel.as_int(), *message),
                    }),
                    // SMPTE-timed files are absolute; tempo events do not move them
                    TrackEventKind::Meta(MetaMessage::Tempo(micros)) if metrical => {
                        tempo_changes.push((beat, micros.as_int()))
                    }
                    _ => {}
                }
            }

            track_lengths.push(length);
        }

        // Stable: simultaneous events keep track order
        timeline.sort_by(|a, b| a.beat.total_cmp(&b.beat));

        Ok(Self {
            track_lengths,
            timeline,
            tempo: TempoMap::from_changes(default_bpm, tempo_changes),
        })
    }

    pub fn track_count(&self) -> usize {
        self.track_lengths.len()
    }

    pub fn track_length(&self, index: usize) -> Option<MusicTimeStamp> {
        self.track_lengths.get(index).copied()
    }

    pub fn timeline(&self) -> &[TimedEvent] {
        &self.timeline
    }

    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }

    /// Index of the first timeline event at or after `beat`
    pub fn cursor_at(&self, beat: MusicTimeStamp) -> usize {
        self.timeline.partition_point(|e| e.beat < beat)
    }
}
