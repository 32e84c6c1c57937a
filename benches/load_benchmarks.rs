use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use midly::{Format, Header, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use native_midi::midi::MidiEvent;
use native_midi::sequencer::smf::SongData;
use native_midi::{NativeMidi, NativeMidiConfig, NoHostAudio, SoftwarePlatform};

/// Build a parallel SMF with `tracks` tracks of `notes` note on/off pairs
fn song_bytes(tracks: usize, notes: usize) -> Vec<u8> {
    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(480.into())));

    for track in 0..tracks {
        let channel = (track % 16) as u8;
        let mut events = Vec::with_capacity(notes * 2 + 1);
        for note in 0..notes {
            let key = (36 + (note * 7 + track) % 48) as u8;
            events.push(TrackEvent {
                delta: 120.into(),
                kind: TrackEventKind::Midi {
                    channel: channel.into(),
                    message: MidiMessage::NoteOn {
                        key: key.into(),
                        vel: 96.into(),
                    },
                },
            });
            events.push(TrackEvent {
                delta: 120.into(),
                kind: TrackEventKind::Midi {
                    channel: channel.into(),
                    message: MidiMessage::NoteOff {
                        key: key.into(),
                        vel: 0.into(),
                    },
                },
            });
        }
        events.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        });
        smf.tracks.push(events);
    }

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).expect("write SMF");
    bytes
}

/// Benchmark SMF import (runs on the caller's thread during load)
fn bench_smf_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("smf_import");

    for (tracks, notes) in [(1, 100), (16, 500), (32, 2000)] {
        let bytes = song_bytes(tracks, notes);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", tracks, notes)),
            &bytes,
            |b, bytes| {
                b.iter(|| black_box(SongData::parse(black_box(bytes), 120.0)));
            },
        );
    }
    group.finish();
}

/// Benchmark the full load/free cycle through the bridge
fn bench_load_free(c: &mut Criterion) {
    let config = NativeMidiConfig::default();
    let mut midi =
        NativeMidi::with_config(SoftwarePlatform::silent(&config), NoHostAudio, &config)
            .expect("bridge");
    let bytes = song_bytes(16, 500);

    c.bench_function("load_free_16x500", |b| {
        b.iter(|| {
            let song = midi.load(black_box(&bytes)).expect("load");
            midi.free(song);
        });
    });
}

/// Benchmark cursor lookup, done on every seek
fn bench_cursor_lookup(c: &mut Criterion) {
    let song = SongData::parse(&song_bytes(32, 2000), 120.0).expect("parse");
    let length = song.track_length(0).unwrap_or(1.0);

    c.bench_function("cursor_at", |b| {
        let mut beat = 0.0;
        b.iter(|| {
            beat = (beat + 0.37) % length;
            black_box(song.cursor_at(black_box(beat)))
        });
    });
}

/// Benchmark velocity scaling in the dispatch loop
fn bench_velocity_scaling(c: &mut Criterion) {
    let events: Vec<MidiEvent> = (0..512u32)
        .map(|i| MidiEvent::NoteOn {
            channel: (i % 16) as u8,
            note: (i % 128) as u8,
            velocity: (i % 127 + 1) as u8,
        })
        .collect();

    c.bench_function("scale_512_events", |b| {
        b.iter(|| {
            for event in &events {
                black_box(event.scaled(black_box(0.7)).to_bytes());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_smf_import,
    bench_load_free,
    bench_cursor_lookup,
    bench_velocity_scaling
);
criterion_main!(benches);
