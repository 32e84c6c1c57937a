//! Fuzzing tests for MIDI file import
//!
//! Random and corrupted streams must be rejected with an error, never a panic
//! or a leaked handle.

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use native_midi::{LoadStep, NativeMidi, NativeMidiConfig, NoHostAudio, SoftwarePlatform};
use rand::Rng;

fn bridge() -> NativeMidi<SoftwarePlatform, NoHostAudio> {
    let config = NativeMidiConfig::default();
    NativeMidi::with_config(SoftwarePlatform::silent(&config), NoHostAudio, &config).unwrap()
}

fn valid_song() -> Vec<u8> {
    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(480.into())));
    for key in [60u8, 64, 67] {
        smf.tracks.push(vec![
            TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(500_000.into())),
            },
            TrackEvent {
                delta: 240.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOn {
                        key: key.into(),
                        vel: 90.into(),
                    },
                },
            },
            TrackEvent {
                delta: 480.into(),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ]);
    }

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    bytes
}

/// Fuzz the importer with random byte sequences
#[test]
fn fuzz_import_random_bytes() {
    let mut rng = rand::thread_rng();
    let mut midi = bridge();

    for _ in 0..500 {
        let length = rng.gen_range(1..=256);
        let random_bytes: Vec<u8> = (0..length).map(|_| rng.gen_range(0..=255)).collect();

        if let Err(e) = midi.load(&random_bytes) {
            assert_eq!(e.load_step(), Some(LoadStep::ImportData));
        }
    }
}

/// Fuzz with a valid header followed by garbage
#[test]
fn fuzz_import_garbage_after_header() {
    let mut rng = rand::thread_rng();
    let mut midi = bridge();
    let original = valid_song();
    let header = &original[..14];

    for _ in 0..500 {
        let mut bytes = header.to_vec();
        let length = rng.gen_range(0..=128);
        bytes.extend((0..length).map(|_| rng.gen_range(0..=255u8)));

        if let Ok(song) = midi.load(&bytes) {
            let end = midi.end_time(song).unwrap();
            assert!(end.is_finite() && end >= 0.0);
            midi.free(song);
        }
    }
}

/// Flip random bytes of a valid file
#[test]
fn fuzz_import_corrupted_song() {
    let mut rng = rand::thread_rng();
    let mut midi = bridge();
    let original = valid_song();

    for _ in 0..500 {
        let mut bytes = original.clone();
        for _ in 0..rng.gen_range(1..=4) {
            let index = rng.gen_range(0..bytes.len());
            bytes[index] = rng.r#gen();
        }

        if let Ok(song) = midi.load(&bytes) {
            assert!(midi.end_time(song).unwrap().is_finite());
            midi.free(song);
        }
    }
}

/// Truncation at every length must fail cleanly
#[test]
fn fuzz_import_truncated_song() {
    let mut midi = bridge();
    let original = valid_song();

    for len in 0..original.len() {
        let result = midi.load(&original[..len]);
        if let Err(e) = result {
            assert_eq!(e.load_step(), Some(LoadStep::ImportData));
        }
    }

    assert!(midi.load(&original).is_ok());
}
