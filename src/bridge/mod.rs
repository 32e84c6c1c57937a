// Sequencer bridge - song registry, current song and latched volume
//
// All calls are synchronous on the caller's thread. Mutations of the
// sequencer (start, stop, binding during load) run with the host audio
// callback suspended; volume writes do not.

mod song;

pub use song::{Song, SongId};

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{MAX_VOLUME, NativeMidiConfig};
use crate::error::{LoadStep, NativeMidiError, PlatformError};
use crate::host::{AudioCallbackControl, CallbackSuspension};
use crate::sequencer::{END_OF_TRACK, MusicPlayer, MusicTimeStamp, OutputUnit, SequencerPlatform};

/// Playback state guarded by the bridge
struct Deck<P: SequencerPlatform> {
    songs: HashMap<SongId, Song<P>>,
    current: Option<SongId>,
    latched_volume: i32,
}

impl<P: SequencerPlatform> Deck<P> {
    fn current_song(&self) -> Option<&Song<P>> {
        self.current.and_then(|id| self.songs.get(&id))
    }

    fn start(&mut self, id: SongId) {
        if let Some(previous) = self.current.take()
            && let Some(song) = self.songs.get_mut(&previous)
        {
            debug!("Stopping song {:?}", previous);
            song.stop();
        }

        self.current = Some(id);
        if let Some(song) = self.songs.get_mut(&id) {
            song.play_from_start();
        }

        // The new output node has never seen the latched value
        self.apply_volume(self.latched_volume, true);
    }

    fn stop(&mut self) {
        if let Some(id) = self.current.take()
            && let Some(song) = self.songs.get_mut(&id)
        {
            song.stop();
        }
    }

    fn apply_volume(&mut self, level: i32, force: bool) {
        if !force && level == self.latched_volume {
            return;
        }
        self.latched_volume = level;

        if let Some(unit) = self.current_song().and_then(|song| song.output()) {
            let volume = level as f32 / MAX_VOLUME as f32;
            if let Err(e) = unit.set_volume(volume) {
                warn!("Failed to set MIDI output volume: {}", e);
            }
        }
    }
}

/// Native MIDI playback context owned by a mixer
pub struct NativeMidi<P: SequencerPlatform, H: AudioCallbackControl> {
    platform: P,
    host: H,
    deck: Deck<P>,
    next_id: u64,
    last_error: String,
}

impl<P: SequencerPlatform, H: AudioCallbackControl> NativeMidi<P, H> {
    pub fn new(platform: P, host: H) -> Result<Self, NativeMidiError> {
        Self::with_config(platform, host, &NativeMidiConfig::default())
    }

    pub fn with_config(
        platform: P,
        host: H,
        config: &NativeMidiConfig,
    ) -> Result<Self, NativeMidiError> {
        if !platform.detect() {
            return Err(NativeMidiError::UnsupportedPlatform);
        }

        Ok(Self {
            platform,
            host,
            deck: Deck {
                songs: HashMap::new(),
                current: None,
                latched_volume: config.initial_volume,
            },
            next_id: 0,
            last_error: String::new(),
        })
    }

    /// Whether native MIDI playback is available
    pub fn detect(&self) -> bool {
        self.platform.detect()
    }

    /// Load a song from an in-memory MIDI byte stream
    pub fn load(&mut self, data: &[u8]) -> Result<SongId, NativeMidiError> {
        match Song::load(&mut self.platform, &self.host, data) {
            Ok(song) => {
                let id = SongId(self.next_id);
                self.next_id += 1;
                info!(
                    "Loaded MIDI song {:?}: {} bytes, {:.2} beats",
                    id,
                    data.len(),
                    song.end_time()
                );
                self.deck.songs.insert(id, song);
                Ok(id)
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// Load from a seekable byte source
    ///
    /// The source is read from its start to its end. Pass it by value to
    /// close it once loaded, or as `&mut` to keep it open.
    pub fn load_rw<R: Read + Seek>(&mut self, mut source: R) -> Result<SongId, NativeMidiError> {
        match read_stream(&mut source) {
            Ok(data) => self.load(&data),
            Err(e) => Err(self.record(NativeMidiError::load(LoadStep::ReadStream, e))),
        }
    }

    /// Load a MIDI file
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<SongId, NativeMidiError> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => self.load_rw(file),
            Err(e) => {
                debug!("Cannot open {}", path.display());
                Err(self.record(NativeMidiError::load(LoadStep::Open, e)))
            }
        }
    }

    /// Release a song, stopping it first if it is playing
    pub fn free(&mut self, id: SongId) {
        let Some(mut song) = self.deck.songs.remove(&id) else {
            return;
        };
        if self.deck.current == Some(id) {
            self.deck.current = None;
        }
        song.stop();
        debug!("Freed MIDI song {:?}", id);
    }

    /// Play a song from the beginning, stopping the current one
    pub fn start(&mut self, id: SongId) {
        if !self.deck.songs.contains_key(&id) {
            debug!("Ignoring start of unknown song {:?}", id);
            return;
        }

        let _suspended = CallbackSuspension::new(&self.host);
        self.deck.start(id);
    }

    pub fn stop(&mut self) {
        if self.deck.current.is_none() {
            return;
        }

        let _suspended = CallbackSuspension::new(&self.host);
        self.deck.stop();
    }

    /// Move a song's clock to `time` beats
    pub fn seek(&mut self, id: SongId, time: MusicTimeStamp) -> Result<(), NativeMidiError> {
        let result = match self.deck.songs.get_mut(&id) {
            Some(song) => song.player_mut().set_time(time),
            None => Err(PlatformError::StaleHandle),
        };

        result.map_err(|source| self.record(NativeMidiError::SeekFailed { time, source }))
    }

    /// Whether the current song is still playing
    ///
    /// A clock parked on the end-of-track marker counts as playing.
    pub fn is_active(&self) -> bool {
        let Some(song) = self.deck.current_song() else {
            return false;
        };

        let now = song.player().time().unwrap_or(0.0);
        now < song.end_time() || now >= END_OF_TRACK
    }

    /// Set the output volume, 0 to 128
    pub fn set_volume(&mut self, level: i32) {
        self.deck.apply_volume(level, false);
    }

    /// Latched volume
    pub fn volume(&self) -> i32 {
        self.deck.latched_volume
    }

    pub fn current(&self) -> Option<SongId> {
        self.deck.current
    }

    /// Clock of the current song
    pub fn position(&self) -> Option<MusicTimeStamp> {
        self.deck
            .current_song()
            .and_then(|song| song.player().time().ok())
    }

    pub fn end_time(&self, id: SongId) -> Option<MusicTimeStamp> {
        self.deck.songs.get(&id).map(|song| song.end_time())
    }

    pub fn song(&self, id: SongId) -> Option<&Song<P>> {
        self.deck.songs.get(&id)
    }

    /// Message of the most recent failure, empty if none
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn record(&mut self, error: NativeMidiError) -> NativeMidiError {
        warn!("{}", error);
        self.last_error = error.to_string();
        error
    }
}

fn read_stream<R: Read + Seek>(source: &mut R) -> std::io::Result<Vec<u8>> {
    let len = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;

    let len = usize::try_from(len)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "stream too large"))?;
    let mut data = vec![0u8; len];
    source.read_exact(&mut data)?;
    Ok(data)
}
