//! Shared test rig: a session over the silent backend and an in-memory store.

use ambimix_audio::{AudioEngine, SilentBackend, SilentProbe};
use ambimix_core::{GlobalSettings, ManualClock, NowPlaying, SoundCatalog, SoundId};
use ambimix_mixer::{capture, MixSession, SessionOptions, SoundSnapshot};
use ambimix_preset::MemoryPresetStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const SOUNDS_DIR: &str = "/snd";

/// Every now-playing update, in order.
#[derive(Clone, Default)]
pub struct RecordingNowPlaying {
    pub updates: Arc<Mutex<Vec<(String, String, bool)>>>,
}

impl RecordingNowPlaying {
    pub fn last(&self) -> Option<(String, String, bool)> {
        self.updates.lock().last().cloned()
    }
}

impl NowPlaying for RecordingNowPlaying {
    fn notify(&mut self, title: &str, subtitle: &str, is_playing: bool) {
        self.updates
            .lock()
            .push((title.to_string(), subtitle.to_string(), is_playing));
    }
}

pub struct Rig {
    pub session: MixSession,
    pub probe: SilentProbe,
    pub store: MemoryPresetStore,
    pub clock: ManualClock,
    pub now_playing: RecordingNowPlaying,
}

pub fn catalog() -> SoundCatalog {
    let mut catalog = SoundCatalog::new();
    for (title, name) in [
        ("Rain", "rain"),
        ("Waves", "waves"),
        ("Fire", "fireplace"),
        ("Wind", "wind"),
        ("White Noise", "white-noise"),
    ] {
        catalog.add_builtin(title, name, "m4a", "nature").unwrap();
    }
    catalog
}

pub fn path(file_name: &str) -> String {
    format!("{SOUNDS_DIR}/{file_name}.m4a")
}

impl Rig {
    pub fn new() -> Self {
        Self::with_engine(|engine| engine)
    }

    pub fn with_engine(configure: impl FnOnce(AudioEngine) -> AudioEngine) -> Self {
        Self::build(MemoryPresetStore::new(), configure)
    }

    /// Start a session over a pre-seeded store.
    pub fn with_store(store: MemoryPresetStore) -> Self {
        Self::build(store, |engine| engine)
    }

    fn build(
        store: MemoryPresetStore,
        configure: impl FnOnce(AudioEngine) -> AudioEngine,
    ) -> Self {
        let (backend, probe) = SilentBackend::new();
        let clock = ManualClock::new();
        let now_playing = RecordingNowPlaying::default();
        let engine = configure(AudioEngine::new(Box::new(backend), SOUNDS_DIR));
        let session = MixSession::new(
            catalog(),
            engine,
            GlobalSettings::default(),
            Box::new(store.clone()),
            SessionOptions::default(),
            Arc::new(clock.clone()),
            Box::new(now_playing.clone()),
        )
        .unwrap();
        Self {
            session,
            probe,
            store,
            clock,
            now_playing,
        }
    }

    pub fn id(&self, name: &str) -> SoundId {
        self.session.find_sound(name).unwrap()
    }

    /// Select a sound at a volume (starting playback through auto-play).
    pub fn select(&mut self, name: &str, volume: f32) {
        let id = self.id(name);
        self.session.set_volume(id, volume).unwrap();
        self.session.set_selected(id, true).unwrap();
    }

    pub fn set_volume(&mut self, name: &str, volume: f32) {
        let id = self.id(name);
        self.session.set_volume(id, volume).unwrap();
    }

    pub fn snapshot(&self) -> Vec<SoundSnapshot> {
        capture(self.session.catalog().iter())
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.session.catalog().by_file_name(name).unwrap().is_selected()
    }

    pub fn volume(&self, name: &str) -> f32 {
        self.session.catalog().by_file_name(name).unwrap().volume()
    }

    pub fn playing(&self, name: &str) -> bool {
        self.probe.is_playing(path(name))
    }

    /// Let fades finish and time pass.
    pub fn settle(&mut self, by: Duration) {
        self.clock.advance(by);
        self.session.tick(by).unwrap();
    }
}
