//! In-memory playback primitive.
//!
//! `SilentBackend` tracks player state (playing, volume, loop, position)
//! without producing audio. The headless binary uses it as a dry-run output
//! and tests inspect it through the shared [`SilentProbe`].

use ambimix_core::{AmbimixError, PlaybackBackend, PlayerHandle, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Calls observed by the backend, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Load(PathBuf),
    Unload(PathBuf),
    Play(PathBuf),
    Pause { path: PathBuf, immediate: bool },
    SetVolume(PathBuf, f32),
}

#[derive(Debug, Clone)]
struct SilentPlayer {
    path: PathBuf,
    playing: bool,
    volume: f32,
    looping: bool,
    position: Duration,
}

#[derive(Debug, Default)]
struct SilentState {
    next_handle: u64,
    players: HashMap<PlayerHandle, SilentPlayer>,
    missing: HashSet<PathBuf>,
    events: Vec<BackendEvent>,
}

impl SilentState {
    fn player_for(&self, path: &Path) -> Option<&SilentPlayer> {
        self.players.values().find(|p| p.path == path)
    }
}

/// Playback primitive that keeps state but renders nothing.
#[derive(Debug, Default)]
pub struct SilentBackend {
    state: Arc<Mutex<SilentState>>,
}

/// Read/write view onto a [`SilentBackend`]'s state.
#[derive(Debug, Clone)]
pub struct SilentProbe {
    state: Arc<Mutex<SilentState>>,
}

impl SilentBackend {
    /// Create a backend and a probe sharing its state.
    pub fn new() -> (Self, SilentProbe) {
        let state = Arc::new(Mutex::new(SilentState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            SilentProbe { state },
        )
    }
}

impl PlaybackBackend for SilentBackend {
    fn load(&mut self, path: &Path) -> Result<PlayerHandle> {
        let mut state = self.state.lock();
        if state.missing.contains(path) {
            return Err(AmbimixError::ResourceUnavailable(format!(
                "cannot open {}",
                path.display()
            )));
        }
        state.next_handle += 1;
        let handle = PlayerHandle(state.next_handle);
        state.players.insert(
            handle,
            SilentPlayer {
                path: path.to_path_buf(),
                playing: false,
                volume: 1.0,
                looping: false,
                position: Duration::ZERO,
            },
        );
        state.events.push(BackendEvent::Load(path.to_path_buf()));
        Ok(handle)
    }

    fn unload(&mut self, handle: PlayerHandle) {
        let mut state = self.state.lock();
        if let Some(player) = state.players.remove(&handle) {
            state.events.push(BackendEvent::Unload(player.path));
        }
    }

    fn play(&mut self, handle: PlayerHandle) {
        let mut state = self.state.lock();
        let path = match state.players.get_mut(&handle) {
            Some(player) => {
                player.playing = true;
                player.path.clone()
            }
            None => return,
        };
        state.events.push(BackendEvent::Play(path));
    }

    fn pause(&mut self, handle: PlayerHandle, immediate: bool) {
        let mut state = self.state.lock();
        let path = match state.players.get_mut(&handle) {
            Some(player) => {
                player.playing = false;
                player.path.clone()
            }
            None => return,
        };
        state.events.push(BackendEvent::Pause { path, immediate });
    }

    fn set_volume(&mut self, handle: PlayerHandle, volume: f32) {
        let mut state = self.state.lock();
        let path = match state.players.get_mut(&handle) {
            Some(player) => {
                player.volume = volume;
                player.path.clone()
            }
            None => return,
        };
        state.events.push(BackendEvent::SetVolume(path, volume));
    }

    fn set_loop(&mut self, handle: PlayerHandle, looping: bool) {
        if let Some(player) = self.state.lock().players.get_mut(&handle) {
            player.looping = looping;
        }
    }

    fn current_position(&self, handle: PlayerHandle) -> Duration {
        self.state
            .lock()
            .players
            .get(&handle)
            .map(|p| p.position)
            .unwrap_or_default()
    }

    fn is_playing(&self, handle: PlayerHandle) -> bool {
        self.state
            .lock()
            .players
            .get(&handle)
            .is_some_and(|p| p.playing)
    }
}

impl SilentProbe {
    /// Make future loads of `path` fail.
    pub fn mark_missing(&self, path: impl Into<PathBuf>) {
        self.state.lock().missing.insert(path.into());
    }

    pub fn is_playing(&self, path: impl AsRef<Path>) -> bool {
        self.state
            .lock()
            .player_for(path.as_ref())
            .is_some_and(|p| p.playing)
    }

    pub fn volume(&self, path: impl AsRef<Path>) -> Option<f32> {
        self.state.lock().player_for(path.as_ref()).map(|p| p.volume)
    }

    pub fn is_looping(&self, path: impl AsRef<Path>) -> bool {
        self.state
            .lock()
            .player_for(path.as_ref())
            .is_some_and(|p| p.looping)
    }

    pub fn is_loaded(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().player_for(path.as_ref()).is_some()
    }

    /// Paths of every playing player, sorted.
    pub fn playing(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .state
            .lock()
            .players
            .values()
            .filter(|p| p.playing)
            .map(|p| p.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Move every playing player's position forward, wrapping looped players
    /// at `loop_length`.
    pub fn advance(&self, dt: Duration, loop_length: Duration) {
        for player in self.state.lock().players.values_mut() {
            if !player.playing {
                continue;
            }
            player.position += dt;
            if player.looping && !loop_length.is_zero() && player.position >= loop_length {
                let wrapped = player.position.as_nanos() % loop_length.as_nanos();
                player.position = Duration::from_nanos(wrapped as u64);
            }
        }
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Number of `set_volume` calls observed.
    pub fn volume_writes(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, BackendEvent::SetVolume(..)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_to_load() {
        let (mut backend, probe) = SilentBackend::new();
        probe.mark_missing("/s/gone.m4a");
        assert!(matches!(
            backend.load(Path::new("/s/gone.m4a")),
            Err(AmbimixError::ResourceUnavailable(_))
        ));
        assert!(backend.load(Path::new("/s/rain.m4a")).is_ok());
    }

    #[test]
    fn test_play_pause_cycle() {
        let (mut backend, probe) = SilentBackend::new();
        let h = backend.load(Path::new("/s/rain.m4a")).unwrap();
        backend.play(h);
        assert!(backend.is_playing(h));
        assert!(probe.is_playing("/s/rain.m4a"));
        backend.pause(h, true);
        assert!(!probe.is_playing("/s/rain.m4a"));
    }

    #[test]
    fn test_position_wraps_when_looping() {
        let (mut backend, probe) = SilentBackend::new();
        let h = backend.load(Path::new("/s/rain.m4a")).unwrap();
        backend.set_loop(h, true);
        backend.play(h);
        probe.advance(Duration::from_secs(25), Duration::from_secs(10));
        assert_eq!(backend.current_position(h), Duration::from_secs(5));
    }

    #[test]
    fn test_unload_forgets_player() {
        let (mut backend, probe) = SilentBackend::new();
        let h = backend.load(Path::new("/s/rain.m4a")).unwrap();
        backend.unload(h);
        assert!(!probe.is_loaded("/s/rain.m4a"));
        assert!(!backend.is_playing(h));
    }
}
