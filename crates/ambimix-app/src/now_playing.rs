use ambimix_core::NowPlaying;
use tracing::info;

/// Reports now-playing changes to the log.
#[derive(Debug, Default)]
pub struct LogNowPlaying;

impl NowPlaying for LogNowPlaying {
    fn notify(&mut self, title: &str, subtitle: &str, is_playing: bool) {
        info!(title, subtitle, is_playing, "Now playing");
    }
}
