use tracing::{debug, info};

pub const OVERWORLD_BGM: &str = "RBY 103 Pallet Town.ogg";
pub const DEFAULT_SOUND_VOLUME: f32 = 0.7;

/// Playback surface used by scenes. Paths are relative to the audio asset
/// directory.
pub trait AudioSink {
    fn play_bgm(&mut self, track: &str);
    fn play_sound(&mut self, sound: &str, volume: f32);
    /// Clamped to `0.0..=1.0`.
    fn set_bgm_volume(&mut self, volume: f32);
    fn bgm_volume(&self) -> f32;
}

/// Sink without a mixer: records what would play and logs it.
#[derive(Debug, Clone, PartialEq)]
pub struct TracingAudio {
    current_bgm: Option<String>,
    volume: f32,
}

impl TracingAudio {
    pub fn new(volume: f32) -> Self {
        Self {
            current_bgm: None,
            volume: sanitize_volume(volume),
        }
    }

    #[cfg(test)]
    pub fn current_bgm(&self) -> Option<&str> {
        self.current_bgm.as_deref()
    }
}

impl AudioSink for TracingAudio {
    fn play_bgm(&mut self, track: &str) {
        if self.current_bgm.as_deref() == Some(track) {
            return;
        }
        info!(track, volume = self.volume, "bgm_started");
        self.current_bgm = Some(track.to_string());
    }

    fn play_sound(&mut self, sound: &str, volume: f32) {
        debug!(sound, volume, "sound_played");
    }

    fn set_bgm_volume(&mut self, volume: f32) {
        self.volume = sanitize_volume(volume);
        debug!(volume = self.volume, "bgm_volume_set");
    }

    fn bgm_volume(&self) -> f32 {
        self.volume
    }
}

fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_clamped() {
        let mut audio = TracingAudio::new(2.0);
        assert_eq!(audio.bgm_volume(), 1.0);
        audio.set_bgm_volume(-0.5);
        assert_eq!(audio.bgm_volume(), 0.0);
        audio.set_bgm_volume(f32::NAN);
        assert_eq!(audio.bgm_volume(), 0.0);
    }

    #[test]
    fn replaying_same_track_keeps_it() {
        let mut audio = TracingAudio::new(0.5);
        audio.play_bgm(OVERWORLD_BGM);
        audio.play_bgm(OVERWORLD_BGM);
        assert_eq!(audio.current_bgm(), Some(OVERWORLD_BGM));
    }
}
