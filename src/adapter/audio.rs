use anyhow::Result;
use async_trait::async_trait;

use crate::engine::depth::BeatFrequencies;

/// Two-tone beat generator.
///
/// `start` and `warm` may fail or decline (platform autoplay policy, no
/// output device); the session treats both as "not playing" and carries on.
#[async_trait]
pub trait AudioEngine: Send {
    async fn start(&mut self, freqs: BeatFrequencies, gain: f64) -> Result<bool>;
    /// Live parameter update; never restarts playback.
    fn update(&mut self, freq_left: Option<f64>, freq_right: Option<f64>);
    fn stop(&mut self);
    /// Prime the engine during a user gesture, before the first real start.
    async fn warm(&mut self) -> Result<bool>;
}

// Stub implementation: inert engine that never plays.
pub struct NullAudio;

#[async_trait]
impl AudioEngine for NullAudio {
    async fn start(&mut self, _freqs: BeatFrequencies, _gain: f64) -> Result<bool> {
        Ok(false)
    }

    fn update(&mut self, _freq_left: Option<f64>, _freq_right: Option<f64>) {}

    fn stop(&mut self) {}

    async fn warm(&mut self) -> Result<bool> {
        Ok(false)
    }
}
