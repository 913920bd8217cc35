//! Bounded conditioning depth and the pure functions derived from it.
//!
//! Depth is the only progression scalar. Everything the collaborators see
//! (overlay strength, beat intensity, tone pair, content bucket) is computed
//! from it here and never stored independently.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;

/// Accumulated increments within this distance of the ceiling land on it.
const DEPTH_EPSILON: f64 = 1e-9;

/// Environment parameters pushed to presentation and the minigame runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub depth_level: f64,
    pub overlay_intensity: f64,
    pub audio_beat_intensity: f64,
}

/// Left/right carrier pair for the audio engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatFrequencies {
    pub freq_left: f64,
    pub freq_right: f64,
}

impl BeatFrequencies {
    pub fn spread(&self) -> f64 {
        self.freq_right - self.freq_left
    }
}

#[derive(Debug, Clone)]
pub struct DepthModel {
    pub max_depth: f64,
    pub overlay_base: f64,
    pub overlay_scale: f64,
    pub beat_base: f64,
    pub beat_scale: f64,
    pub left_hz: f64,
    pub start_spread_hz: f64,
    pub end_spread_hz: f64,
    pub content_max_bucket: u32,
}

impl DepthModel {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            max_depth: cfg.max_depth,
            overlay_base: cfg.overlay_base,
            overlay_scale: cfg.overlay_scale,
            beat_base: cfg.beat_base,
            beat_scale: cfg.beat_scale,
            left_hz: cfg.beat_left_hz,
            start_spread_hz: cfg.beat_start_spread_hz,
            end_spread_hz: cfg.beat_end_spread_hz,
            content_max_bucket: cfg.content_max_bucket,
        }
    }

    /// Clamp into `[0, max_depth]`; NaN and infinities become 0.
    ///
    /// Values within `DEPTH_EPSILON` of `max_depth` snap onto it.
    pub fn clamp(&self, raw: f64) -> f64 {
        if !raw.is_finite() {
            return 0.0;
        }
        if raw >= self.max_depth - DEPTH_EPSILON {
            return self.max_depth;
        }
        raw.max(0.0)
    }

    /// `clamp(current + delta)`; a non-finite delta contributes nothing.
    pub fn apply_delta(&self, current: f64, delta: f64) -> f64 {
        let delta = if delta.is_finite() { delta } else { 0.0 };
        self.clamp(self.clamp(current) + delta)
    }

    pub fn environment(&self, depth: f64) -> EnvironmentSnapshot {
        let d = self.clamp(depth);
        EnvironmentSnapshot {
            depth_level: d,
            overlay_intensity: self.overlay_base + d * self.overlay_scale,
            audio_beat_intensity: self.beat_base + d * self.beat_scale,
        }
    }

    /// The right tone converges on the left one as depth grows.
    pub fn beat_frequencies(&self, depth: f64) -> BeatFrequencies {
        let progress = self.clamp(depth) / self.max_depth;
        let spread = self.start_spread_hz + (self.end_spread_hz - self.start_spread_hz) * progress;
        BeatFrequencies {
            freq_left: self.left_hz,
            freq_right: self.left_hz + spread,
        }
    }

    /// Nearest integer bucket, used to index content pools.
    pub fn bucket(&self, depth: f64) -> u32 {
        let top = self.max_depth.floor().max(0.0) as u32;
        (self.clamp(depth).round() as u32).min(top)
    }

    /// [`DepthModel::bucket`] capped at the deepest bucket content is written for.
    pub fn content_bucket(&self, depth: f64) -> u32 {
        self.bucket(depth).min(self.content_max_bucket)
    }
}

impl Default for DepthModel {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
