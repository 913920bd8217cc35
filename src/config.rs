use anyhow::{bail, Result};

/// Tunables for one session.
///
/// Timer durations are fixed for the lifetime of a session; they are read once
/// at construction and never changed by intents.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    // === Depth model ===
    pub max_depth: f64,
    pub depth_increment_per_success: f64,
    pub depth_increment_per_positive_survey: f64,
    /// Depth gained per wall-clock millisecond inside a relaxation interjection
    pub depth_increment_per_relaxation_ms: f64,
    /// Depth at or above which an interjection is inserted between rounds
    pub interjection_depth_threshold: f64,
    /// Deepest content bucket the library is written for; deeper depths reuse it
    pub content_max_bucket: u32,

    // === Derived environment ===
    pub overlay_base: f64,
    pub overlay_scale: f64,
    pub beat_base: f64,
    pub beat_scale: f64,
    pub beat_left_hz: f64,
    /// Left/right spread at depth 0
    pub beat_start_spread_hz: f64,
    /// Left/right spread at max depth
    pub beat_end_spread_hz: f64,
    pub beat_gain: f64,

    // === Timers (ms) ===
    pub affirmation_clear_ms: u64,
    pub survey_fade_ms: u64,
    pub survey_advance_ms: u64,
    pub relaxation_tick_ms: u64,

    // === Survey ===
    /// Likert value at or above which an answer counts as positive
    pub praise_threshold: f64,
    pub survey_item_count: usize,

    // === Minigame runtime ===
    pub overlay_fade_ms: u64,
    pub overlay_reassert_ms: u64,
    pub minigame_fade_ms: u64,
    /// Begin round 0 straight away when the session starts
    pub auto_begin_first_round: bool,

    // === Inputs ===
    pub starting_round: Option<String>,
    pub content_path: Option<String>,
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_depth: 5.0,
            depth_increment_per_success: 0.1,
            depth_increment_per_positive_survey: 0.05,
            depth_increment_per_relaxation_ms: 0.00002,
            interjection_depth_threshold: 2.0,
            content_max_bucket: 3,

            overlay_base: 0.01,
            overlay_scale: 0.1,
            beat_base: 0.3,
            beat_scale: 0.2,
            beat_left_hz: 220.0,
            beat_start_spread_hz: 11.0,
            beat_end_spread_hz: 1.5,
            beat_gain: 0.08,

            affirmation_clear_ms: 900,
            survey_fade_ms: 500,
            survey_advance_ms: 900,
            relaxation_tick_ms: 200,

            praise_threshold: 4.0,
            survey_item_count: 5,

            overlay_fade_ms: 600,
            overlay_reassert_ms: 800,
            minigame_fade_ms: 1200,
            auto_begin_first_round: true,

            starting_round: None,
            content_path: None,
            rng_seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_depth: std::env::var("MAX_DEPTH").ok().and_then(|v| v.parse().ok()).unwrap_or(d.max_depth),
            depth_increment_per_success: std::env::var("DEPTH_INC_SUCCESS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.depth_increment_per_success),
            depth_increment_per_positive_survey: std::env::var("DEPTH_INC_SURVEY").ok().and_then(|v| v.parse().ok()).unwrap_or(d.depth_increment_per_positive_survey),
            depth_increment_per_relaxation_ms: std::env::var("DEPTH_INC_RELAX_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.depth_increment_per_relaxation_ms),
            interjection_depth_threshold: std::env::var("INTERJECTION_TH").ok().and_then(|v| v.parse().ok()).unwrap_or(d.interjection_depth_threshold),
            content_max_bucket: std::env::var("CONTENT_MAX_BUCKET").ok().and_then(|v| v.parse().ok()).unwrap_or(d.content_max_bucket),
            overlay_base: std::env::var("OVERLAY_BASE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.overlay_base),
            overlay_scale: std::env::var("OVERLAY_SCALE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.overlay_scale),
            beat_base: std::env::var("BEAT_BASE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.beat_base),
            beat_scale: std::env::var("BEAT_SCALE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.beat_scale),
            beat_left_hz: std::env::var("BEAT_LEFT_HZ").ok().and_then(|v| v.parse().ok()).unwrap_or(d.beat_left_hz),
            beat_start_spread_hz: std::env::var("BEAT_SPREAD_START").ok().and_then(|v| v.parse().ok()).unwrap_or(d.beat_start_spread_hz),
            beat_end_spread_hz: std::env::var("BEAT_SPREAD_END").ok().and_then(|v| v.parse().ok()).unwrap_or(d.beat_end_spread_hz),
            beat_gain: std::env::var("BEAT_GAIN").ok().and_then(|v| v.parse().ok()).unwrap_or(d.beat_gain),
            affirmation_clear_ms: std::env::var("AFFIRMATION_CLEAR_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.affirmation_clear_ms),
            survey_fade_ms: std::env::var("SURVEY_FADE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.survey_fade_ms),
            survey_advance_ms: std::env::var("SURVEY_ADVANCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.survey_advance_ms),
            relaxation_tick_ms: std::env::var("RELAX_TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.relaxation_tick_ms),
            praise_threshold: std::env::var("PRAISE_TH").ok().and_then(|v| v.parse().ok()).unwrap_or(d.praise_threshold),
            survey_item_count: std::env::var("SURVEY_ITEMS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.survey_item_count),
            overlay_fade_ms: std::env::var("OVERLAY_FADE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.overlay_fade_ms),
            overlay_reassert_ms: std::env::var("OVERLAY_REASSERT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.overlay_reassert_ms),
            minigame_fade_ms: std::env::var("MINIGAME_FADE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.minigame_fade_ms),
            auto_begin_first_round: std::env::var("AUTO_BEGIN").map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(d.auto_begin_first_round),
            starting_round: std::env::var("STARTING_ROUND").ok(),
            content_path: std::env::var("CONTENT_PATH").ok(),
            rng_seed: std::env::var("RNG_SEED").ok().and_then(|v| v.parse().ok()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_depth.is_finite() && self.max_depth > 0.0) {
            bail!("max_depth must be a positive number, got {}", self.max_depth);
        }
        for (name, value) in [
            ("depth_increment_per_success", self.depth_increment_per_success),
            ("depth_increment_per_positive_survey", self.depth_increment_per_positive_survey),
            ("depth_increment_per_relaxation_ms", self.depth_increment_per_relaxation_ms),
            ("interjection_depth_threshold", self.interjection_depth_threshold),
        ] {
            if !value.is_finite() {
                bail!("{} must be finite, got {}", name, value);
            }
        }
        if !(1.0..=5.0).contains(&self.praise_threshold) {
            bail!("praise_threshold must lie on the 1..5 scale, got {}", self.praise_threshold);
        }
        if self.relaxation_tick_ms == 0 {
            bail!("relaxation_tick_ms must be non-zero");
        }
        if self.survey_advance_ms < self.survey_fade_ms {
            bail!(
                "survey_advance_ms ({}) must not precede survey_fade_ms ({})",
                self.survey_advance_ms,
                self.survey_fade_ms
            );
        }
        Ok(())
    }
}
