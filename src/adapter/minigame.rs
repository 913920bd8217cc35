use async_trait::async_trait;
use serde::Serialize;

use crate::engine::rounds::RoundId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MinigameMode {
    Idle,
    Active,
}

impl MinigameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinigameMode::Idle => "idle",
            MinigameMode::Active => "active",
        }
    }
}

/// Parameters sent along with a mode switch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinigameConfig {
    pub overlay_intensity: f64,
    pub fade_in: bool,
    pub fade_duration_ms: u64,
    pub starting_round_id: Option<RoundId>,
    pub auto_start: bool,
}

/// Commands into the runtime that renders the rounds.
///
/// Events flow the other way as [`crate::engine::events::MinigameEvent`]s.
#[async_trait]
pub trait MinigameRuntime: Send {
    /// Resolve once the runtime can take commands; false when unavailable.
    async fn ensure_ready(&mut self) -> bool;
    fn set_mode(&mut self, mode: MinigameMode, config: MinigameConfig);
    fn set_overlay_intensity(&mut self, value: f64, duration_ms: u64);
    fn start_round(&mut self, round: RoundId, is_final: bool);
}

// Stub implementation for hosts without a minigame runtime.
pub struct NullMinigame;

#[async_trait]
impl MinigameRuntime for NullMinigame {
    async fn ensure_ready(&mut self) -> bool {
        false
    }

    fn set_mode(&mut self, _mode: MinigameMode, _config: MinigameConfig) {}

    fn set_overlay_intensity(&mut self, _value: f64, _duration_ms: u64) {}

    fn start_round(&mut self, _round: RoundId, _is_final: bool) {}
}
