//! Session state: phase, depth, round bookkeeping and phase-scoped sub-state.

use std::collections::BTreeMap;

use serde::Serialize;

use super::content::{InterjectionKind, SurveyItem};
use super::depth::{BeatFrequencies, DepthModel, EnvironmentSnapshot};
use super::events::Timestamp;
use super::rounds::{round_order, RoundId};
use crate::adapter::minigame::MinigameMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    HeadphoneCheck,
    Intro,
    RoundInstructions,
    RoundActive,
    PostRoundSurvey,
    Interjection,
    Complete,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::HeadphoneCheck => "headphone_check",
            SessionPhase::Intro => "intro",
            SessionPhase::RoundInstructions => "round_instructions",
            SessionPhase::RoundActive => "round_active",
            SessionPhase::PostRoundSurvey => "post_round_survey",
            SessionPhase::Interjection => "interjection",
            SessionPhase::Complete => "complete",
        }
    }

    /// Phases whose entry wipes depth, audio and sub-state
    pub fn is_clean_slate(&self) -> bool {
        matches!(
            self,
            SessionPhase::HeadphoneCheck | SessionPhase::Intro | SessionPhase::Complete
        )
    }
}

/// Survey animation sub-phase; gates the answer handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SurveyAnimPhase {
    #[default]
    Idle,
    Affirming,
    FadingOut,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyState {
    pub active: bool,
    pub items: Vec<SurveyItem>,
    pub current_index: usize,
    pub responses: BTreeMap<String, f64>,
    pub last_affirmation: Option<String>,
    pub anim: SurveyAnimPhase,
    pub selected_value: Option<f64>,
    pub selected_item_id: Option<String>,
}

impl SurveyState {
    pub fn open(items: Vec<SurveyItem>) -> Self {
        Self {
            active: true,
            items,
            ..Default::default()
        }
    }

    pub fn current_item(&self) -> Option<&SurveyItem> {
        if !self.active {
            return None;
        }
        self.items.get(self.current_index)
    }

    pub fn is_last_item(&self) -> bool {
        self.current_index + 1 >= self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterjectionState {
    pub active: bool,
    pub kind: Option<InterjectionKind>,
    pub steps: Vec<String>,
    pub current_index: usize,
    /// Kind used the next time an interjection is inserted
    pub next_kind: InterjectionKind,
}

impl Default for InterjectionState {
    fn default() -> Self {
        Self {
            active: false,
            kind: None,
            steps: Vec::new(),
            current_index: 0,
            next_kind: InterjectionKind::Focus,
        }
    }
}

impl InterjectionState {
    /// Inactive state that keeps the alternation
    pub fn reset_keeping_next(&self) -> Self {
        Self {
            next_kind: self.next_kind,
            ..Default::default()
        }
    }

    pub fn current_step(&self) -> Option<&str> {
        if !self.active {
            return None;
        }
        self.steps.get(self.current_index).map(String::as_str)
    }

    pub fn is_relaxation(&self) -> bool {
        self.active && self.kind == Some(InterjectionKind::Relaxation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatState {
    #[serde(flatten)]
    pub freqs: BeatFrequencies,
    pub gain: f64,
    pub playing: bool,
}

impl BeatState {
    pub fn defaults(model: &DepthModel, gain: f64) -> Self {
        Self {
            freqs: model.beat_frequencies(0.0),
            gain,
            playing: false,
        }
    }
}

/// One recorded survey answer; the session log of these is append-only
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub item_id: String,
    pub text: String,
    pub value: f64,
    pub depth_after: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub rounds_started: u64,
    pub rounds_completed: u64,
    pub successes: u64,
    pub responses: u64,
    pub interjections: u64,
    pub peak_depth: f64,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub active: bool,
    pub phase: SessionPhase,
    pub depth: f64,
    pub env: EnvironmentSnapshot,

    // Round sequencing
    pub starting_round: RoundId,
    pub round_order: Vec<RoundId>,
    pub current_round: Option<RoundId>,
    pub next_round: Option<RoundId>,

    pub last_affirmation: Option<String>,
    pub survey: SurveyState,
    pub interjection: InterjectionState,
    pub beat: BeatState,
    pub relaxation_last_tick: Option<Timestamp>,

    pub minigame_mode: MinigameMode,
    pub minigame_ready: bool,

    pub responses: Vec<SurveyResponse>,
    pub stats: SessionStats,
    /// Bumped on every phase transition
    pub seq: u64,
}

impl SessionState {
    pub fn new(model: &DepthModel, beat_gain: f64, starting_round: RoundId) -> Self {
        Self {
            active: false,
            phase: SessionPhase::HeadphoneCheck,
            depth: 0.0,
            env: model.environment(0.0),
            starting_round,
            round_order: round_order(starting_round),
            current_round: None,
            next_round: None,
            last_affirmation: None,
            survey: SurveyState::default(),
            interjection: InterjectionState::default(),
            beat: BeatState::defaults(model, beat_gain),
            relaxation_last_tick: None,
            minigame_mode: MinigameMode::Idle,
            minigame_ready: false,
            responses: Vec::new(),
            stats: SessionStats::default(),
            seq: 0,
        }
    }

    /// Deterministic digest of the state, logged with every transition.
    pub fn hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();

        self.active.hash(&mut h);
        self.phase.hash(&mut h);
        self.seq.hash(&mut h);

        // Quantized to avoid float comparison issues
        ((self.depth * 1e8) as i64).hash(&mut h);

        self.round_order.hash(&mut h);
        self.current_round.hash(&mut h);
        self.next_round.hash(&mut h);

        // Survey
        self.survey.active.hash(&mut h);
        self.survey.current_index.hash(&mut h);
        self.survey.anim.hash(&mut h);
        for (id, value) in &self.survey.responses {
            id.hash(&mut h);
            ((value * 1e8) as i64).hash(&mut h);
        }

        // Interjection
        self.interjection.active.hash(&mut h);
        self.interjection.kind.hash(&mut h);
        self.interjection.current_index.hash(&mut h);
        self.interjection.next_kind.hash(&mut h);

        self.beat.playing.hash(&mut h);
        self.responses.len().hash(&mut h);

        h.finish()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            active: self.active,
            environment: self.env,
            last_affirmation: self.last_affirmation.clone(),
            survey: self.survey.clone(),
            interjection: self.interjection.clone(),
            current_round_id: self.current_round,
            next_round_id: self.next_round,
            round_order: self.round_order.clone(),
            beat: self.beat,
            state_hash: format!("{:016x}", self.hash()),
        }
    }
}

/// Read-only view pushed to the presentation layer after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub active: bool,
    pub environment: EnvironmentSnapshot,
    pub last_affirmation: Option<String>,
    pub survey: SurveyState,
    pub interjection: InterjectionState,
    pub current_round_id: Option<RoundId>,
    pub next_round_id: Option<RoundId>,
    pub round_order: Vec<RoundId>,
    pub beat: BeatState,
    pub state_hash: String,
}
