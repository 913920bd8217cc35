//! The phase state machine.
//!
//! [`Session`] owns the depth, the timer registry and the collaborators. All
//! phase changes go through `set_phase`, which cancels every tracked timer
//! before installing the new phase; timer handlers therefore never see a
//! phase other than the one that scheduled them.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use super::content::{ContentLibrary, ContentSelector, InterjectionKind, OutcomeCategory};
use super::depth::DepthModel;
use super::events::{coerce_answer, Inbound, Intent, MinigameEvent, Timestamp};
use super::rounds::{is_canonical, resolve_starting_round, round_order, RoundId, CANONICAL_ORDER};
use super::state::{
    BeatState, InterjectionState, SessionPhase, SessionSnapshot, SessionState, SessionStats,
    SurveyAnimPhase, SurveyResponse, SurveyState,
};
use super::timers::{TimerRegistry, TimerTag};
use crate::adapter::{
    AudioEngine, Clock, MinigameConfig, MinigameMode, MinigameRuntime, NullAudio, NullMinigame,
    NullPresenter, Presenter, SystemClock,
};
use crate::config::SessionConfig;
use crate::logging::{
    log, log_audio, log_depth_change, log_ignored_intent, log_session_summary, log_transition, obj,
    v_num, v_str, Domain, Level,
};

/// Injected collaborators
pub struct Collaborators {
    pub audio: Box<dyn AudioEngine>,
    pub minigame: Box<dyn MinigameRuntime>,
    pub presenter: Box<dyn Presenter>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// No audio, no minigame runtime, no rendering, wall clock.
    pub fn inert() -> Self {
        Self {
            audio: Box::new(NullAudio),
            minigame: Box::new(NullMinigame),
            presenter: Box::new(NullPresenter),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Where branch resolution was entered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchOrigin {
    Round,
    Survey,
    Interjection,
}

pub struct Session {
    cfg: SessionConfig,
    model: DepthModel,
    content: ContentSelector,
    timers: TimerRegistry,
    audio: Box<dyn AudioEngine>,
    minigame: Box<dyn MinigameRuntime>,
    presenter: Box<dyn Presenter>,
    clock: Arc<dyn Clock>,
    state: SessionState,
}

impl Session {
    pub fn new(cfg: SessionConfig, content: ContentSelector, collab: Collaborators) -> Self {
        let model = DepthModel::from_config(&cfg);
        let start = resolve_starting_round(None, cfg.starting_round.as_deref());
        let state = SessionState::new(&model, cfg.beat_gain, start);
        Self {
            cfg,
            model,
            content,
            timers: TimerRegistry::new(),
            audio: collab.audio,
            minigame: collab.minigame,
            presenter: collab.presenter,
            clock: collab.clock,
            state,
        }
    }

    /// Validate the config, load the content library and seed the sampler.
    pub fn from_config(cfg: SessionConfig, collab: Collaborators) -> Result<Self> {
        cfg.validate()?;
        let library = match &cfg.content_path {
            Some(path) => ContentLibrary::load(path)?,
            None => ContentLibrary::builtin(),
        };
        let content = match cfg.rng_seed {
            Some(seed) => ContentSelector::seeded(library, seed),
            None => ContentSelector::new(library),
        };
        Ok(Self::new(cfg, content, collab))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        self.state.stats
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn depth(&self) -> f64 {
        self.state.depth
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn pending_timers_with(&self, tag: TimerTag) -> usize {
        self.timers.pending_with(tag)
    }

    pub fn next_timer_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    pub fn now_ms(&self) -> Timestamp {
        self.clock.now_ms()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub async fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Intent(intent) => self.handle_intent(intent).await,
            Inbound::Minigame(event) => self.on_minigame_event(event),
        }
    }

    pub async fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Enter { deep_link } => self.enter(deep_link.as_deref()).await,
            Intent::ConfirmHeadphones => self.confirm_headphones().await,
            Intent::StartSession => self.start_session().await,
            Intent::BeginCurrentRound => self.begin_current_round().await,
            Intent::AnswerSurveyItem { value } => self.answer_survey_item(coerce_answer(&value)),
            Intent::AdvanceInterjection => self.advance_interjection(),
            Intent::ExitSession => self.exit_session(),
        }
    }

    // =========================================================================
    // Lifecycle intents
    // =========================================================================

    /// Open (or reopen after `Complete`) a session at `HeadphoneCheck`.
    pub async fn enter(&mut self, deep_link: Option<&str>) {
        if self.state.active && self.state.phase != SessionPhase::Complete {
            self.ignore("enter", "session already active");
            return;
        }

        self.state.minigame_ready = self.minigame.ensure_ready().await;
        if !self.state.minigame_ready {
            log(
                Level::Warn,
                Domain::Minigame,
                "unavailable",
                obj(&[("msg", v_str("minigame runtime not ready; rounds will not start"))]),
            );
        }

        let start = resolve_starting_round(deep_link, self.cfg.starting_round.as_deref());
        self.state.stats = SessionStats::default();
        self.state.responses.clear();

        self.set_phase(SessionPhase::HeadphoneCheck, |s| {
            s.active = true;
            s.starting_round = start;
            s.round_order = round_order(start);
            s.current_round = None;
            s.next_round = None;
            s.last_affirmation = None;
            s.interjection = InterjectionState::default();
        });
        self.set_minigame_mode(MinigameMode::Idle, false);

        log(
            Level::Info,
            Domain::Session,
            "enter",
            obj(&[
                ("round_id", v_str(start.as_str())),
                ("deep_link", deep_link.map(v_str).unwrap_or(serde_json::Value::Null)),
                ("order", json!(self.state.round_order)),
            ]),
        );
    }

    pub fn exit_session(&mut self) {
        if !self.state.active {
            self.ignore("exit_session", "session not active");
            return;
        }
        self.timers.cancel_all(None);
        self.state.relaxation_last_tick = None;
        self.set_phase(SessionPhase::HeadphoneCheck, |s| {
            s.active = false;
            s.current_round = None;
            s.next_round = None;
        });
        self.set_minigame_mode(MinigameMode::Idle, false);
        log(Level::Info, Domain::Session, "exit", obj(&[]));
    }

    /// Cancel timers and silence audio when the host goes away.
    ///
    /// The phase is left as is so the final snapshot still describes where the
    /// session stopped.
    pub fn shutdown(&mut self) {
        let cancelled = self.timers.cancel_all(None);
        self.state.relaxation_last_tick = None;
        let beat = self.state.beat;
        self.audio.stop();
        if beat.playing {
            log_audio("stop", beat.freqs.freq_left, beat.freqs.freq_right, "ok");
        }
        self.state.beat.playing = false;
        log(
            Level::Info,
            Domain::Session,
            "shutdown",
            obj(&[
                ("phase", v_str(self.state.phase.as_str())),
                ("cancelled", json!(cancelled)),
            ]),
        );
    }

    pub async fn confirm_headphones(&mut self) {
        if !self.state.active || self.state.phase != SessionPhase::HeadphoneCheck {
            self.ignore("confirm_headphones", "not at headphone check");
            return;
        }
        self.set_phase(SessionPhase::Intro, |s| {
            s.current_round = None;
            s.next_round = None;
            s.last_affirmation = None;
        });

        // Warm-up failure is logged only.
        let freqs = self.state.beat.freqs;
        match self.audio.warm().await {
            Ok(true) => log_audio("warm", freqs.freq_left, freqs.freq_right, "ok"),
            Ok(false) => log_audio("warm", freqs.freq_left, freqs.freq_right, "declined"),
            Err(err) => log_audio(
                "warm",
                freqs.freq_left,
                freqs.freq_right,
                &format!("failed: {}", err),
            ),
        }

        if self.ensure_minigame().await {
            self.set_minigame_mode(MinigameMode::Idle, false);
        }
    }

    /// From `Intro`: queue round 0, start audio, switch the minigame runtime
    /// on, and (by default) begin the round. From `RoundInstructions` this
    /// acts as [`Session::begin_current_round`].
    pub async fn start_session(&mut self) {
        if !self.state.active {
            self.ignore("start_session", "session not active");
            return;
        }
        match self.state.phase {
            SessionPhase::Intro => {}
            SessionPhase::RoundInstructions => {
                log(
                    Level::Debug,
                    Domain::Session,
                    "start_delegated",
                    obj(&[("msg", v_str("round already queued; beginning it"))]),
                );
                self.begin_current_round().await;
                return;
            }
            _ => {
                self.ignore("start_session", "session already started");
                return;
            }
        }

        let order = round_order(self.state.starting_round);
        let Some(first) = order.first().copied() else {
            self.set_phase(SessionPhase::Complete, |_| {});
            return;
        };
        self.set_phase(SessionPhase::RoundInstructions, move |s| {
            s.round_order = order;
            s.current_round = None;
            s.next_round = Some(first);
            s.last_affirmation = None;
        });

        self.start_audio().await;

        if self.ensure_minigame().await {
            self.set_minigame_mode(MinigameMode::Active, false);
        }
        self.render();

        if self.cfg.auto_begin_first_round {
            self.begin_current_round().await;
        }
    }

    pub async fn begin_current_round(&mut self) {
        if !self.state.active || self.state.phase != SessionPhase::RoundInstructions {
            self.ignore("begin_current_round", "no round waiting to begin");
            return;
        }
        let Some(round) = self.state.next_round else {
            self.ignore("begin_current_round", "no queued round");
            return;
        };
        let is_final = self.state.round_order.last() == Some(&round);

        self.state.stats.rounds_started += 1;
        self.set_phase(SessionPhase::RoundActive, move |s| {
            s.current_round = Some(round);
            s.next_round = None;
            s.last_affirmation = None;
        });

        if self.ensure_minigame().await {
            if self.state.minigame_mode != MinigameMode::Active {
                self.set_minigame_mode(MinigameMode::Active, true);
            }
            self.minigame.start_round(round, is_final);
        }
        log(
            Level::Info,
            Domain::Minigame,
            "round_started",
            obj(&[
                ("round_id", v_str(round.as_str())),
                ("final", json!(is_final)),
                ("ready", json!(self.state.minigame_ready)),
            ]),
        );
    }

    // =========================================================================
    // Survey and interjection intents
    // =========================================================================

    /// Record an answer for the current survey item.
    ///
    /// Ignored unless the survey is idle; a NaN value is recorded but never
    /// counts as positive.
    pub fn answer_survey_item(&mut self, value: f64) {
        if !self.state.active || self.state.phase != SessionPhase::PostRoundSurvey {
            self.ignore("answer_survey_item", "no survey open");
            return;
        }
        if self.state.survey.anim != SurveyAnimPhase::Idle {
            self.ignore("answer_survey_item", "survey animating");
            return;
        }
        let Some(item) = self.state.survey.current_item().cloned() else {
            self.ignore("answer_survey_item", "no current item");
            return;
        };

        self.timers.cancel_all(Some(TimerTag::SurveyFade));
        self.timers.cancel_all(Some(TimerTag::SurveyAdvance));

        let positive = value >= self.cfg.praise_threshold;
        if positive {
            self.apply_depth_delta(self.cfg.depth_increment_per_positive_survey, "survey_positive");
        }

        let outcome = if positive { OutcomeCategory::Success } else { OutcomeCategory::Neutral };
        let affirmation = self
            .content
            .select_affirmation(self.model.content_bucket(self.state.depth), outcome);

        self.state.survey.responses.insert(item.id.clone(), value);
        self.state.responses.push(SurveyResponse {
            item_id: item.id.clone(),
            text: item.text.clone(),
            value,
            depth_after: self.state.depth,
        });
        self.state.stats.responses += 1;

        let survey = &mut self.state.survey;
        survey.last_affirmation = Some(affirmation);
        survey.anim = SurveyAnimPhase::Affirming;
        survey.selected_value = Some(value);
        survey.selected_item_id = Some(item.id.clone());

        let now = self.clock.now_ms();
        self.timers.track(TimerTag::SurveyFade, now + self.cfg.survey_fade_ms);
        self.timers.track(TimerTag::SurveyAdvance, now + self.cfg.survey_advance_ms);

        log(
            Level::Info,
            Domain::Survey,
            "answer",
            obj(&[
                ("item_id", v_str(&item.id)),
                ("value", v_num(value)),
                ("positive", json!(positive)),
                ("index", json!(self.state.survey.current_index)),
            ]),
        );
        self.render();
    }

    pub fn advance_interjection(&mut self) {
        if !self.state.active
            || self.state.phase != SessionPhase::Interjection
            || !self.state.interjection.active
        {
            self.ignore("advance_interjection", "no interjection showing");
            return;
        }

        let next_index = self.state.interjection.current_index + 1;
        if next_index < self.state.interjection.steps.len() {
            self.state.interjection.current_index = next_index;
            log(
                Level::Debug,
                Domain::Session,
                "interjection_step",
                obj(&[
                    ("index", json!(next_index)),
                    ("step", json!(self.state.interjection.current_step())),
                ]),
            );
            self.render();
            return;
        }

        let shown = self.state.interjection.kind.unwrap_or(self.state.interjection.next_kind);
        self.state.interjection = InterjectionState {
            next_kind: shown.flip(),
            ..Default::default()
        };
        let next = self.state.next_round;
        self.resolve_branch(next, false, BranchOrigin::Interjection);
    }

    // =========================================================================
    // Minigame events
    // =========================================================================

    pub fn on_minigame_event(&mut self, event: MinigameEvent) {
        match &event {
            MinigameEvent::Success { .. } => self.on_success(&event),
            MinigameEvent::Complete { round_id, is_final, .. } => {
                self.on_complete(round_id.as_deref(), *is_final)
            }
        }
    }

    fn on_success(&mut self, event: &MinigameEvent) {
        if !self.state.active || self.state.phase != SessionPhase::RoundActive {
            self.ignore("minigame_success", "no round active");
            return;
        }
        self.state.stats.successes += 1;
        self.apply_depth_delta(self.cfg.depth_increment_per_success, "minigame_success");

        let round = event
            .round_id()
            .and_then(RoundId::normalize)
            .or(self.state.current_round);
        let line = match (round, event.instruction()) {
            (Some(r), Some(instruction)) if r.is_relaxation() => instruction.to_string(),
            _ => self
                .content
                .select_affirmation(self.model.content_bucket(self.state.depth), OutcomeCategory::Success),
        };
        self.state.last_affirmation = Some(line);

        self.timers.cancel_all(Some(TimerTag::AffirmationClear));
        let due = self.clock.now_ms() + self.cfg.affirmation_clear_ms;
        self.timers.track(TimerTag::AffirmationClear, due);

        self.render();
    }

    fn on_complete(&mut self, round_id: Option<&str>, is_final: bool) {
        if !self.state.active {
            self.ignore("minigame_complete", "session not active");
            return;
        }

        let round = round_id.and_then(RoundId::normalize).or(self.state.current_round);
        let relaxation = round.map_or(false, |r| r.is_relaxation());

        // The relaxation round never ends a session.
        if is_final && !relaxation {
            if self.state.phase == SessionPhase::RoundActive {
                self.state.stats.rounds_completed += 1;
            }
            self.set_phase(SessionPhase::Complete, |s| {
                s.current_round = None;
                s.next_round = None;
            });
            return;
        }

        if self.state.phase != SessionPhase::RoundActive {
            self.ignore("minigame_complete", "no round active");
            return;
        }
        self.state.stats.rounds_completed += 1;

        let order = &self.state.round_order;
        let mut next = match self
            .state
            .current_round
            .and_then(|current| order.iter().position(|r| *r == current))
        {
            Some(index) => order.get(index + 1).copied(),
            None => order.first().copied(),
        };

        if relaxation && !is_canonical(&self.state.round_order) {
            self.state.round_order = CANONICAL_ORDER.to_vec();
            next = CANONICAL_ORDER.first().copied();
            log(
                Level::Info,
                Domain::Session,
                "order_reset",
                obj(&[("order", json!(self.state.round_order))]),
            );
        }

        self.state.current_round = None;
        self.resolve_branch(next, true, BranchOrigin::Round);

        if self.state.phase != SessionPhase::Complete && self.state.minigame_ready {
            self.minigame
                .set_overlay_intensity(self.state.env.overlay_intensity, self.cfg.overlay_reassert_ms);
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Fire every timer due at the current clock time, in deadline order.
    pub fn fire_due_timers(&mut self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now_ms();
            let Some(timer) = self.timers.pop_due(now) else {
                break;
            };
            fired += 1;
            match timer.tag {
                TimerTag::AffirmationClear => self.on_affirmation_clear(),
                TimerTag::SurveyFade => self.on_survey_fade(),
                TimerTag::SurveyAdvance => self.on_survey_advance(),
                TimerTag::RelaxationTick => self.on_relaxation_tick(now),
            }
        }
        fired
    }

    fn on_affirmation_clear(&mut self) {
        debug_assert_eq!(self.state.phase, SessionPhase::RoundActive);
        self.state.last_affirmation = None;
        self.render();
    }

    fn on_survey_fade(&mut self) {
        debug_assert_eq!(self.state.phase, SessionPhase::PostRoundSurvey);
        self.state.survey.anim = SurveyAnimPhase::FadingOut;
        self.render();
    }

    fn on_survey_advance(&mut self) {
        debug_assert_eq!(self.state.phase, SessionPhase::PostRoundSurvey);
        if self.state.survey.is_last_item() {
            let next = self.state.next_round;
            self.resolve_branch(next, true, BranchOrigin::Survey);
            return;
        }
        let survey = &mut self.state.survey;
        survey.current_index += 1;
        survey.anim = SurveyAnimPhase::Idle;
        survey.last_affirmation = None;
        survey.selected_value = None;
        survey.selected_item_id = None;
        self.render();
    }

    /// Accrue depth for the wall-clock time since the previous tick.
    fn on_relaxation_tick(&mut self, now: Timestamp) {
        debug_assert!(self.state.interjection.is_relaxation());
        let last = self.state.relaxation_last_tick.unwrap_or(now);
        let elapsed = now.saturating_sub(last);
        self.state.relaxation_last_tick = Some(now);
        if elapsed > 0 {
            self.apply_depth_delta(
                elapsed as f64 * self.cfg.depth_increment_per_relaxation_ms,
                "relaxation_tick",
            );
            self.render();
        }
    }

    // =========================================================================
    // Transition machinery
    // =========================================================================

    /// The single transition choke point.
    ///
    /// Re-entering the current phase only applies `patch` and re-renders.
    fn set_phase(&mut self, target: SessionPhase, patch: impl FnOnce(&mut SessionState)) {
        if self.state.phase == target {
            patch(&mut self.state);
            self.render();
            return;
        }

        let from = self.state.phase;
        let cancelled = self.timers.cancel_all(None);
        self.state.relaxation_last_tick = None;

        self.apply_entry_effects(target);
        patch(&mut self.state);
        self.state.phase = target;
        self.state.seq += 1;

        if target == SessionPhase::Interjection && self.state.interjection.is_relaxation() {
            let now = self.clock.now_ms();
            self.timers
                .track_every(TimerTag::RelaxationTick, now, self.cfg.relaxation_tick_ms);
            self.state.relaxation_last_tick = Some(now);
        }

        debug_assert!((0.0..=self.model.max_depth).contains(&self.state.depth));
        log_transition(
            from.as_str(),
            target.as_str(),
            self.state.depth,
            cancelled,
            self.state.hash(),
        );
        self.render();
    }

    fn apply_entry_effects(&mut self, target: SessionPhase) {
        if target.is_clean_slate() {
            self.wipe_to_clean_slate(target);
            return;
        }
        match target {
            SessionPhase::RoundInstructions | SessionPhase::RoundActive => {
                self.state.survey = SurveyState::default();
                self.state.interjection = self.state.interjection.reset_keeping_next();
            }
            SessionPhase::PostRoundSurvey => {
                let bucket = self.model.content_bucket(self.state.depth);
                let items = self.content.select_survey_items(bucket, self.cfg.survey_item_count);
                self.state.survey = SurveyState::open(items);
                self.state.interjection = self.state.interjection.reset_keeping_next();
            }
            SessionPhase::Interjection => {
                self.state.survey = SurveyState::default();
            }
            SessionPhase::HeadphoneCheck | SessionPhase::Intro | SessionPhase::Complete => {}
        }
    }

    /// Stop audio and zero depth, sub-state and round pointers.
    fn wipe_to_clean_slate(&mut self, target: SessionPhase) {
        if target == SessionPhase::Complete {
            let s = self.state.stats;
            log_session_summary(
                s.rounds_completed,
                s.successes,
                s.responses,
                s.interjections,
                s.peak_depth,
            );
        }

        let beat = self.state.beat;
        self.audio.stop();
        if beat.playing {
            log_audio("stop", beat.freqs.freq_left, beat.freqs.freq_right, "ok");
        }
        self.state.beat = BeatState::defaults(&self.model, self.cfg.beat_gain);

        self.state.survey = SurveyState::default();
        self.state.interjection = self.state.interjection.reset_keeping_next();

        if self.state.depth != 0.0 {
            let env = self.model.environment(0.0);
            log_depth_change(
                self.state.depth,
                0.0,
                "reset",
                env.overlay_intensity,
                env.audio_beat_intensity,
            );
        }
        self.state.depth = 0.0;
        self.state.env = self.model.environment(0.0);
        self.state.last_affirmation = None;
        self.state.current_round = None;
        self.state.next_round = None;
    }

    /// Decide what follows a finished round, survey or interjection.
    fn resolve_branch(&mut self, next: Option<RoundId>, allow_interjection: bool, origin: BranchOrigin) {
        let depth = self.state.depth;
        if allow_interjection && next.is_some() && depth >= self.cfg.interjection_depth_threshold {
            let kind: InterjectionKind = self.state.interjection.next_kind;
            let steps = self
                .content
                .select_interjection_steps(self.model.content_bucket(depth), kind);
            if !steps.is_empty() {
                self.state.stats.interjections += 1;
                self.set_phase(SessionPhase::Interjection, move |s| {
                    s.next_round = next;
                    s.interjection = InterjectionState {
                        active: true,
                        kind: Some(kind),
                        steps,
                        current_index: 0,
                        next_kind: kind,
                    };
                });
                return;
            }
        }

        match (next, origin) {
            (Some(round), BranchOrigin::Round) => {
                self.set_phase(SessionPhase::PostRoundSurvey, move |s| {
                    s.next_round = Some(round);
                });
                // An empty survey pool would strand the session here.
                if self.state.survey.items.is_empty() {
                    self.resolve_branch(Some(round), true, BranchOrigin::Survey);
                }
            }
            (Some(round), BranchOrigin::Survey | BranchOrigin::Interjection) => {
                self.set_phase(SessionPhase::RoundInstructions, move |s| {
                    s.current_round = None;
                    s.next_round = Some(round);
                });
            }
            (None, _) => {
                self.set_phase(SessionPhase::Complete, |s| {
                    s.current_round = None;
                    s.next_round = None;
                });
            }
        }
    }

    fn apply_depth_delta(&mut self, delta: f64, cause: &str) {
        let before = self.state.depth;
        let after = self.model.apply_delta(before, delta);
        if after == before {
            return;
        }
        self.state.depth = after;
        self.state.env = self.model.environment(after);
        if after > self.state.stats.peak_depth {
            self.state.stats.peak_depth = after;
        }
        let env = self.state.env;
        log_depth_change(before, after, cause, env.overlay_intensity, env.audio_beat_intensity);

        if self.state.beat.playing {
            let freqs = self.model.beat_frequencies(after);
            self.state.beat.freqs = freqs;
            self.audio.update(Some(freqs.freq_left), Some(freqs.freq_right));
        }
        if self.state.minigame_ready {
            self.minigame
                .set_overlay_intensity(env.overlay_intensity, self.cfg.overlay_fade_ms);
        }
    }

    async fn start_audio(&mut self) {
        let freqs = self.model.beat_frequencies(self.state.depth);
        self.state.beat = BeatState {
            freqs,
            gain: self.cfg.beat_gain,
            playing: true,
        };
        let playing = match self.audio.start(freqs, self.cfg.beat_gain).await {
            Ok(true) => {
                log_audio("start", freqs.freq_left, freqs.freq_right, "ok");
                true
            }
            Ok(false) => {
                log_audio("start", freqs.freq_left, freqs.freq_right, "declined");
                false
            }
            Err(err) => {
                log_audio(
                    "start",
                    freqs.freq_left,
                    freqs.freq_right,
                    &format!("failed: {}", err),
                );
                false
            }
        };
        self.state.beat.playing = playing;
    }

    async fn ensure_minigame(&mut self) -> bool {
        if !self.state.minigame_ready {
            self.state.minigame_ready = self.minigame.ensure_ready().await;
        }
        self.state.minigame_ready
    }

    fn set_minigame_mode(&mut self, mode: MinigameMode, fade_in: bool) {
        if !self.state.minigame_ready {
            return;
        }
        let config = MinigameConfig {
            overlay_intensity: self.state.env.overlay_intensity,
            fade_in,
            fade_duration_ms: self.cfg.minigame_fade_ms,
            starting_round_id: self.state.current_round.or(self.state.next_round),
            auto_start: false,
        };
        self.minigame.set_mode(mode, config);
        self.state.minigame_mode = mode;
    }

    fn render(&mut self) {
        let snapshot = self.state.snapshot();
        self.presenter.render(&snapshot);
    }

    fn ignore(&self, intent: &str, reason: &str) {
        log_ignored_intent(intent, self.state.phase.as_str(), reason);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.state.phase)
            .field("depth", &self.state.depth)
            .field("pending_timers", &self.timers.pending())
            .finish_non_exhaustive()
    }
}
