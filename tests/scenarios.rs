//! End-to-end session scenarios against recording collaborators and a
//! manual clock.

use std::sync::Arc;

use arcadeflow::adapter::recording::{
    AudioCall, RecordingAudio, RecordingMinigame, RecordingPresenter, StartOutcome,
};
use arcadeflow::adapter::{ManualClock, MinigameMode};
use arcadeflow::config::SessionConfig;
use arcadeflow::engine::content::{ContentLibrary, ContentSelector, InterjectionKind, OutcomeCategory};
use arcadeflow::engine::events::MinigameEvent;
use arcadeflow::engine::rounds::{RoundId, CANONICAL_ORDER};
use arcadeflow::engine::session::{Collaborators, Session};
use arcadeflow::engine::state::{SessionPhase, SurveyAnimPhase};
use serde_json::{json, Value};

struct Harness {
    session: Session,
    clock: ManualClock,
    audio: RecordingAudio,
    minigame: RecordingMinigame,
    presenter: RecordingPresenter,
}

fn harness_with(cfg: SessionConfig, audio: RecordingAudio) -> Harness {
    let clock = ManualClock::new(1_000_000);
    let minigame = RecordingMinigame::new();
    let presenter = RecordingPresenter::new();
    let collab = Collaborators {
        audio: Box::new(audio.clone()),
        minigame: Box::new(minigame.clone()),
        presenter: Box::new(presenter.clone()),
        clock: Arc::new(clock.clone()),
    };
    let content = ContentSelector::seeded(ContentLibrary::builtin(), 42);
    Harness {
        session: Session::new(cfg, content, collab),
        clock,
        audio,
        minigame,
        presenter,
    }
}

fn harness(cfg: SessionConfig) -> Harness {
    harness_with(cfg, RecordingAudio::new())
}

fn success() -> MinigameEvent {
    MinigameEvent::Success { round_id: None, payload: Value::Null }
}

fn complete(is_final: bool) -> MinigameEvent {
    MinigameEvent::Complete { round_id: None, is_final, payload: Value::Null }
}

/// enter → confirm → start (auto-begins round 0)
async fn into_first_round(h: &mut Harness, deep_link: Option<&str>) {
    h.session.enter(deep_link).await;
    h.session.confirm_headphones().await;
    h.session.start_session().await;
    assert_eq!(h.session.phase(), SessionPhase::RoundActive);
}

/// Answer every survey item, letting each animation settle.
fn answer_all(h: &mut Harness, value: f64) {
    while h.session.phase() == SessionPhase::PostRoundSurvey {
        h.session.answer_survey_item(value);
        h.clock.advance(h.session.config().survey_advance_ms);
        h.session.fire_due_timers();
    }
}

#[tokio::test]
async fn scenario_a_successes_raise_depth_then_survey() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    let env_before = h.session.state().env;

    for _ in 0..10 {
        h.session.on_minigame_event(success());
    }
    assert!((h.session.depth() - 1.0).abs() < 1e-9);

    let env_after = h.session.state().env;
    assert!(env_after.overlay_intensity > env_before.overlay_intensity);
    assert!(env_after.audio_beat_intensity > env_before.audio_beat_intensity);
    assert!((env_after.overlay_intensity - (0.01 + 0.1)).abs() < 1e-9);
    assert!((env_after.audio_beat_intensity - (0.3 + 0.2)).abs() < 1e-9);

    // Each depth change while playing pushes a live update, never a restart.
    assert_eq!(h.audio.starts(), 1);
    assert_eq!(h.audio.updates().len(), 10);

    h.session.on_minigame_event(complete(false));
    assert_eq!(h.session.phase(), SessionPhase::PostRoundSurvey);

    let survey = &h.session.state().survey;
    assert!(survey.active);
    assert_eq!(survey.items.len(), 5);
    let selector = ContentSelector::seeded(ContentLibrary::builtin(), 0);
    let bucket_one: Vec<&str> = selector.eligible_survey_pool(1);
    assert!(survey.items.iter().all(|i| bucket_one.contains(&i.text.as_str())));
    assert_eq!(h.session.state().next_round, Some(RoundId::FollowTheFade));
}

#[tokio::test]
async fn scenario_b_interjection_then_next_round() {
    let cfg = SessionConfig {
        interjection_depth_threshold: 1.0,
        ..Default::default()
    };
    let mut h = harness(cfg);
    into_first_round(&mut h, None).await;

    for _ in 0..40 {
        h.session.on_minigame_event(success());
    }
    assert!((h.session.depth() - 4.0).abs() < 1e-9);

    let expected_kind = h.session.state().interjection.next_kind;
    h.session.on_minigame_event(complete(false));
    assert_eq!(h.session.phase(), SessionPhase::Interjection);

    let interjection = h.session.state().interjection.clone();
    assert!(interjection.active);
    assert_eq!(interjection.kind, Some(expected_kind));
    assert!(!interjection.steps.is_empty());

    for _ in 0..interjection.steps.len() {
        h.session.advance_interjection();
    }

    assert_eq!(h.session.phase(), SessionPhase::RoundInstructions);
    assert_eq!(h.session.state().next_round, Some(RoundId::FollowTheFade));
    assert!(!h.session.state().interjection.active);
    assert_eq!(h.session.state().interjection.next_kind, expected_kind.flip());
    assert_eq!(h.session.stats().interjections, 1);
}

#[tokio::test]
async fn scenario_c_audio_failure_is_silent() {
    for outcome in [StartOutcome::Fails, StartOutcome::Declined] {
        let mut h = harness_with(SessionConfig::default(), RecordingAudio::with_outcome(outcome));
        into_first_round(&mut h, None).await;

        assert!(!h.session.state().beat.playing);
        assert_eq!(h.audio.starts(), 1);

        // Not playing means no live updates either.
        h.session.on_minigame_event(success());
        assert!(h.audio.updates().is_empty());
        assert_eq!(h.minigame.started_rounds(), vec![(RoundId::TapWhenWhite, false)]);
    }
}

#[tokio::test]
async fn scenario_d_final_completion_from_any_phase() {
    // From a running round.
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    h.session.on_minigame_event(success());
    assert!(h.session.pending_timers() > 0);

    h.session.on_minigame_event(complete(true));
    assert_eq!(h.session.phase(), SessionPhase::Complete);
    assert_eq!(h.session.depth(), 0.0);
    assert_eq!(h.session.pending_timers(), 0);
    assert!(!h.session.state().beat.playing);
    assert_eq!(h.audio.calls().last(), Some(&AudioCall::Stop));

    // From the middle of a survey animation.
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    h.session.on_minigame_event(complete(false));
    h.session.answer_survey_item(5.0);
    assert_eq!(h.session.pending_timers(), 2);

    h.session.on_minigame_event(complete(true));
    assert_eq!(h.session.phase(), SessionPhase::Complete);
    assert_eq!(h.session.pending_timers(), 0);
    assert_eq!(h.session.depth(), 0.0);
    assert!(!h.session.state().survey.active);
}

#[tokio::test]
async fn scenario_e_reenter_after_complete() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    h.session.on_minigame_event(success());
    h.session.on_minigame_event(complete(true));
    assert_eq!(h.session.phase(), SessionPhase::Complete);

    h.session
        .enter(Some("https://arcade.test/#induction-arcade?game=follow-the-fade"))
        .await;

    let state = h.session.state();
    assert!(state.active);
    assert_eq!(state.phase, SessionPhase::HeadphoneCheck);
    assert_eq!(state.depth, 0.0);
    assert_eq!(state.starting_round, RoundId::FollowTheFade);
    assert_eq!(
        state.round_order,
        vec![RoundId::FollowTheFade, RoundId::FocusExercise, RoundId::TapWhenWhite]
    );
    assert_eq!(h.session.stats().successes, 0);
}

#[tokio::test]
async fn enter_is_ignored_mid_session() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    h.session.enter(Some("#induction-arcade?game=focus-exercise")).await;
    assert_eq!(h.session.phase(), SessionPhase::RoundActive);
    assert_eq!(h.session.state().starting_round, RoundId::TapWhenWhite);
}

#[tokio::test]
async fn full_session_walks_every_round() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;

    // Round 1: shallow, straight into the survey.
    h.session.on_minigame_event(success());
    h.session.on_minigame_event(complete(false));
    assert_eq!(h.session.phase(), SessionPhase::PostRoundSurvey);
    answer_all(&mut h, 2.0);
    assert_eq!(h.session.phase(), SessionPhase::RoundInstructions);
    assert_eq!(h.session.state().next_round, Some(RoundId::FollowTheFade));
    assert_eq!(h.session.stats().responses, 5);

    // Round 2.
    h.session.begin_current_round().await;
    assert_eq!(h.session.state().current_round, Some(RoundId::FollowTheFade));
    h.session.on_minigame_event(complete(false));
    answer_all(&mut h, 3.0);
    assert_eq!(h.session.state().next_round, Some(RoundId::FocusExercise));

    // Round 3 is last in the order, so the runtime is told it is final.
    h.session.begin_current_round().await;
    assert_eq!(
        h.minigame.started_rounds(),
        vec![
            (RoundId::TapWhenWhite, false),
            (RoundId::FollowTheFade, false),
            (RoundId::FocusExercise, true),
        ]
    );

    // The relaxation round never ends a session by itself; in canonical order
    // there is nothing after it, so branch resolution completes.
    h.session.on_minigame_event(complete(true));
    assert_eq!(h.session.phase(), SessionPhase::Complete);
    assert_eq!(h.session.stats().rounds_completed, 3);
    assert_eq!(h.session.state().responses.len(), 10);
}

#[tokio::test]
async fn relaxation_round_resets_non_canonical_order() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, Some("#induction-arcade?game=focus-exercise")).await;
    assert_eq!(h.session.state().current_round, Some(RoundId::FocusExercise));
    assert_eq!(h.minigame.started_rounds(), vec![(RoundId::FocusExercise, true)]);

    h.session.on_minigame_event(MinigameEvent::Complete {
        round_id: Some("focusExercise".to_string()),
        is_final: true,
        payload: json!({}),
    });

    assert_eq!(h.session.phase(), SessionPhase::PostRoundSurvey);
    assert_eq!(h.session.state().round_order, CANONICAL_ORDER.to_vec());
    assert_eq!(h.session.state().next_round, Some(RoundId::TapWhenWhite));
}

#[tokio::test]
async fn relaxation_round_success_shows_instruction() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, Some("#induction-arcade?game=focus_exercise")).await;

    h.session.on_minigame_event(MinigameEvent::Success {
        round_id: Some("focusExercise".to_string()),
        payload: json!({"instruction": "Follow the dot with your eyes."}),
    });
    assert_eq!(
        h.session.state().last_affirmation.as_deref(),
        Some("Follow the dot with your eyes.")
    );

    h.clock.advance(h.session.config().affirmation_clear_ms);
    h.session.fire_due_timers();
    assert_eq!(h.session.state().last_affirmation, None);
}

#[tokio::test]
async fn survey_answer_cycle_and_praise() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    h.session.on_minigame_event(complete(false));

    let depth_before = h.session.depth();
    h.session.answer_survey_item(4.0);
    assert!((h.session.depth() - depth_before - 0.05).abs() < 1e-9);
    assert_eq!(h.session.state().survey.anim, SurveyAnimPhase::Affirming);
    assert!(h.session.state().survey.last_affirmation.is_some());

    h.clock.advance(500);
    h.session.fire_due_timers();
    assert_eq!(h.session.state().survey.anim, SurveyAnimPhase::FadingOut);
    assert_eq!(h.session.state().survey.current_index, 0);

    h.clock.advance(400);
    h.session.fire_due_timers();
    assert_eq!(h.session.state().survey.anim, SurveyAnimPhase::Idle);
    assert_eq!(h.session.state().survey.current_index, 1);
    assert_eq!(h.session.state().survey.last_affirmation, None);

    // Below the praise threshold, and non-numeric, leave depth alone.
    let depth = h.session.depth();
    h.session.answer_survey_item(3.0);
    h.clock.advance(900);
    h.session.fire_due_timers();
    h.session.answer_survey_item(f64::NAN);
    assert_eq!(h.session.depth(), depth);
    assert_eq!(h.session.state().survey.responses.len(), 3);
}

#[tokio::test]
async fn exit_mid_survey_cancels_timers() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    h.session.on_minigame_event(complete(false));
    h.session.answer_survey_item(5.0);
    assert_eq!(h.session.pending_timers(), 2);

    h.session.exit_session();
    assert!(!h.session.state().active);
    assert_eq!(h.session.phase(), SessionPhase::HeadphoneCheck);
    assert_eq!(h.session.pending_timers(), 0);

    let frames = h.presenter.count();
    h.clock.advance(5_000);
    assert_eq!(h.session.fire_due_timers(), 0);
    assert_eq!(h.presenter.count(), frames);

    // Intents after exit are ignored until the next enter.
    h.session.start_session().await;
    assert_eq!(h.session.phase(), SessionPhase::HeadphoneCheck);
}

#[tokio::test]
async fn minigame_mode_and_overlay_commands() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;

    let modes = h.minigame.modes();
    let (last_mode, last_config) = modes.last().copied().unwrap();
    assert_eq!(last_mode, MinigameMode::Active);
    assert!(!last_config.fade_in);
    assert_eq!(last_config.fade_duration_ms, 1200);
    assert_eq!(modes[0].0, MinigameMode::Idle);

    h.session.on_minigame_event(success());
    let overlays = h.minigame.overlays();
    assert_eq!(overlays.len(), 1);
    assert!((overlays[0].0 - 0.02).abs() < 1e-9);
    assert_eq!(overlays[0].1, 600);

    h.session.on_minigame_event(complete(false));
    assert_eq!(h.minigame.overlays().last().map(|o| o.1), Some(800));
}

#[tokio::test]
async fn start_session_delegates_when_round_queued() {
    let cfg = SessionConfig {
        auto_begin_first_round: false,
        ..Default::default()
    };
    let mut h = harness(cfg);
    h.session.enter(None).await;
    h.session.confirm_headphones().await;
    h.session.start_session().await;
    assert_eq!(h.session.phase(), SessionPhase::RoundInstructions);
    assert_eq!(h.session.state().next_round, Some(RoundId::TapWhenWhite));
    assert!(h.minigame.started_rounds().is_empty());

    h.session.start_session().await;
    assert_eq!(h.session.phase(), SessionPhase::RoundActive);
    assert_eq!(h.audio.starts(), 1);
}

#[tokio::test]
async fn unavailable_minigame_stalls_in_round() {
    let clock = ManualClock::new(0);
    let audio = RecordingAudio::new();
    let collab = Collaborators {
        audio: Box::new(audio.clone()),
        minigame: Box::new(RecordingMinigame::unavailable()),
        presenter: Box::new(RecordingPresenter::new()),
        clock: Arc::new(clock),
    };
    let content = ContentSelector::seeded(ContentLibrary::builtin(), 1);
    let mut session = Session::new(SessionConfig::default(), content, collab);

    session.enter(None).await;
    session.confirm_headphones().await;
    session.start_session().await;
    assert_eq!(session.phase(), SessionPhase::RoundActive);
    assert!(!session.state().minigame_ready);
    assert_eq!(audio.starts(), 1);
}

#[tokio::test]
async fn interjection_kinds_alternate() {
    let cfg = SessionConfig {
        interjection_depth_threshold: 0.5,
        ..Default::default()
    };
    let mut h = harness(cfg);
    into_first_round(&mut h, None).await;
    for _ in 0..6 {
        h.session.on_minigame_event(success());
    }

    h.session.on_minigame_event(complete(false));
    assert_eq!(h.session.state().interjection.kind, Some(InterjectionKind::Focus));
    while h.session.phase() == SessionPhase::Interjection {
        h.session.advance_interjection();
    }

    h.session.begin_current_round().await;
    h.session.on_minigame_event(complete(false));
    assert_eq!(h.session.phase(), SessionPhase::Interjection);
    assert_eq!(h.session.state().interjection.kind, Some(InterjectionKind::Relaxation));
}

#[tokio::test]
async fn failing_warm_up_still_reaches_intro() {
    let audio = RecordingAudio::with_outcome(StartOutcome::Fails);
    let mut h = harness_with(SessionConfig::default(), audio);
    h.session.enter(None).await;
    assert!(h.audio.calls().is_empty());

    h.session.confirm_headphones().await;
    assert_eq!(h.session.phase(), SessionPhase::Intro);
    // Entering Intro silences audio before the warm-up is attempted.
    assert_eq!(h.audio.calls(), vec![AudioCall::Stop, AudioCall::Warm]);
    assert_eq!(h.session.depth(), 0.0);
    assert_eq!(h.session.state().env.depth_level, 0.0);
    assert!(!h.session.state().beat.playing);
    assert_eq!(h.presenter.last().unwrap().phase, SessionPhase::Intro);

    // A failed start does not block the round either.
    h.session.start_session().await;
    assert_eq!(h.session.phase(), SessionPhase::RoundActive);
    assert_eq!(h.audio.starts(), 1);
    assert!(!h.session.state().beat.playing);
}

#[tokio::test]
async fn declined_warm_up_still_reaches_intro() {
    let audio = RecordingAudio::with_outcome(StartOutcome::Declined);
    let mut h = harness_with(SessionConfig::default(), audio);
    h.session.enter(None).await;
    h.session.confirm_headphones().await;
    assert_eq!(h.session.phase(), SessionPhase::Intro);
    assert!(h.audio.calls().contains(&AudioCall::Warm));
}

#[tokio::test]
async fn reopened_session_wipes_depth_on_intro() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    for _ in 0..12 {
        h.session.on_minigame_event(success());
    }
    h.session.on_minigame_event(complete(true));
    assert_eq!(h.session.phase(), SessionPhase::Complete);
    let stops = h.audio.stops();

    h.session.enter(None).await;
    h.session.confirm_headphones().await;
    assert_eq!(h.session.phase(), SessionPhase::Intro);
    assert_eq!(h.audio.stops(), stops + 2);
    assert_eq!(h.session.depth(), 0.0);
    assert!(h.session.state().last_affirmation.is_none());
}

#[tokio::test]
async fn deepest_successes_draw_top_content_bucket() {
    let mut h = harness(SessionConfig::default());
    into_first_round(&mut h, None).await;
    for _ in 0..50 {
        h.session.on_minigame_event(success());
    }
    assert_eq!(h.session.depth(), h.session.config().max_depth);

    let top = ContentLibrary::builtin().affirmations[&OutcomeCategory::Success][&3].clone();
    let line = h.session.state().last_affirmation.clone().unwrap();
    assert!(top.contains(&line), "{} not from the deepest bucket", line);
}
