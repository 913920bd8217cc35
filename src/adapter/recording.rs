//! In-memory collaborators that record every command they receive.
//!
//! Each recorder is cheaply cloneable; clones share one call log, so a test
//! keeps a clone and hands the other to the session.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::audio::AudioEngine;
use super::minigame::{MinigameConfig, MinigameMode, MinigameRuntime};
use super::presenter::Presenter;
use crate::engine::depth::BeatFrequencies;
use crate::engine::rounds::RoundId;
use crate::engine::state::SessionSnapshot;

fn push<T>(log: &Arc<Mutex<Vec<T>>>, item: T) {
    if let Ok(mut calls) = log.lock() {
        calls.push(item);
    }
}

fn read<T: Clone>(log: &Arc<Mutex<Vec<T>>>) -> Vec<T> {
    log.lock().map(|calls| calls.clone()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Start { freqs: BeatFrequencies, gain: f64 },
    Update { freq_left: Option<f64>, freq_right: Option<f64> },
    Stop,
    Warm,
}

/// How [`RecordingAudio::start`] and `warm` answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Declined,
    Fails,
}

#[derive(Debug, Clone)]
pub struct RecordingAudio {
    calls: Arc<Mutex<Vec<AudioCall>>>,
    outcome: StartOutcome,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::with_outcome(StartOutcome::Started)
    }

    pub fn with_outcome(outcome: StartOutcome) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            outcome,
        }
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        read(&self.calls)
    }

    pub fn starts(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, AudioCall::Start { .. })).count()
    }

    pub fn updates(&self) -> Vec<(Option<f64>, Option<f64>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                AudioCall::Update { freq_left, freq_right } => Some((freq_left, freq_right)),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, AudioCall::Stop)).count()
    }
}

impl Default for RecordingAudio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioEngine for RecordingAudio {
    async fn start(&mut self, freqs: BeatFrequencies, gain: f64) -> Result<bool> {
        push(&self.calls, AudioCall::Start { freqs, gain });
        match self.outcome {
            StartOutcome::Started => Ok(true),
            StartOutcome::Declined => Ok(false),
            StartOutcome::Fails => Err(anyhow!("audio output blocked")),
        }
    }

    fn update(&mut self, freq_left: Option<f64>, freq_right: Option<f64>) {
        push(&self.calls, AudioCall::Update { freq_left, freq_right });
    }

    fn stop(&mut self) {
        push(&self.calls, AudioCall::Stop);
    }

    async fn warm(&mut self) -> Result<bool> {
        push(&self.calls, AudioCall::Warm);
        match self.outcome {
            StartOutcome::Started => Ok(true),
            StartOutcome::Declined => Ok(false),
            StartOutcome::Fails => Err(anyhow!("audio output blocked")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MinigameCall {
    EnsureReady,
    SetMode { mode: MinigameMode, config: MinigameConfig },
    Overlay { value: f64, duration_ms: u64 },
    StartRound { round: RoundId, is_final: bool },
}

#[derive(Debug, Clone)]
pub struct RecordingMinigame {
    calls: Arc<Mutex<Vec<MinigameCall>>>,
    ready: bool,
}

impl RecordingMinigame {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            ready: true,
        }
    }

    /// A runtime that never becomes ready
    pub fn unavailable() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<MinigameCall> {
        read(&self.calls)
    }

    pub fn started_rounds(&self) -> Vec<(RoundId, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MinigameCall::StartRound { round, is_final } => Some((round, is_final)),
                _ => None,
            })
            .collect()
    }

    pub fn modes(&self) -> Vec<(MinigameMode, MinigameConfig)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MinigameCall::SetMode { mode, config } => Some((mode, config)),
                _ => None,
            })
            .collect()
    }

    pub fn overlays(&self) -> Vec<(f64, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MinigameCall::Overlay { value, duration_ms } => Some((value, duration_ms)),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingMinigame {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MinigameRuntime for RecordingMinigame {
    async fn ensure_ready(&mut self) -> bool {
        push(&self.calls, MinigameCall::EnsureReady);
        self.ready
    }

    fn set_mode(&mut self, mode: MinigameMode, config: MinigameConfig) {
        push(&self.calls, MinigameCall::SetMode { mode, config });
    }

    fn set_overlay_intensity(&mut self, value: f64, duration_ms: u64) {
        push(&self.calls, MinigameCall::Overlay { value, duration_ms });
    }

    fn start_round(&mut self, round: RoundId, is_final: bool) {
        push(&self.calls, MinigameCall::StartRound { round, is_final });
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    frames: Arc<Mutex<Vec<SessionSnapshot>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<SessionSnapshot> {
        read(&self.frames)
    }

    pub fn last(&self) -> Option<SessionSnapshot> {
        self.frames.lock().ok().and_then(|f| f.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        push(&self.frames, snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_audio_outcomes() {
        let freqs = BeatFrequencies { freq_left: 220.0, freq_right: 231.0 };

        let mut ok = RecordingAudio::new();
        assert!(ok.start(freqs, 0.08).await.unwrap());

        let mut declined = RecordingAudio::with_outcome(StartOutcome::Declined);
        assert!(!declined.start(freqs, 0.08).await.unwrap());

        let mut failing = RecordingAudio::with_outcome(StartOutcome::Fails);
        assert!(failing.start(freqs, 0.08).await.is_err());
        assert!(failing.warm().await.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_log() {
        let audio = RecordingAudio::new();
        let mut handle = audio.clone();
        handle.update(Some(220.0), None);
        handle.stop();
        assert_eq!(audio.updates(), vec![(Some(220.0), None)]);
        assert_eq!(audio.stops(), 1);

        let game = RecordingMinigame::unavailable();
        let mut handle = game.clone();
        assert!(!handle.ensure_ready().await);
        handle.start_round(RoundId::FollowTheFade, true);
        assert_eq!(game.started_rounds(), vec![(RoundId::FollowTheFade, true)]);
    }
}
