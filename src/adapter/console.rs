//! Log-backed collaborators for the headless binary.
//!
//! Nothing is rendered or synthesized; every command becomes a structured
//! log line, and snapshots are printed as JSON lines on stdout.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::audio::AudioEngine;
use super::minigame::{MinigameConfig, MinigameMode, MinigameRuntime};
use super::presenter::Presenter;
use crate::engine::depth::BeatFrequencies;
use crate::engine::rounds::RoundId;
use crate::engine::state::SessionSnapshot;
use crate::logging::{log, log_audio, obj, v_num, v_str, Domain, Level};

#[derive(Debug, Default)]
pub struct ConsoleAudio {
    current: Option<BeatFrequencies>,
}

#[async_trait]
impl AudioEngine for ConsoleAudio {
    async fn start(&mut self, freqs: BeatFrequencies, gain: f64) -> Result<bool> {
        self.current = Some(freqs);
        log(
            Level::Info,
            Domain::Audio,
            "start",
            obj(&[
                ("left_hz", v_num(freqs.freq_left)),
                ("right_hz", v_num(freqs.freq_right)),
                ("gain", v_num(gain)),
            ]),
        );
        Ok(true)
    }

    fn update(&mut self, freq_left: Option<f64>, freq_right: Option<f64>) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if let Some(left) = freq_left {
            current.freq_left = left;
        }
        if let Some(right) = freq_right {
            current.freq_right = right;
        }
        log(
            Level::Debug,
            Domain::Audio,
            "update",
            obj(&[
                ("left_hz", v_num(current.freq_left)),
                ("right_hz", v_num(current.freq_right)),
            ]),
        );
    }

    fn stop(&mut self) {
        if let Some(last) = self.current.take() {
            log_audio("stopped", last.freq_left, last.freq_right, "ok");
        }
    }

    async fn warm(&mut self) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct ConsoleMinigame {
    mode: Option<MinigameMode>,
}

#[async_trait]
impl MinigameRuntime for ConsoleMinigame {
    async fn ensure_ready(&mut self) -> bool {
        true
    }

    fn set_mode(&mut self, mode: MinigameMode, config: MinigameConfig) {
        self.mode = Some(mode);
        log(
            Level::Info,
            Domain::Minigame,
            "set_mode",
            obj(&[
                ("mode", v_str(mode.as_str())),
                ("config", json!(config)),
            ]),
        );
    }

    fn set_overlay_intensity(&mut self, value: f64, duration_ms: u64) {
        log(
            Level::Debug,
            Domain::Minigame,
            "overlay",
            obj(&[("value", v_num(value)), ("duration_ms", json!(duration_ms))]),
        );
    }

    fn start_round(&mut self, round: RoundId, is_final: bool) {
        log(
            Level::Info,
            Domain::Minigame,
            "start_round",
            obj(&[
                ("round_id", v_str(round.as_str())),
                ("final", json!(is_final)),
                ("mode", v_str(self.mode.map(|m| m.as_str()).unwrap_or("none"))),
            ]),
        );
    }
}

/// Prints each snapshot as `{"snapshot": {...}}` on stdout.
#[derive(Debug, Default)]
pub struct JsonLinesPresenter {
    pub frames: u64,
}

impl Presenter for JsonLinesPresenter {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        self.frames += 1;
        println!("{}", json!({ "frame": self.frames, "snapshot": snapshot }));
    }
}
