//! Inbound messages: user intents from the presentation layer and events
//! from the minigame runtime.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds on the session clock
pub type Timestamp = u64;

fn default_final() -> bool {
    true
}

/// Events emitted by the minigame runtime.
///
/// Unknown or missing payload fields are tolerated; `final` defaults to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MinigameEvent {
    #[serde(alias = "minigame/success")]
    Success {
        #[serde(rename = "roundId", alias = "id", default)]
        round_id: Option<String>,
        #[serde(default)]
        payload: Value,
    },
    #[serde(alias = "minigame/complete")]
    Complete {
        #[serde(rename = "roundId", alias = "id", default)]
        round_id: Option<String>,
        #[serde(rename = "final", default = "default_final")]
        is_final: bool,
        #[serde(default)]
        payload: Value,
    },
}

impl MinigameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MinigameEvent::Success { .. } => "minigame_success",
            MinigameEvent::Complete { .. } => "minigame_complete",
        }
    }

    pub fn round_id(&self) -> Option<&str> {
        match self {
            MinigameEvent::Success { round_id, .. } | MinigameEvent::Complete { round_id, .. } => {
                round_id.as_deref()
            }
        }
    }

    /// Instruction text carried by a relaxation-round success, if any.
    pub fn instruction(&self) -> Option<&str> {
        match self {
            MinigameEvent::Success { payload, .. } => payload
                .get("instruction")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty()),
            MinigameEvent::Complete { .. } => None,
        }
    }
}

/// User intents from the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum Intent {
    Enter {
        #[serde(rename = "deepLink", default)]
        deep_link: Option<String>,
    },
    ConfirmHeadphones,
    StartSession,
    BeginCurrentRound,
    AnswerSurveyItem {
        #[serde(default)]
        value: Value,
    },
    AdvanceInterjection,
    ExitSession,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Enter { .. } => "enter",
            Intent::ConfirmHeadphones => "confirm_headphones",
            Intent::StartSession => "start_session",
            Intent::BeginCurrentRound => "begin_current_round",
            Intent::AnswerSurveyItem { .. } => "answer_survey_item",
            Intent::AdvanceInterjection => "advance_interjection",
            Intent::ExitSession => "exit_session",
        }
    }
}

/// Numeric coercion for survey answers.
///
/// Numbers pass through, numeric strings parse, booleans and null map to
/// 1/0, anything else is NaN.
pub fn coerce_answer(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Anything the session can receive
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Intent(Intent),
    Minigame(MinigameEvent),
}

impl Inbound {
    /// Parse one console line: either a JSON object carrying an `intent` or
    /// `type` key, or a short command word.
    ///
    /// ```text
    /// enter [deep-link]   confirm   start   begin   answer <1..5>
    /// advance   exit   success [round-id]   complete [final|continue] [round-id]
    /// ```
    pub fn parse_line(line: &str) -> Result<Inbound> {
        let line = line.trim();
        if line.is_empty() {
            bail!("empty input");
        }

        if line.starts_with('{') {
            let value: Value = serde_json::from_str(line).context("parsing inbound json")?;
            if value.get("intent").is_some() {
                let intent = serde_json::from_value(value).context("decoding intent")?;
                return Ok(Inbound::Intent(intent));
            }
            if value.get("type").is_some() {
                let event = serde_json::from_value(value).context("decoding minigame event")?;
                return Ok(Inbound::Minigame(event));
            }
            bail!("json input needs an \"intent\" or \"type\" key");
        }

        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let rest: Vec<&str> = words.collect();

        let inbound = match command.as_str() {
            "enter" => Inbound::Intent(Intent::Enter {
                deep_link: rest.first().map(|s| s.to_string()),
            }),
            "confirm" | "headphones" => Inbound::Intent(Intent::ConfirmHeadphones),
            "start" => Inbound::Intent(Intent::StartSession),
            "begin" => Inbound::Intent(Intent::BeginCurrentRound),
            "answer" => {
                let Some(raw) = rest.first() else {
                    bail!("answer needs a value");
                };
                Inbound::Intent(Intent::AnswerSurveyItem {
                    value: Value::String(raw.to_string()),
                })
            }
            "advance" | "next" => Inbound::Intent(Intent::AdvanceInterjection),
            "exit" | "quit" => Inbound::Intent(Intent::ExitSession),
            "success" => Inbound::Minigame(MinigameEvent::Success {
                round_id: rest.first().map(|s| s.to_string()),
                payload: Value::Null,
            }),
            "complete" => {
                let mut is_final = true;
                let mut round_id = None;
                for word in rest {
                    match word {
                        "final" => is_final = true,
                        "continue" | "more" => is_final = false,
                        other => round_id = Some(other.to_string()),
                    }
                }
                Inbound::Minigame(MinigameEvent::Complete {
                    round_id,
                    is_final,
                    payload: Value::Null,
                })
            }
            other => bail!("unknown command: {}", other),
        };
        Ok(inbound)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Inbound::Intent(intent) => intent.name(),
            Inbound::Minigame(event) => event.name(),
        }
    }
}
