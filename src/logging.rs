//! Structured logging for the session engine.
//!
//! Design goals:
//! 1. Multi-level granularity (TRACE → FATAL)
//! 2. Domain categories for filtering (session, depth, timers, collaborators)
//! 3. One JSON object per line, ordered by a process-wide sequence number
//! 4. Audit support via state hashes on every phase transition

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Session,  // Phase transitions, lifecycle
    Depth,    // Depth changes and derived environment
    Content,  // Pool construction, sampling
    Timer,    // Scheduling, firing, cancellation
    Audio,    // Audio engine commands and failures
    Minigame, // Minigame runtime commands and events
    Survey,   // Survey answers
    System,   // Startup, shutdown, driver
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Session => "session",
            Domain::Depth => "depth",
            Domain::Content => "content",
            Domain::Timer => "timer",
            Domain::Audio => "audio",
            Domain::Minigame => "minigame",
            Domain::Survey => "survey",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS is a comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("s-{}-{}", ts_epoch_ms(), process::id()));

        // File sinks are opt-in; stdout is always written.
        let Ok(base) = std::env::var("LOG_DIR") else {
            return RunContext { run_id, events: None, trace: None };
        };

        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
            return RunContext { run_id, events: None, trace: None };
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        let open = |name: &str| match File::create(run_dir.join(name)) {
            Ok(f) => Some(Mutex::new(BufWriter::new(f))),
            Err(err) => {
                eprintln!("[log] failed to create {}: {}", name, err);
                None
            }
        };

        RunContext {
            events: open("events.jsonl"),
            trace: open("trace.jsonl"),
            run_id,
        }
    })
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["phase", "round_id", "state_hash", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(writer) = writer {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    println!("{}", line);
}

// =============================================================================
// Session Logs
// =============================================================================

/// Phase change through the transition choke point
pub fn log_transition(from: &str, to: &str, depth: f64, cancelled_timers: usize, state_hash: u64) {
    log(
        Level::Info,
        Domain::Session,
        "transition",
        obj(&[
            ("from", v_str(from)),
            ("phase", v_str(to)),
            ("depth", v_num(depth)),
            ("cancelled_timers", json!(cancelled_timers)),
            ("state_hash", v_str(&format!("{:016x}", state_hash))),
        ]),
    );
}

/// Intent or event dropped by a guard
pub fn log_ignored_intent(intent: &str, phase: &str, reason: &str) {
    log(
        Level::Debug,
        Domain::Session,
        "ignored",
        obj(&[
            ("intent", v_str(intent)),
            ("phase", v_str(phase)),
            ("reason", v_str(reason)),
        ]),
    );
}

pub fn log_depth_change(before: f64, after: f64, cause: &str, overlay: f64, beat: f64) {
    log(
        Level::Debug,
        Domain::Depth,
        "depth_change",
        obj(&[
            ("before", v_num(before)),
            ("after", v_num(after)),
            ("cause", v_str(cause)),
            ("overlay_intensity", v_num(overlay)),
            ("beat_intensity", v_num(beat)),
        ]),
    );
}

pub fn log_timer(action: &str, tag: &str, due: Option<u64>, count: usize) {
    log(
        Level::Trace,
        Domain::Timer,
        action,
        obj(&[
            ("tag", v_str(tag)),
            ("due", due.map(|d| json!(d)).unwrap_or(Value::Null)),
            ("count", json!(count)),
        ]),
    );
}

pub fn log_audio(action: &str, left_hz: f64, right_hz: f64, outcome: &str) {
    let level = if outcome == "ok" { Level::Info } else { Level::Warn };
    log(
        level,
        Domain::Audio,
        action,
        obj(&[
            ("left_hz", v_num(left_hz)),
            ("right_hz", v_num(right_hz)),
            ("outcome", v_str(outcome)),
        ]),
    );
}

/// Summary emitted when a session reaches its terminal phase
pub fn log_session_summary(
    rounds_completed: u64,
    successes: u64,
    responses: u64,
    interjections: u64,
    peak_depth: f64,
) {
    log(
        Level::Info,
        Domain::Session,
        "session_summary",
        obj(&[
            ("rounds_completed", json!(rounds_completed)),
            ("successes", json!(successes)),
            ("responses", json!(responses)),
            ("interjections", json!(interjections)),
            ("peak_depth", v_num(peak_depth)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Tests
// =============================================================================
