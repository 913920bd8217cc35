use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use arcadeflow::adapter::console::{ConsoleAudio, ConsoleMinigame, JsonLinesPresenter};
use arcadeflow::adapter::SystemClock;
use arcadeflow::config::SessionConfig;
use arcadeflow::driver;
use arcadeflow::engine::{Collaborators, Session};
use arcadeflow::logging::{log, obj, v_str, Domain, Level};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = SessionConfig::from_env();
    let collab = Collaborators {
        audio: Box::new(ConsoleAudio::default()),
        minigame: Box::new(ConsoleMinigame::default()),
        presenter: Box::new(JsonLinesPresenter::default()),
        clock: Arc::new(SystemClock),
    };
    let session = Session::from_config(cfg, collab)?;

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("msg", v_str("reading commands from stdin")),
            ("config", json!(format!("{:?}", session.config()))),
        ]),
    );

    let (tx, rx) = mpsc::channel(64);
    let reader = tokio::spawn(async move {
        driver::feed_lines(BufReader::new(tokio::io::stdin()), tx).await
    });

    let stats = driver::run(session, rx).await;
    let sent = reader.await??;

    log(
        Level::Info,
        Domain::System,
        "shutdown",
        obj(&[("messages", json!(sent)), ("stats", json!(stats))]),
    );
    Ok(())
}
