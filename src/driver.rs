//! Async run loop around a [`Session`].
//!
//! The loop waits on whichever comes first: the next inbound message or the
//! next timer deadline. Timers are always fired before a message is handled,
//! so a message never observes a timer that should already have fired.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::engine::events::Inbound;
use crate::engine::session::Session;
use crate::engine::state::SessionStats;
use crate::logging::{log, obj, v_str, Domain, Level};

async fn wait_for(delay: Option<Duration>) {
    match delay {
        Some(d) => sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Drive `session` until the inbox closes, then shut it down and return the
/// final statistics.
pub async fn run(mut session: Session, mut inbox: mpsc::Receiver<Inbound>) -> SessionStats {
    log(Level::Info, Domain::System, "driver_start", obj(&[]));
    let mut handled: u64 = 0;

    loop {
        session.fire_due_timers();

        let delay = session
            .next_timer_deadline()
            .map(|due| Duration::from_millis(due.saturating_sub(session.now_ms())));

        tokio::select! {
            msg = inbox.recv() => match msg {
                Some(inbound) => {
                    session.fire_due_timers();
                    session.dispatch(inbound).await;
                    handled += 1;
                }
                None => break,
            },
            _ = wait_for(delay) => {}
        }
    }

    session.shutdown();
    let stats = session.stats();
    log(
        Level::Info,
        Domain::System,
        "driver_stop",
        obj(&[
            ("handled", json!(handled)),
            ("phase", v_str(session.phase().as_str())),
            ("stats", json!(stats)),
        ]),
    );
    stats
}

/// Parse newline-delimited commands from `reader` into `outbox`.
///
/// Unparseable lines are logged and skipped. Returns the number of messages
/// sent; stops early if the receiver has gone away.
pub async fn feed_lines<R>(reader: R, outbox: mpsc::Sender<Inbound>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut sent = 0;
    while let Some(line) = lines.next_line().await.context("reading input")? {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match Inbound::parse_line(&line) {
            Ok(inbound) => {
                if outbox.send(inbound).await.is_err() {
                    break;
                }
                sent += 1;
            }
            Err(err) => log(
                Level::Warn,
                Domain::System,
                "bad_input",
                obj(&[("line", v_str(&line)), ("msg", v_str(&format!("{:#}", err)))]),
            ),
        }
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::Intent;

    #[tokio::test]
    async fn test_feed_lines_skips_noise() {
        let input: &[u8] = b"enter\n\n# comment\nbogus\nconfirm\n{\"intent\": \"startSession\"}\n";
        let (tx, mut rx) = mpsc::channel(16);
        let sent = feed_lines(input, tx).await.unwrap();
        assert_eq!(sent, 3);
        assert_eq!(rx.recv().await, Some(Inbound::Intent(Intent::Enter { deep_link: None })));
        assert_eq!(rx.recv().await, Some(Inbound::Intent(Intent::ConfirmHeadphones)));
        assert_eq!(rx.recv().await, Some(Inbound::Intent(Intent::StartSession)));
        assert_eq!(rx.recv().await, None);
    }
}
