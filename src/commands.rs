use std::fmt::Write;

use anyhow::{anyhow, bail, Context, Result};

use crate::{
    db::SleepQuality,
    rating::rate_session,
    store::SessionStore,
    tracker::{SessionTracker, TrackerEvent},
};

pub const USAGE: &str = "usage: sleeptracker <start|stop|clear|history|rate <session-id> <0-5>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Start,
    Stop,
    Clear,
    History,
    Rate {
        session_id: i64,
        quality: SleepQuality,
    },
}

impl HostCommand {
    /// Parses the arguments that follow the program name.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args.next().ok_or_else(|| anyhow!(USAGE))?;

        let command = match name.as_str() {
            "start" => HostCommand::Start,
            "stop" => HostCommand::Stop,
            "clear" => HostCommand::Clear,
            "history" => HostCommand::History,
            "rate" => {
                let session_id = args
                    .next()
                    .ok_or_else(|| anyhow!(USAGE))?
                    .parse::<i64>()
                    .context("session id must be an integer")?;
                let quality = args
                    .next()
                    .ok_or_else(|| anyhow!(USAGE))?
                    .parse::<i64>()
                    .context("quality must be an integer")?;
                HostCommand::Rate {
                    session_id,
                    quality: SleepQuality::from_i64(quality)?,
                }
            }
            other => bail!("unknown command '{other}'\n{USAGE}"),
        };

        if let Some(extra) = args.next() {
            bail!("unexpected argument '{extra}'\n{USAGE}");
        }
        Ok(command)
    }
}

/// Runs one command against the tracker, handles any events it raised and
/// returns the text to show the user.
pub async fn run_command(
    tracker: &SessionTracker,
    store: &dyn SessionStore,
    command: HostCommand,
) -> Result<String> {
    let mut out = String::new();

    match command {
        HostCommand::Start => {
            let was_tracking = tracker.state().is_tracking();
            tracker.start_tracking().await?;
            if was_tracking {
                out.push_str("A sleep session is already in progress.\n");
            } else {
                out.push_str("Sleep tracking started.\n");
            }
        }
        HostCommand::Stop => {
            if tracker.stop_tracking().await?.is_none() {
                out.push_str("No sleep session in progress.\n");
            }
        }
        HostCommand::Clear => tracker.clear_history().await?,
        HostCommand::History => {}
        HostCommand::Rate {
            session_id,
            quality,
        } => {
            rate_session(store, session_id, quality).await?;
            tracker.refresh().await?;
            let _ = writeln!(out, "Session {session_id} rated: {}.", quality.label());
        }
    }

    while let Some(event) = tracker.pending_event() {
        match event {
            TrackerEvent::NavigateToRating(session) => {
                let _ = writeln!(
                    out,
                    "Sleep session {} stopped. Rate it with: sleeptracker rate {} <0-5>",
                    session.id, session.id
                );
                tracker.acknowledge_navigation();
            }
            TrackerEvent::ShowClearedMessage => {
                out.push_str("All your data is gone forever.\n");
                tracker.acknowledge_cleared_message();
            }
        }
    }

    out.push('\n');
    out.push_str(&tracker.state().history_text);
    Ok(out)
}
