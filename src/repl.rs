//! Interactive editing session driven by line input.
//!
//! Runs on the caller's event loop. A `recalc` only schedules work; it fires
//! after the configured delay against whatever the session looks like by then.
//! Commands typed meanwhile are applied first, and a second `recalc` restarts
//! the wait.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;
use tracing::info;

use crate::calculator::session::{EntryId, RecalcTicket, Recalculation, Session};
use crate::commands::{Command, parse_command};
use crate::output::{render_session_rows, render_summary};

/// Reads commands from `input` until it closes or `quit`, writing responses
/// to `out`. A recalculation still waiting at that point runs immediately.
pub async fn run_session<R, W>(
    session: &mut Session,
    input: R,
    out: &mut W,
    delay: Duration,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut deferred: Option<(RecalcTicket, Instant)> = None;

    show(session, out)?;
    prompt(out)?;

    loop {
        let wake = deferred.map(|(_, at)| at);
        let timer = async move {
            match wake {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Some(ticket) = apply(session, command, out)? {
                            deferred = Some((ticket, Instant::now() + delay));
                            writeln!(out, "Recalculating...")?;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => write!(out, "{}", e)?,
                }
                prompt(out)?;
            }
            _ = timer => {
                if let Some((ticket, _)) = deferred.take() {
                    finish_recalculate(session, ticket, out)?;
                    prompt(out)?;
                }
            }
        }
    }

    if let Some((ticket, _)) = deferred.take() {
        finish_recalculate(session, ticket, out)?;
    }

    info!(cgpa = session.cgpa(), total_credits = session.total_credits(), "Session ended");
    Ok(())
}

/// Applies one command. Returns a ticket when a recalculation was requested.
fn apply<W: Write>(
    session: &mut Session,
    command: Command,
    out: &mut W,
) -> Result<Option<RecalcTicket>> {
    if let Some((id, edit)) = command.field_edit() {
        if !session.edit(id, edit) {
            writeln!(out, "No course with id {}", id)?;
        }
        return Ok(None);
    }

    match command {
        Command::Show => show(session, out)?,
        Command::Add => {
            let id = session.add_course();
            writeln!(out, "Added course {}", id)?;
        }
        Command::Bulk { credits, cgpa } => match session.add_bulk(credits, cgpa) {
            Ok(id) => writeln!(out, "Added bulk entry {}", id)?,
            Err(e) => writeln!(out, "{}", e)?,
        },
        Command::Exclude { id } => {
            if !session.exclude(EntryId(id)) {
                writeln!(out, "No course with id {}", id)?;
            }
        }
        Command::Recalc => return Ok(Some(session.request_recalculate())),
        Command::Json => writeln!(out, "{}", serde_json::to_string_pretty(&session.view())?)?,
        Command::Edit { .. } | Command::Quit => {}
    }
    Ok(None)
}

fn finish_recalculate<W: Write>(
    session: &mut Session,
    ticket: RecalcTicket,
    out: &mut W,
) -> Result<()> {
    match session.complete_recalculate(ticket) {
        Some(Recalculation::Applied { .. }) => show(session, out)?,
        Some(Recalculation::Rejected(errors)) => {
            writeln!(out, "Recalculation rejected; totals unchanged.")?;
            for (id, error) in &errors {
                writeln!(out, "  course {}: {}", id, error)?;
            }
        }
        None => {}
    }
    Ok(())
}

fn show<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let count = session.visible().count();
    writeln!(
        out,
        "{}",
        render_summary(session.cgpa(), session.total_credits(), count)
    )?;
    write!(out, "{}", render_session_rows(session.visible()))?;
    Ok(())
}

fn prompt<W: Write>(out: &mut W) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::aggregate::calculate;
    use tokio::io::{AsyncWriteExt, BufReader, duplex};

    const DELAY: Duration = Duration::from_millis(600);

    fn seeded() -> Session {
        Session::new(calculate("Course,Grade,Credits\nCS1,A,3\nCS2,B,4\n").unwrap())
    }

    fn summaries(out: &[u8]) -> usize {
        String::from_utf8_lossy(out).matches("CGPA ").count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_recalc_restarts_timer() {
        let (mut client, server) = duplex(1024);
        let writer = tokio::spawn(async move {
            client.write_all(b"recalc\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            client.write_all(b"recalc\n").await.unwrap();
            // Past the first deadline, before the restarted one.
            tokio::time::sleep(Duration::from_millis(300)).await;
            client.write_all(b"edit 1 grade A\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(1000)).await;
        });

        let mut session = seeded();
        let mut out = Vec::new();
        run_session(&mut session, BufReader::new(server), &mut out, DELAY)
            .await
            .unwrap();
        writer.await.unwrap();

        // The edit at 700ms landed before the single recalculation at 1000ms.
        assert_eq!(session.cgpa(), 4.0);
        assert!(!session.is_recalculating());
        assert_eq!(summaries(&out), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_recalc_runs_when_input_closes() {
        let (mut client, server) = duplex(1024);
        client
            .write_all(b"edit 1 grade A\nrecalc\n")
            .await
            .unwrap();
        drop(client);

        let start = Instant::now();
        let mut session = seeded();
        let mut out = Vec::new();
        run_session(&mut session, BufReader::new(server), &mut out, DELAY)
            .await
            .unwrap();

        assert!(start.elapsed() < DELAY);
        assert_eq!(session.cgpa(), 4.0);
        assert_eq!(session.total_credits(), 7.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_recalc_reports_rows() {
        let input: &[u8] = b"edit 0 grade Z\nrecalc\njson\n";
        let mut session = seeded();
        let before = session.cgpa();
        let mut out = Vec::new();
        run_session(&mut session, input, &mut out, DELAY)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"recalculating\": true"));
        assert!(text.contains("course 0: Invalid grade"));
        assert_eq!(session.cgpa(), before);
    }

    #[tokio::test]
    async fn test_quit_and_unknown_commands() {
        let input: &[u8] = b"bogus\nquit\nadd\n";
        let mut session = seeded();
        let mut out = Vec::new();
        run_session(&mut session, input, &mut out, DELAY)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("bogus"));
        assert!(!text.contains("Added course"));
        assert_eq!(session.visible().count(), 2);
    }
}
