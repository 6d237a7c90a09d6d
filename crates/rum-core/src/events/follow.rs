//! Follow a session's event stream until its terminal event.

use crate::protocol::Auth;
use crate::retry::TransferError;

use super::{parse_event, EventFilter, ServerEvent};

/// How a follow ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowOutcome {
    /// The stream delivered its terminal event.
    Terminal(ServerEvent),
    /// The server closed the stream without a terminal event.
    Disconnected,
}

/// Stream the event channel, invoking `on_event` for each accepted event
/// (stale/out-of-order pushes are filtered out). Returns once a terminal
/// event arrives or the stream ends. Runs on the calling thread; call from
/// `spawn_blocking` in async code.
pub fn follow_events<F>(
    events_url: &str,
    auth: &Auth,
    mut on_event: F,
) -> Result<FollowOutcome, TransferError>
where
    F: FnMut(&ServerEvent),
{
    let mut filter = EventFilter::new();
    let mut buffer: Vec<u8> = Vec::new();
    let mut terminal: Option<ServerEvent> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(events_url)?;
    easy.connect_timeout(crate::protocol::CONNECT_TIMEOUT)?;
    easy.http_headers(crate::protocol::build_headers(auth, &[])?)?;

    let result = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            buffer.extend_from_slice(data);
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_event(line) {
                    Ok(event) => {
                        if !filter.accept(&event) {
                            tracing::debug!(seq = event.seq(), "discarded out-of-order event");
                            continue;
                        }
                        on_event(&event);
                        if event.is_terminal() {
                            terminal = Some(event);
                            // Abort the transfer: a short write stops curl.
                            return Ok(0);
                        }
                    }
                    Err(e) => tracing::warn!("skipping malformed event: {e:#}"),
                }
            }
            Ok(data.len())
        })?;
        transfer.perform()
    };

    // A write-error abort after the terminal event is expected; any other
    // failure is a real transport error.
    if let Some(event) = terminal {
        return Ok(FollowOutcome::Terminal(event));
    }
    match result {
        Ok(()) => {
            let code = easy.response_code()?;
            crate::protocol::check_status(code)?;
            Ok(FollowOutcome::Disconnected)
        }
        Err(e) => Err(TransferError::Curl(e)),
    }
}
