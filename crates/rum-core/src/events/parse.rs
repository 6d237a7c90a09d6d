//! Parse one channel line into a `ServerEvent`.

use anyhow::{Context, Result};

use super::ServerEvent;

pub fn parse_event(line: &str) -> Result<ServerEvent> {
    serde_json::from_str(line.trim()).with_context(|| format!("malformed event: {line:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_progress_event() {
        let ev = parse_event(
            r#"{"kind":"progress","seq":4,"percentage":62.5,"speed":1048576.0,"eta_secs":12.0}"#,
        )
        .unwrap();
        match ev {
            ServerEvent::Progress {
                seq,
                percentage,
                speed,
                eta_secs,
            } => {
                assert_eq!(seq, 4);
                assert!((percentage - 62.5).abs() < 1e-9);
                assert_eq!(speed, Some(1048576.0));
                assert_eq!(eta_secs, Some(12.0));
            }
            other => panic!("expected progress, got {other:?}"),
        }
    }

    #[test]
    fn parse_progress_without_optional_fields() {
        let ev = parse_event(r#"{"kind":"progress","seq":1,"percentage":5.0}"#).unwrap();
        assert!(!ev.is_terminal());
        assert_eq!(ev.seq(), 1);
    }

    #[test]
    fn parse_completed_event() {
        let ev =
            parse_event(r#"{"kind":"completed","seq":7,"result_id":"episode-42"}"#).unwrap();
        assert_eq!(
            ev,
            ServerEvent::Completed {
                seq: 7,
                result_id: "episode-42".to_string()
            }
        );
    }

    #[test]
    fn parse_failed_event() {
        let ev = parse_event(r#"{"kind":"failed","seq":8,"error":"transcode timeout"}"#).unwrap();
        assert_eq!(
            ev,
            ServerEvent::Failed {
                seq: 8,
                error: "transcode timeout".to_string()
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_kind_and_garbage() {
        assert!(parse_event(r#"{"kind":"nonsense","seq":1}"#).is_err());
        assert!(parse_event("not json").is_err());
    }
}
