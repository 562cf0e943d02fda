use shared::protocol::StateSnapshot;

use crate::error::DecodeError;

/// Parse a raw poll response body into a snapshot.
///
/// The server answers a timed-out long-poll with no content at all, so a
/// blank body means "unchanged, try again" and decodes to `None` rather than
/// an error.
pub fn decode_snapshot(raw: &str) -> Result<Option<StateSnapshot>, DecodeError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let snapshot = serde_json::from_str(raw)?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{ContinuationToken, StatusKind};

    #[test]
    fn blank_bodies_decode_to_no_update() {
        assert!(decode_snapshot("").expect("empty").is_none());
        assert!(decode_snapshot("  \n\t").expect("whitespace").is_none());
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(decode_snapshot("{\"id\": ").is_err());
        assert!(decode_snapshot("<html>busy</html>").is_err());
        // A well-formed body still needs the continuation token.
        assert!(decode_snapshot("{\"type\": \"start\"}").is_err());
    }

    #[test]
    fn snapshot_keeps_unclaimed_fields() {
        let snapshot = decode_snapshot(
            "{\"id\": 7, \"type\": \"in_progress\", \"pot\": 3, \"table\": [\"5\", \"artifact\"]}",
        )
        .expect("decode")
        .expect("snapshot");

        assert_eq!(snapshot.id, ContinuationToken(7));
        assert_eq!(snapshot.kind, Some(StatusKind::InProgress));
        assert_eq!(snapshot.fields.get("pot").and_then(|v| v.as_u64()), Some(3));
        assert!(snapshot.fields.get("type").is_none());
    }

    #[test]
    fn snapshot_type_is_optional() {
        let snapshot = decode_snapshot("{\"id\": 0}")
            .expect("decode")
            .expect("snapshot");
        assert_eq!(snapshot.kind, None);
    }
}
