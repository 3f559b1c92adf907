//! Detection of git errors embedded in HTTP-200 response bodies.
//!
//! Servers report push failures inside the pkt-line report stream rather than
//! via HTTP status codes: an `ERR` packet, an `ng <ref> <reason>` report line,
//! an unpack failure, or a free-text `fatal:`/`error:` message. This module
//! scans decoded payloads and turns the first such signal into a typed error.

use bytes::Bytes;

use super::pkt_line;
use crate::errors::TransportError;

/// Scan a 200-status response body for embedded git errors.
///
/// Framing errors surface as such; a body whose payloads match none of the
/// detection rules is treated as success regardless of content.
pub fn scan_response(body: Bytes) -> Result<(), TransportError> {
    for payload in pkt_line::data_lines(body)? {
        if let Some(err) = detect_line(&payload) {
            tracing::debug!(error = %err, "git error detected in response body");
            return Err(err);
        }
    }
    Ok(())
}

/// Apply the detection rules, in priority order, to a single payload.
fn detect_line(payload: &[u8]) -> Option<TransportError> {
    let text = String::from_utf8_lossy(payload);
    // one terminating newline belongs to the framing; keep any beyond it
    let text = text.strip_suffix('\n').unwrap_or(&text);

    if let Some(message) = text.strip_prefix("ERR ") {
        return Some(TransportError::GitServer(message.trim().to_string()));
    }

    if let Some(rest) = text.strip_prefix("ng ") {
        let (refname, reason) = rest.split_once(' ').unwrap_or((rest, "unknown reason"));
        return Some(TransportError::RefUpdate {
            refname: refname.to_string(),
            reason: reason.trim().to_string(),
        });
    }

    // "unpack ok" is the success report; anything else mentioning unpack
    // alongside a failure indicator is a failed unpack.
    if text.contains("unpack")
        && text != "unpack ok"
        && (text.contains("failed") || text.contains("error"))
    {
        return Some(TransportError::Unpack(text.to_string()));
    }

    if text.starts_with("fatal:") || text.starts_with("error:") {
        return Some(TransportError::GitServer(text.to_string()));
    }

    None
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::protocol::pkt_line::{write_flush, write_pkt_line};

    fn body(lines: &[&str]) -> Bytes {
        let mut out = BytesMut::new();
        for line in lines {
            write_pkt_line(&mut out, line.as_bytes()).unwrap();
        }
        write_flush(&mut out);
        out.freeze()
    }

    #[test]
    fn clean_report_is_success() {
        let result = scan_response(body(&["unpack ok\n", "ok refs/heads/main\n"]));
        assert!(result.is_ok());
    }

    #[test]
    fn empty_body_is_success() {
        assert!(scan_response(Bytes::new()).is_ok());
    }

    #[test]
    fn err_packet_is_detected() {
        let err = scan_response(body(&["ERR push declined due to email policy"])).unwrap_err();
        assert!(matches!(err, TransportError::GitServer(_)));
        assert!(
            err.to_string()
                .contains("git server error: push declined due to email policy")
        );
    }

    #[test]
    fn ng_report_line_is_detected() {
        let err =
            scan_response(body(&["unpack ok\n", "ng refs/heads/main failed to update ref"]))
                .unwrap_err();
        assert!(
            err.to_string()
                .contains("reference update failed for refs/heads/main: failed to update ref")
        );
    }

    #[test]
    fn unpack_failure_is_detected() {
        let err = scan_response(body(&["unpack index-pack failed"])).unwrap_err();
        assert!(matches!(err, TransportError::Unpack(_)));
        assert!(err.to_string().contains("index-pack failed"));
    }

    #[test]
    fn unpack_rule_wins_over_fatal_prefix() {
        let err = scan_response(body(&["fatal: unpack failed due to corrupt data"])).unwrap_err();
        assert!(matches!(err, TransportError::Unpack(_)));
        assert!(err.to_string().contains("unpack failed due to corrupt data"));
    }

    #[test]
    fn error_prefixed_line_is_reported_verbatim() {
        let message = "error: cannot lock ref 'refs/heads/main': is at d346cc9 but expected b6ce559";
        let err = scan_response(body(&[message])).unwrap_err();
        assert!(err.to_string().contains("cannot lock ref 'refs/heads/main'"));
    }

    #[test]
    fn multi_line_fsck_message_is_preserved() {
        let message = "error: object 457e2462aee3d41d1a2832f10419213e10091bdc: treeNotSorted: not properly sorted\nfatal: fsck error in packed object\n";
        let err = scan_response(body(&[message])).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("treeNotSorted: not properly sorted"));
        assert!(text.contains("fsck error in packed object"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn only_the_terminating_newline_is_trimmed() {
        let err = scan_response(body(&["fatal: mirrors out of sync\n\nretry the push\n"]))
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("mirrors out of sync\n\nretry the push"));
        assert!(!text.ends_with('\n'));

        let err = scan_response(body(&["fatal: bad object\n\n"])).unwrap_err();
        assert!(err.to_string().ends_with("fatal: bad object\n"));
    }

    #[test]
    fn unrelated_content_is_not_an_error() {
        let result = scan_response(body(&["000fprogress: done\n"]));
        assert!(result.is_ok());
    }
}
