//! Incremental pkt-line framing: 4 ASCII hex digits of length (including the
//! prefix itself) followed by the payload. Lengths 0–2 are control frames.
//!
//! The reader is deliberately decoupled from wire-error detection so framing
//! can be tested on its own against malformed and truncated streams; a server
//! that sends garbage here produces an error, never a panic.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::TransportError;

/// End-of-stream marker (`0000`).
pub const FLUSH_PKT: &[u8; 4] = b"0000";
/// Section delimiter used by protocol v2 (`0001`).
pub const DELIM_PKT: &[u8; 4] = b"0001";
/// Response-end marker used by protocol v2 over HTTP (`0002`).
pub const RESPONSE_END_PKT: &[u8; 4] = b"0002";
/// Largest payload a single pkt-line can carry (65520 bytes total minus the
/// 4-byte length prefix).
pub const MAX_PKT_PAYLOAD: usize = 65516;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    Flush,
    Delim,
    ResponseEnd,
    Data(Bytes),
}

/// Read the next pkt-line from `bytes`, consuming it.
///
/// Returns `Ok(None)` when the buffer is exhausted. Malformed length headers
/// and payloads that run past the end of the buffer are errors.
pub fn read_pkt_line(bytes: &mut Bytes) -> Result<Option<PktLine>, TransportError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() < 4 {
        return Err(TransportError::TruncatedPktLine {
            expected: 4,
            actual: bytes.len(),
        });
    }

    let header = bytes.copy_to_bytes(4);
    let header_str = core::str::from_utf8(&header)
        .map_err(|_| TransportError::InvalidPktLength(format!("{header:?}")))?;
    let pkt_length = usize::from_str_radix(header_str, 16)
        .map_err(|_| TransportError::InvalidPktLength(header_str.to_string()))?;

    match pkt_length {
        0 => Ok(Some(PktLine::Flush)),
        1 => Ok(Some(PktLine::Delim)),
        2 => Ok(Some(PktLine::ResponseEnd)),
        3 => Err(TransportError::InvalidPktLength(header_str.to_string())),
        _ => {
            let data_length = pkt_length - 4;
            if bytes.len() < data_length {
                return Err(TransportError::TruncatedPktLine {
                    expected: data_length,
                    actual: bytes.len(),
                });
            }
            Ok(Some(PktLine::Data(bytes.copy_to_bytes(data_length))))
        }
    }
}

/// Collect every data payload in `body`, validating framing along the way.
/// Control frames (flush/delim/response-end) are consumed and dropped.
pub fn data_lines(mut body: Bytes) -> Result<Vec<Bytes>, TransportError> {
    let mut lines = Vec::new();
    while let Some(pkt) = read_pkt_line(&mut body)? {
        if let PktLine::Data(payload) = pkt {
            lines.push(payload);
        }
    }
    Ok(lines)
}

/// Append `payload` as a single pkt-line with its length prefix.
///
/// Payloads larger than [`MAX_PKT_PAYLOAD`] do not fit a 4-digit length
/// header and are rejected; nothing is written in that case.
pub fn write_pkt_line(out: &mut BytesMut, payload: &[u8]) -> Result<(), TransportError> {
    if payload.len() > MAX_PKT_PAYLOAD {
        return Err(TransportError::OversizedPktPayload(payload.len()));
    }
    out.put_slice(format!("{:04x}", payload.len() + 4).as_bytes());
    out.put_slice(payload);
    Ok(())
}

/// Append a flush (`0000`) frame.
pub fn write_flush(out: &mut BytesMut) {
    out.put_slice(FLUSH_PKT);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn reads_data_and_flush() {
        let mut buf = bytes_of("000eversion 2\n0000");

        let first = read_pkt_line(&mut buf).unwrap().unwrap();
        assert_eq!(first, PktLine::Data(bytes_of("version 2\n")));

        let second = read_pkt_line(&mut buf).unwrap().unwrap();
        assert_eq!(second, PktLine::Flush);

        assert!(read_pkt_line(&mut buf).unwrap().is_none());
    }

    #[test]
    fn reads_control_frames() {
        let mut buf = bytes_of("00010002");
        assert_eq!(read_pkt_line(&mut buf).unwrap().unwrap(), PktLine::Delim);
        assert_eq!(
            read_pkt_line(&mut buf).unwrap().unwrap(),
            PktLine::ResponseEnd
        );
    }

    #[test]
    fn rejects_non_hex_length() {
        let mut buf = bytes_of("zzzzpayload");
        let err = read_pkt_line(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::InvalidPktLength(_)));
    }

    #[test]
    fn rejects_reserved_length_three() {
        let mut buf = bytes_of("0003");
        let err = read_pkt_line(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::InvalidPktLength(_)));
    }

    #[test]
    fn rejects_truncated_header() {
        let mut buf = bytes_of("00");
        let err = read_pkt_line(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::TruncatedPktLine {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn rejects_truncated_payload() {
        // declares 12 bytes of payload but carries 2
        let mut buf = bytes_of("0010ab");
        let err = read_pkt_line(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::TruncatedPktLine {
                expected: 12,
                actual: 2
            }
        ));
    }

    #[test]
    fn writer_rejects_oversized_payloads() {
        let mut out = BytesMut::new();
        let payload = vec![b'a'; MAX_PKT_PAYLOAD + 1];
        let err = write_pkt_line(&mut out, &payload).unwrap_err();
        assert!(matches!(err, TransportError::OversizedPktPayload(n) if n == MAX_PKT_PAYLOAD + 1));
        assert!(out.is_empty());

        let payload = vec![b'a'; MAX_PKT_PAYLOAD];
        write_pkt_line(&mut out, &payload).unwrap();
        assert_eq!(&out[..4], b"fff0");
    }

    #[test]
    fn writer_output_is_readable() {
        let mut out = BytesMut::new();
        write_pkt_line(&mut out, b"unpack ok\n").unwrap();
        write_pkt_line(&mut out, b"ok refs/heads/main\n").unwrap();
        write_flush(&mut out);

        let lines = data_lines(out.freeze()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(&lines[0][..], b"unpack ok\n");
        assert_eq!(&lines[1][..], b"ok refs/heads/main\n");
    }

    #[test]
    fn data_lines_surfaces_framing_errors() {
        let err = data_lines(bytes_of("000dunpack ok0fff")).unwrap_err();
        assert!(matches!(err, TransportError::TruncatedPktLine { .. }));
    }

    #[test]
    fn data_lines_on_empty_body_is_empty() {
        assert!(data_lines(Bytes::new()).unwrap().is_empty());
    }
}
