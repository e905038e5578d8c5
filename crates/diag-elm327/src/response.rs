//! Adapter reply parsing: line splitting, status detection, hex decoding.
//!
//! A finalized reply may hold several lines (one per ECU, or one per legacy
//! frame) plus chatter the adapter prints around the data: the command echo
//! when echo is still on, `SEARCHING...` while auto-detecting the protocol,
//! `BUS INIT: ...` on slow-init buses.
//!
//! On CAN with headers off, a reply longer than one frame is printed as a
//! byte-count line followed by indexed frames:
//!
//! ```text
//! 014
//! 0:490201314434
//! 1:47503030523535
//! 2:42313233343536
//! ```
//!
//! [`messages`] joins those back into one message.

use crate::error::{ObdError, ObdResult};
use crate::types::RawResponse;

/// Adapter replies that mean the bus or adapter failed the request.
const ADAPTER_ERRORS: &[&str] = &[
    "UNABLE TO CONNECT",
    "CAN ERROR",
    "BUS ERROR",
    "BUS BUSY",
    "FB ERROR",
    "DATA ERROR",
    "BUFFER FULL",
    "STOPPED",
    "ERROR",
];

// ---------------------------------------------------------------------------
// Line handling
// ---------------------------------------------------------------------------

/// Split reply text into meaningful lines.
///
/// Drops blank lines, protocol search chatter, and an echo of `command`.
pub fn lines<'a>(text: &'a str, command: &str) -> Vec<&'a str> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_chatter(line))
        .filter(|line| !is_echo(line, command))
        .collect()
}

fn is_chatter(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    upper.starts_with("SEARCHING") || upper.starts_with("BUS INIT")
}

fn is_echo(line: &str, command: &str) -> bool {
    let squash = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    };
    !command.is_empty() && squash(line) == squash(command)
}

/// Map adapter status replies to errors.
///
/// `NO DATA` is [`ObdError::NoData`], a bare `?` (unknown command) is
/// [`ObdError::InvalidResponse`], bus failures are [`ObdError::Adapter`].
/// Lines carrying data pass through.
pub fn check_status(lines: &[&str], command: &str) -> ObdResult<()> {
    for line in lines {
        let upper = line.to_ascii_uppercase();
        if upper == "NO DATA" || upper == "NODATA" {
            return Err(ObdError::NoData {
                command: command.to_string(),
            });
        }
        if upper == "?" {
            return Err(ObdError::InvalidResponse(format!(
                "adapter rejected '{command}'"
            )));
        }
        if let Some(status) = ADAPTER_ERRORS.iter().find(|s| upper.starts_with(**s)) {
            return Err(ObdError::Adapter(format!("{status} on '{command}'")));
        }
    }
    Ok(())
}

/// Lines of a reply with chatter removed and status replies turned into
/// errors.
pub fn payload_lines(response: &RawResponse) -> ObdResult<Vec<&str>> {
    let lines = lines(&response.text, &response.command);
    check_status(&lines, &response.command)?;
    Ok(lines)
}

// ---------------------------------------------------------------------------
// Hex decoding
// ---------------------------------------------------------------------------

/// Decode one reply line of hex pairs, spaced (`41 0C 1A F8`) or packed
/// (`410C1AF8`).
pub fn parse_hex(line: &str) -> ObdResult<Vec<u8>> {
    let digits: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(ObdError::InvalidResponse(format!(
            "odd number of hex digits in '{line}'"
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
                _ => Err(ObdError::InvalidResponse(format!("not hex: '{line}'"))),
            }
        })
        .collect()
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|d| d as u8)
}

// ---------------------------------------------------------------------------
// Message assembly
// ---------------------------------------------------------------------------

/// One logical message of a reply: a single line, or a multi-frame group
/// joined and cut to its declared length.
#[derive(Debug)]
pub struct Message<'a> {
    /// Line the message starts at.
    pub source: &'a str,
    pub bytes: ObdResult<Vec<u8>>,
}

/// Decode payload lines into messages, in arrival order.
///
/// A byte-count line opens a group; `N:` frames append to the open group (or
/// open one without a declared length). Any other line closes the group and
/// stands alone. Decoding errors stay with the message they belong to.
pub fn messages<'a>(lines: &[&'a str]) -> Vec<Message<'a>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut group: Option<FrameGroup<'a>> = None;

    for &line in lines {
        if let Some(declared) = byte_count(line) {
            out.extend(group.take().map(FrameGroup::finish));
            group = Some(FrameGroup::new(line, Some(declared)));
        } else if let Some(data) = frame_data(line) {
            group
                .get_or_insert_with(|| FrameGroup::new(line, None))
                .push(data);
        } else {
            out.extend(group.take().map(FrameGroup::finish));
            out.push(Message {
                source: line,
                bytes: parse_hex(line),
            });
        }
    }
    out.extend(group.map(FrameGroup::finish));
    out
}

/// Three hex digits and nothing else. Data lines always carry an even number
/// of digits, so this never collides with a payload.
fn byte_count(line: &str) -> Option<usize> {
    if line.len() == 3 && line.bytes().all(|b| b.is_ascii_hexdigit()) {
        usize::from_str_radix(line, 16).ok()
    } else {
        None
    }
}

/// Data of an indexed frame (`0:...`, `1A: ...`).
fn frame_data(line: &str) -> Option<&str> {
    let (index, data) = line.split_once(':')?;
    let index = index.trim();
    let indexed =
        !index.is_empty() && index.len() <= 2 && index.bytes().all(|b| b.is_ascii_hexdigit());
    indexed.then(|| data.trim())
}

struct FrameGroup<'a> {
    source: &'a str,
    declared: Option<usize>,
    bytes: ObdResult<Vec<u8>>,
}

impl<'a> FrameGroup<'a> {
    fn new(source: &'a str, declared: Option<usize>) -> Self {
        Self {
            source,
            declared,
            bytes: Ok(Vec::new()),
        }
    }

    fn push(&mut self, data: &str) {
        let frame = parse_hex(data);
        self.bytes = std::mem::replace(&mut self.bytes, Ok(Vec::new())).and_then(|mut bytes| {
            bytes.extend(frame?);
            Ok(bytes)
        });
    }

    fn finish(self) -> Message<'a> {
        let FrameGroup {
            source,
            declared,
            bytes,
        } = self;
        let bytes = bytes.and_then(|mut bytes| match declared {
            Some(len) if bytes.len() < len => Err(ObdError::InvalidResponse(format!(
                "multi-frame message at '{source}' is short: {} of {len} bytes",
                bytes.len()
            ))),
            Some(len) => {
                // Trailing frame padding.
                bytes.truncate(len);
                Ok(bytes)
            }
            None => Ok(bytes),
        });
        Message { source, bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims() {
        assert_eq!(
            lines("41 0C 1A F8\r\r41 0C 1A FC\r", "010C"),
            vec!["41 0C 1A F8", "41 0C 1A FC"]
        );
    }

    #[test]
    fn drops_search_chatter_and_echo() {
        let text = "010C\rSEARCHING...\r41 0C 1A F8";
        assert_eq!(lines(text, "010C"), vec!["41 0C 1A F8"]);

        let text = "BUS INIT: ...OK\r43 01 71 00 00 00 00";
        assert_eq!(lines(text, "03"), vec!["43 01 71 00 00 00 00"]);
    }

    #[test]
    fn echo_match_ignores_spacing() {
        assert_eq!(lines("01 0C\r410C1AF8", "010C"), vec!["410C1AF8"]);
    }

    #[test]
    fn no_data_status() {
        let err = check_status(&["NO DATA"], "0142").unwrap_err();
        assert!(matches!(err, ObdError::NoData { command } if command == "0142"));
    }

    #[test]
    fn unknown_command_status() {
        let err = check_status(&["?"], "ATXX").unwrap_err();
        assert!(matches!(err, ObdError::InvalidResponse(_)));
    }

    #[test]
    fn bus_failures() {
        for status in ["UNABLE TO CONNECT", "CAN ERROR", "BUS ERROR", "STOPPED"] {
            let err = check_status(&[status], "010C").unwrap_err();
            assert!(matches!(err, ObdError::Adapter(_)), "{status}");
        }
    }

    #[test]
    fn data_passes_status_check() {
        assert!(check_status(&["41 0C 1A F8"], "010C").is_ok());
        assert!(check_status(&[], "010C").is_ok());
    }

    #[test]
    fn payload_lines_of_response() {
        let response = RawResponse {
            command: "0105".into(),
            text: "SEARCHING...\r41 05 46".into(),
            complete: true,
        };
        assert_eq!(payload_lines(&response).unwrap(), vec!["41 05 46"]);
    }

    #[test]
    fn parses_spaced_and_packed_hex() {
        assert_eq!(parse_hex("41 0C 1A F8").unwrap(), vec![0x41, 0x0C, 0x1A, 0xF8]);
        assert_eq!(parse_hex("410c1af8").unwrap(), vec![0x41, 0x0C, 0x1A, 0xF8]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            parse_hex("41 0C 1"),
            Err(ObdError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_hex("ELM327 v1.5"),
            Err(ObdError::InvalidResponse(_))
        ));
    }

    fn decoded<'a>(lines: &[&'a str]) -> Vec<(&'a str, Vec<u8>)> {
        messages(lines)
            .into_iter()
            .map(|m| (m.source, m.bytes.unwrap()))
            .collect()
    }

    #[test]
    fn single_frame_lines_are_separate_messages() {
        let got = decoded(&["41 0C 1A F8", "410C1AFC"]);
        assert_eq!(
            got,
            vec![
                ("41 0C 1A F8", vec![0x41, 0x0C, 0x1A, 0xF8]),
                ("410C1AFC", vec![0x41, 0x0C, 0x1A, 0xFC]),
            ]
        );
    }

    #[test]
    fn joins_multi_frame_and_drops_padding() {
        let lines = lines("00A\r0:43040171030004\r1:20013300000000", "03");
        let got = decoded(&lines);
        assert_eq!(
            got,
            vec![(
                "00A",
                vec![0x43, 0x04, 0x01, 0x71, 0x03, 0x00, 0x04, 0x20, 0x01, 0x33]
            )]
        );
    }

    #[test]
    fn spaced_frames_with_wide_index() {
        let lines = [
            "012",
            "0: 49 02 01 31 44 34",
            "1: 47 50 30 30 52 35 35",
            "A: 42 31 32 33 34 AA AA",
        ];
        let got = decoded(&lines);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].1.len(), 0x12);
        assert_eq!(&got[0].1[..3], &[0x49, 0x02, 0x01]);
        assert_eq!(got[0].1.last(), Some(&0x34));
    }

    #[test]
    fn count_line_splits_groups_from_two_ecus() {
        let lines = ["008", "0:43030171030004", "1:20000000000000", "43 01 C1 00"];
        let got = decoded(&lines);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].1, vec![0x43, 0x03, 0x01, 0x71, 0x03, 0x00, 0x04, 0x20]);
        assert_eq!(got[1], ("43 01 C1 00", vec![0x43, 0x01, 0xC1, 0x00]));
    }

    #[test]
    fn frames_without_count_line_still_join() {
        let got = decoded(&["0:4902013144", "1:4750"]);
        assert_eq!(
            got,
            vec![("0:4902013144", vec![0x49, 0x02, 0x01, 0x31, 0x44, 0x47, 0x50])]
        );
    }

    #[test]
    fn short_or_bad_groups_are_errors() {
        let short = messages(&["014", "0:490201314434"]);
        assert_eq!(short.len(), 1);
        assert!(matches!(short[0].bytes, Err(ObdError::InvalidResponse(_))));

        let bad = messages(&["00A", "0:43040171030004", "1:2001ZZ00000000"]);
        assert!(matches!(bad[0].bytes, Err(ObdError::InvalidResponse(_))));
    }
}
