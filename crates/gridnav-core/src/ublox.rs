//! Decoder for u-blox UBX NAV-POSLLH frames stored as hex text.
//!
//! A fix file holds two lines, start then goal, each a whitespace-separated list of hex
//! bytes (`B5`, `0xB5` and `0XB5` are all accepted). A frame is
//!
//! ```text
//! [B5 62] class id len_lo len_hi payload[len] ck_a ck_b
//! ```
//!
//! where the sync bytes are optional. Frames recorded without the trailing checksum get one
//! computed and appended before decoding.

use crate::models::GeoPoint;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const SYNC_1: u8 = 0xB5;
pub const SYNC_2: u8 = 0x62;
pub const CLASS_NAV: u8 = 0x01;
pub const ID_NAV_POSLLH: u8 = 0x02;
pub const NAV_POSLLH_LEN: usize = 28;

/// Errors produced while reading or decoding UBX frames.
#[derive(Debug, Error)]
pub enum UbxError {
    #[error("cannot read fix file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fix file has no {0} line")]
    MissingLine(&'static str),

    #[error("invalid hex token {0:?}")]
    InvalidHex(String),

    #[error("frame truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("unsupported message class 0x{class:02X} id 0x{id:02X}")]
    UnsupportedMessage { class: u8, id: u8 },

    #[error("NAV-POSLLH payload must be 28 bytes, got {0}")]
    BadLength(usize),

    #[error("checksum mismatch: expected {expected:02X?}, computed {computed:02X?}")]
    ChecksumMismatch { expected: [u8; 2], computed: [u8; 2] },
}

/// Raw NAV-POSLLH payload fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavPosLlh {
    /// GPS time of week, ms
    pub itow_ms: u32,
    /// Longitude, 1e-7 deg
    pub lon: i32,
    /// Latitude, 1e-7 deg
    pub lat: i32,
    /// Height above ellipsoid, mm
    pub height_mm: i32,
    /// Height above mean sea level, mm
    pub hmsl_mm: i32,
    /// Horizontal accuracy estimate, mm
    pub h_acc_mm: u32,
    /// Vertical accuracy estimate, mm
    pub v_acc_mm: u32,
}

impl NavPosLlh {
    pub fn to_geo_point(&self) -> GeoPoint {
        GeoPoint::with_altitude(
            f64::from(self.lat) * 1e-7,
            f64::from(self.lon) * 1e-7,
            f64::from(self.height_mm) / 1000.0,
        )
    }
}

/// 8-bit Fletcher checksum over `data`, as used by UBX.
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let mut ck_a = 0u8;
    let mut ck_b = 0u8;
    for byte in data {
        ck_a = ck_a.wrapping_add(*byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    [ck_a, ck_b]
}

/// Parse a line of hex byte tokens.
pub fn parse_hex_line(line: &str) -> Result<Vec<u8>, UbxError> {
    line.split_whitespace()
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            // from_str_radix alone would also take a leading sign
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(UbxError::InvalidHex(token.to_string()));
            }
            u8::from_str_radix(digits, 16).map_err(|_| UbxError::InvalidHex(token.to_string()))
        })
        .collect()
}

/// Decode one NAV-POSLLH frame.
///
/// The frame must already carry its checksum; see [`complete_frame`].
pub fn decode_frame(frame: &[u8]) -> Result<NavPosLlh, UbxError> {
    let off = sync_offset(frame);
    let header = read_header(frame, off)?;

    if header.class != CLASS_NAV || header.id != ID_NAV_POSLLH {
        return Err(UbxError::UnsupportedMessage {
            class: header.class,
            id: header.id,
        });
    }
    if header.len != NAV_POSLLH_LEN {
        return Err(UbxError::BadLength(header.len));
    }

    let body_end = off + 4 + header.len;
    if frame.len() < body_end + 2 {
        return Err(UbxError::Truncated {
            needed: body_end + 2,
            actual: frame.len(),
        });
    }

    let expected = [frame[body_end], frame[body_end + 1]];
    let computed = checksum(&frame[off..body_end]);
    if expected != computed {
        return Err(UbxError::ChecksumMismatch { expected, computed });
    }

    let payload = &frame[off + 4..body_end];
    Ok(NavPosLlh {
        itow_ms: read_u32(payload, 0),
        lon: read_i32(payload, 4),
        lat: read_i32(payload, 8),
        height_mm: read_i32(payload, 12),
        hmsl_mm: read_i32(payload, 16),
        h_acc_mm: read_u32(payload, 20),
        v_acc_mm: read_u32(payload, 24),
    })
}

/// Append the checksum to a frame that was recorded without one.
///
/// Frames that already carry trailing bytes, or that are too short to hold a header, are
/// left untouched and rejected later by [`decode_frame`].
pub fn complete_frame(frame: &mut Vec<u8>) {
    let off = sync_offset(frame);
    let Ok(header) = read_header(frame, off) else {
        return;
    };
    let body_end = off + 4 + header.len;
    if frame.len() == body_end {
        let ck = checksum(&frame[off..body_end]);
        frame.extend_from_slice(&ck);
    }
}

/// Decode a single hex line into a geodetic fix.
pub fn decode_hex_line(line: &str) -> Result<GeoPoint, UbxError> {
    let mut frame = parse_hex_line(line)?;
    complete_frame(&mut frame);
    let fix = decode_frame(&frame)?;
    debug!(
        itow_ms = fix.itow_ms,
        lat = fix.lat,
        lon = fix.lon,
        h_acc_mm = fix.h_acc_mm,
        "decoded NAV-POSLLH"
    );
    Ok(fix.to_geo_point())
}

/// Decode the start and goal fixes from the first two lines of `text`.
pub fn decode_fix_pair(text: &str) -> Result<(GeoPoint, GeoPoint), UbxError> {
    let mut lines = text.lines();
    let start = lines.next().ok_or(UbxError::MissingLine("start"))?;
    let goal = lines.next().ok_or(UbxError::MissingLine("goal"))?;
    Ok((decode_hex_line(start)?, decode_hex_line(goal)?))
}

/// Read a fix file and decode its start and goal fixes.
pub fn read_fix_file(path: impl AsRef<Path>) -> Result<(GeoPoint, GeoPoint), UbxError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| UbxError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_fix_pair(&text)
}

/// Encode a NAV-POSLLH frame with sync bytes and checksum.
pub fn encode_nav_posllh(fix: &NavPosLlh) -> Vec<u8> {
    let mut frame = vec![SYNC_1, SYNC_2, CLASS_NAV, ID_NAV_POSLLH];
    frame.extend_from_slice(&(NAV_POSLLH_LEN as u16).to_le_bytes());
    frame.extend_from_slice(&fix.itow_ms.to_le_bytes());
    frame.extend_from_slice(&fix.lon.to_le_bytes());
    frame.extend_from_slice(&fix.lat.to_le_bytes());
    frame.extend_from_slice(&fix.height_mm.to_le_bytes());
    frame.extend_from_slice(&fix.hmsl_mm.to_le_bytes());
    frame.extend_from_slice(&fix.h_acc_mm.to_le_bytes());
    frame.extend_from_slice(&fix.v_acc_mm.to_le_bytes());
    let ck = checksum(&frame[2..]);
    frame.extend_from_slice(&ck);
    frame
}

struct FrameHeader {
    class: u8,
    id: u8,
    len: usize,
}

fn sync_offset(frame: &[u8]) -> usize {
    if frame.len() >= 2 && frame[0] == SYNC_1 && frame[1] == SYNC_2 {
        2
    } else {
        0
    }
}

fn read_header(frame: &[u8], off: usize) -> Result<FrameHeader, UbxError> {
    if frame.len() < off + 4 {
        return Err(UbxError::Truncated {
            needed: off + 4,
            actual: frame.len(),
        });
    }
    Ok(FrameHeader {
        class: frame[off],
        id: frame[off + 1],
        len: usize::from(u16::from_le_bytes([frame[off + 2], frame[off + 3]])),
    })
}

fn read_u32(payload: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
}

fn read_i32(payload: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fix() -> NavPosLlh {
        NavPosLlh {
            itow_ms: 345_600_000,
            lon: 775_946_000,
            lat: 129_716_000,
            height_mm: 920_500,
            hmsl_mm: 905_000,
            h_acc_mm: 1_200,
            v_acc_mm: 2_400,
        }
    }

    fn to_hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn checksum_matches_known_poll_frame() {
        // UBX-NAV-POSLLH poll request: B5 62 01 02 00 00 03 0A
        assert_eq!(checksum(&[0x01, 0x02, 0x00, 0x00]), [0x03, 0x0A]);
    }

    #[test]
    fn decodes_encoded_frame_to_degrees() {
        let line = to_hex(&encode_nav_posllh(&sample_fix()));
        let point = decode_hex_line(&line).expect("valid frame");
        assert!((point.lat - 12.9716).abs() < 1e-9);
        assert!((point.lon - 77.5946).abs() < 1e-9);
        assert_eq!(point.altitude_m, Some(920.5));
    }

    #[test]
    fn accepts_missing_sync_and_checksum() {
        let frame = encode_nav_posllh(&sample_fix());
        // Strip sync bytes and checksum, and prefix a few tokens with 0x
        let bare = &frame[2..frame.len() - 2];
        let line = bare
            .iter()
            .enumerate()
            .map(|(i, b)| if i % 3 == 0 { format!("0x{b:02x}") } else { format!("{b:02X}") })
            .collect::<Vec<_>>()
            .join(" ");
        let point = decode_hex_line(&line).expect("checksum appended");
        assert!((point.lat - 12.9716).abs() < 1e-9);
    }

    #[test]
    fn rejects_corrupted_frames() {
        let mut frame = encode_nav_posllh(&sample_fix());
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert!(matches!(
            decode_frame(&frame),
            Err(UbxError::ChecksumMismatch { .. })
        ));

        let mut wrong_id = encode_nav_posllh(&sample_fix());
        wrong_id[3] = 0x07;
        assert!(matches!(
            decode_frame(&wrong_id),
            Err(UbxError::UnsupportedMessage { class: 0x01, id: 0x07 })
        ));

        assert!(matches!(
            decode_frame(&[SYNC_1, SYNC_2, 0x01]),
            Err(UbxError::Truncated { .. })
        ));
        assert!(matches!(
            parse_hex_line("B5 62 ZZ"),
            Err(UbxError::InvalidHex(token)) if token == "ZZ"
        ));
    }

    #[test]
    fn hex_tokens_must_be_bare_digits() {
        assert_eq!(parse_hex_line("0xB5 0X62 01 0a").ok(), Some(vec![0xB5, 0x62, 0x01, 0x0A]));
        for bad in ["+F", "-1", "0x", "0x+F", "1FF"] {
            assert!(
                matches!(parse_hex_line(bad), Err(UbxError::InvalidHex(ref t)) if t == bad),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn fix_pair_needs_two_lines() {
        let line = to_hex(&encode_nav_posllh(&sample_fix()));
        assert!(matches!(
            decode_fix_pair(&line),
            Err(UbxError::MissingLine("goal"))
        ));
        let (start, goal) = decode_fix_pair(&format!("{line}\n{line}\n")).expect("two fixes");
        assert_eq!(start, goal);
    }
}
