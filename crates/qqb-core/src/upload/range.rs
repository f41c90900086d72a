//! Turns the server's "next expected range" hint into the next chunk to send.
//!
//! Only the first hint is consulted; the server lists ranges in the order it
//! wants them. Everything here is pure.

use super::UploadError;

/// One parsed range hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpec {
    /// `"start-"`: send from `start`, as much as the transfer cap allows.
    Open { start: u64 },
    /// `"start-end"`: send exactly this inclusive range.
    Closed { start: u64, end: u64 },
}

/// Byte window of the next chunk. `length` is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkBounds {
    pub offset: u64,
    pub length: u64,
}

impl ChunkBounds {
    /// Inclusive index of the last byte in this chunk.
    pub fn last_byte(&self) -> u64 {
        self.offset + self.length - 1
    }

    pub fn end_exclusive(&self) -> u64 {
        self.offset + self.length
    }
}

pub fn parse_range_hint(hint: &str) -> Result<RangeSpec, UploadError> {
    let trimmed = hint.trim();
    let mut parts = trimmed.split('-');

    let start_raw = parts.next().unwrap_or_default().trim();
    let end_raw = parts.next().map(str::trim);
    if parts.next().is_some() {
        return Err(violation(format!("malformed range hint {hint:?}")));
    }

    let start = parse_offset(start_raw, hint)?;
    match end_raw {
        None | Some("") => Ok(RangeSpec::Open { start }),
        Some(raw) => {
            let end = parse_offset(raw, hint)?;
            if end < start {
                return Err(violation(format!(
                    "range hint {hint:?} ends before it starts"
                )));
            }
            Ok(RangeSpec::Closed { start, end })
        }
    }
}

/// Compute the next chunk from the session's hints.
///
/// Open hints are clamped to `transfer_cap`; closed hints are honored exactly,
/// even above the cap. Anything that would frame bytes outside
/// `0..total_size` is a protocol violation.
pub fn next_chunk_bounds(
    next_expected_ranges: &[String],
    total_size: u64,
    transfer_cap: u64,
) -> Result<ChunkBounds, UploadError> {
    let Some(hint) = next_expected_ranges.first() else {
        return Err(violation(
            "server sent no expected range while bytes remain".to_string(),
        ));
    };

    let (offset, length) = match parse_range_hint(hint)? {
        RangeSpec::Open { start } => {
            if start >= total_size {
                return Err(out_of_bounds(hint, total_size));
            }
            (start, (total_size - start).min(transfer_cap))
        }
        RangeSpec::Closed { start, end } => {
            if start >= total_size || end >= total_size {
                return Err(out_of_bounds(hint, total_size));
            }
            (start, end - start + 1)
        }
    };

    if length == 0 {
        return Err(violation(format!(
            "range hint {hint:?} yields an empty chunk"
        )));
    }

    Ok(ChunkBounds { offset, length })
}

fn parse_offset(raw: &str, hint: &str) -> Result<u64, UploadError> {
    raw.parse::<u64>()
        .map_err(|_| violation(format!("non-numeric range hint {hint:?}")))
}

fn out_of_bounds(hint: &str, total_size: u64) -> UploadError {
    violation(format!(
        "range hint {hint:?} is outside the {total_size}-byte attachment"
    ))
}

fn violation(msg: String) -> UploadError {
    UploadError::ProtocolViolation(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(h: &[&str]) -> Vec<String> {
        h.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_hint_is_clamped_to_cap() {
        let b = next_chunk_bounds(&hints(&["100-"]), 1000, 300).unwrap();
        assert_eq!(b, ChunkBounds { offset: 100, length: 300 });
    }

    #[test]
    fn open_hint_near_the_end_takes_the_remainder() {
        let b = next_chunk_bounds(&hints(&["900-"]), 1000, 300).unwrap();
        assert_eq!(b, ChunkBounds { offset: 900, length: 100 });
        assert_eq!(b.last_byte(), 999);
    }

    #[test]
    fn bare_start_is_an_open_hint() {
        assert_eq!(parse_range_hint("42").unwrap(), RangeSpec::Open { start: 42 });
        assert_eq!(parse_range_hint(" 0- ").unwrap(), RangeSpec::Open { start: 0 });
    }

    #[test]
    fn closed_hint_ignores_cap() {
        let b = next_chunk_bounds(&hints(&["100-199"]), 1000, 10).unwrap();
        assert_eq!(b, ChunkBounds { offset: 100, length: 100 });

        let big = next_chunk_bounds(&hints(&["0-999"]), 1000, 300).unwrap();
        assert_eq!(big.length, 1000);
    }

    #[test]
    fn only_the_first_hint_is_used() {
        let b = next_chunk_bounds(&hints(&["10-19", "500-"]), 1000, 300).unwrap();
        assert_eq!(b, ChunkBounds { offset: 10, length: 10 });
    }

    #[test]
    fn parsing_is_deterministic() {
        let h = hints(&["1048576-2097151"]);
        let a = next_chunk_bounds(&h, 3 * 1048576, 1048576).unwrap();
        let b = next_chunk_bounds(&h, 3 * 1048576, 1048576).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn violations_never_produce_bounds() {
        for bad in [
            vec![],
            hints(&[""]),
            hints(&["abc-"]),
            hints(&["10-x"]),
            hints(&["1-2-3"]),
            hints(&["20-10"]),
            hints(&["1000-"]),
            hints(&["5000-"]),
            hints(&["900-1000"]),
        ] {
            let r = next_chunk_bounds(&bad, 1000, 300);
            assert!(
                matches!(r, Err(UploadError::ProtocolViolation(_))),
                "expected violation for {bad:?}, got {r:?}"
            );
        }
    }

    #[test]
    fn zero_cap_on_open_hint_is_a_violation() {
        let r = next_chunk_bounds(&hints(&["0-"]), 1000, 0);
        assert!(matches!(r, Err(UploadError::ProtocolViolation(_))));
    }

    #[test]
    fn bounds_stay_inside_the_attachment() {
        let total = 777;
        for start in [0u64, 1, 300, 776] {
            for cap in [1u64, 100, 1000] {
                let b = next_chunk_bounds(&hints(&[format!("{start}-").as_str()]), total, cap).unwrap();
                assert!(b.end_exclusive() <= total);
                assert!(b.length <= cap);
            }
        }
    }
}
