//! Serial address ranges with arbitrary-precision enumeration
//!
//! A qualification session targets an inclusive range of decimal serial
//! numbers. Ranges can exceed what a 64-bit counter holds, so the bounds are
//! kept as `BigUint` and enumeration is lazy. Devices advertise only the last
//! four digits of their serial, so the range also exposes a suffix window for
//! pre-connection filtering and a complement computation at suffix
//! granularity.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use std::collections::HashSet;
use thiserror::Error;

/// Number of trailing decimal digits a device advertises before connection
pub const SUFFIX_DIGITS: usize = 4;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("serial literal {0:?} is not a decimal number")]
    InvalidLiteral(String),
    #[error("serial literal must not be empty")]
    EmptyLiteral,
}

/// Inclusive range of decimal serial numbers
///
/// `digit_width` is taken from the `start` literal the range was parsed from;
/// every serial the range produces is zero-padded to that width. Immutable
/// once a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    start: BigUint,
    end: BigUint,
    digit_width: usize,
}

impl AddressRange {
    /// Parse a range from the original serial literals.
    ///
    /// `end < start` is accepted and yields an empty range rather than an
    /// error; callers that need a non-empty range check [`Self::is_empty`].
    pub fn parse(start_lit: &str, end_lit: &str) -> Result<Self, RangeError> {
        let start = parse_serial(start_lit)?;
        let end = parse_serial(end_lit)?;
        Ok(Self {
            start,
            end,
            digit_width: start_lit.len(),
        })
    }

    pub fn start(&self) -> &BigUint {
        &self.start
    }

    pub fn end(&self) -> &BigUint {
        &self.end
    }

    pub fn digit_width(&self) -> usize {
        self.digit_width
    }

    /// Rendered start bound, zero-padded
    pub fn start_serial(&self) -> String {
        self.render(&self.start)
    }

    /// Rendered end bound, zero-padded
    pub fn end_serial(&self) -> String {
        self.render(&self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Number of serials in the range (zero when inverted)
    pub fn cardinality(&self) -> BigUint {
        if self.is_empty() {
            BigUint::zero()
        } else {
            &self.end - &self.start + BigUint::one()
        }
    }

    /// Cardinality saturated to `u64`, used as the session budget
    pub fn budget(&self) -> u64 {
        self.cardinality().to_u64().unwrap_or(u64::MAX)
    }

    /// Whether a full serial number lies numerically within the range
    pub fn contains(&self, serial: &str) -> bool {
        match parse_serial(serial) {
            Ok(n) => n >= self.start && n <= self.end,
            Err(_) => false,
        }
    }

    /// Lazily enumerate every serial in the range, zero-padded
    pub fn expand(&self) -> SerialIter {
        SerialIter {
            next: self.start.clone(),
            end: self.end.clone(),
            digit_width: self.digit_width,
            exhausted: self.is_empty(),
        }
    }

    /// Serials in the range whose advertised suffix was never observed.
    ///
    /// Comparison is at suffix granularity, matching what devices put on air.
    /// Serials shorter than [`SUFFIX_DIGITS`] digits never match an
    /// observation and are always reported missing.
    pub fn complement<'a>(
        &self,
        observed_suffixes: &'a HashSet<String>,
    ) -> impl Iterator<Item = String> + 'a {
        self.expand().filter(move |serial| match suffix(serial) {
            Some(sfx) => !observed_suffixes.contains(&sfx),
            None => true,
        })
    }

    /// Advertising-suffix acceptance window for this range.
    ///
    /// The window wraps when the range crosses a 10^4 boundary, e.g.
    /// 2405009998..2405010002 admits suffixes 9998, 9999, 0000, 0001, 0002.
    pub fn suffix_window(&self) -> SuffixWindow {
        let modulus = BigUint::from(10u32.pow(SUFFIX_DIGITS as u32));
        let lo = (&self.start % &modulus).to_u16().unwrap_or(0);
        let hi = (&self.end % &modulus).to_u16().unwrap_or(0);
        SuffixWindow { lo, hi }
    }

    fn render(&self, n: &BigUint) -> String {
        format!("{:0>width$}", n.to_string(), width = self.digit_width)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_serial(), self.end_serial())
    }
}

fn parse_serial(lit: &str) -> Result<BigUint, RangeError> {
    if lit.is_empty() {
        return Err(RangeError::EmptyLiteral);
    }
    if !lit.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::InvalidLiteral(lit.to_string()));
    }
    lit.parse::<BigUint>()
        .map_err(|_| RangeError::InvalidLiteral(lit.to_string()))
}

/// Last [`SUFFIX_DIGITS`] digits of a serial, or `None` when the serial is
/// too short or not numeric
pub fn suffix(serial: &str) -> Option<String> {
    // Byte-wise so a multi-byte advertised name cannot split a char boundary
    let bytes = serial.as_bytes();
    if bytes.len() < SUFFIX_DIGITS {
        return None;
    }
    let tail = &bytes[bytes.len() - SUFFIX_DIGITS..];
    if tail.iter().all(|b| b.is_ascii_digit()) {
        Some(String::from_utf8_lossy(tail).into_owned())
    } else {
        None
    }
}

/// Inclusive advertising-suffix window, wrap-aware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixWindow {
    pub lo: u16,
    pub hi: u16,
}

impl SuffixWindow {
    pub fn contains(&self, sfx: u16) -> bool {
        if self.lo <= self.hi {
            sfx >= self.lo && sfx <= self.hi
        } else {
            sfx >= self.lo || sfx <= self.hi
        }
    }
}

/// Lazy iterator over the serials of an [`AddressRange`]
pub struct SerialIter {
    next: BigUint,
    end: BigUint,
    digit_width: usize,
    exhausted: bool,
}

impl Iterator for SerialIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let serial = format!("{:0>width$}", self.next.to_string(), width = self.digit_width);
        if self.next == self.end {
            self.exhausted = true;
        } else {
            self.next += BigUint::one();
        }
        Some(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> AddressRange {
        AddressRange::parse(start, end).unwrap()
    }

    #[test]
    fn test_expand_cardinality_and_padding() {
        let r = range("0098", "0102");
        let serials: Vec<String> = r.expand().collect();
        assert_eq!(serials, vec!["0098", "0099", "0100", "0101", "0102"]);
        assert_eq!(r.cardinality(), BigUint::from(5u32));
        assert!(serials.iter().all(|s| s.len() == 4));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let r = range("2405000003", "2405000001");
        assert!(r.is_empty());
        assert_eq!(r.expand().count(), 0);
        assert_eq!(r.budget(), 0);
    }

    #[test]
    fn test_huge_range_is_lazy() {
        // Wider than u64; taking a prefix must not enumerate the whole range
        let r = range("99999999999999999999990", "99999999999999999999999999");
        assert_eq!(r.budget(), u64::MAX);
        let first: Vec<String> = r.expand().take(2).collect();
        assert_eq!(first[0], "99999999999999999999990");
        assert_eq!(first[1], "99999999999999999999991");
    }

    #[test]
    fn test_complement_partitions_expansion() {
        let r = range("2405000001", "2405000005");
        let observed: HashSet<String> =
            ["0002", "0004"].iter().map(|s| s.to_string()).collect();
        let missing: Vec<String> = r.complement(&observed).collect();
        assert_eq!(missing, vec!["2405000001", "2405000003", "2405000005"]);

        // complement + observed covers the expansion exactly once
        let covered: Vec<String> = r
            .expand()
            .filter(|s| observed.contains(&suffix(s).unwrap()))
            .chain(missing.clone())
            .collect();
        assert_eq!(covered.len(), r.expand().count());
    }

    #[test]
    fn test_short_serial_never_matches_observation() {
        let r = range("001", "003");
        let observed: HashSet<String> = ["0002".to_string()].into_iter().collect();
        let missing: Vec<String> = r.complement(&observed).collect();
        assert_eq!(missing, vec!["001", "002", "003"]);
    }

    #[test]
    fn test_suffix_extraction() {
        assert_eq!(suffix("2405000001").as_deref(), Some("0001"));
        assert_eq!(suffix("0001").as_deref(), Some("0001"));
        assert_eq!(suffix("001"), None);
        assert_eq!(suffix("24050x0001").as_deref(), Some("0001"));
        assert_eq!(suffix("240500000x"), None);
    }

    #[test]
    fn test_suffix_window_plain_and_wrapped() {
        let w = range("2405000001", "2405000003").suffix_window();
        assert!(w.contains(1) && w.contains(3));
        assert!(!w.contains(0) && !w.contains(4));

        let w = range("2405009998", "2405010002").suffix_window();
        assert!(w.contains(9998) && w.contains(9999));
        assert!(w.contains(0) && w.contains(2));
        assert!(!w.contains(5000));
    }

    #[test]
    fn test_contains_full_serial() {
        let r = range("2405000001", "2405000003");
        assert!(r.contains("2405000002"));
        assert!(!r.contains("2405000004"));
        assert!(!r.contains("A2405000002"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(AddressRange::parse("24O5000001", "2405000003").is_err());
        assert!(AddressRange::parse("", "2405000003").is_err());
    }
}
