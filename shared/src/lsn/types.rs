use std::fmt;

/// PostgreSQL Log Sequence Number — a monotonically increasing 64-bit value
/// representing a position in the write-ahead log.
///
/// Analytical records carry the decoded value as their version column, so
/// the ordering of `Lsn` is the ordering the OLAP store deduplicates by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn(pub u64);

impl Lsn {
    pub const ZERO: Lsn = Lsn(0);
    pub const MAX: Lsn = Lsn(u64::MAX);

    /// Create a new LSN from a raw u64 value.
    #[inline]
    pub fn new(val: u64) -> Self {
        Self(val)
    }

    /// Returns the raw u64 value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Decode a log position as emitted by the CDC connector.
    ///
    /// Accepts PostgreSQL's `X/Y` hex format (e.g. `0/16B3740`), where each
    /// half must fit in 32 bits, and the bare single-hex form (e.g.
    /// `16B3740`), which is read as the low half with a zero high half and
    /// may span the full 64 bits.
    pub fn decode(s: &str) -> Result<Self, LsnParseError> {
        match s.split_once('/') {
            Some((hi, lo)) => {
                let hi = parse_hex(hi).and_then(|v| u32::try_from(v).ok());
                let lo = parse_hex(lo).and_then(|v| u32::try_from(v).ok());
                match (hi, lo) {
                    (Some(hi), Some(lo)) => Ok(Self(((hi as u64) << 32) | lo as u64)),
                    _ => Err(LsnParseError(s.to_string())),
                }
            }
            None => parse_hex(s)
                .map(Self)
                .ok_or_else(|| LsnParseError(s.to_string())),
        }
    }

    /// Format as PostgreSQL's `X/Y` hex format.
    pub fn to_pg_string(self) -> String {
        let hi = (self.0 >> 32) as u32;
        let lo = self.0 as u32;
        format!("{:X}/{:X}", hi, lo)
    }

    /// Returns true if this LSN is ahead of `other`.
    #[inline]
    pub fn is_ahead_of(self, other: Lsn) -> bool {
        self.0 > other.0
    }
}

/// `from_str_radix` tolerates a leading `+`, so the digits are checked
/// explicitly first.
fn parse_hex(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(part, 16).ok()
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_pg_string())
    }
}

impl std::str::FromStr for Lsn {
    type Err = LsnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<u64> for Lsn {
    #[inline]
    fn from(val: u64) -> Self {
        Self(val)
    }
}

impl From<Lsn> for u64 {
    #[inline]
    fn from(lsn: Lsn) -> Self {
        lsn.0
    }
}

/// Error returned when an LSN string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsnParseError(pub String);

impl fmt::Display for LsnParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid LSN format: '{}'", self.0)
    }
}

impl std::error::Error for LsnParseError {}
