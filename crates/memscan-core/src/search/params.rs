//! Search modes, targets, eligibility flags, and query resolution.

use crate::{AccessWidth, BlockAccess, MemoryFault, SearchParams};

/// Search mode of an initial scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SearchKind {
    /// Integer of exactly this width.
    ExplicitInt(AccessWidth),
    /// Integer at any width it fits, with decimal/hex readings and divisors.
    Guess,
    /// Byte pattern of the target text.
    StringMatch,
}

impl SearchKind {
    /// Parses the short kind name used on command lines.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int8" | "i8" | "8" => Some(Self::ExplicitInt(AccessWidth::Byte)),
            "int16" | "i16" | "16" => Some(Self::ExplicitInt(AccessWidth::Half)),
            "int32" | "i32" | "32" => Some(Self::ExplicitInt(AccessWidth::Word)),
            "guess" => Some(Self::Guess),
            "string" | "str" => Some(Self::StringMatch),
            _ => None,
        }
    }
}

/// Block eligibility filter for a search.
///
/// Each variant selects blocks carrying at least the named rights, so the
/// three filters are distinct: `Read` admits ROM and RAM, `Write` admits RAM
/// and write-only latches, `ReadWrite` admits RAM only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryFlags {
    /// Readable blocks.
    Read,
    /// Writable blocks.
    Write,
    /// Blocks both readable and writable.
    #[default]
    ReadWrite,
}

impl MemoryFlags {
    /// Returns `true` when a block with `access` is eligible.
    #[must_use]
    pub const fn admits(self, access: BlockAccess) -> bool {
        match self {
            Self::Read => access.readable,
            Self::Write => access.writable,
            Self::ReadWrite => access.readable && access.writable,
        }
    }

    /// Parses `r`, `w`, or `rw`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "r" | "read" => Some(Self::Read),
            "w" | "write" => Some(Self::Write),
            "rw" | "read-write" => Some(Self::ReadWrite),
            _ => None,
        }
    }
}

/// Value a search compares memory against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SearchTarget {
    /// Integer target.
    Int(i64),
    /// Textual target: parsed for integer kinds, matched bytewise for strings.
    Text(String),
}

impl From<i64> for SearchTarget {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SearchTarget {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SearchTarget {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Value to match.
    pub target: SearchTarget,
    /// Search mode for an initial scan.
    pub kind: SearchKind,
    /// Block eligibility filter.
    pub flags: MemoryFlags,
    /// Result cap of an initial scan; ignored when narrowing.
    pub limit: usize,
}

impl SearchQuery {
    /// Creates a guessing, read-write query with the given limit.
    #[must_use]
    pub fn new(target: impl Into<SearchTarget>, limit: usize) -> Self {
        Self {
            target: target.into(),
            kind: SearchKind::Guess,
            flags: MemoryFlags::ReadWrite,
            limit,
        }
    }

    /// Replaces the search mode.
    #[must_use]
    pub const fn with_kind(mut self, kind: SearchKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replaces the eligibility filter.
    #[must_use]
    pub const fn with_flags(mut self, flags: MemoryFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replaces the result cap.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Replaces the target, keeping every other parameter.
    #[must_use]
    pub fn retarget(mut self, target: impl Into<SearchTarget>) -> Self {
        self.target = target.into();
        self
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer, with one optional
/// leading sign.
#[must_use]
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, unsigned) = text.strip_prefix('-').map_or_else(
        || (false, text.strip_prefix('+').unwrap_or(text)),
        |rest| (true, rest),
    );
    let (radix, digits) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .map_or((10, unsigned), |hex| (16, hex));
    if digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        0_i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn integer_readings(kind: SearchKind, target: &SearchTarget) -> Vec<i64> {
    let text = match target {
        SearchTarget::Int(value) => return vec![*value],
        SearchTarget::Text(text) => text.trim(),
    };
    let mut readings: Vec<i64> = parse_int(text).into_iter().collect();
    let prefixed = text.starts_with("0x") || text.starts_with("0X");
    if kind == SearchKind::Guess && !prefixed {
        if let Ok(hex) = i64::from_str_radix(text, 16) {
            if !readings.contains(&hex) {
                readings.push(hex);
            }
        }
    }
    readings
}

impl SearchParams {
    /// Resolves a query into backend predicate parameters.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::InvalidSearchTarget`] when an integer kind is
    /// given a target with no integer reading, or a string search is given
    /// an empty pattern.
    pub fn resolve(
        query: &SearchQuery,
        divisors: &[u32],
        region_start: u32,
        region_len: usize,
    ) -> Result<Self, MemoryFault> {
        let ints = integer_readings(query.kind, &query.target);
        let pattern = match &query.target {
            SearchTarget::Int(value) => value.to_string().into_bytes(),
            SearchTarget::Text(text) => text.as_bytes().to_vec(),
        };
        let invalid = match query.kind {
            SearchKind::ExplicitInt(_) | SearchKind::Guess => ints.is_empty(),
            SearchKind::StringMatch => pattern.is_empty(),
        };
        if invalid {
            let text = match &query.target {
                SearchTarget::Int(value) => value.to_string(),
                SearchTarget::Text(text) => text.clone(),
            };
            return Err(MemoryFault::InvalidSearchTarget { text });
        }
        let mut divisors: Vec<u32> = divisors.iter().copied().filter(|d| *d > 0).collect();
        if !divisors.contains(&1) {
            divisors.insert(0, 1);
        }
        let start = u64::from(region_start);
        Ok(Self {
            kind: query.kind,
            flags: query.flags,
            ints,
            pattern,
            divisors,
            region: start..start.saturating_add(region_len as u64),
        })
    }
}
