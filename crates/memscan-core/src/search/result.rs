//! Immutable search result records bound to a resolved width and divisor.

use crate::{AccessWidth, AddressSpace, MemoryFault, MemorySpace, SearchRecord, Signedness};

/// Resolved type of one search match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ResultKind {
    /// Found by an explicit-width integer search.
    Int(AccessWidth),
    /// Found by a guessing search at this width.
    Guessed(AccessWidth),
    /// Byte-pattern match of `len` bytes.
    Text {
        /// Pattern length in bytes.
        len: u32,
    },
}

impl ResultKind {
    /// Decodes a backend type tag and width field.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::UnknownResultType`] for unrecognized tags and
    /// [`MemoryFault::InvalidResultWidth`] for widths that do not fit the tag.
    pub fn decode(tag: u8, width: u32) -> Result<Self, MemoryFault> {
        let scalar =
            || AccessWidth::from_bytes(width).ok_or(MemoryFault::InvalidResultWidth { width });
        match tag {
            SearchRecord::TAG_INT => Ok(Self::Int(scalar()?)),
            SearchRecord::TAG_GUESS => Ok(Self::Guessed(scalar()?)),
            SearchRecord::TAG_STRING if width > 0 => Ok(Self::Text { len: width }),
            SearchRecord::TAG_STRING => Err(MemoryFault::InvalidResultWidth { width }),
            other => Err(MemoryFault::UnknownResultType { tag: other }),
        }
    }

    /// Backend type tag of this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Int(_) => SearchRecord::TAG_INT,
            Self::Guessed(_) => SearchRecord::TAG_GUESS,
            Self::Text { .. } => SearchRecord::TAG_STRING,
        }
    }

    /// Backend width field of this kind.
    #[must_use]
    pub fn record_width(self) -> u32 {
        match self {
            Self::Int(width) | Self::Guessed(width) => u32::from(width.bytes()),
            Self::Text { len } => len,
        }
    }

    /// Scalar width, or `None` for string matches.
    #[must_use]
    pub const fn scalar_width(self) -> Option<AccessWidth> {
        match self {
            Self::Int(width) | Self::Guessed(width) => Some(width),
            Self::Text { .. } => None,
        }
    }
}

/// One matched address, bound to the width and divisor it was found with.
///
/// Results are plain values: a narrowing pass re-emits fresh copies of the
/// results that still match and drops the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SearchResult {
    address: u32,
    segment: i32,
    kind: ResultKind,
    divisor: u32,
}

impl SearchResult {
    /// Builds a result from a backend record, translating the bus address
    /// into an offset relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the record's tag, width, or divisor is
    /// not recognized.
    pub fn from_record(record: &SearchRecord, base: u32) -> Result<Self, MemoryFault> {
        let kind = ResultKind::decode(record.type_tag, record.width)?;
        if record.divisor == 0 {
            return Err(MemoryFault::InvalidResultDivisor);
        }
        Ok(Self {
            address: record.address.wrapping_sub(base),
            segment: record.segment,
            kind,
            divisor: record.divisor,
        })
    }

    /// Converts back into a backend record for a narrowing pass.
    #[must_use]
    pub fn to_record(&self, base: u32) -> SearchRecord {
        SearchRecord {
            address: self.address.wrapping_add(base),
            segment: self.segment,
            type_tag: self.kind.tag(),
            width: self.kind.record_width(),
            divisor: self.divisor,
        }
    }

    /// Offset within the memory space the search ran on.
    #[must_use]
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Segment the match was read through; `-1` when unsegmented.
    #[must_use]
    pub const fn segment(&self) -> i32 {
        self.segment
    }

    /// Resolved type of the match.
    #[must_use]
    pub const fn kind(&self) -> ResultKind {
        self.kind
    }

    /// Scale divisor; the displayed value is the stored value times this.
    #[must_use]
    pub const fn divisor(&self) -> u32 {
        self.divisor
    }

    fn scalar_width(&self) -> Result<AccessWidth, MemoryFault> {
        self.kind
            .scalar_width()
            .ok_or(MemoryFault::ScalarOnStringResult {
                address: self.address,
            })
    }

    /// Reads the current value: stored value times divisor.
    ///
    /// The read goes through the raw path and never perturbs emulated state.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ScalarOnStringResult`] for string matches,
    /// a range fault when the address no longer fits the memory space, and
    /// [`MemoryFault::ScaledValueOverflow`] when the scaled value does not
    /// fit an `i64`.
    pub fn value<B: AddressSpace>(&self, space: &MemorySpace<B>) -> Result<i64, MemoryFault> {
        let width = self.scalar_width()?;
        let view = space.view_of(width, Signedness::Unsigned);
        let stored = view.raw_read(space.backend(), i64::from(self.address), self.segment)?;
        stored
            .checked_mul(i64::from(self.divisor))
            .ok_or(MemoryFault::ScaledValueOverflow {
                address: self.address,
                stored,
                divisor: self.divisor,
            })
    }

    /// Stores `value` scaled down by the divisor (floor division).
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ScalarOnStringResult`] for string matches and
    /// a range fault when the address no longer fits the memory space.
    pub fn set_value<B: AddressSpace>(
        &self,
        space: &mut MemorySpace<B>,
        value: i64,
    ) -> Result<(), MemoryFault> {
        let width = self.scalar_width()?;
        let view = space.view_of(width, Signedness::Unsigned);
        let stored = value.div_euclid(i64::from(self.divisor));
        view.raw_write(space.backend_mut(), i64::from(self.address), stored, self.segment)
    }
}
