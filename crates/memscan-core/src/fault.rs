use thiserror::Error;

/// Fault classes used by callers to decide how to react to a failed access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Invalid construction-time or query-time parameter.
    Configuration,
    /// Address or slice bound outside the view extent.
    Range,
    /// Scalar decode/encode attempted on a string-typed search result.
    TypeMismatch,
    /// Backend search record carried an unrecognized type tag or width.
    Decode,
}

/// Fault taxonomy for typed views, memory spaces, and search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum MemoryFault {
    /// Signedness token is not one of the recognized spellings.
    #[error("invalid sign type: '{token}'")]
    InvalidSignedness {
        /// Token supplied by the caller.
        token: String,
    },
    /// Region is narrower than the view width.
    #[error("region of {size} bytes cannot hold a {width}-byte view")]
    RegionTooSmall {
        /// Region size in bytes.
        size: usize,
        /// Requested view width in bytes.
        width: u8,
    },
    /// Region runs past the end of the 32-bit bus.
    #[error("region of {size} bytes at {base:#010x} wraps around the address bus")]
    RegionWrapsAround {
        /// Bus offset of the region.
        base: u32,
        /// Region size in bytes.
        size: usize,
    },
    /// Integer search was given a target that does not parse as an integer.
    #[error("search target '{text}' is not an integer")]
    InvalidSearchTarget {
        /// Offending target text.
        text: String,
    },
    /// Address or half-open slice range falls outside `[0, size)`.
    #[error("address range {start}..{stop} out of bounds for region of {size} bytes")]
    AddressOutOfRange {
        /// Inclusive start offset.
        start: i64,
        /// Exclusive stop offset.
        stop: i64,
        /// Region size in bytes.
        size: usize,
    },
    /// Slice step must be strictly positive.
    #[error("slice step {step} must be positive")]
    InvalidStep {
        /// Offending step.
        step: i64,
    },
    /// Slice write was given fewer values than the slice addresses.
    #[error("slice write expected {expected} values, got {actual}")]
    SliceLengthMismatch {
        /// Number of addresses covered by the slice.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// Scalar value requested from a string-typed search result.
    #[error("search result at {address:#x} is a string match and has no scalar value")]
    ScalarOnStringResult {
        /// Logical address of the result.
        address: u32,
    },
    /// Backend search record carried an unknown type tag.
    #[error("unknown search result type: {tag:#04x}")]
    UnknownResultType {
        /// Raw type tag.
        tag: u8,
    },
    /// Backend search record carried a width that does not fit its type tag.
    #[error("invalid search result width: {width}")]
    InvalidResultWidth {
        /// Raw width field.
        width: u32,
    },
    /// Backend search record carried a zero divisor.
    #[error("search result divisor must be at least 1")]
    InvalidResultDivisor,
    /// Stored value times divisor does not fit a signed 64-bit value.
    #[error("search result at {address:#x}: value {stored} scaled by {divisor} overflows")]
    ScaledValueOverflow {
        /// Logical address of the result.
        address: u32,
        /// Raw stored value.
        stored: i64,
        /// Scale divisor.
        divisor: u32,
    },
}

impl MemoryFault {
    /// Returns the fault class for this fault.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::InvalidSignedness { .. }
            | Self::RegionTooSmall { .. }
            | Self::RegionWrapsAround { .. }
            | Self::InvalidSearchTarget { .. } => FaultClass::Configuration,
            Self::AddressOutOfRange { .. }
            | Self::InvalidStep { .. }
            | Self::SliceLengthMismatch { .. } => FaultClass::Range,
            Self::ScalarOnStringResult { .. } => FaultClass::TypeMismatch,
            Self::UnknownResultType { .. }
            | Self::InvalidResultWidth { .. }
            | Self::InvalidResultDivisor
            | Self::ScaledValueOverflow { .. } => FaultClass::Decode,
        }
    }

    /// Range faults are the only class a caller can fix by adjusting an address.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self.class(), FaultClass::Range)
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultClass, MemoryFault};

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(
            MemoryFault::InvalidSignedness {
                token: "bogus".into()
            }
            .class(),
            FaultClass::Configuration
        );
        assert_eq!(
            MemoryFault::RegionTooSmall { size: 1, width: 4 }.class(),
            FaultClass::Configuration
        );
        assert_eq!(
            MemoryFault::AddressOutOfRange {
                start: -1,
                stop: 0,
                size: 16
            }
            .class(),
            FaultClass::Range
        );
        assert_eq!(
            MemoryFault::InvalidStep { step: 0 }.class(),
            FaultClass::Range
        );
        assert_eq!(
            MemoryFault::ScalarOnStringResult { address: 0 }.class(),
            FaultClass::TypeMismatch
        );
        assert_eq!(
            MemoryFault::UnknownResultType { tag: 0xFF }.class(),
            FaultClass::Decode
        );
        assert_eq!(
            MemoryFault::InvalidResultWidth { width: 3 }.class(),
            FaultClass::Decode
        );
        assert_eq!(
            MemoryFault::RegionWrapsAround {
                base: u32::MAX,
                size: 4
            }
            .class(),
            FaultClass::Configuration
        );
        assert_eq!(
            MemoryFault::ScaledValueOverflow {
                address: 0,
                stored: 0xFFFF_FFFF,
                divisor: 3_000_000_000
            }
            .class(),
            FaultClass::Decode
        );
    }

    #[test]
    fn messages_are_stable() {
        let fault = MemoryFault::AddressOutOfRange {
            start: 15,
            stop: 17,
            size: 16,
        };
        assert_eq!(
            fault.to_string(),
            "address range 15..17 out of bounds for region of 16 bytes"
        );
        assert_eq!(
            MemoryFault::InvalidSignedness {
                token: "bogus".into()
            }
            .to_string(),
            "invalid sign type: 'bogus'"
        );
    }

    #[test]
    fn only_range_class_reports_is_range() {
        assert!(MemoryFault::InvalidStep { step: -1 }.is_range());
        assert!(!MemoryFault::UnknownResultType { tag: 9 }.is_range());
    }
}
