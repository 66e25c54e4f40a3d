//! Closed access-width and signedness enumerations.

use crate::MemoryFault;

/// Fixed access width of a typed view or search match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
}

impl AccessWidth {
    /// All widths in ascending order.
    pub const ALL: [Self; 3] = [Self::Byte, Self::Half, Self::Word];

    /// Width in bytes.
    #[must_use]
    pub const fn bytes(self) -> u8 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Byte => 8,
            Self::Half => 16,
            Self::Word => 32,
        }
    }

    /// Mask selecting the low `bits()` bits, `2^(8*width) - 1`.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
        }
    }

    /// Looks up the width for a byte count.
    #[must_use]
    pub const fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            1 => Some(Self::Byte),
            2 => Some(Self::Half),
            4 => Some(Self::Word),
            _ => None,
        }
    }

    /// Returns `true` when `value` is representable in this width under
    /// either signed or unsigned interpretation.
    #[must_use]
    pub const fn fits(self, value: i64) -> bool {
        let bits = self.bits();
        let min = -(1_i64 << (bits - 1));
        let max = (1_i64 << bits) - 1;
        value >= min && value <= max
    }

    /// Truncates `value` to this width, two's-complement style.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn truncate(self, value: i64) -> u32 {
        (value as u64 as u32) & self.mask()
    }
}

/// Interpretation applied to raw bits read from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Signedness {
    /// Zero-extended.
    #[default]
    Unsigned,
    /// Sign-extended two's complement.
    Signed,
}

impl Signedness {
    /// Parses a signedness token: `u`/`unsigned` or `i`/`s`/`signed`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::InvalidSignedness`] for any other token.
    pub fn parse(token: &str) -> Result<Self, MemoryFault> {
        match token {
            "u" | "unsigned" => Ok(Self::Unsigned),
            "i" | "s" | "signed" => Ok(Self::Signed),
            other => Err(MemoryFault::InvalidSignedness {
                token: other.to_owned(),
            }),
        }
    }

    /// Reinterprets raw width-sized bits under this signedness.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn interpret(self, width: AccessWidth, raw: u32) -> i64 {
        let raw = raw & width.mask();
        match self {
            Self::Unsigned => raw as i64,
            Self::Signed => match width {
                AccessWidth::Byte => raw as u8 as i8 as i64,
                AccessWidth::Half => raw as u16 as i16 as i64,
                AccessWidth::Word => raw as i32 as i64,
            },
        }
    }
}

/// The six (width, signedness) view pairs a memory space carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ViewKind {
    /// Unsigned 8-bit.
    U8,
    /// Unsigned 16-bit.
    U16,
    /// Unsigned 32-bit.
    U32,
    /// Signed 8-bit.
    S8,
    /// Signed 16-bit.
    S16,
    /// Signed 32-bit.
    S32,
}

impl ViewKind {
    /// All view kinds in canonical order.
    pub const ALL: [Self; 6] = [Self::U8, Self::U16, Self::U32, Self::S8, Self::S16, Self::S32];

    /// Access width of this view kind.
    #[must_use]
    pub const fn width(self) -> AccessWidth {
        match self {
            Self::U8 | Self::S8 => AccessWidth::Byte,
            Self::U16 | Self::S16 => AccessWidth::Half,
            Self::U32 | Self::S32 => AccessWidth::Word,
        }
    }

    /// Signedness of this view kind.
    #[must_use]
    pub const fn signedness(self) -> Signedness {
        match self {
            Self::U8 | Self::U16 | Self::U32 => Signedness::Unsigned,
            Self::S8 | Self::S16 | Self::S32 => Signedness::Signed,
        }
    }

    /// Parses the short view name used on command lines (`u8`, `s16`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "u8" => Some(Self::U8),
            "u16" => Some(Self::U16),
            "u32" => Some(Self::U32),
            "s8" | "i8" => Some(Self::S8),
            "s16" | "i16" => Some(Self::S16),
            "s32" | "i32" => Some(Self::S32),
            _ => None,
        }
    }

    /// Index of this kind within [`ViewKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessWidth, Signedness, ViewKind};
    use crate::MemoryFault;

    #[test]
    fn width_masks_match_byte_counts() {
        for width in AccessWidth::ALL {
            let expected = (1_u64 << (8 * u64::from(width.bytes()))) - 1;
            assert_eq!(u64::from(width.mask()), expected);
            assert_eq!(AccessWidth::from_bytes(u32::from(width.bytes())), Some(width));
        }
        assert_eq!(AccessWidth::from_bytes(3), None);
        assert_eq!(AccessWidth::from_bytes(0), None);
    }

    #[test]
    fn signedness_tokens_are_recognized() {
        assert_eq!(Signedness::parse("u"), Ok(Signedness::Unsigned));
        assert_eq!(Signedness::parse("unsigned"), Ok(Signedness::Unsigned));
        assert_eq!(Signedness::parse("i"), Ok(Signedness::Signed));
        assert_eq!(Signedness::parse("s"), Ok(Signedness::Signed));
        assert_eq!(Signedness::parse("signed"), Ok(Signedness::Signed));
        assert_eq!(
            Signedness::parse("bogus"),
            Err(MemoryFault::InvalidSignedness {
                token: "bogus".into()
            })
        );
    }

    #[test]
    fn signed_interpretation_sign_extends() {
        assert_eq!(Signedness::Signed.interpret(AccessWidth::Byte, 0xFF), -1);
        assert_eq!(Signedness::Unsigned.interpret(AccessWidth::Byte, 0xFF), 255);
        assert_eq!(Signedness::Signed.interpret(AccessWidth::Half, 0x8000), -32768);
        assert_eq!(
            Signedness::Signed.interpret(AccessWidth::Word, 0xFFFF_FFFE),
            -2
        );
        assert_eq!(
            Signedness::Unsigned.interpret(AccessWidth::Word, 0xFFFF_FFFE),
            0xFFFF_FFFE
        );
    }

    #[test]
    fn fits_accepts_signed_and_unsigned_ranges() {
        assert!(AccessWidth::Byte.fits(255));
        assert!(AccessWidth::Byte.fits(-128));
        assert!(!AccessWidth::Byte.fits(256));
        assert!(!AccessWidth::Byte.fits(-129));
        assert!(AccessWidth::Word.fits(i64::from(u32::MAX)));
        assert!(!AccessWidth::Word.fits(i64::from(u32::MAX) + 1));
    }

    #[test]
    fn truncate_wraps_negative_values() {
        assert_eq!(AccessWidth::Byte.truncate(-1), 0xFF);
        assert_eq!(AccessWidth::Half.truncate(0x1_2345), 0x2345);
        assert_eq!(AccessWidth::Word.truncate(-2), 0xFFFF_FFFE);
    }

    #[test]
    fn view_kinds_cover_every_pair_once() {
        for (index, kind) in ViewKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), index);
            let twins = ViewKind::ALL
                .iter()
                .filter(|other| {
                    other.width() == kind.width() && other.signedness() == kind.signedness()
                })
                .count();
            assert_eq!(twins, 1);
        }
        assert_eq!(ViewKind::from_name("s16"), Some(ViewKind::S16));
        assert_eq!(ViewKind::from_name("u64"), None);
    }
}
