//! Errors and diagnostics.

use std::fmt;
use thiserror::Error;

use crate::framing::Variant;

/// Problem with the basic framing of a System Exclusive message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SystemExclusiveError {
    #[error("message is too short ({length} bytes)")]
    TooShort { length: usize },

    #[error("message does not start with F0 (found {found:02X})")]
    MissingInitiator { found: u8 },

    #[error("message does not end with F7 (found {found:02X})")]
    MissingTerminator { found: u8 },
}

/// Failure at the codec boundary. Anything past a successful
/// classification is reported as a [`Diagnostic`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{length} bytes is not a {device} message")]
    Unrecognized { device: &'static str, length: usize },

    #[error("{device} does not support {variant:?} messages")]
    UnsupportedVariant { device: &'static str, variant: Variant },

    #[error("payload should be {expected} bytes, got {actual}")]
    PayloadLength { expected: usize, actual: usize },

    #[error("bank slot {slot} is out of range (0..{count})")]
    BankSlot { slot: usize, count: usize },
}

/// Recoverable event noticed while encoding or decoding a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Raw byte not found in the field's value table; index 0 used instead.
    FieldDecodeFallback { device: &'static str, field: String, offset: usize, raw: u8 },

    /// Value outside the field's range was replaced.
    RangeClamp { field: String, value: i32, clamped: i32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::FieldDecodeFallback { device, field, offset, raw } => {
                write!(f, "{}: invalid value {:02X} for '{}' at offset {}, using 0", device, raw, field, offset)
            },
            Diagnostic::RangeClamp { field, value, clamped } => {
                write!(f, "'{}' = {} out of range, using {}", field, value, clamped)
            },
        }
    }
}
