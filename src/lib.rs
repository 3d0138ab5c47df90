//! # syxpatch
//!
//! `syxpatch` converts synthesizer patches between a flat parameter model
//! and the System Exclusive messages the devices send and accept.
//!
//! Each device is described by data: message framings, a payload packing
//! and a layout table listing where each parameter lives. One codec engine
//! walks the table in both directions.
//!
//! ```no_run
//! use syxpatch::Variant;
//!
//! let data = syxpatch::read_file("patch.syx").unwrap();
//! if let Some((device, variant)) = syxpatch::identify(&data) {
//!     let mut model = device.init_model();
//!     let report = device.parse(&data, &mut model).unwrap();
//!     println!("{:?} {:?}: {} diagnostics", device, variant, report.diagnostics.len());
//!     let _ = device.emit(&model, Variant::Write);
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use lazy_static::lazy_static;

pub mod codec;
pub mod device;
pub mod devices;
pub mod error;
pub mod framing;
pub mod layout;
pub mod mapper;
pub mod model;
pub mod packing;

pub use crate::codec::Report;
pub use crate::device::{identify, Device, SlLayout};
pub use crate::error::{Diagnostic, FormatError, SystemExclusiveError};
pub use crate::framing::Variant;
pub use crate::model::{Model, Value};

/// Manufacturer specific SysEx message initiator.
pub const INITIATOR: u8 = 0xf0;

/// Manufacturer specific SysEx message terminator.
pub const TERMINATOR: u8 = 0xf7;

/// Development/non-commercial SysEx manufacturer ID.
pub const DEVELOPMENT: u8 = 0x7d;

/// Universal non-real-time SysEx message indicator.
pub const NON_REAL_TIME: u8 = 0x7e;

/// Universal real-time SysEx message indicator.
pub const REAL_TIME: u8 = 0x7f;

/// MIDI manufacturer. The ID is either a single byte for standard IDs,
/// three bytes for extended IDs, or Development (non-commercial).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Manufacturer {
    Standard(u8),
    Extended([u8; 3]),
    Development,
}

impl Manufacturer {
    /// Creates a new manufacturer from the ID bytes following the initiator.
    pub fn new(data: &[u8]) -> Result<Self, SystemExclusiveError> {
        match data {
            [] => Err(SystemExclusiveError::TooShort { length: 0 }),
            [DEVELOPMENT, ..] => Ok(Manufacturer::Development),
            [0x00, b1, b2, ..] => Ok(Manufacturer::Extended([0x00, *b1, *b2])),
            [0x00, ..] => Err(SystemExclusiveError::TooShort { length: data.len() }),
            [b, ..] => Ok(Manufacturer::Standard(*b)),
        }
    }

    /// Gets the manufacturer System Exclusive bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Manufacturer::Development => vec![DEVELOPMENT],
            Manufacturer::Standard(b) => vec![*b],
            Manufacturer::Extended(bs) => bs.to_vec(),
        }
    }

    /// Gets the manufacturer SysEx bytes as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes()).to_uppercase()
    }

    /// Gets the name of this manufacturer.
    pub fn name(&self) -> String {
        if *self == Manufacturer::Development {
            return "Development / Non-commercial".to_string()
        }

        let hex_id = self.to_hex();
        if let Some(n) = MANUFACTURER_NAMES.get(&*hex_id) {
            n.to_string()
        }
        else {
            "Unknown manufacturer".to_string()
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The kind of a Universal System Exclusive message.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UniversalKind {
    NonRealTime,
    RealTime,
}

/// A MIDI System Exclusive message.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Message {
    Universal { kind: UniversalKind, sub_id1: u8, sub_id2: u8, payload: Vec<u8> },
    ManufacturerSpecific { manufacturer: Manufacturer, payload: Vec<u8> },
}

/// Returns the number of System Exclusive messages in the data,
/// based on the count of terminator bytes.
pub fn message_count(data: &[u8]) -> usize {
    data.iter().filter(|&n| *n == TERMINATOR).count()
}

/// Splits the data by the terminator byte, including it.
pub fn split_messages(data: &[u8]) -> Vec<Vec<u8>> {
    data.split_inclusive(|&n| n == TERMINATOR)
        .map(|part| part.to_vec())
        .collect()
}

/// Reads a file of one or more messages.
pub fn read_file<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

impl Message {
    /// Creates a new SysEx message from complete message bytes.
    pub fn new(data: &[u8]) -> Result<Self, SystemExclusiveError> {
        if data.len() < 3 {
            return Err(SystemExclusiveError::TooShort { length: data.len() });
        }
        if data[0] != INITIATOR {
            return Err(SystemExclusiveError::MissingInitiator { found: data[0] });
        }
        let last_byte_index = data.len() - 1;
        if data[last_byte_index] != TERMINATOR {
            return Err(SystemExclusiveError::MissingTerminator { found: data[last_byte_index] });
        }

        let body = &data[1..last_byte_index];
        let universal = |kind| {
            if body.len() < 3 {
                return Err(SystemExclusiveError::TooShort { length: data.len() });
            }
            Ok(Message::Universal { kind, sub_id1: body[1], sub_id2: body[2], payload: body[3..].to_vec() })
        };

        match body[0] {
            NON_REAL_TIME => universal(UniversalKind::NonRealTime),
            REAL_TIME => universal(UniversalKind::RealTime),
            _ => {
                let manufacturer = Manufacturer::new(body)
                    .map_err(|_| SystemExclusiveError::TooShort { length: data.len() })?;
                let id_length = manufacturer.to_bytes().len();
                Ok(Message::ManufacturerSpecific { manufacturer, payload: body[id_length..].to_vec() })
            },
        }
    }

    /// Converts the message into bytes for MIDI messaging.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::<u8>::new();

        match self {
            Message::Universal { kind, sub_id1, sub_id2, payload } => {
                result.push(INITIATOR);
                result.push(match kind {
                    UniversalKind::NonRealTime => NON_REAL_TIME,
                    UniversalKind::RealTime => REAL_TIME,
                });
                result.push(*sub_id1);
                result.push(*sub_id2);
                result.extend(payload);
                result.push(TERMINATOR);
            },
            Message::ManufacturerSpecific { manufacturer, payload } => {
                result.push(INITIATOR);
                result.extend(manufacturer.to_bytes());
                result.extend(payload);
                result.push(TERMINATOR);
            }
        }

        result
    }

    pub fn manufacturer(&self) -> Option<Manufacturer> {
        match self {
            Message::ManufacturerSpecific { manufacturer, .. } => Some(*manufacturer),
            Message::Universal { .. } => None,
        }
    }

    /// MD5 digest of the message bytes as a hex string.
    pub fn digest(&self) -> String {
        format!("{:x}", md5::compute(self.to_bytes()))
    }
}

lazy_static! {
    static ref MANUFACTURER_NAMES: HashMap<&'static str, &'static str> = {
        HashMap::from([
            ("01", "Sequential Circuits"),
            ("04", "Moog Music"),
            ("06", "Lexicon Inc."),
            ("07", "Kurzweil / Young Chang"),
            ("0F", "Ensoniq"),
            ("10", "Oberheim / Gibson Labs"),
            ("18", "E-mu"),
            ("33", "Clavia Digital Instruments"),
            ("3E", "Waldorf Electronics GmbH"),

            ("00000E", "Alesis Studio Electronics"),
            ("002029", "Focusrite/Novation"),
            ("00202D", "Dave Smith Instruments"),

            ("40", "Kawai Musical Instruments MFG. CO. Ltd"),
            ("41", "Roland Corporation"),
            ("42", "Korg Inc."),
            ("43", "Yamaha"),
            ("44", "Casio Computer Co. Ltd"),
            ("47", "Akai Electric Co. Ltd."),
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_manufacturer_standard() {
        let data = vec![0xF0, 0x40, 0x00, 0x20, 0x00, 0x04, 0x00, 0x3F, 0xF7];
        let message = Message::new(&data).unwrap();
        if let Message::ManufacturerSpecific { manufacturer, payload } = message {
            assert_eq!(manufacturer, Manufacturer::Standard(0x40));
            assert_eq!(payload.len(), 6);
        }
        else {
            panic!("Expected a manufacturer-specific message with standard identifier");
        }
    }

    #[test]
    fn new_message_manufacturer_extended() {
        let data = vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x01, 0x22, 0xF7];
        let message = Message::new(&data).unwrap();
        assert_eq!(message.manufacturer(), Some(Manufacturer::Extended([0x00, 0x20, 0x29])));
        assert_eq!(message.to_bytes(), data);
    }

    #[test]
    fn new_message_universal() {
        let data = vec![0xF0, 0x7E, 0x00, 0x06, 0x01, 0xF7];
        let message = Message::new(&data).unwrap();
        assert_eq!(message, Message::Universal {
            kind: UniversalKind::NonRealTime, sub_id1: 0x00, sub_id2: 0x06, payload: vec![0x01],
        });
        assert_eq!(message.manufacturer(), None);
    }

    #[test]
    fn malformed_messages() {
        assert_eq!(Message::new(&[0xF0, 0xF7]), Err(SystemExclusiveError::TooShort { length: 2 }));
        assert_eq!(Message::new(&[0x90, 0x40, 0xF7]), Err(SystemExclusiveError::MissingInitiator { found: 0x90 }));
        assert_eq!(Message::new(&[0xF0, 0x40, 0x00]), Err(SystemExclusiveError::MissingTerminator { found: 0x00 }));
        assert_eq!(Message::new(&[0xF0, 0x00, 0x20, 0xF7]), Err(SystemExclusiveError::TooShort { length: 4 }));
        assert_eq!(Message::new(&[0xF0, 0x7F, 0x00, 0xF7]), Err(SystemExclusiveError::TooShort { length: 4 }));
    }

    #[test]
    fn manufacturer_message() {
        let message = Message::ManufacturerSpecific {
            manufacturer: Manufacturer::Standard(0x01),  // Sequential
            payload: vec![
                0x23, // Prophet '08
                0x03, // edit buffer dump
            ],
        };
        let message_bytes = message.to_bytes();
        assert_eq!(message_bytes, vec![0xF0, 0x01, 0x23, 0x03, 0xF7]);
    }

    #[test]
    fn development_manufacturer() {
        let message = Message::ManufacturerSpecific {
            manufacturer: Manufacturer::Development,
            payload: vec![],
        };
        assert_eq!(message.to_bytes(), vec![0xF0, 0x7D, 0xF7]);
        assert_eq!(Manufacturer::Development.name(), "Development / Non-commercial");
    }

    #[test]
    fn manufacturer_display_name() {
        assert_eq!(format!("{}", Manufacturer::Standard(0x43)), "Yamaha");
        assert_eq!(format!("{}", Manufacturer::Extended([0x00, 0x20, 0x29])), "Focusrite/Novation");
        assert_eq!(Manufacturer::Standard(0x7c).name(), "Unknown manufacturer");
        assert_eq!(Manufacturer::Extended([0x00, 0x20, 0x29]).to_hex(), "002029");
    }

    #[test]
    fn split_and_count() {
        let data = vec![0xF0, 0x43, 0xF7, 0xF0, 0x7D, 0x01, 0xF7];
        assert_eq!(message_count(&data), 2);
        let parts = split_messages(&data);
        assert_eq!(parts, vec![vec![0xF0, 0x43, 0xF7], vec![0xF0, 0x7D, 0x01, 0xF7]]);
    }

    #[test]
    fn digest_is_stable() {
        let message = Message::new(&[0xF0, 0x43, 0xF7]).unwrap();
        assert_eq!(message.digest().len(), 32);
        assert_eq!(message.digest(), Message::new(&[0xF0, 0x43, 0xF7]).unwrap().digest());
    }
}
