//! Message framing and recognition.
//!
//! Each device accepts a few message variants that differ in header
//! bytes, patch number handling and length. A [`Framing`] describes one.

use log::debug;

use crate::error::FormatError;

/// Kind of patch message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Store into patch memory at an explicit number.
    Write,
    /// Send to working memory; no number is carried.
    Upload,
    /// Dump sent by the unit.
    Received,
    /// Program dump with bank and number.
    Program,
    /// Current edit buffer.
    EditBuffer,
    /// Single patch dump.
    Single,
    /// Bulk dump of several patches.
    Bank,
}

/// Where the patch number lives in a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PatchNumber {
    Absent,
    At(usize),
    /// The byte always holds `value` and the patch number reads as 0.
    Sentinel { position: usize, value: u8 },
}

/// Header, number and trailer layout of one message variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framing {
    pub variant: Variant,
    pub header: &'static [u8],
    /// Header positions not checked on recognition.
    pub wildcards: &'static [usize],
    pub number: PatchNumber,
    pub bank: Option<usize>,
    pub payload_offset: usize,
    /// Length of the payload as transmitted (after any packing).
    pub payload_len: usize,
    pub trailer: &'static [u8],
    /// Whether messages of this variant can be emitted.
    pub emits: bool,
}

impl Framing {
    /// Total message length.
    pub fn length(&self) -> usize {
        self.payload_offset + self.payload_len + self.trailer.len()
    }

    /// Checks length, header and sentinel. Never panics on short input.
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() != self.length() {
            return false;
        }

        let header_ok = self.header.iter().enumerate()
            .all(|(i, b)| self.wildcards.contains(&i) || data[i] == *b);

        let sentinel_ok = match self.number {
            PatchNumber::Sentinel { position, value } => data[position] == value,
            _ => true,
        };

        header_ok && sentinel_ok
    }

    /// The transmitted payload of a matching message.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_offset..self.payload_offset + self.payload_len]
    }

    /// Wraps a payload into a complete message.
    pub fn frame(&self, payload: &[u8], number: u8, bank: u8) -> Result<Vec<u8>, FormatError> {
        if payload.len() != self.payload_len {
            return Err(FormatError::PayloadLength { expected: self.payload_len, actual: payload.len() });
        }

        let mut data = vec![0u8; self.length()];
        data[..self.header.len()].copy_from_slice(self.header);
        match self.number {
            PatchNumber::At(position) => data[position] = number & 0x7f,
            PatchNumber::Sentinel { position, value } => data[position] = value,
            PatchNumber::Absent => {},
        }
        if let Some(position) = self.bank {
            data[position] = bank & 0x7f;
        }
        data[self.payload_offset..self.payload_offset + self.payload_len].copy_from_slice(payload);
        let trailer_start = data.len() - self.trailer.len();
        data[trailer_start..].copy_from_slice(self.trailer);

        Ok(data)
    }
}

/// Finds the first framing that matches the message.
pub fn classify<'a>(framings: &'a [Framing], data: &[u8]) -> Option<&'a Framing> {
    let found = framings.iter().find(|f| f.matches(data));
    if let Some(f) = found {
        debug!("{} bytes classified as {:?}", data.len(), f.variant);
    }
    found
}
