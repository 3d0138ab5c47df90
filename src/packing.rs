//! Byte packing schemes used in System Exclusive payloads.

use log::debug;
use bit::BitIndex;

/// 7-bit packing: each run of up to seven bytes is sent as a header byte
/// holding their high bits (bit i for byte i) followed by the bytes with
/// the high bit cleared.
pub trait Packed {
    fn packed(&self) -> Vec<u8>;
    fn unpacked(&self) -> Vec<u8>;
}

impl Packed for [u8] {
    /// Returns the bytes in packed format.
    fn packed(&self) -> Vec<u8> {
        let chunks = self.chunks(7);
        debug!("packing {} bytes in {} chunks", self.len(), chunks.len());

        let mut result = Vec::<u8>::with_capacity(self.len() + (self.len() + 6) / 7);
        for chunk in chunks {
            let mut index_byte = 0u8;
            for (index, b) in chunk.iter().enumerate() {
                index_byte.set_bit(index, b.bit(7));
            }
            result.push(index_byte);

            for b in chunk {
                result.push(b & 0x7f);
            }
        }

        result
    }

    /// Unpacks previously packed bytes. A final group may be shorter
    /// than eight bytes; a lone header byte yields nothing.
    fn unpacked(&self) -> Vec<u8> {
        let chunks = self.chunks(8);
        debug!("unpacking {} bytes in {} chunks", self.len(), chunks.len());

        let mut result = Vec::<u8>::with_capacity(self.len());
        for chunk in chunks {
            let index_byte = chunk[0];
            for (index, b) in chunk[1..].iter().enumerate() {
                let mut v = *b;
                v.set_bit(7, index_byte.bit(index));
                result.push(v);
            }
        }

        result
    }
}

/// Splits a byte into its high and low nybble.
pub fn nibble_pair(b: u8) -> (u8, u8) {
    ((b & 0xf0) >> 4, b & 0x0f)
}

/// Combines a high and low nybble into a byte. Stray high bits
/// in the nybble bytes are discarded.
pub fn from_nibble_pair(high: u8, low: u8) -> u8 {
    (((high as u16) << 4 | (low & 0x0f) as u16) & 0xff) as u8
}

/// Makes a new byte vector from pairs of nybble bytes, high nybble first.
/// A trailing odd byte is ignored.
pub fn denybblify(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(2)
        .map(|pair| from_nibble_pair(pair[0], pair[1]))
        .collect()
}

/// Splits a 14-bit value into two 7-bit bytes, most significant first.
pub fn split14(v: u16) -> (u8, u8) {
    (((v >> 7) & 0x7f) as u8, (v & 0x7f) as u8)
}

/// Joins two 7-bit bytes into a 14-bit value.
pub fn join14(msb: u8, lsb: u8) -> u16 {
    ((msb & 0x7f) as u16) << 7 | (lsb & 0x7f) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_short_unpacked_test() -> Vec<u8> {
        vec![101, 202, 103, 204, 105, 206, 107]
    }

    fn make_short_packed_test() -> Vec<u8> {
        vec![42, 101, 74, 103, 76, 105, 78, 107]
    }

    #[test]
    fn test_short_packed() {
        assert_eq!(make_short_unpacked_test().packed(), make_short_packed_test());
    }

    #[test]
    fn test_short_unpacked() {
        assert_eq!(make_short_packed_test().unpacked(), make_short_unpacked_test());
    }

    #[test]
    fn test_packed_lengths() {
        for length in [0usize, 1, 6, 7, 8, 13, 100] {
            let data: Vec<u8> = (0..length).map(|i| (i * 37 + 200) as u8).collect();
            let packed = data.packed();
            assert!(packed.iter().all(|b| b & 0x80 == 0), "length {}", length);
            assert_eq!(packed.unpacked(), data, "length {}", length);
        }
    }

    #[test]
    fn test_prophet_payload_size() {
        let data = vec![0xffu8; 384];
        assert_eq!(data.packed().len(), 439);
    }

    #[test]
    fn test_nibble_pair() {
        for v in 0..=255u8 {
            let (high, low) = nibble_pair(v);
            assert!(high < 16 && low < 16);
            assert_eq!(from_nibble_pair(high, low), v);
        }
    }

    #[test]
    fn test_denybblify() {
        let b = vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(denybblify(&b), vec![0x01, 0x23, 0x45]);
    }

    #[test]
    fn test_split14() {
        assert_eq!(split14(16383), (0x7f, 0x7f));
        assert_eq!(split14(128), (0x01, 0x00));
        for v in [0u16, 1, 127, 128, 8192, 16383] {
            let (msb, lsb) = split14(v);
            assert_eq!(join14(msb, lsb), v);
        }
    }
}
