//! Value tables mapping editor indices to device codes.
//!
//! Device codes are often not 0..N. One array serves both directions:
//! encoding indexes into it, decoding scans it.

/// Ordered table of raw device codes for one kind of field.
#[derive(Debug, PartialEq, Eq)]
pub struct ValueMap {
    name: &'static str,
    codes: &'static [u8],
    aliases: &'static [(u8, usize)],
}

impl ValueMap {
    pub const fn new(name: &'static str, codes: &'static [u8]) -> Self {
        ValueMap { name, codes, aliases: &[] }
    }

    /// Creates a table that also accepts extra raw codes on decode.
    /// Aliases are never produced by `encode`.
    pub const fn with_aliases(name: &'static str, codes: &'static [u8], aliases: &'static [(u8, usize)]) -> Self {
        ValueMap { name, codes, aliases }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Gets the raw code for an index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid position in the table.
    pub fn encode(&self, index: usize) -> u8 {
        assert!(index < self.codes.len(), "index {} out of range for table {}", index, self.name);
        self.codes[index]
    }

    /// Finds the index of a raw code, or `None` if the device sent
    /// something the table does not know.
    pub fn position(&self, raw: u8) -> Option<usize> {
        self.codes.iter().position(|&c| c == raw)
            .or_else(|| self.aliases.iter().find(|(c, _)| *c == raw).map(|(_, i)| *i))
    }

    /// Gets the index of a raw code, falling back to 0 for unknown codes.
    pub fn decode(&self, raw: u8) -> usize {
        self.position(raw).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PORTS: ValueMap = ValueMap::new("ports", &[0x00, 0x20, 0x41, 0x42, 0x50, 0x40]);
    static PANS: ValueMap = ValueMap::with_aliases("pans", &[0, 1, 2, 3], &[(15, 2)]);

    #[test]
    fn every_index_survives() {
        for i in 0..PORTS.len() {
            assert_eq!(PORTS.decode(PORTS.encode(i)), i);
        }
    }

    #[test]
    fn unknown_code_decodes_to_zero() {
        assert_eq!(PORTS.position(0x7e), None);
        assert_eq!(PORTS.decode(0x7e), 0);
    }

    #[test]
    fn alias_decodes_but_is_not_emitted() {
        assert_eq!(PANS.decode(15), 2);
        assert_eq!(PANS.encode(2), 2);
    }

    #[test]
    #[should_panic]
    fn encode_past_end_panics() {
        PORTS.encode(PORTS.len());
    }
}
