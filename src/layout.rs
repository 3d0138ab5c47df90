//! Layout descriptor tables.
//!
//! A [`Layout`] lists, in emit/parse order, where every parameter of a
//! patch lives in the (unpacked) payload and how it is encoded.
//! Several descriptors may share a byte when they select disjoint bits,
//! when they are overlays chosen by a mode field (see [`Guard`]), or when
//! one only ever reads and the other only ever writes.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use bit::BitIndex;

use crate::mapper::ValueMap;

/// How the value of a field is stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Raw byte (or bits of it) is the value.
    Direct,
    /// Value is an index into a table of device codes.
    TableMapped(&'static ValueMap),
    /// Byte stored as two bytes, high nybble first.
    NibblePair,
    /// 14-bit value stored as two 7-bit bytes, MSB first.
    Split16,
    /// Fixed-width ASCII text.
    Text(usize),
    /// Byte the device expects but which carries no parameter. Emit only.
    Constant(u8),
}

impl Encoding {
    /// Number of payload bytes taken by the field.
    pub fn width(&self) -> usize {
        match self {
            Encoding::NibblePair | Encoding::Split16 => 2,
            Encoding::Text(width) => *width,
            _ => 1,
        }
    }
}

/// Bit range of a field within its container byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bits {
    pub range: Range<usize>,
}

impl Bits {
    pub const BYTE: Bits = Bits { range: 0..8 };

    pub fn new(shift: u8, width: u8) -> Self {
        assert!(width > 0 && shift + width <= 8);
        let start = shift as usize;
        Bits { range: start..start + width as usize }
    }

    pub fn width(&self) -> usize {
        self.range.end - self.range.start
    }

    /// Largest raw value the bits can hold.
    pub fn max(&self) -> u32 {
        u8::MAX.bit_range(0..self.width()) as u32
    }

    pub fn mask(&self) -> u8 {
        let mut mask = 0u8;
        mask.set_bit_range(self.range.clone(), self.max() as u8);
        mask
    }

    pub fn extract(&self, container: u8) -> u8 {
        container.bit_range(self.range.clone())
    }

    /// Replaces the bits in `container` with the low bits of `raw`.
    pub fn insert(&self, container: u8, raw: u32) -> u8 {
        let mut container = container;
        container.set_bit_range(self.range.clone(), raw.bit_range(0..self.width()) as u8);
        container
    }
}

/// Conversion between the stored number and the model value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// value = raw + k
    Offset(i32),
    /// value = max - raw, for flags stored with the opposite sense.
    Inverted,
}

impl Transform {
    pub fn to_value(&self, raw: i32, bits: &Bits) -> i32 {
        match self {
            Transform::Identity => raw,
            Transform::Offset(k) => raw + k,
            Transform::Inverted => bits.max() as i32 - raw,
        }
    }

    pub fn to_raw(&self, value: i32, bits: &Bits) -> i32 {
        match self {
            Transform::Identity => value,
            Transform::Offset(k) => value - k,
            Transform::Inverted => bits.max() as i32 - value,
        }
    }
}

/// Which directions a descriptor takes part in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// What to do with a value outside the valid range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Recovery {
    Clamp,
    Reset,
}

/// Condition on other fields that decides whether a descriptor applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Is(String, Vec<i32>),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    pub fn is(key: impl Into<String>, values: &[i32]) -> Self {
        Guard::Is(key.into(), values.to_vec())
    }

    pub fn not(guard: Guard) -> Self {
        Guard::Not(Box::new(guard))
    }

    /// Evaluates the guard with `lookup` giving the current value of a key.
    pub fn holds(&self, lookup: &dyn Fn(&str) -> i32) -> bool {
        match self {
            Guard::Is(key, values) => values.contains(&lookup(key)),
            Guard::Not(g) => !g.holds(lookup),
            Guard::All(gs) => gs.iter().all(|g| g.holds(lookup)),
            Guard::Any(gs) => gs.iter().any(|g| g.holds(lookup)),
        }
    }
}

/// One parameter (or constant byte) of a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub offset: usize,
    pub bits: Bits,
    pub encoding: Encoding,
    pub transform: Transform,
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub recovery: Recovery,
    pub access: Access,
    pub depends_on: Option<Guard>,
}

impl FieldDescriptor {
    fn with(name: &str, offset: usize, encoding: Encoding, min: i32, max: i32) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            offset,
            bits: Bits::BYTE,
            encoding,
            transform: Transform::Identity,
            min,
            max,
            default: min.max(0).min(max),
            recovery: Recovery::Clamp,
            access: Access::ReadWrite,
            depends_on: None,
        }
    }

    pub fn direct(name: &str, offset: usize, min: i32, max: i32) -> Self {
        Self::with(name, offset, Encoding::Direct, min, max)
    }

    /// Table-mapped field ranging over every index of `map`.
    pub fn table(name: &str, offset: usize, map: &'static ValueMap) -> Self {
        Self::with(name, offset, Encoding::TableMapped(map), 0, map.len() as i32 - 1)
    }

    pub fn nibbles(name: &str, offset: usize, min: i32, max: i32) -> Self {
        Self::with(name, offset, Encoding::NibblePair, min, max)
    }

    pub fn split16(name: &str, offset: usize, max: i32) -> Self {
        Self::with(name, offset, Encoding::Split16, 0, max.min(0x3fff))
    }

    pub fn text(name: &str, offset: usize, width: usize) -> Self {
        Self::with(name, offset, Encoding::Text(width), 0, 0)
    }

    pub fn constant(offset: usize, value: u8) -> Self {
        Self::with("", offset, Encoding::Constant(value), 0, 0)
    }

    pub fn bits(mut self, shift: u8, width: u8) -> Self {
        self.bits = Bits::new(shift, width);
        self
    }

    pub fn range(mut self, min: i32, max: i32) -> Self {
        self.min = min;
        self.max = max;
        self.default = self.default.clamp(min, max);
        self
    }

    pub fn default(mut self, value: i32) -> Self {
        self.default = value;
        self
    }

    pub fn offset_by(mut self, k: i32) -> Self {
        self.transform = Transform::Offset(k);
        self
    }

    pub fn inverted(mut self) -> Self {
        self.transform = Transform::Inverted;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.access = Access::WriteOnly;
        self
    }

    /// Out-of-range values go back to the default instead of the nearest bound.
    pub fn reset_when_invalid(mut self) -> Self {
        self.recovery = Recovery::Reset;
        self
    }

    pub fn when(mut self, guard: Guard) -> Self {
        self.depends_on = Some(guard);
        self
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.encoding, Encoding::Constant(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.encoding, Encoding::Text(_))
    }

    pub fn width(&self) -> usize {
        self.encoding.width()
    }

    /// Brings a value into range according to the recovery rule.
    pub fn recover(&self, value: i32) -> i32 {
        if (self.min..=self.max).contains(&value) {
            value
        }
        else {
            match self.recovery {
                Recovery::Clamp => value.clamp(self.min, self.max),
                Recovery::Reset => self.default,
            }
        }
    }
}

/// Relation between fields enforced on emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `high` is raised to `low`, then `default` is clamped to `[low, high]`.
    Ordered { low: String, high: String, default: Option<String>, when: Option<Guard> },
    /// `key` is lowered to the value of `limit`.
    AtMost { key: String, limit: String },
}

impl Constraint {
    pub fn ordered(low: &str, high: &str, default: Option<&str>, when: Option<Guard>) -> Self {
        Constraint::Ordered {
            low: low.to_string(),
            high: high.to_string(),
            default: default.map(|d| d.to_string()),
            when,
        }
    }

    pub fn at_most(key: &str, limit: &str) -> Self {
        Constraint::AtMost { key: key.to_string(), limit: limit.to_string() }
    }
}

/// Ordered descriptor table for one device payload.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
    fields: Vec<FieldDescriptor>,
    constraints: Vec<Constraint>,
}

impl Layout {
    pub fn new(name: &'static str, size: usize) -> Self {
        Layout { name, size, fields: Vec::new(), constraints: Vec::new() }
    }

    pub fn push(&mut self, field: FieldDescriptor) {
        debug_assert!(field.offset + field.width() <= self.size,
            "{}: field '{}' at {} runs past the payload", self.name, field.name, field.offset);
        if let Encoding::TableMapped(map) = field.encoding {
            debug_assert!(field.transform.to_raw(field.max, &field.bits) < map.len() as i32,
                "{}: field '{}' exceeds table {}", self.name, field.name, map.name());
        }
        self.fields.push(field);
    }

    /// Adds constant bytes starting at `offset`. Zero bytes are skipped,
    /// since payloads start out zero-filled.
    pub fn constants(&mut self, offset: usize, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            if *b != 0 {
                self.push(FieldDescriptor::constant(offset + i, *b));
            }
        }
    }

    pub fn constrain(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// First descriptor for a parameter.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Pairs of distinct parameters that share payload bytes with
    /// nothing to tell them apart.
    pub fn overlaps(&self) -> Vec<(String, String)> {
        let mut by_byte: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, f) in self.fields.iter().enumerate() {
            for offset in f.offset..f.offset + f.width() {
                by_byte.entry(offset).or_default().push(i);
            }
        }

        let mut conflicts = BTreeSet::new();
        for indices in by_byte.values() {
            for (n, &a) in indices.iter().enumerate() {
                for &b in &indices[n + 1..] {
                    let (fa, fb) = (&self.fields[a], &self.fields[b]);
                    if !excused(fa, fb) {
                        conflicts.insert((fa.name.clone(), fb.name.clone()));
                    }
                }
            }
        }
        conflicts.into_iter().collect()
    }
}

fn excused(a: &FieldDescriptor, b: &FieldDescriptor) -> bool {
    let split_bits = a.bits.mask() & b.bits.mask() == 0;
    let opposite = matches!(
        (a.access, b.access),
        (Access::ReadOnly, Access::WriteOnly) | (Access::WriteOnly, Access::ReadOnly));

    a.name == b.name
        || a.is_constant() || b.is_constant()
        || a.depends_on.is_some() || b.depends_on.is_some()
        || split_bits
        || opposite
}
