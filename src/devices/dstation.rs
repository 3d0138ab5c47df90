//! Novation D-Station drum machine.
//!
//! Every data byte is sent as two nybble bytes, so data byte `k` lives at
//! payload offsets `2k` and `2k + 1`. Most drum bytes pack a velocity
//! switch in bit 7 over a 7-bit value.

use bit::BitIndex;
use lazy_static::lazy_static;
use log::debug;

use crate::Manufacturer;
use crate::codec::{self, Report};
use crate::device::{DeviceSpec, Packing};
use crate::error::FormatError;
use crate::framing::{Framing, PatchNumber, Variant};
use crate::layout::{FieldDescriptor, Layout};
use crate::mapper::ValueMap;
use crate::model::Model;
use crate::packing::denybblify;

/// Data bytes in a single patch.
pub const PATCH_SIZE: usize = 140;

/// Data bytes per patch inside a bank dump.
pub const SLOT_SIZE: usize = 136;

/// Patches held by a bank dump.
pub const BANK_SLOTS: usize = 15;

const BANK_OFFSET: usize = 7;

pub static FRAMINGS: [Framing; 2] = [
    Framing {
        variant: Variant::Single,
        header: &[0xf0, 0x00, 0x20, 0x29, 0x02, 0x01, 0x22],
        wildcards: &[],
        number: PatchNumber::Absent,
        bank: None,
        payload_offset: 7,
        payload_len: PATCH_SIZE * 2,
        trailer: &[0xf7],
        emits: true,
    },
    Framing {
        variant: Variant::Bank,
        header: &[0xf0, 0x00, 0x20, 0x29, 0x02, 0x01, 0x11],
        wildcards: &[],
        number: PatchNumber::Absent,
        bank: None,
        payload_offset: BANK_OFFSET,
        payload_len: 4096,
        trailer: &[0xf7],
        emits: false,
    },
];

/// Pan positions L4..R4 followed by the six individual outputs. The unit
/// also sends 15, which means the same as output 4.
pub static PANS: ValueMap = ValueMap::with_aliases("pans",
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14],
    &[(15, 13)]);

/// Instruments in the order they are stored, with their byte counts.
pub const DRUMS: [(&str, usize); 27] = [
    ("909BD", 6), ("909RS", 4), ("909SD", 6), ("909CP", 4), ("909LT", 5), ("909MT", 5),
    ("909CH", 5), ("909HT", 5), ("909CC", 5), ("909RC", 5), ("909OH", 5),
    ("808BD", 6), ("808RS", 4), ("808CP", 4), ("808SD", 6), ("808CH", 5), ("808LT", 5),
    ("808OH", 5), ("808MT", 5), ("808CC", 5), ("808HT", 5), ("808CB", 4), ("808HC", 4),
    ("808MC", 4), ("808LC", 4), ("808MA", 4), ("808CL", 4),
];

/// Data byte count of the drum section.
pub const DRUMS_SIZE: usize = 129;

/// A velocity switch in bit 7 with a 7-bit value below it.
fn velocity_byte(layout: &mut Layout, index: usize, drum: &str, param: &str, default: i32) {
    let at = index * 2;
    layout.push(FieldDescriptor::nibbles(&format!("{}{}velocity", drum, param), at, 0, 1).bits(7, 1));
    layout.push(FieldDescriptor::nibbles(&format!("{}{}", drum, param), at, 0, 127).bits(0, 7).default(default));
}

/// Pushes the descriptors of one drum starting at data byte `index`.
/// Returns the index of the next drum.
fn drum(layout: &mut Layout, mut index: usize, name: &str, bytes: usize) -> usize {
    // The 808 cowbell has no tune byte but keeps a tone byte after level.
    let cowbell = name == "808CC";

    if !cowbell {
        velocity_byte(layout, index, name, "tune", 64);
        index += 1;
    }
    velocity_byte(layout, index, name, "level", 0);
    index += 1;
    if cowbell || bytes == 6 {
        velocity_byte(layout, index, name, "tone", 0);
        index += 1;
    }
    if bytes >= 5 {
        velocity_byte(layout, index, name, "decay", 0);
        index += 1;
    }

    let at = index * 2;
    layout.push(FieldDescriptor::nibbles(&format!("{}noteoff", name), at, 0, 1).bits(7, 1));
    layout.push(FieldDescriptor::nibbles(&format!("{}frontcut", name), at, 0, 99).bits(0, 7));
    index += 1;

    // Distortion is the high nybble, pan the low one. The low nybble byte
    // is addressed on its own so the pan table applies to it.
    let at = index * 2;
    layout.push(FieldDescriptor::nibbles(&format!("{}distortion", name), at, 0, 15).bits(4, 4));
    layout.push(FieldDescriptor::table(&format!("{}pan", name), at + 1, &PANS).bits(0, 4).default(4));
    index + 1
}

fn drums(layout: &mut Layout) {
    let end = DRUMS.iter().fold(0, |index, (name, bytes)| drum(layout, index, name, *bytes));
    debug_assert_eq!(end, DRUMS_SIZE);
}

/// Layout of a single patch.
pub fn layout() -> Layout {
    let mut layout = Layout::new("D-Station", PATCH_SIZE * 2);
    drums(&mut layout);

    let last = DRUMS.len() as i32 - 1;
    for (i, bank) in ["banka", "bankb", "bankc", "bankd"].iter().enumerate() {
        layout.push(FieldDescriptor::nibbles(bank, (DRUMS_SIZE + i) * 2, 0, last));
    }
    // Six unknown bytes follow the bank assignments.
    layout.push(FieldDescriptor::nibbles("gmset", (DRUMS_SIZE + 10) * 2, 0, 1));
    layout
}

fn slot_layout() -> Layout {
    let mut layout = Layout::new("D-Station", SLOT_SIZE * 2);
    drums(&mut layout);
    layout
}

lazy_static! {
    pub static ref SPEC: DeviceSpec = DeviceSpec {
        name: "D-Station",
        manufacturer: Manufacturer::Extended([0x00, 0x20, 0x29]),
        framings: &FRAMINGS,
        packing: Packing::Raw,
        layout: layout(),
    };

    static ref SLOT: Layout = slot_layout();
}

/// Loads one patch of a bank dump into the model. Bank dumps pack the
/// bank assignments into bit fields and store the drum set as a flag.
pub fn parse_bank_slot(data: &[u8], slot: usize, model: &mut Model, report: &mut Report) -> Result<(), FormatError> {
    if slot >= BANK_SLOTS {
        return Err(FormatError::BankSlot { slot, count: BANK_SLOTS });
    }
    let framing = &FRAMINGS[1];
    if !framing.matches(data) {
        return Err(FormatError::Unrecognized { device: SPEC.name, length: data.len() });
    }

    let start = BANK_OFFSET + slot * SLOT_SIZE * 2;
    let nybbles = &data[start..start + SLOT_SIZE * 2];
    debug!("D-Station: parsing bank slot {} at offset {}", slot, start);
    codec::parse(&SLOT, nybbles, model, report);

    let d = denybblify(&nybbles[DRUMS_SIZE * 2..]);
    let mut banks = [0u8; 4];
    banks[0] = d[0].bit_range(0..5);
    banks[1].set_bit_range(0..3, d[0].bit_range(5..8)).set_bit_range(3..5, d[1].bit_range(0..2));
    banks[2].set_bit_range(2..5, d[1].bit_range(0..3));
    banks[3].set_bit(0, d[1].bit(7)).set_bit_range(1..5, d[3].bit_range(4..8));
    for (key, raw) in ["banka", "bankb", "bankc", "bankd"].iter().zip(banks) {
        let value = SPEC.layout.field(key).map_or(raw as i32, |f| f.recover(raw as i32));
        model.set(key, value);
    }
    model.set("gmset", if d[6] == 0 { 0 } else { 1 });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    fn bank_with(slot: usize, data_bytes: &[(usize, u8)]) -> Vec<u8> {
        let mut bank = vec![0u8; FRAMINGS[1].length()];
        bank[..7].copy_from_slice(FRAMINGS[1].header);
        *bank.last_mut().unwrap() = 0xf7;
        for &(k, b) in data_bytes {
            let at = BANK_OFFSET + slot * SLOT_SIZE * 2 + k * 2;
            bank[at] = b >> 4;
            bank[at + 1] = b & 0x0f;
        }
        bank
    }

    #[test]
    fn drum_section_size() {
        assert_eq!(DRUMS.iter().map(|(_, n)| n).sum::<usize>(), DRUMS_SIZE);
        assert_eq!(FRAMINGS[0].length(), 288);
        assert_eq!(FRAMINGS[1].length(), 4104);
    }

    #[test]
    fn velocity_and_value_share_a_byte() {
        let mut model = Device::DStation.init_model();
        model.set("909BDtunevelocity", 1);
        model.set("909BDtune", 0x25);
        model.set("909BDdistortion", 0x0a);
        model.set("909BDpan", 7);
        let data = Device::DStation.emit(&model, Variant::Single).unwrap();
        assert_eq!(&data[7..9], &[0x0a, 0x05]);
        // Sixth byte of the bass drum
        assert_eq!(&data[17..19], &[0x0a, 0x07]);
    }

    #[test]
    fn cowbell_has_tone_but_no_tune() {
        let layout = layout();
        assert!(layout.field("808CCtune").is_none());
        let level = layout.field("808CClevel").unwrap().offset;
        assert_eq!(layout.field("808CCtone").unwrap().offset, level + 2);
        assert!(layout.field("808RSdecay").is_none());
    }

    #[test]
    fn pan_fifteen_reads_as_output_four() {
        let mut model = Device::DStation.init_model();
        let mut data = Device::DStation.emit(&model, Variant::Single).unwrap();
        data[18] = 0x0f;
        let report = Device::DStation.parse(&data, &mut model).unwrap();
        assert!(report.is_clean());
        assert_eq!(model.get("909BDpan"), 13);
    }

    #[test]
    fn single_round_trip() {
        let mut model = Device::DStation.init_model();
        model.set("808CCtone", 99);
        model.set("808CClevelvelocity", 1);
        model.set("808CLfrontcut", 42);
        model.set("bankc", 26);
        model.set("gmset", 1);
        let data = Device::DStation.emit(&model, Variant::Single).unwrap();

        let mut parsed = Model::new();
        let report = Device::DStation.parse(&data, &mut parsed).unwrap();
        assert_eq!(report.variant, Some(Variant::Single));
        for key in ["808CCtone", "808CClevelvelocity", "808CLfrontcut", "bankc", "gmset", "909BDtune"] {
            assert_eq!(parsed.get(key), model.get(key), "{}", key);
        }
    }

    #[test]
    fn bank_slot_bit_fields() {
        let bank = bank_with(2, &[
            (0, 0x8a),
            (DRUMS_SIZE, 0b101_00011),
            (DRUMS_SIZE + 1, 0b1000_0110),
            (DRUMS_SIZE + 3, 0x50),
            (DRUMS_SIZE + 6, 0x04),
        ]);
        let mut model = Model::new();
        let mut report = Report::new(Variant::Bank);
        parse_bank_slot(&bank, 2, &mut model, &mut report).unwrap();
        assert_eq!(model.get("909BDtunevelocity"), 1);
        assert_eq!(model.get("909BDtune"), 0x0a);
        assert_eq!(model.get("banka"), 3);
        assert_eq!(model.get("bankb"), 0b10_101);
        assert_eq!(model.get("bankc"), 0b11000);
        assert_eq!(model.get("bankd"), 11);
        assert_eq!(model.get("gmset"), 1);
    }

    #[test]
    fn bank_slot_out_of_range() {
        let bank = bank_with(0, &[]);
        let mut model = Model::new();
        let mut report = Report::new(Variant::Bank);
        assert_eq!(parse_bank_slot(&bank, BANK_SLOTS, &mut model, &mut report),
            Err(FormatError::BankSlot { slot: 15, count: 15 }));
        assert!(parse_bank_slot(&bank[..100], 0, &mut model, &mut report).is_err());
    }

    #[test]
    fn bank_dump_parses_first_slot() {
        let bank = bank_with(0, &[(1, 0x7f)]);
        let mut model = Model::new();
        let report = Device::DStation.parse(&bank, &mut model).unwrap();
        assert_eq!(report.variant, Some(Variant::Bank));
        assert_eq!(model.get("909BDlevel"), 127);
    }
}
