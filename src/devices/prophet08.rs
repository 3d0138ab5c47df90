//! Dave Smith Instruments Prophet '08.
//!
//! A program is 384 bytes, one byte per parameter, sent packed into
//! 7-bit form. The two layers use the same parameter order at offsets
//! 0 and 200.

use lazy_static::lazy_static;

use crate::Manufacturer;
use crate::device::{DeviceSpec, Packing};
use crate::framing::{Framing, PatchNumber, Variant};
use crate::layout::{FieldDescriptor, Layout};

pub const PROGRAM_SIZE: usize = 384;

/// Length of a program after packing.
pub const PACKED_SIZE: usize = 439;

pub const LAYER_OFFSETS: [usize; 2] = [0, 200];
pub const TRACK_NOTE_OFFSETS: [usize; 2] = [120, 320];
pub const NAME_OFFSET: usize = 184;
pub const NAME_LENGTH: usize = 16;

/// Parameters per layer.
pub const LAYER_PARAMETERS: usize = 102;

/// Device ID of the Tetra, whose program dumps the Prophet '08 layout also reads.
pub const TETRA_ID: u8 = 0x26;

pub static FRAMINGS: [Framing; 4] = [
    Framing {
        variant: Variant::Program,
        header: &[0xf0, 0x01, 0x23, 0x02],
        wildcards: &[],
        number: PatchNumber::At(5),
        bank: Some(4),
        payload_offset: 6,
        payload_len: PACKED_SIZE,
        trailer: &[0xf7],
        emits: true,
    },
    Framing {
        variant: Variant::EditBuffer,
        header: &[0xf0, 0x01, 0x23, 0x03],
        wildcards: &[],
        number: PatchNumber::Absent,
        bank: None,
        payload_offset: 4,
        payload_len: PACKED_SIZE,
        trailer: &[0xf7],
        emits: true,
    },
    // Tetra dumps use the same program layout.
    Framing {
        variant: Variant::Program,
        header: &[0xf0, 0x01, TETRA_ID, 0x02],
        wildcards: &[],
        number: PatchNumber::At(5),
        bank: Some(4),
        payload_offset: 6,
        payload_len: PACKED_SIZE,
        trailer: &[0xf7],
        emits: false,
    },
    Framing {
        variant: Variant::EditBuffer,
        header: &[0xf0, 0x01, TETRA_ID, 0x03],
        wildcards: &[],
        number: PatchNumber::Absent,
        bank: None,
        payload_offset: 4,
        payload_len: PACKED_SIZE,
        trailer: &[0xf7],
        emits: false,
    },
];

const DESTINATIONS: i32 = 43;
const SOURCES: i32 = 20;

/// Bipolar amounts, centered on 127.
const AMOUNT: (i32, i32, i32) = (0, 254, 127);
const FLAG: (i32, i32, i32) = (0, 1, 0);
const SEVEN: (i32, i32, i32) = (0, 127, 0);
const DESTINATION: (i32, i32, i32) = (0, DESTINATIONS, 0);

fn layer(layout: &mut Layout, number: usize) {
    let base = LAYER_OFFSETS[number - 1];
    let mut at = base;
    let mut param = |suffix: &str, (min, max, default): (i32, i32, i32)| {
        let name = format!("layer{}{}", number, suffix);
        layout.push(FieldDescriptor::direct(&name, at, min, max).default(default));
        at += 1;
    };

    for osc in 1..=2 {
        let dco = |p: &str| format!("dco{}{}", osc, p);
        param(&dco("frequency"), (0, 120, 24));
        param(&dco("finetune"), (0, 100, 50));
        param(&dco("shape"), (0, 103, 1));
        param(&dco("glide"), SEVEN);
        param(&dco("key"), (0, 1, 1));
    }
    param("sync", FLAG);
    param("glidemode", (0, 3, 0));
    param("slop", (0, 5, 0));
    param("mix", (0, 127, 64));
    param("noise", SEVEN);

    param("vcffrequency", (0, 164, 164));
    param("vcfresonance", SEVEN);
    param("vcfkeyboardamount", SEVEN);
    param("vcfaudiomodulation", SEVEN);
    param("vcfpoles", (0, 1, 1));

    let envelope = |param: &mut dyn FnMut(&str, (i32, i32, i32)), env: usize, amount| {
        let key = |p: &str| format!("env{}{}", env, p);
        param(&key("amount"), amount);
        param(&key("velocityamount"), SEVEN);
        for stage in ["delay", "attack", "decay", "sustain", "release"] {
            param(&key(stage), SEVEN);
        }
    };

    envelope(&mut param, 1, AMOUNT);
    param("vcainitiallevel", SEVEN);
    param("vcaoutputspread", SEVEN);
    param("vcavoicevolume", (0, 127, 127));
    // The amplifier envelope is unipolar.
    envelope(&mut param, 2, (0, 127, 0));

    for lfo in 1..=4 {
        let key = |p: &str| format!("lfo{}{}", lfo, p);
        param(&key("frequency"), (0, 166, 0));
        param(&key("shape"), (0, 4, 0));
        param(&key("amount"), SEVEN);
        param(&key("moddestination"), DESTINATION);
        param(&key("keysync"), FLAG);
    }

    param("env3moddestination", DESTINATION);
    envelope(&mut param, 3, AMOUNT);

    for m in 1..=4 {
        param(&format!("mod{}source", m), (0, SOURCES, 0));
        param(&format!("mod{}amount", m), AMOUNT);
        param(&format!("mod{}destination", m), DESTINATION);
    }
    for track in 1..=4 {
        param(&format!("track{}destination", track), DESTINATION);
    }
    for controller in ["wheel", "pressure", "breath", "velocity", "foot"] {
        param(&format!("{}amount", controller), AMOUNT);
        param(&format!("{}destination", controller), DESTINATION);
    }

    param("tempo", (30, 250, 120));
    param("clockdivide", (0, 12, 2));
    param("pitchbendrange", (0, 12, 2));
    param("sequencertrigger", (0, 4, 0));
    param("unisonmode", (0, 4, 0));
    param("unisonkeymode", (0, 5, 0));
    param("arpeggiatormode", (0, 3, 0));
    param("env3repeat", FLAG);
    param("unison", FLAG);
    param("arpeggiator", FLAG);
    param("sequencer", FLAG);

    debug_assert_eq!(at, base + LAYER_PARAMETERS);
}

/// Sixteen steps for each of the four sequencer tracks. Track 1 may
/// use 127 as a rest; the others stop at 126.
fn tracks(layout: &mut Layout, number: usize) {
    let mut at = TRACK_NOTE_OFFSETS[number - 1];
    for track in 1..=4 {
        let max = if track == 1 { 127 } else { 126 };
        for step in 1..=16 {
            let name = format!("layer{}track{}note{}", number, track, step);
            layout.push(FieldDescriptor::direct(&name, at, 0, max));
            at += 1;
        }
    }
}

pub fn layout() -> Layout {
    let mut layout = Layout::new("Prophet '08", PROGRAM_SIZE);
    layer(&mut layout, 1);
    layout.push(FieldDescriptor::direct("splitpoint", 118, 0, 127).default(60));
    layout.push(FieldDescriptor::direct("keyboardmode", 119, 0, 2));
    tracks(&mut layout, 1);
    layout.push(FieldDescriptor::text("name", NAME_OFFSET, NAME_LENGTH));
    layer(&mut layout, 2);
    tracks(&mut layout, 2);
    layout
}

lazy_static! {
    pub static ref SPEC: DeviceSpec = DeviceSpec {
        name: "Prophet '08",
        manufacturer: Manufacturer::Standard(0x01),
        framings: &FRAMINGS,
        packing: Packing::SevenBit,
        layout: layout(),
    };
}
