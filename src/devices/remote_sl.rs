//! Novation ReMOTE SL templates.
//!
//! A template is 4112 bytes: 13 bytes of header and subtype, a 4096 byte
//! payload and `12 34 F7`. The payload holds a global block followed by
//! ninety 41-byte control records. Most record bytes change meaning with
//! the control's type or display mode.
//!
//! The unit is known to send codes that are not in the tables for
//! controls it does not use, especially in the port bytes.

use lazy_static::lazy_static;

use crate::Manufacturer;
use crate::device::{DeviceSpec, Packing, SlLayout};
use crate::framing::{Framing, PatchNumber, Variant};
use crate::layout::{Constraint, FieldDescriptor, Guard, Layout};
use crate::mapper::ValueMap;

/// Offset of the first control record in the payload.
pub const RECORDS: usize = 0x196;
pub const RECORD_SIZE: usize = 41;
pub const RECORD_COUNT: usize = 90;

const EXPRESSION_INDEX: usize = 64;
const MODWHEEL_INDEX: usize = 66;

pub static FRAMINGS: [Framing; 3] = [
    Framing {
        variant: Variant::Write,
        header: &[0xf0, 0x00, 0x20, 0x29, 0x02, 0x03, 0x7f, 0x01, 0x00, 0x09, 0x06, 0x00],
        wildcards: &[7],
        number: PatchNumber::At(12),
        bank: None,
        payload_offset: 13,
        payload_len: 4096,
        trailer: &[0x12, 0x34, 0xf7],
        emits: true,
    },
    Framing {
        variant: Variant::Upload,
        header: &[0xf0, 0x00, 0x20, 0x29, 0x02, 0x03, 0x7f, 0x00, 0x00, 0x11, 0x02, 0x00],
        wildcards: &[7],
        number: PatchNumber::Sentinel { position: 12, value: 0x01 },
        bank: None,
        payload_offset: 13,
        payload_len: 4096,
        trailer: &[0x12, 0x34, 0xf7],
        emits: true,
    },
    Framing {
        variant: Variant::Received,
        header: &[0xf0, 0x00, 0x20, 0x29, 0x02, 0x03, 0x7f, 0x00, 0x00, 0x0b, 0x0e, 0x00],
        wildcards: &[7],
        number: PatchNumber::At(12),
        bank: None,
        payload_offset: 13,
        payload_len: 4096,
        trailer: &[0x12, 0x34, 0xf7],
        emits: false,
    },
];

pub static ENCODER_DISPLAYS: ValueMap = ValueMap::new("encoder displays", &[0x00, 0x01, 0x06, 0x07, 0x11, 0x09]);
pub static PITCH_BEND_DISPLAYS: ValueMap = ValueMap::new("pitch bend displays", &[0x00, 0x01, 0x06, 0x07, 0x11]);
pub static BUTTON_DISPLAYS: ValueMap = ValueMap::new("button displays", &[0x00, 0x01, 0x03, 0x10]);
pub static CONTROL_PORTS: ValueMap = ValueMap::new("control ports", &[
    0x00, 0x20, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x50, 0x51, 0x52, 0x53, 0x40,
]);
pub static CONTROL_CHANNELS: ValueMap = ValueMap::new("control channels", &[
    0x00, 0x20, 0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f,
]);
pub static COMMON_PORTS: ValueMap = ValueMap::new("common ports", &[
    0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x50, 0x51, 0x52, 0x53, 0x00,
]);
pub static PROGRAM_PORTS: ValueMap = ValueMap::new("program ports", &[
    0x00, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x40,
]);
pub static KEYBOARD_PORTS: ValueMap = ValueMap::new("keyboard ports", &[
    0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x40,
]);
pub static SINGLE_DV_TYPES: ValueMap = ValueMap::new("single dv types", &[0, 4, 1]);
pub static DOUBLE_DV_TYPES: ValueMap = ValueMap::new("double dv types", &[0, 4, 2, 3]);
pub static PITCH_BEND_TYPES: ValueMap = ValueMap::new("pitch bend types", &[0x00, 0x01, 0x02, 0x03, 0x04, 0x0a]);
pub static BUTTON_TYPES: ValueMap = ValueMap::new("button types", &[
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x08, 0x09, 0x0c, 0x0d,
]);
pub static DRUM_PAD_TYPES: ValueMap = ValueMap::new("drum pad types", &[
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x0b, 0x08, 0x09, 0x0c, 0x0d,
]);
pub static BUTTON_STANDARD_TYPES: ValueMap = ValueMap::new("button standard types", &[0x00, 0x04, 0x08, 0x10]);
pub static BANK_CHANGE_MODES: ValueMap = ValueMap::new("bank change modes", &[0x00, 0x01, 0x02]);
pub static PROGRAM_CHANGE_MODES: ValueMap = ValueMap::new("program change modes", &[0x00, 0x01, 0x02, 0x03]);
pub static REAL_TIME: ValueMap = ValueMap::new("real time", &[0x51, 0x52, 0x53, 0x54, 0x55]);
pub static TEMPLATE_SIZES: ValueMap = ValueMap::new("template sizes", &[
    0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
    17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32,
]);

// Button types
const MMC: i32 = 5;
const NOTE: i32 = 6;
const BANK_SELECT: i32 = 7;
const PROGRAM_CHANGE: i32 = 8;
const TEMPLATE: i32 = 9;
const REALTIME: i32 = 10;

const SIXTEEN_K: i32 = 5;

fn key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

fn global_block(layout: &mut Layout) {
    layout.push(FieldDescriptor::text("name", 0, 34));
    layout.push(FieldDescriptor::constant(34, 0x20));
    layout.push(FieldDescriptor::text("manufacturer", 35, 13));

    layout.push(FieldDescriptor::table("templatesize", 52, &TEMPLATE_SIZES).offset_by(1).range(1, 32));
    layout.push(FieldDescriptor::direct("templateposition", 53, 1, 32));
    // A one-control template is stored as size 0, position 0.
    layout.push(FieldDescriptor::constant(53, 0x00).when(Guard::is("templatesize", &[1])));
    layout.constrain(Constraint::at_most("templateposition", "templatesize"));

    layout.constants(54, &[
        0x00, 0x5a, 0x29, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x19,
        0x00, 0x01, 0x00, 0x21, 0x00, 0x09, 0x00, 0x39, 0x00, 0x11, 0x00, 0x29, 0x00, 0x31, 0x03, 0x05,
    ]);

    layout.push(FieldDescriptor::direct("progchannel", 86, 0, 15));
    layout.push(FieldDescriptor::table("progports", 87, &PROGRAM_PORTS));
    layout.push(FieldDescriptor::direct("commonchannel", 88, 0, 15));
    layout.push(FieldDescriptor::table("commonports", 89, &COMMON_PORTS));

    layout.push(FieldDescriptor::direct("velocitycurve", 92, 0, 126));
    layout.push(FieldDescriptor::direct("octavesetting", 93, 0, 9).default(4));
    layout.push(FieldDescriptor::direct("potpickup", 94, 0, 1).bits(0, 1));
    layout.push(FieldDescriptor::direct("aftertouch", 94, 0, 1).bits(2, 1).inverted().default(1));
    layout.constants(95, &[0x00, 0x07]);

    layout.push(FieldDescriptor::direct("enablekeyboardzones", 97, 0, 1));
    for zone in 1..=4 {
        let base = 98 + (zone - 1) * 10;
        let prefix = format!("zone{}", zone);
        // Unused zones often carry channel bytes above 15.
        layout.push(FieldDescriptor::direct(&key(&prefix, "channel"), base, 0, 15).reset_when_invalid());
        layout.push(FieldDescriptor::table(&key(&prefix, "ports"), base + 1, &KEYBOARD_PORTS));
        layout.push(FieldDescriptor::direct(&key(&prefix, "veloffset"), base + 2, 0, 126));
        layout.push(FieldDescriptor::direct(&key(&prefix, "minnote"), base + 3, 0, 127));
        layout.push(FieldDescriptor::direct(&key(&prefix, "maxnote"), base + 4, 0, 127).default(127));
        layout.push(FieldDescriptor::direct(&key(&prefix, "transpose"), base + 5, 0, 127).default(64));
        layout.push(FieldDescriptor::direct(&key(&prefix, "pitchbend"), base + 6, 0, 1).bits(0, 1));
        layout.push(FieldDescriptor::direct(&key(&prefix, "modwheel"), base + 6, 0, 1).bits(1, 1));
        layout.push(FieldDescriptor::direct(&key(&prefix, "aftertouch"), base + 6, 0, 1).bits(2, 1));
    }

    layout.push(FieldDescriptor::direct("touchpadxtype", 138, 0, 3));
    layout.push(FieldDescriptor::direct("touchpadytype", 139, 0, 3));

    for pad in 0..8 {
        let prefix = format!("page8control{}", pad + 1);
        layout.push(FieldDescriptor::direct(&key(&prefix, "autooff"), 143 + pad * 2, 0, 127));
    }
    for pad in 0..8 {
        let prefix = format!("page8control{}", pad + 1);
        layout.push(FieldDescriptor::direct(&key(&prefix, "drumoffsync"), 158 + pad, 0, 34));
    }

    layout.constants(166, &[0x00, 0x01, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x40]);
}

/// Appends control records in hardware order.
struct Records {
    layout: Layout,
    index: usize,
}

impl Records {
    fn next_base(&mut self) -> usize {
        let base = RECORDS + self.index * RECORD_SIZE;
        self.index += 1;
        base
    }

    fn skip(&mut self, count: usize) {
        self.index += count;
    }

    fn push(&mut self, field: FieldDescriptor) {
        self.layout.push(field);
    }

    /// Length, data value position and the twelve sysex bytes, which
    /// depend on whether the data value type is Roland.
    fn sysex(&mut self, p: &str, base: usize, roland: Guard) {
        let other = Guard::not(roland.clone());
        self.push(FieldDescriptor::direct(&key(p, "rolandsysexlength"), base + 27, 9, 12).when(roland.clone()));
        self.push(FieldDescriptor::direct(&key(p, "sysexlength"), base + 27, 0, 12).when(other.clone()));

        // Position 0 means no data value; it reads back as 0.
        self.push(FieldDescriptor::direct(&key(p, "sysexdvpos"), base + 28, 0, 11).offset_by(-1).read_only());
        self.push(FieldDescriptor::direct(&key(p, "sysexdvpos"), base + 28, 0, 11).offset_by(-1).write_only().when(other));
        self.push(FieldDescriptor::direct(&key(p, "rolandsysexlength"), base + 28, 9, 12).offset_by(1).write_only().when(roland));

        for i in 0..12 {
            self.push(FieldDescriptor::direct(&key(p, &format!("sysex{}", i)), base + 29 + i, 0, 127));
        }
    }

    fn common(&mut self, p: &str, base: usize) {
        self.push(FieldDescriptor::table(&key(p, "ports"), base + 18, &CONTROL_PORTS));
        self.push(FieldDescriptor::direct(&key(p, "parammsb"), base + 16, 0, 127));
        self.push(FieldDescriptor::direct(&key(p, "paramlsb"), base + 17, 0, 127));
    }

    /// Low, high and default values of controls without a wide mode.
    fn values(&mut self, p: &str, base: usize) {
        self.push(FieldDescriptor::direct(&key(p, "lowval"), base + 10, 0, 127));
        self.push(FieldDescriptor::direct(&key(p, "highval"), base + 12, 0, 127).default(127));
        self.push(FieldDescriptor::direct(&key(p, "defaultval"), base + 21, 0, 127).write_only());
        self.layout.constrain(Constraint::ordered(&key(p, "lowval"), &key(p, "highval"), Some(&key(p, "defaultval")), None));
    }

    fn encoder(&mut self, p: &str) {
        let base = self.next_base();
        let wide = Guard::is(key(p, "display"), &[SIXTEEN_K]);
        let narrow = Guard::not(wide.clone());

        self.push(FieldDescriptor::text(&key(p, "name"), base, 8));
        self.push(FieldDescriptor::direct(&key(p, "type"), base + 8, 0, 4));
        self.push(FieldDescriptor::constant(base + 14, 0x50));
        self.push(FieldDescriptor::table(&key(p, "display"), base + 15, &ENCODER_DISPLAYS));
        self.push(FieldDescriptor::table(&key(p, "channel"), base + 19, &CONTROL_CHANNELS));
        self.common(p, base);

        self.push(FieldDescriptor::split16(&key(p, "lowvalbig"), base + 9, 16383).when(wide.clone()));
        self.push(FieldDescriptor::split16(&key(p, "highvalbig"), base + 11, 16383).default(16383).when(wide.clone()));
        self.push(FieldDescriptor::split16(&key(p, "defaultvalbig"), base + 20, 16383).when(wide.clone()));
        self.push(FieldDescriptor::direct(&key(p, "lowval"), base + 10, 0, 127).when(narrow.clone()));
        self.push(FieldDescriptor::direct(&key(p, "highval"), base + 12, 0, 127).default(127).when(narrow.clone()));
        self.push(FieldDescriptor::direct(&key(p, "defaultval"), base + 21, 0, 127).write_only().when(narrow.clone()));
        self.layout.constrain(Constraint::ordered(
            &key(p, "lowvalbig"), &key(p, "highvalbig"), Some(&key(p, "defaultvalbig")), Some(wide.clone())));
        self.layout.constrain(Constraint::ordered(
            &key(p, "lowval"), &key(p, "highval"), Some(&key(p, "defaultval")), Some(narrow.clone())));

        self.push(FieldDescriptor::table(&key(p, "sysexdoubledvtype"), base + 26, &DOUBLE_DV_TYPES).when(wide.clone()));
        self.push(FieldDescriptor::table(&key(p, "sysexsingledvtype"), base + 26, &SINGLE_DV_TYPES).when(narrow.clone()));
        let roland = Guard::Any(vec![
            Guard::All(vec![wide, Guard::is(key(p, "sysexdoubledvtype"), &[1])]),
            Guard::All(vec![narrow, Guard::is(key(p, "sysexsingledvtype"), &[1])]),
        ]);
        self.sysex(p, base, roland);
    }

    fn pot(&mut self, p: &str) {
        let index = self.index;
        let base = self.next_base();

        self.push(FieldDescriptor::text(&key(p, "name"), base, 8));
        self.push(FieldDescriptor::direct(&key(p, "type"), base + 8, 0, 4));
        if index == MODWHEEL_INDEX || index == EXPRESSION_INDEX {
            self.push(FieldDescriptor::constant(base + 14, 0x50));
        }
        else {
            self.push(FieldDescriptor::direct(&key(p, "potpickup"), base + 14, 0, 3).bits(5, 2));
        }
        self.push(FieldDescriptor::table(&key(p, "display"), base + 15, &ENCODER_DISPLAYS).range(0, 1));
        self.push(FieldDescriptor::table(&key(p, "channel"), base + 19, &CONTROL_CHANNELS));
        self.common(p, base);
        self.values(p, base);

        self.push(FieldDescriptor::table(&key(p, "sysexsingledvtype"), base + 26, &SINGLE_DV_TYPES));
        self.sysex(p, base, Guard::is(key(p, "sysexsingledvtype"), &[1]));
    }

    fn pitch_bend(&mut self, p: &str) {
        let base = self.next_base();

        self.push(FieldDescriptor::text(&key(p, "name"), base, 8));
        self.push(FieldDescriptor::table(&key(p, "type"), base + 8, &PITCH_BEND_TYPES));
        self.push(FieldDescriptor::constant(base + 14, 0x50));
        self.push(FieldDescriptor::table(&key(p, "display"), base + 15, &PITCH_BEND_DISPLAYS));
        self.push(FieldDescriptor::table(&key(p, "channel"), base + 19, &CONTROL_CHANNELS));
        self.common(p, base);
        self.values(p, base);

        self.push(FieldDescriptor::table(&key(p, "sysexsingledvtype"), base + 26, &SINGLE_DV_TYPES));
        self.sysex(p, base, Guard::is(key(p, "sysexsingledvtype"), &[1]));
    }

    /// Buttons and drum pads. The type selects what bytes 10 to 22 mean.
    fn button(&mut self, p: &str, types: &'static ValueMap) {
        let base = self.next_base();
        let is = |values: &[i32]| Guard::is(key(p, "type"), values);
        let plain = is(&[0, 1, 2, 3, 4]);

        self.push(FieldDescriptor::text(&key(p, "name"), base, 8));
        self.push(FieldDescriptor::table(&key(p, "type"), base + 8, types));
        self.push(FieldDescriptor::constant(base + 14, 0x50));
        self.push(FieldDescriptor::table(&key(p, "display"), base + 15, &BUTTON_DISPLAYS));
        self.push(FieldDescriptor::table(&key(p, "ports"), base + 18, &CONTROL_PORTS));
        self.push(FieldDescriptor::direct(&key(p, "mmcdevice"), base + 19, 0, 127).when(is(&[MMC])));
        self.push(FieldDescriptor::table(&key(p, "channel"), base + 19, &CONTROL_CHANNELS).when(Guard::not(is(&[MMC]))));

        self.push(FieldDescriptor::direct(&key(p, "mmctype"), base + 10, 0, 12).offset_by(-1).when(is(&[MMC])));
        self.push(FieldDescriptor::direct(&key(p, "template"), base + 10, 0, 127).when(is(&[TEMPLATE])));
        self.push(FieldDescriptor::direct(&key(p, "lowval"), base + 10, 0, 127)
            .when(is(&[0, 1, 2, 3, 4, NOTE, PROGRAM_CHANGE])));
        self.push(FieldDescriptor::direct(&key(p, "highval"), base + 12, 0, 127).default(127)
            .when(is(&[0, 1, 2, 3, 4, NOTE, PROGRAM_CHANGE])));
        self.push(FieldDescriptor::direct(&key(p, "defaultval"), base + 21, 0, 127).write_only().when(plain.clone()));
        self.layout.constrain(Constraint::ordered(
            &key(p, "lowval"), &key(p, "highval"), Some(&key(p, "defaultval")), Some(plain.clone())));
        self.push(FieldDescriptor::direct(&key(p, "parammsb"), base + 16, 0, 127)
            .when(is(&[0, 1, 2, 3, 4, BANK_SELECT, PROGRAM_CHANGE])));
        self.push(FieldDescriptor::direct(&key(p, "paramlsb"), base + 17, 0, 127)
            .when(is(&[0, 1, 2, 3, 4, BANK_SELECT, PROGRAM_CHANGE])));
        self.push(FieldDescriptor::table(&key(p, "realtime"), base + 14, &REAL_TIME).when(is(&[REALTIME])));

        self.push(FieldDescriptor::table(&key(p, "bankmode"), base + 13, &BANK_CHANGE_MODES).when(is(&[BANK_SELECT])));
        self.push(FieldDescriptor::table(&key(p, "pcbankmode"), base + 13, &PROGRAM_CHANGE_MODES).when(is(&[PROGRAM_CHANGE])));
        let standard = Guard::not(is(&[BANK_SELECT, PROGRAM_CHANGE]));
        self.push(FieldDescriptor::table(&key(p, "buttontype"), base + 13, &BUTTON_STANDARD_TYPES).when(standard.clone()));
        self.push(FieldDescriptor::direct(&key(p, "stepsize"), base + 22, 0, 63).when(standard));

        self.push(FieldDescriptor::table(&key(p, "sysexsingledvtype"), base + 26, &SINGLE_DV_TYPES));
        self.sysex(p, base, Guard::is(key(p, "sysexsingledvtype"), &[1]));
    }
}

/// Builds the descriptor table for a layout variant.
pub fn layout(kind: SlLayout) -> Layout {
    let name = match kind {
        SlLayout::Standard => "ReMOTE SL",
        SlLayout::Compact => "ReMOTE SL Compact",
    };
    let mut layout = Layout::new(name, 4096);
    global_block(&mut layout);

    let mut records = Records { layout, index: 0 };
    for i in 1..=8 {
        records.encoder(&format!("page1control{}", i));
    }
    for page in 2..=3 {
        for i in 1..=8 {
            let p = format!("page{}control{}", page, i);
            match kind {
                SlLayout::Compact => records.encoder(&p),
                SlLayout::Standard => records.pot(&p),
            }
        }
    }
    for page in 4..=7 {
        for i in 1..=8 {
            records.button(&format!("page{}control{}", page, i), &BUTTON_TYPES);
        }
    }
    for i in 1..=8 {
        records.button(&format!("page8control{}", i), &DRUM_PAD_TYPES);
    }
    records.pot("page9control1");  // expression
    records.button("page9control3", &BUTTON_TYPES);  // sustain
    records.pot("page9control2");  // modwheel
    for i in 4..=8 {
        records.pitch_bend(&format!("page9control{}", i));
    }
    for i in 1..=6 {
        records.button(&format!("page10control{}", i), &BUTTON_TYPES);
    }
    match kind {
        SlLayout::Compact => {
            for i in 1..=8 {
                records.encoder(&format!("page11control{}", i));
            }
        },
        SlLayout::Standard => {
            records.skip(7);
            records.pot("page10control7");  // cross-fader
        },
    }
    records.skip(4);
    debug_assert_eq!(records.index, RECORD_COUNT);

    records.layout
}

fn spec(kind: SlLayout) -> DeviceSpec {
    let layout = layout(kind);
    DeviceSpec {
        name: layout.name,
        manufacturer: Manufacturer::Extended([0x00, 0x20, 0x29]),
        framings: &FRAMINGS,
        packing: Packing::Raw,
        layout,
    }
}

lazy_static! {
    pub static ref STANDARD: DeviceSpec = spec(SlLayout::Standard);
    pub static ref COMPACT: DeviceSpec = spec(SlLayout::Compact);
}
