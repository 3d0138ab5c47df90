//! The codec engine: walks a [`Layout`] to turn a [`Model`] into payload
//! bytes and back.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::Diagnostic;
use crate::framing::Variant;
use crate::layout::{Access, Constraint, Encoding, FieldDescriptor, Layout};
use crate::model::Model;
use crate::packing::{from_nibble_pair, join14, nibble_pair, split14};

/// Outcome of a successful parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub variant: Option<Variant>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new(variant: Variant) -> Self {
        Report { variant: Some(variant), diagnostics: Vec::new() }
    }

    /// Fields that fell back to index 0.
    pub fn fallbacks(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| matches!(d, Diagnostic::FieldDecodeFallback { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Replaces characters outside 32..=127 with spaces and pads or
/// truncates to `width`.
pub fn sanitize(text: &str, width: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.chars()
        .take(width)
        .map(|c| if (32..=127).contains(&(c as u32)) { c as u8 } else { b' ' })
        .collect();
    bytes.resize(width, b' ');
    bytes
}

fn decode_text(bytes: &[u8]) -> String {
    let s: String = bytes.iter()
        .map(|&b| if (32..=127).contains(&b) { b as char } else { ' ' })
        .collect();
    s.trim_end_matches(' ').to_string()
}

fn read_container(field: &FieldDescriptor, payload: &[u8]) -> u32 {
    let at = field.offset;
    match field.encoding {
        Encoding::NibblePair => from_nibble_pair(payload[at], payload[at + 1]) as u32,
        Encoding::Split16 => join14(payload[at], payload[at + 1]) as u32,
        _ => payload[at] as u32,
    }
}

fn write_container(field: &FieldDescriptor, payload: &mut [u8], raw: u32) {
    let at = field.offset;
    match field.encoding {
        Encoding::NibblePair => {
            let container = field.bits.insert(from_nibble_pair(payload[at], payload[at + 1]), raw);
            let (high, low) = nibble_pair(container);
            payload[at] = high;
            payload[at + 1] = low;
        },
        Encoding::Split16 => {
            let (msb, lsb) = split14(raw as u16);
            payload[at] = msb;
            payload[at + 1] = lsb;
        },
        _ => {
            payload[at] = field.bits.insert(payload[at], raw);
        },
    }
}

/// Gets the value of every numeric parameter for emitting: the model's
/// value or the descriptor default, brought into range, then adjusted by
/// the layout's constraints.
fn resolve<'a>(layout: &'a Layout, model: &Model) -> (HashMap<&'a str, i32>, Vec<Diagnostic>) {
    let mut values = HashMap::new();
    let mut clamps = Vec::new();

    for field in layout.fields() {
        if field.is_constant() || field.is_text() || values.contains_key(field.name.as_str()) {
            continue;
        }
        let value = model.get_or(&field.name, field.default);
        let recovered = field.recover(value);
        if recovered != value {
            debug!("{}: '{}' = {} out of range, using {}", layout.name, field.name, value, recovered);
            clamps.push(Diagnostic::RangeClamp { field: field.name.clone(), value, clamped: recovered });
        }
        values.insert(field.name.as_str(), recovered);
    }

    for constraint in layout.constraints() {
        match constraint {
            Constraint::Ordered { low, high, default, when } => {
                if let Some(guard) = when {
                    let lookup = |k: &str| values.get(k).copied().unwrap_or(0);
                    if !guard.holds(&lookup) {
                        continue;
                    }
                }
                let lo = values.get(low.as_str()).copied().unwrap_or(0);
                let mut hi = values.get(high.as_str()).copied().unwrap_or(0);
                if hi < lo {
                    hi = lo;
                    if let Some(v) = values.get_mut(high.as_str()) {
                        *v = hi;
                    }
                }
                if let Some(v) = default.as_ref().and_then(|d| values.get_mut(d.as_str())) {
                    *v = (*v).clamp(lo, hi);
                }
            },
            Constraint::AtMost { key, limit } => {
                let limit = values.get(limit.as_str()).copied().unwrap_or(0);
                if let Some(v) = values.get_mut(key.as_str()) {
                    *v = (*v).min(limit);
                }
            },
        }
    }

    (values, clamps)
}

/// Encodes the model into `payload`, which should be zero-filled and
/// `layout.size` bytes long. Returns the range clamps that were applied.
pub fn emit(layout: &Layout, model: &Model, payload: &mut [u8]) -> Vec<Diagnostic> {
    let (values, clamps) = resolve(layout, model);
    let lookup = |k: &str| values.get(k).copied().unwrap_or(0);

    for field in layout.fields() {
        if field.access == Access::ReadOnly {
            continue;
        }
        if let Some(guard) = &field.depends_on {
            if !guard.holds(&lookup) {
                continue;
            }
        }

        match field.encoding {
            Encoding::Constant(b) => {
                write_container(field, payload, b as u32);
            },
            Encoding::Text(width) => {
                let text = sanitize(model.get_text(&field.name), width);
                payload[field.offset..field.offset + width].copy_from_slice(&text);
            },
            Encoding::TableMapped(map) => {
                let index = field.transform.to_raw(lookup(field.name.as_str()), &field.bits).max(0) as usize;
                write_container(field, payload, map.encode(index) as u32);
            },
            _ => {
                let raw = field.transform.to_raw(lookup(field.name.as_str()), &field.bits).max(0) as u32;
                write_container(field, payload, raw);
            },
        }
    }

    clamps
}

/// Decodes `payload` into the model. Table misses fall back to index 0
/// and are recorded in the report. Out-of-range values are repaired
/// quietly. Nothing here fails.
pub fn parse(layout: &Layout, payload: &[u8], model: &mut Model, report: &mut Report) {
    for field in layout.fields() {
        if field.access == Access::WriteOnly || field.is_constant() {
            continue;
        }
        if let Some(guard) = &field.depends_on {
            let current = &*model;
            if !guard.holds(&|k: &str| current.get(k)) {
                continue;
            }
        }

        if let Encoding::Text(width) = field.encoding {
            let text = decode_text(&payload[field.offset..field.offset + width]);
            model.set(&field.name, text);
            continue;
        }

        let container = read_container(field, payload);
        let raw = match field.encoding {
            Encoding::Split16 => container,
            _ => field.bits.extract(container as u8) as u32,
        };
        let stored = match field.encoding {
            Encoding::TableMapped(map) => match map.position(raw as u8) {
                Some(index) => index as i32,
                None => {
                    warn!("{}: invalid value {:02X} for '{}' at payload offset {}, using 0",
                        layout.name, raw, field.name, field.offset);
                    report.diagnostics.push(Diagnostic::FieldDecodeFallback {
                        device: layout.name,
                        field: field.name.clone(),
                        offset: field.offset,
                        raw: raw as u8,
                    });
                    0
                },
            },
            _ => raw as i32,
        };

        let value = field.transform.to_value(stored, &field.bits);
        let recovered = field.recover(value);
        if recovered != value {
            debug!("{}: '{}' decoded as {}, using {}", layout.name, field.name, value, recovered);
        }
        model.set(&field.name, recovered);
    }
}

/// Sets every parameter of the layout to its default.
pub fn load_defaults(layout: &Layout, model: &mut Model) {
    for field in layout.fields() {
        if field.is_constant() || model.contains(&field.name) {
            continue;
        }
        if field.is_text() {
            model.set(&field.name, "");
        }
        else {
            model.set(&field.name, field.default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Guard;
    use crate::mapper::ValueMap;

    static DISPLAYS: ValueMap = ValueMap::new("displays", &[0x00, 0x01, 0x06, 0x07, 0x11, 0x09]);
    static PORTS: ValueMap = ValueMap::new("ports", &[0x00, 0x20, 0x41, 0x42, 0x40]);

    fn record() -> Layout {
        let mut layout = Layout::new("test", 16);
        layout.push(FieldDescriptor::text("name", 0, 4));
        layout.push(FieldDescriptor::table("display", 4, &DISPLAYS));
        layout.push(FieldDescriptor::table("ports", 5, &PORTS));
        layout.push(FieldDescriptor::direct("lowval", 6, 0, 127).when(Guard::not(Guard::is("display", &[5]))));
        layout.push(FieldDescriptor::direct("highval", 7, 0, 127).when(Guard::not(Guard::is("display", &[5]))));
        layout.push(FieldDescriptor::direct("defaultval", 8, 0, 127).when(Guard::not(Guard::is("display", &[5]))));
        layout.push(FieldDescriptor::split16("lowvalbig", 6, 16383).when(Guard::is("display", &[5])));
        layout.push(FieldDescriptor::split16("highvalbig", 9, 16383).when(Guard::is("display", &[5])));
        layout.push(FieldDescriptor::constant(11, 0x50));
        layout.push(FieldDescriptor::direct("flag", 12, 0, 1).bits(0, 1));
        layout.push(FieldDescriptor::direct("inverse", 12, 0, 1).bits(2, 1).inverted());
        layout.push(FieldDescriptor::nibbles("pan", 13, 0, 15).bits(0, 4));
        layout.push(FieldDescriptor::nibbles("dist", 13, 0, 15).bits(4, 4));
        layout.push(FieldDescriptor::direct("mmc", 15, 0, 12).offset_by(-1));
        layout.constrain(Constraint::ordered("lowval", "highval", Some("defaultval"),
            Some(Guard::not(Guard::is("display", &[5])))));
        layout.constrain(Constraint::ordered("lowvalbig", "highvalbig", None, Some(Guard::is("display", &[5]))));
        layout
    }

    fn emit_record(model: &Model) -> Vec<u8> {
        let layout = record();
        let mut payload = vec![0u8; layout.size];
        emit(&layout, model, &mut payload);
        payload
    }

    #[test]
    fn text_is_sanitized_and_padded() {
        assert_eq!(sanitize("A\u{7}é", 5), b"A    ".to_vec());
        assert_eq!(sanitize("TOO LONG", 3), b"TOO".to_vec());
        assert_eq!(decode_text(b"AB\x01 "), "AB");
    }

    #[test]
    fn emit_places_every_encoding() {
        let mut model = Model::new();
        model.set("name", "INIT");
        model.set("display", 2);
        model.set("ports", 4);
        model.set("lowval", 10);
        model.set("highval", 20);
        model.set("defaultval", 15);
        model.set("flag", 1);
        model.set("inverse", 1);
        model.set("pan", 0x0c);
        model.set("dist", 0x03);
        model.set("mmc", 4);

        let payload = emit_record(&model);
        assert_eq!(&payload[0..4], b"INIT");
        assert_eq!(payload[4], 0x06);
        assert_eq!(payload[5], 0x40);
        assert_eq!(&payload[6..9], &[10, 20, 15]);
        assert_eq!(payload[11], 0x50);
        assert_eq!(payload[12], 0b0000_0001);
        assert_eq!(&payload[13..15], &[0x03, 0x0c]);
        assert_eq!(payload[15], 5);
    }

    #[test]
    fn emit_enforces_clamp_law() {
        let mut model = Model::new();
        model.set("lowval", 90);
        model.set("highval", 30);
        model.set("defaultval", 5);
        let payload = emit_record(&model);
        assert_eq!(&payload[6..9], &[90, 90, 90]);

        model.set("display", 5);
        model.set("lowvalbig", 9000);
        model.set("highvalbig", 200);
        let payload = emit_record(&model);
        assert_eq!(join14(payload[6], payload[7]), 9000);
        assert_eq!(join14(payload[9], payload[10]), 9000);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut model = Model::new();
        model.set("lowval", 300);
        let layout = record();
        let mut payload = vec![0u8; layout.size];
        let clamps = emit(&layout, &model, &mut payload);
        assert_eq!(payload[6], 127);
        assert_eq!(clamps, vec![Diagnostic::RangeClamp { field: "lowval".to_string(), value: 300, clamped: 127 }]);
    }

    #[test]
    fn parse_follows_mode_selector() {
        let layout = record();
        let mut model = Model::new();
        model.set("name", "WIDE");
        model.set("display", 5);
        model.set("lowvalbig", 16383);
        model.set("highvalbig", 16383);
        let mut payload = vec![0u8; layout.size];
        emit(&layout, &model, &mut payload);

        let mut parsed = Model::new();
        let mut report = Report::default();
        parse(&layout, &payload, &mut parsed, &mut report);
        assert!(report.is_clean());
        assert_eq!(parsed.get("display"), 5);
        assert_eq!(parsed.get("lowvalbig"), 16383);
        assert_eq!(parsed.get("highvalbig"), 16383);
        assert!(!parsed.contains("lowval"));
        assert_eq!(parsed.get_text("name"), "WIDE");
    }

    #[test]
    fn bad_table_byte_falls_back_without_harming_siblings() {
        let layout = record();
        let mut model = Model::new();
        model.set("display", 1);
        model.set("ports", 3);
        model.set("lowval", 7);
        model.set("highval", 99);
        model.set("flag", 1);
        let mut payload = vec![0u8; layout.size];
        emit(&layout, &model, &mut payload);
        payload[5] = 0x7e;

        let mut parsed = Model::new();
        let mut report = Report::default();
        parse(&layout, &payload, &mut parsed, &mut report);
        assert_eq!(parsed.get("ports"), 0);
        assert_eq!(parsed.get("display"), 1);
        assert_eq!(parsed.get("lowval"), 7);
        assert_eq!(parsed.get("highval"), 99);
        assert_eq!(parsed.get("flag"), 1);
        assert_eq!(report.fallbacks().count(), 1);
        assert_eq!(report.diagnostics[0], Diagnostic::FieldDecodeFallback {
            device: "test", field: "ports".to_string(), offset: 5, raw: 0x7e,
        });
    }

    #[test]
    fn parse_reverses_bits_and_transforms() {
        let layout = record();
        let mut payload = vec![0u8; layout.size];
        payload[12] = 0b0000_0101;
        payload[13] = 0x0a;
        payload[14] = 0x07;
        payload[15] = 0;
        let mut parsed = Model::new();
        let mut report = Report::default();
        parse(&layout, &payload, &mut parsed, &mut report);
        assert_eq!(parsed.get("flag"), 1);
        assert_eq!(parsed.get("inverse"), 0);
        assert_eq!(parsed.get("dist"), 0x0a);
        assert_eq!(parsed.get("pan"), 0x07);
        assert_eq!(parsed.get("mmc"), 0);
        assert!(report.is_clean());
    }

    #[test]
    fn defaults_fill_missing_keys() {
        let layout = record();
        let mut model = Model::new();
        model.set("lowval", 3);
        load_defaults(&layout, &mut model);
        assert_eq!(model.get("lowval"), 3);
        assert!(model.contains("highvalbig"));
        assert_eq!(model.get_text("name"), "");
    }
}
