//! Supported devices and the codec operations on them.

use log::debug;

use crate::Manufacturer;
use crate::codec::{self, Report};
use crate::devices::{dstation, prophet08, remote_sl};
use crate::error::FormatError;
use crate::framing::{self, Framing, PatchNumber, Variant};
use crate::layout::Layout;
use crate::model::Model;
use crate::packing::Packed;

/// How the payload is carried in the message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Packing {
    Raw,
    SevenBit,
}

/// Everything the codec needs to know about one device.
#[derive(Debug)]
pub struct DeviceSpec {
    pub name: &'static str,
    pub manufacturer: Manufacturer,
    pub framings: &'static [Framing],
    pub packing: Packing,
    pub layout: Layout,
}

impl DeviceSpec {
    pub fn framing(&self, variant: Variant) -> Option<&Framing> {
        self.framings.iter().find(|f| f.variant == variant)
    }

    /// Turns a transmitted payload into the buffer the layout describes.
    pub fn decode_payload(&self, transmitted: &[u8]) -> Vec<u8> {
        let mut payload = match self.packing {
            Packing::Raw => transmitted.to_vec(),
            Packing::SevenBit => transmitted.unpacked(),
        };
        payload.resize(self.layout.size, 0);
        payload
    }

    pub fn encode_payload(&self, payload: &[u8]) -> Vec<u8> {
        match self.packing {
            Packing::Raw => payload.to_vec(),
            Packing::SevenBit => payload.packed(),
        }
    }
}

/// Control layout of the ReMOTE SL family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SlLayout {
    Standard,
    /// Compact models: encoders instead of pots, faders and cross-fader.
    Compact,
}

/// A supported device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Device {
    RemoteSl(SlLayout),
    DStation,
    Prophet08,
}

impl Device {
    /// Devices tried by [`identify`]. The two SL layouts share a format,
    /// so only the standard one is listed.
    pub const RECOGNIZABLE: [Device; 3] = [
        Device::RemoteSl(SlLayout::Standard),
        Device::DStation,
        Device::Prophet08,
    ];

    pub fn spec(&self) -> &'static DeviceSpec {
        match self {
            Device::RemoteSl(SlLayout::Standard) => &*remote_sl::STANDARD,
            Device::RemoteSl(SlLayout::Compact) => &*remote_sl::COMPACT,
            Device::DStation => &*dstation::SPEC,
            Device::Prophet08 => &*prophet08::SPEC,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn layout(&self) -> &'static Layout {
        &self.spec().layout
    }

    pub fn recognize(&self, data: &[u8]) -> bool {
        self.classify(data).is_some()
    }

    pub fn classify(&self, data: &[u8]) -> Option<Variant> {
        framing::classify(self.spec().framings, data).map(|f| f.variant)
    }

    /// Loads a message into the model.
    pub fn parse(&self, data: &[u8], model: &mut Model) -> Result<Report, FormatError> {
        let spec = self.spec();
        let framing = framing::classify(spec.framings, data)
            .ok_or(FormatError::Unrecognized { device: spec.name, length: data.len() })?;
        debug!("{}: parsing {:?} message", spec.name, framing.variant);

        let mut report = Report::new(framing.variant);
        match framing.number {
            PatchNumber::At(position) => model.set("number", data[position]),
            PatchNumber::Sentinel { .. } => model.set("number", 0),
            PatchNumber::Absent => {},
        }
        if let Some(position) = framing.bank {
            model.set("bank", data[position]);
        }

        if let (Device::DStation, Variant::Bank) = (self, framing.variant) {
            dstation::parse_bank_slot(data, 0, model, &mut report)?;
            return Ok(report);
        }

        let payload = spec.decode_payload(framing.payload(data));
        codec::parse(&spec.layout, &payload, model, &mut report);
        Ok(report)
    }

    /// Builds a message of the given variant from the model.
    pub fn emit(&self, model: &Model, variant: Variant) -> Result<Vec<u8>, FormatError> {
        let spec = self.spec();
        let framing = spec.framing(variant)
            .filter(|f| f.emits)
            .ok_or(FormatError::UnsupportedVariant { device: spec.name, variant })?;

        let mut payload = vec![0u8; spec.layout.size];
        let clamps = codec::emit(&spec.layout, model, &mut payload);
        debug!("{}: emitting {:?} message, {} values clamped", spec.name, variant, clamps.len());

        let number = model.get("number").clamp(0, 127) as u8;
        let bank = model.get("bank").clamp(0, 127) as u8;
        framing.frame(&spec.encode_payload(&payload), number, bank)
    }

    /// Wraps an already encoded payload (as transmitted) into a message.
    pub fn frame(&self, payload: &[u8], variant: Variant, number: Option<u8>) -> Result<Vec<u8>, FormatError> {
        let spec = self.spec();
        let framing = spec.framing(variant)
            .ok_or(FormatError::UnsupportedVariant { device: spec.name, variant })?;
        framing.frame(payload, number.unwrap_or(0), 0)
    }

    /// A model holding the default of every parameter.
    pub fn init_model(&self) -> Model {
        let spec = self.spec();
        let mut model = Model::new();
        if spec.framings.iter().any(|f| f.bank.is_some()) {
            model.set("bank", 0);
        }
        if spec.framings.iter().any(|f| f.number != PatchNumber::Absent) {
            model.set("number", 0);
        }
        codec::load_defaults(&spec.layout, &mut model);
        model
    }
}

/// Finds the device and variant of a message.
pub fn identify(data: &[u8]) -> Option<(Device, Variant)> {
    Device::RECOGNIZABLE.iter()
        .find_map(|d| d.classify(data).map(|v| (*d, v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Encoding;

    #[test]
    fn layouts_have_no_unexplained_overlaps() {
        for device in [Device::RemoteSl(SlLayout::Standard), Device::RemoteSl(SlLayout::Compact),
                       Device::DStation, Device::Prophet08] {
            let overlaps = device.layout().overlaps();
            assert!(overlaps.is_empty(), "{}: {:?}", device.name(), overlaps);
        }
    }

    #[test]
    fn emit_sizes_match_framings() {
        for device in Device::RECOGNIZABLE {
            let model = device.init_model();
            for framing in device.spec().framings.iter().filter(|f| f.emits) {
                let data = device.emit(&model, framing.variant).unwrap();
                assert_eq!(data.len(), framing.length());
                assert_eq!(identify(&data), Some((device, framing.variant)));
            }
        }
    }

    #[test]
    fn unsupported_variant_is_an_error() {
        let model = Model::new();
        assert_eq!(Device::Prophet08.emit(&model, Variant::Write),
            Err(FormatError::UnsupportedVariant { device: "Prophet '08", variant: Variant::Write }));
        assert_eq!(Device::DStation.emit(&model, Variant::Bank),
            Err(FormatError::UnsupportedVariant { device: "D-Station", variant: Variant::Bank }));
    }

    #[test]
    fn every_table_index_survives_encode_and_decode() {
        for device in [Device::RemoteSl(SlLayout::Standard), Device::RemoteSl(SlLayout::Compact),
                       Device::DStation, Device::Prophet08] {
            for field in device.layout().fields() {
                if let Encoding::TableMapped(map) = field.encoding {
                    for i in 0..map.len() {
                        assert_eq!(map.decode(map.encode(i)), i, "{}: {} index {}", device.name(), field.name, i);
                    }
                }
            }
        }
    }

    #[test]
    fn messages_carry_the_device_manufacturer() {
        for device in Device::RECOGNIZABLE {
            let model = device.init_model();
            for framing in device.spec().framings.iter().filter(|f| f.emits) {
                let data = device.emit(&model, framing.variant).unwrap();
                let message = crate::Message::new(&data).unwrap();
                assert_eq!(message.manufacturer(), Some(device.spec().manufacturer));
            }
        }
    }

    #[test]
    fn garbage_is_not_identified() {
        assert_eq!(identify(&[]), None);
        assert_eq!(identify(&[0xf0, 0x7e, 0x00, 0x06, 0x01, 0xf7]), None);
        assert!(Device::Prophet08.parse(&[0xf0, 0xf7], &mut Model::new()).is_err());
    }
}
