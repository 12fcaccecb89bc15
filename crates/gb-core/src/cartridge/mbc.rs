use super::{mbc0::Mbc0, mbc1::Mbc1, mbc3::Mbc3, mbc5::Mbc5};

/// Common interface every memory-bank-controller variant implements (§4.6).
pub trait Mbc {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8;
    fn write_rom(&mut self, addr: u16, val: u8);
    fn read_ram(&self, ram: &[u8], addr: u16) -> u8;
    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8);

    /// Whether RAM (or, for MBC3, RTC state) has changed since the last clear.
    fn dirty(&self) -> bool {
        false
    }

    fn clear_dirty(&mut self) {}

    /// Opaque mapper metadata for persistence (MBC3 RTC only); `None` elsewhere.
    fn export_metadata(&self) -> Option<serde_json::Value> {
        None
    }

    fn import_metadata(&mut self, _value: &serde_json::Value) {}
}

/// Exhaustive dispatch over the supported mapper kinds, avoiding a trait object.
pub enum MbcEnum {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl Mbc for MbcEnum {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        match self {
            Self::Mbc0(m) => m.read_rom(rom, addr),
            Self::Mbc1(m) => m.read_rom(rom, addr),
            Self::Mbc3(m) => m.read_rom(rom, addr),
            Self::Mbc5(m) => m.read_rom(rom, addr),
        }
    }

    fn write_rom(&mut self, addr: u16, val: u8) {
        match self {
            Self::Mbc0(m) => m.write_rom(addr, val),
            Self::Mbc1(m) => m.write_rom(addr, val),
            Self::Mbc3(m) => m.write_rom(addr, val),
            Self::Mbc5(m) => m.write_rom(addr, val),
        }
    }

    fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        match self {
            Self::Mbc0(m) => m.read_ram(ram, addr),
            Self::Mbc1(m) => m.read_ram(ram, addr),
            Self::Mbc3(m) => m.read_ram(ram, addr),
            Self::Mbc5(m) => m.read_ram(ram, addr),
        }
    }

    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        match self {
            Self::Mbc0(m) => m.write_ram(ram, addr, val),
            Self::Mbc1(m) => m.write_ram(ram, addr, val),
            Self::Mbc3(m) => m.write_ram(ram, addr, val),
            Self::Mbc5(m) => m.write_ram(ram, addr, val),
        }
    }

    fn dirty(&self) -> bool {
        match self {
            Self::Mbc0(m) => m.dirty(),
            Self::Mbc1(m) => m.dirty(),
            Self::Mbc3(m) => m.dirty(),
            Self::Mbc5(m) => m.dirty(),
        }
    }

    fn clear_dirty(&mut self) {
        match self {
            Self::Mbc0(m) => m.clear_dirty(),
            Self::Mbc1(m) => m.clear_dirty(),
            Self::Mbc3(m) => m.clear_dirty(),
            Self::Mbc5(m) => m.clear_dirty(),
        }
    }

    fn export_metadata(&self) -> Option<serde_json::Value> {
        match self {
            Self::Mbc0(m) => m.export_metadata(),
            Self::Mbc1(m) => m.export_metadata(),
            Self::Mbc3(m) => m.export_metadata(),
            Self::Mbc5(m) => m.export_metadata(),
        }
    }

    fn import_metadata(&mut self, value: &serde_json::Value) {
        match self {
            Self::Mbc0(m) => m.import_metadata(value),
            Self::Mbc1(m) => m.import_metadata(value),
            Self::Mbc3(m) => m.import_metadata(value),
            Self::Mbc5(m) => m.import_metadata(value),
        }
    }
}
