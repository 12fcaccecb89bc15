pub mod header;
pub mod mbc;
pub mod mbc0;
pub mod mbc1;
pub mod mbc3;
pub mod mbc5;

use self::header::Header;
use crate::cartridge::mbc::Mbc;
use thiserror::Error;

/// Boundary errors for loading a cartridge image (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("unsupported cartridge header code 0x{type_code:02X}")]
    UnsupportedCartridge { type_code: u8 },
    #[error("rom too small: expected at least {expected} bytes, got {actual}")]
    TruncatedRom { expected: usize, actual: usize },
}

pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub header: Header,
    pub mbc: mbc::MbcEnum,
}

impl Cartridge {
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&rom)?;
        let ram = vec![0; header.ram_size.byte_len()];

        let mbc = match header.cartridge_type {
            header::CartridgeType::RomOnly => mbc::MbcEnum::Mbc0(mbc0::Mbc0),
            header::CartridgeType::Mbc1
            | header::CartridgeType::Mbc1Ram
            | header::CartridgeType::Mbc1RamBattery => mbc::MbcEnum::Mbc1(mbc1::Mbc1::new()),
            header::CartridgeType::Mbc3TimerBattery
            | header::CartridgeType::Mbc3TimerRamBattery
            | header::CartridgeType::Mbc3
            | header::CartridgeType::Mbc3Ram
            | header::CartridgeType::Mbc3RamBattery => mbc::MbcEnum::Mbc3(mbc3::Mbc3::new()),
            header::CartridgeType::Mbc5
            | header::CartridgeType::Mbc5Ram
            | header::CartridgeType::Mbc5RamBattery
            | header::CartridgeType::Mbc5Rumble
            | header::CartridgeType::Mbc5RumbleRam
            | header::CartridgeType::Mbc5RumbleRamBattery => mbc::MbcEnum::Mbc5(mbc5::Mbc5::new()),
        };

        log::debug!(
            "loaded cartridge \"{}\" type={:?} rom_banks={} ram_bytes={}",
            header.title,
            header.cartridge_type,
            header.rom_size.bank_count(),
            header.ram_size.byte_len()
        );

        Ok(Self {
            rom,
            ram,
            header,
            mbc,
        })
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.mbc.read_rom(&self.rom, addr),
            0xA000..=0xBFFF => self.mbc.read_ram(&self.ram, addr),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF => self.mbc.write_rom(addr, val),
            0xA000..=0xBFFF => self.mbc.write_ram(&mut self.ram, addr, val),
            _ => {}
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.header.cartridge_type,
            header::CartridgeType::Mbc1RamBattery
                | header::CartridgeType::Mbc3TimerBattery
                | header::CartridgeType::Mbc3TimerRamBattery
                | header::CartridgeType::Mbc3RamBattery
                | header::CartridgeType::Mbc5RamBattery
                | header::CartridgeType::Mbc5RumbleRamBattery
        )
    }

    /// RAM content for the external collaborator to persist, if this cartridge
    /// has battery-backed RAM (§6).
    pub fn export_ram(&self) -> Option<Vec<u8>> {
        if !self.has_battery() || self.ram.is_empty() {
            return None;
        }
        Some(self.ram.clone())
    }

    /// Restores previously exported RAM content.
    pub fn import_ram(&mut self, data: &[u8]) {
        let len = self.ram.len().min(data.len());
        self.ram[..len].copy_from_slice(&data[..len]);
        self.mbc.clear_dirty();
    }

    /// Opaque mapper metadata for the external collaborator to persist (MBC3 RTC).
    pub fn export_metadata(&self) -> Option<serde_json::Value> {
        self.mbc.export_metadata()
    }

    pub fn import_metadata(&mut self, value: &serde_json::Value) {
        self.mbc.import_metadata(value);
    }

    /// Whether RAM/RTC state has changed since the last `import_ram`/explicit clear.
    pub fn dirty(&self) -> bool {
        self.mbc.dirty()
    }
}
