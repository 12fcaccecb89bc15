use super::CartridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeType {
    RomOnly,
    Mbc1,
    Mbc1Ram,
    Mbc1RamBattery,
    Mbc3TimerBattery,
    Mbc3TimerRamBattery,
    Mbc3,
    Mbc3Ram,
    Mbc3RamBattery,
    Mbc5,
    Mbc5Ram,
    Mbc5RamBattery,
    Mbc5Rumble,
    Mbc5RumbleRam,
    Mbc5RumbleRamBattery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomSize {
    Kilobytes32,  // 1 bank
    Kilobytes64,  // 2 banks
    Kilobytes128, // 4 banks
    Kilobytes256, // 8 banks
    Kilobytes512, // 16 banks
    Megabyte1,    // 32 banks
    Megabyte2,    // 64 banks
    Megabyte4,    // 128 banks
    Megabyte8,    // 512 banks
}

impl RomSize {
    pub fn bank_count(self) -> usize {
        match self {
            RomSize::Kilobytes32 => 1,
            RomSize::Kilobytes64 => 2,
            RomSize::Kilobytes128 => 4,
            RomSize::Kilobytes256 => 8,
            RomSize::Kilobytes512 => 16,
            RomSize::Megabyte1 => 32,
            RomSize::Megabyte2 => 64,
            RomSize::Megabyte4 => 128,
            RomSize::Megabyte8 => 512,
        }
    }

    pub fn byte_len(self) -> usize {
        self.bank_count() * 0x4000
    }

    fn from_byte(byte: u8) -> Result<Self, CartridgeError> {
        match byte {
            0x00 => Ok(RomSize::Kilobytes32),
            0x01 => Ok(RomSize::Kilobytes64),
            0x02 => Ok(RomSize::Kilobytes128),
            0x03 => Ok(RomSize::Kilobytes256),
            0x04 => Ok(RomSize::Kilobytes512),
            0x05 => Ok(RomSize::Megabyte1),
            0x06 => Ok(RomSize::Megabyte2),
            0x07 => Ok(RomSize::Megabyte4),
            0x08 => Ok(RomSize::Megabyte8),
            _ => Err(CartridgeError::UnsupportedCartridge { type_code: byte }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamSize {
    None,
    Kilobytes2,
    Kilobytes8,
    Kilobytes32,
    Kilobytes128,
    Kilobytes64,
}

impl RamSize {
    pub fn byte_len(self) -> usize {
        match self {
            RamSize::None => 0,
            RamSize::Kilobytes2 => 0x0800,
            RamSize::Kilobytes8 => 0x2000,
            RamSize::Kilobytes32 => 0x8000,
            RamSize::Kilobytes128 => 0x20000,
            RamSize::Kilobytes64 => 0x10000,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, CartridgeError> {
        match byte {
            0x00 => Ok(RamSize::None),
            0x01 => Ok(RamSize::Kilobytes2),
            0x02 => Ok(RamSize::Kilobytes8),
            0x03 => Ok(RamSize::Kilobytes32),
            0x04 => Ok(RamSize::Kilobytes128),
            0x05 => Ok(RamSize::Kilobytes64),
            _ => Err(CartridgeError::UnsupportedCartridge { type_code: byte }),
        }
    }
}

impl CartridgeType {
    fn from_byte(byte: u8) -> Result<Self, CartridgeError> {
        match byte {
            0x00 => Ok(CartridgeType::RomOnly),
            0x01 => Ok(CartridgeType::Mbc1),
            0x02 => Ok(CartridgeType::Mbc1Ram),
            0x03 => Ok(CartridgeType::Mbc1RamBattery),
            0x0F => Ok(CartridgeType::Mbc3TimerBattery),
            0x10 => Ok(CartridgeType::Mbc3TimerRamBattery),
            0x11 => Ok(CartridgeType::Mbc3),
            0x12 => Ok(CartridgeType::Mbc3Ram),
            0x13 => Ok(CartridgeType::Mbc3RamBattery),
            0x19 => Ok(CartridgeType::Mbc5),
            0x1A => Ok(CartridgeType::Mbc5Ram),
            0x1B => Ok(CartridgeType::Mbc5RamBattery),
            0x1C => Ok(CartridgeType::Mbc5Rumble),
            0x1D => Ok(CartridgeType::Mbc5RumbleRam),
            0x1E => Ok(CartridgeType::Mbc5RumbleRamBattery),
            _ => Err(CartridgeError::UnsupportedCartridge { type_code: byte }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    pub title: String,
    pub cartridge_type: CartridgeType,
    pub rom_size: RomSize,
    pub ram_size: RamSize,
}

impl Header {
    pub fn parse(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() < 0x014A {
            return Err(CartridgeError::TruncatedRom {
                expected: 0x014A,
                actual: rom.len(),
            });
        }

        let cartridge_type = CartridgeType::from_byte(rom[0x0147])?;
        let rom_size = RomSize::from_byte(rom[0x0148])?;
        let ram_size = RamSize::from_byte(rom[0x0149])?;

        if rom.len() < rom_size.byte_len() {
            return Err(CartridgeError::TruncatedRom {
                expected: rom_size.byte_len(),
                actual: rom.len(),
            });
        }

        let title_bytes = &rom[0x0134..0x0144];
        let title_end = title_bytes.iter().position(|&b| b == 0).unwrap_or(title_bytes.len());
        let title = String::from_utf8_lossy(&title_bytes[..title_end]).into_owned();

        Ok(Header {
            title,
            cartridge_type,
            rom_size,
            ram_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rom(type_code: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = type_code;
        rom[0x0148] = rom_code;
        rom[0x0149] = ram_code;
        rom
    }

    #[test]
    fn parses_title_and_codes() {
        let mut rom = make_rom(0x00, 0x00, 0x00);
        rom[0x0134..0x0134 + 6].copy_from_slice(b"TETRIS");
        let header = Header::parse(&rom).unwrap();
        assert_eq!(header.title, "TETRIS");
        assert_eq!(header.cartridge_type, CartridgeType::RomOnly);
    }

    #[test]
    fn ram_size_0x01_is_2_kib() {
        let rom = make_rom(0x00, 0x00, 0x01);
        let header = Header::parse(&rom).unwrap();
        assert_eq!(header.ram_size, RamSize::Kilobytes2);
        assert_eq!(header.ram_size.byte_len(), 0x0800);
    }

    #[test]
    fn unsupported_type_code_fails() {
        let rom = make_rom(0x05, 0x00, 0x00); // MBC2, not in the supported set
        assert!(matches!(
            Header::parse(&rom),
            Err(CartridgeError::UnsupportedCartridge { type_code: 0x05 })
        ));
    }

    #[test]
    fn truncated_rom_fails() {
        let rom = vec![0u8; 0x0100];
        assert!(matches!(Header::parse(&rom), Err(CartridgeError::TruncatedRom { .. })));
    }
}
