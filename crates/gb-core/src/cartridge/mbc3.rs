use crate::cartridge::mbc::Mbc;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

/// Live real-time-clock sub-state (§3, §4.6). `days` is a 9-bit counter; overflow
/// past 0x1FF sets the sticky `carry` flag instead of wrapping silently.
#[derive(Clone, Copy, Debug, Default)]
struct RtcState {
    seconds: u8,
    minutes: u8,
    hours: u8,
    days: u16,
    carry: bool,
    halt: bool,
}

impl RtcState {
    fn advance(&mut self, elapsed: u64) {
        if self.halt || elapsed == 0 {
            return;
        }
        let mut secs = self.seconds as u64 + elapsed;
        self.seconds = (secs % 60) as u8;
        secs /= 60;
        let mut mins = self.minutes as u64 + secs;
        self.minutes = (mins % 60) as u8;
        mins /= 60;
        let mut hrs = self.hours as u64 + mins;
        self.hours = (hrs % 24) as u8;
        hrs /= 24;
        let mut days = self.days as u64 + hrs;
        if days > 0x1FF {
            self.carry = true;
            days %= 0x200;
        }
        self.days = days as u16;
    }
}

pub struct Mbc3 {
    ram_enabled: bool,
    rom_bank: u8,
    ram_rtc_select: u8,
    rtc: RtcState,
    latched: RtcState,
    latch_pending: bool,
    last_unix_seconds: u64,
    dirty: bool,
}

impl Mbc3 {
    pub fn new() -> Self {
        Mbc3 {
            ram_enabled: false,
            rom_bank: 1,
            ram_rtc_select: 0,
            rtc: RtcState::default(),
            latched: RtcState::default(),
            latch_pending: false,
            last_unix_seconds: now_unix_seconds(),
            dirty: false,
        }
    }

    /// Advances the live RTC by the wall-clock delta since the last access. A host
    /// clock that appears to have gone backward resets the reference point without
    /// advancing the clock (§7).
    fn sync_rtc(&mut self) {
        let now = now_unix_seconds();
        if now < self.last_unix_seconds {
            self.last_unix_seconds = now;
            return;
        }
        let elapsed = now - self.last_unix_seconds;
        self.rtc.advance(elapsed);
        self.last_unix_seconds = now;
    }

    fn write_latch(&mut self, val: u8) {
        match val {
            0x00 => self.latch_pending = true,
            0x01 if self.latch_pending => {
                self.sync_rtc();
                self.latched = self.rtc;
                self.latch_pending = false;
            }
            _ => self.latch_pending = false,
        }
    }

    fn read_rtc_register(&self) -> u8 {
        match self.ram_rtc_select {
            0x08 => self.latched.seconds,
            0x09 => self.latched.minutes,
            0x0A => self.latched.hours,
            0x0B => (self.latched.days & 0xFF) as u8,
            0x0C => {
                let day_high = ((self.latched.days >> 8) & 0x01) as u8;
                day_high | ((self.latched.halt as u8) << 6) | ((self.latched.carry as u8) << 7)
            }
            _ => 0xFF,
        }
    }

    fn write_rtc_register(&mut self, val: u8) {
        self.sync_rtc();
        match self.ram_rtc_select {
            0x08 => self.rtc.seconds = val % 60,
            0x09 => self.rtc.minutes = val % 60,
            0x0A => self.rtc.hours = val % 24,
            0x0B => self.rtc.days = (self.rtc.days & 0x100) | val as u16,
            0x0C => {
                self.rtc.days = (self.rtc.days & 0x00FF) | (((val & 0x01) as u16) << 8);
                self.rtc.halt = (val & 0x40) != 0;
                self.rtc.carry = (val & 0x80) != 0;
            }
            _ => {}
        }
        self.dirty = true;
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Default for Mbc3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mbc for Mbc3 {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        let bank_size = 0x4000;
        let bank_count = (rom.len() / bank_size).max(1);

        let offset = if addr < 0x4000 {
            // 0x0000..=0x3FFF: fixed bank 0
            addr as usize
        } else {
            // 0x4000..=0x7FFF: switchable bank
            let bank = (self.rom_bank as usize).max(1) % bank_count;
            bank * bank_size + (addr as usize - bank_size)
        };

        rom.get(offset).copied().unwrap_or(0xFF)
    }

    fn write_rom(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => {
                self.ram_enabled = (val & 0x0F) == 0x0A;
            }
            0x2000..=0x3FFF => {
                self.rom_bank = val & 0x7F;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
            }
            0x4000..=0x5FFF => {
                self.ram_rtc_select = val & 0x0F;
            }
            0x6000..=0x7FFF => {
                self.write_latch(val);
            }
            _ => {}
        }
    }

    fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }

        match self.ram_rtc_select {
            0x00..=0x03 => {
                if ram.is_empty() {
                    return 0xFF;
                }
                let bank_size = 0x2000;
                let bank_count = (ram.len() / bank_size).max(1);
                let bank = (self.ram_rtc_select as usize) % bank_count;
                let offset = bank * bank_size + addr.wrapping_sub(0xA000) as usize;
                ram.get(offset).copied().unwrap_or(0xFF)
            }
            0x08..=0x0C => self.read_rtc_register(),
            _ => 0xFF,
        }
    }

    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        if !self.ram_enabled {
            return;
        }

        match self.ram_rtc_select {
            0x00..=0x03 => {
                if ram.is_empty() {
                    return;
                }
                let bank_size = 0x2000;
                let bank_count = (ram.len() / bank_size).max(1);
                let bank = (self.ram_rtc_select as usize) % bank_count;
                let offset = bank * bank_size + addr.wrapping_sub(0xA000) as usize;
                if let Some(entry) = ram.get_mut(offset) {
                    *entry = val;
                    self.dirty = true;
                }
            }
            0x08..=0x0C => self.write_rtc_register(val),
            _ => {}
        }
    }

    fn dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn export_metadata(&self) -> Option<serde_json::Value> {
        Some(json!({
            "type": "mbc3_rtc_v1",
            "rtc": {
                "seconds": self.rtc.seconds,
                "minutes": self.rtc.minutes,
                "hours": self.rtc.hours,
                "days": self.rtc.days,
                "carry": self.rtc.carry,
                "halt": self.rtc.halt,
                "lastUnixSeconds": self.last_unix_seconds,
            }
        }))
    }

    fn import_metadata(&mut self, value: &serde_json::Value) {
        let Some(rtc) = value.get("rtc") else {
            return;
        };
        self.rtc.seconds = rtc.get("seconds").and_then(|v| v.as_u64()).unwrap_or(0) as u8 % 60;
        self.rtc.minutes = rtc.get("minutes").and_then(|v| v.as_u64()).unwrap_or(0) as u8 % 60;
        self.rtc.hours = rtc.get("hours").and_then(|v| v.as_u64()).unwrap_or(0) as u8 % 24;
        self.rtc.days = rtc.get("days").and_then(|v| v.as_u64()).unwrap_or(0) as u16 & 0x1FF;
        self.rtc.carry = rtc.get("carry").and_then(|v| v.as_bool()).unwrap_or(false);
        self.rtc.halt = rtc.get("halt").and_then(|v| v.as_bool()).unwrap_or(false);
        self.last_unix_seconds = rtc
            .get("lastUnixSeconds")
            .and_then(|v| v.as_u64())
            .unwrap_or_else(now_unix_seconds);
        // Importing state invalidates any previously latched snapshot.
        self.latched = self.rtc;
        self.latch_pending = false;
    }
}
