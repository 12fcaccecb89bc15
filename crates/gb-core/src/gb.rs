use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::input::Button;
use crate::ppu::Framebuffer;

/// A frame-ready callback invoked with the completed 160x144 ARGB buffer.
pub type FrameObserver = Box<dyn FnMut(&Framebuffer)>;

/// PC/SP/register/flag snapshot for a host debugger or trace log (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugSnapshot {
    pub pc: u16,
    pub sp: u16,
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub ime: bool,
    pub halted: bool,
    pub ie: u8,
    pub if_: u8,
    pub ly: u8,
    pub lcdc: u8,
    pub stat: u8,
    pub cycles: u64,
    pub last_opcode: u8,
}

/// Top-level orchestrator: owns the CPU and bus, applies the DMG power-on
/// reset sequence, and fans frame-ready events out to registered observers
/// (§4.11). Everything host-specific (display, audio sink, save files) stays
/// outside this type.
pub struct GameBoy {
    pub cpu: Cpu,
    pub bus: Bus,
    cycles: u64,
    frames_completed: u64,
    frame_observers: Vec<FrameObserver>,
}

impl GameBoy {
    pub fn new(cart: Cartridge) -> Self {
        let mut gb = Self {
            cpu: Cpu::new(),
            bus: Bus::new(cart),
            cycles: 0,
            frames_completed: 0,
            frame_observers: Vec::new(),
        };
        gb.reset();
        gb
    }

    /// Applies the documented DMG (no-boot-ROM) power-on register values.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.cpu.a = 0x01;
        self.cpu.f = 0xB0;
        self.cpu.b = 0x00;
        self.cpu.c = 0x13;
        self.cpu.d = 0x00;
        self.cpu.e = 0xD8;
        self.cpu.h = 0x01;
        self.cpu.l = 0x4D;
        self.cpu.sp = 0xFFFE;
        self.cpu.pc = 0x0100;

        self.bus.write8(0xFFFF, 0x00);
        self.bus.write8(0xFF0F, 0x00);

        const IO_INIT: &[(u16, u8)] = &[
            (0xFF00, 0xCF),
            (0xFF05, 0x00),
            (0xFF06, 0x00),
            (0xFF07, 0x00),
            (0xFF10, 0x80),
            (0xFF11, 0xBF),
            (0xFF12, 0xF3),
            (0xFF14, 0xBF),
            (0xFF16, 0x3F),
            (0xFF17, 0x00),
            (0xFF19, 0xBF),
            (0xFF1A, 0x7F),
            (0xFF1B, 0xFF),
            (0xFF1C, 0x9F),
            (0xFF1E, 0xBF),
            (0xFF20, 0xFF),
            (0xFF21, 0x00),
            (0xFF22, 0x00),
            (0xFF23, 0xBF),
            (0xFF24, 0x77),
            (0xFF25, 0xF3),
            (0xFF26, 0xF1),
            (0xFF40, 0x91),
            (0xFF42, 0x00),
            (0xFF43, 0x00),
            (0xFF45, 0x00),
            (0xFF47, 0xFC),
            (0xFF48, 0xFF),
            (0xFF49, 0xFF),
            (0xFF4A, 0x00),
            (0xFF4B, 0x00),
        ];
        for &(addr, val) in IO_INIT {
            self.bus.write8(addr, val);
        }

        self.cycles = 0;
    }

    pub fn step(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.bus);
        self.cycles += cycles as u64;
        if self.bus.ppu.frame_ready() {
            self.bus.ppu.clear_frame_ready();
            self.frames_completed += 1;
            let fb = self.bus.ppu.framebuffer();
            for observer in &mut self.frame_observers {
                observer(fb);
            }
        }
        cycles
    }

    /// Drives execution until at least `cycles` have elapsed. The final
    /// instruction's duration may carry the total modestly past the budget.
    pub fn run_for(&mut self, cycles: u32) {
        let target = self.cycles + cycles as u64;
        while self.cycles < target {
            self.step();
        }
    }

    /// Drives execution until the pixel unit signals a completed frame.
    pub fn step_frame(&mut self) {
        let start = self.frames_completed;
        while self.frames_completed == start {
            self.step();
        }
    }

    pub fn run_frame(&mut self) {
        self.step_frame();
    }

    /// Registers a callback invoked with the framebuffer every time a frame
    /// completes.
    pub fn add_frame_observer(&mut self, observer: FrameObserver) {
        self.frame_observers.push(observer);
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.bus.set_joypad_button(button, pressed);
    }

    /// Drains up to `max_frames` interleaved stereo sample pairs from the
    /// audio ring buffer.
    pub fn drain_audio(&mut self, max_frames: usize) -> Vec<f32> {
        self.bus.apu.take_samples(max_frames)
    }

    /// Cumulative ASCII bytes transmitted over the serial port so far.
    pub fn take_serial_output(&mut self) -> Vec<u8> {
        self.bus.serial.take_output()
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        DebugSnapshot {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            af: u16::from_be_bytes([self.cpu.a, self.cpu.f]),
            bc: u16::from_be_bytes([self.cpu.b, self.cpu.c]),
            de: u16::from_be_bytes([self.cpu.d, self.cpu.e]),
            hl: u16::from_be_bytes([self.cpu.h, self.cpu.l]),
            ime: self.cpu.ime,
            halted: self.cpu.halted,
            ie: self.bus.interrupts.read_ie(),
            if_: self.bus.interrupts.read_if(),
            ly: self.bus.io[0x44],
            lcdc: self.bus.io[0x40],
            stat: self.bus.io[0x41],
            cycles: self.cycles,
            last_opcode: self.cpu.last_opcode,
        }
    }

    /// RAM content to persist for cartridges with battery-backed RAM, if any.
    pub fn export_ram(&self) -> Option<Vec<u8>> {
        self.bus.cart.export_ram()
    }

    pub fn import_ram(&mut self, data: &[u8]) {
        self.bus.cart.import_ram(data);
    }

    /// Opaque mapper metadata to persist alongside RAM (MBC3 RTC state).
    pub fn export_metadata(&self) -> Option<serde_json::Value> {
        self.bus.cart.export_metadata()
    }

    pub fn import_metadata(&mut self, value: &serde_json::Value) {
        self.bus.cart.import_metadata(value);
    }
}
