use std::io::Write;
use std::path::{Path, PathBuf};

use gb_core::cartridge::Cartridge;
use gb_core::gb::GameBoy;

#[derive(Debug)]
enum Command {
    Run(RunArgs),
    Suite(SuiteArgs),
    SelfTest(SelfTestArgs),
}

#[derive(Debug)]
struct RunArgs {
    rom_path: PathBuf,
    max_frames: Option<u64>,
    max_cycles: Option<u64>,
    headless: bool,
    verbose: bool,
    trace_cpu: bool,
    trace_ppu: bool,
    log_serial: bool,
    print_serial: bool,
    print_vram: bool,
}

#[derive(Debug)]
struct SuiteArgs {
    rom_dir: PathBuf,
    rom_paths: Vec<PathBuf>,
    max_frames: Option<u64>,
    max_cycles: Option<u64>,
    pass_text: Vec<String>,
    fail_text: Vec<String>,
    print_serial: bool,
    print_vram: bool,
}

#[derive(Debug)]
struct SelfTestArgs {
    max_cycles: Option<u64>,
    pass_text: Vec<String>,
    fail_text: Vec<String>,
    print_serial: bool,
    print_vram: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum RomResult {
    Pass,
    Fail,
    Timeout,
}

impl RomResult {
    fn as_str(self) -> &'static str {
        match self {
            RomResult::Pass => "PASS",
            RomResult::Fail => "FAIL",
            RomResult::Timeout => "TIMEOUT",
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage:\n\
  gb-cli <rom.gb> [--frames N] [--cycles N] [--headless] [-v|--verbose]\n\
        [--trace-cpu] [--trace-ppu] [--log-serial] [--print-serial]\n\
  gb-cli run <rom.gb> [--frames N] [--cycles N] [--headless] [-v|--verbose]\n\
        [--trace-cpu] [--trace-ppu] [--log-serial] [--print-serial]\n\
  gb-cli suite [--rom-dir DIR] [--frames N] [--cycles N] [--pass-text S] [--fail-text S] [--print-serial] [ROM...]+\n\
  gb-cli self-test [--cycles N] [--pass-text S] [--fail-text S] [--print-serial]\n\
\n\
Commands:\n\
  run        Run a single ROM (default if no subcommand is given).\n\
  suite      Discover and run a set of ROMs (default dir: ./roms).\n\
  self-test  Run a tiny built-in ROM that prints 'Passed' via serial.\n\
\n\
Optional debug output (run command):\n\
  -v, --verbose   Print ROM metadata + run summary (stderr).\n\
  --trace-cpu     Print per-instruction CPU trace (stderr).\n\
  --trace-ppu     Print PPU LY/mode transitions (stderr).\n\
  --log-serial    Stream serial output to stdout as it is produced.\n\
  --print-serial  Print captured serial output at the end.\n\
\n\
Suite pass/fail detection:\n\
  - Captures bytes written to SB (0xFF01) when SC (0xFF02) is written with bit7 set\n\
    (common in blargg/mooneye test ROMs).\n\
  - Marks PASS if output contains any --pass-text (default: 'passed').\n\
  - Marks FAIL if output contains any --fail-text (default: 'failed', 'fail').\n\
  - Otherwise stops at limits and marks TIMEOUT.\n"
    );
    eprintln!("  --print-vram    Print scraped BG tilemap text on FAIL/TIMEOUT.");
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return Err("missing args".to_string());
    }

    match args[0].as_str() {
        "-h" | "--help" => {
            print_usage();
            std::process::exit(0);
        }
        "run" => parse_run_args(&args[1..]).map(Command::Run),
        "suite" => parse_suite_args(&args[1..]).map(Command::Suite),
        "self-test" => parse_self_test_args(&args[1..]).map(Command::SelfTest),
        _ => parse_run_args(&args).map(Command::Run),
    }
}

fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    if args.is_empty() {
        return Err("missing ROM path".to_string());
    }

    let mut it = args.iter();
    let rom_path = PathBuf::from(it.next().unwrap());

    let mut max_frames: Option<u64> = None;
    let mut max_cycles: Option<u64> = None;
    let mut headless = false;
    let mut verbose = false;
    let mut trace_cpu = false;
    let mut trace_ppu = false;
    let mut log_serial = false;
    let mut print_serial = false;
    let mut print_vram = false;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--headless" => headless = true,
            "-v" | "--verbose" => verbose = true,
            "--trace-cpu" => trace_cpu = true,
            "--trace-ppu" => trace_ppu = true,
            "--log-serial" => log_serial = true,
            "--print-serial" => print_serial = true,
            "--print-vram" => print_vram = true,
            "--frames" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--frames requires a value".to_string())?;
                max_frames = Some(
                    v.parse::<u64>()
                        .map_err(|_| format!("invalid --frames value: {v}"))?,
                );
            }
            "--cycles" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--cycles requires a value".to_string())?;
                max_cycles = Some(
                    v.parse::<u64>()
                        .map_err(|_| format!("invalid --cycles value: {v}"))?,
                );
            }
            _ if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            _ => return Err(format!("unexpected extra positional arg: {arg}")),
        }
    }

    Ok(RunArgs {
        rom_path,
        max_frames,
        max_cycles,
        headless,
        verbose,
        trace_cpu,
        trace_ppu,
        log_serial,
        print_serial,
        print_vram,
    })
}

fn parse_suite_args(args: &[String]) -> Result<SuiteArgs, String> {
    let mut rom_dir = PathBuf::from("roms");
    let mut rom_paths: Vec<PathBuf> = Vec::new();
    let mut max_frames: Option<u64> = None;
    let mut max_cycles: Option<u64> = Some(300_000_000);
    let mut pass_text = vec!["passed".to_string()];
    let mut fail_text = vec!["failed".to_string(), "fail".to_string()];
    let mut print_serial = false;
    let mut print_vram = false;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--rom-dir" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--rom-dir requires a value".to_string())?;
                rom_dir = PathBuf::from(v);
            }
            "--frames" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--frames requires a value".to_string())?;
                max_frames = Some(
                    v.parse::<u64>()
                        .map_err(|_| format!("invalid --frames value: {v}"))?,
                );
            }
            "--cycles" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--cycles requires a value".to_string())?;
                max_cycles = Some(
                    v.parse::<u64>()
                        .map_err(|_| format!("invalid --cycles value: {v}"))?,
                );
            }
            "--pass-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--pass-text requires a value".to_string())?;
                pass_text.push(v.to_string());
            }
            "--fail-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--fail-text requires a value".to_string())?;
                fail_text.push(v.to_string());
            }
            "--print-serial" => print_serial = true,
            "--print-vram" => print_vram = true,
            _ if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            _ => rom_paths.push(PathBuf::from(arg)),
        }
    }

    Ok(SuiteArgs {
        rom_dir,
        rom_paths,
        max_frames,
        max_cycles,
        pass_text,
        fail_text,
        print_serial,
        print_vram,
    })
}

fn parse_self_test_args(args: &[String]) -> Result<SelfTestArgs, String> {
    let mut max_cycles: Option<u64> = Some(5_000_000);
    let mut pass_text = vec!["passed".to_string()];
    let mut fail_text = vec!["failed".to_string(), "fail".to_string()];
    let mut print_serial = false;
    let mut print_vram = false;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--cycles" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--cycles requires a value".to_string())?;
                max_cycles = Some(
                    v.parse::<u64>()
                        .map_err(|_| format!("invalid --cycles value: {v}"))?,
                );
            }
            "--pass-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--pass-text requires a value".to_string())?;
                pass_text.push(v.to_string());
            }
            "--fail-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--fail-text requires a value".to_string())?;
                fail_text.push(v.to_string());
            }
            "--print-serial" => print_serial = true,
            "--print-vram" => print_vram = true,
            _ if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            _ => return Err(format!("unexpected positional arg: {arg}")),
        }
    }

    Ok(SelfTestArgs {
        max_cycles,
        pass_text,
        fail_text,
        print_serial,
        print_vram,
    })
}

fn discover_roms(dir: &Path) -> Result<Vec<PathBuf>, String> {
    fn visit(out: &mut Vec<PathBuf>, p: &Path) -> Result<(), String> {
        let rd = std::fs::read_dir(p)
            .map_err(|e| format!("failed to read ROM directory {}: {e}", p.display()))?;
        for ent in rd {
            let ent = ent.map_err(|e| format!("failed to read entry in {}: {e}", p.display()))?;
            let path = ent.path();
            if path.is_dir() {
                visit(out, &path)?;
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if matches!(ext.to_ascii_lowercase().as_str(), "gb" | "gbc") {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    visit(&mut out, dir)?;
    out.sort();
    Ok(out)
}

fn contains_any(haystack_lower: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack_lower.contains(&n.to_ascii_lowercase()))
}

fn decode_blargg_screen_char(tile_id: u8) -> u8 {
    // Some GB test ROMs display ASCII directly by putting character codes in the
    // BG tilemap; many also set the high bit, so mask it off.
    let c = tile_id & 0x7F;
    if (0x20..=0x7E).contains(&c) {
        c
    } else {
        b' '
    }
}

fn scrape_bg_tilemap_text(vram: &[u8], map_offset: usize) -> String {
    const MAP_W: usize = 32;
    const MAP_H: usize = 32;
    let mut out: Vec<u8> = Vec::with_capacity(MAP_W * MAP_H + MAP_H);
    for y in 0..MAP_H {
        for x in 0..MAP_W {
            let i = y * MAP_W + x;
            out.push(decode_blargg_screen_char(vram[map_offset + i]));
        }
        out.push(b'\n');
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn scrape_all_bg_text(vram: &[u8]) -> String {
    // BG tilemaps live at 0x9800 and 0x9C00, offset 0x1800/0x1C00 into VRAM.
    let t9800 = scrape_bg_tilemap_text(vram, 0x1800);
    let t9c00 = scrape_bg_tilemap_text(vram, 0x1C00);
    format!("{t9800}\n{t9c00}")
}

fn run_for_serial_result(
    cart: Cartridge,
    max_frames: Option<u64>,
    max_cycles: Option<u64>,
    pass_text: &[String],
    fail_text: &[String],
    print_vram: bool,
) -> (RomResult, Vec<u8>, u64, u64) {
    let mut gb = GameBoy::new(cart);

    let mut frames: u64 = 0;
    let mut cycles: u64 = 0;
    let mut output: Vec<u8> = Vec::new();

    loop {
        if max_frames.is_some_and(|m| frames >= m) || max_cycles.is_some_and(|m| cycles >= m) {
            let screen_lower = scrape_all_bg_text(&gb.bus.vram).to_ascii_lowercase();
            if contains_any(&screen_lower, fail_text) {
                if print_vram {
                    println!(
                        "--- VRAM BG tilemap (on FAIL) ---\n{}",
                        scrape_all_bg_text(&gb.bus.vram)
                    );
                }
                return (RomResult::Fail, output, frames, cycles);
            }
            if contains_any(&screen_lower, pass_text) {
                return (RomResult::Pass, output, frames, cycles);
            }
            if print_vram {
                println!(
                    "--- VRAM BG tilemap (on TIMEOUT) ---\n{}",
                    scrape_all_bg_text(&gb.bus.vram)
                );
            }
            return (RomResult::Timeout, output, frames, cycles);
        }

        cycles += gb.step() as u64;

        let new = gb.take_serial_output();
        if !new.is_empty() {
            output.extend_from_slice(&new);
            let out_lower = String::from_utf8_lossy(&output).to_ascii_lowercase();
            if contains_any(&out_lower, fail_text) {
                if print_vram {
                    println!(
                        "--- VRAM BG tilemap (on FAIL) ---\n{}",
                        scrape_all_bg_text(&gb.bus.vram)
                    );
                }
                return (RomResult::Fail, output, frames, cycles);
            }
            if contains_any(&out_lower, pass_text) {
                return (RomResult::Pass, output, frames, cycles);
            }
        }

        if gb.bus.ppu.frame_ready() {
            frames += 1;
            gb.bus.ppu.clear_frame_ready();

            if frames <= 3 || frames % 5 == 0 {
                let screen_lower = scrape_all_bg_text(&gb.bus.vram).to_ascii_lowercase();
                if contains_any(&screen_lower, fail_text) {
                    if print_vram {
                        println!(
                            "--- VRAM BG tilemap (on FAIL) ---\n{}",
                            scrape_all_bg_text(&gb.bus.vram)
                        );
                    }
                    return (RomResult::Fail, output, frames, cycles);
                }
                if contains_any(&screen_lower, pass_text) {
                    return (RomResult::Pass, output, frames, cycles);
                }
            }
        }
    }
}

fn make_self_test_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];

    // Jump over the cartridge header area (0x0100..=0x014F).
    let start = 0x0150usize;
    rom[0x0100] = 0xC3; // JP a16
    rom[0x0101] = (start & 0xFF) as u8;
    rom[0x0102] = (start >> 8) as u8;

    let mut pc = start;
    for &b in b"Passed\n" {
        rom[pc] = 0x3E; // LD A, d8
        rom[pc + 1] = b;
        pc += 2;
        rom[pc] = 0xEA; // LD (a16), A  ; SB (FF01)
        rom[pc + 1] = 0x01;
        rom[pc + 2] = 0xFF;
        pc += 3;
        rom[pc] = 0x3E; // LD A, d8 (0x81)
        rom[pc + 1] = 0x81;
        pc += 2;
        rom[pc] = 0xEA; // LD (a16), A  ; SC (FF02)
        rom[pc + 1] = 0x02;
        rom[pc + 2] = 0xFF;
        pc += 3;
    }
    rom[pc] = 0x18; // JR -2 (infinite loop)
    rom[pc + 1] = 0xFE;

    rom[0x0147] = 0x00; // ROM only
    rom[0x0148] = 0x00; // 32 KiB
    rom[0x0149] = 0x00; // no RAM

    rom
}

fn run_single(args: RunArgs) -> Result<i32, String> {
    let rom = std::fs::read(&args.rom_path)
        .map_err(|e| format!("failed to read ROM {}: {e}", args.rom_path.display()))?;
    let cart = Cartridge::from_rom(rom).map_err(|e| format!("invalid ROM: {e:?}"))?;

    if args.verbose {
        eprintln!(
            "Loaded ROM: {} ({:?}, {:?}, {:?})",
            args.rom_path.display(),
            cart.header.cartridge_type,
            cart.header.rom_size,
            cart.header.ram_size
        );
    }

    let mut gb = GameBoy::new(cart);

    let mut frames: u64 = 0;
    let mut cycles: u64 = 0;

    let snap = gb.debug_snapshot();
    let mut last_ly = snap.ly;
    let mut last_mode = snap.stat & 0x03;

    let mut serial_out: Vec<u8> = Vec::new();
    let mut stdout = std::io::stdout();

    loop {
        if args.max_frames.is_some_and(|m| frames >= m)
            || args.max_cycles.is_some_and(|m| cycles >= m)
        {
            if args.print_vram {
                println!(
                    "--- VRAM BG tilemap (on TIMEOUT) ---\n{}",
                    scrape_all_bg_text(&gb.bus.vram)
                );
            }
            break;
        }

        if args.trace_cpu {
            let snap = gb.debug_snapshot();
            eprintln!(
                "CYC={cycles:010} PC={:04X} OP={:02X} AF={:04X} BC={:04X} DE={:04X} HL={:04X} \
                 SP={:04X} IME={} HALT={} IE={:02X} IF={:02X}",
                snap.pc,
                snap.last_opcode,
                snap.af,
                snap.bc,
                snap.de,
                snap.hl,
                snap.sp,
                snap.ime,
                snap.halted,
                snap.ie,
                snap.if_,
            );
        }

        cycles += gb.step() as u64;

        if args.trace_ppu {
            let snap = gb.debug_snapshot();
            let mode = snap.stat & 0x03;
            if snap.ly != last_ly || mode != last_mode {
                eprintln!("PPU ly={} mode={mode}", snap.ly);
                last_ly = snap.ly;
                last_mode = mode;
            }
        }

        let new = gb.take_serial_output();
        if !new.is_empty() {
            if args.log_serial {
                stdout
                    .write_all(&new)
                    .map_err(|e| format!("failed to write serial output: {e}"))?;
                stdout
                    .flush()
                    .map_err(|e| format!("failed to flush serial output: {e}"))?;
            }
            if args.print_serial {
                serial_out.extend_from_slice(&new);
            }
        }

        if gb.bus.ppu.frame_ready() {
            frames += 1;
            gb.bus.ppu.clear_frame_ready();

            if args.verbose && !args.headless {
                let checksum: u64 = gb
                    .bus
                    .ppu
                    .framebuffer()
                    .iter()
                    .fold(0u64, |acc, &px| acc.wrapping_add(px as u64));
                eprintln!("frame {frames} (cycles={cycles}) fb_checksum=0x{checksum:016x}");
            }
        }
    }

    if args.verbose {
        eprintln!("Done: frames={frames} cycles={cycles}");
    }
    if args.print_serial && !args.log_serial && !serial_out.is_empty() {
        print!("{}", String::from_utf8_lossy(&serial_out));
    }

    Ok(0)
}

fn run_suite(args: SuiteArgs) -> Result<i32, String> {
    let mut roms: Vec<PathBuf> = if args.rom_paths.is_empty() {
        discover_roms(&args.rom_dir)?
    } else {
        args.rom_paths
    };
    roms.sort();

    if roms.is_empty() {
        println!("No ROMs found. Use: gb-cli suite --rom-dir <dir>  (or run: gb-cli self-test)");
        return Ok(1);
    }

    let mut pass = 0usize;
    let mut fail = 0usize;
    let mut timeout = 0usize;

    for path in roms {
        let rom = match std::fs::read(&path) {
            Ok(r) => r,
            Err(e) => {
                println!("FAIL {} (read error: {e})", path.display());
                fail += 1;
                continue;
            }
        };
        let cart = match Cartridge::from_rom(rom) {
            Ok(c) => c,
            Err(e) => {
                println!("FAIL {} (invalid ROM: {e:?})", path.display());
                fail += 1;
                continue;
            }
        };

        let (res, serial, frames, cycles) = run_for_serial_result(
            cart,
            args.max_frames,
            args.max_cycles,
            &args.pass_text,
            &args.fail_text,
            args.print_vram,
        );

        match res {
            RomResult::Pass => pass += 1,
            RomResult::Fail => fail += 1,
            RomResult::Timeout => timeout += 1,
        }

        println!(
            "{} {} (frames={frames} cycles={cycles})",
            res.as_str(),
            path.display()
        );

        if args.print_serial && !serial.is_empty() {
            print!("{}", String::from_utf8_lossy(&serial));
            if !serial.ends_with(b"\n") {
                println!();
            }
        }
    }

    println!("Summary: {pass} passed, {fail} failed, {timeout} timed out");

    if fail == 0 && timeout == 0 {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn run_self_test(args: SelfTestArgs) -> Result<i32, String> {
    let rom = make_self_test_rom();
    let cart = Cartridge::from_rom(rom).map_err(|e| format!("invalid ROM: {e:?}"))?;

    let (res, serial, frames, cycles) = run_for_serial_result(
        cart,
        None,
        args.max_cycles,
        &args.pass_text,
        &args.fail_text,
        args.print_vram,
    );

    println!(
        "{} self-test (frames={frames} cycles={cycles})",
        res.as_str()
    );
    if args.print_serial && !serial.is_empty() {
        print!("{}", String::from_utf8_lossy(&serial));
        if !serial.ends_with(b"\n") {
            println!();
        }
    }

    Ok(if res == RomResult::Pass { 0 } else { 1 })
}

fn run() -> Result<i32, String> {
    let cmd = parse_args()?;
    match cmd {
        Command::Run(a) => run_single(a),
        Command::Suite(a) => run_suite(a),
        Command::SelfTest(a) => run_self_test(a),
    }
}

fn main() {
    env_logger::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            std::process::exit(1);
        }
    }
}
