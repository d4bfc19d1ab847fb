use clap::{ErrorKind, Parser};
use r65816::device::{Addr24, Device};
use r65816::timing::RunExit;
use std::path::PathBuf;

mod config;

use config::Config;

#[derive(Parser, Clone)]
#[clap(
    version = clap::crate_version!(),
)]
struct Options {
    /// Raw program image, installed at the configured base address
    #[clap(parse(from_os_str))]
    input: PathBuf,
    /// Configuration file (default: the well-known locations)
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Additional breakpoint, as a hex 24-bit address (repeatable)
    #[clap(short, long)]
    breakpoint: Vec<String>,
    /// Single-step, printing each instruction before it executes
    #[clap(short, long)]
    step: bool,
    #[clap(short, long)]
    verbose: bool,
}

fn error<E: std::fmt::Display>(kind: ErrorKind, val: E) -> ! {
    clap::app_from_crate!().error(kind, val).exit()
}

fn print_registers(dev: &Device) {
    let regs = &dev.cpu.regs;
    let mut flags = String::new();
    for (i, name) in "nvmxdizc".chars().enumerate() {
        let set = regs.status.0 & (0x80 >> i) != 0;
        flags.push(if set { name.to_ascii_uppercase() } else { name });
    }
    println!(
        "PB={:02x}, PC={:04x}, A={:04x}, X={:04x}, Y={:04x}, S={:04x}, DP={:04x}, DB={:02x}, flags={} (${:02x}), e={}",
        regs.pc.bank,
        regs.pc.addr,
        regs.a,
        regs.x,
        regs.y,
        regs.sp,
        regs.dp,
        regs.db,
        flags,
        regs.status.0,
        regs.is_emulation as u8,
    );
}

fn build_device(options: &Options, config: &Config) -> Device {
    let image = std::fs::read(&options.input).unwrap_or_else(|err| {
        error(
            ErrorKind::Io,
            format_args!(
                "Could not read file \"{}\" ({})\n",
                options.input.display(),
                err
            ),
        )
    });
    log::debug!("program image of {} bytes", image.len());
    let mut dev = Device::new()
        .unwrap_or_else(|err| error(ErrorKind::InvalidValue, format_args!("{err}\n")));
    for (start, len) in &config.ram {
        dev.memory_mut()
            .install_ram(Addr24::from_linear(*start), *len as usize)
            .unwrap_or_else(|err| error(ErrorKind::InvalidValue, format_args!("{err}\n")));
    }
    dev.memory_mut()
        .install_rom(Addr24::from_linear(config.image_base), &image)
        .unwrap_or_else(|err| error(ErrorKind::InvalidValue, format_args!("{err}\n")));
    dev.reset()
        .unwrap_or_else(|err| error(ErrorKind::InvalidValue, format_args!("{err}\n")));
    dev
}

fn step_loop(dev: &mut Device, budget: u32) {
    while dev.master_cycles < budget {
        if let Some(text) = dev.disassemble(dev.cpu.regs.pc) {
            println!("{}: {}", dev.cpu.regs.pc, text);
        }
        match dev.step() {
            Ok(r65816::instr::Step::Halted(halt)) => {
                println!("[halt] {halt:?}");
                return;
            }
            Ok(_) => (),
            Err(err) => {
                eprintln!("[fault] {err}");
                print_registers(dev);
                std::process::exit(1);
            }
        }
    }
    println!("[done] cycle budget exhausted");
}

fn main() {
    env_logger::init();
    let options = Options::parse();

    let config = match &options.config {
        Some(path) => Config::load_from(path),
        None => Config::load_default_locations(),
    }
    .unwrap_or_else(|err| error(ErrorKind::InvalidValue, format_args!("{err}\n")));
    if options.verbose {
        println!("[info] machine configuration: {config:?}");
    }

    let mut dev = build_device(&options, &config);
    for bp in &config.breakpoints {
        dev.add_breakpoint(Addr24::from_linear(*bp));
    }
    for bp in &options.breakpoint {
        let linear = u32::from_str_radix(bp.trim_start_matches("0x"), 16).unwrap_or_else(|err| {
            error(
                ErrorKind::InvalidValue,
                format_args!("bad breakpoint \"{bp}\" ({err})\n"),
            )
        });
        dev.add_breakpoint(Addr24::from_linear(linear));
    }

    if options.step {
        step_loop(&mut dev, config.budget);
        print_registers(&dev);
        return;
    }

    loop {
        match dev.run(config.budget) {
            RunExit::Breakpoint(addr) => {
                println!("[break] at {addr}");
                if let Some(text) = dev.disassemble(dev.cpu.regs.pc) {
                    println!("{}: {}", dev.cpu.regs.pc, text);
                }
                break;
            }
            RunExit::Fault(err) => {
                eprintln!("[fault] {err}");
                break;
            }
            RunExit::Halted(halt) => {
                println!("[halt] {halt:?}");
                break;
            }
            RunExit::BudgetExhausted => {
                println!("[done] cycle budget exhausted");
                break;
            }
        }
    }
    print_registers(&dev);
}
