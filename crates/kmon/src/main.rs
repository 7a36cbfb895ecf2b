use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use kmon_core::layout::KernelLayout;
use kmon_core::memory::MemorySnapshot;
use kmon_core::monitor::{EofPolicy, LineSource, ScriptSource, StackSource, StdinSource};
use kmon_core::symbols::{DwarfResolver, NullResolver, SymbolResolver, SymbolTable};
use kmon_core::types::{Address, TrapFrame};
use kmon_core::unwind::UnwindLimits;
use kmon_core::{Monitor, MonitorConfig, Registry, Target};
use kmon_utils::{LogFormat, LogLevel, LoggingGuard, debug, info, warn};

/// An interactive kernel monitor with frame-pointer backtraces.
#[derive(Parser, Debug)]
#[command(name = "kmon")]
#[command(version)]
#[command(about = "An interactive kernel monitor with frame-pointer backtraces", long_about = None)]
struct Cli
{
    /// ELF image providing symbols and the kernel layout (default: this executable)
    #[arg(long, value_name = "ELF")]
    image: Option<PathBuf>,

    /// Load bias added to every address in --image
    #[arg(long, value_name = "ADDR", default_value = "0")]
    bias: Address,

    /// `nm` or System.map listing to resolve symbols from instead of DWARF
    #[arg(long, value_name = "FILE")]
    symbols: Option<PathBuf>,

    /// Raw little-endian stack dump to walk instead of the live stack
    #[arg(long, value_name = "FILE", requires_all = ["stack_base", "frame_pointer"])]
    stack_dump: Option<PathBuf>,

    /// Address the first byte of --stack-dump was captured from
    #[arg(long, value_name = "ADDR", requires = "stack_dump")]
    stack_base: Option<Address>,

    /// Innermost frame pointer inside --stack-dump
    #[arg(long, value_name = "ADDR", requires = "stack_dump")]
    frame_pointer: Option<Address>,

    /// Program counter at the trap, shown in the banner with --stack-dump
    #[arg(long, value_name = "ADDR", requires = "stack_dump")]
    trap_pc: Option<Address>,

    /// Trap number, shown in the banner with --stack-dump
    #[arg(long, value_name = "N", requires = "stack_dump")]
    trap_number: Option<u32>,

    /// Virtual base the kernel is linked at, for physical addresses in kerninfo
    #[arg(long, value_name = "ADDR", default_value = "0")]
    kernbase: Address,

    /// Prompt shown before each command
    #[arg(long, default_value = "K> ")]
    prompt: String,

    /// Maximum number of frames printed by backtrace
    #[arg(long, default_value_t = UnwindLimits::DEFAULT_MAX_FRAMES)]
    max_frames: usize,

    /// Read commands from a file instead of the terminal
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Leave the monitor at end of input instead of waiting for more
    #[arg(long, default_value_t = false)]
    exit_on_eof: bool,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Write logs to a dated file in this directory instead of stderr
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Do not print the welcome banner
    #[arg(long, default_value_t = false)]
    no_banner: bool,
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(cli: &Cli) -> Result<LoggingGuard, kmon_utils::LoggingError>
{
    let format = LogFormat::from_env();
    match (&cli.log_dir, cli.log_level) {
        (Some(dir), level) => {
            let (path, guard) = kmon_utils::init_logging_to_file(dir, level, format)?;
            eprintln!("Logging to {}", path.display());
            Ok(guard)
        }
        (None, Some(level)) => kmon_utils::init_logging_with_level(level, format),
        (None, None) => kmon_utils::init_logging(),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let target = build_target(&cli)?;

    let eof = if cli.exit_on_eof || cli.script.is_some() || !io::stdin().is_terminal() {
        EofPolicy::Exit
    } else {
        EofPolicy::Wait
    };
    let config = MonitorConfig {
        prompt: cli.prompt.clone(),
        banner: !cli.no_banner,
        eof,
        limits: UnwindLimits {
            max_frames: cli.max_frames,
        },
    };
    debug!(?config, "monitor configuration");

    let mut monitor = Monitor::new(config, Registry::builtin(), target);
    if let Some(trapframe) = trapframe(&cli) {
        monitor = monitor.with_trapframe(trapframe);
    }

    let mut source: Box<dyn LineSource> = match &cli.script {
        Some(path) => {
            info!("Reading commands from {}", path.display());
            Box::new(ScriptSource::from_text(&std::fs::read_to_string(path)?))
        }
        None => Box::new(StdinSource::new()),
    };

    monitor.run(source.as_mut(), &mut io::stdout())?;
    Ok(())
}

fn build_target(cli: &Cli) -> Result<Target, Box<dyn std::error::Error>>
{
    let bias = cli.bias.value();

    let resolver: Box<dyn SymbolResolver> = if let Some(path) = &cli.symbols {
        let table = SymbolTable::parse_nm(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} symbols from {}", table.len(), path.display());
        Box::new(table)
    } else if let Some(image) = &cli.image {
        Box::new(DwarfResolver::load(image, bias)?)
    } else {
        match DwarfResolver::current_executable() {
            Ok(resolver) => Box::new(resolver),
            Err(e) => {
                warn!("Symbols unavailable for this executable: {e}");
                Box::new(NullResolver)
            }
        }
    };

    let layout = match &cli.image {
        Some(image) => Some(KernelLayout::from_file(image, bias, cli.kernbase)?),
        None => KernelLayout::current_executable(cli.kernbase)
            .inspect_err(|e| warn!("Kernel layout unavailable: {e}"))
            .ok(),
    };

    let stack = match (&cli.stack_dump, cli.stack_base, cli.frame_pointer) {
        (Some(path), Some(base), Some(frame_pointer)) => {
            let memory = MemorySnapshot::load(path, base)?;
            info!(
                "Loaded {} byte stack dump at {base} (frame pointer {frame_pointer})",
                memory.len()
            );
            StackSource::Snapshot { memory, frame_pointer }
        }
        _ => StackSource::Live,
    };

    Ok(Target {
        resolver,
        layout,
        stack,
    })
}

fn trapframe(cli: &Cli) -> Option<TrapFrame>
{
    let (Some(sp), Some(fp)) = (cli.stack_base, cli.frame_pointer) else {
        return None;
    };
    Some(TrapFrame {
        pc: cli.trap_pc.unwrap_or_default(),
        sp,
        fp,
        trap: cli.trap_number,
    })
}
