extern crate trackside;
extern crate failure;
extern crate structopt;

use std::path::PathBuf;

use flexi_logger::{LogSpecBuilder, Logger, LoggerHandle};
use log::LevelFilter;
use structopt::StructOpt;
use trackside::*;

/// Trackside -- model railway layout simulation
#[derive(StructOpt, Debug)]
#[structopt(name = "trackside")]
struct Opt {
    /// Verbose mode (-v, -vv, -vvv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Scenario script: layout, trains and commands
    #[structopt(parse(from_os_str))]
    scenario: PathBuf,

    /// Simulated milliseconds per tick
    #[structopt(short = "t", long = "tick-ms", default_value = "200")]
    tick_ms: f64,

    /// Feet per pixel, unless the script sets a scale
    #[structopt(short = "s", long = "scale")]
    scale: Option<f64>,

    /// Stop after this many ticks in total
    #[structopt(short = "n", long = "max-ticks")]
    max_ticks: Option<u64>,

    /// Stop at the first accident
    #[structopt(long = "halt")]
    halt: bool,

    /// Write the event history to this file
    #[structopt(short = "o", long = "history", parse(from_os_str))]
    history: Option<PathBuf>,
}

fn init_logging(verbose: u8) -> AppResult<LoggerHandle> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut log_spec_builder = LogSpecBuilder::new();
    let _ = log_spec_builder
        .default(LevelFilter::Error)
        .module("trackside", level);
    let handle = Logger::with(log_spec_builder.finalize())
        .log_to_stderr()
        .start()?;
    Ok(handle)
}

fn run(opt: &Opt) -> AppResult<()> {
    let scenario = get_scenario(&opt.scenario)?;
    if opt.verbose >= 2 {
        println!("Scenario:");
        for x in &scenario.actions {
            println!("  - {:?}", x);
        }
        println!("");
    }

    let mut options = RunOptions::default();
    options.params.tick_ms = opt.tick_ms;
    options.scale = opt.scale;
    options.halt = opt.halt;
    options.max_ticks = opt.max_ticks;
    let outcome = run_scenario(&scenario, options)?;

    println!("# Ran {} ticks", outcome.sim.ticks());
    for &(tick, ref accident) in &outcome.accidents {
        println!("! tick {}: {}", tick, accident);
    }
    let mut names: Vec<_> = outcome.trains.iter().collect();
    names.sort_by_key(|&(_, id)| *id);
    for (name, id) in names {
        match outcome.sim.train(*id) {
            Some(t) => println!("## Train \"{}\": {:?}", name, t),
            None => println!("## Train \"{}\": gone", name),
        }
    }
    for t in outcome.sim.trains() {
        if !outcome.trains.values().any(|id| *id == t.id) {
            println!("## Train {}: {:?}", t.id, t);
        }
    }

    let lines = trackside::output::history::log_lines(&outcome.sim.history)?;
    match opt.history {
        Some(ref path) => {
            use std::fs::File;
            use std::io::BufWriter;
            use std::io::Write;
            let file = File::create(path)?;
            let mut writer = BufWriter::new(&file);
            write!(writer, "{}", lines)?;
        }
        None if opt.verbose >= 1 => {
            println!("# History:");
            print!("{}", lines);
        }
        None => {}
    }
    Ok(())
}

pub fn main() {
    let opt = Opt::from_args();
    let _logger = match init_logging(opt.verbose) {
        Ok(h) => Some(h),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };
    match run(&opt) {
        Ok(()) => {}
        Err(e) => {
            println!("Error:\n{}", e.as_fail());
            std::process::exit(1);
        }
    }
}
