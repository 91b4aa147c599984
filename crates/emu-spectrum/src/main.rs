//! ZX Spectrum machine core: tape and configuration tool.
//!
//! The instruction engine is supplied by the host application, so this
//! binary does not run frames. It inspects tape images and validates
//! machine configuration files.

use std::path::{Path, PathBuf};
use std::process;

use emu_spectrum::{ConfigFile, MachineTiming, TapeDeck};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

enum Command {
    List(PathBuf),
    Config(PathBuf),
}

fn print_usage() {
    eprintln!("Usage: emu-spectrum <COMMAND> <FILE>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  list <file>      Print the block listing of a .tap or .tzx image");
    eprintln!("  config <file>    Validate a JSON machine configuration");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -h, --help       Print this help");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for block-level tracing.");
}

fn parse_args() -> Command {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        process::exit(0);
    }

    match (args.first().map(String::as_str), args.get(1), args.len()) {
        (Some("list"), Some(path), 2) => Command::List(PathBuf::from(path)),
        (Some("config"), Some(path), 2) => Command::Config(PathBuf::from(path)),
        (Some(other), _, _) if other != "list" && other != "config" => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn list_tape(path: &Path) -> Result<(), emu_spectrum::TapeError> {
    let mut deck = TapeDeck::default();
    deck.open(path)?;
    let listing = deck.listing()?;

    println!(
        "{}: {} blocks, {} bytes",
        path.display(),
        listing.len(),
        deck.file_size()
    );
    for (index, block) in listing.iter().enumerate() {
        let name = block.name.as_deref().unwrap_or("");
        println!("{index:4}  {:<18} {name:<10} {:>6}", block.kind.to_string(), block.length);
    }
    Ok(())
}

fn check_config(path: &Path) -> Result<(), emu_spectrum::ConfigError> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let config = ConfigFile::load(path)?.into_config(base_dir)?;
    let timing = MachineTiming::new(config.model, config.late_timing);

    println!("Model:            {}", config.model);
    println!("Frame T-states:   {}", timing.frame_tstates);
    println!("INT window:       [{}, {})", timing.int_start, timing.int_end);
    println!("Samples/frame:    {}", config.model.samples_per_frame());
    println!("AY:               {}", if config.ay { "on" } else { "off" });
    println!("Kempston:         {}", if config.kempston { "on" } else { "off" });
    println!("Flash load:       {}", if config.flash_load { "on" } else { "off" });
    println!("Tape timing:      {:?}", config.tape_timing);
    if let Some(save) = &config.save_path {
        println!("Save file:        {}", save.display());
    }
    Ok(())
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::List(path) => list_tape(&path).map_err(|e| e.to_string()),
        Command::Config(path) => check_config(&path).map_err(|e| e.to_string()),
    }
}

fn main() {
    env_logger::init();

    if let Err(message) = run(parse_args()) {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_list_returns_the_open_error() {
        let err = run(Command::List(PathBuf::from("/nonexistent/game.tap"))).expect_err("missing");
        assert!(err.starts_with("I/O error: "), "{err}");
    }

    #[test]
    fn unknown_tape_extension_is_rejected() {
        let err = run(Command::List(PathBuf::from("game.wav"))).expect_err("unknown format");
        assert!(err.contains("game.wav"), "{err}");
    }
}
