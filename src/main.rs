//! padtype - type with a game controller on the Linux console
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Session loop                │
//! ├──────────────────────────────────────────┤
//! │  Controller (evdev)  →  Normalizer       │
//! │                          ↓               │
//! │              Combination ("A+B;")        │
//! │                          ↓               │
//! │   Typist → uinput keyboard  |  stdout    │
//! └──────────────────────────────────────────┘
//! ```

mod config;
mod constants;
mod input;
mod keymap;
mod output;
mod session;
mod typing;

use anyhow::{anyhow, Context, Result};
use log::info;
use std::io::Write;
use std::time::{Duration, SystemTime};

use config::OutputMode;
use input::{ButtonTable, EvdevFinder, Normalizer};
use keymap::CharMap;
use output::{Outcome, PrintOutput, TypeOutput};
use session::{Session, SessionConfig, SignalShutdown};
use typing::{Typist, UinputKeyboard};

/// Print help message
fn print_help() {
    println!(
        r#"padtype {} - type with a game controller on the Linux console

USAGE:
    padtype [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -p, --print             Print combinations to stdout instead of typing them
    --dump-keymap           Print the character → key table and exit
    --init-config           Generate config file with the default profile
    -f, --force             Overwrite config file without confirmation

USAGE NOTES:
    Press buttons together (or hold some, then tap another) to produce a
    combination such as TRIG+THMB; which is typed on the active console.
    The confirm button types Enter, the clear button types Ctrl+U.

    In print mode confirm ends input (exit 0) and clear aborts it (exit 1).

EXAMPLES:
    sudo padtype                      Type combinations on the console
    padtype --print                   Read one line of combinations
    padtype --init-config             Generate default config

CONFIG FILE:
    ~/.config/padtype/config.toml (or $PADTYPE_CONFIG, /etc/padtype/config.toml)

Set RUST_LOG=info (or debug) for diagnostics.
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Generate the config template, asking before overwriting
fn init_config(force: bool) -> Result<()> {
    let path = config::default_config_path()
        .ok_or_else(|| anyhow!("Cannot determine config directory"))?;

    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        print!("Overwrite? [y/N]: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input != "y" && input != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    config::Config::write_default_config(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Config file generated:");
    println!("  Path: {}", path.display());
    Ok(())
}

/// Print the reverse keymap, one character per line
fn dump_keymap() -> Result<()> {
    let chars = CharMap::load().context("Failed to read kernel keymap")?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{:<8} {:<12} key", "char", "modifiers")?;
    for (ch, binding) in chars.iter() {
        let shown = format!("{:?}", ch as char);
        writeln!(out, "{:<8} {:<12} {}", shown, binding.modifiers.to_string(), binding.key)?;
    }
    Ok(())
}

/// Build the session for the configured mode and run it to completion
fn run(cfg: &config::Config) -> Result<Outcome> {
    let table = ButtonTable::from_config(&cfg.input).context("Invalid button configuration")?;
    let normalizer = Normalizer::new(table, cfg.input.threshold_ms);
    let session_config = SessionConfig {
        confirm_code: cfg.input.confirm_code()?,
        clear_code: cfg.input.clear_code()?,
        poll_interval: Duration::from_millis(cfg.input.poll_interval_ms),
        discovery_interval: Duration::from_millis(cfg.input.discovery_interval_ms),
    };
    let finder = EvdevFinder::new(session_config.confirm_code, SystemTime::now());
    let shutdown = SignalShutdown::install()?;

    let outcome = match cfg.output.mode {
        OutputMode::Print => {
            info!("Print mode: combinations go to stdout");
            let output = PrintOutput::new(std::io::stdout());
            Session::new(finder, output, shutdown, normalizer, session_config).run()?
        }
        OutputMode::Type => {
            let chars = CharMap::load().context("Failed to read kernel keymap")?;
            let keyboard = UinputKeyboard::create(&cfg.output.device_name)
                .context("Cannot create virtual keyboard (is /dev/uinput writable?)")?;
            let typist = Typist::new(
                keyboard,
                chars,
                Duration::from_millis(cfg.output.char_delay_ms),
            );
            let output = TypeOutput::new(typist);
            Session::new(finder, output, shutdown, normalizer, session_config).run()?
        }
    };
    Ok(outcome)
}

fn main() -> Result<()> {
    // Logs go to stderr, keeping stdout for print mode
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Check command line arguments
    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("padtype {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.iter().any(|a| a == "--init-config") {
        let force = args.iter().any(|a| a == "--force" || a == "-f");
        return init_config(force);
    }

    if args.iter().any(|a| a == "--dump-keymap") {
        return dump_keymap();
    }

    let unknown = args
        .iter()
        .skip(1)
        .find(|a| !matches!(a.as_str(), "-p" | "--print" | "-f" | "--force"));
    if let Some(arg) = unknown {
        return Err(anyhow!("Unknown option: {} (see --help)", arg));
    }

    info!("padtype starting...");

    let mut cfg = config::Config::load()?;
    if args.iter().any(|a| a == "--print" || a == "-p") {
        cfg.output.mode = OutputMode::Print;
    }

    match run(&cfg)? {
        Outcome::Aborted => {
            eprintln!("Controller input aborted by user");
            std::process::exit(1);
        }
        outcome => {
            info!("padtype exiting ({:?})", outcome);
            Ok(())
        }
    }
}
