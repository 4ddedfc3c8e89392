// Keyexpand CLI
// Watches keyboard devices and expands typed names into their descriptions

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};

use keyexpand_core::config::{default_config_content, Config};
use keyexpand_core::input::list_keyboards;
use keyexpand_core::{
    DeviceSupervisor, OutputActuator, StopToken, SubstitutionTable, VirtualKeyboard, WorkerExit,
};

/// Multi-device keyboard text expander
#[derive(Parser, Debug)]
#[command(name = "keyexpand")]
#[command(version)]
#[command(about = "Expand typed names into text across input devices", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Input devices to monitor (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn list_devices() {
    let devices = list_keyboards();
    println!("Found {} keyboard device(s):", devices.len());
    for device in &devices {
        println!("  {}: {}", device.path.display(), device.name);
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    if let Some(path) = &args.config {
        return Config::from_toml_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    match Config::default_path() {
        Some(path) => Config::load_or_create(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            log::warn!("No config directory available, using built-in defaults");
            Config::from_toml(default_config_content()).context("Invalid built-in config")
        }
    }
}

/// SIGINT/SIGTERM stop the workers; SIGHUP reloads the entries.
fn spawn_signal_thread(
    config: Config,
    table: Arc<SubstitutionTable>,
    stop: StopToken,
) -> anyhow::Result<(Handle, JoinHandle<()>)> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("Failed to register signal handlers")?;
    let handle = signals.handle();

    let thread = std::thread::Builder::new()
        .name("keyexpand-signals".to_string())
        .spawn(move || {
            for signal in &mut signals {
                match signal {
                    SIGHUP => reload_entries(&config, &table),
                    _ => {
                        log::info!("Received signal {}, shutting down", signal);
                        stop.stop();
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn signal thread")?;

    Ok((handle, thread))
}

fn reload_entries(config: &Config, table: &SubstitutionTable) {
    let fresh = match config.reload() {
        Ok(fresh) => fresh,
        Err(e) => {
            log::warn!("Reload failed, keeping current entries: {}", e);
            return;
        }
    };
    match table.replace_all(fresh.entries) {
        Ok(()) => log::info!("Reloaded {} entries", table.len()),
        Err(e) => log::warn!("Reload rejected, keeping current entries: {}", e),
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    if args.check_config {
        println!(
            "Configuration is valid: {} entries, {} key symbols",
            config.entries.len(),
            config.symbols.len()
        );
        return Ok(());
    }

    let table = Arc::new(
        SubstitutionTable::from_entries(config.entries.clone())
            .context("Invalid substitution entries")?,
    );
    log::info!("Loaded {} entries", table.len());

    let mut keyboard = VirtualKeyboard::new().context("Failed to create virtual keyboard")?;
    keyboard.set_throttle_delays(config.key_pre_delay_ms, config.key_post_delay_ms);
    let actuator = Arc::new(OutputActuator::new(keyboard));

    let mut supervisor = DeviceSupervisor::new(
        config.layout,
        Arc::new(config.symbols.clone()),
        table.clone(),
        actuator,
    )
    .with_restart_policy(config.restart_policy);

    let stop = supervisor.stop_token();
    let (signal_handle, signal_thread) =
        spawn_signal_thread(config.clone(), table, stop.clone())?;

    let paths = config.resolve_device_paths(&args.devices);
    let started = supervisor.start(paths);
    if started == 0 {
        signal_handle.close();
        bail!("No device workers could be started");
    }
    log::info!("keyexpand is running on {} device(s). Press Ctrl+C to exit.", started);

    while !stop.wait_timeout(Duration::from_millis(500)) {
        if supervisor.running() == 0 {
            log::warn!("All device workers have ended");
            break;
        }
    }

    let reports = supervisor.shutdown();
    signal_handle.close();
    let _ = signal_thread.join();

    for report in &reports {
        match &report.exit {
            WorkerExit::Stopped => log::info!(
                "Device {} ({}): stopped after {} expansions",
                report.device_id,
                report.path.display(),
                report.stats.expansions
            ),
            WorkerExit::SkippedVirtual => log::debug!(
                "Device {} ({}): skipped, it is the virtual keyboard",
                report.device_id,
                report.path.display()
            ),
            WorkerExit::Failed(e) => log::warn!(
                "Device {} ({}): failed after {} restarts: {}",
                report.device_id,
                report.path.display(),
                report.restarts,
                e
            ),
            WorkerExit::Panicked => log::warn!(
                "Device {} ({}): worker panicked",
                report.device_id,
                report.path.display()
            ),
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Handle list-devices flag (doesn't require config)
    if args.list_devices {
        list_devices();
        return Ok(());
    }

    run(args)
}
