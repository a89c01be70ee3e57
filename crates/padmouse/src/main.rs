use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::{bounded, select, unbounded};

use padmouse::cli::{Cli, Command};
use padmouse::config::Config;
use padmouse::mapping::{self, ActionQueue};
use padmouse::runner::ActionRunner;
use padmouse::{logging, print_debug, print_error, print_info, print_warning, Result};
use padmouse_control::Performer;
use padmouse_gamepad::{ControllerManager, Gamepad};
use padmouse_loop::InputLoop;

/// How long to wait for the update loop threads on exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
/// Callback panics tolerated within `FAULT_WINDOW` before giving up.
const MAX_FAULTS: u32 = 10;
const FAULT_WINDOW: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::setup(cli.verbose, cli.no_color) {
        // No logger to report through.
        let _ = writeln!(std::io::stderr(), "{e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Run { config, frequency } => run(config.as_deref(), frequency),
        Command::DumpConfig { config } => dump_config(config.as_deref()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn dump_config(path: Option<&Path>) -> Result<()> {
    let config = Config::load(path)?;
    let yaml = config.to_yaml()?;
    std::io::stdout().write_all(yaml.as_bytes())?;
    Ok(())
}

fn run(path: Option<&Path>, frequency: Option<u32>) -> Result<()> {
    let mut config = Config::load(path)?;
    if let Some(frequency) = frequency {
        config.frequency = frequency;
    }

    // Handle Ctrl+C to exit cleanly
    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let manager = ControllerManager::new()?;
    let mut runner = ActionRunner::new(Performer::new()?);
    let mut gamepad: Gamepad<ActionQueue> = Gamepad::new(&manager);
    let subscriptions = mapping::install(&mut gamepad, &config);
    print_debug!("{} bindings installed", subscriptions.len());

    match manager.first_connected() {
        Some(info) => {
            print_info!("using controller: {}", info.name);
        }
        None => {
            print_warning!("no controller connected, waiting for one");
        }
    }

    let (fault_tx, fault_rx) = unbounded();
    let mut queue = ActionQueue::new();
    let input_loop = InputLoop::builder()
        .name("padmouse")
        .frequency(config.frequency)
        .fault_sender(fault_tx)
        .on_update(move || {
            gamepad.update(&mut queue);
            runner.run_all(queue.drain(..));
        })
        .spawn()?;

    print_info!(
        "padmouse started at {} Hz. Press Ctrl+C to exit.",
        input_loop.frequency()
    );
    for line in config.describe() {
        print_info!("  {line}");
    }

    let mut window_start = Instant::now();
    let mut faults = 0;
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(fault_rx) -> msg => {
                let Ok(fault) = msg else { break };
                print_error!("update failed on {}: {}", fault.thread, fault.message);
                if window_start.elapsed() > FAULT_WINDOW {
                    window_start = Instant::now();
                    faults = 0;
                }
                faults += 1;
                if faults >= MAX_FAULTS {
                    print_error!("too many update failures, stopping");
                    break;
                }
            }
        }
    }

    print_info!("stopping");
    let shutdown = input_loop.dispose_async();
    if !shutdown.wait_timeout(SHUTDOWN_TIMEOUT) {
        print_warning!("update loop did not stop within {SHUTDOWN_TIMEOUT:?}");
    }
    print_debug!("last iteration took {:?}", input_loop.iteration_time());
    drop(manager);
    Ok(())
}
