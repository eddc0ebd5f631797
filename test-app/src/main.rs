// alicat test application -- CLI tool for exercising flow and pressure
// instruments against real hardware or a mock transport.
//
// Usage:
//   alicat-test-app --port /dev/ttyUSB0 --unit A change-gas --gas 8
//   alicat-test-app --port /dev/ttyUSB0 --kind pressure --unit B poll
//   alicat-test-app --port /dev/ttyUSB0 --unit A stream --duration 10
//   alicat-test-app --port /dev/ttyUSB0 --unit A units --static-value 5 --unit-value 7
//   alicat-test-app --mock change-gas
//   alicat-test-app list
//
// Without --unit (and --gas for change-gas) the values are prompted for on
// stdin. Set RUST_LOG=debug to see every attempt and resend.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use alicat::builder::InstrumentBuilder;
use alicat::commands::UnitSetting;
use alicat::models::{self, InstrumentModel};
use alicat::Instrument;
use alicat_core::{InstrumentKind, UnitId};
use alicat_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// alicat test application -- drives an instrument from the command line.
#[derive(Parser)]
#[command(name = "alicat-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Override the default baud rate (19200).
    #[arg(long)]
    baud: Option<u32>,

    /// Instrument family: flow or pressure.
    #[arg(long, default_value = "flow")]
    kind: InstrumentKind,

    /// Unit id of the addressed instrument (prompted for if omitted).
    #[arg(long)]
    unit: Option<UnitId>,

    /// Upper bound on a single port read, in milliseconds.
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Give up on unanswered requests after this many seconds (0 = keep
    /// resending until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Use a scripted mock transport instead of a real serial port.
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stop streaming, change gas, then poll and print one data frame.
    ChangeGas {
        /// Gas number (prompted for if omitted).
        #[arg(long)]
        gas: Option<u32>,
    },

    /// Poll one data frame.
    Poll,

    /// Print streamed data frames.
    Stream {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,

        /// Read without sending start/stop stream commands.
        #[arg(long)]
        passive: bool,
    },

    /// List the gases the instrument is calibrated for.
    Gases,

    /// Tare the instrument.
    Tare,

    /// Change the engineering unit of a statistic.
    Units {
        #[arg(long)]
        static_value: u32,
        #[arg(long)]
        unit_value: u32,
        #[arg(long, default_value_t = 1)]
        group: u8,
        #[arg(long, default_value_t = 0)]
        override_flag: u8,
    },

    /// Read back the static statistic's engineering unit.
    StaticValue,

    /// Lock the front panel.
    Lock,

    /// Unlock the front panel.
    Unlock,

    /// Change the instrument's baud rate (the host port is not changed).
    Baud {
        rate: u32,
    },

    /// Re-address the instrument.
    UnitId {
        new_unit: UnitId,
    },

    /// List supported instrument models.
    List,
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Print `label` and read one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("failed to read from stdin")?;
    Ok(input.trim().to_string())
}

fn resolve_unit(unit: Option<&UnitId>) -> Result<UnitId> {
    match unit {
        Some(unit) => Ok(unit.clone()),
        None => {
            let input = prompt("Unit ID")?;
            UnitId::new(&input).with_context(|| format!("invalid unit id {input:?}"))
        }
    }
}

fn resolve_gas(gas: Option<u32>) -> Result<u32> {
    match gas {
        Some(gas) => Ok(gas),
        None => {
            let input = prompt("Gas number")?;
            input
                .parse()
                .with_context(|| format!("invalid gas number {input:?}"))
        }
    }
}

/// A mock transport pre-loaded with plausible replies for `command`.
fn scripted_mock(command: &Command, unit: &UnitId, gas: Option<u32>) -> MockTransport {
    let frame = format!("{unit} +014.70 +025.00 +025.00 +000.00 +000.00 N2\r");
    let reads: Vec<String> = match command {
        Command::ChangeGas { .. } => vec![format!("{unit} {} N2\r", gas.unwrap_or(0)), frame],
        Command::Poll => vec![frame],
        Command::Stream { .. } => vec![frame; 5],
        Command::Gases => vec![format!("{unit} 0 Air 1 Ar 8 N2\r")],
        Command::Units { unit_value, .. } => vec![format!("{unit} {unit_value} SCCM\r")],
        Command::StaticValue => vec![format!("{unit} 69 12 PSIA\r")],
        _ => Vec::new(),
    };
    MockTransport::with_reads(reads)
}

/// Cancel `token` on Ctrl-C, and after `timeout_secs` if non-zero.
fn spawn_cancellers(token: &CancellationToken, timeout_secs: u64) {
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl-c received");
            on_signal.cancel();
        }
    });
    if timeout_secs > 0 {
        let on_timeout = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
            on_timeout.cancel();
        });
    }
}

// ---------------------------------------------------------------------------
// Instrument construction
// ---------------------------------------------------------------------------

async fn create_instrument(
    cli: &Cli,
    model: InstrumentModel,
    mock: Option<MockTransport>,
    cancel: CancellationToken,
) -> Result<Instrument> {
    let mut builder = InstrumentBuilder::new(model).cancel_token(cancel);
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }
    if let Some(ms) = cli.read_timeout_ms {
        builder = builder.read_timeout(Duration::from_millis(ms));
    }

    match mock {
        Some(mock) => {
            let instrument = builder
                .build_with_transport(Box::new(mock))
                .context("failed to build instrument with mock transport")?;
            println!("Connected (mock transport) -- {}", model.name);
            Ok(instrument)
        }
        None => {
            let port = cli
                .port
                .as_deref()
                .context("--port is required when not using --mock")?;
            let instrument = builder
                .serial_port(port)
                .build()
                .await
                .with_context(|| format!("failed to open {port}"))?;
            println!(
                "Connected to {} on {port} at {} baud",
                model.name,
                instrument.baud_rate()
            );
            Ok(instrument)
        }
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    println!("{:<16} {:<10} {:>6}  {:<8} {:<8} TARE", "MODEL", "KIND", "BAUD", "START", "STOP");
    for model in models::all_models() {
        println!(
            "{:<16} {:<10} {:>6}  {:<8} {:<8} {}",
            model.name,
            model.kind,
            model.default_baud_rate,
            format!("{:?}", model.commands.start_stream),
            format!("{:?}", model.commands.stop_stream),
            model.commands.tare,
        );
    }
    Ok(())
}

fn print_frame(frame: Option<String>) {
    match frame {
        Some(line) => println!("{}", line.trim_end()),
        None => println!("No response"),
    }
}

async fn cmd_change_gas(inst: &mut Instrument, unit: &UnitId, gas: u32) -> Result<()> {
    inst.stop_stream(unit).await.context("stop stream failed")?;
    let echo = inst.change_gas(unit, gas).await.context("change gas failed")?;
    println!("Gas changed: {}", echo.trim_end());
    let frame = inst.poll_data(unit).await.context("poll failed")?;
    print_frame(frame);
    Ok(())
}

async fn cmd_stream(
    inst: &mut Instrument,
    unit: &UnitId,
    cancel: &CancellationToken,
    duration_secs: u64,
    passive: bool,
) -> Result<()> {
    let session = cancel.child_token();
    if duration_secs > 0 {
        let stopper = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(duration_secs)).await;
            stopper.cancel();
        });
    }

    if !passive {
        inst.start_stream(unit).await.context("start stream failed")?;
    }
    println!("Streaming (Ctrl-C to stop)...");

    let count = inst
        .read_stream(session, |line| println!("{}", line.trim_end()))
        .await
        .context("stream read failed")?;

    if !passive {
        inst.stop_stream(unit).await.context("stop stream failed")?;
    }
    println!("{count} frames received.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // The `list` command does not require a connection.
    if matches!(cli.command, Command::List) {
        return cmd_list();
    }

    let unit = resolve_unit(cli.unit.as_ref())?;
    let gas = match &cli.command {
        Command::ChangeGas { gas } => Some(resolve_gas(*gas)?),
        _ => None,
    };

    let cancel = CancellationToken::new();
    spawn_cancellers(&cancel, cli.timeout);

    let mock = cli.mock.then(|| scripted_mock(&cli.command, &unit, gas));
    let mut inst = create_instrument(&cli, models::model_for(cli.kind), mock, cancel.clone()).await?;

    let result = match &cli.command {
        Command::ChangeGas { .. } => cmd_change_gas(&mut inst, &unit, gas.unwrap_or_default()).await,
        Command::Poll => inst
            .poll_data(&unit)
            .await
            .map(print_frame)
            .context("poll failed"),
        Command::Stream { duration, passive } => {
            cmd_stream(&mut inst, &unit, &cancel, *duration, *passive).await
        }
        Command::Gases => inst
            .available_gases(&unit)
            .await
            .map(|gases| println!("{}", gases.trim_end()))
            .context("gas list failed"),
        Command::Tare => inst.tare(&unit).await.context("tare failed"),
        Command::Units {
            static_value,
            unit_value,
            group,
            override_flag,
        } => {
            let setting = UnitSetting::new(*static_value, *unit_value)
                .group(*group)
                .override_flag(*override_flag);
            inst.set_units(&unit, &setting)
                .await
                .map(|echo| println!("Units set: {}", echo.trim_end()))
                .context("set units failed")
        }
        Command::StaticValue => inst
            .query_static_unit_value(&unit)
            .await
            .map(|value| println!("{}", value.trim_end()))
            .context("static value query failed"),
        Command::Lock => inst.lock_display(&unit).await.context("lock failed"),
        Command::Unlock => inst.unlock_display(&unit).await.context("unlock failed"),
        Command::Baud { rate } => inst
            .set_baud_rate(&unit, *rate)
            .await
            .map(|()| println!("Instrument set to {rate} baud; reconnect at the new rate."))
            .context("baud rate change failed"),
        Command::UnitId { new_unit } => inst
            .change_unit_id(&unit, new_unit)
            .await
            .map(|()| println!("Unit {unit} is now {new_unit}"))
            .context("unit id change failed"),
        Command::List => Ok(()),
    };

    inst.close().await.ok();
    result
}
