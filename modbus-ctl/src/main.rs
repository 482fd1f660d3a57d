//! Command-line Modbus master

use std::fmt::Formatter;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use modbus_master::client::link::Link;
use modbus_master::*;

use crate::uri::{Uri, UriError};

mod uri;

#[derive(Debug)]
enum Error {
    BadUri(UriError),
    Request(RequestError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Protocol {
    Rtu,
    Tcp,
}

#[derive(Parser)]
#[command(name = "modbus-ctl")]
#[command(about = "A command line program for making Modbus master requests over RTU or TCP")]
#[command(version)]
struct Cli {
    #[arg(
        long,
        value_enum,
        help = "Framing to use, defaults to rtu for serial:// and tcp for tcp:// uris"
    )]
    protocol: Option<Protocol>,

    #[arg(short = 'u', long, default_value = "1", help = "The unit id of the Modbus slave")]
    unit: u8,

    #[arg(
        short = 't',
        long,
        default_value = "1000",
        help = "Connect and response timeout in milliseconds"
    )]
    timeout: u64,

    #[arg(short = 'p', long, help = "Optional polling period in milliseconds")]
    period: Option<u64>,

    #[arg(help = "tcp://HOST:PORT or serial://DEVICE:BAUD")]
    uri: Uri,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "read-holding", about = "read holding registers")]
    ReadHolding(ReadArgs),

    #[command(name = "read-input", about = "read input registers")]
    ReadInput(ReadArgs),

    #[command(name = "read-coil", about = "read coils")]
    ReadCoil(ReadArgs),

    #[command(name = "read-din", about = "read digital inputs")]
    ReadDin(ReadArgs),

    #[command(name = "write-register", about = "write a single holding register")]
    WriteRegister(WriteRegisterArgs),

    #[command(name = "write-coil", about = "write a single coil")]
    WriteCoil(WriteCoilArgs),
}

#[derive(Args)]
struct ReadArgs {
    #[arg(help = "the starting address")]
    start: u16,

    #[arg(default_value = "1", help = "quantity of values")]
    count: u16,
}

#[derive(Args)]
struct WriteRegisterArgs {
    #[arg(help = "the address of the register")]
    index: u16,

    #[arg(help = "the value of the register")]
    value: u16,
}

#[derive(Args)]
struct WriteCoilArgs {
    #[arg(help = "the address of the coil")]
    index: u16,

    #[arg(action = clap::ArgAction::Set, value_parser = parse_coil_value, help = "the value of the coil: on, off, true, false, 1 or 0")]
    value: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let timeout = Duration::from_millis(cli.timeout);
    let unit = UnitId::new(cli.unit);

    let (io, baud_rate) = match &cli.uri {
        Uri::Tcp { host, port } => {
            let addr = Uri::socket_addr(host, *port)?;
            (PhysLayer::connect_tcp(addr, timeout)?, None)
        }
        Uri::Serial { device, baud_rate } => {
            let settings = SerialSettings::with_baud_rate(*baud_rate);
            (PhysLayer::open_serial(device, settings)?, Some(*baud_rate))
        }
    };
    tracing::info!("opened {}", cli.uri);

    let protocol = cli.protocol.unwrap_or(match cli.uri {
        Uri::Tcp { .. } => Protocol::Tcp,
        Uri::Serial { .. } => Protocol::Rtu,
    });

    match protocol {
        Protocol::Rtu => {
            let mut master = Master::rtu(io);
            if let Some(baud_rate) = baud_rate {
                master.set_interframe_delay(serial::frame::interframe_duration(baud_rate));
            }
            poll(&cli, &mut master, unit, timeout)
        }
        Protocol::Tcp => poll(&cli, &mut Master::tcp(io), unit, timeout),
    }
}

fn poll<L: Link>(
    cli: &Cli,
    master: &mut Master<L>,
    unit: UnitId,
    timeout: Duration,
) -> Result<(), Error> {
    master.set_read_timeout(timeout);
    master.set_decode_level(PduDecodeLevel::DataValues.into());

    match cli.period {
        None => run_command(&cli.command, master, unit),
        Some(period_ms) => {
            let period = Duration::from_millis(period_ms);
            loop {
                run_command(&cli.command, master, unit)?;
                std::thread::sleep(period)
            }
        }
    }
}

fn run_command<L: Link>(
    command: &Command,
    master: &mut Master<L>,
    unit: UnitId,
) -> Result<(), Error> {
    match command {
        Command::ReadHolding(args) | Command::ReadInput(args) => {
            let is_input = matches!(command, Command::ReadInput(_));
            let values = master.read_registers(unit, is_input, args.start, args.count)?;
            print_values(args.start, values);
        }
        Command::ReadCoil(args) | Command::ReadDin(args) => {
            let is_coils = matches!(command, Command::ReadCoil(_));
            let values = master.read_digital_inputs(unit, is_coils, args.start, args.count)?;
            print_values(args.start, values);
        }
        Command::WriteRegister(args) => {
            master.write_single_register(unit, args.index, args.value)?;
        }
        Command::WriteCoil(args) => {
            master.write_single_coil(unit, args.index, args.value)?;
        }
    }
    Ok(())
}

fn print_values<T: std::fmt::Display>(start: u16, values: Vec<T>) {
    for (index, value) in (u32::from(start)..).zip(values) {
        println!("index: {index} value: {value}")
    }
}

fn parse_coil_value(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(format!("bad coil value '{value}', expected on or off")),
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Error::BadUri(err) => write!(f, "{err}"),
            Error::Request(err) => write!(f, "{err}"),
        }
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        Error::Request(err)
    }
}

impl From<UriError> for Error {
    fn from(err: UriError) -> Self {
        Error::BadUri(err)
    }
}
