// ledlink: drive the three-LED board from a terminal

mod console;

use actor_protocol::UiCommand;
use actor_runtime::{pump_events, ChannelManager, QueryRetryPolicy, SupervisionConfig};
use anyhow::{bail, Context, Result};
use clap::Parser;
use codec::Intent;
use connection_actors::constants::reader::POLL_INTERVAL_MS;
use connection_actors::{create_actor_system, SystemOptions};
use console::ConsoleSink;
use core_types::{SerialConfig, TransportFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use transport_native::{
    available_ports, MockTransport, MockTransportFactory, SerialTransportFactory, SimulatedBoard,
};

/// Port name used with `--simulate`.
const SIMULATED_PORT: &str = "SIM";

#[derive(Parser)]
#[command(name = "ledlink")]
#[command(about = "Control the RGB LED board over a serial port", long_about = None)]
struct Cli {
    /// Serial port (e.g. /dev/ttyACM0, COM3)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = SerialConfig::DEFAULT_BAUD)]
    baud: u32,

    /// Reader poll interval in milliseconds
    #[arg(long, default_value_t = POLL_INTERVAL_MS)]
    poll_ms: u64,

    /// Re-send an unanswered state query this many times
    #[arg(long, default_value_t = 0)]
    query_retries: u32,

    /// List serial ports and exit
    #[arg(short, long)]
    list: bool,

    /// Talk to a simulated board instead of real hardware
    #[arg(long)]
    simulate: bool,
}

const HELP: &str = "\
commands:
  r R g G b B a A     red/green/blue/all on (lower) or off (upper)
  0-4                 set mode
  s | query           ask the board for its state
  red on, mode 2 ...  long forms
  press               press the button (simulated board only)
  connect | disconnect
  quit";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.list {
        let ports = available_ports()?;
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut simulated: Option<Arc<MockTransport>> = None;
    let factory: Arc<dyn TransportFactory> = if cli.simulate {
        let mock = MockTransportFactory::new();
        simulated = Some(mock.add_port(MockTransport::with_board(
            SIMULATED_PORT,
            SimulatedBoard::new(),
        )));
        Arc::new(mock)
    } else {
        Arc::new(SerialTransportFactory)
    };

    let port = match (cli.port, simulated.is_some()) {
        (Some(port), _) => port,
        (None, true) => SIMULATED_PORT.to_string(),
        (None, false) => bail!("no port given: pass --port <name> (see --list) or --simulate"),
    };

    let options = SystemOptions {
        supervision: SupervisionConfig {
            query_retry: QueryRetryPolicy::with_retries(cli.query_retries),
            ..SupervisionConfig::default()
        },
        poll_interval: Duration::from_millis(cli.poll_ms.max(1)),
    };

    let mut manager = create_actor_system(factory, options);
    let events = manager.take_event_receiver();
    tokio::spawn(pump_events(events, ConsoleSink));

    let connect = UiCommand::Connect {
        port: port.clone(),
        baud: cli.baud,
    };
    manager.send_command(connect.clone())?;
    log::info!("Type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let input = line.trim();
        match input {
            "" => {}
            "help" | "?" => println!("{}", HELP),
            "quit" | "exit" => break,
            "connect" => send(&manager, connect.clone()),
            "disconnect" => send(&manager, UiCommand::Disconnect),
            "press" => match &simulated {
                Some(board) => board.press_and_release_button(),
                None => println!("'press' only works with --simulate"),
            },
            other => match other.parse::<Intent>() {
                Ok(intent) => send(&manager, UiCommand::SendIntent { intent }),
                Err(e) => println!("{}", e),
            },
        }
    }

    // Best effort: let the port close before the runtime goes away.
    let _ = manager.send_command(UiCommand::Disconnect);
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}

fn send(manager: &ChannelManager, cmd: UiCommand) {
    if let Err(e) = manager.send_command(cmd) {
        eprintln!("error: {}", e);
    }
}
