//! # fissionbusd — fissionbus peer daemon
//!
//! Composition root that wires the in-process bus and the RPC bridge
//! together and runs an interactive console on stdin.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Build the in-process bus wrapped by the RPC bridge
//! - Read console commands and translate them into bus calls
//! - Stop on `exit`, end of input or Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no dispatch logic belongs here.
//!
//! Two peers talking to each other:
//!
//! ```text
//! FISSIONBUS_LISTEN=tcp://:7633 FISSIONBUS_REMOTE=tcp://localhost:7634 fissionbusd
//! FISSIONBUS_LISTEN=tcp://:7634 FISSIONBUS_REMOTE=tcp://localhost:7633 fissionbusd
//! ```

mod command;
mod config;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use fissionbus_adapter_rpc::proxy_creator;
use fissionbus_app::builder::EventBusBuilder;
use fissionbus_app::handler::Callable;
use fissionbus_app::ports::{BusPublisher, BusSubscriber, SharedBus};
use fissionbus_domain::payload;

use crate::command::{Command, USAGE};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    let bus = EventBusBuilder::new()
        .with_proxy(proxy_creator(config.bridge.clone()))
        .build()
        .await
        .context("failed to start the rpc bridge")?;

    let printer = Callable::new(|text: String| println!("< {text}"));
    println!("{USAGE}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        match line.parse::<Command>() {
            Ok(Command::Exit) => break,
            Ok(command) => run(&bus, &printer, command).await,
            Err(command::ParseError::Empty) => {}
            Err(err) => eprintln!("{err}, type `help` for usage"),
        }
    }

    tracing::info!("shutting down");
    Ok(())
}

async fn run(bus: &SharedBus, printer: &Callable, command: Command) {
    let result = match command {
        Command::Subscribe(topic) => bus
            .subscribe(&topic, printer.clone())
            .await
            .map(|_key| ()),
        Command::SubscribeSync(topic) => bus
            .subscribe_sync(&topic, printer.clone())
            .await
            .map(|_key| ()),
        Command::Unsubscribe(topic) => bus.unsubscribe(&topic, &printer.key()).await,
        Command::Publish { topic, text } => {
            bus.publish(&topic, payload![(text)]).await;
            Ok(())
        }
        Command::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Command::Exit => Ok(()),
    };
    if let Err(err) = result {
        tracing::warn!(%err, "command failed");
        eprintln!("error: {err}");
    }
}
