//! # sb-node
//!
//! Minimal participant on a scopebus.
//!
//! ```text
//! sb-node listen /sensors/        # log every event on /sensors/ and below
//! sb-node publish /sensors/left/  # publish each stdin line as a string event
//! ```
//!
//! Both commands stop at end of input (Ctrl+D).

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sb_03_connectors::{Event, HandlerError};
use sb_runtime::{RuntimeConfig, RuntimeContext};
use scope_telemetry::{init_telemetry, TelemetryConfig};
use shared_types::Scope;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sb-node")]
#[command(about = "Publish or listen to events on a scopebus")]
struct Args {
    /// TOML file with a [transport.socket] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log every event received on SCOPE and its sub-scopes
    Listen { scope: String },
    /// Publish each line read from stdin as a string event on SCOPE
    Publish { scope: String },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_telemetry(&TelemetryConfig::from_env()).context("failed to initialise telemetry")?;

    let config = RuntimeConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    info!(
        options = %config.socket.options,
        server_mode = %config.socket.server_mode,
        "Configuration loaded"
    );
    let context = RuntimeContext::new(config);

    match args.command {
        Command::Listen { scope } => listen(&context, parse_scope(&scope)?),
        Command::Publish { scope } => publish(&context, parse_scope(&scope)?),
    }
}

fn parse_scope(text: &str) -> Result<Scope> {
    Scope::parse(text).with_context(|| format!("invalid scope {text:?}"))
}

fn listen(context: &RuntimeContext, scope: Scope) -> Result<()> {
    let connector = context.create_in_push_connector(scope.clone())?;
    connector.add_handler(Arc::new(|event: &Event| -> Result<(), HandlerError> {
        info!(
            scope = %event.scope(),
            id = %event.event_id().map(|id| id.to_string()).unwrap_or_default(),
            value = %describe(event),
            "Event"
        );
        Ok(())
    }));
    connector.activate().context("failed to connect to bus")?;
    info!(%scope, "Listening. Press Ctrl+D to stop.");

    // block until stdin closes
    io::copy(&mut io::stdin().lock(), &mut io::sink())?;

    connector.deactivate()?;
    Ok(())
}

fn publish(context: &RuntimeContext, scope: Scope) -> Result<()> {
    let connector = context.create_out_connector(scope.clone())?;
    connector.activate().context("failed to connect to bus")?;
    info!(%scope, "Publishing stdin lines. Press Ctrl+D to stop.");

    for line in io::stdin().lock().lines() {
        let event = connector.push(Event::with_value(scope.clone(), line?))?;
        if let Some(id) = event.event_id() {
            info!(%id, "Published");
        }
    }

    connector.deactivate()?;
    Ok(())
}

fn describe(event: &Event) -> String {
    let data = event.data();
    if let Some(v) = data.downcast_ref::<String>() {
        return format!("{v:?}");
    }
    if let Some(v) = data.downcast_ref::<bool>() {
        return v.to_string();
    }
    if let Some(v) = data.downcast_ref::<i32>() {
        return v.to_string();
    }
    if let Some(v) = data.downcast_ref::<i64>() {
        return v.to_string();
    }
    if let Some(v) = data.downcast_ref::<u32>() {
        return v.to_string();
    }
    if let Some(v) = data.downcast_ref::<u64>() {
        return v.to_string();
    }
    if let Some(v) = data.downcast_ref::<f32>() {
        return v.to_string();
    }
    if let Some(v) = data.downcast_ref::<f64>() {
        return v.to_string();
    }
    format!("<{}>", data.data_type())
}
