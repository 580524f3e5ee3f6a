//! Interactive operator menu.
//!
//! Each line read from stdin is mapped to one [`MenuCommand`]; table
//! commands are sent to the provider as set-service calls.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;
use tracing::{info, warn};

use ortable_core::{
    Axis, Direction, PredefinedPosition, APPLY_POSITION_HANDLE, SELECT_POSITION_HANDLE,
};

use crate::client::OrTableClient;

/// Menu text printed before every prompt.
pub const MENU: &str = "\
OR Table demo consumer
a) increase table height
b) decrease table height
c) increase trend
d) decrease trend
e) increase tilt
f) decrease tilt
g) increase backplate
h) decrease backplate
i) Set predefined position to null position
j) Set predefined position to beach chair
k) Apply predefined position
y) Print status
z) Exit";

/// One menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Move an axis by one step.
    Adjust(Axis, Direction),
    /// Select the predefined position to apply.
    Select(PredefinedPosition),
    /// Move the table to the selected predefined position.
    Apply,
    /// Print the provider's current state.
    Status,
    /// Leave the menu.
    Exit,
}

impl MenuCommand {
    /// Parses a menu line. Only the first non-blank character counts.
    pub fn parse(line: &str) -> Option<Self> {
        let key = line.trim().chars().next()?.to_ascii_lowercase();
        let command = match key {
            'a' => Self::Adjust(Axis::Height, Direction::Increase),
            'b' => Self::Adjust(Axis::Height, Direction::Decrease),
            'c' => Self::Adjust(Axis::Trend, Direction::Increase),
            'd' => Self::Adjust(Axis::Trend, Direction::Decrease),
            'e' => Self::Adjust(Axis::Tilt, Direction::Increase),
            'f' => Self::Adjust(Axis::Tilt, Direction::Decrease),
            'g' => Self::Adjust(Axis::Backplate, Direction::Increase),
            'h' => Self::Adjust(Axis::Backplate, Direction::Decrease),
            'i' => Self::Select(PredefinedPosition::NullLevel),
            'j' => Self::Select(PredefinedPosition::BeachChair),
            'k' => Self::Apply,
            'y' => Self::Status,
            'z' => Self::Exit,
            _ => return None,
        };
        Some(command)
    }
}

/// Outcome of one executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Runs a command against the provider and prints the result.
pub async fn execute(client: &OrTableClient, command: MenuCommand) -> Result<Flow> {
    match command {
        MenuCommand::Adjust(axis, direction) => {
            let handle = format!("{}.{}", axis.as_str(), direction.as_str());
            let tx = client.activate(&handle).await?;
            println!("{handle}: {:?}", tx.invocation_state);
        }
        MenuCommand::Select(position) => {
            let tx = client
                .set_string(SELECT_POSITION_HANDLE, position.as_str())
                .await?;
            println!("Selected {position}: {:?}", tx.invocation_state);
        }
        MenuCommand::Apply => {
            let tx = client.activate(APPLY_POSITION_HANDLE).await?;
            println!("Apply predefined position: {:?}", tx.invocation_state);
        }
        MenuCommand::Status => print_status(client).await?,
        MenuCommand::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

async fn print_status(client: &OrTableClient) -> Result<()> {
    let health = client.get_health().await?;
    let state = client.get_mdib().await?;
    let pose = state.device.pose;

    println!(
        "Provider {} ({}), mdib version {}",
        health.endpoint_reference, health.status, state.mdib.mdib_version
    );
    for axis in Axis::ALL {
        println!("  {:<10} {:>6.1} {}", axis.as_str(), pose.get(axis), axis.unit());
    }
    println!("  predefined position: {}", state.device.predefined_position);
    for condition in state.mdib.alert_conditions.iter().filter(|c| c.presence) {
        println!("  alert present: {}", condition.handle);
    }
    Ok(())
}

/// Reads commands until `z`, end of input or shutdown.
pub async fn run<R>(
    client: &OrTableClient,
    input: R,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        println!("{MENU}");
        println!("Enter: ");

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                return Ok(());
            }
        };

        let Some(line) = line else {
            info!("Input closed");
            return Ok(());
        };

        let Some(command) = MenuCommand::parse(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown choice '{}'", line.trim());
            }
            continue;
        };

        match execute(client, command).await {
            Ok(Flow::Exit) => return Ok(()),
            Ok(Flow::Continue) => {}
            Err(e) => {
                warn!(error = %format!("{e:#}"), ?command, "Command failed");
                println!("Command failed: {e:#}");
            }
        }
    }
}
