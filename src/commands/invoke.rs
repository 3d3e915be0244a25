use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

use city_locator::actions::Dispatcher;
use city_locator::config::Config;

fn read_event(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read event file {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read event from stdin")?;
            Ok(input)
        }
    }
}

/// Run one event through the dispatcher and print the response envelope
pub async fn handle_invoke(config: &Config, event: Option<PathBuf>, pretty: bool) -> Result<()> {
    let raw = read_event(event)?;
    let event: Value = serde_json::from_str(&raw).context("Event is not valid JSON")?;

    let dispatcher = Dispatcher::from_config(config)?;
    let response = dispatcher.handle_event(event).await;
    debug!("Response status {}", response.status_code());

    let output = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", output);
    Ok(())
}
