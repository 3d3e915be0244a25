use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use city_locator::actions::Dispatcher;
use city_locator::config::Config;
use city_locator::web;

pub async fn handle_serve(config: &Config, interface: String, port: u16) -> Result<()> {
    let dispatcher = Arc::new(Dispatcher::from_config(config)?);
    info!(
        preferred_provider = %config.geocoding_provider,
        graph_enabled = config.neptune.is_some(),
        "Dispatcher ready"
    );
    web::start_web_server(interface, port, dispatcher).await
}
