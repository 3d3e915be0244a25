use anyhow::Result;

use city_locator::actions::locate_two_cities;
use city_locator::config::Config;
use city_locator::geocoding::Geocoder;

pub async fn handle_distance(config: &Config, source: &str, destination: &str) -> Result<()> {
    let geocoder = Geocoder::from_config(config)?;
    let result = locate_two_cities(&geocoder, source, destination).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
