use anyhow::Result;

use city_locator::config::Config;
use city_locator::geocoding::Geocoder;

pub async fn handle_geocode(config: &Config, city: &str) -> Result<()> {
    let geocoder = Geocoder::from_config(config)?;
    let result = geocoder.resolve_with_fallback(city).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
