//! The config directory shipped in the image must load and agree with itself

use observation_scraper::{CliScraper, Settings};
use std::path::PathBuf;

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_config_loads() {
    let settings = Settings::load(shipped_config_dir()).unwrap();

    assert_eq!(settings.kafka.topic, "observations");
    assert_eq!(settings.schedule.run_time().unwrap().format("%H:%M").to_string(), "10:00");
    assert!(settings.schedule.stations.iter().any(|s| s == "KNYC"));
}

#[test]
fn test_shipped_config_builds_product_url() {
    let settings = Settings::load(shipped_config_dir()).unwrap();
    let scraper = CliScraper::new(settings.cli).unwrap();

    assert_eq!(
        scraper.build_url("KNYC").unwrap(),
        "https://forecast.weather.gov/product.php?site=OKX&issuedby=NYC&product=CLI&format=CI&version=1&glossary=0"
    );
}

#[test]
fn test_missing_config_dir_fails() {
    let err = Settings::load("/nonexistent/observation-scraper").unwrap_err();
    assert_eq!(err.code_str(), "CFG_LOAD_FAILED");
}
