use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const ENV_PREFIX: &str = "RFID_";

/// Runtime settings, read from `RFID_*` environment variables.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RfidConfig {
    #[serde(default = "default_spi_device")]
    pub spi_device: String,
    #[serde(default = "default_spi_speed_hz")]
    pub spi_speed_hz: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub debug: bool,
}

fn default_spi_device() -> String {
    "/dev/spidev0.0".to_string()
}

fn default_spi_speed_hz() -> u32 {
    1_000_000
}

fn default_debounce_ms() -> u64 {
    1500
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for RfidConfig {
    fn default() -> Self {
        RfidConfig {
            spi_device: default_spi_device(),
            spi_speed_hz: default_spi_speed_hz(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            debug: false,
        }
    }
}

impl RfidConfig {
    pub fn from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<RfidConfig>()
            .context("Loading RFID_* configuration from environment")
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, RfidConfig>(vars)
            .context("Parsing RFID_* configuration")
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let cfg = RfidConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(cfg, RfidConfig::default());
        assert_eq!(cfg.debounce(), Duration::from_millis(1500));
        assert_eq!(cfg.spi_device, "/dev/spidev0.0");
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let cfg = RfidConfig::from_vars(vars(&[
            ("RFID_SPI_DEVICE", "/dev/spidev1.0"),
            ("RFID_DEBOUNCE_MS", "250"),
            ("RFID_DEBUG", "true"),
            ("SPI_DEVICE", "/dev/ignored"),
        ]))
        .unwrap();
        assert_eq!(cfg.spi_device, "/dev/spidev1.0");
        assert_eq!(cfg.debounce(), Duration::from_millis(250));
        assert_eq!(cfg.spi_speed_hz, 1_000_000);
        assert!(cfg.debug);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let res = RfidConfig::from_vars(vars(&[("RFID_POLL_INTERVAL_MS", "soon")]));
        assert!(res.is_err());
    }
}
