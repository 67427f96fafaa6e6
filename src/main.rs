use anyhow::{Context, Result};
use std::io;
use tracing::{error, info};

use rfid_scanner::components::rfid::Mfrc522Driver;
use rfid_scanner::config::RfidConfig;
use rfid_scanner::logging;
use rfid_scanner::scanner::TagScanner;
use rfid_scanner::signals::StopFlag;

fn run_application(config: RfidConfig) -> Result<()> {
    info!("Configuration: {:?}", config);

    let stop = StopFlag::new();
    stop.register_interrupt()?;

    let driver = Mfrc522Driver::open(&config).context("Creating MFRC522 driver")?;
    TagScanner::from_config(driver, io::stdout(), stop, &config).run()
}

fn main() -> Result<()> {
    let config = RfidConfig::from_env()?;
    logging::init(&config);

    run_application(config).map_err(|err| {
        error!("RFID reader terminated: {:#}", err);
        err
    })
}
