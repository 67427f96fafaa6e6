use anyhow::Result;
use tracing::info;

use rfid_scanner::components::rfid::Mfrc522Driver;
use rfid_scanner::config::RfidConfig;
use rfid_scanner::logging;
use rfid_scanner::scanner::TagScanner;
use rfid_scanner::signals::StopFlag;

fn main() -> Result<()> {
    let config = RfidConfig::from_env()?;
    logging::init(&config);

    let stop = StopFlag::new();
    stop.register_interrupt()?;

    let mut driver = Mfrc522Driver::open(&config)?;
    println!("VERSION: 0x{:x}", driver.version()?);

    let mut scanner = TagScanner::from_config(driver, std::io::sink(), stop.clone(), &config);
    while let Some(res) = scanner.scan_once()? {
        info!("res = {:?}", res);
        if !stop.sleep(config.debounce(), config.poll_interval()) {
            break;
        }
    }
    Ok(())
}
