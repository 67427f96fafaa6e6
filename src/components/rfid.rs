use anyhow::{Context, Result};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, trace};

use hal::spidev::{SpiModeFlags, SpidevOptions};
use hal::SpidevDevice;
use linux_embedded_hal as hal;
use mfrc522::comm::blocking::spi::{DummyDelay, SpiInterface};
use mfrc522::{self, AtqA, Initialized, Mfrc522};

use crate::config::RfidConfig;
use crate::signals::StopFlag;

type Device = Mfrc522<SpiInterface<SpidevDevice, DummyDelay>, Initialized>;

/// Unique identifier of a tag, as returned by anti-collision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Uid(Vec<u8>);

impl Uid {
    pub fn from_bytes(bs: &[u8]) -> Uid {
        Uid(bs.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Decimal bytes joined by colons, e.g. `4:130:22:9`.
impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for b in &self.0 {
            if !first {
                f.write_str(":")?;
            }
            write!(f, "{}", b)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Iso14443A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    /// The driver stopped waiting without seeing a tag.
    Absent,
    Interrupted,
}

/// The hardware side of the scanner.
///
/// `request` and `anticoll` report routine misses (tag moved away, garbled
/// frame) as `None`. `cleanup` must be safe to call more than once.
pub trait ReaderDriver {
    fn wait_for_tag(&mut self, stop: &StopFlag) -> Result<Presence>;
    fn request(&mut self) -> Option<TagType>;
    fn anticoll(&mut self) -> Option<Uid>;
    fn cleanup(&mut self);
}

pub struct Mfrc522Driver {
    mfrc522: Option<Device>,
    pending: Option<AtqA>,
    poll_interval: Duration,
}

impl Mfrc522Driver {
    pub fn open(config: &RfidConfig) -> Result<Self> {
        let mut spi = SpidevDevice::open(&config.spi_device)
            .with_context(|| format!("Opening SPI device {}", config.spi_device))?;
        let options = SpidevOptions::new()
            .max_speed_hz(config.spi_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("Configuring SPI device")?;

        let itf = SpiInterface::new(spi);
        let mut mfrc522 = Mfrc522::new(itf)
            .init()
            .map_err(|err| anyhow::Error::msg(format!("{:?}", err)))
            .context("Initializing MFRC522 PCD")?;

        let vers = mfrc522
            .version()
            .map_err(|err| anyhow::Error::msg(format!("{:?}", err)))
            .context("Retrieving MFRC522 version information")?;

        info!("mfrc522 version: 0x{:x}", vers);
        info!("Opened MFRC522 on {}", config.spi_device);
        Ok(Mfrc522Driver {
            mfrc522: Some(mfrc522),
            pending: None,
            poll_interval: config.poll_interval(),
        })
    }

    pub fn version(&mut self) -> Result<u8> {
        let mfrc522 = self
            .mfrc522
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("MFRC522 already released"))?;
        mfrc522
            .version()
            .map_err(|err| anyhow::Error::msg(format!("{:?}", err)))
    }
}

impl ReaderDriver for Mfrc522Driver {
    fn wait_for_tag(&mut self, stop: &StopFlag) -> Result<Presence> {
        loop {
            if stop.is_stopped() {
                return Ok(Presence::Interrupted);
            }
            let mfrc522 = self
                .mfrc522
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("MFRC522 already released"))?;
            match mfrc522.reqa() {
                Ok(atqa) => {
                    trace!("reqa() returned AtqA");
                    self.pending = Some(atqa);
                    return Ok(Presence::Present);
                }
                Err(mfrc522::error::Error::Timeout) => {}
                Err(err) => debug!("reqa(): {:?}", err),
            }
            if !stop.sleep(self.poll_interval, self.poll_interval) {
                return Ok(Presence::Interrupted);
            }
        }
    }

    fn request(&mut self) -> Option<TagType> {
        if self.pending.is_some() {
            return Some(TagType::Iso14443A);
        }
        // The tag left IDLE during an earlier exchange; wake it up.
        let mfrc522 = self.mfrc522.as_mut()?;
        match mfrc522.wupa() {
            Ok(atqa) => {
                self.pending = Some(atqa);
                Some(TagType::Iso14443A)
            }
            Err(err) => {
                trace!("wupa(): {:?}", err);
                None
            }
        }
    }

    fn anticoll(&mut self) -> Option<Uid> {
        let atqa = self.pending.take()?;
        let mfrc522 = self.mfrc522.as_mut()?;
        match mfrc522.select(&atqa) {
            Ok(uid) => Some(Uid::from_bytes(uid.as_bytes())),
            Err(err) => {
                trace!("select(): {:?}", err);
                None
            }
        }
    }

    fn cleanup(&mut self) {
        self.pending = None;
        if self.mfrc522.take().is_some() {
            info!("Released MFRC522");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uid_renders_decimal_colon_separated() {
        let uid = Uid::from_bytes(&[4, 130, 22, 9]);
        assert_eq!(uid.to_string(), "4:130:22:9");
    }

    #[test]
    fn uid_renders_full_byte_range_without_padding() {
        let uid = Uid::from_bytes(&[0, 7, 255, 16, 100, 1, 9]);
        assert_eq!(uid.to_string(), "0:7:255:16:100:1:9");
    }

    #[test]
    fn single_byte_and_empty_uids() {
        assert_eq!(Uid::from_bytes(&[42]).to_string(), "42");
        assert_eq!(Uid::default().to_string(), "");
    }

    #[test]
    fn uid_keeps_byte_order() {
        let uid = Uid::from_bytes(&[1, 2, 3, 4]);
        assert_eq!(uid.as_bytes(), &[1, 2, 3, 4]);
    }
}
