use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, trace};

use crate::components::rfid::{Presence, ReaderDriver, Uid};
use crate::config::RfidConfig;
use crate::signals::StopFlag;

pub const STARTUP_PROMPT: &str = "Place RFID card near the reader...";
pub const STOPPING_MESSAGE: &str = "\nStopping RFID reader...";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    NoTag,
    RequestFailed,
    CollisionFailed,
    Detected(Uid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Scanning,
    Stopped,
}

pub fn format_detection(uid: &Uid) -> String {
    format!("Card detected! UID: {}", uid)
}

/// Owns the driver and calls `cleanup()` when dropped, whichever way the
/// scanner exits.
struct DriverGuard<D: ReaderDriver> {
    driver: D,
}

impl<D: ReaderDriver> Deref for DriverGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.driver
    }
}

impl<D: ReaderDriver> DerefMut for DriverGuard<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: ReaderDriver> Drop for DriverGuard<D> {
    fn drop(&mut self) {
        debug!("Cleaning up reader driver");
        self.driver.cleanup();
    }
}

/// Poll, report and debounce loop on top of a [`ReaderDriver`].
pub struct TagScanner<D: ReaderDriver, W: Write> {
    driver: DriverGuard<D>,
    out: W,
    stop: StopFlag,
    session: Session,
    debounce: Duration,
    poll_interval: Duration,
}

impl<D: ReaderDriver, W: Write> TagScanner<D, W> {
    pub fn new(driver: D, out: W, stop: StopFlag) -> Self {
        TagScanner {
            driver: DriverGuard { driver },
            out,
            stop,
            session: Session::Scanning,
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(driver: D, out: W, stop: StopFlag, config: &RfidConfig) -> Self {
        Self::new(driver, out, stop)
            .debounce(config.debounce())
            .poll_interval(config.poll_interval())
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Runs until the stop flag is raised. The driver is cleaned up on
    /// return, including when an error ends the loop early.
    pub fn run(mut self) -> Result<()> {
        info!("Tag scanner running");
        self.print(STARTUP_PROMPT)?;

        while self.session == Session::Scanning {
            match self.scan_once()? {
                None => self.session = Session::Stopped,
                Some(ScanResult::Detected(uid)) => {
                    info!("Detected tag {}", uid);
                    self.print(&format_detection(&uid))?;
                    if !self.stop.sleep(self.debounce, self.poll_interval) {
                        self.session = Session::Stopped;
                    }
                }
                Some(miss) => trace!("Poll ended without detection: {:?}", miss),
            }
        }

        info!("Tag scanner stopping");
        self.print(STOPPING_MESSAGE)?;
        Ok(())
    }

    /// One poll cycle without the debounce. `None` means a stop was
    /// observed and the session is over.
    pub fn scan_once(&mut self) -> Result<Option<ScanResult>> {
        if self.stop.is_stopped() {
            self.session = Session::Stopped;
            return Ok(None);
        }
        match self.driver.wait_for_tag(&self.stop)? {
            Presence::Interrupted => {
                self.session = Session::Stopped;
                return Ok(None);
            }
            Presence::Absent => return Ok(Some(ScanResult::NoTag)),
            Presence::Present => {}
        }

        let tag_type = self.driver.request();
        if self.stop.is_stopped() {
            self.session = Session::Stopped;
            return Ok(None);
        }
        match tag_type {
            None => return Ok(Some(ScanResult::RequestFailed)),
            Some(tag_type) => trace!("Request answered by {:?}", tag_type),
        }

        let uid = self.driver.anticoll();
        if self.stop.is_stopped() {
            self.session = Session::Stopped;
            return Ok(None);
        }
        Ok(Some(match uid {
            None => ScanResult::CollisionFailed,
            Some(uid) => ScanResult::Detected(uid),
        }))
    }

    fn print(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).context("Writing to console")?;
        self.out.flush().context("Flushing console")?;
        Ok(())
    }
}
