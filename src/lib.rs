//! Polls an MFRC522 RFID reader over SPI and reports the UID of every tag
//! presented to it.

pub mod components;
pub mod config;
pub mod logging;
pub mod scanner;
pub mod signals;
