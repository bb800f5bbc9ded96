//! Driver for the TI ADS1256 24-bit delta-sigma ADC with a background
//! multi-channel scanner.
//!
//! The chip is reached through a [`Transport`]: [`HalTransport`] for
//! embedded-hal SPI and GPIO peripherals, or [`mock::MockTransport`] for
//! tests and simulation.

mod channel;
mod codec;
mod config;
mod constants;
mod delay;
mod device;
mod error;
mod hal;
pub mod mock;
mod scan;
mod scratch;
mod transport;

pub use channel::{Channel, ChannelPair, Sample};
pub use codec::{decode24, encode24, to_volts, MAX_CODE, MIN_CODE};
pub use config::Config;
pub use constants::*;
pub use delay::StdDelay;
pub use device::{Ads1256, Mode};
pub use error::Ads1256Error;
pub use hal::{HalError, HalTransport, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_POLL_US};
pub use scan::{CancelToken, ChannelScan, MAX_SCAN_ERRORS, POLL_INTERVAL};
pub use transport::{Transport, TransportError};
