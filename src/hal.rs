use core::fmt;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::transport::{Transport, TransportError};

/// Number of DRDY polls before giving up
pub const DEFAULT_READY_ATTEMPTS: u32 = 5000;

/// Microseconds between DRDY polls
pub const DEFAULT_READY_POLL_US: u32 = 100;

#[derive(Clone, Debug)]
pub enum HalError<SpiError, GpioError> {
    Spi(SpiError),
    Gpio(GpioError),
    Timeout,
}

impl<SpiError: fmt::Debug, GpioError: fmt::Debug> fmt::Display for HalError<SpiError, GpioError> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::Spi(e) => write!(f, "SPI error: {e:?}"),
            HalError::Gpio(e) => write!(f, "GPIO error: {e:?}"),
            HalError::Timeout => f.write_str("DRDY pin did not go low"),
        }
    }
}

impl<SpiError, GpioError> TransportError for HalError<SpiError, GpioError>
where
    SpiError: fmt::Debug + Send + 'static,
    GpioError: fmt::Debug + Send + 'static,
{
    fn is_timeout(&self) -> bool {
        matches!(self, HalError::Timeout)
    }
}

/// [`Transport`] over embedded-hal peripherals: an SPI device plus
/// discrete CS, DRDY and PDWN pins.
pub struct HalTransport<SPI, CS, DRDY, PDWN, DELAY> {
    spi: SPI,
    cs: CS,
    drdy: DRDY,
    pdwn: PDWN,
    delay: DELAY,
    ready_attempts: u32,
    ready_poll_us: u32,
}

impl<SPI, CS, DRDY, PDWN, DELAY, SpiError, GpioError> HalTransport<SPI, CS, DRDY, PDWN, DELAY>
where
    SPI: SpiDevice<Error = SpiError>,
    CS: OutputPin<Error = GpioError>,
    DRDY: InputPin<Error = GpioError>,
    PDWN: OutputPin<Error = GpioError>,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, cs: CS, drdy: DRDY, pdwn: PDWN, delay: DELAY) -> Self {
        HalTransport {
            spi,
            cs,
            drdy,
            pdwn,
            delay,
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            ready_poll_us: DEFAULT_READY_POLL_US,
        }
    }

    /// Sets how long [`Transport::wait_ready`] polls DRDY before timing out.
    pub fn with_ready_timeout(mut self, attempts: u32, poll_us: u32) -> Self {
        self.ready_attempts = attempts;
        self.ready_poll_us = poll_us;
        self
    }

    pub fn release(self) -> (SPI, CS, DRDY, PDWN, DELAY) {
        (self.spi, self.cs, self.drdy, self.pdwn, self.delay)
    }
}

impl<SPI, CS, DRDY, PDWN, DELAY, SpiError, GpioError> Transport
    for HalTransport<SPI, CS, DRDY, PDWN, DELAY>
where
    SPI: SpiDevice<Error = SpiError>,
    CS: OutputPin<Error = GpioError>,
    DRDY: InputPin<Error = GpioError>,
    PDWN: OutputPin<Error = GpioError>,
    DELAY: DelayNs,
    SpiError: fmt::Debug + Send + 'static,
    GpioError: fmt::Debug + Send + 'static,
{
    type Error = HalError<SpiError, GpioError>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.spi.read(buf).map_err(HalError::Spi)?;
        Ok(buf.len())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.spi.write(data).map_err(HalError::Spi)?;
        Ok(data.len())
    }

    fn wait_ready(&mut self) -> Result<(), Self::Error> {
        for _ in 0..self.ready_attempts {
            if self.drdy.is_low().map_err(HalError::Gpio)? {
                return Ok(());
            }
            self.delay.delay_us(self.ready_poll_us);
        }
        log::error!("DRDY pin did not go low");
        Err(HalError::Timeout)
    }

    fn set_chip_select(&mut self, active: bool) -> Result<(), Self::Error> {
        if active {
            self.cs.set_low().map_err(HalError::Gpio)
        } else {
            self.cs.set_high().map_err(HalError::Gpio)
        }
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        self.pdwn.set_low().map_err(HalError::Gpio)
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        self.pdwn.set_high().map_err(HalError::Gpio)
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(HalError::Gpio)?;
        self.pdwn.set_high().map_err(HalError::Gpio)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(HalError::Gpio)
    }
}
