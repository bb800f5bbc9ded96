use core::fmt;

/// Error reported by a [`Transport`].
pub trait TransportError: fmt::Debug + fmt::Display + Send + 'static {
    /// Whether this error means the DRDY wait gave up.
    fn is_timeout(&self) -> bool {
        false
    }
}

/// Byte-level access to an ADS1256: SPI data lines plus the CS, DRDY and
/// PDWN pins.
///
/// The protocol engine never touches hardware directly, so bridges (USB to
/// SPI adapters, native SPI buses, simulators) plug in here.
pub trait Transport {
    type Error: TransportError;

    /// Clocks in up to `buf.len()` bytes and returns how many arrived.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Clocks out `data` and returns how many bytes were sent.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Blocks until DRDY goes low.
    fn wait_ready(&mut self) -> Result<(), Self::Error>;

    /// Drives CS. `true` selects the device (pin low).
    fn set_chip_select(&mut self, active: bool) -> Result<(), Self::Error>;

    /// Pulls PDWN low.
    fn power_down(&mut self) -> Result<(), Self::Error>;

    /// Pulls PDWN high.
    fn power_up(&mut self) -> Result<(), Self::Error>;

    fn init(&mut self) -> Result<(), Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    type Error = T::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(data)
    }

    fn wait_ready(&mut self) -> Result<(), Self::Error> {
        (**self).wait_ready()
    }

    fn set_chip_select(&mut self, active: bool) -> Result<(), Self::Error> {
        (**self).set_chip_select(active)
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        (**self).power_down()
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        (**self).power_up()
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        (**self).init()
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}
