use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;

use crate::channel::ChannelPair;
use crate::codec::decode24;
use crate::config::Config;
use crate::constants::*;
use crate::delay::StdDelay;
use crate::error::Ads1256Error;
use crate::scratch::Scratch;
use crate::transport::{Transport, TransportError};

pub(crate) type Result<T, E> = core::result::Result<T, Ads1256Error<E>>;

/// Settling time after SDATAC before the next frame
const SDATAC_SETTLE_US: u32 = 100;
/// t6: delay between the RREG/WREG frame and the data phase
const T6_US: u32 = 50;
/// Delay between RDATA and clocking out the result
const RDATA_SETTLE_US: u32 = 200;
/// Power-up routines after RESET
const RESET_SETTLE_MS: u32 = 50;

/// Whether the device is streaming conversions (RDATAC) or taking commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    Continuous,
}

/// State guarded by the device lock.
pub(crate) struct Inner<T, D> {
    pub(crate) transport: T,
    delay: D,
    pub(crate) mode: Mode,
    last_read: [u8; NUM_REGISTERS],
    last_written: [u8; NUM_REGISTERS],
    scratch: Scratch,
}

/// Clocks exactly `buf.len()` bytes in; fewer is a [`Ads1256Error::ShortRead`].
fn read_exact<T: Transport>(transport: &mut T, buf: &mut [u8]) -> Result<(), T::Error> {
    let got = transport.read(buf).map_err(Ads1256Error::Transport)?;
    if got < buf.len() {
        return Err(Ads1256Error::ShortRead {
            expected: buf.len(),
            got,
        });
    }
    Ok(())
}

impl<T: Transport, D: DelayNs> Inner<T, D> {
    pub(crate) fn select(&mut self) -> Result<(), T::Error> {
        self.transport
            .set_chip_select(true)
            .map_err(Ads1256Error::Transport)
    }

    pub(crate) fn deselect(&mut self) -> Result<(), T::Error> {
        self.transport
            .set_chip_select(false)
            .map_err(Ads1256Error::Transport)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), T::Error> {
        self.transport
            .write(data)
            .map(|_| ())
            .map_err(Ads1256Error::Transport)
    }

    /// Sends SDATAC if RDATAC is active. Expects CS to be selected.
    fn exit_continuous(&mut self) -> Result<(), T::Error> {
        if self.mode == Mode::Continuous {
            log::debug!("Exiting continuous mode");
            self.write_bytes(&[CMD_SDATAC])?;
            self.mode = Mode::Idle;
            self.delay.delay_us(SDATAC_SETTLE_US);
        }
        Ok(())
    }

    pub(crate) fn wait_ready(&mut self) -> Result<(), T::Error> {
        self.transport.wait_ready().map_err(|e| {
            if e.is_timeout() {
                log::error!("Timed out waiting for DRDY: {}", e);
                Ads1256Error::ReadyTimeout
            } else {
                Ads1256Error::Transport(e)
            }
        })
    }

    pub(crate) fn write_register(&mut self, reg: u8, value: u8) -> Result<(), T::Error> {
        if reg as usize >= NUM_REGISTERS {
            return Err(Ads1256Error::InvalidAddress(reg));
        }
        self.select()?;
        let res = self.write_register_frame(reg, value);
        Ads1256Error::join_results(res, self.deselect())
    }

    fn write_register_frame(&mut self, reg: u8, value: u8) -> Result<(), T::Error> {
        self.exit_continuous()?;
        log::debug!("Writing register 0x{:02X}: 0x{:02X}", reg, value);
        // second byte is the number of registers minus one
        self.write_bytes(&[CMD_WREG | (reg & 0x0F), 0x00, value])?;
        self.delay.delay_us(T6_US);
        self.last_written[reg as usize] = value;
        Ok(())
    }

    pub(crate) fn read_register(&mut self, reg: u8) -> Result<u8, T::Error> {
        if reg as usize >= NUM_REGISTERS {
            return Err(Ads1256Error::InvalidAddress(reg));
        }
        self.select()?;
        let res = self.read_register_frame(reg);
        Ads1256Error::join_results(res, self.deselect())
    }

    fn read_register_frame(&mut self, reg: u8) -> Result<u8, T::Error> {
        self.exit_continuous()?;
        self.write_bytes(&[CMD_RREG | (reg & 0x0F), 0x00])?;
        self.delay.delay_us(T6_US);

        let buf = self.scratch.one_byte();
        read_exact(&mut self.transport, &mut buf[..])?;
        let value = buf[0];

        log::debug!("Read register 0x{:02X}: 0x{:02X}", reg, value);
        self.last_read[reg as usize] = value;
        Ok(value)
    }

    pub(crate) fn read_all_registers(&mut self) -> Result<(), T::Error> {
        for reg in Register::ALL {
            self.read_register(reg.addr())?;
        }
        Ok(())
    }

    pub(crate) fn send_command(&mut self, command: Command) -> Result<(), T::Error> {
        self.select()?;
        let res = self.command_frame(command);
        Ads1256Error::join_results(res, self.deselect())
    }

    fn command_frame(&mut self, command: Command) -> Result<(), T::Error> {
        match command {
            // RESET ends continuous mode by itself
            Command::Reset | Command::ReadDataContinuous | Command::StopReadDataContinuous => {}
            _ => self.exit_continuous()?,
        }

        log::debug!("Sending command: 0x{:02X}", command.opcode());
        self.write_bytes(&[command.opcode()])?;

        match command {
            Command::ReadDataContinuous => self.mode = Mode::Continuous,
            Command::Reset | Command::StopReadDataContinuous => self.mode = Mode::Idle,
            _ => {}
        }
        Ok(())
    }

    /// RDATA: one conversion result, CS handled here.
    pub(crate) fn read_sample(&mut self) -> Result<i32, T::Error> {
        self.select()?;
        let res = self.read_sample_frame();
        Ads1256Error::join_results(res, self.deselect())
    }

    fn read_sample_frame(&mut self) -> Result<i32, T::Error> {
        self.exit_continuous()?;
        self.write_bytes(&[CMD_RDATA])?;
        self.delay.delay_us(RDATA_SETTLE_US);
        self.read_code()
    }

    /// Clocks out the three result bytes. Expects CS to be selected.
    pub(crate) fn read_code(&mut self) -> Result<i32, T::Error> {
        let buf = self.scratch.three_bytes();
        read_exact(&mut self.transport, &mut buf[..])?;
        log::trace!("Raw data: {:02X} {:02X} {:02X}", buf[0], buf[1], buf[2]);
        Ok(decode24(*buf))
    }
}

/// TI ADS1256 protocol engine.
///
/// Every operation takes the internal lock, so the handle can be shared
/// between the caller and a scan worker through an `Arc`. The transport
/// only has to be `Send`.
pub struct Ads1256<T, D = StdDelay> {
    inner: Mutex<Inner<T, D>>,
}

impl<T: Transport> Ads1256<T, StdDelay> {
    /// Creates a driver that sleeps the current thread for datasheet delays
    pub fn new(transport: T) -> Self {
        Ads1256::with_delay(transport, StdDelay)
    }
}

impl<T: Transport, D: DelayNs> Ads1256<T, D> {
    pub fn with_delay(transport: T, delay: D) -> Self {
        Ads1256 {
            inner: Mutex::new(Inner {
                transport,
                delay,
                mode: Mode::Idle,
                last_read: [0; NUM_REGISTERS],
                last_written: [0; NUM_REGISTERS],
                scratch: Scratch::default(),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner<T, D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initializes the transport and raises PDWN
    pub fn init_transport(&self) -> Result<(), T::Error> {
        let mut inner = self.lock();
        inner.transport.init().map_err(Ads1256Error::Transport)?;
        inner.transport.power_up().map_err(Ads1256Error::Transport)
    }

    /// Resets the device and applies `config`.
    ///
    /// The whole sequence runs under one lock. On error the register
    /// snapshots may hold a partial configuration.
    pub fn initialize(&self, config: &Config) -> Result<(), T::Error> {
        let mut inner = self.lock();

        inner.send_command(Command::Reset)?;
        inner.delay.delay_ms(RESET_SETTLE_MS);

        inner.write_register(REG_STATUS, config.status_byte())?;
        inner.write_register(REG_ADCON, config.adcon_byte())?;
        inner.write_register(REG_DRATE, config.data_rate.code())?;

        inner.read_all_registers()?;
        for reg in Register::ALL {
            log::debug!("Register {}: 0x{:02X}", reg.name(), inner.last_read[reg.addr() as usize]);
        }

        inner.send_command(Command::SelfCalibrate)?;
        inner.wait_ready()
    }

    /// Writes a single register
    pub fn write_register(&self, reg: u8, value: u8) -> Result<(), T::Error> {
        self.lock().write_register(reg, value)
    }

    /// Reads a single register
    pub fn read_register(&self, reg: u8) -> Result<u8, T::Error> {
        self.lock().read_register(reg)
    }

    /// Reads every register in address order and returns the snapshot
    pub fn read_all_registers(&self) -> Result<[u8; NUM_REGISTERS], T::Error> {
        let mut inner = self.lock();
        inner.read_all_registers()?;
        Ok(inner.last_read)
    }

    /// Sends a single-byte command.
    ///
    /// Commands for which [`Command::needs_ready_wait`] holds finish when
    /// DRDY goes low; call [`wait_ready`](Self::wait_ready) afterwards or use
    /// the calibration helpers which do so.
    pub fn send_command(&self, command: Command) -> Result<(), T::Error> {
        self.lock().send_command(command)
    }

    /// Blocks until DRDY goes low
    pub fn wait_ready(&self) -> Result<(), T::Error> {
        self.lock().wait_ready()
    }

    /// Software reset, leaves continuous mode
    pub fn reset(&self) -> Result<(), T::Error> {
        self.send_command(Command::Reset)
    }

    /// Shuts down the analog section. DRDY stays high until a wake-up.
    pub fn standby(&self) -> Result<(), T::Error> {
        self.send_command(Command::Standby)
    }

    /// Exits SYNC or standby
    pub fn wakeup(&self) -> Result<(), T::Error> {
        self.send_command(Command::Wakeup)
    }

    pub fn sync(&self) -> Result<(), T::Error> {
        self.send_command(Command::Sync)
    }

    pub fn power_down(&self) -> Result<(), T::Error> {
        self.lock()
            .transport
            .power_down()
            .map_err(Ads1256Error::Transport)
    }

    pub fn power_up(&self) -> Result<(), T::Error> {
        self.lock()
            .transport
            .power_up()
            .map_err(Ads1256Error::Transport)
    }

    fn calibrate(&self, command: Command) -> Result<(), T::Error> {
        let mut inner = self.lock();
        inner.send_command(command)?;
        if command.needs_ready_wait() {
            inner.wait_ready()?;
        }
        Ok(())
    }

    /// Full self-calibration, offset and gain
    pub fn self_calibrate(&self) -> Result<(), T::Error> {
        self.calibrate(Command::SelfCalibrate)
    }

    pub fn self_offset_calibrate(&self) -> Result<(), T::Error> {
        self.calibrate(Command::SelfOffsetCalibrate)
    }

    pub fn self_gain_calibrate(&self) -> Result<(), T::Error> {
        self.calibrate(Command::SelfGainCalibrate)
    }

    /// System offset calibration. Requires a zero differential input on the
    /// selected pair.
    pub fn system_offset_calibrate(&self) -> Result<(), T::Error> {
        self.calibrate(Command::SystemOffsetCalibrate)
    }

    /// System gain calibration. Requires a full-scale input on the selected
    /// pair.
    pub fn system_gain_calibrate(&self) -> Result<(), T::Error> {
        self.calibrate(Command::SystemGainCalibrate)
    }

    /// Points the multiplexer at `pair`
    pub fn set_channel_pair(&self, pair: ChannelPair) -> Result<(), T::Error> {
        self.write_register(REG_MUX, pair.mux())
    }

    /// Reads one conversion result with RDATA
    pub fn read_data(&self) -> Result<i32, T::Error> {
        self.lock().read_sample()
    }

    /// One-shot conversion: SYNC, WAKEUP, wait for DRDY, then RDATA.
    pub fn single_conversion(&self) -> Result<i32, T::Error> {
        let mut inner = self.lock();
        inner.send_command(Command::Sync)?;
        inner.send_command(Command::Wakeup)?;
        inner.wait_ready()?;
        inner.read_sample()
    }

    /// Offset calibration value (OFC2:OFC1:OFC0), signed
    pub fn read_offset_calibration(&self) -> Result<i32, T::Error> {
        let mut inner = self.lock();
        let low = inner.read_register(REG_OFC0)?;
        let mid = inner.read_register(REG_OFC1)?;
        let high = inner.read_register(REG_OFC2)?;
        Ok(decode24([high, mid, low]))
    }

    /// Full-scale calibration value (FSC2:FSC1:FSC0), unsigned
    pub fn read_fullscale_calibration(&self) -> Result<u32, T::Error> {
        let mut inner = self.lock();
        let low = inner.read_register(REG_FSC0)?;
        let mid = inner.read_register(REG_FSC1)?;
        let high = inner.read_register(REG_FSC2)?;
        Ok(u32::from_be_bytes([0, high, mid, low]))
    }

    /// Value seen by the last read of `reg`
    pub fn last_read_register(&self, reg: Register) -> u8 {
        self.lock().last_read[reg.addr() as usize]
    }

    /// Value sent by the last write of `reg`
    pub fn last_written_register(&self, reg: Register) -> u8 {
        self.lock().last_written[reg.addr() as usize]
    }

    /// Copy of the last-read snapshot, indexed by register address
    pub fn registers(&self) -> [u8; NUM_REGISTERS] {
        self.lock().last_read
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// Resets, enters standby, powers down and closes the transport.
    ///
    /// Every step runs even if an earlier one failed; the errors are joined.
    pub fn close(&self) -> Result<(), T::Error> {
        let mut inner = self.lock();
        let errors: Vec<_> = [
            inner.send_command(Command::Reset).err(),
            inner.send_command(Command::Standby).err(),
            inner
                .transport
                .power_down()
                .map_err(Ads1256Error::Transport)
                .err(),
            inner
                .transport
                .close()
                .map_err(Ads1256Error::Transport)
                .err(),
        ]
        .into_iter()
        .flatten()
        .collect();

        match Ads1256Error::join(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::mock::{Frame, MockError, MockTransport, NoDelay};

    fn device() -> (Ads1256<MockTransport, NoDelay>, MockTransport) {
        let mock = MockTransport::new();
        (Ads1256::with_delay(mock.clone(), NoDelay), mock)
    }

    #[test]
    fn register_round_trip() {
        let (adc, _mock) = device();
        for reg in 0..NUM_REGISTERS as u8 {
            adc.write_register(reg, 0x40 + reg).unwrap();
            assert_eq!(adc.read_register(reg).unwrap(), 0x40 + reg);
            let reg = Register::from_addr(reg).unwrap();
            assert_eq!(adc.last_written_register(reg), 0x40 + reg.addr());
            assert_eq!(adc.last_read_register(reg), 0x40 + reg.addr());
        }
    }

    #[test]
    fn invalid_address_never_touches_transport() {
        let (adc, mock) = device();
        assert!(matches!(
            adc.write_register(11, 0x01),
            Err(Ads1256Error::InvalidAddress(11))
        ));
        assert!(matches!(
            adc.read_register(0xFF),
            Err(Ads1256Error::InvalidAddress(0xFF))
        ));
        assert!(mock.frames().is_empty());
    }

    #[test]
    fn write_register_frame() {
        let (adc, mock) = device();
        adc.write_register(REG_DRATE, 0x0A).unwrap();
        assert_eq!(
            mock.frames(),
            vec![
                Frame::ChipSelect(true),
                Frame::Write(vec![0x53, 0x00, 0x0A]),
                Frame::ChipSelect(false),
            ]
        );
    }

    #[test]
    fn read_register_frame() {
        let (adc, mock) = device();
        mock.set_register(REG_STATUS, 0x30);
        assert_eq!(adc.read_register(REG_STATUS).unwrap(), 0x30);
        assert_eq!(
            mock.frames(),
            vec![
                Frame::ChipSelect(true),
                Frame::Write(vec![0x10, 0x00]),
                Frame::Read(1),
                Frame::ChipSelect(false),
            ]
        );
    }

    #[test]
    fn register_access_leaves_continuous_mode() {
        let (adc, mock) = device();
        adc.send_command(Command::ReadDataContinuous).unwrap();
        assert_eq!(adc.mode(), Mode::Continuous);

        mock.clear_frames();
        adc.write_register(REG_MUX, 0x18).unwrap();
        assert_eq!(adc.mode(), Mode::Idle);
        assert_eq!(
            mock.written(),
            vec![vec![CMD_SDATAC], vec![0x51, 0x00, 0x18]]
        );

        adc.send_command(Command::ReadDataContinuous).unwrap();
        mock.clear_frames();
        adc.read_register(REG_MUX).unwrap();
        assert_eq!(adc.mode(), Mode::Idle);
        assert_eq!(mock.written(), vec![vec![CMD_SDATAC], vec![0x11, 0x00]]);
    }

    #[test]
    fn reset_skips_sdatac() {
        let (adc, mock) = device();
        adc.send_command(Command::ReadDataContinuous).unwrap();
        mock.clear_frames();
        adc.reset().unwrap();
        assert_eq!(adc.mode(), Mode::Idle);
        assert_eq!(mock.written(), vec![vec![CMD_RESET]]);
    }

    #[test]
    fn commands_do_not_wait_for_ready() {
        let (adc, mock) = device();
        adc.standby().unwrap();
        adc.send_command(Command::SelfCalibrate).unwrap();
        assert!(!mock.frames().contains(&Frame::WaitReady));

        adc.self_calibrate().unwrap();
        assert_eq!(mock.frames().last(), Some(&Frame::WaitReady));
    }

    #[test]
    fn transport_error_still_deselects() {
        let (adc, mock) = device();
        mock.fail_next_write();
        let err = adc.write_register(REG_IO, 0xE0).unwrap_err();
        assert!(matches!(err, Ads1256Error::Transport(_)));
        assert_eq!(mock.frames().last(), Some(&Frame::ChipSelect(false)));
        assert_eq!(adc.last_written_register(Register::Io), 0x00);
    }

    #[test]
    fn failing_deselect_is_joined() {
        let (adc, mock) = device();
        mock.fail_all(true);
        let err = adc.send_command(Command::Sync).unwrap_err();
        // select fails first, nothing else is attempted
        assert_eq!(err.flatten().len(), 1);

        mock.fail_all(false);
        mock.fail_next_write();
        mock.fail_next_deselect();
        let err = adc.send_command(Command::Sync).unwrap_err();
        assert_eq!(err.flatten().len(), 2);
    }

    #[test]
    fn short_read_is_reported() {
        let (adc, mock) = device();
        mock.short_read(true);
        let err = adc.read_register(REG_STATUS).unwrap_err();
        assert!(matches!(
            err,
            Ads1256Error::ShortRead { expected: 1, got: 0 }
        ));
        let err = adc.read_data().unwrap_err();
        assert!(matches!(err, Ads1256Error::ShortRead { expected: 3, .. }));
    }

    #[test]
    fn ready_timeout_maps_to_ready_timeout() {
        let (adc, mock) = device();
        mock.fail_ready(true);
        assert!(matches!(adc.wait_ready(), Err(Ads1256Error::ReadyTimeout)));
    }

    #[test]
    fn initialize_sequence() {
        let (adc, mock) = device();
        let cfg = Config::default()
            .with_buffer(true)
            .with_auto_calibrate(true)
            .with_gain(Gain::Gain8)
            .with_clock_out(ClockOut::Div1)
            .with_data_rate(DataRate::Sps100);
        adc.initialize(&cfg).unwrap();

        let written = mock.written();
        assert_eq!(written[0], vec![CMD_RESET]);
        assert_eq!(written[1], vec![0x50, 0x00, 0x06]);
        assert_eq!(written[2], vec![0x52, 0x00, 0x23]);
        assert_eq!(written[3], vec![0x53, 0x00, 0x08]);
        for (i, reg) in Register::ALL.iter().enumerate() {
            assert_eq!(written[4 + i], vec![CMD_RREG | reg.addr(), 0x00]);
        }
        assert_eq!(written[15], vec![CMD_SELFCAL]);
        assert_eq!(written.len(), 16);
        assert_eq!(mock.frames().last(), Some(&Frame::WaitReady));

        let regs = adc.registers();
        assert_eq!(regs[REG_STATUS as usize], 0x06);
        assert_eq!(regs[REG_ADCON as usize], 0x23);
        assert_eq!(regs[REG_DRATE as usize], 0x08);
    }

    #[test]
    fn read_data_uses_rdata() {
        let (adc, mock) = device();
        mock.set_sample_fn(|_| -8388608);
        assert_eq!(adc.read_data().unwrap(), -8388608);
        assert_eq!(
            mock.frames(),
            vec![
                Frame::ChipSelect(true),
                Frame::Write(vec![CMD_RDATA]),
                Frame::Read(3),
                Frame::ChipSelect(false),
            ]
        );
    }

    #[test]
    fn single_conversion_sequence() {
        let (adc, mock) = device();
        adc.set_channel_pair(ChannelPair::new(Channel::Ain2, Channel::Ain3))
            .unwrap();
        mock.set_sample_fn(|mux| mux as i32 * 10);
        mock.clear_frames();

        assert_eq!(adc.single_conversion().unwrap(), 0x23 * 10);
        assert_eq!(
            mock.written(),
            vec![vec![CMD_SYNC], vec![CMD_WAKEUP], vec![CMD_RDATA]]
        );
        assert!(mock.frames().contains(&Frame::WaitReady));
    }

    #[test]
    fn wakeup_sends_0x00() {
        let (adc, mock) = device();
        adc.wakeup().unwrap();
        assert_eq!(mock.written(), vec![vec![CMD_WAKEUP]]);
    }

    #[test]
    fn calibration_waits_for_ready() {
        let (adc, mock) = device();
        let calibrations: [fn(&Ads1256<MockTransport, NoDelay>) -> Result<(), MockError>; 5] = [
            Ads1256::self_calibrate,
            Ads1256::self_offset_calibrate,
            Ads1256::self_gain_calibrate,
            Ads1256::system_offset_calibrate,
            Ads1256::system_gain_calibrate,
        ];
        for calibrate in calibrations {
            mock.clear_frames();
            calibrate(&adc).unwrap();
            assert_eq!(mock.frames().last(), Some(&Frame::WaitReady));
        }

        mock.fail_ready(true);
        assert!(matches!(
            adc.self_calibrate(),
            Err(Ads1256Error::ReadyTimeout)
        ));
    }

    #[test]
    fn calibration_registers() {
        let (adc, mock) = device();
        mock.set_register(REG_OFC0, 0x01);
        mock.set_register(REG_OFC1, 0x00);
        mock.set_register(REG_OFC2, 0xFF);
        mock.set_register(REG_FSC0, 0x56);
        mock.set_register(REG_FSC1, 0x34);
        mock.set_register(REG_FSC2, 0x12);
        assert_eq!(adc.read_offset_calibration().unwrap(), -65535);
        assert_eq!(adc.read_fullscale_calibration().unwrap(), 0x123456);
    }

    #[test]
    fn close_joins_every_step() {
        let (adc, mock) = device();
        adc.close().unwrap();
        let frames = mock.frames();
        assert!(frames.contains(&Frame::PowerDown));
        assert_eq!(frames.last(), Some(&Frame::Close));

        let (adc, mock) = device();
        mock.fail_all(true);
        let err = adc.close().unwrap_err();
        assert_eq!(err.flatten().len(), 4);
        assert_eq!(mock.frames().last(), Some(&Frame::Close));
    }
}
