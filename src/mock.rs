//! In-memory [`Transport`] that behaves like an ADS1256 on the wire.
//!
//! `MockTransport` keeps a register file that WREG updates and RREG reads
//! back, generates conversion results from the multiplexer setting, logs
//! every call as a [`Frame`] and can be told to fail or stall. Clones share
//! state, so a test can keep one handle while the driver owns another.

use core::fmt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::codec::encode24;
use crate::constants::{CMD_RDATAC, CMD_RESET, CMD_RREG, CMD_SDATAC, CMD_WREG, NUM_REGISTERS, REG_MUX};
use crate::transport::{Transport, TransportError};

/// One call made on the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Write(Vec<u8>),
    /// Number of bytes requested
    Read(usize),
    ChipSelect(bool),
    WaitReady,
    PowerDown,
    PowerUp,
    Init,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockError {
    Injected(&'static str),
    Timeout,
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::Injected(op) => write!(f, "injected {op} failure"),
            MockError::Timeout => f.write_str("DRDY timeout"),
        }
    }
}

impl TransportError for MockError {
    fn is_timeout(&self) -> bool {
        matches!(self, MockError::Timeout)
    }
}

type SampleFn = Box<dyn FnMut(u8) -> i32 + Send>;

struct State {
    frames: Vec<Frame>,
    registers: [u8; NUM_REGISTERS],
    pending: VecDeque<u8>,
    continuous: bool,
    sample_fn: SampleFn,
    fail_all: bool,
    fail_next_write: bool,
    fail_next_deselect: bool,
    fail_ready: bool,
    short_read: bool,
    ready_delay: Duration,
}

#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A healthy device whose conversion result equals the MUX register value.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(State {
                frames: Vec::new(),
                registers: [0; NUM_REGISTERS],
                pending: VecDeque::new(),
                continuous: false,
                sample_fn: Box::new(|mux| mux as i32),
                fail_all: false,
                fail_next_write: false,
                fail_next_deselect: false,
                fail_ready: false,
                short_read: false,
                ready_delay: Duration::ZERO,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.state().frames.clone()
    }

    /// Payloads of the write frames, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state()
            .frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_frames(&self) {
        self.state().frames.clear();
    }

    /// Simulated register contents.
    ///
    /// # Panics
    ///
    /// If `addr` is not a register address.
    pub fn register(&self, addr: u8) -> u8 {
        check_addr(addr);
        self.state().registers[addr as usize]
    }

    /// Presets a simulated register. Panics like [`register`](Self::register).
    pub fn set_register(&self, addr: u8, value: u8) {
        check_addr(addr);
        self.state().registers[addr as usize] = value;
    }

    /// Whether the simulated device is streaming (RDATAC)
    pub fn is_continuous(&self) -> bool {
        self.state().continuous
    }

    /// Replaces the conversion generator; it receives the MUX register value.
    pub fn set_sample_fn(&self, f: impl FnMut(u8) -> i32 + Send + 'static) {
        self.state().sample_fn = Box::new(f);
    }

    /// Makes every call fail (while still being logged)
    pub fn fail_all(&self, fail: bool) {
        self.state().fail_all = fail;
    }

    pub fn fail_next_write(&self) {
        self.state().fail_next_write = true;
    }

    pub fn fail_next_deselect(&self) {
        self.state().fail_next_deselect = true;
    }

    /// Makes `wait_ready` report a timeout
    pub fn fail_ready(&self, fail: bool) {
        self.state().fail_ready = fail;
    }

    /// Makes every read return one byte less than asked for
    pub fn short_read(&self, short: bool) {
        self.state().short_read = short;
    }

    /// Time `wait_ready` blocks before DRDY "goes low"
    pub fn set_ready_delay(&self, delay: Duration) {
        self.state().ready_delay = delay;
    }

    fn record(&self, frame: Frame, op: &'static str) -> Result<MutexGuard<'_, State>, MockError> {
        let mut state = self.state();
        state.frames.push(frame);
        if state.fail_all {
            return Err(MockError::Injected(op));
        }
        Ok(state)
    }
}

fn check_addr(addr: u8) {
    assert!(
        (addr as usize) < NUM_REGISTERS,
        "register address 0x{addr:02X} out of range"
    );
}

impl State {
    fn apply(&mut self, data: &[u8]) {
        let Some(&opcode) = data.first() else {
            return;
        };
        let addr = (opcode & 0x0F) as usize;
        match opcode & 0xF0 {
            op if op == CMD_WREG && data.len() >= 3 && addr < NUM_REGISTERS => {
                self.registers[addr] = data[2];
            }
            op if op == CMD_RREG && addr < NUM_REGISTERS => {
                self.pending.push_back(self.registers[addr]);
            }
            _ => match opcode {
                CMD_RDATAC => self.continuous = true,
                CMD_SDATAC | CMD_RESET => self.continuous = false,
                _ => {}
            },
        }
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.record(Frame::Read(buf.len()), "read")?;

        if state.pending.is_empty() && buf.len() == 3 {
            let mux = state.registers[REG_MUX as usize];
            let code = (state.sample_fn)(mux);
            state.pending.extend(encode24(code));
        }

        let count = if state.short_read {
            buf.len().saturating_sub(1)
        } else {
            buf.len()
        };
        for byte in buf.iter_mut().take(count) {
            *byte = state.pending.pop_front().unwrap_or(0);
        }
        state.pending.clear();
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.record(Frame::Write(data.to_vec()), "write")?;
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(MockError::Injected("write"));
        }
        state.apply(data);
        Ok(data.len())
    }

    fn wait_ready(&mut self) -> Result<(), Self::Error> {
        let (delay, timeout) = {
            let state = self.record(Frame::WaitReady, "wait_ready")?;
            (state.ready_delay, state.fail_ready)
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if timeout {
            return Err(MockError::Timeout);
        }
        Ok(())
    }

    fn set_chip_select(&mut self, active: bool) -> Result<(), Self::Error> {
        let mut state = self.record(Frame::ChipSelect(active), "chip select")?;
        if !active && state.fail_next_deselect {
            state.fail_next_deselect = false;
            return Err(MockError::Injected("chip select"));
        }
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        self.record(Frame::PowerDown, "power down").map(|_| ())
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        self.record(Frame::PowerUp, "power up").map(|_| ())
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        self.record(Frame::Init, "init").map(|_| ())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.record(Frame::Close, "close").map(|_| ())
    }
}

/// [`DelayNs`] that returns immediately
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
