//! Continuous multi-channel scanning on a background thread.
//!
//! For every pair the worker exits RDATAC, rewrites MUX, restarts RDATAC,
//! waits for DRDY and clocks out one result. The device lock is held for one
//! pair at a time, never for a whole cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::channel::{ChannelPair, Sample};
use crate::constants::{Command, REG_MUX};
use crate::device::{Ads1256, Inner, Mode, Result};
use crate::error::Ads1256Error;
use crate::transport::Transport;

/// A scan stops itself once it has collected more errors than this
pub const MAX_SCAN_ERRORS: usize = 50;

/// How often stop flags are checked while sleeping or waiting
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cooperative cancellation flag shared between threads.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

struct ScanState<E> {
    interval: Duration,
    pairs: Vec<ChannelPair>,
    done: AtomicBool,
    running: AtomicBool,
    errors: Mutex<Vec<Ads1256Error<E>>>,
}

impl<E> ScanState<E> {
    fn errors(&self) -> MutexGuard<'_, Vec<Ads1256Error<E>>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_err(&self, err: Ads1256Error<E>) {
        let mut errors = self.errors();
        errors.push(err);
        if errors.len() > MAX_SCAN_ERRORS && !self.done.swap(true, Ordering::SeqCst) {
            log::warn!("Channel scan stopped after {} errors", errors.len());
        }
    }

    fn should_stop(&self, cancel: &CancelToken) -> bool {
        self.done.load(Ordering::SeqCst) || cancel.is_cancelled()
    }

    /// Sleeps for the scan interval, waking early on stop or cancel.
    ///
    /// An interval too long to put on the clock sleeps until stopped.
    fn sleep_interval(&self, cancel: &CancelToken) {
        let deadline = Instant::now().checked_add(self.interval);
        while !self.should_stop(cancel) {
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }
                    (deadline - now).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            thread::sleep(pause);
        }
    }
}

/// Marks the scan finished when the worker returns or unwinds.
struct WorkerGuard<'a, E>(&'a ScanState<E>);

impl<E> Drop for WorkerGuard<'_, E> {
    fn drop(&mut self) {
        self.0.done.store(true, Ordering::SeqCst);
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running scan started by [`Ads1256::scan_channels`].
///
/// Dropping the handle asks the worker to stop without waiting for it.
pub struct ChannelScan<E> {
    state: Arc<ScanState<E>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<E> ChannelScan<E> {
    /// Asks the worker to stop after the pair it is on. Does not block.
    pub fn stop(&self) {
        self.state.done.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested or the scan stopped itself
    pub fn is_done(&self) -> bool {
        self.state.done.load(Ordering::SeqCst)
    }

    /// Whether the worker thread is still in its loop
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.state.interval
    }

    pub fn pairs(&self) -> &[ChannelPair] {
        &self.state.pairs
    }

    pub fn error_count(&self) -> usize {
        self.state.errors().len()
    }

    fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Channel scan worker panicked");
                self.state.errors().push(Ads1256Error::WorkerPanicked);
            }
        }
    }
}

impl<E: Clone> ChannelScan<E> {
    /// All errors collected so far as one [`Ads1256Error::Scan`]
    pub fn err(&self) -> Option<Ads1256Error<E>> {
        let errors = self.state.errors();
        if errors.is_empty() {
            return None;
        }
        Some(Ads1256Error::Scan(errors.clone()))
    }

    /// Blocks until the scan is stopped and its worker has exited, then
    /// returns the collected errors.
    ///
    /// When `cancel` fires first, returns the errors collected so far
    /// without stopping the worker; call [`stop`](Self::stop) for that.
    pub fn wait(&self, cancel: Option<&CancelToken>) -> Result<(), E> {
        let cancelled = || cancel.is_some_and(CancelToken::is_cancelled);

        while !self.is_done() {
            if cancelled() {
                return self.result();
            }
            thread::sleep(POLL_INTERVAL);
        }
        while self.is_running() {
            if cancelled() {
                return self.result();
            }
            thread::sleep(POLL_INTERVAL);
        }

        self.join_worker();
        self.result()
    }

    fn result(&self) -> Result<(), E> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<E> Drop for ChannelScan<E> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T, D> Ads1256<T, D>
where
    T: Transport + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Starts cycling through `pairs` on a background thread, calling
    /// `on_sample` once per pair per cycle, in list order.
    ///
    /// The worker sleeps `interval` between cycles and runs until the
    /// returned [`ChannelScan`] is stopped, `cancel` fires, or more than
    /// [`MAX_SCAN_ERRORS`] errors pile up. Errors during a cycle are
    /// collected rather than returned.
    pub fn scan_channels<F>(
        self: &Arc<Self>,
        cancel: CancelToken,
        interval: Duration,
        pairs: Vec<ChannelPair>,
        on_sample: F,
    ) -> Result<ChannelScan<T::Error>, T::Error>
    where
        F: FnMut(Sample) + Send + 'static,
    {
        if pairs.is_empty() {
            return Err(Ads1256Error::NoChannels);
        }

        {
            let mut inner = self.lock();
            if inner.mode == Mode::Continuous {
                inner.send_command(Command::StopReadDataContinuous)?;
            }
        }

        let state = Arc::new(ScanState {
            interval,
            pairs,
            done: AtomicBool::new(false),
            running: AtomicBool::new(true),
            errors: Mutex::new(Vec::new()),
        });

        let adc = Arc::clone(self);
        let worker_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("ads1256-scan".into())
            .spawn(move || adc.run_scan(&worker_state, &cancel, on_sample));

        match handle {
            Ok(handle) => Ok(ChannelScan {
                state,
                worker: Mutex::new(Some(handle)),
            }),
            Err(e) => {
                state.done.store(true, Ordering::SeqCst);
                state.running.store(false, Ordering::SeqCst);
                Err(Ads1256Error::Spawn(e))
            }
        }
    }

    fn run_scan<F>(&self, state: &ScanState<T::Error>, cancel: &CancelToken, mut on_sample: F)
    where
        F: FnMut(Sample),
    {
        let _guard = WorkerGuard(state);
        log::debug!("Channel scan started on {} pairs", state.pairs.len());

        while !state.should_stop(cancel) {
            for &pair in &state.pairs {
                if state.should_stop(cancel) {
                    break;
                }
                // lock is released before the callback runs
                match self.scan_pair(pair) {
                    Ok(code) => on_sample(Sample { pair, code }),
                    Err(e) => state.add_err(e),
                }
            }
            state.sleep_interval(cancel);
        }

        log::debug!("Channel scan finished");
    }

    fn scan_pair(&self, pair: ChannelPair) -> Result<i32, T::Error> {
        let mut inner = self.lock();
        start_streaming(&mut inner, pair)?;
        inner.wait_ready()?;

        inner.select()?;
        let code = inner.read_code();
        Ads1256Error::join_results(code, inner.deselect())
    }
}

/// Leaves RDATAC, points MUX at `pair` and re-enters RDATAC.
fn start_streaming<T: Transport, D: DelayNs>(
    inner: &mut Inner<T, D>,
    pair: ChannelPair,
) -> Result<(), T::Error> {
    // MUX must not be written while the previous pair is still streaming
    if inner.mode == Mode::Continuous {
        inner.send_command(Command::StopReadDataContinuous)?;
    }
    log::debug!("Scanning {}", pair);
    inner.write_register(REG_MUX, pair.mux())?;
    inner.send_command(Command::ReadDataContinuous)
}
