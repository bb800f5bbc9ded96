use core::fmt;

use thiserror::Error;

/// Errors from the ADS1256 protocol engine and scan controller.
///
/// `E` is the error type of the [`Transport`](crate::Transport) in use.
#[derive(Debug, Error)]
pub enum Ads1256Error<E> {
    #[error("invalid register address 0x{0:02X}")]
    InvalidAddress(u8),
    #[error("transport error: {0}")]
    Transport(E),
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("timed out waiting for DRDY")]
    ReadyTimeout,
    #[error("no channels to scan")]
    NoChannels,
    #[error("failed to spawn scan worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("channel scan worker panicked")]
    WorkerPanicked,
    #[error("{}", DisplayJoined(.0))]
    Joined(Vec<Ads1256Error<E>>),
    /// Errors collected by a channel scan
    #[error("channel scan errors: {}", DisplayJoined(.0))]
    Scan(Vec<Ads1256Error<E>>),
}

impl<E> Ads1256Error<E> {
    /// Collapses `errors` into one: `None` when empty, the error itself when
    /// alone, [`Ads1256Error::Joined`] otherwise.
    pub fn join(mut errors: Vec<Ads1256Error<E>>) -> Option<Ads1256Error<E>> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Ads1256Error::Joined(errors)),
        }
    }

    /// Joins an operation's result with the result of the cleanup that must
    /// follow it, typically deselecting the chip.
    pub(crate) fn join_results<T>(
        op: Result<T, Ads1256Error<E>>,
        cleanup: Result<(), Ads1256Error<E>>,
    ) -> Result<T, Ads1256Error<E>> {
        match (op, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(a), Err(b)) => Err(Ads1256Error::Joined(vec![a, b])),
        }
    }

    /// The individual errors, flattening nested joins.
    pub fn flatten(&self) -> Vec<&Ads1256Error<E>> {
        match self {
            Ads1256Error::Joined(errors) | Ads1256Error::Scan(errors) => {
                errors.iter().flat_map(|e| e.flatten()).collect()
            }
            e => vec![e],
        }
    }
}

impl<E: Clone> Clone for Ads1256Error<E> {
    fn clone(&self) -> Self {
        match self {
            Ads1256Error::InvalidAddress(addr) => Ads1256Error::InvalidAddress(*addr),
            Ads1256Error::Transport(e) => Ads1256Error::Transport(e.clone()),
            Ads1256Error::ShortRead { expected, got } => Ads1256Error::ShortRead {
                expected: *expected,
                got: *got,
            },
            Ads1256Error::ReadyTimeout => Ads1256Error::ReadyTimeout,
            Ads1256Error::NoChannels => Ads1256Error::NoChannels,
            // io::Error is not Clone
            Ads1256Error::Spawn(e) => {
                Ads1256Error::Spawn(std::io::Error::new(e.kind(), e.to_string()))
            }
            Ads1256Error::WorkerPanicked => Ads1256Error::WorkerPanicked,
            Ads1256Error::Joined(errors) => Ads1256Error::Joined(errors.clone()),
            Ads1256Error::Scan(errors) => Ads1256Error::Scan(errors.clone()),
        }
    }
}

struct DisplayJoined<'a, E>(&'a [Ads1256Error<E>]);

impl<E: fmt::Display> fmt::Display for DisplayJoined<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
