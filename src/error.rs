//! Error type shared by all driver operations.

/// Errors reported by the driver.
///
/// Everything is detected synchronously and returned to the immediate
/// caller; the driver keeps no background error channel and does no logging
/// of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Out-of-range pin, address or size, or a select pin already in use on
    /// the bus. Rejected before any bus traffic is generated.
    InvalidArgument,
    /// The bus's device registry is full.
    OutOfMemory,
    /// A pin operation failed; carries the [`Gpio`](crate::Gpio)
    /// implementation's error verbatim.
    Gpio(E),
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Gpio(err)
    }
}
