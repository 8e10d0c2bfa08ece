//! Logging shims
//!
//! The firmware logs through `defmt` (`--features defmt`), hosted builds can
//! route through `log` (`--features log`). With neither enabled the macros
//! still type-check their arguments but emit nothing, which keeps unit tests
//! free of a global logger.
//!
//! Format strings must stay within the common subset of `defmt` and
//! `core::fmt`: plain `{}` and `{:?}`.

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, warn};

#[cfg(all(feature = "log", not(feature = "defmt")))]
pub(crate) use ::log::{debug, error, info, warn};

#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! log_noop {
    ($($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[cfg(not(any(feature = "defmt", feature = "log")))]
pub(crate) use log_noop as debug;
#[cfg(not(any(feature = "defmt", feature = "log")))]
pub(crate) use log_noop as error;
#[cfg(not(any(feature = "defmt", feature = "log")))]
pub(crate) use log_noop as info;
#[cfg(not(any(feature = "defmt", feature = "log")))]
pub(crate) use log_noop as warn;

/// Wraps a `Debug` value for logging through whichever backend is active
#[cfg(feature = "defmt")]
pub(crate) use defmt::Debug2Format as Dbg;

#[cfg(not(feature = "defmt"))]
pub(crate) struct Dbg<'a, T: core::fmt::Debug + ?Sized>(pub &'a T);

#[cfg(not(feature = "defmt"))]
impl<T: core::fmt::Debug + ?Sized> core::fmt::Debug for Dbg<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}
