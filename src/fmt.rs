//! Logging shim.
//!
//! Forwards to `defmt` or `log` depending on the enabled Cargo feature and
//! compiles to nothing when neither is enabled. Format strings must stay within
//! the subset both backends accept (`{}` and `{:?}`).
#![macro_use]
#![allow(unused_macros)]

macro_rules! log_at {
  ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
    {
      #[cfg(feature = "defmt")]
      ::defmt::$level!($s $(, $x)*);
      #[cfg(feature = "log")]
      ::log::$level!($s $(, $x)*);
      #[cfg(not(any(feature = "defmt", feature = "log")))]
      let _ = ($( & $x ),*);
    }
  };
}

macro_rules! trace {
  ($($t:tt)*) => { log_at!(trace, $($t)*) };
}

macro_rules! debug {
  ($($t:tt)*) => { log_at!(debug, $($t)*) };
}

macro_rules! info {
  ($($t:tt)*) => { log_at!(info, $($t)*) };
}

macro_rules! warn {
  ($($t:tt)*) => { log_at!(warn, $($t)*) };
}

macro_rules! error {
  ($($t:tt)*) => { log_at!(error, $($t)*) };
}
