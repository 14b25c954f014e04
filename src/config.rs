use embassy_time::Duration;

use crate::defs::{DEFAULT_ADDRESS, GT911_CONFIG};

/// Bring-up and transport settings for one controller instance.
///
/// The defaults match the reference GT911 panel: 20 ms wake pulse, 100 ms
/// settle after firmware boot and after the configuration push, and a 60 s
/// ceiling on every bus transaction. The ceiling is a safety net for a wedged
/// bus, real transactions complete within milliseconds.
///
/// # Example
/// ```no_run
/// use embassy_time::Duration;
/// use gt9xx::Config;
///
/// let config = Config::default()
///   .with_address(0x14)
///   .with_wake_low_ms(10)
///   .with_transaction_timeout(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub address: u8,
  pub wake_low_ms: u32,
  pub boot_settle_ms: u32,
  pub config_settle_ms: u32,
  pub transaction_timeout: Duration,
  pub blob: &'static [u8],
}

impl Config {
  pub const fn new(
    address: u8,
    wake_low_ms: u32,
    boot_settle_ms: u32,
    config_settle_ms: u32,
    transaction_timeout: Duration,
    blob: &'static [u8],
  ) -> Self {
    Self { address, wake_low_ms, boot_settle_ms, config_settle_ms, transaction_timeout, blob }
  }

  pub const fn with_address(mut self, address: u8) -> Self {
    self.address = address;
    self
  }

  pub const fn with_wake_low_ms(mut self, wake_low_ms: u32) -> Self {
    self.wake_low_ms = wake_low_ms;
    self
  }

  pub const fn with_boot_settle_ms(mut self, boot_settle_ms: u32) -> Self {
    self.boot_settle_ms = boot_settle_ms;
    self
  }

  pub const fn with_config_settle_ms(mut self, config_settle_ms: u32) -> Self {
    self.config_settle_ms = config_settle_ms;
    self
  }

  pub const fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
    self.transaction_timeout = timeout;
    self
  }

  /// Replace the vendor configuration pushed during bring-up. The bytes are
  /// opaque to the driver and written verbatim after the config register.
  pub const fn with_blob(mut self, blob: &'static [u8]) -> Self {
    self.blob = blob;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new(DEFAULT_ADDRESS, 20, 100, 100, Duration::from_secs(60), &GT911_CONFIG)
  }
}
