//! Wake line pulse.
//!
//! The controller leaves its low-power state on a high-low-high pulse of the
//! wake line. The GPIO target is opened for each level change and closed right
//! after it; the sensor samples the line asynchronously so the short glitch
//! between two opens is harmless.

use embedded_hal::digital::{Error as _, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::{ConnectionId, Connector, Error};

/// Time the line is held high before and after the low phase.
pub const WAKE_EDGE_MS: u32 = 10;

/// Drive the wake line high, low for `low_ms`, then high again.
///
/// The first failing step aborts the rest of the pulse and is returned. Bring-up
/// treats the pulse as best effort and only logs the error.
pub async fn pulse_wake<C, D>(connector: &mut C, gpio: ConnectionId, delay: &mut D, low_ms: u32) -> Result<(), Error>
where
  C: Connector,
  D: DelayNs,
{
  trace!("wake pulse on {}, low for {} ms", gpio, low_ms);

  drive(connector, gpio, true)?;
  delay.delay_ms(WAKE_EDGE_MS).await;
  drive(connector, gpio, false)?;
  delay.delay_ms(low_ms).await;
  drive(connector, gpio, true)?;
  delay.delay_ms(WAKE_EDGE_MS).await;

  Ok(())
}

fn drive<C: Connector>(connector: &mut C, gpio: ConnectionId, high: bool) -> Result<(), Error> {
  let mut pin = connector.open_gpio(gpio).map_err(|_| Error::TargetUnavailable(gpio))?;
  let level = if high { pin.set_high() } else { pin.set_low() };
  level.map_err(|e| Error::GpioTransactionFailed(e.kind()))
}
