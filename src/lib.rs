#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Async, `no_std` driver for the Goodix GT9xx capacitive multi-touch
//! controller.
//!
//! The crate covers the whole acquisition pipeline between the sensor and a
//! consumer of HID-style touch reports:
//!
//! - Synchronous bus transactions with a hard timeout ceiling ([`Transport`])
//! - The wake-line pulse that brings the sensor out of low power ([`wake`])
//! - Power-on bring-up: firmware handshake, configuration push and version
//!   query ([`Gt9xx::on_power_active`])
//! - Frame acquisition and decode of up to five tracked contacts ([`frame`])
//! - Fixed-layout report synthesis delivered to a caller owned request queue
//!   ([`report`], [`RequestQueue`])
//! - A two-phase interrupt pipeline: a blocking acquisition phase feeding a
//!   lock-protected completion phase through a single-slot channel
//!   ([`Dispatch`])
//!
//! Everything the host platform owns (opening bus and GPIO targets, the request
//! queue, delays and the interrupt line) is reached through traits so the core
//! stays independent of any particular HAL or driver framework.
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use embedded_hal_async::{delay::DelayNs, digital::Wait};
//! use gt9xx::{Config, Connector, Dispatch, Gt9xx, PowerState, RequestQueue, Resources};
//!
//! async fn example<C, D, IRQ, Q>(connector: C, delay: D, resources: Resources, mut irq: IRQ, mut queue: Q)
//! where
//!   C: Connector,
//!   D: DelayNs,
//!   IRQ: Wait,
//!   Q: RequestQueue,
//! {
//!   let mut device = Gt9xx::new(connector, delay, resources, Config::default());
//!   let dispatch = Dispatch::<CriticalSectionRawMutex>::new();
//!   dispatch.power_up(&mut device, PowerState::Unspecified).await.ok();
//!   dispatch.run(&mut device, &mut irq, &mut queue).await;
//! }
//! ```
#[cfg(test)]
extern crate std;

mod fmt;

mod bus;
mod config;
mod defs;
mod dispatch;
pub mod frame;
mod init;
mod queue;
pub mod report;
mod resources;
pub mod wake;

#[cfg(test)]
mod testing;

use core::fmt::{Display, Formatter};

use embedded_hal::digital::OutputPin;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

pub use bus::Transport;
pub use config::Config;
pub use defs::{
  CONFIG_MAX_LEN, CONTACT_RECORD_LEN, DEFAULT_ADDRESS, FIRMWARE_SENTINEL, FRAME_CAPACITY, GT911_CONFIG, MAX_CONTACTS,
  STATUS_READ_LEN,
};
pub use dispatch::{Dispatch, DispatchState, Stats, IRQ_RETRY_DELAY};
pub use frame::{Acquisition, Contact, RawFrame};
pub use init::{FirmwareVersion, Gt9xx, PowerState};
pub use queue::RequestQueue;
pub use report::{Report, ReportSlot, ScanClock, REPORT_ID, REPORT_LEN, SCAN_TIME_STEP};
pub use resources::{ConnectionClass, ConnectionId, ResourceDescriptor, Resources, SerialKind};

/// Errors that can occur while interacting with the controller or the host.
///
/// Bus and GPIO failures are reduced to their `embedded-hal` error kinds so a
/// result can travel from the acquisition phase to the completion phase
/// without dragging the peripheral's error type along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
  /// A bus transaction did not finish before the configured ceiling.
  BusTimeout,
  /// A transaction was attempted while the bus endpoint was closed.
  BusNotOpen,
  /// The bus transaction failed with the underlying driver error.
  BusTransfer(embedded_hal::i2c::ErrorKind),
  /// The status byte announced more contacts than the controller can track.
  CorruptFrame(u8),
  /// No caller request was pending when a report became available.
  RequestQueueEmpty,
  /// The firmware status probe answered with an unexpected value.
  FirmwareHandshakeMismatch { expected: u8, found: u8 },
  /// Driving the wake line failed.
  GpioTransactionFailed(embedded_hal::digital::ErrorKind),
  /// The host could not create or open the target behind a connection id.
  TargetUnavailable(ConnectionId),
  /// No serial bus connection was found among the platform resources.
  ResourceNotFound,
  /// The caller's request did not provide a usable output buffer.
  OutputBufferUnavailable,
  /// A write exceeded the driver's fixed transfer buffer.
  BufferOverflow,
}

impl Error {
  /// Returns `true` for errors that must tear the device down.
  pub const fn is_fatal(&self) -> bool {
    matches!(self, Error::TargetUnavailable(_) | Error::ResourceNotFound)
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      Error::BusTimeout => write!(f, "bus transaction timed out"),
      Error::BusNotOpen => write!(f, "bus endpoint is not open"),
      Error::BusTransfer(kind) => write!(f, "bus transfer failed: {kind}"),
      Error::CorruptFrame(count) => write!(f, "corrupt frame announcing {count} contacts"),
      Error::RequestQueueEmpty => write!(f, "no pending request"),
      Error::FirmwareHandshakeMismatch { expected, found } => {
        write!(f, "firmware handshake mismatch: expected 0x{expected:02X}, found 0x{found:02X}")
      }
      Error::GpioTransactionFailed(kind) => write!(f, "gpio transaction failed: {kind}"),
      Error::TargetUnavailable(id) => write!(f, "target {id} unavailable"),
      Error::ResourceNotFound => write!(f, "serial bus resource not found"),
      Error::OutputBufferUnavailable => write!(f, "request output buffer unavailable"),
      Error::BufferOverflow => write!(f, "write exceeds transfer buffer"),
    }
  }
}

/// Opens the bus and GPIO targets the platform enumerated for the device.
///
/// Dropping a returned target closes it. The wake controller relies on that to
/// open and close the GPIO target around every level change.
pub trait Connector {
  /// Bus endpoint talking to the controller.
  type Bus: I2c<SevenBitAddress>;
  /// GPIO target driving the wake line.
  type Pin: OutputPin;
  /// Failure reported by the host while creating or opening a target.
  type Error: core::fmt::Debug;

  /// Open the serial bus endpoint identified by `id`.
  fn open_bus(&mut self, id: ConnectionId) -> Result<Self::Bus, Self::Error>;

  /// Open the GPIO target identified by `id` for writing.
  fn open_gpio(&mut self, id: ConnectionId) -> Result<Self::Pin, Self::Error>;
}
