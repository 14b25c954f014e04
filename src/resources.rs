use core::fmt::{Display, Formatter};

use crate::Error;

/// Opaque 64-bit identifier the platform assigns to a bus or GPIO connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId(pub u64);

impl ConnectionId {
  /// Build an id from the low and high halves platforms usually report.
  pub const fn from_parts(low: u32, high: u32) -> Self {
    Self(((high as u64) << 32) | low as u64)
  }

  pub const fn low(self) -> u32 {
    self.0 as u32
  }

  pub const fn high(self) -> u32 {
    (self.0 >> 32) as u32
  }
}

impl Display for ConnectionId {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{:08x}:{:08x}", self.high(), self.low())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialKind {
  I2c,
  Spi,
  Uart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionClass {
  Serial(SerialKind),
  Gpio,
}

/// One entry of the platform's resource list for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceDescriptor {
  Connection { class: ConnectionClass, id: ConnectionId },
  Interrupt,
  Memory,
  Other,
}

/// Connections the device needs, resolved from the platform resource list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resources {
  /// Serial bus endpoint of the controller.
  pub bus: ConnectionId,
  /// Wake line. Without one the wake pulse is skipped.
  pub gpio: Option<ConnectionId>,
  /// Position of the interrupt descriptor in the resource list. Without one
  /// the host has to poll.
  pub interrupt: Option<usize>,
}

impl Resources {
  pub const fn new(bus: ConnectionId) -> Self {
    Self { bus, gpio: None, interrupt: None }
  }

  pub const fn with_gpio(mut self, gpio: ConnectionId) -> Self {
    self.gpio = Some(gpio);
    self
  }

  pub const fn with_interrupt(mut self, index: usize) -> Self {
    self.interrupt = Some(index);
    self
  }

  /// Walk the resource list the platform enumerated for the device.
  ///
  /// The first I²C or SPI connection is the bus; later ones are ignored. Every
  /// GPIO connection overrides the previous one, so the last wins. Only the
  /// first interrupt is recorded. A list without a usable serial connection
  /// fails with [`Error::ResourceNotFound`].
  pub fn from_descriptors(descriptors: &[ResourceDescriptor]) -> Result<Self, Error> {
    let mut bus = None;
    let mut gpio = None;
    let mut interrupt = None;

    for (index, descriptor) in descriptors.iter().enumerate() {
      match *descriptor {
        ResourceDescriptor::Connection { class: ConnectionClass::Serial(SerialKind::I2c | SerialKind::Spi), id } => {
          if bus.is_none() {
            bus = Some(id);
          }
        }
        ResourceDescriptor::Connection { class: ConnectionClass::Gpio, id } => gpio = Some(id),
        ResourceDescriptor::Interrupt => {
          if interrupt.is_none() {
            interrupt = Some(index);
          }
        }
        _ => {}
      }
    }

    let Some(bus) = bus else {
      error!("no I2C or SPI connection among {} resources", descriptors.len());
      return Err(Error::ResourceNotFound);
    };

    if gpio.is_none() {
      warn!("no GPIO connection, wake pulses will be skipped");
    }
    if interrupt.is_none() {
      warn!("no interrupt resource, the host has to poll");
    }

    Ok(Self { bus, gpio, interrupt })
  }
}
