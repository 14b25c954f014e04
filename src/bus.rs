use core::future::Future;

use embassy_time::{with_timeout, Duration};
use embedded_hal::i2c::Error as _;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::Error;

/// Synchronous transaction layer over the controller's bus endpoint.
///
/// The endpoint is handed in by [`Transport::open`] and given back by
/// [`Transport::close`]; every transaction on a closed transport fails with
/// [`Error::BusNotOpen`]. Each call is a single bus transaction bounded by the
/// configured timeout.
#[derive(Debug)]
pub struct Transport<I> {
  bus: Option<I>,
  address: u8,
  timeout: Duration,
}

impl<I> Transport<I> {
  pub const fn new(address: u8, timeout: Duration) -> Self {
    Self { bus: None, address, timeout }
  }

  /// Attach an opened endpoint. A previously attached one is dropped, which
  /// closes it.
  pub fn open(&mut self, bus: I) {
    self.bus = Some(bus);
  }

  /// Detach the endpoint, returning it if one was open.
  pub fn close(&mut self) -> Option<I> {
    self.bus.take()
  }

  pub fn is_open(&self) -> bool {
    self.bus.is_some()
  }

  pub fn address(&self) -> u8 {
    self.address
  }
}

impl<I> Transport<I>
where
  I: I2c<SevenBitAddress>,
{
  /// Write `bytes` to the device. Returns the number of bytes written.
  pub async fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
    let address = self.address;
    let timeout = self.timeout;
    let bus = self.bus.as_mut().ok_or(Error::BusNotOpen)?;
    bounded(timeout, bus.write(address, bytes)).await?;
    Ok(bytes.len())
  }

  /// Fill `buf` from the device. Returns the number of bytes read.
  pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
    let address = self.address;
    let timeout = self.timeout;
    let len = buf.len();
    let bus = self.bus.as_mut().ok_or(Error::BusNotOpen)?;
    bounded(timeout, bus.read(address, buf)).await?;
    Ok(len)
  }

  /// Write `out` then read into `buf` as one transaction (repeated start), so
  /// no other bus user can slip in between. Returns the number of bytes read.
  pub async fn write_read(&mut self, out: &[u8], buf: &mut [u8]) -> Result<usize, Error> {
    let address = self.address;
    let timeout = self.timeout;
    let len = buf.len();
    let bus = self.bus.as_mut().ok_or(Error::BusNotOpen)?;
    bounded(timeout, bus.write_read(address, out, buf)).await?;
    Ok(len)
  }
}

async fn bounded<F, E>(timeout: Duration, transaction: F) -> Result<(), Error>
where
  F: Future<Output = Result<(), E>>,
  E: embedded_hal::i2c::Error,
{
  match with_timeout(timeout, transaction).await {
    Ok(Ok(())) => Ok(()),
    Ok(Err(e)) => Err(Error::BusTransfer(e.kind())),
    Err(_) => Err(Error::BusTimeout),
  }
}
