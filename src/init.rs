use core::fmt::{Display, Formatter};

use embedded_hal_async::delay::DelayNs;

use crate::defs::{Reg, CONFIG_MAX_LEN, FIRMWARE_SENTINEL};
use crate::frame::RawFrame;
use crate::{wake, Config, Connector, Error, Resources, Transport};

/// Device power states reported by the host around power transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
  Unspecified,
  D0,
  D1,
  D2,
  D3,
  D3Final,
  PrepareForHibernation,
  Maximum,
  Invalid,
}

impl PowerState {
  pub const fn as_str(self) -> &'static str {
    match self {
      PowerState::Unspecified => "Unspecified",
      PowerState::D0 => "D0",
      PowerState::D1 => "D1",
      PowerState::D2 => "D2",
      PowerState::D3 => "D3",
      PowerState::D3Final => "D3Final",
      PowerState::PrepareForHibernation => "PrepareForHibernation",
      PowerState::Maximum => "Maximum",
      PowerState::Invalid => "Invalid",
    }
  }
}

impl Display for PowerState {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Product id and firmware patch level read from the product id register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
  /// ASCII product id, NUL padded for three character ids ("911").
  pub product_id: [u8; 4],
  pub patch: u16,
}

impl FirmwareVersion {
  pub const fn from_bytes(raw: [u8; 6]) -> Self {
    Self { product_id: [raw[0], raw[1], raw[2], raw[3]], patch: u16::from_le_bytes([raw[4], raw[5]]) }
  }
}

impl Display for FirmwareVersion {
  /// `911_1060` for a three character product id, `9271_1060` for four.
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let len = if self.product_id[3] == 0 { 3 } else { 4 };
    for b in &self.product_id[..len] {
      write!(f, "{}", char::from(*b))?;
    }
    write!(f, "_{:04x}", self.patch)
  }
}

/// Goodix GT9xx controller bound to the host's connections.
///
/// Create it with [`Gt9xx::new`] once the platform resources are known, then
/// call [`Gt9xx::on_power_active`] whenever the device enters its working
/// state and [`Gt9xx::on_power_inactive`] when it leaves it.
pub struct Gt9xx<C: Connector, D> {
  connector: C,
  delay: D,
  resources: Resources,
  config: Config,
  pub(crate) transport: Transport<C::Bus>,
  pub(crate) frame: RawFrame,
  power: PowerState,
  initialized: bool,
  version: Option<FirmwareVersion>,
}

impl<C, D> Gt9xx<C, D>
where
  C: Connector,
{
  /// Nothing is opened or sent to the device until the first power-up.
  pub fn new(connector: C, delay: D, resources: Resources, config: Config) -> Self {
    Self {
      connector,
      delay,
      resources,
      transport: Transport::new(config.address, config.transaction_timeout),
      config,
      frame: RawFrame::new(),
      power: PowerState::Unspecified,
      initialized: false,
      version: None,
    }
  }

  pub fn resources(&self) -> &Resources {
    &self.resources
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn power_state(&self) -> PowerState {
    self.power
  }

  /// `true` between a completed bring-up and the next power-down.
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  /// Version read during the last bring-up.
  pub fn version(&self) -> Option<FirmwareVersion> {
    self.version
  }

  /// Consume the driver and return the connector and delay.
  pub fn release(self) -> (C, D) {
    (self.connector, self.delay)
  }

  pub(crate) fn open_bus(&mut self) -> Result<(), Error> {
    let id = self.resources.bus;
    let bus = self.connector.open_bus(id).map_err(|_| {
      error!("cannot open bus target {}", id);
      Error::TargetUnavailable(id)
    })?;
    self.transport.open(bus);
    Ok(())
  }

  /// Read the firmware status byte.
  pub async fn firmware_status(&mut self) -> Result<u8, Error> {
    let mut buf = [0u8; 1];
    self.transport.write_read(&Reg::FirmwareStatus.addr(), &mut buf).await?;
    Ok(buf[0])
  }

  /// Check that the firmware is up and answering its status probe.
  pub async fn handshake(&mut self) -> Result<(), Error> {
    match self.firmware_status().await? {
      FIRMWARE_SENTINEL => Ok(()),
      found => Err(Error::FirmwareHandshakeMismatch { expected: FIRMWARE_SENTINEL, found }),
    }
  }

  /// Write the configured blob at the configuration register.
  pub async fn push_config(&mut self) -> Result<(), Error> {
    let blob = self.config.blob;
    if blob.len() > CONFIG_MAX_LEN {
      return Err(Error::BufferOverflow);
    }

    let mut buf = [0u8; 2 + CONFIG_MAX_LEN];
    buf[..2].copy_from_slice(&Reg::Config.addr());
    buf[2..2 + blob.len()].copy_from_slice(blob);
    self.transport.write(&buf[..2 + blob.len()]).await?;
    Ok(())
  }

  pub async fn firmware_version(&mut self) -> Result<FirmwareVersion, Error> {
    let mut raw = [0u8; 6];
    self.transport.write_read(&Reg::ProductId.addr(), &mut raw).await?;
    Ok(FirmwareVersion::from_bytes(raw))
  }

  pub async fn chip_id(&mut self) -> Result<u8, Error> {
    let mut buf = [0u8; 1];
    self.transport.write_read(&Reg::ChipId.addr(), &mut buf).await?;
    info!("chip id {}", buf[0]);
    Ok(buf[0])
  }

  /// Leave the working state.
  ///
  /// Only the bus endpoint is closed; the controller keeps its configuration.
  pub fn on_power_inactive(&mut self, target: PowerState) {
    info!("leaving D0 for {}", target);
    self.transport.close();
    self.initialized = false;
    self.power = target;
  }
}

impl<C, D> Gt9xx<C, D>
where
  C: Connector,
  D: DelayNs,
{
  /// Enter the working state and bring the controller up.
  ///
  /// Only failing to open the bus target is fatal. Every later step is best
  /// effort: wake, handshake, configuration and version failures are logged
  /// and the sequence carries on, since each following step probes the
  /// controller again.
  pub async fn on_power_active(&mut self, previous: PowerState) -> Result<(), Error> {
    info!("entering D0 from {}", previous);

    self.open_bus()?;
    self.frame.clear();
    self.bring_up().await;

    self.power = PowerState::D0;
    self.initialized = true;
    Ok(())
  }

  async fn bring_up(&mut self) {
    match self.resources.gpio {
      Some(gpio) => {
        if let Err(e) = wake::pulse_wake(&mut self.connector, gpio, &mut self.delay, self.config.wake_low_ms).await {
          warn!("wake pulse failed: {}", e);
        }
      }
      None => debug!("no wake line, skipping wake pulse"),
    }

    self.delay.delay_ms(self.config.boot_settle_ms).await;

    if let Err(e) = self.handshake().await {
      warn!("firmware not responding: {}", e);
    }

    if let Err(e) = self.push_config().await {
      warn!("configuration push failed: {}", e);
    }

    self.delay.delay_ms(self.config.config_settle_ms).await;

    match self.firmware_version().await {
      Ok(version) => {
        info!("firmware version {}", version);
        self.version = Some(version);
      }
      Err(e) => warn!("version query failed: {}", e),
    }
  }
}
