//! Hand-written doubles for the bus, wake line, delay and request queue.

use core::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::ErrorKind;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use crate::{Config, ConnectionId, Connector, Gt9xx, RequestQueue, Resources};

/// Everything observable that happened on the mocked hardware, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
  BusOpen,
  Write(Vec<u8>),
  Read(usize),
  WriteRead(Vec<u8>, usize),
  GpioOpen,
  GpioClose,
  Level(bool),
  DelayMs(u32),
}

pub type Log = Rc<RefCell<Vec<Op>>>;

pub fn log() -> Log {
  Rc::new(RefCell::new(Vec::new()))
}

#[derive(Default)]
struct BusState {
  memory: BTreeMap<u16, u8>,
  cursor: u16,
  fail_next: Option<ErrorKind>,
  fail_register: Option<(u16, ErrorKind)>,
  hang: bool,
  addresses: Vec<u8>,
}

/// Register-addressed I²C double.
///
/// Writes of two or more bytes store the payload at the big-endian register in
/// the first two bytes; reads return the stored bytes (zero when unset). Writing
/// the end-of-command pattern therefore clears the status byte exactly like
/// the controller does.
#[derive(Clone)]
pub struct MockBus {
  state: Rc<RefCell<BusState>>,
  log: Log,
}

impl MockBus {
  pub fn new() -> Self {
    Self::with_log(log())
  }

  pub fn with_log(log: Log) -> Self {
    Self { state: Rc::new(RefCell::new(BusState::default())), log }
  }

  pub fn set_register(&self, reg: u16, bytes: &[u8]) {
    let mut state = self.state.borrow_mut();
    for (i, b) in bytes.iter().enumerate() {
      state.memory.insert(reg + i as u16, *b);
    }
  }

  pub fn register(&self, reg: u16) -> u8 {
    self.state.borrow().memory.get(&reg).copied().unwrap_or(0)
  }

  /// Lay out a status frame starting at the status register.
  pub fn set_frame(&self, bytes: &[u8]) {
    self.set_register(0x814E, bytes);
  }

  pub fn fail_next(&self, kind: ErrorKind) {
    self.state.borrow_mut().fail_next = Some(kind);
  }

  pub fn fail_register(&self, reg: u16, kind: ErrorKind) {
    self.state.borrow_mut().fail_register = Some((reg, kind));
  }

  pub fn hang(&self, hang: bool) {
    self.state.borrow_mut().hang = hang;
  }

  pub fn ops(&self) -> Vec<Op> {
    self.log.borrow().clone()
  }

  pub fn clear_ops(&self) {
    self.log.borrow_mut().clear();
  }

  pub fn addresses(&self) -> Vec<u8> {
    self.state.borrow().addresses.clone()
  }

  fn store(&self, bytes: &[u8]) -> Option<u16> {
    if bytes.len() < 2 {
      return None;
    }
    let reg = u16::from_be_bytes([bytes[0], bytes[1]]);
    let mut state = self.state.borrow_mut();
    for (i, b) in bytes[2..].iter().enumerate() {
      state.memory.insert(reg + i as u16, *b);
    }
    state.cursor = reg;
    Some(reg)
  }

  fn load(&self, reg: u16, buf: &mut [u8]) {
    let state = self.state.borrow();
    for (i, b) in buf.iter_mut().enumerate() {
      *b = state.memory.get(&(reg + i as u16)).copied().unwrap_or(0);
    }
  }

  fn failure(&self, reg: Option<u16>) -> Option<ErrorKind> {
    let mut state = self.state.borrow_mut();
    if let Some(kind) = state.fail_next.take() {
      return Some(kind);
    }
    match (state.fail_register, reg) {
      (Some((failing, kind)), Some(reg)) if failing == reg => Some(kind),
      _ => None,
    }
  }
}

impl ErrorType for MockBus {
  type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for MockBus {
  async fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
    let hang = self.state.borrow().hang;
    if hang {
      core::future::pending::<()>().await;
    }
    self.state.borrow_mut().addresses.push(address);

    match operations {
      [Operation::Write(bytes)] => {
        self.log.borrow_mut().push(Op::Write(bytes.to_vec()));
        let reg = (bytes.len() >= 2).then(|| u16::from_be_bytes([bytes[0], bytes[1]]));
        if let Some(kind) = self.failure(reg) {
          return Err(kind);
        }
        self.store(bytes);
      }
      [Operation::Read(buf)] => {
        self.log.borrow_mut().push(Op::Read(buf.len()));
        if let Some(kind) = self.failure(None) {
          return Err(kind);
        }
        let cursor = self.state.borrow().cursor;
        self.load(cursor, buf);
      }
      [Operation::Write(bytes), Operation::Read(buf)] => {
        self.log.borrow_mut().push(Op::WriteRead(bytes.to_vec(), buf.len()));
        let reg = u16::from_be_bytes([bytes[0], bytes[1]]);
        if let Some(kind) = self.failure(Some(reg)) {
          return Err(kind);
        }
        self.load(reg, buf);
      }
      _ => return Err(ErrorKind::Other),
    }
    Ok(())
  }
}

#[derive(Default)]
struct GpioState {
  fail_at: Option<usize>,
  changes: usize,
}

/// Wake-line double. Logs open on creation, every level and close on drop.
pub struct MockPin {
  state: Rc<RefCell<GpioState>>,
  log: Log,
}

impl MockPin {
  fn set(&mut self, level: bool) -> Result<(), digital::ErrorKind> {
    let mut state = self.state.borrow_mut();
    let index = state.changes;
    state.changes += 1;
    if state.fail_at == Some(index) {
      return Err(digital::ErrorKind::Other);
    }
    self.log.borrow_mut().push(Op::Level(level));
    Ok(())
  }
}

impl Drop for MockPin {
  fn drop(&mut self) {
    self.log.borrow_mut().push(Op::GpioClose);
  }
}

impl digital::ErrorType for MockPin {
  type Error = digital::ErrorKind;
}

impl OutputPin for MockPin {
  fn set_low(&mut self) -> Result<(), Self::Error> {
    self.set(false)
  }

  fn set_high(&mut self) -> Result<(), Self::Error> {
    self.set(true)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refused;

/// Opens mock targets, optionally refusing either kind.
pub struct MockConnector {
  pub bus: MockBus,
  pub log: Log,
  pub refuse_bus: bool,
  pub refuse_gpio: bool,
  gpio: Rc<RefCell<GpioState>>,
  pub opened: Vec<ConnectionId>,
}

impl MockConnector {
  pub fn new() -> Self {
    let log = log();
    Self {
      bus: MockBus::with_log(log.clone()),
      log,
      refuse_bus: false,
      refuse_gpio: false,
      gpio: Rc::new(RefCell::new(GpioState::default())),
      opened: Vec::new(),
    }
  }

  /// Fail the `index`-th level change (zero based) across all opened pins.
  pub fn fail_level_change(&self, index: usize) {
    self.gpio.borrow_mut().fail_at = Some(index);
  }

  pub fn delay(&self) -> MockDelay {
    MockDelay { log: self.log.clone() }
  }

  pub fn ops(&self) -> Vec<Op> {
    self.log.borrow().clone()
  }
}

impl Connector for MockConnector {
  type Bus = MockBus;
  type Pin = MockPin;
  type Error = Refused;

  fn open_bus(&mut self, id: ConnectionId) -> Result<Self::Bus, Self::Error> {
    if self.refuse_bus {
      return Err(Refused);
    }
    self.opened.push(id);
    self.log.borrow_mut().push(Op::BusOpen);
    Ok(self.bus.clone())
  }

  fn open_gpio(&mut self, id: ConnectionId) -> Result<Self::Pin, Self::Error> {
    if self.refuse_gpio {
      return Err(Refused);
    }
    self.opened.push(id);
    self.log.borrow_mut().push(Op::GpioOpen);
    Ok(MockPin { state: self.gpio.clone(), log: self.log.clone() })
  }
}

/// Delay double that returns immediately and records the requested duration.
pub struct MockDelay {
  log: Log,
}

impl DelayNs for MockDelay {
  async fn delay_ns(&mut self, ns: u32) {
    self.log.borrow_mut().push(Op::DelayMs(ns / 1_000_000));
  }

  async fn delay_us(&mut self, us: u32) {
    self.log.borrow_mut().push(Op::DelayMs(us / 1_000));
  }

  async fn delay_ms(&mut self, ms: u32) {
    self.log.borrow_mut().push(Op::DelayMs(ms));
  }
}

/// Interrupt line double with a fixed number of falling edges.
///
/// Once the edges are used up it either waits forever or, when `broken`,
/// fails every wait.
pub struct MockIrq {
  pub edges: usize,
  pub broken: bool,
  pub waits: usize,
}

impl MockIrq {
  pub fn with_edges(edges: usize) -> Self {
    Self { edges, broken: false, waits: 0 }
  }

  pub fn broken() -> Self {
    Self { edges: 0, broken: true, waits: 0 }
  }

  async fn edge(&mut self) -> Result<(), digital::ErrorKind> {
    self.waits += 1;
    if self.edges > 0 {
      self.edges -= 1;
      return Ok(());
    }
    if self.broken {
      return Err(digital::ErrorKind::Other);
    }
    core::future::pending().await
  }
}

impl digital::ErrorType for MockIrq {
  type Error = digital::ErrorKind;
}

impl Wait for MockIrq {
  async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
    self.edge().await
  }

  async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
    self.edge().await
  }

  async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
    self.edge().await
  }

  async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
    self.edge().await
  }

  async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
    self.edge().await
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTooSmall;

pub struct MockRequest {
  pub id: u32,
  buf: [u8; 64],
  len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
  pub id: u32,
  pub status: Result<(), BufferTooSmall>,
  pub written: usize,
  pub data: Vec<u8>,
}

/// FIFO of pending requests; buffers start filled with 0xAA so zeroing is
/// observable.
#[derive(Default)]
pub struct MockQueue {
  pending: VecDeque<MockRequest>,
  pub completed: Vec<Completed>,
  next_id: u32,
}

impl MockQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self) -> u32 {
    self.push_with_len(64)
  }

  pub fn push_with_len(&mut self, len: usize) -> u32 {
    let id = self.next_id;
    self.next_id += 1;
    self.pending.push_back(MockRequest { id, buf: [0xAA; 64], len });
    id
  }

  pub fn pending(&self) -> usize {
    self.pending.len()
  }
}

impl RequestQueue for MockQueue {
  type Request = MockRequest;
  type Error = BufferTooSmall;

  fn retrieve_next(&mut self) -> Option<Self::Request> {
    self.pending.pop_front()
  }

  fn output_buffer<'r>(&mut self, request: &'r mut Self::Request, min_len: usize) -> Result<&'r mut [u8], Self::Error> {
    if request.len < min_len {
      return Err(BufferTooSmall);
    }
    Ok(&mut request.buf[..request.len])
  }

  fn complete(&mut self, request: Self::Request, status: Result<(), Self::Error>, bytes_written: usize) {
    let written = bytes_written.min(request.len);
    self.completed.push(Completed {
      id: request.id,
      status,
      written: bytes_written,
      data: request.buf[..written].to_vec(),
    });
  }
}

/// Driver on a mock bus that is already open, with the open logged away.
pub fn opened_device() -> (Gt9xx<MockConnector, MockDelay>, MockBus) {
  let connector = MockConnector::new();
  let bus = connector.bus.clone();
  let delay = connector.delay();
  let mut device = Gt9xx::new(connector, delay, Resources::new(ConnectionId(1)), Config::default());
  device.open_bus().expect("mock bus opens");
  bus.clear_ops();
  (device, bus)
}
