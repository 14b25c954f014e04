//! Two-phase interrupt pipeline.
//!
//! The fast phase reacts to the controller's interrupt and reads the frame over
//! the bus. It may block on the bus and is never run under the lock. Its result
//! moves through a single-slot channel to the deferred phase, which advances
//! the scan clock, decodes the frame and completes at most one pending request
//! while holding the report lock. The lock only ever covers in-memory work.
//!
//! ```text
//! Idle -> Recognizing -> Acquiring -> DeferredProcessing -> Idle
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;

use crate::frame::Acquisition;
use crate::report::{self, Report, ScanClock};
use crate::{Connector, Error, Gt9xx, PowerState, RequestQueue};

/// Pause before polling again when waiting on the interrupt line fails.
pub const IRQ_RETRY_DELAY: Duration = Duration::from_millis(10);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
  Idle = 0,
  Recognizing = 1,
  Acquiring = 2,
  /// An acquisition is queued for, or being handled by, the deferred phase.
  DeferredProcessing = 3,
}

impl DispatchState {
  const fn from_raw(raw: u8) -> Self {
    match raw {
      1 => DispatchState::Recognizing,
      2 => DispatchState::Acquiring,
      3 => DispatchState::DeferredProcessing,
      _ => DispatchState::Idle,
    }
  }
}

/// Event counters kept by the deferred phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
  /// Requests completed with a report.
  pub completed: u32,
  /// Reports dropped because no request was pending.
  pub dropped: u32,
  /// Frames rejected for announcing too many contacts.
  pub corrupt: u32,
  /// Acquisitions that failed on the bus.
  pub bus_failures: u32,
  /// Requests completed without a usable output buffer.
  pub buffer_failures: u32,
}

impl Stats {
  const fn new() -> Self {
    Self { completed: 0, dropped: 0, corrupt: 0, bus_failures: 0, buffer_failures: 0 }
  }
}

struct ReportState {
  clock: ScanClock,
  touch_num: u8,
  data_ready: bool,
  // Fast phases started but not yet completed by the deferred phase.
  in_flight: u8,
  stats: Stats,
}

impl ReportState {
  const fn new() -> Self {
    Self { clock: ScanClock::new(), touch_num: 0, data_ready: false, in_flight: 0, stats: Stats::new() }
  }
}

/// Interrupt dispatch for one controller.
///
/// `M` picks the lock flavour: `CriticalSectionRawMutex` when the phases run
/// in different execution contexts, `NoopRawMutex` when they share one
/// executor. [`Dispatch::new`] is `const`, so the dispatcher can live in a
/// `static` shared by an interrupt task and a completion task.
pub struct Dispatch<M: RawMutex> {
  state: AtomicU8,
  ready: AtomicBool,
  pending: Channel<M, Acquisition, 1>,
  shared: Mutex<M, RefCell<ReportState>>,
}

impl<M: RawMutex> Default for Dispatch<M> {
  fn default() -> Self {
    Self::new()
  }
}

impl<M: RawMutex> Dispatch<M> {
  pub const fn new() -> Self {
    Self {
      state: AtomicU8::new(DispatchState::Idle as u8),
      ready: AtomicBool::new(true),
      pending: Channel::new(),
      shared: Mutex::new(RefCell::new(ReportState::new())),
    }
  }

  /// Forget everything about previous events.
  ///
  /// The scan clock restarts at 0, the contact count and data-ready flag are
  /// cleared and a queued acquisition is discarded. Counters are kept.
  pub fn reset(&self) {
    while self.pending.try_receive().is_ok() {}
    self.shared.lock(|s| {
      let mut state = s.borrow_mut();
      state.clock = ScanClock::new();
      state.touch_num = 0;
      state.data_ready = false;
      state.in_flight = 0;
    });
    self.ready.store(true, Ordering::Release);
    self.enter(DispatchState::Idle);
  }

  /// Bring `device` into the working state with a fresh event history.
  pub async fn power_up<C, D>(&self, device: &mut Gt9xx<C, D>, previous: PowerState) -> Result<(), Error>
  where
    C: Connector,
    D: DelayNs,
  {
    self.reset();
    device.on_power_active(previous).await
  }

  pub fn state(&self) -> DispatchState {
    DispatchState::from_raw(self.state.load(Ordering::Acquire))
  }

  /// `false` from the start of a fast phase until the deferred phase has
  /// caught up with every started one.
  pub fn is_ready(&self) -> bool {
    self.ready.load(Ordering::Acquire)
  }

  pub fn stats(&self) -> Stats {
    self.shared.lock(|s| s.borrow().stats)
  }

  /// Timestamp the next report will carry.
  pub fn scan_time(&self) -> u16 {
    self.shared.lock(|s| s.borrow().clock.now())
  }

  /// Contact count of the last validated frame.
  pub fn touch_count(&self) -> u8 {
    self.shared.lock(|s| s.borrow().touch_num)
  }

  /// Whether the last acquisition produced a validated frame.
  pub fn data_ready(&self) -> bool {
    self.shared.lock(|s| s.borrow().data_ready)
  }

  fn enter(&self, state: DispatchState) {
    self.state.store(state as u8, Ordering::Release);
  }

  /// Fast phase: acquire a frame and queue it for the deferred phase.
  ///
  /// Waits for the deferred phase to take the previous acquisition if it is
  /// still queued. A fast phase cancelled before its acquisition is queued
  /// leaves the dispatcher not ready until [`Dispatch::reset`].
  pub async fn on_interrupt<C: Connector, D>(&self, device: &mut Gt9xx<C, D>) {
    self.enter(DispatchState::Recognizing);
    self.shared.lock(|s| {
      let mut state = s.borrow_mut();
      state.in_flight = state.in_flight.saturating_add(1);
      self.ready.store(false, Ordering::Release);
    });

    self.enter(DispatchState::Acquiring);
    let acquisition = device.acquire_frame().await;

    // The deferred phase may take the acquisition as soon as it is queued.
    self.enter(DispatchState::DeferredProcessing);
    self.pending.send(acquisition).await;
  }

  /// Deferred phase for a queued acquisition, if there is one. Returns
  /// whether anything was processed.
  pub fn process_pending<Q: RequestQueue>(&self, queue: &mut Q) -> bool {
    match self.pending.try_receive() {
      Ok(acquisition) => {
        self.complete(acquisition, queue);
        true
      }
      Err(_) => false,
    }
  }

  /// Deferred phase as a task of its own, paired with a task calling
  /// [`Dispatch::on_interrupt`].
  pub async fn run_deferred<Q: RequestQueue>(&self, queue: &mut Q) {
    loop {
      let acquisition = self.pending.receive().await;
      self.complete(acquisition, queue);
    }
  }

  /// Run one full cycle without waiting for an interrupt.
  ///
  /// Hosts without an interrupt line call this at their polling rate.
  pub async fn poll<C: Connector, D, Q: RequestQueue>(&self, device: &mut Gt9xx<C, D>, queue: &mut Q) {
    self.on_interrupt(device).await;
    self.process_pending(queue);
  }

  /// Serve the controller forever, one cycle per falling edge of `irq`.
  ///
  /// When waiting on the line fails the controller is polled after
  /// [`IRQ_RETRY_DELAY`] instead.
  pub async fn run<C, D, IRQ, Q>(&self, device: &mut Gt9xx<C, D>, irq: &mut IRQ, queue: &mut Q)
  where
    C: Connector,
    IRQ: Wait,
    Q: RequestQueue,
  {
    loop {
      if irq.wait_for_falling_edge().await.is_err() {
        warn!("interrupt line wait failed, polling instead");
        Timer::after(IRQ_RETRY_DELAY).await;
      }
      self.poll(device, queue).await;
    }
  }

  fn complete<Q: RequestQueue>(&self, acquisition: Acquisition, queue: &mut Q) {
    self.enter(DispatchState::DeferredProcessing);

    self.shared.lock(|cell| {
      let mut state = cell.borrow_mut();
      let scan_time = state.clock.tick();

      match &acquisition {
        Acquisition::Touch(frame) => {
          state.data_ready = true;
          state.touch_num = frame.touch_count();
        }
        Acquisition::Idle => {
          state.data_ready = false;
          state.touch_num = 0;
        }
        Acquisition::Failed(Error::CorruptFrame(_)) => {
          state.data_ready = false;
          state.stats.corrupt = state.stats.corrupt.wrapping_add(1);
        }
        Acquisition::Failed(_) => {
          state.data_ready = false;
          state.touch_num = 0;
          state.stats.bus_failures = state.stats.bus_failures.wrapping_add(1);
        }
      }

      if let Some(report) = Report::for_acquisition(scan_time, &acquisition) {
        match report::deliver(queue, &report) {
          Ok(()) => state.stats.completed = state.stats.completed.wrapping_add(1),
          Err(Error::RequestQueueEmpty) => {
            trace!("no pending request, report at {} dropped", scan_time);
            state.stats.dropped = state.stats.dropped.wrapping_add(1);
          }
          Err(_) => state.stats.buffer_failures = state.stats.buffer_failures.wrapping_add(1),
        }
      }

      // Ready again only once every started fast phase has been handled.
      state.in_flight = state.in_flight.saturating_sub(1);
      if state.in_flight == 0 {
        self.ready.store(true, Ordering::Release);
        self.enter(DispatchState::Idle);
      }
    });
  }
}
