//! Bring-up and interrupt dispatch, with the deferred phase in its own task.
#![allow(unused)]
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use embedded_hal_async::{delay::DelayNs, digital::Wait};
use gt9xx::{
  Config, ConnectionClass, ConnectionId, Connector, Dispatch, Gt9xx, PowerState, RequestQueue, ResourceDescriptor,
  Resources, SerialKind, IRQ_RETRY_DELAY,
};

static DISPATCH: Dispatch<CriticalSectionRawMutex> = Dispatch::new();

const RESOURCES: [ResourceDescriptor; 3] = [
  ResourceDescriptor::Connection { class: ConnectionClass::Serial(SerialKind::I2c), id: ConnectionId(1) },
  ResourceDescriptor::Connection { class: ConnectionClass::Gpio, id: ConnectionId(2) },
  ResourceDescriptor::Interrupt,
];

#[allow(dead_code)]
async fn touch_task<C, D, IRQ>(connector: C, delay: D, mut irq: IRQ) -> Result<(), gt9xx::Error>
where
  C: Connector,
  D: DelayNs,
  IRQ: Wait,
{
  let resources = Resources::from_descriptors(&RESOURCES)?;
  let mut dev = Gt9xx::new(connector, delay, resources, Config::default());
  DISPATCH.power_up(&mut dev, PowerState::D3).await?;

  loop {
    if irq.wait_for_falling_edge().await.is_err() {
      Timer::after(IRQ_RETRY_DELAY).await;
    }
    DISPATCH.on_interrupt(&mut dev).await;
  }
}

#[allow(dead_code)]
async fn report_task<Q: RequestQueue>(mut queue: Q) {
  DISPATCH.run_deferred(&mut queue).await;
}

fn main() {}
