//! Fixed-layout touch report and its delivery to a pending request.
//!
//! Wire layout, [`REPORT_LEN`] bytes, multi-byte fields little endian:
//!
//! | Offset      | Field                                      |
//! |-------------|--------------------------------------------|
//! | 0           | report id, always [`REPORT_ID`]            |
//! | 1..3        | scan time in 100 µs units                  |
//! | 3           | contact count                              |
//! | 4 + 6 * n   | slot n: contact id, tip, x (u16), y (u16)  |

use crate::defs::MAX_CONTACTS;
use crate::frame::{decode, Acquisition, Contact, RawFrame};
use crate::{Error, RequestQueue};

/// Report id of the touch collection.
pub const REPORT_ID: u8 = 1;

/// Scan time advance per acquisition event.
pub const SCAN_TIME_STEP: u16 = 125;

const HEADER_LEN: usize = 4;
const SLOT_LEN: usize = 6;

/// Size of a serialized [`Report`].
pub const REPORT_LEN: usize = HEADER_LEN + MAX_CONTACTS * SLOT_LEN;

/// Relative scan timestamp. Advances by [`SCAN_TIME_STEP`] on every event and
/// wraps at 65536.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanClock(u16);

impl ScanClock {
  pub const fn new() -> Self {
    Self(0)
  }

  pub const fn now(&self) -> u16 {
    self.0
  }

  /// Advance the clock, returning the timestamp of the event being handled.
  pub fn tick(&mut self) -> u16 {
    let now = self.0;
    self.0 = now.wrapping_add(SCAN_TIME_STEP);
    now
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportSlot {
  pub contact_id: u8,
  pub tip: bool,
  pub x: u16,
  pub y: u16,
}

/// One touch report, one slot per track id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
  pub report_id: u8,
  pub scan_time: u16,
  pub contact_count: u8,
  pub slots: [ReportSlot; MAX_CONTACTS],
}

impl Report {
  /// All contacts lifted.
  pub fn lifted(scan_time: u16) -> Self {
    Self::from_contacts(scan_time, 0, &[None; MAX_CONTACTS])
  }

  /// Every slot defaults to its own index with the tip up; decoded contacts
  /// overwrite the slot of their track id.
  pub fn from_contacts(scan_time: u16, contact_count: u8, contacts: &[Option<Contact>; MAX_CONTACTS]) -> Self {
    let mut slots = [ReportSlot::default(); MAX_CONTACTS];
    for (index, slot) in slots.iter_mut().enumerate() {
      slot.contact_id = index as u8;
    }
    for contact in contacts.iter().flatten() {
      if let Some(slot) = slots.get_mut(usize::from(contact.id)) {
        *slot = ReportSlot { contact_id: contact.id, tip: contact.tip, x: contact.x, y: contact.y };
      }
    }

    Self { report_id: REPORT_ID, scan_time, contact_count, slots }
  }

  /// Report for a validated frame. A frame without contacts lifts them all.
  pub fn from_frame(scan_time: u16, frame: &RawFrame) -> Self {
    match frame.touch_count() {
      0 => Self::lifted(scan_time),
      count => Self::from_contacts(scan_time, count, &decode(frame)),
    }
  }

  /// Report owed for an acquisition outcome, if any.
  ///
  /// A clear data-ready flag and a failed bus read both lift all contacts. A
  /// corrupt frame produces no report at all.
  pub fn for_acquisition(scan_time: u16, acquisition: &Acquisition) -> Option<Self> {
    match acquisition {
      Acquisition::Touch(frame) => Some(Self::from_frame(scan_time, frame)),
      Acquisition::Failed(Error::CorruptFrame(_)) => None,
      Acquisition::Idle | Acquisition::Failed(_) => Some(Self::lifted(scan_time)),
    }
  }

  pub fn to_bytes(&self) -> [u8; REPORT_LEN] {
    let mut bytes = [0u8; REPORT_LEN];
    bytes[0] = self.report_id;
    bytes[1..3].copy_from_slice(&self.scan_time.to_le_bytes());
    bytes[3] = self.contact_count;

    for (slot, out) in self.slots.iter().zip(bytes[HEADER_LEN..].chunks_exact_mut(SLOT_LEN)) {
      out[0] = slot.contact_id;
      out[1] = slot.tip as u8;
      out[2..4].copy_from_slice(&slot.x.to_le_bytes());
      out[4..6].copy_from_slice(&slot.y.to_le_bytes());
    }

    bytes
  }

  /// Copy the serialized report into `buf`, returning the bytes written.
  pub fn write_to(&self, buf: &mut [u8]) -> usize {
    let len = buf.len().min(REPORT_LEN);
    buf[..len].copy_from_slice(&self.to_bytes()[..len]);
    len
  }
}

/// Complete the oldest pending request with `report`.
///
/// The request's buffer is zeroed before the report is written. When the
/// queue cannot provide a buffer the request is still completed, carrying the
/// queue's error. Fails with [`Error::RequestQueueEmpty`] when nobody is
/// waiting.
pub fn deliver<Q: RequestQueue>(queue: &mut Q, report: &Report) -> Result<(), Error> {
  let Some(mut request) = queue.retrieve_next() else {
    return Err(Error::RequestQueueEmpty);
  };

  let (status, written) = match queue.output_buffer(&mut request, REPORT_LEN) {
    Ok(buf) => {
      buf.fill(0);
      (Ok(()), report.write_to(buf))
    }
    Err(e) => {
      warn!("request output buffer unavailable");
      (Err(e), REPORT_LEN)
    }
  };

  let delivered = status.is_ok();
  queue.complete(request, status, written);

  if delivered {
    Ok(())
  } else {
    Err(Error::OutputBufferUnavailable)
  }
}
