//! Status frame acquisition and contact decode.
//!
//! A frame starts at the buffer status register. Byte 0 carries the data-ready
//! flag (bit 7) and the number of tracked contacts (low nibble); each contact
//! follows as a packed 8-byte record:
//!
//! | Offset | Field                     |
//! |--------|---------------------------|
//! | 0      | track id (low nibble)     |
//! | 1..3   | x, little endian          |
//! | 3..5   | y, little endian          |
//! | 5..7   | size, little endian       |
//! | 7      | reserved                  |

use crate::defs::{
  Reg, CONTACT_RECORD_LEN, END_OF_COMMAND, FRAME_CAPACITY, MAX_CONTACTS, STATUS_COUNT_MASK, STATUS_READ_LEN,
  STATUS_READY, TRACK_ID_MASK,
};
use crate::{Connector, Error, Gt9xx};

/// Last bus read of the status window.
///
/// The buffer is zeroed before every read, so bytes beyond what the controller
/// announced are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
  pub(crate) bytes: [u8; FRAME_CAPACITY],
}

impl Default for RawFrame {
  fn default() -> Self {
    Self::new()
  }
}

impl RawFrame {
  pub const fn new() -> Self {
    Self { bytes: [0; FRAME_CAPACITY] }
  }

  /// Frame holding a copy of `bytes`, truncated to the buffer capacity.
  pub fn from_bytes(bytes: &[u8]) -> Self {
    let mut frame = Self::new();
    let len = bytes.len().min(FRAME_CAPACITY);
    frame.bytes[..len].copy_from_slice(&bytes[..len]);
    frame
  }

  pub fn clear(&mut self) {
    self.bytes = [0; FRAME_CAPACITY];
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn status(&self) -> u8 {
    self.bytes[0]
  }

  /// The controller latched a new frame.
  pub fn is_ready(&self) -> bool {
    self.status() & STATUS_READY != 0
  }

  /// Raw contact count announced by the status byte (0..=15).
  pub fn touch_count(&self) -> u8 {
    self.status() & STATUS_COUNT_MASK
  }

  /// See [`decode`].
  pub fn contacts(&self) -> [Option<Contact>; MAX_CONTACTS] {
    decode(self)
  }
}

/// One tracked finger as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Contact {
  /// Persistent tracking id, stable while the finger stays down.
  pub id: u8,
  pub x: u16,
  pub y: u16,
  /// Touch size as reported by the controller.
  pub width: u16,
  pub tip: bool,
}

/// Decode the contact records of `frame` into slots indexed by track id.
///
/// Records with a track id outside the slot range are dropped. The count is
/// capped at [`MAX_CONTACTS`]; frames announcing more never make it past
/// acquisition.
pub fn decode(frame: &RawFrame) -> [Option<Contact>; MAX_CONTACTS] {
  let mut slots = [None; MAX_CONTACTS];
  let count = usize::from(frame.touch_count()).min(MAX_CONTACTS);

  for record in frame.bytes[1..].chunks_exact(CONTACT_RECORD_LEN).take(count) {
    let id = record[0] & TRACK_ID_MASK;
    let Some(slot) = slots.get_mut(usize::from(id)) else {
      trace!("dropping contact with track id {}", id);
      continue;
    };
    *slot = Some(Contact {
      id,
      x: u16::from_le_bytes([record[1], record[2]]),
      y: u16::from_le_bytes([record[3], record[4]]),
      width: u16::from_le_bytes([record[5], record[6]]),
      tip: true,
    });
  }

  slots
}

/// Outcome of one acquisition, handed from the fast phase to the deferred phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
  /// The data-ready flag was clear.
  Idle,
  /// A validated frame with at most [`MAX_CONTACTS`] contacts, possibly none.
  Touch(RawFrame),
  /// A bus transaction failed, or the frame was rejected as
  /// [`Error::CorruptFrame`].
  Failed(Error),
}

impl<C, D> Gt9xx<C, D>
where
  C: Connector,
{
  /// Read the current status frame from the controller.
  ///
  /// Once a ready frame has been read the end-of-command acknowledgement is
  /// written exactly once, after all contact records, so the controller can
  /// latch the next frame. Corrupt frames are left unacknowledged.
  pub async fn acquire_frame(&mut self) -> Acquisition {
    match self.read_frame().await {
      Ok(acquisition) => acquisition,
      Err(e) => {
        warn!("frame acquisition failed: {}", e);
        Acquisition::Failed(e)
      }
    }
  }

  /// Frame buffer filled by the last acquisition.
  pub fn frame(&self) -> &RawFrame {
    &self.frame
  }

  async fn read_frame(&mut self) -> Result<Acquisition, Error> {
    self.frame.clear();
    self.transport.write_read(&Reg::Status.addr(), &mut self.frame.bytes[..STATUS_READ_LEN]).await?;

    if !self.frame.is_ready() {
      return Ok(Acquisition::Idle);
    }

    let count = self.frame.touch_count();
    if usize::from(count) > MAX_CONTACTS {
      return Err(Error::CorruptFrame(count));
    }

    // The first read already carries one record; the rest follow back to back.
    let extension = if count > 1 {
      let end = STATUS_READ_LEN + CONTACT_RECORD_LEN * usize::from(count - 1);
      let probe = Reg::Status.offset(STATUS_READ_LEN as u16);
      self.transport.write_read(&probe, &mut self.frame.bytes[STATUS_READ_LEN..end]).await.map(drop)
    } else {
      Ok(())
    };

    let ack = self.transport.write(&END_OF_COMMAND).await;
    extension?;
    ack?;

    Ok(Acquisition::Touch(self.frame.clone()))
  }
}
