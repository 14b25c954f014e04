/******************************************************************************
 * Refer to the GT911 / GT9xx programming guide for more information.         *
 * ========================================================================== *
 *                        GT9xx - Registers & Fixed Patterns                  *
*******************************************************************************/

/// Default 7-bit I²C address (INT held low during reset selects 0x5D).
pub const DEFAULT_ADDRESS: u8 = 0x5D;

/// Maximum number of simultaneous contacts the controller tracks.
pub const MAX_CONTACTS: usize = 5;

/// Size of one packed contact record in a status frame.
pub const CONTACT_RECORD_LEN: usize = 8;

/// Bytes read by the first status transaction: status byte, the first contact
/// record and three trailing bytes.
pub const STATUS_READ_LEN: usize = 12;

/// Capacity of the raw frame buffer. Large enough for the status byte plus
/// five contact records with the trailing bytes of the first read.
pub const FRAME_CAPACITY: usize = 64;

/// Largest configuration blob the driver can push in one write.
pub const CONFIG_MAX_LEN: usize = 256;

pub(crate) const STATUS_READY: u8 = 0x80;
pub(crate) const STATUS_COUNT_MASK: u8 = 0x0F;
pub(crate) const TRACK_ID_MASK: u8 = 0x0F;

/// Expected reply of the firmware status probe once the controller booted.
pub const FIRMWARE_SENTINEL: u8 = 0xBE;

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reg {
  // Firmware status, answers `FIRMWARE_SENTINEL` when running
  FirmwareStatus = 0x41E4,
  // Chip identifier (1 byte)
  ChipId = 0x0F7D,
  // Configuration window (0x8047..0x8100, checksum + fresh flag at the end)
  Config = 0x8047,
  // Product id (4 ASCII) + firmware version (u16 LE)
  ProductId = 0x8140,
  // Buffer status, first byte of every touch frame
  Status = 0x814E,
}

impl Reg {
  /// Big-endian register address as sent on the wire.
  pub(crate) const fn addr(self) -> [u8; 2] {
    (self as u16).to_be_bytes()
  }

  /// Register address shifted by `offset` bytes.
  pub(crate) const fn offset(self, offset: u16) -> [u8; 2] {
    (self as u16 + offset).to_be_bytes()
  }
}

/// Clears the buffer status so the controller latches the next frame.
pub(crate) const END_OF_COMMAND: [u8; 3] = [0x81, 0x4E, 0x00];

/// Reference GT911 configuration pushed at [`Reg::Config`].
///
/// 184 configuration bytes, the checksum (0x63) and the config-fresh flag
/// (0x01), padded with zeros to the 240 byte write the controller expects.
pub const GT911_CONFIG: [u8; 240] = {
  const HEAD: [u8; 186] = [
    0x41, 0x00, 0x06, 0x00, 0x08, 0x0A, 0x05, 0x00, 0x01, 0x0F, 0x28, 0x0F, 0x50, 0x32, 0x03, 0x05, 0x00, 0x00, 0xFB,
    0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x90, 0x30, 0xAA, 0x1F, 0x1C, 0xD6, 0x09, 0x00, 0x00, 0x00, 0x9A,
    0x33, 0x25, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x14, 0x13, 0x12, 0x11, 0x10, 0x0F, 0x0E, 0x0D, 0x0C, 0x0A,
    0x08, 0x07, 0x06, 0x04, 0x02, 0x00, 0x19, 0x1B, 0x1C, 0x1E, 0x1F, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27,
    0x28, 0x29, 0x2A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x63, 0x01,
  ];

  let mut out = [0u8; 240];
  let mut i = 0;
  while i < HEAD.len() {
    out[i] = HEAD[i];
    i += 1;
  }
  out
};
