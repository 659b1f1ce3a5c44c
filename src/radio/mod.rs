//! 920 MHz radio module driver.
//!
//! The module is attached over UART and exchanges length-prefixed binary
//! packets; a handful of GPIO pins sequence its reset and power states.
//! [`pins::RadioPins`] owns the pin gates, [`framer`] builds packets and
//! reassembles the inbound byte stream, [`link::RadioLink`] issues commands
//! and arbitrates request/response turn-taking.
//!
//! ## Wire constants
//!
//! Packet layout (big-endian, offsets in bytes):
//!
//! ```text
//! 0        1        2          3       4       5..=8    9..=12   13..
//! HEADER_0 HEADER_1 total_len  msg_id  msg_no  dst_id   src_id   parameter
//! ```
//!
//! `total_len` counts the whole packet (`parameter_len + 13`). The link
//! layer of the module handles integrity; no checksum is appended.

pub mod framer;
pub mod link;
pub mod pins;

/// First fixed header byte.
pub const HEADER_0: u8 = 0x5A;
/// Second fixed header byte.
pub const HEADER_1: u8 = 0xA5;

/// Bytes before the parameter field (headers through `src_id`).
pub const PACKET_OVERHEAD: usize = 13;

/// Largest packet the module exchanges; sizes the receive buffer.
pub const PACKET_MAX_LENGTH: usize = 64;

/// `src_id` sentinel for packets originated on the UART side.
pub const UART_LOCAL_ID: [u8; 4] = [0xFF; 4];

/// Transmit request with link-layer retries; also the msg id the module
/// uses to notify data received over the air with retries.
pub const MSG_SEND: u8 = 0x11;
/// Module asks for a resend of the previous request.
pub const MSG_SEND_RESEND: u8 = 0x12;
/// Transmit request without retries; also the matching data notification.
pub const MSG_SEND_NO_RESEND: u8 = 0x13;
/// Configure transmit power, channel, RF band, and carrier-sense mode.
pub const MSG_SET_RF_CONF: u8 = 0x21;
/// Command accepted.
pub const MSG_ACK: u8 = 0x01;
/// Command rejected.
pub const MSG_NAK: u8 = 0x02;

/// Reset pulse width (µs); the datasheet requires 10 ms.
pub const RESET_PULSE_US: u32 = 10_000;
/// Post-reset settle time before the module accepts commands (µs); the
/// datasheet specifies 400 ms.
pub const BOOT_SETTLE_US: u32 = 400_000;
