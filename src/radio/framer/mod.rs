//! Radio packet construction and streaming reassembly.
//!
//! Building is a single buffer write; parsing consumes the UART byte feed
//! one byte at a time and resynchronises on the fixed two-byte header, so a
//! corrupted length or a partial packet never wedges the stream.
use crate::infra::uart::Uart;
use crate::radio::{HEADER_0, HEADER_1, PACKET_MAX_LENGTH, PACKET_OVERHEAD};

/// Write one packet into `buf` and return its total length
/// (`parameter.len() + 13`).
///
/// `buf` must hold at least `parameter.len() + 13` bytes and `parameter`
/// at most [`PACKET_MAX_LENGTH`]` - 13`; both are the caller's contract.
pub fn write_packet(
    buf: &mut [u8],
    msg_id: u8,
    msg_no: u8,
    dst: &[u8; 4],
    src: &[u8; 4],
    parameter: &[u8],
) -> usize {
    let total = parameter.len() + PACKET_OVERHEAD;
    buf[0] = HEADER_0;
    buf[1] = HEADER_1;
    buf[2] = total as u8;
    buf[3] = msg_id;
    buf[4] = msg_no;
    buf[5..9].copy_from_slice(dst);
    buf[9..13].copy_from_slice(src);
    buf[13..total].copy_from_slice(parameter);
    total
}

/// Streaming parser holding at most one complete inbound packet.
///
/// While a packet is held (`has_packet`), no further bytes are consumed
/// until the consumer calls [`release`](Self::release); the UART FIFO
/// provides the backpressure.
pub struct PacketParser {
    buf: [u8; PACKET_MAX_LENGTH],
    /// Next write index; 0 and 1 double as the header-hunt states.
    cursor: usize,
    occupied: bool,
}

impl PacketParser {
    pub const fn new() -> Self {
        Self {
            buf: [0; PACKET_MAX_LENGTH],
            cursor: 0,
            occupied: false,
        }
    }

    /// Whether a complete packet is held.
    pub fn has_packet(&self) -> bool {
        self.occupied
    }

    /// Hand the buffer back to the parser.
    pub fn release(&mut self) {
        self.occupied = false;
    }

    /// Message id of the held packet.
    pub fn msg_id(&self) -> u8 {
        self.buf[3]
    }

    /// Message identification number of the held packet.
    pub fn msg_no(&self) -> u8 {
        self.buf[4]
    }

    /// Total length field of the held packet.
    pub fn total_len(&self) -> usize {
        self.buf[2] as usize
    }

    /// Copy the held packet into `out` and return its length; 0 when no
    /// packet is held. `out` must hold [`PACKET_MAX_LENGTH`] bytes.
    pub fn copy_into(&self, out: &mut [u8]) -> usize {
        if !self.occupied {
            return 0;
        }
        let len = self.total_len();
        out[..len].copy_from_slice(&self.buf[..len]);
        len
    }

    /// Consume all available bytes from `uart`; returns `true` exactly when
    /// a packet completes. Consumes nothing while a packet is held.
    pub fn drain<U: Uart>(&mut self, uart: &mut U) -> bool {
        if self.occupied {
            return false;
        }
        while let Some(byte) = uart.read() {
            if self.push(byte) {
                return true;
            }
        }
        false
    }

    /// Feed one byte; returns `true` when it completes a packet.
    pub fn push(&mut self, byte: u8) -> bool {
        match self.cursor {
            0 => {
                if byte == HEADER_0 {
                    self.buf[0] = byte;
                    self.cursor = 1;
                }
            }
            1 => {
                if byte == HEADER_1 {
                    self.buf[1] = byte;
                    self.cursor = 2;
                } else {
                    // the accepted first header byte is discarded with this
                    // one; a lone stray header costs at most one packet
                    self.cursor = 0;
                }
            }
            2 => {
                let total = byte as usize;
                if (PACKET_OVERHEAD..=PACKET_MAX_LENGTH).contains(&total) {
                    self.buf[2] = byte;
                    self.cursor = 3;
                } else {
                    // corrupt length would overflow the buffer; hunt for the
                    // next header instead
                    self.cursor = 0;
                }
            }
            last if last == self.total_len() - 1 => {
                self.buf[last] = byte;
                self.cursor = 0;
                self.occupied = true;
                return true;
            }
            middle => {
                self.buf[middle] = byte;
                self.cursor += 1;
            }
        }
        false
    }
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}
