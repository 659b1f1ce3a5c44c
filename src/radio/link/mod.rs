//! Radio protocol layer: command issuance, response classification, and
//! request/response turn-taking against the module.
//!
//! The module answers every command, so a single `can_send` flag arbitrates
//! the link: cleared when a command goes out, granted back when any inbound
//! packet completes, or force-granted by the liveness timeout when the
//! module has gone silent.
use crate::infra::clock::Monotonic;
use crate::infra::uart::Uart;
use crate::radio::framer::{write_packet, PacketParser};
use crate::radio::{
    MSG_ACK, MSG_NAK, MSG_SEND, MSG_SEND_NO_RESEND, MSG_SEND_RESEND, MSG_SET_RF_CONF,
    PACKET_MAX_LENGTH, PACKET_OVERHEAD, UART_LOCAL_ID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Link-layer retry policy of a transmit request.
pub enum TxMode {
    /// The module retries until the peer acknowledges.
    WithRetry,
    /// Fire-and-forget.
    NoRetry,
}

impl TxMode {
    fn msg_id(self) -> u8 {
        match self {
            TxMode::WithRetry => MSG_SEND,
            TxMode::NoRetry => MSG_SEND_NO_RESEND,
        }
    }
}

/// Request/response driver for the radio module. Single-threaded by
/// contract: the UART and the packet buffer are touched only from the
/// caller's task.
pub struct RadioLink<U: Uart, C: Monotonic> {
    uart: U,
    clock: C,
    parser: PacketParser,
    /// Send permission: the module owes no response.
    can_send: bool,
    last_send_time: u32,
    last_msg_no: u8,
}

impl<U: Uart, C: Monotonic> RadioLink<U, C> {
    pub fn new(uart: U, clock: C) -> Self {
        Self {
            uart,
            clock,
            parser: PacketParser::new(),
            can_send: true,
            last_send_time: 0,
            last_msg_no: 0,
        }
    }

    /// Pump the inbound byte stream. Returns `true` exactly while a whole
    /// packet is held; completion of a packet grants send permission. While
    /// a packet is held no bytes are consumed, so the consumer must
    /// [`release`](Self::release) promptly.
    pub fn poll_receive(&mut self) -> bool {
        if self.parser.has_packet() {
            return true;
        }
        if self.parser.drain(&mut self.uart) {
            self.can_send = true;
            return true;
        }
        false
    }

    /// Hand the receive buffer back after reading a packet.
    pub fn release(&mut self) {
        self.parser.release();
    }

    /// Whether a new command may be issued.
    pub fn can_send(&self) -> bool {
        self.can_send
    }

    /// Identification number of the last issued command.
    pub fn last_msg_no(&self) -> u8 {
        self.last_msg_no
    }

    /// Configure transmit power, channel, RF band, and carrier-sense mode.
    /// Clears send permission until the module answers.
    pub fn set_rf_conf(&mut self, msg_no: u8, power: u8, channel: u8, rf_band: u8, cs_mode: u8) {
        let parameter = [power, channel, rf_band, cs_mode];
        let mut packet = [0u8; PACKET_OVERHEAD + 4];
        let len = write_packet(
            &mut packet,
            MSG_SET_RF_CONF,
            msg_no,
            &UART_LOCAL_ID,
            &UART_LOCAL_ID,
            &parameter,
        );
        self.uart.write_all(&packet[..len]);
        self.mark_sent(msg_no);
    }

    /// Request a transmission of `data` to the device `dst`. Returns `false`
    /// without sending when the payload does not fit in one packet.
    pub fn send_payload(&mut self, mode: TxMode, msg_no: u8, dst: &[u8; 4], data: &[u8]) -> bool {
        if data.len() + PACKET_OVERHEAD > PACKET_MAX_LENGTH {
            #[cfg(feature = "defmt")]
            defmt::warn!("payload does not fit in one radio packet");
            return false;
        }
        let mut packet = [0u8; PACKET_MAX_LENGTH];
        let len = write_packet(
            &mut packet,
            mode.msg_id(),
            msg_no,
            dst,
            &UART_LOCAL_ID,
            data,
        );
        self.uart.write_all(&packet[..len]);
        self.mark_sent(msg_no);
        true
    }

    /// Whether the held packet is a command result (accept, reject, or
    /// resend request).
    pub fn is_command_result(&self) -> bool {
        self.parser.has_packet()
            && matches!(
                self.parser.msg_id(),
                MSG_ACK | MSG_NAK | MSG_SEND_RESEND
            )
    }

    /// Whether the held packet acknowledges the command identified by
    /// `msg_no`.
    pub fn command_succeeded(&self, msg_no: u8) -> bool {
        self.parser.has_packet()
            && self.parser.msg_id() == MSG_ACK
            && self.parser.msg_no() == msg_no
    }

    /// Whether the held packet carries data received over the air.
    pub fn is_received_data(&self) -> bool {
        self.parser.has_packet()
            && matches!(self.parser.msg_id(), MSG_SEND | MSG_SEND_NO_RESEND)
    }

    /// Copy the held packet into `out`; returns its total length, or 0 when
    /// no packet is held. `out` must hold [`PACKET_MAX_LENGTH`] bytes.
    pub fn copy_received(&self, out: &mut [u8]) -> usize {
        self.parser.copy_into(out)
    }

    /// Whether the module has gone silent: a response is owed and none
    /// arrived within `timeout_us`. Firing re-grants send permission so the
    /// caller can retry or reset the module; this is the only forgiveness
    /// path for a missing response.
    pub fn is_dead(&mut self, timeout_us: u32) -> bool {
        if self.can_send {
            return false;
        }
        if self.clock.elapsed_us(self.last_send_time) > timeout_us {
            self.can_send = true;
            return true;
        }
        false
    }

    fn mark_sent(&mut self, msg_no: u8) {
        self.can_send = false;
        self.last_msg_no = msg_no;
        self.last_send_time = self.clock.now_us();
    }
}
