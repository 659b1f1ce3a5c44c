//! Byte-stream UART abstraction for the radio module link (8N1 framing is
//! the port's concern; the driver only moves bytes).

/// Contract for the serial port attached to the radio module.
pub trait Uart {
    /// Take one byte from the receive FIFO, or `None` when it is empty.
    /// Never blocks.
    fn read(&mut self) -> Option<u8>;
    /// Queue all bytes for transmission.
    fn write_all(&mut self, bytes: &[u8]);
}
