//! Narrow abstraction over the vendor CAN controller. Allows the driver to
//! plug into various implementations (on-chip TWAI peripheral, SPI
//! transceiver bridge, test double). The adapter is the only component
//! permitted to touch controller registers.
use crate::can::config::{FilterConfig, TimingConfig};
use crate::can::frame::CanFrame;
use crate::error::AdapterError;
use crate::infra::gpio::PinId;
use bitflags::bitflags;
use embassy_time::Duration;
use futures_util::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Operating mode requested at install time.
pub enum ControllerMode {
    /// Full participation: arbitration, ACK, error signalling.
    Normal,
    /// Transmit without requiring an ACK from a peer.
    NoAck,
    /// Receive-only; the controller never drives the bus.
    ListenOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle state reported by the controller.
pub enum ControllerState {
    /// Installed but not started, or stopped after running.
    Stopped,
    /// Participating in bus traffic.
    Running,
    /// Bus-off recovery sequence in progress.
    Recovering,
    /// Ceased participation after the error counter overflowed.
    BusOff,
}

#[derive(Debug, Clone, Copy)]
/// Snapshot of the controller's state and queue depths.
pub struct StatusInfo {
    pub state: ControllerState,
    /// Frames waiting in the receive queue.
    pub rx_queued: u32,
    /// Frames waiting in the transmit queue.
    pub tx_queued: u32,
}

#[derive(Debug, Clone, Copy)]
/// Pin routing and mode handed to [`CanAdapter::install`].
pub struct GeneralConfig {
    pub tx: PinId,
    pub rx: PinId,
    pub mode: ControllerMode,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Edge-triggered status alerts raised by the controller and consumed
    /// on read. Bit values follow the ESP32 TWAI alert register.
    pub struct Alerts: u32 {
        const TX_IDLE = 0x0000_0001;
        const TX_SUCCESS = 0x0000_0002;
        const RX_DATA = 0x0000_0004;
        const BELOW_ERR_WARN = 0x0000_0008;
        const ERR_ACTIVE = 0x0000_0010;
        const RECOVERY_IN_PROGRESS = 0x0000_0020;
        const BUS_RECOVERED = 0x0000_0040;
        const ARB_LOST = 0x0000_0080;
        const ABOVE_ERR_WARN = 0x0000_0100;
        const BUS_ERROR = 0x0000_0200;
        const TX_FAILED = 0x0000_0400;
        const RX_QUEUE_FULL = 0x0000_0800;
        const ERR_PASS = 0x0000_1000;
        const BUS_OFF = 0x0000_2000;
        const RX_FIFO_OVERRUN = 0x0000_4000;
    }
}

/// Contract a vendor CAN controller must fulfil.
///
/// `transmit`, `receive`, and `read_alerts` take an explicit wait ceiling
/// (zero for a non-blocking probe) and are asynchronous to accommodate
/// non-blocking drivers; everything else is plain register access.
pub trait CanAdapter {
    /// Install the controller driver with the given routing, bit timing,
    /// and acceptance filter.
    fn install(
        &mut self,
        general: &GeneralConfig,
        timing: &TimingConfig,
        filter: &FilterConfig,
    ) -> Result<(), AdapterError>;
    /// Start participating in bus traffic.
    fn start(&mut self) -> Result<(), AdapterError>;
    /// Stop participating; queued frames are preserved.
    fn stop(&mut self) -> Result<(), AdapterError>;
    /// Tear the controller driver down. Must be stopped first.
    fn uninstall(&mut self) -> Result<(), AdapterError>;
    /// Queue one frame for transmission, waiting at most `wait` for queue
    /// space. [`AdapterError::Timeout`] means the queue stayed full.
    fn transmit<'a>(
        &'a mut self,
        frame: &'a CanFrame,
        wait: Duration,
    ) -> impl Future<Output = Result<(), AdapterError>> + 'a;
    /// Take one frame from the receive queue, waiting at most `wait`.
    /// [`AdapterError::Timeout`] means the queue stayed empty.
    fn receive(
        &mut self,
        wait: Duration,
    ) -> impl Future<Output = Result<CanFrame, AdapterError>> + '_;
    /// Read and consume the accumulated alert bits, waiting at most `wait`
    /// for one to be raised.
    fn read_alerts(
        &mut self,
        wait: Duration,
    ) -> impl Future<Output = Result<Alerts, AdapterError>> + '_;
    /// Controller state and queue depths.
    fn status_info(&self) -> Result<StatusInfo, AdapterError>;
    /// Begin the bus-off recovery sequence. Refused with
    /// [`AdapterError::InvalidState`] unless the controller is bus-off.
    fn initiate_recovery(&mut self) -> Result<(), AdapterError>;
    /// Drop all frames waiting in the receive queue.
    fn clear_rx(&mut self) -> Result<(), AdapterError>;
    /// Drop all frames waiting in the transmit queue.
    fn clear_tx(&mut self) -> Result<(), AdapterError>;
    /// Replace the set of alert bits the controller is armed to raise.
    fn reconfigure_alerts(&mut self, mask: Alerts) -> Result<(), AdapterError>;
}
