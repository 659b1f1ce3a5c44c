//! Error definitions shared across library modules.
//! `CanError` is the single status taxonomy exposed by the CAN driver;
//! `AdapterError` is the closed error set of the controller adapter.
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Every way a CAN driver call can fail. Discriminants are stable so callers
/// logging or persisting the numeric value survive library upgrades.
pub enum CanError {
    /// Identifier does not fit in 11 bits.
    #[error("identifier does not fit in 11 bits")]
    BadId = 1,
    /// Payload longer than 8 bytes, or a received frame violating ISO 11898-1.
    #[error("payload exceeds 8 bytes or violates ISO 11898-1")]
    BadData = 2,
    /// The transmit queue stayed full for the whole wait ceiling.
    #[error("transmit queue full")]
    TxQueueFull = 3,
    /// The controller is not in the running state.
    #[error("controller not running")]
    NotRunning = 4,
    /// Requested baud rate is outside the supported set.
    #[error("unsupported baud rate")]
    UnsupportedBaud = 5,
    /// The controller refused the install step.
    #[error("controller install failed")]
    InstallFailed = 6,
    /// The controller refused the start step.
    #[error("controller start failed")]
    StartFailed = 7,
    /// `configure` was called twice without an intervening `shutdown`.
    #[error("driver already configured")]
    AlreadyBegun = 8,
    /// A pin that must be output-capable is not.
    #[error("pin cannot be used as an output")]
    InvalidPin = 9,
    /// The receive queue stayed empty for the whole wait ceiling.
    #[error("receive queue empty")]
    Timeout = 10,
    /// No alert has been raised since the last status read.
    #[error("no alerts raised yet")]
    NoAlerts = 11,
    /// Transmission failed with a bus error (bit, stuff, CRC, form, ACK).
    #[error("bus error during transmission")]
    BusError = 12,
    /// Transmission failed without a bus error being reported.
    #[error("transmission failed")]
    TxFailed = 13,
    /// Self-test: the controller answers its own loopback, so the fault is
    /// on the bus or the peer.
    #[error("controller alive but nothing answered on the bus")]
    NoResponse = 14,
    /// Self-test: the controller did not deliver its own loopback frame.
    #[error("controller failed its own loopback")]
    ControllerFault = 15,
    /// Any adapter error the driver cannot classify.
    #[error("unclassified controller error")]
    Unknown = 16,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors reported by a [`CanAdapter`](crate::can::adapter::CanAdapter)
/// implementation. The set is closed: vendor drivers must fold their own
/// codes into one of these.
pub enum AdapterError {
    /// Arguments rejected by the peripheral.
    #[error("invalid argument")]
    InvalidArg,
    /// The bounded wait elapsed (full tx queue, empty rx queue, no alerts).
    #[error("wait ceiling elapsed")]
    Timeout,
    /// The peripheral is installed but in the wrong state for the call.
    #[error("invalid controller state")]
    InvalidState,
    /// The peripheral driver is not installed.
    #[error("controller not installed")]
    NotInstalled,
    /// Any other vendor-level failure.
    #[error("unknown hardware error")]
    UnknownHw,
}
