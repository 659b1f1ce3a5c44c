//! CAN controller driver (classic CAN 2.0B, standard-format identifiers).
//!
//! The driver layers on [`adapter::CanAdapter`], the narrow capability set a
//! vendor controller must provide. Lifecycle and frame traffic live in
//! [`driver::CanDriver`]; bus-off recovery runs as the long-lived
//! [`watchdog::BusOffWatchdog`] task sharing state through
//! [`driver::CanShared`].
//!
//! ## Timing constants
//!
//! These constants bound the driver's two polling duties.

pub mod adapter;
pub mod config;
pub mod driver;
pub mod frame;
pub mod watchdog;

/// Poll period of the self-test status loop (ms).
///
/// The controller raises a tx alert well under 100 ms at the slowest
/// supported rate (25 kbit/s), so ten polls bound each phase to ~1 s.
pub const SELF_TEST_POLL_MS: u32 = 100;

/// Number of status polls per self-test phase.
pub const SELF_TEST_POLLS: u32 = 10;

/// Baud rate used by the loopback phase of the self-test (bit/s).
///
/// The slowest supported rate maximises the chance that a marginal
/// controller still completes its own frame.
pub const SELF_TEST_LOOPBACK_BAUD: u32 = 25_000;
