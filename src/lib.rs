//! `flightlink` library: hardware drivers for the two communication links of
//! an embedded flight computer, written for a `no_std` environment. The crate
//! exposes the hardware abstraction traits (GPIO, UART, clock, delay timer),
//! the CAN controller driver with its bus-off watchdog and self-test, and the
//! 920 MHz radio module driver with its streaming packet framer.
#![no_std]
//==================================================================================
/// CAN controller driver: lifecycle, frame transmit/receive, alert-based
/// status reporting, self-test, and the bus-off recovery watchdog.
pub mod can;
/// Driver errors (the CAN status taxonomy and the low-level controller
/// adapter error set).
pub mod error;
/// Hardware abstraction traits consumed by both drivers (GPIO, UART,
/// monotonic clock, cooperative delay timer).
pub mod infra;
/// 920 MHz radio module driver: reset/wakeup pin sequencing, packet framing,
/// and the request/response protocol layer.
pub mod radio;
//==================================================================================
