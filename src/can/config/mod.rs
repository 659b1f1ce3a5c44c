//! Driver configuration: baud-to-timing table, acceptance filter, and pin
//! selection.
use crate::infra::gpio::PinId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bit timing descriptor handed to the controller at install time.
/// Values assume the controller's 80 MHz source clock.
pub struct TimingConfig {
    pub brp: u32,
    pub tseg_1: u8,
    pub tseg_2: u8,
    pub sjw: u8,
    pub triple_sampling: bool,
}

/// Look up the pre-computed timing descriptor for a baud rate (bit/s).
///
/// The supported set is closed: {25, 50, 100, 125, 250, 500, 1000} kbit/s.
/// The controller cannot derive 200 kbit/s or 80 kbit/s from its source
/// clock, so those fail fast with `None`.
pub fn timing_for_baud(baud_bps: u32) -> Option<TimingConfig> {
    let timing = match baud_bps {
        1_000_000 => TimingConfig {
            brp: 4,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
            triple_sampling: false,
        },
        500_000 => TimingConfig {
            brp: 8,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
            triple_sampling: false,
        },
        250_000 => TimingConfig {
            brp: 16,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
            triple_sampling: false,
        },
        125_000 => TimingConfig {
            brp: 32,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
            triple_sampling: false,
        },
        100_000 => TimingConfig {
            brp: 40,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
            triple_sampling: false,
        },
        50_000 => TimingConfig {
            brp: 80,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
            triple_sampling: false,
        },
        25_000 => TimingConfig {
            brp: 128,
            tseg_1: 16,
            tseg_2: 8,
            sjw: 3,
            triple_sampling: false,
        },
        _ => return None,
    };
    Some(timing)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Hardware acceptance filter. A frame is admitted when
/// `(id XOR acceptance_code) AND NOT acceptance_mask == 0` under the
/// controller's bit layout.
///
/// The default mask value is taken from the controller's reference
/// configuration and is **not** portable across vendors: verify on the
/// target that it admits the self-test id 0x7FF before relying on it.
pub struct FilterConfig {
    pub acceptance_code: u32,
    pub acceptance_mask: u32,
    /// Evaluate one 32-bit filter instead of two 16-bit halves.
    pub single_filter: bool,
}

impl FilterConfig {
    /// Filter that admits every standard identifier.
    pub const fn accept_all() -> Self {
        Self {
            acceptance_code: 0,
            acceptance_mask: u32::MAX,
            single_filter: true,
        }
    }

    /// Evaluate the filter against a standard identifier under the
    /// controller's single-filter layout (identifier in the top 11 bits of
    /// the compare word, mask bits set = "do not care").
    pub fn admits_standard_id(&self, id: u16) -> bool {
        let word = u32::from(id) << 21;
        (word ^ self.acceptance_code) & !self.acceptance_mask == 0
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            acceptance_code: 0,
            acceptance_mask: u32::MAX - 1,
            single_filter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Communication settings shared with the bus peer.
pub struct CanSettings {
    /// Baud rate in bit/s; must be one of the closed supported set.
    pub baud_bps: u32,
    pub filter: FilterConfig,
}

impl Default for CanSettings {
    fn default() -> Self {
        Self {
            baud_bps: 500_000,
            filter: FilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
/// Pin selection for [`configure`](crate::can::driver::CanDriver::configure).
pub struct CanPins {
    /// Pin wired to the transceiver's RX output.
    pub rx: PinId,
    /// Pin wired to the transceiver's TX input.
    pub tx: PinId,
    /// Optional pin wired to the transceiver's standby input, driven low
    /// while the driver is up. Absent: the feature is silently disabled.
    pub bus_off: Option<PinId>,
    /// Optional identifier used by
    /// [`transmit_default`](crate::can::driver::CanDriver::transmit_default).
    pub default_id: Option<u16>,
}
