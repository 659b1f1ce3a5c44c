//! Reset/wakeup/mode pin management for the radio module, with edge-polled
//! time gates for the reset pulse and the post-reset boot settle. No call
//! here ever busy-waits; callers poll the gates from their own loop.
use crate::infra::clock::Monotonic;
use crate::infra::gpio::{Gpio, Level, PinId};

/// Pin controller for the radio module.
///
/// * `reset`: output; a low pulse resets the module.
/// * `wakeup`: output; high = normal operation, low = power-save.
/// * `mode`: input; the module reports high while in power-save.
pub struct RadioPins<G: Gpio, C: Monotonic> {
    gpio: G,
    clock: C,
    reset: PinId,
    wakeup: PinId,
    mode: PinId,
    /// Boot-settle gate armed: commands must wait for the settle period.
    boot_armed: bool,
    boot_time: u32,
    /// Reset pulse currently held low.
    resetting: bool,
    reset_start: u32,
}

impl<G: Gpio, C: Monotonic> RadioPins<G, C> {
    /// Configure the three pins (reset and wakeup released high, mode as
    /// input) and arm the boot gate: the module is treated as freshly
    /// powered and given its settle period before commands.
    pub fn new(mut gpio: G, clock: C, reset: PinId, wakeup: PinId, mode: PinId) -> Self {
        gpio.set_as_output(reset);
        gpio.set_as_output(wakeup);
        gpio.write(reset, Level::High);
        gpio.write(wakeup, Level::High);
        gpio.set_as_input(mode);
        let boot_time = clock.now_us();
        Self {
            gpio,
            clock,
            reset,
            wakeup,
            mode,
            boot_armed: true,
            boot_time,
            resetting: false,
            reset_start: 0,
        }
    }

    /// Move the module to power-save.
    pub fn sleep(&mut self) {
        self.gpio.write(self.wakeup, Level::Low);
    }

    /// Return the module to normal operation.
    pub fn wake(&mut self) {
        self.gpio.write(self.wakeup, Level::High);
    }

    /// Whether the module reports power-save on its mode pin.
    pub fn module_sleeping(&self) -> bool {
        self.gpio.read(self.mode) == Level::High
    }

    /// Drive the reset pin low and start timing the pulse.
    pub fn start_reboot(&mut self) {
        self.resetting = true;
        self.reset_start = self.clock.now_us();
        self.gpio.write(self.reset, Level::Low);
    }

    /// Advance the reset pulse; returns `true` while the pulse is still
    /// held. Once `threshold_us` (datasheet: [`RESET_PULSE_US`]) has
    /// elapsed, the pin is released and the boot gate re-armed.
    ///
    /// [`RESET_PULSE_US`]: crate::radio::RESET_PULSE_US
    pub fn poll_reboot(&mut self, threshold_us: u32) -> bool {
        if !self.resetting {
            return false;
        }
        if self.clock.elapsed_us(self.reset_start) > threshold_us {
            self.resetting = false;
            self.gpio.write(self.reset, Level::High);
            self.arm_boot_gate();
            return false;
        }
        true
    }

    /// Whether the post-reset settle period (datasheet:
    /// [`BOOT_SETTLE_US`]) has elapsed. True when no boot is pending; the
    /// gate disarms itself once crossed.
    ///
    /// [`BOOT_SETTLE_US`]: crate::radio::BOOT_SETTLE_US
    pub fn boot_finished(&mut self, threshold_us: u32) -> bool {
        if !self.boot_armed {
            return true;
        }
        if self.clock.elapsed_us(self.boot_time) > threshold_us {
            self.boot_armed = false;
            return true;
        }
        false
    }

    fn arm_boot_gate(&mut self) {
        self.boot_armed = true;
        self.boot_time = self.clock.now_us();
    }
}
