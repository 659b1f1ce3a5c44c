//! Bus-off recovery watchdog.
//!
//! The controller goes bus-off after 256 consecutive transmit errors and
//! stays there until recovery is initiated explicitly. This long-lived duty
//! loop watches for that state and starts the recovery, so a transient bus
//! fault does not silence the node forever. When recovery itself is refused,
//! the begun flag is cleared and a fresh `configure` is required.
use core::sync::atomic::Ordering;

use futures_util::future::{select, Either};
use futures_util::pin_mut;

use crate::can::adapter::{CanAdapter, ControllerState};
use crate::can::driver::CanShared;
use crate::error::AdapterError;
use crate::infra::timer::LinkTimer;

/// Tick period of the recovery duty (ms). Recovery starts within two ticks
/// of the controller going bus-off.
pub const WATCHDOG_PERIOD_MS: u32 = 500;

/// Instance-bound watchdog task. Construct it next to the driver, hand both
/// the same [`CanShared`], and spawn [`run`](Self::run) on the executor.
///
/// The duty is paused at construction, resumed by
/// [`configure`](crate::can::driver::CanDriver::configure), and the run
/// future terminates when
/// [`shutdown`](crate::can::driver::CanDriver::shutdown) fires the stop
/// signal. The watchdog never installs or uninstalls the controller; its
/// only writes are `initiate_recovery` and the begun flag.
pub struct BusOffWatchdog<'a, A: CanAdapter, T: LinkTimer> {
    shared: &'a CanShared<A>,
    timer: T,
}

impl<'a, A: CanAdapter, T: LinkTimer> BusOffWatchdog<'a, A, T> {
    pub fn new(shared: &'a CanShared<A>, timer: T) -> Self {
        Self { shared, timer }
    }

    /// Drive the duty loop until the stop signal fires.
    pub async fn run(mut self) {
        loop {
            {
                let tick = self.timer.delay_ms(WATCHDOG_PERIOD_MS);
                let stop = self.shared.watchdog_stop.wait();
                pin_mut!(tick);
                pin_mut!(stop);
                if let Either::Right(_) = select(tick, stop).await {
                    return;
                }
            }
            if self.shared.watchdog_enabled.load(Ordering::Acquire) {
                self.tick().await;
            }
        }
    }

    async fn tick(&mut self) {
        let mut adapter = self.shared.adapter.lock().await;
        let Ok(status) = adapter.status_info() else {
            // invalid arguments or driver not installed; nothing to recover
            return;
        };
        if status.state != ControllerState::BusOff {
            return;
        }
        if let Err(AdapterError::InvalidState) = adapter.initiate_recovery() {
            #[cfg(feature = "defmt")]
            defmt::error!("controller is bus-off and cannot recover; reconfigure required");
            self.shared.already_begun.store(false, Ordering::Release);
            // stand down until the next configure
            self.shared.watchdog_enabled.store(false, Ordering::Release);
        }
    }
}
