//! CAN driver core: lifecycle state machine, single-frame traffic, alert
//! classification, and the loopback self-test.
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use embedded_can::StandardId;

use crate::can::adapter::{Alerts, CanAdapter, ControllerMode, ControllerState, GeneralConfig};
use crate::can::config::{timing_for_baud, CanPins, CanSettings, FilterConfig};
use crate::can::frame::CanFrame;
use crate::can::{SELF_TEST_LOOPBACK_BAUD, SELF_TEST_POLLS, SELF_TEST_POLL_MS};
use crate::error::{AdapterError, CanError};
use crate::infra::gpio::{Gpio, Level};
use crate::infra::timer::LinkTimer;

/// State shared between the driver and its bus-off watchdog.
///
/// Firmware pre-allocates one instance (typically through `static_cell`) and
/// hands references to [`CanDriver::new`] and
/// [`BusOffWatchdog::new`](crate::can::watchdog::BusOffWatchdog::new). No
/// allocation is performed by the library.
pub struct CanShared<A: CanAdapter> {
    pub(crate) adapter: Mutex<CriticalSectionRawMutex, A>,
    /// Set while a `configure` is in effect. Single-writer: the watchdog
    /// clears it on terminal bus-off, `configure`/`shutdown` own it
    /// otherwise.
    pub(crate) already_begun: AtomicBool,
    /// Whether the watchdog performs its duty on the next tick.
    pub(crate) watchdog_enabled: AtomicBool,
    /// Fired by `shutdown` to terminate the watchdog task.
    pub(crate) watchdog_stop: Signal<CriticalSectionRawMutex, ()>,
}

impl<A: CanAdapter> CanShared<A> {
    pub const fn new(adapter: A) -> Self {
        Self {
            adapter: Mutex::new(adapter),
            already_begun: AtomicBool::new(false),
            watchdog_enabled: AtomicBool::new(false),
            watchdog_stop: Signal::new(),
        }
    }
}

/// CAN controller driver.
///
/// All operations return a kind from the [`CanError`] taxonomy; the driver
/// never panics across its boundary. Callers serialise their own
/// `configure`/`shutdown` sequences.
pub struct CanDriver<'a, A: CanAdapter, G: Gpio, T: LinkTimer> {
    shared: &'a CanShared<A>,
    gpio: G,
    timer: T,
    pins: Option<CanPins>,
    /// Last settings successfully applied; restored after the self-test.
    settings: Option<CanSettings>,
}

impl<'a, A: CanAdapter, G: Gpio, T: LinkTimer> CanDriver<'a, A, G, T> {
    pub fn new(shared: &'a CanShared<A>, gpio: G, timer: T) -> Self {
        Self {
            shared,
            gpio,
            timer,
            pins: None,
            settings: None,
        }
    }

    /// Whether a `configure` is currently in effect. Cleared by `shutdown`
    /// and by the watchdog on terminal bus-off.
    pub fn is_configured(&self) -> bool {
        self.shared.already_begun.load(Ordering::Acquire)
    }

    /// Install and start the controller. Succeeds at most once between
    /// [`shutdown`](Self::shutdown)s; the second call returns
    /// [`CanError::AlreadyBegun`] without touching the controller.
    ///
    /// On success the watchdog duty is resumed, alerts are armed for tx
    /// success/failure and bus errors, and the optional bus-off pin is
    /// driven active-low.
    pub async fn configure(&mut self, settings: CanSettings, pins: CanPins) -> Result<(), CanError> {
        if self.is_configured() {
            #[cfg(feature = "defmt")]
            defmt::error!("configure can be called once only");
            return Err(CanError::AlreadyBegun);
        }
        self.pins = Some(pins);
        self.shared.watchdog_stop.reset();
        self.bring_up(settings).await
    }

    /// Replace the communication settings: stop + uninstall + install +
    /// start. Any failure leaves the driver stopped with the begun flag
    /// cleared, so a fresh `configure` is required.
    pub async fn reconfigure(&mut self, settings: CanSettings) -> Result<(), CanError> {
        self.teardown_controller().await;
        self.shared.already_begun.store(false, Ordering::Release);
        self.bring_up(settings).await
    }

    /// Stop (when running or recovering) and uninstall the controller, and
    /// cancel the watchdog task. Safe to call in any state.
    pub async fn shutdown(&mut self) {
        self.teardown_controller().await;
        self.shared.already_begun.store(false, Ordering::Release);
        self.shared.watchdog_enabled.store(false, Ordering::Release);
        self.shared.watchdog_stop.signal(());
    }

    /// Transmit one standard data frame, waiting at most `wait` for queue
    /// space. `data` holds at most 8 bytes.
    pub async fn transmit(&mut self, id: u16, data: &[u8], wait: Duration) -> Result<(), CanError> {
        let id = StandardId::new(id).ok_or(CanError::BadId)?;
        if data.len() > 8 {
            #[cfg(feature = "defmt")]
            defmt::error!("CAN supports at most 8 payload bytes");
            return Err(CanError::BadData);
        }
        let frame = CanFrame::data_frame(id, data);
        self.send_frame(&frame, wait).await
    }

    /// Transmit with the identifier selected at `configure` time.
    /// [`CanError::BadId`] when no default identifier was configured.
    pub async fn transmit_default(&mut self, data: &[u8], wait: Duration) -> Result<(), CanError> {
        let id = self
            .pins
            .and_then(|pins| pins.default_id)
            .ok_or(CanError::BadId)?;
        self.transmit(id, data, wait).await
    }

    /// Frames waiting in the receive queue. Returns 0 on any status-query
    /// error, so 0 always means "do not read".
    pub async fn pending_rx_count(&mut self) -> u32 {
        let adapter = self.shared.adapter.lock().await;
        match adapter.status_info() {
            Ok(status) => status.rx_queued,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::error!("failed to query controller status");
                0
            }
        }
    }

    /// Receive one frame with identifier and size, waiting at most `wait`.
    pub async fn receive_detail(&mut self, wait: Duration) -> Result<CanFrame, CanError> {
        self.read_frame(wait).await
    }

    /// Receive one frame's payload followed by a terminating zero byte.
    /// Returns the payload length; an empty payload is [`CanError::BadData`].
    pub async fn receive_line(
        &mut self,
        out: &mut [u8; 9],
        wait: Duration,
    ) -> Result<usize, CanError> {
        let frame = self.read_frame(wait).await?;
        let payload = frame.payload();
        if payload.is_empty() {
            #[cfg(feature = "defmt")]
            defmt::error!("received frame carries no data");
            return Err(CanError::BadData);
        }
        out[..payload.len()].copy_from_slice(payload);
        out[payload.len()] = 0;
        Ok(payload.len())
    }

    /// Receive one frame and return only its first payload byte.
    pub async fn receive_char(&mut self, wait: Duration) -> Result<u8, CanError> {
        let mut line = [0u8; 9];
        self.receive_line(&mut line, wait).await?;
        if line[1..].iter().any(|&byte| byte != 0) {
            #[cfg(feature = "defmt")]
            defmt::warn!("frame carried more than one byte; returning only the first");
        }
        Ok(line[0])
    }

    /// Classify the latest transmit alert. One alert epoch per call: alerts
    /// are edge-triggered and consumed on read.
    ///
    /// `Ok(())` = the previous transmission succeeded;
    /// [`CanError::NoAlerts`] = no status has arrived yet (still sending);
    /// [`CanError::BusError`] / [`CanError::TxFailed`] = the transmission
    /// failed with / without a bus error; [`CanError::Unknown`] otherwise.
    pub async fn tx_status(&mut self) -> Result<(), CanError> {
        let mut adapter = self.shared.adapter.lock().await;
        let alerts = match adapter.read_alerts(Duration::from_millis(0)).await {
            Ok(alerts) => alerts,
            Err(AdapterError::Timeout) => return Err(CanError::NoAlerts),
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::error!("failed to read controller alerts");
                return Err(CanError::Unknown);
            }
        };
        if alerts.contains(Alerts::TX_SUCCESS) {
            return Ok(());
        }
        if alerts.contains(Alerts::TX_FAILED) {
            if alerts.contains(Alerts::BUS_ERROR) {
                return Err(CanError::BusError);
            }
            return Err(CanError::TxFailed);
        }
        Err(CanError::Unknown)
    }

    /// Check that the controller and the bus work, without requiring a
    /// cooperating peer. Takes over a second when the bus is down; intended
    /// for the setup phase only. Frames arriving during the test may be
    /// lost.
    ///
    /// A first empty frame is transmitted at the configured rate; when its
    /// status never turns to success, the controller is reconfigured to
    /// 25 kbit/s with an accept-all filter and made to listen to its own
    /// transmission. The saved settings are restored on every exit path.
    ///
    /// `Ok(())` = bus operational; [`CanError::NoResponse`] = the controller
    /// hears itself, so the bus or the peer is at fault;
    /// [`CanError::ControllerFault`] = the controller cannot even deliver
    /// its own frame; [`CanError::Unknown`] = the test could not run.
    pub async fn self_test(&mut self, id: Option<u16>) -> Result<(), CanError> {
        let raw = id.unwrap_or_else(|| StandardId::MAX.as_raw());
        let id = StandardId::new(raw).ok_or(CanError::BadId)?;

        let probe = CanFrame::data_frame(id, &[]);
        if self
            .send_frame(&probe, Duration::from_millis(0))
            .await
            .is_err()
        {
            return Err(CanError::Unknown);
        }
        match self.poll_tx_status().await {
            Ok(()) => return Ok(()),
            Err(CanError::Unknown) => return Err(CanError::Unknown),
            Err(_) => {}
        }

        // Normal transmission failed: find out whether the controller can at
        // least hear its own frame on a quiet bus.
        let Some(saved) = self.settings else {
            return Err(CanError::Unknown);
        };
        let outcome = self.loopback_phase(id).await;

        self.shared.watchdog_enabled.store(false, Ordering::Release);
        if self.reconfigure(saved).await.is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("cannot restore settings after self-test; controller turned off");
        }
        Err(outcome)
    }

    /// Clear both controller queues. Pending traffic is lost; errors are
    /// logged, not returned.
    pub async fn flush(&mut self) {
        let mut adapter = self.shared.adapter.lock().await;
        if adapter.clear_rx().is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("failed to clear receive queue");
        }
        if adapter.clear_tx().is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("failed to clear transmit queue");
        }
    }

    //==================================================================================Internals

    /// Validate pins, install, and start with the given settings. Leaves the
    /// begun flag set and the watchdog duty resumed on success only.
    async fn bring_up(&mut self, settings: CanSettings) -> Result<(), CanError> {
        let Some(pins) = self.pins else {
            return Err(CanError::InvalidPin);
        };
        if let Some(pin) = pins.bus_off {
            if !self.gpio.is_valid_output(pin) {
                #[cfg(feature = "defmt")]
                defmt::error!("invalid bus-off pin selected");
                return Err(CanError::InvalidPin);
            }
            self.gpio.set_as_output(pin);
            // transceiver standby input, active-low: enable the bus
            self.gpio.write(pin, Level::Low);
        }
        if !self.gpio.is_valid_output(pins.rx) || !self.gpio.is_valid_output(pins.tx) {
            #[cfg(feature = "defmt")]
            defmt::error!("rx/tx pin cannot be used for output");
            return Err(CanError::InvalidPin);
        }
        let timing = timing_for_baud(settings.baud_bps).ok_or(CanError::UnsupportedBaud)?;
        let general = GeneralConfig {
            tx: pins.tx,
            rx: pins.rx,
            mode: ControllerMode::Normal,
        };

        let mut adapter = self.shared.adapter.lock().await;
        if adapter.install(&general, &timing, &settings.filter).is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("failed to install controller driver");
            return Err(CanError::InstallFailed);
        }
        if adapter.start().is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("failed to start controller");
            return Err(CanError::StartFailed);
        }
        // the only possible refusal is not-installed, which start just ruled out
        let _ = adapter.reconfigure_alerts(Alerts::TX_SUCCESS | Alerts::TX_FAILED | Alerts::BUS_ERROR);
        drop(adapter);

        self.settings = Some(settings);
        self.shared.already_begun.store(true, Ordering::Release);
        self.shared.watchdog_enabled.store(true, Ordering::Release);
        Ok(())
    }

    /// Stop the controller when it participates in traffic, then uninstall.
    async fn teardown_controller(&mut self) {
        let mut adapter = self.shared.adapter.lock().await;
        let Ok(status) = adapter.status_info() else {
            return;
        };
        if matches!(
            status.state,
            ControllerState::Running | ControllerState::Recovering
        ) {
            // stopping a recovering controller may be refused; uninstall
            // below proceeds regardless
            let _ = adapter.stop();
        }
        if adapter.uninstall().is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("failed to uninstall controller driver");
        }
    }

    async fn send_frame(&mut self, frame: &CanFrame, wait: Duration) -> Result<(), CanError> {
        let mut adapter = self.shared.adapter.lock().await;
        adapter.transmit(frame, wait).await.map_err(|err| match err {
            AdapterError::InvalidArg => CanError::BadData,
            AdapterError::Timeout => CanError::TxQueueFull,
            AdapterError::InvalidState => CanError::NotRunning,
            AdapterError::NotInstalled | AdapterError::UnknownHw => CanError::Unknown,
        })
    }

    async fn read_frame(&mut self, wait: Duration) -> Result<CanFrame, CanError> {
        let frame = {
            let mut adapter = self.shared.adapter.lock().await;
            adapter.receive(wait).await.map_err(|err| match err {
                AdapterError::Timeout => CanError::Timeout,
                AdapterError::InvalidArg => CanError::BadData,
                AdapterError::InvalidState => CanError::NotRunning,
                AdapterError::NotInstalled | AdapterError::UnknownHw => CanError::Unknown,
            })?
        };
        if frame.dlc_non_comp {
            #[cfg(feature = "defmt")]
            defmt::error!("received frame does not follow ISO 11898-1");
            return Err(CanError::BadData);
        }
        Ok(frame)
    }

    /// Poll [`tx_status`](Self::tx_status) at 100 ms intervals until an
    /// alert arrives or the poll budget is spent.
    async fn poll_tx_status(&mut self) -> Result<(), CanError> {
        let mut result = Err(CanError::NoAlerts);
        for _ in 0..SELF_TEST_POLLS {
            self.timer.delay_ms(SELF_TEST_POLL_MS).await;
            result = self.tx_status().await;
            if !matches!(result, Err(CanError::NoAlerts)) {
                break;
            }
        }
        result
    }

    /// Second self-test phase: reconfigure to the slowest rate with an
    /// accept-all filter and check whether a self-reception single-shot
    /// frame comes back. The watchdog is paused across the reconfigure so
    /// it cannot race the loopback setup.
    async fn loopback_phase(&mut self, id: StandardId) -> CanError {
        self.shared.watchdog_enabled.store(false, Ordering::Release);
        let loopback = CanSettings {
            baud_bps: SELF_TEST_LOOPBACK_BAUD,
            filter: FilterConfig::accept_all(),
        };
        if self.reconfigure(loopback).await.is_err() {
            return CanError::Unknown;
        }

        let mut probe = CanFrame::data_frame(id, &[]);
        probe.self_reception = true;
        probe.single_shot = true;
        if self
            .send_frame(&probe, Duration::from_millis(0))
            .await
            .is_err()
        {
            return CanError::Unknown;
        }
        // the alert outcome does not matter here; the echoed frame decides
        let _ = self.poll_tx_status().await;

        if self.pending_rx_count().await > 0 {
            if let Ok(frame) = self.receive_detail(Duration::from_millis(0)).await {
                if frame.id == id {
                    // the controller hears itself: the fault is on the bus
                    // side or the peer
                    return CanError::NoResponse;
                }
            }
        }
        CanError::ControllerFault
    }
}
