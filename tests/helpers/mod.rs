/// Test doubles simulating the CAN controller, GPIO port, and delay timer
/// during integration tests.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

// registers the host critical-section implementation for embassy-sync
use critical_section as _;
use embassy_time::Duration;
use flightlink::can::adapter::{
    Alerts, CanAdapter, ControllerState, GeneralConfig, StatusInfo,
};
use flightlink::can::config::{CanPins, CanSettings, FilterConfig, TimingConfig};
use flightlink::can::frame::CanFrame;
use flightlink::error::AdapterError;
use flightlink::infra::gpio::{Gpio, Level, PinId};
use flightlink::infra::timer::LinkTimer;
use tokio::time::sleep;

#[derive(Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
/// What the controller reports after each accepted transmission.
pub enum TxBehavior {
    /// Raise a tx-success alert.
    Success,
    /// Raise tx-failed together with a bus-error alert.
    FailBus,
    /// Raise tx-failed alone.
    FailQuiet,
    /// Raise nothing (the frame stays "in flight" forever).
    Silent,
    /// Refuse the frame: the queue stays full past the wait ceiling.
    QueueFull,
}

#[allow(dead_code)]
/// Scriptable state behind [`MockAdapter`].
pub struct AdapterInner {
    pub installed: bool,
    pub state: ControllerState,
    pub tx_frames: Vec<CanFrame>,
    pub rx_queue: VecDeque<CanFrame>,
    pub alerts: VecDeque<Alerts>,
    pub alert_mask: Alerts,
    /// Every (general, timing, filter) triple handed to `install`.
    pub installs: Vec<(GeneralConfig, TimingConfig, FilterConfig)>,
    pub tx_behavior: TxBehavior,
    /// Deliver self-reception frames back into the rx queue.
    pub echo_self: bool,
    /// Refuse `install` once `installs` reaches this length.
    pub fail_installs_from: Option<usize>,
    pub fail_start: bool,
    /// Refuse `initiate_recovery` with `InvalidState`.
    pub refuse_recovery: bool,
    pub recovery_calls: usize,
    /// Forced `status_info`/`read_alerts` error.
    pub status_error: Option<AdapterError>,
    pub alert_error: Option<AdapterError>,
}

#[derive(Clone)]
/// In-memory CAN controller reproducing the `CanAdapter` contract. Clones
/// share state, so the test body keeps a handle while the driver owns one.
pub struct MockAdapter {
    inner: Arc<Mutex<AdapterInner>>,
}

#[allow(dead_code)]
impl MockAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AdapterInner {
                installed: false,
                state: ControllerState::Stopped,
                tx_frames: Vec::new(),
                rx_queue: VecDeque::new(),
                alerts: VecDeque::new(),
                alert_mask: Alerts::empty(),
                installs: Vec::new(),
                tx_behavior: TxBehavior::Success,
                echo_self: true,
                fail_installs_from: None,
                fail_start: false,
                refuse_recovery: false,
                recovery_calls: 0,
                status_error: None,
                alert_error: None,
            })),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, AdapterInner> {
        self.inner.lock().unwrap()
    }
}

impl CanAdapter for MockAdapter {
    fn install(
        &mut self,
        general: &GeneralConfig,
        timing: &TimingConfig,
        filter: &FilterConfig,
    ) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(limit) = inner.fail_installs_from {
            if inner.installs.len() >= limit {
                return Err(AdapterError::InvalidArg);
            }
        }
        if inner.installed {
            return Err(AdapterError::InvalidState);
        }
        inner.installed = true;
        inner.state = ControllerState::Stopped;
        inner.installs.push((*general, *timing, *filter));
        Ok(())
    }

    fn start(&mut self) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        if inner.fail_start {
            return Err(AdapterError::UnknownHw);
        }
        if inner.state != ControllerState::Stopped {
            return Err(AdapterError::InvalidState);
        }
        inner.state = ControllerState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        inner.state = ControllerState::Stopped;
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        if inner.state == ControllerState::Running {
            return Err(AdapterError::InvalidState);
        }
        inner.installed = false;
        Ok(())
    }

    async fn transmit<'a>(
        &'a mut self,
        frame: &'a CanFrame,
        _wait: Duration,
    ) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        if inner.state != ControllerState::Running {
            return Err(AdapterError::InvalidState);
        }
        if inner.tx_behavior == TxBehavior::QueueFull {
            return Err(AdapterError::Timeout);
        }
        inner.tx_frames.push(frame.clone());
        let raised = match inner.tx_behavior {
            TxBehavior::Success => Some(Alerts::TX_SUCCESS),
            TxBehavior::FailBus => Some(Alerts::TX_FAILED | Alerts::BUS_ERROR),
            TxBehavior::FailQuiet => Some(Alerts::TX_FAILED),
            TxBehavior::Silent | TxBehavior::QueueFull => None,
        };
        if let Some(alerts) = raised {
            inner.alerts.push_back(alerts);
        }
        if frame.self_reception && inner.echo_self {
            let echo = frame.clone();
            inner.rx_queue.push_back(echo);
        }
        Ok(())
    }

    async fn receive(&mut self, _wait: Duration) -> Result<CanFrame, AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        inner.rx_queue.pop_front().ok_or(AdapterError::Timeout)
    }

    async fn read_alerts(&mut self, _wait: Duration) -> Result<Alerts, AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.alert_error {
            return Err(err);
        }
        inner.alerts.pop_front().ok_or(AdapterError::Timeout)
    }

    fn status_info(&self) -> Result<StatusInfo, AdapterError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.status_error {
            return Err(err);
        }
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        Ok(StatusInfo {
            state: inner.state,
            rx_queued: inner.rx_queue.len() as u32,
            tx_queued: 0,
        })
    }

    fn initiate_recovery(&mut self) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.refuse_recovery || !inner.installed || inner.state != ControllerState::BusOff {
            return Err(AdapterError::InvalidState);
        }
        inner.recovery_calls += 1;
        inner.state = ControllerState::Recovering;
        Ok(())
    }

    fn clear_rx(&mut self) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        inner.rx_queue.clear();
        Ok(())
    }

    fn clear_tx(&mut self) -> Result<(), AdapterError> {
        let inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        Ok(())
    }

    fn reconfigure_alerts(&mut self, mask: Alerts) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.installed {
            return Err(AdapterError::NotInstalled);
        }
        inner.alert_mask = mask;
        Ok(())
    }
}

#[derive(Clone)]
#[allow(dead_code)]
/// GPIO port double recording directions and levels.
pub struct MockGpio {
    inner: Arc<Mutex<GpioInner>>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct GpioInner {
    pub invalid_outputs: Vec<PinId>,
    pub outputs: Vec<PinId>,
    pub high: Vec<PinId>,
}

#[allow(dead_code)]
impl MockGpio {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(GpioInner::default())),
        }
    }

    pub fn reject_output(self, pin: PinId) -> Self {
        self.inner.lock().unwrap().invalid_outputs.push(pin);
        self
    }

    pub fn is_high(&self, pin: PinId) -> bool {
        self.inner.lock().unwrap().high.contains(&pin)
    }

    pub fn is_output(&self, pin: PinId) -> bool {
        self.inner.lock().unwrap().outputs.contains(&pin)
    }
}

impl Gpio for MockGpio {
    fn is_valid_output(&self, pin: PinId) -> bool {
        !self.inner.lock().unwrap().invalid_outputs.contains(&pin)
    }

    fn set_as_output(&mut self, pin: PinId) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.outputs.contains(&pin) {
            inner.outputs.push(pin);
        }
    }

    fn set_as_input(&mut self, _pin: PinId) {}

    fn write(&mut self, pin: PinId, level: Level) {
        let mut inner = self.inner.lock().unwrap();
        inner.high.retain(|&p| p != pin);
        if level == Level::High {
            inner.high.push(pin);
        }
    }

    fn read(&self, pin: PinId) -> Level {
        if self.is_high(pin) {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[allow(dead_code)]
/// Timer driving delays through `tokio::time::sleep`, compressed so the
/// second-long self-test loops finish quickly.
pub struct MockTimer;

impl LinkTimer for MockTimer {
    async fn delay_ms(&mut self, millis: u32) {
        sleep(tokio::time::Duration::from_millis(u64::from(millis) / 20 + 1)).await;
    }
}

#[allow(dead_code)]
/// Pin set used by most tests.
pub fn test_pins() -> CanPins {
    CanPins {
        rx: 4,
        tx: 5,
        bus_off: Some(6),
        default_id: Some(0x100),
    }
}

#[allow(dead_code)]
/// 500 kbit/s with the default filter.
pub fn test_settings() -> CanSettings {
    CanSettings::default()
}
