//! Watchdog tests: automatic bus-off recovery, the terminal refusal path,
//! duty pausing, and task cancellation through `shutdown`.
mod helpers;

use embassy_time::Duration;
use flightlink::can::adapter::ControllerState;
use flightlink::can::driver::{CanDriver, CanShared};
use flightlink::can::watchdog::BusOffWatchdog;
use helpers::{test_pins, test_settings, MockAdapter, MockGpio, MockTimer};
use static_cell::StaticCell;
use tokio::time::sleep;

/// Long enough for several compressed watchdog ticks.
const TICKS: tokio::time::Duration = tokio::time::Duration::from_millis(200);

#[tokio::test]
async fn recovers_the_controller_from_bus_off() {
    static SHARED: StaticCell<CanShared<MockAdapter>> = StaticCell::new();
    let adapter = MockAdapter::new();
    let handle = adapter.clone();
    let shared = &*SHARED.init(CanShared::new(adapter));

    let mut driver = CanDriver::new(shared, MockGpio::new(), MockTimer);
    driver.configure(test_settings(), test_pins()).await.unwrap();
    let task = tokio::spawn(BusOffWatchdog::new(shared, MockTimer).run());

    // 256 consecutive tx errors later...
    handle.lock().state = ControllerState::BusOff;
    sleep(TICKS).await;

    {
        let mut inner = handle.lock();
        assert_eq!(inner.recovery_calls, 1);
        assert_eq!(inner.state, ControllerState::Recovering);
        // hardware finishes the recovery sequence
        inner.state = ControllerState::Running;
    }
    assert!(driver.is_configured());

    // traffic flows again
    driver
        .transmit(0x123, &[0x01], Duration::from_millis(0))
        .await
        .unwrap();

    driver.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn terminal_bus_off_clears_the_begun_flag_and_stands_down() {
    static SHARED: StaticCell<CanShared<MockAdapter>> = StaticCell::new();
    let adapter = MockAdapter::new();
    let handle = adapter.clone();
    let shared = &*SHARED.init(CanShared::new(adapter));

    let mut driver = CanDriver::new(shared, MockGpio::new(), MockTimer);
    driver.configure(test_settings(), test_pins()).await.unwrap();
    let task = tokio::spawn(BusOffWatchdog::new(shared, MockTimer).run());

    {
        let mut inner = handle.lock();
        inner.state = ControllerState::BusOff;
        inner.refuse_recovery = true;
    }
    sleep(TICKS).await;

    // the refusal marked the driver as needing a fresh configure
    assert!(!driver.is_configured());
    assert_eq!(handle.lock().recovery_calls, 0);

    // duty is paused: even a now-recoverable controller is left alone
    handle.lock().refuse_recovery = false;
    sleep(TICKS).await;
    assert_eq!(handle.lock().recovery_calls, 0);

    driver.shutdown().await;
    task.await.unwrap();
}

#[tokio::test]
async fn duty_stays_paused_until_configure() {
    let adapter = MockAdapter::new();
    let handle = adapter.clone();
    let shared = CanShared::new(adapter);
    let watchdog = BusOffWatchdog::new(&shared, MockTimer);

    {
        let mut inner = handle.lock();
        inner.installed = true;
        inner.state = ControllerState::BusOff;
    }

    // run() never returns on its own; give it a few ticks and drop it
    let _ = tokio::time::timeout(TICKS, watchdog.run()).await;
    assert_eq!(handle.lock().recovery_calls, 0);
}

#[tokio::test]
async fn shutdown_cancels_the_task() {
    static SHARED: StaticCell<CanShared<MockAdapter>> = StaticCell::new();
    let adapter = MockAdapter::new();
    let shared = &*SHARED.init(CanShared::new(adapter));

    let mut driver = CanDriver::new(shared, MockGpio::new(), MockTimer);
    driver.configure(test_settings(), test_pins()).await.unwrap();
    let task = tokio::spawn(BusOffWatchdog::new(shared, MockTimer).run());

    driver.shutdown().await;
    tokio::time::timeout(TICKS, task)
        .await
        .expect("watchdog task must terminate on shutdown")
        .unwrap();
}
