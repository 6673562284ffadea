//! Wi-Fi station
//!
//! [`connection_task`] keeps the station associated for the life of the
//! device, reconnecting whenever the access point drops it. Bootstrap blocks
//! in [`wait_for_ip`] until DHCP has handed out an address.

use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use envclock_core::config::Config;
use envclock_core::error::{Operation, escalate};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::info;

const RECONNECT_PAUSE: Duration = Duration::from_millis(5000);

/// Apply the station credentials from `config`.
pub fn configure_station(
    controller: &mut WifiController<'static>,
    config: &Config<'_>,
) -> Result<(), esp_radio::wifi::WifiError> {
    let client = ClientConfig::default()
        .with_ssid(config.internet.ssid.into())
        .with_password(config.internet.password.into());
    controller.set_config(&ModeConfig::Client(client))
}

#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) -> ! {
    loop {
        if !controller.is_started().unwrap_or(false) {
            if escalate(Operation::NetworkJoin, controller.start_async().await).is_none() {
                Timer::after(RECONNECT_PAUSE).await;
                continue;
            }
            info!("Wi-Fi started");
        }

        if escalate(Operation::NetworkJoin, controller.connect_async().await).is_some() {
            info!("Wi-Fi associated");
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            info!("Wi-Fi disconnected, reconnecting");
        }

        Timer::after(RECONNECT_PAUSE).await;
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// Block until DHCP has configured the stack.
pub async fn wait_for_ip(stack: Stack<'static>) {
    info!("Waiting for an IP address");
    stack.wait_config_up().await;
    if let Some(config) = stack.config_v4() {
        info!("Got IP: {}", config.address);
    }
}
