//! Wi-Fi station bring-up.

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::info;

use hall_rpm_gauge::config::NetworkConfig;

use super::PlatformError;

/// Join the configured access point and wait for an IP address.
pub fn connect(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    net: &NetworkConfig,
) -> Result<BlockingWifi<EspWifi<'static>>, PlatformError> {
    if net.wifi_ssid.is_empty() {
        return Err(PlatformError::Wifi("GAUGE_WIFI_SSID not set at build time"));
    }

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;

    let client = ClientConfiguration {
        ssid: net
            .wifi_ssid
            .try_into()
            .map_err(|_| PlatformError::Wifi("SSID too long"))?,
        password: net
            .wifi_password
            .try_into()
            .map_err(|_| PlatformError::Wifi("password too long"))?,
        auth_method: if net.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    };
    wifi.set_configuration(&Configuration::Client(client))?;

    wifi.start()?;
    info!("Wi-Fi started, joining '{}'", net.wifi_ssid);
    wifi.connect()?;
    wifi.wait_netif_up()?;

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("Wi-Fi up, address {}", ip_info.ip);

    Ok(wifi)
}
