//! HallRpmGauge - entry point
//!
//! On ESP-IDF this brings up the firmware (hall ISR, LCD, Wi-Fi, MQTT) and
//! never returns. On any other target it runs the desktop simulator.

#[cfg(target_os = "espidf")]
mod platform;

#[cfg(not(target_os = "espidf"))]
mod simulator;

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(err) = platform::run() {
        log::error!("start-up failed: {}", err);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    simulator::run();
}
