// HallRpmGauge - Build Script
//
// Propagates the ESP-IDF environment and stamps build-time configuration.

use std::process::Command;

/// Build environment variables read by `config` through `option_env!`.
const CONFIG_ENV: [&str; 4] = [
    "GAUGE_BROKER_URL",
    "GAUGE_MQTT_CLIENT_ID",
    "GAUGE_WIFI_SSID",
    "GAUGE_WIFI_PASS",
];

fn main() {
    // ESP-IDF environment setup (MUST be first on device builds)
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING=HallRpmGauge v{}-g{}", version, git_hash);

    for var in CONFIG_ENV {
        println!("cargo:rerun-if-env-changed={}", var);
    }

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}
