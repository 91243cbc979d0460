//! MQTT telemetry channel.
//!
//! Session, reconnect and QoS handling stay inside the ESP-IDF client.
//! The event callback only logs and flips the connection flag the uplink
//! polls through [`TelemetryChannel::is_connected`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::sys::EspError;
use log::{debug, info, warn};

use hall_rpm_gauge::config::NetworkConfig;
use hall_rpm_gauge::uplink::{ChannelError, TelemetryChannel};

pub struct MqttChannel {
    client: EspMqttClient<'static>,
    connected: Arc<AtomicBool>,
}

impl MqttChannel {
    /// Start the client. Returns immediately; the session comes up later.
    pub fn connect(net: &NetworkConfig) -> Result<Self, EspError> {
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);

        let conf = MqttClientConfiguration {
            client_id: Some(net.client_id),
            ..Default::default()
        };

        let client = EspMqttClient::new_cb(net.broker_url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    info!("MQTT connected");
                    flag.store(true, Ordering::Release);
                }
                EventPayload::Disconnected => {
                    info!("MQTT disconnected");
                    flag.store(false, Ordering::Release);
                }
                EventPayload::Published(msg_id) => debug!("MQTT published, msg_id={}", msg_id),
                EventPayload::Error(err) => warn!("MQTT error: {:?}", err),
                other => debug!("MQTT event: {:?}", other),
            }
        })?;

        info!("MQTT client started for {}", net.broker_url);
        Ok(Self { client, connected })
    }
}

impl TelemetryChannel for MqttChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| ChannelError::SendRejected)
    }
}
