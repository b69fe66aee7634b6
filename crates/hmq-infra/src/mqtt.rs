//! `rumqttc`-backed `MqttPort` (spec §6): owns the connection's event loop
//! on a background task and forwards incoming publishes over an mpsc
//! channel, the shape `MqttPort::messages` exposes to the domain layer.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use hmq_core::error::MqttError;
use hmq_core::ports::{IncomingMessage, MqttPort};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const CLIENT_CHANNEL_CAPACITY: usize = 64;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

pub struct MqttConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct RumqttcMqttPort {
    client: AsyncClient,
    incoming_rx: Mutex<Option<mpsc::Receiver<IncomingMessage>>>,
}

impl RumqttcMqttPort {
    pub fn connect(config: MqttConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id, config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }
        if config.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, mut event_loop) = AsyncClient::new(options, CLIENT_CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = IncomingMessage {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                        };
                        if tx.send(message).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "mqtt event loop error, retrying");
                        tokio::time::sleep(RECONNECT_BACKOFF).await;
                    }
                }
            }
        });

        Self {
            client,
            incoming_rx: Mutex::new(Some(rx)),
        }
    }
}

#[async_trait]
impl MqttPort for RumqttcMqttPort {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        debug!(topic, bytes = payload.len(), retain, "publishing");
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(e.to_string()))
    }

    async fn subscribe(&self, topic_filter: &str) -> Result<(), MqttError> {
        self.client
            .subscribe(topic_filter, QoS::AtMostOnce)
            .await
            .map_err(|e| MqttError::SubscribeFailed(e.to_string()))
    }

    fn messages(&self) -> mpsc::Receiver<IncomingMessage> {
        self.incoming_rx
            .try_lock()
            .expect("messages() not called concurrently")
            .take()
            .expect("messages() called once per adapter")
    }
}
