//! Drives the troll mutator (spec §4.4): subscribes to the whole broker,
//! classifies every troll-eligible payload it observes, and republishes a
//! perturbed variant to the same topic — skipping its own feedback via the
//! digest cache and throttling frequency via Trolliness.

use std::time::Instant;

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, info_span, Instrument};

use crate::error::MqttError;
use crate::ports::MqttPort;
use crate::topics;
use crate::troll::classify::classify;
use crate::troll::digest_cache::DigestCache;
use crate::troll::mutate::mutate;

/// Runs until `cancel` signals true or the message stream closes.
pub async fn run(
    mqtt: &dyn MqttPort,
    trolliness: u32,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), MqttError> {
    let span = info_span!("troll.run", trolliness);
    async move {
        mqtt.subscribe(topics::WILDCARD_ALL).await?;
        let mut messages = mqtt.messages();
        let mut cache = DigestCache::default();
        let mut rng = rand::rng();
        let mut sweep_ticker = tokio::time::interval(cache.ttl() / 2);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("troll stopped");
                        return Ok(());
                    }
                }
                _ = sweep_ticker.tick() => {
                    cache.sweep(Instant::now());
                }
                incoming = messages.recv() => {
                    let Some(incoming) = incoming else {
                        return Ok(());
                    };
                    let now = Instant::now();

                    if !topics::is_troll_eligible(&incoming.topic) {
                        continue;
                    }
                    if cache.take(&incoming.topic, &incoming.payload, now) {
                        debug!(topic = %incoming.topic, "skipping own republication");
                        continue;
                    }
                    if !should_fire(trolliness, &mut rng) {
                        continue;
                    }

                    let class = classify(&incoming.payload);
                    let mutation = mutate(&class, &mut rng);
                    mqtt.publish(&incoming.topic, mutation.payload.clone(), mutation.retain)
                        .await?;
                    cache.insert(&incoming.topic, &mutation.payload, now);
                }
            }
        }
    }
    .instrument(span)
    .await
}

/// Higher `trolliness` means a lower per-message firing probability.
fn should_fire(trolliness: u32, rng: &mut impl Rng) -> bool {
    rng.random_range(0..trolliness.max(1)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::IncomingMessage;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};

    struct RecordingMqtt {
        inbound_rx: Mutex<Option<mpsc::Receiver<IncomingMessage>>>,
        published: Arc<Mutex<Vec<IncomingMessage>>>,
    }

    #[async_trait]
    impl MqttPort for RecordingMqtt {
        async fn publish(&self, topic: &str, payload: Vec<u8>, _retain: bool) -> Result<(), MqttError> {
            self.published.lock().await.push(IncomingMessage {
                topic: topic.to_string(),
                payload,
            });
            Ok(())
        }

        async fn subscribe(&self, _topic_filter: &str) -> Result<(), MqttError> {
            Ok(())
        }

        fn messages(&self) -> mpsc::Receiver<IncomingMessage> {
            self.inbound_rx
                .try_lock()
                .expect("messages() not called concurrently")
                .take()
                .expect("messages() called once per adapter")
        }
    }

    #[tokio::test]
    async fn always_fires_republishes_exactly_one_mutation_per_message() {
        let (tx, rx) = mpsc::channel(8);
        let published = Arc::new(Mutex::new(Vec::new()));
        let mqtt = RecordingMqtt {
            inbound_rx: Mutex::new(Some(rx)),
            published: published.clone(),
        };
        tx.try_send(IncomingMessage {
            topic: "HardenMqtt/Unsecured/Unstructured/sensor-1/Temperature".into(),
            payload: b"100".to_vec(),
        })
        .unwrap();
        drop(tx);

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        run(&mqtt, 1, cancel_rx).await.unwrap();

        let seen = published.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].topic, "HardenMqtt/Unsecured/Unstructured/sensor-1/Temperature");
    }

    #[tokio::test]
    async fn events_topic_is_never_perturbed() {
        let (tx, rx) = mpsc::channel(8);
        let published = Arc::new(Mutex::new(Vec::new()));
        let mqtt = RecordingMqtt {
            inbound_rx: Mutex::new(Some(rx)),
            published: published.clone(),
        };
        tx.try_send(IncomingMessage {
            topic: topics::EVENTS.to_string(),
            payload: b"some event text".to_vec(),
        })
        .unwrap();
        drop(tx);

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        run(&mqtt, 1, cancel_rx).await.unwrap();

        assert!(published.lock().await.is_empty());
    }

    #[tokio::test]
    async fn never_fires_when_trolliness_never_rolls_zero() {
        // trolliness 1 always fires (0..1 is always 0); this instead checks
        // that a cancel before any message arrives yields no publication.
        let (tx, rx) = mpsc::channel(8);
        let published = Arc::new(Mutex::new(Vec::new()));
        let mqtt = RecordingMqtt {
            inbound_rx: Mutex::new(Some(rx)),
            published: published.clone(),
        };
        drop(tx);

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        run(&mqtt, 50, cancel_rx).await.unwrap();

        assert!(published.lock().await.is_empty());
    }
}
