//! Drives the pairing handshake (spec §4.2) over a single MQTT topic:
//! periodic rebroadcast of the local view of the `PairingRecord`, candidate
//! collection on the master side, countersignature on the slave side, and
//! cooperative cancellation via a shared `watch<bool>`.

use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, Instrument};

use crate::canonical::pairing as canonical_pairing;
use crate::crypto::{ecdh, encoding, signing};
use crate::error::PairingError;
use crate::identity::{DeviceIdentity, PeerBinding};
use crate::pairing::record::{parse_strict, PairingRecord};
use crate::ports::{IncomingMessage, MqttPort, PairingPromptPort, SlaveCandidate};
use crate::topics;

const REPUBLISH_INTERVAL: Duration = Duration::from_secs(5);
const FIRST_TICK: Duration = Duration::from_secs(1);
const MAX_CANDIDATE_FIELD_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingRole {
    Master,
    Slave,
}

#[derive(Debug)]
pub enum PairingOutcome {
    Bound(PeerBinding),
    Cancelled,
}

struct Candidate {
    public_key: Vec<u8>,
    device_id: String,
}

/// `pair(cipher, local_id, local_type, remote_type, nonce, role, cancel)`
/// from spec §4.2, with `cipher` split into `identity` (signing/ECDH key
/// material) and the `mqtt`/`prompt` ports it drives.
pub async fn pair(
    mqtt: &dyn MqttPort,
    prompt: &dyn PairingPromptPort,
    identity: &DeviceIdentity,
    remote_type: &str,
    nonce: &str,
    role: PairingRole,
    mut cancel: watch::Receiver<bool>,
) -> Result<PairingOutcome, PairingError> {
    let span = info_span!("pairing.pair", role = ?role, device_id = %identity.device_id);
    async move {
        mqtt.subscribe(topics::PAIRING).await?;
        let mut messages = mqtt.messages();

        let mut record = seed_record(identity, nonce, role);
        publish(mqtt, &record).await?;

        let candidates: Mutex<Vec<Candidate>> = Mutex::new(Vec::new());
        let mut ticker = interval_at(Instant::now() + FIRST_TICK, REPUBLISH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("pairing cancelled");
                        return Ok(PairingOutcome::Cancelled);
                    }
                }
                _ = ticker.tick() => {
                    publish(mqtt, &record).await?;
                }
                incoming = messages.recv() => {
                    let Some(incoming) = incoming else {
                        return Ok(PairingOutcome::Cancelled);
                    };
                    if incoming.topic != topics::PAIRING {
                        continue;
                    }
                    if let Some(outcome) = handle_incoming(
                        mqtt, prompt, identity, remote_type, role, &mut record, &candidates, incoming,
                    )
                    .await?
                    {
                        return Ok(outcome);
                    }
                }
            }
        }
    }
    .instrument(span)
    .await
}

fn seed_record(identity: &DeviceIdentity, nonce: &str, role: PairingRole) -> PairingRecord {
    let mut record = PairingRecord {
        nonce: Some(nonce.to_string()),
        ..Default::default()
    };
    match role {
        PairingRole::Master => {
            record.master_public_key = Some(identity.public_key_base64url());
            record.master_id = Some(identity.device_id.clone());
            record.master_type = Some(identity.device_type.clone());
            sign_master(identity, &mut record);
        }
        PairingRole::Slave => {
            record.slave_public_key = Some(identity.public_key_base64url());
            record.slave_id = Some(identity.device_id.clone());
            record.slave_type = Some(identity.device_type.clone());
            sign_slave(identity, &mut record);
        }
    }
    record
}

fn sign_master(identity: &DeviceIdentity, record: &mut PairingRecord) {
    let bytes = canonical_pairing::signable_bytes(record);
    let signature = signing::sign(identity.signing_key(), &bytes);
    record.master_signature = Some(encoding::encode(&signature));
}

fn sign_slave(identity: &DeviceIdentity, record: &mut PairingRecord) {
    let bytes = canonical_pairing::signable_bytes(record);
    let signature = signing::sign(identity.signing_key(), &bytes);
    record.slave_signature = Some(encoding::encode(&signature));
}

async fn publish(mqtt: &dyn MqttPort, record: &PairingRecord) -> Result<(), PairingError> {
    let bytes = serde_json::to_vec(record).expect("PairingRecord always serializes");
    mqtt.publish(topics::PAIRING, bytes, false).await?;
    Ok(())
}

/// Verifies every signature present in `record` against its declared public
/// key, over the record's (signature-excluding) canonical bytes. A record
/// with no signatures at all trivially passes — absence is handled by the
/// role-specific acceptance rules, not here.
fn verify_record(record: &PairingRecord) -> bool {
    let bytes = canonical_pairing::signable_bytes(record);
    if let (Some(sig), Some(pk)) = (&record.master_signature, &record.master_public_key) {
        if !verify_one(pk, &bytes, sig) {
            return false;
        }
    }
    if let (Some(sig), Some(pk)) = (&record.slave_signature, &record.slave_public_key) {
        if !verify_one(pk, &bytes, sig) {
            return false;
        }
    }
    true
}

fn verify_one(pk_b64: &str, bytes: &[u8], sig_b64: &str) -> bool {
    let Ok(pk) = encoding::decode(pk_b64) else {
        return false;
    };
    let Ok(sig) = encoding::decode(sig_b64) else {
        return false;
    };
    signing::verify(&pk, bytes, &sig).is_ok()
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming(
    mqtt: &dyn MqttPort,
    prompt: &dyn PairingPromptPort,
    identity: &DeviceIdentity,
    remote_type: &str,
    role: PairingRole,
    record: &mut PairingRecord,
    candidates: &Mutex<Vec<Candidate>>,
    incoming: IncomingMessage,
) -> Result<Option<PairingOutcome>, PairingError> {
    let parsed = match parse_strict(&incoming.payload) {
        Ok(record) => record,
        Err(err) => {
            debug!(%err, "dropping malformed pairing record");
            return Ok(None);
        }
    };

    if !verify_record(&parsed) {
        debug!("dropping pairing record with an invalid signature");
        return Ok(None);
    }

    match role {
        PairingRole::Master => {
            handle_as_master(mqtt, prompt, identity, remote_type, record, candidates, parsed).await
        }
        PairingRole::Slave => handle_as_slave(mqtt, identity, remote_type, record, parsed).await,
    }
}

async fn handle_as_master(
    mqtt: &dyn MqttPort,
    prompt: &dyn PairingPromptPort,
    identity: &DeviceIdentity,
    remote_type: &str,
    record: &mut PairingRecord,
    candidates: &Mutex<Vec<Candidate>>,
    parsed: PairingRecord,
) -> Result<Option<PairingOutcome>, PairingError> {
    if record.slave_public_key.is_some() {
        // Already proposed to a slave; only watching for its countersignature now.
        let matches_selection = parsed.completed()
            && parsed.master_public_key.as_deref() == Some(identity.public_key_base64url().as_str())
            && parsed.slave_public_key == record.slave_public_key;
        if !matches_selection {
            return Ok(None);
        }
        let Ok(peer_pk) = encoding::decode(parsed.slave_public_key.as_deref().unwrap_or("")) else {
            return Ok(None);
        };
        return Ok(Some(PairingOutcome::Bound(PeerBinding {
            peer_public_key: peer_pk,
            peer_device_id: parsed.slave_id.unwrap_or_default(),
        })));
    }

    // Records that already carry a master belong to a different session.
    if parsed.master_public_key.is_some() {
        return Ok(None);
    }

    let (Some(slave_pk), Some(slave_id)) = (&parsed.slave_public_key, &parsed.slave_id) else {
        return Ok(None);
    };
    if slave_pk.is_empty()
        || slave_id.is_empty()
        || slave_pk.len() > MAX_CANDIDATE_FIELD_LEN
        || slave_id.len() > MAX_CANDIDATE_FIELD_LEN
    {
        return Ok(None);
    }
    if parsed.slave_type.as_deref() != Some(remote_type) {
        return Ok(None);
    }

    let Ok(decoded_pk) = encoding::decode(slave_pk) else {
        return Ok(None);
    };
    if ecdh::shared_secret(&identity.secret_bytes(), &decoded_pk).is_err() {
        return Ok(None);
    }

    let newly_seen = {
        let mut guard = candidates.lock().await;
        if guard.iter().any(|c| c.public_key == decoded_pk) {
            false
        } else {
            guard.push(Candidate {
                public_key: decoded_pk,
                device_id: slave_id.clone(),
            });
            true
        }
    };
    if !newly_seen {
        return Ok(None);
    }

    let snapshot: Vec<SlaveCandidate> = {
        let guard = candidates.lock().await;
        guard
            .iter()
            .map(|c| SlaveCandidate {
                public_key_base64url: encoding::encode(&c.public_key),
                device_id: c.device_id.clone(),
            })
            .collect()
    };

    let Some(selected_idx) = prompt.select_slave(&snapshot).await else {
        return Ok(None);
    };
    let Some(selected) = snapshot.get(selected_idx) else {
        return Ok(None);
    };

    record.slave_public_key = Some(selected.public_key_base64url.clone());
    record.slave_id = Some(selected.device_id.clone());
    record.slave_signature = None;
    sign_master(identity, record);
    publish(mqtt, record).await?;

    Ok(None)
}

async fn handle_as_slave(
    mqtt: &dyn MqttPort,
    identity: &DeviceIdentity,
    remote_type: &str,
    record: &mut PairingRecord,
    parsed: PairingRecord,
) -> Result<Option<PairingOutcome>, PairingError> {
    if record.master_public_key.is_some() {
        // Already countersigned; the timer keeps republishing the finished
        // record until the master observes it and terminates.
        return Ok(None);
    }

    if !parsed.master_completed() || parsed.slave_completed() {
        return Ok(None);
    }
    let my_key = identity.public_key_base64url();
    if parsed.slave_public_key.as_deref() != Some(my_key.as_str())
        || parsed.slave_id.as_deref() != Some(identity.device_id.as_str())
    {
        return Ok(None);
    }
    if parsed.master_type.as_deref() != Some(remote_type) {
        return Ok(None);
    }

    *record = parsed;
    sign_slave(identity, record);
    publish(mqtt, record).await?;

    let Ok(peer_pk) = encoding::decode(record.master_public_key.as_deref().unwrap_or("")) else {
        return Ok(None);
    };
    Ok(Some(PairingOutcome::Bound(PeerBinding {
        peer_public_key: peer_pk,
        peer_device_id: record.master_id.clone().unwrap_or_default(),
    })))
}
