//! `hardenmqtt` CLI (spec §5): wires the pairing handshake, the sensor and
//! display telemetry paths, and the troll mutator onto a concrete broker
//! connection. One binary, one role per process.

mod reading_source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hmq_core::dispatcher::{Dispatcher, Presented};
use hmq_core::identity::{DeviceIdentity, PeerBinding};
use hmq_core::pairing::{pair, PairingOutcome, PairingRole};
use hmq_core::ports::{KeystorePort, MqttPort, SettingsStorePort};
use hmq_core::reading::SensorReading;
use hmq_core::{canonical, settings_keys, telemetry, topics, troll};
use hmq_infra::{ConsolePrompt, FileKeystore, MqttConfig, RumqttcMqttPort, TomlSettingsStore};

use reading_source::{JitterReadingSource, ReadingSource};

const DEFAULT_BROKER_HOST: &str = "localhost";
const DEFAULT_BROKER_PORT: u16 = 1883;
const PAIRING_NONCE: &str = "HardenMqtt-demo";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Sensor,
    Display,
    Troll,
}

/// HardenMqtt pedagogical secure-telemetry demo: run a sensor, a display,
/// or the troll mutator against a shared broker.
#[derive(Parser, Debug)]
#[command(name = "hardenmqtt")]
struct Cli {
    #[arg(long, value_enum)]
    role: Role,

    #[arg(long)]
    device_id: String,

    #[arg(long)]
    broker_host: Option<String>,

    #[arg(long)]
    broker_port: Option<u16>,

    #[arg(long)]
    tls: bool,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Lower is trollier: a fired message is republished with probability
    /// 1/trolliness on each sighting. Only meaningful for `--role troll`.
    #[arg(long, default_value_t = 10)]
    trolliness: u32,

    #[arg(long)]
    config_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 2)]
    publish_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let device_type = match cli.role {
        Role::Sensor => "Sensor",
        Role::Display => "Display",
        Role::Troll => "Troll",
    };

    let device_dir = config_dir(&cli).join(&cli.device_id);
    let keystore = FileKeystore::new(device_dir.clone());
    let settings = TomlSettingsStore::new(device_dir.join("settings.toml"));

    let identity = keystore
        .load_or_create_identity(&cli.device_id, device_type)
        .await
        .context("loading device identity")?;
    info!(
        device_id = %identity.device_id,
        public_key = %identity.public_key_base64url(),
        "identity ready"
    );

    let broker_host = resolve_setting(&settings, settings_keys::MQTT_HOST, cli.broker_host.clone())
        .await?
        .unwrap_or_else(|| DEFAULT_BROKER_HOST.to_string());
    let broker_port = match resolve_setting(
        &settings,
        settings_keys::MQTT_PORT,
        cli.broker_port.map(|p| p.to_string()),
    )
    .await?
    {
        Some(raw) => raw.parse().context("Broker.Port is not a valid port")?,
        None => DEFAULT_BROKER_PORT,
    };

    let mqtt_config = MqttConfig {
        client_id: format!("hardenmqtt-{}", cli.device_id),
        host: broker_host,
        port: broker_port,
        tls: cli.tls,
        username: cli.username.clone(),
        password: cli.password.clone(),
    };
    let mqtt: Arc<dyn MqttPort> = Arc::new(RumqttcMqttPort::connect(mqtt_config));

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(shutdown_on_ctrl_c(cancel_tx));

    let peer = match cli.role {
        Role::Troll => None,
        _ => Some(
            ensure_paired(&keystore, mqtt.as_ref(), &identity, cli.role, cancel_rx.clone()).await?,
        ),
    };

    match cli.role {
        Role::Sensor => run_sensor(mqtt.as_ref(), &identity, peer.as_ref(), &cli, cancel_rx).await,
        Role::Display => run_display(mqtt.as_ref(), &identity, peer.as_ref(), cancel_rx).await,
        Role::Troll => troll::run(mqtt.as_ref(), cli.trolliness, cancel_rx)
            .await
            .context("troll engine"),
    }
}

fn config_dir(cli: &Cli) -> PathBuf {
    cli.config_dir
        .clone()
        .or_else(|| dirs::config_dir().map(|d| d.join("hardenmqtt")))
        .unwrap_or_else(|| PathBuf::from(".hardenmqtt"))
}

/// Ctrl+C is the only shutdown trigger this demo listens for; a failure to
/// install the handler is not fatal, it just means shutdown stays manual.
async fn shutdown_on_ctrl_c(cancel_tx: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
        let _ = cancel_tx.send(true);
    }
}

async fn resolve_setting(
    settings: &TomlSettingsStore,
    key: &str,
    cli_value: Option<String>,
) -> Result<Option<String>> {
    if let Some(value) = cli_value {
        settings
            .set(key, &value)
            .await
            .with_context(|| format!("persisting setting {key}"))?;
        return Ok(Some(value));
    }
    settings
        .get(key)
        .await
        .with_context(|| format!("reading setting {key}"))
}

/// Sensor proposes pairing as the master (it is the side typically powered
/// on first); the display waits as the slave and countersigns.
async fn ensure_paired(
    keystore: &FileKeystore,
    mqtt: &dyn MqttPort,
    identity: &DeviceIdentity,
    role: Role,
    cancel: watch::Receiver<bool>,
) -> Result<PeerBinding> {
    if let Some(binding) = keystore
        .load_peer_binding()
        .await
        .context("loading peer binding")?
    {
        info!(peer_device_id = %binding.peer_device_id, "already paired");
        return Ok(binding);
    }

    let (pairing_role, remote_type) = match role {
        Role::Sensor => (PairingRole::Master, "Display"),
        Role::Display => (PairingRole::Slave, "Sensor"),
        Role::Troll => unreachable!("troll role never pairs"),
    };

    info!(?pairing_role, remote_type, "starting pairing handshake");
    let prompt = ConsolePrompt;
    let outcome = pair(
        mqtt,
        &prompt,
        identity,
        remote_type,
        PAIRING_NONCE,
        pairing_role,
        cancel,
    )
    .await
    .context("pairing handshake")?;

    match outcome {
        PairingOutcome::Bound(binding) => {
            keystore
                .save_peer_binding(&binding)
                .await
                .context("persisting peer binding")?;
            info!(peer_device_id = %binding.peer_device_id, "pairing complete");
            Ok(binding)
        }
        PairingOutcome::Cancelled => Err(anyhow!("pairing cancelled before a peer was bound")),
    }
}

async fn run_sensor(
    mqtt: &dyn MqttPort,
    identity: &DeviceIdentity,
    peer: Option<&PeerBinding>,
    cli: &Cli,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let mut source = JitterReadingSource::new(cli.device_id.clone());
    let mut ticker = tokio::time::interval(Duration::from_secs(cli.publish_interval_secs.max(1)));

    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    info!("sensor loop shutting down");
                    return Ok(());
                }
            }
            _ = ticker.tick() => {
                let reading = source.next_reading();
                if let Err(err) = publish_all_representations(mqtt, identity, peer, &reading).await {
                    warn!(%err, "failed to publish reading");
                }
            }
        }
    }
}

/// Publishes one reading across all five representations (spec §4.3): the
/// two unsecured shapes always, the two secured shapes once paired.
async fn publish_all_representations(
    mqtt: &dyn MqttPort,
    identity: &DeviceIdentity,
    peer: Option<&PeerBinding>,
    reading: &SensorReading,
) -> Result<()> {
    for (field, value) in reading.unstructured_fields() {
        mqtt.publish(&topics::unstructured(&reading.id, field), value.into_bytes(), true)
            .await?;
    }

    let structured = serde_json::to_vec(reading).context("encoding structured reading")?;
    mqtt.publish(&topics::structured(&reading.id), structured, true)
        .await?;

    let fields = reading.interoperable_fields();
    let unsigned = canonical::interoperable::build_xml(&fields)
        .context("rendering interoperable reading")?;
    mqtt.publish(&topics::interoperable(&reading.id), unsigned, true)
        .await?;

    let signed_public = telemetry::build_signed_public(identity, &fields)
        .context("signing public reading")?;
    mqtt.publish(
        &topics::secured_public(&identity.public_key_base64url()),
        signed_public,
        true,
    )
    .await?;

    if let Some(peer) = peer {
        let confidential = telemetry::build_signed_confidential(identity, peer, &fields)
            .context("encrypting confidential reading")?;
        mqtt.publish(
            &topics::secured_confidential(&identity.public_key_base64url()),
            confidential,
            true,
        )
        .await?;
    }

    Ok(())
}

async fn run_display(
    mqtt: &dyn MqttPort,
    identity: &DeviceIdentity,
    peer: Option<&PeerBinding>,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    mqtt.subscribe(topics::WILDCARD_ALL).await?;
    let mut messages = mqtt.messages();
    let mut dispatcher = Dispatcher::new();

    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    info!("display loop shutting down");
                    return Ok(());
                }
            }
            incoming = messages.recv() => {
                let Some(incoming) = incoming else {
                    return Ok(());
                };
                if let Some(presented) = dispatcher.dispatch(identity, peer, &incoming) {
                    print_presented(&presented);
                }
            }
        }
    }
}

fn print_presented(presented: &Presented) {
    match presented {
        Presented::Unstructured { row, device_id, field, raw } => {
            println!("[{row:>3}] {device_id} unstructured {field} = {raw}");
        }
        Presented::Structured { row, device_id, reading } => {
            println!(
                "[{row:>3}] {device_id} structured {}",
                serde_json::to_string(reading).unwrap_or_else(|_| "<unserializable>".into())
            );
        }
        Presented::Interoperable { row, device_id, fields } => {
            println!("[{row:>3}] {device_id} interoperable {} field(s)", fields.len());
        }
        Presented::SecuredPublic { row, fields } => {
            println!("[{row:>3}] secured/public {} field(s) (verified)", fields.len());
        }
        Presented::SecuredConfidential { row, fields } => {
            println!(
                "[{row:>3}] secured/confidential {} field(s) (verified+decrypted)",
                fields.len()
            );
        }
    }
}
