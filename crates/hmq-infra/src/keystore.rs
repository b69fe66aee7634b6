//! File-backed `KeystorePort` (spec §3): a JSON identity record and, once
//! paired, a JSON peer-binding record, both under the OS config directory,
//! written atomically (tmp file + rename) as in the teacher's settings repo.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use hmq_core::crypto::encoding;
use hmq_core::error::KeystoreError;
use hmq_core::identity::{DeviceIdentity, PeerBinding};
use hmq_core::ports::KeystorePort;

#[derive(Serialize, Deserialize)]
struct IdentityRecord {
    secret_base64url: String,
    device_id: String,
    device_type: String,
}

pub struct FileKeystore {
    dir: PathBuf,
}

impl FileKeystore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn identity_path(&self) -> PathBuf {
        self.dir.join("identity.json")
    }

    fn peer_path(&self) -> PathBuf {
        self.dir.join("peer.json")
    }

    async fn ensure_dir(&self) -> Result<(), KeystoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| KeystoreError::StoreUnavailable(e.to_string()))
    }

    async fn atomic_write(&self, path: &PathBuf, content: &str) -> Result<(), KeystoreError> {
        self.ensure_dir().await?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| KeystoreError::StoreUnavailable(e.to_string()))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| KeystoreError::StoreUnavailable(e.to_string()))
    }
}

#[async_trait]
impl KeystorePort for FileKeystore {
    async fn load_or_create_identity(
        &self,
        device_id: &str,
        device_type: &str,
    ) -> Result<DeviceIdentity, KeystoreError> {
        let path = self.identity_path();
        match fs::read_to_string(&path).await {
            Ok(content) => {
                let record: IdentityRecord = serde_json::from_str(&content)
                    .map_err(|e| KeystoreError::Corrupted(e.to_string()))?;
                let secret = encoding::decode(&record.secret_base64url)
                    .map_err(|e| KeystoreError::Corrupted(e.to_string()))?;
                let secret: [u8; 32] = secret
                    .try_into()
                    .map_err(|_| KeystoreError::Corrupted("secret key is not 32 bytes".into()))?;
                Ok(DeviceIdentity::from_secret_bytes(
                    secret,
                    record.device_id,
                    record.device_type,
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let identity = DeviceIdentity::generate(device_id, device_type);
                let record = IdentityRecord {
                    secret_base64url: encoding::encode(&identity.secret_bytes()),
                    device_id: identity.device_id.clone(),
                    device_type: identity.device_type.clone(),
                };
                let content = serde_json::to_string_pretty(&record)
                    .expect("IdentityRecord always serializes");
                self.atomic_write(&path, &content).await?;
                Ok(identity)
            }
            Err(e) => Err(KeystoreError::StoreUnavailable(e.to_string())),
        }
    }

    async fn load_peer_binding(&self) -> Result<Option<PeerBinding>, KeystoreError> {
        match fs::read_to_string(self.peer_path()).await {
            Ok(content) => {
                let binding: PeerBinding = serde_json::from_str(&content)
                    .map_err(|e| KeystoreError::Corrupted(e.to_string()))?;
                Ok(Some(binding))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KeystoreError::StoreUnavailable(e.to_string())),
        }
    }

    async fn save_peer_binding(&self, binding: &PeerBinding) -> Result<(), KeystoreError> {
        let content =
            serde_json::to_string_pretty(binding).expect("PeerBinding always serializes");
        self.atomic_write(&self.peer_path(), &content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_or_create_persists_the_same_identity_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = FileKeystore::new(dir.path());

        let first = keystore
            .load_or_create_identity("sensor-1", "Sensor")
            .await
            .unwrap();
        let second = keystore
            .load_or_create_identity("sensor-1", "Sensor")
            .await
            .unwrap();

        assert_eq!(first.public_key_bytes(), second.public_key_bytes());
    }

    #[tokio::test]
    async fn peer_binding_round_trips_and_starts_absent() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = FileKeystore::new(dir.path());

        assert!(keystore.load_peer_binding().await.unwrap().is_none());

        let binding = PeerBinding {
            peer_public_key: vec![1, 2, 3, 4],
            peer_device_id: "display-1".into(),
        };
        keystore.save_peer_binding(&binding).await.unwrap();

        let loaded = keystore.load_peer_binding().await.unwrap().unwrap();
        assert_eq!(loaded, binding);
    }
}
