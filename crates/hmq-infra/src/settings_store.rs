//! TOML-backed `SettingsStorePort` (spec §6): a flat string key/value file
//! under the OS config directory, written atomically as in the teacher's
//! settings file repository.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use hmq_core::error::SettingsError;
use hmq_core::ports::SettingsStorePort;

pub struct TomlSettingsStore {
    path: PathBuf,
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>, SettingsError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(SettingsError::Io(e.to_string())),
        }
    }

    async fn persist(&self, settings: &HashMap<String, String>) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| SettingsError::Io(e.to_string()))?;
        }
        let content = toml::to_string_pretty(settings).map_err(|e| SettingsError::Parse(e.to_string()))?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| SettingsError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SettingsError::Io(e.to_string()))
    }
}

#[async_trait]
impl SettingsStorePort for TomlSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let settings = guard.as_mut().unwrap();
        settings.insert(key.to_string(), value.to_string());
        self.persist(settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.get("Device.ID").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let store = TomlSettingsStore::new(path.clone());
        store.set("Device.ID", "sensor-1").await.unwrap();

        assert_eq!(
            store.get("Device.ID").await.unwrap(),
            Some("sensor-1".to_string())
        );

        let reloaded = TomlSettingsStore::new(path.clone());
        assert_eq!(
            reloaded.get("Device.ID").await.unwrap(),
            Some("sensor-1".to_string())
        );
    }
}
