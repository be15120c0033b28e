use anyhow::Result;
use tracing::debug;

use crate::providers::ServiceKind;
use crate::state::{ApiKeys, AppState};
use crate::storage::KeyStorage;

/// The single state container of a session. Only the API keys reach the
/// backing storage; everything else lives for the session.
#[derive(Debug)]
pub struct Store<S: KeyStorage> {
    state: AppState,
    storage: S,
}

impl<S: KeyStorage> Store<S> {
    /// Fresh defaults with the API keys rehydrated from storage.
    pub fn open(storage: S) -> Result<Self> {
        let mut keys = ApiKeys::default();
        for service in ServiceKind::ALL {
            if let Some(key) = storage.get(service.storage_key())? {
                keys.set(service, key);
            }
        }
        Ok(Self {
            state: AppState::default().with_api_keys(keys),
            storage,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn replace(&mut self, next: AppState) {
        self.state = next;
    }

    pub fn update(&mut self, transform: impl FnOnce(&AppState) -> AppState) -> &AppState {
        self.state = transform(&self.state);
        &self.state
    }

    /// Persists both keys, then publishes them in the snapshot.
    pub fn save_api_keys(&mut self, keys: ApiKeys) -> Result<()> {
        for service in ServiceKind::ALL {
            self.storage.set(service.storage_key(), keys.get(service))?;
            debug!("stored {} key", service.as_str());
        }
        self.state = self.state.with_api_keys(keys);
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{GEMINI_KEY_NAME, MemoryKeyStorage, TOGETHER_KEY_NAME};

    #[test]
    fn open_rehydrates_only_keys() {
        let storage = MemoryKeyStorage::default()
            .with_value(GEMINI_KEY_NAME, "gemini-0123456789")
            .with_value(TOGETHER_KEY_NAME, "together-0123456789");
        let store = Store::open(storage).expect("open");
        assert_eq!(store.state().api_keys.gemini, "gemini-0123456789");
        assert_eq!(store.state().api_keys.together, "together-0123456789");
        assert_eq!(
            store.state().with_api_keys(ApiKeys::default()),
            AppState::default()
        );
    }

    #[test]
    fn save_persists_and_updates_snapshot() {
        let mut store = Store::open(MemoryKeyStorage::default()).expect("open");
        let keys = ApiKeys {
            gemini: "gemini-0123456789".to_string(),
            together: "together-0123456789".to_string(),
        };
        store.save_api_keys(keys.clone()).expect("save");
        assert_eq!(store.state().api_keys, keys);
        assert_eq!(
            store.storage().get(TOGETHER_KEY_NAME).expect("get").as_deref(),
            Some("together-0123456789")
        );
    }

    #[test]
    fn update_publishes_new_snapshot() {
        let mut store = Store::open(MemoryKeyStorage::default()).expect("open");
        let before = store.state().clone();
        let after = store.update(|state| state.with_topic("remote work")).clone();
        assert_eq!(after.topic, "remote work");
        assert_eq!(before.topic, "");
        assert_eq!(store.state().topic, "remote work");
    }
}
