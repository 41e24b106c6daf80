//! Last-known-good server address.
//!
//! No validation happens here; the orchestrator revalidates a cached
//! address with a probe before trusting it.

use std::sync::{Arc, Mutex};

use wakemate_protocol::SERVER_ADDRESS_KEY;

use crate::store::{JsonStore, StoreError};

/// Persists a single server address across restarts.
pub trait AddressCache: Send + Sync {
    /// Returns the cached address, or `None` if never set.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Stores an address, replacing any previous one.
    fn save(&self, address: &str) -> Result<(), StoreError>;

    /// Removes the cached address.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Address cache stored under `serverIp` in a [`JsonStore`].
pub struct StoredAddressCache {
    store: Arc<JsonStore>,
}

impl StoredAddressCache {
    pub fn new(store: Arc<JsonStore>) -> Self {
        Self { store }
    }
}

impl AddressCache for StoredAddressCache {
    fn load(&self) -> Result<Option<String>, StoreError> {
        self.store.get(SERVER_ADDRESS_KEY)
    }

    fn save(&self, address: &str) -> Result<(), StoreError> {
        self.store.set(SERVER_ADDRESS_KEY, address)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(SERVER_ADDRESS_KEY)
    }
}

/// In-process address cache.
#[derive(Debug, Default)]
pub struct MemoryAddressCache {
    value: Mutex<Option<String>>,
}

impl MemoryAddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache already holding an address.
    pub fn with_address(address: &str) -> Self {
        Self {
            value: Mutex::new(Some(address.to_string())),
        }
    }
}

impl AddressCache for MemoryAddressCache {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.value.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn save(&self, address: &str) -> Result<(), StoreError> {
        *self.value.lock().map_err(|_| StoreError::Poisoned)? = Some(address.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.value.lock().map_err(|_| StoreError::Poisoned)? = None;
        Ok(())
    }
}
