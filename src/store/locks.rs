use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-package write locks.
///
/// Every read-modify-write of a stored document holds the lock for its name,
/// so a local mutation and a sync persisting the same package never lose
/// each other's update.
#[derive(Debug, Clone, Default)]
pub struct PackageLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl PackageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`. Released when the guard drops.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on can go.
            map.retain(|key, m| key == name || Arc::strong_count(m) > 1);
            map.entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
