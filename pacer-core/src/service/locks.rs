//! Striped in-process locks serializing the read-modify-write cycle
//! per participant. The store-level CAS still guards against writers in
//! other processes; the stripe only keeps one process from burning its
//! own CAS retries.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

pub struct StripedLocks {
    stripes: Vec<Mutex<()>>,
}

impl StripedLocks {
    pub fn new(stripe_count: usize) -> Self {
        Self {
            stripes: (0..stripe_count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub async fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[index].lock().await
    }
}
