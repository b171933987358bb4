//! Process-wide registry of live waveform instances
//!
//! Instances register on construction and unregister on destroy (or drop).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Identifier of one waveform instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static LIVE: OnceLock<Mutex<BTreeSet<InstanceId>>> = OnceLock::new();

fn live() -> MutexGuard<'static, BTreeSet<InstanceId>> {
    let set = LIVE.get_or_init(|| Mutex::new(BTreeSet::new()));
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Allocate an id and mark it live
pub fn register() -> InstanceId {
    let id = InstanceId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    live().insert(id);
    log::debug!("Registered waveform instance {}", id.0);
    id
}

/// Remove `id`; returns false if it was not registered
pub fn unregister(id: InstanceId) -> bool {
    let removed = live().remove(&id);
    if removed {
        log::debug!("Unregistered waveform instance {}", id.0);
    }
    removed
}

pub fn is_live(id: InstanceId) -> bool {
    live().contains(&id)
}

/// Ids of every instance not yet destroyed, oldest first
pub fn live_instances() -> Vec<InstanceId> {
    live().iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let id = register();
        assert!(is_live(id));
        assert!(live_instances().contains(&id));

        assert!(unregister(id));
        assert!(!unregister(id));
        assert!(!is_live(id));
    }
}
