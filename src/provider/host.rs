//! Container host: the page surface challenge widgets mount into.

use std::collections::HashMap;
use std::sync::Mutex;

/// Mount-point operations the lifecycle manager needs from the page.
///
/// Implementations must tolerate unknown container ids; `clear` on a missing
/// container is a no-op.
pub trait ContainerHost: Send + Sync {
    /// True if the container element exists.
    fn exists(&self, container_id: &str) -> bool;

    /// Create the container if missing and set its visibility.
    fn ensure(&self, container_id: &str, visible: bool);

    /// True if the container currently holds rendered widget content.
    fn has_widget(&self, container_id: &str) -> bool;

    /// Record that a widget render landed in the container.
    fn mark_rendered(&self, container_id: &str);

    /// Empty the container's contents and drop any provider-applied
    /// attributes. The container element itself survives.
    fn clear(&self, container_id: &str);
}

#[derive(Clone, Copy, Debug, Default)]
struct Mount {
    visible: bool,
    occupied: bool,
}

/// Process-local host keeping mount points in a map. Used by the server and
/// as the test double.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    mounts: Mutex<HashMap<String, Mount>>,
}

impl InMemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_mounts<T>(&self, f: impl FnOnce(&mut HashMap<String, Mount>) -> T) -> T {
        // Lock poisoning only happens if a holder panicked; the map is still
        // usable, so recover rather than propagate.
        let mut mounts = match self.mounts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut mounts)
    }
}

impl ContainerHost for InMemoryHost {
    fn exists(&self, container_id: &str) -> bool {
        self.with_mounts(|mounts| mounts.contains_key(container_id))
    }

    fn ensure(&self, container_id: &str, visible: bool) {
        self.with_mounts(|mounts| {
            let mount = mounts.entry(container_id.to_string()).or_default();
            mount.visible = visible;
        });
    }

    fn has_widget(&self, container_id: &str) -> bool {
        self.with_mounts(|mounts| {
            mounts
                .get(container_id)
                .is_some_and(|mount| mount.occupied)
        })
    }

    fn mark_rendered(&self, container_id: &str) {
        self.with_mounts(|mounts| {
            if let Some(mount) = mounts.get_mut(container_id) {
                mount.occupied = true;
            }
        });
    }

    fn clear(&self, container_id: &str) {
        self.with_mounts(|mounts| {
            if let Some(mount) = mounts.get_mut(container_id) {
                mount.occupied = false;
            }
        });
    }
}
