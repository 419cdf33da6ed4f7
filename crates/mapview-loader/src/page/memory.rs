use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{Page, PageError};
use crate::notifier::LoadNotifier;
use crate::script::{ScriptElement, ScriptHandle, ScriptSrc};
use crate::state::{LoadOutcome, LoadState, ResourceLoadFailure};

#[derive(Debug)]
struct Entry {
    element: ScriptElement,
    state: LoadState,
    /// Present until the host reports how loading went
    pending: Option<LoadNotifier>,
}

#[derive(Debug, Default)]
struct Registry {
    next_handle: u64,
    scripts: BTreeMap<ScriptHandle, Entry>,
}

impl Registry {
    fn insert(&mut self, element: ScriptElement, pending: Option<LoadNotifier>) -> ScriptHandle {
        self.next_handle += 1;
        let handle = ScriptHandle::new(self.next_handle);
        let state = if pending.is_some() {
            LoadState::Loading
        } else {
            LoadState::Ready
        };
        self.scripts.insert(
            handle,
            Entry {
                element,
                state,
                pending,
            },
        );
        handle
    }

    /// Record `outcome` on every loading element for `src` and hand back their notifiers
    fn settle_src(&mut self, src: &str, outcome: &LoadOutcome) -> Vec<LoadNotifier> {
        self.scripts
            .values_mut()
            .filter(|entry| entry.element.src.as_str() == src && entry.state.is_pending())
            .filter_map(|entry| {
                entry.state = LoadState::from(outcome.clone());
                entry.pending.take()
            })
            .collect()
    }
}

/// In-memory page owned by the hosting application
///
/// Holds the script registry and the notifiers of elements still loading. The
/// host plays the part of the browser event loop by calling
/// [`MemoryPage::finish_loading`] or [`MemoryPage::fail_loading`].
#[derive(Debug, Default)]
pub struct MemoryPage {
    registry: Mutex<Registry>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an element as if it was part of the page markup, already loaded
    pub fn insert_existing(&self, src: ScriptSrc) -> ScriptHandle {
        let handle = self.registry().insert(ScriptElement::new(src), None);
        debug!(target: "page", "Inserted existing script {}", handle);
        handle
    }

    /// Resolve every pending element for `src` as loaded; returns how many
    pub fn finish_loading(&self, src: &str) -> usize {
        self.resolve_src(src, Ok(()))
    }

    /// Resolve every pending element for `src` as failed; returns how many
    pub fn fail_loading(&self, src: &str, failure: ResourceLoadFailure) -> usize {
        self.resolve_src(src, Err(failure))
    }

    fn resolve_src(&self, src: &str, outcome: LoadOutcome) -> usize {
        // Notifiers run outside the lock
        let pending = self.registry().settle_src(src, &outcome);
        let count = pending.len();
        for notifier in pending {
            notifier.complete(outcome.clone());
        }
        count
    }

    /// Resolve one element; false if it is gone or already resolved
    pub fn complete(&self, handle: ScriptHandle, outcome: LoadOutcome) -> bool {
        let pending = self
            .registry()
            .scripts
            .get_mut(&handle)
            .filter(|entry| entry.state.is_pending())
            .and_then(|entry| {
                entry.state = LoadState::from(outcome.clone());
                entry.pending.take()
            });

        match pending {
            Some(notifier) => {
                notifier.complete(outcome);
                true
            }
            None => {
                debug!(target: "page", "No pending load for script {}", handle);
                false
            }
        }
    }

    pub fn is_pending(&self, handle: ScriptHandle) -> bool {
        self.registry()
            .scripts
            .get(&handle)
            .is_some_and(|entry| entry.pending.is_some())
    }

    /// Number of elements in the page with exactly this `src`
    pub fn script_count(&self, src: &str) -> usize {
        self.registry()
            .scripts
            .values()
            .filter(|entry| entry.element.src.as_str() == src)
            .count()
    }

    pub fn element(&self, handle: ScriptHandle) -> Option<ScriptElement> {
        self.registry()
            .scripts
            .get(&handle)
            .map(|entry| entry.element.clone())
    }

    pub fn elements(&self) -> Vec<ScriptElement> {
        self.registry()
            .scripts
            .values()
            .map(|entry| entry.element.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry().scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Page for MemoryPage {
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle> {
        self.registry()
            .scripts
            .iter()
            .find(|(_, entry)| &entry.element.src == src)
            .map(|(handle, _)| *handle)
    }

    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError> {
        let src = element.src.clone();
        let handle = self.registry().insert(element, Some(notifier));
        debug!(target: "page", "Appended script {} ({})", src, handle);
        Ok(handle)
    }

    fn remove_script(&self, handle: ScriptHandle) -> bool {
        match self.registry().scripts.remove(&handle) {
            Some(entry) => {
                if entry.pending.is_some() {
                    warn!(
                        target: "page",
                        "Removed script {} ({}) while it was still loading",
                        entry.element.src,
                        handle
                    );
                }
                true
            }
            None => false,
        }
    }

    fn contains(&self, handle: ScriptHandle) -> bool {
        self.registry().scripts.contains_key(&handle)
    }

    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState> {
        self.registry()
            .scripts
            .get(&handle)
            .map(|entry| entry.state.clone())
    }
}
