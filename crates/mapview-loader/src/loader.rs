use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::events::LoaderEvent;
use crate::notifier::{Invocation, LoadNotifier};
use crate::page::{Page, PageError};
use crate::script::{ScriptElement, ScriptHandle, ScriptSrc};
use crate::state::{LoadState, Readiness};

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("script source URL is empty")]
    EmptySrc,
    #[error("page refused to inject {src}: {source}")]
    Page {
        src: ScriptSrc,
        #[source]
        source: PageError,
    },
}

/// The invocation a loader is currently tracking
struct Current {
    invocation: Arc<Invocation>,
    readiness: Readiness,
    handle: ScriptHandle,
    /// False when the element was already in the page
    injected: bool,
}

/// Injects an external script into a page at most once and tracks its readiness
///
/// Each call to [`ScriptLoader::load`] with a new URL starts a fresh invocation:
/// the page is checked for an element with that exact `src`, one is injected if
/// missing, and a [`Readiness`] is returned for the new target. Calling `load`
/// again with the same URL hands back the current readiness without touching
/// the page. Completions for earlier URLs are dropped.
pub struct ScriptLoader<P: Page> {
    page: P,
    events: Option<UnboundedSender<LoaderEvent>>,
    current: Option<Current>,
}

impl<P: Page> ScriptLoader<P> {
    pub fn new(page: P) -> Self {
        Self {
            page,
            events: None,
            current: None,
        }
    }

    /// Create a loader that also reports lifecycle events on `events`
    pub fn with_events(page: P, events: UnboundedSender<LoaderEvent>) -> Self {
        Self {
            page,
            events: Some(events),
            current: None,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Ensure `src` is present in the page and return its readiness
    pub fn load(&mut self, src: &str) -> Result<Readiness, LoaderError> {
        let src = ScriptSrc::new(src)?;
        self.load_element(ScriptElement::new(src))
    }

    /// Like [`ScriptLoader::load`], injecting `element` as given when it is missing
    ///
    /// The element attributes only matter on injection; an element already in the
    /// page is reused whatever its attributes.
    pub fn load_element(&mut self, element: ScriptElement) -> Result<Readiness, LoaderError> {
        let src = element.src.clone();

        if let Some(current) = &self.current {
            if current.invocation.src() == &src {
                return Ok(current.readiness.clone());
            }
        }

        // Drop the previous invocation so its pending completion becomes a no-op
        if let Some(previous) = self.current.take() {
            debug!(target: "loader", "Switching from {} to {}", previous.invocation.src(), src);
        }

        let (invocation, rx) = Invocation::new(src.clone(), self.events.clone());
        let readiness = Readiness::new(src.clone(), rx);

        let current = match self.page.find_script(&src) {
            Some(handle) => {
                info!(target: "loader", "Script already present in page: {} ({})", src, handle);
                invocation.emit(LoaderEvent::Reused {
                    src: src.clone(),
                    handle,
                });

                // An element that is still loading counts as present
                match self.page.script_state(handle) {
                    Some(LoadState::Failed(failure)) => invocation.settle(Err(failure)),
                    _ => invocation.settle(Ok(())),
                };

                Current {
                    invocation,
                    readiness: readiness.clone(),
                    handle,
                    injected: false,
                }
            }
            None => {
                let notifier = LoadNotifier::new(&invocation);
                let handle = self
                    .page
                    .inject_script(element, notifier)
                    .map_err(|source| LoaderError::Page {
                        src: src.clone(),
                        source,
                    })?;

                info!(target: "loader", "Injected script: {} ({})", src, handle);
                invocation.emit(LoaderEvent::Injected {
                    src: src.clone(),
                    handle,
                });

                Current {
                    invocation,
                    readiness: readiness.clone(),
                    handle,
                    injected: true,
                }
            }
        };

        self.current = Some(current);
        Ok(readiness)
    }

    /// Readiness of the current invocation, if any
    pub fn readiness(&self) -> Option<Readiness> {
        self.current.as_ref().map(|c| c.readiness.clone())
    }

    pub fn current_src(&self) -> Option<&ScriptSrc> {
        self.current.as_ref().map(|c| c.invocation.src())
    }

    pub fn handle(&self) -> Option<ScriptHandle> {
        self.current.as_ref().map(|c| c.handle)
    }

    /// Remove the element this loader injected and stop tracking it
    ///
    /// Elements that were already in the page are left alone. Returns true if an
    /// element was removed. A later `load` of the same URL injects a new element.
    pub fn remove(&mut self) -> bool {
        let Some(current) = self.current.take() else {
            return false;
        };

        if !current.injected {
            debug!(
                target: "loader",
                "Not removing {}: element was not injected by this loader",
                current.invocation.src()
            );
            return false;
        }

        if !self.page.contains(current.handle) {
            warn!(
                target: "loader",
                "Script {} ({}) was already removed from the page",
                current.invocation.src(),
                current.handle
            );
            return false;
        }

        let removed = self.page.remove_script(current.handle);
        if removed {
            info!(target: "loader", "Removed script: {} ({})", current.invocation.src(), current.handle);
            current.invocation.emit(LoaderEvent::Removed {
                src: current.invocation.src().clone(),
                handle: current.handle,
            });
        }
        removed
    }
}
