use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::events::LoaderEvent;
use crate::script::ScriptSrc;
use crate::state::{LoadOutcome, LoadState};

/// State shared between a loader and the notifier of its current invocation
pub(crate) struct Invocation {
    src: ScriptSrc,
    state: watch::Sender<LoadState>,
    events: Option<UnboundedSender<LoaderEvent>>,
}

impl Invocation {
    pub(crate) fn new(
        src: ScriptSrc,
        events: Option<UnboundedSender<LoaderEvent>>,
    ) -> (Arc<Self>, watch::Receiver<LoadState>) {
        let (state, rx) = watch::channel(LoadState::Loading);
        let invocation = Arc::new(Self { src, state, events });
        (invocation, rx)
    }

    pub(crate) fn src(&self) -> &ScriptSrc {
        &self.src
    }

    pub(crate) fn emit(&self, event: LoaderEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine
            let _ = events.send(event);
        }
    }

    /// Apply a load outcome; only the first one out of `Loading` counts
    pub(crate) fn settle(&self, outcome: LoadOutcome) -> bool {
        let next = LoadState::from(outcome);
        let settled = self.state.send_if_modified(|state| {
            if !state.is_pending() {
                return false;
            }
            *state = next.clone();
            true
        });

        if !settled {
            debug!(target: "loader", "Ignoring repeated completion for {}", self.src);
            return false;
        }

        match next {
            LoadState::Ready => {
                info!(target: "loader", "Script ready: {}", self.src);
                self.emit(LoaderEvent::Ready {
                    src: self.src.clone(),
                });
            }
            LoadState::Failed(failure) => {
                error!(target: "loader", "An error occurred while loading {}: {}", self.src, failure);
                self.emit(LoaderEvent::Failed {
                    src: self.src.clone(),
                    failure,
                });
            }
            LoadState::Loading => {}
        }

        true
    }
}

/// Single-shot completion channel handed to a [`Page`](crate::Page) on injection
///
/// The page calls [`LoadNotifier::complete`] once the element has loaded or
/// failed. `complete` takes the notifier by value, so an invocation can be
/// resolved at most once. The notifier only holds a weak reference: if the
/// loader moved on to another URL, removed the element, or was dropped, the
/// completion is discarded.
pub struct LoadNotifier {
    src: ScriptSrc,
    invocation: Weak<Invocation>,
}

impl LoadNotifier {
    pub(crate) fn new(invocation: &Arc<Invocation>) -> Self {
        Self {
            src: invocation.src().clone(),
            invocation: Arc::downgrade(invocation),
        }
    }

    pub fn src(&self) -> &ScriptSrc {
        &self.src
    }

    /// Whether anyone still observes the invocation this notifier resolves
    pub fn is_live(&self) -> bool {
        self.invocation.strong_count() > 0
    }

    pub fn complete(self, outcome: LoadOutcome) {
        let Some(invocation) = self.invocation.upgrade() else {
            debug!(
                target: "loader",
                "Discarding completion for {}: loader is gone",
                self.src
            );
            return;
        };

        invocation.settle(outcome);
    }
}

impl fmt::Debug for LoadNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadNotifier")
            .field("src", &self.src)
            .field("live", &self.is_live())
            .finish()
    }
}
