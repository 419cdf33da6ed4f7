use tokio::sync::watch;

use crate::script::ScriptSrc;

/// Why an injected script never became ready
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceLoadFailure {
    #[error("resource not found")]
    NotFound,
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("script error: {0}")]
    Script(String),
}

/// Result a page reports once an injected script settles
pub type LoadOutcome = Result<(), ResourceLoadFailure>;

/// Load state of one loader invocation
///
/// Transitions are forward-only: `Loading` moves to either `Ready` or `Failed`
/// at most once and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(ResourceLoadFailure),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

impl From<LoadOutcome> for LoadState {
    fn from(outcome: LoadOutcome) -> Self {
        match outcome {
            Ok(()) => LoadState::Ready,
            Err(failure) => LoadState::Failed(failure),
        }
    }
}

/// Observer of a single loader invocation
///
/// Cheap to clone; every clone sees the same state. The readiness flag
/// ([`Readiness::is_ready`]) starts false and becomes true at most once.
#[derive(Debug, Clone)]
pub struct Readiness {
    src: ScriptSrc,
    rx: watch::Receiver<LoadState>,
}

impl Readiness {
    pub(crate) fn new(src: ScriptSrc, rx: watch::Receiver<LoadState>) -> Self {
        Self { src, rx }
    }

    pub fn src(&self) -> &ScriptSrc {
        &self.src
    }

    /// Whether the script has loaded and its symbols may be used
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_ready()
    }

    pub fn state(&self) -> LoadState {
        self.rx.borrow().clone()
    }

    /// Wait until the invocation leaves `Loading`
    ///
    /// If the loader drops the invocation first, the last observed state is
    /// returned, which is still `Loading`.
    pub async fn settled(&self) -> LoadState {
        let mut rx = self.rx.clone();
        let settled = rx
            .wait_for(|state| !state.is_pending())
            .await
            .map(|state| (*state).clone());
        settled.unwrap_or_else(|_| rx.borrow().clone())
    }

    /// Wait for the invocation to settle and report whether it became ready
    pub async fn wait_ready(&self) -> bool {
        self.settled().await.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> ScriptSrc {
        ScriptSrc::new("https://example.com/sdk.js").unwrap()
    }

    #[test]
    fn test_outcome_conversion() {
        assert_eq!(LoadState::from(Ok(())), LoadState::Ready);
        assert_eq!(
            LoadState::from(Err(ResourceLoadFailure::NotFound)),
            LoadState::Failed(ResourceLoadFailure::NotFound)
        );
    }

    #[tokio::test]
    async fn test_settled_returns_final_state() {
        let (tx, rx) = watch::channel(LoadState::Loading);
        let readiness = Readiness::new(src(), rx);
        assert!(!readiness.is_ready());

        tx.send_replace(LoadState::Ready);
        assert_eq!(readiness.settled().await, LoadState::Ready);
        assert!(readiness.wait_ready().await);
    }

    #[tokio::test]
    async fn test_settled_when_sender_dropped() {
        let (tx, rx) = watch::channel(LoadState::Loading);
        let readiness = Readiness::new(src(), rx);
        drop(tx);

        assert_eq!(readiness.settled().await, LoadState::Loading);
        assert!(!readiness.wait_ready().await);
    }
}
