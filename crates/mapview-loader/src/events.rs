use crate::script::{ScriptHandle, ScriptSrc};
use crate::state::ResourceLoadFailure;

/// Lifecycle notifications emitted by a [`ScriptLoader`](crate::ScriptLoader)
///
/// Sent on the optional channel given to `ScriptLoader::with_events`. Every
/// invocation emits exactly one of `Injected` or `Reused`, followed by at most
/// one of `Ready` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// A new element was added to the page
    Injected {
        src: ScriptSrc,
        handle: ScriptHandle,
    },
    /// The page already carried an element for this URL
    Reused {
        src: ScriptSrc,
        handle: ScriptHandle,
    },
    Ready {
        src: ScriptSrc,
    },
    Failed {
        src: ScriptSrc,
        failure: ResourceLoadFailure,
    },
    /// The loader removed the element it injected
    Removed {
        src: ScriptSrc,
        handle: ScriptHandle,
    },
}

impl LoaderEvent {
    pub fn src(&self) -> &ScriptSrc {
        match self {
            LoaderEvent::Injected { src, .. }
            | LoaderEvent::Reused { src, .. }
            | LoaderEvent::Ready { src }
            | LoaderEvent::Failed { src, .. }
            | LoaderEvent::Removed { src, .. } => src,
        }
    }
}
