use std::rc::Rc;
use std::sync::Arc;

use crate::notifier::LoadNotifier;
use crate::script::{ScriptElement, ScriptHandle, ScriptSrc};
use crate::state::LoadState;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod dom;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use dom::DomPage;
#[cfg(feature = "http")]
pub use http::HttpPage;
pub use memory::MemoryPage;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("page is unavailable: {0}")]
    Unavailable(String),
    #[error("page has no document body")]
    NoBody,
    #[error("failed to create script element: {0}")]
    CreateElement(String),
}

/// Page-level registry of script elements
///
/// This is shared state: whatever one loader injects is visible to every other
/// caller that queries the page by URL. Implementations decide how an injected
/// element is actually fetched and must resolve the given [`LoadNotifier`] from
/// their event loop when it settles, never from inside `inject_script`.
pub trait Page {
    /// Find an element whose `src` is exactly `src`
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle>;

    /// Add `element` to the page and start loading it
    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError>;

    /// Remove an element; returns false if it was not in the page
    fn remove_script(&self, handle: ScriptHandle) -> bool;

    fn contains(&self, handle: ScriptHandle) -> bool;

    /// How loading went for an element, as far as the page knows
    ///
    /// Elements the page did not inject itself (markup, other code) report
    /// `Ready`. `None` if the element is not in the page.
    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState>;
}

impl<T: Page + ?Sized> Page for &T {
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle> {
        (**self).find_script(src)
    }

    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError> {
        (**self).inject_script(element, notifier)
    }

    fn remove_script(&self, handle: ScriptHandle) -> bool {
        (**self).remove_script(handle)
    }

    fn contains(&self, handle: ScriptHandle) -> bool {
        (**self).contains(handle)
    }

    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState> {
        (**self).script_state(handle)
    }
}

impl<T: Page + ?Sized> Page for Arc<T> {
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle> {
        (**self).find_script(src)
    }

    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError> {
        (**self).inject_script(element, notifier)
    }

    fn remove_script(&self, handle: ScriptHandle) -> bool {
        (**self).remove_script(handle)
    }

    fn contains(&self, handle: ScriptHandle) -> bool {
        (**self).contains(handle)
    }

    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState> {
        (**self).script_state(handle)
    }
}

impl<T: Page + ?Sized> Page for Rc<T> {
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle> {
        (**self).find_script(src)
    }

    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError> {
        (**self).inject_script(element, notifier)
    }

    fn remove_script(&self, handle: ScriptHandle) -> bool {
        (**self).remove_script(handle)
    }

    fn contains(&self, handle: ScriptHandle) -> bool {
        (**self).contains(handle)
    }

    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState> {
        (**self).script_state(handle)
    }
}
