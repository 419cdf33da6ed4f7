/// Dynamic script loading with load-state tracking
///
/// A [`ScriptLoader`] makes sure an external script is present in a page exactly
/// once and exposes a [`Readiness`] signal that flips to ready when the script has
/// finished loading, or immediately when the page already carries it. The page
/// itself is abstracted behind the [`Page`] trait so hosts can supply the real
/// DOM, a headless HTTP-backed page, or the in-memory registry used in tests.
pub mod events;
pub mod loader;
pub mod notifier;
pub mod page;
pub mod script;
pub mod state;

// Re-export commonly used types
pub use events::LoaderEvent;
pub use loader::{LoaderError, ScriptLoader};
pub use notifier::LoadNotifier;
pub use page::{MemoryPage, Page, PageError};
pub use script::{ScriptElement, ScriptHandle, ScriptSrc};
pub use state::{LoadOutcome, LoadState, Readiness, ResourceLoadFailure};

#[cfg(feature = "http")]
pub use page::HttpPage;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use page::DomPage;
