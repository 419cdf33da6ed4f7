use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use super::{MemoryPage, Page, PageError};
use crate::notifier::LoadNotifier;
use crate::script::{ScriptElement, ScriptHandle, ScriptSrc};
use crate::state::{LoadOutcome, LoadState, ResourceLoadFailure};

/// Headless page that loads scripts by fetching them over HTTP
///
/// Elements are tracked in a [`MemoryPage`]; each injection spawns a fetch on
/// the tokio runtime that resolves the element once the whole body has been
/// received. Nothing is executed.
pub struct HttpPage {
    registry: Arc<MemoryPage>,
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpPage {
    /// Must be called from within a tokio runtime
    pub fn new() -> Result<Self, PageError> {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Result<Self, PageError> {
        let runtime = Handle::try_current()
            .map_err(|e| PageError::Unavailable(format!("no tokio runtime: {}", e)))?;

        Ok(Self {
            registry: Arc::new(MemoryPage::new()),
            client,
            runtime,
        })
    }

    /// The underlying registry, e.g. to seed scripts that are already present
    pub fn registry(&self) -> &Arc<MemoryPage> {
        &self.registry
    }
}

impl Page for HttpPage {
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle> {
        self.registry.find_script(src)
    }

    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError> {
        let src = element.src.clone();
        let handle = self.registry.inject_script(element, notifier)?;

        let registry = Arc::clone(&self.registry);
        let client = self.client.clone();
        self.runtime.spawn(async move {
            let outcome = fetch_script(&client, &src).await;
            if !registry.complete(handle, outcome) {
                debug!(target: "page", "Fetched {} after its element was removed", src);
            }
        });

        Ok(handle)
    }

    fn remove_script(&self, handle: ScriptHandle) -> bool {
        self.registry.remove_script(handle)
    }

    fn contains(&self, handle: ScriptHandle) -> bool {
        self.registry.contains(handle)
    }

    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState> {
        self.registry.script_state(handle)
    }
}

async fn fetch_script(client: &reqwest::Client, src: &ScriptSrc) -> LoadOutcome {
    debug!(target: "page", "Fetching {}", src);

    let response = client
        .get(src.as_str())
        .send()
        .await
        .map_err(|e| ResourceLoadFailure::Network(e.to_string()))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ResourceLoadFailure::NotFound);
    }

    if !response.status().is_success() {
        return Err(ResourceLoadFailure::Status(response.status().as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ResourceLoadFailure::Network(e.to_string()))?;

    debug!(target: "page", "Fetched {} ({} bytes)", src, body.len());
    Ok(())
}
