use mapview_loader::{LoadState, LoaderError, Page, Readiness, ScriptElement, ScriptLoader, ScriptSrc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::config::{ConfigError, MapViewConfig};
use crate::sdk::{MapOptions, MapSdk, SdkError, Store};
use crate::template::render_info_window;

#[derive(Debug, thiserror::Error)]
pub enum MapViewError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error("map is not initialized")]
    NotInitialized,
}

/// Store locator map: loads the SDK script, then builds the map once it is ready
///
/// The host drives the view by calling [`MapView::update`] from its event loop.
/// Until the SDK script is ready `update` does nothing; the first update after
/// that creates the map, attaches the stores overlay and starts listening for
/// store clicks. Clicked stores open an info window on a later update.
pub struct MapView<P: Page, S: MapSdk> {
    config: MapViewConfig,
    sdk_url: String,
    loader: ScriptLoader<P>,
    readiness: Option<Readiness>,
    map: Option<S::Map>,
    /// Failed `create_map` attempts since the SDK became ready
    init_failures: u32,
    clicks_tx: UnboundedSender<Store>,
    clicks_rx: UnboundedReceiver<Store>,
    selected: Option<Store>,
}

impl<P: Page, S: MapSdk> MapView<P, S> {
    /// Fails if no API key is configured
    pub fn new(config: MapViewConfig, loader: ScriptLoader<P>) -> Result<Self, MapViewError> {
        let sdk_url = config.sdk_script_url()?;
        let (clicks_tx, clicks_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            sdk_url,
            loader,
            readiness: None,
            map: None,
            init_failures: 0,
            clicks_tx,
            clicks_rx,
            selected: None,
        })
    }

    pub fn config(&self) -> &MapViewConfig {
        &self.config
    }

    pub fn sdk_url(&self) -> &str {
        &self.sdk_url
    }

    /// Start loading the SDK script
    pub fn mount(&mut self) -> Result<Readiness, MapViewError> {
        let element = ScriptElement::new(ScriptSrc::new(self.sdk_url.as_str())?).with_defer(true);
        let readiness = self.loader.load_element(element)?;
        self.readiness = Some(readiness.clone());
        Ok(readiness)
    }

    pub fn sdk_state(&self) -> Option<LoadState> {
        self.readiness.as_ref().map(Readiness::state)
    }

    pub fn is_sdk_loaded(&self) -> bool {
        self.readiness.as_ref().is_some_and(Readiness::is_ready)
    }

    pub fn map(&self) -> Option<&S::Map> {
        self.map.as_ref()
    }

    pub fn selected_store(&self) -> Option<&Store> {
        self.selected.as_ref()
    }

    /// Initialize the map once the SDK is ready and handle pending store clicks
    ///
    /// Returns whether the map exists.
    pub fn update(&mut self, sdk: &mut S) -> bool {
        if self.map.is_none() && self.is_sdk_loaded() {
            self.initialize(sdk);
        }

        while let Ok(store) = self.clicks_rx.try_recv() {
            if let Err(e) = self.select_store(sdk, store) {
                error!(target: "mapview", "Failed to open info window: {}", e);
            }
        }

        self.map.is_some()
    }

    fn initialize(&mut self, sdk: &mut S) {
        info!(target: "mapview", "Initializing map...");

        let options = MapOptions {
            center: self.config.center,
            zoom: self.config.zoom,
        };

        let map = match sdk.create_map(&self.config.container_id, &options) {
            Ok(map) => map,
            Err(e) => {
                // Retried on every update; only the first failure is an error
                if self.init_failures == 0 {
                    error!(target: "mapview", "Error initializing map: {}", e);
                } else {
                    debug!(target: "mapview", "Map initialization failed again: {}", e);
                }
                self.init_failures += 1;
                return;
            }
        };
        info!(target: "mapview", "Map initialized successfully");
        self.init_failures = 0;

        // Overlay and listener failures leave a usable, if bare, map
        if let Err(e) = sdk.add_stores_overlay(&map, &self.config.stores) {
            error!(target: "mapview", "Error adding stores overlay: {}", e);
        }

        let clicks = self.clicks_tx.clone();
        let listener = sdk.on_store_click(
            &map,
            Box::new(move |store| {
                let _ = clicks.send(store);
            }),
        );
        if let Err(e) = listener {
            error!(target: "mapview", "Error registering store click listener: {}", e);
        }

        self.map = Some(map);
    }

    /// Open the info window for `store`
    pub fn select_store(&mut self, sdk: &mut S, store: Store) -> Result<(), MapViewError> {
        let map = self.map.as_ref().ok_or(MapViewError::NotInitialized)?;

        let content = render_info_window(&self.config.info_window.template, &store);
        sdk.open_info_window(map, &store, &content)?;
        debug!(target: "mapview", "Selected store {} ({})", store.name, store.id);

        self.selected = Some(store);
        Ok(())
    }

    /// Tear the view down, removing the SDK script if this view injected it
    pub fn unmount(&mut self) -> bool {
        self.map = None;
        self.init_failures = 0;
        self.selected = None;
        self.readiness = None;
        while self.clicks_rx.try_recv().is_ok() {}

        self.loader.remove()
    }
}
