use std::collections::BTreeMap;

use crate::config::{LatLng, StoresStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: f64,
}

/// A store as reported by the stores overlay when it is clicked
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub location: LatLng,
    /// Remaining string properties, flattened
    pub properties: BTreeMap<String, String>,
}

pub type StoreClickHandler = Box<dyn FnMut(Store) + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("SDK symbol is not defined: {0}")]
    Missing(String),
    #[error("map container not found: #{0}")]
    ContainerNotFound(String),
    #[error("SDK call failed: {0}")]
    Call(String),
}

/// The external mapping SDK, once its script has loaded
///
/// Only the handful of calls the map view needs. Implementations must not be
/// used before the loader reports the SDK script as ready.
pub trait MapSdk {
    /// SDK map instance
    type Map;

    fn create_map(&mut self, container_id: &str, options: &MapOptions)
        -> Result<Self::Map, SdkError>;

    /// Attach a stores overlay drawn with `style` to `map`
    fn add_stores_overlay(&mut self, map: &Self::Map, style: &StoresStyle) -> Result<(), SdkError>;

    /// Call `handler` whenever a store of the overlay is selected
    fn on_store_click(&mut self, map: &Self::Map, handler: StoreClickHandler)
        -> Result<(), SdkError>;

    fn open_info_window(
        &mut self,
        map: &Self::Map,
        store: &Store,
        content: &str,
    ) -> Result<(), SdkError>;
}
