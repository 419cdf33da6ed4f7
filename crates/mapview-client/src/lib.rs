/// Store locator map view
///
/// Configuration, the narrow interface to the external mapping SDK, and the
/// [`MapView`] that ties the SDK script loader to map initialization.
pub mod config;
pub mod sdk;
pub mod template;
pub mod view;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod woosmap;

pub use config::{ConfigError, LatLng, MapViewConfig, StoresStyle};
pub use sdk::{MapOptions, MapSdk, SdkError, Store, StoreClickHandler};
pub use view::{MapView, MapViewError};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use woosmap::WoosmapSdk;
