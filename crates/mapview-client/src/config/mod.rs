pub mod mapview_config;
pub mod style;

pub use mapview_config::{ConfigError, InfoWindowConfig, LatLng, MapViewConfig};
pub use style::{Icon, IconSize, StoreStyle, StoresStyle, StyleRule};
