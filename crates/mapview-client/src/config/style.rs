use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconSize {
    pub height: u32,
    pub width: u32,
}

/// Missing fields fall back to the default store marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Icon {
    pub url: String,
    pub scaled_size: IconSize,
}

/// Marker style applied to every store unless a rule matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreStyle {
    pub color: String,
    pub size: u32,
    pub min_size: u32,
    pub icon: Icon,
    pub selected_icon: Icon,
}

/// Per store type override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    #[serde(rename = "type")]
    pub store_type: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub selected_icon: Option<Icon>,
}

/// Style of the stores overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresStyle {
    /// Zoom level from which markers are drawn as icons
    pub break_point: u32,
    pub rules: Vec<StyleRule>,
    pub default: StoreStyle,
}

impl Default for IconSize {
    fn default() -> Self {
        Self {
            height: 40,
            width: 34,
        }
    }
}

impl Default for Icon {
    fn default() -> Self {
        Self {
            url: "https://images.woosmap.com/starbucks-marker.svg".to_string(),
            scaled_size: IconSize::default(),
        }
    }
}

impl Default for StoreStyle {
    fn default() -> Self {
        Self {
            color: "#9f2747".to_string(),
            size: 8,
            min_size: 1,
            icon: Icon::default(),
            selected_icon: Icon {
                url: "https://images.woosmap.com/starbucks-marker-selected.svg".to_string(),
                scaled_size: IconSize {
                    height: 50,
                    width: 43,
                },
            },
        }
    }
}

impl Default for StoresStyle {
    fn default() -> Self {
        Self {
            break_point: 14,
            rules: Vec::new(),
            default: StoreStyle::default(),
        }
    }
}
