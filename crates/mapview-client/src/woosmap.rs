use std::collections::BTreeMap;

use js_sys::{Array, Function, Object, Reflect};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::config::{Icon, LatLng, StoreStyle, StoresStyle};
use crate::sdk::{MapOptions, MapSdk, SdkError, Store, StoreClickHandler};

/// Woosmap Map JS, reached through `window.woosmap.map`
#[derive(Default)]
pub struct WoosmapSdk {
    info_window: Option<JsValue>,
    // Listeners stay registered for the lifetime of the SDK binding
    listeners: Vec<Closure<dyn FnMut(JsValue)>>,
}

impl WoosmapSdk {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MapSdk for WoosmapSdk {
    type Map = JsValue;

    fn create_map(&mut self, container_id: &str, options: &MapOptions) -> Result<JsValue, SdkError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| SdkError::Missing("document".to_string()))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| SdkError::ContainerNotFound(container_id.to_string()))?;

        let map_options = Object::new();
        set(&map_options, "center", lat_lng(options.center)?)?;
        set(&map_options, "zoom", options.zoom)?;

        construct(
            &namespace()?,
            "Map",
            &Array::of2(container.as_ref(), map_options.as_ref()),
        )
    }

    fn add_stores_overlay(&mut self, map: &JsValue, style: &StoresStyle) -> Result<(), SdkError> {
        let overlay = construct(&namespace()?, "StoresOverlay", &Array::of1(&stores_style(style)?))?;
        call_method(&overlay, "setMap", &Array::of1(map))?;
        Ok(())
    }

    fn on_store_click(&mut self, map: &JsValue, mut handler: StoreClickHandler) -> Result<(), SdkError> {
        let event = get(&namespace()?, "event")?;

        let listener = Closure::<dyn FnMut(JsValue)>::new(move |store_geojson: JsValue| {
            match parse_store(&store_geojson) {
                Some(store) => handler(store),
                None => warn!(target: "mapview", "Ignoring selected store without id or location"),
            }
        });

        call_method(
            &event,
            "addListener",
            &Array::of3(map, &JsValue::from_str("store_selected"), listener.as_ref()),
        )?;
        self.listeners.push(listener);
        Ok(())
    }

    fn open_info_window(&mut self, map: &JsValue, store: &Store, content: &str) -> Result<(), SdkError> {
        let info_window = match &self.info_window {
            Some(info_window) => info_window.clone(),
            None => {
                let info_window =
                    construct(&namespace()?, "InfoWindow", &Array::of1(&Object::new()))?;
                self.info_window = Some(info_window.clone());
                info_window
            }
        };

        call_method(&info_window, "setContent", &Array::of1(&JsValue::from_str(content)))?;
        call_method(
            &info_window,
            "open",
            &Array::of2(map, &JsValue::from(lat_lng(store.location)?)),
        )?;
        Ok(())
    }
}

fn namespace() -> Result<JsValue, SdkError> {
    let window: JsValue = web_sys::window()
        .ok_or_else(|| SdkError::Missing("window".to_string()))?
        .into();
    let woosmap = get(&window, "woosmap")?;
    get(&woosmap, "map")
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, SdkError> {
    let value = Reflect::get(target, &JsValue::from_str(key)).map_err(js_error)?;
    if value.is_undefined() || value.is_null() {
        return Err(SdkError::Missing(key.to_string()));
    }
    Ok(value)
}

fn set(target: &Object, key: &str, value: impl Into<JsValue>) -> Result<(), SdkError> {
    Reflect::set(target, &JsValue::from_str(key), &value.into()).map_err(js_error)?;
    Ok(())
}

fn construct(namespace: &JsValue, class: &str, args: &Array) -> Result<JsValue, SdkError> {
    let constructor: Function = get(namespace, class)?
        .dyn_into()
        .map_err(|_| SdkError::Missing(format!("woosmap.map.{}", class)))?;
    Reflect::construct(&constructor, args).map_err(js_error)
}

fn call_method(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, SdkError> {
    let function: Function = get(target, method)?
        .dyn_into()
        .map_err(|_| SdkError::Missing(method.to_string()))?;
    Reflect::apply(&function, target, args).map_err(js_error)
}

fn js_error(value: JsValue) -> SdkError {
    SdkError::Call(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

fn lat_lng(position: LatLng) -> Result<Object, SdkError> {
    let object = Object::new();
    set(&object, "lat", position.lat)?;
    set(&object, "lng", position.lng)?;
    Ok(object)
}

fn icon(icon: &Icon) -> Result<Object, SdkError> {
    let size = Object::new();
    set(&size, "height", icon.scaled_size.height)?;
    set(&size, "width", icon.scaled_size.width)?;

    let object = Object::new();
    set(&object, "url", icon.url.as_str())?;
    set(&object, "scaledSize", size)?;
    Ok(object)
}

fn store_style(style: &StoreStyle) -> Result<Object, SdkError> {
    let object = Object::new();
    set(&object, "color", style.color.as_str())?;
    set(&object, "size", style.size)?;
    set(&object, "minSize", style.min_size)?;
    set(&object, "icon", icon(&style.icon)?)?;
    set(&object, "selectedIcon", icon(&style.selected_icon)?)?;
    Ok(object)
}

fn stores_style(style: &StoresStyle) -> Result<JsValue, SdkError> {
    let rules = Array::new();
    for rule in &style.rules {
        let object = Object::new();
        set(&object, "type", rule.store_type.as_str())?;
        set(&object, "color", rule.color.as_str())?;
        if let Some(rule_icon) = &rule.icon {
            set(&object, "icon", icon(rule_icon)?)?;
        }
        if let Some(selected) = &rule.selected_icon {
            set(&object, "selectedIcon", icon(selected)?)?;
        }
        rules.push(&object);
    }

    let object = Object::new();
    set(&object, "breakPoint", style.break_point)?;
    set(&object, "rules", rules)?;
    set(&object, "default", store_style(&style.default)?)?;
    Ok(object.into())
}

/// Convert the GeoJSON feature passed to `store_selected`
fn parse_store(feature: &JsValue) -> Option<Store> {
    let properties = get(feature, "properties").ok()?;
    let id = get(&properties, "store_id").ok()?.as_string()?;
    let name = get(&properties, "name")
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_default();

    let coordinates: Array = get(&get(feature, "geometry").ok()?, "coordinates")
        .ok()?
        .dyn_into()
        .ok()?;
    let location = LatLng::new(coordinates.get(1).as_f64()?, coordinates.get(0).as_f64()?);

    let mut flattened = BTreeMap::new();
    if let Some(object) = properties.dyn_ref::<Object>() {
        for entry in Object::entries(object).iter() {
            let pair: Array = entry.unchecked_into();
            let Some(key) = pair.get(0).as_string() else {
                continue;
            };
            let value = pair.get(1);
            if let Some(text) = value.as_string() {
                flattened.insert(key, text);
            } else if let Some(number) = value.as_f64() {
                flattened.insert(key, number.to_string());
            } else if key == "address" {
                flattened.insert(key, format_address(&value));
            }
        }
    }

    Some(Store {
        id,
        name,
        location,
        properties: flattened,
    })
}

/// `{lines: [...], zipcode, city}` as a single line
fn format_address(address: &JsValue) -> String {
    let mut parts: Vec<String> = get(address, "lines")
        .ok()
        .and_then(|lines| lines.dyn_into::<Array>().ok())
        .map(|lines| lines.iter().filter_map(|line| line.as_string()).collect())
        .unwrap_or_default();

    let locality: Vec<String> = ["zipcode", "city"]
        .iter()
        .filter_map(|key| get(address, key).ok().and_then(|v| v.as_string()))
        .collect();
    if !locality.is_empty() {
        parts.push(locality.join(" "));
    }

    parts.join(", ")
}
