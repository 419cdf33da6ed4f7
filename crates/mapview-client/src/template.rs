//! Info window content rendering
//!
//! Templates are plain HTML with `{{field}}` placeholders. `id`, `name`, `lat`
//! and `lng` come from the store itself, anything else from its properties.
//! Values are HTML-escaped; unknown fields render empty. An unterminated `{{`
//! is copied through as text.

use tracing::debug;

use crate::sdk::Store;

pub fn render_info_window(template: &str, store: &Store) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let field = after[..end].trim();
        match lookup(store, field) {
            Some(value) => out.push_str(&escape_html(&value)),
            None => debug!(target: "mapview", "Store {} has no field {:?}", store.id, field),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn lookup(store: &Store, field: &str) -> Option<String> {
    match field {
        "id" => Some(store.id.clone()),
        "name" => Some(store.name.clone()),
        "lat" => Some(store.location.lat.to_string()),
        "lng" => Some(store.location.lng.to_string()),
        _ => store.properties.get(field).cloned(),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
