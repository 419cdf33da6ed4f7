use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlScriptElement};

use super::{Page, PageError};
use crate::notifier::LoadNotifier;
use crate::script::{ScriptElement, ScriptHandle, ScriptSrc};
use crate::state::{LoadState, ResourceLoadFailure};

struct DomEntry {
    element: HtmlScriptElement,
    state: Rc<RefCell<LoadState>>,
    // Kept alive for as long as the element may fire them
    _onload: Option<Closure<dyn FnMut()>>,
    _onerror: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

/// The browser document, reached through `web-sys`
///
/// Lookups go through `document.querySelector`, so scripts added by other code
/// (or present in the markup) are found too and receive a handle on first sight.
pub struct DomPage {
    document: Document,
    next_handle: Cell<u64>,
    entries: RefCell<BTreeMap<ScriptHandle, DomEntry>>,
}

impl DomPage {
    pub fn new() -> Result<Self, PageError> {
        let window =
            web_sys::window().ok_or_else(|| PageError::Unavailable("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| PageError::Unavailable("no document".to_string()))?;

        Ok(Self {
            document,
            next_handle: Cell::new(0),
            entries: RefCell::new(BTreeMap::new()),
        })
    }

    fn allocate(&self, entry: DomEntry) -> ScriptHandle {
        let raw = self.next_handle.get() + 1;
        self.next_handle.set(raw);
        let handle = ScriptHandle::new(raw);
        self.entries.borrow_mut().insert(handle, entry);
        handle
    }
}

impl Page for DomPage {
    fn find_script(&self, src: &ScriptSrc) -> Option<ScriptHandle> {
        let element = self
            .document
            .query_selector(&src.selector())
            .ok()
            .flatten()?
            .dyn_into::<HtmlScriptElement>()
            .ok()?;

        let known = self
            .entries
            .borrow()
            .iter()
            .find(|(_, entry)| entry.element.is_same_node(Some(element.as_ref())))
            .map(|(handle, _)| *handle);

        Some(known.unwrap_or_else(|| {
            self.allocate(DomEntry {
                element,
                state: Rc::new(RefCell::new(LoadState::Ready)),
                _onload: None,
                _onerror: None,
            })
        }))
    }

    fn inject_script(
        &self,
        element: ScriptElement,
        notifier: LoadNotifier,
    ) -> Result<ScriptHandle, PageError> {
        let body = self.document.body().ok_or(PageError::NoBody)?;

        let script = self
            .document
            .create_element("script")
            .map_err(|e| PageError::CreateElement(format!("{:?}", e)))?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|e| PageError::CreateElement(format!("{:?}", e)))?;
        script.set_src(element.src.as_str());
        script.set_async(element.async_load);
        script.set_defer(element.defer);

        // onload and onerror share the notifier; whichever fires first takes it
        let notifier = Rc::new(RefCell::new(Some(notifier)));
        let state = Rc::new(RefCell::new(LoadState::Loading));

        let onload = {
            let notifier = Rc::clone(&notifier);
            let state = Rc::clone(&state);
            Closure::<dyn FnMut()>::new(move || {
                if let Some(notifier) = notifier.borrow_mut().take() {
                    *state.borrow_mut() = LoadState::Ready;
                    notifier.complete(Ok(()));
                }
            })
        };

        let onerror = {
            let src = element.src.clone();
            let state = Rc::clone(&state);
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                if let Some(notifier) = notifier.borrow_mut().take() {
                    let failure = ResourceLoadFailure::Network(format!("failed to load {}", src));
                    *state.borrow_mut() = LoadState::Failed(failure.clone());
                    notifier.complete(Err(failure));
                }
            })
        };

        script.set_onload(Some(onload.as_ref().unchecked_ref::<js_sys::Function>()));
        script.set_onerror(Some(onerror.as_ref().unchecked_ref::<js_sys::Function>()));

        body.append_child(&script)
            .map_err(|e| PageError::CreateElement(format!("{:?}", e)))?;

        let handle = self.allocate(DomEntry {
            element: script,
            state,
            _onload: Some(onload),
            _onerror: Some(onerror),
        });
        debug!(target: "page", "Appended script {} ({})", element.src, handle);
        Ok(handle)
    }

    fn remove_script(&self, handle: ScriptHandle) -> bool {
        let Some(entry) = self.entries.borrow_mut().remove(&handle) else {
            return false;
        };

        // Detach the handlers before their closures are dropped
        entry.element.set_onload(None);
        entry.element.set_onerror(None);

        if !self.document.contains(Some(entry.element.as_ref())) {
            warn!(target: "page", "Script {} was no longer attached to the document", handle);
            return false;
        }

        entry.element.remove();
        true
    }

    fn contains(&self, handle: ScriptHandle) -> bool {
        self.entries
            .borrow()
            .get(&handle)
            .is_some_and(|entry| self.document.contains(Some(entry.element.as_ref())))
    }

    fn script_state(&self, handle: ScriptHandle) -> Option<LoadState> {
        self.entries
            .borrow()
            .get(&handle)
            .map(|entry| entry.state.borrow().clone())
    }
}
