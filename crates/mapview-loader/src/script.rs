use std::fmt;

use crate::loader::LoaderError;

/// Source URL of an external script
///
/// The only validation performed is that the URL is not empty; anything else is
/// left to the page that fetches it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptSrc(String);

impl ScriptSrc {
    pub fn new(src: impl Into<String>) -> Result<Self, LoaderError> {
        let src = src.into();
        if src.trim().is_empty() {
            return Err(LoaderError::EmptySrc);
        }
        Ok(Self(src))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// CSS selector matching a `<script>` element with exactly this `src`
    pub fn selector(&self) -> String {
        let mut selector = String::with_capacity(self.0.len() + 16);
        selector.push_str("script[src=\"");
        for c in self.0.chars() {
            match c {
                '\\' | '"' => {
                    selector.push('\\');
                    selector.push(c);
                }
                // Control characters need a hex escape terminated by a space
                c if c.is_control() => selector.push_str(&format!("\\{:x} ", c as u32)),
                c => selector.push(c),
            }
        }
        selector.push_str("\"]");
        selector
    }
}

impl fmt::Display for ScriptSrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScriptSrc {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ScriptSrc {
    type Error = LoaderError;

    fn try_from(src: &str) -> Result<Self, Self::Error> {
        Self::new(src)
    }
}

impl TryFrom<String> for ScriptSrc {
    type Error = LoaderError;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        Self::new(src)
    }
}

/// Description of the `<script>` element a loader asks the page to inject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub src: ScriptSrc,
    /// Execute without blocking page parsing
    pub async_load: bool,
    pub defer: bool,
}

impl ScriptElement {
    /// Async, non-deferred element for `src`
    pub fn new(src: ScriptSrc) -> Self {
        Self {
            src,
            async_load: true,
            defer: false,
        }
    }

    pub fn with_defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }
}

/// Page-scoped identifier of an injected script element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptHandle(u64);

impl ScriptHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScriptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
