//! Three independent routing strategies: Equals, StartsWith (prefix), and
//! Regex.
//!
//! Each strategy maps a URL pattern plus an HTTP method to a handler and an
//! optional template name, and each lookup distinguishes "no URL registered
//! here" from "URL known but the method is not"; the latter must surface as
//! a not-implemented response, never a generic 404. The
//! [`Application`](crate::app::Application) consults the tables in the fixed
//! order Equals → StartsWith → Regex.

mod pattern;
mod tables;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use http::Method;

use crate::chain::Handler;
use crate::model::ParamVec;

pub use pattern::compile_placeholders;
pub use tables::{EqualsTable, PrefixTable, RegexTable};

/// Handlers registered for one URL pattern, keyed by HTTP method, plus the
/// template name used by convention-based rendering.
#[derive(Clone, Default)]
pub struct RouterItem {
    handlers: HashMap<Method, Handler>,
    template: Option<String>,
}

impl RouterItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Method, handler: Handler) {
        self.handlers.insert(method, handler);
    }

    pub fn handler(&self, method: &Method) -> Option<Handler> {
        self.handlers.get(method).cloned()
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Set the template name if none is recorded yet; the first registration
    /// for a pattern wins.
    pub fn set_template(&mut self, template: Option<&str>) {
        if self.template.is_none() {
            self.template = template.map(str::to_string);
        }
    }
}

impl std::fmt::Debug for RouterItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItem")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("template", &self.template)
            .finish()
    }
}

/// Outcome of one strategy's lookup.
pub enum TableLookup {
    /// The URL is registered and the method has a handler.
    Match {
        handler: Handler,
        template: Option<String>,
        /// Named parameters bound by the strategy (regex only).
        params: ParamVec,
        /// Literal URL remainder after the matched prefix (prefix only).
        suffix: Option<String>,
    },
    /// The URL is registered but not for this method.
    MethodNotSupported,
    /// The strategy knows nothing about this URL.
    Missing,
}
