use std::collections::BTreeMap;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use tracing::{debug, warn};

use super::pattern::compile_placeholders;
use super::{RouterItem, TableLookup};
use crate::chain::Handler;
use crate::model::ParamVec;

/// Exact-match table: a case-insensitive ordered map from the full path to
/// its [`RouterItem`]. O(log n) lookup.
#[derive(Default)]
pub struct EqualsTable {
    map: BTreeMap<String, RouterItem>,
}

impl EqualsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: &str, method: Method, handler: Handler, template: Option<&str>) {
        let item = self.map.entry(pattern.to_ascii_lowercase()).or_default();
        item.set_template(template);
        item.insert(method, handler);
    }

    pub fn lookup(&self, path: &str, method: &Method) -> TableLookup {
        let Some(item) = self.map.get(&path.to_ascii_lowercase()) else {
            return TableLookup::Missing;
        };
        match item.handler(method) {
            Some(handler) => TableLookup::Match {
                handler,
                template: item.template().map(str::to_string),
                params: ParamVec::new(),
                suffix: None,
            },
            None => TableLookup::MethodNotSupported,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Prefix table: keys ordered so that a backward scan from the query path
/// visits longer, more specific prefixes before their shorter ancestors.
///
/// The lookup walks the registered prefixes that sort at or below the
/// (lowercased) query path, in descending order, and takes the first one the
/// path starts with, which is the longest registered prefix. The remainder
/// of the URL after the prefix is exposed as the route suffix; this strategy
/// binds no named parameters.
#[derive(Default)]
pub struct PrefixTable {
    map: BTreeMap<String, RouterItem>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: &str, method: Method, handler: Handler, template: Option<&str>) {
        let item = self.map.entry(pattern.to_ascii_lowercase()).or_default();
        item.set_template(template);
        item.insert(method, handler);
    }

    pub fn lookup(&self, path: &str, method: &Method) -> TableLookup {
        let key = path.to_ascii_lowercase();
        for (prefix, item) in self.map.range(..=key.clone()).rev() {
            if !key.starts_with(prefix.as_str()) {
                continue;
            }
            // first hit is the longest registered prefix; shorter ancestors
            // are not consulted once the URL is known here
            return match item.handler(method) {
                Some(handler) => {
                    let rest = &path[prefix.len()..];
                    TableLookup::Match {
                        handler,
                        template: item.template().map(str::to_string),
                        params: ParamVec::new(),
                        suffix: (!rest.is_empty()).then(|| rest.to_string()),
                    }
                }
                None => TableLookup::MethodNotSupported,
            };
        }
        TableLookup::Missing
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

struct RegexRoute {
    source: String,
    regex: Regex,
    names: Vec<Arc<str>>,
    item: RouterItem,
}

/// Regex table: a list tried in registration order, first match wins.
/// Deliberately not sorted by specificity.
#[derive(Default)]
pub struct RegexTable {
    routes: Vec<RegexRoute>,
}

impl RegexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `{{name}}` placeholder pattern. Returns `false` when the
    /// compiled pattern is rejected by the regex engine.
    pub fn insert(
        &mut self,
        pattern: &str,
        method: Method,
        handler: Handler,
        template: Option<&str>,
    ) -> bool {
        if let Some(route) = self.routes.iter_mut().find(|r| r.source == pattern) {
            route.item.set_template(template);
            route.item.insert(method, handler);
            return true;
        }
        let (regex, names) = match compile_placeholders(pattern) {
            Ok(compiled) => compiled,
            Err(err) => {
                warn!(pattern, error = %err, "regex route rejected");
                return false;
            }
        };
        let mut item = RouterItem::new();
        item.set_template(template);
        item.insert(method, handler);
        debug!(pattern, params = names.len(), "regex route registered");
        self.routes.push(RegexRoute {
            source: pattern.to_string(),
            regex,
            names,
            item,
        });
        true
    }

    pub fn lookup(&self, path: &str, method: &Method) -> TableLookup {
        for route in &self.routes {
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };
            return match route.item.handler(method) {
                Some(handler) => {
                    let params: ParamVec = route
                        .names
                        .iter()
                        .zip(caps.iter().skip(1))
                        .filter_map(|(name, cap)| {
                            cap.map(|m| (Arc::clone(name), m.as_str().to_string()))
                        })
                        .collect();
                    TableLookup::Match {
                        handler,
                        template: route.item.template().map(str::to_string),
                        params,
                        suffix: None,
                    }
                }
                None => TableLookup::MethodNotSupported,
            };
        }
        TableLookup::Missing
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
