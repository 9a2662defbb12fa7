//! The `Application`: routing tables, the ordered intercepter list, and the
//! collaborator handles, resolved once per request by the chain engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::Method;
use tracing::{info, warn};

use crate::chain::{Handler, Intercepter};
use crate::collab::{KeepInMemory, TemplateStore, UploadPolicy};
use crate::model::ParamVec;
use crate::router::{EqualsTable, PrefixTable, RegexTable, TableLookup};

/// Which routing strategy a registration targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Equals(String),
    StartsWith(String),
    Regex(String),
}

/// Outcome of resolving a request against the three tables.
pub enum Resolution {
    Handler {
        handler: Handler,
        template: Option<String>,
        params: ParamVec,
        suffix: Option<String>,
    },
    /// No strategy knows the URL.
    NotFound,
    /// A strategy knows the URL but not this method; rendered as
    /// not-implemented, never as a missing page.
    MethodNotSupported,
}

/// An embeddable application: three routing tables, an ordered intercepter
/// chain, a URL root prefix, and the external collaborators.
///
/// Routes and intercepters may only be registered before the application is
/// mounted; the tables are read concurrently by every connection afterwards,
/// so late registration fails loudly instead of mutating live state.
pub struct Application {
    root: String,
    equals: EqualsTable,
    prefix: PrefixTable,
    regex: RegexTable,
    intercepters: Vec<Arc<dyn Intercepter>>,
    templates: Option<Arc<dyn TemplateStore>>,
    uploads: Arc<dyn UploadPolicy>,
    mounted: AtomicBool,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_root("")
    }

    /// Create an application whose routes all hang under `root`.
    pub fn with_root(root: &str) -> Self {
        Self {
            root: root.to_string(),
            equals: EqualsTable::new(),
            prefix: PrefixTable::new(),
            regex: RegexTable::new(),
            intercepters: Vec::new(),
            templates: None,
            uploads: Arc::new(KeepInMemory),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Register a handler for a set of methods under one pattern.
    ///
    /// Returns `false` without touching any table when the application is
    /// already mounted, the method set is empty, or a regex pattern fails to
    /// compile.
    pub fn add_handler(
        &mut self,
        methods: &[Method],
        pattern: RoutePattern,
        handler: Handler,
        template: Option<&str>,
    ) -> bool {
        if self.is_mounted() {
            warn!(?pattern, "route registration rejected: application is mounted");
            return false;
        }
        if methods.is_empty() {
            warn!(?pattern, "route registration rejected: empty method set");
            return false;
        }
        match pattern {
            RoutePattern::Equals(p) => {
                let full = format!("{}{}", self.root, p);
                for method in methods {
                    self.equals.insert(&full, method.clone(), handler.clone(), template);
                }
                info!(pattern = %full, methods = ?methods, strategy = "equals", "route registered");
                true
            }
            RoutePattern::StartsWith(p) => {
                let full = format!("{}{}", self.root, p);
                for method in methods {
                    self.prefix.insert(&full, method.clone(), handler.clone(), template);
                }
                info!(pattern = %full, methods = ?methods, strategy = "starts_with", "route registered");
                true
            }
            RoutePattern::Regex(p) => {
                let full = format!("{}{}", self.root, p);
                let mut ok = true;
                for method in methods {
                    ok &= self.regex.insert(&full, method.clone(), handler.clone(), template);
                }
                if ok {
                    info!(pattern = %full, methods = ?methods, strategy = "regex", "route registered");
                }
                ok
            }
        }
    }

    /// Append an intercepter to the chain. Pre-mount only.
    pub fn add_intercepter(&mut self, intercepter: Arc<dyn Intercepter>) -> bool {
        if self.is_mounted() {
            warn!("intercepter registration rejected: application is mounted");
            return false;
        }
        self.intercepters.push(intercepter);
        true
    }

    /// Wire in the template rendering collaborator. Pre-mount only.
    pub fn set_template_store(&mut self, store: Arc<dyn TemplateStore>) -> bool {
        if self.is_mounted() {
            warn!("template store rejected: application is mounted");
            return false;
        }
        self.templates = Some(store);
        true
    }

    /// Replace the upload persistence policy. Pre-mount only.
    pub fn set_upload_policy(&mut self, policy: Arc<dyn UploadPolicy>) -> bool {
        if self.is_mounted() {
            warn!("upload policy rejected: application is mounted");
            return false;
        }
        self.uploads = policy;
        true
    }

    /// Freeze registration and open the application for traffic. Called by
    /// the server when it starts accepting.
    pub fn mount(&self) {
        if !self.mounted.swap(true, Ordering::SeqCst) {
            info!(
                equals_routes = self.equals.len(),
                prefix_routes = self.prefix.len(),
                regex_routes = self.regex.len(),
                intercepters = self.intercepters.len(),
                root = %self.root,
                "application mounted"
            );
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn intercepters(&self) -> &[Arc<dyn Intercepter>] {
        &self.intercepters
    }

    pub fn templates(&self) -> Option<&Arc<dyn TemplateStore>> {
        self.templates.as_ref()
    }

    pub fn upload_policy(&self) -> &Arc<dyn UploadPolicy> {
        &self.uploads
    }

    /// Periodic collaborator maintenance, driven by the server's
    /// housekeeping timer.
    pub fn housekeeping(&self) {
        if let Some(templates) = &self.templates {
            templates.maintain();
        }
    }

    /// Resolve a request to a handler with the fixed strategy precedence
    /// Equals → StartsWith → Regex, short-circuiting on the first strategy
    /// that knows the URL at all.
    ///
    /// When no strategy knows the URL and the path ends in `/index`, the
    /// whole resolution is retried once with the trailing `index` stripped,
    /// so `/foo/index` and `/foo/` reach the same handler without a
    /// duplicate registration.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        match self.resolve_once(method, path) {
            Resolution::NotFound if path.ends_with("/index") => {
                let trimmed = &path[..path.len() - 5];
                self.resolve_once(method, trimmed)
            }
            resolution => resolution,
        }
    }

    fn resolve_once(&self, method: &Method, path: &str) -> Resolution {
        settle(self.equals.lookup(path, method))
            .or_else(|| settle(self.prefix.lookup(path, method)))
            .or_else(|| settle(self.regex.lookup(path, method)))
            .unwrap_or(Resolution::NotFound)
    }
}

/// A strategy that knows the URL settles resolution, whether or not the
/// method matched; only `Missing` falls through to the next table.
fn settle(lookup: TableLookup) -> Option<Resolution> {
    match lookup {
        TableLookup::Match {
            handler,
            template,
            params,
            suffix,
        } => Some(Resolution::Handler {
            handler,
            template,
            params,
            suffix,
        }),
        TableLookup::MethodNotSupported => Some(Resolution::MethodNotSupported),
        TableLookup::Missing => None,
    }
}
