use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use crate::app::Application;
use crate::model::{Request, Response};

/// Per-request object binding one connection's request to its application.
///
/// Carries the untyped key→value blackboard that intercepters and handlers
/// share (session blobs, model data), which the core never interprets, plus
/// the template name resolved by routing. Created when a request begins
/// processing and destroyed once its response has been written.
pub struct Context {
    pub request: Request,
    pub response: Response,
    app: Arc<Application>,
    data: HashMap<String, Value>,
    template: Option<String>,
}

impl Context {
    pub fn new(request: Request, app: Arc<Application>) -> Self {
        Self {
            request,
            response: Response::new(),
            app,
            data: HashMap::new(),
            template: None,
        }
    }

    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    /// Store a blackboard value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// Override the template the response will render with.
    pub fn set_template(&mut self, name: impl Into<String>) {
        self.template = Some(name.into());
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Render the resolved template with the blackboard as model data and
    /// install the markup as the response body. Returns `false` when no
    /// template is resolved, no store is wired in, or rendering fails.
    pub fn render(&mut self) -> bool {
        match self.template.clone() {
            Some(name) => self.render_named(&name),
            None => false,
        }
    }

    /// Render a specific template regardless of the resolved name.
    pub fn render_named(&mut self, name: &str) -> bool {
        let Some(store) = self.app.templates().cloned() else {
            warn!(template = name, "render skipped: no template store configured");
            return false;
        };
        let model = Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        match store.render(name, &model) {
            Ok(markup) => {
                if !self.response.headers.contains("content-type") {
                    self.response.set_header("content-type", "text/html; charset=utf-8");
                }
                self.response.set_body(markup)
            }
            Err(err) => {
                error!(template = name, error = %err, "template render failed");
                false
            }
        }
    }

    pub(crate) fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}
