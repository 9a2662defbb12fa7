//! Interfaces for the external collaborators the core delegates to.
//!
//! The core never interprets template markup and never decides where an
//! uploaded file lands on disk; both concerns sit behind the traits below so
//! embedders can wire in their own engines and policies.

use std::path::PathBuf;

use serde_json::Value;

/// Template rendering collaborator.
///
/// Consumes a template name and the request's model data blob; returns the
/// rendered markup or an error string. The core treats the result as an
/// opaque body.
pub trait TemplateStore: Send + Sync {
    fn render(&self, name: &str, model: &Value) -> Result<String, String>;

    /// Periodic maintenance hook, invoked from the server's housekeeping
    /// timer (e.g. template hot-reload checks). Default: nothing.
    fn maintain(&self) {}
}

/// Upload persistence policy, consulted once per file-bearing multipart part.
pub trait UploadPolicy: Send + Sync {
    /// Decide whether a file payload with the given extension and size (in
    /// whole KB, rounded up) should be persisted to a temporary file instead
    /// of staying resident in memory.
    fn persist(&self, extension: &str, size_kb: usize) -> bool;

    /// Name the temporary file a persisted payload is written to.
    fn temp_path(&self, filename: &str) -> PathBuf;
}

/// Default policy: every upload stays in memory.
pub struct KeepInMemory;

impl UploadPolicy for KeepInMemory {
    fn persist(&self, _extension: &str, _size_kb: usize) -> bool {
        false
    }

    fn temp_path(&self, filename: &str) -> PathBuf {
        std::env::temp_dir().join(filename)
    }
}
