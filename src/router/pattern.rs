use std::sync::Arc;

use regex::Regex;

/// Compile a `{{name}}` placeholder pattern into an anchored capturing regex
/// plus the ordered list of parameter names.
///
/// Each placeholder becomes a capture over one path segment's worth of
/// characters; the surrounding text is kept as regex source, so a pattern
/// may mix placeholders with raw regex syntax. Captures are paired
/// positionally with the returned names at match time. An invalid pattern is
/// reported to the caller, which rejects the registration.
pub fn compile_placeholders(pattern: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    let mut names: Vec<Arc<str>> = Vec::new();

    let mut rest = pattern;
    while let Some(start) = rest.find("{{") {
        source.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                names.push(Arc::from(&after[..end]));
                source.push_str("([^/]+)");
                rest = &after[end + 2..];
            }
            None => {
                // unbalanced braces pass through as-is
                source.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    source.push_str(rest);
    source.push('$');

    Regex::new(&source).map(|re| (re, names))
}
