use std::sync::Arc;

use http::Method;

use super::pattern::compile_placeholders;
use super::tables::{EqualsTable, PrefixTable, RegexTable};
use super::TableLookup;
use crate::chain::{Flow, Handler};

fn noop() -> Handler {
    Arc::new(|_ctx| Flow::Pass)
}

#[test]
fn test_compile_root() {
    let (re, params) = compile_placeholders("/").unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/x"));
    assert!(params.is_empty());
}

#[test]
fn test_compile_single_placeholder() {
    let (re, params) = compile_placeholders("/items/{{id}}").unwrap();
    assert!(re.is_match("/items/123"));
    assert!(!re.is_match("/items/123/extra"));
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].as_ref(), "id");
}

#[test]
fn test_compile_nested_placeholders() {
    let (re, params) = compile_placeholders("/a/{{b}}/c/{{d}}").unwrap();
    let caps = re.captures("/a/1/c/2").unwrap();
    assert_eq!(&caps[1], "1");
    assert_eq!(&caps[2], "2");
    assert_eq!(params.len(), 2);
}

#[test]
fn test_compile_passes_raw_regex_through() {
    let (re, _) = compile_placeholders(r"/files/.*\.txt").unwrap();
    assert!(re.is_match("/files/report.txt"));
    assert!(!re.is_match("/files/report.pdf"));
}

#[test]
fn test_compile_rejects_invalid_regex() {
    assert!(compile_placeholders("/bad/(").is_err());
}

#[test]
fn test_equals_lookup_is_case_insensitive() {
    let mut table = EqualsTable::new();
    table.insert("/Hello", Method::GET, noop(), None);
    assert!(matches!(
        table.lookup("/hello", &Method::GET),
        TableLookup::Match { .. }
    ));
    assert!(matches!(
        table.lookup("/hello", &Method::POST),
        TableLookup::MethodNotSupported
    ));
    assert!(matches!(
        table.lookup("/other", &Method::GET),
        TableLookup::Missing
    ));
}

#[test]
fn test_prefix_longest_wins() {
    let mut table = PrefixTable::new();
    table.insert("/a/", Method::GET, noop(), Some("short"));
    table.insert("/a/b/", Method::GET, noop(), Some("long"));
    match table.lookup("/a/b/c", &Method::GET) {
        TableLookup::Match { template, suffix, .. } => {
            assert_eq!(template.as_deref(), Some("long"));
            assert_eq!(suffix.as_deref(), Some("c"));
        }
        _ => panic!("expected a match"),
    }
}

#[test]
fn test_prefix_exact_hit_has_no_suffix() {
    let mut table = PrefixTable::new();
    table.insert("/admin/", Method::GET, noop(), None);
    match table.lookup("/admin/", &Method::GET) {
        TableLookup::Match { suffix, params, .. } => {
            assert!(suffix.is_none());
            assert!(params.is_empty());
        }
        _ => panic!("expected a match"),
    }
}

#[test]
fn test_prefix_scan_skips_non_prefix_keys() {
    let mut table = PrefixTable::new();
    table.insert("/a/", Method::GET, noop(), None);
    table.insert("/a/b/c", Method::GET, noop(), None);
    // "/a/b/c" sorts below "/a/z" but is not a prefix of it
    assert!(matches!(
        table.lookup("/a/z", &Method::GET),
        TableLookup::Match { .. }
    ));
}

#[test]
fn test_regex_registration_order_wins() {
    let mut table = RegexTable::new();
    table.insert("/pets/{{id}}", Method::GET, noop(), Some("first"));
    table.insert("/{{anything}}/{{id}}", Method::GET, noop(), Some("second"));
    match table.lookup("/pets/7", &Method::GET) {
        TableLookup::Match { template, params, .. } => {
            assert_eq!(template.as_deref(), Some("first"));
            assert_eq!(params.len(), 1);
            assert_eq!(params[0].1, "7");
        }
        _ => panic!("expected a match"),
    }
}

#[test]
fn test_regex_binds_params_positionally() {
    let mut table = RegexTable::new();
    table.insert("/users/{{user_id}}/posts/{{post_id}}", Method::GET, noop(), None);
    match table.lookup("/users/11/posts/22", &Method::GET) {
        TableLookup::Match { params, .. } => {
            assert_eq!(params[0], (Arc::from("user_id"), "11".to_string()));
            assert_eq!(params[1], (Arc::from("post_id"), "22".to_string()));
        }
        _ => panic!("expected a match"),
    }
}

#[test]
fn test_regex_same_pattern_extends_methods() {
    let mut table = RegexTable::new();
    assert!(table.insert("/pets/{{id}}", Method::GET, noop(), None));
    assert!(table.insert("/pets/{{id}}", Method::DELETE, noop(), None));
    assert_eq!(table.len(), 1);
    assert!(matches!(
        table.lookup("/pets/9", &Method::DELETE),
        TableLookup::Match { .. }
    ));
    assert!(matches!(
        table.lookup("/pets/9", &Method::PUT),
        TableLookup::MethodNotSupported
    ));
}
