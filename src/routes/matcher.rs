//! Path patterns and matching.
//!
//! Supported segment forms:
//! - `mesas` — static, exact match
//! - `:id` — one segment, captured
//! - `:rest(.*)*` or `*` — zero or more segments, captured joined by `/`
//!
//! Catch-all segments are greedy and backtrack so trailing static segments
//! (`/:any(.*)*/login`) still match.

use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

const DEFAULT_CATCH_ALL_NAME: &str = "pathMatch";

pub(crate) fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(parse_segment)
        .collect()
}

fn parse_segment(raw: &str) -> Segment {
    if raw == "*" {
        return Segment::CatchAll(DEFAULT_CATCH_ALL_NAME.to_owned());
    }
    let Some(param) = raw.strip_prefix(':') else {
        return Segment::Static(raw.to_owned());
    };
    let name_end = param.find(['(', '*', '+', '?']).unwrap_or(param.len());
    let name = &param[..name_end];
    let name = if name.is_empty() { DEFAULT_CATCH_ALL_NAME } else { name };
    if param.ends_with('*') || param.contains("(.*)") {
        Segment::CatchAll(name.to_owned())
    } else {
        Segment::Param(name.to_owned())
    }
}

/// Strip query and fragment, collapse duplicate and trailing slashes.
pub(crate) fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let segments: Vec<&str> = path[..end].split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Join a child route path onto its parent's full path.
pub(crate) fn join_paths(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_owned();
    }
    if child.is_empty() {
        return parent.to_owned();
    }
    if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}

pub(crate) fn has_catch_all(segments: &[Segment]) -> bool {
    segments.iter().any(|s| matches!(s, Segment::CatchAll(_)))
}

/// Match a normalized path against a pattern, returning captured params.
pub(crate) fn match_path(pattern: &[Segment], path: &str) -> Option<BTreeMap<String, String>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut params = BTreeMap::new();
    match_segments(pattern, &parts, &mut params).then_some(params)
}

fn match_segments(pattern: &[Segment], path: &[&str], params: &mut BTreeMap<String, String>) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    match head {
        Segment::Static(expected) => {
            path.first().is_some_and(|p| *p == expected.as_str()) && match_segments(rest, &path[1..], params)
        }
        Segment::Param(name) => {
            let Some((first, tail)) = path.split_first() else {
                return false;
            };
            if match_segments(rest, tail, params) {
                params.insert(name.clone(), (*first).to_owned());
                return true;
            }
            false
        }
        Segment::CatchAll(name) => {
            for take in (0..=path.len()).rev() {
                if match_segments(rest, &path[take..], params) {
                    params.insert(name.clone(), path[..take].join("/"));
                    return true;
                }
            }
            false
        }
    }
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
