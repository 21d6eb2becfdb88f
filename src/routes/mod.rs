//! Route table: static per-route configuration consumed by the guard.
//!
//! DESIGN
//! ======
//! Records nest like the UI's layout tree (a layout record with page
//! children). At construction the tree is flattened into [`RouteEntry`]s, one
//! per leaf, each carrying its full pattern, the chain of views from layout to
//! page, and meta merged parent to child. Resolution only ever looks at leaves.
//!
//! Entries without a catch-all segment are tried before entries with one;
//! otherwise declaration order decides.

mod matcher;
pub mod restaurant;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use matcher::Segment;

/// Path of the login route.
pub const LOGIN_PATH: &str = "/login";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error("route table has no routes")]
    Empty,
    #[error("route {0:?} declares both a redirect and children")]
    RedirectWithChildren(String),
    #[error("route table io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("route table parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// RECORDS
// =============================================================================

/// Access requirements declared on a route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl RouteMeta {
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.requires_auth.unwrap_or(false)
    }

    /// Child values override the parent's.
    #[must_use]
    pub fn merge(&self, child: &RouteMeta) -> RouteMeta {
        RouteMeta {
            requires_auth: child.requires_auth.or(self.requires_auth),
            role: child.role.clone().or_else(|| self.role.clone()),
        }
    }
}

/// One node of the declared route tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub path: String,
    /// Layout or page component rendered for this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default)]
    pub meta: RouteMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Self::default() }
    }

    #[must_use]
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    #[must_use]
    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.meta.requires_auth = Some(requires_auth);
        self
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.meta.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn redirect(mut self, to: impl Into<String>) -> Self {
        self.redirect = Some(to.into());
        self
    }

    #[must_use]
    pub fn children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }
}

// =============================================================================
// FLATTENED ENTRIES
// =============================================================================

/// A matchable leaf route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteEntry {
    /// Full pattern, e.g. `/administrador/platos`.
    pub pattern: String,
    pub meta: RouteMeta,
    /// Views from outermost layout to page.
    pub views: Vec<String>,
    pub redirect: Option<String>,
    segments: Vec<Segment>,
}

impl RouteEntry {
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        matcher::has_catch_all(&self.segments)
    }
}

/// Result of resolving a concrete path against the table.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRoute {
    /// Normalized requested path.
    pub path: String,
    /// Pattern of the entry that matched.
    pub pattern: String,
    pub meta: RouteMeta,
    pub views: Vec<String>,
    pub params: BTreeMap<String, String>,
    pub redirect: Option<String>,
}

impl ResolvedRoute {
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.meta.requires_auth()
    }

    #[must_use]
    pub fn required_role(&self) -> Option<&str> {
        self.meta.role.as_deref()
    }
}

// =============================================================================
// TABLE
// =============================================================================

#[derive(Clone, Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Validate and flatten a declared route tree.
    ///
    /// # Errors
    ///
    /// Returns [`RouteTableError::Empty`] for an empty table and
    /// [`RouteTableError::RedirectWithChildren`] for a record that both
    /// redirects and has children.
    pub fn new(records: Vec<RouteRecord>) -> Result<Self, RouteTableError> {
        if records.is_empty() {
            return Err(RouteTableError::Empty);
        }
        validate(&records)?;
        Ok(Self::flatten(&records))
    }

    /// Load a route tree from a JSON array file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_json_file(path: &Path) -> Result<Self, RouteTableError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<RouteRecord> = serde_json::from_str(&raw)?;
        Self::new(records)
    }

    /// The restaurant client's built-in routes.
    #[must_use]
    pub fn restaurant() -> Self {
        Self::flatten(&restaurant::routes())
    }

    fn flatten(records: &[RouteRecord]) -> Self {
        let mut entries = Vec::new();
        for record in records {
            let root = matcher::join_paths("/", &record.path);
            collect_entries(record, &root, &RouteMeta::default(), &[], &mut entries);
        }
        // Stable: catch-alls last, declaration order otherwise.
        entries.sort_by_key(RouteEntry::is_catch_all);
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Resolve a concrete path to the first matching entry.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        let path = matcher::normalize_path(path);
        self.entries.iter().find_map(|entry| {
            matcher::match_path(&entry.segments, &path).map(|params| ResolvedRoute {
                path: path.clone(),
                pattern: entry.pattern.clone(),
                meta: entry.meta.clone(),
                views: entry.views.clone(),
                params,
                redirect: entry.redirect.clone(),
            })
        })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::restaurant()
    }
}

fn validate(records: &[RouteRecord]) -> Result<(), RouteTableError> {
    for record in records {
        if record.redirect.is_some() && !record.children.is_empty() {
            return Err(RouteTableError::RedirectWithChildren(record.path.clone()));
        }
        validate(&record.children)?;
    }
    Ok(())
}

fn collect_entries(
    record: &RouteRecord,
    full_path: &str,
    parent_meta: &RouteMeta,
    parent_views: &[String],
    out: &mut Vec<RouteEntry>,
) {
    let meta = parent_meta.merge(&record.meta);
    let mut views = parent_views.to_vec();
    views.extend(record.view.clone());

    if record.children.is_empty() {
        out.push(RouteEntry {
            pattern: full_path.to_owned(),
            meta,
            views,
            redirect: record.redirect.clone(),
            segments: matcher::parse_pattern(full_path),
        });
        return;
    }
    for child in &record.children {
        let child_path = matcher::join_paths(full_path, &child.path);
        collect_entries(child, &child_path, &meta, &views, out);
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
