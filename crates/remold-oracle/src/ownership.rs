//! Ownership policy
//!
//! Decides whether a declaration belongs to the project being rewritten.
//! Declarations in third-party or built-in code must never have their
//! signatures changed, since neither they nor their other callers are
//! rewritten.

use crate::signature::DeclarationSite;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path-based ownership rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipPolicy {
    /// Path fragments that mark third-party code
    pub vendor_markers: Vec<String>,
    /// When non-empty, only declarations under one of these roots are owned
    pub project_roots: Vec<PathBuf>,
}

impl Default for OwnershipPolicy {
    fn default() -> Self {
        Self {
            vendor_markers: vec!["/vendor/".to_string()],
            project_roots: Vec::new(),
        }
    }
}

impl OwnershipPolicy {
    /// Check if a declaration site is owned by the project
    #[must_use]
    pub fn owns(&self, site: &DeclarationSite) -> bool {
        site.file().is_some_and(|path| self.owns_path(path))
    }

    /// Check if a file path is owned by the project
    #[must_use]
    pub fn owns_path(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        if self
            .vendor_markers
            .iter()
            .any(|marker| normalized.contains(marker.as_str()))
        {
            return false;
        }
        self.project_roots.is_empty()
            || self
                .project_roots
                .iter()
                .any(|root| under_root(&normalized, &normalize(root)))
    }
}

/// Component-wise prefix check on normalized paths
fn under_root(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    path.strip_prefix(root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Forward-slash path with a leading separator, so `vendor/x.php` matches
/// the `/vendor/` marker too
fn normalize(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        text
    } else {
        format!("/{text}")
    }
}
