//! Table-backed oracle
//!
//! Answers from precomputed reflection data, typically dumped by an external
//! analyzer as JSON:
//!
//! ```json
//! {
//!   "signatures": [
//!     {
//!       "callable": { "method": { "class": "SomeObject", "name": "run" } },
//!       "signature": {
//!         "params": [
//!           { "name": "optional", "position": 0, "optional": true },
//!           { "name": "required", "position": 1 }
//!         ],
//!         "site": { "file": "src/SomeObject.php" }
//!       }
//!     }
//!   ],
//!   "types": [
//!     { "expr": "$this->mock", "scope": "FooTest", "type": "InvocationMocker" }
//!   ]
//! }
//! ```
//!
//! Conflicting entries for the same question load as ambiguous rather than
//! picking one.

use crate::error::OracleError;
use crate::oracle::{Resolution, SemanticOracle, Unresolved};
use crate::signature::{CallableRef, Signature, TypeName, TypeQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignatureEntry {
    callable: CallableRef,
    signature: Signature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TypeEntry {
    expr: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(rename = "type")]
    type_name: TypeName,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OracleData {
    #[serde(default)]
    signatures: Vec<SignatureEntry>,
    #[serde(default)]
    types: Vec<TypeEntry>,
}

#[derive(Debug, Clone)]
enum Entry<T> {
    Known(T),
    Conflicting,
}

impl<T: Clone> Entry<T> {
    fn answer(&self) -> Resolution<T> {
        match self {
            Entry::Known(value) => Resolution::Resolved(value.clone()),
            Entry::Conflicting => Resolution::Unresolved(Unresolved::Ambiguous),
        }
    }
}

/// In-memory oracle
#[derive(Debug, Clone, Default)]
pub struct InMemoryOracle {
    signatures: HashMap<CallableRef, Entry<Signature>>,
    types: HashMap<(Option<String>, String), Entry<TypeName>>,
}

impl InMemoryOracle {
    /// Create empty oracle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse oracle data from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Json`] if the text does not match the expected
    /// shape.
    pub fn from_json_str(text: &str) -> Result<Self, OracleError> {
        let data: OracleData = serde_json::from_str(text)?;
        let mut oracle = Self::new();
        for entry in data.signatures {
            oracle.insert_signature(entry.callable, entry.signature);
        }
        for entry in data.types {
            oracle.insert_type(entry.scope, entry.expr, entry.type_name);
        }
        tracing::debug!(
            signatures = oracle.signatures.len(),
            types = oracle.types.len(),
            "loaded oracle data"
        );
        Ok(oracle)
    }

    /// Load oracle data from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Io`] if the file cannot be read, or
    /// [`OracleError::Json`] if its contents are malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| OracleError::io_error(path, e))?;
        Self::from_json_str(&text)
    }

    /// Add a signature; a different signature for the same callable makes
    /// it ambiguous
    pub fn insert_signature(&mut self, callable: CallableRef, signature: Signature) {
        merge(&mut self.signatures, callable, signature);
    }

    /// Add an expression type; a different type for the same expression
    /// makes it ambiguous
    pub fn insert_type(
        &mut self,
        scope: Option<String>,
        expr: impl Into<String>,
        type_name: TypeName,
    ) {
        merge(&mut self.types, (scope, expr.into()), type_name);
    }

    /// Builder form of [`Self::insert_signature`]
    #[must_use]
    pub fn with_signature(mut self, callable: CallableRef, signature: Signature) -> Self {
        self.insert_signature(callable, signature);
        self
    }

    /// Builder form of [`Self::insert_type`]
    #[must_use]
    pub fn with_type(
        mut self,
        scope: Option<&str>,
        expr: &str,
        type_name: impl Into<String>,
    ) -> Self {
        self.insert_type(scope.map(str::to_string), expr, TypeName(type_name.into()));
        self
    }

    /// Number of known callables
    #[inline]
    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }
}

fn merge<K: std::hash::Hash + Eq, T: PartialEq>(
    table: &mut HashMap<K, Entry<T>>,
    key: K,
    value: T,
) {
    match table.get_mut(&key) {
        None => {
            table.insert(key, Entry::Known(value));
        }
        Some(Entry::Known(existing)) if *existing == value => {}
        Some(entry) => *entry = Entry::Conflicting,
    }
}

impl SemanticOracle for InMemoryOracle {
    fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature> {
        self.signatures
            .get(callable)
            .map_or(Resolution::Unresolved(Unresolved::NotFound), Entry::answer)
    }

    fn resolve_type(&self, query: &TypeQuery) -> Resolution<TypeName> {
        // Scoped entry first, then one that applies anywhere
        let scoped = (query.scope.clone(), query.expr.clone());
        let unscoped = (None, query.expr.clone());
        self.types
            .get(&scoped)
            .or_else(|| self.types.get(&unscoped))
            .map_or(Resolution::Unresolved(Unresolved::NotFound), Entry::answer)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
