//! The oracle trait and its answers

use crate::signature::{CallableRef, Signature, TypeName, TypeQuery};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Why an oracle could not answer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unresolved {
    /// Nothing known about the subject
    NotFound,
    /// More than one candidate matches
    Ambiguous,
    /// Backend failed; the same question may succeed later
    Backend(String),
}

impl Unresolved {
    /// Check if asking again cannot produce a different answer
    #[inline]
    #[must_use]
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Unresolved::Backend(_))
    }
}

impl Display for Unresolved {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Unresolved::NotFound => f.write_str("not found"),
            Unresolved::Ambiguous => f.write_str("ambiguous"),
            Unresolved::Backend(message) => write!(f, "backend failure: {message}"),
        }
    }
}

/// Answer to an oracle query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution<T> {
    /// Definite answer
    Resolved(T),
    /// No usable answer
    Unresolved(Unresolved),
}

impl<T> Resolution<T> {
    /// Resolved value, if any
    #[inline]
    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Unresolved(_) => None,
        }
    }

    /// Borrow the resolved value
    #[inline]
    #[must_use]
    pub fn as_ref(&self) -> Resolution<&T> {
        match self {
            Resolution::Resolved(value) => Resolution::Resolved(value),
            Resolution::Unresolved(reason) => Resolution::Unresolved(reason.clone()),
        }
    }

    /// Check if resolved
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Check if this answer may be reused for the same question
    #[inline]
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        match self {
            Resolution::Resolved(_) => true,
            Resolution::Unresolved(reason) => reason.is_definitive(),
        }
    }
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Resolution::Unresolved(Unresolved::NotFound), Resolution::Resolved)
    }
}

/// Source of semantic facts about the code being rewritten
///
/// Implementations must be safe to query from several traversals at once and
/// must answer the same question the same way for the duration of a run.
/// Failures are answers ([`Unresolved`]), never panics.
pub trait SemanticOracle: Send + Sync {
    /// Declared signature of a callable
    fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature>;

    /// Static class type of an expression
    fn resolve_type(&self, _query: &TypeQuery) -> Resolution<TypeName> {
        Resolution::Unresolved(Unresolved::NotFound)
    }

    /// Oracle name for logs
    fn name(&self) -> &str {
        "oracle"
    }
}

impl<O: SemanticOracle + ?Sized> SemanticOracle for &O {
    fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature> {
        (**self).resolve_signature(callable)
    }

    fn resolve_type(&self, query: &TypeQuery) -> Resolution<TypeName> {
        (**self).resolve_type(query)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<O: SemanticOracle + ?Sized> SemanticOracle for Arc<O> {
    fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature> {
        (**self).resolve_signature(callable)
    }

    fn resolve_type(&self, query: &TypeQuery) -> Resolution<TypeName> {
        (**self).resolve_type(query)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<O: SemanticOracle + ?Sized> SemanticOracle for Box<O> {
    fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature> {
        (**self).resolve_signature(callable)
    }

    fn resolve_type(&self, query: &TypeQuery) -> Resolution<TypeName> {
        (**self).resolve_type(query)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Oracle that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl SemanticOracle for NullOracle {
    fn resolve_signature(&self, _callable: &CallableRef) -> Resolution<Signature> {
        Resolution::Unresolved(Unresolved::NotFound)
    }

    fn name(&self) -> &str {
        "null"
    }
}
