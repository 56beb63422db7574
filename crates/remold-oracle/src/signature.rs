//! Callable references and signatures
//!
//! Provides [`CallableRef`], the question asked of an oracle, and
//! [`Signature`], the answer: declared parameters plus where the declaration
//! lives.

use remold_tree::Span;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Reference to a callable whose signature is wanted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableRef {
    /// Free function
    Function {
        /// Function name
        name: String,
    },
    /// Method of a class (instance or static)
    Method {
        /// Declaring or receiving class
        class: String,
        /// Method name
        name: String,
    },
    /// Constructor invoked by an instantiation
    Constructor {
        /// Instantiated class
        class: String,
    },
}

impl CallableRef {
    /// Create function reference
    #[inline]
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }

    /// Create method reference
    #[inline]
    #[must_use]
    pub fn method(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Method {
            class: class.into(),
            name: name.into(),
        }
    }

    /// Create constructor reference
    #[inline]
    #[must_use]
    pub fn constructor(class: impl Into<String>) -> Self {
        Self::Constructor {
            class: class.into(),
        }
    }
}

impl Display for CallableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CallableRef::Function { name } => write!(f, "{name}()"),
            CallableRef::Method { class, name } => write!(f, "{class}::{name}()"),
            CallableRef::Constructor { class } => write!(f, "{class}::__construct()"),
        }
    }
}

/// Question about the static type of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeQuery {
    /// Source file containing the expression
    pub file: Option<PathBuf>,
    /// Span reported by the parser
    pub span: Option<Span>,
    /// Class lexically enclosing the expression
    pub scope: Option<String>,
    /// Rendered expression, e.g. `$this->mock`
    pub expr: String,
}

impl TypeQuery {
    /// Create query for a rendered expression
    #[inline]
    #[must_use]
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            file: None,
            span: None,
            scope: None,
            expr: expr.into(),
        }
    }

    /// Set enclosing class
    #[inline]
    #[must_use]
    pub fn in_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Set source location
    #[inline]
    #[must_use]
    pub fn at(mut self, file: Option<PathBuf>, span: Option<Span>) -> Self {
        self.file = file;
        self.span = span;
        self
    }
}

/// Fully qualified class name produced by a type query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl TypeName {
    /// Class name text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare ignoring a leading namespace separator and ASCII case
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0
            .trim_start_matches('\\')
            .eq_ignore_ascii_case(other.trim_start_matches('\\'))
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name without sigil
    pub name: String,
    /// Position in the declaration
    pub position: usize,
    /// Has a default value
    #[serde(default)]
    pub optional: bool,
    /// Collects remaining arguments
    #[serde(default)]
    pub variadic: bool,
}

impl ParamSpec {
    /// Required parameter
    #[inline]
    #[must_use]
    pub fn required(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
            optional: false,
            variadic: false,
        }
    }

    /// Parameter with a default value
    #[inline]
    #[must_use]
    pub fn optional(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
            optional: true,
            variadic: false,
        }
    }

    /// Check if a caller must always supply this parameter
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.optional && !self.variadic
    }
}

/// Where a declaration lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationSite {
    /// Built into the language runtime; no source file
    Internal,
    /// Declared in a source file
    File(PathBuf),
}

impl DeclarationSite {
    /// Source file, if any
    #[inline]
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        match self {
            DeclarationSite::Internal => None,
            DeclarationSite::File(path) => Some(path),
        }
    }
}

/// Declared signature of a callable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in the order the oracle reports them
    pub params: Vec<ParamSpec>,
    /// Declaration site
    pub site: DeclarationSite,
}

impl Signature {
    /// Create new signature
    #[inline]
    #[must_use]
    pub fn new(params: Vec<ParamSpec>, site: DeclarationSite) -> Self {
        Self { params, site }
    }

    /// Number of declared parameters
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check if positions form a permutation of `0..arity`
    #[must_use]
    pub fn has_consistent_positions(&self) -> bool {
        let mut seen = vec![false; self.params.len()];
        self.params.iter().all(|param| match seen.get_mut(param.position) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        })
    }

    /// Positions in the order the language expects them: required parameters
    /// first, then optional and variadic ones, each group keeping its relative
    /// order
    #[must_use]
    pub fn required_first_order(&self) -> Vec<usize> {
        let (required, rest): (Vec<&ParamSpec>, Vec<&ParamSpec>) =
            self.params.iter().partition(|param| param.is_required());
        required
            .into_iter()
            .chain(rest)
            .map(|param| param.position)
            .collect()
    }
}
