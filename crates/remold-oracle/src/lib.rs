//! remold Oracle
//!
//! Client side of the semantic-resolution oracle: the questions rules may ask
//! about code outside the node they are rewriting, and the answers.
//!
//! # Overview
//!
//! - **SemanticOracle**: Signature and receiver-type queries; failures are
//!   answers ([`Unresolved`]), so callers decline instead of guessing
//! - **CachedOracle**: Bounded memoization in front of any oracle
//! - **InMemoryOracle**: Table-backed oracle loaded from JSON
//! - **OwnershipPolicy**: Which declaration sites belong to the project
//!
//! # Example
//!
//! ```rust
//! use remold_oracle::{
//!     CallableRef, CachedOracle, DeclarationSite, InMemoryOracle, OwnershipPolicy, ParamSpec,
//!     SemanticOracle, Signature,
//! };
//!
//! let oracle = InMemoryOracle::new().with_signature(
//!     CallableRef::method("SomeObject", "run"),
//!     Signature::new(
//!         vec![ParamSpec::optional("optional", 0), ParamSpec::required("required", 1)],
//!         DeclarationSite::File("src/SomeObject.php".into()),
//!     ),
//! );
//! let oracle = CachedOracle::new(oracle, 1_000);
//!
//! let sig = oracle
//!     .resolve_signature(&CallableRef::method("SomeObject", "run"))
//!     .ok()
//!     .unwrap();
//! assert!(OwnershipPolicy::default().owns(&sig.site));
//! assert_eq!(sig.required_first_order(), vec![1, 0]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cache;
mod error;
mod memory;
mod oracle;
mod ownership;
mod signature;

// Re-exports
pub use cache::{CachedOracle, OracleStats};
pub use error::OracleError;
pub use memory::InMemoryOracle;
pub use oracle::{NullOracle, Resolution, SemanticOracle, Unresolved};
pub use ownership::OwnershipPolicy;
pub use signature::{CallableRef, DeclarationSite, ParamSpec, Signature, TypeName, TypeQuery};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
