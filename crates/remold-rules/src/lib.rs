//! remold Rules
//!
//! Reference rewrite rules and the default registry.
//!
//! - [`SpecificWillMethod`]: `with(equalTo($x))` and `will(returnX(..))`
//!   expectations become their dedicated forms inside test classes
//! - [`OptionalParamsAfterRequired`]: required parameters move before optional
//!   ones in owned declarations and their call sites
//!
//! # Example
//!
//! ```rust
//! use remold_engine::EngineConfig;
//! use remold_rules::default_registry;
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     [rules.specific-will-method]
//!     matcher = "identicalTo"
//!     "#,
//! )
//! .unwrap();
//! let registry = default_registry(&config).unwrap();
//! assert_eq!(registry.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod optional_params_after_required;
mod specific_will_method;

// Re-exports
pub use optional_params_after_required::OptionalParamsAfterRequired;
pub use specific_will_method::{SpecificWillMethod, SpecificWillOptions};

use remold_engine::{ConfigError, EngineConfig, RuleRegistry};

/// Registry of every reference rule, configured from `config`
///
/// Rule selection (`[rules] enabled`) is left to the driver.
///
/// # Errors
/// Returns [`ConfigError::RuleOptions`] if a rule's options table is malformed
pub fn default_registry(config: &EngineConfig) -> Result<RuleRegistry, ConfigError> {
    let will_options: SpecificWillOptions = config.rules.options(SpecificWillMethod::ID.as_str())?;
    let registry = RuleRegistry::new()
        .with(SpecificWillMethod::with_options(will_options))
        .with(OptionalParamsAfterRequired::new(config.ownership.clone()));
    tracing::debug!(rules = registry.len(), "built default registry");
    Ok(registry)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use remold_tree::RuleId;

    #[test]
    fn registry_order_is_stable() {
        let registry = default_registry(&EngineConfig::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                RuleId::new("specific-will-method"),
                RuleId::new("optional-params-after-required"),
            ]
        );
    }

    #[test]
    fn rule_options_come_from_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            [rules.specific-will-method]
            receiver_type = "PHPUnit\\Framework\\MockObject\\Builder\\InvocationMocker"

            [rules.specific-will-method.renames]
            returnValue = "willReturn"
            "#,
        )
        .unwrap();
        let registry = default_registry(&config).unwrap();
        assert!(registry.contains("specific-will-method"));

        let options: SpecificWillOptions = config.rules.options("specific-will-method").unwrap();
        assert_eq!(options.matcher, "equalTo");
        assert_eq!(options.renames.len(), 1);
        assert_eq!(
            options.receiver_type.as_deref(),
            Some("PHPUnit\\Framework\\MockObject\\Builder\\InvocationMocker")
        );
    }

    #[test]
    fn malformed_options_are_rejected() {
        let config = EngineConfig::from_toml_str(
            r#"
            [rules.specific-will-method]
            matcher = 3
            "#,
        )
        .unwrap();
        assert!(matches!(
            default_registry(&config),
            Err(ConfigError::RuleOptions { .. })
        ));
    }
}
