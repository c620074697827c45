//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::analysis::AnalysisConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 30,
            ValidationError::ParseError(_) => 31,
            ValidationError::SemanticError(_) => 32,
            ValidationError::InvalidValue { .. } => 33,
            ValidationError::VersionMismatch { .. } => 34,
        }
    }

    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for dpl_common::Error {
    fn from(err: ValidationError) -> Self {
        dpl_common::Error::Config(err.to_string())
    }
}

/// Which settings a command reads, and so which ones must be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    /// Everything, including the threshold grid (`curve`, `decompose`, `check`).
    Full,
    /// Integration never builds a grid, so `grid.*` is not checked.
    Integration,
}

/// Validate an analysis configuration semantically.
pub fn validate_analysis(config: &AnalysisConfig) -> ValidationResult<()> {
    validate_scoped(config, ValidationScope::Full)
}

/// Validate only what a command in `scope` uses.
pub fn validate_scoped(config: &AnalysisConfig, scope: ValidationScope) -> ValidationResult<()> {
    // Same major version is compatible.
    let major = |v: &str| v.split('.').next().map(str::to_string);
    if major(&config.schema_version) != major(crate::CONFIG_SCHEMA_VERSION) {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if scope == ValidationScope::Full {
        validate_grid(config)?;
    }

    if config.targets.is_empty() {
        return Err(ValidationError::invalid("targets", "Must name at least one class"));
    }

    if config.bins == 0 {
        return Err(ValidationError::invalid("bins", "Must be at least 1"));
    }

    config
        .quadrature
        .check()
        .map_err(|msg| ValidationError::invalid("quadrature", msg))?;

    if let Some(grouping) = &config.grouping {
        grouping
            .validate()
            .map_err(|e| ValidationError::invalid("grouping", e.to_string()))?;
    }

    Ok(())
}

fn validate_grid(config: &AnalysisConfig) -> ValidationResult<()> {
    if config.grid.points == 0 {
        return Err(ValidationError::invalid("grid.points", "Must be at least 1"));
    }
    if !config.grid.include_endpoints && config.grid.points < 3 {
        return Err(ValidationError::invalid(
            "grid.points",
            format!(
                "Need at least 3 points to leave interior thresholds, got {}",
                config.grid.points
            ),
        ));
    }

    if !config.weight.is_bounded() && config.grid.include_endpoints {
        return Err(ValidationError::SemanticError(format!(
            "weight '{}' is undefined at thresholds 0 and 1; set grid.include_endpoints = false",
            config.weight
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_common::FeatureGrouping;
    use dpl_math::StandardWeight;

    #[test]
    fn test_defaults_are_valid() {
        validate_analysis(&AnalysisConfig::default()).unwrap();
    }

    #[test]
    fn test_entropy_with_endpoints_rejected() {
        let mut cfg = AnalysisConfig {
            weight: StandardWeight::Entropy,
            ..AnalysisConfig::default()
        };
        let err = validate_analysis(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::SemanticError(_)));
        assert_eq!(err.code(), 32);

        cfg.grid.include_endpoints = false;
        validate_analysis(&cfg).unwrap();
    }

    #[test]
    fn test_integration_scope_ignores_grid() {
        let mut cfg = AnalysisConfig {
            weight: StandardWeight::Entropy,
            ..AnalysisConfig::default()
        };
        validate_scoped(&cfg, ValidationScope::Integration).unwrap();

        cfg.grid.points = 2;
        cfg.grid.include_endpoints = false;
        validate_scoped(&cfg, ValidationScope::Integration).unwrap();
        assert!(validate_scoped(&cfg, ValidationScope::Full).is_err());

        // everything else still applies
        cfg.bins = 0;
        assert!(matches!(
            validate_scoped(&cfg, ValidationScope::Integration),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "bins"
        ));
    }

    #[test]
    fn test_version_mismatch() {
        let cfg = AnalysisConfig {
            schema_version: "2.0.0".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            validate_analysis(&cfg),
            Err(ValidationError::VersionMismatch { .. })
        ));
        let minor = AnalysisConfig {
            schema_version: "1.4.0".to_string(),
            ..AnalysisConfig::default()
        };
        validate_analysis(&minor).unwrap();
    }

    #[test]
    fn test_field_checks() {
        let mut cfg = AnalysisConfig::default();
        cfg.bins = 0;
        assert!(matches!(
            validate_analysis(&cfg),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "bins"
        ));

        let mut cfg = AnalysisConfig::default();
        cfg.targets.clear();
        assert!(validate_analysis(&cfg).is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.grid.points = 2;
        cfg.grid.include_endpoints = false;
        assert!(validate_analysis(&cfg).is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.grouping = Some(FeatureGrouping::numeric("age", vec![5.0]));
        assert!(validate_analysis(&cfg).is_err());
    }

    #[test]
    fn test_into_common_error() {
        let err: dpl_common::Error = ValidationError::ParseError("bad".to_string()).into();
        assert_eq!(err.code(), 30);
    }
}
