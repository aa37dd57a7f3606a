use thiserror::Error;

/// Result type used throughout the flow core
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors raised by the potential-flow core
#[derive(Error, Debug)]
pub enum FlowError {
    /// Sampling domain has inverted bounds
    #[error("invalid domain: {axis}min ({min}) is greater than {axis}max ({max})")]
    Domain { axis: char, min: f64, max: f64 },

    /// Dense panel system could not be solved
    #[error("panel system of size {size}x{size} is singular")]
    Solve { size: usize },

    /// Panel body definition is unusable
    #[error("invalid panel geometry: {0}")]
    Geometry(String),

    /// A parameter is outside its allowed range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An iterative procedure hit its iteration cap
    #[error("{what} did not converge after {iterations} iterations (residual {residual:e})")]
    NoConvergence {
        what: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        FlowError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Reject NaN and infinite parameters before they reach an evaluator
pub fn ensure_finite(name: &'static str, value: f64) -> FlowResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FlowError::invalid(name, format!("expected a finite value, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_names_the_axis() {
        let err = FlowError::Domain {
            axis: 'y',
            min: 2.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid domain: ymin (2) is greater than ymax (1)"
        );
    }

    #[test]
    fn finite_check_rejects_nan() {
        assert!(ensure_finite("strength", 1.5).is_ok());
        assert!(matches!(
            ensure_finite("strength", f64::NAN),
            Err(FlowError::InvalidParameter { name: "strength", .. })
        ));
    }
}
