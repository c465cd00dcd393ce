//! Result type alias for Strata

use super::errors::EtlError;

/// Result type alias for Strata operations
///
/// # Examples
///
/// ```
/// use strata::domain::result::Result;
/// use strata::domain::errors::EtlError;
///
/// fn failing_function() -> Result<()> {
///     Err(EtlError::Transform("unknown column".to_string()))
/// }
///
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, EtlError>;
