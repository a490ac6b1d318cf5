use thiserror::Error;

/// Errors surfaced by pools, emitters, the manager and effect loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VfxError {
    /// Settings rejected at construction (zero capacity, `min > max`, ...).
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The call is not allowed in the current state. Nothing was changed.
    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),

    /// A palette entry that is neither a CSS colour name nor a hex colour.
    #[error("Unknown color: '{0}'")]
    UnknownColor(String),

    /// Effect file or alpha-mask image could not be read or decoded.
    #[error("Asset load error: {0}")]
    AssetLoad(String),
}

impl VfxError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Build a precondition violation and log it where it was detected.
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("{msg}");
        Self::PreconditionViolation(msg)
    }
}

/// Result type using VfxError
pub type Result<T> = std::result::Result<T, VfxError>;

/// Reject a `[min, max]` pair whose bounds are reversed or not finite.
pub(crate) fn check_range(name: &str, range: [f32; 2]) -> Result<()> {
    let [min, max] = range;
    if !min.is_finite() || !max.is_finite() {
        return Err(VfxError::invalid(format!(
            "{name}: bounds must be finite, got [{min}, {max}]"
        )));
    }
    if min > max {
        return Err(VfxError::invalid(format!(
            "{name}: min {min} is greater than max {max}"
        )));
    }
    Ok(())
}

/// Component-wise `check_range` for min/max boxes.
pub(crate) fn check_box(name: &str, min: [f32; 3], max: [f32; 3]) -> Result<()> {
    for (axis, label) in ["x", "y", "z"].iter().enumerate() {
        check_range(&format!("{name}.{label}"), [min[axis], max[axis]])?;
    }
    Ok(())
}
