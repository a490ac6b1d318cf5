use serde::{Deserialize, Serialize};

use crate::easing::EaseFunction;
use crate::error::{Result, VfxError, check_range};

/// How each instance is oriented in the vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Instance rotation applied to the base geometry in world space.
    #[default]
    Mesh,
    /// Quad always faces the camera; only roll survives.
    Billboard,
    /// Camera-facing quad stretched along the particle's velocity.
    StretchBillboard,
}

impl RenderMode {
    pub fn as_u32(self) -> u32 {
        match self {
            RenderMode::Mesh => 0,
            RenderMode::Billboard => 1,
            RenderMode::StretchBillboard => 2,
        }
    }

    /// Billboards ignore pitch and yaw of the initial rotation.
    pub fn is_billboard(self) -> bool {
        !matches!(self, RenderMode::Mesh)
    }
}

/// Fragment footprint when no alpha mask is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppearanceMode {
    #[default]
    Square,
    Circular,
}

impl AppearanceMode {
    pub fn as_u32(self) -> u32 {
        match self {
            AppearanceMode::Square => 0,
            AppearanceMode::Circular => 1,
        }
    }
}

/// Framebuffer blend equation for the pool's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    None,
    Normal,
    #[default]
    Additive,
    Subtractive,
    Multiply,
}

/// Uniform-level parameters that may be tuned while the pool is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingParams {
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default = "default_stretch_scale")]
    pub stretch_scale: f32,
    /// Progress at which size has grown in (x) and starts shrinking out (y).
    #[serde(default = "default_fade_size")]
    pub fade_size: [f32; 2],
    /// Progress at which alpha has faded in (x) and starts fading out (y).
    #[serde(default = "default_fade_alpha")]
    pub fade_alpha: [f32; 2],
    #[serde(default)]
    pub gravity: [f32; 3],
    #[serde(default)]
    pub appearance: AppearanceMode,
    /// Curve name (`"easeOutQuad"`) or catalog index (`14`).
    #[serde(default, deserialize_with = "crate::easing::deserialize_name_or_index")]
    pub easing: EaseFunction,
}

fn default_intensity() -> f32 {
    1.0
}
fn default_stretch_scale() -> f32 {
    1.0
}
fn default_fade_size() -> [f32; 2] {
    [0.1, 0.9]
}
fn default_fade_alpha() -> [f32; 2] {
    [0.0, 1.0]
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            intensity: default_intensity(),
            stretch_scale: default_stretch_scale(),
            fade_size: default_fade_size(),
            fade_alpha: default_fade_alpha(),
            gravity: [0.0; 3],
            appearance: AppearanceMode::Square,
            easing: EaseFunction::EaseLinear,
        }
    }
}

impl ShadingParams {
    pub fn validate(&self) -> Result<()> {
        if !self.intensity.is_finite() || self.intensity < 0.0 {
            return Err(VfxError::invalid(format!(
                "intensity must be a non-negative number, got {}",
                self.intensity
            )));
        }
        if !self.stretch_scale.is_finite() || self.stretch_scale < 0.0 {
            return Err(VfxError::invalid(format!(
                "stretch_scale must be a non-negative number, got {}",
                self.stretch_scale
            )));
        }
        check_unit_range("fade_size", self.fade_size)?;
        check_unit_range("fade_alpha", self.fade_alpha)?;
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(VfxError::invalid("gravity must be finite"));
        }
        Ok(())
    }
}

fn check_unit_range(name: &str, range: [f32; 2]) -> Result<()> {
    check_range(name, range)?;
    if range[0] < 0.0 || range[1] > 1.0 {
        return Err(VfxError::invalid(format!(
            "{name}: bounds must lie in [0, 1], got [{}, {}]",
            range[0], range[1]
        )));
    }
    Ok(())
}

/// Construction-time configuration of a particle pool.
///
/// `capacity` is a correctness setting, not only a performance one: once more
/// than `capacity` particles are alive at the same time, the oldest are
/// overwritten while still visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default = "default_true")]
    pub frustum_culled: bool,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(flatten)]
    pub shading: ShadingParams,
}

fn default_capacity() -> u32 {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            render_mode: RenderMode::Mesh,
            frustum_culled: true,
            blend_mode: BlendMode::Additive,
            shading: ShadingParams::default(),
        }
    }
}

impl PoolSettings {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(VfxError::invalid("pool capacity must be at least 1"));
        }
        self.shading.validate()
    }
}
