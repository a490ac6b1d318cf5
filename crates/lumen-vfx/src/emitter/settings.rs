use serde::{Deserialize, Serialize};

use crate::error::{Result, VfxError, check_box, check_range};

/// How an emitter releases its particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpawnMode {
    /// Spread `count` particles evenly over `duration` seconds.
    #[default]
    Time,
    /// Release everything at once through [`Emitter::emit_at`](super::Emitter::emit_at).
    Burst,
}

/// Emitter configuration. Every `[min, max]` pair and min/max box is sampled
/// uniformly per particle and must satisfy `min <= max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterSettings {
    /// Seconds one time-mode cycle lasts.
    #[serde(default = "default_duration")]
    pub duration: f32,
    /// Particles per cycle (time mode) or per burst.
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub spawn_mode: SpawnMode,
    /// Time mode only: start the next cycle as soon as one completes.
    #[serde(default)]
    pub looping: bool,
    /// Seconds between `start_emitting` and the first particle.
    #[serde(default)]
    pub delay: f32,
    #[serde(default = "default_color_start")]
    pub color_start: Vec<String>,
    /// Empty means each particle keeps its start colour.
    #[serde(default)]
    pub color_end: Vec<String>,
    #[serde(default = "default_lifetime")]
    pub lifetime: [f32; 2],
    /// Speed magnitude along the direction.
    #[serde(default = "default_speed")]
    pub speed: [f32; 2],
    /// Uniform scale.
    #[serde(default = "default_size")]
    pub size: [f32; 2],
    #[serde(default = "default_position_min")]
    pub position_min: [f32; 3],
    #[serde(default = "default_position_max")]
    pub position_max: [f32; 3],
    #[serde(default)]
    pub rotation_min: [f32; 3],
    #[serde(default)]
    pub rotation_max: [f32; 3],
    #[serde(default)]
    pub rotation_speed_min: [f32; 3],
    #[serde(default)]
    pub rotation_speed_max: [f32; 3],
    #[serde(default)]
    pub direction_min: [f32; 3],
    #[serde(default)]
    pub direction_max: [f32; 3],
    /// Rotate the sampled direction by the emitter's world orientation.
    #[serde(default)]
    pub use_local_direction: bool,
    /// Particles play their life backwards, converging on the spawn point.
    #[serde(default)]
    pub reverse_age: bool,
}

fn default_duration() -> f32 {
    1.0
}
fn default_count() -> u32 {
    1000
}
fn default_color_start() -> Vec<String> {
    vec!["white".to_string(), "skyblue".to_string()]
}
fn default_lifetime() -> [f32; 2] {
    [0.1, 1.0]
}
fn default_speed() -> [f32; 2] {
    [5.0, 20.0]
}
fn default_size() -> [f32; 2] {
    [0.1, 1.0]
}
fn default_position_min() -> [f32; 3] {
    [-1.0; 3]
}
fn default_position_max() -> [f32; 3] {
    [1.0; 3]
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            count: default_count(),
            spawn_mode: SpawnMode::Time,
            looping: false,
            delay: 0.0,
            color_start: default_color_start(),
            color_end: Vec::new(),
            lifetime: default_lifetime(),
            speed: default_speed(),
            size: default_size(),
            position_min: default_position_min(),
            position_max: default_position_max(),
            rotation_min: [0.0; 3],
            rotation_max: [0.0; 3],
            rotation_speed_min: [0.0; 3],
            rotation_speed_max: [0.0; 3],
            direction_min: [0.0; 3],
            direction_max: [0.0; 3],
            use_local_direction: false,
            reverse_age: false,
        }
    }
}

impl EmitterSettings {
    pub fn validate(&self) -> Result<()> {
        if self.spawn_mode == SpawnMode::Time && !(self.duration > 0.0 && self.duration.is_finite())
        {
            return Err(VfxError::invalid(format!(
                "time-mode duration must be positive, got {}",
                self.duration
            )));
        }
        if !(self.delay >= 0.0 && self.delay.is_finite()) {
            return Err(VfxError::invalid(format!(
                "delay must be non-negative, got {}",
                self.delay
            )));
        }
        if self.color_start.is_empty() {
            return Err(VfxError::invalid("color_start palette is empty"));
        }
        check_range("lifetime", self.lifetime)?;
        if self.lifetime[0] <= 0.0 {
            return Err(VfxError::invalid(format!(
                "lifetime must be positive, got [{}, {}]",
                self.lifetime[0], self.lifetime[1]
            )));
        }
        check_range("speed", self.speed)?;
        if self.speed[0] < 0.0 {
            return Err(VfxError::invalid(
                "speed is a magnitude; use reverse_age to run particles backwards",
            ));
        }
        check_range("size", self.size)?;
        check_box("position", self.position_min, self.position_max)?;
        check_box("rotation", self.rotation_min, self.rotation_max)?;
        check_box(
            "rotation_speed",
            self.rotation_speed_min,
            self.rotation_speed_max,
        )?;
        check_box("direction", self.direction_min, self.direction_max)
    }
}
