//! Easing catalog shared with the particle shader.
//!
//! The shader selects a curve by its position in [`EaseFunction::ALL`]; the
//! order is part of the GPU contract and must match `particle.wgsl`.

use std::f32::consts::PI;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, VfxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EaseFunction {
    #[default]
    EaseLinear,
    EaseInPower1,
    EaseOutPower1,
    EaseInOutPower1,
    EaseInPower2,
    EaseOutPower2,
    EaseInOutPower2,
    EaseInPower3,
    EaseOutPower3,
    EaseInOutPower3,
    EaseInPower4,
    EaseOutPower4,
    EaseInOutPower4,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

/// Which end of the curve the shape is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Linear,
    /// `t^exponent`. PowerN follows the GSAP naming, so Power1 is quadratic.
    Power(i32),
    Sine,
    Expo,
    Circ,
    Elastic,
    Back,
    Bounce,
}

impl EaseFunction {
    pub const ALL: [EaseFunction; 43] = [
        EaseFunction::EaseLinear,
        EaseFunction::EaseInPower1,
        EaseFunction::EaseOutPower1,
        EaseFunction::EaseInOutPower1,
        EaseFunction::EaseInPower2,
        EaseFunction::EaseOutPower2,
        EaseFunction::EaseInOutPower2,
        EaseFunction::EaseInPower3,
        EaseFunction::EaseOutPower3,
        EaseFunction::EaseInOutPower3,
        EaseFunction::EaseInPower4,
        EaseFunction::EaseOutPower4,
        EaseFunction::EaseInOutPower4,
        EaseFunction::EaseInQuad,
        EaseFunction::EaseOutQuad,
        EaseFunction::EaseInOutQuad,
        EaseFunction::EaseInCubic,
        EaseFunction::EaseOutCubic,
        EaseFunction::EaseInOutCubic,
        EaseFunction::EaseInQuart,
        EaseFunction::EaseOutQuart,
        EaseFunction::EaseInOutQuart,
        EaseFunction::EaseInQuint,
        EaseFunction::EaseOutQuint,
        EaseFunction::EaseInOutQuint,
        EaseFunction::EaseInSine,
        EaseFunction::EaseOutSine,
        EaseFunction::EaseInOutSine,
        EaseFunction::EaseInExpo,
        EaseFunction::EaseOutExpo,
        EaseFunction::EaseInOutExpo,
        EaseFunction::EaseInCirc,
        EaseFunction::EaseOutCirc,
        EaseFunction::EaseInOutCirc,
        EaseFunction::EaseInElastic,
        EaseFunction::EaseOutElastic,
        EaseFunction::EaseInOutElastic,
        EaseFunction::EaseInBack,
        EaseFunction::EaseOutBack,
        EaseFunction::EaseInOutBack,
        EaseFunction::EaseInBounce,
        EaseFunction::EaseOutBounce,
        EaseFunction::EaseInOutBounce,
    ];

    /// Index uploaded to the shader.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Result<Self> {
        Self::ALL.get(index as usize).copied().ok_or_else(|| {
            VfxError::invalid(format!(
                "easing index {index} is outside the catalog (0..{})",
                Self::ALL.len()
            ))
        })
    }

    fn shape(self) -> (Shape, Phase) {
        let i = self.index();
        if i == 0 {
            return (Shape::Linear, Phase::In);
        }
        let group = (i - 1) / 3;
        let phase = match (i - 1) % 3 {
            0 => Phase::In,
            1 => Phase::Out,
            _ => Phase::InOut,
        };
        let shape = match group {
            0..=3 => Shape::Power(group as i32 + 2),
            4..=7 => Shape::Power(group as i32 - 2),
            8 => Shape::Sine,
            9 => Shape::Expo,
            10 => Shape::Circ,
            11 => Shape::Elastic,
            12 => Shape::Back,
            _ => Shape::Bounce,
        };
        (shape, phase)
    }

    /// Evaluate the curve at `t` in `[0, 1]`, as the vertex shader does.
    /// Host-facing: lets tools preview a pool's size and alpha envelope
    /// without a GPU.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let (shape, phase) = self.shape();
        match phase {
            Phase::In => ease_in(shape, t),
            Phase::Out => ease_out(shape, t),
            Phase::InOut => ease_in_out(shape, t),
        }
    }
}

/// An easing in a settings file: a camelCase name or a catalog index.
#[derive(Deserialize)]
#[serde(untagged)]
enum EaseRef {
    Index(u32),
    Name(EaseFunction),
}

/// `deserialize_with` helper accepting either form of [`EaseRef`]. Indices
/// are bounds-checked against the catalog.
pub(crate) fn deserialize_name_or_index<'de, D>(
    deserializer: D,
) -> std::result::Result<EaseFunction, D::Error>
where
    D: Deserializer<'de>,
{
    match EaseRef::deserialize(deserializer)? {
        EaseRef::Name(f) => Ok(f),
        EaseRef::Index(i) => EaseFunction::from_index(i).map_err(serde::de::Error::custom),
    }
}

fn ease_in(shape: Shape, t: f32) -> f32 {
    match shape {
        Shape::Linear => t,
        Shape::Power(p) => t.powi(p),
        Shape::Sine => 1.0 - (t * PI / 2.0).cos(),
        Shape::Expo => {
            if t == 0.0 {
                0.0
            } else {
                2f32.powf(10.0 * t - 10.0)
            }
        }
        Shape::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        Shape::Elastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                let c4 = 2.0 * PI / 3.0;
                -(2f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
            }
        }
        Shape::Back => {
            let c1 = 1.70158;
            let c3 = c1 + 1.0;
            c3 * t * t * t - c1 * t * t
        }
        Shape::Bounce => 1.0 - bounce_out(1.0 - t),
    }
}

fn ease_out(shape: Shape, t: f32) -> f32 {
    match shape {
        Shape::Bounce => bounce_out(t),
        _ => 1.0 - ease_in(shape, 1.0 - t),
    }
}

fn ease_in_out(shape: Shape, t: f32) -> f32 {
    match shape {
        Shape::Elastic => {
            if t == 0.0 || t == 1.0 {
                return t;
            }
            let c5 = 2.0 * PI / 4.5;
            let s = ((20.0 * t - 11.125) * c5).sin();
            if t < 0.5 {
                -(2f32.powf(20.0 * t - 10.0) * s) / 2.0
            } else {
                2f32.powf(-20.0 * t + 10.0) * s / 2.0 + 1.0
            }
        }
        Shape::Back => {
            let c2 = 1.70158 * 1.525;
            if t < 0.5 {
                (2.0 * t).powi(2) * ((c2 + 1.0) * 2.0 * t - c2) / 2.0
            } else {
                ((2.0 * t - 2.0).powi(2) * ((c2 + 1.0) * (t * 2.0 - 2.0) + c2) + 2.0) / 2.0
            }
        }
        _ => {
            if t < 0.5 {
                ease_in(shape, 2.0 * t) / 2.0
            } else {
                1.0 - ease_in(shape, 2.0 - 2.0 * t) / 2.0
            }
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    let n1 = 7.5625;
    let d1 = 2.75;
    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984_375
    }
}
