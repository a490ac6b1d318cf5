//! Built-in effect shown when no effect file is given.

use lumen_vfx::easing::EaseFunction;
use lumen_vfx::effect::{EffectDef, EmitterDef, PoolDef};
use lumen_vfx::pool::{AppearanceMode, BlendMode, RenderMode, ShadingParams};
use lumen_vfx::{EmitterSettings, PoolSettings, SpawnMode};

/// Seconds between smoke puffs.
pub const BURST_INTERVAL: f32 = 2.0;

fn palette(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

pub fn builtin_effect() -> EffectDef {
    let sparks = PoolDef {
        name: "sparks".into(),
        settings: PoolSettings {
            capacity: 20_000,
            render_mode: RenderMode::StretchBillboard,
            blend_mode: BlendMode::Additive,
            shading: ShadingParams {
                intensity: 3.0,
                stretch_scale: 0.6,
                fade_size: [0.0, 0.0],
                fade_alpha: [0.0, 0.0],
                gravity: [0.0, -9.8, 0.0],
                appearance: AppearanceMode::Circular,
                ..Default::default()
            },
            ..Default::default()
        },
    };

    let smoke = PoolDef {
        name: "smoke".into(),
        settings: PoolSettings {
            capacity: 4_000,
            render_mode: RenderMode::Billboard,
            blend_mode: BlendMode::Normal,
            shading: ShadingParams {
                fade_size: [0.05, 0.7],
                fade_alpha: [0.1, 0.6],
                gravity: [0.0, 0.6, 0.0],
                appearance: AppearanceMode::Circular,
                easing: EaseFunction::EaseOutQuad,
                ..Default::default()
            },
            ..Default::default()
        },
    };

    let fountain = EmitterDef {
        pool: "sparks".into(),
        position: [0.0; 3],
        rotation: [0.0; 3],
        autostart: true,
        seed: None,
        settings: EmitterSettings {
            looping: true,
            duration: 1.0,
            count: 100,
            position_min: [-0.1; 3],
            position_max: [0.1; 3],
            direction_min: [-1.0, 0.0, -1.0],
            direction_max: [1.0, 1.0, 1.0],
            size: [0.01, 0.25],
            speed: [1.0, 12.0],
            color_start: palette(&["white", "skyblue"]),
            color_end: palette(&["white", "pink"]),
            ..Default::default()
        },
    };

    let puff = EmitterDef {
        pool: "smoke".into(),
        position: [0.0, 1.0, 0.0],
        rotation: [0.0; 3],
        autostart: true,
        seed: None,
        settings: EmitterSettings {
            spawn_mode: SpawnMode::Burst,
            count: 200,
            lifetime: [0.8, 2.0],
            position_min: [-0.3; 3],
            position_max: [0.3; 3],
            rotation_min: [0.0, 0.0, -3.1],
            rotation_max: [0.0, 0.0, 3.1],
            rotation_speed_min: [0.0, 0.0, -1.0],
            rotation_speed_max: [0.0, 0.0, 1.0],
            direction_min: [-1.0; 3],
            direction_max: [1.0; 3],
            size: [0.3, 0.9],
            speed: [0.5, 2.5],
            color_start: palette(&["orange", "gold", "#ffdd88"]),
            color_end: palette(&["dimgray", "darkslategray"]),
            ..Default::default()
        },
    };

    EffectDef {
        name: "builtin".into(),
        pools: vec![sparks, smoke],
        emitters: vec![fountain, puff],
    }
}

#[cfg(test)]
mod tests {
    use lumen_vfx::VfxManager;

    use super::*;

    #[test]
    fn builtin_effect_loads() {
        let mut manager = VfxManager::new();
        let loaded = manager.load_effect(&builtin_effect()).unwrap();
        assert_eq!(loaded.pools.len(), 2);
        assert_eq!(loaded.emitters.len(), 2);
    }
}
