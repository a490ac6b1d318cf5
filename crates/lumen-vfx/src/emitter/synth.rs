use glam::Vec3;
use rand::Rng;

use super::settings::EmitterSettings;
use crate::color::Rgb;
use crate::pool::{Lifetime, ParticleRecord};
use crate::transform::WorldPose;

/// Per-batch particle generator. The emitter pose and the birth time are
/// captured once; every call to [`ParticleSynth::sample`] draws fresh values
/// for each configured range.
pub struct ParticleSynth<'a> {
    pub settings: &'a EmitterSettings,
    pub color_start: &'a [Rgb],
    pub color_end: &'a [Rgb],
    pub pose: WorldPose,
    pub birth_time: f32,
}

impl ParticleSynth<'_> {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParticleRecord {
        let s = self.settings;
        let size = rand_float(rng, s.size);
        let mut direction = rand_vec3(rng, s.direction_min, s.direction_max);
        if s.use_local_direction {
            direction = self.pose.orientation * direction;
        }

        let color_start = pick(rng, self.color_start);
        let color_end = if self.color_end.is_empty() {
            color_start
        } else {
            pick(rng, self.color_end)
        };

        ParticleRecord {
            position: self.pose.position + rand_vec3(rng, s.position_min, s.position_max),
            rotation: rand_vec3(rng, s.rotation_min, s.rotation_max),
            scale: Vec3::splat(size),
            direction,
            rotation_speed: rand_vec3(rng, s.rotation_speed_min, s.rotation_speed_max),
            lifetime: Lifetime {
                start: self.birth_time,
                duration: rand_float(rng, s.lifetime),
            },
            color_start,
            color_end,
            speed: rand_float(rng, s.speed),
            reverse_age: s.reverse_age,
        }
    }
}

/// Uniform sample in `[min, max]`; returns `min` for a degenerate range.
pub fn rand_float<R: Rng + ?Sized>(rng: &mut R, [min, max]: [f32; 2]) -> f32 {
    (min + rng.r#gen::<f32>() * (max - min)).min(max)
}

fn rand_vec3<R: Rng + ?Sized>(rng: &mut R, min: [f32; 3], max: [f32; 3]) -> Vec3 {
    Vec3::new(
        rand_float(rng, [min[0], max[0]]),
        rand_float(rng, [min[1], max[1]]),
        rand_float(rng, [min[2], max[2]]),
    )
}

fn pick<R: Rng + ?Sized>(rng: &mut R, palette: &[Rgb]) -> Rgb {
    palette[rng.gen_range(0..palette.len())]
}
