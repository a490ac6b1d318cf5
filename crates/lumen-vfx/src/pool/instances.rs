use std::ops::Range;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::color::Rgb;

/// Birth time and lifespan of one particle, both in simulation seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lifetime {
    pub start: f32,
    pub duration: f32,
}

/// Everything the pool stores for one particle.
///
/// Motion is not simulated: the shader extrapolates position from
/// `direction`, `speed`, the pool gravity and the particle's age.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub position: Vec3,
    /// Euler angles (XYZ order, radians).
    pub rotation: Vec3,
    pub scale: Vec3,
    pub direction: Vec3,
    pub rotation_speed: Vec3,
    pub lifetime: Lifetime,
    pub color_start: Rgb,
    pub color_end: Rgb,
    /// Speed magnitude along `direction`. Never negative.
    pub speed: f32,
    /// Play the particle's life backwards: it is born at the end of its path
    /// and travels back towards its spawn point.
    pub reverse_age: bool,
}

impl Default for ParticleRecord {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            direction: Vec3::ZERO,
            rotation_speed: Vec3::ZERO,
            lifetime: Lifetime::default(),
            color_start: [1.0; 3],
            color_end: [1.0; 3],
            speed: 0.0,
            reverse_age: false,
        }
    }
}

/// One per-instance vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceAttribute {
    /// Composed TRS matrix, column-major.
    Matrix,
    ColorStart,
    ColorEnd,
    Direction,
    /// `(start, duration)`
    Lifetime,
    /// `(magnitude, reverse)` with reverse encoded as 0.0 or 1.0.
    Speed,
    RotationSpeed,
}

impl InstanceAttribute {
    pub const ALL: [InstanceAttribute; 7] = [
        InstanceAttribute::Matrix,
        InstanceAttribute::ColorStart,
        InstanceAttribute::ColorEnd,
        InstanceAttribute::Direction,
        InstanceAttribute::Lifetime,
        InstanceAttribute::Speed,
        InstanceAttribute::RotationSpeed,
    ];

    /// Floats per instance.
    pub fn item_size(self) -> usize {
        match self {
            InstanceAttribute::Matrix => 16,
            InstanceAttribute::Lifetime | InstanceAttribute::Speed => 2,
            _ => 3,
        }
    }

    pub fn stride_bytes(self) -> u64 {
        (self.item_size() * std::mem::size_of::<f32>()) as u64
    }

    pub fn label(self) -> &'static str {
        match self {
            InstanceAttribute::Matrix => "instance-matrix",
            InstanceAttribute::ColorStart => "instance-color",
            InstanceAttribute::ColorEnd => "instance-color-end",
            InstanceAttribute::Direction => "instance-direction",
            InstanceAttribute::Lifetime => "instance-lifetime",
            InstanceAttribute::Speed => "instance-speed",
            InstanceAttribute::RotationSpeed => "instance-rotation-speed",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Receives the dirty spans of the instance streams on flush.
pub trait InstanceSink {
    fn write_attribute(&mut self, attribute: InstanceAttribute, byte_offset: u64, data: &[u8]);
}

/// Structure-of-arrays instance storage, one flat `f32` stream per attribute.
pub struct InstanceData {
    capacity: usize,
    streams: [Vec<f32>; 7],
}

impl InstanceData {
    pub fn new(capacity: usize) -> Self {
        let streams = InstanceAttribute::ALL.map(|attr| vec![0.0; capacity * attr.item_size()]);
        Self { capacity, streams }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stream(&self, attribute: InstanceAttribute) -> &[f32] {
        &self.streams[attribute.index()]
    }

    /// The floats of one slot in one stream.
    pub fn slot(&self, attribute: InstanceAttribute, slot: usize) -> &[f32] {
        let size = attribute.item_size();
        &self.stream(attribute)[slot * size..(slot + 1) * size]
    }

    /// Write `record` into `slot`. Billboards keep only the roll component of
    /// the initial rotation.
    pub fn write(&mut self, slot: usize, record: &ParticleRecord, billboard: bool) {
        let mut euler = record.rotation;
        if billboard {
            euler.x = 0.0;
            euler.y = 0.0;
        }
        let rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
        let matrix = Mat4::from_scale_rotation_translation(record.scale, rotation, record.position);

        self.put(InstanceAttribute::Matrix, slot, &matrix.to_cols_array());
        self.put(InstanceAttribute::ColorStart, slot, &record.color_start);
        self.put(InstanceAttribute::ColorEnd, slot, &record.color_end);
        self.put(InstanceAttribute::Direction, slot, &record.direction.to_array());
        self.put(
            InstanceAttribute::Lifetime,
            slot,
            &[record.lifetime.start, record.lifetime.duration],
        );
        let reverse = if record.reverse_age { 1.0 } else { 0.0 };
        self.put(InstanceAttribute::Speed, slot, &[record.speed, reverse]);
        self.put(
            InstanceAttribute::RotationSpeed,
            slot,
            &record.rotation_speed.to_array(),
        );
    }

    fn put(&mut self, attribute: InstanceAttribute, slot: usize, values: &[f32]) {
        let size = attribute.item_size();
        self.streams[attribute.index()][slot * size..(slot + 1) * size].copy_from_slice(values);
    }

    /// Hand every stream's bytes for the given slot ranges to `sink`.
    pub fn upload<S, I>(&self, ranges: I, sink: &mut S)
    where
        S: InstanceSink + ?Sized,
        I: IntoIterator<Item = Range<usize>> + Clone,
    {
        for attribute in InstanceAttribute::ALL {
            let size = attribute.item_size();
            let stream = self.stream(attribute);
            for range in ranges.clone() {
                let floats = &stream[range.start * size..range.end * size];
                let offset = range.start as u64 * attribute.stride_bytes();
                sink.write_attribute(attribute, offset, bytemuck::cast_slice(floats));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(InstanceAttribute, u64, usize)>,
    }

    impl InstanceSink for Recorder {
        fn write_attribute(&mut self, attribute: InstanceAttribute, offset: u64, data: &[u8]) {
            self.writes.push((attribute, offset, data.len()));
        }
    }

    #[test]
    fn streams_are_sized_by_item_size() {
        let data = InstanceData::new(10);
        assert_eq!(data.stream(InstanceAttribute::Matrix).len(), 160);
        assert_eq!(data.stream(InstanceAttribute::Lifetime).len(), 20);
        assert_eq!(data.stream(InstanceAttribute::ColorEnd).len(), 30);
    }

    #[test]
    fn write_composes_matrix_and_attributes() {
        let mut data = InstanceData::new(4);
        let record = ParticleRecord {
            position: Vec3::new(1.0, 2.0, 3.0),
            scale: Vec3::splat(2.0),
            direction: Vec3::Y,
            lifetime: Lifetime {
                start: 5.0,
                duration: 0.5,
            },
            color_start: [1.0, 0.0, 0.0],
            color_end: [0.0, 0.0, 1.0],
            speed: 7.0,
            reverse_age: true,
            ..Default::default()
        };
        data.write(2, &record, false);

        let m = data.slot(InstanceAttribute::Matrix, 2);
        assert_eq!(m[0], 2.0);
        assert_eq!(&m[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(data.slot(InstanceAttribute::Lifetime, 2), &[5.0, 0.5]);
        assert_eq!(data.slot(InstanceAttribute::Speed, 2), &[7.0, 1.0]);
        assert_eq!(data.slot(InstanceAttribute::ColorEnd, 2), &[0.0, 0.0, 1.0]);
        assert_eq!(data.slot(InstanceAttribute::Direction, 2), &[0.0, 1.0, 0.0]);
        // neighbours untouched
        assert_eq!(data.slot(InstanceAttribute::Lifetime, 1), &[0.0, 0.0]);
        assert_eq!(data.slot(InstanceAttribute::Lifetime, 3), &[0.0, 0.0]);
    }

    #[test]
    fn billboard_keeps_only_roll() {
        let record = ParticleRecord {
            rotation: Vec3::new(0.7, 0.4, 0.3),
            ..Default::default()
        };
        let mut mesh = InstanceData::new(1);
        let mut billboard = InstanceData::new(1);
        mesh.write(0, &record, false);
        billboard.write(0, &record, true);

        let expected = Mat4::from_rotation_z(0.3).to_cols_array();
        let got = billboard.slot(InstanceAttribute::Matrix, 0);
        for (a, b) in got.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        assert_ne!(mesh.slot(InstanceAttribute::Matrix, 0), got);
    }

    #[test]
    fn upload_converts_slots_to_bytes() {
        let data = InstanceData::new(8);
        let mut sink = Recorder::default();
        data.upload([2..5], &mut sink);

        assert_eq!(sink.writes.len(), InstanceAttribute::ALL.len());
        assert!(sink.writes.contains(&(InstanceAttribute::Matrix, 2 * 64, 3 * 64)));
        assert!(sink.writes.contains(&(InstanceAttribute::Lifetime, 2 * 8, 3 * 8)));
        assert!(sink.writes.contains(&(InstanceAttribute::Direction, 2 * 12, 3 * 12)));
    }
}
