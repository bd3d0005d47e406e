//! Cheap hash-based pseudo-noise.
//!
//! This is the classic `fract(sin(dot(p, k)) * 43758.5453)` hash, not coherent
//! gradient noise. Neighbouring inputs give unrelated outputs, which is fine
//! for jitter and turbulence at tens of thousands of particles per frame.
//!
//! # Example
//!
//! ```ignore
//! use swarmsong::noise::NoiseField;
//!
//! let n = NoiseField::sample(1.0, 2.0, 3.0);
//! assert!((-1.0..=1.0).contains(&n));
//! assert_eq!(n, NoiseField::sample(1.0, 2.0, 3.0));
//! ```

/// Stateless noise source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseField;

const K_X: f32 = 12.9898;
const K_Y: f32 = 78.233;
const K_Z: f32 = 37.719;
const K_T: f32 = 4.581;
const SCALE: f32 = 43_758.547;

impl NoiseField {
    /// Sample the field at a point. Output lies in `[-1, 1]`.
    #[inline]
    pub fn sample(x: f32, y: f32, z: f32) -> f32 {
        hash_to_signed(x * K_X + y * K_Y + z * K_Z)
    }

    /// Sample with time folded into the hash.
    #[inline]
    pub fn sample4(x: f32, y: f32, z: f32, t: f32) -> f32 {
        hash_to_signed(x * K_X + y * K_Y + z * K_Z + t * K_T)
    }
}

#[inline]
fn hash_to_signed(v: f32) -> f32 {
    let s = v.sin() * SCALE;
    // `fract` keeps the sign of its input, so wrap negatives back into [0, 1).
    let f = s - s.floor();
    (f * 2.0 - 1.0).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_deterministic() {
        for i in 0..100 {
            let x = i as f32 * 0.37;
            let y = i as f32 * -1.3;
            let z = i as f32 * 2.9;
            assert_eq!(NoiseField::sample(x, y, z), NoiseField::sample(x, y, z));
            assert_eq!(
                NoiseField::sample4(x, y, z, 3.0).to_bits(),
                NoiseField::sample4(x, y, z, 3.0).to_bits()
            );
        }
    }

    #[test]
    fn test_sample_range() {
        for i in 0..1000 {
            let v = i as f32 * 0.731 - 300.0;
            let n = NoiseField::sample(v, v * 0.5, -v);
            assert!((-1.0..=1.0).contains(&n), "{} out of range", n);
        }
    }

    #[test]
    fn test_sample_varies() {
        // Not a distribution test, just that the hash isn't collapsing to a constant.
        let samples: Vec<f32> = (0..64)
            .map(|i| NoiseField::sample(i as f32, 0.0, 0.0))
            .collect();
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let spread = samples.iter().map(|s| (s - mean).abs()).fold(0.0, f32::max);
        assert!(spread > 0.5);
    }

    #[test]
    fn test_time_changes_output() {
        let a = NoiseField::sample4(1.0, 2.0, 3.0, 0.0);
        let b = NoiseField::sample4(1.0, 2.0, 3.0, 10.0);
        assert_ne!(a, b);
    }
}
