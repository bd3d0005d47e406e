//! Morph target generation.
//!
//! Each [`Shape`] produces a flat `x, y, z, x, y, z, ...` point cloud sized
//! for the whole field. Clouds are generated once per particle count and kept
//! in a [`ShapeSet`].
//!
//! | Shape | Extent |
//! |-------|--------|
//! | [`Shape::Sphere`] | solid ball of radius [`SPHERE_RADIUS`] |
//! | [`Shape::Cube`] | side `1.5 * SPHERE_RADIUS`, centered |
//! | [`Shape::Pyramid`] | apex at `+PYRAMID_HEIGHT / 2`, square base of [`PYRAMID_BASE`] |

use crate::error::ParseShapeError;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Radius of the sphere shape. Other shapes are sized relative to it.
pub const SPHERE_RADIUS: f32 = 150.0;
/// Half the side length of the cube shape.
pub const CUBE_HALF_SIZE: f32 = SPHERE_RADIUS * 0.75;
/// Apex-to-base height of the pyramid shape.
pub const PYRAMID_HEIGHT: f32 = SPHERE_RADIUS * 2.0;
/// Side length of the pyramid's square base.
pub const PYRAMID_BASE: f32 = SPHERE_RADIUS * 2.0;

/// Morph target shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shape {
    #[default]
    Sphere,
    Cube,
    Pyramid,
}

impl Shape {
    /// All shapes in cycle order.
    pub const ALL: [Shape; 3] = [Shape::Sphere, Shape::Cube, Shape::Pyramid];

    /// The shape after this one in the morph cycle.
    pub fn next(self) -> Self {
        match self {
            Shape::Sphere => Shape::Cube,
            Shape::Cube => Shape::Pyramid,
            Shape::Pyramid => Shape::Sphere,
        }
    }

    /// Position in [`Shape::ALL`].
    pub fn index(self) -> usize {
        match self {
            Shape::Sphere => 0,
            Shape::Cube => 1,
            Shape::Pyramid => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Cube => "cube",
            Shape::Pyramid => "pyramid",
        }
    }

    /// Sample one point of this shape.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Vec3 {
        match self {
            Shape::Sphere => sample_sphere(rng),
            Shape::Cube => sample_cube(rng),
            Shape::Pyramid => sample_pyramid(rng),
        }
    }

    /// Generate `count` points as a flat coordinate array of length `3 * count`.
    pub fn generate<R: Rng + ?Sized>(self, count: usize, rng: &mut R) -> Vec<f32> {
        let mut points = Vec::with_capacity(count * 3);
        for _ in 0..count {
            let p = self.sample(rng);
            points.extend_from_slice(&[p.x, p.y, p.z]);
        }
        points
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sphere" => Ok(Shape::Sphere),
            "cube" => Ok(Shape::Cube),
            "pyramid" => Ok(Shape::Pyramid),
            other => Err(ParseShapeError(other.to_string())),
        }
    }
}

/// Uniform over the ball's volume: cube-root radius, uniform `cos(phi)`.
fn sample_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let r = SPHERE_RADIUS * rng.gen::<f32>().cbrt();
    let theta = rng.gen_range(0.0..TAU);
    let cos_phi: f32 = rng.gen_range(-1.0..=1.0);
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();

    Vec3::new(
        r * sin_phi * theta.cos(),
        r * sin_phi * theta.sin(),
        r * cos_phi,
    )
}

fn sample_cube<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(
        rng.gen_range(-CUBE_HALF_SIZE..=CUBE_HALF_SIZE),
        rng.gen_range(-CUBE_HALF_SIZE..=CUBE_HALF_SIZE),
        rng.gen_range(-CUBE_HALF_SIZE..=CUBE_HALF_SIZE),
    )
}

/// Height fraction is uniform, so layers near the apex are denser than a
/// volume-uniform pyramid would be. That look is intended.
fn sample_pyramid<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let h: f32 = rng.gen();
    let y = PYRAMID_HEIGHT * 0.5 - h * PYRAMID_HEIGHT;
    let half_width = h * PYRAMID_BASE * 0.5;

    Vec3::new(
        (rng.gen::<f32>() * 2.0 - 1.0) * half_width,
        y,
        (rng.gen::<f32>() * 2.0 - 1.0) * half_width,
    )
}

/// One precomputed point cloud per shape, all for the same particle count.
#[derive(Clone, Debug)]
pub struct ShapeSet {
    count: usize,
    clouds: [Vec<f32>; 3],
}

impl ShapeSet {
    /// Generate clouds for every shape.
    pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let clouds = Shape::ALL.map(|shape| shape.generate(count, &mut *rng));
        Self { count, clouds }
    }

    /// Number of points in each cloud.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Flat coordinates for a shape.
    pub fn get(&self, shape: Shape) -> &[f32] {
        &self.clouds[shape.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn points(cloud: &[f32]) -> impl Iterator<Item = Vec3> + '_ {
        cloud.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2]))
    }

    #[test]
    fn test_generate_length() {
        let mut rng = SmallRng::seed_from_u64(1);
        for shape in Shape::ALL {
            for count in [0, 1, 17, 1000] {
                assert_eq!(shape.generate(count, &mut rng).len(), count * 3);
            }
        }
    }

    #[test]
    fn test_sphere_within_radius() {
        let mut rng = SmallRng::seed_from_u64(7);
        let cloud = Shape::Sphere.generate(5000, &mut rng);
        for p in points(&cloud) {
            assert!(p.length() <= SPHERE_RADIUS * (1.0 + 1e-4));
        }
    }

    #[test]
    fn test_sphere_volumetric_mean() {
        // For a uniform ball, E[r] = 3R/4. A surface-only sampler would give R.
        let mut rng = SmallRng::seed_from_u64(11);
        let cloud = Shape::Sphere.generate(20_000, &mut rng);
        let mean = points(&cloud).map(|p| p.length()).sum::<f32>() / 20_000.0;
        let expected = SPHERE_RADIUS * 0.75;
        assert!((mean - expected).abs() < expected * 0.02, "mean {}", mean);
    }

    #[test]
    fn test_sphere_isotropic() {
        let mut rng = SmallRng::seed_from_u64(3);
        let cloud = Shape::Sphere.generate(20_000, &mut rng);
        let centroid = points(&cloud).fold(Vec3::ZERO, |acc, p| acc + p) / 20_000.0;
        assert!(centroid.length() < SPHERE_RADIUS * 0.03);
    }

    #[test]
    fn test_cube_bounds() {
        let mut rng = SmallRng::seed_from_u64(5);
        let cloud = Shape::Cube.generate(5000, &mut rng);
        let max = cloud.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(max <= CUBE_HALF_SIZE);
        // Should fill close to the full extent
        assert!(max > CUBE_HALF_SIZE * 0.99);
    }

    #[test]
    fn test_pyramid_bounds() {
        let mut rng = SmallRng::seed_from_u64(9);
        let cloud = Shape::Pyramid.generate(5000, &mut rng);
        for p in points(&cloud) {
            assert!(p.y <= PYRAMID_HEIGHT * 0.5 && p.y >= -PYRAMID_HEIGHT * 0.5);
            // Half-width at this level grows linearly from the apex
            let h = (PYRAMID_HEIGHT * 0.5 - p.y) / PYRAMID_HEIGHT;
            let half_width = h * PYRAMID_BASE * 0.5;
            assert!(p.x.abs() <= half_width + 1e-3);
            assert!(p.z.abs() <= half_width + 1e-3);
        }
    }

    #[test]
    fn test_pyramid_uniform_height() {
        let mut rng = SmallRng::seed_from_u64(13);
        let cloud = Shape::Pyramid.generate(20_000, &mut rng);
        let upper = points(&cloud).filter(|p| p.y > 0.0).count() as f32 / 20_000.0;
        // Linear height sampling puts half the points in the upper half.
        assert!((upper - 0.5).abs() < 0.02, "upper fraction {}", upper);
    }

    #[test]
    fn test_shape_cycle() {
        assert_eq!(Shape::Sphere.next(), Shape::Cube);
        assert_eq!(Shape::Cube.next(), Shape::Pyramid);
        assert_eq!(Shape::Pyramid.next(), Shape::Sphere);
        for (i, shape) in Shape::ALL.iter().enumerate() {
            assert_eq!(shape.index(), i);
        }
    }

    #[test]
    fn test_shape_names() {
        for shape in Shape::ALL {
            assert_eq!(shape.name().parse::<Shape>(), Ok(shape));
        }
        assert_eq!(" Cube ".parse::<Shape>(), Ok(Shape::Cube));
        assert!("torus".parse::<Shape>().is_err());
    }

    #[test]
    fn test_shape_set() {
        let mut rng = SmallRng::seed_from_u64(21);
        let set = ShapeSet::generate(64, &mut rng);
        assert_eq!(set.count(), 64);
        for shape in Shape::ALL {
            assert_eq!(set.get(shape).len(), 64 * 3);
        }
        assert_ne!(set.get(Shape::Sphere), set.get(Shape::Cube));
    }
}
