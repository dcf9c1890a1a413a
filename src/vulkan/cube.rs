use std::time::{Duration, Instant};

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};

/// Degrees of cube rotation per wall-clock second.
const SPIN_RATE: f32 = 45.0;

#[repr(C)]
#[derive(Clone, Copy)]
pub(super) struct Vertex {
    pub(super) position: [f32; 3],
    pub(super) color: [f32; 3],
}

/// Corners of a unit cube, one color per corner so every face shows a
/// gradient.
pub(super) const VERTICES: [Vertex; 8] = [
    Vertex {
        position: [-0.5, -0.5, 0.5],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.5],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.5, 0.5, 0.5],
        color: [0.0, 0.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5, 0.5],
        color: [1.0, 1.0, 1.0],
    },
    Vertex {
        position: [-0.5, -0.5, -0.5],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5, -0.5],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.5, 0.5, -0.5],
        color: [0.0, 0.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5, -0.5],
        color: [1.0, 1.0, 1.0],
    },
];

pub(super) const INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // near
    4, 5, 6, 6, 7, 4, // far
    0, 3, 4, 4, 3, 7, // left
    3, 2, 7, 7, 2, 6, // top
    2, 1, 6, 6, 1, 5, // right
    1, 0, 5, 5, 0, 4, // bottom
];

/// Per-frame uniform block. Three column-major mat4s, so the layout already
/// satisfies std140 without padding.
#[repr(C)]
#[derive(Clone, Copy)]
pub(super) struct Transforms {
    pub(super) model: Matrix4<f32>,
    pub(super) view: Matrix4<f32>,
    pub(super) projection: Matrix4<f32>,
}

impl Transforms {
    pub(super) fn new(aspect: f32) -> Transforms {
        Transforms {
            model: Matrix4::identity(),
            // Down the (1,1,1) diagonal at the origin, z up.
            view: Matrix4::look_at_rh(
                &Point3::new(2.0, 2.0, 2.0),
                &Point3::origin(),
                &Vector3::z(),
            ),
            projection: Perspective3::new(aspect, std::f32::consts::FRAC_PI_4, 0.1, 10.0)
                .to_homogeneous(),
        }
    }
}

/// Rotation state of the cube, advanced from wall-clock time so the spin
/// speed is independent of the frame rate.
pub(super) struct Spin {
    angle: f32,
    spinning: bool,
    last_tick: Instant,
}

impl Spin {
    pub(super) fn new() -> Spin {
        Spin {
            angle: 0.0,
            spinning: true,
            last_tick: Instant::now(),
        }
    }

    pub(super) fn toggle(&mut self) {
        self.spinning = !self.spinning;
    }

    /// Advance to the current wall-clock time and return the model matrix.
    pub(super) fn tick(&mut self) -> Matrix4<f32> {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        self.advance(elapsed);
        self.model()
    }

    fn advance(&mut self, elapsed: Duration) {
        if self.spinning {
            self.angle =
                (self.angle + SPIN_RATE.to_radians() * elapsed.as_secs_f32())
                    % std::f32::consts::TAU;
        }
    }

    fn model(&self) -> Matrix4<f32> {
        Matrix4::new_rotation(Vector3::z() * self.angle)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn indices_stay_in_range() {
        assert_eq!(INDICES.len(), 36);
        for index in INDICES {
            assert!((index as usize) < VERTICES.len());
        }
    }

    #[test]
    fn every_corner_is_referenced() {
        for corner in 0..VERTICES.len() as u32 {
            assert!(INDICES.contains(&corner), "corner {} unused", corner);
        }
    }

    #[test]
    fn vertex_layout_matches_pipeline_description() {
        // The pipeline hardcodes stride 24 and color offset 12.
        assert_eq!(size_of::<Vertex>(), 24);
        assert_eq!(size_of::<Transforms>(), 3 * 64);
    }

    #[test]
    fn spin_wraps_after_a_full_turn() {
        let mut spin = Spin::new();
        // 45 degrees per second, so 9 seconds is a turn and an eighth.
        spin.advance(Duration::from_secs(9));
        assert_relative_eq!(spin.angle, std::f32::consts::FRAC_PI_4, epsilon = 1e-3);
    }

    #[test]
    fn paused_spin_holds_its_angle() {
        let mut spin = Spin::new();
        spin.advance(Duration::from_secs(1));
        let frozen = spin.angle;
        spin.toggle();
        spin.advance(Duration::from_secs(5));
        assert_eq!(spin.angle, frozen);
        spin.toggle();
        spin.advance(Duration::from_secs(1));
        assert!(spin.angle > frozen);
    }

    #[test]
    fn model_matrix_rotates_about_z() {
        let mut spin = Spin::new();
        spin.advance(Duration::from_secs(2));
        let model = spin.model();
        let spun = model.transform_point(&Point3::new(1.0, 0.0, 0.5));
        // Height along the spin axis is preserved.
        assert_relative_eq!(spun.z, 0.5, epsilon = 1e-6);
        assert_relative_eq!(
            (spun.x * spun.x + spun.y * spun.y).sqrt(),
            1.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn view_keeps_the_origin_in_front_of_the_camera() {
        let transforms = Transforms::new(16.0 / 9.0);
        let origin = transforms.view.transform_point(&Point3::origin());
        // Right-handed view space looks down -z.
        assert!(origin.z < 0.0);
        assert_relative_eq!(origin.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-5);
    }
}
