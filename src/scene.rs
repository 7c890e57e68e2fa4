// Scene pass: draws 3D content over the background without clearing color.
// Whatever supplies the content sits behind `SceneSource`.

use glam::{Mat4, Vec3, Vec4};

use crate::error::Error;
use crate::pass::{FrameState, Pass, PassIo, PassState};
use crate::types::{pack_rgb, DepthBuffer, FrameBuffer};

/// Supplies renderable content for the scene pass.
pub trait SceneSource {
    /// Draw into `color`, testing and writing `depth`. `aspect` is the
    /// viewport's width over height, `delta` the frame time in seconds.
    fn draw(&mut self, color: &mut FrameBuffer, depth: &mut DepthBuffer, aspect: f32, delta: f32);
}

pub struct ScenePass {
    state: PassState,
    source: Option<Box<dyn SceneSource>>,
}

impl ScenePass {
    pub fn new(source: Option<Box<dyn SceneSource>>) -> Self {
        Self { state: PassState::new("scene"), source }
    }
}

impl Pass for ScenePass {
    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn render(&mut self, io: PassIo<'_>, frame: &FrameState<'_>) -> Result<(), Error> {
        // Nothing loaded yet: leave the background untouched.
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };
        io.depth.clear();
        source.draw(io.color, io.depth, frame.viewport.aspect(), frame.delta);
        Ok(())
    }
}

/* ---------- Demo content: a flat-shaded spinning cube ---------- */

// Six faces: outward normal, base color, four corners (counter-clockwise).
const FACES: [([f32; 3], [u8; 3], [[f32; 3]; 4]); 6] = [
    ([0.0, 0.0, 1.0], [230, 60, 50], [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]]),
    ([0.0, 0.0, -1.0], [60, 200, 90], [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]]),
    ([1.0, 0.0, 0.0], [60, 110, 230], [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]]),
    ([-1.0, 0.0, 0.0], [240, 200, 60], [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]]),
    ([0.0, 1.0, 0.0], [220, 220, 220], [[-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]]),
    ([0.0, -1.0, 0.0], [150, 70, 200], [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]]),
];

pub struct SpinningCube {
    angle: f32,       // radians around Y
    speed: f32,       // radians per second
    eye: Vec3,
    light_dir: Vec3,  // towards the light, normalized
}

impl SpinningCube {
    pub fn new() -> Self {
        Self {
            angle: 0.5,
            speed: 0.6,
            eye: Vec3::new(0.0, 2.5, 6.0),
            light_dir: Vec3::new(0.4, 0.8, 0.6).normalize(),
        }
    }
}

impl Default for SpinningCube {
    fn default() -> Self {
        Self::new()
    }
}

/// A screen-space vertex: pixel x, pixel y, NDC depth.
type ScreenVert = (f32, f32, f32);

fn edge(a: ScreenVert, b: ScreenVert, px: f32, py: f32) -> f32 {
    (b.0 - a.0) * (py - a.1) - (b.1 - a.1) * (px - a.0)
}

/// Fill one triangle with a depth test against `depth`.
fn fill_triangle(color: &mut FrameBuffer, depth: &mut DepthBuffer, v: [ScreenVert; 3], rgb: u32) {
    let area = edge(v[0], v[1], v[2].0, v[2].1);
    if area.abs() < f32::EPSILON {
        return;
    }
    let min_x = v.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
    let max_x = v.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).ceil().min(color.width as f32) as usize;
    let min_y = v.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
    let max_y = v.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).ceil().min(color.height as f32) as usize;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(v[1], v[2], px, py) / area;
            let w1 = edge(v[2], v[0], px, py) / area;
            let w2 = edge(v[0], v[1], px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let z = w0 * v[0].2 + w1 * v[1].2 + w2 * v[2].2;
            let idx = y * color.width + x;
            if z < depth.depth[idx] {
                depth.depth[idx] = z;
                color.pixels[idx] = rgb;
            }
        }
    }
}

impl SceneSource for SpinningCube {
    fn draw(&mut self, color: &mut FrameBuffer, depth: &mut DepthBuffer, aspect: f32, delta: f32) {
        self.angle = (self.angle + self.speed * delta) % std::f32::consts::TAU;

        let model = Mat4::from_rotation_y(self.angle) * Mat4::from_rotation_x(0.35);
        let view = Mat4::look_at_rh(self.eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
        let mvp = proj * view * model;

        let (w, h) = (color.width as f32, color.height as f32);
        let to_screen = |p: [f32; 3]| -> Option<ScreenVert> {
            let clip = mvp * Vec4::new(p[0], p[1], p[2], 1.0);
            if clip.w <= 1e-4 {
                return None; // behind the camera
            }
            let ndc = clip.truncate() / clip.w;
            Some(((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h, ndc.z))
        };

        for (normal, base, corners) in FACES.iter() {
            let n = model.transform_vector3(Vec3::from_array(*normal));
            let lambert = n.dot(self.light_dir).max(0.0);
            let shade = 0.3 + 0.7 * lambert;
            let rgb = pack_rgb(
                (base[0] as f32 * shade).round() as u8,
                (base[1] as f32 * shade).round() as u8,
                (base[2] as f32 * shade).round() as u8,
            );

            let Some(q) = corners.iter().map(|c| to_screen(*c)).collect::<Option<Vec<_>>>() else {
                continue;
            };
            // Counter-clockwise in NDC is clockwise on screen (y flips); skip back faces.
            if edge(q[0], q[1], q[2].0, q[2].1) > 0.0 {
                continue;
            }
            fill_triangle(color, depth, [q[0], q[1], q[2]], rgb);
            fill_triangle(color, depth, [q[0], q[2], q[3]], rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::LutStore;
    use crate::types::Viewport;

    fn render(pass: &mut ScenePass, color: &mut FrameBuffer) {
        let store = LutStore::new();
        let mut depth = DepthBuffer::new(color.width, color.height);
        let mut out = FrameBuffer::new(color.width, color.height);
        let frame = FrameState { store: &store, viewport: Viewport::new(color.width, color.height), delta: 0.016 };
        pass.render(PassIo { color, depth: &mut depth, output: &mut out }, &frame).unwrap();
    }

    #[test]
    fn empty_scene_leaves_background() {
        let mut pass = ScenePass::new(None);
        let mut fb = FrameBuffer::filled(16, 16, 0x0A0B0C);
        render(&mut pass, &mut fb);
        assert!(fb.pixels.iter().all(|&p| p == 0x0A0B0C));
    }

    #[test]
    fn cube_covers_center_but_not_corners() {
        let mut pass = ScenePass::new(Some(Box::new(SpinningCube::new())));
        let mut fb = FrameBuffer::filled(64, 64, 0x0A0B0C);
        render(&mut pass, &mut fb);
        assert_ne!(fb.pixels[32 * 64 + 32], 0x0A0B0C);
        assert_eq!(fb.pixels[0], 0x0A0B0C);
        assert_eq!(fb.pixels[64 * 64 - 1], 0x0A0B0C);
    }

    #[test]
    fn nearer_triangle_wins() {
        let mut fb = FrameBuffer::new(8, 8);
        let mut depth = DepthBuffer::new(8, 8);
        let near = [(0.0, 0.0, 0.1), (8.0, 0.0, 0.1), (0.0, 8.0, 0.1)];
        let far = [(0.0, 0.0, 0.9), (8.0, 0.0, 0.9), (0.0, 8.0, 0.9)];
        fill_triangle(&mut fb, &mut depth, near, 0x111111);
        fill_triangle(&mut fb, &mut depth, far, 0x222222);
        assert_eq!(fb.pixels[8 + 1], 0x111111);
    }
}
