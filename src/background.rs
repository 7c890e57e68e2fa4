// Background plate: a photo stretched over a 2x2 quad under an orthographic
// camera, scaled per axis so the photo keeps its aspect and still covers the
// whole viewport (cropping the long side).

use image::RgbaImage;
use log::{debug, info};

use crate::error::Error;
use crate::pass::{FrameState, Pass, PassIo, PassState};
use crate::types::{pack_rgb, Viewport};

/// Drawn where no plate has arrived yet.
const EMPTY_PLATE: u32 = 0x00_00_00_00;

pub struct BackgroundPass {
    state: PassState,
    plate: Option<RgbaImage>,
    viewport: Viewport,
    scale: (f32, f32),
}

/// Quad scale that keeps `image_aspect` undistorted on a viewport of
/// `viewport_aspect`. Both factors are >= 1 so the quad always covers it.
pub fn plate_scale(image_aspect: f32, viewport_aspect: f32) -> (f32, f32) {
    let aspect = image_aspect / viewport_aspect;
    if aspect > 1.0 { (aspect, 1.0) } else { (1.0, 1.0 / aspect) }
}

impl BackgroundPass {
    pub fn new() -> Self {
        Self {
            state: PassState::new("background"),
            plate: None,
            viewport: Viewport::new(1, 1),
            scale: (1.0, 1.0),
        }
    }

    /// Install a decoded plate and fix up the scale right away.
    pub fn set_plate(&mut self, plate: RgbaImage) {
        info!("background plate ready ({}x{})", plate.width(), plate.height());
        self.plate = Some(plate);
        self.update_scale();
    }

    pub fn scale(&self) -> (f32, f32) {
        self.scale
    }

    /// Width over height of the plate, 1:1 until it is loaded.
    fn image_aspect(&self) -> f32 {
        match &self.plate {
            Some(p) if p.height() > 0 => p.width() as f32 / p.height() as f32,
            _ => 1.0,
        }
    }

    fn update_scale(&mut self) {
        self.scale = plate_scale(self.image_aspect(), self.viewport.aspect());
        debug!("background scale {:?} for viewport {:?}", self.scale, self.viewport);
    }
}

impl Default for BackgroundPass {
    fn default() -> Self {
        Self::new()
    }
}

/// Bilinear read of an RGBA8 image at normalized coordinates (v points down).
fn sample_plate(img: &RgbaImage, u: f32, v: f32) -> u32 {
    let w = img.width() as isize;
    let h = img.height() as isize;
    let fx = u * w as f32 - 0.5;
    let fy = v * h as f32 - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;

    let xa = (x0 as isize).clamp(0, w - 1) as u32;
    let xb = (x0 as isize + 1).clamp(0, w - 1) as u32;
    let ya = (y0 as isize).clamp(0, h - 1) as u32;
    let yb = (y0 as isize + 1).clamp(0, h - 1) as u32;

    let p00 = img.get_pixel(xa, ya).0;
    let p10 = img.get_pixel(xb, ya).0;
    let p01 = img.get_pixel(xa, yb).0;
    let p11 = img.get_pixel(xb, yb).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * tx;
        let bottom = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * tx;
        out[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    pack_rgb(out[0], out[1], out[2])
}

impl Pass for BackgroundPass {
    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn covers_viewport(&self) -> bool {
        true
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.update_scale();
    }

    fn render(&mut self, io: PassIo<'_>, _frame: &FrameState<'_>) -> Result<(), Error> {
        let fb = io.color;
        let Some(plate) = &self.plate else {
            fb.fill(EMPTY_PLATE);
            return Ok(());
        };
        if plate.width() == 0 || plate.height() == 0 {
            fb.fill(EMPTY_PLATE);
            return Ok(());
        }

        let (sx, sy) = self.scale;
        let (w, h) = (fb.width, fb.height);

        // Pixel center -> NDC -> quad UV. Rows grow downward, NDC y grows up.
        let us: Vec<f32> = (0..w)
            .map(|x| {
                let ndc = (x as f32 + 0.5) / w as f32 * 2.0 - 1.0;
                (ndc / sx + 1.0) * 0.5
            })
            .collect();
        for y in 0..h {
            let ndc = 1.0 - (y as f32 + 0.5) / h as f32 * 2.0;
            let v = (1.0 - ndc / sy) * 0.5;
            let row = &mut fb.pixels[y * w..(y + 1) * w];
            for (px, &u) in row.iter_mut().zip(&us) {
                *px = sample_plate(plate, u, v);
            }
        }
        Ok(())
    }
}
