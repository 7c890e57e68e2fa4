// Full-screen color grading: every pixel's own RGB is the lookup coordinate.

use log::warn;
use rayon::prelude::*;

use crate::error::Error;
use crate::lut::LutDataset;
use crate::pass::{FrameState, Pass, PassIo, PassState, LUT_MAP, LUT_MAP_SIZE};
use crate::sampler::LutSampler;
use crate::types::{pack_rgb, unit_to_u8, unpack_rgb};

pub struct ColorGradingPass<S> {
    state: PassState,
    sampler: S,
    warned: bool, // unbound LUT already reported
}

impl<S: LutSampler> ColorGradingPass<S> {
    pub fn new(name: &str, sampler: S) -> Self {
        Self { state: PassState::new(name), sampler, warned: false }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    fn bound_lut<'a>(&self, frame: &FrameState<'a>) -> Option<&'a LutDataset> {
        let handle = self.state.uniforms.lut(LUT_MAP)?;
        let lut = frame.store.dataset(handle)?;
        match self.state.uniforms.float(LUT_MAP_SIZE) {
            Some(size) if size as usize != lut.edge_size => None,
            _ => Some(lut),
        }
    }
}

/// Grade one packed pixel. The result is always opaque.
#[inline]
pub fn grade_pixel<S: LutSampler + ?Sized>(sampler: &S, lut: &LutDataset, px: u32) -> u32 {
    let (r, g, b) = unpack_rgb(px);
    let coord = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0];
    let c = sampler.sample(lut, coord);
    pack_rgb(unit_to_u8(c[0]), unit_to_u8(c[1]), unit_to_u8(c[2]))
}

impl<S: LutSampler> Pass for ColorGradingPass<S> {
    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn writes_output(&self) -> bool {
        true
    }

    fn render(&mut self, io: PassIo<'_>, frame: &FrameState<'_>) -> Result<(), Error> {
        let src = io.color;
        let dst = io.output;
        if src.size() != dst.size() {
            return Err(Error::Pipeline(format!(
                "{}: source {:?} and output {:?} differ",
                self.state.name,
                src.size(),
                dst.size()
            )));
        }

        let Some(lut) = self.bound_lut(frame) else {
            if !self.warned {
                warn!("{}: no usable LUT bound, passing colors through", self.state.name);
                self.warned = true;
            }
            dst.pixels.copy_from_slice(&src.pixels);
            return Ok(());
        };
        self.warned = false;

        let width = src.width.max(1);
        let sampler = &self.sampler;
        dst.pixels
            .par_chunks_mut(width)
            .zip(src.pixels.par_chunks(width))
            .for_each(|(out_row, in_row)| {
                for (o, &i) in out_row.iter_mut().zip(in_row) {
                    *o = grade_pixel(sampler, lut, i);
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::{LutStore, IDENTITY, IDENTITY_NEAREST};
    use crate::pass::Uniform;
    use crate::sampler::{NearestSliceSampler, TrilinearSampler};
    use crate::types::{DepthBuffer, FrameBuffer, Viewport};

    fn run<S: LutSampler>(pass: &mut ColorGradingPass<S>, store: &LutStore, src: &mut FrameBuffer) -> FrameBuffer {
        let mut depth = DepthBuffer::new(src.width, src.height);
        let mut out = FrameBuffer::new(src.width, src.height);
        let frame = FrameState { store, viewport: Viewport::new(src.width, src.height), delta: 0.0 };
        pass.render(PassIo { color: src, depth: &mut depth, output: &mut out }, &frame).unwrap();
        out
    }

    #[test]
    fn identity_keeps_grid_colors() {
        let store = LutStore::with_identity();
        let mut pass = ColorGradingPass::new("lut nearest", NearestSliceSampler);
        pass.state_mut().uniforms.set(LUT_MAP, Uniform::Lut(store.handle(IDENTITY_NEAREST).unwrap()));

        let colors = [0x000000, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, 0xFFFFFF];
        let mut src = FrameBuffer { width: 4, height: 2, pixels: colors.to_vec() };
        let out = run(&mut pass, &store, &mut src);
        assert_eq!(out.pixels, colors.to_vec());
    }

    #[test]
    fn filtered_identity_is_close_for_any_color() {
        let mut store = LutStore::new();
        let h = store
            .register_lut("id17", 17, true, LutDataset::identity("x", 17, true).unwrap().pixels().to_vec())
            .unwrap();
        let mut pass = ColorGradingPass::new("lut", TrilinearSampler);
        pass.state_mut().uniforms.set(LUT_MAP, Uniform::Lut(h));
        pass.state_mut().uniforms.set(LUT_MAP_SIZE, Uniform::Float(17.0));

        let mut src = FrameBuffer { width: 3, height: 1, pixels: vec![0x123456, 0x80C040, 0xFE0102] };
        let out = run(&mut pass, &store, &mut src);
        for (a, b) in src.pixels.iter().zip(&out.pixels) {
            let (ar, ag, ab) = unpack_rgb(*a);
            let (br, bg, bb) = unpack_rgb(*b);
            assert!((ar as i32 - br as i32).abs() <= 2);
            assert!((ag as i32 - bg as i32).abs() <= 2);
            assert!((ab as i32 - bb as i32).abs() <= 2);
        }
    }

    #[test]
    fn unbound_pass_copies_through() {
        let store = LutStore::with_identity();
        let mut pass = ColorGradingPass::new("lut", TrilinearSampler);
        let mut src = FrameBuffer::filled(5, 3, 0x336699);
        let out = run(&mut pass, &store, &mut src);
        assert_eq!(out, src);
    }

    #[test]
    fn mismatched_size_uniform_is_treated_as_unbound() {
        let store = LutStore::with_identity();
        let mut pass = ColorGradingPass::new("lut", TrilinearSampler);
        pass.state_mut().uniforms.set(LUT_MAP, Uniform::Lut(store.handle(IDENTITY).unwrap()));
        pass.state_mut().uniforms.set(LUT_MAP_SIZE, Uniform::Float(33.0));
        let mut src = FrameBuffer::filled(2, 2, 0x808080);
        let out = run(&mut pass, &store, &mut src);
        assert_eq!(out, src);
    }

    #[test]
    fn inverting_lut_inverts() {
        // Every texel holds 255 - identity.
        let id = LutDataset::identity("id", 2, false).unwrap();
        let inverted: Vec<u8> = id
            .pixels()
            .chunks(4)
            .flat_map(|p| [255 - p[0], 255 - p[1], 255 - p[2], 255])
            .collect();
        let mut store = LutStore::new();
        let h = store.register_lut("invert", 2, false, inverted).unwrap();
        let mut pass = ColorGradingPass::new("lut nearest", NearestSliceSampler);
        pass.state_mut().uniforms.set(LUT_MAP, Uniform::Lut(h));

        let mut src = FrameBuffer { width: 2, height: 1, pixels: vec![0xFF0000, 0x00FFFF] };
        let out = run(&mut pass, &store, &mut src);
        assert_eq!(out.pixels, vec![0x00FFFF, 0xFF0000]);
    }
}
