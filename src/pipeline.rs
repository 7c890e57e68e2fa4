// The per-frame pass chain: background -> scene -> grade.
//
// Background and scene composite into one shared color buffer without
// clearing it; background paints every pixel so nothing stale survives.
// Exactly one of the two grading passes is enabled and it writes straight
// into the display buffer.

use log::debug;

use crate::background::BackgroundPass;
use crate::error::Error;
use crate::grading::ColorGradingPass;
use crate::lut::{LutDataset, LutHandle};
use crate::pass::{FrameState, Pass, PassIo, Uniform, LUT_MAP, LUT_MAP_SIZE};
use crate::sampler::{NearestSliceSampler, TrilinearSampler};
use crate::scene::ScenePass;
use crate::types::{DepthBuffer, FrameBuffer, Viewport};

pub struct PassPipeline {
    pub background: BackgroundPass,
    pub scene: ScenePass,
    pub grade_filtered: ColorGradingPass<TrilinearSampler>,
    pub grade_nearest: ColorGradingPass<NearestSliceSampler>,
    color: FrameBuffer,  // shared composite
    scratch: FrameBuffer, // ping-pong target for non-terminal output passes
    depth: DepthBuffer,
    reallocations: usize,
}

impl PassPipeline {
    pub fn new(background: BackgroundPass, scene: ScenePass) -> Self {
        let mut pipeline = Self {
            background,
            scene,
            grade_filtered: ColorGradingPass::new("lut", TrilinearSampler),
            grade_nearest: ColorGradingPass::new("lut nearest", NearestSliceSampler),
            color: FrameBuffer::new(0, 0),
            scratch: FrameBuffer::new(0, 0),
            depth: DepthBuffer::new(0, 0),
            reallocations: 0,
        };
        pipeline.grade_nearest.set_enabled(false);
        pipeline
    }

    /// Passes in execution order.
    pub fn passes(&self) -> [&dyn Pass; 4] {
        [&self.background, &self.scene, &self.grade_filtered, &self.grade_nearest]
    }

    /// Current color buffer size (0x0 before the first frame).
    pub fn buffer_size(&self) -> (usize, usize) {
        self.color.size()
    }

    /// How many times buffers were reallocated for a new viewport.
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Enable the grading pass that matches `lut` and bind it.
    pub fn bind_lut(&mut self, handle: LutHandle, lut: &LutDataset) {
        self.grade_filtered.set_enabled(lut.filtered);
        self.grade_nearest.set_enabled(!lut.filtered);

        let active: &mut dyn Pass = if lut.filtered { &mut self.grade_filtered } else { &mut self.grade_nearest };
        let uniforms = &mut active.state_mut().uniforms;
        uniforms.set(LUT_MAP, Uniform::Lut(handle));
        uniforms.set(LUT_MAP_SIZE, Uniform::Float(lut.edge_size as f32));
    }

    /// Reallocate every intermediate buffer if the viewport changed.
    fn ensure_size(&mut self, viewport: Viewport) {
        if self.color.size() == (viewport.width, viewport.height) {
            return;
        }
        debug!(
            "reallocating pass buffers {:?} -> {}x{}",
            self.color.size(),
            viewport.width,
            viewport.height
        );
        self.color = FrameBuffer::new(viewport.width, viewport.height);
        self.scratch = FrameBuffer::new(viewport.width, viewport.height);
        self.depth = DepthBuffer::new(viewport.width, viewport.height);
        self.reallocations += 1;

        self.background.resize(viewport);
        self.scene.resize(viewport);
        self.grade_filtered.resize(viewport);
        self.grade_nearest.resize(viewport);
    }

    /// Run every enabled pass once. The result lands in `display`, which is
    /// reallocated if it does not match the viewport.
    pub fn render(&mut self, frame: &FrameState<'_>, display: &mut FrameBuffer) -> Result<(), Error> {
        let viewport = frame.viewport;
        self.ensure_size(viewport);
        if display.size() != (viewport.width, viewport.height) {
            *display = FrameBuffer::new(viewport.width, viewport.height);
        }

        let Self { background, scene, grade_filtered, grade_nearest, color, scratch, depth, .. } = self;
        let passes: [&mut dyn Pass; 4] = [background, scene, grade_filtered, grade_nearest];
        let last = passes.iter().rposition(|p| p.enabled());

        // The first pass to run sees last frame's composite unless it
        // paints every pixel itself.
        let mut composed = false;
        let mut presented = false;
        for (i, pass) in passes.into_iter().enumerate() {
            if !pass.enabled() {
                continue;
            }
            if pass.state().clears_buffer || (!composed && !pass.covers_viewport()) {
                color.fill(0);
                depth.clear();
            }
            composed = true;
            let terminal = Some(i) == last && pass.writes_output();
            let output: &mut FrameBuffer = if terminal { &mut *display } else { &mut *scratch };
            pass.render(PassIo { color: &mut *color, depth: &mut *depth, output }, frame)?;

            if terminal {
                presented = true;
            } else if pass.writes_output() {
                std::mem::swap(color, scratch);
            }
        }

        if !presented {
            display.pixels.copy_from_slice(&color.pixels);
        }
        Ok(())
    }
}
