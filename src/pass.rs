// What every pipeline stage has in common.

use std::collections::HashMap;

use crate::error::Error;
use crate::lut::{LutHandle, LutStore};
use crate::types::{DepthBuffer, FrameBuffer, Viewport};

/// Uniform name for the bound LUT atlas.
pub const LUT_MAP: &str = "lutMap";
/// Uniform name for the bound LUT edge size.
pub const LUT_MAP_SIZE: &str = "lutMapSize";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniform {
    Lut(LutHandle),
    Float(f32),
}

/// Named parameters a pass reads while rendering.
#[derive(Clone, Debug, Default)]
pub struct Uniforms {
    values: HashMap<&'static str, Uniform>,
}

impl Uniforms {
    pub fn set(&mut self, name: &'static str, value: Uniform) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<Uniform> {
        self.values.get(name).copied()
    }

    pub fn lut(&self, name: &str) -> Option<LutHandle> {
        match self.get(name) {
            Some(Uniform::Lut(h)) => Some(h),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name) {
            Some(Uniform::Float(v)) => Some(v),
            _ => None,
        }
    }
}

/// Bookkeeping shared by all passes.
#[derive(Clone, Debug)]
pub struct PassState {
    pub name: String,
    pub enabled: bool,
    pub clears_buffer: bool,
    pub uniforms: Uniforms,
}

impl PassState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            clears_buffer: false,
            uniforms: Uniforms::default(),
        }
    }
}

/// Read-only data available to every pass for one frame.
pub struct FrameState<'a> {
    pub store: &'a LutStore,
    pub viewport: Viewport,
    pub delta: f32, // seconds since the previous frame
}

/// Buffers a pass may touch.
///
/// Compositing passes draw into `color` in place. Passes that return true
/// from [`Pass::writes_output`] read `color` and write `output`.
pub struct PassIo<'a> {
    pub color: &'a mut FrameBuffer,
    pub depth: &'a mut DepthBuffer,
    pub output: &'a mut FrameBuffer,
}

pub trait Pass {
    fn state(&self) -> &PassState;
    fn state_mut(&mut self) -> &mut PassState;

    /// True if the pass paints every pixel of the color buffer.
    fn covers_viewport(&self) -> bool {
        false
    }

    /// True if the pass reads the color buffer and writes `PassIo::output`.
    fn writes_output(&self) -> bool {
        false
    }

    /// Called after the pipeline reallocated its buffers.
    fn resize(&mut self, _viewport: Viewport) {}

    fn render(&mut self, io: PassIo<'_>, frame: &FrameState<'_>) -> Result<(), Error>;

    fn name(&self) -> &str {
        &self.state().name
    }

    fn enabled(&self) -> bool {
        self.state().enabled
    }

    fn set_enabled(&mut self, on: bool) {
        self.state_mut().enabled = on;
    }
}
