// Native window: shows the graded frame and reports keys + drawable size.

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::error::Error;
use crate::types::{FrameBuffer, Viewport};

pub struct Presenter {
    window: Window, // the on-screen window you see
}

impl Presenter {
    /// Open a resizable window paced to the display refresh.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let options = WindowOptions { resize: true, ..WindowOptions::default() };
        let mut window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Pump events without drawing (used while the window has no area).
    pub fn idle(&mut self) {
        self.window.update();
    }

    /// Current drawable size, polled once per frame.
    pub fn viewport(&self) -> Viewport {
        let (w, h) = self.window.get_size();
        Viewport::new(w, h)
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    pub fn next_lut_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::L, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Right, KeyRepeat::No)
    }

    pub fn previous_lut_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::Left, KeyRepeat::No)
    }
}
