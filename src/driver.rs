// Per-frame glue: resolve the selected LUT, pick up a finished plate,
// run the pipeline once.

use log::{error, warn};

use crate::error::Error;
use crate::lut::{LutHandle, LutStore, IDENTITY};
use crate::pass::{FrameState, Pass};
use crate::pipeline::PassPipeline;
use crate::plate::PlateLoader;
use crate::types::{FrameBuffer, Viewport};

/// Which LUT the user currently wants. Owned by the UI and handed to every
/// frame; the driver only reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LutSelection {
    pub handle: LutHandle,
}

impl LutSelection {
    pub fn new(handle: LutHandle) -> Self {
        Self { handle }
    }

    /// Pick `name`, or the identity LUT when it is not registered.
    pub fn by_name_or_identity(store: &LutStore, name: &str) -> Option<Self> {
        match store.handle(name) {
            Some(h) => Some(Self::new(h)),
            None => {
                warn!("LUT '{name}' is not registered, using '{IDENTITY}'");
                store.handle(IDENTITY).map(Self::new)
            }
        }
    }

    pub fn next(self, store: &LutStore) -> Self {
        Self::new(store.cycle(self.handle, 1))
    }

    pub fn previous(self, store: &LutStore) -> Self {
        Self::new(store.cycle(self.handle, -1))
    }
}

pub struct FrameDriver {
    pub store: LutStore,
    pub pipeline: PassPipeline,
    plate: PlateLoader,
    display: FrameBuffer,
    bound: Option<LutHandle>,
}

impl FrameDriver {
    pub fn new(store: LutStore, pipeline: PassPipeline, plate: PlateLoader) -> Self {
        Self { store, pipeline, plate, display: FrameBuffer::new(0, 0), bound: None }
    }

    /// Render one frame. Returns None when the viewport has no area.
    pub fn frame(
        &mut self,
        selection: &LutSelection,
        viewport: Viewport,
        delta: f32,
    ) -> Result<Option<&FrameBuffer>, Error> {
        match self.plate.poll() {
            Some(Ok(img)) => self.pipeline.background.set_plate(img),
            Some(Err(e)) => error!("background plate failed, keeping the empty plate: {e}"),
            None => {}
        }

        if viewport.is_empty() {
            return Ok(None);
        }

        self.bind(selection);

        let frame = FrameState { store: &self.store, viewport, delta };
        self.pipeline.render(&frame, &mut self.display)?;
        Ok(Some(&self.display))
    }

    /// Name of the LUT actually bound this frame.
    pub fn bound_name(&self) -> Option<&str> {
        self.bound.and_then(|h| self.store.dataset(h)).map(|d| d.name.as_str())
    }

    fn bind(&mut self, selection: &LutSelection) {
        let handle = if self.store.dataset(selection.handle).is_some() {
            Some(selection.handle)
        } else {
            self.store.handle(IDENTITY)
        };
        let Some(handle) = handle else {
            // Nothing to bind; the grading pass copies through.
            self.bound = None;
            return;
        };
        if let Some(lut) = self.store.dataset(handle) {
            self.pipeline.bind_lut(handle, lut);
            self.bound = Some(handle);
        }
    }

    pub fn filtering(&self) -> bool {
        self.pipeline.grade_filtered.enabled()
    }
}
