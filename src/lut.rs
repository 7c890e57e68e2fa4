// LUT texture store: 3D color cubes kept as tiled 2D RGBA atlases.
//
// Atlas layout for edge size N: width N*N, height N. Tile `b` (blue index)
// spans columns b*N .. b*N+N; inside a tile the column is the red index and
// the row is the green index.

use std::path::Path;

use log::{debug, error, info};

use crate::error::Error;

/// How the 2D atlas is filtered inside a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexelFilter {
    Nearest,
    Linear,
}

/// Stable reference to a dataset held by a [`LutStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LutHandle(usize);

#[derive(Clone, Debug)]
pub struct LutDataset {
    pub name: String,
    pub edge_size: usize,
    pub filtered: bool,
    pixels: Vec<u8>, // RGBA8, len = edge_size^3 * 4
}

/// Byte length of an N^3 RGBA8 cube, or `InvalidLut` when it overflows.
fn byte_len(name: &str, edge_size: usize) -> Result<usize, Error> {
    edge_size
        .checked_pow(3)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::InvalidLut(format!("{name}: edge size {edge_size} overflows")))
}

impl LutDataset {
    /// Validate shape and wrap the pixel buffer.
    pub fn new(name: &str, edge_size: usize, filtered: bool, pixels: Vec<u8>) -> Result<Self, Error> {
        if edge_size < 2 {
            return Err(Error::InvalidLut(format!("{name}: edge size {edge_size} is below 2")));
        }
        let expected = byte_len(name, edge_size)?;
        if pixels.len() != expected {
            return Err(Error::InvalidLut(format!(
                "{name}: expected {expected} bytes for edge size {edge_size}, got {}",
                pixels.len()
            )));
        }
        Ok(Self { name: name.to_string(), edge_size, filtered, pixels })
    }

    /// The identity cube: grading with it leaves grid colors unchanged.
    /// For edge size 2 this is the 8-corner atlas
    /// black, red, blue, magenta / green, yellow, cyan, white.
    pub fn identity(name: &str, edge_size: usize, filtered: bool) -> Result<Self, Error> {
        if edge_size < 2 {
            return Err(Error::InvalidLut(format!("{name}: edge size {edge_size} is below 2")));
        }
        let len = byte_len(name, edge_size)?;
        let n = edge_size;
        let step = |i: usize| ((i * 255) as f32 / (n - 1) as f32).round() as u8;
        let mut pixels = Vec::with_capacity(len);
        for g in 0..n {
            for b in 0..n {
                for r in 0..n {
                    pixels.extend_from_slice(&[step(r), step(g), step(b), 255]);
                }
            }
        }
        Self::new(name, edge_size, filtered, pixels)
    }

    /// Atlas width in texels (N*N).
    pub fn atlas_width(&self) -> usize {
        self.edge_size * self.edge_size
    }

    /// Atlas height in texels (N).
    pub fn atlas_height(&self) -> usize {
        self.edge_size
    }

    pub fn texel_filter(&self) -> TexelFilter {
        if self.filtered { TexelFilter::Linear } else { TexelFilter::Nearest }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Raw texel at integer atlas coordinates, channels in [0,1].
    #[inline]
    pub fn texel(&self, x: usize, y: usize) -> [f32; 4] {
        let i = (y * self.atlas_width() + x) * 4;
        let p = &self.pixels[i..i + 4];
        [
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        ]
    }

    /// Sample at normalized atlas coordinates with the dataset's own filter,
    /// clamping to the edge like a GPU sampler would.
    #[inline]
    pub fn fetch(&self, u: f32, v: f32) -> [f32; 4] {
        match self.texel_filter() {
            TexelFilter::Nearest => self.fetch_nearest(u, v),
            TexelFilter::Linear => self.fetch_bilinear(u, v),
        }
    }

    pub fn fetch_nearest(&self, u: f32, v: f32) -> [f32; 4] {
        let w = self.atlas_width();
        let h = self.atlas_height();
        let x = ((u * w as f32).floor() as isize).clamp(0, w as isize - 1) as usize;
        let y = ((v * h as f32).floor() as isize).clamp(0, h as isize - 1) as usize;
        self.texel(x, y)
    }

    pub fn fetch_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        let w = self.atlas_width() as isize;
        let h = self.atlas_height() as isize;

        // Texel centers sit at (i + 0.5) / size.
        let fx = u * w as f32 - 0.5;
        let fy = v * h as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let xa = (x0 as isize).clamp(0, w - 1) as usize;
        let xb = (x0 as isize + 1).clamp(0, w - 1) as usize;
        let ya = (y0 as isize).clamp(0, h - 1) as usize;
        let yb = (y0 as isize + 1).clamp(0, h - 1) as usize;

        let top = mix4(self.texel(xa, ya), self.texel(xb, ya), tx);
        let bottom = mix4(self.texel(xa, yb), self.texel(xb, yb), tx);
        mix4(top, bottom, ty)
    }
}

#[inline]
pub fn mix4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Owns every registered LUT for the lifetime of the process.
#[derive(Default)]
pub struct LutStore {
    datasets: Vec<LutDataset>,
}

impl LutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the two identity fixtures ("identity" filtered,
    /// "identity not filtered" nearest).
    pub fn with_identity() -> Self {
        let mut store = Self::new();
        for (name, filtered) in [(IDENTITY, true), (IDENTITY_NEAREST, false)] {
            match LutDataset::identity(name, 2, filtered) {
                Ok(ds) => {
                    store.insert(ds);
                }
                Err(e) => error!("identity LUT '{name}' not built: {e}"),
            }
        }
        store
    }

    /// Validate and keep a dataset resident. Re-registering a name replaces
    /// the data but keeps its handle.
    pub fn register_lut(
        &mut self,
        name: &str,
        edge_size: usize,
        filtered: bool,
        pixels: Vec<u8>,
    ) -> Result<LutHandle, Error> {
        let ds = LutDataset::new(name, edge_size, filtered, pixels)?;
        Ok(self.insert(ds))
    }

    /// Decode an N*N x N atlas image and register it.
    pub fn load_atlas(&mut self, name: &str, path: &Path, filtered: bool) -> Result<LutHandle, Error> {
        let img = image::open(path)
            .map_err(|e| Error::ImageLoad(format!("{}: {e}", path.display())))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let n = h as usize;
        if n < 2 || w as usize != n * n {
            return Err(Error::InvalidLut(format!(
                "{name}: atlas {}x{} is not N*N x N",
                w, h
            )));
        }
        self.register_lut(name, n, filtered, img.into_raw())
    }

    fn insert(&mut self, ds: LutDataset) -> LutHandle {
        info!("registered LUT '{}' ({}^3, filtered: {})", ds.name, ds.edge_size, ds.filtered);
        if let Some(i) = self.datasets.iter().position(|d| d.name == ds.name) {
            debug!("LUT '{}' replaced in place", ds.name);
            self.datasets[i] = ds;
            return LutHandle(i);
        }
        self.datasets.push(ds);
        LutHandle(self.datasets.len() - 1)
    }

    pub fn get(&self, name: &str) -> Option<&LutDataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn handle(&self, name: &str) -> Option<LutHandle> {
        self.datasets.iter().position(|d| d.name == name).map(LutHandle)
    }

    pub fn dataset(&self, handle: LutHandle) -> Option<&LutDataset> {
        self.datasets.get(handle.0)
    }

    /// Human-readable names with their handles, in registration order.
    pub fn names(&self) -> impl Iterator<Item = (&str, LutHandle)> {
        self.datasets.iter().enumerate().map(|(i, d)| (d.name.as_str(), LutHandle(i)))
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Handle `offset` places after `from`, wrapping around.
    pub fn cycle(&self, from: LutHandle, offset: isize) -> LutHandle {
        if self.datasets.is_empty() {
            return from;
        }
        let n = self.datasets.len() as isize;
        LutHandle((from.0 as isize + offset).rem_euclid(n) as usize)
    }
}

pub const IDENTITY: &str = "identity";
pub const IDENTITY_NEAREST: &str = "identity not filtered";
