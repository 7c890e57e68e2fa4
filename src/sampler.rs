// 3D lookups on a tiled 2D atlas.
//
// The atlas only gives us 2D filtering, which covers red and green inside a
// tile. Blue picks the tile, so interpolating along blue means fetching two
// neighbouring tiles and blending them by hand.

use crate::lut::{mix4, LutDataset};

/// Where a lookup lands in the atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileCoords {
    pub z_slice0: f32, // tile index below blue
    pub z_slice1: f32, // tile index above blue, never past the last tile
    pub s0: f32,       // horizontal coordinate inside tile z_slice0
    pub s1: f32,       // same point inside tile z_slice1
    pub y: f32,        // vertical coordinate, shared by both tiles
    pub z_frac: f32,   // blend weight from tile 0 to tile 1
}

/// Compute atlas coordinates for `coord` in a cube of edge `size`.
///
/// Half a texel is kept on each tile edge so a bilinear fetch never bleeds
/// into the neighbouring tile.
pub fn tile_coords(coord: [f32; 3], size: usize) -> TileCoords {
    let size = size as f32;
    let slice_size = 1.0 / size;
    let slice_pixel_size = slice_size / size;
    let width = size - 1.0;
    let slice_inner_size = slice_pixel_size * width;

    let [r, g, b] = coord;
    let z_slice0 = (b * width).floor().clamp(0.0, width);
    let z_slice1 = (z_slice0 + 1.0).min(width);

    let x_offset = slice_pixel_size * 0.5 + r * slice_inner_size;
    let y = (g * width + 0.5) / size;

    TileCoords {
        z_slice0,
        z_slice1,
        s0: x_offset + z_slice0 * slice_size,
        s1: x_offset + z_slice1 * slice_size,
        y,
        z_frac: (b * width).rem_euclid(1.0),
    }
}

/// A way of reading a color cube out of its atlas.
pub trait LutSampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Grade one color. `coord` must already be inside [0,1].
    fn sample(&self, lut: &LutDataset, coord: [f32; 3]) -> [f32; 4];
}

/// Blends the two tiles around blue.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrilinearSampler;

impl LutSampler for TrilinearSampler {
    fn name(&self) -> &'static str {
        "trilinear"
    }

    fn sample(&self, lut: &LutDataset, coord: [f32; 3]) -> [f32; 4] {
        let t = tile_coords(coord, lut.edge_size);
        let c0 = lut.fetch(t.s0, t.y);
        let c1 = lut.fetch(t.s1, t.y);
        mix4(c0, c1, t.z_frac)
    }
}

/// Reads the lower tile only.
#[derive(Clone, Copy, Debug, Default)]
pub struct NearestSliceSampler;

impl LutSampler for NearestSliceSampler {
    fn name(&self) -> &'static str {
        "nearest"
    }

    fn sample(&self, lut: &LutDataset, coord: [f32; 3]) -> [f32; 4] {
        let t = tile_coords(coord, lut.edge_size);
        lut.fetch(t.s0, t.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners() -> [([f32; 3], [f32; 4]); 8] {
        [
            ([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]),
            ([1.0, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]),
            ([1.0, 0.0, 1.0], [1.0, 0.0, 1.0, 1.0]),
            ([0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 1.0]),
            ([1.0, 1.0, 0.0], [1.0, 1.0, 0.0, 1.0]),
            ([0.0, 1.0, 1.0], [0.0, 1.0, 1.0, 1.0]),
            ([1.0, 1.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
        ]
    }

    fn close(a: [f32; 4], b: [f32; 4], tol: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tol)
    }

    #[test]
    fn identity_is_a_no_op_on_corners_nearest() {
        let lut = LutDataset::identity("id", 2, false).unwrap();
        for (coord, expected) in corners() {
            let got = NearestSliceSampler.sample(&lut, coord);
            assert!(close(got, expected, 1e-6), "{coord:?} -> {got:?}");
        }
    }

    #[test]
    fn identity_is_a_no_op_on_corners_trilinear() {
        let lut = LutDataset::identity("id", 2, true).unwrap();
        for (coord, expected) in corners() {
            let got = TrilinearSampler.sample(&lut, coord);
            assert!(close(got, expected, 1e-5), "{coord:?} -> {got:?}");
        }
    }

    #[test]
    fn filtered_center_is_mean_of_corners() {
        let lut = LutDataset::identity("id", 2, true).unwrap();
        let got = TrilinearSampler.sample(&lut, [0.5, 0.5, 0.5]);
        for ch in &got[..3] {
            let v = ch * 255.0;
            assert!((127.0..=128.0).contains(&v), "{got:?}");
        }
        assert!((got[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_center_does_not_blend_tiles() {
        let lut = LutDataset::identity("id", 2, false).unwrap();
        let got = NearestSliceSampler.sample(&lut, [0.5, 0.5, 0.5]);
        // Lower tile only: blue stays at zero.
        assert_eq!(got[2], 0.0);
    }

    #[test]
    fn slices_clamp_at_top_of_blue() {
        for n in [2usize, 3, 8, 33] {
            let t = tile_coords([0.3, 0.7, 1.0], n);
            let width = (n - 1) as f32;
            assert_eq!(t.z_slice0, width);
            assert_eq!(t.z_slice1, width);
            assert!(t.s0 < 1.0 && t.s1 < 1.0);
        }
    }

    #[test]
    fn slice_clamps_below_zero() {
        let t = tile_coords([0.0, 0.0, -0.4], 4);
        assert_eq!(t.z_slice0, 0.0);
        assert_eq!(t.z_slice1, 1.0);
    }

    #[test]
    fn coordinates_stay_inside_the_tile() {
        let n = 4usize;
        let texel = 1.0 / (n * n) as f32;
        for tile in 0..n {
            let b = tile as f32 / (n - 1) as f32;
            let lo = tile_coords([0.0, 0.0, b], n);
            let hi = tile_coords([1.0, 1.0, b], n);
            assert_eq!(lo.z_slice0, hi.z_slice0);
            let start = lo.z_slice0 / n as f32;
            let end = start + 1.0 / n as f32;
            assert!((lo.s0 - (start + texel * 0.5)).abs() < 1e-6);
            assert!((hi.s0 - (end - texel * 0.5)).abs() < 1e-6);
            assert!((lo.y - 0.5 / n as f32).abs() < 1e-6);
            assert!((hi.y - (1.0 - 0.5 / n as f32)).abs() < 1e-6);
        }
    }

    #[test]
    fn identity_of_larger_cube_is_close_everywhere() {
        let lut = LutDataset::identity("id", 17, true).unwrap();
        for &c in &[[0.1, 0.2, 0.3], [0.9, 0.05, 0.6], [0.5, 0.5, 0.5], [0.33, 0.66, 0.99]] {
            let got = TrilinearSampler.sample(&lut, c);
            for i in 0..3 {
                assert!((got[i] - c[i]).abs() < 2.0 / 255.0, "{c:?} -> {got:?}");
            }
        }
    }
}
