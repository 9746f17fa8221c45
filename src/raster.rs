//! Tiled-raster collaborator types.
//!
//! A [`Product`] is a named stack of equally sized [`Band`]s. Bands expose
//! windowed reads over a dense sample array, an optional no-data sentinel,
//! and min/max statistics over the valid samples, which is all the
//! classification pipeline needs from its raster source.
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// A rectangular pixel window, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn x_max(&self) -> usize {
        self.x + self.width
    }

    pub fn y_max(&self) -> usize {
        self.y + self.height
    }
}

/// Partition a `width` x `height` image into tile rectangles of at most
/// `tile_width` x `tile_height`, in row-major order. Edge tiles shrink to
/// the image boundary.
pub fn tile_rectangles(
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
) -> Vec<Rect> {
    let mut rects = Vec::new();
    let mut y = 0;
    while y < height {
        let h = tile_height.min(height - y);
        let mut x = 0;
        while x < width {
            let w = tile_width.min(width - x);
            rects.push(Rect::new(x, y, w, h));
            x += w;
        }
        y += h;
    }
    rects
}

/// One channel of a multi-band raster image.
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub unit: Option<String>,
    pub no_data: Option<f64>,
    /// Dense samples, shape `(height, width)`.
    pub data: Array2<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Array2<f64>) -> Self {
        Band {
            name: name.into(),
            unit: None,
            no_data: None,
            data,
        }
    }

    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = Some(no_data);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// No-data sentinel; NaN when none is set.
    pub fn no_data_value(&self) -> f64 {
        self.no_data.unwrap_or(f64::NAN)
    }

    /// Copy out the samples of one window.
    pub fn read_window(&self, rect: &Rect) -> Array2<f64> {
        self.data
            .slice(s![rect.y..rect.y_max(), rect.x..rect.x_max()])
            .to_owned()
    }

    /// Min/max over valid samples (finite and not equal to the no-data
    /// sentinel). `None` when the band holds no valid sample.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut result: Option<(f64, f64)> = None;
        for &v in self.data.iter() {
            if !v.is_finite() {
                continue;
            }
            if let Some(nd) = self.no_data {
                if v == nd {
                    continue;
                }
            }
            result = Some(match result {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        result
    }
}

/// A named stack of bands sharing one raster grid.
#[derive(Debug, Clone)]
pub struct Product {
    pub name: String,
    pub bands: Vec<Band>,
}

impl Product {
    pub fn new(name: impl Into<String>, bands: Vec<Band>) -> Self {
        Product {
            name: name.into(),
            bands,
        }
    }

    pub fn width(&self) -> usize {
        self.bands.first().map(|b| b.width()).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.bands.first().map(|b| b.height()).unwrap_or(0)
    }

    /// Exact band lookup by name.
    pub fn band(&self, name: &str) -> Option<(usize, &Band)> {
        self.bands
            .iter()
            .enumerate()
            .find(|(_, b)| b.name == name)
    }
}

/// Total number of bands across all products.
pub fn total_num_bands(products: &[Product]) -> usize {
    products.iter().map(|p| p.bands.len()).sum()
}

/// Locate the first band whose name contains `band_name`, scanning products
/// in order. Returns `(product index, band index)`.
pub fn find_band_in_products(products: &[Product], band_name: &str) -> Option<(usize, usize)> {
    for (pi, product) in products.iter().enumerate() {
        for (bi, band) in product.bands.iter().enumerate() {
            if band.name.contains(band_name) {
                return Some((pi, bi));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_grid_covers_image() {
        let rects = tile_rectangles(45, 23, 20, 10);
        let area: usize = rects.iter().map(|r| r.width * r.height).sum();
        assert_eq!(area, 45 * 23);
        assert_eq!(rects[0], Rect::new(0, 0, 20, 10));
        // last column and row shrink
        assert!(rects.iter().any(|r| r.width == 5));
        assert!(rects.iter().any(|r| r.height == 3));
    }

    #[test]
    fn min_max_skips_no_data() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, -999.0, f64::NAN, 5.0]).unwrap();
        let band = Band::new("sigma0", data).with_no_data(-999.0);
        assert_eq!(band.min_max(), Some((1.0, 5.0)));
    }

    #[test]
    fn read_window_is_offset_correctly() {
        let data = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f64);
        let band = Band::new("b", data);
        let win = band.read_window(&Rect::new(1, 2, 2, 2));
        assert_eq!(win[(0, 0)], 9.0);
        assert_eq!(win[(1, 1)], 14.0);
    }

    #[test]
    fn band_lookup_by_substring() {
        let b = |name: &str| Band::new(name, Array2::zeros((1, 1)));
        let products = vec![
            Product::new("p1", vec![b("Sigma0_VV"), b("Sigma0_VH")]),
            Product::new("p2", vec![b("coherence")]),
        ];
        assert_eq!(find_band_in_products(&products, "VH"), Some((0, 1)));
        assert_eq!(find_band_in_products(&products, "coh"), Some((1, 0)));
        assert_eq!(find_band_in_products(&products, "missing"), None);
        assert_eq!(total_num_bands(&products), 3);
    }
}
