use ndarray::{Array2, ArrayView2};

/// Binary morphology on road masks. Non-zero cells are foreground; outputs use 255.
///
/// Neighbours that fall outside the mask are ignored, so borders neither
/// erode nor grow.
pub struct MorphologyHelper;

impl MorphologyHelper {
    /// Elliptical structuring element inscribed in a `size`x`size` square.
    pub fn ellipse(size: usize) -> Array2<bool> {
        let size = size.max(1);
        let radius = (size / 2) as f64;
        let center = (size / 2) as i64;
        let mut kernel = Array2::from_elem((size, size), false);
        if radius == 0.0 {
            kernel.fill(true);
            return kernel;
        }
        let inv_r2 = 1.0 / (radius * radius);
        for row in 0..size {
            let dy = row as f64 - radius;
            if dy.abs() > radius {
                continue;
            }
            let dx = (radius * ((radius * radius - dy * dy) * inv_r2).sqrt()).round() as i64;
            let start = (center - dx).max(0) as usize;
            let end = ((center + dx + 1) as usize).min(size);
            for col in start..end {
                kernel[[row, col]] = true;
            }
        }
        kernel
    }

    pub fn erode(mask: ArrayView2<u8>, kernel: &Array2<bool>) -> Array2<u8> {
        Self::apply(mask, kernel, true)
    }

    pub fn dilate(mask: ArrayView2<u8>, kernel: &Array2<bool>) -> Array2<u8> {
        Self::apply(mask, kernel, false)
    }

    /// Erode then dilate: removes speckle smaller than the kernel.
    pub fn open(mask: ArrayView2<u8>, kernel: &Array2<bool>) -> Array2<u8> {
        let eroded = Self::erode(mask, kernel);
        Self::dilate(eroded.view(), kernel)
    }

    /// Dilate then erode: fills pinholes smaller than the kernel.
    pub fn close(mask: ArrayView2<u8>, kernel: &Array2<bool>) -> Array2<u8> {
        let dilated = Self::dilate(mask, kernel);
        Self::erode(dilated.view(), kernel)
    }

    fn apply(mask: ArrayView2<u8>, kernel: &Array2<bool>, all: bool) -> Array2<u8> {
        let (height, width) = mask.dim();
        let (k_rows, k_cols) = kernel.dim();
        let anchor_y = (k_rows / 2) as isize;
        let anchor_x = (k_cols / 2) as isize;
        let offsets: Vec<(isize, isize)> = kernel
            .indexed_iter()
            .filter(|(_, &on)| on)
            .map(|((ky, kx), _)| (ky as isize - anchor_y, kx as isize - anchor_x))
            .collect();

        Array2::from_shape_fn((height, width), |(y, x)| {
            let mut neighbours = offsets.iter().filter_map(|&(dy, dx)| {
                let ny = y as isize + dy;
                let nx = x as isize + dx;
                if ny < 0 || nx < 0 || ny >= height as isize || nx >= width as isize {
                    None
                } else {
                    Some(mask[[ny as usize, nx as usize]] != 0)
                }
            });
            let hit = if all {
                neighbours.all(|fg| fg)
            } else {
                neighbours.any(|fg| fg)
            };
            if hit {
                255
            } else {
                0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn five_by_five_ellipse_has_pointed_caps() {
        let kernel = MorphologyHelper::ellipse(5);
        let on: Vec<usize> = kernel
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|&&v| v).count())
            .collect();
        assert_eq!(on, vec![1, 5, 5, 5, 1]);
    }

    #[test]
    fn open_removes_isolated_speckle() {
        let mut mask = Array2::<u8>::zeros((12, 12));
        mask[[6, 6]] = 255;
        let kernel = MorphologyHelper::ellipse(5);
        let opened = MorphologyHelper::open(mask.view(), &kernel);
        assert!(opened.iter().all(|&v| v == 0));
    }

    #[test]
    fn close_fills_pinhole_in_solid_block() {
        let mut mask = Array2::<u8>::from_elem((10, 10), 255);
        mask[[5, 5]] = 0;
        let kernel = MorphologyHelper::ellipse(3);
        let closed = MorphologyHelper::close(mask.view(), &kernel);
        assert_eq!(closed[[5, 5]], 255);
    }

    #[test]
    fn solid_mask_survives_open_at_borders() {
        let mask = array![[1u8, 1, 1], [1, 1, 1], [1, 1, 1]];
        let kernel = MorphologyHelper::ellipse(3);
        let opened = MorphologyHelper::open(mask.view(), &kernel);
        assert!(opened.iter().all(|&v| v == 255));
    }
}
