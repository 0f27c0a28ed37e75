use ndarray::{s, Array2};
use rand::Rng;

/// Vertical lane stripe spanning the whole frame height.
pub fn lane_stripe(mask: &mut Array2<u8>, center_x: f32, half_width: usize) {
    let width = mask.ncols();
    if width == 0 {
        return;
    }
    let center = center_x.round().clamp(0.0, (width - 1) as f32) as usize;
    let x1 = center.saturating_sub(half_width);
    let x2 = (center + half_width + 1).min(width);
    mask.slice_mut(s![.., x1..x2]).fill(255);
}

/// Full-width horizontal bar, `thickness` rows tall, starting at `row`.
pub fn stop_bar(mask: &mut Array2<u8>, row: usize, thickness: usize) {
    let height = mask.nrows();
    let start = row.min(height);
    let end = (row + thickness).min(height);
    mask.slice_mut(s![start..end, ..]).fill(255);
}

/// Fills a disc with `value`.
pub fn disc(mask: &mut Array2<u8>, center: (usize, usize), radius: usize, value: u8) {
    let (cy, cx) = (center.0 as isize, center.1 as isize);
    let r = radius as isize;
    for ((y, x), cell) in mask.indexed_iter_mut() {
        let dy = y as isize - cy;
        let dx = x as isize - cx;
        if dy * dy + dx * dx <= r * r {
            *cell = value;
        }
    }
}

/// Sets isolated foreground pixels with probability `density`.
pub fn speckle<R: Rng>(mask: &mut Array2<u8>, rng: &mut R, density: f32) {
    if density <= 0.0 {
        return;
    }
    for cell in mask.iter_mut() {
        if rng.gen::<f32>() < density {
            *cell = 255;
        }
    }
}
