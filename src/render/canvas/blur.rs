//! Separable Gaussian blur over premultiplied RGBA8 buffers.

/// One-sided normalized Gaussian weights `w[0..=radius]`, radius `ceil(3 sigma)`.
pub fn gaussian_kernel(sigma: f32, max_radius: usize) -> Vec<f32> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = ((sigma * 3.0).ceil() as usize).clamp(1, max_radius);
    let mut weights: Vec<f32> = (0..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Blur `data` in place. `tmp` is scratch of the same length.
pub fn blur_rgba8_premul(data: &mut [u8], tmp: &mut Vec<u8>, width: u32, height: u32, kernel: &[f32]) {
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return;
    }
    tmp.resize(data.len(), 0);
    horizontal_pass(data, tmp, width, height, kernel);
    vertical_pass(tmp, data, width, height, kernel);
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[f32]) {
    let radius = k.len() as i64 - 1;
    let w = width as i64;
    for y in 0..height as i64 {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for d in -radius..=radius {
                let sx = (x + d).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                let kw = k[d.unsigned_abs() as usize];
                for c in 0..4 {
                    acc[c] += kw * src[idx + c] as f32;
                }
            }
            write_px(dst, ((y * w + x) as usize) * 4, acc);
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[f32]) {
    let radius = k.len() as i64 - 1;
    let (w, h) = (width as i64, height as i64);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for d in -radius..=radius {
                let sy = (y + d).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                let kw = k[d.unsigned_abs() as usize];
                for c in 0..4 {
                    acc[c] += kw * src[idx + c] as f32;
                }
            }
            write_px(dst, ((y * w + x) as usize) * 4, acc);
        }
    }
}

#[inline]
fn write_px(dst: &mut [u8], idx: usize, acc: [f32; 4]) {
    let a = acc[3].round().clamp(0.0, 255.0) as u8;
    dst[idx + 3] = a;
    // premultiplied channels never exceed alpha
    for c in 0..3 {
        dst[idx + c] = (acc[c].round().clamp(0.0, 255.0) as u8).min(a);
    }
}
