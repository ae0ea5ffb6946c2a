//! Synthetic data generators for testing.
//!
//! Deterministic current fields and coordinate vectors, so expected
//! coarsened values can be computed by hand in tests.

/// `n` evenly spaced values from `start` to `stop` inclusive.
///
/// # Example
/// ```
/// use test_utils::linspace;
/// assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
/// ```
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Value of the synthetic current field at one grid point.
///
/// Linear in every index, so the mean over any block equals the value at
/// the block's centre.
pub fn current_value(t: usize, d: usize, y: usize, x: usize, phase: f32) -> f32 {
    phase + t as f32 * 1.0 + d as f32 * 0.5 + y as f32 * 0.02 + x as f32 * 0.01
}

/// Create a synthetic current field in (time, depth, latitude, longitude)
/// C order.
///
/// # Arguments
/// * `shape` - `[time, depth, latitude, longitude]` lengths
/// * `phase` - Constant offset distinguishing components (u vs v)
pub fn create_current_field(shape: [usize; 4], phase: f32) -> Vec<f32> {
    let [nt, nd, ny, nx] = shape;
    let mut data = Vec::with_capacity(nt * nd * ny * nx);
    for t in 0..nt {
        for d in 0..nd {
            for y in 0..ny {
                for x in 0..nx {
                    data.push(current_value(t, d, y, x, phase));
                }
            }
        }
    }
    data
}

/// Replace every value whose flat index is a multiple of `every` with NaN,
/// imitating land cells.
pub fn mask_land(data: &mut [f32], every: usize) {
    if every == 0 {
        return;
    }
    for (i, value) in data.iter_mut().enumerate() {
        if i % every == 0 {
            *value = f32::NAN;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(-1.0, 1.0, 5), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
    }

    #[test]
    fn test_current_field_layout() {
        let data = create_current_field([2, 1, 3, 4], 0.0);
        assert_eq!(data.len(), 24);
        // Last longitude of the first row
        assert_eq!(data[3], current_value(0, 0, 0, 3, 0.0));
        // First point of the second time step
        assert_eq!(data[12], 1.0);
    }

    #[test]
    fn test_mask_land() {
        let mut data = vec![1.0_f32; 6];
        mask_land(&mut data, 3);
        assert!(data[0].is_nan());
        assert!(data[3].is_nan());
        assert_eq!(data.iter().filter(|v| v.is_nan()).count(), 2);
    }
}
