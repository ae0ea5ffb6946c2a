//! Block-average coarsening.
//!
//! Reduces resolution by averaging non-overlapping blocks along each axis.
//! Trailing samples that do not fill a whole block are trimmed, so an axis
//! of length `n` coarsened by `f` ends up with `n / f` samples.

/// Length of an axis of `len` samples after coarsening by `factor`.
#[inline]
pub fn coarsened_len(len: usize, factor: usize) -> usize {
    if factor == 0 {
        len
    } else {
        len / factor
    }
}

/// Average non-overlapping blocks of an N-dimensional array.
///
/// NaN values are skipped; a block with no valid values yields NaN.
/// Sums are accumulated in input (C) order.
///
/// # Arguments
/// * `data` - Input values in C order
/// * `shape` - Input extent per axis
/// * `factors` - Block size per axis (1 leaves the axis untouched)
///
/// # Returns
/// Tuple of (coarsened_data, new_shape)
pub fn block_mean(data: &[f64], shape: &[usize], factors: &[usize]) -> (Vec<f64>, Vec<usize>) {
    debug_assert_eq!(shape.len(), factors.len());
    debug_assert_eq!(data.len(), shape.iter().product::<usize>());

    let factors: Vec<usize> = factors.iter().map(|&f| f.max(1)).collect();
    let out_shape: Vec<usize> = shape
        .iter()
        .zip(&factors)
        .map(|(&n, &f)| coarsened_len(n, f))
        .collect();

    if factors.iter().all(|&f| f == 1) {
        return (data.to_vec(), out_shape);
    }

    let out_len: usize = out_shape.iter().product();
    if out_len == 0 {
        return (vec![], out_shape);
    }

    let mut sums = vec![0.0f64; out_len];
    let mut counts = vec![0u32; out_len];
    let ndim = shape.len();
    let mut index = vec![0usize; ndim];

    for &value in data {
        let mut out_flat = 0usize;
        let mut inside = true;
        for axis in 0..ndim {
            let out_i = index[axis] / factors[axis];
            if out_i >= out_shape[axis] {
                inside = false;
                break;
            }
            out_flat = out_flat * out_shape[axis] + out_i;
        }

        if inside && !value.is_nan() {
            sums[out_flat] += value;
            counts[out_flat] += 1;
        }

        for axis in (0..ndim).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }

    let output = sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect();

    (output, out_shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_dimensional_mean() {
        let (out, shape) = block_mean(&[1.0, 2.0, 3.0], &[3], &[3]);
        assert_eq!(shape, vec![1]);
        assert_eq!(out, vec![2.0]);
    }

    #[test]
    fn test_trailing_remainder_trimmed() {
        assert_eq!(coarsened_len(2041, 3), 680);
        assert_eq!(coarsened_len(4320, 3), 1440);

        let data: Vec<f64> = (0..7).map(|v| v as f64).collect();
        let (out, shape) = block_mean(&data, &[7], &[3]);
        assert_eq!(shape, vec![2]);
        assert_eq!(out, vec![1.0, 4.0]);
    }

    #[test]
    fn test_two_dimensional_blocks() {
        // 4x4 grid, 2x2 blocks
        let data: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let (out, shape) = block_mean(&data, &[4, 4], &[2, 2]);
        assert_eq!(shape, vec![2, 2]);
        assert_eq!(out, vec![2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn test_unit_factor_axes_untouched() {
        // (time=2, lat=2, lon=4); only lon is coarsened
        let data: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let (out, shape) = block_mean(&data, &[2, 2, 4], &[1, 1, 2]);
        assert_eq!(shape, vec![2, 2, 2]);
        assert_eq!(out, vec![0.5, 2.5, 4.5, 6.5, 8.5, 10.5, 12.5, 14.5]);
    }

    #[test]
    fn test_nan_handling() {
        let data = [1.0, f64::NAN, 3.0, f64::NAN, f64::NAN, f64::NAN];
        let (out, _) = block_mean(&data, &[6], &[3]);
        assert_eq!(out[0], 2.0);
        assert!(out[1].is_nan());
    }

    #[test]
    fn test_axis_shorter_than_factor() {
        let (out, shape) = block_mean(&[1.0, 2.0], &[2], &[3]);
        assert!(out.is_empty());
        assert_eq!(shape, vec![0]);
    }
}
