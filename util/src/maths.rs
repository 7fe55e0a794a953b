//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Standard deviation of a Gaussian kernel derived from its size.
///
/// This is the rule used when no explicit sigma is given for a kernel:
/// `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_sigma_for_size<T>(ksize: usize) -> T
where
    T: Float
{
    let k = T::from(ksize).unwrap_or_else(T::zero);
    let half = T::from(0.5).unwrap_or_else(T::zero);

    T::from(0.3).unwrap_or_else(T::zero) * ((k - T::one()) * half - T::one())
        + T::from(0.8).unwrap_or_else(T::zero)
}

/// Build a normalised 1D Gaussian kernel of the given (odd) size.
///
/// If `sigma` is not positive it is derived from the kernel size.
pub fn gaussian_kernel<T>(ksize: usize, sigma: T) -> Vec<T>
where
    T: Float
{
    let sigma = if sigma > T::zero() {
        sigma
    } else {
        gaussian_sigma_for_size(ksize)
    };

    let two = T::one() + T::one();
    let scale = -T::one() / (two * sigma * sigma);
    let centre = T::from(ksize / 2).unwrap_or_else(T::zero);

    let mut kernel: Vec<T> = (0..ksize)
        .map(|i| {
            let x = T::from(i).unwrap_or_else(T::zero) - centre;
            (scale * x * x).exp()
        })
        .collect();

    let sum = kernel.iter().fold(T::zero(), |acc, &k| acc + k);
    for k in kernel.iter_mut() {
        *k = *k / sum;
    }

    kernel
}

/// Map an out of range index back into `[0, len)` by reflecting about the
/// edge pixels without repeating them (`gfedcb|abcdefgh|gfedcba`).
pub fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }

    let len = len as isize;
    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);

    if i >= len {
        i = period - i;
    }

    i as usize
}

/// Clamp an out of range index onto the nearest edge (`aaaaaa|abcdefgh|hhhhhhh`).
pub fn replicate(index: isize, len: usize) -> usize {
    index.clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gaussian_sigma_for_size() {
        assert!((gaussian_sigma_for_size::<f64>(11) - 2.0).abs() < 1e-12);
        assert!((gaussian_sigma_for_size::<f64>(3) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_kernel() {
        let k: Vec<f64> = gaussian_kernel(11, 0.0);

        assert_eq!(k.len(), 11);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        // Symmetric and peaked at the centre
        for i in 0..5 {
            assert!((k[i] - k[10 - i]).abs() < 1e-15);
            assert!(k[i] < k[i + 1]);
        }
    }

    #[test]
    fn test_border_modes() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(4, 1), 0);

        assert_eq!(replicate(-3, 5), 0);
        assert_eq!(replicate(7, 5), 4);
        assert_eq!(replicate(2, 5), 2);
    }
}
