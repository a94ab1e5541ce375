//! Boxcar smoothing of folded profiles
//!
//! A folded profile is circular in pulse phase, so the boxcar wraps around the
//! end of the profile.

/// Replace each bin with the sum of `width` bins starting at it, wrapping around
///
/// `scratch` is resized as needed and reused between calls. A width of zero
/// leaves the profile unchanged.
///
/// # Example
///
/// ```
/// use stratum_ffa::ffa::smoothing::box_smooth;
///
/// let mut profile = vec![1.0, 0.0, 0.0, 2.0];
/// let mut scratch = Vec::new();
/// box_smooth(&mut profile, 2, &mut scratch);
/// assert_eq!(profile, vec![1.0, 0.0, 2.0, 3.0]);
/// ```
pub fn box_smooth(profile: &mut [f64], width: usize, scratch: &mut Vec<f64>) {
    let n = profile.len();
    if width == 0 || n == 0 {
        return;
    }

    scratch.clear();
    scratch.reserve(n);

    let mut window: f64 = (0..width).map(|j| profile[j % n]).sum();
    for i in 0..n {
        scratch.push(window);
        window -= profile[i];
        window += profile[(i + width) % n];
    }

    profile.copy_from_slice(scratch);
}
