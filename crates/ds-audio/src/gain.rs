/// Scale every sample by `gain`, saturating to the `i32` range.
///
/// The product is formed in `f64`, which holds any `i32 × f32` exactly
/// enough to clamp before narrowing, so large gains saturate instead of
/// wrapping.
///
/// # Example
/// ```
/// use ds_audio::gain::apply_gain;
/// let mut block = [2_000_000_000, -2_000_000_000, 100];
/// apply_gain(&mut block, 4.0);
/// assert_eq!(block, [i32::MAX, i32::MIN, 400]);
/// ```
pub fn apply_gain(samples: &mut [i32], gain: f32) {
    let gain = f64::from(gain);
    for s in samples {
        *s = saturate(f64::from(*s) * gain);
    }
}

#[inline(always)]
fn saturate(value: f64) -> i32 {
    if value.is_nan() {
        0
    } else {
        value.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }
}
