//! Review threshold arithmetic.

/// The number of reviews with a given outcome needed to reach `threshold_percent`
/// of `min_reviews`.
///
/// Any positive threshold needs at least one review, and the result never exceeds
/// `min_reviews`. Both approval and rejection counts are derived with this function.
pub fn compute_threshold_count(min_reviews: u64, threshold_percent: u64) -> u64 {
    if min_reviews == 0 || threshold_percent == 0 {
        return 0;
    }

    let scaled = u128::from(threshold_percent) * u128::from(min_reviews);
    let needed = scaled.div_ceil(100);

    // `needed` is bounded by `min_reviews` after the clamp, so it fits back into u64.
    u64::try_from(needed.clamp(1, u128::from(min_reviews))).unwrap_or(min_reviews)
}
