//! Normalized cross-correlation for WSOLA alignment.

/// Mean-square level (in 16-bit sample units) below which a segment counts as silent.
pub const ENERGY_FLOOR: f64 = 1.0;

/// Score for two silent segments. Deliberately short of a perfect match.
pub const SILENCE_MATCH: f32 = 0.99;

/// Mean-centered, energy-normalized correlation of two equal-length segments.
///
/// Always in `[-1, 1]`. Two silent segments score [`SILENCE_MATCH`]; one
/// silent segment against a non-silent one scores 0.
pub fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);

    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let mut cross = 0.0f64;
    let mut energy_a = 0.0f64;
    let mut energy_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let da = x as f64 - mean_a;
        let db = y as f64 - mean_b;
        cross += da * db;
        energy_a += da * da;
        energy_b += db * db;
    }

    let floor = ENERGY_FLOOR * n as f64;
    match (energy_a < floor, energy_b < floor) {
        (true, true) => SILENCE_MATCH,
        (true, false) | (false, true) => 0.0,
        (false, false) => (cross / (energy_a * energy_b).sqrt()).clamp(-1.0, 1.0) as f32,
    }
}
