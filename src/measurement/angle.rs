//! Included-angle computation

use crate::domain::Position;

/// Decimal places kept in reported angles
pub const ANGLE_DECIMALS: i32 = 3;

/// Round `degrees` to [`ANGLE_DECIMALS`] places
pub fn round_degrees(degrees: f64) -> f64 {
    let factor = 10f64.powi(ANGLE_DECIMALS);
    (degrees * factor).round() / factor
}

/// Angle at vertex `p2` between the rays towards `p1` and `p3`, in degrees
///
/// Returns `None` when `p1` or `p3` coincides with the vertex, since the
/// angle is then undefined.
pub fn compute_angle(p1: Position, p2: Position, p3: Position) -> Option<f64> {
    let v1 = (p1.x - p2.x, p1.y - p2.y);
    let v2 = (p3.x - p2.x, p3.y - p2.y);

    let mag1 = v1.0.hypot(v1.1);
    let mag2 = v2.0.hypot(v2.1);
    if mag1 <= f64::EPSILON || mag2 <= f64::EPSILON {
        return None;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    // Rounding can push the ratio just outside acos' domain
    let cos = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(round_degrees(cos.acos().to_degrees()))
}
