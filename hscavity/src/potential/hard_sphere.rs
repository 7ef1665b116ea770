//! Free flight kinematics of two hard spheres.
//!
//! With `dr` the vector between two particles and `dv` their relative
//! velocity, the particles are at distance `σ` at times `t` solving
//! `|dr + t dv|² = σ²`, i.e. `v² t² + 2 b t + (r² - σ²) = 0` with `b = dr·dv`.

use crate::Vector3D;

/// Time until two particles separated by `dr` and moving with relative
/// velocity `dv` come in contact at distance `sqrt(sigma2)` from outside, or
/// `f64::INFINITY` if they never do.
#[inline]
pub fn approach_time(dr: Vector3D, dv: Vector3D, sigma2: f64) -> f64 {
    let bij = dr * dv;
    if bij >= 0.0 {
        // moving apart
        return f64::INFINITY;
    }

    let v2 = dv.norm2();
    let discriminant = bij * bij - v2 * (dr.norm2() - sigma2);
    if discriminant <= 0.0 {
        // missing each other
        return f64::INFINITY;
    }

    return (-bij - f64::sqrt(discriminant)) / v2;
}

/// Time until two overlapping particles separated by `dr` and moving with
/// relative velocity `dv` reach the distance `sqrt(sigma2)` from inside.
///
/// This returns `None` if the discriminant is negative, which means the
/// particles are not overlapping and never will.
#[inline]
#[allow(clippy::float_cmp)]
pub fn separation_time(dr: Vector3D, dv: Vector3D, sigma2: f64) -> Option<f64> {
    let v2 = dv.norm2();
    let bij = dr * dv;
    let discriminant = bij * bij - v2 * (dr.norm2() - sigma2);
    if discriminant < 0.0 {
        return None;
    }

    if v2 == 0.0 {
        return Some(f64::INFINITY);
    }

    return Some((-bij + f64::sqrt(discriminant)) / v2);
}
