//! Per-tick smoothing primitives shared by the rotation, distance, and collision models.

/// Interpolation factor for a per-tick linear step toward a target, `rate * dt` clamped to
/// `[0, 1]`.
///
/// This is the exponential-decay approximation used throughout the rig: each tick moves a fixed
/// fraction of the remaining distance, so the error shrinks geometrically but never overshoots.
#[inline]
pub fn damp_factor(rate: f32, dt: f32) -> f32 {
    (rate * dt).clamp(0.0, 1.0)
}

/// Move `current` toward `target` by [`damp_factor`].
#[inline]
pub fn damp(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * damp_factor(rate, dt)
}

/// Critically damped approach of `current` toward `target`, reaching it in roughly
/// `smooth_time` seconds. `velocity` carries state between calls and must be owned by the caller.
///
/// Never overshoots the target.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        *velocity = 0.0;
        return target;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damp_factor_saturates() {
        assert_eq!(damp_factor(2.0, 0.1), 0.2);
        assert_eq!(damp_factor(20.0, 0.1), 1.0);
        assert_eq!(damp_factor(2.0, -1.0), 0.0);
    }

    #[test]
    fn smooth_damp_approaches_without_overshoot() {
        let mut velocity = 0.0;
        let mut value = 10.0;
        let mut last_error = f32::MAX;
        for _ in 0..200 {
            value = smooth_damp(value, 2.5, &mut velocity, 0.05, 1.0 / 60.0);
            assert!(value >= 2.5);
            let error = value - 2.5;
            assert!(error <= last_error);
            last_error = error;
        }
        assert!(last_error < 1e-3);
    }

    #[test]
    fn smooth_damp_zero_dt_is_identity() {
        let mut velocity = 3.0;
        assert_eq!(smooth_damp(4.0, 1.0, &mut velocity, 0.1, 0.0), 4.0);
        assert_eq!(velocity, 3.0);
    }
}
