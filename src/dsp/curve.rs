//! Phase curve math shared by the envelope renderer and editor geometry.

/*
Shaped Phase Curves
===================

Every envelope phase moves from a start level to a target level over a fixed
duration. How it gets there is controlled by a single `shape` parameter:

  shape < 0   concave   fast start, slow finish   (  ╭───  )
  shape = 0   linear    constant rate             (  ╱     )
  shape > 0   convex    slow start, fast finish   (  ───╯  )

Vocabulary
----------

  t       Normalized time inside the phase, 0.0 at the start, 1.0 at the end.
  u       Normalized progress toward the target, 0.0 = start, 1.0 = target.
  shape   Curvature control in [-1, 1]. Values outside are clamped.


The Math
--------

The curve is an exponential segment with curvature c = shape * CURVE_STRENGTH:

    u = (e^(c·t) - 1) / (e^c - 1)

and its exact inverse:

    t = ln(1 + u·(e^c - 1)) / c

Both directions are written with `exp_m1` / `ln_1p` so that small curvatures
keep full precision, and both derive `c` through the same `curvature()`
helper. The editor uses `inv_t_from_u` to turn a dragged level back into a
time position; sharing the exact same constants keeps that round trip
lossless to within float rounding.

When |c| is tiny the expression degenerates to 0/0, so a linear branch
takes over below LINEAR_EPSILON.
*/

/// Curvature reached at `shape = ±1`.
pub const CURVE_STRENGTH: f32 = 6.0;

const LINEAR_EPSILON: f32 = 1e-4;

#[inline]
fn curvature(shape: f32) -> f32 {
    let shape = if shape.is_finite() { shape } else { 0.0 };
    shape.clamp(-1.0, 1.0) * CURVE_STRENGTH
}

#[inline]
fn unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Map normalized time `t` to normalized progress `u` for the given shape.
#[inline]
pub fn shaped_t(t: f32, shape: f32) -> f32 {
    let t = unit(t);
    let c = curvature(shape);
    if c.abs() < LINEAR_EPSILON {
        return t;
    }
    unit((c * t).exp_m1() / c.exp_m1())
}

/// Inverse of [`shaped_t`]: the normalized time at which progress `u` is reached.
#[inline]
pub fn inv_t_from_u(u: f32, shape: f32) -> f32 {
    let u = unit(u);
    let c = curvature(shape);
    if c.abs() < LINEAR_EPSILON {
        return u;
    }
    unit((u * c.exp_m1()).ln_1p() / c)
}

/// Level reached at normalized time `t` of a phase running `start → target`.
#[inline]
pub fn level_at(start: f32, target: f32, t: f32, shape: f32) -> f32 {
    start + (target - start) * shaped_t(t, shape)
}

/// Normalized time at which a phase running `start → target` passes `level`.
///
/// Returns `None` for flat phases or levels outside the phase's range.
pub fn time_for_level(start: f32, target: f32, level: f32, shape: f32) -> Option<f32> {
    let span = target - start;
    if span.abs() <= f32::EPSILON {
        return None;
    }
    let u = (level - start) / span;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(inv_t_from_u(u, shape))
}
