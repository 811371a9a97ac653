// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Geometric predicates on sweep-plane (s, t) coordinates.
//
// Ordering and interpolation follow the classic sweep formulation. Every
// sign test (edge_sign, trans_sign, vert_ccw) goes through an adaptive
// orientation predicate: a fast f64 evaluation guarded by an error bound,
// with an exact expansion fallback when the fast result cannot be trusted.

pub type Real = f64;

/// Returns true if u is lexicographically <= v (s first, then t).
#[inline]
pub fn vert_leq(u_s: Real, u_t: Real, v_s: Real, v_t: Real) -> bool {
    u_s < v_s || (u_s == v_s && u_t <= v_t)
}

/// Returns true if u == v (exact equality).
#[inline]
pub fn vert_eq(u_s: Real, u_t: Real, v_s: Real, v_t: Real) -> bool {
    u_s == v_s && u_t == v_t
}

/// Returns true if u is lexicographically <= v with s and t transposed.
#[inline]
pub fn trans_leq(u_s: Real, u_t: Real, v_s: Real, v_t: Real) -> bool {
    u_t < v_t || (u_t == v_t && u_s <= v_s)
}

/// Given u <= v <= w, evaluates the t-coord of edge uw at the s-coord of v
/// and returns v.t - (uw)(v.s), the signed distance from uw to v.
/// Returns zero if uw is vertical.
pub fn edge_eval(u_s: Real, u_t: Real, v_s: Real, v_t: Real, w_s: Real, w_t: Real) -> Real {
    let gap_l = v_s - u_s;
    let gap_r = w_s - v_s;
    if gap_l + gap_r > 0.0 {
        if gap_l < gap_r {
            (v_t - u_t) + (u_t - w_t) * (gap_l / (gap_l + gap_r))
        } else {
            (v_t - w_t) + (w_t - u_t) * (gap_r / (gap_l + gap_r))
        }
    } else {
        0.0
    }
}

/// Returns a value whose sign matches edge_eval(u, v, w).
///
/// For u <= v <= w this is the orientation of (u, w, v), so the sign is
/// computed exactly even for nearly collinear input.
#[inline]
pub fn edge_sign(u_s: Real, u_t: Real, v_s: Real, v_t: Real, w_s: Real, w_t: Real) -> Real {
    let gap_l = v_s - u_s;
    let gap_r = w_s - v_s;
    if gap_l + gap_r > 0.0 {
        orient2d(u_s, u_t, w_s, w_t, v_s, v_t)
    } else {
        0.0
    }
}

/// Like edge_eval but with s and t transposed.
pub fn trans_eval(u_s: Real, u_t: Real, v_s: Real, v_t: Real, w_s: Real, w_t: Real) -> Real {
    let gap_l = v_t - u_t;
    let gap_r = w_t - v_t;
    if gap_l + gap_r > 0.0 {
        if gap_l < gap_r {
            (v_s - u_s) + (u_s - w_s) * (gap_l / (gap_l + gap_r))
        } else {
            (v_s - w_s) + (w_s - u_s) * (gap_r / (gap_l + gap_r))
        }
    } else {
        0.0
    }
}

/// Like edge_sign but with s and t transposed.
pub fn trans_sign(u_s: Real, u_t: Real, v_s: Real, v_t: Real, w_s: Real, w_t: Real) -> Real {
    let gap_l = v_t - u_t;
    let gap_r = w_t - v_t;
    if gap_l + gap_r > 0.0 {
        orient2d(u_t, u_s, w_t, w_s, v_t, v_s)
    } else {
        0.0
    }
}

/// Returns true if (u, v, w) are in CCW order (or collinear).
#[inline]
pub fn vert_ccw(u_s: Real, u_t: Real, v_s: Real, v_t: Real, w_s: Real, w_t: Real) -> bool {
    orient2d(u_s, u_t, v_s, v_t, w_s, w_t) >= 0.0
}

/// L1 distance between two vertices.
#[inline]
pub fn vert_l1_dist(u_s: Real, u_t: Real, v_s: Real, v_t: Real) -> Real {
    (u_s - v_s).abs() + (u_t - v_t).abs()
}

/// Numerically stable interpolation: returns (b*x + a*y) / (a + b),
/// or (x + y) / 2 if a == b == 0. Negative weights are clamped to zero.
/// Guarantees MIN(x,y) <= result <= MAX(x,y).
#[inline]
pub fn real_interpolate(a: Real, x: Real, b: Real, y: Real) -> Real {
    let a = a.max(0.0);
    let b = b.max(0.0);
    if a <= b {
        if b == 0.0 {
            x / 2.0 + y / 2.0
        } else {
            x + (y - x) * (a / (a + b))
        }
    } else {
        y + (x - y) * (b / (a + b))
    }
}

// ───────────────────────── Adaptive orientation ─────────────────────────────

const EPSILON: Real = f64::EPSILON / 2.0;
const CCW_ERR_BOUND: Real = (3.0 + 16.0 * EPSILON) * EPSILON;

/// Twice the signed area of triangle (a, b, c); positive when CCW.
///
/// The magnitude is the plain f64 determinant. When that value is within
/// its rounding error bound, the sign is recomputed exactly.
pub fn orient2d(a_x: Real, a_y: Real, b_x: Real, b_y: Real, c_x: Real, c_y: Real) -> Real {
    let det_left = (a_x - c_x) * (b_y - c_y);
    let det_right = (a_y - c_y) * (b_x - c_x);
    let det = det_left - det_right;

    let det_sum = if det_left > 0.0 {
        if det_right <= 0.0 {
            return det;
        }
        det_left + det_right
    } else if det_left < 0.0 {
        if det_right >= 0.0 {
            return det;
        }
        -det_left - det_right
    } else {
        return det;
    };

    if det.abs() >= CCW_ERR_BOUND * det_sum || !det_sum.is_finite() {
        return det;
    }

    let exact = orient2d_exact(a_x, a_y, b_x, b_y, c_x, c_y);
    if exact == 0.0 {
        0.0
    } else if exact.signum() == det.signum() && det != 0.0 {
        det
    } else {
        exact
    }
}

#[inline]
fn two_sum(a: Real, b: Real) -> (Real, Real) {
    let x = a + b;
    let b_virt = x - a;
    let a_virt = x - b_virt;
    (x, (a - a_virt) + (b - b_virt))
}

#[inline]
fn two_diff(a: Real, b: Real) -> (Real, Real) {
    let x = a - b;
    let b_virt = a - x;
    let a_virt = x + b_virt;
    (x, (a - a_virt) + (b_virt - b))
}

#[inline]
fn two_product(a: Real, b: Real) -> (Real, Real) {
    let x = a * b;
    (x, a.mul_add(b, -x))
}

/// Adds `b` into a nonoverlapping expansion, dropping zero components.
fn grow_expansion(e: &mut Vec<Real>, b: Real) {
    let mut q = b;
    let mut out = Vec::with_capacity(e.len() + 1);
    for &component in e.iter() {
        let (sum, err) = two_sum(q, component);
        if err != 0.0 {
            out.push(err);
        }
        q = sum;
    }
    if q != 0.0 {
        out.push(q);
    }
    *e = out;
}

/// Exact orientation as an expansion; returns an approximation carrying the
/// exact sign.
fn orient2d_exact(a_x: Real, a_y: Real, b_x: Real, b_y: Real, c_x: Real, c_y: Real) -> Real {
    let (acx, acx_err) = two_diff(a_x, c_x);
    let (bcy, bcy_err) = two_diff(b_y, c_y);
    let (acy, acy_err) = two_diff(a_y, c_y);
    let (bcx, bcx_err) = two_diff(b_x, c_x);

    let mut expansion: Vec<Real> = Vec::with_capacity(16);
    for (l, r) in [(acx, bcy), (acx, bcy_err), (acx_err, bcy), (acx_err, bcy_err)] {
        let (p, e) = two_product(l, r);
        grow_expansion(&mut expansion, e);
        grow_expansion(&mut expansion, p);
    }
    for (l, r) in [(acy, bcx), (acy, bcx_err), (acy_err, bcx), (acy_err, bcx_err)] {
        let (p, e) = two_product(l, r);
        grow_expansion(&mut expansion, -e);
        grow_expansion(&mut expansion, -p);
    }

    // Components are ordered by increasing magnitude; the last one decides the sign.
    match expansion.last() {
        None => 0.0,
        Some(&top) => {
            let approx: Real = expansion.iter().sum();
            if approx != 0.0 && approx.signum() == top.signum() {
                approx
            } else {
                top
            }
        }
    }
}

/// Computes the intersection point of edges (o1,d1) and (o2,d2).
///
/// The result is guaranteed to lie within the bounding rectangle of the
/// intersection of both edges' bounding rectangles, whatever the rounding.
#[allow(clippy::too_many_arguments)]
pub fn edge_intersect(
    o1_s: Real,
    o1_t: Real,
    d1_s: Real,
    d1_t: Real,
    o2_s: Real,
    o2_t: Real,
    d2_s: Real,
    d2_t: Real,
) -> (Real, Real) {
    let v_s = intersect_axis(
        [(o1_s, o1_t), (d1_s, d1_t), (o2_s, o2_t), (d2_s, d2_t)],
        |a, b| vert_leq(a.0, a.1, b.0, b.1),
        |u, v, w| edge_eval(u.0, u.1, v.0, v.1, w.0, w.1),
        |u, v, w| edge_sign(u.0, u.1, v.0, v.1, w.0, w.1),
        |p| p.0,
    );
    let v_t = intersect_axis(
        [(o1_s, o1_t), (d1_s, d1_t), (o2_s, o2_t), (d2_s, d2_t)],
        |a, b| trans_leq(a.0, a.1, b.0, b.1),
        |u, v, w| trans_eval(u.0, u.1, v.0, v.1, w.0, w.1),
        |u, v, w| trans_sign(u.0, u.1, v.0, v.1, w.0, w.1),
        |p| p.1,
    );
    (v_s, v_t)
}

type Pt = (Real, Real);

/// One coordinate of edge_intersect. The two passes differ only in which
/// ordering, evaluation and projection they use.
fn intersect_axis(
    pts: [Pt; 4],
    leq: impl Fn(Pt, Pt) -> bool,
    eval: impl Fn(Pt, Pt, Pt) -> Real,
    sign: impl Fn(Pt, Pt, Pt) -> Real,
    coord: impl Fn(Pt) -> Real,
) -> Real {
    let [mut o1, mut d1, mut o2, mut d2] = pts;
    if !leq(o1, d1) {
        std::mem::swap(&mut o1, &mut d1);
    }
    if !leq(o2, d2) {
        std::mem::swap(&mut o2, &mut d2);
    }
    if !leq(o1, o2) {
        std::mem::swap(&mut o1, &mut o2);
        std::mem::swap(&mut d1, &mut d2);
    }

    if !leq(o2, d1) {
        // Technically no intersection; split the difference.
        coord(o2) / 2.0 + coord(d1) / 2.0
    } else if leq(d1, d2) {
        // Interpolate between o2 and d1.
        let mut z1 = eval(o1, o2, d1);
        let mut z2 = eval(o2, d1, d2);
        if z1 + z2 < 0.0 {
            z1 = -z1;
            z2 = -z2;
        }
        real_interpolate(z1, coord(o2), z2, coord(d1))
    } else {
        // Interpolate between o2 and d2.
        let mut z1 = sign(o1, o2, d1);
        let mut z2 = -sign(o1, d2, d1);
        if z1 + z2 < 0.0 {
            z1 = -z1;
            z2 = -z2;
        }
        real_interpolate(z1, coord(o2), z2, coord(d2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vert_leq_basic() {
        assert!(vert_leq(0.0, 0.0, 1.0, 0.0));
        assert!(vert_leq(0.0, 0.0, 0.0, 1.0));
        assert!(vert_leq(0.0, 0.0, 0.0, 0.0));
        assert!(!vert_leq(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn trans_leq_basic() {
        assert!(trans_leq(0.0, 0.0, 0.0, 1.0));
        assert!(trans_leq(0.0, 0.0, 1.0, 0.0));
        assert!(!trans_leq(0.0, 1.0, 0.0, 0.0));
    }

    #[test]
    fn edge_eval_distance_above_edge() {
        let r = edge_eval(0.0, 0.0, 0.5, 1.0, 1.0, 0.0);
        assert!((r - 1.0).abs() < 1e-12, "got {}", r);
    }

    #[test]
    fn edge_eval_vertical_returns_zero() {
        assert_eq!(edge_eval(0.0, 0.0, 0.0, 0.5, 0.0, 1.0), 0.0);
    }

    #[test]
    fn edge_sign_matches_edge_eval_sign() {
        let cases = [
            (0.0, 0.0, 0.5, 1.0, 1.0, 0.0),
            (0.0, 0.0, 0.5, -1.0, 1.0, 0.0),
            (0.0, 0.0, 0.3, 0.3, 1.0, 1.0),
            (-2.0, 1.0, 0.0, 3.0, 5.0, -4.0),
        ];
        for (us, ut, vs, vt, ws, wt) in cases {
            let e = edge_eval(us, ut, vs, vt, ws, wt);
            let s = edge_sign(us, ut, vs, vt, ws, wt);
            assert!(e.signum() == s.signum() || (e == 0.0 && s == 0.0), "{e} vs {s}");
        }
    }

    #[test]
    fn orient2d_agrees_with_exact_expansion() {
        // Nearly collinear points where the plain determinant is within its
        // rounding error.
        for (a, b, c) in [
            ((0.1, 0.1), (0.3, 0.3), (0.7, 0.7)),
            ((0.5, 0.5), (12.0, 12.0), (24.0, 24.0)),
            ((1e-3, 2e-3), (1.0, 2.0), (3.0, 6.000000000000001)),
        ] {
            let d = orient2d(a.0, a.1, b.0, b.1, c.0, c.1);
            let exact = orient2d_exact(a.0, a.1, b.0, b.1, c.0, c.1);
            assert!(d.signum() == exact.signum() || (d == 0.0 && exact == 0.0), "{d} vs {exact}");
        }
    }

    #[test]
    fn orient2d_tiny_perturbation_sign() {
        let eps = f64::EPSILON;
        let d = orient2d(0.0, 0.0, 1.0, 1.0, 0.5, 0.5 + eps);
        assert!(d > 0.0);
        let d = orient2d(0.0, 0.0, 1.0, 1.0, 0.5, 0.5 - eps);
        assert!(d < 0.0);
        let d = orient2d(0.0, 0.0, 1.0, 1.0, 0.5, 0.5);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn vert_ccw_basic() {
        assert!(vert_ccw(0.0, 0.0, 1.0, 0.0, 0.5, 1.0));
        assert!(!vert_ccw(0.0, 0.0, 0.5, 1.0, 1.0, 0.0));
    }

    #[test]
    fn real_interpolate_weights() {
        assert!((real_interpolate(0.0, 0.0, 0.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((real_interpolate(1.0, 0.0, 1.0, 2.0) - 1.0).abs() < 1e-12);
        assert!((real_interpolate(-3.0, 4.0, 1.0, 8.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn edge_intersect_crossing() {
        let (s, t) = edge_intersect(0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0);
        assert!((s - 0.5).abs() < 1e-12, "s={}", s);
        assert!((t - 0.5).abs() < 1e-12, "t={}", t);
    }

    #[test]
    fn edge_intersect_stays_in_bounds() {
        let (s, t) = edge_intersect(0.0, 0.0, 4.0, 4.0, 4.0, 0.0, 0.0, 4.0);
        assert!((s - 2.0).abs() < 1e-12);
        assert!((t - 2.0).abs() < 1e-12);
        let (s, t) = edge_intersect(0.0, 0.0, 10.0, 1e-9, 0.0, 1e-9, 10.0, 0.0);
        assert!((0.0..=10.0).contains(&s));
        assert!((0.0..=1e-9).contains(&t));
    }
}
