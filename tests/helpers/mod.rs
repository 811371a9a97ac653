// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Shared test utilities for glu-sweep tests.

#![allow(dead_code)]

use glu_sweep::{Recorder, Tessellator, WindingRule};

pub type Positions = Tessellator<[f64; 3], Recorder<[f64; 3]>>;

/// A tessellator whose vertex data is the vertex position.
pub fn positions() -> Positions {
    Tessellator::new(Recorder::positions())
}

/// Lifts 2D points into the z = 0 plane.
pub fn lift(points: &[[f64; 2]]) -> Vec<[f64; 3]> {
    points.iter().map(|p| [p[0], p[1], 0.0]).collect()
}

/// Feeds one polygon through the full begin/contour/vertex/end sequence.
pub fn feed(tess: &mut Positions, contours: &[Vec<[f64; 3]>], rule: WindingRule, boundary_only: bool) {
    tess.begin_polygon(rule, boundary_only);
    for contour in contours {
        tess.begin_contour();
        for &p in contour {
            tess.add_vertex(p, p);
        }
        tess.end_contour();
    }
    tess.end_polygon();
}

/// Tessellates 2D contours and returns the recorder with everything emitted.
pub fn tessellate(contours: &[Vec<[f64; 2]>], rule: WindingRule, boundary_only: bool) -> Recorder<[f64; 3]> {
    let lifted: Vec<_> = contours.iter().map(|c| lift(c)).collect();
    tessellate_3d(&lifted, rule, boundary_only)
}

/// Like `tessellate`, with the plane normal fixed to +z so that CCW
/// contours wind positively.
pub fn tessellate_xy(contours: &[Vec<[f64; 2]>], rule: WindingRule) -> Recorder<[f64; 3]> {
    let lifted: Vec<_> = contours.iter().map(|c| lift(c)).collect();
    let mut tess = positions();
    tess.set_normal([0.0, 0.0, 1.0]);
    feed(&mut tess, &lifted, rule, false);
    tess.into_callback()
}

pub fn tessellate_3d(contours: &[Vec<[f64; 3]>], rule: WindingRule, boundary_only: bool) -> Recorder<[f64; 3]> {
    let mut tess = positions();
    feed(&mut tess, contours, rule, boundary_only);
    tess.into_callback()
}

/// Signed area of a triangle in the xy plane.
pub fn triangle_area(t: &[[f64; 3]; 3]) -> f64 {
    let [a, b, c] = t;
    0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]))
}

/// Unsigned area of a triangle in 3D.
pub fn triangle_area_3d(t: &[[f64; 3]; 3]) -> f64 {
    let [a, b, c] = t;
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [u[1] * v[2] - u[2] * v[1], u[2] * v[0] - u[0] * v[2], u[0] * v[1] - u[1] * v[0]];
    0.5 * (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt()
}

pub fn total_area(rec: &Recorder<[f64; 3]>) -> f64 {
    rec.triangles().iter().map(|t| triangle_area(t).abs()).sum()
}

pub fn total_signed_area(rec: &Recorder<[f64; 3]>) -> f64 {
    rec.triangles().iter().map(triangle_area).sum()
}

/// Shoelace area of a closed polygon in the xy plane.
pub fn polygon_signed_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i][0] * points[j][1] - points[j][0] * points[i][1];
    }
    area * 0.5
}

pub fn assert_area_approx(actual: f64, expected: f64, tolerance: f64, label: &str) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{}: expected area ~{}, got {} (diff={})",
        label,
        expected,
        actual,
        (actual - expected).abs()
    );
}

/// Every triangle is CCW in the xy plane and none is degenerate.
pub fn verify_ccw_triangles(rec: &Recorder<[f64; 3]>, epsilon: f64) {
    for (i, t) in rec.triangles().iter().enumerate() {
        let area = triangle_area(t);
        assert!(area > epsilon, "triangle {} is not CCW or is degenerate (area={}, {:?})", i, area, t);
    }
}

/// Every emitted vertex is finite and, unless it came from combine, one of
/// the input points.
pub fn verify_vertices_from(rec: &Recorder<[f64; 3]>, inputs: &[[f64; 2]]) {
    for p in &rec.primitives {
        for v in &p.vertices {
            assert!(v.iter().all(|x| x.is_finite()), "non-finite vertex {:?}", v);
            assert!(
                inputs.iter().any(|q| q[0] == v[0] && q[1] == v[1]),
                "vertex {:?} is not an input vertex",
                v
            );
        }
    }
}

/// Winding number of the contours around `p`, counting CCW turns as
/// positive. `p` must not lie on an edge.
pub fn winding_number(contours: &[Vec<[f64; 2]>], p: [f64; 2]) -> i32 {
    let mut w = 0;
    for c in contours {
        for i in 0..c.len() {
            let (a, b) = (c[i], c[(i + 1) % c.len()]);
            let side = (b[0] - a[0]) * (p[1] - a[1]) - (p[0] - a[0]) * (b[1] - a[1]);
            if a[1] <= p[1] && p[1] < b[1] && side > 0.0 {
                w += 1;
            } else if b[1] <= p[1] && p[1] < a[1] && side < 0.0 {
                w -= 1;
            }
        }
    }
    w
}

/// Distance from `p` to the closest edge of the contours.
pub fn distance_to_edges(contours: &[Vec<[f64; 2]>], p: [f64; 2]) -> f64 {
    let mut best = f64::INFINITY;
    for c in contours {
        for i in 0..c.len() {
            let (a, b) = (c[i], c[(i + 1) % c.len()]);
            let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
            let len2 = dx * dx + dy * dy;
            let t = if len2 == 0.0 { 0.0 } else { (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0) };
            let (qx, qy) = (a[0] + t * dx - p[0], a[1] + t * dy - p[1]);
            best = best.min((qx * qx + qy * qy).sqrt());
        }
    }
    best
}

/// Number of emitted triangles, of either orientation, containing `p`.
/// None if `p` is too close to a triangle edge to decide.
pub fn covering_triangles(rec: &Recorder<[f64; 3]>, p: [f64; 2], eps: f64) -> Option<usize> {
    let side = |a: [f64; 3], b: [f64; 3]| (b[0] - a[0]) * (p[1] - a[1]) - (p[0] - a[0]) * (b[1] - a[1]);
    let mut count = 0;
    for [a, b, c] in rec.triangles() {
        if triangle_area(&[a, b, c]) == 0.0 {
            continue;
        }
        let d = [side(a, b), side(b, c), side(c, a)];
        if d.iter().any(|x| x.abs() < eps) {
            return None;
        }
        if d.iter().all(|&x| x > 0.0) || d.iter().all(|&x| x < 0.0) {
            count += 1;
        }
    }
    Some(count)
}

pub fn square(x0: f64, y0: f64, size: f64) -> Vec<[f64; 2]> {
    vec![[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size]]
}

pub fn reversed(mut points: Vec<[f64; 2]>) -> Vec<[f64; 2]> {
    points.reverse();
    points
}

/// A CCW regular polygon.
pub fn regular_polygon(n: usize, radius: f64) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            [radius * a.cos(), radius * a.sin()]
        })
        .collect()
}

/// A CCW star alternating between the outer and inner radius.
pub fn star(points: usize, outer: f64, inner: f64) -> Vec<[f64; 2]> {
    (0..points * 2)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let a = std::f64::consts::PI * i as f64 / points as f64;
            [r * a.cos(), r * a.sin()]
        })
        .collect()
}
