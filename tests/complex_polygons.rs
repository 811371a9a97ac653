// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Larger and concave inputs: area conservation and triangle validity.

mod helpers;

use glu_sweep::{WindingRule, TESS_MAX_CACHE};
use helpers::{
    assert_area_approx, polygon_signed_area, regular_polygon, star, tessellate, tessellate_xy, total_area, triangle_area,
};

#[test]
fn polygon_larger_than_the_cache() {
    let n = TESS_MAX_CACHE + 50;
    let poly = regular_polygon(n, 10.0);
    let rec = tessellate(&[poly.clone()], WindingRule::Odd, false);
    assert!(rec.errors.is_empty());
    assert_eq!(rec.triangles().len(), n - 2);
    assert_area_approx(total_area(&rec), polygon_signed_area(&poly), 1e-9, "150-gon");
    helpers::verify_ccw_triangles(&rec, 0.0);
    helpers::verify_vertices_from(&rec, &poly);
}

#[test]
fn polygon_exactly_at_the_cache_limit() {
    let poly = regular_polygon(TESS_MAX_CACHE, 3.0);
    let rec = tessellate(&[poly.clone()], WindingRule::Odd, false);
    assert_area_approx(total_area(&rec), polygon_signed_area(&poly), 1e-9, "100-gon");
}

#[test]
fn star_keeps_its_area() {
    let poly = star(12, 10.0, 3.0);
    let rec = tessellate(&[poly.clone()], WindingRule::NonZero, false);
    assert_eq!(rec.triangles().len(), poly.len() - 2);
    assert_area_approx(total_area(&rec), polygon_signed_area(&poly), 1e-9, "star");
    helpers::verify_ccw_triangles(&rec, 0.0);
}

#[test]
fn comb_keeps_its_area() {
    // A comb with teeth pointing up: many reflex vertices along one chain.
    let teeth = 20;
    let mut poly = vec![[0.0, 0.0], [teeth as f64 * 2.0, 0.0]];
    for i in (0..teeth).rev() {
        let x = i as f64 * 2.0;
        poly.push([x + 2.0, 5.0]);
        poly.push([x + 1.0, 5.0]);
        poly.push([x + 1.0, 1.0]);
        poly.push([x, 1.0]);
    }
    let expected = polygon_signed_area(&poly);
    let rec = tessellate(&[poly.clone()], WindingRule::Odd, false);
    assert_area_approx(total_area(&rec), expected, 1e-9, "comb");
    helpers::verify_ccw_triangles(&rec, 0.0);
    helpers::verify_vertices_from(&rec, &poly);
}

#[test]
fn pentagram_odd_excludes_the_center() {
    let outer = 10.0;
    let inner = outer * (72f64.to_radians().cos() / 36f64.to_radians().cos());
    let tips = regular_polygon(5, outer);
    let pentagram: Vec<_> = (0..5).map(|i| tips[(i * 2) % 5]).collect();

    let outline = polygon_signed_area(&star(5, outer, inner));
    let center = 2.5 * inner * inner * 72f64.to_radians().sin();

    let rec = tessellate(&[pentagram.clone()], WindingRule::Odd, false);
    assert_eq!(rec.combine_calls, 5);
    assert_area_approx(total_area(&rec), outline - center, 1e-9, "odd pentagram");

    let rec = tessellate(&[pentagram.clone()], WindingRule::NonZero, false);
    assert_area_approx(total_area(&rec), outline, 1e-9, "nonzero pentagram");

    let rec = tessellate(&[pentagram], WindingRule::AbsGeqTwo, false);
    assert_area_approx(total_area(&rec), center, 1e-9, "abs_geq_two pentagram");
}

#[test]
fn grid_of_many_contours() {
    let mut contours = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            contours.push(helpers::square(i as f64 * 3.0, j as f64 * 3.0, 2.0));
        }
    }
    let rec = tessellate(&contours, WindingRule::Odd, false);
    assert!(rec.errors.is_empty());
    assert_eq!(rec.triangles().len(), 200);
    assert_area_approx(total_area(&rec), 400.0, 1e-9, "grid");
}

#[test]
fn contours_sharing_an_edge_merge() {
    // Two squares sharing the edge x = 2: the shared edge cancels under
    // NonZero and the result covers both.
    let left = helpers::square(0.0, 0.0, 2.0);
    let right = helpers::square(2.0, 0.0, 2.0);
    let rec = tessellate(&[left, right], WindingRule::NonZero, false);
    assert!(rec.errors.is_empty());
    assert_area_approx(total_area(&rec), 8.0, 1e-9, "shared edge");
}

#[test]
fn boundary_of_shared_edge_squares_is_one_loop() {
    let left = helpers::square(0.0, 0.0, 2.0);
    let right = helpers::square(2.0, 0.0, 2.0);
    let rec = tessellate(&[left, right], WindingRule::NonZero, true);
    let loops = rec.line_loops();
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 6);
}

#[test]
fn spiral_keeps_its_area() {
    // A thick spiral strip: a long, thin, heavily concave polygon.
    let turns = 3.0;
    let steps = 120;
    let mut outer_edge = Vec::new();
    let mut inner_edge = Vec::new();
    for k in 0..=steps {
        let a = turns * std::f64::consts::TAU * k as f64 / steps as f64;
        let r = 2.0 + a;
        outer_edge.push([(r + 1.0) * a.cos(), (r + 1.0) * a.sin()]);
        inner_edge.push([r * a.cos(), r * a.sin()]);
    }
    inner_edge.reverse();
    let mut poly = outer_edge;
    poly.extend(inner_edge);
    let expected = polygon_signed_area(&poly).abs();

    let rec = tessellate(&[poly], WindingRule::Odd, false);
    assert!(rec.errors.is_empty());
    assert_area_approx(total_area(&rec), expected, 1e-6, "spiral");
}

#[test]
fn contour_through_its_first_vertex_twice_counts_the_overlap() {
    // Two CW triangles joined at (0, 1). They overlap in a patch of area
    // 1.25 that is wound twice, and share parts of two edges.
    let poly = vec![[0.0, 1.0], [0.0, 2.0], [3.0, 1.0], [0.0, 1.0], [0.0, 3.0], [2.0, 1.0]];
    for (rule, expected) in [(WindingRule::Odd, 1.0), (WindingRule::NonZero, 2.25), (WindingRule::AbsGeqTwo, 1.25)] {
        let rec = tessellate(&[poly.clone()], rule, false);
        assert!(rec.errors.is_empty(), "{:?}: {:?}", rule, rec.errors);
        assert_area_approx(total_area(&rec), expected, 1e-9, &format!("{:?}", rule));
        for t in rec.triangles() {
            assert!(triangle_area(&t).abs() > 1e-12, "{:?}: flat triangle {:?}", rule, t);
        }
    }

    // Against +z both triangles wind negatively.
    assert_area_approx(total_area(&tessellate_xy(&[poly.clone()], WindingRule::Negative)), 2.25, 1e-9, "negative");
    assert!(tessellate_xy(&[poly], WindingRule::Positive).primitives.is_empty());
}
