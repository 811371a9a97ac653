// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Emits the tessellated mesh through the callbacks. Triangles are grouped
// greedily into fans and strips; whatever cannot be grouped goes out as one
// batch of independent triangles.

use crate::callback::{PrimitiveType, TessCallback};
use crate::geom::Real;
use crate::mesh::{EdgeIdx, FaceIdx, Mesh, F_HEAD, INVALID};
use crate::winding::WindingRule;

/// A vertex held back until the polygon is known to need the full mesh.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CachedVertex {
    pub coords: [Real; 3],
    pub data: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GroupKind {
    Triangle,
    Fan,
    Strip,
}

#[derive(Clone, Copy, Debug)]
struct FaceGroup {
    size: usize,
    e_start: EdgeIdx,
    kind: GroupKind,
}

struct Renderer<'a, D, C> {
    mesh: &'a mut Mesh,
    data: &'a [D],
    cb: &'a mut C,
    edge_flags: bool,
    lonely: Vec<FaceIdx>,
    trail: Vec<FaceIdx>,
}

/// Emits every inside face of a triangulated mesh, as fans, strips and
/// loose triangles. With edge flags requested, everything is loose
/// triangles so each edge can carry its boundary flag.
pub(crate) fn render_mesh<D, C: TessCallback<D>>(mesh: &mut Mesh, data: &[D], cb: &mut C) {
    let edge_flags = cb.wants_edge_flags();
    let mut r = Renderer { mesh, data, cb, edge_flags, lonely: Vec::new(), trail: Vec::new() };

    let mut f = r.mesh.faces[F_HEAD as usize].next;
    while f != F_HEAD {
        r.mesh.faces[f as usize].marked = false;
        f = r.mesh.faces[f as usize].next;
    }

    let mut f = r.mesh.faces[F_HEAD as usize].next;
    while f != F_HEAD {
        if r.mesh.faces[f as usize].inside && !r.mesh.faces[f as usize].marked {
            r.render_maximum_face_group(f);
            debug_assert!(r.mesh.faces[f as usize].marked);
        }
        f = r.mesh.faces[f as usize].next;
    }

    if !r.lonely.is_empty() {
        r.render_lonely_triangles();
    }
}

/// Emits one line loop per inside face.
pub(crate) fn render_boundary<D, C: TessCallback<D>>(mesh: &Mesh, data: &[D], cb: &mut C) {
    for f in mesh.face_ids() {
        if !mesh.faces[f as usize].inside {
            continue;
        }
        cb.begin(PrimitiveType::LineLoop);
        let start = mesh.faces[f as usize].an_edge;
        let mut e = start;
        loop {
            emit(data, cb, mesh.verts[mesh.org(e) as usize].data);
            e = mesh.lnext(e);
            if e == start {
                break;
            }
        }
        cb.end();
    }
}

fn emit<D, C: TessCallback<D>>(data: &[D], cb: &mut C, slot: u32) {
    debug_assert!(slot != INVALID, "vertex without data");
    if let Some(d) = data.get(slot as usize) {
        cb.vertex(d);
    }
}

/// Result of comparing every triangle of the cached fan against the normal.
const SIGN_INCONSISTENT: i32 = 2;

/// Sums the fan triangles around cache[0]. Without `check` this accumulates
/// a normal into `norm`, flipping back-facing contributions.
///
/// With `check` it returns the common sign of the fan against `norm`, but
/// only for a strictly convex fan: every triangle must have that sign, and
/// every vertex must stay within a half-turn of cache[1] as seen from
/// cache[0]. A zero-area triangle among non-degenerate ones, or a vertex
/// that returns to cache[0], gives SIGN_INCONSISTENT. If every triangle is
/// degenerate the result is 0.
fn fan_normal(cache: &[CachedVertex], norm: &mut [Real; 3], check: bool) -> i32 {
    if !check {
        *norm = [0.0; 3];
    }
    let v0 = cache[0].coords;
    let sub = |c: [Real; 3]| [c[0] - v0[0], c[1] - v0[1], c[2] - v0[2]];
    let cross = |a: [Real; 3], b: [Real; 3]| {
        [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
    };
    let first = sub(cache[1].coords);
    let mut cur = first;
    let mut sign = 0;
    let mut flat = false;

    for vc in &cache[2..] {
        let prev = cur;
        cur = sub(vc.coords);
        let n = cross(prev, cur);
        let dot = n[0] * norm[0] + n[1] * norm[1] + n[2] * norm[2];
        if !check {
            // Back-facing triangles count negatively, which gives a usable
            // normal for self-intersecting input.
            let k = if dot >= 0.0 { 1.0 } else { -1.0 };
            for i in 0..3 {
                norm[i] += k * n[i];
            }
            continue;
        }
        if dot == 0.0 {
            flat = true;
            continue;
        }
        let r = cross(first, cur);
        let reach = r[0] * norm[0] + r[1] * norm[1] + r[2] * norm[2];
        if dot > 0.0 && reach > 0.0 {
            if sign < 0 {
                return SIGN_INCONSISTENT;
            }
            sign = 1;
        } else if dot < 0.0 && reach < 0.0 {
            if sign > 0 {
                return SIGN_INCONSISTENT;
            }
            sign = -1;
        } else {
            return SIGN_INCONSISTENT;
        }
    }
    if flat && sign != 0 {
        return SIGN_INCONSISTENT;
    }
    sign
}

/// Fast path for a single contour that is a strictly convex fan around its
/// first vertex. Returns false if the contour needs the full tessellator.
pub(crate) fn render_cache<D, C: TessCallback<D>>(
    cache: &[CachedVertex],
    data: &[D],
    normal: [Real; 3],
    rule: WindingRule,
    boundary_only: bool,
    cb: &mut C,
) -> bool {
    if cache.len() < 3 {
        // Degenerate contour; nothing to draw.
        return true;
    }

    let mut norm = normal;
    if norm == [0.0; 3] {
        fan_normal(cache, &mut norm, false);
    }
    let sign = fan_normal(cache, &mut norm, true);
    if sign == SIGN_INCONSISTENT {
        return false;
    }
    if sign == 0 {
        return true;
    }

    match rule {
        WindingRule::Odd | WindingRule::NonZero => {}
        WindingRule::Positive if sign < 0 => return true,
        WindingRule::Negative if sign > 0 => return true,
        WindingRule::Positive | WindingRule::Negative => {}
        WindingRule::AbsGeqTwo => return true,
    }

    let kind = if boundary_only {
        PrimitiveType::LineLoop
    } else if cache.len() > 3 {
        PrimitiveType::TriangleFan
    } else {
        PrimitiveType::Triangles
    };
    log::trace!("fast path: {:?} of {} vertices", kind, cache.len());

    cb.begin(kind);
    emit(data, cb, cache[0].data);
    if sign > 0 {
        for vc in &cache[1..] {
            emit(data, cb, vc.data);
        }
    } else {
        for vc in cache[1..].iter().rev() {
            emit(data, cb, vc.data);
        }
    }
    cb.end();
    true
}

impl<D, C: TessCallback<D>> Renderer<'_, D, C> {
    #[inline]
    fn marked(&self, f: FaceIdx) -> bool {
        let face = &self.mesh.faces[f as usize];
        !face.inside || face.marked
    }

    fn add_to_trail(&mut self, f: FaceIdx) {
        self.mesh.faces[f as usize].marked = true;
        self.trail.push(f);
    }

    fn clear_trail(&mut self) {
        for f in self.trail.drain(..) {
            self.mesh.faces[f as usize].marked = false;
        }
    }

    fn vertex_of(&mut self, v: u32) {
        emit(self.data, &mut *self.cb, self.mesh.verts[v as usize].data);
    }

    /// Picks the largest fan or strip through `f` and renders it. Falls back
    /// to a lone triangle, which is always the case with edge flags.
    fn render_maximum_face_group(&mut self, f: FaceIdx) {
        let e = self.mesh.faces[f as usize].an_edge;
        let mut best = FaceGroup { size: 1, e_start: e, kind: GroupKind::Triangle };

        if !self.edge_flags {
            let candidates = [e, self.mesh.lnext(e), self.mesh.lprev(e)];
            for start in candidates {
                let g = self.maximum_fan(start);
                if g.size > best.size {
                    best = g;
                }
            }
            for start in candidates {
                let g = self.maximum_strip(start);
                if g.size > best.size {
                    best = g;
                }
            }
        }

        match best.kind {
            GroupKind::Triangle => {
                debug_assert_eq!(best.size, 1);
                let lf = self.mesh.lface(best.e_start);
                self.mesh.faces[lf as usize].marked = true;
                self.lonely.push(lf);
            }
            GroupKind::Fan => self.render_fan(best.e_start, best.size),
            GroupKind::Strip => self.render_strip(best.e_start, best.size),
        }
    }

    fn maximum_fan(&mut self, e_orig: EdgeIdx) -> FaceGroup {
        let mut size = 0;
        let mut e = e_orig;
        while !self.marked(self.mesh.lface(e)) {
            self.add_to_trail(self.mesh.lface(e));
            size += 1;
            e = self.mesh.onext(e);
        }
        e = e_orig;
        while !self.marked(self.mesh.rface(e)) {
            self.add_to_trail(self.mesh.rface(e));
            size += 1;
            e = self.mesh.oprev(e);
        }
        self.clear_trail();
        FaceGroup { size, e_start: e, kind: GroupKind::Fan }
    }

    fn maximum_strip(&mut self, e_orig: EdgeIdx) -> FaceGroup {
        let mut tail = 0;
        let mut e = e_orig;
        while !self.marked(self.mesh.lface(e)) {
            self.add_to_trail(self.mesh.lface(e));
            tail += 1;
            e = self.mesh.dprev(e);
            if self.marked(self.mesh.lface(e)) {
                break;
            }
            self.add_to_trail(self.mesh.lface(e));
            tail += 1;
            e = self.mesh.onext(e);
        }
        let e_tail = e;

        let mut head = 0;
        e = e_orig;
        while !self.marked(self.mesh.rface(e)) {
            self.add_to_trail(self.mesh.rface(e));
            head += 1;
            e = self.mesh.oprev(e);
            if self.marked(self.mesh.rface(e)) {
                break;
            }
            self.add_to_trail(self.mesh.rface(e));
            head += 1;
            e = self.mesh.dnext(e);
        }
        let e_head = e;
        self.clear_trail();

        // A strip must start on an even triangle to keep its orientation.
        let mut size = tail + head;
        let e_start = if tail % 2 == 0 {
            e_tail ^ 1
        } else if head % 2 == 0 {
            e_head
        } else {
            size -= 1;
            self.mesh.onext(e_head)
        };
        FaceGroup { size, e_start, kind: GroupKind::Strip }
    }

    fn render_lonely_triangles(&mut self) {
        let lonely = std::mem::take(&mut self.lonely);
        // Unknown until the first vertex.
        let mut edge_state: Option<bool> = None;

        self.cb.begin(PrimitiveType::Triangles);
        for f in lonely {
            let start = self.mesh.faces[f as usize].an_edge;
            let mut e = start;
            loop {
                if self.edge_flags {
                    let boundary = !self.mesh.faces[self.mesh.rface(e) as usize].inside;
                    if edge_state != Some(boundary) {
                        edge_state = Some(boundary);
                        self.cb.edge_flag(boundary);
                    }
                }
                self.vertex_of(self.mesh.org(e));
                e = self.mesh.lnext(e);
                if e == start {
                    break;
                }
            }
        }
        self.cb.end();
    }

    fn render_fan(&mut self, e: EdgeIdx, size: usize) {
        let mut e = e;
        let mut size = size;
        self.cb.begin(PrimitiveType::TriangleFan);
        self.vertex_of(self.mesh.org(e));
        self.vertex_of(self.mesh.dst(e));
        while !self.marked(self.mesh.lface(e)) {
            let lf = self.mesh.lface(e);
            self.mesh.faces[lf as usize].marked = true;
            size -= 1;
            e = self.mesh.onext(e);
            self.vertex_of(self.mesh.dst(e));
        }
        debug_assert_eq!(size, 0);
        self.cb.end();
    }

    fn render_strip(&mut self, e: EdgeIdx, size: usize) {
        let mut e = e;
        let mut size = size;
        self.cb.begin(PrimitiveType::TriangleStrip);
        self.vertex_of(self.mesh.org(e));
        self.vertex_of(self.mesh.dst(e));
        while !self.marked(self.mesh.lface(e)) {
            let lf = self.mesh.lface(e);
            self.mesh.faces[lf as usize].marked = true;
            size -= 1;
            e = self.mesh.dprev(e);
            self.vertex_of(self.mesh.org(e));
            if self.marked(self.mesh.lface(e)) {
                break;
            }
            let lf = self.mesh.lface(e);
            self.mesh.faces[lf as usize].marked = true;
            size -= 1;
            e = self.mesh.onext(e);
            self.vertex_of(self.mesh.dst(e));
        }
        debug_assert_eq!(size, 0);
        self.cb.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Recorder;

    fn cache(points: &[(Real, Real)]) -> (Vec<CachedVertex>, Vec<u32>) {
        let cache = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| CachedVertex { coords: [x, y, 0.0], data: i as u32 })
            .collect();
        (cache, (0..points.len() as u32).collect())
    }

    /// A CCW polygon mesh with its interior triangulated.
    fn triangulated(points: &[(Real, Real)]) -> (Mesh, Vec<u32>) {
        let mut mesh = Mesh::new();
        let e = mesh.make_edge();
        mesh.splice(e, e ^ 1);
        let mut last = e;
        for _ in 1..points.len() {
            mesh.split_edge(last);
            last = mesh.lnext(last);
        }
        let mut cur = e;
        for (i, &(s, t)) in points.iter().enumerate() {
            let v = mesh.org(cur) as usize;
            mesh.verts[v].s = s;
            mesh.verts[v].t = t;
            mesh.verts[v].data = i as u32;
            cur = mesh.lnext(cur);
        }
        let f = mesh.lface(e);
        mesh.faces[f as usize].inside = true;
        mesh.tessellate_interior();
        (mesh, (0..points.len() as u32).collect())
    }

    const HEXAGON: &[(Real, Real)] = &[(0.0, 0.0), (2.0, -1.0), (4.0, 0.0), (4.0, 2.0), (2.0, 3.0), (0.0, 2.0)];

    #[test]
    fn convex_cache_renders_as_fan() {
        let (c, data) = cache(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let mut rec = Recorder::new();
        assert!(render_cache(&c, &data, [0.0; 3], WindingRule::Odd, false, &mut rec));
        assert_eq!(rec.primitives.len(), 1);
        assert_eq!(rec.primitives[0].kind, PrimitiveType::TriangleFan);
        assert_eq!(rec.primitives[0].vertices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn cache_orientation_follows_supplied_normal() {
        let (c, data) = cache(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        let mut rec = Recorder::new();
        assert!(render_cache(&c, &data, [0.0, 0.0, -1.0], WindingRule::Odd, false, &mut rec));
        assert_eq!(rec.primitives[0].kind, PrimitiveType::Triangles);
        assert_eq!(rec.primitives[0].vertices, vec![0, 2, 1]);

        let mut rec = Recorder::new();
        assert!(render_cache(&c, &data, [0.0, 0.0, -1.0], WindingRule::Positive, false, &mut rec));
        assert!(rec.primitives.is_empty());
    }

    #[test]
    fn concave_cache_is_refused() {
        // The fan around (0, 0) folds back at (3, 1).
        let (c, data) = cache(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (3.0, 1.0), (0.0, 4.0)]);
        let mut rec = Recorder::new();
        assert!(!render_cache(&c, &data, [0.0; 3], WindingRule::Odd, false, &mut rec));
        assert!(rec.primitives.is_empty());
    }

    #[test]
    fn cache_revisiting_its_first_vertex_is_refused() {
        // Two triangles sharing (0, 1); the fan triangles through the repeat are flat.
        let (c, data) = cache(&[(0.0, 1.0), (0.0, 2.0), (3.0, 1.0), (0.0, 1.0), (0.0, 3.0), (2.0, 1.0)]);
        for rule in [WindingRule::Odd, WindingRule::AbsGeqTwo] {
            let mut rec = Recorder::new();
            assert!(!render_cache(&c, &data, [0.0; 3], rule, false, &mut rec));
            assert!(rec.primitives.is_empty());
        }
    }

    #[test]
    fn cache_winding_past_a_half_turn_is_refused() {
        // Every fan triangle is CCW, but the last one overlaps the first.
        let (c, data) = cache(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (-4.0, -1.0), (1.0, -4.0), (3.0, 1.0)]);
        let mut rec = Recorder::new();
        assert!(!render_cache(&c, &data, [0.0; 3], WindingRule::NonZero, false, &mut rec));
        assert!(!render_cache(&c, &data, [0.0, 0.0, 1.0], WindingRule::Positive, false, &mut rec));
        assert!(rec.primitives.is_empty());
    }

    #[test]
    fn degenerate_cache_draws_nothing() {
        let (c, data) = cache(&[(0.0, 0.0), (1.0, 1.0)]);
        let mut rec = Recorder::new();
        assert!(render_cache(&c, &data, [0.0; 3], WindingRule::Odd, false, &mut rec));
        let (c, data) = cache(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(render_cache(&c, &data, [0.0; 3], WindingRule::Odd, false, &mut rec));
        assert!(rec.primitives.is_empty());
    }

    #[test]
    fn boundary_cache_is_a_line_loop() {
        let (c, data) = cache(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let mut rec = Recorder::new();
        assert!(render_cache(&c, &data, [0.0; 3], WindingRule::NonZero, true, &mut rec));
        assert_eq!(rec.line_loops(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn mesh_renders_every_triangle_once() {
        let (mut mesh, data) = triangulated(HEXAGON);
        let mut rec = Recorder::new();
        render_mesh(&mut mesh, &data, &mut rec);
        let tris = rec.triangles();
        assert_eq!(tris.len(), 4);
        let mut seen: Vec<[u32; 3]> = tris
            .iter()
            .map(|t| {
                let mut s = *t;
                s.sort_unstable();
                s
            })
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 4);
        for t in &tris {
            let p = |i: u32| HEXAGON[i as usize];
            let (a, b, c) = (p(t[0]), p(t[1]), p(t[2]));
            let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
            assert!(cross > 0.0, "triangle {t:?} is not CCW");
        }
    }

    #[test]
    fn edge_flags_force_loose_triangles() {
        let (mut mesh, data) = triangulated(HEXAGON);
        let mut rec = Recorder::new().with_edge_flags();
        render_mesh(&mut mesh, &data, &mut rec);
        assert_eq!(rec.primitives.len(), 1);
        let p = &rec.primitives[0];
        assert_eq!(p.kind, PrimitiveType::Triangles);
        assert_eq!(p.vertices.len(), 12);
        // Six hexagon sides are boundary; three diagonals are used twice.
        assert_eq!(p.edge_flags.iter().filter(|&&b| b).count(), 6);
    }

    #[test]
    fn boundary_walks_each_inside_face() {
        let mut mesh = Mesh::new();
        let e = mesh.make_edge();
        mesh.splice(e, e ^ 1);
        mesh.split_edge(e);
        mesh.split_edge(e);
        let mut cur = e;
        for i in 0..3 {
            let v = mesh.org(cur) as usize;
            mesh.verts[v].data = i;
            cur = mesh.lnext(cur);
        }
        let f = mesh.lface(e);
        mesh.faces[f as usize].inside = true;
        mesh.faces[f as usize].an_edge = e;
        let mut rec = Recorder::new();
        render_boundary(&mesh, &[10, 11, 12], &mut rec);
        assert_eq!(rec.line_loops().len(), 1);
        let mut loop_ = rec.line_loops()[0].clone();
        loop_.sort_unstable();
        assert_eq!(loop_, vec![10, 11, 12]);
    }
}
