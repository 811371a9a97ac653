// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Half-edge mesh (Guibas/Stolfi quad-edge restricted to a single manifold).
//
// Storage:
//   - Vertices, faces and half-edges live in Vec arenas addressed by u32.
//   - INVALID = u32::MAX is the null index.
//   - Half-edges are allocated in pairs: edges[e] and edges[e ^ 1] are twins.
//   - Index 0 of each arena is a list-head sentinel (V_HEAD, F_HEAD, E_HEAD).
//   - Deleted elements are unlinked from their list and left in place.
//
// Every topological change goes through make_edge, splice, delete_edge,
// add_edge_vertex, split_edge and connect, which keep the mesh consistent
// after each call (check_mesh verifies this).

use std::collections::TryReserveError;

use crate::geom::{self, Real};
use crate::priorityq::PqHandle;

pub const INVALID: u32 = u32::MAX;

/// Index into Mesh::verts
pub type VertIdx = u32;
/// Index into Mesh::faces
pub type FaceIdx = u32;
/// Index into Mesh::edges
pub type EdgeIdx = u32;

pub const V_HEAD: VertIdx = 0;
pub const F_HEAD: FaceIdx = 0;
pub const E_HEAD: EdgeIdx = 0;
pub const E_HEAD_SYM: EdgeIdx = 1;

/// The twin half-edge.
#[inline(always)]
pub fn sym(e: EdgeIdx) -> EdgeIdx {
    e ^ 1
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub next: VertIdx,
    pub prev: VertIdx,
    /// Some half-edge with this origin.
    pub an_edge: EdgeIdx,
    pub coords: [Real; 3],
    /// Projected sweep-plane coordinates.
    pub s: Real,
    pub t: Real,
    pub pq_handle: Option<PqHandle>,
    /// Slot of the caller's vertex data, or INVALID for sentinel vertices.
    pub data: u32,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            next: INVALID,
            prev: INVALID,
            an_edge: INVALID,
            coords: [0.0; 3],
            s: 0.0,
            t: 0.0,
            pq_handle: None,
            data: INVALID,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Face {
    pub next: FaceIdx,
    pub prev: FaceIdx,
    pub an_edge: EdgeIdx,
    /// Scratch flag for the renderer.
    pub marked: bool,
    /// This face is in the polygon interior.
    pub inside: bool,
}

#[derive(Clone, Debug)]
pub struct HalfEdge {
    /// Next edge pair in the global list. For odd halves this is the
    /// previous pair, so the list is walked in both directions.
    pub next: EdgeIdx,
    /// Next edge CCW around the origin.
    pub onext: EdgeIdx,
    /// Next edge CCW around the left face.
    pub lnext: EdgeIdx,
    pub org: VertIdx,
    pub lface: FaceIdx,
    /// Sweep region whose upper edge this is, or INVALID.
    pub active_region: u32,
    /// Change in winding number when crossing from the right face to the left.
    pub winding: i32,
}

impl Default for HalfEdge {
    fn default() -> Self {
        Self {
            next: INVALID,
            onext: INVALID,
            lnext: INVALID,
            org: INVALID,
            lface: INVALID,
            active_region: INVALID,
            winding: 0,
        }
    }
}

/// The half-edge mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub verts: Vec<Vertex>,
    pub faces: Vec<Face>,
    pub edges: Vec<HalfEdge>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        let v_head = Vertex { next: V_HEAD, prev: V_HEAD, ..Vertex::default() };
        let f_head = Face { next: F_HEAD, prev: F_HEAD, an_edge: INVALID, ..Face::default() };
        let e_head = HalfEdge { next: E_HEAD, ..HalfEdge::default() };
        let e_head_sym = HalfEdge { next: E_HEAD_SYM, ..HalfEdge::default() };
        Mesh { verts: vec![v_head], faces: vec![f_head], edges: vec![e_head, e_head_sym] }
    }

    /// Reserves arena space for `vertices` more contour vertices. Each one
    /// costs at most one vertex, one edge pair and one face.
    pub fn try_reserve(&mut self, vertices: usize) -> Result<(), TryReserveError> {
        self.verts.try_reserve(vertices)?;
        self.edges.try_reserve(vertices.saturating_mul(2))?;
        self.faces.try_reserve(vertices)?;
        Ok(())
    }

    // ─────────────────────────── Navigation ──────────────────────────────────

    #[inline]
    pub fn org(&self, e: EdgeIdx) -> VertIdx {
        self.edges[e as usize].org
    }

    #[inline]
    pub fn dst(&self, e: EdgeIdx) -> VertIdx {
        self.edges[(e ^ 1) as usize].org
    }

    #[inline]
    pub fn lface(&self, e: EdgeIdx) -> FaceIdx {
        self.edges[e as usize].lface
    }

    #[inline]
    pub fn rface(&self, e: EdgeIdx) -> FaceIdx {
        self.edges[(e ^ 1) as usize].lface
    }

    #[inline]
    pub fn onext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].onext
    }

    #[inline]
    pub fn lnext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].lnext
    }

    /// Sym->Lnext
    #[inline]
    pub fn oprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[(e ^ 1) as usize].lnext
    }

    /// Onext->Sym
    #[inline]
    pub fn lprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].onext ^ 1
    }

    /// Lnext->Sym
    #[inline]
    pub fn dprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].lnext ^ 1
    }

    /// Sym->Onext
    #[inline]
    pub fn rprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[(e ^ 1) as usize].onext
    }

    /// Rprev->Sym
    #[inline]
    pub fn dnext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[(e ^ 1) as usize].onext ^ 1
    }

    /// Oprev->Sym
    #[inline]
    pub fn rnext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[(e ^ 1) as usize].lnext ^ 1
    }

    // ────────────────────── Vertex geometry shortcuts ─────────────────────────

    #[inline]
    pub fn st(&self, v: VertIdx) -> (Real, Real) {
        let v = &self.verts[v as usize];
        (v.s, v.t)
    }

    #[inline]
    pub fn vert_leq(&self, u: VertIdx, v: VertIdx) -> bool {
        let (us, ut) = self.st(u);
        let (vs, vt) = self.st(v);
        geom::vert_leq(us, ut, vs, vt)
    }

    #[inline]
    pub fn vert_eq(&self, u: VertIdx, v: VertIdx) -> bool {
        let (us, ut) = self.st(u);
        let (vs, vt) = self.st(v);
        geom::vert_eq(us, ut, vs, vt)
    }

    #[inline]
    pub fn edge_sign(&self, u: VertIdx, v: VertIdx, w: VertIdx) -> Real {
        let (us, ut) = self.st(u);
        let (vs, vt) = self.st(v);
        let (ws, wt) = self.st(w);
        geom::edge_sign(us, ut, vs, vt, ws, wt)
    }

    #[inline]
    pub fn edge_eval(&self, u: VertIdx, v: VertIdx, w: VertIdx) -> Real {
        let (us, ut) = self.st(u);
        let (vs, vt) = self.st(v);
        let (ws, wt) = self.st(w);
        geom::edge_eval(us, ut, vs, vt, ws, wt)
    }

    /// Dst <= Org
    #[inline]
    pub fn edge_goes_left(&self, e: EdgeIdx) -> bool {
        self.vert_leq(self.dst(e), self.org(e))
    }

    /// Org <= Dst
    #[inline]
    pub fn edge_goes_right(&self, e: EdgeIdx) -> bool {
        self.vert_leq(self.org(e), self.dst(e))
    }

    // ──────────────────────── Allocation helpers ─────────────────────────────

    /// Allocates an edge pair and links it into the global list before
    /// `e_next`. The pair forms an isolated loop with no vertices or faces.
    fn make_edge_pair(&mut self, e_next: EdgeIdx) -> EdgeIdx {
        let e_next = e_next & !1;
        let e_new = self.edges.len() as EdgeIdx;
        let e_sym = e_new ^ 1;

        // The previous pair is stored in the twin's `next`.
        let e_prev = self.edges[(e_next ^ 1) as usize].next;

        self.edges.push(HalfEdge { next: e_next, onext: e_new, lnext: e_sym, ..HalfEdge::default() });
        self.edges.push(HalfEdge { next: e_prev, onext: e_sym, lnext: e_new, ..HalfEdge::default() });

        self.edges[(e_prev ^ 1) as usize].next = e_new;
        self.edges[(e_next ^ 1) as usize].next = e_sym;
        e_new
    }

    /// Creates a vertex for the origin ring of `e_orig`, inserted before
    /// `v_next` in the vertex list.
    fn make_vertex(&mut self, e_orig: EdgeIdx, v_next: VertIdx) -> VertIdx {
        let v_new = self.verts.len() as VertIdx;
        let v_prev = self.verts[v_next as usize].prev;
        self.verts.push(Vertex { prev: v_prev, next: v_next, an_edge: e_orig, ..Vertex::default() });
        self.verts[v_prev as usize].next = v_new;
        self.verts[v_next as usize].prev = v_new;

        let mut e = e_orig;
        loop {
            self.edges[e as usize].org = v_new;
            e = self.edges[e as usize].onext;
            if e == e_orig {
                break;
            }
        }
        v_new
    }

    /// Creates a face for the left loop of `e_orig`, inserted before `f_next`.
    /// The new face inherits `f_next.inside`.
    fn make_face(&mut self, e_orig: EdgeIdx, f_next: FaceIdx) -> FaceIdx {
        let f_new = self.faces.len() as FaceIdx;
        let f_prev = self.faces[f_next as usize].prev;
        let inside = self.faces[f_next as usize].inside;
        self.faces.push(Face { prev: f_prev, next: f_next, an_edge: e_orig, marked: false, inside });
        self.faces[f_prev as usize].next = f_new;
        self.faces[f_next as usize].prev = f_new;

        let mut e = e_orig;
        loop {
            self.edges[e as usize].lface = f_new;
            e = self.edges[e as usize].lnext;
            if e == e_orig {
                break;
            }
        }
        f_new
    }

    fn kill_vertex(&mut self, v_del: VertIdx, new_org: VertIdx) {
        let e_start = self.verts[v_del as usize].an_edge;
        let mut e = e_start;
        loop {
            self.edges[e as usize].org = new_org;
            e = self.edges[e as usize].onext;
            if e == e_start {
                break;
            }
        }

        let Vertex { prev, next, .. } = self.verts[v_del as usize];
        self.verts[next as usize].prev = prev;
        self.verts[prev as usize].next = next;
        let dead = &mut self.verts[v_del as usize];
        dead.next = INVALID;
        dead.prev = INVALID;
        dead.an_edge = INVALID;
    }

    fn kill_face(&mut self, f_del: FaceIdx, new_lface: FaceIdx) {
        let e_start = self.faces[f_del as usize].an_edge;
        let mut e = e_start;
        loop {
            self.edges[e as usize].lface = new_lface;
            e = self.edges[e as usize].lnext;
            if e == e_start {
                break;
            }
        }

        let Face { prev, next, .. } = self.faces[f_del as usize];
        self.faces[next as usize].prev = prev;
        self.faces[prev as usize].next = next;
        let dead = &mut self.faces[f_del as usize];
        dead.next = INVALID;
        dead.prev = INVALID;
        dead.an_edge = INVALID;
    }

    fn kill_edge(&mut self, e_del: EdgeIdx) {
        let e_del = e_del & !1;
        let e_next = self.edges[e_del as usize].next;
        let e_prev = self.edges[(e_del ^ 1) as usize].next;
        self.edges[(e_next ^ 1) as usize].next = e_prev;
        self.edges[(e_prev ^ 1) as usize].next = e_next;
        self.edges[e_del as usize].next = INVALID;
        self.edges[(e_del ^ 1) as usize].next = INVALID;
    }

    /// Exchanges a->Onext and b->Onext (and the matching Lnext links).
    fn do_splice(&mut self, a: EdgeIdx, b: EdgeIdx) {
        let a_onext = self.edges[a as usize].onext;
        let b_onext = self.edges[b as usize].onext;
        self.edges[(a_onext ^ 1) as usize].lnext = b;
        self.edges[(b_onext ^ 1) as usize].lnext = a;
        self.edges[a as usize].onext = b_onext;
        self.edges[b as usize].onext = a_onext;
    }

    // ─────────────────────────── Operations ──────────────────────────────────

    /// Creates an edge with two new vertices and one face on both sides.
    pub fn make_edge(&mut self) -> EdgeIdx {
        let e = self.make_edge_pair(E_HEAD);
        self.make_vertex(e, V_HEAD);
        self.make_vertex(e ^ 1, V_HEAD);
        self.make_face(e, F_HEAD);
        e
    }

    /// Exchanges e_org->Onext and e_dst->Onext.
    ///
    /// If the origins differ they are merged (e_dst->Org is destroyed);
    /// otherwise the shared origin is split in two. Likewise the left faces
    /// are merged if distinct and split if shared.
    pub fn splice(&mut self, e_org: EdgeIdx, e_dst: EdgeIdx) {
        if e_org == e_dst {
            return;
        }

        let mut joining_vertices = false;
        let mut joining_loops = false;

        if self.org(e_dst) != self.org(e_org) {
            joining_vertices = true;
            self.kill_vertex(self.org(e_dst), self.org(e_org));
        }
        if self.lface(e_dst) != self.lface(e_org) {
            joining_loops = true;
            self.kill_face(self.lface(e_dst), self.lface(e_org));
        }

        self.do_splice(e_dst, e_org);

        if !joining_vertices {
            let org = self.org(e_org);
            self.make_vertex(e_dst, org);
            self.verts[org as usize].an_edge = e_org;
        }
        if !joining_loops {
            let lface = self.lface(e_org);
            self.make_face(e_dst, lface);
            self.faces[lface as usize].an_edge = e_org;
        }
    }

    /// Removes an edge pair. Faces on either side are joined, and endpoints
    /// left without edges are destroyed.
    pub fn delete_edge(&mut self, e_del: EdgeIdx) {
        let e_del_sym = e_del ^ 1;
        let mut joining_loops = false;

        if self.lface(e_del) != self.rface(e_del) {
            joining_loops = true;
            self.kill_face(self.lface(e_del), self.rface(e_del));
        }

        if self.onext(e_del) == e_del {
            self.kill_vertex(self.org(e_del), INVALID);
        } else {
            let rface = self.rface(e_del);
            self.faces[rface as usize].an_edge = self.oprev(e_del);
            let org = self.org(e_del);
            self.verts[org as usize].an_edge = self.onext(e_del);

            self.do_splice(e_del, self.oprev(e_del));
            if !joining_loops {
                let lface = self.lface(e_del);
                self.make_face(e_del, lface);
            }
        }

        if self.onext(e_del_sym) == e_del_sym {
            self.kill_vertex(self.org(e_del_sym), INVALID);
            self.kill_face(self.lface(e_del_sym), INVALID);
        } else {
            let lface = self.lface(e_del);
            self.faces[lface as usize].an_edge = self.oprev(e_del_sym);
            let org = self.org(e_del_sym);
            self.verts[org as usize].an_edge = self.onext(e_del_sym);
            self.do_splice(e_del_sym, self.oprev(e_del_sym));
        }

        self.kill_edge(e_del);
    }

    /// Removes a vertex together with every edge incident to it.
    pub fn delete_vertex(&mut self, v: VertIdx) {
        while self.is_live_vertex(v) {
            let e = self.verts[v as usize].an_edge;
            self.delete_edge(e);
        }
    }

    /// Creates eNew = e_org->Lnext whose destination is a new vertex.
    /// Both halves of eNew lie in e_org's left face.
    pub fn add_edge_vertex(&mut self, e_org: EdgeIdx) -> EdgeIdx {
        let e_new = self.make_edge_pair(e_org);
        let e_new_sym = e_new ^ 1;

        self.do_splice(e_new, self.lnext(e_org));

        let org = self.dst(e_org);
        self.edges[e_new as usize].org = org;
        self.make_vertex(e_new_sym, org);

        let lface = self.lface(e_org);
        self.edges[e_new as usize].lface = lface;
        self.edges[e_new_sym as usize].lface = lface;
        e_new
    }

    /// Splits e_org at a new vertex. Returns eNew = e_org->Lnext, which runs
    /// from the new vertex to the old destination and copies e_org's winding.
    pub fn split_edge(&mut self, e_org: EdgeIdx) -> EdgeIdx {
        let e_new = self.add_edge_vertex(e_org) ^ 1;
        let e_org_sym = e_org ^ 1;

        // Disconnect e_org from its destination and attach it to eNew->Org.
        self.do_splice(e_org_sym, self.oprev(e_org_sym));
        self.do_splice(e_org_sym, e_new);

        self.edges[e_org_sym as usize].org = self.org(e_new);
        let new_dst = self.dst(e_new);
        self.verts[new_dst as usize].an_edge = e_new ^ 1;
        self.edges[(e_new ^ 1) as usize].lface = self.rface(e_org);
        self.edges[e_new as usize].winding = self.edges[e_org as usize].winding;
        self.edges[(e_new ^ 1) as usize].winding = self.edges[e_org_sym as usize].winding;
        e_new
    }

    /// Creates an edge from e_org->Dst to e_dst->Org. If both share a left
    /// face it is split in two (the new face is eNew->Lface); otherwise the
    /// two faces are merged.
    pub fn connect(&mut self, e_org: EdgeIdx, e_dst: EdgeIdx) -> EdgeIdx {
        let e_new = self.make_edge_pair(e_org);
        let e_new_sym = e_new ^ 1;
        let mut joining_loops = false;

        if self.lface(e_dst) != self.lface(e_org) {
            joining_loops = true;
            self.kill_face(self.lface(e_dst), self.lface(e_org));
        }

        self.do_splice(e_new, self.lnext(e_org));
        self.do_splice(e_new_sym, e_dst);

        self.edges[e_new as usize].org = self.dst(e_org);
        self.edges[e_new_sym as usize].org = self.org(e_dst);
        let lface = self.lface(e_org);
        self.edges[e_new as usize].lface = lface;
        self.edges[e_new_sym as usize].lface = lface;

        self.faces[lface as usize].an_edge = e_new_sym;

        if !joining_loops {
            self.make_face(e_new, lface);
        }
        e_new
    }

    // ─────────────────────────── Inspection ──────────────────────────────────

    #[inline]
    pub fn is_live_vertex(&self, v: VertIdx) -> bool {
        v != V_HEAD && self.verts[v as usize].an_edge != INVALID
    }

    /// Iterates live vertices in list order.
    pub fn vertices(&self) -> impl Iterator<Item = VertIdx> + '_ {
        let mut v = self.verts[V_HEAD as usize].next;
        std::iter::from_fn(move || {
            if v == V_HEAD {
                return None;
            }
            let cur = v;
            v = self.verts[v as usize].next;
            Some(cur)
        })
    }

    /// Iterates live faces in list order.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceIdx> + '_ {
        let mut f = self.faces[F_HEAD as usize].next;
        std::iter::from_fn(move || {
            if f == F_HEAD {
                return None;
            }
            let cur = f;
            f = self.faces[f as usize].next;
            Some(cur)
        })
    }

    /// Iterates the even half of each live edge pair.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeIdx> + '_ {
        let mut e = self.edges[E_HEAD as usize].next;
        std::iter::from_fn(move || {
            if e == E_HEAD {
                return None;
            }
            let cur = e;
            e = self.edges[e as usize].next;
            Some(cur)
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    pub fn face_count(&self) -> usize {
        self.face_ids().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_ids().count()
    }

    /// Number of edges around the left face of `e`.
    pub fn loop_len(&self, e: EdgeIdx) -> usize {
        let mut n = 0;
        let mut cur = e;
        loop {
            n += 1;
            cur = self.lnext(cur);
            if cur == e {
                break n;
            }
        }
    }

    /// Connected components of the edge graph.
    pub fn component_count(&self) -> usize {
        let mut parent: Vec<u32> = (0..self.verts.len() as u32).collect();
        fn find(parent: &mut [u32], mut x: u32) -> u32 {
            while parent[x as usize] != x {
                parent[x as usize] = parent[parent[x as usize] as usize];
                x = parent[x as usize];
            }
            x
        }
        for e in self.edge_ids() {
            let a = find(&mut parent, self.org(e));
            let b = find(&mut parent, self.dst(e));
            if a != b {
                parent[a as usize] = b;
            }
        }
        let mut roots: Vec<u32> = self.vertices().map(|v| find(&mut parent, v)).collect();
        roots.sort_unstable();
        roots.dedup();
        roots.len()
    }

    /// Euler characteristic V - E + F; equals 2 per connected component.
    pub fn euler_characteristic(&self) -> i64 {
        self.vertex_count() as i64 - self.edge_count() as i64 + self.face_count() as i64
    }

    /// Panics if any link invariant is broken.
    pub fn check_mesh(&self) {
        let mut f_prev = F_HEAD;
        loop {
            let f = self.faces[f_prev as usize].next;
            if f == F_HEAD {
                break;
            }
            assert_eq!(self.faces[f as usize].prev, f_prev, "face list broken at {f}");
            let start = self.faces[f as usize].an_edge;
            let mut e = start;
            loop {
                self.check_edge_links(e);
                assert_eq!(self.lface(e), f, "edge {e} not on face {f}");
                e = self.lnext(e);
                if e == start {
                    break;
                }
            }
            f_prev = f;
        }
        assert_eq!(self.faces[F_HEAD as usize].prev, f_prev);
        assert_eq!(self.faces[F_HEAD as usize].an_edge, INVALID);

        let mut v_prev = V_HEAD;
        loop {
            let v = self.verts[v_prev as usize].next;
            if v == V_HEAD {
                break;
            }
            assert_eq!(self.verts[v as usize].prev, v_prev, "vertex list broken at {v}");
            let start = self.verts[v as usize].an_edge;
            let mut e = start;
            loop {
                self.check_edge_links(e);
                assert_eq!(self.org(e), v, "edge {e} not around vertex {v}");
                e = self.onext(e);
                if e == start {
                    break;
                }
            }
            v_prev = v;
        }
        assert_eq!(self.verts[V_HEAD as usize].prev, v_prev);
        assert_eq!(self.verts[V_HEAD as usize].an_edge, INVALID);

        let mut e_prev = E_HEAD;
        loop {
            let e = self.edges[e_prev as usize].next;
            if e == E_HEAD {
                break;
            }
            assert_eq!(self.edges[(e ^ 1) as usize].next, e_prev ^ 1, "edge list broken at {e}");
            assert_ne!(self.org(e), INVALID);
            assert_ne!(self.dst(e), INVALID);
            self.check_edge_links(e);
            e_prev = e;
        }
        assert_eq!(self.edges[E_HEAD_SYM as usize].next, e_prev ^ 1);
    }

    fn check_edge_links(&self, e: EdgeIdx) {
        assert_eq!(sym(sym(e)), e);
        assert_eq!(self.onext(self.lnext(e)) ^ 1, e, "Lnext->Onext->Sym != e at {e}");
        assert_eq!(self.lnext(self.onext(e) ^ 1), e, "Onext->Sym->Lnext != e at {e}");
    }
}
