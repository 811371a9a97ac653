// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Plane sweep over the contour mesh.
//
// Vertices are processed left to right (s, then t). The edges crossing the
// sweep line are kept in a dictionary ordered bottom to top; the space
// between two adjacent edges is an ActiveRegion carrying the winding number.
// When the sweep passes a vertex, regions closing there are finished (their
// face is marked inside or outside) and regions opening there are created.
// Edge crossings are split on the fly, so at the end every face of the mesh
// is x-monotone and correctly classified.

use rand::Rng;

use crate::bucketalloc::BucketAlloc;
use crate::dict::{Dict, NodeIdx, DICT_HEAD};
use crate::error::TessError;
use crate::geom::{self, Real};
use crate::mesh::{EdgeIdx, Mesh, VertIdx, E_HEAD, F_HEAD, INVALID};
use crate::priorityq::{PqHandle, PriorityQueue};
use crate::winding::WindingRule;

/// Largest coordinate accepted from callers; larger values are clamped.
pub const MAX_COORD: Real = 1.0e150;
const SENTINEL_COORD: Real = 4.0 * MAX_COORD;

pub(crate) type RegionIdx = u32;

/// Supplies vertex data for vertices created or merged by the sweep.
pub(crate) trait VertexCombiner {
    /// `sources` are data slots (INVALID when unused). `needed` is false
    /// when merging coincident vertices, where keeping `sources[0]` is fine.
    /// Returns the data slot for the vertex.
    fn combine(
        &mut self,
        coords: [Real; 3],
        sources: [u32; 4],
        weights: [Real; 4],
        needed: bool,
    ) -> Result<u32, TessError>;
}

/// The area between two adjacent dictionary edges.
#[derive(Clone, Debug)]
pub(crate) struct ActiveRegion {
    /// Upper edge, directed right to left.
    pub e_up: EdgeIdx,
    pub node_up: NodeIdx,
    pub winding_number: i32,
    pub inside: bool,
    /// Fake edge at t = +/- infinity.
    pub sentinel: bool,
    /// Upper or lower edge changed; recheck ordering and intersections.
    pub dirty: bool,
    /// Temporary edge added by connect_right_vertex, to be replaced.
    pub fix_upper_edge: bool,
}

impl ActiveRegion {
    fn new(e_up: EdgeIdx) -> Self {
        ActiveRegion {
            e_up,
            node_up: DICT_HEAD,
            winding_number: 0,
            inside: false,
            sentinel: false,
            dirty: false,
            fix_upper_edge: false,
        }
    }
}

/// Event order: lexicographic (s, t), ties broken by vertex index.
fn vertex_order(mesh: &Mesh) -> impl Fn(VertIdx, VertIdx) -> bool + '_ {
    move |a, b| {
        if mesh.vert_eq(a, b) {
            a <= b
        } else {
            mesh.vert_leq(a, b)
        }
    }
}

/// Dictionary order of two edges at the current event: true if e1 is at or
/// below e2 along the sweep line.
fn edge_leq(mesh: &Mesh, event: VertIdx, e1: EdgeIdx, e2: EdgeIdx) -> bool {
    let (e1_org, e1_dst) = (mesh.org(e1), mesh.dst(e1));
    let (e2_org, e2_dst) = (mesh.org(e2), mesh.dst(e2));

    if e1_dst == event {
        if e2_dst == event {
            // Both end at the event; sort by slope.
            if mesh.vert_leq(e1_org, e2_org) {
                return mesh.edge_sign(e2_dst, e1_org, e2_org) <= 0.0;
            }
            return mesh.edge_sign(e1_dst, e2_org, e1_org) >= 0.0;
        }
        return mesh.edge_sign(e2_dst, event, e2_org) <= 0.0;
    }
    if e2_dst == event {
        return mesh.edge_sign(e1_dst, event, e1_org) >= 0.0;
    }

    let t1 = mesh.edge_eval(e1_dst, event, e1_org);
    let t2 = mesh.edge_eval(e2_dst, event, e2_org);
    t1 >= t2
}

/// Splits faces, merges degeneracies and classifies every face of `mesh`
/// as inside or outside under `rule`.
pub(crate) fn compute_interior<R: Rng + ?Sized>(
    mesh: &mut Mesh,
    rule: WindingRule,
    rng: &mut R,
    combiner: &mut dyn VertexCombiner,
) -> Result<(), TessError> {
    let mut sweep = Sweep {
        mesh,
        combiner,
        rule,
        dict: Dict::new(),
        regions: BucketAlloc::new(),
        pq: PriorityQueue::with_capacity(0),
        event: INVALID,
    };

    sweep.remove_degenerate_edges()?;
    sweep.init_priority_q(rng);
    sweep.init_edge_dict();
    log::debug!("sweeping {} events", sweep.pq.len());

    while let Some(v) = sweep.pq_extract_min() {
        // Merge every vertex at exactly this location into one event.
        while let Some(next) = sweep.pq_minimum() {
            if !sweep.mesh.vert_eq(next, v) {
                break;
            }
            sweep.pq_extract_min();
            let (a, b) = (sweep.mesh.verts[v as usize].an_edge, sweep.mesh.verts[next as usize].an_edge);
            sweep.splice_merge_vertices(a, b)?;
        }
        sweep.sweep_event(v)?;
    }

    sweep.done_edge_dict();
    sweep.remove_degenerate_faces();

    if cfg!(debug_assertions) {
        sweep.mesh.check_mesh();
    }
    Ok(())
}

struct Sweep<'a> {
    mesh: &'a mut Mesh,
    combiner: &'a mut dyn VertexCombiner,
    rule: WindingRule,
    dict: Dict<RegionIdx>,
    regions: BucketAlloc<ActiveRegion>,
    pq: PriorityQueue<VertIdx>,
    /// Vertex currently being processed.
    event: VertIdx,
}

impl<'a> Sweep<'a> {
    // ─────────────────────────── Event queue ─────────────────────────────────

    fn init_priority_q<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let verts: Vec<VertIdx> = self.mesh.vertices().collect();
        self.pq = PriorityQueue::with_capacity(verts.len());
        let handles: Vec<PqHandle> = {
            let order = vertex_order(&*self.mesh);
            let handles = verts.iter().map(|&v| self.pq.insert(v, &order)).collect();
            self.pq.init(rng, &order);
            handles
        };
        for (v, h) in verts.into_iter().zip(handles) {
            self.mesh.verts[v as usize].pq_handle = Some(h);
        }
    }

    fn pq_extract_min(&mut self) -> Option<VertIdx> {
        let v = {
            let order = vertex_order(&*self.mesh);
            self.pq.extract_min(&order)?
        };
        self.mesh.verts[v as usize].pq_handle = None;
        Some(v)
    }

    fn pq_minimum(&self) -> Option<VertIdx> {
        self.pq.minimum(&vertex_order(&*self.mesh))
    }

    fn pq_insert(&mut self, v: VertIdx) {
        let h = {
            let order = vertex_order(&*self.mesh);
            self.pq.insert(v, &order)
        };
        self.mesh.verts[v as usize].pq_handle = Some(h);
    }

    fn pq_delete(&mut self, v: VertIdx) {
        if let Some(h) = self.mesh.verts[v as usize].pq_handle.take() {
            let order = vertex_order(&*self.mesh);
            self.pq.delete(h, &order);
        }
    }

    // ─────────────────────────── Region helpers ──────────────────────────────

    #[inline]
    fn region_below(&self, r: RegionIdx) -> RegionIdx {
        self.dict.key(self.dict.pred(self.regions[r].node_up)).unwrap_or(INVALID)
    }

    #[inline]
    fn region_above(&self, r: RegionIdx) -> RegionIdx {
        self.dict.key(self.dict.succ(self.regions[r].node_up)).unwrap_or(INVALID)
    }

    #[inline]
    fn e_up(&self, r: RegionIdx) -> EdgeIdx {
        self.regions[r].e_up
    }

    fn add_winding(&mut self, e_dst: EdgeIdx, e_src: EdgeIdx) {
        let w = self.mesh.edges[e_src as usize].winding;
        let w_sym = self.mesh.edges[(e_src ^ 1) as usize].winding;
        self.mesh.edges[e_dst as usize].winding += w;
        self.mesh.edges[(e_dst ^ 1) as usize].winding += w_sym;
    }

    /// Adds a region below `reg_above` whose upper edge is `e_new_up`.
    fn add_region_below(&mut self, reg_above: RegionIdx, e_new_up: EdgeIdx) -> RegionIdx {
        let reg = self.regions.alloc(ActiveRegion::new(e_new_up));
        let above_node = self.regions[reg_above].node_up;
        let (mesh, regions, event) = (&*self.mesh, &self.regions, self.event);
        let leq = |a: RegionIdx, b: RegionIdx| edge_leq(mesh, event, regions[a].e_up, regions[b].e_up);
        let node = self.dict.insert_before(above_node, reg, &leq);
        self.regions[reg].node_up = node;
        self.mesh.edges[e_new_up as usize].active_region = reg;
        reg
    }

    fn delete_region(&mut self, reg: RegionIdx) {
        let r = &self.regions[reg];
        debug_assert!(
            !r.fix_upper_edge || self.mesh.edges[r.e_up as usize].winding == 0,
            "temporary edge merged with a real one"
        );
        let (e_up, node) = (r.e_up, r.node_up);
        self.mesh.edges[e_up as usize].active_region = INVALID;
        self.dict.delete(node);
        self.regions.free(reg);
    }

    /// Replaces a temporary upper edge with `new_edge`.
    fn fix_upper_edge(&mut self, reg: RegionIdx, new_edge: EdgeIdx) {
        debug_assert!(self.regions[reg].fix_upper_edge);
        self.mesh.delete_edge(self.e_up(reg));
        let r = &mut self.regions[reg];
        r.fix_upper_edge = false;
        r.e_up = new_edge;
        self.mesh.edges[new_edge as usize].active_region = reg;
    }

    fn compute_winding(&mut self, reg: RegionIdx) {
        let above = self.region_above(reg);
        let w = self.regions[above].winding_number + self.mesh.edges[self.e_up(reg) as usize].winding;
        let r = &mut self.regions[reg];
        r.winding_number = w;
        r.inside = self.rule.is_inside(w);
    }

    /// Finds the region above the uppermost edge leaving the same origin,
    /// replacing a temporary edge there if needed.
    fn top_left_region(&mut self, reg: RegionIdx) -> RegionIdx {
        let org = self.mesh.org(self.e_up(reg));
        let mut reg = reg;
        loop {
            reg = self.region_above(reg);
            if self.mesh.org(self.e_up(reg)) != org {
                break;
            }
        }

        if self.regions[reg].fix_upper_edge {
            let below = self.region_below(reg);
            let e = self.mesh.connect(self.e_up(below) ^ 1, self.mesh.lnext(self.e_up(reg)));
            self.fix_upper_edge(reg, e);
            reg = self.region_above(reg);
        }
        reg
    }

    /// Finds the region above the uppermost edge with the same destination.
    fn top_right_region(&self, reg: RegionIdx) -> RegionIdx {
        let dst = self.mesh.dst(self.e_up(reg));
        let mut reg = reg;
        loop {
            reg = self.region_above(reg);
            if self.mesh.dst(self.e_up(reg)) != dst {
                return reg;
            }
        }
    }

    /// Records the region's classification on its face and removes it.
    fn finish_region(&mut self, reg: RegionIdx) {
        let e = self.e_up(reg);
        let f = self.mesh.lface(e) as usize;
        self.mesh.faces[f].inside = self.regions[reg].inside;
        self.mesh.faces[f].an_edge = e;
        self.delete_region(reg);
    }

    /// Finishes the regions from `reg_first` down to (not including)
    /// `reg_last`, or until the edges stop sharing an origin when `reg_last`
    /// is INVALID. Relinks the mesh to match dictionary order and returns
    /// the lowest left-going edge.
    fn finish_left_regions(&mut self, reg_first: RegionIdx, reg_last: RegionIdx) -> EdgeIdx {
        let mut reg_prev = reg_first;
        let mut e_prev = self.e_up(reg_first);
        while reg_prev != reg_last {
            self.regions[reg_prev].fix_upper_edge = false;
            let reg = self.region_below(reg_prev);
            let mut e = self.e_up(reg);
            if self.mesh.org(e) != self.mesh.org(e_prev) {
                if !self.regions[reg].fix_upper_edge {
                    // No more left-going edges at this origin in the dictionary,
                    // though the mesh may still have some.
                    self.finish_region(reg_prev);
                    break;
                }
                e = self.mesh.connect(self.mesh.lprev(e_prev), e ^ 1);
                self.fix_upper_edge(reg, e);
            }

            if self.mesh.onext(e_prev) != e {
                self.mesh.splice(self.mesh.oprev(e), e);
                self.mesh.splice(e_prev, e);
            }
            self.finish_region(reg_prev);
            e_prev = self.e_up(reg);
            reg_prev = reg;
        }
        e_prev
    }

    /// Inserts the right-going edges from e_first up to (not including)
    /// e_last below `reg_up`, then fixes windings and mesh order for every
    /// right-going edge at that origin. `e_top_left` is INVALID when the
    /// origin has no left-going edges.
    fn add_right_edges(
        &mut self,
        reg_up: RegionIdx,
        e_first: EdgeIdx,
        e_last: EdgeIdx,
        e_top_left: EdgeIdx,
        clean_up: bool,
    ) -> Result<(), TessError> {
        let mut e = e_first;
        loop {
            debug_assert!(self.mesh.vert_leq(self.mesh.org(e), self.mesh.dst(e)));
            self.add_region_below(reg_up, e ^ 1);
            e = self.mesh.onext(e);
            if e == e_last {
                break;
            }
        }

        let e_top_left = if e_top_left == INVALID {
            self.mesh.rprev(self.e_up(self.region_below(reg_up)))
        } else {
            e_top_left
        };

        let mut reg_prev = reg_up;
        let mut e_prev = e_top_left;
        let mut first_time = true;
        loop {
            let reg = self.region_below(reg_prev);
            let e = self.e_up(reg) ^ 1;
            if self.mesh.org(e) != self.mesh.org(e_prev) {
                break;
            }

            if self.mesh.onext(e) != e_prev {
                // Move e just below e_prev in the origin ring.
                self.mesh.splice(self.mesh.oprev(e), e);
                self.mesh.splice(self.mesh.oprev(e_prev), e);
            }
            let w = self.regions[reg_prev].winding_number - self.mesh.edges[e as usize].winding;
            self.regions[reg].winding_number = w;
            self.regions[reg].inside = self.rule.is_inside(w);

            // Two outgoing edges with the same slope are merged before any
            // intersection test.
            self.regions[reg_prev].dirty = true;
            if !first_time && self.check_for_right_splice(reg_prev)? {
                self.add_winding(e, e_prev);
                self.delete_region(reg_prev);
                self.mesh.delete_edge(e_prev);
            }
            first_time = false;
            reg_prev = reg;
            e_prev = e;
        }
        self.regions[reg_prev].dirty = true;

        if clean_up {
            self.walk_dirty_regions(reg_prev)?;
        }
        Ok(())
    }

    // ──────────────────────────── Vertex data ────────────────────────────────

    fn call_combine(
        &mut self,
        v: VertIdx,
        sources: [u32; 4],
        weights: [Real; 4],
        needed: bool,
    ) -> Result<(), TessError> {
        let coords = self.mesh.verts[v as usize].coords;
        let slot = self.combiner.combine(coords, sources, weights, needed)?;
        self.mesh.verts[v as usize].data = slot;
        Ok(())
    }

    /// Merges e2->Org into e1->Org; both have identical coordinates.
    fn splice_merge_vertices(&mut self, e1: EdgeIdx, e2: EdgeIdx) -> Result<(), TessError> {
        let d1 = self.mesh.verts[self.mesh.org(e1) as usize].data;
        let d2 = self.mesh.verts[self.mesh.org(e2) as usize].data;
        self.call_combine(self.mesh.org(e1), [d1, d2, INVALID, INVALID], [0.5, 0.5, 0.0, 0.0], false)?;
        self.mesh.splice(e1, e2);
        Ok(())
    }

    /// Each edge contributes half the weight, split between its endpoints by
    /// L1 distance to the intersection. Accumulates into `coords`.
    fn vertex_weights(&self, isect: (Real, Real), org: VertIdx, dst: VertIdx, coords: &mut [Real; 3]) -> [Real; 2] {
        let (os, ot) = self.mesh.st(org);
        let (ds, dt) = self.mesh.st(dst);
        let t1 = geom::vert_l1_dist(os, ot, isect.0, isect.1);
        let t2 = geom::vert_l1_dist(ds, dt, isect.0, isect.1);
        let w = if t1 + t2 > 0.0 {
            [0.5 * t2 / (t1 + t2), 0.5 * t1 / (t1 + t2)]
        } else {
            [0.25, 0.25]
        };
        let oc = self.mesh.verts[org as usize].coords;
        let dc = self.mesh.verts[dst as usize].coords;
        for i in 0..3 {
            coords[i] += w[0] * oc[i] + w[1] * dc[i];
        }
        w
    }

    fn get_intersect_data(
        &mut self,
        isect: VertIdx,
        org_up: VertIdx,
        dst_up: VertIdx,
        org_lo: VertIdx,
        dst_lo: VertIdx,
    ) -> Result<(), TessError> {
        let data = |v: VertIdx| self.mesh.verts[v as usize].data;
        let sources = [data(org_up), data(dst_up), data(org_lo), data(dst_lo)];
        let st = self.mesh.st(isect);
        let mut coords = [0.0; 3];
        let [w0, w1] = self.vertex_weights(st, org_up, dst_up, &mut coords);
        let [w2, w3] = self.vertex_weights(st, org_lo, dst_lo, &mut coords);
        self.mesh.verts[isect as usize].coords = coords;
        self.call_combine(isect, sources, [w0, w1, w2, w3], true)
    }

    // ─────────────────────────── Splice checks ───────────────────────────────

    /// Checks the dictionary order at the left (origin) ends of the upper
    /// and lower edges of reg_up and splices them together if they cross.
    /// Returns true if the mesh changed.
    fn check_for_right_splice(&mut self, reg_up: RegionIdx) -> Result<bool, TessError> {
        let reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let (org_up, org_lo) = (self.mesh.org(e_up), self.mesh.org(e_lo));

        if self.mesh.vert_leq(org_up, org_lo) {
            if self.mesh.edge_sign(self.mesh.dst(e_lo), org_up, org_lo) > 0.0 {
                return Ok(false);
            }
            // e_up->Org is on or below e_lo.
            if !self.mesh.vert_eq(org_up, org_lo) {
                self.mesh.split_edge(e_lo ^ 1);
                self.mesh.splice(e_up, self.mesh.oprev(e_lo));
                self.regions[reg_up].dirty = true;
                self.regions[reg_lo].dirty = true;
            } else if org_up != org_lo {
                self.pq_delete(org_up);
                self.splice_merge_vertices(self.mesh.oprev(e_lo), e_up)?;
            }
        } else {
            if self.mesh.edge_sign(self.mesh.dst(e_up), org_lo, org_up) < 0.0 {
                return Ok(false);
            }
            // e_lo->Org is on or above e_up.
            let above = self.region_above(reg_up);
            self.regions[above].dirty = true;
            self.regions[reg_up].dirty = true;
            self.mesh.split_edge(e_up ^ 1);
            self.mesh.splice(self.mesh.oprev(e_lo), e_up);
        }
        Ok(true)
    }

    /// Same as check_for_right_splice at the right (destination) ends.
    fn check_for_left_splice(&mut self, reg_up: RegionIdx) -> bool {
        let reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let (dst_up, dst_lo) = (self.mesh.dst(e_up), self.mesh.dst(e_lo));
        debug_assert!(!self.mesh.vert_eq(dst_up, dst_lo));

        if self.mesh.vert_leq(dst_up, dst_lo) {
            if self.mesh.edge_sign(dst_up, dst_lo, self.mesh.org(e_up)) < 0.0 {
                return false;
            }
            // e_lo->Dst is above e_up; splice it into e_up.
            let above = self.region_above(reg_up);
            self.regions[above].dirty = true;
            self.regions[reg_up].dirty = true;
            let e = self.mesh.split_edge(e_up);
            self.mesh.splice(e_lo ^ 1, e);
            let f = self.mesh.lface(e) as usize;
            self.mesh.faces[f].inside = self.regions[reg_up].inside;
        } else {
            if self.mesh.edge_sign(dst_lo, dst_up, self.mesh.org(e_lo)) > 0.0 {
                return false;
            }
            // e_up->Dst is below e_lo; splice it into e_lo.
            self.regions[reg_up].dirty = true;
            self.regions[reg_lo].dirty = true;
            let e = self.mesh.split_edge(e_lo);
            self.mesh.splice(self.mesh.lnext(e_up), e_lo ^ 1);
            let f = self.mesh.rface(e) as usize;
            self.mesh.faces[f].inside = self.regions[reg_up].inside;
        }
        true
    }

    /// Checks the upper and lower edges of reg_up for an intersection right
    /// of the sweep line and splits both at it. Returns true if the dirty
    /// walk was already completed by a nested call.
    fn check_for_intersect(&mut self, reg_up: RegionIdx) -> Result<bool, TessError> {
        let mut reg_up = reg_up;
        let mut reg_lo = self.region_below(reg_up);
        let mut e_up = self.e_up(reg_up);
        let mut e_lo = self.e_up(reg_lo);
        let (org_up, dst_up) = (self.mesh.org(e_up), self.mesh.dst(e_up));
        let (org_lo, dst_lo) = (self.mesh.org(e_lo), self.mesh.dst(e_lo));
        let event = self.event;

        debug_assert!(!self.mesh.vert_eq(dst_lo, dst_up));
        debug_assert!(org_up != event && org_lo != event);
        debug_assert!(!self.regions[reg_up].fix_upper_edge && !self.regions[reg_lo].fix_upper_edge);

        if org_up == org_lo {
            return Ok(false);
        }

        let (ou, du) = (self.mesh.st(org_up), self.mesh.st(dst_up));
        let (ol, dl) = (self.mesh.st(org_lo), self.mesh.st(dst_lo));
        let t_min_up = ou.1.min(du.1);
        let t_max_lo = ol.1.max(dl.1);
        if t_min_up > t_max_lo {
            return Ok(false);
        }

        if self.mesh.vert_leq(org_up, org_lo) {
            if self.mesh.edge_sign(dst_lo, org_up, org_lo) > 0.0 {
                return Ok(false);
            }
        } else if self.mesh.edge_sign(dst_up, org_lo, org_up) < 0.0 {
            return Ok(false);
        }

        // The edges intersect, at least marginally.
        let mut isect = geom::edge_intersect(du.0, du.1, ou.0, ou.1, dl.0, dl.1, ol.0, ol.1);
        let ev = self.mesh.st(event);

        // Rounding may put the crossing left of the sweep line; use the event.
        if geom::vert_leq(isect.0, isect.1, ev.0, ev.1) {
            isect = ev;
        }
        // Nor may it pass the nearer of the two origins.
        let org_min = if self.mesh.vert_leq(org_up, org_lo) { ou } else { ol };
        if geom::vert_leq(org_min.0, org_min.1, isect.0, isect.1) {
            isect = org_min;
        }

        if geom::vert_eq(isect.0, isect.1, ou.0, ou.1) || geom::vert_eq(isect.0, isect.1, ol.0, ol.1) {
            // Crossing at one of the origins.
            self.check_for_right_splice(reg_up)?;
            return Ok(false);
        }

        let sign_through = |d: (Real, Real)| geom::edge_sign(d.0, d.1, ev.0, ev.1, isect.0, isect.1);
        if (!self.mesh.vert_eq(dst_up, event) && sign_through(du) >= 0.0)
            || (!self.mesh.vert_eq(dst_lo, event) && sign_through(dl) <= 0.0)
        {
            // A split edge would pass on the wrong side of (or through) the
            // event because of rounding.
            if dst_lo == event {
                // Splice dst_lo into e_up and process the new regions.
                self.mesh.split_edge(e_up ^ 1);
                self.mesh.splice(e_lo ^ 1, e_up);
                reg_up = self.top_left_region(reg_up);
                let below = self.region_below(reg_up);
                e_up = self.e_up(below);
                self.finish_left_regions(below, reg_lo);
                self.add_right_edges(reg_up, self.mesh.oprev(e_up), e_up, e_up, true)?;
                return Ok(true);
            }
            if dst_up == event {
                // Splice dst_up into e_lo and process the new regions.
                self.mesh.split_edge(e_lo ^ 1);
                self.mesh.splice(self.mesh.lnext(e_up), self.mesh.oprev(e_lo));
                reg_lo = reg_up;
                reg_up = self.top_right_region(reg_up);
                let e = self.mesh.rprev(self.e_up(self.region_below(reg_up)));
                let relinked = self.mesh.oprev(e_lo);
                let old = self.regions[reg_lo].e_up;
                self.mesh.edges[old as usize].active_region = INVALID;
                self.regions[reg_lo].e_up = relinked;
                self.mesh.edges[relinked as usize].active_region = reg_lo;
                e_lo = self.finish_left_regions(reg_lo, INVALID);
                self.add_right_edges(reg_up, self.mesh.onext(e_lo), self.mesh.rprev(e_up), e, true)?;
                return Ok(true);
            }
            // Called from connect_right_vertex: split whichever edge passes on
            // the wrong side and leave the splicing to the caller.
            if sign_through(du) >= 0.0 {
                let above = self.region_above(reg_up);
                self.regions[above].dirty = true;
                self.regions[reg_up].dirty = true;
                self.mesh.split_edge(e_up ^ 1);
                let o = self.mesh.org(e_up) as usize;
                self.mesh.verts[o].s = ev.0;
                self.mesh.verts[o].t = ev.1;
            }
            if sign_through(dl) <= 0.0 {
                self.regions[reg_up].dirty = true;
                self.regions[reg_lo].dirty = true;
                self.mesh.split_edge(e_lo ^ 1);
                let o = self.mesh.org(e_lo) as usize;
                self.mesh.verts[o].s = ev.0;
                self.mesh.verts[o].t = ev.1;
            }
            return Ok(false);
        }

        // General case: split both edges and join them at a new vertex. The
        // argument order keeps new-face work on the processed side.
        self.mesh.split_edge(e_up ^ 1);
        self.mesh.split_edge(e_lo ^ 1);
        self.mesh.splice(self.mesh.oprev(e_lo), e_up);
        let v = self.mesh.org(e_up);
        self.mesh.verts[v as usize].s = isect.0;
        self.mesh.verts[v as usize].t = isect.1;
        self.pq_insert(v);
        log::trace!("edge crossing at ({}, {})", isect.0, isect.1);
        self.get_intersect_data(v, org_up, dst_up, org_lo, dst_lo)?;

        let above = self.region_above(reg_up);
        self.regions[above].dirty = true;
        self.regions[reg_up].dirty = true;
        self.regions[reg_lo].dirty = true;
        Ok(false)
    }

    /// Restores dictionary order and resolves intersections for every dirty
    /// region, walking bottom-up from `reg_up`.
    fn walk_dirty_regions(&mut self, reg_up: RegionIdx) -> Result<(), TessError> {
        let mut reg_up = reg_up;
        let mut reg_lo = self.region_below(reg_up);

        loop {
            while reg_lo != INVALID && self.regions[reg_lo].dirty {
                reg_up = reg_lo;
                reg_lo = self.region_below(reg_lo);
            }
            if !self.regions[reg_up].dirty {
                reg_lo = reg_up;
                reg_up = self.region_above(reg_up);
                if reg_up == INVALID || !self.regions[reg_up].dirty {
                    return Ok(());
                }
            }
            self.regions[reg_up].dirty = false;
            let mut e_up = self.e_up(reg_up);
            let mut e_lo = self.e_up(reg_lo);

            if self.mesh.dst(e_up) != self.mesh.dst(e_lo) && self.check_for_left_splice(reg_up) {
                // A temporary edge is no longer needed once the vertex has a
                // real right-going edge.
                if self.regions[reg_lo].fix_upper_edge {
                    self.delete_region(reg_lo);
                    self.mesh.delete_edge(e_lo);
                    reg_lo = self.region_below(reg_up);
                    e_lo = self.e_up(reg_lo);
                } else if self.regions[reg_up].fix_upper_edge {
                    self.delete_region(reg_up);
                    self.mesh.delete_edge(e_up);
                    reg_up = self.region_above(reg_lo);
                    e_up = self.e_up(reg_up);
                }
            }

            if self.mesh.org(e_up) != self.mesh.org(e_lo) {
                let (dst_up, dst_lo) = (self.mesh.dst(e_up), self.mesh.dst(e_lo));
                if dst_up != dst_lo
                    && !self.regions[reg_up].fix_upper_edge
                    && !self.regions[reg_lo].fix_upper_edge
                    && (dst_up == self.event || dst_lo == self.event)
                {
                    if self.check_for_intersect(reg_up)? {
                        return Ok(());
                    }
                } else {
                    self.check_for_right_splice(reg_up)?;
                }
            }

            if self.mesh.org(e_up) == self.mesh.org(e_lo) && self.mesh.dst(e_up) == self.mesh.dst(e_lo) {
                // Two-edge loop; drop it.
                self.add_winding(e_lo, e_up);
                self.delete_region(reg_up);
                self.mesh.delete_edge(e_up);
                reg_up = self.region_above(reg_lo);
            }
        }
    }

    // ───────────────────────────── Events ────────────────────────────────────

    /// The event has left-going edges but none going right. Adds a
    /// temporary edge so the region above stays bounded.
    fn connect_right_vertex(&mut self, reg_up: RegionIdx, e_bottom_left: EdgeIdx) -> Result<(), TessError> {
        let mut reg_up = reg_up;
        let mut e_bottom_left = e_bottom_left;
        let mut e_top_left = self.mesh.onext(e_bottom_left);
        let reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let mut degenerate = false;

        if self.mesh.dst(e_up) != self.mesh.dst(e_lo) {
            self.check_for_intersect(reg_up)?;
        }

        // The upper or lower edge may now pass through the event.
        if self.mesh.vert_eq(self.mesh.org(e_up), self.event) {
            self.mesh.splice(self.mesh.oprev(e_top_left), e_up);
            reg_up = self.top_left_region(reg_up);
            let below = self.region_below(reg_up);
            e_top_left = self.e_up(below);
            self.finish_left_regions(below, reg_lo);
            degenerate = true;
        }
        if self.mesh.vert_eq(self.mesh.org(e_lo), self.event) {
            self.mesh.splice(e_bottom_left, self.mesh.oprev(e_lo));
            e_bottom_left = self.finish_left_regions(reg_lo, INVALID);
            degenerate = true;
        }
        if degenerate {
            return self.add_right_edges(reg_up, self.mesh.onext(e_bottom_left), e_top_left, e_top_left, true);
        }

        // Connect to the closer of the two origins.
        let target = if self.mesh.vert_leq(self.mesh.org(e_lo), self.mesh.org(e_up)) {
            self.mesh.oprev(e_lo)
        } else {
            e_up
        };
        let e_new = self.mesh.connect(self.mesh.lprev(e_bottom_left), target);

        // No cleanup yet, or e_new could vanish before it is marked.
        let e_new_onext = self.mesh.onext(e_new);
        self.add_right_edges(reg_up, e_new, e_new_onext, e_new_onext, false)?;
        let reg = self.mesh.edges[(e_new ^ 1) as usize].active_region;
        self.regions[reg].fix_upper_edge = true;
        self.walk_dirty_regions(reg_up)
    }

    /// The event lies on the upper edge of `reg_up` (or on an endpoint).
    fn connect_left_degenerate(&mut self, reg_up: RegionIdx, v_event: VertIdx) -> Result<(), TessError> {
        let e = self.e_up(reg_up);
        let v_edge = self.mesh.verts[v_event as usize].an_edge;

        if self.mesh.vert_eq(self.mesh.org(e), v_event) {
            // e->Org is still queued; merge and let it come off the queue.
            return self.splice_merge_vertices(e, v_edge);
        }

        if !self.mesh.vert_eq(self.mesh.dst(e), v_event) {
            // Splice the event into the edge passing through it.
            self.mesh.split_edge(e ^ 1);
            if self.regions[reg_up].fix_upper_edge {
                self.mesh.delete_edge(self.mesh.onext(e));
                self.regions[reg_up].fix_upper_edge = false;
            }
            self.mesh.splice(v_edge, e);
            return self.sweep_event(v_event);
        }

        // The event coincides with e->Dst, which is already processed.
        // Splice in the additional right-going edges.
        let reg_up = self.top_right_region(reg_up);
        let reg = self.region_below(reg_up);
        let mut e_top_right = self.e_up(reg) ^ 1;
        let mut e_top_left = self.mesh.onext(e_top_right);
        let e_last = e_top_left;
        if self.regions[reg].fix_upper_edge {
            // The only right-going edge was temporary; real ones replace it.
            debug_assert!(e_top_left != e_top_right);
            self.delete_region(reg);
            self.mesh.delete_edge(e_top_right);
            e_top_right = self.mesh.oprev(e_top_left);
        }
        self.mesh.splice(v_edge, e_top_right);
        if !self.mesh.edge_goes_left(e_top_left) {
            e_top_left = INVALID;
        }
        self.add_right_edges(reg_up, self.mesh.onext(e_top_right), e_last, e_top_left, true)
    }

    /// The event has only right-going edges: connect it into the mesh if it
    /// falls inside the polygon, then insert its edges.
    fn connect_left_vertex(&mut self, v_event: VertIdx) -> Result<(), TessError> {
        let an_edge = self.mesh.verts[v_event as usize].an_edge;
        let e_key = an_edge ^ 1;
        let node = {
            let (mesh, regions, event) = (&*self.mesh, &self.regions, self.event);
            self.dict.search(|r| edge_leq(mesh, event, e_key, regions[r].e_up))
        };
        let reg_up = match self.dict.key(node) {
            Some(r) => r,
            None => unreachable!("the top sentinel bounds every event"),
        };
        let reg_lo = self.region_below(reg_up);
        if reg_lo == INVALID {
            return Ok(());
        }
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);

        if self.mesh.edge_sign(self.mesh.dst(e_up), v_event, self.mesh.org(e_up)) == 0.0 {
            return self.connect_left_degenerate(reg_up, v_event);
        }

        // Connect to the rightmost processed vertex of either chain.
        let reg = if self.mesh.vert_leq(self.mesh.dst(e_lo), self.mesh.dst(e_up)) { reg_up } else { reg_lo };

        if self.regions[reg_up].inside || self.regions[reg].fix_upper_edge {
            let e_new = if reg == reg_up {
                self.mesh.connect(an_edge ^ 1, self.mesh.lnext(e_up))
            } else {
                self.mesh.connect(self.mesh.dnext(e_lo), an_edge) ^ 1
            };
            if self.regions[reg].fix_upper_edge {
                self.fix_upper_edge(reg, e_new);
            } else {
                let r = self.add_region_below(reg_up, e_new);
                self.compute_winding(r);
            }
            self.sweep_event(v_event)
        } else {
            // Outside the polygon; no connection needed.
            self.add_right_edges(reg_up, an_edge, an_edge, INVALID, true)
        }
    }

    fn sweep_event(&mut self, v_event: VertIdx) -> Result<(), TessError> {
        self.event = v_event;
        let (s, t) = self.mesh.st(v_event);
        log::trace!("sweep event v{} at ({}, {})", v_event, s, t);

        // Look for an edge already in the dictionary that ends here.
        let start = self.mesh.verts[v_event as usize].an_edge;
        let mut e = start;
        while self.mesh.edges[e as usize].active_region == INVALID {
            e = self.mesh.onext(e);
            if e == start {
                // Every edge goes right.
                return self.connect_left_vertex(v_event);
            }
        }

        // Finish the regions closed by this vertex (its left-going edges),
        // then open regions for its right-going edges.
        let reg_up = self.top_left_region(self.mesh.edges[e as usize].active_region);
        let reg = self.region_below(reg_up);
        let e_top_left = self.e_up(reg);
        let e_bottom_left = self.finish_left_regions(reg, INVALID);

        if self.mesh.onext(e_bottom_left) == e_top_left {
            self.connect_right_vertex(reg_up, e_bottom_left)
        } else {
            self.add_right_edges(reg_up, self.mesh.onext(e_bottom_left), e_top_left, e_top_left, true)
        }
    }

    // ───────────────────────── Setup and teardown ────────────────────────────

    fn add_sentinel(&mut self, t: Real) {
        let e = self.mesh.make_edge();
        let (o, d) = (self.mesh.org(e) as usize, self.mesh.dst(e) as usize);
        self.mesh.verts[o].s = SENTINEL_COORD;
        self.mesh.verts[o].t = t;
        self.mesh.verts[d].s = -SENTINEL_COORD;
        self.mesh.verts[d].t = t;
        self.event = d as VertIdx;

        let reg = self.regions.alloc(ActiveRegion { sentinel: true, ..ActiveRegion::new(e) });
        let (mesh, regions, event) = (&*self.mesh, &self.regions, self.event);
        let leq = |a: RegionIdx, b: RegionIdx| edge_leq(mesh, event, regions[a].e_up, regions[b].e_up);
        let node = self.dict.insert(reg, &leq);
        self.regions[reg].node_up = node;
    }

    fn init_edge_dict(&mut self) {
        self.dict = Dict::new();
        self.add_sentinel(-SENTINEL_COORD);
        self.add_sentinel(SENTINEL_COORD);
    }

    /// Clears the dictionary, which holds only the sentinels and at most one
    /// temporary edge by now, and removes those edges from the mesh.
    fn done_edge_dict(&mut self) {
        let mut temporary = Vec::new();
        let mut sentinels = Vec::new();
        while let Some(reg) = self.dict.key(self.dict.min()) {
            let r = &self.regions[reg];
            debug_assert!(r.sentinel || r.fix_upper_edge, "unfinished region after sweep");
            debug_assert_eq!(r.winding_number, 0);
            if r.sentinel {
                sentinels.push(r.e_up);
            } else {
                temporary.push(r.e_up);
            }
            self.delete_region(reg);
        }
        debug_assert!(temporary.len() <= 1);
        for e in temporary {
            self.mesh.delete_edge(e);
        }
        for e in sentinels {
            if self.mesh.onext(e) == e && self.mesh.onext(e ^ 1) == e ^ 1 {
                self.mesh.delete_edge(e);
            }
        }
        debug_assert_eq!(self.regions.live(), 0);
    }

    /// Removes zero-length edges and contours with fewer than three edges.
    fn remove_degenerate_edges(&mut self) -> Result<(), TessError> {
        let mut e = self.mesh.edges[E_HEAD as usize].next;
        while e != E_HEAD {
            let mut e_next = self.mesh.edges[e as usize].next;
            let mut e_lnext = self.mesh.lnext(e);

            if self.mesh.vert_eq(self.mesh.org(e), self.mesh.dst(e)) && self.mesh.lnext(e_lnext) != e {
                // Zero-length edge in a contour of three or more edges.
                self.splice_merge_vertices(e_lnext, e)?;
                self.mesh.delete_edge(e);
                e = e_lnext;
                e_lnext = self.mesh.lnext(e);
            }
            if self.mesh.lnext(e_lnext) == e {
                // Contour of one or two edges.
                if e_lnext != e {
                    if e_lnext == e_next || e_lnext == (e_next ^ 1) {
                        e_next = self.mesh.edges[e_next as usize].next;
                    }
                    self.mesh.delete_edge(e_lnext);
                }
                if e == e_next || e == (e_next ^ 1) {
                    e_next = self.mesh.edges[e_next as usize].next;
                }
                self.mesh.delete_edge(e);
            }
            e = e_next;
        }
        Ok(())
    }

    /// Deletes faces bounded by only two edges, folding their winding into
    /// the neighbouring edge.
    fn remove_degenerate_faces(&mut self) {
        let mut f = self.mesh.faces[F_HEAD as usize].next;
        while f != F_HEAD {
            let f_next = self.mesh.faces[f as usize].next;
            let e = self.mesh.faces[f as usize].an_edge;
            debug_assert!(self.mesh.lnext(e) != e);
            if self.mesh.lnext(self.mesh.lnext(e)) == e {
                self.add_winding(self.mesh.onext(e), e);
                self.mesh.delete_edge(e);
            }
            f = f_next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Hands out fresh slots for crossings and keeps the first source on merges.
    #[derive(Default)]
    struct Slots {
        next: u32,
        crossings: usize,
        refuse: bool,
    }

    impl VertexCombiner for Slots {
        fn combine(&mut self, _coords: [Real; 3], sources: [u32; 4], weights: [Real; 4], needed: bool) -> Result<u32, TessError> {
            if !needed {
                return Ok(sources[0]);
            }
            if self.refuse {
                return Err(TessError::NeedCombineCallback);
            }
            assert!((weights.iter().sum::<Real>() - 1.0).abs() < 1e-12);
            self.crossings += 1;
            self.next += 1;
            Ok(1000 + self.next)
        }
    }

    fn contour_mesh(contours: &[&[(Real, Real)]]) -> Mesh {
        let mut mesh = Mesh::new();
        let mut slot = 0;
        for contour in contours {
            let mut last = INVALID;
            for &(x, y) in contour.iter() {
                let e = if last == INVALID {
                    let e = mesh.make_edge();
                    mesh.splice(e, e ^ 1);
                    e
                } else {
                    mesh.split_edge(last);
                    mesh.lnext(last)
                };
                let o = mesh.org(e) as usize;
                let v = &mut mesh.verts[o];
                v.coords = [x, y, 0.0];
                v.s = x;
                v.t = y;
                v.data = slot;
                slot += 1;
                mesh.edges[e as usize].winding = 1;
                mesh.edges[(e ^ 1) as usize].winding = -1;
                last = e;
            }
        }
        mesh
    }

    fn run(mesh: &mut Mesh, rule: WindingRule, slots: &mut Slots) -> Result<(), TessError> {
        let mut rng = StdRng::seed_from_u64(7);
        compute_interior(mesh, rule, &mut rng, slots)
    }

    fn inside_area(mesh: &Mesh) -> Real {
        let mut area = 0.0;
        for f in mesh.face_ids() {
            if !mesh.faces[f as usize].inside {
                continue;
            }
            let start = mesh.faces[f as usize].an_edge;
            let mut e = start;
            loop {
                let (os, ot) = mesh.st(mesh.org(e));
                let (ds, dt) = mesh.st(mesh.dst(e));
                area += os * dt - ds * ot;
                e = mesh.lnext(e);
                if e == start {
                    break;
                }
            }
        }
        area * 0.5
    }

    const SQUARE: &[(Real, Real)] = &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
    const INNER: &[(Real, Real)] = &[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)];
    const BOWTIE: &[(Real, Real)] = &[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)];

    #[test]
    fn square_interior_is_classified() {
        let mut mesh = contour_mesh(&[SQUARE]);
        run(&mut mesh, WindingRule::Odd, &mut Slots::default()).unwrap();
        mesh.check_mesh();
        assert!((inside_area(&mesh) - 16.0).abs() < 1e-9);
        for v in mesh.vertices() {
            assert!(mesh.verts[v as usize].s.abs() < MAX_COORD, "sentinel vertex left behind");
        }
    }

    #[test]
    fn clockwise_square_is_outside_for_positive() {
        let cw: Vec<(Real, Real)> = SQUARE.iter().rev().copied().collect();
        let mut mesh = contour_mesh(&[&cw]);
        run(&mut mesh, WindingRule::Positive, &mut Slots::default()).unwrap();
        assert_eq!(inside_area(&mesh), 0.0);
    }

    #[test]
    fn nested_squares_follow_rule() {
        for (rule, expected) in [(WindingRule::Odd, 12.0), (WindingRule::NonZero, 16.0), (WindingRule::AbsGeqTwo, 4.0)] {
            let mut mesh = contour_mesh(&[SQUARE, INNER]);
            run(&mut mesh, rule, &mut Slots::default()).unwrap();
            assert!((inside_area(&mesh) - expected).abs() < 1e-9, "{rule:?}");
        }
    }

    #[test]
    fn bowtie_crossing_creates_one_vertex() {
        let mut mesh = contour_mesh(&[BOWTIE]);
        let mut slots = Slots::default();
        run(&mut mesh, WindingRule::Odd, &mut slots).unwrap();
        mesh.check_mesh();
        assert_eq!(slots.crossings, 1);
        assert!((inside_area(&mesh) - 2.0).abs() < 1e-9);
        let centre = mesh.vertices().find(|&v| mesh.st(v) == (1.0, 1.0));
        assert_eq!(centre.map(|v| mesh.verts[v as usize].data), Some(1001));
    }

    #[test]
    fn crossing_without_combine_fails() {
        let mut mesh = contour_mesh(&[BOWTIE]);
        let mut slots = Slots { refuse: true, ..Slots::default() };
        assert_eq!(run(&mut mesh, WindingRule::Odd, &mut slots), Err(TessError::NeedCombineCallback));
    }

    #[test]
    fn duplicate_vertices_merge_without_crossing() {
        let doubled: &[(Real, Real)] = &[(0.0, 0.0), (4.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        let mut mesh = contour_mesh(&[doubled]);
        let mut slots = Slots { refuse: true, ..Slots::default() };
        run(&mut mesh, WindingRule::Odd, &mut slots).unwrap();
        assert!((inside_area(&mesh) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_contours_are_dropped() {
        let two: &[(Real, Real)] = &[(0.0, 0.0), (5.0, 5.0)];
        let mut mesh = contour_mesh(&[two, SQUARE]);
        run(&mut mesh, WindingRule::NonZero, &mut Slots::default()).unwrap();
        mesh.check_mesh();
        assert_eq!(mesh.vertex_count(), 4);
        assert!((inside_area(&mesh) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn edge_order_at_shared_destination() {
        // Dictionary edges point right to left, so both end at the apex.
        let mesh = contour_mesh(&[&[(0.0, 1.0), (2.0, 0.0), (2.0, 2.0)]]);
        let apex = mesh.vertices().find(|&v| mesh.st(v) == (0.0, 1.0)).unwrap();
        let into_apex: Vec<EdgeIdx> = (0..mesh.edges.len() as u32)
            .filter(|&e| e > 1 && mesh.edges[e as usize].org != INVALID && mesh.dst(e) == apex)
            .collect();
        assert_eq!(into_apex.len(), 2);
        let (a, b) = (into_apex[0], into_apex[1]);
        let (lower, upper) = if mesh.st(mesh.org(a)).1 < mesh.st(mesh.org(b)).1 { (a, b) } else { (b, a) };
        assert!(edge_leq(&mesh, apex, lower, upper));
        assert!(!edge_leq(&mesh, apex, upper, lower));
    }
}
