// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// The tessellator object: begin/end state machine, vertex cache, projection
// onto the sweep plane, and the pipeline that runs the sweep, triangulates
// and renders through the callback.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::callback::TessCallback;
use crate::error::TessError;
use crate::geom::Real;
use crate::mesh::{EdgeIdx, Mesh, F_HEAD, INVALID, V_HEAD};
use crate::render::{render_boundary, render_cache, render_mesh, CachedVertex};
use crate::sweep::{compute_interior, VertexCombiner, MAX_COORD};
use crate::winding::WindingRule;

/// Vertices are buffered up to this count before a mesh is built, so small
/// convex polygons can skip the sweep entirely.
pub const TESS_MAX_CACHE: usize = 100;

const DEFAULT_SORT_SEED: u64 = 2016473283;

/// Numeric property codes accepted by `set_property_code`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TessProperty {
    WindingRule = 100140,
    BoundaryOnly = 100141,
    Tolerance = 100142,
}

impl TessProperty {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            100140 => Some(TessProperty::WindingRule),
            100141 => Some(TessProperty::BoundaryOnly),
            100142 => Some(TessProperty::Tolerance),
            _ => None,
        }
    }
}

/// Settings that persist across polygons.
#[derive(Clone, Debug, PartialEq)]
pub struct TessConfig {
    pub winding_rule: WindingRule,
    /// Emit only the boundary of the interior as line loops.
    pub boundary_only: bool,
    /// Merge tolerance in [0, 1]. Stored and reported; vertices are only
    /// merged when they coincide exactly.
    pub tolerance: Real,
    /// Plane normal; all zeros means compute it from the vertices.
    pub normal: [Real; 3],
    /// Seed for the randomized sort of the initial event queue.
    pub sort_seed: u64,
}

impl Default for TessConfig {
    fn default() -> Self {
        TessConfig {
            winding_rule: WindingRule::Odd,
            boundary_only: false,
            tolerance: 0.0,
            normal: [0.0; 3],
            sort_seed: DEFAULT_SORT_SEED,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum TessState {
    Dormant,
    InPolygon,
    InContour,
}

/// Polygon tessellator driven by begin/vertex/end calls.
///
/// `D` is the per-vertex user data handed back through `TessCallback::vertex`;
/// the tessellator owns every `D` passed to `add_vertex` until the polygon ends.
pub struct Tessellator<D, C> {
    callback: C,
    config: TessConfig,
    state: TessState,
    rng: Box<dyn RngCore + Send>,

    mesh: Option<Mesh>,
    last_edge: EdgeIdx,
    /// User data of every vertex in the current polygon, including combined ones.
    data: Vec<D>,
    cache: Vec<CachedVertex>,
    /// A second contour started while vertices were cached.
    flush_cache: bool,
    /// The current polygon hit a fatal error and will produce no output.
    abandoned: bool,
}

/// Hands sweep-created vertices to the user's combine callback.
struct Combiner<'a, D, C> {
    data: &'a mut Vec<D>,
    callback: &'a mut C,
}

impl<D, C: TessCallback<D>> VertexCombiner for Combiner<'_, D, C> {
    fn combine(
        &mut self,
        coords: [Real; 3],
        sources: [u32; 4],
        weights: [Real; 4],
        needed: bool,
    ) -> Result<u32, TessError> {
        let refs = sources.map(|s| self.data.get(s as usize));
        match self.callback.combine(coords, refs, weights) {
            Some(d) => {
                self.data.try_reserve(1).map_err(|_| TessError::OutOfMemory)?;
                self.data.push(d);
                Ok((self.data.len() - 1) as u32)
            }
            None if !needed => Ok(sources[0]),
            None => Err(TessError::NeedCombineCallback),
        }
    }
}

impl<D, C: TessCallback<D>> Tessellator<D, C> {
    pub fn new(callback: C) -> Self {
        Self::with_config(callback, TessConfig::default())
    }

    pub fn with_config(callback: C, config: TessConfig) -> Self {
        let rng = Box::new(StdRng::seed_from_u64(config.sort_seed));
        Tessellator {
            callback,
            config,
            state: TessState::Dormant,
            rng,
            mesh: None,
            last_edge: INVALID,
            data: Vec::new(),
            cache: Vec::new(),
            flush_cache: false,
            abandoned: false,
        }
    }

    /// Replaces the random source used to sort the initial events.
    pub fn with_rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn config(&self) -> &TessConfig {
        &self.config
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    pub fn callback_mut(&mut self) -> &mut C {
        &mut self.callback
    }

    pub fn into_callback(self) -> C {
        self.callback
    }

    // ─────── Properties ───────────────────────────────────────────────────────

    /// Sets a property. Invalid values are reported through the error
    /// callback as well as returned.
    pub fn set_property(&mut self, which: TessProperty, value: Real) -> Result<(), TessError> {
        match which {
            TessProperty::WindingRule => {
                let code = value as u32;
                match WindingRule::from_code(code).filter(|_| code as Real == value) {
                    Some(rule) => self.config.winding_rule = rule,
                    None => return Err(self.report(TessError::InvalidValue)),
                }
            }
            TessProperty::BoundaryOnly => self.config.boundary_only = value != 0.0,
            TessProperty::Tolerance => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(self.report(TessError::InvalidValue));
                }
                self.config.tolerance = value;
            }
        }
        Ok(())
    }

    /// `set_property` keyed by the numeric property code.
    pub fn set_property_code(&mut self, code: u32, value: Real) -> Result<(), TessError> {
        match TessProperty::from_code(code) {
            Some(which) => self.set_property(which, value),
            None => Err(self.report(TessError::InvalidEnum)),
        }
    }

    pub fn property(&self, which: TessProperty) -> Real {
        match which {
            TessProperty::WindingRule => self.config.winding_rule.code() as Real,
            TessProperty::BoundaryOnly => {
                if self.config.boundary_only {
                    1.0
                } else {
                    0.0
                }
            }
            TessProperty::Tolerance => self.config.tolerance,
        }
    }

    /// Fixes the plane normal. All zeros restores automatic detection.
    pub fn set_normal(&mut self, normal: [Real; 3]) {
        self.config.normal = normal;
    }

    // ─────── Begin / end ──────────────────────────────────────────────────────

    /// Starts a polygon with the given rule and output mode, which also become
    /// the persistent settings.
    pub fn begin_polygon(&mut self, rule: WindingRule, boundary_only: bool) {
        self.require_state(TessState::Dormant);
        self.config.winding_rule = rule;
        self.config.boundary_only = boundary_only;
        self.state = TessState::InPolygon;
        self.reset_polygon();
        log::debug!("begin polygon ({:?}, boundary_only={})", rule, boundary_only);
    }

    pub fn begin_contour(&mut self) {
        self.require_state(TessState::InPolygon);
        self.state = TessState::InContour;
        self.last_edge = INVALID;
        if !self.cache.is_empty() {
            // The cache only describes a single contour.
            self.flush_cache = true;
        }
    }

    /// Adds a vertex to the current contour. Coordinates beyond ±1e150 are
    /// clamped and reported as `CoordTooLarge`. A vertex with a NaN
    /// coordinate is dropped and reported as `InvalidValue`.
    pub fn add_vertex(&mut self, coords: [Real; 3], data: D) {
        self.require_state(TessState::InContour);
        if self.abandoned {
            return;
        }
        if coords.iter().any(|x| x.is_nan()) {
            self.report(TessError::InvalidValue);
            return;
        }

        if self.flush_cache {
            if let Err(e) = self.empty_cache() {
                self.abandon(e);
                return;
            }
            self.last_edge = INVALID;
        }

        let mut too_large = false;
        let clamped = coords.map(|x| {
            if x < -MAX_COORD {
                too_large = true;
                -MAX_COORD
            } else if x > MAX_COORD {
                too_large = true;
                MAX_COORD
            } else {
                x
            }
        });
        if too_large {
            self.report(TessError::CoordTooLarge);
        }

        if self.data.try_reserve(1).is_err() {
            self.abandon(TessError::OutOfMemory);
            return;
        }
        self.data.push(data);
        let slot = (self.data.len() - 1) as u32;

        if self.mesh.is_none() {
            if self.cache.len() < TESS_MAX_CACHE {
                self.cache.push(CachedVertex { coords: clamped, data: slot });
                return;
            }
            if let Err(e) = self.empty_cache() {
                self.abandon(e);
                return;
            }
        }
        if let Err(e) = self.add_mesh_vertex(clamped, slot) {
            self.abandon(e);
        }
    }

    pub fn end_contour(&mut self) {
        self.require_state(TessState::InContour);
        self.state = TessState::InPolygon;
    }

    /// Tessellates the polygon and emits the result through the callback.
    pub fn end_polygon(&mut self) {
        self.require_state(TessState::InPolygon);
        self.state = TessState::Dormant;

        if self.abandoned {
            log::debug!("discarding polygon after fatal error");
        } else if let Err(e) = self.tessellate_polygon() {
            self.report(e);
        }
        self.reset_polygon();
    }

    // ─────── State machine ────────────────────────────────────────────────────

    fn require_state(&mut self, state: TessState) {
        if self.state != state {
            self.goto_state(state);
        }
    }

    /// Inserts the missing begin/end calls, reporting each one.
    fn goto_state(&mut self, target: TessState) {
        while self.state != target {
            if self.state < target {
                match self.state {
                    TessState::Dormant => {
                        self.report(TessError::MissingBeginPolygon);
                        let (rule, boundary) = (self.config.winding_rule, self.config.boundary_only);
                        self.begin_polygon(rule, boundary);
                    }
                    TessState::InPolygon => {
                        self.report(TessError::MissingBeginContour);
                        self.begin_contour();
                    }
                    TessState::InContour => unreachable!("no state above InContour"),
                }
            } else {
                match self.state {
                    TessState::InContour => {
                        self.report(TessError::MissingEndContour);
                        self.end_contour();
                    }
                    TessState::InPolygon => {
                        self.report(TessError::MissingEndPolygon);
                        self.state = TessState::Dormant;
                        self.reset_polygon();
                    }
                    TessState::Dormant => unreachable!("no state below Dormant"),
                }
            }
        }
    }

    fn reset_polygon(&mut self) {
        self.mesh = None;
        self.last_edge = INVALID;
        self.data.clear();
        self.cache.clear();
        self.flush_cache = false;
        self.abandoned = false;
    }

    fn report(&mut self, err: TessError) -> TessError {
        log::warn!("{}", err);
        self.callback.error(err);
        err
    }

    /// Reports a fatal error; the rest of the polygon is ignored.
    fn abandon(&mut self, err: TessError) {
        self.report(err);
        self.abandoned = true;
        self.mesh = None;
        self.cache.clear();
    }

    // ─────── Mesh construction ────────────────────────────────────────────────

    fn add_mesh_vertex(&mut self, coords: [Real; 3], slot: u32) -> Result<(), TessError> {
        let mesh = self.mesh.get_or_insert_with(Mesh::new);
        mesh.try_reserve(1).map_err(|_| TessError::OutOfMemory)?;

        let e = if self.last_edge == INVALID {
            // Self-loop: one edge, one vertex.
            let e = mesh.make_edge();
            mesh.splice(e, e ^ 1);
            e
        } else {
            // Insert the vertex after last_edge->Org.
            mesh.split_edge(self.last_edge);
            mesh.lnext(self.last_edge)
        };

        let v = mesh.org(e) as usize;
        mesh.verts[v].coords = coords;
        mesh.verts[v].data = slot;

        // Crossing the contour from right to left raises the winding by one.
        mesh.edges[e as usize].winding = 1;
        mesh.edges[(e ^ 1) as usize].winding = -1;
        self.last_edge = e;
        Ok(())
    }

    fn empty_cache(&mut self) -> Result<(), TessError> {
        let mut mesh = Mesh::new();
        mesh.try_reserve(self.cache.len()).map_err(|_| TessError::OutOfMemory)?;
        self.mesh = Some(mesh);
        for cv in std::mem::take(&mut self.cache) {
            self.add_mesh_vertex(cv.coords, cv.data)?;
        }
        self.flush_cache = false;
        Ok(())
    }

    // ─────── Pipeline ─────────────────────────────────────────────────────────

    fn tessellate_polygon(&mut self) -> Result<(), TessError> {
        let rule = self.config.winding_rule;
        let boundary_only = self.config.boundary_only;

        if self.mesh.is_none() {
            if !self.callback.wants_edge_flags()
                && render_cache(&self.cache, &self.data, self.config.normal, rule, boundary_only, &mut self.callback)
            {
                log::debug!("polygon of {} vertices rendered as a single fan", self.cache.len());
                return Ok(());
            }
            self.empty_cache()?;
        }
        let Some(mut mesh) = self.mesh.take() else {
            return Ok(());
        };

        project_polygon(&mut mesh, self.config.normal);
        log::debug!("sweeping {} vertices", mesh.vertex_count());

        let mut combiner = Combiner { data: &mut self.data, callback: &mut self.callback };
        compute_interior(&mut mesh, rule, &mut *self.rng, &mut combiner)?;

        if boundary_only {
            mesh.set_winding_number(1, true);
        } else {
            mesh.tessellate_interior();
        }
        if cfg!(debug_assertions) {
            mesh.check_mesh();
        }

        if boundary_only {
            render_boundary(&mesh, &self.data, &mut self.callback);
        } else {
            render_mesh(&mut mesh, &self.data, &mut self.callback);
        }
        Ok(())
    }
}

// ─────────────────────────── Projection ──────────────────────────────────────

fn dot(u: &[Real; 3], v: &[Real; 3]) -> Real {
    u[0] * v[0] + u[1] * v[1] + u[2] * v[2]
}

fn long_axis(v: &[Real; 3]) -> usize {
    let mut i = 0;
    if v[1].abs() > v[0].abs() {
        i = 1;
    }
    if v[2].abs() > v[i].abs() {
        i = 2;
    }
    i
}

fn short_axis(v: &[Real; 3]) -> usize {
    let mut i = 0;
    if v[1].abs() < v[0].abs() {
        i = 1;
    }
    if v[2].abs() < v[i].abs() {
        i = 2;
    }
    i
}

/// Estimates the plane normal from the vertex extremes: the two vertices
/// farthest apart along the widest axis, plus whichever third vertex makes
/// the largest triangle with them.
fn compute_normal(mesh: &Mesh) -> [Real; 3] {
    let first = mesh.verts[V_HEAD as usize].next;
    if first == V_HEAD {
        return [0.0, 0.0, 1.0];
    }

    let c0 = mesh.verts[first as usize].coords;
    let (mut min_val, mut max_val) = (c0, c0);
    let (mut min_vert, mut max_vert) = ([first; 3], [first; 3]);
    for v in mesh.vertices() {
        let c = mesh.verts[v as usize].coords;
        for i in 0..3 {
            if c[i] < min_val[i] {
                min_val[i] = c[i];
                min_vert[i] = v;
            }
            if c[i] > max_val[i] {
                max_val[i] = c[i];
                max_vert[i] = v;
            }
        }
    }

    let mut i = 0;
    if max_val[1] - min_val[1] > max_val[0] - min_val[0] {
        i = 1;
    }
    if max_val[2] - min_val[2] > max_val[i] - min_val[i] {
        i = 2;
    }
    if min_val[i] >= max_val[i] {
        // All points coincide.
        return [0.0, 0.0, 1.0];
    }

    let c1 = mesh.verts[min_vert[i] as usize].coords;
    let c2 = mesh.verts[max_vert[i] as usize].coords;
    let d1 = [c1[0] - c2[0], c1[1] - c2[1], c1[2] - c2[2]];

    let mut norm = [0.0; 3];
    let mut max_len2 = 0.0;
    for v in mesh.vertices() {
        let c = mesh.verts[v as usize].coords;
        let d2 = [c[0] - c2[0], c[1] - c2[1], c[2] - c2[2]];
        let tn = [
            d1[1] * d2[2] - d1[2] * d2[1],
            d1[2] * d2[0] - d1[0] * d2[2],
            d1[0] * d2[1] - d1[1] * d2[0],
        ];
        let len2 = dot(&tn, &tn);
        if len2 > max_len2 {
            max_len2 = len2;
            norm = tn;
        }
    }

    if max_len2 <= 0.0 {
        // Collinear; any normal perpendicular to the line will do.
        norm = [0.0; 3];
        norm[short_axis(&d1)] = 1.0;
    }
    norm
}

/// Flips t if the contours, taken with their windings, enclose negative
/// area, so that the interior of a CCW contour has positive winding.
fn check_orientation(mesh: &mut Mesh) {
    let mut area = 0.0;
    let mut f = mesh.faces[F_HEAD as usize].next;
    while f != F_HEAD {
        let start = mesh.faces[f as usize].an_edge;
        if mesh.edges[start as usize].winding > 0 {
            let mut e = start;
            loop {
                let (os, ot) = mesh.st(mesh.org(e));
                let (ds, dt) = mesh.st(mesh.dst(e));
                area += (os - ds) * (ot + dt);
                e = mesh.lnext(e);
                if e == start {
                    break;
                }
            }
        }
        f = mesh.faces[f as usize].next;
    }
    if area < 0.0 {
        let verts: Vec<_> = mesh.vertices().collect();
        for v in verts {
            mesh.verts[v as usize].t = -mesh.verts[v as usize].t;
        }
    }
}

/// Projects every vertex onto the plane perpendicular to the dominant axis
/// of the normal, filling in s and t.
fn project_polygon(mesh: &mut Mesh, normal: [Real; 3]) {
    let computed = normal == [0.0; 3];
    let norm = if computed { compute_normal(mesh) } else { normal };

    let i = long_axis(&norm);
    let mut s_unit = [0.0; 3];
    let mut t_unit = [0.0; 3];
    s_unit[(i + 1) % 3] = 1.0;
    t_unit[(i + 2) % 3] = if norm[i] > 0.0 { 1.0 } else { -1.0 };

    let verts: Vec<_> = mesh.vertices().collect();
    for v in verts {
        let c = mesh.verts[v as usize].coords;
        mesh.verts[v as usize].s = dot(&c, &s_unit);
        mesh.verts[v as usize].t = dot(&c, &t_unit);
    }
    if computed {
        check_orientation(mesh);
    }
}
