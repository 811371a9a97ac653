// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Output interface of the tessellator, plus a recorder that collects the
// primitives into memory.

use crate::error::TessError;

/// GL primitive kinds emitted between begin and end.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PrimitiveType {
    LineLoop = 0x0002,
    Triangles = 0x0004,
    TriangleStrip = 0x0005,
    TriangleFan = 0x0006,
}

impl PrimitiveType {
    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Receives tessellator output. Every method defaults to a no-op, so an
/// implementation only overrides what it consumes.
///
/// Per-polygon state belongs on the implementing type; the tessellator owns
/// the callback and hands it back through `callback_mut`/`into_callback`.
pub trait TessCallback<D> {
    /// Starts a primitive.
    fn begin(&mut self, _kind: PrimitiveType) {}

    /// Marks whether the following vertices start boundary edges. Only
    /// called when `wants_edge_flags` returns true, in which case every
    /// primitive is emitted as independent triangles.
    fn edge_flag(&mut self, _boundary: bool) {}

    fn vertex(&mut self, _data: &D) {}

    fn end(&mut self) {}

    /// Creates data for a new vertex at `coords`, as a weighted blend of up
    /// to four existing vertices (the weights sum to 1).
    ///
    /// Returning None is fine when only coincident vertices are being merged.
    /// For a real edge crossing it makes the polygon fail with
    /// `TessError::NeedCombineCallback`.
    fn combine(&mut self, _coords: [f64; 3], _sources: [Option<&D>; 4], _weights: [f64; 4]) -> Option<D> {
        None
    }

    fn error(&mut self, _err: TessError) {}

    /// Requests edge-flag output.
    fn wants_edge_flags(&self) -> bool {
        false
    }
}

/// One primitive as emitted: its kind, its vertices and, when edge flags
/// were requested, the flag in force at each vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Primitive<D> {
    pub kind: PrimitiveType,
    pub vertices: Vec<D>,
    pub edge_flags: Vec<bool>,
}

impl<D: Clone> Primitive<D> {
    /// Expands the primitive into CCW triangles. Line loops yield nothing.
    pub fn triangles(&self) -> Vec<[D; 3]> {
        let v = &self.vertices;
        match self.kind {
            PrimitiveType::LineLoop => Vec::new(),
            PrimitiveType::Triangles => {
                v.chunks_exact(3).map(|c| [c[0].clone(), c[1].clone(), c[2].clone()]).collect()
            }
            PrimitiveType::TriangleFan => (2..v.len())
                .map(|i| [v[0].clone(), v[i - 1].clone(), v[i].clone()])
                .collect(),
            PrimitiveType::TriangleStrip => (2..v.len())
                .map(|i| {
                    if i % 2 == 0 {
                        [v[i - 2].clone(), v[i - 1].clone(), v[i].clone()]
                    } else {
                        [v[i - 1].clone(), v[i - 2].clone(), v[i].clone()]
                    }
                })
                .collect(),
        }
    }
}

type CombineFn<D> = Box<dyn FnMut([f64; 3], [Option<&D>; 4], [f64; 4]) -> Option<D>>;

/// Records everything the tessellator emits.
pub struct Recorder<D> {
    pub primitives: Vec<Primitive<D>>,
    pub errors: Vec<TessError>,
    /// Number of combine requests received.
    pub combine_calls: usize,
    edge_flags: bool,
    current_flag: bool,
    combiner: Option<CombineFn<D>>,
}

impl<D> Default for Recorder<D> {
    fn default() -> Self {
        Recorder {
            primitives: Vec::new(),
            errors: Vec::new(),
            combine_calls: 0,
            edge_flags: false,
            current_flag: true,
            combiner: None,
        }
    }
}

impl<D: Clone> Recorder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a combine function.
    pub fn with_combine<F>(mut self, f: F) -> Self
    where
        F: FnMut([f64; 3], [Option<&D>; 4], [f64; 4]) -> Option<D> + 'static,
    {
        self.combiner = Some(Box::new(f));
        self
    }

    /// Requests edge flags, which forces independent triangles.
    pub fn with_edge_flags(mut self) -> Self {
        self.edge_flags = true;
        self
    }

    /// All recorded primitives expanded into triangles.
    pub fn triangles(&self) -> Vec<[D; 3]> {
        self.primitives.iter().flat_map(|p| p.triangles()).collect()
    }

    /// Vertex lists of recorded line loops.
    pub fn line_loops(&self) -> Vec<Vec<D>> {
        self.primitives
            .iter()
            .filter(|p| p.kind == PrimitiveType::LineLoop)
            .map(|p| p.vertices.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
        self.errors.clear();
        self.combine_calls = 0;
    }
}

impl Recorder<[f64; 3]> {
    /// A recorder whose vertex data is the position itself; combined
    /// vertices take the new coordinates.
    pub fn positions() -> Self {
        Recorder::new().with_combine(|coords, _, _| Some(coords))
    }
}

impl<D: Clone> TessCallback<D> for Recorder<D> {
    fn begin(&mut self, kind: PrimitiveType) {
        self.primitives.push(Primitive { kind, vertices: Vec::new(), edge_flags: Vec::new() });
    }

    fn edge_flag(&mut self, boundary: bool) {
        self.current_flag = boundary;
    }

    fn vertex(&mut self, data: &D) {
        let flags = self.edge_flags;
        let flag = self.current_flag;
        if let Some(p) = self.primitives.last_mut() {
            p.vertices.push(data.clone());
            if flags {
                p.edge_flags.push(flag);
            }
        }
    }

    fn end(&mut self) {}

    fn combine(&mut self, coords: [f64; 3], sources: [Option<&D>; 4], weights: [f64; 4]) -> Option<D> {
        self.combine_calls += 1;
        self.combiner.as_mut().and_then(|f| f(coords, sources, weights))
    }

    fn error(&mut self, err: TessError) {
        self.errors.push(err);
    }

    fn wants_edge_flags(&self) -> bool {
        self.edge_flags
    }
}
