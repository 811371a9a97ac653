// glu-sweep: plane-sweep polygon tessellator with GLU-style callbacks
// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

pub mod bucketalloc;
pub mod callback;
pub mod dict;
pub mod error;
pub mod geom;
pub mod mesh;
pub mod monotone;
pub mod priorityq;
mod render;
pub mod sweep;
pub mod tess;
pub mod winding;

pub use callback::{Primitive, PrimitiveType, Recorder, TessCallback};
pub use error::TessError;
pub use priorityq::{PqHandle, PriorityQueue};
pub use sweep::MAX_COORD;
pub use tess::{TessConfig, TessProperty, Tessellator, TESS_MAX_CACHE};
pub use winding::WindingRule;
