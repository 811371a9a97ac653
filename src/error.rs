// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Errors reported through TessCallback::error. Each carries its GLU code.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum TessError {
    #[error("begin_polygon was not called; starting a polygon")]
    MissingBeginPolygon,
    #[error("begin_contour was not called; starting a contour")]
    MissingBeginContour,
    #[error("end_polygon was not called; discarding the open polygon")]
    MissingEndPolygon,
    #[error("end_contour was not called; closing the open contour")]
    MissingEndContour,
    #[error("vertex coordinate exceeds the supported range and was clamped")]
    CoordTooLarge,
    #[error("intersecting edges need a combine callback to create a vertex")]
    NeedCombineCallback,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid property")]
    InvalidEnum,
    #[error("property value out of range")]
    InvalidValue,
}

impl TessError {
    /// The numeric GLU error constant.
    pub const fn code(self) -> u32 {
        match self {
            TessError::MissingBeginPolygon => 100151,
            TessError::MissingBeginContour => 100152,
            TessError::MissingEndPolygon => 100153,
            TessError::MissingEndContour => 100154,
            TessError::CoordTooLarge => 100155,
            TessError::NeedCombineCallback => 100156,
            TessError::InvalidEnum => 100900,
            TessError::InvalidValue => 100901,
            TessError::OutOfMemory => 100902,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            100151 => TessError::MissingBeginPolygon,
            100152 => TessError::MissingBeginContour,
            100153 => TessError::MissingEndPolygon,
            100154 => TessError::MissingEndContour,
            100155 => TessError::CoordTooLarge,
            100156 => TessError::NeedCombineCallback,
            100900 => TessError::InvalidEnum,
            100901 => TessError::InvalidValue,
            100902 => TessError::OutOfMemory,
            _ => return None,
        })
    }

    /// Fatal errors abandon the current polygon without output.
    pub const fn is_fatal(self) -> bool {
        matches!(self, TessError::NeedCombineCallback | TessError::OutOfMemory)
    }
}
