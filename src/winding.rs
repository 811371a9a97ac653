// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Winding rules and the post-sweep boundary classification.

use crate::mesh::{Mesh, E_HEAD};

/// Which winding numbers count as inside the polygon.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum WindingRule {
    #[default]
    Odd = 100130,
    NonZero = 100131,
    Positive = 100132,
    Negative = 100133,
    AbsGeqTwo = 100134,
}

impl WindingRule {
    #[inline]
    pub fn is_inside(self, n: i32) -> bool {
        match self {
            WindingRule::Odd => n & 1 != 0,
            WindingRule::NonZero => n != 0,
            WindingRule::Positive => n > 0,
            WindingRule::Negative => n < 0,
            WindingRule::AbsGeqTwo => n >= 2 || n <= -2,
        }
    }

    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            100130 => WindingRule::Odd,
            100131 => WindingRule::NonZero,
            100132 => WindingRule::Positive,
            100133 => WindingRule::Negative,
            100134 => WindingRule::AbsGeqTwo,
            _ => return None,
        })
    }
}

impl Mesh {
    /// Re-labels edge windings from the face classification: boundary edges
    /// get +value with the interior on their left, -value otherwise. Edges
    /// between two faces of the same class get winding 0, or are deleted
    /// when `keep_only_boundary` is set.
    pub fn set_winding_number(&mut self, value: i32, keep_only_boundary: bool) {
        let mut e = self.edges[E_HEAD as usize].next;
        while e != E_HEAD {
            let e_next = self.edges[e as usize].next;
            let l_inside = self.faces[self.lface(e) as usize].inside;
            let r_inside = self.faces[self.rface(e) as usize].inside;
            if l_inside != r_inside {
                let w = if l_inside { value } else { -value };
                self.edges[e as usize].winding = w;
                self.edges[(e ^ 1) as usize].winding = -w;
            } else if keep_only_boundary {
                self.delete_edge(e);
            } else {
                self.edges[e as usize].winding = 0;
                self.edges[(e ^ 1) as usize].winding = 0;
            }
            e = e_next;
        }
    }
}
