// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Triangulation of the monotone faces left by the sweep.

use crate::mesh::{FaceIdx, Mesh, F_HEAD};

impl Mesh {
    /// Triangulates a face that is monotone in s by adding diagonals.
    ///
    /// The face must have a CCW boundary of at least three edges. Walking the
    /// upper and lower chains from the right, the lagging chain is advanced,
    /// and each strictly convex vertex it reaches is cut off with a diagonal
    /// back to the other chain. Collinear vertices stay on the chain until a
    /// vertex of the other chain can see them.
    pub fn tessellate_mono_region(&mut self, face: FaceIdx) {
        let mut up = self.faces[face as usize].an_edge;
        debug_assert!(self.lnext(up) != up && self.lnext(self.lnext(up)) != up);

        // Find the rightmost vertex; it becomes org(up) and dst(lo).
        while self.vert_leq(self.dst(up), self.org(up)) {
            up = self.lprev(up);
        }
        while self.vert_leq(self.org(up), self.dst(up)) {
            up = self.lnext(up);
        }
        let mut lo = self.lprev(up);

        while self.lnext(up) != lo {
            if self.vert_leq(self.dst(up), self.org(lo)) {
                // dst(up) is left of org(lo); triangulate what lo can see.
                while self.lnext(lo) != up
                    && (self.edge_goes_left(self.lnext(lo))
                        || self.edge_sign(self.org(lo), self.dst(lo), self.dst(self.lnext(lo))) < 0.0)
                {
                    lo = self.connect(self.lnext(lo), lo) ^ 1;
                }
                lo = self.lprev(lo);
            } else {
                // org(lo) is left of dst(up).
                while self.lnext(lo) != up
                    && (self.edge_goes_right(self.lprev(up))
                        || self.edge_sign(self.dst(up), self.org(up), self.org(self.lprev(up))) > 0.0)
                {
                    up = self.connect(up, self.lprev(up)) ^ 1;
                }
                up = self.lnext(up);
            }
        }

        // Fan the rest from the leftmost vertex, org(lo).
        debug_assert!(self.lnext(lo) != up);
        while self.lnext(self.lnext(lo)) != up {
            lo = self.connect(self.lnext(lo), lo) ^ 1;
        }
    }

    /// Triangulates every inside face. Faces are assumed monotone, which is
    /// what the sweep leaves behind.
    pub fn tessellate_interior(&mut self) {
        let mut f = self.faces[F_HEAD as usize].next;
        while f != F_HEAD {
            // New faces are linked before f, so the walk skips them.
            let next = self.faces[f as usize].next;
            if self.faces[f as usize].inside {
                self.tessellate_mono_region(f);
            }
            f = next;
        }
    }
}
