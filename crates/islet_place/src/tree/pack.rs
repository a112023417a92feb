//! Packing: turning the HB*-tree into concrete coordinates.
//!
//! A full pack resets both outer contours, walks the tree in pre-order, and
//! places every module and island by the B*-tree rules (left child to the
//! right of its parent, right child at the parent's x, y from the contour).
//! After placement each island's skyline is re-exposed as a chain of contour
//! nodes, and the validator repairs any residual overlap.
//!
//! When only parts of the tree changed since the last pack, the dirty set
//! drives an incremental pass: each maximal dirty subtree is repacked
//! against contours reseeded from the untouched blocks.

use crate::tree::hb::{HbNode, HbNodeId, HbNodeKind, HbStarTree};
use crate::validate;
use islet_common::{InternalError, IsletResult};
use islet_diagnostics::{Diagnostic, DiagnosticSink};
use islet_model::{Contour, ModuleId};

impl HbStarTree {
    /// Packs the tree, assigning coordinates to every module.
    ///
    /// Chooses between a full pack and an incremental repack of the dirty
    /// subtrees, then recomputes the area, rebuilds the contour skeletons,
    /// and runs the overlap validator.
    pub fn pack(&mut self, sink: &DiagnosticSink) -> IsletResult<()> {
        let Some(root) = self.root else {
            self.total_area = 0;
            self.packed = true;
            return Ok(());
        };

        if self.packed && !self.dirty.is_empty() && !self.dirty.contains(&root) {
            self.repack_dirty_subtrees(sink)?;
        } else {
            self.reset_contours();
            self.pack_subtree(root, sink)?;
        }
        self.dirty.clear();

        self.total_area = self.compute_area(sink);
        self.rebuild_contour_skeletons();
        self.packed = true;

        let fixes = validate::fix_overlaps(&mut self.plan, sink);
        if fixes > 0 {
            self.total_area = self.compute_area(sink);
        }
        Ok(())
    }

    /// Recomputes the bounding-box area without repacking; used after the
    /// validator shifts modules directly.
    pub fn recompute_area(&mut self, sink: &DiagnosticSink) {
        self.total_area = self.compute_area(sink);
    }

    fn reset_contours(&mut self) {
        self.h_contour.clear();
        self.v_contour.clear();
        self.h_contour.add_segment(0, i32::MAX, 0);
        self.v_contour.add_segment(0, i32::MAX, 0);
    }

    /// Repacks each maximal dirty subtree, deepest first, against contours
    /// reseeded from everything outside it.
    fn repack_dirty_subtrees(&mut self, sink: &DiagnosticSink) -> IsletResult<()> {
        let mut roots: Vec<HbNodeId> = self
            .dirty
            .iter()
            .copied()
            .filter(|&id| self.nodes.contains(id))
            .filter(|&id| match self.nodes[id].parent {
                Some(p) => !self.dirty.contains(&p),
                None => true,
            })
            .collect();
        roots.sort_by_key(|&id| std::cmp::Reverse(self.depth(id)));

        for subtree in roots {
            self.reseed_contours_excluding(subtree);
            self.pack_subtree(subtree, sink)?;
        }
        Ok(())
    }

    fn depth(&self, node: HbNodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(p) = self.nodes[current].parent {
            depth += 1;
            current = p;
        }
        depth
    }

    /// Seeds both contours with the placed rectangles of every block outside
    /// the given subtree.
    fn reseed_contours_excluding(&mut self, subtree: HbNodeId) {
        self.reset_contours();
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        let mut rects: Vec<(i32, i32, i32, i32)> = Vec::new();
        while let Some(id) = stack.pop() {
            if id == subtree {
                continue;
            }
            match self.nodes[id].kind {
                HbNodeKind::Module(m) => {
                    let m = &self.plan[m];
                    rects.push((m.x, m.y, m.width(), m.height()));
                }
                HbNodeKind::Hierarchy(idx) => {
                    for &member in self.islands[idx].members() {
                        let m = &self.plan[member];
                        rects.push((m.x, m.y, m.width(), m.height()));
                    }
                }
                HbNodeKind::Contour { .. } => {}
            }
            for child in [self.nodes[id].left, self.nodes[id].right]
                .into_iter()
                .flatten()
            {
                stack.push(child);
            }
        }
        for (x, y, w, h) in rects {
            self.h_contour.add_segment(x, x + w, y + h);
            self.v_contour.add_segment(y, y + h, x + w);
        }
    }

    /// Packs the subtree rooted at `start` in pre-order (left before right).
    fn pack_subtree(&mut self, start: HbNodeId, sink: &DiagnosticSink) -> IsletResult<()> {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            self.place_node(id, sink)?;
            let node = &self.nodes[id];
            if let Some(r) = node.right {
                stack.push(r);
            }
            if let Some(l) = node.left {
                stack.push(l);
            }
        }
        Ok(())
    }

    /// Places one node: a module directly, an island as a unit.
    fn place_node(&mut self, id: HbNodeId, sink: &DiagnosticSink) -> IsletResult<()> {
        match self.nodes[id].kind {
            HbNodeKind::Module(module) => self.place_module(id, module),
            HbNodeKind::Hierarchy(idx) => self.place_island(id, idx, sink),
            HbNodeKind::Contour { .. } => Ok(()),
        }
    }

    fn place_module(&mut self, id: HbNodeId, module: ModuleId) -> IsletResult<()> {
        let x = self.attach_x(id);
        let (w, h) = {
            let m = &self.plan[module];
            (m.width(), m.height())
        };
        if w <= 0 || h <= 0 {
            return Err(InternalError::new(format!(
                "module '{}' has degenerate dimensions {w}x{h}",
                self.plan[module].name
            )));
        }
        let y = self.h_contour.get_height(x, x + w);
        self.plan[module].set_position(x, y);
        self.h_contour.add_segment(x, x + w, y + h);
        self.v_contour.add_segment(y, y + h, x + w);
        Ok(())
    }

    /// Packs an island at the origin, then shifts the whole group to its
    /// slot in the outer placement and stamps every member into the outer
    /// contours.
    fn place_island(&mut self, id: HbNodeId, idx: usize, sink: &DiagnosticSink) -> IsletResult<()> {
        {
            let island = &mut self.islands[idx];
            island.pack(&mut self.plan)?;
        }
        let Some((min_x, min_y, max_x, max_y)) = self.islands[idx].bounding_box(&self.plan) else {
            return Ok(()); // empty group
        };
        let (w, h) = (max_x - min_x, max_y - min_y);
        if w <= 0 || h <= 0 {
            sink.emit(Diagnostic::warning(format!(
                "symmetry island '{}' has degenerate dimensions {w}x{h}",
                self.nodes[id].name
            )));
            return Ok(());
        }

        let x = self.attach_x(id);
        let y = self.h_contour.get_height(x, x + w);
        let (dx, dy) = (x - min_x, y - min_y);
        if dx != 0 || dy != 0 {
            self.islands[idx].shift_members(dx, dy, &mut self.plan);
        }

        for i in 0..self.islands[idx].members().len() {
            let member = self.islands[idx].members()[i];
            let (mx, my, mw, mh) = {
                let m = &self.plan[member];
                (m.x, m.y, m.width(), m.height())
            };
            self.h_contour.add_segment(mx, mx + mw, my + mh);
            self.v_contour.add_segment(my, my + mh, mx + mw);
        }
        Ok(())
    }

    /// The x-coordinate a node attaches at, per the B*-tree convention
    /// extended to island and contour parents.
    fn attach_x(&self, id: HbNodeId) -> i32 {
        let Some(p) = self.nodes[id].parent else {
            return 0;
        };
        let is_left = self.nodes[p].left == Some(id);
        match self.nodes[p].kind {
            HbNodeKind::Module(pm) => {
                let m = &self.plan[pm];
                if is_left {
                    m.right()
                } else {
                    m.x
                }
            }
            HbNodeKind::Hierarchy(pidx) => {
                let mut lo = i32::MAX;
                let mut hi = 0;
                for &member in self.islands[pidx].members() {
                    let m = &self.plan[member];
                    lo = lo.min(m.x);
                    hi = hi.max(m.right());
                }
                if is_left {
                    hi
                } else if lo == i32::MAX {
                    0
                } else {
                    lo
                }
            }
            HbNodeKind::Contour { x1, x2, .. } => {
                if is_left {
                    x2
                } else {
                    x1
                }
            }
        }
    }

    /// Bounding-box area over all modules; warns and returns 0 when the box
    /// is degenerate.
    fn compute_area(&self, sink: &DiagnosticSink) -> i64 {
        if self.plan.is_empty() {
            return 0;
        }
        let area = self.plan.bounding_area();
        if area == 0 {
            sink.emit(Diagnostic::warning(
                "placement has a degenerate bounding box, area set to 0",
            ));
        }
        area
    }

    /// Re-exposes every island's skyline as a chain of contour nodes hanging
    /// off the hierarchy node's right link. Subtrees that were attached to
    /// the old skeleton are reattached to the new one.
    fn rebuild_contour_skeletons(&mut self) {
        for idx in 0..self.islands.len() {
            let hnode = self.island_nodes[idx];

            // Collect the old skeleton and every non-contour subtree that
            // hangs off it (those must survive the rebuild).
            let mut old_contours = Vec::new();
            let mut dangling = Vec::new();
            if let Some(first) = self.nodes[hnode].right {
                if self.nodes[first].kind.is_contour() {
                    let mut stack = vec![first];
                    while let Some(id) = stack.pop() {
                        old_contours.push(id);
                        for child in [self.nodes[id].left, self.nodes[id].right]
                            .into_iter()
                            .flatten()
                        {
                            if self.nodes[child].kind.is_contour() {
                                stack.push(child);
                            } else {
                                dangling.push(child);
                            }
                        }
                    }
                } else {
                    // A perturbation hung a real subtree directly on the
                    // hierarchy node; keep it and re-root it on the skeleton.
                    dangling.push(first);
                }
            }

            for id in &old_contours {
                if let Some(node) = self.nodes.remove(*id) {
                    self.names.remove(&node.name);
                }
                self.dirty.remove(id);
            }
            self.nodes[hnode].right = None;
            for &d in &dangling {
                self.nodes[d].parent = None;
            }

            // Skyline of the island as placed.
            let mut skyline = Contour::new();
            for i in 0..self.islands[idx].members().len() {
                let member = self.islands[idx].members()[i];
                let m = &self.plan[member];
                skyline.add_segment(m.x, m.right(), m.top());
            }

            let group_name = self.islands[idx].group().name.clone();
            let mut previous: Option<HbNodeId> = None;
            let mut first_contour: Option<HbNodeId> = None;
            for (k, seg) in skyline.segments().iter().enumerate() {
                let name = format!("{group_name}_contour_{k}");
                let id = self.nodes.insert(HbNode {
                    name: name.clone(),
                    kind: HbNodeKind::Contour {
                        x1: seg.start,
                        y1: seg.height,
                        x2: seg.end,
                        y2: seg.height,
                    },
                    parent: Some(previous.unwrap_or(hnode)),
                    left: None,
                    right: None,
                });
                self.names.insert(name, id);
                match previous {
                    Some(prev) => self.nodes[prev].left = Some(id),
                    None => {
                        self.nodes[hnode].right = Some(id);
                        first_contour = Some(id);
                    }
                }
                previous = Some(id);
            }

            for d in dangling {
                self.reattach_dangling(hnode, first_contour, d);
            }
        }
    }

    /// Reattaches a subtree orphaned by a skeleton rebuild: onto the first
    /// contour node's free right slot, or failing that onto the
    /// leftmost-skewed descendant of whatever occupies it.
    fn reattach_dangling(
        &mut self,
        hnode: HbNodeId,
        first_contour: Option<HbNodeId>,
        orphan: HbNodeId,
    ) {
        let anchor = first_contour.unwrap_or(hnode);
        match self.nodes[anchor].right {
            None => {
                self.nodes[anchor].right = Some(orphan);
                self.nodes[orphan].parent = Some(anchor);
            }
            Some(occupied) => {
                let mut current = occupied;
                while let Some(next) = self.nodes[current].left {
                    current = next;
                }
                self.nodes[current].left = Some(orphan);
                self.nodes[orphan].parent = Some(current);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use islet_model::{Axis, Floorplan, Module, SymmetryGroup, SymmetryPair};

    fn tree_of(specs: &[(&str, i32, i32)], groups: Vec<SymmetryGroup>) -> HbStarTree {
        let mut plan = Floorplan::new();
        for &(name, w, h) in specs {
            plan.add_module(Module::new(name, w, h));
        }
        HbStarTree::new(plan, groups).unwrap()
    }

    fn assert_no_overlaps(tree: &HbStarTree) {
        let modules: Vec<_> = tree.plan().modules().collect();
        for (i, a) in modules.iter().enumerate() {
            for b in &modules[i + 1..] {
                assert!(
                    !a.overlaps(b),
                    "{} at ({},{}) {}x{} overlaps {} at ({},{}) {}x{}",
                    a.name,
                    a.x,
                    a.y,
                    a.width(),
                    a.height(),
                    b.name,
                    b.x,
                    b.y,
                    b.width(),
                    b.height()
                );
            }
        }
    }

    #[test]
    fn empty_tree_packs_to_zero_area() {
        let mut tree = tree_of(&[], Vec::new());
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        assert_eq!(tree.area(), 0);
    }

    #[test]
    fn single_module_at_origin() {
        let mut tree = tree_of(&[("solo", 4, 3)], Vec::new());
        assert!(!tree.is_packed());
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        assert!(tree.is_packed());
        let m = &tree.plan()[tree.plan().id_of("solo").unwrap()];
        assert_eq!((m.x, m.y), (0, 0));
        assert_eq!(tree.area(), 12);
    }

    #[test]
    fn left_chain_packs_in_a_row() {
        let mut tree = tree_of(&[("a", 4, 3), ("b", 3, 3), ("c", 2, 3)], Vec::new());
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        assert_no_overlaps(&tree);
        // Left children line up to the right of their parents on the floor.
        let plan = tree.plan();
        let a = &plan[plan.id_of("a").unwrap()];
        let b = &plan[plan.id_of("b").unwrap()];
        let c = &plan[plan.id_of("c").unwrap()];
        assert_eq!((a.x, a.y), (0, 0));
        assert_eq!((b.x, b.y), (4, 0));
        assert_eq!((c.x, c.y), (7, 0));
        assert_eq!(tree.area(), 9 * 3);
    }

    #[test]
    fn right_child_stacks_above() {
        let mut tree = tree_of(&[("a", 4, 3), ("b", 4, 2)], Vec::new());
        // Restructure: b as right child of a.
        assert!(tree.move_node("b", "a", false));
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        let plan = tree.plan();
        let a = &plan[plan.id_of("a").unwrap()];
        let b = &plan[plan.id_of("b").unwrap()];
        assert_eq!((a.x, a.y), (0, 0));
        assert_eq!((b.x, b.y), (0, 3));
        assert_eq!(tree.area(), 4 * 5);
    }

    #[test]
    fn island_packs_and_mirrors() {
        let mut g = SymmetryGroup::new("sg", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        let mut tree = tree_of(&[("a", 3, 2), ("b", 3, 2), ("m", 2, 2)], vec![g]);
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        assert_no_overlaps(&tree);

        let plan = tree.plan();
        let a = &plan[plan.id_of("a").unwrap()];
        let b = &plan[plan.id_of("b").unwrap()];
        let axis2 = tree.islands()[0].axis_doubled();
        assert_eq!((a.x + a.right()) + (b.x + b.right()), 2 * axis2);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn contour_skeleton_is_rebuilt() {
        let mut g = SymmetryGroup::new("sg", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        let mut tree = tree_of(&[("a", 3, 2), ("b", 3, 2), ("m", 2, 2)], vec![g]);
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();

        // The island's skyline is one flat run of height 2 spanning 6 units.
        let hnode = tree.find_node("sg").unwrap();
        let first = tree.nodes[hnode].right.expect("skeleton missing");
        match tree.nodes[first].kind {
            HbNodeKind::Contour { x1, y1, x2, y2 } => {
                assert_eq!((x1, x2), (0, 6));
                assert_eq!((y1, y2), (2, 2));
            }
            _ => panic!("expected a contour node"),
        }
        assert!(tree.find_node("sg_contour_0").is_some());
    }

    #[test]
    fn node_atop_island_uses_contour_parent() {
        let mut g = SymmetryGroup::new("sg", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        let mut tree = tree_of(&[("a", 3, 2), ("b", 3, 2), ("m", 2, 2)], vec![g]);
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();

        // Hang m on the island's skyline as a right child of the first
        // contour node: it must land on top of the island.
        assert!(tree.move_node("m", "sg_contour_0", false));
        tree.pack(&sink).unwrap();
        assert_no_overlaps(&tree);
        let plan = tree.plan();
        let m = &plan[plan.id_of("m").unwrap()];
        assert_eq!((m.x, m.y), (0, 2));
    }

    #[test]
    fn dangling_subtree_survives_skeleton_rebuild() {
        let mut g = SymmetryGroup::new("sg", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        let mut tree = tree_of(&[("a", 3, 2), ("b", 3, 2), ("m", 2, 2)], vec![g]);
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        assert!(tree.move_node("m", "sg_contour_0", false));

        // Rotating the representative changes the island and triggers a
        // skeleton rebuild on the next pack; m must stay in the tree.
        assert!(tree.rotate_module("b"));
        tree.pack(&sink).unwrap();
        assert!(tree.check_tree_invariants());
        assert!(tree.find_node("m").is_some());
        let m_node = tree.find_node("m").unwrap();
        assert!(tree.nodes[m_node].parent.is_some());
        assert_no_overlaps(&tree);
    }

    #[test]
    fn repeated_packs_recycle_contour_nodes() {
        let mut g = SymmetryGroup::new("sg", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        let mut tree = tree_of(&[("a", 3, 2), ("b", 3, 2), ("m", 2, 2)], vec![g]);
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        let count_after_first = tree.nodes.len();
        for _ in 0..50 {
            tree.rotate_module("b");
            tree.pack(&sink).unwrap();
        }
        // The slab must not grow across packs: old skeleton slots are reused.
        assert_eq!(tree.nodes.len(), count_after_first);
    }

    #[test]
    fn pack_after_move_keeps_modules_disjoint() {
        let mut tree = tree_of(
            &[("a", 4, 3), ("b", 3, 3), ("c", 2, 3), ("d", 5, 1)],
            Vec::new(),
        );
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        assert!(tree.move_node("d", "a", false));
        tree.pack(&sink).unwrap();
        assert_no_overlaps(&tree);
        assert!(tree.check_tree_invariants());
    }

    #[test]
    fn all_coordinates_non_negative() {
        let mut g = SymmetryGroup::new("sg", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        g.self_symmetric.push("s".to_string());
        let mut tree = tree_of(
            &[("a", 3, 2), ("b", 3, 2), ("s", 4, 2), ("m", 2, 5)],
            vec![g],
        );
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        for m in tree.plan().modules() {
            assert!(m.x >= 0 && m.y >= 0, "{} at ({},{})", m.name, m.x, m.y);
        }
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut tree = tree_of(&[("a", 4, 3), ("b", 3, 3)], Vec::new());
        let sink = DiagnosticSink::new();
        tree.pack(&sink).unwrap();
        let snapshot = tree.clone();
        tree.rotate_module("a");
        tree.pack(&sink).unwrap();
        let a = snapshot.plan().id_of("a").unwrap();
        assert!(!snapshot.plan()[a].rotated());
        assert_eq!(snapshot.area(), 7 * 3);
    }
}
