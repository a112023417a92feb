//! ASF-B*-tree: the per-symmetry-group placement tree.
//!
//! Only *representatives* participate in the tree: one module of each mirror
//! pair (the lexicographically greater name, unless flipped later) and every
//! self-symmetric module. Packing the representatives and running a single
//! mirror pass materializes the whole group, so every placement the tree can
//! encode satisfies the symmetry constraints; that is what makes it
//! *automatically symmetric-feasible*.
//!
//! The one structural rule the perturbations must preserve: with a vertical
//! axis every self-symmetric node sits on the rightmost branch (the chain of
//! right children from the root); with a horizontal axis, on the leftmost
//! branch. That keeps the module's center on the axis after packing.

use crate::tree::slab::{define_slot_key, Slab};
use islet_common::{InternalError, IsletResult};
use islet_model::{Axis, Contour, Floorplan, ModuleId, SymmetryGroup};
use std::collections::HashMap;

define_slot_key!(
    /// Key of a node in an ASF-B*-tree's slab.
    AsfNodeId
);

/// A node of the ASF-B*-tree; holds exactly one representative module.
#[derive(Debug, Clone)]
pub struct AsfNode {
    /// The representative module this node places.
    pub module: ModuleId,
    /// Parent node, `None` for the root.
    pub parent: Option<AsfNodeId>,
    /// Left child: packed immediately to the right of this node.
    pub left: Option<AsfNodeId>,
    /// Right child: packed at the same x, above this node.
    pub right: Option<AsfNodeId>,
}

/// The placement tree of one symmetry group.
#[derive(Debug, Clone)]
pub struct AsfBStarTree {
    group: SymmetryGroup,
    nodes: Slab<AsfNodeId, AsfNode>,
    root: Option<AsfNodeId>,
    /// Representative module -> its tree node.
    node_of: HashMap<ModuleId, AsfNodeId>,
    /// Every member -> the current representative of its pair (self for
    /// self-symmetric modules).
    rep_of: HashMap<ModuleId, ModuleId>,
    /// Pair member -> its partner.
    partner: HashMap<ModuleId, ModuleId>,
    /// All member module IDs, pairs first.
    members: Vec<ModuleId>,
    /// Self-symmetric member IDs.
    self_sym: Vec<ModuleId>,
    h_contour: Contour,
    v_contour: Contour,
    /// Twice the axis coordinate, kept doubled so mirrored coordinates stay
    /// integral. Valid after the first pack.
    axis_doubled: i32,
    packed: bool,
}

impl AsfBStarTree {
    /// Builds the tree for `group`, resolving member names against `plan`.
    pub fn new(group: SymmetryGroup, plan: &Floorplan) -> IsletResult<Self> {
        let mut rep_of = HashMap::new();
        let mut partner = HashMap::new();
        let mut members = Vec::new();
        let mut self_sym = Vec::new();

        let resolve = |name: &str| -> IsletResult<ModuleId> {
            plan.id_of(name)
                .ok_or_else(|| InternalError::new(format!("module '{name}' not in floorplan")))
        };

        for pair in &group.pairs {
            let a = resolve(&pair.a)?;
            let b = resolve(&pair.b)?;
            let rep = resolve(pair.representative())?;
            rep_of.insert(a, rep);
            rep_of.insert(b, rep);
            partner.insert(a, b);
            partner.insert(b, a);
            members.push(a);
            members.push(b);
        }
        for name in &group.self_symmetric {
            let id = resolve(name)?;
            rep_of.insert(id, id);
            members.push(id);
            self_sym.push(id);
        }

        let mut tree = Self {
            group,
            nodes: Slab::new(),
            root: None,
            node_of: HashMap::new(),
            rep_of,
            partner,
            members,
            self_sym,
            h_contour: Contour::new(),
            v_contour: Contour::new(),
            axis_doubled: 0,
            packed: false,
        };
        tree.construct_initial_tree(plan);
        Ok(tree)
    }

    /// The symmetry group this tree places.
    pub fn group(&self) -> &SymmetryGroup {
        &self.group
    }

    /// All member module IDs of the group.
    pub fn members(&self) -> &[ModuleId] {
        &self.members
    }

    /// Twice the symmetry-axis coordinate (valid after the first pack).
    pub fn axis_doubled(&self) -> i32 {
        self.axis_doubled
    }

    /// Returns whether `module` is currently a representative.
    pub fn is_representative(&self, module: ModuleId) -> bool {
        self.rep_of.get(&module) == Some(&module)
    }

    /// The current representative of the pair containing `module` (itself
    /// for self-symmetric members).
    pub fn representative_of(&self, module: ModuleId) -> Option<ModuleId> {
        self.rep_of.get(&module).copied()
    }

    /// Returns whether `module` is a self-symmetric member.
    pub fn is_self_symmetric(&self, module: ModuleId) -> bool {
        self.self_sym.contains(&module)
    }

    /// Current representative module IDs, in member order.
    pub fn representatives(&self) -> Vec<ModuleId> {
        self.members
            .iter()
            .copied()
            .filter(|&m| self.is_representative(m))
            .collect()
    }

    /// Rebuilds the tree from scratch: representatives sorted by area
    /// (largest first), self-symmetric nodes appended along the boundary
    /// branch, pair representatives appended along the rightmost branch.
    fn construct_initial_tree(&mut self, plan: &Floorplan) {
        self.nodes.clear();
        self.node_of.clear();
        self.root = None;
        self.packed = false;

        let mut reps = self.representatives();
        reps.sort_by(|&a, &b| {
            plan[b]
                .area()
                .cmp(&plan[a].area())
                .then_with(|| plan[a].name.cmp(&plan[b].name))
        });

        for module in reps {
            let id = self.nodes.insert(AsfNode {
                module,
                parent: None,
                left: None,
                right: None,
            });
            self.node_of.insert(module, id);

            let Some(root) = self.root else {
                self.root = Some(id);
                continue;
            };

            // Self-symmetric nodes must live on the boundary branch; pair
            // representatives go to the end of the rightmost chain.
            let follow_left =
                self.is_self_symmetric(module) && self.group.axis == Axis::Horizontal;
            let mut current = root;
            loop {
                let next = if follow_left {
                    self.nodes[current].left
                } else {
                    self.nodes[current].right
                };
                match next {
                    Some(n) => current = n,
                    None => break,
                }
            }
            if follow_left {
                self.nodes[current].left = Some(id);
            } else {
                self.nodes[current].right = Some(id);
            }
            self.nodes[id].parent = Some(current);
        }
    }

    /// Returns whether `node` is the left child of its parent.
    fn is_left_child(&self, node: AsfNodeId) -> bool {
        match self.nodes[node].parent {
            Some(p) => self.nodes[p].left == Some(node),
            None => false,
        }
    }

    /// Checks the boundary rule for relocating `node` under `new_parent`.
    fn can_move_node(&self, node: AsfNodeId, new_parent: AsfNodeId, as_left: bool) -> bool {
        let module = self.nodes[node].module;
        if !self.is_self_symmetric(module) {
            return true;
        }
        match self.group.axis {
            Axis::Vertical => {
                // Must stay on the rightmost branch: right child of a parent
                // that is itself on the rightmost branch.
                if as_left {
                    return false;
                }
                let mut current = new_parent;
                while let Some(p) = self.nodes[current].parent {
                    if self.nodes[p].left == Some(current) {
                        return false;
                    }
                    current = p;
                }
                true
            }
            Axis::Horizontal => {
                if !as_left {
                    return false;
                }
                let mut current = new_parent;
                while let Some(p) = self.nodes[current].parent {
                    if self.nodes[p].right == Some(current) {
                        return false;
                    }
                    current = p;
                }
                true
            }
        }
    }

    /// Verifies that every self-symmetric node sits on its boundary branch.
    pub fn is_symmetric_feasible(&self) -> bool {
        for &module in &self.self_sym {
            let Some(&node) = self.node_of.get(&module) else {
                continue;
            };
            let mut current = node;
            while let Some(p) = self.nodes[current].parent {
                let off_branch = match self.group.axis {
                    Axis::Vertical => self.nodes[p].left == Some(current),
                    Axis::Horizontal => self.nodes[p].right == Some(current),
                };
                if off_branch {
                    return false;
                }
                current = p;
            }
        }
        true
    }

    /// Toggles the orientation of a representative module.
    ///
    /// Returns `false` for non-representatives: mirrored modules take their
    /// orientation from their representative during the mirror pass.
    pub fn rotate_module(&mut self, module: ModuleId, plan: &mut Floorplan) -> bool {
        if !self.is_representative(module) {
            return false;
        }
        plan[module].rotate();
        true
    }

    /// Relocates a representative's node under `new_parent`.
    ///
    /// An existing child on the requested side is pushed down into the moved
    /// node's subtree. Fails on cycles, on root relocation, and whenever the
    /// result would take a self-symmetric node off its boundary branch.
    pub fn move_node(&mut self, module: ModuleId, new_parent: ModuleId, as_left: bool) -> bool {
        if module == new_parent {
            return false;
        }
        let (Some(&node), Some(&parent)) =
            (self.node_of.get(&module), self.node_of.get(&new_parent))
        else {
            return false;
        };
        if self.nodes[node].parent.is_none() {
            // Relocating the root would make the target its own ancestor.
            return false;
        }
        // Cycle check: the new parent must not be inside the moved subtree.
        let mut current = parent;
        loop {
            if current == node {
                return false;
            }
            match self.nodes[current].parent {
                Some(p) => current = p,
                None => break,
            }
        }
        if !self.can_move_node(node, parent, as_left) {
            return false;
        }

        // Structural changes can drag a self-symmetric descendant off its
        // boundary branch, so mutate a checkpoint and keep it only if the
        // tree stays feasible.
        let checkpoint = (self.nodes.clone(), self.root, self.node_of.clone());

        self.detach(node);
        let existing = if as_left {
            self.nodes[parent].left.take()
        } else {
            self.nodes[parent].right.take()
        };
        if let Some(child) = existing {
            self.push_down(node, child, as_left);
        }
        if as_left {
            self.nodes[parent].left = Some(node);
        } else {
            self.nodes[parent].right = Some(node);
        }
        self.nodes[node].parent = Some(parent);

        if self.is_symmetric_feasible() {
            true
        } else {
            (self.nodes, self.root, self.node_of) = checkpoint;
            false
        }
    }

    /// Unlinks `node` from its parent.
    fn detach(&mut self, node: AsfNodeId) {
        if let Some(p) = self.nodes[node].parent.take() {
            if self.nodes[p].left == Some(node) {
                self.nodes[p].left = None;
            } else if self.nodes[p].right == Some(node) {
                self.nodes[p].right = None;
            }
        }
    }

    /// Hangs a displaced child somewhere under `node`, preferring the slot
    /// it was displaced from.
    fn push_down(&mut self, node: AsfNodeId, child: AsfNodeId, prefer_left: bool) {
        if prefer_left {
            if self.nodes[node].left.is_none() {
                self.nodes[node].left = Some(child);
            } else if self.nodes[node].right.is_none() {
                self.nodes[node].right = Some(child);
            } else {
                let mut current = self.nodes[node].left.unwrap();
                while let Some(next) = self.nodes[current].left {
                    current = next;
                }
                self.nodes[current].left = Some(child);
                self.nodes[child].parent = Some(current);
                return;
            }
        } else if self.nodes[node].right.is_none() {
            self.nodes[node].right = Some(child);
        } else if self.nodes[node].left.is_none() {
            self.nodes[node].left = Some(child);
        } else {
            let mut current = self.nodes[node].right.unwrap();
            while let Some(next) = self.nodes[current].right {
                current = next;
            }
            self.nodes[current].right = Some(child);
            self.nodes[child].parent = Some(current);
            return;
        }
        self.nodes[child].parent = Some(node);
    }

    /// Swaps the module references of two representatives' nodes.
    ///
    /// Fails when exactly one of the two is self-symmetric: the other would
    /// land off its boundary branch.
    pub fn swap_nodes(&mut self, a: ModuleId, b: ModuleId) -> bool {
        if a == b {
            return false;
        }
        let (Some(&na), Some(&nb)) = (self.node_of.get(&a), self.node_of.get(&b)) else {
            return false;
        };
        if self.is_self_symmetric(a) != self.is_self_symmetric(b) {
            return false;
        }
        self.nodes[na].module = b;
        self.nodes[nb].module = a;
        self.node_of.insert(a, nb);
        self.node_of.insert(b, na);
        true
    }

    /// Flips which member of `module`'s pair is the representative, then
    /// rebuilds the tree. Involution: flipping twice restores the pair.
    pub fn flip_representative(&mut self, module: ModuleId, plan: &Floorplan) -> bool {
        let Some(&other) = self.partner.get(&module) else {
            return false;
        };
        let Some(&old_rep) = self.rep_of.get(&module) else {
            return false;
        };
        let new_rep = if old_rep == module { other } else { module };
        self.rep_of.insert(module, new_rep);
        self.rep_of.insert(other, new_rep);
        self.construct_initial_tree(plan);
        true
    }

    /// Flips the axis orientation, rotates every member 90°, and rebuilds
    /// the tree. Applying it twice restores axis and orientations.
    pub fn convert_symmetry_type(&mut self, plan: &mut Floorplan) -> bool {
        self.group.axis = self.group.axis.flipped();
        for &m in &self.members {
            plan[m].rotate();
        }
        self.construct_initial_tree(plan);
        true
    }

    /// Packs the island at the origin: places every representative by the
    /// B*-tree rules, derives the axis, recenters self-symmetric modules,
    /// and mirrors the non-representatives.
    pub fn pack(&mut self, plan: &mut Floorplan) -> IsletResult<()> {
        let Some(root) = self.root else {
            self.packed = true;
            return Ok(());
        };

        self.h_contour.clear();
        self.v_contour.clear();
        self.h_contour.add_segment(0, i32::MAX, 0);
        self.v_contour.add_segment(0, i32::MAX, 0);

        // Pre-order: parents are always placed before their children.
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            self.place_node(id, plan)?;
            let node = &self.nodes[id];
            if let Some(r) = node.right {
                stack.push(r);
            }
            if let Some(l) = node.left {
                stack.push(l);
            }
        }

        self.compute_axis(plan);
        self.recenter_self_symmetric(plan);
        self.mirror_pass(plan);
        self.normalize(plan);
        self.packed = true;
        Ok(())
    }

    /// Places one representative per the B*-tree convention.
    fn place_node(&mut self, id: AsfNodeId, plan: &mut Floorplan) -> IsletResult<()> {
        let module = self.nodes[id].module;
        let x = match self.nodes[id].parent {
            None => 0,
            Some(p) => {
                let pm = &plan[self.nodes[p].module];
                if self.is_left_child(id) {
                    pm.x + pm.width()
                } else {
                    pm.x
                }
            }
        };
        let (w, h) = (plan[module].width(), plan[module].height());
        if w <= 0 || h <= 0 {
            return Err(InternalError::new(format!(
                "module '{}' has degenerate dimensions {w}x{h}",
                plan[module].name
            )));
        }
        let y = self.h_contour.get_height(x, x + w);
        plan[module].set_position(x, y);
        self.h_contour.add_segment(x, x + w, y + h);
        self.v_contour.add_segment(y, y + h, x + w);
        Ok(())
    }

    /// Fixes `2·axis` at the representatives' boundary edge: their minimum x
    /// (vertical) or minimum y (horizontal), which the B*-tree packing pins
    /// at zero. The boundary branch hugs that edge, so self-symmetric
    /// modules straddle the axis and mirrored modules land on the far side
    /// without colliding with any representative. The doubled form keeps
    /// every mirrored coordinate integral even when the axis itself is a
    /// half-integer.
    fn compute_axis(&mut self, plan: &Floorplan) {
        let mut lo = i32::MAX;
        for (&module, _) in self.node_of.iter() {
            let m = &plan[module];
            lo = match self.group.axis {
                Axis::Vertical => lo.min(m.x),
                Axis::Horizontal => lo.min(m.y),
            };
        }
        if lo != i32::MAX {
            self.axis_doubled = 2 * lo;
        }
    }

    /// Recenters self-symmetric modules on the axis. Coordinates may go
    /// negative here; [`normalize`](Self::normalize) shifts the island back
    /// into the first quadrant afterwards.
    fn recenter_self_symmetric(&mut self, plan: &mut Floorplan) {
        for &module in &self.self_sym {
            let m = &mut plan[module];
            match self.group.axis {
                Axis::Vertical => m.x = (self.axis_doubled - m.width()) / 2,
                Axis::Horizontal => m.y = (self.axis_doubled - m.height()) / 2,
            }
        }
    }

    /// Produces every non-representative by reflecting its representative
    /// across the axis; orientation is copied so the pair stays congruent.
    fn mirror_pass(&mut self, plan: &mut Floorplan) {
        for pair in &self.group.pairs {
            let (Some(a), Some(b)) = (plan.id_of(&pair.a), plan.id_of(&pair.b)) else {
                continue;
            };
            let rep = match self.rep_of.get(&a) {
                Some(&rep) => rep,
                None => continue,
            };
            let mirror = if rep == a { b } else { a };

            let (rot, rx, ry, rw, rh) = {
                let r = &plan[rep];
                (r.rotated(), r.x, r.y, r.width(), r.height())
            };
            let m = &mut plan[mirror];
            m.set_rotated(rot);
            match self.group.axis {
                Axis::Vertical => {
                    m.x = self.axis_doubled - (rx + rw);
                    m.y = ry;
                }
                Axis::Horizontal => {
                    m.x = rx;
                    m.y = self.axis_doubled - (ry + rh);
                }
            }
        }
    }

    /// Shifts the island so its bounding box is anchored at the origin,
    /// carrying the axis along.
    fn normalize(&mut self, plan: &mut Floorplan) {
        if let Some((min_x, min_y, _, _)) = self.bounding_box(plan) {
            if min_x != 0 || min_y != 0 {
                self.shift_members(-min_x, -min_y, plan);
            }
        }
    }

    /// Translates every member (and the axis) by `(dx, dy)`.
    pub fn shift_members(&mut self, dx: i32, dy: i32, plan: &mut Floorplan) {
        for &m in &self.members {
            let m = &mut plan[m];
            m.x += dx;
            m.y += dy;
        }
        match self.group.axis {
            Axis::Vertical => self.axis_doubled += 2 * dx,
            Axis::Horizontal => self.axis_doubled += 2 * dy,
        }
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` over all members.
    pub fn bounding_box(&self, plan: &Floorplan) -> Option<(i32, i32, i32, i32)> {
        let mut it = self.members.iter();
        let first = &plan[*it.next()?];
        let mut bb = (first.x, first.y, first.right(), first.top());
        for &m in it {
            let m = &plan[m];
            bb.0 = bb.0.min(m.x);
            bb.1 = bb.1.min(m.y);
            bb.2 = bb.2.max(m.right());
            bb.3 = bb.3.max(m.top());
        }
        Some(bb)
    }
}
