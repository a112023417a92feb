//! HB*-tree: the outer placement tree.
//!
//! The HB*-tree composes bare modules and whole symmetry islands in one
//! relative-placement encoding. Three node flavors exist:
//!
//! - `Module` — a non-symmetric module, packed by the plain B*-tree rules;
//! - `Hierarchy` — a symmetry group; owns one [`AsfBStarTree`] that is
//!   packed as a unit and placed like a single large block;
//! - `Contour` — a segment of a packed island's skyline, exposed as a
//!   placeholder parent so later nodes can sit on top of the island.
//!
//! Perturbations mutate the tree in place and mark the touched subtrees
//! dirty; the packer (see [`pack`](crate::tree::pack)) consumes the dirty
//! set on the next pass.

use crate::tree::asf::AsfBStarTree;
use crate::tree::slab::{define_slot_key, Slab};
use islet_common::{InternalError, IsletResult};
use islet_model::{Axis, Floorplan, ModuleId, SymmetryGroup, SymmetryPair};
use std::collections::{HashMap, HashSet};

define_slot_key!(
    /// Key of a node in the HB*-tree's slab.
    HbNodeId
);

/// Payload of an HB*-tree node.
#[derive(Debug, Clone)]
pub enum HbNodeKind {
    /// A non-symmetric module.
    Module(ModuleId),
    /// A symmetry group, identified by its island index.
    Hierarchy(usize),
    /// A contour segment `(x1, y1)-(x2, y2)` of a packed island's skyline.
    Contour {
        /// Segment start x.
        x1: i32,
        /// Skyline height at the segment start.
        y1: i32,
        /// Segment end x.
        x2: i32,
        /// Skyline height at the segment end.
        y2: i32,
    },
}

impl HbNodeKind {
    /// Returns whether this is a contour placeholder node.
    pub fn is_contour(&self) -> bool {
        matches!(self, HbNodeKind::Contour { .. })
    }
}

/// A node of the HB*-tree.
#[derive(Debug, Clone)]
pub struct HbNode {
    /// Node name: module name, group name, or a generated contour name.
    pub name: String,
    /// The payload.
    pub kind: HbNodeKind,
    /// Parent node, `None` for the root.
    pub parent: Option<HbNodeId>,
    /// Left child: packed immediately to the right of this node.
    pub left: Option<HbNodeId>,
    /// Right child: packed at the same x, above this node.
    pub right: Option<HbNodeId>,
}

/// The outer placement tree: owner of the module catalog and all islands.
#[derive(Debug, Clone)]
pub struct HbStarTree {
    pub(crate) plan: Floorplan,
    pub(crate) islands: Vec<AsfBStarTree>,
    /// Hierarchy node of each island, parallel to `islands`.
    pub(crate) island_nodes: Vec<HbNodeId>,
    pub(crate) nodes: Slab<HbNodeId, HbNode>,
    pub(crate) root: Option<HbNodeId>,
    pub(crate) names: HashMap<String, HbNodeId>,
    group_index: HashMap<String, usize>,
    non_sym: Vec<ModuleId>,
    pub(crate) h_contour: islet_model::Contour,
    pub(crate) v_contour: islet_model::Contour,
    pub(crate) dirty: HashSet<HbNodeId>,
    pub(crate) total_area: i64,
    pub(crate) packed: bool,
}

impl HbStarTree {
    /// Builds the initial tree: symmetry groups sorted by total member area
    /// (largest first), then non-symmetric modules sorted by area, all
    /// chained as left children. The annealer reshapes it from there.
    pub fn new(plan: Floorplan, groups: Vec<SymmetryGroup>) -> IsletResult<Self> {
        let mut sorted_groups = groups;
        let group_area = |g: &SymmetryGroup| -> i64 {
            g.member_names()
                .filter_map(|n| plan.id_of(n))
                .map(|id| plan[id].area())
                .sum()
        };
        sorted_groups.sort_by(|a, b| {
            group_area(b)
                .cmp(&group_area(a))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut in_group: HashSet<ModuleId> = HashSet::new();
        let mut islands = Vec::with_capacity(sorted_groups.len());
        let mut group_index = HashMap::new();
        for group in sorted_groups {
            for name in group.member_names() {
                let id = plan.id_of(name).ok_or_else(|| {
                    InternalError::new(format!("group member '{name}' not in floorplan"))
                })?;
                in_group.insert(id);
            }
            group_index.insert(group.name.clone(), islands.len());
            islands.push(AsfBStarTree::new(group, &plan)?);
        }

        let mut non_sym: Vec<ModuleId> = plan
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !in_group.contains(id))
            .collect();
        non_sym.sort_by(|&a, &b| {
            plan[b]
                .area()
                .cmp(&plan[a].area())
                .then_with(|| plan[a].name.cmp(&plan[b].name))
        });

        let mut tree = Self {
            plan,
            islands,
            island_nodes: Vec::new(),
            nodes: Slab::new(),
            root: None,
            names: HashMap::new(),
            group_index,
            non_sym,
            h_contour: islet_model::Contour::new(),
            v_contour: islet_model::Contour::new(),
            dirty: HashSet::new(),
            total_area: 0,
            packed: false,
        };
        tree.construct_initial_tree();
        Ok(tree)
    }

    /// Builds the left-skewed initial chain over islands and bare modules.
    fn construct_initial_tree(&mut self) {
        let mut tail: Option<HbNodeId> = None;
        let mut append = |tree_nodes: &mut Slab<HbNodeId, HbNode>,
                          root: &mut Option<HbNodeId>,
                          names: &mut HashMap<String, HbNodeId>,
                          name: String,
                          kind: HbNodeKind| {
            let id = tree_nodes.insert(HbNode {
                name: name.clone(),
                kind,
                parent: tail,
                left: None,
                right: None,
            });
            names.insert(name, id);
            match tail {
                Some(t) => tree_nodes[t].left = Some(id),
                None => *root = Some(id),
            }
            tail = Some(id);
            id
        };

        for idx in 0..self.islands.len() {
            let name = self.islands[idx].group().name.clone();
            let id = append(
                &mut self.nodes,
                &mut self.root,
                &mut self.names,
                name,
                HbNodeKind::Hierarchy(idx),
            );
            self.island_nodes.push(id);
        }
        for i in 0..self.non_sym.len() {
            let module = self.non_sym[i];
            let name = self.plan[module].name.clone();
            append(
                &mut self.nodes,
                &mut self.root,
                &mut self.names,
                name,
                HbNodeKind::Module(module),
            );
        }
    }

    /// The module catalog.
    pub fn plan(&self) -> &Floorplan {
        &self.plan
    }

    /// Mutable access to the module catalog (used by the validator).
    pub fn plan_mut(&mut self) -> &mut Floorplan {
        &mut self.plan
    }

    /// The symmetry islands.
    pub fn islands(&self) -> &[AsfBStarTree] {
        &self.islands
    }

    /// Bounding-box area of the last pack.
    pub fn area(&self) -> i64 {
        self.total_area
    }

    /// Returns whether the tree has been packed at least once.
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Names of the outer tree's perturbable nodes: non-symmetric modules
    /// and symmetry groups (contour placeholders are excluded).
    pub fn outer_node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .non_sym
            .iter()
            .map(|&m| self.plan[m].name.clone())
            .collect();
        names.extend(self.islands.iter().map(|i| i.group().name.clone()));
        names
    }

    /// Names of all symmetry groups.
    pub fn group_names(&self) -> Vec<String> {
        self.islands
            .iter()
            .map(|i| i.group().name.clone())
            .collect()
    }

    /// Names of every module that may be rotated directly: non-symmetric
    /// modules and the current representatives of every group.
    pub fn representative_module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .non_sym
            .iter()
            .map(|&m| self.plan[m].name.clone())
            .collect();
        for island in &self.islands {
            names.extend(
                island
                    .representatives()
                    .into_iter()
                    .map(|m| self.plan[m].name.clone()),
            );
        }
        names
    }

    /// The symmetry pairs of a group, if the group exists.
    pub fn group_pairs(&self, group: &str) -> Option<&[SymmetryPair]> {
        let idx = *self.group_index.get(group)?;
        Some(&self.islands[idx].group().pairs)
    }

    /// The axis orientation of a group, if the group exists.
    pub fn group_axis(&self, group: &str) -> Option<Axis> {
        let idx = *self.group_index.get(group)?;
        Some(self.islands[idx].group().axis)
    }

    /// The current representative's name for the pair containing `member`.
    pub fn representative_name_of(&self, group: &str, member: &str) -> Option<String> {
        let idx = *self.group_index.get(group)?;
        let id = self.plan.id_of(member)?;
        let rep = self.islands[idx].representative_of(id)?;
        Some(self.plan[rep].name.clone())
    }

    /// Looks up a node by name (modules, groups, and contour placeholders).
    pub fn find_node(&self, name: &str) -> Option<HbNodeId> {
        self.names.get(name).copied()
    }

    /// The parent name and child side of a named node, for undo bookkeeping.
    /// Returns `(None, _)` for the root.
    pub fn parent_info(&self, name: &str) -> Option<(Option<String>, bool)> {
        let id = self.find_node(name)?;
        match self.nodes[id].parent {
            Some(p) => {
                let was_left = self.nodes[p].left == Some(id);
                Some((Some(self.nodes[p].name.clone()), was_left))
            }
            None => Some((None, false)),
        }
    }

    /// Marks a node and all its ancestors dirty.
    pub(crate) fn mark_dirty(&mut self, node: HbNodeId) {
        let mut current = Some(node);
        while let Some(id) = current {
            self.dirty.insert(id);
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
    }

    fn island_of_module(&self, name: &str) -> Option<usize> {
        self.islands
            .iter()
            .position(|island| island.group().contains(name))
    }

    /// Rotates a module 90°.
    ///
    /// Members of a symmetry group are delegated to their island, which only
    /// accepts representatives; bare modules toggle directly.
    pub fn rotate_module(&mut self, name: &str) -> bool {
        let Some(id) = self.plan.id_of(name) else {
            return false;
        };
        if let Some(idx) = self.island_of_module(name) {
            let ok = {
                let island = &mut self.islands[idx];
                island.rotate_module(id, &mut self.plan)
            };
            if ok {
                self.mark_dirty(self.island_nodes[idx]);
            }
            return ok;
        }
        self.plan[id].rotate();
        if let Some(node) = self.find_node(name) {
            self.mark_dirty(node);
        }
        true
    }

    /// Relocates a named node (module or whole island) under a new parent.
    ///
    /// The displaced child, if any, is pushed down into the moved subtree.
    /// Fails on unknown names, on relocating the root, and on moves that
    /// would create a cycle.
    pub fn move_node(&mut self, name: &str, new_parent: &str, as_left: bool) -> bool {
        let (Some(node), Some(parent)) = (self.find_node(name), self.find_node(new_parent)) else {
            return false;
        };
        if node == parent || self.nodes[node].parent.is_none() {
            return false;
        }
        // Cycle check: the new parent must not live inside the moved subtree.
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

        let old_parent = self.nodes[node].parent;
        self.detach(node);

        let existing = if as_left {
            self.nodes[parent].left.take()
        } else {
            self.nodes[parent].right.take()
        };
        if let Some(child) = existing {
            self.push_down(node, child, as_left);
            self.mark_dirty(child);
        }
        if as_left {
            self.nodes[parent].left = Some(node);
        } else {
            self.nodes[parent].right = Some(node);
        }
        self.nodes[node].parent = Some(parent);

        if let Some(p) = old_parent {
            self.mark_dirty(p);
        }
        self.mark_dirty(node);
        self.mark_dirty(parent);
        true
    }

    /// Unlinks `node` from its parent.
    fn detach(&mut self, node: HbNodeId) {
        if let Some(p) = self.nodes[node].parent.take() {
            if self.nodes[p].left == Some(node) {
                self.nodes[p].left = None;
            } else if self.nodes[p].right == Some(node) {
                self.nodes[p].right = None;
            }
        }
    }

    /// Hangs a displaced child under `node`, preferring the side it was
    /// displaced from and descending the skewed chain when both slots are
    /// taken.
    fn push_down(&mut self, node: HbNodeId, child: HbNodeId, prefer_left: bool) {
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

    /// Swaps two named nodes structurally: each takes the other's parent,
    /// child side, and children. Applying the same swap twice restores the
    /// tree.
    pub fn swap_nodes(&mut self, a: &str, b: &str) -> bool {
        let (Some(n1), Some(n2)) = (self.find_node(a), self.find_node(b)) else {
            return false;
        };
        if n1 == n2 {
            return false;
        }

        self.mark_dirty(n1);
        self.mark_dirty(n2);

        if self.nodes[n1].left == Some(n2) || self.nodes[n1].right == Some(n2) {
            self.swap_parent_child(n1, n2);
        } else if self.nodes[n2].left == Some(n1) || self.nodes[n2].right == Some(n1) {
            self.swap_parent_child(n2, n1);
        } else {
            self.swap_distant(n1, n2);
        }
        true
    }

    /// Swap for the adjacent case: `b` is a direct child of `a`.
    fn swap_parent_child(&mut self, a: HbNodeId, b: HbNodeId) {
        let pa = self.nodes[a].parent;
        let a_was_left = pa.map(|p| self.nodes[p].left == Some(a)).unwrap_or(false);
        let b_on_left = self.nodes[a].left == Some(b);
        let other = if b_on_left {
            self.nodes[a].right
        } else {
            self.nodes[a].left
        };
        let (bl, br) = (self.nodes[b].left, self.nodes[b].right);

        // b takes a's place under a's parent.
        self.nodes[b].parent = pa;
        match pa {
            Some(p) => {
                if a_was_left {
                    self.nodes[p].left = Some(b);
                } else {
                    self.nodes[p].right = Some(b);
                }
            }
            None => self.root = Some(b),
        }

        // a hangs under b on b's former side; the sibling keeps its side.
        if b_on_left {
            self.nodes[b].left = Some(a);
            self.nodes[b].right = other;
        } else {
            self.nodes[b].right = Some(a);
            self.nodes[b].left = other;
        }
        self.nodes[a].parent = Some(b);
        if let Some(o) = other {
            self.nodes[o].parent = Some(b);
        }

        // a inherits b's children.
        self.nodes[a].left = bl;
        self.nodes[a].right = br;
        if let Some(c) = bl {
            self.nodes[c].parent = Some(a);
        }
        if let Some(c) = br {
            self.nodes[c].parent = Some(a);
        }
    }

    /// Swap for the general case: the nodes are not directly related.
    fn swap_distant(&mut self, n1: HbNodeId, n2: HbNodeId) {
        let p1 = self.nodes[n1].parent;
        let p2 = self.nodes[n2].parent;
        let n1_left = p1.map(|p| self.nodes[p].left == Some(n1)).unwrap_or(false);
        let n2_left = p2.map(|p| self.nodes[p].left == Some(n2)).unwrap_or(false);

        let (l1, r1) = (self.nodes[n1].left, self.nodes[n1].right);
        let (l2, r2) = (self.nodes[n2].left, self.nodes[n2].right);

        self.nodes[n1].left = l2;
        self.nodes[n1].right = r2;
        self.nodes[n2].left = l1;
        self.nodes[n2].right = r1;
        for c in [l2, r2].into_iter().flatten() {
            self.nodes[c].parent = Some(n1);
        }
        for c in [l1, r1].into_iter().flatten() {
            self.nodes[c].parent = Some(n2);
        }

        self.nodes[n1].parent = p2;
        self.nodes[n2].parent = p1;
        match p1 {
            Some(p) => {
                if n1_left {
                    self.nodes[p].left = Some(n2);
                } else {
                    self.nodes[p].right = Some(n2);
                }
            }
            None => self.root = Some(n2),
        }
        match p2 {
            Some(p) => {
                if n2_left {
                    self.nodes[p].left = Some(n1);
                } else {
                    self.nodes[p].right = Some(n1);
                }
            }
            None => self.root = Some(n1),
        }
    }

    /// Flips which member of a pair inside `group` is the representative and
    /// rebuilds that island's tree.
    pub fn change_representative(&mut self, group: &str, member: &str) -> bool {
        let Some(&idx) = self.group_index.get(group) else {
            return false;
        };
        let Some(id) = self.plan.id_of(member) else {
            return false;
        };
        let ok = {
            let island = &mut self.islands[idx];
            island.flip_representative(id, &self.plan)
        };
        if ok {
            self.mark_dirty(self.island_nodes[idx]);
        }
        ok
    }

    /// Flips a group's axis orientation, rotating every member 90°.
    pub fn convert_symmetry_type(&mut self, group: &str) -> bool {
        let Some(&idx) = self.group_index.get(group) else {
            return false;
        };
        let ok = {
            let island = &mut self.islands[idx];
            island.convert_symmetry_type(&mut self.plan)
        };
        if ok {
            self.mark_dirty(self.island_nodes[idx]);
        }
        ok
    }

    /// Verifies the structural tree invariants: one root, no cycles, parent
    /// and child links mutually consistent. Used by tests.
    pub fn check_tree_invariants(&self) -> bool {
        let Some(root) = self.root else {
            return self.nodes.is_empty();
        };
        if self.nodes[root].parent.is_some() {
            return false;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return false; // cycle or shared node
            }
            for child in [self.nodes[id].left, self.nodes[id].right]
                .into_iter()
                .flatten()
            {
                if self.nodes[child].parent != Some(id) {
                    return false;
                }
                stack.push(child);
            }
        }
        seen.len() == self.nodes.len()
    }
}
