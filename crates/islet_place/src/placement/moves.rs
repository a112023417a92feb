//! Move descriptors and their pool.
//!
//! The annealing hot loop creates and destroys a move descriptor per
//! iteration. To keep that allocation-free, descriptors live in a
//! [`MovePool`]: a block-growing arena with a free list. A recycled slot
//! keeps its `String` capacities, so steady-state operation touches the
//! allocator only when the pool has to grow by another block.

use islet_model::Axis;

/// The number of descriptors added per pool growth step.
const BLOCK_SIZE: usize = 1024;

/// The five perturbation operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKind {
    /// Toggle a representative module's orientation.
    Rotate,
    /// Reparent a node of the outer tree.
    Relocate,
    /// Structurally swap two nodes of the outer tree.
    Swap,
    /// Flip which member of a pair is the representative.
    ChangeRep,
    /// Flip a group's axis orientation.
    ConvertSym,
}

impl MoveKind {
    /// All operators, in probability-table order.
    pub const ALL: [MoveKind; 5] = [
        MoveKind::Rotate,
        MoveKind::Relocate,
        MoveKind::Swap,
        MoveKind::ChangeRep,
        MoveKind::ConvertSym,
    ];

    /// Index into probability and statistics tables.
    pub fn index(self) -> usize {
        match self {
            MoveKind::Rotate => 0,
            MoveKind::Relocate => 1,
            MoveKind::Swap => 2,
            MoveKind::ChangeRep => 3,
            MoveKind::ConvertSym => 4,
        }
    }

    /// Short operator name for statistics output.
    pub fn name(self) -> &'static str {
        match self {
            MoveKind::Rotate => "rotate",
            MoveKind::Relocate => "move",
            MoveKind::Swap => "swap",
            MoveKind::ChangeRep => "changeRep",
            MoveKind::ConvertSym => "convertSym",
        }
    }
}

/// One perturbation, with enough captured state to undo it.
#[derive(Debug, Clone, Default)]
pub struct Move {
    /// The operator, `None` while the slot sits on the free list.
    pub kind: Option<MoveKind>,
    /// First operand (module, node, or group name).
    pub param1: String,
    /// Second operand (parent, partner, or member name).
    pub param2: String,
    /// Whether a relocation targets the left child slot.
    pub as_left: bool,
    /// Undo state: the relocated node's original parent name.
    pub original_parent: String,
    /// Undo state: whether the relocated node was a left child.
    pub was_left_child: bool,
    /// Undo state: the representative before a change-representative.
    pub original_representative: String,
    /// Undo state: the axis before a convert-symmetry-type.
    pub original_axis: Option<Axis>,
}

impl Move {
    /// Clears all fields, keeping string capacity for reuse.
    fn reset(&mut self) {
        self.kind = None;
        self.param1.clear();
        self.param2.clear();
        self.as_left = false;
        self.original_parent.clear();
        self.was_left_child = false;
        self.original_representative.clear();
        self.original_axis = None;
    }
}

/// Handle of a move inside the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveId(u32);

/// Block-growing arena of reusable move descriptors.
#[derive(Debug)]
pub struct MovePool {
    slots: Vec<Move>,
    free: Vec<MoveId>,
    blocks: usize,
}

impl MovePool {
    /// Creates a pool with one pre-allocated block.
    pub fn new() -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            free: Vec::new(),
            blocks: 0,
        };
        pool.grow();
        pool
    }

    fn grow(&mut self) {
        let start = self.slots.len();
        self.slots
            .extend(std::iter::repeat_with(Move::default).take(BLOCK_SIZE));
        for i in (start..start + BLOCK_SIZE).rev() {
            self.free.push(MoveId(i as u32));
        }
        self.blocks += 1;
    }

    /// Takes a descriptor from the free list and initializes it.
    pub fn create(&mut self, kind: MoveKind, param1: &str, param2: &str, as_left: bool) -> MoveId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.grow();
                self.free.pop().expect("freshly grown pool has free slots")
            }
        };
        let slot = &mut self.slots[id.0 as usize];
        slot.reset();
        slot.kind = Some(kind);
        slot.param1.push_str(param1);
        slot.param2.push_str(param2);
        slot.as_left = as_left;
        id
    }

    /// Returns a descriptor to the free list.
    pub fn release(&mut self, id: MoveId) {
        self.slots[id.0 as usize].reset();
        self.free.push(id);
    }

    /// Borrows a descriptor.
    pub fn get(&self, id: MoveId) -> &Move {
        &self.slots[id.0 as usize]
    }

    /// Mutably borrows a descriptor (to record undo state at apply time).
    pub fn get_mut(&mut self, id: MoveId) -> &mut Move {
        &mut self.slots[id.0 as usize]
    }

    /// Number of blocks allocated so far.
    pub fn allocated_blocks(&self) -> usize {
        self.blocks
    }

    /// Number of descriptors currently on the free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

impl Default for MovePool {
    fn default() -> Self {
        Self::new()
    }
}
