//! Overlap detection and repair.
//!
//! Packing is overlap-free by construction for the common cases, but axis
//! recentering and unusual island shapes can still collide blocks. The
//! validator scans every module pair after a completed pack and shifts one
//! offender along the axis with the smaller overlap, logging each repair.

use islet_diagnostics::{Diagnostic, DiagnosticSink};
use islet_model::{Floorplan, ModuleId};

/// Repairs threshold above which the caller should expect the area to have
/// shifted substantially.
pub const MANY_FIXES: usize = 5;

/// Scans all module pairs and shifts one module of each overlapping pair in
/// the direction of the smaller overlap (right of, or above, the other).
///
/// Returns the number of repairs performed; each one is reported as a
/// warning. When the count exceeds [`MANY_FIXES`] an extra note asks for an
/// area recomputation.
pub fn fix_overlaps(plan: &mut Floorplan, sink: &DiagnosticSink) -> usize {
    let ids: Vec<ModuleId> = plan.iter().map(|(id, _)| id).collect();
    let mut fixes = 0;

    for (i, &first) in ids.iter().enumerate() {
        for &second in &ids[i + 1..] {
            if !plan[first].overlaps(&plan[second]) {
                continue;
            }
            fixes += 1;

            let (a, b) = (&plan[first], &plan[second]);
            let overlap_x = a.right().min(b.right()) - a.x.max(b.x);
            let overlap_y = a.top().min(b.top()) - a.y.max(b.y);

            if overlap_x <= overlap_y {
                // Resolve horizontally: move the right-hand module further right.
                let (stay, shift) = if a.x <= b.x {
                    (first, second)
                } else {
                    (second, first)
                };
                let new_x = plan[stay].right();
                let y = plan[shift].y;
                plan[shift].set_position(new_x, y);
                sink.emit(Diagnostic::warning(format!(
                    "fixed horizontal overlap: moved '{}' to the right of '{}'",
                    plan[shift].name, plan[stay].name
                )));
            } else {
                // Resolve vertically: move the upper module further up.
                let (stay, shift) = if a.y <= b.y {
                    (first, second)
                } else {
                    (second, first)
                };
                let new_y = plan[stay].top();
                let x = plan[shift].x;
                plan[shift].set_position(x, new_y);
                sink.emit(Diagnostic::warning(format!(
                    "fixed vertical overlap: moved '{}' above '{}'",
                    plan[shift].name, plan[stay].name
                )));
            }
        }
    }

    if fixes > MANY_FIXES {
        sink.emit(Diagnostic::note(format!(
            "fixed {fixes} overlaps in placement, recomputing area"
        )));
    }
    fixes
}

/// Reports whether the placement is overlap-free, without mutating anything.
pub fn is_overlap_free(plan: &Floorplan) -> bool {
    let ids: Vec<ModuleId> = plan.iter().map(|(id, _)| id).collect();
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            if plan[a].overlaps(&plan[b]) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use islet_model::Module;

    fn plan_with(specs: &[(&str, i32, i32, i32, i32)]) -> Floorplan {
        let mut plan = Floorplan::new();
        for &(name, w, h, x, y) in specs {
            let id = plan.add_module(Module::new(name, w, h));
            plan[id].set_position(x, y);
        }
        plan
    }

    #[test]
    fn clean_placement_needs_no_fixes() {
        let mut plan = plan_with(&[("a", 2, 2, 0, 0), ("b", 2, 2, 2, 0)]);
        let sink = DiagnosticSink::new();
        assert!(is_overlap_free(&plan));
        assert_eq!(fix_overlaps(&mut plan, &sink), 0);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn horizontal_overlap_resolved_horizontally() {
        // Tall thin overlap: cheaper to separate in x.
        let mut plan = plan_with(&[("a", 4, 4, 0, 0), ("b", 4, 4, 3, 0)]);
        let sink = DiagnosticSink::new();
        let fixes = fix_overlaps(&mut plan, &sink);
        assert_eq!(fixes, 1);
        assert!(is_overlap_free(&plan));
        let b = plan.id_of("b").unwrap();
        assert_eq!(plan[b].x, 4);
    }

    #[test]
    fn vertical_overlap_resolved_vertically() {
        let mut plan = plan_with(&[("a", 4, 4, 0, 0), ("b", 4, 4, 0, 3)]);
        let sink = DiagnosticSink::new();
        let fixes = fix_overlaps(&mut plan, &sink);
        assert_eq!(fixes, 1);
        assert!(is_overlap_free(&plan));
        let b = plan.id_of("b").unwrap();
        assert_eq!(plan[b].y, 4);
    }

    #[test]
    fn fixes_are_logged_as_warnings() {
        let mut plan = plan_with(&[("a", 4, 4, 0, 0), ("b", 4, 4, 1, 0)]);
        let sink = DiagnosticSink::new();
        fix_overlaps(&mut plan, &sink);
        let diags = sink.take_all();
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("overlap"));
    }

    #[test]
    fn identical_positions_get_separated() {
        let mut plan = plan_with(&[("a", 3, 3, 0, 0), ("b", 3, 3, 0, 0)]);
        let sink = DiagnosticSink::new();
        let fixes = fix_overlaps(&mut plan, &sink);
        assert!(fixes >= 1);
        assert!(is_overlap_free(&plan));
    }
}
