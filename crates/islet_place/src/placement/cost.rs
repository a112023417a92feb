//! Placement cost function.
//!
//! The annealer minimizes a weighted sum of bounding-box area and an
//! estimated wirelength. No netlist exists in the input format, so the
//! wirelength term is a star-net proxy: the half-perimeter of the bounding
//! box of all module centers. It is linear, cheap, and pulls blocks toward a
//! compact cluster when the area weight is dialed down.

use islet_model::Floorplan;

/// Weights for the placement cost components.
#[derive(Debug, Clone, Copy)]
pub struct PlacementCost {
    /// Weight for the bounding-box area term.
    pub area_weight: f64,
    /// Weight for the wirelength term.
    pub wirelength_weight: f64,
}

impl Default for PlacementCost {
    fn default() -> Self {
        Self {
            area_weight: 1.0,
            wirelength_weight: 0.0,
        }
    }
}

impl PlacementCost {
    /// Creates weights from the CLI's `area_ratio`: the wirelength weight is
    /// the complement.
    pub fn from_area_ratio(area_ratio: f64) -> Self {
        Self {
            area_weight: area_ratio,
            wirelength_weight: 1.0 - area_ratio,
        }
    }

    /// The weighted cost of a packed placement.
    ///
    /// A non-positive area means the packing degenerated; the move is driven
    /// to rejection with `i64::MAX`.
    pub fn cost(&self, area: i64, wirelength: i64) -> i64 {
        if area <= 0 {
            return i64::MAX;
        }
        (self.area_weight * area as f64 + self.wirelength_weight * wirelength as f64).round()
            as i64
    }
}

/// Star-net wirelength proxy: half-perimeter of the bounding box of module
/// centers, in whole units (center coordinates are doubled internally so the
/// result stays integral).
pub fn star_wirelength(plan: &Floorplan) -> i64 {
    let mut min_cx = i64::MAX;
    let mut max_cx = i64::MIN;
    let mut min_cy = i64::MAX;
    let mut max_cy = i64::MIN;
    for m in plan.modules() {
        let cx = 2 * m.x as i64 + m.width() as i64;
        let cy = 2 * m.y as i64 + m.height() as i64;
        min_cx = min_cx.min(cx);
        max_cx = max_cx.max(cx);
        min_cy = min_cy.min(cy);
        max_cy = max_cy.max(cy);
    }
    if min_cx > max_cx {
        return 0;
    }
    ((max_cx - min_cx) + (max_cy - min_cy)) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use islet_model::Module;

    #[test]
    fn default_is_pure_area() {
        let cost = PlacementCost::default();
        assert_eq!(cost.cost(100, 999), 100);
    }

    #[test]
    fn from_area_ratio_is_complementary() {
        let cost = PlacementCost::from_area_ratio(0.75);
        assert!((cost.area_weight - 0.75).abs() < 1e-9);
        assert!((cost.wirelength_weight - 0.25).abs() < 1e-9);
    }

    #[test]
    fn invalid_area_is_rejecting() {
        let cost = PlacementCost::default();
        assert_eq!(cost.cost(0, 5), i64::MAX);
        assert_eq!(cost.cost(-3, 5), i64::MAX);
    }

    #[test]
    fn blended_cost() {
        let cost = PlacementCost {
            area_weight: 0.5,
            wirelength_weight: 0.5,
        };
        assert_eq!(cost.cost(100, 20), 60);
    }

    #[test]
    fn wirelength_of_empty_plan_is_zero() {
        let plan = Floorplan::new();
        assert_eq!(star_wirelength(&plan), 0);
    }

    #[test]
    fn wirelength_of_single_module_is_zero() {
        let mut plan = Floorplan::new();
        plan.add_module(Module::new("a", 4, 2));
        assert_eq!(star_wirelength(&plan), 0);
    }

    #[test]
    fn wirelength_spans_center_bbox() {
        let mut plan = Floorplan::new();
        let a = plan.add_module(Module::new("a", 2, 2));
        let b = plan.add_module(Module::new("b", 2, 2));
        plan[a].set_position(0, 0); // center (1,1)
        plan[b].set_position(4, 6); // center (5,7)
        assert_eq!(star_wirelength(&plan), (5 - 1) + (7 - 1));
    }
}
