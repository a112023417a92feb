//! Writer for the placement result format.
//!
//! ```text
//! Area <A>
//! <name> <x> <y> <0|1>
//! ```
//!
//! One line per module in catalog order; the trailing flag is 1 when the
//! module is rotated 90°.

use islet_model::Floorplan;
use std::io::Write;
use std::path::Path;

/// Writes the placement to a file.
pub fn write_placement(path: &Path, plan: &Floorplan, area: i64) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_placement_to(&mut writer, plan, area)
}

/// Writes the placement to any writer (useful for tests).
pub fn write_placement_to(out: &mut impl Write, plan: &Floorplan, area: i64) -> std::io::Result<()> {
    writeln!(out, "Area {area}")?;
    for module in plan.modules() {
        writeln!(
            out,
            "{} {} {} {}",
            module.name,
            module.x,
            module.y,
            u8::from(module.rotated())
        )?;
    }
    out.flush()
}
