//! File I/O for the Islet placer: the text problem format in, the placement
//! result out.

#![warn(missing_docs)]

pub mod parser;
pub mod writer;

pub use parser::{parse_problem, parse_problem_str, ParseError};
pub use writer::{write_placement, write_placement_to};
