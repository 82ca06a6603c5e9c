//! Compatibility table
//!
//! Maps every scriptlet and redirect resource, keyed by canonical name, to the
//! names each dialect accepts for it. The table is plain data (`format`) turned
//! into per-dialect lookup maps once (`table`).

mod format;
mod table;

pub use format::*;
pub use table::*;
