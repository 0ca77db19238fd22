//! Display structures built from merged events.

pub mod grid;
pub mod list;

pub use grid::{build_grids, GridCell, GridEvent, GridOptions, MonthGrid};
pub use list::{group_by_month, MonthGroup};
