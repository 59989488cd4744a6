//! Table model: typed cells, column types, storage and text parsing.

mod columns;
mod data;
pub mod parse;
mod types;
mod value;

pub use columns::ColumnList;
pub use data::{DataTable, Index};
pub use types::{ColumnKind, ColumnType};
pub use value::{MatchKey, Value};
