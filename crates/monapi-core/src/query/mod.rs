//! Query IR, condition helpers, SELECT builder and the SQL renderer.
//!
//! # Modules
//!
//! - `predicate` - Predicate AST for WHERE and HAVING
//! - `parts` - Keyed SELECT accumulator
//! - `condition` - Id sets, string sets, LIKE escaping and tag conditions
//! - `builder` - SELECT construction from options and an entity descriptor
//! - `write` - INSERT, UPDATE and DELETE statements
//! - `render` - The single renderer from IR to SQL text and parameters

mod builder;
mod condition;
mod parts;
mod predicate;
mod render;
pub mod write;

pub use builder::{QueryBuilder, SelectPlan, ROWSCOUNT};
pub use condition::{
    condition_id, condition_int, condition_string, contains_pattern, escape_like, like,
    search_pattern, tag_condition, TagSource,
};
pub use parts::{Keyed, LeftJoin, QueryParts};
pub use predicate::{CompareOp, Join, Operand, Predicate, SubQuery};
pub use render::{render_predicate, Sql, SqlWriter, LIKE_ESCAPE};
