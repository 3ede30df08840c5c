//! Relation maps and related-object resolvers.

mod map;
mod resolver;

pub use map::RelationMap;
pub use resolver::{
    association_query, base_ids, fetch_related, pairs_from_rows, ChildRowsResolver,
    RelatedResolver, RelatedSource, RelationResolver, BASE_ID, RELATED_ID,
};
