use serde::{Deserialize, Serialize};

/// Directed, typed edge between two entities (parent → child).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub relation_type_alias: String,
}

impl Relation {
    /// The id on the other side of the edge from `entity_id`, if the edge touches it.
    pub fn opposite(&self, entity_id: i32) -> Option<i32> {
        if self.parent_id == entity_id {
            Some(self.child_id)
        } else if self.child_id == entity_id {
            Some(self.parent_id)
        } else {
            None
        }
    }
}
