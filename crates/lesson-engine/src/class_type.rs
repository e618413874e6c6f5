//! Class-type hierarchy checks.

use crate::store::{ClassTypeStore, StoreResult};

/// Whether `class_type_id` or one of its ancestors is in `excluded`.
///
/// Visits at most `max_depth` nodes, so a cycle in stored parent links cannot
/// loop forever. An unknown class type is not excluded.
pub fn is_excluded_class_type<S>(
    store: &S,
    class_type_id: &str,
    excluded: &[String],
    max_depth: usize,
) -> StoreResult<bool>
where
    S: ClassTypeStore + ?Sized,
{
    if excluded.is_empty() {
        return Ok(false);
    }

    let mut current = Some(class_type_id.to_string());
    for _ in 0..max_depth {
        let Some(id) = current else {
            return Ok(false);
        };
        if excluded.iter().any(|e| *e == id) {
            return Ok(true);
        }
        current = store.class_type(&id)?.and_then(|c| c.parent_id);
    }
    Ok(false)
}
