//! Name-uniqueness queries over an observed record set.
//!
//! # Invariants
//! - Comparison is exact and case-sensitive.
//! - An unobserved set (`None`) never reports a collision.

use crate::model::record::Record;

/// Whether `proposed` is already used by a record in `observed`.
pub fn name_collides_on_insert<E: Record>(observed: Option<&[E]>, proposed: &str) -> bool {
    observed.is_some_and(|records| records.iter().any(|record| record.name() == proposed))
}

/// Whether renaming `current` to `proposed` would collide with another record.
///
/// Keeping or restoring the current name never collides, even when other
/// records share it.
pub fn name_collides_on_update<E: Record>(
    observed: Option<&[E]>,
    current: &str,
    proposed: &str,
) -> bool {
    proposed != current && name_collides_on_insert(observed, proposed)
}

#[cfg(test)]
mod tests {
    use super::{name_collides_on_insert, name_collides_on_update};
    use crate::model::record::Stuck;

    fn observed() -> Vec<Stuck> {
        vec![Stuck::new("Alpha", ""), Stuck::new("Beta", ""), Stuck::new("Beta", "")]
    }

    #[test]
    fn insert_collision_is_case_sensitive() {
        let records = observed();
        assert!(name_collides_on_insert(Some(records.as_slice()), "Alpha"));
        assert!(!name_collides_on_insert(Some(records.as_slice()), "alpha"));
        assert!(!name_collides_on_insert(Some(records.as_slice()), "Gamma"));
    }

    #[test]
    fn unobserved_set_never_collides() {
        assert!(!name_collides_on_insert::<Stuck>(None, "Alpha"));
        assert!(!name_collides_on_update::<Stuck>(None, "Alpha", "Beta"));
    }

    #[test]
    fn update_keeping_shared_name_is_allowed() {
        let records = observed();
        assert!(!name_collides_on_update(Some(records.as_slice()), "Beta", "Beta"));
        assert!(name_collides_on_update(Some(records.as_slice()), "Alpha", "Beta"));
        assert!(!name_collides_on_update(Some(records.as_slice()), "Alpha", "Delta"));
    }
}
