//! Deciding which fields of a file need rewriting.

use std::collections::BTreeSet;

use crate::model::{CatalogField, FieldValues};

/// Fields whose file value must be replaced by the catalog value.
pub type TagDiff = BTreeSet<CatalogField>;

/// Fields present in `catalog` that `file` disagrees with.
///
/// The catalog is authoritative: a field missing from the catalog never
/// produces a diff, and a field missing from the file only counts when the
/// catalog value is non-empty.
pub fn diff(catalog: &FieldValues, file: &FieldValues) -> TagDiff {
    catalog
        .iter()
        .filter(|(field, wanted)| match file.get(*field) {
            Some(current) => current != *wanted,
            None => !wanted.is_empty(),
        })
        .map(|(field, _)| *field)
        .collect()
}
