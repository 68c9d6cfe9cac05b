//! Movies catalogued more than once under different content.

use std::collections::BTreeMap;

use kolekto_cas::ContentId;
use kolekto_index::{Record, Scalar, Value};

/// Identifiers sharing one `(title, year)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub title: String,
    pub year: Option<i64>,
    pub ids: Vec<ContentId>,
}

/// Group records by `(title, year)` and keep the groups with two or more
/// members, sorted by title then year. Records without a title are skipped.
pub fn find_duplicates<I>(records: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = (ContentId, Record)>,
{
    let mut groups: BTreeMap<(String, Option<i64>), Vec<ContentId>> = BTreeMap::new();
    for (id, record) in records {
        let Some(title) = record.text("title") else {
            continue;
        };
        let year = record.get("year").and_then(Value::as_scalar).and_then(Scalar::as_i64);
        groups.entry((title.to_string(), year)).or_default().push(id);
    }

    groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((title, year), mut ids)| {
            ids.sort();
            DuplicateGroup { title, year, ids }
        })
        .collect()
}
