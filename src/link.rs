//! Cross-reference linking between the units of one document.
//!
//! Pointers are a pure function of the sorted id list and are recomputed on
//! every pass, so re-linking an already linked document is a no-op.
use anyhow::Result;
use std::path::PathBuf;

use crate::model::AtomicUnit;
use crate::paths::DocPaths;
use crate::store::{self, UnitFile};

/// Adjacent ids for one position in the sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Outcome of a link pass over one document folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub units: usize,
    pub rewritten: usize,
    /// Units whose article number could not be read and sorted first.
    pub unnumbered: Vec<String>,
    /// Unit files whose metadata could not be parsed; left out of the chain.
    pub unreadable: Vec<PathBuf>,
}

/// Compute prev/next for each id of an already sorted list.
pub fn link_pointers(ids: &[&str]) -> Vec<Links> {
    (0..ids.len())
        .map(|idx| Links {
            prev: idx.checked_sub(1).map(|prev| ids[prev].to_string()),
            next: ids.get(idx + 1).map(|next| next.to_string()),
        })
        .collect()
}

/// Stable sort by numeric article number; unreadable numbers sort as 0.
///
/// Returns the ids of units that fell back to 0.
pub fn sort_units<T>(items: &mut [T], unit: impl Fn(&T) -> &AtomicUnit) -> Vec<String> {
    let mut unnumbered = Vec::new();
    for item in items.iter() {
        let unit = unit(item);
        if unit.meta.sort_key().is_none() {
            tracing::warn!(unit = %unit.id(), "article number unreadable; sorting first");
            unnumbered.push(unit.id().to_string());
        }
    }
    items.sort_by_key(|item| unit(item).meta.sort_key().unwrap_or(0));
    unnumbered
}

/// Assign prev/next on units that are already in sequence order.
///
/// Returns the indices whose pointers changed.
pub fn apply_links<T>(items: &mut [T], unit: impl Fn(&mut T) -> &mut AtomicUnit) -> Vec<usize> {
    let ids: Vec<String> = items
        .iter_mut()
        .map(|item| unit(item).id().to_string())
        .collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut changed = Vec::new();
    for (idx, (item, links)) in items.iter_mut().zip(link_pointers(&id_refs)).enumerate() {
        let meta = &mut unit(item).meta;
        if meta.prev != links.prev || meta.next != links.next {
            meta.prev = links.prev;
            meta.next = links.next;
            changed.push(idx);
        }
    }
    changed
}

/// Sort and link in-memory units, as done right after segmentation.
pub fn link_units(units: &mut [AtomicUnit]) -> Vec<String> {
    let unnumbered = sort_units(units, |unit| unit);
    apply_links(units, |unit| unit);
    unnumbered
}

/// Sort and link units loaded from a document folder, rewriting changed files.
pub fn relink_files(files: &mut [UnitFile]) -> Result<LinkSummary> {
    let unnumbered = sort_units(files, |file| &file.unit);
    let changed = apply_links(files, |file| &mut file.unit);
    for idx in &changed {
        let file = &files[*idx];
        store::save_unit(&file.path, &file.unit)?;
    }
    Ok(LinkSummary {
        units: files.len(),
        rewritten: changed.len(),
        unnumbered,
        unreadable: Vec::new(),
    })
}

/// Standalone repair pass over an already segmented document folder.
pub fn relink_document(paths: &DocPaths) -> Result<LinkSummary> {
    let mut scan = store::load_units(paths)?;
    let mut summary = relink_files(&mut scan.files)?;
    summary.unreadable = scan.unreadable;
    tracing::info!(
        doc = %paths.slug(),
        units = summary.units,
        rewritten = summary.rewritten,
        unreadable = summary.unreadable.len(),
        "link pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitMeta;

    fn unit(number: &str) -> AtomicUnit {
        AtomicUnit {
            meta: UnitMeta::new(
                crate::slug::unit_id("d", number),
                "d".to_string(),
                number.to_string(),
            ),
            body: String::new(),
        }
    }

    fn pointers(units: &[AtomicUnit]) -> Vec<(Option<String>, Option<String>)> {
        units
            .iter()
            .map(|unit| (unit.meta.prev.clone(), unit.meta.next.clone()))
            .collect()
    }

    #[test]
    fn sorts_and_links_out_of_order_articles() {
        let mut units = vec![unit("3"), unit("1"), unit("2")];
        link_units(&mut units);
        let ids: Vec<&str> = units.iter().map(|unit| unit.id()).collect();
        assert_eq!(ids, vec!["d--مادة-001", "d--مادة-002", "d--مادة-003"]);
        assert_eq!(
            pointers(&units),
            vec![
                (None, Some("d--مادة-002".to_string())),
                (Some("d--مادة-001".to_string()), Some("d--مادة-003".to_string())),
                (Some("d--مادة-002".to_string()), None),
            ]
        );
    }

    #[test]
    fn relinking_is_idempotent() {
        let mut units = vec![unit("2"), unit("10"), unit("1")];
        link_units(&mut units);
        let first = pointers(&units);
        let changed = apply_links(&mut units, |unit| unit);
        assert!(changed.is_empty());
        link_units(&mut units);
        assert_eq!(pointers(&units), first);
    }

    #[test]
    fn stale_pointers_are_recomputed_not_accumulated() {
        let mut units = vec![unit("1"), unit("2")];
        units[0].meta.prev = Some("ghost".to_string());
        units[1].meta.next = Some("ghost".to_string());
        let changed = apply_links(&mut units, |unit| unit);
        assert_eq!(changed, vec![0, 1]);
        assert_eq!(units[0].meta.prev, None);
        assert_eq!(units[1].meta.next, None);
    }

    #[test]
    fn single_unit_has_no_neighbours() {
        let mut units = vec![unit("7")];
        link_units(&mut units);
        assert_eq!(pointers(&units), vec![(None, None)]);
        assert!(link_pointers(&[]).is_empty());
    }

    #[test]
    fn duplicates_keep_encounter_order_and_unnumbered_sort_first() {
        let mut units = vec![unit("2"), unit("1"), unit("2")];
        units[2].meta.id = "d--مادة-002_2".to_string();
        let mut odd = unit("x");
        odd.meta.id = "d--مادة-x".to_string();
        units.push(odd);
        let unnumbered = link_units(&mut units);
        let ids: Vec<&str> = units.iter().map(|unit| unit.id()).collect();
        assert_eq!(
            ids,
            vec!["d--مادة-x", "d--مادة-001", "d--مادة-002", "d--مادة-002_2"]
        );
        assert_eq!(unnumbered, vec!["d--مادة-x".to_string()]);
    }

    #[test]
    fn relink_document_rewrites_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DocPaths::new(dir.path().to_path_buf(), "d".to_string());
        for number in ["1", "2", "3"] {
            let unit = unit(number);
            store::save_unit(&paths.unit_path(unit.id()), &unit).unwrap();
        }
        let first = relink_document(&paths).unwrap();
        assert_eq!(first.units, 3);
        assert_eq!(first.rewritten, 3);

        let second = relink_document(&paths).unwrap();
        assert_eq!(second.rewritten, 0);

        let middle = store::load_unit(&paths.unit_path("d--مادة-002")).unwrap();
        assert_eq!(middle.meta.prev.as_deref(), Some("d--مادة-001"));
        assert_eq!(middle.meta.next.as_deref(), Some("d--مادة-003"));
    }

    #[test]
    fn unparseable_units_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DocPaths::new(dir.path().to_path_buf(), "d".to_string());
        for number in ["1", "2", "3"] {
            let unit = unit(number);
            store::save_unit(&paths.unit_path(unit.id()), &unit).unwrap();
        }
        let middle = paths.unit_path("d--مادة-002");
        let text = std::fs::read_to_string(&middle).unwrap();
        std::fs::write(&middle, text.replacen("---\n", "---\naspect: mixed\n", 1)).unwrap();

        let summary = relink_document(&paths).unwrap();
        assert_eq!(summary.units, 2);
        assert_eq!(summary.unreadable, vec![middle]);

        let first = store::load_unit(&paths.unit_path("d--مادة-001")).unwrap();
        assert_eq!(first.meta.next.as_deref(), Some("d--مادة-003"));
    }
}
