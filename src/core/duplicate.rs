// Duplicate resolution over difference hashes.
//
// Records arrive in loader order (file-name order). Within a group the first
// record is the survivor; that order is the only tie-break, so re-running
// over the same directory always keeps the same file.

use crate::core::record::{ImageRecord, ItemFailure};
use crate::core::review::{DuplicateGroup, DuplicateReviewer, ReviewFlow};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashGroup {
    pub hash: u64,
    /// Indices into the record slice the groups were built from.
    pub members: Vec<usize>,
}

impl HashGroup {
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }
}

/// Every hashed record, partitioned by hash value. Groups are ordered by
/// their first member.
#[derive(Debug, Clone, Default)]
pub struct HashGroups {
    groups: Vec<HashGroup>,
}

impl HashGroups {
    pub fn build(records: &[ImageRecord]) -> Self {
        let mut positions: HashMap<u64, usize> = HashMap::new();
        let mut groups: Vec<HashGroup> = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let Some(hash) = record.hash else {
                continue;
            };
            match positions.get(&hash) {
                Some(&position) => groups[position].members.push(index),
                None => {
                    positions.insert(hash, groups.len());
                    groups.push(HashGroup {
                        hash,
                        members: vec![index],
                    });
                }
            }
        }

        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HashGroup> {
        self.groups.iter()
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &HashGroup> {
        self.groups.iter().filter(|group| group.is_duplicate())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    Delete,
    DryRun,
}

#[derive(Debug, Default)]
pub struct Resolution {
    /// Records that continue downstream, in loader order.
    pub survivors: Vec<ImageRecord>,
    /// Files deleted, or in a dry run the files that would be.
    pub removed: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub duplicate_groups: usize,
}

/// Paths of every group with more than one member, survivor first.
pub fn find_duplicate_groups(records: &[ImageRecord]) -> Vec<(u64, Vec<PathBuf>)> {
    HashGroups::build(records)
        .duplicates()
        .map(|group| {
            let paths = group
                .members
                .iter()
                .map(|&i| records[i].path.clone())
                .collect();
            (group.hash, paths)
        })
        .collect()
}

/// Keep the first member of each hash group and dispose of the rest.
///
/// In `Delete` mode duplicates are removed from disk; a failed removal is
/// logged and reported but the remaining groups are still processed. In
/// `DryRun` mode nothing is touched and each group goes to `reviewer`.
/// Records without a hash pass through untouched.
pub fn resolve_duplicates(
    records: Vec<ImageRecord>,
    mode: ResolveMode,
    reviewer: &mut dyn DuplicateReviewer,
) -> Resolution {
    let groups = HashGroups::build(&records);
    let mut dropped = vec![false; records.len()];
    let mut resolution = Resolution::default();
    let mut reviewing = true;

    for group in groups.duplicates() {
        resolution.duplicate_groups += 1;

        if mode == ResolveMode::DryRun && reviewing {
            let members = group.members.iter().map(|&i| records[i].path()).collect();
            if let Some(view) = DuplicateGroup::new(group.hash, members) {
                match reviewer.review(&view) {
                    Ok(ReviewFlow::Continue) => {}
                    Ok(ReviewFlow::Stop) => {
                        log::info!("Review stopped; remaining groups are counted only");
                        reviewing = false;
                    }
                    Err(e) => log::warn!("Review of {:016x} failed: {}", group.hash, e),
                }
            }
        }

        for &index in &group.members[1..] {
            dropped[index] = true;
            let path = &records[index].path;
            match mode {
                ResolveMode::DryRun => resolution.removed.push(path.clone()),
                ResolveMode::Delete => match fs::remove_file(path) {
                    Ok(()) => {
                        log::debug!("Deleted duplicate {}", path.display());
                        resolution.removed.push(path.clone());
                    }
                    Err(e) => {
                        log::warn!("Failed to delete {}: {}", path.display(), e);
                        resolution.failures.push(ItemFailure::new(path, e));
                    }
                },
            }
        }
    }

    resolution.survivors = records
        .into_iter()
        .zip(dropped)
        .filter_map(|(record, dropped)| (!dropped).then_some(record))
        .collect();

    log::info!(
        "Deduplication complete: {} image(s) {}",
        resolution.removed.len(),
        if mode == ResolveMode::DryRun {
            "would be deleted"
        } else {
            "deleted"
        }
    );
    resolution
}
