//! Filesystem work for the staging tree.
//!
//! This module owns the destructive directory operations the pipeline relies
//! on: removing the staging tree, copying the filtered source tree into it,
//! pruning directories that filtering left empty, and merging one tree into
//! another without overwriting existing files.

use crate::error::StageFailure;
use crate::matcher::PathMatcher;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fs;
use std::io::ErrorKind;

/// Counts reported by [`stage_source`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Files copied into the staging tree.
    pub files_copied: usize,
    /// Files and directories skipped by an exclusion rule.
    pub entries_excluded: usize,
    /// Directories removed because nothing was staged into them.
    pub empty_dirs_removed: usize,
}

/// Remove `dir` and everything beneath it.
///
/// A missing directory is not an error, so cleaning is idempotent.
///
/// # Errors
///
/// Returns [`StageFailure::Io`] if removal fails for any other reason.
pub fn remove_tree(dir: &Utf8Path) -> Result<(), StageFailure> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("removed {dir}");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StageFailure::io(dir, e)),
    }
}

/// Copy every non-excluded path from `source` into `staging`, then remove
/// directories left empty.
///
/// Candidate paths are relative to `source`. An excluded directory is not
/// descended into. `staging` and every directory in `work_dirs` are skipped
/// when they live inside `source`, so the pipeline's own output is never
/// copied into the staging tree. Paths are compared after resolving `..` and
/// symlinks.
///
/// # Errors
///
/// Returns [`StageFailure::Io`] on the first filesystem failure. The partial
/// staging tree is left as it is.
pub fn stage_source(
    source: &Utf8Path,
    staging: &Utf8Path,
    matcher: &PathMatcher,
    work_dirs: &[&Utf8Path],
) -> Result<StagingReport, StageFailure> {
    let mut report = StagingReport::default();
    fs::create_dir_all(staging).map_err(|e| StageFailure::io(staging, e))?;

    let source = canonical(source)?;
    let mut skipped = vec![canonical(staging)?];
    for dir in work_dirs.iter().filter(|dir| dir.exists()) {
        skipped.push(canonical(dir)?);
    }

    let walk = Walk {
        source: &source,
        staging,
        skipped: &skipped,
        matcher,
    };
    walk.copy_dir(Utf8Path::new(""), &mut report)?;

    report.empty_dirs_removed = remove_empty_dirs(staging)?;
    Ok(report)
}

fn canonical(path: &Utf8Path) -> Result<Utf8PathBuf, StageFailure> {
    path.canonicalize_utf8().map_err(|e| StageFailure::io(path, e))
}

struct Walk<'a> {
    source: &'a Utf8Path,
    staging: &'a Utf8Path,
    skipped: &'a [Utf8PathBuf],
    matcher: &'a PathMatcher,
}

impl Walk<'_> {
    fn copy_dir(
        &self,
        relative: &Utf8Path,
        report: &mut StagingReport,
    ) -> Result<(), StageFailure> {
        let from = self.source.join(relative);
        for entry in read_dir_sorted(&from)? {
            let name = entry.file_name().to_owned();
            let child_relative = relative.join(&name);
            let child_source = self.source.join(&child_relative);

            if self.skipped.contains(&child_source) {
                debug!("not staging working directory {child_source}");
                continue;
            }
            if let Some(rule) = self.matcher.first_match(child_relative.as_str()) {
                trace!("excluding {child_relative} (rule {rule})");
                report.entries_excluded += 1;
                continue;
            }

            let target = self.staging.join(&child_relative);
            let file_type = entry
                .file_type()
                .map_err(|e| StageFailure::io(&child_source, e))?;
            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| StageFailure::io(&target, e))?;
                self.copy_dir(&child_relative, report)?;
            } else {
                trace!("copying {child_relative}");
                fs::copy(&child_source, &target).map_err(|e| StageFailure::io(&child_source, e))?;
                report.files_copied += 1;
            }
        }
        Ok(())
    }
}

/// Remove every empty directory beneath `root`, deepest first.
///
/// `root` itself is kept. Returns the number of directories removed.
///
/// # Errors
///
/// Returns [`StageFailure::Io`] if a directory cannot be read or removed.
pub fn remove_empty_dirs(root: &Utf8Path) -> Result<usize, StageFailure> {
    fn prune(dir: &Utf8Path) -> Result<(usize, bool), StageFailure> {
        let mut removed = 0;
        let mut is_empty = true;
        for entry in read_dir_sorted(dir)? {
            let path = entry.path().to_owned();
            let is_dir = entry
                .file_type()
                .map_err(|e| StageFailure::io(&path, e))?
                .is_dir();
            if !is_dir {
                is_empty = false;
                continue;
            }
            let (child_removed, child_empty) = prune(&path)?;
            removed += child_removed;
            if child_empty {
                fs::remove_dir(&path).map_err(|e| StageFailure::io(&path, e))?;
                removed += 1;
            } else {
                is_empty = false;
            }
        }
        Ok((removed, is_empty))
    }

    prune(root).map(|(removed, _)| removed)
}

/// Copy `from` into `to`, leaving any file already present in `to` untouched.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns [`StageFailure::Io`] on the first filesystem failure.
pub fn merge_tree(from: &Utf8Path, to: &Utf8Path) -> Result<usize, StageFailure> {
    fs::create_dir_all(to).map_err(|e| StageFailure::io(to, e))?;
    let mut copied = 0;
    for entry in read_dir_sorted(from)? {
        let source = entry.path().to_owned();
        let target = to.join(entry.file_name());
        let is_dir = entry
            .file_type()
            .map_err(|e| StageFailure::io(&source, e))?
            .is_dir();
        if is_dir {
            copied += merge_tree(&source, &target)?;
        } else if !target.exists() {
            fs::copy(&source, &target).map_err(|e| StageFailure::io(&source, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Collect files beneath `dir`, recursively, in a stable order.
///
/// # Errors
///
/// Returns [`StageFailure::Io`] if a directory cannot be read.
pub fn collect_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StageFailure> {
    let mut files = Vec::new();
    for entry in read_dir_sorted(dir)? {
        let path = entry.path().to_owned();
        let is_dir = entry
            .file_type()
            .map_err(|e| StageFailure::io(&path, e))?
            .is_dir();
        if is_dir {
            files.extend(collect_files(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

fn read_dir_sorted(dir: &Utf8Path) -> Result<Vec<camino::Utf8DirEntry>, StageFailure> {
    let mut entries = dir
        .read_dir_utf8()
        .map_err(|e| StageFailure::io(dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| StageFailure::io(dir, e))?;
    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    Ok(entries)
}
