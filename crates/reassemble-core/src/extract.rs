//! Safe snapshot extraction.
//!
//! Materializes a snapshot under an [`ExtractionTarget`]. Every entry is
//! resolved against the canonical root before anything is written; entries
//! that would land outside it (parent traversal, writes through an escaping
//! symlinked directory, symlinks or hardlinks pointing outside) are skipped
//! and recorded in the report instead of failing the whole extraction.
//!
//! Disk-level failures are fatal and surface as
//! [`ReassembleError::Extraction`].

use std::fs::File;
use std::fs::create_dir_all;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ExtractOptions;
use crate::ReassembleError;
use crate::Result;
use crate::archive::SnapshotArchive;
use crate::io::LengthCheckedReader;
use crate::report::BlockReason;
use crate::report::BlockedEntry;
use crate::report::ExtractionReport;
use crate::report::ProgressCallback;
use crate::types::ArchiveEntry;
use crate::types::EntryKind;
use crate::types::ExtractionTarget;
use crate::types::normalize_entry_path;

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Extracts every safe entry of `archive` into `target`.
///
/// Leading separators are stripped from entry paths, so `/etc/passwd` lands
/// at `<target>/etc/passwd`. Directory permissions are applied after all
/// entries are written, deepest first. Ownership is not applied.
///
/// # Errors
///
/// - `ReassembleError::ArchiveFormat` if the snapshot is not a tar stream
/// - `ReassembleError::ArchiveIntegrity` if a file's content is shorter or
///   longer than its header claims
/// - `ReassembleError::Extraction` for any disk-level failure
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::ExtractOptions;
/// use reassemble_core::NoopProgress;
/// use reassemble_core::SnapshotArchive;
/// use reassemble_core::extract_snapshot;
/// use reassemble_core::types::ExtractionTarget;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = SnapshotArchive::open("/tmp/snapshot.tar")?;
/// let target = ExtractionTarget::new("./rootfs")?;
/// let report = extract_snapshot(&archive, &target, &ExtractOptions::default(), &mut NoopProgress)?;
/// println!("{} files, {} blocked", report.files_extracted, report.blocked.len());
/// # Ok(())
/// # }
/// ```
pub fn extract_snapshot(
    archive: &SnapshotArchive,
    target: &ExtractionTarget,
    options: &ExtractOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let start = Instant::now();
    let mut report = ExtractionReport::new();
    let mut deferred_dirs: Vec<(PathBuf, u32)> = Vec::new();
    let mut created_links: Vec<CreatedLink> = Vec::new();
    let mut current = 0;

    archive.for_each_entry(|item| {
        current += 1;

        let Some(entry) = item.entry else {
            block(&mut report, item.raw_path, BlockReason::ParentTraversal);
            return Ok(());
        };

        // The archive root itself (`./`) maps onto the existing target.
        if entry.path.is_empty() {
            return Ok(());
        }

        progress.on_entry(Path::new(&entry.path), current);

        let destination = match resolve_destination(target, &entry.path) {
            Ok(Some(destination)) => destination,
            Ok(None) => {
                block(&mut report, item.raw_path, BlockReason::EscapesRoot);
                return Ok(());
            }
            Err(source) => return Err(extraction_error(&entry.path, source)),
        };

        match &entry.kind {
            EntryKind::File => {
                let written = write_file(&destination, &entry, item.content, options)?;
                report.files_extracted += 1;
                report.bytes_written += written;
                progress.on_bytes_written(written);
            }
            EntryKind::Directory => {
                create_directory(&destination)
                    .map_err(|source| extraction_error(&entry.path, source))?;
                if options.preserve_permissions {
                    deferred_dirs.push((destination, entry.mode));
                }
                report.directories_created += 1;
            }
            EntryKind::Symlink { target: link } => {
                if let Err(reason) = check_symlink_target(target, &entry.path, link) {
                    block(&mut report, item.raw_path, reason);
                    return Ok(());
                }
                if create_symlink(link, &destination)
                    .map_err(|source| extraction_error(&entry.path, source))?
                {
                    report.symlinks_created += 1;
                    created_links.push(CreatedLink {
                        destination: destination.clone(),
                        link_target: link.clone(),
                        raw_path: item.raw_path,
                    });
                } else {
                    report.unsupported += 1;
                }
            }
            EntryKind::Hardlink { target: link } => {
                let Some(source) = resolve_hardlink_source(target, link)
                    .map_err(|source| extraction_error(&entry.path, source))?
                else {
                    block(&mut report, item.raw_path, BlockReason::HardlinkEscape);
                    return Ok(());
                };
                create_hardlink(&source, &destination)
                    .map_err(|source| extraction_error(&entry.path, source))?;
                report.hardlinks_created += 1;
            }
            EntryKind::Other => {
                debug!(path = %entry.path, "skipping special file");
                report.unsupported += 1;
                return Ok(());
            }
        }

        debug!(path = %entry.path, "extracted");
        Ok(())
    })?;

    revalidate_symlinks(target, created_links, &mut report)?;
    apply_directory_modes(deferred_dirs)?;

    report.duration = start.elapsed();
    progress.on_complete();

    info!(
        target_dir = %target.as_path().display(),
        files = report.files_extracted,
        directories = report.directories_created,
        blocked = report.blocked.len(),
        "extraction completed"
    );

    Ok(report)
}

/// A symlink written during the entry pass.
struct CreatedLink {
    destination: PathBuf,
    link_target: PathBuf,
    raw_path: PathBuf,
}

/// Re-checks every created symlink against the finished tree.
///
/// A link that was inside the root when written can be redirected by a
/// later entry (`e -> g/..` followed by `g -> .`). Links that now resolve
/// outside are deleted and reported; this repeats until no link is removed,
/// since removing one can change how another resolves.
fn revalidate_symlinks(
    target: &ExtractionTarget,
    mut links: Vec<CreatedLink>,
    report: &mut ExtractionReport,
) -> Result<()> {
    loop {
        let mut kept = Vec::with_capacity(links.len());
        let mut removed_any = false;

        for link in links {
            // Replaced by a later entry with the same path.
            if !std::fs::read_link(&link.destination).is_ok_and(|t| t == link.link_target) {
                continue;
            }
            let link_dir = link.destination.parent().unwrap_or_else(|| target.as_path());
            if resolves_inside(target, link_dir, &link.link_target) {
                kept.push(link);
                continue;
            }

            std::fs::remove_file(&link.destination).map_err(|source| ReassembleError::Extraction {
                path: link.raw_path.clone(),
                source,
            })?;
            report.symlinks_created = report.symlinks_created.saturating_sub(1);
            block(report, link.raw_path, BlockReason::SymlinkEscape);
            removed_any = true;
        }

        if !removed_any {
            return Ok(());
        }
        links = kept;
    }
}

fn block(report: &mut ExtractionReport, path: PathBuf, reason: BlockReason) {
    warn!(path = %path.display(), %reason, "blocked unsafe entry");
    report.blocked.push(BlockedEntry { path, reason });
}

fn extraction_error(path: &str, source: std::io::Error) -> ReassembleError {
    ReassembleError::Extraction {
        path: PathBuf::from(path),
        source,
    }
}

/// Resolves the deepest existing ancestor of `path` through the filesystem.
///
/// Components below that ancestor do not exist yet and, coming from a
/// normalized path, cannot climb back up.
fn canonical_ancestor(path: &Path) -> std::io::Result<PathBuf> {
    for ancestor in path.ancestors() {
        match ancestor.canonicalize() {
            Ok(canonical) => return Ok(canonical),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no existing ancestor of {}", path.display()),
    ))
}

/// Joins a normalized entry path to the root and verifies that its parent
/// directory, resolved through any symlinks already on disk, stays inside
/// the root. Returns `Ok(None)` for entries that would escape.
fn resolve_destination(target: &ExtractionTarget, relative: &str) -> std::io::Result<Option<PathBuf>> {
    let destination = target.join(relative);
    if !target.contains(&destination) {
        return Ok(None);
    }

    let parent = destination.parent().unwrap_or_else(|| target.as_path());
    let resolved_parent = canonical_ancestor(parent)?;
    if !target.contains(&resolved_parent) {
        return Ok(None);
    }

    Ok(Some(destination))
}

/// Checks that a symlink target stays inside the root.
///
/// The target is first resolved lexically against the link's directory,
/// then the deepest existing ancestor of the joined path is resolved
/// through the filesystem, which catches `..` hops through symlinks that
/// already exist.
fn check_symlink_target(
    target: &ExtractionTarget,
    link_path: &str,
    link_target: &Path,
) -> std::result::Result<(), BlockReason> {
    if link_target.has_root() {
        return Err(BlockReason::AbsoluteSymlink);
    }

    let mut stack: Vec<&std::ffi::OsStr> = Path::new(link_path)
        .parent()
        .map(|parent| parent.iter().collect())
        .unwrap_or_default();

    for component in link_target.components() {
        match component {
            Component::Normal(part) => stack.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if stack.pop().is_none() {
                    return Err(BlockReason::SymlinkEscape);
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(BlockReason::AbsoluteSymlink),
        }
    }

    let link_dir = target
        .join(link_path)
        .parent()
        .map_or_else(|| target.as_path().to_path_buf(), Path::to_path_buf);
    if resolves_inside(target, &link_dir, link_target) {
        Ok(())
    } else {
        Err(BlockReason::SymlinkEscape)
    }
}

/// Resolves `link_target` from `link_dir` through the tree as it is on disk
/// now. Unresolvable paths count as outside.
fn resolves_inside(target: &ExtractionTarget, link_dir: &Path, link_target: &Path) -> bool {
    canonical_ancestor(&link_dir.join(link_target)).is_ok_and(|resolved| target.contains(&resolved))
}

/// Resolves a hardlink's source path inside the root.
///
/// Returns `Ok(None)` if the recorded target cannot be normalized or
/// resolves outside the root.
fn resolve_hardlink_source(
    target: &ExtractionTarget,
    link_target: &Path,
) -> std::io::Result<Option<PathBuf>> {
    match normalize_entry_path(link_target) {
        Some(relative) if !relative.is_empty() => resolve_destination(target, &relative),
        _ => Ok(None),
    }
}

/// Removes a non-directory node so it can be replaced.
fn remove_existing(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => std::fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

fn write_file(
    destination: &Path,
    entry: &ArchiveEntry,
    content: &mut dyn Read,
    options: &ExtractOptions,
) -> Result<u64> {
    let io_error = |source| extraction_error(&entry.path, source);

    ensure_parent(destination).map_err(io_error)?;
    remove_existing(destination).map_err(io_error)?;

    let file = File::create(destination).map_err(io_error)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut checked = LengthCheckedReader::new(content, entry.size);

    let written = match std::io::copy(&mut checked, &mut writer) {
        Ok(written) => written,
        Err(_) if checked.is_mismatch() => {
            return Err(ReassembleError::ArchiveIntegrity {
                path: entry.path.clone(),
                expected: entry.size,
                actual: checked.bytes_read(),
            });
        }
        Err(source) => return Err(io_error(source)),
    };
    writer.flush().map_err(io_error)?;

    #[cfg(unix)]
    if options.preserve_permissions {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(destination, std::fs::Permissions::from_mode(entry.mode & 0o7777))
            .map_err(io_error)?;
    }
    #[cfg(not(unix))]
    let _ = options;

    Ok(written)
}

fn create_directory(destination: &Path) -> std::io::Result<()> {
    if let Ok(metadata) = std::fs::symlink_metadata(destination)
        && !metadata.is_dir()
        && !destination.is_dir()
    {
        std::fs::remove_file(destination)?;
    }
    create_dir_all(destination)
}

/// Creates a symlink. Returns `false` where the platform has no symlinks.
#[allow(unused_variables)]
fn create_symlink(link_target: &Path, destination: &Path) -> std::io::Result<bool> {
    #[cfg(unix)]
    {
        ensure_parent(destination)?;
        remove_existing(destination)?;
        std::os::unix::fs::symlink(link_target, destination)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    {
        warn!(path = %destination.display(), "symlinks are not supported on this platform");
        Ok(false)
    }
}

fn create_hardlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    ensure_parent(destination)?;
    remove_existing(destination)?;
    std::fs::hard_link(source, destination)
}

fn apply_directory_modes(mut dirs: Vec<(PathBuf, u32)>) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        dirs.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
        for (path, mode) in dirs {
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|source| ReassembleError::Extraction { path, source })?;
        }
    }
    #[cfg(not(unix))]
    dirs.clear();

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::report::NoopProgress;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::write_snapshot;
    use std::fs;
    use tempfile::TempDir;

    fn extract(data: &[u8]) -> (TempDir, ExtractionTarget, Result<ExtractionReport>) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let snapshot = write_snapshot(temp.path(), "snapshot.tar", data);
        let archive = SnapshotArchive::open(snapshot).unwrap();
        let target = ExtractionTarget::new(temp.path().join("rootfs")).unwrap();
        let result = extract_snapshot(
            &archive,
            &target,
            &ExtractOptions::default(),
            &mut NoopProgress,
        );
        (temp, target, result)
    }

    #[test]
    fn test_extract_files_and_directories() {
        let data = TarTestBuilder::new()
            .add_directory("etc/")
            .add_file("etc/passwd", b"root:x:0:0")
            .add_file("usr/bin/tool", b"#!/bin/sh\n")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.files_extracted, 2);
        assert_eq!(report.directories_created, 1);
        assert_eq!(report.bytes_written, 20);
        assert_eq!(
            fs::read(target.join("etc/passwd")).unwrap(),
            b"root:x:0:0"
        );
        assert!(target.join("usr/bin/tool").is_file());
    }

    #[test]
    fn test_leading_separator_is_stripped() {
        let data = TarTestBuilder::new()
            .add_raw_file("/etc/hostname", b"box")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.files_extracted, 1);
        assert!(!report.has_blocked());
        assert_eq!(fs::read(target.join("etc/hostname")).unwrap(), b"box");
    }

    #[test]
    fn test_parent_traversal_blocked() {
        let data = TarTestBuilder::new()
            .add_raw_file("../evil", b"x")
            .add_raw_file("a/../../evil2", b"x")
            .add_file("ok.txt", b"fine")
            .build();
        let (temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.blocked.len(), 2);
        assert!(
            report
                .blocked
                .iter()
                .all(|b| b.reason == BlockReason::ParentTraversal)
        );
        assert_eq!(report.files_extracted, 1);
        assert!(!temp.path().join("evil").exists());
        assert!(!temp.path().join("evil2").exists());
        assert!(target.join("ok.txt").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_absolute_symlink_blocked() {
        let data = TarTestBuilder::new()
            .add_symlink("etc/shadow-link", "/etc/shadow")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.blocked[0].reason, BlockReason::AbsoluteSymlink);
        assert!(fs::symlink_metadata(target.join("etc/shadow-link")).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_relative_symlink_escape_blocked() {
        let data = TarTestBuilder::new()
            .add_symlink("a/link", "../../outside")
            .build();
        let (_temp, _target, result) = extract(&data);
        let report = result.unwrap();
        assert_eq!(report.blocked[0].reason, BlockReason::SymlinkEscape);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_hop_through_existing_link_blocked() {
        // sub/up -> .. is harmless on its own; sub/esc -> up/../../x is
        // lexically inside but resolves above the root through sub/up.
        let data = TarTestBuilder::new()
            .add_directory("sub/")
            .add_symlink("sub/up", "..")
            .add_symlink("sub/esc", "up/../../x")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.symlinks_created, 1);
        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.blocked[0].path, PathBuf::from("sub/esc"));
        assert!(fs::symlink_metadata(target.join("sub/esc")).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_link_redirected_by_later_entry_removed() {
        // e -> g/.. is inside while g is missing; g -> . then points e at
        // the root's parent.
        let data = TarTestBuilder::new()
            .add_symlink("e", "g/..")
            .add_symlink("g", ".")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.symlinks_created, 1);
        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.blocked[0].path, PathBuf::from("e"));
        assert_eq!(report.blocked[0].reason, BlockReason::SymlinkEscape);
        assert!(fs::symlink_metadata(target.join("e")).is_err());
        assert_eq!(fs::read_link(target.join("g")).unwrap(), PathBuf::from("."));
    }

    #[test]
    #[cfg(unix)]
    fn test_replaced_link_not_revalidated() {
        let data = TarTestBuilder::new()
            .add_symlink("current", "releases/v1")
            .add_file("current", b"plain file now")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert!(!report.has_blocked());
        assert_eq!(fs::read(target.join("current")).unwrap(), b"plain file now");
    }

    #[test]
    #[cfg(unix)]
    fn test_relative_symlinks_inside_root_created() {
        let data = TarTestBuilder::new()
            .add_file("usr/lib/libc.so.6", b"elf")
            .add_symlink("lib", "usr/lib")
            .add_symlink("usr/lib/libc.so", "libc.so.6")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.symlinks_created, 2);
        assert_eq!(
            fs::read_link(target.join("lib")).unwrap(),
            PathBuf::from("usr/lib")
        );
        assert_eq!(fs::read(target.join("lib/libc.so")).unwrap(), b"elf");
    }

    #[test]
    #[cfg(unix)]
    fn test_write_through_escaping_directory_link_blocked() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let target = ExtractionTarget::new(temp.path().join("rootfs")).unwrap();
        // A pre-existing link in the output tree pointing outside of it.
        std::os::unix::fs::symlink(&outside, target.join("escape")).unwrap();

        let data = TarTestBuilder::new().add_file("escape/payload", b"x").build();
        let snapshot = write_snapshot(temp.path(), "snapshot.tar", &data);
        let report = extract_snapshot(
            &SnapshotArchive::open(snapshot).unwrap(),
            &target,
            &ExtractOptions::default(),
            &mut NoopProgress,
        )
        .unwrap();

        assert_eq!(report.blocked[0].reason, BlockReason::EscapesRoot);
        assert!(!outside.join("payload").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_permissions_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let data = TarTestBuilder::new()
            .add_file_with_mode("usr/bin/run", b"#!", 0o755)
            .add_file_with_mode("etc/secret", b"k", 0o600)
            .build();
        let (_temp, target, result) = extract(&data);
        result.unwrap();

        let mode = |p: &str| {
            fs::metadata(target.join(p)).unwrap().permissions().mode() & 0o777
        };
        assert_eq!(mode("usr/bin/run"), 0o755);
        assert_eq!(mode("etc/secret"), 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn test_hardlink_created() {
        let data = TarTestBuilder::new()
            .add_file("usr/bin/perl5", b"perl")
            .add_hardlink("usr/bin/perl", "usr/bin/perl5")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.hardlinks_created, 1);
        assert_eq!(fs::read(target.join("usr/bin/perl")).unwrap(), b"perl");
    }

    #[test]
    fn test_hardlink_escape_blocked() {
        let data = TarTestBuilder::new()
            .add_hardlink("passwd", "../../etc/passwd")
            .build();
        let (_temp, _target, result) = extract(&data);
        let report = result.unwrap();
        assert_eq!(report.blocked[0].reason, BlockReason::HardlinkEscape);
    }

    #[test]
    fn test_special_files_skipped() {
        let data = TarTestBuilder::new()
            .add_fifo("run/initctl")
            .add_file("etc/motd", b"hi")
            .build();
        let (_temp, target, result) = extract(&data);
        let report = result.unwrap();

        assert_eq!(report.unsupported, 1);
        assert!(!target.join("run/initctl").exists());
    }

    #[test]
    fn test_truncated_content_is_integrity_error() {
        let data = TarTestBuilder::new().build_truncated("big.bin", b"abc", 4096);
        let (_temp, _target, result) = extract(&data);
        assert!(matches!(
            result,
            Err(ReassembleError::ArchiveIntegrity {
                expected: 4096,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_re_extraction_into_populated_tree() {
        let data = TarTestBuilder::new()
            .add_file_with_mode("etc/readonly", b"v1", 0o444)
            .build();
        let temp = TempDir::new().unwrap();
        let snapshot = write_snapshot(temp.path(), "snapshot.tar", &data);
        let archive = SnapshotArchive::open(snapshot).unwrap();
        let target = ExtractionTarget::new(temp.path().join("rootfs")).unwrap();

        for _ in 0..2 {
            extract_snapshot(
                &archive,
                &target,
                &ExtractOptions::default(),
                &mut NoopProgress,
            )
            .unwrap();
        }
        assert_eq!(fs::read(target.join("etc/readonly")).unwrap(), b"v1");
    }
}
