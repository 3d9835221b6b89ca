//! Test utilities for building snapshot archives and inspecting rebuilds.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

/// Writes archive bytes to `dir/name` and returns the path.
pub fn write_snapshot(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Reads a gzip-compressed tar into `(path, content)` pairs in archive
/// order. Paths are returned exactly as stored.
#[must_use]
pub fn read_tar_gz(data: &[u8]) -> Vec<(String, Vec<u8>)> {
    let decoder = flate2::read::GzDecoder::new(data);
    let mut archive = tar::Archive::new(decoder);
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (path, content)
        })
        .collect()
}

/// Builder for snapshot test archives with various entry types.
///
/// # Examples
///
/// ```
/// use reassemble_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_directory("etc/")
///     .add_file("etc/passwd", b"root:x:0:0")
///     .add_symlink("bin", "usr/bin")
///     .build();
/// assert!(!tar_data.is_empty());
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

/// Header carrying the ownership and timestamp a real export would have.
fn exported_header(kind: tar::EntryType, mode: u32) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(0);
    header.set_mode(mode);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(1_700_000_000);
    header
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file with mode 0o644.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a regular file with custom mode.
    #[must_use]
    pub fn add_file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        let mut header = exported_header(tar::EntryType::Regular, mode);
        header.set_size(data.len() as u64);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a directory with mode 0o755.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let mut header = exported_header(tar::EntryType::Directory, 0o755);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a symlink; the target may be absolute or contain `..`.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = exported_header(tar::EntryType::Symlink, 0o777);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a hardlink to another entry.
    #[must_use]
    pub fn add_hardlink(mut self, path: &str, target: &str) -> Self {
        let mut header = exported_header(tar::EntryType::Link, 0o644);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a FIFO entry.
    #[must_use]
    pub fn add_fifo(mut self, path: &str) -> Self {
        let mut header = exported_header(tar::EntryType::Fifo, 0o644);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a regular file whose name is written verbatim into the header,
    /// bypassing the builder's path checks. Used for `../x` and `/etc/x`.
    #[must_use]
    pub fn add_raw_file(mut self, raw_path: &str, data: &[u8]) -> Self {
        let mut header = exported_header(tar::EntryType::Regular, 0o644);
        let name = raw_path.as_bytes();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(data.len() as u64);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Adds a regular file whose header claims `claimed_size` bytes while
    /// only `data` follows, leaving the archive truncated.
    #[must_use]
    pub fn build_truncated(mut self, path: &str, data: &[u8], claimed_size: u64) -> Vec<u8> {
        let mut header = exported_header(tar::EntryType::Regular, 0o644);
        header.set_path(path).unwrap();
        header.set_size(claimed_size);
        header.set_cksum();
        let mut bytes = std::mem::replace(&mut self.builder, tar::Builder::new(Vec::new()))
            .into_inner()
            .unwrap();
        // `into_inner` appended the two zero end blocks; drop them.
        bytes.truncate(bytes.len() - 1024);
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    /// Builds and returns the TAR archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
