//! Configuration for extraction and rebuild.

/// Path prefixes that never make it into a rebuilt image.
///
/// Transient OS state, package caches and documentation trees add bulk
/// without runtime value. Matching is a plain string prefix on the
/// normalized entry path, so the directory entries themselves (`proc`,
/// `tmp`, ...) survive as empty mount points.
pub const DEFAULT_BLOCKED_PREFIXES: &[&str] = &[
    "proc/",
    "sys/",
    "dev/",
    "run/",
    "tmp/",
    "var/cache/",
    "var/log/",
    "usr/share/doc/",
    "usr/share/man/",
    "usr/share/locale/",
];

/// Name of the injected build descriptor entry.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "Dockerfile";

/// Recipe that assembles an image from the filtered filesystem alone.
pub const DEFAULT_DESCRIPTOR_CONTENT: &str = "FROM scratch\nCOPY . /\n";

/// Options controlling how a snapshot is materialized on disk.
///
/// # Examples
///
/// ```
/// use reassemble_core::ExtractOptions;
///
/// let options = ExtractOptions {
///     preserve_permissions: false,
/// };
/// assert!(ExtractOptions::default().preserve_permissions);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Apply permission bits recorded in the archive.
    pub preserve_permissions: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            preserve_permissions: true,
        }
    }
}

/// Synthetic build recipe injected into a rebuilt archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    /// Entry name at the archive root.
    pub name: String,

    /// Recipe text.
    pub content: String,
}

impl BuildDescriptor {
    /// Creates a descriptor with the given name and content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl Default for BuildDescriptor {
    /// `FROM scratch` + `COPY . /`, stored as `Dockerfile`.
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTOR_NAME, DEFAULT_DESCRIPTOR_CONTENT)
    }
}

/// Configuration for rebuilding a filtered image archive.
///
/// # Examples
///
/// ```
/// use reassemble_core::RebuildConfig;
///
/// let config = RebuildConfig {
///     blocked_prefixes: vec!["var/log/".to_string()],
///     ..Default::default()
/// };
/// assert_eq!(config.descriptor.name, "Dockerfile");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildConfig {
    /// Prefixes excluded regardless of size.
    pub blocked_prefixes: Vec<String>,

    /// Descriptor appended as the last entry.
    pub descriptor: BuildDescriptor,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            blocked_prefixes: DEFAULT_BLOCKED_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect(),
            descriptor: BuildDescriptor::default(),
        }
    }
}
