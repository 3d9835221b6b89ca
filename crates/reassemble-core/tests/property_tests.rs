//! Property-based tests for parsing, auditing and path normalization.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use reassemble_core::ReassembleError;
use reassemble_core::find_large_files;
use reassemble_core::parse_selection;
use reassemble_core::parse_size;
use reassemble_core::types::normalize_entry_path;
use std::path::Path;
use tempfile::TempDir;

proptest! {
    /// A file is reported iff its size is strictly above the threshold.
    #[test]
    fn prop_threshold_is_strict(size in 0usize..4096, threshold in 0u64..4096) {
        let temp = TempDir::new().expect("failed to create temp dir");
        std::fs::write(temp.path().join("blob"), vec![0u8; size]).unwrap();

        let records = find_large_files(temp.path(), threshold).unwrap();
        prop_assert_eq!(records.len() == 1, size as u64 > threshold);
    }

    /// Boundary values: `t` is excluded, `t + 1` is included.
    #[test]
    fn prop_threshold_boundaries(threshold in 0u64..8192) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let at = usize::try_from(threshold).unwrap();
        std::fs::write(temp.path().join("at"), vec![0u8; at]).unwrap();
        std::fs::write(temp.path().join("above"), vec![0u8; at + 1]).unwrap();

        let records = find_large_files(temp.path(), threshold).unwrap();
        prop_assert_eq!(records.len(), 1);
        prop_assert!(records[0].path.ends_with("above"));
    }

    /// Suffixed sizes multiply by the matching power of 1024, in any case.
    #[test]
    fn prop_suffix_multiplies(n in 0u64..1_000_000, suffix in "[kKmMgG]?") {
        let multiplier = match suffix.to_ascii_uppercase().as_str() {
            "K" => 1024,
            "M" => 1024 * 1024,
            "G" => 1024 * 1024 * 1024,
            _ => 1,
        };
        prop_assert_eq!(parse_size(&format!("{n}{suffix}")).unwrap(), n * multiplier);
    }

    /// Anything with a letter other than a trailing suffix is rejected.
    #[test]
    fn prop_garbage_sizes_rejected(s in "[0-9]{0,4}[a-jl-zA-JL-Z][0-9a-z]{0,4}") {
        prop_assume!(!s.to_ascii_uppercase().ends_with(['K', 'M', 'G']) || s.len() == 1);
        prop_assert!(
            matches!(parse_size(&s), Err(ReassembleError::InvalidSizeFormat { .. })),
            "accepted {s:?}"
        );
    }

    /// Selection parsing never panics and only yields in-range indices.
    #[test]
    fn prop_selection_in_range(input in "[0-9, a-z]{0,16}", len in 1usize..8) {
        if let Ok(reassemble_core::PruneDecision::Remove(indices)) = parse_selection(&input, len) {
            prop_assert!(indices.iter().all(|&i| i < len));
        }
    }

    /// Normalized paths are relative and free of parent components.
    #[test]
    fn prop_normalized_paths_are_relative(
        parts in prop::collection::vec("(\\.\\.|\\.|[a-z]{1,6})", 0..6),
        rooted in any::<bool>(),
    ) {
        let raw = format!("{}{}", if rooted { "/" } else { "" }, parts.join("/"));
        if let Some(normalized) = normalize_entry_path(Path::new(&raw)) {
            prop_assert!(!normalized.starts_with('/'));
            prop_assert!(normalized.split('/').all(|c| c != ".." && c != "."));
        } else {
            prop_assert!(parts.iter().any(|p| p == ".."));
        }
    }
}
