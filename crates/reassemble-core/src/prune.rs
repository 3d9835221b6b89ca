//! Operator selection of large files to remove.
//!
//! The pipeline only talks to a [`PruneSelector`]. The CLI plugs in a
//! [`TerminalPrompt`] over stdin/stdout; tests and non-interactive runs use
//! a [`ScriptedSelector`].

use std::io::BufRead;
use std::io::Write;

use tracing::info;
use tracing::warn;

use crate::ReassembleError;
use crate::Result;
use crate::audit::LargeFileRecord;

/// The operator's terminal choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneDecision {
    /// Keep every file.
    Skip,

    /// Remove the records at these zero-based indices.
    Remove(Vec<usize>),
}

/// Capability that turns audit findings into a prune decision.
pub trait PruneSelector {
    /// Presents `records` and blocks until a terminal decision is made.
    ///
    /// Implementations must only return indices that are valid for
    /// `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying input or output channel fails.
    fn request_selection(&mut self, records: &[LargeFileRecord]) -> Result<PruneDecision>;
}

/// Parses one line of selection input against a list of `len` records.
///
/// `no` (any case) declines; otherwise the line is a comma-separated list of
/// zero-based indices. Duplicates collapse to a single index.
///
/// # Errors
///
/// Returns `ReassembleError::InvalidSelection` for empty input, non-numeric
/// items and out-of-range indices.
///
/// # Examples
///
/// ```
/// use reassemble_core::PruneDecision;
/// use reassemble_core::parse_selection;
///
/// assert_eq!(parse_selection("NO", 3).unwrap(), PruneDecision::Skip);
/// assert_eq!(parse_selection("0, 2", 3).unwrap(), PruneDecision::Remove(vec![0, 2]));
/// assert!(parse_selection("5", 3).is_err());
/// ```
pub fn parse_selection(input: &str, len: usize) -> Result<PruneDecision> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("no") {
        return Ok(PruneDecision::Skip);
    }
    if input.is_empty() {
        return Err(ReassembleError::InvalidSelection {
            reason: "enter indices or 'no'".to_string(),
        });
    }

    let mut indices = Vec::new();
    for item in input.split(',') {
        let item = item.trim();
        let index: usize = item.parse().map_err(|_| ReassembleError::InvalidSelection {
            reason: format!("'{item}' is not an index"),
        })?;
        if index >= len {
            return Err(ReassembleError::InvalidSelection {
                reason: format!("index {index} is out of range (0..{len})"),
            });
        }
        if !indices.contains(&index) {
            indices.push(index);
        }
    }

    Ok(PruneDecision::Remove(indices))
}

/// Interactive prompt over any line-oriented input and output.
///
/// Malformed input is reported and the prompt repeats. A removal must be
/// confirmed with `yes`; any other answer cancels it and the prompt repeats.
/// End of input is treated as declining.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    /// Creates a prompt reading from `input` and writing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one line; `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> PruneSelector for TerminalPrompt<R, W> {
    fn request_selection(&mut self, records: &[LargeFileRecord]) -> Result<PruneDecision> {
        if records.is_empty() {
            return Ok(PruneDecision::Skip);
        }

        writeln!(self.output, "Files exceeding the size threshold:")?;
        for (index, record) in records.iter().enumerate() {
            writeln!(self.output, "  [{index}] {} ({} bytes)", record.path.display(), record.size)?;
        }

        loop {
            write!(
                self.output,
                "Enter the indices of files to remove (comma-separated, or 'no' to skip): "
            )?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                return Ok(PruneDecision::Skip);
            };

            let indices = match parse_selection(&line, records.len()) {
                Ok(PruneDecision::Skip) => return Ok(PruneDecision::Skip),
                Ok(PruneDecision::Remove(indices)) => indices,
                Err(e) => {
                    writeln!(self.output, "Invalid input: {e}")?;
                    continue;
                }
            };

            writeln!(self.output, "Files to be removed:")?;
            for &index in &indices {
                writeln!(self.output, "  {}", records[index].path.display())?;
            }
            write!(self.output, "Are you sure you want to delete these files? (yes/no): ")?;
            self.output.flush()?;

            match self.read_line()? {
                Some(answer) if answer.eq_ignore_ascii_case("yes") => {
                    return Ok(PruneDecision::Remove(indices));
                }
                Some(_) => writeln!(self.output, "Removal cancelled.")?,
                None => return Ok(PruneDecision::Skip),
            }
        }
    }
}

/// Selector that returns a fixed decision without asking anyone.
#[derive(Debug, Clone)]
pub struct ScriptedSelector {
    decision: PruneDecision,
}

impl ScriptedSelector {
    /// Creates a selector that always answers `decision`.
    #[must_use]
    pub const fn new(decision: PruneDecision) -> Self {
        Self { decision }
    }

    /// Creates a selector that always declines.
    #[must_use]
    pub const fn skip() -> Self {
        Self::new(PruneDecision::Skip)
    }
}

impl PruneSelector for ScriptedSelector {
    fn request_selection(&mut self, records: &[LargeFileRecord]) -> Result<PruneDecision> {
        if let PruneDecision::Remove(indices) = &self.decision
            && let Some(&bad) = indices.iter().find(|&&i| i >= records.len())
        {
            return Err(ReassembleError::InvalidSelection {
                reason: format!("index {bad} is out of range (0..{})", records.len()),
            });
        }
        Ok(self.decision.clone())
    }
}

/// Deletes the files selected by `decision` and returns their records.
///
/// A file that is already gone counts as removed.
///
/// # Errors
///
/// Returns `ReassembleError::InvalidSelection` for an out-of-range index and
/// `ReassembleError::Io` if a deletion fails.
pub fn apply_decision(
    records: &[LargeFileRecord],
    decision: &PruneDecision,
) -> Result<Vec<LargeFileRecord>> {
    let PruneDecision::Remove(indices) = decision else {
        info!("no files will be removed");
        return Ok(Vec::new());
    };

    let mut removed = Vec::with_capacity(indices.len());
    for &index in indices {
        let record = records
            .get(index)
            .ok_or_else(|| ReassembleError::InvalidSelection {
                reason: format!("index {index} is out of range (0..{})", records.len()),
            })?;

        match std::fs::remove_file(&record.path) {
            Ok(()) => info!(path = %record.path.display(), "removed file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %record.path.display(), "file already removed");
            }
            Err(e) => return Err(e.into()),
        }
        removed.push(record.clone());
    }

    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn records(paths: &[&str]) -> Vec<LargeFileRecord> {
        paths
            .iter()
            .map(|p| LargeFileRecord {
                path: PathBuf::from(p),
                size: 2048,
            })
            .collect()
    }

    fn run_prompt(input: &str, records: &[LargeFileRecord]) -> (PruneDecision, String) {
        let mut output = Vec::new();
        let decision = TerminalPrompt::new(Cursor::new(input.as_bytes()), &mut output)
            .request_selection(records)
            .unwrap();
        (decision, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_parse_skip_any_case() {
        assert_eq!(parse_selection("no", 1).unwrap(), PruneDecision::Skip);
        assert_eq!(parse_selection(" No \n", 1).unwrap(), PruneDecision::Skip);
    }

    #[test]
    fn test_parse_indices() {
        assert_eq!(
            parse_selection("2,0, 1", 3).unwrap(),
            PruneDecision::Remove(vec![2, 0, 1])
        );
        assert_eq!(
            parse_selection("1,1", 3).unwrap(),
            PruneDecision::Remove(vec![1])
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "abc", "1,,2", "-1", "0;1", "3"] {
            assert!(
                matches!(
                    parse_selection(input, 3),
                    Err(ReassembleError::InvalidSelection { .. })
                ),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_prompt_confirmed_removal() {
        let recs = records(&["/r/a", "/r/b"]);
        let (decision, out) = run_prompt("1\nyes\n", &recs);
        assert_eq!(decision, PruneDecision::Remove(vec![1]));
        assert!(out.contains("[0] /r/a"));
        assert!(out.contains("Files to be removed:"));
    }

    #[test]
    fn test_prompt_repeats_after_bad_input_and_cancel() {
        let recs = records(&["/r/a"]);
        let (decision, out) = run_prompt("7\nx\n0\nnope\nno\n", &recs);
        assert_eq!(decision, PruneDecision::Skip);
        assert_eq!(out.matches("Invalid input").count(), 2);
        assert!(out.contains("Removal cancelled."));
    }

    #[test]
    fn test_prompt_end_of_input_skips() {
        let recs = records(&["/r/a"]);
        assert_eq!(run_prompt("", &recs).0, PruneDecision::Skip);
        assert_eq!(run_prompt("0\n", &recs).0, PruneDecision::Skip);
    }

    #[test]
    fn test_prompt_no_records_asks_nothing() {
        let (decision, out) = run_prompt("0\nyes\n", &[]);
        assert_eq!(decision, PruneDecision::Skip);
        assert!(out.is_empty());
    }

    #[test]
    fn test_scripted_selector_validates_indices() {
        let recs = records(&["/r/a"]);
        let mut selector = ScriptedSelector::new(PruneDecision::Remove(vec![3]));
        assert!(selector.request_selection(&recs).is_err());
        assert_eq!(
            ScriptedSelector::skip().request_selection(&recs).unwrap(),
            PruneDecision::Skip
        );
    }

    #[test]
    fn test_apply_decision_deletes_selected() {
        let temp = TempDir::new().unwrap();
        let keep = temp.path().join("keep.bin");
        let drop = temp.path().join("drop.bin");
        std::fs::write(&keep, b"k").unwrap();
        std::fs::write(&drop, b"d").unwrap();
        let recs = vec![
            LargeFileRecord { path: keep.clone(), size: 1 },
            LargeFileRecord { path: drop.clone(), size: 1 },
            LargeFileRecord { path: temp.path().join("gone.bin"), size: 1 },
        ];

        let removed = apply_decision(&recs, &PruneDecision::Remove(vec![1, 2])).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(keep.exists());
        assert!(!drop.exists());
    }

    #[test]
    fn test_apply_skip_removes_nothing() {
        let recs = records(&["/nonexistent/a"]);
        assert!(apply_decision(&recs, &PruneDecision::Skip).unwrap().is_empty());
    }
}
