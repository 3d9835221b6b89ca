//! Container image disassembly and filtered reassembly.
//!
//! `reassemble-core` exports a container image's filesystem through a
//! container engine, extracts it safely onto disk, audits it for oversized
//! files, lets an operator prune them, and rebuilds a new image from a
//! filtered copy of the original snapshot.
//!
//! # Examples
//!
//! ```no_run
//! use reassemble_core::ExclusionRules;
//! use reassemble_core::ExtractOptions;
//! use reassemble_core::NoopProgress;
//! use reassemble_core::RebuildConfig;
//! use reassemble_core::ScriptedSelector;
//! use reassemble_core::engine::DockerCli;
//! use reassemble_core::types::ExtractionTarget;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DockerCli::default();
//! let target = ExtractionTarget::new("./rootfs")?;
//! reassemble_core::disassemble(&engine, "alpine:3.20", &target, &ExtractOptions::default(), &mut NoopProgress)?;
//!
//! let outcome = reassemble_core::audit_and_prune(target.as_path(), 1 << 20, &mut ScriptedSelector::skip())?;
//! let config = RebuildConfig::default();
//! let rules = ExclusionRules::from_records(&config, &target, &outcome.removed);
//! let report = reassemble_core::reassemble(&engine, "alpine:3.20", "alpine:slim", &rules, &config.descriptor)?;
//! println!("built {}", report.build.image_id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod io;
pub mod pipeline;
pub mod prune;
pub mod rebuild;
pub mod report;
pub mod session;
pub mod size;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

pub use archive::SnapshotArchive;
pub use audit::LargeFileRecord;
pub use audit::find_large_files;
pub use config::BuildDescriptor;
pub use config::ExtractOptions;
pub use config::RebuildConfig;
pub use error::ReassembleError;
pub use error::Result;
pub use extract::extract_snapshot;
pub use pipeline::PruneOutcome;
pub use pipeline::ReassembleReport;
pub use pipeline::audit_and_prune;
pub use pipeline::disassemble;
pub use pipeline::reassemble;
pub use prune::PruneDecision;
pub use prune::PruneSelector;
pub use prune::ScriptedSelector;
pub use prune::TerminalPrompt;
pub use prune::apply_decision;
pub use prune::parse_selection;
pub use rebuild::ExclusionRules;
pub use rebuild::rebuild_archive;
pub use rebuild::rebuild_to_vec;
pub use report::BlockReason;
pub use report::BlockedEntry;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use report::RebuildReport;
pub use session::SnapshotSession;
pub use size::parse_size;
