//! Subcommand implementations.

pub mod audit;
pub mod completion;
pub mod disassemble;

use reassemble_core::PruneSelector;
use reassemble_core::ScriptedSelector;
use reassemble_core::TerminalPrompt;
use std::io;

/// Picks how the operator is asked which large files to delete.
///
/// With JSON output the prompt goes to stderr so stdout stays parseable.
pub fn prune_selector(non_interactive: bool, json: bool) -> Box<dyn PruneSelector> {
    if non_interactive {
        Box::new(ScriptedSelector::skip())
    } else if json {
        Box::new(TerminalPrompt::new(io::stdin().lock(), io::stderr()))
    } else {
        Box::new(TerminalPrompt::new(io::stdin().lock(), io::stdout()))
    }
}
