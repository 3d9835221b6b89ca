//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use reassemble_core::engine::DEFAULT_ENGINE_BIN;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reassemble")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Container engine client binary
    #[arg(
        long,
        global = true,
        env = "REASSEMBLE_ENGINE",
        default_value = DEFAULT_ENGINE_BIN,
        value_name = "PATH"
    )]
    pub engine_bin: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract an image's filesystem, prune large files, optionally rebuild
    Disassemble(DisassembleArgs),
    /// Report files above a size threshold in an extracted tree
    Audit(AuditArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct DisassembleArgs {
    /// Image reference (pulled if not present locally)
    #[arg(value_name = "IMAGE")]
    pub image: String,

    /// Output directory (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// List files larger than this size (e.g. 1G, 100M, 10K) and offer to remove them
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub maximum_file_size: Option<u64>,

    /// Build a new image under this name without the removed files
    #[arg(long, value_name = "NAME", requires = "maximum_file_size")]
    pub new_image_name: Option<String>,

    /// Answer "no" to the removal prompt without asking
    #[arg(long)]
    pub yes_to_none: bool,

    /// Do not apply permission bits recorded in the image
    #[arg(long)]
    pub no_preserve_permissions: bool,
}

#[derive(clap::Args)]
pub struct AuditArgs {
    /// Extracted filesystem root
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Size threshold (e.g. 1G, 100M, 10K)
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub maximum_file_size: u64,

    /// Prompt for files to remove
    #[arg(long)]
    pub prune: bool,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_size_arg(s: &str) -> Result<u64, String> {
    reassemble_core::parse_size(s).map_err(|e| e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_size_arg() {
        assert_eq!(parse_size_arg("100M").unwrap(), 104_857_600);
        assert_eq!(parse_size_arg("10k").unwrap(), 10_240);
        assert!(parse_size_arg("lots").unwrap_err().contains("invalid size format"));
    }

    #[test]
    fn test_new_image_requires_threshold() {
        let result = Cli::try_parse_from(["reassemble", "disassemble", "app:1", "--new-image-name", "slim"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "reassemble",
            "disassemble",
            "app:1",
            "out",
            "--maximum-file-size",
            "1M",
            "--new-image-name",
            "slim",
        ])
        .unwrap();
        match cli.command {
            Commands::Disassemble(args) => {
                assert_eq!(args.maximum_file_size, Some(1_048_576));
                assert_eq!(args.output_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected disassemble"),
        }
    }
}
