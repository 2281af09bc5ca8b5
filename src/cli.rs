// src/cli.rs

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::oracle::FoldParams;

/// RNA secondary-structure screening tool: fold sequence variants through an
/// external prediction program and score them against reference structures.
#[derive(Parser, Debug)]
#[command(name = "rna-fold-screen", version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Grid-scan the alpha/tau parameter plane on an unmodified sequence
    Sweep(SweepArgs),
    /// Substitute every nucleotide combination into a window
    ScanWindow(ScanWindowArgs),
    /// Priority-partitioned window substitution
    ScanPriority(ScanPriorityArgs),
    /// Delete each window position in turn across a sequence family
    ScanDeletion(ScanDeletionArgs),
    /// Apply explicit index:replacement mutations across a sequence family
    Mutate(MutateArgs),
    /// Fold growing prefixes of a sequence
    Iterative(IterativeArgs),
    /// Convert every SVG below a directory to PDF
    #[command(name = "svg2pdf")]
    Svg2Pdf(Svg2PdfArgs),
}

// ----------------------
// Shared argument groups
// ----------------------

#[derive(Args, Debug)]
pub struct OracleArgs {
    /// Energy parameter file handed to the folding program
    #[arg(long)]
    pub param_file: PathBuf,

    /// distAlpha parameter of the folding run
    #[arg(long, default_value_t = 0.5)]
    pub alpha: f64,

    /// distTau parameter of the folding run
    #[arg(long, default_value_t = 640.0)]
    pub tau: f64,

    /// Folding program executable
    #[arg(long, default_value = "CoFold")]
    pub fold_bin: String,
}

impl OracleArgs {
    pub fn fold_params(&self) -> FoldParams {
        FoldParams {
            alpha: self.alpha,
            tau: self.tau,
            param_file: self.param_file.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Directory where run output will be stored
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Render an SVG diagram for each variant
    #[arg(long, default_value_t = false)]
    pub render: bool,

    /// Diagram renderer executable
    #[arg(long, default_value = "RNAplot")]
    pub render_bin: String,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Start of a window checked for base pairing in the prediction
    #[arg(long)]
    pub probe_start: Option<usize>,

    /// End (exclusive) of the pairing probe window
    #[arg(long)]
    pub probe_end: Option<usize>,
}

// ----------------------
// Subcommands
// ----------------------

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Path of the analysed sequence (two-line FASTA)
    #[arg(long)]
    pub sequence: PathBuf,

    /// Path of the reference dot-bracket structure
    #[arg(long)]
    pub structure: PathBuf,

    /// Number of alpha points between 0 and 1
    #[arg(long, default_value_t = 100)]
    pub alpha_steps: usize,

    /// Number of tau points between 0 and 1000
    #[arg(long, default_value_t = 100)]
    pub tau_steps: usize,

    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct ScanWindowArgs {
    /// Path of the analysed sequence (two-line FASTA)
    #[arg(long)]
    pub sequence: PathBuf,

    /// Path of the reference dot-bracket structure
    #[arg(long)]
    pub structure: PathBuf,

    /// First index of the substituted window (0-based)
    #[arg(long, default_value_t = 119)]
    pub window_start: usize,

    /// End (exclusive) of the substituted window
    #[arg(long, default_value_t = 125)]
    pub window_end: usize,

    /// Start of a second window receiving the reverse complement of the
    /// window tail; omitting it disables the complementary substitution
    #[arg(long)]
    pub comp_target: Option<usize>,

    /// Offset inside the window where the reverse-complemented slice begins
    #[arg(long, default_value_t = 4)]
    pub comp_source_offset: usize,

    #[command(flatten)]
    pub probe: ProbeArgs,

    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct ScanPriorityArgs {
    /// Path of the analysed sequence (two-line FASTA)
    #[arg(long)]
    pub sequence: PathBuf,

    /// Path of the reference dot-bracket structure
    #[arg(long)]
    pub structure: PathBuf,

    /// First index of the substituted window (0-based)
    #[arg(long, default_value_t = 119)]
    pub window_start: usize,

    /// End (exclusive) of the substituted window
    #[arg(long, default_value_t = 125)]
    pub window_end: usize,

    /// Upper bound on substitutions drawn from priority groups 1-3
    #[arg(long, default_value_t = 1)]
    pub max_priority_subs: usize,

    /// Reference structure for the tail-truncated refold comparison
    #[arg(long)]
    pub secondary_structure: Option<PathBuf>,

    /// Residues dropped from the tail before the secondary refold
    #[arg(long, default_value_t = 8)]
    pub truncate_tail: usize,

    #[command(flatten)]
    pub probe: ProbeArgs,

    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct ScanDeletionArgs {
    /// Directory holding the sequence family (<prefix><len>.fasta)
    #[arg(long)]
    pub sequence_dir: PathBuf,

    /// Directory holding the reference structures (<prefix><len>.dat)
    #[arg(long)]
    pub structure_dir: PathBuf,

    /// Family filename prefix
    #[arg(long, default_value = "wt_p")]
    pub prefix: String,

    /// Family member lengths
    #[arg(long, value_delimiter = ',', default_values_t = vec![132, 140, 200, 555])]
    pub lengths: Vec<usize>,

    /// First index of the deletion window (0-based)
    #[arg(long, default_value_t = 119)]
    pub window_start: usize,

    /// End (exclusive) of the deletion window
    #[arg(long, default_value_t = 125)]
    pub window_end: usize,

    /// Also delete the pairing partner this many positions upstream
    #[arg(long)]
    pub comp_offset: Option<usize>,

    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Directory holding the sequence family (<prefix><len>.fasta)
    #[arg(long)]
    pub sequence_dir: PathBuf,

    /// Directory holding the reference structures (<prefix><len>.dat)
    #[arg(long)]
    pub structure_dir: PathBuf,

    /// Directory of previously folded reference structures, for a second
    /// comparison column
    #[arg(long)]
    pub folded_structure_dir: Option<PathBuf>,

    /// Family filename prefix
    #[arg(long, default_value = "wt_p")]
    pub prefix: String,

    /// Family member lengths
    #[arg(long, value_delimiter = ',', default_values_t = vec![132, 140, 200, 555])]
    pub lengths: Vec<usize>,

    /// Mutations written in format: index1:mutation1_index2:mutation2...
    #[arg(long)]
    pub mutations: String,

    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct IterativeArgs {
    /// Destination of sequence file (FASTA or bare residues)
    #[arg(long)]
    pub sequence: PathBuf,

    /// How much of the sequence is folded in one iteration
    #[arg(long)]
    pub window: usize,

    /// Count of nucleotides fixed after each iteration
    #[arg(long)]
    pub fixation: usize,

    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct Svg2PdfArgs {
    /// Directory scanned recursively for SVG files
    #[arg(long)]
    pub input_dir: PathBuf,

    /// SVG to PDF converter executable
    #[arg(long, default_value = "cairosvg")]
    pub converter: String,
}

/// Helper to parse arguments from CLI.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
