use clap::{value_parser, Args, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CoreArgs {
    /// Pipeline run directory [path]
    #[clap(
        short = 'r',
        long,
        value_parser,
        required = true,
        help_heading = "Core"
    )]
    pub run_dir: PathBuf,

    /// Partition id [integer]
    #[clap(short = 'p', long, required = true, help_heading = "Core")]
    pub part_id: u32,

    /// Size of k-mer [integer]
    ///
    /// Limited to 32 by the 2-bit capacity of the 64-bit hash.
    #[clap(short = 'k', long, value_parser = value_parser!(u32).range(1..=32), required = true, help_heading = "Core")]
    pub kmer_size: u32,

    /// Output matrix format
    #[clap(short = 'm', long, value_enum, required = true, help_heading = "Core")]
    pub mode: Mode,

    /// Input file header size in bytes, skipped before the first record [integer]
    #[clap(long, default_value = "0", help_heading = "Core")]
    pub header_size: u64,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Minimum abundance to keep a k-mer in a sample [integer or path]
    ///
    /// Either a single threshold shared by all samples, or a path to a
    /// file with one integer per line in sample order.
    #[clap(long, alias = "amin", required = true, help_heading = "Filtering")]
    pub abundance_min: String,

    /// Minimum number of samples a k-mer must be solid in [integer]
    #[clap(long, alias = "rmin", value_parser = value_parser!(u32).range(1..), required = true, help_heading = "Filtering")]
    pub recurrence_min: u32,

    /// Keep a non-recurrent k-mer if it occurs in at least this many samples (0 disables) [integer]
    #[clap(long, default_value = "0", help_heading = "Filtering")]
    pub save_if: u32,
}

/// Output matrix format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Textual k-mer followed by space-separated counts
    Ascii,
    /// Binary count matrix
    Bin,
    /// Presence/absence matrix
    Pa,
    /// Dense hash-indexed bit matrix
    Bf,
    /// Dense bit matrix plus its bit-level transpose
    #[value(name = "bf_trp")]
    BfTrp,
}

impl Mode {
    /// Whether the merger must populate the packed presence bits.
    pub fn needs_bits(self) -> bool {
        matches!(self, Mode::Pa | Mode::Bf | Mode::BfTrp)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Ascii => "ascii",
            Mode::Bin => "bin",
            Mode::Pa => "pa",
            Mode::Bf => "bf",
            Mode::BfTrp => "bf_trp",
        }
    }
}
