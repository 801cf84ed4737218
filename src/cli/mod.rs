pub mod counters;
pub mod io;
pub mod opts;

/// 64-bit k-mer hash; the sort key of every stream and matrix row.
pub type Hash = u64;

/// Per-sample abundance of one k-mer.
pub type Count = u32;
