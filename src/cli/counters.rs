/// Row-level tallies maintained by the merger across one partition.
#[derive(Debug, Default)]
pub struct MergeCounters {
    /// Rows that failed the recurrence test.
    pub non_solid: u64,
    /// Non-recurrent rows kept by the save-if rescue.
    pub saved: u64,
    /// Rows kept as recurrent.
    pub total: u64,
    /// Recurrent plus rescued rows.
    pub total_w_saved: u64,
}
