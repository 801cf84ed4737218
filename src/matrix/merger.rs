use anyhow::{ensure, Result};
use smallvec::{smallvec, SmallVec};
use std::fmt;

use crate::cli::counters::MergeCounters;
use crate::cli::io::HashWindow;
use crate::cli::{Count, Hash};
use crate::matrix::reader::SampleReader;

/// Abundance thresholds: one scalar shared by all samples, or one value
/// per sample in fof order.
#[derive(Debug, Clone)]
pub enum AbundancePolicy {
    Uniform(Count),
    PerSample(Vec<Count>),
}

impl AbundancePolicy {
    #[inline]
    pub fn threshold(&self, sample: usize) -> Count {
        match self {
            AbundancePolicy::Uniform(a) => *a,
            AbundancePolicy::PerSample(v) => v[sample],
        }
    }
}

impl fmt::Display for AbundancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbundancePolicy::Uniform(a) => write!(f, "{}", a),
            AbundancePolicy::PerSample(v) => write!(f, "per-sample ({} values)", v.len()),
        }
    }
}

/// One output row of the merge.
///
/// Rows that fail the filters are still yielded with `keep = false`: the
/// dense encoder needs their hash position, everyone else drops them.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub hash: Hash,
    /// Raw count per sample; 0 where the sample does not contain the hash.
    pub counts: SmallVec<[Count; 16]>,
    /// Packed presence bits: sample `i` at byte `i / 8`, bit `i % 8`,
    /// final byte zero-padded. Set only for solid samples.
    pub bits: Vec<u8>,
    /// Samples meeting their abundance threshold.
    pub solid_count: u32,
    /// Samples containing the hash at all.
    pub total_count: u32,
    /// Whether encoders should write this row's payload.
    pub keep: bool,
}

/// K-way merge over N sorted sample streams.
///
/// Yields rows in strictly ascending hash order, each distinct hash at
/// most once, terminating when every stream is exhausted. A row is kept
/// when it is solid in at least `min_r` samples, or — with `save_if > 0`
/// — rescued when it occurs in at least `save_if` samples overall.
pub struct Merger {
    readers: Vec<SampleReader>,
    policy: AbundancePolicy,
    min_r: u32,
    save_if: u32,
    set_bits: bool,
    window: HashWindow,
    vlen: usize,
    counters: MergeCounters,
}

impl Merger {
    /// * `set_bits` – populate the packed presence vector; pure count
    ///                outputs pass false and skip the work
    pub fn new(
        readers: Vec<SampleReader>,
        policy: AbundancePolicy,
        min_r: u32,
        save_if: u32,
        set_bits: bool,
        window: HashWindow,
    ) -> Result<Self> {
        let nb_samples = readers.len();
        ensure!(nb_samples > 0, "no input streams to merge");
        ensure!(min_r >= 1, "recurrence min must be at least 1, got {}", min_r);
        ensure!(
            window.lower <= window.upper,
            "inverted partition window [{:#x}, {:#x}]",
            window.lower,
            window.upper
        );
        if let AbundancePolicy::PerSample(v) = &policy {
            ensure!(
                v.len() == nb_samples,
                "abundance vector holds {} thresholds for {} samples",
                v.len(),
                nb_samples
            );
        }
        Ok(Self {
            readers,
            policy,
            min_r,
            save_if,
            set_bits,
            window,
            vlen: nb_samples.div_ceil(8),
            counters: MergeCounters::default(),
        })
    }

    pub fn nb_samples(&self) -> usize {
        self.readers.len()
    }

    /// Bytes per packed presence row.
    pub fn vlen(&self) -> usize {
        self.vlen
    }

    pub fn counters(&self) -> &MergeCounters {
        &self.counters
    }

    /// Produce the next merged row, or `None` once every stream is drained.
    pub fn next_row(&mut self) -> Result<Option<MergedRow>> {
        // Smallest head hash across the non-exhausted readers
        let hash = match self
            .readers
            .iter()
            .filter_map(|r| r.peek())
            .map(|(h, _)| h)
            .min()
        {
            Some(h) => h,
            None => return Ok(None),
        };
        ensure!(
            self.window.lower <= hash && hash <= self.window.upper,
            "hash {:#x} outside partition window [{:#x}, {:#x}]",
            hash,
            self.window.lower,
            self.window.upper
        );

        let nb_samples = self.readers.len();
        let mut counts: SmallVec<[Count; 16]> = smallvec![0; nb_samples];
        let mut bits = vec![0u8; self.vlen];
        let mut solid_count = 0u32;
        let mut total_count = 0u32;

        // Consume every reader sitting on this hash; each sample owns its
        // own slot, so consumption order is immaterial.
        for i in 0..nb_samples {
            let Some((h, count)) = self.readers[i].peek() else {
                continue;
            };
            if h != hash {
                continue;
            }
            counts[i] = count;
            total_count += 1;
            if count >= self.policy.threshold(i) {
                solid_count += 1;
                if self.set_bits {
                    bits[i / 8] |= 1 << (i % 8);
                }
            }
            self.readers[i].advance()?;
        }
        debug_assert!(solid_count as usize <= nb_samples);

        let keep = if solid_count >= self.min_r {
            self.counters.total += 1;
            self.counters.total_w_saved += 1;
            true
        } else {
            self.counters.non_solid += 1;
            if self.save_if > 0 && total_count >= self.save_if {
                self.counters.saved += 1;
                self.counters.total_w_saved += 1;
                true
            } else {
                false
            }
        };

        Ok(Some(MergedRow {
            hash,
            counts,
            bits,
            solid_count,
            total_count,
            keep,
        }))
    }
}
