use anyhow::{bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::cli::{Count, Hash};

/// Bytes per input record: `u64` hash followed by `u32` count.
pub const RECORD_BYTES: usize = 8 + 4;

/// Forward reader over one sample's sorted (hash, count) records.
///
/// * `peek`    – next record without consuming it
/// * `advance` – consume the peeked record
/// * `eof`     – true once the stream is exhausted
///
/// Records must arrive in strictly ascending hash order; a violation is
/// fatal and reported with the sample index.
pub struct SampleReader {
    sample: usize,
    input: BufReader<File>,
    head: Option<(Hash, Count)>,
    last_hash: Option<Hash>,
}

impl SampleReader {
    /// Open a sample file, skip its header, and position on the first record.
    ///
    /// * `sample`      – position in the file-of-files, fixed for the run
    /// * `header_size` – bytes to skip before the first record (may be 0)
    pub fn open(path: &Path, sample: usize, header_size: u64) -> Result<Self> {
        let f = File::open(path)
            .with_context(|| format!("opening input of sample {}: {:?}", sample, path))?;
        let mut input = BufReader::new(f);
        if header_size > 0 {
            let skipped = io::copy(&mut (&mut input).take(header_size), &mut io::sink())
                .with_context(|| format!("skipping header of sample {}", sample))?;
            if skipped < header_size {
                bail!(
                    "input of sample {} is shorter than its {}-byte header",
                    sample,
                    header_size
                );
            }
        }
        let mut rd = Self {
            sample,
            input,
            head: None,
            last_hash: None,
        };
        rd.head = rd.read_record()?;
        Ok(rd)
    }

    /// Next record, if any, without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<(Hash, Count)> {
        self.head
    }

    /// Consume the peeked record and pre-read the following one.
    pub fn advance(&mut self) -> Result<()> {
        self.head = self.read_record()?;
        Ok(())
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.head.is_none()
    }

    pub fn sample(&self) -> usize {
        self.sample
    }

    /// Pull one record off the stream.
    ///
    /// Clean EOF yields `None`; a record cut short is an error.
    fn read_record(&mut self) -> Result<Option<(Hash, Count)>> {
        let mut buf = [0u8; RECORD_BYTES];
        let mut filled = 0;
        while filled < RECORD_BYTES {
            let n = match self.input.read(&mut buf[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("reading input of sample {}", self.sample))
                }
            };
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < RECORD_BYTES {
            bail!(
                "truncated record in sample {}: got {} of {} bytes",
                self.sample,
                filled,
                RECORD_BYTES
            );
        }
        let hash = LittleEndian::read_u64(&buf[..8]);
        let count = LittleEndian::read_u32(&buf[8..]);
        if let Some(prev) = self.last_hash {
            if hash <= prev {
                bail!(
                    "unsorted input in sample {}: hash {:#x} after {:#x}",
                    self.sample,
                    hash,
                    prev
                );
            }
        }
        self.last_hash = Some(hash);
        Ok(Some((hash, count)))
    }
}
