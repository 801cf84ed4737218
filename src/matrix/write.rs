use anyhow::{ensure, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::cli::io::HashWindow;
use crate::matrix::kmer_codec::decode_kmer;
use crate::matrix::merger::Merger;

/// Fixed header of count and presence/absence matrices.
///
/// All integers little-endian. `vlen` is 0 for count matrices and the
/// packed row width in bytes for presence/absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixHeader {
    pub partition: u32,
    pub nb_samples: u32,
    pub kmer_size: u32,
    pub vlen: u32,
    pub reserved: u64,
}

impl MatrixHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.partition)?;
        w.write_u32::<LittleEndian>(self.nb_samples)?;
        w.write_u32::<LittleEndian>(self.kmer_size)?;
        w.write_u32::<LittleEndian>(self.vlen)?;
        w.write_u64::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            partition: r.read_u32::<LittleEndian>()?,
            nb_samples: r.read_u32::<LittleEndian>()?,
            kmer_size: r.read_u32::<LittleEndian>()?,
            vlen: r.read_u32::<LittleEndian>()?,
            reserved: r.read_u64::<LittleEndian>()?,
        })
    }
}

/// Fixed header of dense bit matrices.
///
/// `nb_cols` is in bits, `vlen = ceil(nb_cols / 8)` in bytes. The
/// transposed artifact uses the same schema with rows and columns swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitMatrixHeader {
    pub partition: u32,
    pub kmer_size: u32,
    pub nb_rows: u64,
    pub nb_cols: u64,
    pub vlen: u32,
    pub reserved: u64,
}

impl BitMatrixHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.partition)?;
        w.write_u32::<LittleEndian>(self.kmer_size)?;
        w.write_u64::<LittleEndian>(self.nb_rows)?;
        w.write_u64::<LittleEndian>(self.nb_cols)?;
        w.write_u32::<LittleEndian>(self.vlen)?;
        w.write_u64::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            partition: r.read_u32::<LittleEndian>()?,
            kmer_size: r.read_u32::<LittleEndian>()?,
            nb_rows: r.read_u64::<LittleEndian>()?,
            nb_cols: r.read_u64::<LittleEndian>()?,
            vlen: r.read_u32::<LittleEndian>()?,
            reserved: r.read_u64::<LittleEndian>()?,
        })
    }
}

/// Run `write` against a buffered temp file in `path`'s directory and
/// persist it to `path` only on success, so an aborted run never leaves
/// a partial artifact at the final name.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<()>,
{
    let dir = path
        .parent()
        .with_context(|| format!("output path {:?} has no parent directory", path))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {:?}", dir))?;
    {
        let mut out = BufWriter::new(&mut tmp);
        write(&mut out)?;
        out.flush()
            .with_context(|| format!("flushing output for {:?}", path))?;
    }
    tmp.persist(path)
        .with_context(|| format!("persisting output {:?}", path))?;
    Ok(())
}

/// Drive the merger to exhaustion, writing kept rows as
/// `<kmer> c0 c1 ... cN-1` text lines. No header.
pub fn merge_to_ascii(m: &mut Merger, path: &Path, kmer_size: u32) -> Result<()> {
    write_atomic(path, |out| {
        while let Some(row) = m.next_row()? {
            if !row.keep {
                continue;
            }
            write!(out, "{}", decode_kmer(row.hash, kmer_size as usize))?;
            for c in &row.counts {
                write!(out, " {}", c)?;
            }
            writeln!(out)?;
        }
        Ok(())
    })
}

/// Binary count matrix: header, then `hash ‖ count[0..N)` per kept row.
pub fn merge_to_bin(m: &mut Merger, path: &Path, partition: u32, kmer_size: u32) -> Result<()> {
    let header = MatrixHeader {
        partition,
        nb_samples: m.nb_samples() as u32,
        kmer_size,
        vlen: 0,
        reserved: 0,
    };
    write_atomic(path, |out| {
        header.write_to(out)?;
        while let Some(row) = m.next_row()? {
            if !row.keep {
                continue;
            }
            out.write_u64::<LittleEndian>(row.hash)?;
            for &c in &row.counts {
                out.write_u32::<LittleEndian>(c)?;
            }
        }
        Ok(())
    })
}

/// Presence/absence matrix: header, then `hash ‖ packed bits` per kept row.
pub fn merge_to_pa(m: &mut Merger, path: &Path, partition: u32, kmer_size: u32) -> Result<()> {
    let header = MatrixHeader {
        partition,
        nb_samples: m.nb_samples() as u32,
        kmer_size,
        vlen: m.vlen() as u32,
        reserved: 0,
    };
    write_atomic(path, |out| {
        header.write_to(out)?;
        while let Some(row) = m.next_row()? {
            if !row.keep {
                continue;
            }
            out.write_u64::<LittleEndian>(row.hash)?;
            out.write_all(&row.bits)?;
        }
        Ok(())
    })
}

/// Dense hash-indexed bit matrix: exactly `upper − lower + 1` rows of
/// `vlen` bytes, one per hash of the partition window in ascending
/// order, zero rows for hashes that are absent or filtered out.
pub fn merge_to_bf(
    m: &mut Merger,
    path: &Path,
    partition: u32,
    kmer_size: u32,
    window: HashWindow,
) -> Result<()> {
    let width = (window.upper - window.lower)
        .checked_add(1)
        .context("partition window covers the full hash space")?;
    let vlen = m.vlen();
    let header = BitMatrixHeader {
        partition,
        kmer_size,
        nb_rows: width,
        nb_cols: m.nb_samples() as u64,
        vlen: vlen as u32,
        reserved: 0,
    };
    let empty = vec![0u8; vlen];
    write_atomic(path, |out| {
        header.write_to(out)?;
        let mut current = window.lower;
        let mut written: u64 = 0;
        while let Some(row) = m.next_row()? {
            // The merger already bounds row.hash to the window
            for _ in 0..row.hash - current {
                out.write_all(&empty)?;
                written += 1;
            }
            if row.keep {
                out.write_all(&row.bits)?;
            } else {
                out.write_all(&empty)?;
            }
            written += 1;
            current = row.hash.wrapping_add(1);
        }
        while written < width {
            out.write_all(&empty)?;
            written += 1;
        }
        ensure!(
            written == width,
            "bit matrix of partition {} holds {} rows, window width is {}",
            partition,
            written,
            width
        );
        Ok(())
    })
}
