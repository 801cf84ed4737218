use anyhow::{ensure, Context, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::matrix::write::{write_atomic, BitMatrixHeader};

/// Bit matrix with rows packed into bytes: bit (r, c) sits at byte
/// `c / 8`, bit `c % 8` of row r — the same convention as the packed
/// presence vector.
pub struct BitMatrix {
    nb_rows: u64,
    nb_cols: u64,
    data: Array2<u8>,
}

impl BitMatrix {
    pub fn zeros(nb_rows: u64, nb_cols: u64) -> Self {
        let row_bytes = nb_cols.div_ceil(8) as usize;
        Self {
            nb_rows,
            nb_cols,
            data: Array2::zeros((nb_rows as usize, row_bytes)),
        }
    }

    pub fn nb_rows(&self) -> u64 {
        self.nb_rows
    }

    pub fn nb_cols(&self) -> u64 {
        self.nb_cols
    }

    #[inline]
    pub fn get(&self, r: u64, c: u64) -> bool {
        self.data[[r as usize, (c / 8) as usize]] >> (c % 8) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, r: u64, c: u64) {
        self.data[[r as usize, (c / 8) as usize]] |= 1 << (c % 8);
    }

    /// Read a dense bit-matrix file (header plus rows) back into memory.
    pub fn load(path: &Path) -> Result<(BitMatrixHeader, Self)> {
        let f = File::open(path).with_context(|| format!("opening bit matrix {:?}", path))?;
        let mut input = BufReader::new(f);
        let header = BitMatrixHeader::read_from(&mut input)
            .with_context(|| format!("reading bit-matrix header of {:?}", path))?;
        ensure!(
            header.vlen as u64 == header.nb_cols.div_ceil(8),
            "bit-matrix header of {:?} is inconsistent: vlen {} for {} columns",
            path,
            header.vlen,
            header.nb_cols
        );
        let mut mat = Self::zeros(header.nb_rows, header.nb_cols);
        // Freshly allocated arrays are standard layout, so the backing
        // slice always exists
        let buf = mat.data.as_slice_mut().unwrap();
        input
            .read_exact(buf)
            .with_context(|| format!("reading {} bit-matrix rows of {:?}", header.nb_rows, path))?;
        Ok((header, mat))
    }

    /// Bit-level transpose: output bit (c, r) for every set input bit
    /// (r, c). Zero input bytes are skipped, which keeps sparse
    /// partitions cheap.
    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.nb_cols, self.nb_rows);
        for (r, row) in self.data.outer_iter().enumerate() {
            for (byte_idx, &byte) in row.iter().enumerate() {
                if byte == 0 {
                    continue;
                }
                for bit in 0..8 {
                    if byte >> bit & 1 == 1 {
                        let c = (byte_idx * 8 + bit) as u64;
                        if c >= self.nb_cols {
                            break;
                        }
                        out.set(c, r as u64);
                    }
                }
            }
        }
        out
    }

    /// Write the matrix in the dense bit-matrix layout.
    pub fn dump(&self, path: &Path, partition: u32, kmer_size: u32) -> Result<()> {
        let header = BitMatrixHeader {
            partition,
            kmer_size,
            nb_rows: self.nb_rows,
            nb_cols: self.nb_cols,
            vlen: self.nb_cols.div_ceil(8) as u32,
            reserved: 0,
        };
        write_atomic(path, |out| {
            header.write_to(out)?;
            // Standard layout, see load()
            out.write_all(self.data.as_slice().unwrap())?;
            Ok(())
        })
    }
}

/// Read the dense bit matrix at `input` and write its bit-level
/// transpose to `output`, header dimensions swapped.
pub fn transpose_matrix(input: &Path, output: &Path) -> Result<()> {
    let (header, mat) = BitMatrix::load(input)?;
    let trp = mat.transpose();
    trp.dump(output, header.partition, header.kmer_size)?;
    Ok(())
}
