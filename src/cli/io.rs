use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::cli::{Count, Hash};

/// Path layout of one pipeline run directory.
///
/// The orchestrator lays inputs and outputs out under a shared root;
/// everything this tool touches is resolved from here.
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Hash-window table shared by all partitions.
    pub fn hash_window_path(&self) -> PathBuf {
        self.root.join("storage").join("hash_window.vec")
    }

    /// File-of-files listing the per-sample inputs of one partition.
    pub fn partition_fof(&self, part_id: u32) -> PathBuf {
        self.root
            .join("storage")
            .join("kmers_partitions")
            .join(format!("partition_{}", part_id))
            .join(format!("partition{}.fof", part_id))
    }

    /// Output directory for one partition's matrix artifacts.
    pub fn matrix_dir(&self, part_id: u32) -> PathBuf {
        self.root
            .join("storage")
            .join("matrix")
            .join(format!("partition_{}", part_id))
    }

    pub fn ascii_matrix(&self, part_id: u32) -> PathBuf {
        self.matrix_dir(part_id)
            .join(format!("ascii_matrix{}.mat", part_id))
    }

    pub fn count_matrix(&self, part_id: u32) -> PathBuf {
        self.matrix_dir(part_id)
            .join(format!("count_matrix{}.mat", part_id))
    }

    pub fn pa_matrix(&self, part_id: u32) -> PathBuf {
        self.matrix_dir(part_id)
            .join(format!("pa_matrix{}.mat", part_id))
    }

    pub fn bf_matrix(&self, part_id: u32) -> PathBuf {
        self.matrix_dir(part_id)
            .join(format!("no_trp_bf{}.mat", part_id))
    }

    pub fn bf_trp_matrix(&self, part_id: u32) -> PathBuf {
        self.matrix_dir(part_id)
            .join(format!("trp_bf{}.mat", part_id))
    }
}

/// Inclusive hash bounds of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashWindow {
    pub lower: Hash,
    pub upper: Hash,
}

/// Read the input paths of one partition, in sample order.
///
/// One path per line; blank lines and `#` comments are skipped.
/// Relative paths are resolved against the fof's own directory.
pub fn read_fof(fof: &Path) -> Result<Vec<PathBuf>> {
    let f = File::open(fof).with_context(|| format!("opening fof {:?}", fof))?;
    let base = fof.parent().unwrap_or_else(|| Path::new("."));
    let mut paths = Vec::new();
    for line in BufReader::new(f).lines() {
        let l = line.with_context(|| format!("reading fof {:?}", fof))?;
        let l = l.trim();
        if l.is_empty() || l.starts_with('#') {
            continue;
        }
        let p = Path::new(l);
        if p.is_absolute() {
            paths.push(p.to_path_buf());
        } else {
            paths.push(base.join(p));
        }
    }
    if paths.is_empty() {
        bail!("fof {:?} lists no input files", fof);
    }
    Ok(paths)
}

/// Load the hash bounds of `part_id` from the hash-window file.
///
/// Format: `u32` partition count, then one `(u64 lower, u64 upper)` pair
/// per partition, little-endian.
pub fn load_hash_window(path: &Path, part_id: u32) -> Result<HashWindow> {
    let f = File::open(path).with_context(|| format!("opening hash-window file {:?}", path))?;
    let mut input = BufReader::new(f);
    let nb_parts = input
        .read_u32::<LittleEndian>()
        .context("reading partition count from hash-window file")?;
    if part_id >= nb_parts {
        bail!(
            "partition id {} out of range: hash-window file describes {} partitions",
            part_id,
            nb_parts
        );
    }
    let mut window = HashWindow { lower: 0, upper: 0 };
    for i in 0..=part_id {
        let lower = input.read_u64::<LittleEndian>()?;
        let upper = input.read_u64::<LittleEndian>()?;
        if lower > upper {
            bail!("hash-window entry {} is inverted: [{:#x}, {:#x}]", i, lower, upper);
        }
        window = HashWindow { lower, upper };
    }
    Ok(window)
}

/// Per-sample abundance thresholds, one integer per line in sample order.
pub fn load_abundance_file(path: &Path) -> Result<Vec<Count>> {
    let f = File::open(path).with_context(|| format!("opening abundance file {:?}", path))?;
    let mut thresholds = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let l = line.with_context(|| format!("reading abundance file {:?}", path))?;
        let l = l.trim();
        if l.is_empty() {
            continue;
        }
        let a: Count = l
            .parse()
            .with_context(|| format!("parsing abundance threshold at line {} of {:?}", i + 1, path))?;
        thresholds.push(a);
    }
    if thresholds.is_empty() {
        bail!("abundance file {:?} holds no thresholds", path);
    }
    Ok(thresholds)
}
