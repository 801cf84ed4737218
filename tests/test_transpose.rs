#[cfg(test)]
mod tests {
    use kmat::cli::io::HashWindow;
    use kmat::matrix::merger::{AbundancePolicy, Merger};
    use kmat::matrix::reader::SampleReader;
    use kmat::matrix::transpose::{transpose_matrix, BitMatrix};
    use kmat::matrix::write::merge_to_bf;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /* --------------------------------------------------------------------- */
    /*  In-memory transpose                                                  */
    /* --------------------------------------------------------------------- */

    #[test]
    fn transpose_moves_every_bit() {
        // 4 rows x 2 columns with bits (0,0), (1,1), (3,0) set
        let mut mat = BitMatrix::zeros(4, 2);
        mat.set(0, 0);
        mat.set(1, 1);
        mat.set(3, 0);

        let trp = mat.transpose();
        assert_eq!(trp.nb_rows(), 2);
        assert_eq!(trp.nb_cols(), 4);

        // Expected set bits: (0,0), (0,3), (1,1)
        for r in 0..2 {
            for c in 0..4 {
                let expected = matches!((r, c), (0, 0) | (0, 3) | (1, 1));
                assert_eq!(trp.get(r, c), expected, "bit ({}, {})", r, c);
            }
        }
    }

    #[test]
    fn double_transpose_is_identity() {
        let mut mat = BitMatrix::zeros(11, 9); // both dims straddle a byte
        for (r, c) in [(0, 0), (0, 8), (3, 5), (7, 7), (10, 8), (10, 0)] {
            mat.set(r, c);
        }

        let back = mat.transpose().transpose();
        assert_eq!(back.nb_rows(), 11);
        assert_eq!(back.nb_cols(), 9);
        for r in 0..11 {
            for c in 0..9 {
                assert_eq!(back.get(r, c), mat.get(r, c), "bit ({}, {})", r, c);
            }
        }
    }

    /* --------------------------------------------------------------------- */
    /*  File round-trip                                                      */
    /* --------------------------------------------------------------------- */

    #[test]
    fn dump_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let mut mat = BitMatrix::zeros(6, 10);
        mat.set(2, 9);
        mat.set(5, 0);

        let path = dir.path().join("mat.bits");
        mat.dump(&path, 4, 21).unwrap();

        let (header, loaded) = BitMatrix::load(&path).unwrap();
        assert_eq!(header.partition, 4);
        assert_eq!(header.kmer_size, 21);
        assert_eq!(header.nb_rows, 6);
        assert_eq!(header.nb_cols, 10);
        assert_eq!(header.vlen, 2);

        for r in 0..6 {
            for c in 0..10 {
                assert_eq!(loaded.get(r, c), mat.get(r, c));
            }
        }
    }

    #[test]
    fn load_rejects_inconsistent_header() {
        let dir = tempdir().unwrap();
        let mut mat = BitMatrix::zeros(2, 10);
        mat.set(0, 0);
        let path = dir.path().join("mat.bits");
        mat.dump(&path, 0, 20).unwrap();

        // Corrupt vlen in place
        let mut bytes = fs::read(&path).unwrap();
        bytes[24] = 7; // vlen field, after partition/kmer_size/nb_rows/nb_cols
        fs::write(&path, bytes).unwrap();

        assert!(BitMatrix::load(&path).is_err());
    }

    /* --------------------------------------------------------------------- */
    /*  End to end: dense matrix then transpose                              */
    /* --------------------------------------------------------------------- */

    fn write_sample(dir: &Path, name: &str, records: &[(u64, u32)]) -> std::path::PathBuf {
        let mut buf = Vec::new();
        for &(h, c) in records {
            buf.extend_from_slice(&h.to_le_bytes());
            buf.extend_from_slice(&c.to_le_bytes());
        }
        let path = dir.join(name);
        fs::write(&path, buf).unwrap();
        path
    }

    #[test]
    fn transposed_matrix_indexes_by_sample() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_sample(dir.path(), "s0.kmers", &[(1, 5)]),
            write_sample(dir.path(), "s1.kmers", &[(1, 5), (3, 5)]),
        ];
        let readers = paths
            .iter()
            .enumerate()
            .map(|(i, p)| SampleReader::open(p, i, 0).unwrap())
            .collect();
        let window = HashWindow { lower: 0, upper: 3 };
        let mut m = Merger::new(readers, AbundancePolicy::Uniform(1), 1, 0, true, window).unwrap();

        let dense_path = dir.path().join("no_trp_bf0.mat");
        let trp_path = dir.path().join("trp_bf0.mat");
        merge_to_bf(&mut m, &dense_path, 0, 20, window).unwrap();
        transpose_matrix(&dense_path, &trp_path).unwrap();

        let (header, trp) = BitMatrix::load(&trp_path).unwrap();
        // Dense was 4 hash rows x 2 sample columns; transposed swaps them
        assert_eq!(header.nb_rows, 2);
        assert_eq!(header.nb_cols, 4);

        // Sample 0 holds hash 1 only; sample 1 holds hashes 1 and 3
        assert!(trp.get(0, 1));
        assert!(!trp.get(0, 3));
        assert!(trp.get(1, 1));
        assert!(trp.get(1, 3));
        assert!(!trp.get(0, 0));
        assert!(!trp.get(1, 2));
    }
}
