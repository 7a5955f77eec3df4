use std::fs::File;

use bio::io::fasta;
use bitvec::prelude::*;
use camino::Utf8Path;
use unwrap::unwrap;

/// Bitset marking the ambiguous ('N') bases of one contig
///
/// Coverage windows overlapping any masked position are rejected by the depth model, so telomere
/// and assembly-gap runs never contribute to background or candidate statistics.
///
pub struct NMask {
    mask: BitVec,
}

impl NMask {
    pub fn from_seq(seq: &[u8]) -> Self {
        let mut mask = bitvec![0; seq.len()];
        for (pos, &base) in seq.iter().enumerate() {
            if matches!(base, b'N' | b'n') {
                mask.set(pos, true);
            }
        }
        Self { mask }
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn is_masked(&self, pos: usize) -> bool {
        self.mask[pos]
    }
}

pub fn open_indexed_fasta(filename: &Utf8Path) -> fasta::IndexedReader<File> {
    unwrap!(
        fasta::IndexedReader::from_file(&filename.as_std_path()),
        "Unable to open indexed reference fasta file: '{filename}'"
    )
}

/// Fetch one contig from the reference and reduce it to its N-mask
///
/// The contig length observed in the fasta index must match `expected_len` from the alignment
/// header, otherwise the reference and the alignment files disagree.
///
pub fn get_contig_nmask(
    fasta_reader: &mut fasta::IndexedReader<File>,
    chrom_label: &str,
    expected_len: usize,
) -> NMask {
    let mut seq = Vec::new();
    unwrap!(
        fasta_reader.fetch_all(chrom_label),
        "Can't find contig '{chrom_label}' in the reference fasta index"
    );
    unwrap!(
        fasta_reader.read(&mut seq),
        "Failed to read contig '{chrom_label}' from the reference fasta"
    );
    let nmask = NMask::from_seq(&seq);
    if nmask.len() != expected_len {
        panic!(
            "Reference contig '{chrom_label}' length ({}) conflicts with the alignment header ({expected_len})",
            nmask.len()
        );
    }
    nmask
}
