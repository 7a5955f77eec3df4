use rust_htslib::bam;

pub struct ChromInfo {
    pub label: String,
    pub length: u64,
}

/// Chromosome names and lengths in alignment-file header order
///
/// The index of each chromosome in `data` matches the tid indexing scheme of the alignment file
/// the list was built from.
///
#[derive(Default)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,
}

impl ChromList {
    pub fn add_chrom(&mut self, label: &str, length: u64) {
        self.data.push(ChromInfo {
            label: label.to_string(),
            length,
        });
    }

    pub fn from_bam_header(header: &bam::HeaderView) -> Self {
        let mut chrom_list = Self::default();
        for tid in 0..header.target_count() {
            let label = std::str::from_utf8(header.tid2name(tid)).unwrap();
            let length = header.target_len(tid).unwrap();
            chrom_list.add_chrom(label, length);
        }
        chrom_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::{header, Header, HeaderView};

    #[test]
    fn test_from_bam_header() {
        let mut _header = Header::new();
        _header.push_record(
            header::HeaderRecord::new(b"SQ")
                .push_tag(b"SN", "chr1")
                .push_tag(b"LN", 10000000),
        );
        _header.push_record(
            header::HeaderRecord::new(b"SQ")
                .push_tag(b"SN", "chr2")
                .push_tag(b"LN", 20000000),
        );
        let header = HeaderView::from_header(&_header);

        let chrom_list = ChromList::from_bam_header(&header);
        assert_eq!(chrom_list.data.len(), 2);
        assert_eq!(chrom_list.data[0].label, "chr1");
        assert_eq!(chrom_list.data[1].label, "chr2");
        assert_eq!(chrom_list.data[1].length, 20000000);
    }
}
