use std::collections::BTreeSet;
use std::io::Write;

use itertools::Itertools;

use crate::chrom_list::ChromList;
use crate::genome_segment::Segment;
use crate::segment_graph::EdgeMap;

/// Edge list column for one node: comma-separated `(i,j)=w` over edges toward later node ids
///
fn get_node_edge_field(node_id: u32, edges: &EdgeMap) -> String {
    let edge_list = edges
        .range((node_id, 0)..=(node_id, u32::MAX))
        .map(|(&(from, to), &weight)| format!("({from},{to})={weight}"))
        .join(",");
    if edge_list.is_empty() {
        ".".to_string()
    } else {
        edge_list
    }
}

/// Write the confirmed segment table
///
/// One row per confirmed segment in (contig, start) order. The caller decides the stream; in the
/// production flow this is stderr, keeping the result table separate from the log channel.
///
pub fn write_segment_table<W: Write>(
    f: &mut W,
    chrom_list: &ChromList,
    segments: &[Segment],
    edges: &EdgeMap,
    confirmed_clusters: &BTreeSet<u32>,
) {
    writeln!(f, "chr\tstart\tend\tnodeid\testcn\tclusterid\tedges").unwrap();
    for segment in segments.iter() {
        if !confirmed_clusters.contains(&segment.cluster_id) {
            continue;
        }
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{:.4}\t{}\t{}",
            chrom_list.data[segment.chrom_index].label,
            segment.range.start,
            segment.range.end,
            segment.id,
            segment.estcn,
            segment.cluster_id,
            get_node_edge_field(segment.id, edges),
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int_range::IntRange;

    fn get_test_chrom_list() -> ChromList {
        let mut chrom_list = ChromList::default();
        chrom_list.add_chrom("chr1", 100000000);
        chrom_list.add_chrom("chr2", 100000000);
        chrom_list
    }

    fn get_test_segment(id: u32, chrom_index: usize, start: i64, end: i64, estcn: f64) -> Segment {
        Segment {
            chrom_index,
            range: IntRange::from_pair(start, end),
            id,
            cluster_id: 0,
            estcn,
        }
    }

    #[test]
    fn test_write_segment_table() {
        let chrom_list = get_test_chrom_list();
        let segments = vec![
            get_test_segment(0, 0, 10000, 10500, 8.0),
            get_test_segment(1, 0, 200000, 200500, 8.5),
        ];
        let mut edges = EdgeMap::new();
        edges.insert((0, 1), 3);
        let confirmed = BTreeSet::from([0]);

        let mut output = Vec::new();
        write_segment_table(&mut output, &chrom_list, &segments, &edges, &confirmed);

        let expected = "chr\tstart\tend\tnodeid\testcn\tclusterid\tedges\n\
            chr1\t10000\t10500\t0\t8.0000\t0\t(0,1)=3\n\
            chr1\t200000\t200500\t1\t8.5000\t0\t.\n";
        assert_eq!(std::str::from_utf8(&output).unwrap(), expected);
    }

    #[test]
    fn test_write_segment_table_skips_unconfirmed() {
        let chrom_list = get_test_chrom_list();
        let mut segments = vec![get_test_segment(0, 1, 10000, 10500, 8.0)];
        segments[0].cluster_id = 0;
        let edges = EdgeMap::new();
        let confirmed = BTreeSet::new();

        let mut output = Vec::new();
        write_segment_table(&mut output, &chrom_list, &segments, &edges, &confirmed);

        // Header only: a singleton cluster produces no data rows
        assert_eq!(
            std::str::from_utf8(&output).unwrap(),
            "chr\tstart\tend\tnodeid\testcn\tclusterid\tedges\n"
        );
    }
}
