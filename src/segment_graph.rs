use std::collections::{BTreeMap, BTreeSet};

use crate::genome_segment::Segment;
use crate::int_range::get_int_range_distance;

/// Edge weights keyed by unordered segment id pair, stored as (lower, higher)
///
pub type EdgeMap = BTreeMap<(u32, u32), u32>;

/// Global projection of tumor clip observations onto accepted segments, split by mate
///
/// Each entry is (read-name hash, segment id).
///
#[derive(Default)]
pub struct ClipSegmentRecords {
    pub mate1: Vec<(u64, u32)>,
    pub mate2: Vec<(u64, u32)>,
}

/// Turn shared read-name runs into segment-to-segment edge support
///
/// The record list is sorted by hash so that clips from the same read name form a contiguous run;
/// every ordered pair within a run increments the corresponding unordered edge. Pairs landing in
/// the same segment carry no linkage information and are dropped.
///
pub fn add_split_read_edges(records: &mut [(u64, u32)], edges: &mut EdgeMap) {
    records.sort_unstable();

    let mut run_start = 0;
    while run_start < records.len() {
        let mut run_end = run_start + 1;
        while run_end < records.len() && records[run_end].0 == records[run_start].0 {
            run_end += 1;
        }
        for j in run_start..run_end {
            for k in (j + 1)..run_end {
                let (seg_a, seg_b) = (records[j].1, records[k].1);
                if seg_a == seg_b {
                    continue;
                }
                *edges
                    .entry((seg_a.min(seg_b), seg_a.max(seg_b)))
                    .or_insert(0) += 1;
            }
        }
        run_start = run_end;
    }
}

/// Union-find with path compression and union-by-rank
///
struct DisjointSet {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size as u32).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut pos = x;
        while self.parent[pos as usize] != root {
            let next = self.parent[pos as usize];
            self.parent[pos as usize] = root;
            pos = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        let (low, high) = if self.rank[root_a as usize] < self.rank[root_b as usize] {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[low as usize] = high;
        if self.rank[low as usize] == self.rank[high as usize] {
            self.rank[high as usize] += 1;
        }
    }
}

/// Label connected components over edges of sufficient split-read weight
///
/// Each component is labeled with the minimum segment id among its members, so cluster ids only
/// ever move down from their initial self-id values.
///
pub fn cluster_segments(segments: &mut [Segment], edges: &EdgeMap, min_split: u32) {
    let mut disjoint_set = DisjointSet::new(segments.len());
    for (&(seg_a, seg_b), &weight) in edges.iter() {
        if weight >= min_split {
            disjoint_set.union(seg_a, seg_b);
        }
    }

    let mut component_label = vec![u32::MAX; segments.len()];
    for segment in segments.iter_mut() {
        let root = disjoint_set.find(segment.id) as usize;
        if component_label[root] == u32::MAX {
            component_label[root] = segment.id;
        }
        segment.cluster_id = component_label[root];
    }
}

/// Find cluster ids with members spread beyond a single locus
///
/// A cluster is confirmed when some member pair sits on different contigs, or further apart on
/// one contig than any single segment is allowed to span. Singletons and dense-local clusters
/// are rearrangement noise and drop out here.
///
pub fn confirmed_cluster_ids(segments: &[Segment], max_segment_size: u32) -> BTreeSet<u32> {
    let mut cluster_members: BTreeMap<u32, Vec<&Segment>> = BTreeMap::new();
    for segment in segments.iter() {
        cluster_members
            .entry(segment.cluster_id)
            .or_default()
            .push(segment);
    }

    let mut confirmed = BTreeSet::new();
    for (&cluster_id, members) in cluster_members.iter() {
        'pair_scan: for (i, seg_a) in members.iter().enumerate() {
            for seg_b in members[i + 1..].iter() {
                if seg_a.chrom_index != seg_b.chrom_index
                    || get_int_range_distance(&seg_a.range, &seg_b.range)
                        > max_segment_size as usize
                {
                    confirmed.insert(cluster_id);
                    break 'pair_scan;
                }
            }
        }
    }
    confirmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int_range::IntRange;

    fn get_test_segment(id: u32, chrom_index: usize, start: i64, end: i64) -> Segment {
        Segment {
            chrom_index,
            range: IntRange::from_pair(start, end),
            id,
            cluster_id: id,
            estcn: 4.0,
        }
    }

    #[test]
    fn test_add_split_read_edges() {
        let mut records = vec![(700, 0), (900, 1), (700, 1), (800, 0), (900, 0), (800, 1)];
        let mut edges = EdgeMap::new();
        add_split_read_edges(&mut records, &mut edges);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[&(0, 1)], 3);
    }

    #[test]
    fn test_add_split_read_edges_drops_self_pairs() {
        // Multiple clips of one read landing in the same segment make no edge
        let mut records = vec![(700, 2), (700, 2), (800, 2), (800, 3)];
        let mut edges = EdgeMap::new();
        add_split_read_edges(&mut records, &mut edges);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[&(2, 3)], 1);
        assert!(!edges.contains_key(&(2, 2)));
    }

    #[test]
    fn test_add_split_read_edges_unordered_pairs() {
        // The higher segment id seen first still lands on the (lower, higher) key
        let mut records = vec![(700, 5), (700, 1)];
        let mut edges = EdgeMap::new();
        add_split_read_edges(&mut records, &mut edges);
        assert_eq!(edges[&(1, 5)], 1);
    }

    #[test]
    fn test_cluster_segments() {
        let mut segments = vec![
            get_test_segment(0, 0, 10000, 10500),
            get_test_segment(1, 0, 200000, 200500),
            get_test_segment(2, 1, 50000, 50400),
            get_test_segment(3, 1, 900000, 900400),
        ];
        let mut edges = EdgeMap::new();
        edges.insert((0, 1), 3);
        edges.insert((1, 2), 4);
        edges.insert((2, 3), 2); // below threshold

        cluster_segments(&mut segments, &edges, 3);

        assert_eq!(segments[0].cluster_id, 0);
        assert_eq!(segments[1].cluster_id, 0);
        assert_eq!(segments[2].cluster_id, 0);
        assert_eq!(segments[3].cluster_id, 3);
    }

    #[test]
    fn test_cluster_label_is_minimum_member_id() {
        let mut segments = (0..4)
            .map(|id| get_test_segment(id, 0, 1000 * (id as i64 + 1), 1000 * (id as i64 + 1) + 200))
            .collect::<Vec<_>>();
        let mut edges = EdgeMap::new();
        edges.insert((2, 3), 5);
        edges.insert((1, 2), 5);

        cluster_segments(&mut segments, &edges, 3);

        assert_eq!(segments[0].cluster_id, 0);
        assert_eq!(segments[1].cluster_id, 1);
        assert_eq!(segments[2].cluster_id, 1);
        assert_eq!(segments[3].cluster_id, 1);
    }

    #[test]
    fn test_confirmed_cluster_ids() {
        let mut segments = vec![
            // Well separated same-contig pair
            get_test_segment(0, 0, 10000, 10500),
            get_test_segment(1, 0, 200000, 200500),
            // Colocated pair
            get_test_segment(2, 1, 50000, 50400),
            get_test_segment(3, 1, 51000, 51400),
            // Singleton
            get_test_segment(4, 2, 70000, 70300),
        ];
        for segment in segments.iter_mut() {
            if segment.id == 1 {
                segment.cluster_id = 0;
            }
            if segment.id == 3 {
                segment.cluster_id = 2;
            }
        }

        let confirmed = confirmed_cluster_ids(&segments, 10000);
        assert!(confirmed.contains(&0));
        assert!(!confirmed.contains(&2));
        assert!(!confirmed.contains(&4));
    }

    #[test]
    fn test_confirmed_cluster_ids_cross_contig() {
        let mut segments = vec![
            get_test_segment(0, 0, 50000, 50400),
            get_test_segment(1, 1, 50000, 50400),
        ];
        segments[1].cluster_id = 0;

        let confirmed = confirmed_cluster_ids(&segments, 10000);
        assert!(confirmed.contains(&0));
    }
}
