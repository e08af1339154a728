// ═══════════════════════════════════════════════════════════════════════
// Distance oracle — memoized all-pairs shortest-path hop counts
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use std::collections::VecDeque;
use std::sync::Arc;

/// Never-reached ceiling used to seed the search bound.
const DISTANCE_BOUND: u32 = 100;

/// Breadth-first hop distances over the region adjacency graph, memoized
/// per region pair. The cache is only a cache: query order never changes
/// an answer.
pub struct DistanceOracle {
    map: Arc<MapGraph>,
    cache: Vec<Option<u32>>, // n*n, symmetric
}

impl DistanceOracle {
    pub fn new(map: Arc<MapGraph>) -> DistanceOracle {
        let n = map.len();
        DistanceOracle { map, cache: vec![None; n * n] }
    }

    /// Hop count between two regions. Symmetric; 0 for a == b.
    pub fn distance(&mut self, a: RegionId, b: RegionId) -> u32 {
        let n = self.map.len();
        if let Some(d) = self.cache[a.0 as usize * n + b.0 as usize] {
            return d;
        }

        // Plain BFS from a, except that any previously memoized distance
        // from an intermediate region to b caps how far we keep looking.
        let mut queue: VecDeque<(RegionId, u32)> = VecDeque::new();
        let mut visited = vec![false; n];
        queue.push_back((a, 0));
        visited[a.0 as usize] = true;

        let mut bound = DISTANCE_BOUND;
        let answer = loop {
            let Some((region, traveled)) = queue.pop_front() else {
                break bound; // unreachable on generated maps
            };
            if region == b {
                break traveled;
            }
            if traveled >= bound {
                break bound;
            }
            if let Some(memoized) = self.cache[region.0 as usize * n + b.0 as usize] {
                bound = bound.min(memoized + traveled);
            }
            for &neighbor in self.map.neighbors(region) {
                if !visited[neighbor.0 as usize] {
                    visited[neighbor.0 as usize] = true;
                    queue.push_back((neighbor, traveled + 1));
                }
            }
        };

        self.cache[a.0 as usize * n + b.0 as usize] = Some(answer);
        self.cache[b.0 as usize * n + a.0 as usize] = Some(answer);
        answer
    }

    /// Smallest pairwise distance within a set of regions. Used to spread
    /// player homes and neutral temples apart.
    pub fn min_pairwise(&mut self, regions: &[RegionId]) -> u32 {
        let mut smallest = DISTANCE_BOUND;
        for i in 0..regions.len() {
            for j in i + 1..regions.len() {
                smallest = smallest.min(self.distance(regions[i], regions[j]));
            }
        }
        smallest
    }
}
