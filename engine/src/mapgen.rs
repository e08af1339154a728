// ═══════════════════════════════════════════════════════════════════════
// Map generator — random contiguous region tiling on a bounded grid
//
// Rectangles are dropped onto the grid one at a time; each must overlap
// an already-placed region's footprint, then is shrunk in random
// directions until it no longer overlaps. The shrink guarantees the new
// region borders the one it overlapped, so the finished map is connected.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Attempts allowed before a generation run is scrapped and restarted.
const PLACEMENT_RETRIES: u32 = 2500;

/// Target region count for a player count.
pub fn needed_regions(player_count: usize) -> usize {
    13 + 3 * player_count
}

struct Bounds {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

/// Generate a connected map for the given player count. Randomized, but
/// always terminates with a valid result: dead-end runs are discarded and
/// restarted from empty.
pub fn generate_map(player_count: usize, rng: &mut ChaCha8Rng) -> MapGraph {
    assert!((2..=4).contains(&player_count), "player count must be 2-4");
    let max_region_size = (11 - player_count) as i32;
    let needed = needed_regions(player_count);

    loop {
        // grid[x][y] = index of the region occupying that cell
        let mut grid: Vec<Vec<Option<u8>>> = vec![vec![None; MAP_HEIGHT]; MAP_WIDTH];
        let mut count: usize = 0;
        let mut retries = PLACEMENT_RETRIES;

        while count < needed && retries > 0 {
            retries -= 1;

            let mut bounds = Bounds {
                left: rng.gen_range(1..(MAP_WIDTH as i32 - max_region_size + 1)),
                top: rng.gen_range(1..(MAP_HEIGHT as i32 - max_region_size + 1)),
                width: rng.gen_range(3..max_region_size),
                height: rng.gen_range(3..max_region_size),
            };

            // every region after the first must touch the existing map
            if count > 0 && !overlaps(&grid, &bounds) {
                continue;
            }

            loop {
                if shrink(&mut bounds, rng) {
                    break; // shrunk below the minimum area, give up on it
                }
                if !overlaps(&grid, &bounds) {
                    stamp(&mut grid, &bounds, count as u8);
                    count += 1;
                    break;
                }
            }
        }

        if count == needed {
            return build_graph(&grid, needed);
        }
    }
}

/// Shrink the bounds one step in a random direction. Returns true once
/// the rectangle has become too small to keep.
fn shrink(bounds: &mut Bounds, rng: &mut ChaCha8Rng) -> bool {
    let r = rng.gen_range(0..4);
    if r % 2 == 1 {
        bounds.width -= 1;
    } else {
        bounds.height -= 1;
    }
    if r == 2 {
        bounds.top += 1;
    }
    if r == 3 {
        bounds.left += 1;
    }
    bounds.width * bounds.height < 9
}

fn overlaps(grid: &[Vec<Option<u8>>], bounds: &Bounds) -> bool {
    for x in bounds.left..bounds.left + bounds.width {
        for y in bounds.top..bounds.top + bounds.height {
            if grid[x as usize][y as usize].is_some() {
                return true;
            }
        }
    }
    false
}

fn stamp(grid: &mut [Vec<Option<u8>>], bounds: &Bounds, region: u8) {
    for x in bounds.left..bounds.left + bounds.width {
        for y in bounds.top..bounds.top + bounds.height {
            grid[x as usize][y as usize] = Some(region);
        }
    }
}

/// Derive the adjacency graph by scanning the grid for axis-adjacent cells
/// belonging to different regions.
fn build_graph(grid: &[Vec<Option<u8>>], region_count: usize) -> MapGraph {
    let mut neighbors: Vec<Vec<RegionId>> = vec![Vec::new(); region_count];

    for x in 1..MAP_WIDTH - 1 {
        for y in 1..MAP_HEIGHT - 1 {
            let Some(region) = grid[x][y] else { continue };
            for (dx, dy) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                if let Some(other) = grid[nx][ny] {
                    if other != region {
                        link(&mut neighbors, region, other);
                    }
                }
            }
        }
    }

    MapGraph {
        regions: neighbors
            .into_iter()
            .enumerate()
            .map(|(i, n)| RegionDef { id: RegionId(i as u8), neighbors: n })
            .collect(),
    }
}

fn link(neighbors: &mut [Vec<RegionId>], a: u8, b: u8) {
    if !neighbors[a as usize].contains(&RegionId(b)) {
        neighbors[a as usize].push(RegionId(b));
    }
    if !neighbors[b as usize].contains(&RegionId(a)) {
        neighbors[b as usize].push(RegionId(a));
    }
}
