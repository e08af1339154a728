// ═══════════════════════════════════════════════════════════════════════
// Game setup — creates the initial GameState for a slot configuration
// ═══════════════════════════════════════════════════════════════════════

use crate::distance::DistanceOracle;
use crate::engine::add_soldiers;
use crate::mapgen::generate_map;
use crate::types::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Random home-assignment candidates tried before keeping the best.
const HOME_CANDIDATES: usize = 1000;

/// Soldiers garrisoned at every starting temple, player-owned or neutral.
const STARTING_GARRISON: u32 = 3;

// ── Setup record ───────────────────────────────────────────────────────
// Written by the excluded setup/preferences layer; the core only consumes
// it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    Human,
    Ai,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setup {
    /// One entry per player slot (max 4); Off slots are skipped and the
    /// remaining players are reindexed compactly.
    pub slots: Vec<SlotKind>,
    pub ai_level: AiLevel,
}

impl Setup {
    /// All-AI setup for headless play and tests.
    pub fn all_ai(player_count: usize, ai_level: AiLevel) -> Setup {
        Setup { slots: vec![SlotKind::Ai; player_count], ai_level }
    }
}

// ── Initial state ──────────────────────────────────────────────────────

/// Build the initial game state: generate a map, spread player homes as
/// far apart as possible, then place neutral temples that balance distance
/// from every home. Seed-deterministic.
pub fn create_initial_state(setup: &Setup, seed: u64) -> GameState {
    let players: Vec<Player> = setup
        .slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| **slot != SlotKind::Off)
        .enumerate()
        .map(|(index, (slot_index, slot))| Player {
            id: PlayerId(index as u8),
            name: PLAYER_TEMPLATES[slot_index].name.to_string(),
            kind: if *slot == SlotKind::Human { PlayerKind::Human } else { PlayerKind::Ai },
            light: PLAYER_TEMPLATES[slot_index].light.to_string(),
            dark: PLAYER_TEMPLATES[slot_index].dark.to_string(),
        })
        .collect();
    assert!((2..=4).contains(&players.len()), "2-4 participating players required");

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let map = Arc::new(generate_map(players.len(), &mut rng));
    let region_total = map.len();
    let player_total = players.len();

    let mut state = GameState {
        map: Arc::clone(&map),
        players: Arc::new(players),
        config: GameConfig { ai_level: setup.ai_level, ..GameConfig::default() },
        owner: vec![None; region_total],
        temples: vec![None; region_total],
        garrisons: vec![VecDeque::new(); region_total],
        cash: vec![0; player_total],
        turn: TurnState {
            number: 1,
            active: 0,
            moves_left: MOVES_PER_TURN,
            conquered: Vec::new(),
            soldiers_bought: 0,
        },
        outcome: None,
        simulating: None,
        sound_cue: None,
        events: Vec::new(),
        seed,
        rng_counter: 0,
    };

    let mut oracle = DistanceOracle::new(Arc::clone(&map));
    let homes = pick_homes(&map, player_total, &mut oracle, &mut rng);

    for (index, &home) in homes.iter().enumerate() {
        state.owner[home.0 as usize] = Some(PlayerId(index as u8));
        put_temple(&mut state, home);
    }

    place_neutral_temples(&mut state, &homes, &mut oracle);
    state
}

fn put_temple(state: &mut GameState, region: RegionId) {
    state.temples[region.0 as usize] = Some(Temple::new(region));
    add_soldiers(state, region, STARTING_GARRISON);
}

/// Try many random assignments of one home region per player and keep the
/// one whose closest pair of homes is farthest apart.
fn pick_homes(
    map: &MapGraph,
    player_total: usize,
    oracle: &mut DistanceOracle,
    rng: &mut ChaCha8Rng,
) -> Vec<RegionId> {
    let mut best: Vec<RegionId> = Vec::new();
    let mut best_score = 0;

    for _ in 0..HOME_CANDIDATES {
        let candidate: Vec<RegionId> = (0..player_total)
            .map(|_| RegionId(rng.gen_range(0..map.len()) as u8))
            .collect();
        let score = oracle.min_pairwise(&candidate);
        if best.is_empty() || score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

/// Greedily place neutral temples: each pick maximizes the spread between
/// all temples and homes while keeping the summed distance from each home
/// to the temples as equal as possible.
fn place_neutral_temples(state: &mut GameState, homes: &[RegionId], oracle: &mut DistanceOracle) {
    let temple_count = [3, 3, 4][state.player_count() - 2];
    let mut distances_to_temples = vec![0u32; homes.len()];
    let mut temple_regions: Vec<RegionId> = Vec::new();

    for _ in 0..temple_count {
        let mut best: Option<(RegionId, f64)> = None;

        for candidate in state.map.ids() {
            let score =
                temple_score(candidate, homes, &temple_regions, &distances_to_temples, oracle);
            if best.is_none() || score > best.as_ref().expect("just checked").1 {
                best = Some((candidate, score));
            }
        }

        let (region, _) = best.expect("maps always have regions");
        put_temple(state, region);
        for (index, &home) in homes.iter().enumerate() {
            distances_to_temples[index] += oracle.distance(home, region);
        }
        temple_regions.push(region);
    }
}

fn temple_score(
    candidate: RegionId,
    homes: &[RegionId],
    temple_regions: &[RegionId],
    distances_to_temples: &[u32],
    oracle: &mut DistanceOracle,
) -> f64 {
    if temple_regions.contains(&candidate) {
        return -100.0;
    }

    let updated: Vec<u32> = homes
        .iter()
        .enumerate()
        .map(|(index, &home)| distances_to_temples[index] + oracle.distance(home, candidate))
        .collect();
    let inequality = (updated.iter().max().expect("non-empty")
        - updated.iter().min().expect("non-empty")) as f64;

    let mut all: Vec<RegionId> = temple_regions.to_vec();
    all.extend_from_slice(homes);
    all.push(candidate);
    let mut spread = oracle.min_pairwise(&all) as f64;
    if spread == 0.0 {
        spread = -5.0;
    }

    spread - inequality
}
