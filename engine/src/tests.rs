// ═══════════════════════════════════════════════════════════════════════
// Engine tests — map generation, combat, economy, turn flow, determinism
// ═══════════════════════════════════════════════════════════════════════

use crate::distance::DistanceOracle;
use crate::engine::{add_soldiers, apply_move, copy_state, determine_winner};
use crate::mapgen::{generate_map, needed_regions};
use crate::moves::possible_moves;
use crate::queries::*;
use crate::setup::{create_initial_state, Setup};
use crate::types::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::Arc;

// ── Fixtures ───────────────────────────────────────────────────────────

fn fixture_players(count: usize) -> Arc<Vec<Player>> {
    Arc::new(
        (0..count)
            .map(|i| Player {
                id: PlayerId(i as u8),
                name: PLAYER_TEMPLATES[i].name.to_string(),
                kind: PlayerKind::Ai,
                light: PLAYER_TEMPLATES[i].light.to_string(),
                dark: PLAYER_TEMPLATES[i].dark.to_string(),
            })
            .collect(),
    )
}

/// Hand-built three-region line map (0 - 1 - 2): the first player holds
/// one end, the last player the other, the middle region starts unowned.
/// Both ends garrison three soldiers.
fn line_state(player_count: usize) -> GameState {
    let map = Arc::new(MapGraph {
        regions: vec![
            RegionDef { id: RegionId(0), neighbors: vec![RegionId(1)] },
            RegionDef { id: RegionId(1), neighbors: vec![RegionId(0), RegionId(2)] },
            RegionDef { id: RegionId(2), neighbors: vec![RegionId(1)] },
        ],
    });

    let mut owner = vec![None; 3];
    owner[0] = Some(PlayerId(0));
    owner[2] = Some(PlayerId(player_count as u8 - 1));

    let mut state = GameState {
        map,
        players: fixture_players(player_count),
        config: GameConfig::default(),
        owner,
        temples: vec![None; 3],
        garrisons: vec![VecDeque::new(); 3],
        cash: vec![0; player_count],
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
        seed: 1,
        rng_counter: 0,
    };
    add_soldiers(&mut state, RegionId(0), 3);
    add_soldiers(&mut state, RegionId(2), 3);
    state
}

fn army(source: u8, destination: u8, count: u32) -> Move {
    Move::Army { source: RegionId(source), destination: RegionId(destination), count }
}

/// Id-free summary of everything gameplay-relevant in a state. Soldier ids
/// come from a process-wide counter, so cross-game comparisons must ignore
/// them.
fn fingerprint(state: &GameState) -> (Option<Outcome>, u32, Vec<Option<PlayerId>>, Vec<i32>, Vec<usize>) {
    (
        state.outcome,
        state.turn.number,
        state.owner.clone(),
        state.cash.clone(),
        state.garrisons.iter().map(|g| g.len()).collect(),
    )
}

/// Plain reference BFS, independent of the oracle's memoization.
fn bfs_distance(map: &MapGraph, a: RegionId, b: RegionId) -> u32 {
    let mut visited = vec![false; map.len()];
    let mut queue = VecDeque::from([(a, 0u32)]);
    visited[a.0 as usize] = true;
    while let Some((region, traveled)) = queue.pop_front() {
        if region == b {
            return traveled;
        }
        for &n in map.neighbors(region) {
            if !visited[n.0 as usize] {
                visited[n.0 as usize] = true;
                queue.push_back((n, traveled + 1));
            }
        }
    }
    panic!("generated maps are connected");
}

// ── Map generation ─────────────────────────────────────────────────────

#[test]
fn generated_maps_have_the_right_region_count() {
    for players in 2..=4 {
        for seed in 1..=3u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let map = generate_map(players, &mut rng);
            assert_eq!(map.len(), needed_regions(players));
        }
    }
}

#[test]
fn generated_maps_are_connected_with_symmetric_borders() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for players in 2..=4 {
        let map = generate_map(players, &mut rng);

        for region in map.ids() {
            for &neighbor in map.neighbors(region) {
                assert_ne!(neighbor, region, "a region cannot border itself");
                assert!(
                    map.neighbors(neighbor).contains(&region),
                    "{:?} borders {:?} but not vice versa",
                    region,
                    neighbor
                );
            }
            let unique: std::collections::HashSet<_> = map.neighbors(region).iter().collect();
            assert_eq!(unique.len(), map.neighbors(region).len(), "duplicate border");
        }

        // every region reachable from region 0
        let mut seen = vec![false; map.len()];
        let mut queue = VecDeque::from([RegionId(0)]);
        seen[0] = true;
        while let Some(region) = queue.pop_front() {
            for &n in map.neighbors(region) {
                if !seen[n.0 as usize] {
                    seen[n.0 as usize] = true;
                    queue.push_back(n);
                }
            }
        }
        assert!(seen.iter().all(|&s| s), "map is disconnected");
    }
}

// ── Distance oracle ────────────────────────────────────────────────────

#[test]
fn oracle_distances_match_plain_bfs() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let map = Arc::new(generate_map(2, &mut rng));
    let mut oracle = DistanceOracle::new(Arc::clone(&map));

    for a in map.ids() {
        for b in map.ids() {
            assert_eq!(oracle.distance(a, b), bfs_distance(&map, a, b));
        }
    }
}

#[test]
fn oracle_is_reflexive_symmetric_and_order_independent() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let map = Arc::new(generate_map(3, &mut rng));

    // warm two oracles in opposite query orders
    let mut forward = DistanceOracle::new(Arc::clone(&map));
    let mut backward = DistanceOracle::new(Arc::clone(&map));
    let ids: Vec<RegionId> = map.ids().collect();
    for &a in &ids {
        for &b in &ids {
            let _ = forward.distance(a, b);
        }
    }
    for &a in ids.iter().rev() {
        for &b in ids.iter().rev() {
            let _ = backward.distance(a, b);
        }
    }

    for &a in &ids {
        assert_eq!(forward.distance(a, a), 0);
        for &b in &ids {
            assert_eq!(forward.distance(a, b), forward.distance(b, a));
            assert_eq!(forward.distance(a, b), backward.distance(a, b));
            for &c in &ids {
                assert!(
                    forward.distance(a, c) <= forward.distance(a, b) + forward.distance(b, c),
                    "triangle inequality violated"
                );
            }
        }
    }
}

// ── Move generation ────────────────────────────────────────────────────

#[test]
fn generator_offers_full_and_half_armies() {
    let state = line_state(2);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let moves = possible_moves(&state, &mut rng);

    assert!(moves.contains(&Move::EndTurn));
    assert!(moves.contains(&army(0, 1, 3)), "full army into the unowned middle");
    assert!(moves.contains(&army(0, 1, 1)), "half army into the unowned middle");
    assert_eq!(moves.len(), 3, "no other region is adjacent to the army");
}

#[test]
fn generator_only_ends_the_turn_without_move_points() {
    let mut state = line_state(2);
    state.turn.moves_left = 0;
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert_eq!(possible_moves(&state, &mut rng), vec![Move::EndTurn]);
}

#[test]
fn generator_skips_regions_conquered_this_turn() {
    let mut state = line_state(2);
    state.turn.conquered.push(RegionId(0));
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert_eq!(possible_moves(&state, &mut rng), vec![Move::EndTurn]);
}

#[test]
fn generator_prunes_hopeless_attacks() {
    let mut state = line_state(2);
    // a bigger neutral garrison than anything we could send
    add_soldiers(&mut state, RegionId(1), 5);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert_eq!(possible_moves(&state, &mut rng), vec![Move::EndTurn]);
}

// ── Movement & combat ──────────────────────────────────────────────────

#[test]
fn marching_into_an_empty_region_conquers_it() {
    let state = line_state(2);
    let next = apply_move(&state, &army(0, 1, 3));

    assert_eq!(owner(&next, RegionId(1)), Some(PlayerId(0)));
    assert_eq!(soldier_count(&next, RegionId(1)), 3);
    assert_eq!(soldier_count(&next, RegionId(0)), 0);
    assert!(next.turn.conquered.contains(&RegionId(1)));
    assert_eq!(next.turn.moves_left, MOVES_PER_TURN - 1);
}

#[test]
fn simulated_battle_five_against_two() {
    let mut state = line_state(2);
    add_soldiers(&mut state, RegionId(0), 2); // five attackers total
    state.owner[1] = Some(PlayerId(1));
    add_soldiers(&mut state, RegionId(1), 2); // two defenders
    state.simulating = Some(PlayerId(0));

    let next = apply_move(&state, &army(0, 1, 5));

    // with a 5:2 advantage the deterministic rolls clear the top of the
    // range, so the attacker wins both combat rounds
    assert_eq!(soldier_count(&next, RegionId(1)), 5, "all five attackers occupy");
    assert_eq!(soldier_count(&next, RegionId(0)), 0);
    assert_eq!(owner(&next, RegionId(1)), Some(PlayerId(0)));
    assert_eq!(cash(&next, PlayerId(1)), 2 * MARTYR_BOUNTY, "one bounty per fallen defender");
    assert!(next.turn.conquered.contains(&RegionId(1)));
    assert!(next.sound_cue.is_none(), "hypothetical branches emit no cues");

    // soldiers are only lost in combat, never duplicated
    let total: u32 = next.map.ids().map(|r| soldier_count(&next, r)).sum();
    assert_eq!(total, 5 + 2 + 3 - 2);
}

#[test]
fn repelled_attackers_stay_home() {
    let mut state = line_state(2);
    state.owner[1] = Some(PlayerId(1));
    add_soldiers(&mut state, RegionId(1), 1);
    state.simulating = Some(PlayerId(0));

    // an even 1v1 round rolls low, so the defender holds
    let next = apply_move(&state, &army(0, 1, 1));

    assert_eq!(owner(&next, RegionId(1)), Some(PlayerId(1)));
    assert_eq!(soldier_count(&next, RegionId(1)), 1);
    assert_eq!(soldier_count(&next, RegionId(0)), 2, "the lone attacker died");
    assert!(!next.turn.conquered.contains(&RegionId(1)));
}

#[test]
fn earth_upgrade_kills_invaders_preemptively() {
    let mut state = line_state(2);
    state.owner[1] = Some(PlayerId(1));
    add_soldiers(&mut state, RegionId(1), 1);
    state.temples[1] =
        Some(Temple { region: RegionId(1), upgrade: Some(UpgradeKind::Earth), level: 0 });
    state.simulating = Some(PlayerId(0));

    let next = apply_move(&state, &army(0, 1, 2));

    // one invader dies before the exchange, the second loses the even round
    assert_eq!(soldier_count(&next, RegionId(0)), 1);
    assert_eq!(soldier_count(&next, RegionId(1)), 1);
    assert_eq!(owner(&next, RegionId(1)), Some(PlayerId(1)));
}

#[test]
fn fire_upgrade_absorbs_attacker_losses() {
    let mut state = line_state(2);
    state.owner[1] = Some(PlayerId(1));
    add_soldiers(&mut state, RegionId(1), 1);
    state.temples[0] =
        Some(Temple { region: RegionId(0), upgrade: Some(UpgradeKind::Fire), level: 0 });
    state.simulating = Some(PlayerId(0));

    let next = apply_move(&state, &army(0, 1, 1));

    // the defender wins the round but the invincible soldier survives;
    // the attack is still repelled
    assert_eq!(soldier_count(&next, RegionId(0)), 3, "no attacker losses");
    assert_eq!(soldier_count(&next, RegionId(1)), 1);
    assert_eq!(owner(&next, RegionId(1)), Some(PlayerId(1)));
}

#[test]
fn conquest_strips_the_temple_upgrade() {
    let mut state = line_state(2);
    state.owner[1] = Some(PlayerId(1));
    state.temples[1] =
        Some(Temple { region: RegionId(1), upgrade: Some(UpgradeKind::Water), level: 1 });

    let next = apply_move(&state, &army(0, 1, 2));

    assert_eq!(owner(&next, RegionId(1)), Some(PlayerId(0)));
    let temple = next.temples[1].as_ref().expect("the temple itself survives");
    assert_eq!(temple.upgrade, None);
    assert_eq!(temple.level, 0);
    assert_eq!(upgrade_level(&next, Some(PlayerId(0)), UpgradeKind::Water), 0);
}

#[test]
fn real_combat_replays_identically_from_the_same_state() {
    let mut state = line_state(2);
    add_soldiers(&mut state, RegionId(0), 2);
    state.owner[1] = Some(PlayerId(1));
    add_soldiers(&mut state, RegionId(1), 2);

    let first = apply_move(&state, &army(0, 1, 5));
    let second = apply_move(&state, &army(0, 1, 5));
    assert_eq!(
        serde_json::to_string(&first).expect("serializable"),
        serde_json::to_string(&second).expect("serializable"),
    );
}

// ── Economy ────────────────────────────────────────────────────────────

#[test]
fn income_counts_regions_and_temple_garrisons() {
    let mut state = line_state(2);
    state.temples[0] = Some(Temple::new(RegionId(0)));

    // one region plus three soldiers at the temple
    assert_eq!(income(&state, PlayerId(0)), 4);
    // the other player owns a region without a temple
    assert_eq!(income(&state, PlayerId(1)), 1);

    // a 20% Water boost rounds up
    state.temples[0] =
        Some(Temple { region: RegionId(0), upgrade: Some(UpgradeKind::Water), level: 0 });
    assert_eq!(income(&state, PlayerId(0)), 5);

    // Unfair stacks a flat bonus for AI players on top
    state.config.ai_level = AiLevel::Unfair;
    assert_eq!(income(&state, PlayerId(0)), 7);
}

#[test]
fn soldier_price_escalates_within_a_turn() {
    let mut state = line_state(2);
    state.temples[0] = Some(Temple::new(RegionId(0)));
    state.cash[0] = 100;

    assert_eq!(soldier_cost(&state), 8);
    let mut next = state;
    for _ in 0..3 {
        next = apply_move(&next, &Move::Build { region: RegionId(0), upgrade: UpgradeKind::Soldier });
    }

    assert_eq!(cash(&next, PlayerId(0)), 100 - (8 + 12 + 16));
    assert_eq!(soldier_count(&next, RegionId(0)), 6);
    assert_eq!(next.turn.soldiers_bought, 3);
    assert_eq!(next.turn.moves_left, MOVES_PER_TURN, "building costs no move point");
}

#[test]
fn air_upgrade_grants_its_move_immediately() {
    let mut state = line_state(2);
    state.temples[0] = Some(Temple::new(RegionId(0)));
    state.cash[0] = 50;

    let next = apply_move(&state, &Move::Build { region: RegionId(0), upgrade: UpgradeKind::Air });

    assert_eq!(next.turn.moves_left, MOVES_PER_TURN + 1);
    assert_eq!(cash(&next, PlayerId(0)), 25);
    assert_eq!(upgrade_level(&next, Some(PlayerId(0)), UpgradeKind::Air), 1);
}

#[test]
fn respec_clears_the_temple() {
    let mut state = line_state(2);
    state.temples[0] =
        Some(Temple { region: RegionId(0), upgrade: Some(UpgradeKind::Air), level: 1 });

    let next =
        apply_move(&state, &Move::Build { region: RegionId(0), upgrade: UpgradeKind::Respec });

    let temple = next.temples[0].as_ref().expect("temple remains");
    assert_eq!(temple.upgrade, None);
    assert_eq!(temple.level, 0);
    assert_eq!(cash(&next, PlayerId(0)), 0, "respec is free");
}

#[test]
fn temple_info_describes_level_and_effect() {
    let mut state = line_state(2);
    state.temples[0] = Some(Temple::new(RegionId(0)));
    state.temples[1] =
        Some(Temple { region: RegionId(1), upgrade: Some(UpgradeKind::Water), level: 1 });

    let basic = temple_info(&state, state.temples[0].as_ref().expect("set above"));
    assert_eq!(basic.name, "Basic Temple");

    state.owner[1] = None;
    let neutral = temple_info(&state, state.temples[1].as_ref().expect("set above"));
    // an unowned temple keeps its upgrade description but not an owner
    assert_eq!(neutral.name, "Cathedral of Water");
    assert_eq!(neutral.description, "Income: 40% more each turn.");
}

#[test]
fn upgrade_levels_report_effect_and_cost_index_separately() {
    let mut state = line_state(2);
    state.temples[0] =
        Some(Temple { region: RegionId(0), upgrade: Some(UpgradeKind::Water), level: 1 });

    assert_eq!(upgrade_level(&state, Some(PlayerId(0)), UpgradeKind::Water), 40);
    assert_eq!(raw_upgrade_level(&state, PlayerId(0), UpgradeKind::Water), 2);
    assert_eq!(raw_upgrade_level(&state, PlayerId(0), UpgradeKind::Fire), 0);
    // neutral forces never benefit from upgrades
    assert_eq!(upgrade_level(&state, None, UpgradeKind::Water), 0);
}

// ── Turn flow ──────────────────────────────────────────────────────────

#[test]
fn ending_a_turn_pays_income_and_spawns_temple_soldiers() {
    let mut state = line_state(2);
    state.temples[0] = Some(Temple::new(RegionId(0)));

    let next = apply_move(&state, &Move::EndTurn);

    assert_eq!(cash(&next, PlayerId(0)), 4);
    assert_eq!(soldier_count(&next, RegionId(0)), 4, "one free soldier per owned temple");
    assert_eq!(next.turn.active, 1);
    assert_eq!(next.turn.number, 1);
    assert_eq!(next.turn.moves_left, MOVES_PER_TURN);
}

#[test]
fn turn_rotation_skips_landless_players_and_wraps() {
    // three players, but the middle one owns nothing
    let state = line_state(3);

    let next = apply_move(&state, &Move::EndTurn);
    assert_eq!(next.turn.active, 2);
    assert_eq!(next.turn.number, 1);

    let wrapped = apply_move(&next, &Move::EndTurn);
    assert_eq!(wrapped.turn.active, 0);
    assert_eq!(wrapped.turn.number, 2, "a wrap to the first player starts a new turn");
}

#[test]
fn turn_limit_ends_the_game_on_region_majority() {
    let mut state = line_state(2);
    state.owner[1] = Some(PlayerId(0)); // two regions against one
    state.config.turn_limit = 1;

    let mid = apply_move(&state, &Move::EndTurn);
    assert!(mid.outcome.is_none());

    let done = apply_move(&mid, &Move::EndTurn);
    assert_eq!(done.outcome, Some(Outcome::Winner(PlayerId(0))));
    assert_eq!(done.turn.number, 1, "the displayed turn never exceeds the limit");
    assert!(done.events.contains(&GameEvent::GameOver(Outcome::Winner(PlayerId(0)))));
}

#[test]
fn a_tied_region_majority_is_a_draw() {
    let mut state = line_state(2);
    state.config.turn_limit = 1;
    assert_eq!(determine_winner(&state), Outcome::Draw);

    let done = apply_move(&apply_move(&state, &Move::EndTurn), &Move::EndTurn);
    assert_eq!(done.outcome, Some(Outcome::Draw));
}

#[test]
fn soldierless_players_are_eliminated() {
    let mut state = line_state(2);
    state.garrisons[2].clear(); // the second player holds land but no army

    let next = apply_move(&state, &Move::EndTurn);

    assert_eq!(owner(&next, RegionId(2)), None, "their regions turn neutral");
    assert!(next.events.contains(&GameEvent::PlayerEliminated(PlayerId(1))));
    assert_eq!(next.outcome, Some(Outcome::Winner(PlayerId(0))));
}

// ── Snapshot semantics ─────────────────────────────────────────────────

#[test]
fn apply_move_never_mutates_the_input_state() {
    let state = line_state(2);
    let before = serde_json::to_string(&state).expect("serializable");
    let _ = apply_move(&state, &army(0, 1, 3));
    let _ = apply_move(&state, &Move::EndTurn);
    assert_eq!(serde_json::to_string(&state).expect("serializable"), before);
}

#[test]
fn simulation_marker_is_sticky_and_notifications_reset() {
    let mut state = line_state(2);
    state.sound_cue = Some(SoundCue::Victory);
    state.events.push(GameEvent::PlayerEliminated(PlayerId(1)));

    let copy = copy_state(&state, Some(PlayerId(0)));
    assert_eq!(copy.simulating, Some(PlayerId(0)));
    assert!(copy.sound_cue.is_none());
    assert!(copy.events.is_empty());

    // once marked, a later copy cannot clear or re-own the marker
    let deeper = copy_state(&copy, Some(PlayerId(1)));
    assert_eq!(deeper.simulating, Some(PlayerId(0)));
    let plain = copy_state(&copy, None);
    assert_eq!(plain.simulating, Some(PlayerId(0)));
}

#[test]
fn game_state_survives_a_serde_round_trip() {
    let state = create_initial_state(&Setup::all_ai(3, AiLevel::Normal), 21);
    let json = serde_json::to_string(&state).expect("serializable");
    let back: GameState = serde_json::from_str(&json).expect("deserializable");
    assert_eq!(serde_json::to_string(&back).expect("serializable"), json);
}

// ── Setup ──────────────────────────────────────────────────────────────

#[test]
fn initial_states_give_every_player_one_garrisoned_temple() {
    for players in 2..=4 {
        let state = create_initial_state(&Setup::all_ai(players, AiLevel::Normal), players as u64 * 17);
        assert_eq!(state.map.len(), needed_regions(players));

        for p in state.player_ids() {
            assert_eq!(region_count(&state, p), 1, "one home region each");
            let homes = temples_of(&state, p);
            assert_eq!(homes.len(), 1, "the home region carries a temple");
            assert_eq!(soldier_count(&state, homes[0]), 3);
            assert_eq!(cash(&state, p), 0);
        }

        let neutral = state
            .map
            .ids()
            .filter(|&r| state.temples[r.0 as usize].is_some() && owner(&state, r).is_none())
            .count();
        assert_eq!(neutral, [3, 3, 4][players - 2]);

        assert_eq!(state.turn.number, 1);
        assert_eq!(state.turn.active, 0);
        assert_eq!(state.turn.moves_left, MOVES_PER_TURN);
        assert!(state.outcome.is_none());
    }
}

// ── Full games ─────────────────────────────────────────────────────────

#[test]
fn random_playouts_reach_an_outcome() {
    for players in 2..=4 {
        let mut state =
            create_initial_state(&Setup::all_ai(players, AiLevel::Normal), 1000 + players as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut decisions = 0;

        while state.outcome.is_none() {
            decisions += 1;
            assert!(decisions < 10_000, "game failed to terminate");
            let moves = possible_moves(&state, &mut rng);
            let mv = *moves.choose(&mut rng).expect("ending the turn is always legal");
            state = apply_move(&state, &mv);
        }
        assert!(state.turn.number <= state.config.turn_limit);
    }
}

#[test]
fn playouts_are_seed_deterministic() {
    let play = || {
        let mut state = create_initial_state(&Setup::all_ai(2, AiLevel::Normal), 99);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        while state.outcome.is_none() {
            let moves = possible_moves(&state, &mut rng);
            let mv = *moves.choose(&mut rng).expect("non-empty");
            state = apply_move(&state, &mv);
        }
        fingerprint(&state)
    };
    assert_eq!(play(), play());
}
