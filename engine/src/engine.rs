// ═══════════════════════════════════════════════════════════════════════
// Move engine — move application, combat resolution, turn progression
//
// Architecture:
//   The engine is a pure state machine. It never does I/O and never calls
//   controllers. `apply_move` takes a snapshot plus a move and returns an
//   entirely new snapshot; the previous state is never mutated, so the
//   host and the search can hold old states safely.
//
// Failure semantics:
//   Moves are assumed pre-validated by the move generator. A malformed
//   move (insufficient army, moving from a region conquered this turn) is
//   a caller bug and panics; there is no recoverable error path here.
// ═══════════════════════════════════════════════════════════════════════

use crate::queries::*;
use crate::types::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Apply one move to a state, producing the successor state. Pure: only
/// the mutable substructures are copied, the topology is shared.
pub fn apply_move(state: &GameState, mv: &Move) -> GameState {
    let mut next = copy_state(state, None);

    match *mv {
        Move::Army { source, destination, count } => {
            move_soldiers(&mut next, source, destination, count);
        }
        Move::Build { region, upgrade } => {
            build_upgrade(&mut next, region, upgrade);
        }
        Move::EndTurn => {
            next_turn(&mut next);
        }
    }

    after_move_checks(&mut next);
    next
}

/// Snapshot copy. Display notifications are not carried over; the
/// simulation flag is sticky once set. Passing `simulating` marks the copy
/// as a hypothetical branch owned by that player's search.
pub fn copy_state(state: &GameState, simulating: Option<PlayerId>) -> GameState {
    GameState {
        map: Arc::clone(&state.map),
        players: Arc::clone(&state.players),
        config: state.config,
        owner: state.owner.clone(),
        temples: state.temples.clone(),
        garrisons: state.garrisons.clone(),
        cash: state.cash.clone(),
        turn: state.turn.clone(),
        outcome: state.outcome,
        simulating: state.simulating.or(simulating),
        sound_cue: None,
        events: Vec::new(),
        seed: state.seed,
        rng_counter: state.rng_counter,
    }
}

/// Spawn `count` fresh soldiers at the back of a region's garrison.
pub fn add_soldiers(state: &mut GameState, region: RegionId, count: u32) {
    for _ in 0..count {
        state.garrisons[region.0 as usize].push_back(Soldier::recruit());
    }
}

// ── MOVE_ARMY ──────────────────────────────────────────────────────────

fn move_soldiers(state: &mut GameState, from: RegionId, to: RegionId, count: u32) {
    let mover = state.active_player();
    assert!(state.turn.moves_left > 0, "no moves left this turn");
    assert_eq!(owner(state, from), Some(mover), "moving an army the player does not own");
    assert!(
        !state.turn.conquered.contains(&from),
        "moving from a region conquered this turn"
    );
    assert!(
        soldier_count(state, from) >= count && count > 0,
        "moving more soldiers than the source holds"
    );

    let from_owner = owner(state, from);
    let to_owner = owner(state, to);
    let mut incoming = count;
    let mut was_defended = false;

    if from_owner != to_owner {
        let defenders = soldier_count(state, to);

        // Earth: the defender kills invaders before any exchange.
        let preemptive = incoming.min(upgrade_level(state, to_owner, UpgradeKind::Earth) as u32);
        let mut invincibility = upgrade_level(state, from_owner, UpgradeKind::Fire);

        for _ in 0..preemptive {
            state.garrisons[from.0 as usize].pop_front();
            incoming -= 1;
        }

        if defenders > 0 && incoming > 0 {
            was_defended = true;

            let attack_strength = incoming as f64
                * (1.0 + upgrade_level(state, from_owner, UpgradeKind::Fire) as f64 * 0.01);
            let defense_strength = defenders as f64
                * (1.0 + upgrade_level(state, to_owner, UpgradeKind::Earth) as f64 * 0.01);

            let rounds = incoming.min(defenders);
            let win_chance = 100.0 * (attack_strength / defense_strength).powf(1.6);
            let maximum = 120.0 + win_chance;

            for index in 0..rounds {
                let roll = if state.simulating.is_some() {
                    // Deterministic and clustered around the center of the
                    // range, exaggerating any advantage so search treats
                    // favorable fights as reliably won.
                    (index as f64 + 3.0) * maximum / (rounds as f64 + 5.0)
                } else {
                    // Real fight: stay off the extremes of the range so a
                    // giant advantage doesn't randomly feel bad.
                    combat_roll(state, maximum * 0.12, maximum * 0.88)
                };

                if roll <= 120.0 {
                    // defender wins the round
                    if invincibility > 0 {
                        invincibility -= 1;
                    } else {
                        state.garrisons[from.0 as usize].pop_front();
                        incoming -= 1;
                        cue(state, SoundCue::OursDead);
                    }
                } else {
                    // attacker wins the round; the martyr bounty is paid
                    state.garrisons[to.0 as usize].pop_front();
                    if let Some(defender) = to_owner {
                        state.cash[defender.0 as usize] += MARTYR_BOUNTY;
                    }
                    cue(state, SoundCue::EnemyDead);
                }
            }

            if !state.garrisons[to.0 as usize].is_empty() {
                // the attack was repelled: survivors stay at the source
                incoming = 0;
                cue(state, SoundCue::Defeat);
            }
        }
    }

    if incoming > 0 {
        for _ in 0..incoming {
            let soldier = state.garrisons[from.0 as usize]
                .pop_front()
                .expect("source garrison exhausted mid-move");
            state.garrisons[to.0 as usize].push_back(soldier);
        }

        if from_owner != to_owner {
            state.owner[to.0 as usize] = from_owner;
            // no further moves out of a freshly conquered region this turn
            state.turn.conquered.push(to);
            // a conquered temple always loses its upgrade
            if let Some(temple) = &mut state.temples[to.0 as usize] {
                temple.upgrade = None;
                temple.level = 0;
            }
            if was_defended {
                cue(state, SoundCue::Victory);
            }
        }
    }

    state.turn.moves_left -= 1;
}

/// Bounded uniform draw derived from the state's seed and roll counter,
/// so real-mode combat replays identically for the same seed.
fn combat_roll(state: &mut GameState, low: f64, high: f64) -> f64 {
    state.rng_counter += 1;
    let mut rng =
        ChaCha8Rng::seed_from_u64(state.seed.wrapping_add(state.rng_counter.wrapping_mul(999_961)));
    rng.gen_range(low..high)
}

fn cue(state: &mut GameState, sound: SoundCue) {
    if state.simulating.is_none() {
        state.sound_cue = Some(sound);
    }
}

// ── BUILD_ACTION ───────────────────────────────────────────────────────

fn build_upgrade(state: &mut GameState, region: RegionId, upgrade: UpgradeKind) {
    let builder = state.active_player();
    assert_eq!(owner(state, region), Some(builder), "building at a temple the player does not own");
    assert!(state.temples[region.0 as usize].is_some(), "building in a region with no temple");

    match upgrade {
        UpgradeKind::Soldier => {
            // progressively more expensive within one turn
            let cost = UpgradeKind::Soldier
                .cost(state.turn.soldiers_bought as usize)
                .expect("soldier cost table is unbounded");
            state.turn.soldiers_bought += 1;
            state.cash[builder.0 as usize] -= cost;
            add_soldiers(state, region, 1);
        }
        UpgradeKind::Respec => {
            let temple = state.temples[region.0 as usize].as_mut().expect("checked above");
            assert!(temple.upgrade.is_some(), "respec on an unupgraded temple");
            temple.upgrade = None;
            temple.level = 0;
        }
        element => {
            let temple = state.temples[region.0 as usize].as_mut().expect("checked above");
            if temple.upgrade == Some(element) {
                temple.level += 1;
            } else {
                temple.upgrade = Some(element);
                temple.level = 0;
            }
            let cost = element
                .cost(temple.level as usize)
                .expect("upgrade bought past its maximum level");
            state.cash[builder.0 as usize] -= cost;

            // Air grants its move point immediately
            if element == UpgradeKind::Air {
                state.turn.moves_left += 1;
            }
        }
    }
}

// ── END_TURN ───────────────────────────────────────────────────────────

fn next_turn(state: &mut GameState) {
    let player = state.active_player();

    // income, then one free soldier at every owned temple
    state.cash[player.0 as usize] += income(state, player);
    for region in temples_of(state, player) {
        add_soldiers(state, region, 1);
    }

    // advance to the next player who still owns something
    let player_count = state.player_count() as u8;
    let mut turn_number = state.turn.number;
    let mut index = state.turn.active;
    loop {
        index = (index + 1) % player_count;
        if index == 0 {
            turn_number += 1;
        }
        let upcoming = PlayerId(index);
        state.turn = TurnState {
            number: turn_number,
            active: index,
            moves_left: state.config.moves_per_turn
                + upgrade_level(state, Some(upcoming), UpgradeKind::Air) as u32,
            conquered: Vec::new(),
            soldiers_bought: 0,
        };
        if region_count(state, upcoming) > 0 {
            break;
        }
    }

    if state.turn.number > state.config.turn_limit {
        state.turn.number = state.config.turn_limit;
        finish_game(state, determine_winner(state));
    }
}

// ── Post-move checks ───────────────────────────────────────────────────

fn after_move_checks(state: &mut GameState) {
    // a player with regions but no soldiers anywhere is out
    for player in state.player_ids().collect::<Vec<_>>() {
        if total_soldiers(state, player) == 0 && region_count(state, player) > 0 {
            for slot in state.owner.iter_mut() {
                if *slot == Some(player) {
                    *slot = None;
                }
            }
            if state.active_player() == player {
                state.turn.moves_left = 0;
            }
            if state.simulating.is_none() {
                state.events.push(GameEvent::PlayerEliminated(player));
            }
        }
    }

    let alive = state.player_ids().filter(|&p| region_count(state, p) > 0).count();
    if alive <= 1 && state.outcome.is_none() {
        finish_game(state, determine_winner(state));
    }
}

/// Most regions wins; a tie at the top is a draw.
pub fn determine_winner(state: &GameState) -> Outcome {
    let mut counts: Vec<(PlayerId, u32)> =
        state.player_ids().map(|p| (p, region_count(state, p))).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let (leader, top) = counts[0];
    match counts.get(1) {
        Some(&(_, runner_up)) if runner_up == top => Outcome::Draw,
        _ => Outcome::Winner(leader),
    }
}

fn finish_game(state: &mut GameState, outcome: Outcome) {
    state.outcome = Some(outcome);
    if state.simulating.is_none() {
        state.events.push(GameEvent::GameOver(outcome));
    }
}
