// ═══════════════════════════════════════════════════════════════════════
// Move generator — legal moves for the active player
// ═══════════════════════════════════════════════════════════════════════

use crate::queries::*;
use crate::types::*;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Enumerate the active player's legal moves. Ending the turn is always an
/// option, and the only one once move points run out. For every region
/// with an active army and every neighbor, two candidates are emitted:
/// the full army and half of it. The list is shuffled so downstream
/// max/min tie-breaking carries no positional bias.
pub fn possible_moves(state: &GameState, rng: &mut ChaCha8Rng) -> Vec<Move> {
    let mut moves = vec![Move::EndTurn];
    let player = state.active_player();

    if state.turn.moves_left == 0 {
        return moves;
    }

    for region in state.map.ids() {
        if !region_has_active_army(state, player, region) {
            continue;
        }
        let soldiers = soldier_count(state, region);
        for &neighbor in state.map.neighbors(region) {
            add_army_move(state, &mut moves, player, region, neighbor, soldiers);
            if soldiers > 1 {
                add_army_move(state, &mut moves, player, region, neighbor, soldiers / 2);
            }
        }
    }

    moves.shuffle(rng);
    moves
}

/// Adds the move unless it qualifies as an unambiguous loss: attacking a
/// foreign garrison that outnumbers the incoming force.
fn add_army_move(
    state: &GameState,
    moves: &mut Vec<Move>,
    player: PlayerId,
    source: RegionId,
    destination: RegionId,
    count: u32,
) {
    if owner(state, destination) != Some(player) && soldier_count(state, destination) > count {
        return;
    }
    moves.push(Move::Army { source, destination, count });
}
