// ═══════════════════════════════════════════════════════════════════════
// Random controller — picks any legal move.
// Serves as baseline and for testing engine stability.
// ═══════════════════════════════════════════════════════════════════════

use crate::controller::{Controller, MoveReply};
use pantheon_engine::moves::possible_moves;
use pantheon_engine::types::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct RandomController {
    player: PlayerId,
    rng: ChaCha8Rng,
}

impl RandomController {
    pub fn new(player: PlayerId, seed: u64) -> RandomController {
        RandomController { player, rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl Controller for RandomController {
    fn name(&self) -> &str {
        "Random"
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn pick_move(&mut self, state: &GameState, reply: MoveReply) {
        let moves = possible_moves(state, &mut self.rng);
        let mv = *moves.choose(&mut self.rng).expect("ending the turn is always legal");
        reply.submit(mv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantheon_engine::engine::apply_move;
    use pantheon_engine::setup::{create_initial_state, Setup};
    use std::sync::mpsc;

    #[test]
    fn random_controller_always_answers_with_a_legal_move() {
        let mut state = create_initial_state(&Setup::all_ai(3, AiLevel::Normal), 5);
        let mut controllers: Vec<RandomController> = state
            .player_ids()
            .map(|p| RandomController::new(p, 100 + p.0 as u64))
            .collect();

        for _ in 0..50 {
            if state.outcome.is_some() {
                break;
            }
            let active = state.active_player();
            let (tx, rx) = mpsc::channel();
            controllers[active.0 as usize].pick_move(&state, MoveReply::new(tx));
            let mv = rx.recv().expect("controller must reply");
            // the engine would panic on an illegal move
            state = apply_move(&state, &mv);
        }
    }
}
