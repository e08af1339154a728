// ═══════════════════════════════════════════════════════════════════════
// Controller contract — how the game loop obtains moves
//
// A controller is consulted once per decision point and must report
// exactly one move, eventually. The reply travels over a channel so a
// controller may answer from anywhere (a UI thread for humans, a search
// loop for the AI); the engine is agnostic to which is behind the trait.
// ═══════════════════════════════════════════════════════════════════════

use pantheon_engine::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

/// Single-use reply handle for one decision point.
pub struct MoveReply {
    sender: Sender<Move>,
}

impl MoveReply {
    pub fn new(sender: Sender<Move>) -> MoveReply {
        MoveReply { sender }
    }

    /// Report the chosen move. Consumes the handle: exactly once.
    pub fn submit(self, mv: Move) {
        self.sender.send(mv).expect("move receiver dropped before the reply");
    }
}

/// Trait both the AI and a human-input adapter implement to supply a move
/// given (player, state).
pub trait Controller: Send {
    /// Human-readable name for this controller (e.g. "Minimax", "Random").
    fn name(&self) -> &str;

    /// The player this controller is playing.
    fn player(&self) -> PlayerId;

    /// Decide on a move for the given state and submit it via `reply`.
    fn pick_move(&mut self, state: &GameState, reply: MoveReply);
}

// ── AI personality ─────────────────────────────────────────────────────
// Controller-owned, not game state: the wishlist is consumed as the AI
// builds through it.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    /// How eagerly this AI buys soldiers; becomes 1.0 once the wishlist
    /// is empty.
    pub soldier_eagerness: f64,
    /// Upgrade kinds this AI wants to build, in order.
    pub wishlist: Vec<UpgradeKind>,
}

impl Personality {
    /// The stock personalities AI players draw from.
    pub fn presets() -> Vec<Personality> {
        use UpgradeKind::*;
        vec![
            Personality { soldier_eagerness: 1.0, wishlist: vec![] },
            Personality { soldier_eagerness: 0.2, wishlist: vec![Water, Earth] },
            Personality { soldier_eagerness: 0.25, wishlist: vec![Water, Fire, Fire] },
            Personality { soldier_eagerness: 0.15, wishlist: vec![Water, Water, Earth, Earth] },
            Personality { soldier_eagerness: 0.4, wishlist: vec![Water] },
            Personality { soldier_eagerness: 0.3, wishlist: vec![Water, Water] },
            Personality { soldier_eagerness: 0.25, wishlist: vec![Fire, Fire] },
            Personality { soldier_eagerness: 0.2, wishlist: vec![Earth, Earth] },
        ]
    }

    pub fn random(rng: &mut impl Rng) -> Personality {
        Personality::presets().choose(rng).expect("presets are non-empty").clone()
    }
}
