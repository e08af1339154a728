// ═══════════════════════════════════════════════════════════════════════
// Search engine — resumable, time-boxed minimax for AI players
//
// The walk is an explicit arena of nodes, never call-stack recursion, so
// it can be paused between fixed-size batches of work and never blocks
// the host for long. All non-maximizing players share a single min layer
// keyed off whichever player is active at a node; this is a deliberate
// single-adversary approximation, not true N-player minimax.
// ═══════════════════════════════════════════════════════════════════════

use crate::controller::{Controller, MoveReply, Personality};
use crate::heuristic::{heuristic_for_player, temple_danger};
use pantheon_engine::engine::{apply_move, copy_state};
use pantheon_engine::moves::possible_moves;
use pantheon_engine::queries::*;
use pantheon_engine::types::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::thread;
use std::time::{Duration, Instant};

// ── Configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Hard wall-clock cap; on expiry the best move found so far is used.
    pub max_think_time: Duration,
    /// Floor enforced by delaying the report, never by searching longer,
    /// so fast decisions still appear deliberate.
    pub min_think_time: Duration,
    /// Expansion/backprop steps executed between yield points.
    pub steps_per_batch: u32,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig {
            max_think_time: Duration::from_millis(5000),
            min_think_time: Duration::from_millis(1000),
            steps_per_batch: 100,
        }
    }
}

impl SearchConfig {
    /// Settings for headless batch play and tests: no deliberate pacing,
    /// a tight budget.
    pub fn headless() -> SearchConfig {
        SearchConfig {
            max_think_time: Duration::from_millis(250),
            min_think_time: Duration::ZERO,
            ..SearchConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    InProgress,
    Done,
}

// ── Node arena ─────────────────────────────────────────────────────────

/// One unit of resumable work: a state, its remaining depth, the moves
/// still to explore, and backprop linkage to its parent.
struct Node {
    parent: Option<usize>,
    depth: u32,
    state: GameState,
    pending: Vec<Move>,
    next_move: usize,
    /// The move that produced this node (None at the root).
    entering_move: Option<Move>,
    /// Best (move, value) seen among explored children.
    best: Option<(Move, f64)>,
}

pub struct Search {
    for_player: PlayerId,
    nodes: Vec<Node>,
    current: Option<usize>,
    rng: ChaCha8Rng,
    config: SearchConfig,
    started: Instant,
}

impl Search {
    /// Start a search for `for_player` from a simulated copy of `state`.
    /// Depth should be the remaining moves this turn (at least 1).
    pub fn new(
        for_player: PlayerId,
        state: &GameState,
        depth: u32,
        seed: u64,
        config: SearchConfig,
    ) -> Search {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let simulation = copy_state(state, Some(for_player));
        let pending = possible_moves(&simulation, &mut rng);
        let root = Node {
            parent: None,
            depth: depth.max(1),
            state: simulation,
            pending,
            next_move: 0,
            entering_move: None,
            best: None,
        };
        Search {
            for_player,
            nodes: vec![root],
            current: Some(0),
            rng,
            config,
            started: Instant::now(),
        }
    }

    /// Run one batch of steps. Returns Done when the tree is settled or
    /// the time budget has expired; batch boundaries are the suspension
    /// points where the host regains control.
    pub fn run_batch(&mut self) -> SearchStatus {
        for _ in 0..self.config.steps_per_batch {
            if !self.step() {
                return SearchStatus::Done;
            }
            if self.started.elapsed() > self.config.max_think_time {
                return SearchStatus::Done;
            }
        }
        SearchStatus::InProgress
    }

    /// Best move found at the root so far, if any.
    pub fn best_move(&self) -> Option<Move> {
        self.nodes[0].best.map(|(mv, _)| mv)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One expansion, evaluation, or backprop step. Returns false once
    /// the root has been settled.
    fn step(&mut self) -> bool {
        let Some(current) = self.current else { return false };

        // leaf: evaluate and hand the value back up
        if self.nodes[current].depth == 0 {
            let value = heuristic_for_player(&self.nodes[current].state, self.for_player);
            return self.finish_node(current, Some(value));
        }

        // expand the next pending move into a child node
        let cursor = self.nodes[current].next_move;
        if cursor < self.nodes[current].pending.len() {
            self.nodes[current].next_move += 1;
            let mv = self.nodes[current].pending[cursor];
            let child_depth = self.nodes[current].depth - 1;
            let child_state = apply_move(&self.nodes[current].state, &mv);
            let pending = if child_depth > 0 {
                possible_moves(&child_state, &mut self.rng)
            } else {
                Vec::new()
            };
            self.nodes.push(Node {
                parent: Some(current),
                depth: child_depth,
                state: child_state,
                pending,
                next_move: 0,
                entering_move: Some(mv),
                best: None,
            });
            self.current = Some(self.nodes.len() - 1);
            return true;
        }

        // all children explored: propagate the settled best value
        let settled = self.nodes[current].best.map(|(_, value)| value);
        self.finish_node(current, settled)
    }

    /// Backpropagate a node's value to its parent, updating the parent's
    /// best move on strict improvement. Work resumes in the parent.
    fn finish_node(&mut self, node: usize, value: Option<f64>) -> bool {
        let parent = self.nodes[node].parent;
        if let (Some(parent), Some(value), Some(mv)) =
            (parent, value, self.nodes[node].entering_move)
        {
            let maximizing = self.nodes[parent].state.active_player() == self.for_player;
            let better = match self.nodes[parent].best {
                None => true,
                Some((_, best)) => (maximizing && value > best) || (!maximizing && value < best),
            };
            if better {
                self.nodes[parent].best = Some((mv, value));
            }
        }
        self.current = parent;
        parent.is_some()
    }
}

// ── AI controller ──────────────────────────────────────────────────────

/// Computer player: two greedy shortcuts (buy a soldier, build the next
/// wishlist upgrade), then the minimax search for everything else.
pub struct AiController {
    player: PlayerId,
    personality: Personality,
    config: SearchConfig,
    rng: ChaCha8Rng,
}

impl AiController {
    pub fn new(player: PlayerId, personality: Personality, seed: u64) -> AiController {
        AiController::with_config(player, personality, seed, SearchConfig::default())
    }

    pub fn with_config(
        player: PlayerId,
        personality: Personality,
        seed: u64,
        config: SearchConfig,
    ) -> AiController {
        AiController { player, personality, config, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    fn decide(&mut self, state: &GameState) -> Move {
        if let Some(mv) = self.soldier_to_build(state) {
            return mv;
        }
        if let Some(mv) = self.upgrade_to_build(state) {
            return mv;
        }

        // the search only analyzes the AI's own moves; threats are covered
        // by the heuristic
        let depth = state.turn.moves_left.max(1);
        let mut search =
            Search::new(self.player, state, depth, self.rng.gen(), self.config.clone());
        while search.run_batch() == SearchStatus::InProgress {
            thread::yield_now(); // suspension point for the host
        }
        search.best_move().unwrap_or(Move::EndTurn)
    }

    /// Greedy soldier purchase: the further behind the strongest player's
    /// force we are, the bigger the chunk of cash we are willing to spend.
    fn soldier_to_build(&self, state: &GameState) -> Option<Move> {
        let my_temples = temples_of(state, self.player);
        if my_temples.is_empty() {
            return None;
        }

        // once nothing is left to wish for, soldiers are all we want
        let eagerness = if self.personality.wishlist.is_empty() {
            1.0
        } else {
            self.personality.soldier_eagerness
        };

        let funds = cash(state, self.player);
        if funds <= 0 {
            return None;
        }
        let relative_cost = soldier_cost(state) as f64 / funds as f64;
        if relative_cost > 1.0 {
            return None;
        }

        let strongest =
            state.player_ids().map(|p| force(state, p)).max().expect("players are non-empty");
        let disparity = strongest as f64 / force(state, self.player) as f64;
        if disparity * eagerness - relative_cost < 0.0 {
            return None;
        }

        // reinforce the most endangered temple
        let region = pick_temple(state, self.player, &my_temples, true)?;
        Some(Move::Build { region, upgrade: UpgradeKind::Soldier })
    }

    /// Build the wishlist's next upgrade if it is affordable and some
    /// owned temple can carry it; prefers the safest temple.
    fn upgrade_to_build(&mut self, state: &GameState) -> Option<Move> {
        let desire = *self.personality.wishlist.first()?;
        let current_level = raw_upgrade_level(state, self.player, desire);
        let cost = desire.cost(current_level)?;
        if cash(state, self.player) < cost {
            return None;
        }

        let candidates: Vec<RegionId> = temples_of(state, self.player)
            .into_iter()
            .filter(|&r| {
                let temple = state.temples[r.0 as usize].as_ref().expect("templed region");
                (temple.upgrade.is_none() && current_level == 0) || temple.upgrade == Some(desire)
            })
            .collect();
        let region = pick_temple(state, self.player, &candidates, false)?;

        self.personality.wishlist.remove(0);
        Some(Move::Build { region, upgrade: desire })
    }
}

impl Controller for AiController {
    fn name(&self) -> &str {
        "Minimax"
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn pick_move(&mut self, state: &GameState, reply: MoveReply) {
        let started = Instant::now();
        let mv = self.decide(state);

        // pace the report, not the search
        let elapsed = started.elapsed();
        if elapsed < self.config.min_think_time {
            thread::sleep(self.config.min_think_time - elapsed);
        }
        reply.submit(mv);
    }
}

/// Rough military weight used to compare players.
fn force(state: &GameState, player: PlayerId) -> u32 {
    region_count(state, player) * 2 + total_soldiers(state, player)
}

/// First temple with the highest (or lowest) danger, in region order.
fn pick_temple(
    state: &GameState,
    player: PlayerId,
    temples: &[RegionId],
    most_endangered: bool,
) -> Option<RegionId> {
    let mut best: Option<(RegionId, f64)> = None;
    for &region in temples {
        let danger = temple_danger(state, player, region);
        let better = match best {
            None => true,
            Some((_, d)) => {
                if most_endangered {
                    danger > d
                } else {
                    danger < d
                }
            }
        };
        if better {
            best = Some((region, danger));
        }
    }
    best.map(|(region, _)| region)
}

// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pantheon_engine::setup::{create_initial_state, Setup};
    use std::sync::mpsc;

    fn quick_config() -> SearchConfig {
        SearchConfig {
            max_think_time: Duration::from_millis(200),
            min_think_time: Duration::ZERO,
            steps_per_batch: 100,
        }
    }

    fn test_state(seed: u64) -> GameState {
        create_initial_state(&Setup::all_ai(2, AiLevel::Normal), seed)
    }

    #[test]
    fn search_is_deterministic() {
        let state = test_state(7);
        // generous budget so both runs settle the whole tree
        let config = SearchConfig {
            max_think_time: Duration::from_secs(30),
            ..quick_config()
        };
        let run = |seed: u64| {
            let mut search = Search::new(state.active_player(), &state, 2, seed, config.clone());
            while search.run_batch() == SearchStatus::InProgress {}
            search.best_move()
        };
        let first = run(99);
        assert!(first.is_some(), "a settled search always finds a move");
        assert_eq!(first, run(99));
    }

    #[test]
    fn search_move_is_legal() {
        let state = test_state(11);
        let mut search = Search::new(state.active_player(), &state, 1, 3, quick_config());
        while search.run_batch() == SearchStatus::InProgress {}
        let mv = search.best_move().unwrap_or(Move::EndTurn);
        // applying the chosen move must not violate any engine contract
        let next = apply_move(&state, &mv);
        assert!(next.turn.number >= state.turn.number);
    }

    #[test]
    fn exhausted_budget_falls_back_to_end_turn() {
        let state = test_state(13);
        let mut controller = AiController::with_config(
            state.active_player(),
            Personality { soldier_eagerness: 0.0, wishlist: vec![] },
            1,
            SearchConfig {
                max_think_time: Duration::ZERO,
                min_think_time: Duration::ZERO,
                steps_per_batch: 1,
            },
        );
        // one step can at most expand one child, so the root may have no
        // settled value yet; the controller must still answer
        let (tx, rx) = mpsc::channel();
        controller.pick_move(&state, MoveReply::new(tx));
        let mv = rx.recv().expect("controller must report a move");
        apply_move(&state, &mv); // must be legal
    }

    #[test]
    fn rich_ai_buys_a_soldier() {
        let mut state = test_state(17);
        let me = state.active_player();
        state.cash[me.0 as usize] = 500;

        let controller = AiController::with_config(
            me,
            Personality { soldier_eagerness: 1.0, wishlist: vec![] },
            1,
            quick_config(),
        );
        let mv = controller.soldier_to_build(&state).expect("cash-rich AI builds soldiers");
        match mv {
            Move::Build { region, upgrade } => {
                assert_eq!(upgrade, UpgradeKind::Soldier);
                assert_eq!(owner(&state, region), Some(me));
                assert!(state.temples[region.0 as usize].is_some());
            }
            other => panic!("expected a build, got {:?}", other),
        }
    }

    #[test]
    fn wishlist_upgrade_is_built_and_consumed() {
        let mut state = test_state(19);
        let me = state.active_player();
        state.cash[me.0 as usize] = 15; // exactly the level-0 Water cost

        let mut controller = AiController::with_config(
            me,
            Personality { soldier_eagerness: 0.0, wishlist: vec![UpgradeKind::Water] },
            1,
            quick_config(),
        );
        let mv = controller.upgrade_to_build(&state).expect("affordable wishlist item");
        assert!(matches!(mv, Move::Build { upgrade: UpgradeKind::Water, .. }));
        assert!(controller.personality.wishlist.is_empty(), "wishlist entry is consumed");

        // too poor afterwards: no repeat suggestion
        assert!(controller.upgrade_to_build(&state).is_none());
    }

    #[test]
    fn broke_ai_skips_the_soldier_shortcut() {
        let state = test_state(23);
        let controller = AiController::with_config(
            state.active_player(),
            Personality { soldier_eagerness: 1.0, wishlist: vec![] },
            1,
            quick_config(),
        );
        // starting cash is 0, so the relative cost is unpayable
        assert!(controller.soldier_to_build(&state).is_none());
    }
}
