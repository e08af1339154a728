// ═══════════════════════════════════════════════════════════════════════
// Position scoring — heuristics shared by the search and the AI shortcuts
// ═══════════════════════════════════════════════════════════════════════

use pantheon_engine::queries::*;
use pantheon_engine::types::*;

/// A value that decays linearly from `start` at turn `drop_off` down to
/// `end` by the final turn. Models things that matter early (temples,
/// standing armies) giving way to raw territory late.
pub fn sliding_bonus(state: &GameState, start: f64, end: f64, drop_off: u32) -> f64 {
    let turn_limit = state.config.turn_limit as f64;
    let alpha =
        ((state.turn.number as f64 - drop_off as f64) / (turn_limit - drop_off as f64)).max(0.0);
    start + (end - start) * alpha
}

/// Base worth of holding a region; a temple adds a bonus that fades to
/// nothing over the first stretch of the game.
pub fn region_full_value(state: &GameState, region: RegionId) -> f64 {
    let temple_bonus = sliding_bonus(state, 8.0, 0.0, 1);
    if state.temples[region.0 as usize].is_some() {
        1.0 + temple_bonus
    } else {
        1.0
    }
}

/// How endangered a region is: enemy-adjacent firepower relative to the
/// garrison, clamped to [0, 0.9] so even a hopeless position keeps some
/// residual value.
pub fn region_threat(state: &GameState, player: PlayerId, region: RegionId) -> f64 {
    let our_presence = soldier_count(state, region) as f64;
    let enemy_presence: u32 = state
        .map
        .neighbors(region)
        .iter()
        .filter(|&&n| matches!(owner(state, n), Some(o) if o != player))
        .map(|&n| soldier_count(state, n))
        .sum();
    ((enemy_presence as f64 / (our_presence + 0.0001) - 1.0) * 0.5).clamp(0.0, 0.9)
}

/// How much conquest a region's garrison enables against its non-friendly
/// neighbors, weighted by what those neighbors are worth.
pub fn region_opportunity(state: &GameState, player: PlayerId, region: RegionId) -> f64 {
    let attackers = soldier_count(state, region) as f64;
    if attackers == 0.0 {
        return 0.0;
    }

    state
        .map
        .neighbors(region)
        .iter()
        .filter(|&&n| owner(state, n) != Some(player))
        .map(|&n| {
            let defenders = soldier_count(state, n) as f64;
            ((attackers / (defenders + 0.01) - 0.9) * 0.5).clamp(0.0, 0.5)
                * region_full_value(state, n)
        })
        .sum()
}

/// Threat plus opportunity at a temple's region; used to pick where the
/// AI reinforces (most endangered) and where it upgrades (least).
pub fn temple_danger(state: &GameState, player: PlayerId, region: RegionId) -> f64 {
    region_threat(state, player, region) + region_opportunity(state, player, region)
}

/// Score a state from one player's perspective: the summed, adjusted value
/// of every region they hold. Easy difficulty drops the threat/opportunity
/// terms, leaving a purely territorial evaluation.
pub fn heuristic_for_player(state: &GameState, player: PlayerId) -> f64 {
    let soldier_bonus = sliding_bonus(state, 0.33, 0.0, 10);
    let threat_opportunity_multiplier = sliding_bonus(state, 1.0, 0.0, 10);

    state
        .map
        .ids()
        .filter(|&region| owner(state, region) == Some(player))
        .map(|region| {
            let full = region_full_value(state, region);
            let mut value = full;
            if state.config.ai_level != AiLevel::Easy {
                value += (1.0 - region_threat(state, player, region))
                    * threat_opportunity_multiplier
                    * full
                    + region_opportunity(state, player, region) * threat_opportunity_multiplier;
            }
            value + soldier_count(state, region) as f64 * soldier_bonus
        })
        .sum()
}
