// ═══════════════════════════════════════════════════════════════════════
// State queries — the pure, side-effect-free read surface consumed by
// controllers, the AI, and rendering/UI collaborators.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;

pub fn owner(state: &GameState, region: RegionId) -> Option<PlayerId> {
    state.owner[region.0 as usize]
}

pub fn soldier_count(state: &GameState, region: RegionId) -> u32 {
    state.garrisons[region.0 as usize].len() as u32
}

pub fn cash(state: &GameState, player: PlayerId) -> i32 {
    state.cash[player.0 as usize]
}

pub fn region_count(state: &GameState, player: PlayerId) -> u32 {
    state.map.ids().filter(|&r| owner(state, r) == Some(player)).count() as u32
}

pub fn total_soldiers(state: &GameState, player: PlayerId) -> u32 {
    state
        .map
        .ids()
        .filter(|&r| owner(state, r) == Some(player))
        .map(|r| soldier_count(state, r))
        .sum()
}

/// Regions whose temple belongs to the player, in region order.
pub fn temples_of(state: &GameState, player: PlayerId) -> Vec<RegionId> {
    state
        .map
        .ids()
        .filter(|&r| state.temples[r.0 as usize].is_some() && owner(state, r) == Some(player))
        .collect()
}

/// Effect magnitude of the player's best temple of the given kind.
/// Neutral forces always have level 0.
pub fn upgrade_level(state: &GameState, player: Option<PlayerId>, kind: UpgradeKind) -> i32 {
    let Some(player) = player else { return 0 };
    state
        .map
        .ids()
        .filter(|&r| owner(state, r) == Some(player))
        .filter_map(|r| state.temples[r.0 as usize].as_ref())
        .filter(|t| t.upgrade == Some(kind))
        .map(|t| kind.effect(t.level as usize))
        .max()
        .unwrap_or(0)
}

/// Highest purchased level count (1-based) of the given kind across the
/// player's temples; 0 when none carries it. Indexes the cost table.
pub fn raw_upgrade_level(state: &GameState, player: PlayerId, kind: UpgradeKind) -> usize {
    temples_of(state, player)
        .iter()
        .filter_map(|&r| state.temples[r.0 as usize].as_ref())
        .map(|t| if t.upgrade == Some(kind) { t.level as usize + 1 } else { 0 })
        .max()
        .unwrap_or(0)
}

/// Price of the next soldier this turn (escalates per purchase).
pub fn soldier_cost(state: &GameState) -> i32 {
    UpgradeKind::Soldier
        .cost(state.turn.soldiers_bought as usize)
        .expect("soldier cost table is unbounded")
}

/// Per-turn income: one cash per owned region and per soldier stationed at
/// an owned temple, scaled by the Water upgrade (and the Unfair AI bonus).
pub fn income(state: &GameState, player: PlayerId) -> i32 {
    let from_regions = region_count(state, player);
    let from_temples: u32 = temples_of(state, player)
        .iter()
        .map(|&r| soldier_count(state, r))
        .sum();

    let mut multiplier = 1.0 + 0.01 * upgrade_level(state, Some(player), UpgradeKind::Water) as f64;
    if state.player(player).kind == PlayerKind::Ai && state.config.ai_level == AiLevel::Unfair {
        multiplier += 0.4;
    }
    (multiplier * (from_regions + from_temples) as f64).ceil() as i32
}

/// An active army can move: the region is owned by the player, garrisoned,
/// not conquered this turn, and move points remain.
pub fn region_has_active_army(state: &GameState, player: PlayerId, region: RegionId) -> bool {
    state.turn.moves_left > 0
        && owner(state, region) == Some(player)
        && soldier_count(state, region) > 0
        && !state.turn.conquered.contains(&region)
}

// ── Temple display info ────────────────────────────────────────────────

const LEVEL_NAMES: [&str; 2] = ["Temple", "Cathedral"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempleInfo {
    pub name: String,
    pub description: String,
}

pub fn temple_info(state: &GameState, temple: &Temple) -> TempleInfo {
    let Some(upgrade) = temple.upgrade else {
        let name = if owner(state, temple.region).is_some() {
            "Basic Temple"
        } else {
            "Neutral Temple"
        };
        return TempleInfo { name: name.to_string(), description: "No upgrades.".to_string() };
    };

    let level = temple.level as usize;
    let magnitude = upgrade.effect(level);
    let description = match upgrade {
        UpgradeKind::Water => format!("Income: {}% more each turn.", magnitude),
        UpgradeKind::Fire => format!("Attack: {} invincible soldier(s).", magnitude),
        UpgradeKind::Air => format!("Move: {} extra move(s) per turn.", magnitude),
        UpgradeKind::Earth => format!("Defense: Always kill {} invader(s).", magnitude),
        UpgradeKind::Soldier | UpgradeKind::Respec => String::new(),
    };
    TempleInfo {
        name: format!("{} of {}", LEVEL_NAMES[level], upgrade),
        description,
    }
}
