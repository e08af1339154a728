// ═══════════════════════════════════════════════════════════════════════
// Core types — the immutable-snapshot game state model
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// ── Game-controlling constants ─────────────────────────────────────────

pub const MAP_WIDTH: usize = 30;
pub const MAP_HEIGHT: usize = 20;
pub const MOVES_PER_TURN: u32 = 3;
pub const TURN_LIMIT: u32 = 12;

/// Cash paid to a defender's owner for each attacker their garrison kills.
pub const MARTYR_BOUNTY: i32 = 4;

// ── Ids ────────────────────────────────────────────────────────────────
// Compact, copyable identifiers. Regions index into MapGraph::regions,
// players into GameState::players.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

// ── Map topology ───────────────────────────────────────────────────────
// Built once by mapgen, never modified afterwards. Snapshots share it
// behind an Arc instead of copying it.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDef {
    pub id: RegionId,
    /// Symmetric, deduplicated adjacency list.
    pub neighbors: Vec<RegionId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapGraph {
    pub regions: Vec<RegionDef>,
}

impl MapGraph {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn neighbors(&self, id: RegionId) -> &[RegionId] {
        &self.regions[id.0 as usize].neighbors
    }

    /// All region ids in index order.
    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        (0..self.regions.len()).map(|i| RegionId(i as u8))
    }
}

// ── Players ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerKind {
    Human,
    Ai,
}

/// Display identity for the four player slots.
pub struct PlayerTemplate {
    pub name: &'static str,
    pub light: &'static str,
    pub dark: &'static str,
}

pub const PLAYER_TEMPLATES: [PlayerTemplate; 4] = [
    PlayerTemplate { name: "Amber", light: "#fd8", dark: "#960" },
    PlayerTemplate { name: "Crimson", light: "#f88", dark: "#722" },
    PlayerTemplate { name: "Lavender", light: "#d9d", dark: "#537" },
    PlayerTemplate { name: "Emerald", light: "#9d9", dark: "#262" },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    /// Color tags for rendering collaborators; the core never draws.
    pub light: String,
    pub dark: String,
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ── Upgrades ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Consumable purchase, escalating cost within a turn.
    Soldier,
    /// Income: X% more each turn.
    Water,
    /// Attack: X invincible soldier(s).
    Fire,
    /// Move: X extra move(s) per turn.
    Air,
    /// Defense: always kill X invader(s).
    Earth,
    /// Clears the temple's current upgrade.
    Respec,
}

impl UpgradeKind {
    /// The four persistent temple upgrades (Soldier and Respec are
    /// pseudo-upgrades with special rules).
    pub const ELEMENTS: [UpgradeKind; 4] = [
        UpgradeKind::Water,
        UpgradeKind::Fire,
        UpgradeKind::Air,
        UpgradeKind::Earth,
    ];

    /// Cost of buying this upgrade at a given level (0-based). For Soldier
    /// the "level" is the number of soldiers already bought this turn.
    /// None when the upgrade cannot be leveled further.
    pub fn cost(self, level: usize) -> Option<i32> {
        match self {
            UpgradeKind::Soldier => Some(8 + 4 * level as i32),
            UpgradeKind::Water => [15, 25].get(level).copied(),
            UpgradeKind::Fire => [20, 30].get(level).copied(),
            UpgradeKind::Air => [25, 35].get(level).copied(),
            UpgradeKind::Earth => [30, 45].get(level).copied(),
            UpgradeKind::Respec => [0].get(level).copied(),
        }
    }

    /// Effect magnitude at a given level (0-based). Water is an income
    /// percentage; Fire/Air/Earth are soldier/move counts.
    pub fn effect(self, level: usize) -> i32 {
        match self {
            UpgradeKind::Water => [20, 40][level],
            UpgradeKind::Fire | UpgradeKind::Air | UpgradeKind::Earth => [1, 2][level],
            UpgradeKind::Soldier | UpgradeKind::Respec => 0,
        }
    }
}

impl std::fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpgradeKind::Soldier => write!(f, "Soldier"),
            UpgradeKind::Water => write!(f, "Water"),
            UpgradeKind::Fire => write!(f, "Fire"),
            UpgradeKind::Air => write!(f, "Air"),
            UpgradeKind::Earth => write!(f, "Earth"),
            UpgradeKind::Respec => write!(f, "Respec"),
        }
    }
}

// ── Temple ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Temple {
    pub region: RegionId,
    /// At most one upgrade kind at a time; Respec required to switch.
    pub upgrade: Option<UpgradeKind>,
    pub level: u8,
}

impl Temple {
    pub fn new(region: RegionId) -> Temple {
        Temple { region, upgrade: None, level: 0 }
    }
}

// ── Soldier ────────────────────────────────────────────────────────────

static NEXT_SOLDIER_ID: AtomicU32 = AtomicU32::new(0);

/// Minimal unit: a stable identity only. Soldiers are fungible beyond it.
/// Ids come from a process-scoped counter that is never reset mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Soldier {
    pub id: u32,
}

impl Soldier {
    pub fn recruit() -> Soldier {
        Soldier { id: NEXT_SOLDIER_ID.fetch_add(1, Ordering::Relaxed) }
    }
}

// ── Moves ──────────────────────────────────────────────────────────────

/// The three move kinds a controller can submit. This is also the wire
/// shape if decisions ever cross a process boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Army {
        source: RegionId,
        destination: RegionId,
        count: u32,
    },
    Build {
        region: RegionId,
        upgrade: UpgradeKind,
    },
    EndTurn,
}

// ── Turn bookkeeping ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    /// 1-based; clamped to the turn limit when the game ends.
    pub number: u32,
    /// Index of the active player.
    pub active: u8,
    pub moves_left: u32,
    /// Regions captured this turn; movement from them is blocked until
    /// the next turn.
    pub conquered: Vec<RegionId>,
    /// Soldiers already purchased this turn (escalates the next price).
    pub soldiers_bought: u32,
}

// ── Outcome & display cues ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(PlayerId),
    Draw,
}

/// Sound cue tags for the rendering/audio collaborators. The core never
/// plays anything itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    OursDead,
    EnemyDead,
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    PlayerEliminated(PlayerId),
    GameOver(Outcome),
}

// ── Difficulty & config ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiLevel {
    /// Purely territorial AI: no threat/opportunity terms.
    Easy,
    Normal,
    /// AI players get a flat income bonus.
    Unfair,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameConfig {
    pub turn_limit: u32,
    pub moves_per_turn: u32,
    pub ai_level: AiLevel,
}

impl Default for GameConfig {
    fn default() -> GameConfig {
        GameConfig {
            turn_limit: TURN_LIMIT,
            moves_per_turn: MOVES_PER_TURN,
            ai_level: AiLevel::Normal,
        }
    }
}

// ── Game state ─────────────────────────────────────────────────────────

/// The central immutable value. Created once by setup and thereafter only
/// produced by the move engine as an entirely new snapshot; the topology
/// (map, players) is shared, the mutable maps are owned per snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub map: Arc<MapGraph>,
    pub players: Arc<Vec<Player>>,
    pub config: GameConfig,

    /// Region owner; None = unowned/neutral.
    pub owner: Vec<Option<PlayerId>>,
    /// Temple per region, if any. Temples exist independent of ownership.
    pub temples: Vec<Option<Temple>>,
    /// Garrison per region. Order matters: the front dies first in combat
    /// and is consumed first on moves.
    pub garrisons: Vec<VecDeque<Soldier>>,
    /// Cash ("faith") per player.
    pub cash: Vec<i32>,

    pub turn: TurnState,
    pub outcome: Option<Outcome>,

    /// Set when this state is a hypothetical branch used by search:
    /// combat switches to a deterministic formula and no cues are emitted.
    pub simulating: Option<PlayerId>,

    /// Display notifications from the last applied move.
    pub sound_cue: Option<SoundCue>,
    pub events: Vec<GameEvent>,

    // Deterministic RNG for real-mode combat rolls.
    pub seed: u64,
    pub rng_counter: u64,
}

impl GameState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.0 as usize]
    }

    pub fn active_player(&self) -> PlayerId {
        PlayerId(self.turn.active)
    }

    /// All player ids in turn order.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        (0..self.players.len()).map(|i| PlayerId(i as u8))
    }
}
