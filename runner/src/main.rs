// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for playing games and batches headlessly
// ═══════════════════════════════════════════════════════════════════════

use clap::{Parser, Subcommand, ValueEnum};
use pantheon_agents::{AiController, Controller, MoveReply, Personality, RandomController, SearchConfig};
use pantheon_engine::engine::apply_move;
use pantheon_engine::setup::{create_initial_state, Setup};
use pantheon_engine::types::*;
use pantheon_engine::queries::{cash, region_count, total_soldiers};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::mpsc;
use std::time::Duration;

/// Safety cap on decisions per game; a correct game ends long before this.
const MAX_DECISIONS: u32 = 50_000;

#[derive(Parser)]
#[command(name = "pantheon", about = "Pantheon strategy engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Difficulty {
    Easy,
    Normal,
    Unfair,
}

impl From<Difficulty> for AiLevel {
    fn from(d: Difficulty) -> AiLevel {
        match d {
            Difficulty::Easy => AiLevel::Easy,
            Difficulty::Normal => AiLevel::Normal,
            Difficulty::Unfair => AiLevel::Unfair,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single game and print its progress
    Play {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value_t = 2)]
        players: u8,
        #[arg(short, long, value_enum, default_value_t = Difficulty::Normal)]
        difficulty: Difficulty,
        /// Controller type: "minimax", "random" or "mixed"
        #[arg(short, long, default_value = "minimax")]
        agent: String,
        /// Print every move as it is played
        #[arg(long)]
        trace: bool,
        /// Dump the final state as JSON
        #[arg(long)]
        json: bool,
        /// Override the AI think-time cap in milliseconds
        #[arg(long)]
        think_ms: Option<u64>,
    },
    /// Play a batch of N games and tally the outcomes
    Batch {
        #[arg(short, long, default_value_t = 100)]
        games: u32,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value_t = 2)]
        players: u8,
        #[arg(short, long, value_enum, default_value_t = Difficulty::Normal)]
        difficulty: Difficulty,
        #[arg(short, long, default_value = "minimax")]
        agent: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play { seed, players, difficulty, agent, trace, json, think_ms } => {
            cmd_play(seed, players, difficulty, &agent, trace, json, think_ms)
        }
        Commands::Batch { games, seed, players, difficulty, agent } => {
            cmd_batch(games, seed, players, difficulty, &agent)
        }
    }
}

fn cmd_play(
    seed: u64,
    players: u8,
    difficulty: Difficulty,
    agent_type: &str,
    trace: bool,
    json: bool,
    think_ms: Option<u64>,
) {
    println!("=== Pantheon ===\n");
    println!(
        "Running single game: seed={}, players={}, difficulty={:?}, agent={}\n",
        seed, players, difficulty, agent_type
    );

    let config = search_config(think_ms);
    match run_game(seed, players, difficulty.into(), agent_type, config, trace) {
        Ok(state) => {
            print_standings(&state);
            if json {
                match serde_json::to_string_pretty(&state) {
                    Ok(dump) => println!("\n{}", dump),
                    Err(e) => eprintln!("JSON error: {}", e),
                }
            }
        }
        Err(e) => eprintln!("Game error: {}", e),
    }
}

fn cmd_batch(games: u32, seed: u64, players: u8, difficulty: Difficulty, agent_type: &str) {
    println!(
        "=== Batch: {} games, {} players, difficulty={:?}, agent={} ===\n",
        games, players, difficulty, agent_type
    );

    let config = search_config(None);
    let mut wins = vec![0u32; players as usize];
    let mut draws = 0u32;
    let mut errors = 0u32;

    for g in 0..games {
        let game_seed = seed + g as u64 * 1000;
        match run_game(game_seed, players, difficulty.into(), agent_type, config.clone(), false) {
            Ok(state) => {
                match state.outcome {
                    Some(Outcome::Winner(p)) => wins[p.0 as usize] += 1,
                    Some(Outcome::Draw) => draws += 1,
                    None => unreachable!("run_game only returns finished games"),
                }
                if (g + 1) % 10 == 0 || g + 1 == games {
                    print!("\rGame {}/{}...", g + 1, games);
                }
            }
            Err(e) => {
                errors += 1;
                eprintln!("Game {}: ERROR -- {}", g + 1, e);
            }
        }
    }

    println!("\n\n--- Summary ({} games, {} errors) ---", games, errors);
    for (index, &count) in wins.iter().enumerate() {
        let pct = if games > 0 { count as f64 / games as f64 * 100.0 } else { 0.0 };
        println!(
            "  {:10}: {:>4} wins ({:.1}%)",
            PLAYER_TEMPLATES[index].name, count, pct
        );
    }
    println!("  {:10}: {:>4}", "Draws", draws);
}

/// Batch-friendly search settings; `think_ms` restores a larger cap.
fn search_config(think_ms: Option<u64>) -> SearchConfig {
    let mut config = SearchConfig::headless();
    if let Some(ms) = think_ms {
        config.max_think_time = Duration::from_millis(ms);
    }
    config
}

/// Drive one game to completion: consult the active player's controller
/// for every decision, auto-pass for eliminated players, and surface game
/// events as they happen.
fn run_game(
    seed: u64,
    players: u8,
    level: AiLevel,
    agent_type: &str,
    config: SearchConfig,
    trace: bool,
) -> Result<GameState, String> {
    let setup = Setup::all_ai(players as usize, level);
    let mut state = create_initial_state(&setup, seed);
    let mut controllers = make_controllers(&state, seed, agent_type, config);

    let mut decisions = 0u32;
    while state.outcome.is_none() {
        decisions += 1;
        if decisions > MAX_DECISIONS {
            return Err(format!("no outcome after {} decisions", MAX_DECISIONS));
        }

        let active = state.active_player();
        let mv = if region_count(&state, active) == 0 {
            // eliminated players are skipped without consulting anyone
            Move::EndTurn
        } else {
            let (tx, rx) = mpsc::channel();
            controllers[active.0 as usize].pick_move(&state, MoveReply::new(tx));
            rx.recv().map_err(|_| "controller dropped its reply handle".to_string())?
        };

        if trace {
            println!(
                "turn {:>2} | {:8} | {}",
                state.turn.number,
                state.player(active).name,
                describe_move(&mv)
            );
        }

        state = apply_move(&state, &mv);
        for event in &state.events {
            match event {
                GameEvent::PlayerEliminated(p) => {
                    println!(">> {} has been eliminated", state.player(*p).name)
                }
                GameEvent::GameOver(outcome) => match outcome {
                    Outcome::Winner(p) => println!(">> {} wins!", state.player(*p).name),
                    Outcome::Draw => println!(">> the game is a draw"),
                },
            }
        }
    }
    Ok(state)
}

fn make_controllers(
    state: &GameState,
    seed: u64,
    agent_type: &str,
    config: SearchConfig,
) -> Vec<Box<dyn Controller>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    state
        .player_ids()
        .map(|player| {
            let controller_seed = seed + player.0 as u64;
            let ai = |rng: &mut ChaCha8Rng| -> Box<dyn Controller> {
                Box::new(AiController::with_config(
                    player,
                    Personality::random(rng),
                    controller_seed,
                    config.clone(),
                ))
            };
            match agent_type {
                "random" => Box::new(RandomController::new(player, controller_seed)),
                "mixed" if player.0 % 2 == 1 => {
                    Box::new(RandomController::new(player, controller_seed))
                }
                _ => ai(&mut rng),
            }
        })
        .collect()
}

fn describe_move(mv: &Move) -> String {
    match mv {
        Move::Army { source, destination, count } => {
            format!("moves {} soldier(s) from #{} to #{}", count, source.0, destination.0)
        }
        Move::Build { region, upgrade } => {
            format!("builds {} at temple #{}", upgrade, region.0)
        }
        Move::EndTurn => "ends the turn".to_string(),
    }
}

fn print_standings(state: &GameState) {
    println!("\nGame finished on turn {}!", state.turn.number);
    match state.outcome {
        Some(Outcome::Winner(p)) => println!("  Winner: {}", state.player(p).name),
        Some(Outcome::Draw) => println!("  Result: draw"),
        None => println!("  Result: unfinished"),
    }
    println!("\n  Final standings:");
    for player in state.player_ids() {
        println!(
            "    {:10} -- regions: {:>2}, soldiers: {:>3}, faith: {:>3}",
            state.player(player).name,
            region_count(state, player),
            total_soldiers(state, player),
            cash(state, player),
        );
    }
}
