/// Entry point and game loop.

use std::time::{Duration, Instant};

use log::{info, LevelFilter};

use candygrab::config::GameConfig;
use candygrab::domain::entity::FrameInput;
use candygrab::sim::event::GameEvent;
use candygrab::sim::level::{self, LevelDef};
use candygrab::sim::step;
use candygrab::sim::world::{Phase, WorldState};
use candygrab::ui::input::InputState;
use candygrab::ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config);

    let levels = level::load_levels(&config);
    let mut world = WorldState::new(config.tuning.clone());
    if let Err(e) = level::new_game(&mut world, &levels) {
        eprintln!("Cannot start: {e}");
        return;
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &levels, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Candy Grab!");
    println!("Final Score: {}", world.score);
}

/// The terminal is in raw mode while playing, so logs only go to a file.
/// Without `log_file` they are dropped unless `RUST_LOG` asks for stderr.
fn init_logging(config: &GameConfig) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    match &config.log_file {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {e}", path.display());
                builder.filter_level(LevelFilter::Off);
            }
        },
        None if std::env::var_os("RUST_LOG").is_none() => {
            builder.filter_level(LevelFilter::Off);
        }
        None => {}
    }
    // Only fails if a logger is already installed
    let _ = builder.try_init();
}

fn game_loop(
    world: &mut WorldState,
    levels: &[LevelDef],
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new(renderer.reports_key_release());
    let clock = Instant::now();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    // Fire is edge-triggered; hold it until the next tick consumes it.
    let mut pending_fire = false;

    loop {
        kb.drain_events();
        if kb.quit_requested() {
            info!("quit at level {} with {} points", world.current_level + 1, world.score);
            break;
        }

        match world.phase {
            Phase::Playing => {
                if kb.frame_input().fire {
                    pending_fire = true;
                }
            }
            Phase::LevelComplete => {
                if kb.confirm_pressed() {
                    level::advance_level(world, levels)?;
                }
            }
            Phase::GameOver => {
                if kb.confirm_pressed() {
                    level::new_game(world, levels)?;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let now_ms = clock.elapsed().as_millis() as u64;
            let input = FrameInput { movement: kb.movement(), fire: pending_fire };
            pending_fire = false;
            let events = step::step(world, input, now_ms);
            announce(world, &events);
            last_tick = Instant::now();
        }

        renderer.render(world, clock.elapsed().as_millis() as u64)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Turn the tick's events into status-bar messages.
fn announce(world: &mut WorldState, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::VillainWaking { id } => {
                world.set_message(&format!("Villain {} is waking up!", id + 1), 45);
            }
            GameEvent::PlayerKilled { lives_left } => {
                world.set_message(&format!("Caught!  {lives_left} lives left"), 90);
            }
            GameEvent::GameOver { score } => {
                world.set_message(&format!("GAME OVER  Final score {score}"), 0);
            }
            _ => {}
        }
    }
}
