use std::path::PathBuf;

use macroquad::prelude::*;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vivarium::renderer::{self, MacroquadSurface, Surface, Viewport};
use vivarium::themes::{ProfileStats, Theme};
use vivarium::ui::{self, HudAction, HudState};
use vivarium::{ConfigError, Engine, EngineConfig, EngineError, PointerEvent};

const USAGE: &str = "usage: vivarium [virus|emotion|circus|star|neural] [--seed N] [--config file.json]";

/// Stand-in activity numbers for the demo seed.
const DEMO_PROFILE: ProfileStats = ProfileStats {
    repositories: 24,
    commits: 850,
    stars: 40,
    followers: 12,
    languages: 5,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

struct Args {
    theme: Theme,
    seed: u64,
    config: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let mut parsed = Self {
            theme: Theme::VirusEvolution,
            seed: 42,
            config: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seed" => {
                    let value = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--seed needs a value".into()))?;
                    parsed.seed = value
                        .parse()
                        .map_err(|_| CliError::Usage(format!("bad seed `{value}`")))?;
                }
                "--config" => {
                    let value = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--config needs a path".into()))?;
                    parsed.config = Some(PathBuf::from(value));
                }
                other => {
                    parsed.theme = Theme::parse_cli(other)
                        .ok_or_else(|| CliError::Usage(format!("unknown theme `{other}`")))?;
                }
            }
        }
        Ok(parsed)
    }
}

/// Theme config, or the `--config` file in its place.
fn load_config(theme: Theme, path: Option<&PathBuf>) -> Result<EngineConfig, CliError> {
    let Some(path) = path else {
        return Ok(theme.config());
    };
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(EngineConfig::from_json_str(&json)?)
}

fn start(engine: &mut Engine, theme: Theme, args: &Args, seed: u64) -> Result<(), CliError> {
    let config = load_config(theme, args.config.as_ref())?;
    let profile = theme.seed_from_profile(&DEMO_PROFILE);
    engine.init_seeded(config, &profile, seed)?;
    info!(theme = theme.label(), seed, "started");
    Ok(())
}

/// Tracks the mouse so only real changes become pointer events.
#[derive(Default)]
struct PointerTracker {
    last: Option<Vec2>,
}

impl PointerTracker {
    fn poll(&mut self, view: &Viewport) -> Option<PointerEvent> {
        let screen = Vec2::from(mouse_position());
        let world = view.to_world(screen);

        if is_mouse_button_pressed(MouseButton::Left) {
            self.last = Some(world);
            return Some(PointerEvent::down(world.x, world.y));
        }
        if is_mouse_button_released(MouseButton::Left) {
            self.last = None;
            return Some(PointerEvent::up(world.x, world.y));
        }
        if is_mouse_button_down(MouseButton::Left) && self.last != Some(world) {
            self.last = Some(world);
            return Some(PointerEvent::moved(world.x, world.y));
        }
        None
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Vivarium".to_string(),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vivarium=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            return;
        }
    };

    let mut theme = args.theme;
    let mut run_seed = args.seed;
    let mut engine = Engine::new();
    if let Err(err) = start(&mut engine, theme, &args, run_seed) {
        error!(%err, "failed to start");
        return;
    }

    let mut palette = theme.palette();
    let mut surface = MacroquadSurface;
    let mut pointer = PointerTracker::default();
    let mut hud = HudState::default();

    loop {
        let mut egui_wants_pointer = false;
        egui_macroquad::cfg(|ctx| {
            egui_wants_pointer = ctx.wants_pointer_input();
        });

        if let Some(snap) = engine.snapshot() {
            let view = Viewport::fit(&snap.bounds, surface.size());
            if !egui_wants_pointer {
                if let Some(event) = pointer.poll(&view) {
                    if let Err(err) = engine.handle_input(event) {
                        warn!(%err, "pointer event rejected");
                    }
                }
            }
        }

        if is_key_pressed(KeyCode::Space) {
            hud.paused = !hud.paused;
        }

        if !hud.paused || hud.step_requested {
            let dt = if hud.paused { 1.0 / 60.0 } else { get_frame_time() };
            if let Err(err) = engine.tick(dt) {
                warn!(%err, "tick rejected");
            }
            hud.step_requested = false;
        }

        if let Some(snap) = engine.snapshot() {
            renderer::render(&mut surface, &snap, &palette);
        }

        for action in ui::draw_hud(&engine, theme, &palette, &mut hud) {
            let result = match action {
                HudAction::SetMode(mode) => engine.set_input_mode(mode).map_err(CliError::from),
                HudAction::Restart => {
                    run_seed = run_seed.wrapping_add(1);
                    start(&mut engine, theme, &args, run_seed)
                }
                HudAction::NextTheme => {
                    theme = theme.next();
                    palette = theme.palette();
                    start(&mut engine, theme, &args, run_seed)
                }
            };
            if let Err(err) = result {
                error!(%err, "action failed");
            }
        }

        next_frame().await;
    }
}
