/// RoadQuiz Player: scripted 3D road-safety quiz
///
/// Architecture:
///   assets/  : model registry (asset id -> renderable with named nodes)
///   engine/  : camera, frame loop, renderer seam, audio, viewer window
///   game/    : quiz script, vehicles, steering, timelines, orchestrator

mod assets;
mod engine;
mod game;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use roadquiz_common::AppConfig;

use crate::assets::{AssetRegistry, DirectoryAssets, StaticAssets};
use crate::engine::clock::ManualClock;
use crate::engine::sound_engine::{AudioSink, LogAudio};
use crate::engine::{HeadlessRenderer, RenderLoop};
use crate::game::script::{OptionId, SceneConfig};
use crate::game::SceneOrchestrator;

/// Upper bound for one headless wait, so a broken script cannot spin forever
const MAX_WAIT_MS: u64 = 60_000;
/// Time given to a question's delayed triggers before moving on
const SETTLE_MS: u64 = 6_000;

#[derive(Parser)]
#[command(name = "roadquiz")]
#[command(about = "Scripted 3D road-safety quiz player", long_about = None)]
#[command(version)]
struct Cli {
    /// Scene script (TOML); defaults to the built-in quiz
    #[arg(long)]
    script: Option<PathBuf>,

    /// Application settings (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the model files
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Play a headless session with these answers, e.g. 1,1,3,2,3,1,2
    #[arg(long, value_delimiter = ',')]
    answers: Vec<u8>,

    /// Open the interactive viewer (requires the `window` feature)
    #[arg(long)]
    window: bool,

    /// Frame step for headless sessions (ms)
    #[arg(long)]
    step_ms: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(root) = &cli.assets {
        config.asset_root = Some(root.clone());
    }
    if let Some(step) = cli.step_ms {
        config.step_ms = step.max(1);
    }

    let directive = format!("roadquiz={}", config.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    tracing::info!("RoadQuiz Player v{}", env!("CARGO_PKG_VERSION"));

    let scene = match &cli.script {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("Failed to load scene script {}", path.display()))?,
        None => SceneConfig::builtin().context("Built-in scene script is invalid")?,
    };
    tracing::info!("Quiz has {} questions", scene.script.len());

    let answers = cli
        .answers
        .iter()
        .map(|n| OptionId::new(*n).with_context(|| format!("Answer {} is not in 1..=3", n)))
        .collect::<Result<Vec<_>>>()?;

    let mut registry = asset_registry(config.asset_root.as_deref());
    let audio = audio_sink(&config);
    let orchestrator = SceneOrchestrator::new(scene, registry.as_mut(), audio, config.aspect());

    if cli.window {
        return run_window(orchestrator, &config);
    }
    run_headless(orchestrator, &config, &answers)
}

fn asset_registry(root: Option<&Path>) -> Box<dyn AssetRegistry> {
    match root {
        Some(root) => {
            tracing::info!("Assets: {}", root.display());
            Box::new(DirectoryAssets::new(root))
        }
        None => Box::new(StaticAssets::new()),
    }
}

#[cfg(feature = "audio")]
fn audio_sink(config: &AppConfig) -> Box<dyn AudioSink> {
    use crate::engine::sound_engine::SoundEngine;

    if config.audio {
        let root = config
            .asset_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("assets"))
            .join("audio");
        if let Some(mut engine) = SoundEngine::new(&root) {
            engine.set_volume(config.volume);
            return Box::new(engine);
        }
    }
    Box::new(LogAudio)
}

#[cfg(not(feature = "audio"))]
fn audio_sink(config: &AppConfig) -> Box<dyn AudioSink> {
    if config.audio {
        tracing::debug!("Built without the `audio` feature; cues are logged only");
    }
    Box::new(LogAudio)
}

#[cfg(feature = "window")]
fn run_window(orchestrator: SceneOrchestrator, config: &AppConfig) -> Result<()> {
    engine::window::run(orchestrator, config.window_width, config.window_height)
}

#[cfg(not(feature = "window"))]
fn run_window(_orchestrator: SceneOrchestrator, _config: &AppConfig) -> Result<()> {
    anyhow::bail!("This build has no viewer; rebuild with `--features window`")
}

/// Play the quiz on a virtual clock: intro, then for each answer submit,
/// let the triggers play out and advance.
fn run_headless(mut orchestrator: SceneOrchestrator, config: &AppConfig, answers: &[OptionId]) -> Result<()> {
    let mut session = Headless {
        renderer: HeadlessRenderer::new(config.window_width, config.window_height),
        frame_loop: RenderLoop::new(ManualClock::new()),
        step_ms: config.step_ms as u64,
    };

    orchestrator.start();
    if !session.run_until(&mut orchestrator, MAX_WAIT_MS, |o| !o.state().answer_locked) {
        anyhow::bail!("Intro never unlocked the first question");
    }

    let total = orchestrator.config().script.len();
    for (i, answer) in answers.iter().enumerate() {
        let question = orchestrator.state().question_index;
        if !orchestrator.submit_answer(*answer) {
            tracing::warn!("Answer {} for question {} was not accepted", answer.number(), question);
            break;
        }
        session.run_until(&mut orchestrator, SETTLE_MS, |_| false);

        if i + 1 == answers.len() || !orchestrator.advance_question() {
            break;
        }
        if !session.run_until(&mut orchestrator, MAX_WAIT_MS, |o| !o.state().answer_locked) {
            anyhow::bail!("Question {} never unlocked", orchestrator.state().question_index);
        }
    }

    let state = orchestrator.state();
    tracing::info!(
        "Session finished at question {}/{}: score {}, {} frames at {}x{}, {} vehicles in view",
        state.question_index,
        total,
        state.score,
        session.frame_loop.frames(),
        session.renderer.size.0,
        session.renderer.size.1,
        session.renderer.last_visible
    );
    println!("score {}/{}", state.score, total);
    Ok(())
}

struct Headless {
    renderer: HeadlessRenderer,
    frame_loop: RenderLoop<ManualClock>,
    step_ms: u64,
}

impl Headless {
    /// Step frames until `done` holds or `max_ms` of virtual time passed
    fn run_until(
        &mut self,
        orchestrator: &mut SceneOrchestrator,
        max_ms: u64,
        done: impl Fn(&SceneOrchestrator) -> bool,
    ) -> bool {
        let mut waited = 0;
        while !done(orchestrator) && waited < max_ms {
            self.frame_loop.clock_mut().advance(self.step_ms);
            self.frame_loop.tick(orchestrator, &mut self.renderer);
            waited += self.step_ms;
        }
        done(orchestrator)
    }
}
