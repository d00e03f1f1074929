//! Game logic: the quiz orchestrator and the scene it drives.
//!
//! `SceneOrchestrator` owns the quiz state and a `SceneContext` (camera, UI
//! model, vehicles, steering simulation, audio). User input arrives as
//! `start`, `submit_answer` and `advance_question`; each one mutates state
//! immediately and queues timelines or delayed cues on the scheduler. The
//! frame loop calls `tick`, which plays the timelines against the context
//! and applies the cues that came due.

pub mod catalog;
pub mod script;
pub mod steering;
pub mod timeline;
pub mod tween;
pub mod ui;
pub mod vehicles;

use std::collections::BTreeSet;

use roadquiz_common::VehicleGroup;

use crate::assets::AssetRegistry;
use crate::engine::sound_engine::{AudioCue, AudioRole, AudioSink};
use crate::engine::Camera;

use script::{CameraPlan, OptionId, SceneConfig, SlotRef};
use steering::EntityManager;
use timeline::{Position, Scheduler, Timeline};
use tween::{Animatable, Ease, Property, PropertyTween};
use ui::{Element, OptionColors, UiSink, UiState};
use vehicles::{PlacedProp, VehicleId, VehicleRoster, WheelNodes};

// ---------------------------------------------------------------------------
// Timing (ms)
// ---------------------------------------------------------------------------

const CAMERA_MOVE_MS: u32 = 4000;
const FADE_MS: u32 = 200;
const PANEL_MS: u32 = 500;
const TITLE_FADE_MS: u32 = 1000;
const OPTION_FLIP_MS: u32 = 200;
/// Gap between consecutive option reveals
const OPTION_GAP_MS: u32 = 2400;
/// Gap between the intro camera move and the first question
const INTRO_QUESTION_GAP_MS: u32 = 700;
/// Gap between the intro question and its first option
const INTRO_OPTION_GAP_MS: u32 = 2500;
const WHEEL_SPIN_MS: u32 = 20_000;
/// Wheel rotation over one spin (radians)
const WHEEL_SPIN_RAD: f32 = 60.0;
const HIDDEN_ROTATION_DEG: f32 = 90.0;

// ---------------------------------------------------------------------------
// Scene context
// ---------------------------------------------------------------------------

/// Everything the orchestrator mutates besides its own counters
pub struct SceneContext {
    pub camera: Camera,
    pub ui: UiState,
    pub roster: VehicleRoster,
    pub sim: EntityManager,
    pub props: Vec<PlacedProp>,
    pub audio: Box<dyn AudioSink>,
}

impl Animatable for SceneContext {
    fn get(&self, property: Property) -> Option<f32> {
        match property {
            Property::CameraX => Some(self.camera.position.x),
            Property::CameraZ => Some(self.camera.position.z),
            Property::CameraPitch => Some(self.camera.pitch),
            Property::Opacity(el) => Some(self.ui.opacity(el)),
            Property::OffsetY(el) => Some(self.ui.offset_y(el)),
            Property::OptionRotateX(opt) => Some(self.ui.option(opt).rotate_x),
            Property::NodeAngle { vehicle, node } => self.roster.get(vehicle)?.node_angle(node),
        }
    }

    fn set(&mut self, property: Property, value: f32) {
        match property {
            Property::CameraX => self.camera.position.x = value,
            Property::CameraZ => self.camera.position.z = value,
            Property::CameraPitch => self.camera.pitch = value,
            Property::Opacity(el) => self.ui.set_opacity(el, value),
            Property::OffsetY(el) => self.ui.set_offset_y(el, value),
            Property::OptionRotateX(opt) => self.ui.set_option_rotation(opt, value),
            Property::NodeAngle { vehicle, node } => {
                if let Some(v) = self.roster.get_mut(vehicle) {
                    v.set_node_angle(node, value);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Quiz state + cues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizState {
    /// 1-based current question
    pub question_index: usize,
    /// Slot each group's `Current` trigger addresses
    pub trigger_slot: usize,
    pub score: u32,
    /// No answer accepted while set
    pub answer_locked: bool,
}

impl Default for QuizState {
    fn default() -> Self {
        Self {
            question_index: 1,
            trigger_slot: 0,
            score: 0,
            answer_locked: true,
        }
    }
}

/// Deferred effects; question-tagged cues are dropped once the quiz has
/// moved past their question.
#[derive(Debug, Clone, PartialEq)]
enum Cue {
    /// Start a vehicle driving. The vehicle was resolved when the answer
    /// came in; `None` means its slot never loaded.
    Activate {
        vehicle: Option<VehicleId>,
        group: VehicleGroup,
        slot: usize,
        spin_wheels: bool,
        last_in_step: bool,
        answer: u64,
    },
    /// Reset option styling and swap in the question's text
    ShowContent { question: usize },
    QuestionShown { question: usize },
    OptionShown { question: usize, option: OptionId },
}

// ---------------------------------------------------------------------------
// SceneOrchestrator
// ---------------------------------------------------------------------------

pub struct SceneOrchestrator {
    config: SceneConfig,
    ctx: SceneContext,
    state: QuizState,
    scheduler: Scheduler<Cue>,
    started: bool,
    advance_enabled: bool,
    /// Serial of the latest accepted answer
    answers: u64,
    /// Answers whose last-in-step trigger has not fired yet
    pending_slot_advance: BTreeSet<u64>,
}

impl SceneOrchestrator {
    /// Load the scene and put the page in its pre-start state
    pub fn new(
        config: SceneConfig,
        assets: &mut dyn AssetRegistry,
        audio: Box<dyn AudioSink>,
        aspect: f32,
    ) -> Self {
        let mut ui = UiState::new();
        let mut sim = EntityManager::new();
        let scene = vehicles::load_scene(&config, assets, &mut sim, &mut ui);
        let camera = Camera::from_rig(&config.camera, aspect);

        let mut orchestrator = Self {
            ctx: SceneContext {
                camera,
                ui,
                roster: scene.roster,
                sim,
                props: scene.props,
                audio,
            },
            config,
            state: QuizState::default(),
            scheduler: Scheduler::new(),
            started: false,
            advance_enabled: true,
            answers: 0,
            pending_slot_advance: BTreeSet::new(),
        };
        orchestrator.show_content(1);
        orchestrator
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn context(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.ctx
    }

    #[cfg(test)]
    pub fn advance_enabled(&self) -> bool {
        self.advance_enabled
    }

    /// No timeline or delayed cue pending
    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Intro: fade the title away, dolly the camera in and reveal the first
    /// question. Runs once; later calls return false.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        let q = self.state.question_index;
        let rig = &self.config.camera;

        let intro = Timeline::new()
            .to(
                [
                    PropertyTween::to(Property::Opacity(Element::StartButton), 0.0),
                    PropertyTween::by(Property::OffsetY(Element::StartButton), -20.0),
                ],
                PANEL_MS,
                Position::At(0),
            )
            .to(
                [
                    PropertyTween::to(Property::Opacity(Element::Title), 0.0),
                    PropertyTween::by(Property::OffsetY(Element::Title), -20.0),
                ],
                TITLE_FADE_MS,
                Position::At(0),
            )
            .to(
                [
                    PropertyTween::to(Property::CameraZ, rig.intro_z),
                    PropertyTween::to(Property::CameraPitch, rig.pitch),
                ],
                CAMERA_MOVE_MS,
                Position::At(0),
            );
        let intro = reveal_options(
            reveal_question(intro, q, Position::AfterEnd(INTRO_QUESTION_GAP_MS)),
            q,
            INTRO_OPTION_GAP_MS,
        );

        tracing::info!("Quiz started");
        self.scheduler.play(intro);
        true
    }

    /// Accept an answer for the current question. Returns false (and does
    /// nothing) while answers are locked.
    pub fn submit_answer(&mut self, option: OptionId) -> bool {
        if self.state.answer_locked {
            tracing::trace!("Answer {} ignored: locked", option.number());
            return false;
        }
        let Some(step) = self.config.script.get(self.state.question_index).cloned() else {
            return false;
        };
        self.state.answer_locked = true;
        self.answers += 1;
        let answer = self.answers;

        for trigger in &step.plan.triggers {
            let slot = match trigger.slot {
                SlotRef::Current => self.state.trigger_slot,
                SlotRef::Fixed(n) => n,
            };
            self.scheduler.after(
                trigger.delay_ms,
                Cue::Activate {
                    vehicle: self.ctx.roster.slot(trigger.group, slot),
                    group: trigger.group,
                    slot,
                    spin_wheels: trigger.spin_wheels,
                    last_in_step: trigger.last_in_step,
                    answer,
                },
            );
        }
        self.pending_slot_advance.insert(answer);

        for (opt, symbol) in OptionId::ALL.into_iter().zip(step.symbols()) {
            self.ctx.ui.set_symbol(opt, Some(symbol));
        }
        self.ctx.ui.set_option_colors(option, OptionColors::CHOSEN);

        let correct = option == step.correct;
        if correct {
            self.state.score += 1;
            self.ctx.ui.set_score(self.state.score);
        }
        tracing::info!(
            "Question {}: answered {} ({}) at {} ms, score {}",
            step.number,
            option.number(),
            if correct { "correct" } else { "incorrect" },
            self.scheduler.now_ms(),
            self.state.score
        );

        self.scheduler.play(Timeline::new().to(
            [
                PropertyTween::to(Property::Opacity(Element::Explanation), 1.0),
                PropertyTween::by(Property::OffsetY(Element::Explanation), -10.0),
            ],
            PANEL_MS,
            Position::At(0),
        ));
        true
    }

    /// Move on to the next question. Only effective while answers are
    /// locked and the advance control is enabled; returns whether it was.
    pub fn advance_question(&mut self) -> bool {
        if !self.state.answer_locked || !self.advance_enabled {
            tracing::trace!("Advance ignored");
            return false;
        }
        let next = self.state.question_index + 1;
        let Some(camera) = self.config.script.get(next).map(|s| s.camera) else {
            self.disable_advance();
            return false;
        };
        self.state.question_index = next;
        if next == self.config.script.len() {
            self.disable_advance();
        }

        tracing::info!("Advancing to question {}", next);
        self.scheduler.play(advance_timeline(camera, next));
        true
    }

    /// Advance the scheduler by `dt_ms` and apply the cues that came due
    pub fn tick(&mut self, dt_ms: u32) {
        let cues = self.scheduler.advance(dt_ms, &mut self.ctx);
        for cue in cues {
            self.apply(cue);
        }
    }

    fn disable_advance(&mut self) {
        self.advance_enabled = false;
        self.ctx.ui.set_advance_enabled(false);
    }

    fn apply(&mut self, cue: Cue) {
        tracing::debug!("Cue {:?}", cue);
        match cue {
            Cue::Activate {
                vehicle,
                group,
                slot,
                spin_wheels,
                last_in_step,
                answer,
            } => {
                match vehicle.and_then(|id| self.ctx.roster.get(id)) {
                    Some(v) => {
                        let (id, entity, wheels) = (v.id, v.entity, v.wheels);
                        if let Some(steer) = self.ctx.sim.get_mut(entity) {
                            steer.set_path_following(true);
                        }
                        if spin_wheels {
                            if let Some(wheels) = wheels {
                                self.scheduler.play(wheel_spin(id, wheels));
                            }
                        }
                    }
                    None => tracing::warn!(
                        "{} slot {} has no vehicle; trigger skipped",
                        group.display_name(),
                        slot
                    ),
                }
                if last_in_step && self.pending_slot_advance.remove(&answer) {
                    self.state.trigger_slot += 1;
                    tracing::debug!("Trigger slot -> {}", self.state.trigger_slot);
                }
            }
            Cue::ShowContent { question } if self.is_current(question) => {
                self.show_content(question);
            }
            Cue::QuestionShown { question } if self.is_current(question) => {
                self.ctx.audio.play(AudioCue::new(question, AudioRole::Question));
            }
            Cue::OptionShown { question, option } if self.is_current(question) => {
                if let Some(role) = AudioRole::answer(option.number()) {
                    self.ctx.audio.play(AudioCue::new(question, role));
                }
                if option == OptionId::ALL[2] {
                    self.state.answer_locked = false;
                    tracing::debug!("Question {} open for answers", question);
                }
            }
            stale => tracing::debug!("Stale cue dropped: {:?}", stale),
        }
    }

    fn is_current(&self, question: usize) -> bool {
        question == self.state.question_index
    }

    /// Neutral option styling, cleared symbols and the texts of `question`
    fn show_content(&mut self, question: usize) {
        let Some(step) = self.config.script.get(question) else {
            return;
        };
        let ui = &mut self.ctx.ui;
        for opt in OptionId::ALL {
            ui.set_option_colors(opt, OptionColors::IDLE);
            ui.set_symbol(opt, None);
            ui.set_option_text(opt, step.answer(opt));
        }
        ui.set_question_text(&step.text);
    }
}

// ---------------------------------------------------------------------------
// Timelines
// ---------------------------------------------------------------------------

fn reveal_question(tl: Timeline<Cue>, question: usize, position: Position) -> Timeline<Cue> {
    tl.to([PropertyTween::to(Property::Opacity(Element::Question), 1.0)], FADE_MS, position)
        .then(Cue::QuestionShown { question })
}

/// Flip the three options in one after another, `first_gap_ms` after the
/// timeline so far and `OPTION_GAP_MS` apart.
fn reveal_options(mut tl: Timeline<Cue>, question: usize, first_gap_ms: u32) -> Timeline<Cue> {
    let mut gap = first_gap_ms;
    for option in OptionId::ALL {
        tl = tl
            .to(
                [PropertyTween::to(Property::OptionRotateX(option), 0.0)],
                OPTION_FLIP_MS,
                Position::AfterEnd(gap),
            )
            .then(Cue::OptionShown { question, option });
        gap = OPTION_GAP_MS;
    }
    tl
}

fn advance_timeline(camera: CameraPlan, question: usize) -> Timeline<Cue> {
    let [o1, o2, o3] = OptionId::ALL;
    let tl = Timeline::new()
        .to(
            [
                PropertyTween::to(Property::CameraX, camera.x),
                PropertyTween::to(Property::CameraZ, camera.z),
                PropertyTween::to(Property::CameraPitch, camera.pitch),
            ],
            CAMERA_MOVE_MS,
            Position::At(0),
        )
        .to([PropertyTween::to(Property::Opacity(Element::Question), 0.0)], FADE_MS, Position::At(0))
        .to(
            [
                PropertyTween::to(Property::Opacity(Element::Explanation), 0.0),
                PropertyTween::by(Property::OffsetY(Element::Explanation), 10.0),
            ],
            PANEL_MS,
            Position::At(0),
        )
        .to(
            [PropertyTween::to(Property::OptionRotateX(o1), HIDDEN_ROTATION_DEG)],
            1500,
            Position::BeforeEnd(3700),
        )
        .to(
            [PropertyTween::to(Property::OptionRotateX(o2), HIDDEN_ROTATION_DEG)],
            1000,
            Position::BeforeEnd(3500),
        )
        .to(
            [PropertyTween::to(Property::OptionRotateX(o3), HIDDEN_ROTATION_DEG)],
            OPTION_FLIP_MS,
            Position::BeforeEnd(3300),
        )
        .then(Cue::ShowContent { question });
    reveal_options(reveal_question(tl, question, Position::BeforeEnd(PANEL_MS)), question, OPTION_GAP_MS)
}

fn wheel_spin(vehicle: VehicleId, wheels: WheelNodes) -> Timeline<Cue> {
    Timeline::new()
        .to(
            wheels
                .all()
                .map(|node| PropertyTween::by(Property::NodeAngle { vehicle, node }, WHEEL_SPIN_RAD)),
            WHEEL_SPIN_MS,
            Position::End,
        )
        .ease(Ease::Linear)
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticAssets;
    use crate::engine::sound_engine::RecordingAudio;
    use crate::game::ui::Symbol;

    const STEP_MS: u32 = 16;
    /// Long enough for the intro or an advance reveal to finish
    const REVEAL_MS: u32 = 13_000;

    fn opt(n: u8) -> OptionId {
        OptionId::new(n).unwrap()
    }

    fn orchestrator_with(config: SceneConfig, assets: &mut StaticAssets) -> (SceneOrchestrator, RecordingAudio) {
        let audio = RecordingAudio::default();
        let o = SceneOrchestrator::new(config, assets, Box::new(audio.clone()), 16.0 / 9.0);
        (o, audio)
    }

    fn orchestrator() -> (SceneOrchestrator, RecordingAudio) {
        orchestrator_with(SceneConfig::builtin().unwrap(), &mut StaticAssets::new())
    }

    fn run(o: &mut SceneOrchestrator, ms: u32) {
        let mut left = ms;
        while left > 0 {
            let dt = left.min(STEP_MS);
            o.tick(dt);
            left -= dt;
        }
    }

    fn started() -> (SceneOrchestrator, RecordingAudio) {
        let (mut o, audio) = orchestrator();
        assert!(o.start());
        run(&mut o, REVEAL_MS);
        (o, audio)
    }

    fn following(o: &SceneOrchestrator, group: VehicleGroup, slot: usize) -> bool {
        let ctx = o.context();
        let v = ctx.roster.get(ctx.roster.slot(group, slot).unwrap()).unwrap();
        ctx.sim.get(v.entity).unwrap().is_path_following()
    }

    #[test]
    fn initial_state() {
        let (o, _) = orchestrator();
        assert_eq!(o.state(), QuizState::default());
        assert_eq!(o.state().question_index, 1);
        assert!(o.state().answer_locked);
        assert!(o.advance_enabled());
        let ui = &o.context().ui;
        assert_eq!(ui.question, o.config().script.get(1).unwrap().text);
        assert!(!ui.loading_visible);
    }

    #[test]
    fn answers_are_ignored_before_the_intro_finishes() {
        let (mut o, _) = orchestrator();
        assert!(!o.submit_answer(opt(1)));
        o.start();
        run(&mut o, 5000);
        assert!(!o.submit_answer(opt(1)));
        assert_eq!(o.state().score, 0);
    }

    #[test]
    fn intro_runs_once_and_unlocks() {
        let (mut o, audio) = started();
        assert!(!o.start());
        assert!(!o.state().answer_locked);
        let roles: Vec<AudioRole> = audio.played().iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![AudioRole::Question, AudioRole::Answer1, AudioRole::Answer2, AudioRole::Answer3]
        );
        assert!(audio.played().iter().all(|c| c.question == 1));

        let ctx = o.context();
        assert!((ctx.camera.position.z - 144.0).abs() < 1e-3);
        assert!((ctx.camera.pitch + 0.4).abs() < 1e-4);
        assert!(!ctx.ui.is_visible(Element::StartButton));
        assert!(!ctx.ui.is_visible(Element::Title));
        assert!(ctx.ui.is_visible(Element::Question));
        assert!(ctx.ui.options.iter().all(|o| o.rotate_x == 0.0));
    }

    #[test]
    fn unlock_lands_after_third_option() {
        let (mut o, _) = orchestrator();
        o.start();
        // 4000 + 700 + 200 + 2500 + 200 + 2400 + 200 + 2400 + 200
        run(&mut o, 12_800);
        assert!(!o.state().answer_locked);
        let (mut o, _) = orchestrator();
        o.start();
        run(&mut o, 12_784);
        assert!(o.state().answer_locked);
    }

    #[test]
    fn correct_answer_scores_one() {
        let (mut o, _) = started();
        assert!(o.submit_answer(opt(1)));
        assert_eq!(o.state().score, 1);
        assert_eq!(o.context().ui.score, 1);
        assert!(o.state().answer_locked);
    }

    #[test]
    fn incorrect_answer_keeps_score() {
        let (mut o, _) = started();
        assert!(o.submit_answer(opt(2)));
        assert_eq!(o.state().score, 0);
    }

    #[test]
    fn double_submit_counts_once() {
        let (mut o, _) = started();
        assert!(o.submit_answer(opt(1)));
        assert!(!o.submit_answer(opt(1)));
        assert!(!o.submit_answer(opt(2)));
        assert_eq!(o.state().score, 1);
        run(&mut o, 6000);
        assert_eq!(o.state().trigger_slot, 1);
    }

    #[test]
    fn submit_decorates_options() {
        let (mut o, _) = started();
        o.submit_answer(opt(2));
        let ui = &o.context().ui;
        assert_eq!(ui.option(opt(1)).symbol_image, Symbol::Correct.image_url());
        assert_eq!(ui.option(opt(2)).symbol_image, Symbol::Incorrect.image_url());
        assert_eq!(ui.option(opt(3)).symbol_image, Symbol::Incorrect.image_url());
        assert_eq!(ui.option(opt(2)).colors, OptionColors::CHOSEN);
        assert_eq!(ui.option(opt(1)).colors, OptionColors::IDLE);

        run(&mut o, PANEL_MS);
        let ui = &o.context().ui;
        assert_eq!(ui.opacity(Element::Explanation), 1.0);
        assert_eq!(ui.offset_y(Element::Explanation), -10.0);
    }

    #[test]
    fn triggers_fire_after_their_delays() {
        let (mut o, _) = started();
        o.submit_answer(opt(1));
        o.tick(0);
        assert!(following(&o, VehicleGroup::Ambulance, 0));
        assert!(following(&o, VehicleGroup::Yellow, 0));
        assert!(following(&o, VehicleGroup::Blue, 0));
        assert!(!following(&o, VehicleGroup::Red, 0));
        assert_eq!(o.state().trigger_slot, 0);

        run(&mut o, 5000);
        assert!(following(&o, VehicleGroup::Red, 0));
        assert_eq!(o.state().trigger_slot, 1);
        assert!(!following(&o, VehicleGroup::Yellow, 1));
    }

    #[test]
    fn wheels_spin_sixty_radians() {
        let (mut o, _) = started();
        o.submit_answer(opt(1));
        o.tick(0);
        run(&mut o, WHEEL_SPIN_MS);
        let ctx = o.context();
        let yellow = ctx.roster.get(ctx.roster.slot(VehicleGroup::Yellow, 0).unwrap()).unwrap();
        for node in yellow.wheels.unwrap().all() {
            assert!((yellow.node_angle(node).unwrap() - WHEEL_SPIN_RAD).abs() < 1e-3);
        }
        let amb = ctx.roster.get(ctx.roster.slot(VehicleGroup::Ambulance, 0).unwrap()).unwrap();
        assert!(amb.node_angles.iter().all(|a| *a == 0.0));
    }

    #[test]
    fn advance_is_noop_while_unlocked() {
        let (mut o, _) = started();
        let before = o.state();
        assert!(!o.advance_question());
        assert_eq!(o.state(), before);
        assert!(o.is_idle());
    }

    #[test]
    fn six_advances_reach_the_last_question() {
        let (mut o, _) = orchestrator();
        for _ in 0..6 {
            assert!(o.advance_question());
        }
        assert_eq!(o.state().question_index, 7);
        assert!(!o.advance_enabled());
        assert!(!o.context().ui.advance_enabled);

        assert!(!o.advance_question());
        assert_eq!(o.state().question_index, 7);
    }

    #[test]
    fn answer_then_advance_scenario() {
        let (mut o, audio) = started();
        assert_eq!((o.state().question_index, o.state().trigger_slot, o.state().score), (1, 0, 0));

        assert!(o.submit_answer(opt(1)));
        run(&mut o, 6000);
        let s = o.state();
        assert_eq!((s.score, s.trigger_slot, s.answer_locked), (1, 1, true));

        assert!(o.advance_question());
        assert_eq!(o.state().question_index, 2);
        assert!(o.state().answer_locked);
        run(&mut o, REVEAL_MS);
        assert!(!o.state().answer_locked);

        let q2: Vec<AudioCue> = audio.played().into_iter().filter(|c| c.question == 2).collect();
        assert_eq!(q2.len(), 4);
        assert_eq!(q2[0].role, AudioRole::Question);

        let step = o.config().script.get(2).unwrap().clone();
        let ctx = o.context();
        assert_eq!(ctx.ui.question, step.text);
        assert_eq!(ctx.ui.option(opt(3)).text, step.answers[2]);
        assert!(ctx.ui.options.iter().all(|v| v.symbol_image.is_empty()));
        assert_eq!(ctx.ui.option(opt(1)).colors, OptionColors::IDLE);
        assert!((ctx.camera.position.x - step.camera.x).abs() < 1e-3);
        assert!((ctx.camera.position.z - step.camera.z).abs() < 1e-3);
        assert!(!ctx.ui.is_visible(Element::Explanation));
    }

    #[test]
    fn content_swaps_while_options_are_turned_away() {
        let (mut o, _) = started();
        o.submit_answer(opt(1));
        run(&mut o, 6000);
        o.advance_question();
        run(&mut o, 880);
        assert_eq!(o.context().ui.question, o.config().script.get(1).unwrap().text);
        run(&mut o, 40);
        let ui = &o.context().ui;
        assert_eq!(ui.question, o.config().script.get(2).unwrap().text);
        assert_eq!(ui.option(opt(3)).rotate_x, HIDDEN_ROTATION_DEG);
    }

    #[test]
    fn second_question_drives_second_slot() {
        let (mut o, _) = started();
        o.submit_answer(opt(1));
        run(&mut o, 6000);
        o.advance_question();
        run(&mut o, REVEAL_MS);
        assert!(o.submit_answer(opt(1)));
        o.tick(0);
        assert!(following(&o, VehicleGroup::Yellow, 1));
        assert!(!following(&o, VehicleGroup::Red, 1));
        run(&mut o, 3000);
        assert!(following(&o, VehicleGroup::Red, 1));
        assert_eq!(o.state().trigger_slot, 2);
        assert_eq!(o.state().score, 2);
    }

    #[test]
    fn stale_reveal_cues_are_dropped() {
        let (mut o, audio) = orchestrator();
        o.advance_question();
        run(&mut o, 1000);
        o.advance_question();
        run(&mut o, 2 * REVEAL_MS);
        let played = audio.played();
        assert!(played.iter().all(|c| c.question == 3), "{:?}", played);
        assert_eq!(played.len(), 4);
        assert_eq!(o.context().ui.question, o.config().script.get(3).unwrap().text);
        assert!(!o.state().answer_locked);
    }

    #[test]
    fn slot_advances_once_with_several_last_triggers() {
        let src = r#"
            [camera]
            start = [0.0, 10.0, 50.0]
            intro_z = 40.0
            pitch = -0.4

            [[asset]]
            id = "car"
            file = "car.glb"

            [[path]]
            group = "red"
            points = [[0.0, 0.0, 0.0], [0.0, 0.0, -20.0]]

            [[spawn]]
            group = "red"
            asset = "car"
            lane = 0

            [[spawn]]
            group = "red"
            asset = "car"
            lane = 0

            [[question]]
            text = "Q1"
            answers = ["a", "b", "c"]
            correct = 1
            camera = { x = 0.0, z = 40.0 }

            [[question.trigger]]
            group = "red"
            last = true

            [[question.trigger]]
            group = "red"
            delay_ms = 100
            last = true

            [[question.trigger]]
            group = "red"
            delay_ms = 200
            last = true
        "#;
        let (mut o, _) = orchestrator_with(SceneConfig::from_toml_str(src).unwrap(), &mut StaticAssets::new());
        o.start();
        run(&mut o, REVEAL_MS);
        assert!(o.submit_answer(opt(1)));
        run(&mut o, 1000);
        assert_eq!(o.state().trigger_slot, 1);
    }

    #[test]
    fn missing_vehicle_still_completes_the_step() {
        let (mut o, _) = orchestrator_with(SceneConfig::builtin().unwrap(), &mut StaticAssets::new().without("red"));
        o.start();
        run(&mut o, REVEAL_MS);
        assert!(o.submit_answer(opt(1)));
        run(&mut o, 6000);
        assert_eq!(o.state().trigger_slot, 1);
        assert!(following(&o, VehicleGroup::Yellow, 0));
    }

    #[test]
    fn last_question_uses_pinned_blue_slot() {
        let (mut o, _) = orchestrator();
        for _ in 0..6 {
            o.advance_question();
        }
        run(&mut o, REVEAL_MS);
        assert!(!o.state().answer_locked);
        assert!(o.submit_answer(opt(2)));
        o.tick(0);
        assert!(following(&o, VehicleGroup::Blue, 4));
        assert_eq!(o.state().score, 1);
    }
}
