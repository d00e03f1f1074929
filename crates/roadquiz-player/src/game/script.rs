//! Question script and scene layout: loaded from a TOML document.
//!
//! The document (see `data/quiz.toml`) describes:
//!   - `[camera]`    : start position, intro dolly target, projection
//!   - `[[asset]]`   : model files and the named sub-nodes they expose
//!   - `[wheels]`    : wheel node names per vehicle group
//!   - `[[blink]]`   : named blink-lamp offsets
//!   - `[[path]]`    : lanes, appended per group in file order
//!   - `[[spawn]]`   : vehicles; the n-th spawn of a group is its slot n
//!   - `[[prop]]`    : static scenery, optionally anchored to a lane start
//!   - `[[question]]`: quiz steps with their camera plan and trigger plan
//!
//! Everything is checked once at load: a script that could index a vehicle
//! slot that was never configured is rejected here rather than at runtime.

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use serde::Deserialize;
use thiserror::Error;

use roadquiz_common::{Vec3, VehicleGroup};

use crate::assets::AssetSpec;
use crate::game::catalog::{Path, PathCatalog};
use crate::game::ui::Symbol;

/// Built-in scene shipped with the player
const BUILTIN_SCENE: &str = include_str!("../../data/quiz.toml");

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read scene script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scene script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Scene script has no questions")]
    NoQuestions,

    #[error("Question {question}: correct option {value} is not in 1..=3")]
    CorrectOutOfRange { question: usize, value: u8 },

    #[error("Question {question}: no trigger is marked `last`")]
    NoLastTrigger { question: usize },

    #[error("Question {question}: {group:?} trigger spins wheels but no wheel nodes are configured for the group")]
    MissingWheels { question: usize, group: VehicleGroup },

    #[error("Question {question}: {group:?} slot {slot} is out of bounds ({spawned} spawned)")]
    SlotOutOfBounds {
        question: usize,
        group: VehicleGroup,
        slot: usize,
        spawned: usize,
    },

    #[error("Empty path #{lane} for {group:?}")]
    EmptyPath { group: VehicleGroup, lane: usize },

    #[error("Unknown lane #{lane} for {group:?}")]
    UnknownLane { group: VehicleGroup, lane: usize },

    #[error("Unknown asset '{0}'")]
    UnknownAsset(String),

    #[error("Unknown blink light '{0}'")]
    UnknownBlink(String),
}

// ---------------------------------------------------------------------------
// Runtime types
// ---------------------------------------------------------------------------

/// One of the three answer options, numbered 1..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(u8);

impl OptionId {
    pub const ALL: [OptionId; 3] = [OptionId(1), OptionId(2), OptionId(3)];

    pub fn new(number: u8) -> Option<Self> {
        (1..=3).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-option arrays
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

/// Camera rig shared by every question: y and look direction never change
#[derive(Debug, Clone, Deserialize)]
pub struct CameraRig {
    pub start: Vec3,
    /// z the intro dolly ends at
    pub intro_z: f32,
    /// Pitch (rotation about x) reached by the intro, in radians
    pub pitch: f32,
    #[serde(default = "default_fov")]
    pub fov_deg: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_fov() -> f32 {
    45.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

/// Where the camera goes when a question comes up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPlan {
    pub x: f32,
    pub z: f32,
    pub pitch: f32,
}

/// Names of the three spinning wheel nodes inside a vehicle model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WheelSpec {
    pub front_left: String,
    pub front_right: String,
    pub back: String,
}

impl WheelSpec {
    pub fn names(&self) -> [&str; 3] {
        [&self.front_left, &self.front_right, &self.back]
    }
}

/// Front/back lamp offsets in the vehicle's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkSpec {
    pub front: Vec3,
    pub back: Vec3,
}

/// Which slot of a group a trigger addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    /// The orchestrator's current trigger slot
    Current,
    /// A fixed slot, independent of quiz progress
    Fixed(usize),
}

/// A delayed "start driving" instruction for one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub delay_ms: u32,
    pub group: VehicleGroup,
    pub slot: SlotRef,
    /// Spin the group's wheel nodes while driving
    pub spin_wheels: bool,
    /// Firing this trigger completes the question's slot
    pub last_in_step: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriggerPlan {
    pub triggers: Vec<Trigger>,
}

/// A single quiz step
#[derive(Debug, Clone)]
pub struct QuestionStep {
    /// 1-based question number
    pub number: usize,
    pub text: String,
    pub answers: [String; 3],
    pub correct: OptionId,
    pub camera: CameraPlan,
    pub plan: TriggerPlan,
}

impl QuestionStep {
    /// Symbol shown next to each option once an answer is in
    pub fn symbols(&self) -> [Symbol; 3] {
        OptionId::ALL.map(|o| {
            if o == self.correct {
                Symbol::Correct
            } else {
                Symbol::Incorrect
            }
        })
    }

    pub fn answer(&self, option: OptionId) -> &str {
        &self.answers[option.index()]
    }
}

/// The fixed, ordered quiz
#[derive(Debug, Clone)]
pub struct QuestionScript {
    steps: Vec<QuestionStep>,
}

impl QuestionScript {
    /// Step for a 1-based question number
    pub fn get(&self, question: usize) -> Option<&QuestionStep> {
        question.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[cfg(test)]
    pub fn steps(&self) -> &[QuestionStep] {
        &self.steps
    }
}

/// A vehicle to create at load
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub group: VehicleGroup,
    pub asset: String,
    pub lane: usize,
    /// Initial heading in radians
    pub yaw: f32,
    pub blink: Option<BlinkSpec>,
    pub visible: bool,
}

/// Static scenery, already resolved to a world position
#[derive(Debug, Clone)]
pub struct PropSpec {
    pub asset: String,
    pub position: Vec3,
    pub yaw: f32,
    pub scale: f32,
}

/// Everything the player needs to build the scene and run the quiz
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub camera: CameraRig,
    pub assets: Vec<AssetSpec>,
    pub wheels: BTreeMap<VehicleGroup, WheelSpec>,
    pub catalog: PathCatalog,
    pub spawns: Vec<SpawnSpec>,
    pub props: Vec<PropSpec>,
    pub script: QuestionScript,
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SceneDocument {
    camera: CameraRig,
    #[serde(default)]
    asset: Vec<AssetSpec>,
    #[serde(default)]
    wheels: BTreeMap<VehicleGroup, WheelSpec>,
    #[serde(default)]
    blink: Vec<BlinkDoc>,
    #[serde(default)]
    path: Vec<PathDoc>,
    #[serde(default)]
    spawn: Vec<SpawnDoc>,
    #[serde(default)]
    prop: Vec<PropDoc>,
    #[serde(default)]
    question: Vec<QuestionDoc>,
}

#[derive(Deserialize)]
struct BlinkDoc {
    name: String,
    front: Vec3,
    back: Vec3,
}

#[derive(Deserialize)]
struct PathDoc {
    group: VehicleGroup,
    points: Vec<Vec3>,
}

#[derive(Deserialize)]
struct SpawnDoc {
    group: VehicleGroup,
    asset: String,
    lane: usize,
    #[serde(default)]
    yaw_deg: f32,
    blink: Option<String>,
    #[serde(default = "yes")]
    visible: bool,
}

#[derive(Deserialize)]
struct AnchorDoc {
    group: VehicleGroup,
    lane: usize,
}

#[derive(Deserialize)]
struct PropDoc {
    asset: String,
    position: Option<Vec3>,
    anchor: Option<AnchorDoc>,
    #[serde(default)]
    offset: Vec3,
    #[serde(default)]
    yaw_deg: f32,
    #[serde(default = "one")]
    scale: f32,
}

#[derive(Deserialize)]
struct CameraPlanDoc {
    x: f32,
    z: f32,
    pitch: Option<f32>,
}

#[derive(Deserialize)]
struct TriggerDoc {
    group: VehicleGroup,
    #[serde(default)]
    delay_ms: u32,
    #[serde(default)]
    wheels: bool,
    #[serde(default)]
    last: bool,
    slot: Option<usize>,
}

#[derive(Deserialize)]
struct QuestionDoc {
    text: String,
    answers: [String; 3],
    correct: u8,
    camera: CameraPlanDoc,
    #[serde(default)]
    trigger: Vec<TriggerDoc>,
}

fn yes() -> bool {
    true
}

fn one() -> f32 {
    1.0
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl SceneConfig {
    /// The scene compiled into the binary
    pub fn builtin() -> Result<Self, ScriptError> {
        Self::from_toml_str(BUILTIN_SCENE)
    }

    pub fn load(path: &FsPath) -> Result<Self, ScriptError> {
        let src = std::fs::read_to_string(path)?;
        tracing::info!("Loading scene script {}", path.display());
        Self::from_toml_str(&src)
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ScriptError> {
        let doc: SceneDocument = toml::from_str(src)?;
        Self::from_document(doc)
    }

    fn from_document(doc: SceneDocument) -> Result<Self, ScriptError> {
        let mut catalog = PathCatalog::new();
        for p in doc.path {
            let lane = catalog.lane_count(p.group);
            let path = Path::new(p.points).ok_or(ScriptError::EmptyPath { group: p.group, lane })?;
            tracing::trace!("Lane {} #{}: {:.1} units", p.group.display_name(), lane, path.length());
            catalog.push(p.group, path);
        }

        let blinks: BTreeMap<String, BlinkSpec> = doc
            .blink
            .into_iter()
            .map(|b| (b.name, BlinkSpec { front: b.front, back: b.back }))
            .collect();

        let known_asset = |id: &str| doc.asset.iter().any(|a| a.id == id);

        // Slot counts per group follow spawn order in the document
        let mut spawned: BTreeMap<VehicleGroup, usize> = BTreeMap::new();
        let mut spawns = Vec::with_capacity(doc.spawn.len());
        for s in doc.spawn {
            if !known_asset(&s.asset) {
                return Err(ScriptError::UnknownAsset(s.asset));
            }
            if catalog.get(s.group, s.lane).is_none() {
                return Err(ScriptError::UnknownLane { group: s.group, lane: s.lane });
            }
            let blink = match s.blink {
                Some(name) => Some(*blinks.get(&name).ok_or(ScriptError::UnknownBlink(name))?),
                None => None,
            };
            *spawned.entry(s.group).or_default() += 1;
            spawns.push(SpawnSpec {
                group: s.group,
                asset: s.asset,
                lane: s.lane,
                yaw: s.yaw_deg.to_radians(),
                blink,
                visible: s.visible,
            });
        }

        let mut props = Vec::with_capacity(doc.prop.len());
        for p in doc.prop {
            if !known_asset(&p.asset) {
                return Err(ScriptError::UnknownAsset(p.asset));
            }
            let base = match (&p.anchor, p.position) {
                (Some(a), _) => catalog
                    .get(a.group, a.lane)
                    .map(Path::first)
                    .ok_or(ScriptError::UnknownLane { group: a.group, lane: a.lane })?,
                (None, Some(pos)) => pos,
                (None, None) => Vec3::ZERO,
            };
            props.push(PropSpec {
                asset: p.asset,
                position: base + p.offset,
                yaw: p.yaw_deg.to_radians(),
                scale: p.scale,
            });
        }

        if doc.question.is_empty() {
            return Err(ScriptError::NoQuestions);
        }

        let mut steps = Vec::with_capacity(doc.question.len());
        for (i, q) in doc.question.into_iter().enumerate() {
            let number = i + 1;
            let correct = OptionId::new(q.correct).ok_or(ScriptError::CorrectOutOfRange {
                question: number,
                value: q.correct,
            })?;
            if !q.trigger.iter().any(|t| t.last) {
                return Err(ScriptError::NoLastTrigger { question: number });
            }

            let mut triggers = Vec::with_capacity(q.trigger.len());
            for t in q.trigger {
                // The trigger slot advances exactly once per question
                let slot = t.slot.unwrap_or(i);
                let available = spawned.get(&t.group).copied().unwrap_or(0);
                if slot >= available {
                    return Err(ScriptError::SlotOutOfBounds {
                        question: number,
                        group: t.group,
                        slot,
                        spawned: available,
                    });
                }
                if t.wheels && !doc.wheels.contains_key(&t.group) {
                    return Err(ScriptError::MissingWheels { question: number, group: t.group });
                }
                triggers.push(Trigger {
                    delay_ms: t.delay_ms,
                    group: t.group,
                    slot: t.slot.map_or(SlotRef::Current, SlotRef::Fixed),
                    spin_wheels: t.wheels,
                    last_in_step: t.last,
                });
            }

            steps.push(QuestionStep {
                number,
                text: q.text,
                answers: q.answers,
                correct,
                camera: CameraPlan {
                    x: q.camera.x,
                    z: q.camera.z,
                    pitch: q.camera.pitch.unwrap_or(doc.camera.pitch),
                },
                plan: TriggerPlan { triggers },
            });
        }

        tracing::debug!(
            "Scene script: {} questions, {} lanes, {} spawns, {} props",
            steps.len(),
            catalog.iter().count(),
            spawns.len(),
            props.len()
        );

        Ok(Self {
            camera: doc.camera,
            assets: doc.asset,
            wheels: doc.wheels,
            catalog,
            spawns,
            props,
            script: QuestionScript { steps },
        })
    }

    /// Number of configured slots for a group
    #[cfg(test)]
    pub fn slots(&self, group: VehicleGroup) -> usize {
        self.spawns.iter().filter(|s| s.group == group).count()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
