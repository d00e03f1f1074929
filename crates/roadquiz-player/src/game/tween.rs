//! Property tweens: time-bounded interpolation of one numeric property.
//!
//! A tween names *what* it animates (`Property`) and *where to* (`Goal`);
//! the start value is read from the target the moment the tween begins, so
//! relative goals (`By`) compose with whatever ran before.

use crate::assets::NodeRef;
use crate::game::script::OptionId;
use crate::game::ui::Element;
use crate::game::vehicles::VehicleId;

/// An animatable numeric property of the scene or page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Property {
    CameraX,
    CameraZ,
    /// Rotation about the x axis (radians)
    CameraPitch,
    Opacity(Element),
    OffsetY(Element),
    /// Flip angle of an answer option (degrees)
    OptionRotateX(OptionId),
    /// Rotation about x of a named node inside a vehicle model (radians)
    NodeAngle { vehicle: VehicleId, node: NodeRef },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Goal {
    /// Absolute end value
    To(f32),
    /// End value relative to the value at tween start
    By(f32),
}

impl Goal {
    pub fn resolve(self, from: f32) -> f32 {
        match self {
            Goal::To(v) => v,
            Goal::By(d) => from + d,
        }
    }
}

/// Easing curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    /// Quadratic ease-out; the default for UI and camera moves
    #[default]
    Power1Out,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Something whose properties tweens can read and write
pub trait Animatable {
    /// Current value, or `None` when the property has no backing object
    fn get(&self, property: Property) -> Option<f32>;
    fn set(&mut self, property: Property, value: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyTween {
    pub property: Property,
    pub goal: Goal,
}

impl PropertyTween {
    pub fn to(property: Property, value: f32) -> Self {
        Self { property, goal: Goal::To(value) }
    }

    pub fn by(property: Property, delta: f32) -> Self {
        Self { property, goal: Goal::By(delta) }
    }
}

/// A tween in flight: the start value is captured on first sample
#[derive(Debug, Clone)]
pub(crate) struct Track {
    tween: PropertyTween,
    from: Option<f32>,
}

impl Track {
    pub(crate) fn new(tween: PropertyTween) -> Self {
        Self { tween, from: None }
    }

    pub(crate) fn begin<A: Animatable + ?Sized>(&mut self, target: &A) {
        self.from = target.get(self.tween.property);
        if self.from.is_none() {
            tracing::trace!("Tween target {:?} missing; skipped", self.tween.property);
        }
    }

    /// Write the eased value for progress `k` (already eased)
    pub(crate) fn sample<A: Animatable + ?Sized>(&self, target: &mut A, k: f32) {
        if let Some(from) = self.from {
            let to = self.tween.goal.resolve(from);
            target.set(self.tween.property, from + (to - from) * k);
        }
    }
}
