//! Engine: camera, frame loop and renderer seam.
//!
//! `RenderLoop` drives one frame at a time: elapsed time from its clock,
//! the orchestrator's scheduler, the steering simulation, the blink colour,
//! then a single `Renderer::render` call with a `FrameView` snapshot.

pub mod clock;
pub mod sound_engine;
#[cfg(feature = "window")]
pub mod window;

use roadquiz_common::{Vec3, VehicleGroup};

use crate::game::catalog::PathCatalog;
use crate::game::script::CameraRig;
use crate::game::ui::UiState;
use crate::game::vehicles::PlacedProp;
use crate::game::SceneOrchestrator;
use clock::Clock;

/// Sky colour behind the scene
pub const CLEAR_COLOR: u32 = 0x94d8fb;
/// Blink lamp colours (on / off phase)
pub const BLINK_ON: u32 = 0xdc2f02;
pub const BLINK_OFF: u32 = 0xff8300;
/// Blink phase divisor: the lamp flips every π·130 ms
const BLINK_PERIOD_DIV: f64 = 130.0;
/// Longest frame delta fed to the simulation (ms)
const MAX_FRAME_MS: u64 = 250;

/// Lamp colour at wall-clock time `t_ms`
pub fn blink_color(t_ms: u64) -> u32 {
    if (t_ms as f64 / BLINK_PERIOD_DIV).sin() > 0.0 {
        BLINK_ON
    } else {
        BLINK_OFF
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Perspective camera; y is fixed, only x, z and pitch move
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation about the x axis (radians, negative looks down)
    pub pitch: f32,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera {
    /// Camera at the rig's start, looking at the scene origin
    pub fn from_rig(rig: &CameraRig, aspect: f32) -> Self {
        let p = rig.start;
        let ground = (p.x * p.x + p.z * p.z).sqrt();
        Self {
            position: p,
            pitch: -p.y.atan2(ground),
            fov_deg: rig.fov_deg,
            near: rig.near,
            far: rig.far,
            aspect,
        }
    }

    /// Recompute the aspect ratio for a new viewport
    pub fn resize(&mut self, width: usize, height: usize) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Point on the ground plane the camera looks at (straight ahead, -z)
    pub fn ground_target(&self) -> Vec3 {
        let down = -self.pitch;
        let dist = if down > 1e-3 { self.position.y / down.tan() } else { self.far };
        Vec3::new(self.position.x, 0.0, self.position.z - dist.min(self.far))
    }
}

// ---------------------------------------------------------------------------
// Frame snapshot + renderer seam
// ---------------------------------------------------------------------------

/// A vehicle as the renderer needs it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(not(feature = "window"), allow(dead_code))] // Read by the viewer
pub struct VehicleView {
    pub group: VehicleGroup,
    pub position: Vec3,
    pub yaw: f32,
    /// Model scale
    pub scale: f32,
    pub driving: bool,
    /// Current speed (units/s)
    pub speed: f32,
    /// World positions of the front and back blink lamps
    pub lamps: Option<[Vec3; 2]>,
}

/// A prop as the renderer needs it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(not(feature = "window"), allow(dead_code))] // Read by the viewer
pub struct PropView {
    pub position: Vec3,
    /// Unit vector along the prop's local +z
    pub heading: Vec3,
    /// Placement scale times model scale
    pub scale: f32,
}

impl PropView {
    fn from_placed(prop: &PlacedProp) -> Self {
        Self {
            position: prop.position,
            heading: Vec3::new(0.0, 0.0, 1.0).rotated_y(prop.yaw),
            scale: prop.scale * prop.renderable.scale,
        }
    }
}

/// Everything drawn in one frame
pub struct FrameView<'a> {
    pub time_ms: u64,
    pub camera: &'a Camera,
    pub ui: &'a UiState,
    pub catalog: &'a PathCatalog,
    /// Visible vehicles only
    pub vehicles: Vec<VehicleView>,
    pub props: Vec<PropView>,
    pub blink_color: u32,
    pub clear_color: u32,
}

impl<'a> FrameView<'a> {
    pub fn capture(orchestrator: &'a SceneOrchestrator, time_ms: u64) -> Self {
        let ctx = orchestrator.context();
        let vehicles = ctx
            .roster
            .iter()
            .filter(|v| v.visible)
            .filter_map(|v| {
                let steer = ctx.sim.get(v.entity)?;
                let lamps = v.blink.map(|b| {
                    [
                        steer.position + b.front.rotated_y(steer.yaw),
                        steer.position + b.back.rotated_y(steer.yaw),
                    ]
                });
                Some(VehicleView {
                    group: v.group,
                    position: steer.position,
                    yaw: steer.yaw,
                    scale: v.renderable.scale,
                    driving: steer.is_path_following() && !steer.has_arrived(),
                    speed: steer.velocity.length(),
                    lamps,
                })
            })
            .collect();

        Self {
            time_ms,
            camera: &ctx.camera,
            ui: &ctx.ui,
            catalog: &orchestrator.config().catalog,
            vehicles,
            props: ctx.props.iter().map(PropView::from_placed).collect(),
            blink_color: blink_color(time_ms),
            clear_color: CLEAR_COLOR,
        }
    }
}

/// Output side of the frame loop
pub trait Renderer {
    fn render(&mut self, frame: &FrameView<'_>);
    /// Viewport changed size
    fn resize(&mut self, width: usize, height: usize);
}

/// Renders nothing; counts frames
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub frames: u64,
    pub size: (usize, usize),
    pub last_visible: usize,
}

impl HeadlessRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        self.last_visible = frame.vehicles.len();
        tracing::trace!(
            "Frame {} at {} ms: {} vehicles, camera ({:.1}, {:.1}) pitch {:.2} fov {:.0} aspect {:.2}",
            self.frames,
            frame.time_ms,
            frame.vehicles.len(),
            frame.camera.position.x,
            frame.camera.position.z,
            frame.camera.pitch,
            frame.camera.fov_deg,
            frame.camera.aspect
        );
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.size = (width, height);
    }
}

// ---------------------------------------------------------------------------
// RenderLoop
// ---------------------------------------------------------------------------

pub struct RenderLoop<C: Clock> {
    clock: C,
    last_ms: u64,
    frames: u64,
}

impl<C: Clock> RenderLoop<C> {
    pub fn new(clock: C) -> Self {
        let last_ms = clock.now_ms();
        Self {
            clock,
            last_ms,
            frames: 0,
        }
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame; returns the elapsed delta (ms)
    pub fn tick(&mut self, orchestrator: &mut SceneOrchestrator, renderer: &mut dyn Renderer) -> u32 {
        let now = self.clock.now_ms();
        let dt = now.saturating_sub(self.last_ms).min(MAX_FRAME_MS) as u32;
        self.last_ms = now;

        orchestrator.tick(dt);
        let arrived = orchestrator.context_mut().sim.update(dt as f32 / 1000.0);
        if !arrived.is_empty() {
            tracing::debug!("{} vehicle(s) reached the end of their lane", arrived.len());
        }

        renderer.render(&FrameView::capture(orchestrator, now));
        self.frames += 1;
        dt
    }

    /// Viewport resize, applied immediately
    pub fn resize(
        &mut self,
        orchestrator: &mut SceneOrchestrator,
        renderer: &mut dyn Renderer,
        width: usize,
        height: usize,
    ) {
        orchestrator.context_mut().camera.resize(width, height);
        renderer.resize(width, height);
        tracing::debug!("Viewport resized to {}x{}", width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticAssets;
    use crate::engine::clock::ManualClock;
    use crate::engine::sound_engine::LogAudio;
    use crate::game::script::{OptionId, SceneConfig};

    fn orchestrator() -> SceneOrchestrator {
        SceneOrchestrator::new(
            SceneConfig::builtin().unwrap(),
            &mut StaticAssets::new(),
            Box::new(LogAudio),
            16.0 / 9.0,
        )
    }

    fn frames(lp: &mut RenderLoop<ManualClock>, o: &mut SceneOrchestrator, r: &mut HeadlessRenderer, n: usize) {
        for _ in 0..n {
            lp.clock_mut().advance(16);
            lp.tick(o, r);
        }
    }

    #[test]
    fn blink_alternates_with_sine() {
        assert_eq!(blink_color(100), BLINK_ON);
        // sin(500/130) = sin(3.85) < 0
        assert_eq!(blink_color(500), BLINK_OFF);
        assert_eq!(blink_color(0), BLINK_OFF);
    }

    #[test]
    fn camera_starts_looking_at_origin() {
        let cfg = SceneConfig::builtin().unwrap();
        let cam = Camera::from_rig(&cfg.camera, 2.0);
        assert_eq!(cam.position, Vec3::new(3.0, 10.0, 218.0));
        assert!(cam.pitch < 0.0 && cam.pitch > -0.1);
        assert_eq!(cam.fov_deg, 45.0);
    }

    #[test]
    fn resize_updates_aspect_and_renderer() {
        let mut o = orchestrator();
        let mut r = HeadlessRenderer::new(1280, 720);
        let mut lp = RenderLoop::new(ManualClock::new());
        lp.resize(&mut o, &mut r, 800, 800);
        assert_eq!(o.context().camera.aspect, 1.0);
        assert_eq!(r.size, (800, 800));
        lp.resize(&mut o, &mut r, 0, 0);
        assert_eq!(o.context().camera.aspect, 1.0);
    }

    #[test]
    fn hidden_vehicles_are_not_drawn() {
        let mut o = orchestrator();
        let mut r = HeadlessRenderer::default();
        let mut lp = RenderLoop::new(ManualClock::new());
        frames(&mut lp, &mut o, &mut r, 1);
        assert_eq!(r.frames, 1);
        assert_eq!(r.last_visible, 14);
    }

    #[test]
    fn loop_moves_triggered_vehicles() {
        let mut o = orchestrator();
        let mut r = HeadlessRenderer::default();
        let mut lp = RenderLoop::new(ManualClock::new());
        o.start();
        frames(&mut lp, &mut o, &mut r, 820);
        assert!(o.submit_answer(OptionId::new(1).unwrap()));

        let ctx = o.context();
        let id = ctx.roster.slot(VehicleGroup::Yellow, 0).unwrap();
        let handle = ctx.roster.get(id).unwrap().entity;
        let start = ctx.sim.get(handle).unwrap().position;

        frames(&mut lp, &mut o, &mut r, 63);
        let now = o.context().sim.get(handle).unwrap().position;
        // ~1 s at 5 units/s
        assert!((start.distance_to(now) - 5.0).abs() < 0.2, "moved {}", start.distance_to(now));
        let view = FrameView::capture(&o, 0);
        let moving: Vec<&VehicleView> = view.vehicles.iter().filter(|v| v.driving).collect();
        assert!(!moving.is_empty());
        assert!(moving.iter().all(|v| (v.speed - 5.0).abs() < 1e-3));
        assert_eq!(lp.frames(), 883);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut o = orchestrator();
        let mut r = HeadlessRenderer::default();
        let mut lp = RenderLoop::new(ManualClock::new());
        lp.clock_mut().advance(10_000);
        assert_eq!(lp.tick(&mut o, &mut r), MAX_FRAME_MS as u32);
    }

    #[test]
    fn lamps_follow_vehicle_heading() {
        let o = orchestrator();
        let frame = FrameView::capture(&o, 0);
        let lit: Vec<&VehicleView> = frame.vehicles.iter().filter(|v| v.lamps.is_some()).collect();
        assert!(!lit.is_empty());
        for v in lit {
            let [front, back] = v.lamps.unwrap();
            assert!(front.distance_to(v.position) < 5.0);
            assert!(back.distance_to(v.position) < 5.0);
        }
        assert_eq!(frame.clear_color, CLEAR_COLOR);
    }

    #[test]
    fn props_carry_heading_and_combined_scale() {
        let o = orchestrator();
        let frame = FrameView::capture(&o, 0);
        assert_eq!(frame.props.len(), o.context().props.len());
        let school = o
            .context()
            .props
            .iter()
            .position(|p| p.renderable.asset == "school")
            .unwrap();
        let view = &frame.props[school];
        // yaw 90 degrees turns local +z onto +x
        assert!((view.heading.x - 1.0).abs() < 1e-5, "heading {:?}", view.heading);
        assert!(view.heading.z.abs() < 1e-5);
        assert_eq!(view.scale, 10.0);
        let jeepney = frame.vehicles.iter().find(|v| v.scale == 0.2);
        assert!(jeepney.is_some());
    }
}
