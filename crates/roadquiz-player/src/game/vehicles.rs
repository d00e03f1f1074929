//! Vehicles: spawning, slot bookkeeping and scene loading.
//!
//! `VehicleFactory::spawn` binds a loaded model to a lane: it registers a
//! parked steering entity at the lane's first point and resolves the wheel
//! nodes the orchestrator will spin later. `VehicleRoster` owns every
//! vehicle and maps (group, slot) to a stable `VehicleId`.
//!
//! `load_scene` runs the whole load: every model once (reporting progress),
//! then the spawns and props that use it. A model that fails to load leaves
//! its slots empty for the rest of the session.

use std::collections::BTreeMap;

use roadquiz_common::{Vec3, VehicleGroup};

use crate::assets::{AssetError, AssetRegistry, NodeRef, Renderable};
use crate::game::catalog::Path;
use crate::game::script::{BlinkSpec, SceneConfig, WheelSpec};
use crate::game::steering::{EntityHandle, EntityManager, SteeringVehicle};
use crate::game::ui::UiSink;

/// Stable handle of a spawned vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub u32);

/// Resolved wheel nodes of a vehicle model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelNodes {
    pub front_left: NodeRef,
    pub front_right: NodeRef,
    pub back: NodeRef,
}

impl WheelNodes {
    pub fn all(&self) -> [NodeRef; 3] {
        [self.front_left, self.front_right, self.back]
    }
}

#[derive(Debug, Clone)]
pub struct VehicleEntity {
    pub id: VehicleId,
    pub group: VehicleGroup,
    /// Lane index inside the group's paths
    pub lane: usize,
    /// Steering entity inside the `EntityManager`
    pub entity: EntityHandle,
    pub renderable: Renderable,
    pub visible: bool,
    pub wheels: Option<WheelNodes>,
    pub blink: Option<BlinkSpec>,
    /// Rotation about x of every model node (radians), indexed by `NodeRef`
    pub node_angles: Vec<f32>,
}

impl VehicleEntity {
    pub fn node_angle(&self, node: NodeRef) -> Option<f32> {
        self.node_angles.get(node.0).copied()
    }

    pub fn set_node_angle(&mut self, node: NodeRef, angle: f32) {
        if let Some(a) = self.node_angles.get_mut(node.0) {
            *a = angle;
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds vehicle entities and hands out ids
#[derive(Debug, Default)]
pub struct VehicleFactory {
    next_id: u32,
}

impl VehicleFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parked vehicle at the first point of `path`.
    ///
    /// The steering entity starts with path following off; it only moves
    /// once the orchestrator switches it on.
    pub fn spawn(
        &mut self,
        sim: &mut EntityManager,
        group: VehicleGroup,
        renderable: Renderable,
        path: &Path,
        yaw: f32,
        blink: Option<BlinkSpec>,
        wheel_spec: Option<&WheelSpec>,
    ) -> VehicleEntity {
        let id = VehicleId(self.next_id);
        self.next_id += 1;

        let entity = sim.add(SteeringVehicle::new(path.clone(), yaw));
        let wheels = wheel_spec.and_then(|spec| resolve_wheels(&renderable, spec));
        if wheel_spec.is_some() && wheels.is_none() {
            tracing::warn!(
                "{} vehicle {:?} ('{}') lacks wheel nodes; wheels won't spin",
                group.display_name(),
                id,
                renderable.asset
            );
        }

        VehicleEntity {
            id,
            group,
            lane: 0,
            entity,
            node_angles: vec![0.0; renderable.nodes.len()],
            renderable,
            visible: true,
            wheels,
            blink,
        }
    }
}

fn resolve_wheels(renderable: &Renderable, spec: &WheelSpec) -> Option<WheelNodes> {
    let [fl, fr, b] = spec.names().map(|n| renderable.node(n));
    Some(WheelNodes {
        front_left: fl?,
        front_right: fr?,
        back: b?,
    })
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Every spawned vehicle plus the per-group slot table
#[derive(Debug, Default)]
pub struct VehicleRoster {
    vehicles: Vec<VehicleEntity>,
    /// Slot n of a group -> vehicle; `None` when its model failed to load
    slots: BTreeMap<VehicleGroup, Vec<Option<VehicleId>>>,
}

impl VehicleRoster {
    /// Append a vehicle as the next slot of its group
    pub fn insert(&mut self, vehicle: VehicleEntity) -> VehicleId {
        let id = vehicle.id;
        self.slots.entry(vehicle.group).or_default().push(Some(id));
        self.vehicles.push(vehicle);
        id
    }

    /// Reserve the next slot of `group` for a vehicle that never loaded
    pub fn insert_empty(&mut self, group: VehicleGroup) {
        self.slots.entry(group).or_default().push(None);
    }

    /// Vehicle in slot `n` of `group`, if it loaded
    pub fn slot(&self, group: VehicleGroup, n: usize) -> Option<VehicleId> {
        self.slots.get(&group).and_then(|s| s.get(n)).copied().flatten()
    }

    /// Number of slots (loaded or not) for `group`
    #[cfg(test)]
    pub fn slot_count(&self, group: VehicleGroup) -> usize {
        self.slots.get(&group).map_or(0, Vec::len)
    }

    pub fn get(&self, id: VehicleId) -> Option<&VehicleEntity> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut VehicleEntity> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleEntity> {
        self.vehicles.iter()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

}

// ---------------------------------------------------------------------------
// Scene loading
// ---------------------------------------------------------------------------

/// Static scenery placed at load
#[derive(Debug, Clone)]
pub struct PlacedProp {
    pub renderable: Renderable,
    pub position: Vec3,
    pub yaw: f32,
    pub scale: f32,
}

/// Everything `load_scene` produced
#[derive(Debug, Default)]
pub struct LoadedScene {
    pub roster: VehicleRoster,
    pub props: Vec<PlacedProp>,
    /// Asset ids that failed to load
    pub failed: Vec<String>,
}

/// Load every model, then spawn vehicles and place props.
///
/// Progress goes to `ui` after each model as `loaded / total * 100`; a
/// failed model still counts as done. The loading indicator is hidden once
/// the last model has been attempted.
pub fn load_scene(
    cfg: &SceneConfig,
    assets: &mut dyn AssetRegistry,
    sim: &mut EntityManager,
    ui: &mut dyn UiSink,
) -> LoadedScene {
    let total = cfg.assets.len();
    let mut loaded: BTreeMap<&str, Result<Renderable, AssetError>> = BTreeMap::new();

    for (i, spec) in cfg.assets.iter().enumerate() {
        let result = assets.load(spec);
        if let Err(e) = &result {
            tracing::warn!("Skipping '{}': {}", spec.id, e);
        }
        loaded.insert(spec.id.as_str(), result);

        let done = i + 1;
        tracing::debug!("Loading {} ({}/{})", spec.file, done, total);
        ui.set_loading_progress(done as f32 / total as f32 * 100.0);
    }
    ui.hide_loading();

    let mut scene = LoadedScene::default();
    scene.failed = loaded
        .iter()
        .filter(|(_, r)| r.is_err())
        .map(|(id, _)| id.to_string())
        .collect();

    let mut factory = VehicleFactory::new();
    for spawn in &cfg.spawns {
        let renderable = loaded.get(spawn.asset.as_str()).and_then(|r| r.as_ref().ok());
        let path = cfg.catalog.get(spawn.group, spawn.lane);
        let (Some(renderable), Some(path)) = (renderable, path) else {
            scene.roster.insert_empty(spawn.group);
            continue;
        };

        let mut vehicle = factory.spawn(
            sim,
            spawn.group,
            renderable.clone(),
            path,
            spawn.yaw,
            spawn.blink,
            cfg.wheels.get(&spawn.group),
        );
        vehicle.lane = spawn.lane;
        vehicle.visible = spawn.visible;
        scene.roster.insert(vehicle);
    }

    for prop in &cfg.props {
        if let Some(Ok(renderable)) = loaded.get(prop.asset.as_str()) {
            scene.props.push(PlacedProp {
                renderable: renderable.clone(),
                position: prop.position,
                yaw: prop.yaw,
                scale: prop.scale,
            });
        }
    }

    tracing::info!(
        "Scene loaded: {} vehicles ({} simulated), {} props, {} failed assets",
        scene.roster.len(),
        sim.len(),
        scene.props.len(),
        scene.failed.len()
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticAssets;
    use crate::game::ui::UiState;

    fn load(assets: &mut StaticAssets) -> (LoadedScene, EntityManager, UiState) {
        load_from(&SceneConfig::builtin().unwrap(), assets)
    }

    fn load_from(cfg: &SceneConfig, assets: &mut StaticAssets) -> (LoadedScene, EntityManager, UiState) {
        let mut sim = EntityManager::new();
        let mut ui = UiState::new();
        let scene = load_scene(cfg, assets, &mut sim, &mut ui);
        (scene, sim, ui)
    }

    #[test]
    fn spawns_fill_every_slot() {
        let (scene, sim, ui) = load(&mut StaticAssets::new());
        let r = &scene.roster;
        assert_eq!(r.slot_count(VehicleGroup::Yellow), 7);
        assert_eq!(r.slot_count(VehicleGroup::Red), 7);
        assert_eq!(r.slot_count(VehicleGroup::Blue), 5);
        assert_eq!(r.slot_count(VehicleGroup::Ambulance), 1);
        assert_eq!(sim.len(), 20);
        assert_eq!(ui.loading_progress, 100.0);
        assert!(!ui.loading_visible);
    }

    #[test]
    fn vehicles_start_parked_at_lane_start() {
        let cfg = SceneConfig::builtin().unwrap();
        let (scene, sim, _) = load_from(&cfg, &mut StaticAssets::new());
        for v in scene.roster.iter() {
            let steer = sim.get(v.entity).unwrap();
            assert!(!steer.is_path_following());
            let lane = cfg.catalog.get(v.group, v.lane).unwrap();
            assert_eq!(steer.position, lane.first());
            assert!(steer.path().shares_storage(lane));
        }
    }

    #[test]
    fn initial_visibility_matches_layout() {
        let (scene, _, _) = load(&mut StaticAssets::new());
        let hidden = |g, n| !scene.roster.get(scene.roster.slot(g, n).unwrap()).unwrap().visible;
        assert!(hidden(VehicleGroup::Yellow, 4));
        assert!(hidden(VehicleGroup::Red, 0));
        assert!(hidden(VehicleGroup::Red, 3));
        assert!(hidden(VehicleGroup::Blue, 0));
        assert!(hidden(VehicleGroup::Blue, 2));
        assert!(hidden(VehicleGroup::Blue, 3));
        assert!(!hidden(VehicleGroup::Yellow, 0));
        let hidden_count = scene.roster.iter().filter(|v| !v.visible).count();
        assert_eq!(hidden_count, 6);
    }

    #[test]
    fn wheels_resolve_for_wheeled_groups() {
        let (scene, _, _) = load(&mut StaticAssets::new());
        let yellow = scene.roster.get(scene.roster.slot(VehicleGroup::Yellow, 0).unwrap()).unwrap();
        let wheels = yellow.wheels.unwrap();
        assert_eq!(wheels.all(), [NodeRef(0), NodeRef(1), NodeRef(2)]);
        let amb = scene.roster.get(scene.roster.slot(VehicleGroup::Ambulance, 0).unwrap()).unwrap();
        assert!(amb.wheels.is_none());
    }

    #[test]
    fn failed_model_leaves_empty_slots() {
        let (scene, sim, ui) = load(&mut StaticAssets::new().without("jeepney"));
        assert_eq!(scene.roster.slot_count(VehicleGroup::Blue), 5);
        assert!((0..5).all(|n| scene.roster.slot(VehicleGroup::Blue, n).is_none()));
        assert!(scene.roster.slot(VehicleGroup::Red, 0).is_some());
        assert_eq!(scene.failed, vec!["jeepney".to_string()]);
        assert_eq!(sim.len(), 15);
        assert!(!ui.loading_visible);
    }

    #[test]
    fn props_follow_their_models() {
        let (scene, _, _) = load(&mut StaticAssets::new());
        assert!(scene.props.iter().any(|p| p.renderable.asset == "school" && p.scale == 10.0));
        let (scene, _, _) = load(&mut StaticAssets::new().without("arrow"));
        assert!(scene.props.iter().all(|p| p.renderable.asset != "arrow"));
    }

    #[test]
    fn node_angles_track_model_nodes() {
        let (mut scene, _, _) = load(&mut StaticAssets::new());
        let id = scene.roster.slot(VehicleGroup::Red, 1).unwrap();
        let v = scene.roster.get_mut(id).unwrap();
        assert_eq!(v.node_angles.len(), 3);
        v.set_node_angle(NodeRef(2), 1.5);
        assert_eq!(v.node_angle(NodeRef(2)), Some(1.5));
        assert_eq!(v.node_angle(NodeRef(9)), None);
    }
}
