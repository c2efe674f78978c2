//! The office scene without any GPU state: graph, camera rig, animation and
//! input handling. `Graphics` draws whatever this holds.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use deskscape_3d::{LightsUniform, hex_to_linear};
use deskscape_camera::{
    CameraController, CameraTween, MoveKey, OrbitControls, PerspectiveCamera, TweenStatus,
};
use deskscape_gltf::{MaterialData, ModelData, TextureData, plane_model};
use deskscape_scene::{
    AnimationMixer, AssetInstance, Light, LightKind, ModelStore, NodeId, SceneGraph, Transform,
    instantiate, raycast_subtree,
};
use glam::{Vec2, Vec3};
use winit::event::WindowEvent;

use crate::config::{AssetKind, PlaneConfig, SceneConfig};
use crate::loader::{AssetEvent, AssetLoader, AssetSink, CancelToken, LoadKey};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    Loading(f32),
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub key: LoadKey,
    pub path: PathBuf,
}

/// What a viewport click touched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClickOutcome {
    /// World position of the monitor screen when the zoom started.
    pub zoom_target: Option<Vec3>,
    pub button_hit: bool,
}

pub struct OfficeView {
    config: SceneConfig,
    graph: SceneGraph,
    models: ModelStore,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    movement: CameraController,
    tween: Option<CameraTween>,
    mixer: Option<AnimationMixer>,
    instances: HashMap<AssetKind, AssetInstance>,
    monitor_screen: Option<NodeId>,
    button_plane: Option<NodeId>,
    image_plane: Option<NodeId>,
    status: Vec<(LoadKey, LoadStatus)>,
    requests: Vec<LoadRequest>,
    cancel: Option<CancelToken>,
    viewport: (u32, u32),
    torn_down: bool,
}

impl OfficeView {
    /// Builds the scene, lights and camera rig and queues one load request
    /// per configured asset.
    pub fn new(config: SceneConfig, width: u32, height: u32) -> Self {
        let mut graph = SceneGraph::new(hex_to_linear(config.background));
        let lights = &config.lights;
        graph.add_light(
            "ambient",
            Vec3::ZERO,
            Light {
                kind: LightKind::Ambient,
                color: hex_to_linear(lights.ambient_color),
                intensity: lights.ambient_intensity,
            },
        );
        graph.add_light(
            "directional",
            Vec3::from_array(lights.directional_position),
            Light {
                kind: LightKind::Directional,
                color: hex_to_linear(lights.directional_color),
                intensity: lights.directional_intensity,
            },
        );

        let cam_cfg = &config.camera;
        let mut camera = PerspectiveCamera::new(cam_cfg.fov_y_deg, 1.0, cam_cfg.near, cam_cfg.far);
        camera.set_viewport(width, height);
        camera.position = Vec3::from_array(cam_cfg.position);
        camera.look_at(Vec3::from_array(cam_cfg.look_at));

        let mut controls = OrbitControls::new(Vec3::from_array(config.controls.target));
        controls.enable_damping = config.controls.enable_damping;
        controls.damping_factor = config.controls.damping_factor;
        controls.enable_zoom = config.controls.enable_zoom;
        controls.update(&mut camera);

        let movement = CameraController::new(cam_cfg.move_speed);

        let mut view = Self {
            graph,
            models: ModelStore::new(),
            camera,
            controls,
            movement,
            tween: None,
            mixer: None,
            instances: HashMap::new(),
            monitor_screen: None,
            button_plane: None,
            image_plane: None,
            status: Vec::new(),
            requests: Vec::new(),
            cancel: None,
            viewport: (width.max(1), height.max(1)),
            torn_down: false,
            config,
        };
        let assets: Vec<(AssetKind, PathBuf)> = view
            .config
            .assets
            .iter()
            .map(|a| (a.kind, view.config.resolve(&a.path)))
            .collect();
        for (kind, path) in assets {
            view.queue_request(LoadKey::Model(kind), path);
        }
        view
    }

    fn queue_request(&mut self, key: LoadKey, path: PathBuf) {
        log::debug!("{key}: requesting {}", path.display());
        self.set_status(key, LoadStatus::Pending);
        self.requests.push(LoadRequest { key, path });
    }

    fn set_status(&mut self, key: LoadKey, status: LoadStatus) {
        match self.status.iter_mut().find(|(k, _)| *k == key) {
            Some((_, s)) => *s = status,
            None => self.status.push((key, status)),
        }
    }

    /// Queued requests not yet handed to a loader.
    pub fn drain_requests(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Hands queued requests to `loader` and keeps its cancel token for
    /// `teardown`.
    pub fn dispatch_requests<S: AssetSink>(&mut self, loader: &mut AssetLoader<S>) {
        if self.torn_down {
            return;
        }
        self.cancel = Some(loader.cancel_token());
        for request in self.drain_requests() {
            match request.key {
                LoadKey::Model(kind) => loader.request_model(kind, request.path),
                LoadKey::ScreenImage => loader.request_image(request.path),
            }
        }
    }

    pub fn handle_asset_event(&mut self, event: AssetEvent) {
        if self.torn_down {
            return;
        }
        match event {
            AssetEvent::Progress { key, percent } => {
                self.set_status(key, LoadStatus::Loading(percent));
            }
            AssetEvent::ModelLoaded { kind, model } => self.place_model(kind, model),
            AssetEvent::ImageLoaded { image } => self.attach_screen_image(image),
            AssetEvent::Failed { key, error } => {
                log::error!("{key}: load failed: {error}");
                self.set_status(key, LoadStatus::Failed(error));
            }
        }
    }

    fn place_model(&mut self, kind: AssetKind, model: Arc<ModelData>) {
        let key = LoadKey::Model(kind);
        let Some(spec) = self.config.asset(kind) else {
            log::warn!("{kind}: loaded but not in the asset table");
            return;
        };
        if self.instances.contains_key(&kind) {
            log::warn!("{kind}: already placed, ignoring duplicate");
            return;
        }
        let transform = spec.transform();
        let model_id = self.models.insert(Arc::clone(&model));
        let root = self.graph.root();
        let instance = instantiate(&mut self.graph, root, &kind.to_string(), transform, model_id, &model);
        self.graph.update_world();
        log::info!(
            "{kind}: placed {} nodes, {} triangles",
            instance.nodes.iter().flatten().count(),
            model.triangle_count()
        );

        if kind == AssetKind::Character {
            self.mixer = AnimationMixer::for_first_clip(&model, &instance);
            if self.mixer.is_none() {
                log::warn!("{kind}: no animation clip");
            }
        }
        if kind == AssetKind::Monitor && self.monitor_screen.is_none() {
            self.monitor_screen = instance.scene_root(&self.graph, 0);
            match self.monitor_screen {
                Some(_) => {
                    self.create_button_plane();
                    let path = self.config.resolve(&self.config.screen.image);
                    self.queue_request(LoadKey::ScreenImage, path);
                }
                None => log::warn!("{kind}: model has no top-level node to use as screen"),
            }
        }

        self.instances.insert(kind, instance);
        self.set_status(key, LoadStatus::Loaded);
    }

    fn add_screen_plane(&mut self, name: &str, plane: &PlaneConfig, texture: Option<TextureData>) -> Option<NodeId> {
        let screen = self.monitor_screen?;
        let [r, g, b] = hex_to_linear(plane.color);
        let material = MaterialData {
            name: name.to_string(),
            base_color: [r, g, b, 1.0],
            unlit: true,
            ..Default::default()
        };
        let data = Arc::new(plane_model(name, plane.width, plane.height, material, texture));
        let model_id = self.models.insert(Arc::clone(&data));
        let instance = instantiate(
            &mut self.graph,
            screen,
            name,
            Transform::from_translation(Vec3::from_array(plane.position)),
            model_id,
            &data,
        );
        self.graph.update_world();
        Some(instance.root)
    }

    fn create_button_plane(&mut self) {
        let plane = self.config.screen.button_plane.clone();
        self.button_plane = self.add_screen_plane("screen button", &plane, None);
    }

    fn attach_screen_image(&mut self, image: TextureData) {
        if self.image_plane.is_some() {
            return;
        }
        if self.monitor_screen.is_none() {
            log::warn!("screen image arrived without a monitor screen");
            return;
        }
        log::info!("screen image: {}x{}", image.width, image.height);
        let plane = self.config.screen.image_plane.clone();
        self.image_plane = self.add_screen_plane("screen image", &plane, Some(image));
        self.set_status(LoadKey::ScreenImage, LoadStatus::Loaded);
    }

    pub fn key(&mut self, key: MoveKey, pressed: bool) {
        if self.torn_down {
            return;
        }
        self.movement.set_key(key, pressed);
    }

    /// Routes movement keys. Returns true when the event was used.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if self.torn_down {
            return false;
        }
        self.movement.handle_window_event(event)
    }

    /// Drag inside the viewport, in pixels.
    pub fn drag(&mut self, delta: Vec2) {
        if self.torn_down {
            return;
        }
        self.controls.rotate_by_pixels(delta, self.viewport.1 as f32);
    }

    /// Secondary-button drag inside the viewport, in pixels.
    pub fn pan(&mut self, delta: Vec2) {
        if self.torn_down {
            return;
        }
        self.controls
            .pan_by_pixels(delta, self.viewport.1 as f32, &self.camera);
    }

    /// Wheel delta in browser convention (positive moves away).
    pub fn scroll(&mut self, delta_y: f32) {
        if self.torn_down {
            return;
        }
        self.controls.zoom_by_wheel(delta_y);
    }

    /// Click at `ndc` (x right, y up, -1..1 across the viewport).
    pub fn click(&mut self, ndc: Vec2) -> ClickOutcome {
        let mut outcome = ClickOutcome::default();
        if self.torn_down {
            return outcome;
        }
        self.graph.update_world();
        let ray = self.camera.ray_from_ndc(ndc);

        match self.monitor_screen {
            None => log::warn!("monitor screen not loaded yet, ignoring click"),
            Some(screen) => {
                let hits = raycast_subtree(&self.graph, &self.models, screen, &ray);
                if let Some(hit) = hits.first() {
                    let target = self.graph.world_position(screen);
                    let destination = target + Vec3::from_array(self.config.zoom.offset);
                    log::info!(
                        "screen hit at {:?} ({:.2} away), zooming to {destination:?}",
                        hit.point,
                        hit.distance
                    );
                    self.tween = Some(CameraTween::new(
                        self.camera.position,
                        destination,
                        target,
                        self.config.zoom.duration_secs,
                    ));
                    outcome.zoom_target = Some(target);
                }
            }
        }

        if let Some(button) = self.button_plane
            && !raycast_subtree(&self.graph, &self.models, button, &ray).is_empty()
        {
            log::info!("screen button clicked");
            outcome.button_hit = true;
        }
        outcome
    }

    /// One frame: animation, keyboard movement, zoom tween, world transforms.
    pub fn frame(&mut self, dt: f32) {
        if self.torn_down {
            return;
        }
        if let Some(mixer) = &mut self.mixer {
            mixer.update(dt, &mut self.graph);
        }
        self.movement.update(&mut self.camera, &mut self.controls);
        if let Some(tween) = &mut self.tween
            && tween.tick(dt, &mut self.camera, &mut self.controls) == TweenStatus::Completed
        {
            log::debug!("zoom finished at {:?}", self.camera.position);
            self.tween = None;
        }
        self.graph.update_world();
        log::trace!("frame dt={dt:.4} eye={:?}", self.camera.position);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        self.camera.set_viewport(width, height);
    }

    /// Cancels outstanding loads and stops reacting to input and frames.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        self.requests.clear();
        self.tween = None;
        self.movement.release_all();
        self.torn_down = true;
        log::info!("office view torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Ambient lights summed; the first directional light shines toward
    /// the origin.
    pub fn lights_uniform(&self) -> LightsUniform {
        let mut ambient = Vec3::ZERO;
        let mut directional: Option<(Vec3, Vec3)> = None;
        for (id, light) in self.graph.lights() {
            let color = Vec3::from_array(light.color) * light.intensity;
            match light.kind {
                LightKind::Ambient => ambient += color,
                LightKind::Directional if directional.is_none() => {
                    let dir = (-self.graph.world_position(id)).normalize_or(Vec3::NEG_Y);
                    directional = Some((dir, color));
                }
                LightKind::Directional => {}
            }
        }
        let (dir, color) = directional.unwrap_or((Vec3::NEG_Y, Vec3::ZERO));
        LightsUniform {
            ambient: ambient.extend(1.0).to_array(),
            light_dir: dir.extend(0.0).to_array(),
            light_color: color.extend(1.0).to_array(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn is_zooming(&self) -> bool {
        self.tween.is_some()
    }

    /// The zoom in flight, if any.
    pub fn zoom(&self) -> Option<&CameraTween> {
        self.tween.as_ref()
    }

    pub fn instance(&self, kind: AssetKind) -> Option<&AssetInstance> {
        self.instances.get(&kind)
    }

    pub fn monitor_screen(&self) -> Option<NodeId> {
        self.monitor_screen
    }

    pub fn button_plane(&self) -> Option<NodeId> {
        self.button_plane
    }

    pub fn image_plane(&self) -> Option<NodeId> {
        self.image_plane
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    pub fn load_status(&self) -> &[(LoadKey, LoadStatus)] {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_view_queues_every_asset() {
        let mut view = OfficeView::new(SceneConfig::default(), 800, 600);
        let requests = view.drain_requests();
        assert_eq!(requests.len(), 9);
        assert!(requests.iter().all(|r| r.path.starts_with("assets")));
        assert!(view.drain_requests().is_empty());
        assert!(view.load_status().iter().all(|(_, s)| *s == LoadStatus::Pending));
    }

    #[test]
    fn camera_starts_at_configured_pose() {
        let view = OfficeView::new(SceneConfig::default(), 800, 600);
        assert_eq!(view.camera().position, Vec3::new(15.0, 5.0, 8.0));
        let aim = (Vec3::new(-2.0, 7.0, -1.5) - view.camera().position).normalize();
        assert!((view.camera().forward() - aim).length() < 1e-6);
        assert_eq!(view.controls().target, Vec3::new(-2.0, 7.0, -1.5));
    }

    #[test]
    fn lights_combine_into_uniform() {
        let view = OfficeView::new(SceneConfig::default(), 800, 600);
        let lights = view.lights_uniform();
        assert_eq!(lights.ambient[..3], [3.0, 3.0, 3.0]);
        let dir = Vec3::new(lights.light_dir[0], lights.light_dir[1], lights.light_dir[2]);
        assert!((dir + Vec3::new(5.0, 10.0, 7.5).normalize()).length() < 1e-6);
        assert_eq!(lights.light_color[..3], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn progress_and_failure_update_status() {
        let mut view = OfficeView::new(SceneConfig::default(), 800, 600);
        let key = LoadKey::Model(AssetKind::Floor);
        view.handle_asset_event(AssetEvent::Progress { key, percent: 50.0 });
        assert!(view.load_status().contains(&(key, LoadStatus::Loading(50.0))));
        view.handle_asset_event(AssetEvent::Failed {
            key,
            error: "gone".to_string(),
        });
        assert!(view.load_status().contains(&(key, LoadStatus::Failed("gone".to_string()))));
        assert!(view.instance(AssetKind::Floor).is_none());
    }
}
