use std::f32::consts::{FRAC_PI_2, TAU};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;

use deskscape_camera::MoveKey;
use deskscape_gltf::{
    AnimationClip, Channel, ChannelValues, Interpolation, MaterialData, MeshData, ModelData,
    NodeData, TextureData, plane,
};
use deskscape_runtime::{
    AssetEvent, AssetKind, AssetLoader, LoadKey, LoadStatus, OfficeView, SceneConfig,
};
use glam::{Vec2, Vec3};

const DT: f32 = 1.0 / 60.0;

fn empty_model(name: &str) -> Arc<ModelData> {
    Arc::new(ModelData {
        name: name.to_string(),
        nodes: vec![NodeData::new(name)],
        scene_roots: vec![0],
        ..Default::default()
    })
}

/// A monitor whose first top-level node is a 400x400 double-sided panel.
fn monitor_model() -> Arc<ModelData> {
    let mut screen = NodeData::new("Sketchfab_model");
    screen.mesh = Some(0);
    Arc::new(ModelData {
        name: "scene".to_string(),
        nodes: vec![screen],
        scene_roots: vec![0],
        meshes: vec![MeshData {
            name: "panel".to_string(),
            primitives: vec![plane(400.0, 400.0)],
        }],
        materials: vec![MaterialData {
            double_sided: true,
            ..Default::default()
        }],
        ..Default::default()
    })
}

fn character_model() -> Arc<ModelData> {
    let mut model = (*empty_model("Typing")).clone();
    model.animations.push(AnimationClip {
        name: "Armature|Typing".to_string(),
        duration: 1.0,
        channels: vec![Channel {
            node: 0,
            times: vec![0.0, 1.0],
            values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::Y]),
            interpolation: Interpolation::Linear,
        }],
    });
    Arc::new(model)
}

fn view() -> OfficeView {
    let mut view = OfficeView::new(SceneConfig::default(), 800, 600);
    view.drain_requests();
    view
}

fn load(view: &mut OfficeView, kind: AssetKind, model: Arc<ModelData>) {
    view.handle_asset_event(AssetEvent::ModelLoaded { kind, model });
}

fn screen_ndc(view: &OfficeView) -> Vec2 {
    let screen = view.monitor_screen().expect("monitor screen");
    let world = view.graph().world_position(screen);
    view.camera().view_proj().project_point3(world).truncate()
}

#[test]
fn loaded_assets_take_their_placement() {
    let mut view = view();
    let config = SceneConfig::default();
    for spec in &config.assets {
        load(&mut view, spec.kind, empty_model(&spec.kind.to_string()));
    }
    let root = view.graph().root();
    for spec in &config.assets {
        let inst = view.instance(spec.kind).expect("placed");
        let node = view.graph().node(inst.root).expect("root node");
        assert_eq!(node.transform, spec.transform(), "{}", spec.kind);
        assert!(view.graph().is_descendant_of(inst.root, root));
        assert!(
            view.load_status()
                .contains(&(LoadKey::Model(spec.kind), LoadStatus::Loaded))
        );
    }
}

#[test]
fn assets_arrive_in_any_order() {
    let mut view = view();
    load(&mut view, AssetKind::Floor, empty_model("floor"));
    load(&mut view, AssetKind::MonitorTwo, monitor_model());
    assert!(view.monitor_screen().is_none());
    load(&mut view, AssetKind::Monitor, monitor_model());
    assert!(view.monitor_screen().is_some());
    assert!(view.instance(AssetKind::Floor).is_some());
}

#[test]
fn monitor_load_sets_screen_button_and_requests_image() {
    let mut view = view();
    load(&mut view, AssetKind::Monitor, monitor_model());
    let monitor = view.instance(AssetKind::Monitor).expect("monitor").clone();
    let screen = view.monitor_screen().expect("screen");
    assert_eq!(Some(screen), monitor.nodes[0]);
    assert_eq!(view.graph().node(screen).and_then(|n| n.parent()), Some(monitor.root));

    let button = view.button_plane().expect("button");
    assert!(view.graph().is_descendant_of(button, screen));

    let requests = view.drain_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].key, LoadKey::ScreenImage);
    assert_eq!(requests[0].path, PathBuf::from("assets").join("myImage.jpg"));

    assert!(view.image_plane().is_none());
    view.handle_asset_event(AssetEvent::ImageLoaded {
        image: TextureData {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        },
    });
    let image = view.image_plane().expect("image plane");
    assert!(view.graph().is_descendant_of(image, screen));
    assert!(
        view.load_status()
            .contains(&(LoadKey::ScreenImage, LoadStatus::Loaded))
    );
}

#[test]
fn failed_monitor_leaves_screen_unset() {
    let mut view = view();
    view.handle_asset_event(AssetEvent::Failed {
        key: LoadKey::Model(AssetKind::Monitor),
        error: "404".to_string(),
    });
    assert!(view.monitor_screen().is_none());
    assert!(view.button_plane().is_none());
    assert!(view.drain_requests().is_empty());
}

#[test]
fn click_without_screen_leaves_camera_alone() {
    let mut view = view();
    let before = (view.camera().position, view.camera().forward());
    let outcome = view.click(Vec2::ZERO);
    assert_eq!(outcome.zoom_target, None);
    assert!(!outcome.button_hit);
    assert!(!view.is_zooming());
    assert_eq!((view.camera().position, view.camera().forward()), before);
}

#[test]
fn click_on_screen_zooms_in_and_retargets_controls() {
    let mut view = view();
    load(&mut view, AssetKind::Monitor, monitor_model());
    let screen = view.monitor_screen().expect("screen");
    let target = view.graph().world_position(screen);

    let outcome = view.click(screen_ndc(&view));
    assert_eq!(outcome.zoom_target, Some(target));
    assert!(view.is_zooming());

    let mut frames = 0;
    while view.is_zooming() {
        view.frame(DT);
        let aim = (target - view.camera().position).normalize();
        assert!((view.camera().forward() - aim).length() < 1e-3);
        frames += 1;
        assert!(frames <= 61, "zoom did not finish within its duration");
    }
    let destination = target + Vec3::new(-6.0, 2.0, -2.0);
    assert!((view.camera().position - destination).length() < 1e-3);
    assert_eq!(view.controls().target, target);
}

#[test]
fn second_hit_restarts_from_current_position() {
    let mut view = view();
    load(&mut view, AssetKind::Monitor, monitor_model());
    view.click(screen_ndc(&view));
    for _ in 0..20 {
        view.frame(DT);
    }
    let midway = view.camera().position;
    assert!(view.click(screen_ndc(&view)).zoom_target.is_some());
    view.frame(0.0);
    assert!((view.camera().position - midway).length() < 1e-4);
}

#[test]
fn button_hit_is_reported_without_side_effects() {
    let mut config = SceneConfig::default();
    if let Some(monitor) = config.assets.iter_mut().find(|a| a.kind == AssetKind::Monitor) {
        monitor.rotation = [0.0, FRAC_PI_2, 0.0];
    }
    let mut view = OfficeView::new(config, 800, 600);
    view.drain_requests();
    load(&mut view, AssetKind::Monitor, monitor_model());
    view.drain_requests();

    let screen = view.monitor_screen().expect("screen");
    let button = view.button_plane().expect("button");
    let button_world = view.graph().world_position(button);
    let ndc = view.camera().view_proj().project_point3(button_world).truncate();

    let outcome = view.click(ndc);
    assert!(outcome.button_hit);
    assert_eq!(outcome.zoom_target, Some(view.graph().world_position(screen)));
    assert!(view.drain_requests().is_empty());
}

#[test]
fn missed_click_changes_nothing() {
    let mut view = view();
    load(&mut view, AssetKind::Monitor, monitor_model());
    let before = (view.camera().position, view.camera().forward());
    let outcome = view.click(Vec2::new(0.99, 0.99));
    assert_eq!(outcome.zoom_target, None);
    assert!(!view.is_zooming());
    assert_eq!((view.camera().position, view.camera().forward()), before);
}

#[test]
fn holding_w_moves_one_step_per_frame() {
    let mut view = view();
    let forward = view.camera().forward();
    let start = view.camera().position;
    view.key(MoveKey::Forward, true);
    view.frame(DT);
    let moved = view.camera().position - start;
    assert!((moved - forward * 0.1).length() < 1e-4);

    view.key(MoveKey::Forward, false);
    let stopped = view.camera().position;
    view.frame(DT);
    view.frame(DT);
    assert_eq!(view.camera().position, stopped);
}

#[test]
fn idle_frames_leave_camera_unchanged() {
    let mut view = view();
    let position = view.camera().position;
    let forward = view.camera().forward();
    for _ in 0..120 {
        view.frame(DT);
    }
    assert_eq!(view.camera().position, position);
    assert_eq!(view.camera().forward(), forward);
}

#[test]
fn character_clip_plays_on_a_loop() {
    let mut view = view();
    load(&mut view, AssetKind::Character, character_model());
    assert!(view.mixer().is_some());
    view.frame(0.25);
    view.frame(1.0);
    let mixer = view.mixer().expect("mixer");
    assert!((mixer.time() - 0.25).abs() < 1e-5);

    let inst = view.instance(AssetKind::Character).expect("character");
    let bone = inst.nodes[0].expect("bone");
    let y = view.graph().node(bone).map(|n| n.transform.translation.y);
    assert!(y.is_some_and(|y| (y - 0.25).abs() < 1e-5));
}

#[test]
fn teardown_cancels_loads_and_ignores_input() {
    let mut config = SceneConfig::default();
    config.asset_root = std::env::temp_dir().join("deskscape-no-assets-here");
    let mut view = OfficeView::new(config, 800, 600);
    let (tx, _rx) = mpsc::channel::<AssetEvent>();
    let mut loader = AssetLoader::new(tx);
    view.dispatch_requests(&mut loader);
    let token = loader.cancel_token();
    assert!(!token.is_cancelled());

    view.teardown();
    assert!(view.is_torn_down());
    assert!(token.is_cancelled());
    loader.join();

    let before = view.camera().position;
    view.key(MoveKey::Forward, true);
    view.frame(DT);
    assert_eq!(view.camera().position, before);

    load(&mut view, AssetKind::Monitor, monitor_model());
    assert!(view.instance(AssetKind::Monitor).is_none());
    assert_eq!(view.click(Vec2::ZERO), Default::default());
}

fn yaw(offset: Vec3) -> f32 {
    offset.x.atan2(offset.z)
}

#[test]
fn drag_orbits_with_configured_damping() {
    let mut view = view();
    let start = view.camera().position;
    let pivot = start + view.camera().forward();
    view.drag(Vec2::new(60.0, 0.0));
    view.frame(DT);

    let turn = -TAU * 60.0 / 600.0;
    let after = view.camera().position;
    assert!((after.distance(pivot) - 1.0).abs() < 1e-4);
    let first = yaw(after - pivot) - yaw(start - pivot);
    assert!((first - turn * 0.25).abs() < 1e-4);

    for _ in 0..120 {
        view.frame(DT);
    }
    let total = yaw(view.camera().position - pivot) - yaw(start - pivot);
    assert!((total - turn).abs() < 1e-3);
    let settled = view.camera().position;
    view.frame(DT);
    assert_eq!(view.camera().position, settled);
}

#[test]
fn wheel_dollies_toward_the_orbit_target() {
    let mut view = view();
    let start = view.camera().position;
    let forward = view.camera().forward();
    view.scroll(-100.0);
    view.frame(DT);
    let expected = start + forward * 0.05;
    assert!((view.camera().position - expected).length() < 1e-4);
}

#[test]
fn pan_slides_the_camera_sideways() {
    let mut view = view();
    let start = view.camera().position;
    let forward = view.camera().forward();
    let right = view.camera().right();
    view.pan(Vec2::new(60.0, 0.0));
    for _ in 0..120 {
        view.frame(DT);
    }
    let moved = view.camera().position - start;
    assert!(moved.dot(right) < 0.0);
    assert!(moved.dot(forward).abs() < 1e-3);
    assert!((view.camera().forward() - forward).length() < 1e-3);
}

#[test]
fn resize_updates_aspect_and_drag_scale() {
    let mut view = view();
    view.resize(400, 800);
    assert_eq!(view.camera().aspect, 0.5);

    let start = view.camera().position;
    let pivot = start + view.camera().forward();
    view.drag(Vec2::new(80.0, 0.0));
    view.frame(DT);
    let first = yaw(view.camera().position - pivot) - yaw(start - pivot);
    assert!((first - (-TAU * 80.0 / 800.0) * 0.25).abs() < 1e-4);
}
