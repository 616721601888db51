use std::f32::consts::FRAC_PI_2;

use cgmath::{Deg, Point3, Quaternion, Rad, Rotation3, Vector3};
use instant::Duration;
use scene_walker::{
    ViewerConfig, ViewerEvent, ViewerState,
    data_structures::{
        model::srgb_hex_to_linear,
        scene_graph::{SceneNode, Shadow, count_meshes, traverse},
    },
    render::Render,
    viewer::LoadStatus,
};
use winit::keyboard::KeyCode;

use crate::common::test_utils::{assert_rotation_eq, assert_vec_eq, fake_model};

mod common;

#[test]
fn should_assemble_the_default_scene() {
    let state = ViewerState::default();

    assert_eq!(state.scene.children().len(), 1, "ground plane stays detached by default");
    let cube = state.cube().expect("cube attached");
    let mesh = cube.as_mesh().expect("cube is a mesh");
    assert_eq!(mesh.name(), "cube");
    assert_eq!(mesh.shadow, Shadow::BOTH);
    assert_eq!(mesh.geometry().triangle_count(), 12);
    assert_vec_eq(cube.get_world_transform().position, Vector3::new(-15.0, 0.0, 0.0));

    let [r, g, b] = srgb_hex_to_linear(0x00ff00);
    assert_eq!(mesh.material().base_color, [r, g, b, 1.0]);

    let sun = &state.scene.sun;
    assert!(sun.cast_shadow);
    assert_eq!(sun.intensity, 8.0);
    assert_eq!(sun.color, srgb_hex_to_linear(0xffa500));
    assert_eq!(sun.shadow.map_size, 2048);
    assert_eq!(sun.position, Point3::new(50.0, 50.0, 50.0));

    assert_eq!(state.camera.position, Point3::new(0.0, 0.0, 5.0));
    assert_eq!(state.load, LoadStatus::Pending);
}

#[test]
fn should_attach_ground_plane_when_enabled() {
    let state = ViewerState::new(ViewerConfig {
        ground_plane: true,
        ..Default::default()
    });

    assert_eq!(state.scene.children().len(), 2);
    let ground = state.scene.children()[1].as_ref();
    let mesh = ground.as_mesh().expect("ground is a mesh");
    assert_eq!(
        mesh.shadow,
        Shadow {
            cast: false,
            receive: true
        }
    );
    assert_vec_eq(ground.get_world_transform().position, Vector3::new(0.0, -25.0, 0.0));
    // the plane is built facing +Z and laid flat to face +Y
    let up = ground.get_world_transform().rotation * Vector3::unit_z();
    assert_vec_eq(up, Vector3::unit_y());
}

#[test]
fn should_attach_loaded_model_with_shadows_offset_and_yaw() {
    let mut state = ViewerState::default();
    let before = state.scene.children().len();

    state.dispatch(ViewerEvent::LoadComplete(fake_model()));

    assert_eq!(state.scene.children().len(), before + 1);
    assert_eq!(state.load, LoadStatus::Loaded);

    let model = state.scene.children()[before].as_ref();
    assert_eq!(model.name(), "model.glb");
    assert_eq!(count_meshes(model), 2);
    traverse(model, &mut |node| {
        if let Some(mesh) = node.as_mesh() {
            assert_eq!(mesh.shadow, Shadow::BOTH, "{} casts and receives", mesh.name());
        }
    });

    let local = model.get_local_transform();
    assert_vec_eq(local.position, Vector3::new(0.0, -40.0, 0.0));
    assert_rotation_eq(local.rotation, Quaternion::from_angle_y(Deg(45.0)));
    assert_vec_eq(model.get_world_transform().position, Vector3::new(0.0, -40.0, 0.0));
}

#[test]
fn should_leave_scene_untouched_on_load_error() {
    let mut state = ViewerState::default();
    let before = state.scene.children().len();
    let cube_before = state.cube().map(|cube| cube.get_local_transform().clone());

    state.dispatch(ViewerEvent::LoadError(anyhow::anyhow!("404 Not Found")));

    assert_eq!(state.scene.children().len(), before);
    assert_eq!(state.cube().map(|cube| cube.get_local_transform().clone()), cube_before);
    match &state.load {
        LoadStatus::Failed(reason) => assert!(reason.contains("404")),
        other => panic!("expected a failed load, got {:?}", other),
    }
}

#[test]
fn should_route_keys_through_dispatch() {
    let mut state = ViewerState::default();

    state.dispatch(ViewerEvent::KeyDown(KeyCode::ArrowUp));
    state.dispatch(ViewerEvent::KeyDown(KeyCode::Space));
    assert!(state.movement.flags.forward);
    assert!(state.movement.flags.up);

    state.dispatch(ViewerEvent::KeyUp(KeyCode::KeyW));
    assert!(!state.movement.flags.forward);
    assert!(state.movement.flags.up);
}

#[test]
fn should_keep_flags_across_frames_and_move_one_unit_per_frame() {
    let mut state = ViewerState::default();
    state.dispatch(ViewerEvent::KeyDown(KeyCode::KeyW));
    let flags = state.movement.flags;

    for _ in 0..10 {
        state.advance_frame(Duration::from_millis(16));
    }

    assert_eq!(state.movement.flags, flags);
    let position = state.camera.position;
    assert_vec_eq(
        Vector3::new(position.x, position.y, position.z),
        Vector3::new(0.0, 0.0, -5.0),
    );
}

#[test]
fn should_spin_the_cube_every_frame() {
    let mut state = ViewerState::default();
    for _ in 0..3 {
        state.advance_frame(Duration::from_millis(16));
    }

    let cube = state.cube().expect("cube attached");
    let expected = Quaternion::from_angle_x(Rad(0.03)) * Quaternion::from_angle_y(Rad(0.03));
    assert_rotation_eq(cube.get_local_transform().rotation, expected);
    assert_vec_eq(cube.get_world_transform().position, Vector3::new(-15.0, 0.0, 0.0));
}

#[test]
fn should_ignore_mouse_look_while_unlocked() {
    let mut state = ViewerState::default();
    assert!(!state.look(100.0, 50.0));
    assert_eq!(state.camera.yaw, Rad(0.0));
    assert_eq!(state.camera.pitch, Rad(0.0));
}

#[test]
fn should_turn_and_clamp_pitch_while_locked() {
    let mut state = ViewerState::default();
    state.dispatch(ViewerEvent::PointerLockChange(true));
    assert!(state.controls.is_locked());

    assert!(state.look(100.0, 0.0));
    assert!((state.camera.yaw.0 + 0.2).abs() < 1e-6);

    state.look(0.0, -10_000.0);
    assert_eq!(state.camera.pitch, Rad(FRAC_PI_2));
    state.look(0.0, 10_000.0);
    assert_eq!(state.camera.pitch, Rad(-FRAC_PI_2));

    state.dispatch(ViewerEvent::PointerLockChange(false));
    let yaw = state.camera.yaw;
    assert!(!state.look(100.0, 0.0));
    assert_eq!(state.camera.yaw, yaw);
}

#[test]
fn should_render_nothing_before_upload() {
    let mut state = ViewerState::default();
    state.dispatch(ViewerEvent::LoadComplete(fake_model()));
    assert!(Render::from(&state.scene).is_empty());
}

#[tokio::test]
async fn should_report_missing_model_as_load_error() {
    let mut state = ViewerState::new(ViewerConfig {
        model_path: "definitely/not/here.glb".to_string(),
        ..Default::default()
    });

    let event = state.model_request().await;
    assert!(matches!(event, ViewerEvent::LoadError(_)), "{:?}", event);

    state.dispatch(event);
    assert!(matches!(state.load, LoadStatus::Failed(_)));
    assert_eq!(state.scene.children().len(), 1);
}

#[tokio::test]
async fn should_run_the_model_request_on_a_worker_task() {
    let state = ViewerState::new(ViewerConfig {
        model_path: "nowhere/spawned.glb".to_string(),
        ..Default::default()
    });

    let event = tokio::spawn(state.model_request())
        .await
        .expect("request task completes");
    assert!(matches!(event, ViewerEvent::LoadError(_)), "{:?}", event);
}
