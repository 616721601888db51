use cgmath::{Deg, One, Quaternion, Rad, Vector3, Zero};
use instant::Duration;
use scene_walker::{
    camera::Camera,
    movement::{Direction, MovementController, MovementFlags, TimeStep},
};
use winit::keyboard::KeyCode;

use crate::common::test_utils::assert_vec_eq;

mod common;

#[test]
fn should_map_both_key_sets_to_the_same_direction() {
    let pairs = [
        (KeyCode::KeyW, KeyCode::ArrowUp, Direction::Forward),
        (KeyCode::KeyS, KeyCode::ArrowDown, Direction::Backward),
        (KeyCode::KeyA, KeyCode::ArrowLeft, Direction::Left),
        (KeyCode::KeyD, KeyCode::ArrowRight, Direction::Right),
    ];
    for (letter, arrow, direction) in pairs {
        assert_eq!(Direction::from_key(letter), Some(direction));
        assert_eq!(Direction::from_key(arrow), Some(direction));
    }
    assert_eq!(Direction::from_key(KeyCode::Space), Some(Direction::Up));
    assert_eq!(Direction::from_key(KeyCode::ShiftLeft), Some(Direction::Down));
    assert_eq!(Direction::from_key(KeyCode::ShiftRight), None);
}

#[test]
fn should_reflect_last_transition_per_flag() {
    let events = [
        (KeyCode::KeyW, true),
        (KeyCode::KeyA, true),
        (KeyCode::ArrowUp, false),
        (KeyCode::Space, true),
        (KeyCode::KeyA, false),
        (KeyCode::ArrowLeft, true),
        (KeyCode::ShiftLeft, true),
        (KeyCode::Space, false),
    ];
    let mut flags = MovementFlags::default();
    for (code, pressed) in events {
        flags.handle_key(code, pressed);
    }

    assert!(!flags.forward, "ArrowUp release clears the W press");
    assert!(flags.left, "ArrowLeft press after the A release");
    assert!(!flags.up);
    assert!(flags.down);
    assert!(!flags.backward);
    assert!(!flags.right);
}

#[test]
fn should_be_idempotent_under_repeated_events() {
    let mut once = MovementFlags::default();
    once.handle_key(KeyCode::KeyD, true);

    let mut repeated = MovementFlags::default();
    for _ in 0..5 {
        repeated.handle_key(KeyCode::KeyD, true);
    }
    assert_eq!(once, repeated);

    for _ in 0..3 {
        repeated.handle_key(KeyCode::KeyD, false);
    }
    assert!(repeated.is_idle());
}

#[test]
fn should_ignore_unbound_keys() {
    let mut flags = MovementFlags::default();
    assert!(!flags.handle_key(KeyCode::KeyQ, true));
    assert!(flags.is_idle());
}

#[test]
fn should_not_move_without_flags() {
    let controller = MovementController::default();
    let orientation = Quaternion::from(cgmath::Euler::new(Deg(30.0), Deg(60.0), Deg(0.0)));
    assert!(controller.displacement(orientation, 0.1).is_zero());
}

#[test]
fn should_move_along_negative_z_with_identity_orientation() {
    let mut controller = MovementController::new(10.0, TimeStep::Fixed(0.1));
    controller.flags.set(Direction::Forward, true);
    assert_vec_eq(
        controller.displacement(Quaternion::one(), 0.1),
        Vector3::new(0.0, 0.0, -1.0),
    );

    controller.flags = MovementFlags::default();
    controller.flags.set(Direction::Right, true);
    assert_vec_eq(
        controller.displacement(Quaternion::one(), 0.1),
        Vector3::new(1.0, 0.0, 0.0),
    );
}

#[test]
fn should_move_vertically_regardless_of_orientation() {
    let mut controller = MovementController::default();
    controller.flags.set(Direction::Up, true);
    let camera = Camera::new((0.0, 0.0, 0.0), Deg(90.0), Deg(45.0));
    assert_vec_eq(
        controller.displacement(camera.orientation(), 0.1),
        Vector3::new(0.0, 1.0, 0.0),
    );

    controller.flags.set(Direction::Up, false);
    controller.flags.set(Direction::Down, true);
    assert_vec_eq(
        controller.displacement(camera.orientation(), 0.1),
        Vector3::new(0.0, -1.0, 0.0),
    );
}

#[test]
fn should_follow_yaw_when_moving_forward() {
    let mut controller = MovementController::default();
    controller.flags.set(Direction::Forward, true);
    // a quarter turn to the left looks down -X
    let camera = Camera::new((0.0, 0.0, 0.0), Rad(std::f32::consts::FRAC_PI_2), Rad(0.0));
    assert_vec_eq(camera.forward(), Vector3::new(-1.0, 0.0, 0.0));
    assert_vec_eq(
        controller.displacement(camera.orientation(), 0.1),
        Vector3::new(-1.0, 0.0, 0.0),
    );
}

#[test]
fn should_cancel_opposite_directions() {
    let mut controller = MovementController::default();
    controller.flags.set(Direction::Forward, true);
    controller.flags.set(Direction::Backward, true);
    assert!(controller.displacement(Quaternion::one(), 0.1).is_zero());
}

#[test]
fn should_use_the_fixed_step_whatever_the_frame_time() {
    let mut controller = MovementController::new(10.0, TimeStep::Fixed(0.1));
    controller.flags.set(Direction::Backward, true);
    let mut camera = Camera::new((0.0, 0.0, 5.0), Rad(0.0), Rad(0.0));

    controller.update(&mut camera, Duration::from_secs(3));
    controller.update(&mut camera, Duration::from_millis(1));

    assert_vec_eq(
        Vector3::new(camera.position.x, camera.position.y, camera.position.z),
        Vector3::new(0.0, 0.0, 7.0),
    );
}

#[test]
fn should_scale_with_elapsed_time_when_configured() {
    let mut controller = MovementController::new(10.0, TimeStep::Elapsed);
    controller.flags.set(Direction::Forward, true);
    let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));

    controller.update(&mut camera, Duration::from_millis(500));

    assert_vec_eq(
        Vector3::new(camera.position.x, camera.position.y, camera.position.z),
        Vector3::new(0.0, 0.0, -5.0),
    );
}

#[test]
fn should_leave_flags_untouched_by_updates() {
    let mut controller = MovementController::default();
    controller.flags.set(Direction::Left, true);
    controller.flags.set(Direction::Up, true);
    let before = controller.flags;
    let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));

    for _ in 0..10 {
        controller.update(&mut camera, Duration::from_millis(16));
    }
    assert_eq!(controller.flags, before);
}
