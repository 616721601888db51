use cgmath::{Deg, InnerSpace, Point3, Quaternion, Rotation3, Vector3, Vector4};
use scene_walker::data_structures::{
    geometry::{box_geometry, plane_geometry},
    instance::Instance,
    light::DirectionalLight,
    model::MaterialData,
    scene_graph::{ContainerNode, MeshNode, SceneNode, count_meshes, traverse, traverse_mut},
};

use crate::common::test_utils::{assert_vec_eq, face_normal, fake_model};

mod common;

#[test]
fn should_compose_parent_and_child_transforms() {
    let mut parent = ContainerNode::new("parent");
    parent.set_local_transform(Instance {
        position: Vector3::new(1.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: Vector3::new(2.0, 2.0, 2.0),
    });
    parent.add_child(Box::new(
        MeshNode::new("child", box_geometry(1.0, 1.0, 1.0), MaterialData::default())
            .with_transform(Instance::from(Vector3::new(1.0, 0.0, 0.0))),
    ));

    parent.update_world_transforms(&Instance::default());

    let child = parent.get_children()[0].get_world_transform();
    assert_vec_eq(child.position, Vector3::new(1.0, 0.0, -2.0));
    assert_vec_eq(child.scale, Vector3::new(2.0, 2.0, 2.0));

    // the matrix form agrees with the composed instance
    let local = Vector4::new(0.5, 0.0, 0.0, 1.0);
    let via_matrices = parent.get_local_transform().to_matrix()
        * Instance::from(Vector3::new(1.0, 0.0, 0.0)).to_matrix()
        * local;
    let via_world = child.to_matrix() * local;
    assert!((via_matrices - via_world).magnitude() < 1e-5);
}

#[test]
fn should_keep_normals_perpendicular_under_non_uniform_scale() {
    let stretched = Instance {
        scale: Vector3::new(2.0, 1.0, 1.0),
        ..Default::default()
    };
    let normal = Vector3::new(1.0, 1.0, 0.0).normalize();
    let tangent = Vector3::new(1.0, -1.0, 0.0);

    let world_tangent = (stretched.to_matrix() * tangent.extend(0.0)).truncate();
    let world_normal = (stretched.normal_matrix() * normal).normalize();
    assert!(world_normal.dot(world_tangent).abs() < 1e-5);
    assert_vec_eq(world_normal, Vector3::new(0.5, 1.0, 0.0).normalize());

    let turned = Instance {
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        ..Default::default()
    };
    assert_vec_eq(turned.normal_matrix() * Vector3::unit_x(), -Vector3::unit_z());
}

#[test]
fn should_visit_parents_before_children() {
    let model = fake_model();
    let mut names = Vec::new();
    traverse(model.as_ref(), &mut |node| names.push(node.name().to_string()));
    assert_eq!(names, vec!["model.glb", "body", "wheels", "wheel"]);
    assert_eq!(count_meshes(model.as_ref()), 2);
}

#[test]
fn should_reach_every_mesh_mutably() {
    let mut model = fake_model();
    traverse_mut(model.as_mut(), &mut |node| {
        if let Some(mesh) = node.as_mesh_mut() {
            mesh.shadow.cast = true;
        }
    });
    let mut casting = 0;
    traverse(model.as_ref(), &mut |node| {
        if node.as_mesh().is_some_and(|mesh| mesh.shadow.cast) {
            casting += 1;
        }
    });
    assert_eq!(casting, 2);
}

#[test]
fn should_wind_box_faces_outwards() {
    let cube = box_geometry(1.0, 2.0, 3.0);
    assert_eq!(cube.triangle_count(), 12);
    assert_eq!(cube.vertices.len(), 24);
    for triangle in 0..cube.triangle_count() {
        let winding = face_normal(&cube, triangle);
        let first = cube.indices[triangle * 3] as usize;
        assert_vec_eq(winding, cube.vertices[first].normal.into());

        let centre: Vector3<f32> = cube.vertices[first].position.into();
        assert!(centre.dot(winding) > 0.0, "triangle {} faces inwards", triangle);
    }
}

#[test]
fn should_build_a_plane_facing_positive_z() {
    let plane = plane_geometry(75.0, 75.0);
    assert_eq!(plane.triangle_count(), 2);
    for triangle in 0..2 {
        assert_vec_eq(face_normal(&plane, triangle), Vector3::unit_z());
    }
    let max_x = plane
        .vertices
        .iter()
        .map(|vertex| vertex.position[0])
        .fold(f32::MIN, f32::max);
    assert_eq!(max_x, 37.5);
}

#[test]
fn should_keep_the_scene_origin_inside_the_shadow_frustum() {
    let sun = DirectionalLight {
        position: Point3::new(50.0, 50.0, 50.0),
        target: Point3::new(0.0, 0.0, 0.0),
        cast_shadow: true,
        ..DirectionalLight::new(0xffa500, 8.0)
    };
    sun_sees_origin(&sun);

    assert_vec_eq(sun.direction(), Vector3::new(1.0, 1.0, 1.0).normalize());
    let radiance = sun.radiance();
    assert!((radiance[0] - 8.0).abs() < 1e-5, "red channel of orange is full");
}

#[test]
fn should_handle_a_light_straight_above() {
    let sun = DirectionalLight {
        position: Point3::new(0.0, 100.0, 0.0),
        ..Default::default()
    };
    sun_sees_origin(&sun);
}

fn sun_sees_origin(sun: &DirectionalLight) {
    let clip = sun.view_proj() * Vector4::new(0.0, 0.0, 0.0, 1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x.is_finite() && ndc.y.is_finite() && ndc.z.is_finite());
    assert!((-1.0..=1.0).contains(&ndc.x), "x = {}", ndc.x);
    assert!((-1.0..=1.0).contains(&ndc.y), "y = {}", ndc.y);
    assert!((0.0..=1.0).contains(&ndc.z), "z = {}", ndc.z);
}
