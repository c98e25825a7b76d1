mod common;

use common::*;
use geoview::buffer::{BucketKind, BufferManager, ObjectSettings, SETTINGS_STRIDE, TRANSFORM_STRIDE};
use geoview::color::{self, Color};
use geoview::config::ElementPolicy;
use geoview::geometry::BufferData;
use geoview::glamx::{Mat4, Vec3};
use geoview::resource::{BackendCall, RecordingBackend};
use geoview::BufferError;
use rand::Rng;

fn manager() -> BufferManager<RecordingBackend> {
    init_logger();
    BufferManager::new(RecordingBackend::new())
}

fn transparent(alpha: f32) -> Color {
    Color::new(1.0, 0.0, 0.0, alpha)
}

fn created_with_label(backend: &RecordingBackend, label: &str) -> Vec<usize> {
    backend
        .calls()
        .iter()
        .filter_map(|c| match c {
            BackendCall::Create { label: l, len, .. } if l == label => Some(*len),
            _ => None,
        })
        .collect()
}

#[test]
fn elements_are_offset_by_the_stored_vertex_count() {
    let mut buffers = manager();
    let a = RawObject::new(0).with(BucketKind::Points, points(3, color::RED));
    let b = RawObject::new(1).with(BucketKind::Points, points(2, color::BLUE));

    buffers.add_object(&a).unwrap();
    buffers.add_object(&b).unwrap();

    let bucket = buffers.bucket(BucketKind::Points);
    assert_eq!(bucket.elements(), &[0, 1, 2, 3, 4]);
    assert_eq!(bucket.object_indices(), &[0.0, 0.0, 0.0, 1.0, 1.0]);
    assert_eq!(buffers.slot(b.id), Some(1));
    assert_eq!(buffers.transforms().len(), 2);
    assert_eq!(buffers.settings().len(), 2);
}

#[test]
fn nothing_is_uploaded_before_create_buffers() {
    let mut buffers = manager();
    buffers
        .add_object(&RawObject::new(0).with(BucketKind::Lines, segment(color::BLACK)))
        .unwrap();

    assert!(buffers.backend().calls().is_empty());
    assert!(!buffers.has_gpu_resources());
}

#[test]
fn color_counts_always_match_position_counts() {
    let mut rng = rand::rng();
    let mut buffers = manager();

    for id in 0..20 {
        let n = rng.random_range(1..12);
        let m = rng.random_range(0..16);
        let mut data = points(n, color::RED);
        data.colors = vec![color::BLUE; m];
        buffers
            .add_object(&RawObject::new(id).with(BucketKind::Points, data))
            .unwrap();
    }

    let bucket = buffers.bucket(BucketKind::Points);
    assert_eq!(bucket.colors().len(), bucket.positions().len());
    assert_eq!(bucket.object_indices().len(), bucket.positions().len());
}

#[test]
fn missing_colors_repeat_the_last_one() {
    let mut buffers = manager();
    let _ = take_warnings();
    let mut data = points(3, color::RED);
    data.colors = vec![color::RED, color::BLUE];
    buffers
        .add_object(&RawObject::new(0).with(BucketKind::Points, data))
        .unwrap();

    let colors = buffers.bucket(BucketKind::Points).colors();
    assert_eq!(colors[2], [0.0, 0.0, 1.0, 1.0]);

    let warnings = take_warnings();
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert!(warnings[0].contains("(points)"));
    assert!(warnings[0].contains("last color is repeated"));
}

#[test]
fn matching_colors_log_nothing() {
    let mut buffers = manager();
    let _ = take_warnings();
    buffers
        .add_object(&RawObject::new(0).with(BucketKind::Points, points(3, color::RED)))
        .unwrap();

    assert!(take_warnings().is_empty());
}

#[test]
fn opaque_and_transparent_triangles_are_split() {
    let mut buffers = manager();
    let opaque = RawObject::new(0).with(BucketKind::FrontFaces, triangle(0.0, color::RED));
    let glass = RawObject::new(1).with(BucketKind::FrontFaces, triangle(1.0, transparent(0.5)));

    buffers.add_object(&opaque).unwrap();
    buffers.add_object(&glass).unwrap();
    buffers.create_buffers().unwrap();

    let bucket = buffers.bucket(BucketKind::FrontFaces);
    assert_eq!(bucket.opaque_elements(), &[0, 1, 2]);
    assert_eq!(bucket.transparent_elements(), &[3, 4, 5]);

    let handles = bucket.handles().unwrap();
    let backend = buffers.backend();
    assert_eq!(backend.contents_as::<u32>(handles.elements).unwrap(), vec![0, 1, 2]);
    assert_eq!(
        backend.contents_as::<u32>(handles.transparent.unwrap()).unwrap(),
        vec![3, 4, 5]
    );
}

#[test]
fn object_opacity_sends_every_face_to_the_transparent_pass() {
    let mut buffers = manager();
    let ghost = RawObject::new(0)
        .with(BucketKind::FrontFaces, triangle(0.0, color::RED))
        .with(BucketKind::BackFaces, triangle(0.0, color::RED))
        .with_opacity(0.4);

    buffers.add_object(&ghost).unwrap();

    for kind in BucketKind::FACES {
        let bucket = buffers.bucket(kind);
        assert!(bucket.opaque_elements().is_empty());
        assert_eq!(bucket.transparent_elements().len(), 3);
    }
}

#[test]
fn face_partition_covers_every_element_exactly_once() {
    let mut rng = rand::rng();
    let mut buffers = manager();

    for id in 0..30 {
        let triangles = rng.random_range(1..6u32);
        let mut data = BufferData::default();
        for t in 0..triangles {
            let alpha = if rng.random_bool(0.5) { 1.0 } else { 0.3 };
            let base = t * 3;
            data.positions
                .extend([Vec3::ZERO, Vec3::X, Vec3::Y].map(|p| p + Vec3::Z * t as f32));
            data.colors.extend([transparent(alpha); 3]);
            data.elements.extend([base, base + 1, base + 2]);
        }
        let opacity = if rng.random_bool(0.2) { 0.5 } else { 1.0 };
        let obj = RawObject::new(id)
            .with(BucketKind::FrontFaces, data)
            .with_opacity(opacity);
        buffers.add_object(&obj).unwrap();
    }

    let bucket = buffers.bucket(BucketKind::FrontFaces);
    let mut union = bucket.opaque_elements().to_vec();
    union.extend_from_slice(bucket.transparent_elements());
    assert_eq!(sorted(union), sorted(bucket.elements().to_vec()));
    assert_eq!(
        bucket.opaque_elements().len() + bucket.transparent_elements().len(),
        bucket.elements().len()
    );
}

#[test]
fn empty_scene_uploads_placeholder_tables() {
    let mut buffers = manager();
    buffers.create_buffers().unwrap();

    let backend = buffers.backend();
    assert_eq!(created_with_label(backend, "transforms"), vec![TRANSFORM_STRIDE as usize]);
    assert_eq!(created_with_label(backend, "settings"), vec![SETTINGS_STRIDE as usize]);
    assert_eq!(backend.live_buffers(), 2);
    for kind in BucketKind::ALL {
        assert!(buffers.bucket(kind).handles().is_none());
    }
}

#[test]
fn empty_buckets_get_no_gpu_resources() {
    let mut buffers = manager();
    buffers
        .add_object(&RawObject::new(0).with(BucketKind::Points, points(4, color::RED)))
        .unwrap();
    buffers.create_buffers().unwrap();

    assert!(buffers.bucket(BucketKind::Points).handles().is_some());
    assert!(buffers.bucket(BucketKind::Lines).handles().is_none());
    assert!(buffers.bucket(BucketKind::FrontFaces).handles().is_none());
    // Two tables, three vertex arrays and one element list.
    assert_eq!(buffers.backend().live_buffers(), 6);
}

#[test]
fn create_twice_requires_a_clear() {
    let mut buffers = manager();
    let obj = RawObject::new(0).with(BucketKind::Points, points(1, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();

    assert_eq!(buffers.create_buffers(), Err(BufferError::AlreadyCreated));

    buffers.clear();
    assert_eq!(buffers.backend().live_buffers(), 0);
    assert_eq!(buffers.object_count(), 0);

    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();
}

#[test]
fn clear_then_rebuild_reproduces_the_buffers() {
    let mut buffers = manager();
    let parent = RawObject::new(0)
        .with(BucketKind::Points, points(3, color::RED))
        .with(BucketKind::Lines, segment(color::BLACK));
    let objects = [
        parent.clone(),
        RawObject::new(1)
            .with(BucketKind::FrontFaces, triangle(0.0, color::RED))
            .with(BucketKind::BackFaces, triangle(0.0, color::RED)),
        RawObject::new(2)
            .with(BucketKind::FrontFaces, triangle(1.0, transparent(0.5)))
            .with_parent(parent.id),
    ];

    let build = |buffers: &mut BufferManager<RecordingBackend>| {
        for obj in &objects {
            buffers.add_object(obj).unwrap();
        }
        buffers.create_buffers().unwrap();

        let buckets: Vec<_> = BucketKind::ALL
            .iter()
            .map(|&kind| {
                let bucket = buffers.bucket(kind);
                (
                    bucket.vertex_count(),
                    bucket.elements().len(),
                    bucket.opaque_elements().len(),
                    bucket.transparent_elements().len(),
                )
            })
            .collect();
        (
            buckets,
            buffers.transforms().to_vec(),
            buffers.settings().to_vec(),
            buffers.backend().live_buffers(),
        )
    };

    let first = build(&mut buffers);
    buffers.clear();
    assert_eq!(buffers.backend().live_buffers(), 0);
    let second = build(&mut buffers);

    assert_eq!(first, second);
    assert_eq!(second.1.len(), 3);
    assert_eq!(second.2[2].parent_slot(), Some(0));
}

#[test]
fn objects_cannot_be_added_to_live_buffers() {
    let mut buffers = manager();
    buffers.create_buffers().unwrap();

    let obj = RawObject::new(3).with(BucketKind::Points, points(1, color::RED));
    assert_eq!(buffers.add_object(&obj), Err(BufferError::BuffersLive(obj.id)));
}

#[test]
fn clear_releases_everything() {
    let mut buffers = manager();
    buffers
        .add_object(
            &RawObject::new(0)
                .with(BucketKind::FrontFaces, triangle(0.0, color::RED))
                .with(BucketKind::Lines, segment(color::BLACK)),
        )
        .unwrap();
    buffers.create_buffers().unwrap();
    assert!(buffers.backend().live_buffers() > 0);

    buffers.clear();

    assert_eq!(buffers.backend().live_buffers(), 0);
    assert!(!buffers.is_created());
    for kind in BucketKind::ALL {
        assert!(buffers.bucket(kind).is_empty());
        assert!(buffers.bucket(kind).elements().is_empty());
    }
    assert!(buffers.transforms().is_empty());
}

#[test]
fn child_settings_point_at_the_parent_slot() {
    let mut buffers = manager();
    let parent = RawObject::new(10).with(BucketKind::Points, points(1, color::RED));
    let child = RawObject::new(11)
        .with(BucketKind::Points, points(1, color::RED))
        .with_parent(parent.id);

    buffers.add_object(&parent).unwrap();
    buffers.add_object(&child).unwrap();

    assert_eq!(buffers.settings()[0].parent_slot(), None);
    assert_eq!(buffers.settings()[1].parent_slot(), Some(0));
}

#[test]
fn strict_policy_rejects_the_whole_object() {
    let mut buffers = manager().with_policy(ElementPolicy::Strict);
    let good = RawObject::new(0).with(BucketKind::Points, points(2, color::RED));
    let mut dangling = triangle(0.0, color::RED);
    dangling.elements = vec![0, 1, 5];
    let bad = RawObject::new(1)
        .with(BucketKind::Points, points(2, color::RED))
        .with(BucketKind::FrontFaces, dangling);

    buffers.add_object(&good).unwrap();
    assert!(matches!(
        buffers.add_object(&bad),
        Err(BufferError::DanglingElement { index: 5, .. })
    ));

    assert_eq!(buffers.object_count(), 1);
    assert_eq!(buffers.bucket(BucketKind::Points).vertex_count(), 2);
    assert!(buffers.bucket(BucketKind::FrontFaces).is_empty());
}

#[test]
fn lenient_policy_keeps_the_valid_primitives() {
    let mut buffers = manager();
    let mut data = triangle(0.0, color::RED);
    data.elements = vec![0, 1, 2, 2, 1, 7];
    buffers
        .add_object(&RawObject::new(0).with(BucketKind::FrontFaces, data))
        .unwrap();

    assert_eq!(buffers.bucket(BucketKind::FrontFaces).elements(), &[0, 1, 2]);
}

#[test]
fn transforms_are_rewritten_in_place() {
    let mut buffers = manager();
    let a = RawObject::new(0).with(BucketKind::Points, points(1, color::RED));
    let mut b = RawObject::new(1).with(BucketKind::Points, points(1, color::RED));
    buffers.add_object(&a).unwrap();
    buffers.add_object(&b).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    let moved = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    b.transformation = Some(moved);
    buffers.update_object_transform(&b).unwrap();

    match buffers.backend().calls() {
        [BackendCall::Write { offset, len, .. }] => {
            assert_eq!(*offset, TRANSFORM_STRIDE);
            assert_eq!(*len, TRANSFORM_STRIDE as usize);
        }
        calls => panic!("unexpected calls {:?}", calls),
    }
    assert_eq!(buffers.transforms()[1], moved.to_cols_array());
    assert_eq!(buffers.transforms()[0], Mat4::IDENTITY.to_cols_array());
}

#[test]
fn unchanged_settings_are_not_rewritten() {
    let mut buffers = manager();
    let mut obj = RawObject::new(0).with(BucketKind::Points, points(1, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    buffers.update_object_settings(&obj).unwrap();
    buffers.update_object_settings(&obj).unwrap();
    assert_eq!(buffers.backend().write_count(), 1);

    obj.style.is_selected = true;
    buffers.update_object_settings(&obj).unwrap();
    assert_eq!(buffers.backend().write_count(), 2);
    assert!(buffers.settings()[0].is_selected());
}

#[test]
fn batch_settings_update_writes_only_what_changed() {
    let mut buffers = manager();
    let mut objs: Vec<_> = (0..3)
        .map(|i| RawObject::new(i).with(BucketKind::Points, points(1, color::RED)))
        .collect();
    for obj in &objs {
        buffers.add_object(obj).unwrap();
    }
    buffers.create_buffers().unwrap();
    buffers.update_settings(&objs).unwrap();
    buffers.backend_mut().clear_calls();

    objs[1].style.show = false;
    buffers.update_settings(&objs).unwrap();
    assert_eq!(buffers.backend().write_count(), 1);
    assert!(!buffers.settings()[1].show());
}

#[test]
fn opacity_change_moving_faces_requires_a_rebuild() {
    let mut buffers = manager();
    let mut obj = RawObject::new(0).with(BucketKind::FrontFaces, triangle(0.0, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    obj.style.opacity = 0.5;
    let err = buffers.update_object_settings(&obj).unwrap_err();
    assert!(matches!(err, BufferError::PartitionChanged { .. }));
    assert!(err.requires_rebuild());
    assert_eq!(buffers.backend().write_count(), 0);
}

#[test]
fn fields_changed_with_a_partition_change_are_still_written() {
    let mut buffers = manager();
    let mut obj = RawObject::new(0).with(BucketKind::FrontFaces, triangle(0.0, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    obj.style.opacity = 0.5;
    obj.style.is_selected = true;
    let err = buffers.update_object_settings(&obj).unwrap_err();
    assert!(matches!(err, BufferError::PartitionChanged { .. }));

    let settings = buffers.settings()[0];
    assert!(settings.is_selected());
    assert_eq!(settings.opacity(), 1.0);
    assert_eq!(buffers.backend().write_count(), 1);

    // The opacity is still pending.
    assert!(buffers.update_object_settings(&obj).is_err());
    assert_eq!(buffers.backend().write_count(), 1);
}

#[test]
fn opacity_change_without_faces_is_written() {
    let mut buffers = manager();
    let mut obj = RawObject::new(0).with(BucketKind::Points, points(2, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();

    obj.style.opacity = 0.5;
    buffers.update_object_settings(&obj).unwrap();
    assert_eq!(buffers.settings()[0].opacity(), 0.5);
}

#[test]
fn vertex_data_is_rewritten_without_reallocation() {
    let mut buffers = manager();
    let a = RawObject::new(0).with(BucketKind::Points, points(2, color::RED));
    let mut b = RawObject::new(1).with(BucketKind::Points, points(3, color::RED));
    buffers.add_object(&a).unwrap();
    buffers.add_object(&b).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    let mut data = points(3, color::BLUE);
    data.positions[0] = Vec3::splat(9.0);
    b = b.with(BucketKind::Points, data);
    buffers.update_object_data(&b).unwrap();

    let bucket = buffers.bucket(BucketKind::Points);
    assert_eq!(bucket.positions()[2], [9.0, 9.0, 9.0]);
    assert_eq!(bucket.positions()[0], [0.0, 0.0, 0.0]);
    assert_eq!(bucket.colors()[4], [0.0, 0.0, 1.0, 1.0]);
    assert!(buffers
        .backend()
        .calls()
        .iter()
        .all(|c| matches!(c, BackendCall::Write { .. })));

    let handles = bucket.handles().unwrap();
    let stored = buffers.backend().contents_as::<[f32; 3]>(handles.positions).unwrap();
    assert_eq!(stored[2], [9.0, 9.0, 9.0]);
}

#[test]
fn vertex_count_change_is_rejected() {
    let mut buffers = manager();
    let obj = RawObject::new(0).with(BucketKind::Points, points(3, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    let grown = obj.clone().with(BucketKind::Points, points(4, color::RED));
    assert_eq!(
        buffers.update_object_data(&grown),
        Err(BufferError::TopologyChanged {
            object: obj.id,
            kind: BucketKind::Points,
            expected: 3,
            found: 4,
        })
    );
    assert_eq!(buffers.backend().write_count(), 0);
}

#[test]
fn recoloring_faces_across_the_alpha_threshold_is_rejected() {
    let mut buffers = manager();
    let obj = RawObject::new(0).with(BucketKind::FrontFaces, triangle(0.0, color::RED));
    buffers.add_object(&obj).unwrap();
    buffers.create_buffers().unwrap();

    let faded = obj.clone().with(BucketKind::FrontFaces, triangle(0.0, transparent(0.2)));
    assert!(matches!(
        buffers.update_object_data(&faded),
        Err(BufferError::PartitionChanged { kind: BucketKind::FrontFaces, .. })
    ));

    let recolored = obj.clone().with(BucketKind::FrontFaces, triangle(0.0, color::BLUE));
    buffers.update_object_data(&recolored).unwrap();
}

#[test]
fn unknown_objects_are_ignored_by_updates() {
    let mut buffers = manager();
    buffers.create_buffers().unwrap();

    let stranger = RawObject::new(99).with(BucketKind::Points, points(1, color::RED));
    buffers.update_object_transform(&stranger).unwrap();
    buffers.update_object_settings(&stranger).unwrap();
    buffers.update_object_data(&stranger).unwrap();
}

#[test]
fn transparent_triangles_are_sorted_back_to_front() {
    let mut buffers = manager();
    let near = RawObject::new(0).with(BucketKind::FrontFaces, triangle(5.0, transparent(0.5)));
    let far = RawObject::new(1).with(BucketKind::FrontFaces, triangle(0.0, transparent(0.5)));
    buffers.add_object(&near).unwrap();
    buffers.add_object(&far).unwrap();
    buffers.create_buffers().unwrap();
    buffers.backend_mut().clear_calls();

    let viewworld = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
    assert!(buffers.sort_transparent(viewworld).unwrap());

    let bucket = buffers.bucket(BucketKind::FrontFaces);
    assert_eq!(bucket.transparent_elements(), &[3, 4, 5, 0, 1, 2]);
    let id = bucket.handles().unwrap().transparent.unwrap();
    assert_eq!(buffers.backend().contents_as::<u32>(id).unwrap(), vec![3, 4, 5, 0, 1, 2]);
    assert_eq!(buffers.backend().writes_to(id), 1);

    assert!(!buffers.sort_transparent(viewworld).unwrap());
    assert_eq!(buffers.backend().write_count(), 1);
}

#[test]
fn settings_records_follow_the_style() {
    let mut buffers = manager();
    let mut obj = RawObject::new(0).with(BucketKind::Points, points(1, color::RED));
    obj.style.show_lines = false;
    obj.style.pointsize = 3.0;
    obj.instance_color = Some(color::BLUE);
    buffers.add_object(&obj).unwrap();

    assert_eq!(
        buffers.settings()[0],
        ObjectSettings {
            visibility: [1.0, 1.0, 0.0, 1.0],
            instance: [0.0, 0.0, 1.0, 0.0],
            style: [-1.0, 1.0, 3.0, 1.0],
        }
    );
}
