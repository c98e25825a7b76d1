mod common;

use common::*;
use geoview::buffer::{BucketKind, BufferManager};
use geoview::color::{self, Color};
use geoview::config::RenderMode;
use geoview::renderer::shader::names;
use geoview::renderer::{ElementType, RecordingShader, RenderState, Shader, ShaderCall, Uniform};
use geoview::resource::{BufferId, RecordingBackend};

/// An opaque two-sided triangle, a transparent triangle, three points and a segment.
fn scene() -> BufferManager<RecordingBackend> {
    init_logger();
    let mut buffers = BufferManager::new(RecordingBackend::new());

    let solid = RawObject::new(0)
        .with(BucketKind::FrontFaces, triangle(0.0, color::RED))
        .with(BucketKind::BackFaces, triangle(0.0, color::RED));
    let glass = RawObject::new(1).with(
        BucketKind::FrontFaces,
        triangle(1.0, Color::new(0.0, 0.0, 1.0, 0.5)),
    );
    let cloud = RawObject::new(2)
        .with(BucketKind::Points, points(3, color::BLACK))
        .with(BucketKind::Lines, segment(color::BLACK));

    for obj in [&solid, &glass, &cloud] {
        buffers.add_object(obj).unwrap();
    }
    buffers.create_buffers().unwrap();
    buffers
}

#[derive(Debug, PartialEq)]
enum Draw {
    Points(usize),
    Lines(usize),
    Triangles(BufferId, usize),
}

fn draws(shader: &RecordingShader) -> Vec<(Draw, RenderState)> {
    shader
        .draws()
        .into_iter()
        .map(|(call, state)| {
            let draw = match call {
                ShaderCall::DrawPoints(_, n) => Draw::Points(n),
                ShaderCall::DrawLines(_, n) => Draw::Lines(n),
                ShaderCall::DrawTriangles(id, n) => Draw::Triangles(id, n),
                other => unreachable!("{:?}", other),
            };
            (draw, state)
        })
        .collect()
}

fn run(
    buffers: &BufferManager<RecordingBackend>,
    rendermode: RenderMode,
    is_instance: bool,
) -> (RecordingShader, RecordingShader) {
    let mut shader = RecordingShader::new();
    let mut lines = RecordingShader::new();
    buffers.draw(&mut shader, &mut lines, rendermode, is_instance);
    (shader, lines)
}

struct Ids {
    front_opaque: BufferId,
    front_transparent: BufferId,
    back_opaque: BufferId,
}

fn ids(buffers: &BufferManager<RecordingBackend>) -> Ids {
    let front = buffers.bucket(BucketKind::FrontFaces).handles().unwrap();
    let back = buffers.bucket(BucketKind::BackFaces).handles().unwrap();
    Ids {
        front_opaque: front.elements,
        front_transparent: front.transparent.unwrap(),
        back_opaque: back.elements,
    }
}

fn offset() -> RenderState {
    RenderState {
        polygon_offset: true,
        ..RenderState::default()
    }
}

fn no_depth_write() -> RenderState {
    RenderState {
        depth_write: false,
        ..RenderState::default()
    }
}

#[test]
fn shaded_frames_draw_opaque_then_points_lines_and_transparent() {
    let buffers = scene();
    let ids = ids(&buffers);
    let (shader, lines) = run(&buffers, RenderMode::Shaded, false);

    assert_eq!(
        draws(&shader),
        vec![
            (Draw::Triangles(ids.front_opaque, 3), offset()),
            (Draw::Triangles(ids.back_opaque, 3), offset()),
            (Draw::Points(3), RenderState::default()),
            (Draw::Triangles(ids.front_transparent, 3), no_depth_write()),
        ]
    );

    let line_state = RenderState {
        cull_faces: false,
        ..RenderState::default()
    };
    assert_eq!(draws(&lines), vec![(Draw::Lines(2), line_state)]);
    assert_eq!(shader.render_state(), RenderState::default());
    assert_eq!(lines.render_state(), RenderState::default());
}

#[test]
fn wireframe_frames_skip_every_face() {
    let buffers = scene();
    let (shader, lines) = run(&buffers, RenderMode::Wireframe, false);

    assert_eq!(
        draws(&shader),
        vec![(Draw::Points(3), RenderState::default())]
    );
    assert_eq!(draws(&lines).len(), 1);
}

#[test]
fn ghosted_frames_draw_every_face_in_the_transparent_pass() {
    let buffers = scene();
    let ids = ids(&buffers);
    let (shader, _) = run(&buffers, RenderMode::Ghosted, false);

    assert_eq!(
        draws(&shader),
        vec![
            (Draw::Points(3), RenderState::default()),
            (Draw::Triangles(ids.front_transparent, 3), no_depth_write()),
            (Draw::Triangles(ids.front_opaque, 3), no_depth_write()),
            (Draw::Triangles(ids.back_opaque, 3), no_depth_write()),
        ]
    );
}

#[test]
fn instance_frames_draw_transparent_faces_as_opaque() {
    let buffers = scene();
    let ids = ids(&buffers);

    for rendermode in [RenderMode::Shaded, RenderMode::Ghosted] {
        let (shader, lines) = run(&buffers, rendermode, true);
        assert_eq!(
            draws(&shader),
            vec![
                (Draw::Triangles(ids.front_opaque, 3), offset()),
                (Draw::Triangles(ids.front_transparent, 3), offset()),
                (Draw::Triangles(ids.back_opaque, 3), offset()),
                (Draw::Points(3), RenderState::default()),
            ]
        );
        assert_eq!(draws(&lines).len(), 1);
    }
}

#[test]
fn element_types_and_lighting_are_set_per_pass() {
    let buffers = scene();
    let (shader, lines) = run(&buffers, RenderMode::Lighted, false);

    assert_eq!(
        lines.last_uniform(names::ELEMENT_TYPE),
        Some(Uniform::from(ElementType::Line))
    );
    assert_eq!(lines.last_uniform(names::IS_LIGHTED), Some(Uniform::Int(0)));
    assert_eq!(
        shader.last_uniform(names::ELEMENT_TYPE),
        Some(Uniform::from(ElementType::Face))
    );
    assert_eq!(shader.last_uniform(names::IS_LIGHTED), Some(Uniform::Int(1)));
}

#[test]
fn object_tables_are_bound_to_both_programs() {
    let buffers = scene();
    let (shader, lines) = run(&buffers, RenderMode::Shaded, false);

    for program in [&shader, &lines] {
        for table in [names::TRANSFORMS, names::SETTINGS] {
            assert!(program
                .calls()
                .iter()
                .any(|c| matches!(c, ShaderCall::BindTexture(name, _) if name == table)));
        }
    }
}

#[test]
fn buckets_without_draws_are_skipped() {
    init_logger();
    let mut buffers = BufferManager::new(RecordingBackend::new());
    let glass = RawObject::new(0).with(
        BucketKind::FrontFaces,
        triangle(0.0, Color::new(1.0, 1.0, 1.0, 0.2)),
    );
    buffers.add_object(&glass).unwrap();
    buffers.create_buffers().unwrap();

    let (shader, lines) = run(&buffers, RenderMode::Shaded, false);

    let front = buffers.bucket(BucketKind::FrontFaces).handles().unwrap();
    assert_eq!(
        draws(&shader),
        vec![(Draw::Triangles(front.transparent.unwrap(), 3), no_depth_write())]
    );
    assert!(draws(&lines).is_empty());
}

#[test]
fn nothing_is_drawn_before_upload() {
    init_logger();
    let mut buffers = BufferManager::new(RecordingBackend::new());
    buffers
        .add_object(&RawObject::new(0).with(BucketKind::Points, points(2, color::RED)))
        .unwrap();

    let (shader, lines) = run(&buffers, RenderMode::Shaded, false);
    assert!(shader.calls().is_empty());
    assert!(lines.calls().is_empty());
}
