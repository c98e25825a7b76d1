#![allow(dead_code)]

use geoview::buffer::BucketKind;
use geoview::color::Color;
use geoview::geometry::BufferData;
use geoview::glamx::{Mat4, Vec3};
use geoview::scene::{BucketSet, Capabilities, ObjectId, ObjectStyle, RenderObject};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Once;

thread_local! {
    static WARNINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Prints through `env_logger` and keeps the warnings of each test thread.
struct TestLogger {
    inner: env_logger::Logger,
}

impl log::Log for TestLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn || self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if record.level() == log::Level::Warn {
            WARNINGS.with(|w| w.borrow_mut().push(record.args().to_string()));
        }
        if self.inner.matches(record) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

pub fn init_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let inner = env_logger::Builder::from_default_env().is_test(true).build();
        let max_level = inner.filter().max(log::LevelFilter::Warn);
        let logger: &'static TestLogger = Box::leak(Box::new(TestLogger { inner }));
        if log::set_logger(logger).is_ok() {
            log::set_max_level(max_level);
        }
    });
}

/// Warnings logged by the current thread since the last call.
pub fn take_warnings() -> Vec<String> {
    WARNINGS.with(|w| std::mem::take(&mut *w.borrow_mut()))
}

/// A render object built directly from per-bucket data.
#[derive(Clone, Debug)]
pub struct RawObject {
    pub id: ObjectId,
    pub data: BTreeMap<BucketKind, BufferData>,
    pub transformation: Option<Mat4>,
    pub instance_color: Option<Color>,
    pub parent: Option<ObjectId>,
    pub style: ObjectStyle,
}

impl RawObject {
    pub fn new(id: u64) -> Self {
        RawObject {
            id: ObjectId::from_raw(id),
            data: BTreeMap::new(),
            transformation: None,
            instance_color: None,
            parent: None,
            style: ObjectStyle::default(),
        }
    }

    pub fn with(mut self, kind: BucketKind, data: BufferData) -> Self {
        let _ = self.data.insert(kind, data);
        self
    }

    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.style.opacity = opacity;
        self
    }
}

impl RenderObject for RawObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn capabilities(&self) -> Capabilities {
        let mut buckets = BucketSet::empty();
        for kind in self.data.keys() {
            buckets |= BucketSet::from(*kind);
        }
        Capabilities {
            buckets,
            instance_color: self.instance_color.is_some(),
            parent: self.parent.is_some(),
        }
    }

    fn read(&self, kind: BucketKind) -> Option<BufferData> {
        self.data.get(&kind).cloned()
    }

    fn transformation(&self) -> Option<Mat4> {
        self.transformation
    }

    fn instance_color(&self) -> Option<Color> {
        self.instance_color
    }

    fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    fn style(&self) -> &ObjectStyle {
        &self.style
    }
}

/// `n` points along X, all with `color`.
pub fn points(n: usize, color: Color) -> BufferData {
    BufferData::new(
        (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
        vec![color; n],
        (0..n as u32).collect(),
    )
}

/// One triangle at height `z`.
pub fn triangle(z: f32, color: Color) -> BufferData {
    BufferData::new(
        vec![
            Vec3::new(0.0, 0.0, z),
            Vec3::new(1.0, 0.0, z),
            Vec3::new(0.0, 1.0, z),
        ],
        vec![color; 3],
        vec![0, 1, 2],
    )
}

/// A single line segment.
pub fn segment(color: Color) -> BufferData {
    BufferData::new(vec![Vec3::ZERO, Vec3::Z], vec![color; 2], vec![0, 1])
}

pub fn sorted(mut v: Vec<u32>) -> Vec<u32> {
    v.sort_unstable();
    v
}
