//! The render buffer manager.
//!
//! Geometry from every object is concatenated into four [`GeometryBucket`]s
//! (points, lines, front faces, back faces). Each vertex carries the slot of
//! its object, which the shaders use to look up the object's transform and
//! [`ObjectSettings`] in two per-object tables.

pub use self::bucket::{BucketHandles, BucketKind, GeometryBucket};
pub use self::manager::BufferManager;
pub use self::settings::{transform_record, ObjectSettings, SETTINGS_STRIDE, TRANSFORM_STRIDE};

mod bucket;
mod draw;
mod ingest;
mod manager;
mod settings;
