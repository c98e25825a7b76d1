//! The scene object model consumed by the buffer manager.

pub use self::object::{
    BucketSet, Capabilities, Dirty, ObjectId, ObjectStyle, RenderObject, SceneObject,
};
pub use self::scene::Scene;

mod object;
mod scene;
