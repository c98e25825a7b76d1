//! Scene objects and the contract the buffer manager reads them through.

use crate::buffer::BucketKind;
use crate::color::Color;
use crate::geometry::{BufferData, GeometrySource};
use glamx::{Mat4, Vec3};
use std::fmt;

/// Identity of an object in a [`Scene`](crate::scene::Scene).
///
/// Identifiers are never reused, so a stale id simply stops matching anything.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    /// Builds an id from a raw value, for hosts keeping their own registry.
    pub fn from_raw(raw: u64) -> Self {
        ObjectId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object {}", self.0)
    }
}

bitflags::bitflags! {
    /// A set of [`BucketKind`]s.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct BucketSet: u8 {
        const POINTS = 1 << 0;
        const LINES = 1 << 1;
        const FRONTFACES = 1 << 2;
        const BACKFACES = 1 << 3;
        const FACES = Self::FRONTFACES.bits() | Self::BACKFACES.bits();
    }
}

impl BucketSet {
    /// Whether `kind` is in the set.
    #[inline]
    pub fn has(self, kind: BucketKind) -> bool {
        self.contains(BucketSet::from(kind))
    }
}

impl From<BucketKind> for BucketSet {
    fn from(kind: BucketKind) -> Self {
        match kind {
            BucketKind::Points => BucketSet::POINTS,
            BucketKind::Lines => BucketSet::LINES,
            BucketKind::FrontFaces => BucketSet::FRONTFACES,
            BucketKind::BackFaces => BucketSet::BACKFACES,
        }
    }
}

/// What an object provides, checked once when it is ingested.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Buckets the object may have data for.
    pub buckets: BucketSet,
    /// Whether the object carries an instance color for picking.
    pub instance_color: bool,
    /// Whether the object has a parent.
    pub parent: bool,
}

/// Display settings of an object.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectStyle {
    pub show: bool,
    pub show_points: bool,
    pub show_lines: bool,
    pub show_faces: bool,
    pub is_selected: bool,
    /// Object opacity in [0, 1]. Anything below one sends its faces to the transparent pass.
    pub opacity: f32,
    /// Point size in pixels.
    pub pointsize: f32,
    /// Line width in pixels.
    pub linewidth: f32,
}

impl Default for ObjectStyle {
    fn default() -> Self {
        ObjectStyle {
            show: true,
            show_points: true,
            show_lines: true,
            show_faces: true,
            is_selected: false,
            opacity: 1.0,
            pointsize: 6.0,
            linewidth: 1.0,
        }
    }
}

impl ObjectStyle {
    pub fn with_show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }

    pub fn with_points(mut self, show: bool) -> Self {
        self.show_points = show;
        self
    }

    pub fn with_lines(mut self, show: bool) -> Self {
        self.show_lines = show;
        self
    }

    pub fn with_faces(mut self, show: bool) -> Self {
        self.show_faces = show;
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.is_selected = selected;
        self
    }

    /// Sets the opacity, clamped to [0, 1].
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_pointsize(mut self, size: f32) -> Self {
        self.pointsize = size;
        self
    }

    pub fn with_linewidth(mut self, width: f32) -> Self {
        self.linewidth = width;
        self
    }
}

/// An object the buffer manager can ingest.
pub trait RenderObject {
    fn id(&self) -> ObjectId;

    /// What the object provides.
    fn capabilities(&self) -> Capabilities;

    /// Vertex data for one bucket. Only called for buckets listed in the capabilities.
    fn read(&self, kind: BucketKind) -> Option<BufferData>;

    /// Local-to-world transform, `None` for the identity.
    fn transformation(&self) -> Option<Mat4>;

    /// Picking color. Only called when the capabilities list it.
    fn instance_color(&self) -> Option<Color>;

    /// Parent object. Only called when the capabilities list it.
    fn parent(&self) -> Option<ObjectId>;

    fn style(&self) -> &ObjectStyle;
}

bitflags::bitflags! {
    /// What changed on an object since the last synchronization.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Dirty: u8 {
        const TRANSFORM = 1 << 0;
        const SETTINGS = 1 << 1;
        const DATA = 1 << 2;
    }
}

/// A node of a [`Scene`](crate::scene::Scene): geometry plus transform, style and picking data.
pub struct SceneObject {
    pub(crate) id: ObjectId,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) instance_index: Option<u32>,
    pub(crate) dirty: Dirty,
    name: String,
    geometry: Box<dyn GeometrySource>,
    transformation: Option<Mat4>,
    instance_color: Option<Color>,
    style: ObjectStyle,
}

impl SceneObject {
    pub(crate) fn new(
        id: ObjectId,
        geometry: Box<dyn GeometrySource>,
        parent: Option<ObjectId>,
        instance_index: Option<u32>,
    ) -> Self {
        SceneObject {
            id,
            parent,
            instance_index,
            dirty: Dirty::empty(),
            name: format!("object {}", id.0),
            geometry,
            transformation: None,
            instance_color: instance_index.and_then(crate::color::instance_color),
            style: ObjectStyle::default(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    #[inline]
    pub fn geometry(&self) -> &dyn GeometrySource {
        &*self.geometry
    }

    /// Replaces the geometry. The object's vertex data is refreshed on the next sync.
    ///
    /// A geometry with a different vertex count forces a full rebuild.
    pub fn set_geometry(&mut self, geometry: impl GeometrySource + 'static) -> &mut Self {
        self.geometry = Box::new(geometry);
        self.dirty |= Dirty::DATA;
        self
    }

    /// Sets the local-to-world transform. `None` means identity.
    pub fn set_transformation(&mut self, transformation: Option<Mat4>) -> &mut Self {
        self.transformation = transformation;
        self.dirty |= Dirty::TRANSFORM;
        self
    }

    /// Moves the object by `offset` on top of its current transform.
    pub fn translate(&mut self, offset: Vec3) -> &mut Self {
        let current = self.transformation.unwrap_or(Mat4::IDENTITY);
        self.set_transformation(Some(Mat4::from_translation(offset) * current))
    }

    /// Replaces the whole style.
    pub fn set_style(&mut self, style: ObjectStyle) -> &mut Self {
        self.style = style;
        self.dirty |= Dirty::SETTINGS;
        self
    }

    /// Mutable access to the style. The settings are re-uploaded on the next sync.
    pub fn style_mut(&mut self) -> &mut ObjectStyle {
        self.dirty |= Dirty::SETTINGS;
        &mut self.style
    }

    pub fn set_selected(&mut self, selected: bool) -> &mut Self {
        self.style_mut().is_selected = selected;
        self
    }

    pub fn set_visible(&mut self, show: bool) -> &mut Self {
        self.style_mut().show = show;
        self
    }

    pub fn set_opacity(&mut self, opacity: f32) -> &mut Self {
        self.style_mut().opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// The index encoded in this object's instance color.
    #[inline]
    pub fn instance_index(&self) -> Option<u32> {
        self.instance_index
    }

    /// Pending changes.
    #[inline]
    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    /// Center of the geometry's bounding box in world coordinates.
    pub fn world_center(&self) -> Vec3 {
        let center = self.geometry.bounding_box_center();
        self.transformation
            .map_or(center, |m| m.transform_point3(center))
    }
}

impl RenderObject for SceneObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            buckets: self.geometry.buckets(),
            instance_color: self.instance_color.is_some(),
            parent: self.parent.is_some(),
        }
    }

    fn read(&self, kind: BucketKind) -> Option<BufferData> {
        self.geometry.read(kind)
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
