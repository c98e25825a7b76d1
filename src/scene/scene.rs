//! The registry of scene objects.

use crate::color;
use crate::geometry::GeometrySource;
use crate::scene::{Dirty, ObjectId, RenderObject, SceneObject};

/// Owns the scene objects in insertion order.
///
/// Parents always precede their children, so walking the scene in order visits
/// a parent before anything that refers to it. Objects reference their parent
/// by [`ObjectId`] only.
pub struct Scene {
    objects: Vec<SceneObject>,
    next_id: u64,
    next_instance: u32,
    needs_rebuild: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Scene {
            objects: Vec::new(),
            next_id: 0,
            next_instance: 0,
            needs_rebuild: true,
        }
    }

    fn insert(
        &mut self,
        geometry: Box<dyn GeometrySource>,
        parent: Option<ObjectId>,
    ) -> &mut SceneObject {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let instance_index = if self.next_instance < color::MAX_INSTANCE_COLORS {
            self.next_instance += 1;
            Some(self.next_instance - 1)
        } else {
            log::warn!("out of instance colors, {} will not be pickable", id);
            None
        };

        self.needs_rebuild = true;
        self.objects
            .push(SceneObject::new(id, geometry, parent, instance_index));
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    /// Adds a root object.
    pub fn add(&mut self, geometry: impl GeometrySource + 'static) -> &mut SceneObject {
        self.insert(Box::new(geometry), None)
    }

    /// Adds an object under `parent`.
    ///
    /// The child is added as a root object if `parent` is not in the scene.
    pub fn add_with_parent(
        &mut self,
        parent: ObjectId,
        geometry: impl GeometrySource + 'static,
    ) -> &mut SceneObject {
        let parent = if self.contains(parent) {
            Some(parent)
        } else {
            log::warn!("unknown parent {}, adding as a root object", parent);
            None
        };
        self.insert(Box::new(geometry), parent)
    }

    /// Removes an object and all its descendants.
    ///
    /// Returns the number of removed objects.
    pub fn remove(&mut self, id: ObjectId) -> usize {
        if !self.contains(id) {
            return 0;
        }

        let mut doomed = vec![id];
        // Children come after their parent, one forward pass collects the subtree.
        for obj in &self.objects {
            if obj.parent.is_some_and(|p| doomed.contains(&p)) {
                doomed.push(obj.id);
            }
        }

        let before = self.objects.len();
        self.objects.retain(|o| !doomed.contains(&o.id));
        self.needs_rebuild = true;
        before - self.objects.len()
    }

    /// Removes every object.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.needs_rebuild = true;
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// The objects, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.iter_mut()
    }

    /// Direct children of `id`.
    pub fn children(&self, id: ObjectId) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(move |o| o.parent == Some(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether objects were added or removed since the buffers were last built.
    #[inline]
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Requests a full rebuild on the next sync.
    pub fn request_rebuild(&mut self) {
        self.needs_rebuild = true;
    }

    /// Marks the scene as uploaded: clears the rebuild request and every pending change.
    pub fn mark_synced(&mut self) {
        self.needs_rebuild = false;
        for obj in &mut self.objects {
            obj.dirty = Dirty::empty();
        }
    }

    /// Collects and clears the pending changes of every object.
    pub fn take_dirty(&mut self) -> Vec<(ObjectId, Dirty)> {
        self.objects
            .iter_mut()
            .filter(|o| !o.dirty.is_empty())
            .map(|o| (o.id, std::mem::take(&mut o.dirty)))
            .collect()
    }

    /// Marks changes taken with [`take_dirty`](Self::take_dirty) as pending again.
    ///
    /// Entries of objects removed in the meantime are dropped.
    pub fn restore_dirty(&mut self, pending: impl IntoIterator<Item = (ObjectId, Dirty)>) {
        for (id, dirty) in pending {
            if let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) {
                obj.dirty |= dirty;
            }
        }
    }

    /// The object whose instance color was read back as `rgb`, if any.
    pub fn object_from_instance_color(&self, rgb: [u8; 3]) -> Option<ObjectId> {
        let index = color::instance_index(rgb)?;
        self.objects
            .iter()
            .find(|o| o.instance_index == Some(index))
            .map(|o| o.id)
    }

    /// Selects exactly the given object, or nothing.
    pub fn select_only(&mut self, id: Option<ObjectId>) {
        for obj in &mut self.objects {
            let selected = Some(obj.id) == id;
            if obj.style().is_selected != selected {
                let _ = obj.set_selected(selected);
            }
        }
    }
}
