//! Accumulation, upload and incremental update of the combined buffers.

use crate::buffer::bucket::GeometryBucket;
use crate::buffer::ingest;
use crate::buffer::settings::{transform_record, ObjectSettings};
use crate::buffer::BucketKind;
use crate::config::ElementPolicy;
use crate::error::{BufferError, Result};
use crate::resource::{BufferKind, GpuBackend, GpuVec};
use crate::scene::{Capabilities, ObjectId, RenderObject};
use glamx::{Mat4, Vec3};
use std::collections::HashMap;

/// Consolidates the geometry of many objects into a handful of GPU buffers.
///
/// Objects are appended with [`add_object`](Self::add_object), then uploaded
/// at once with [`create_buffers`](Self::create_buffers). Transforms, settings
/// and vertex data of an uploaded object can be refreshed in place. Anything
/// that changes the number of vertices or elements requires a
/// [`clear`](Self::clear) and a full rebuild.
///
/// The manager never reaches for the objects on its own: every operation takes
/// the objects it needs as arguments.
pub struct BufferManager<B: GpuBackend> {
    pub(super) backend: B,
    policy: ElementPolicy,
    pub(super) buckets: [GeometryBucket; 4],
    objects: HashMap<ObjectId, usize>,
    slots: Vec<ObjectId>,
    pub(super) transforms: GpuVec<[f32; 16]>,
    pub(super) settings: GpuVec<ObjectSettings>,
    settings_cache: HashMap<ObjectId, ObjectSettings>,
    created: bool,
}

impl<B: GpuBackend> BufferManager<B> {
    /// Creates an empty manager allocating from `backend`.
    pub fn new(backend: B) -> Self {
        BufferManager {
            backend,
            policy: ElementPolicy::default(),
            buckets: BucketKind::ALL.map(GeometryBucket::new),
            objects: HashMap::new(),
            slots: Vec::new(),
            transforms: GpuVec::new(BufferKind::Texture, "transforms"),
            settings: GpuVec::new(BufferKind::Texture, "settings"),
            settings_cache: HashMap::new(),
            created: false,
        }
    }

    /// Sets how out-of-range element indices are handled at ingestion.
    pub fn with_policy(mut self, policy: ElementPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn policy(&self) -> ElementPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ElementPolicy) {
        self.policy = policy
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The combined arrays of one bucket.
    #[inline]
    pub fn bucket(&self, kind: BucketKind) -> &GeometryBucket {
        &self.buckets[kind.index()]
    }

    /// The slot assigned to an object.
    #[inline]
    pub fn slot(&self, id: ObjectId) -> Option<usize> {
        self.objects.get(&id).copied()
    }

    /// Objects in slot order.
    #[inline]
    pub fn objects(&self) -> &[ObjectId] {
        &self.slots
    }

    #[inline]
    pub fn object_count(&self) -> usize {
        self.slots.len()
    }

    /// One column-major matrix per slot.
    #[inline]
    pub fn transforms(&self) -> &[[f32; 16]] {
        self.transforms.data()
    }

    /// One record per slot.
    #[inline]
    pub fn settings(&self) -> &[ObjectSettings] {
        self.settings.data()
    }

    /// Whether [`create_buffers`](Self::create_buffers) ran since the last clear.
    #[inline]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether any bucket has GPU resources to draw.
    pub fn has_gpu_resources(&self) -> bool {
        self.buckets.iter().any(|b| b.handles().is_some())
    }

    fn settings_record<O: RenderObject + ?Sized>(&self, obj: &O, caps: &Capabilities) -> ObjectSettings {
        let instance_color = if caps.instance_color {
            obj.instance_color()
        } else {
            None
        };
        let parent_slot = if caps.parent {
            obj.parent().and_then(|p| self.slot(p))
        } else {
            None
        };

        ObjectSettings::new(obj.style(), instance_color, parent_slot)
    }

    /// Appends an object's geometry, transform and settings to the CPU arrays.
    ///
    /// The object gets the next slot. Nothing is uploaded. With the strict
    /// element policy a dangling element rejects the whole object and leaves
    /// the arrays untouched.
    pub fn add_object<O: RenderObject + ?Sized>(&mut self, obj: &O) -> Result<()> {
        let id = obj.id();
        if self.created {
            log::error!("{} added while GPU buffers are live", id);
            return Err(BufferError::BuffersLive(id));
        }
        if self.objects.contains_key(&id) {
            log::warn!("{} is already in the buffers, ignored", id);
            return Ok(());
        }

        let caps = obj.capabilities();
        let opacity = obj.style().opacity;

        let mut prepared = Vec::new();
        for kind in BucketKind::ALL {
            if !caps.buckets.has(kind) {
                continue;
            }
            match obj.read(kind) {
                Some(data) if !data.is_empty() => {
                    prepared.push(ingest::prepare(id, kind, data, self.policy, opacity)?)
                }
                _ => {}
            }
        }

        let slot = self.slots.len();
        let settings = self.settings_record(obj, &caps);

        for data in prepared {
            self.buckets[data.kind.index()].append(slot, data);
        }

        let _ = self.objects.insert(id, slot);
        self.slots.push(id);
        self.transforms.push(transform_record(obj.transformation()));
        self.settings.push(settings);
        Ok(())
    }

    /// Uploads the transform and settings tables and every non-empty bucket.
    ///
    /// Empty tables are uploaded as a single placeholder entry so they can
    /// always be bound.
    pub fn create_buffers(&mut self) -> Result<()> {
        if self.created {
            log::error!("create_buffers called twice without clear");
            return Err(BufferError::AlreadyCreated);
        }

        let _ = self
            .transforms
            .load_to_gpu_or(&mut self.backend, transform_record(None))?;
        let _ = self
            .settings
            .load_to_gpu_or(&mut self.backend, ObjectSettings::PLACEHOLDER)?;

        for bucket in &mut self.buckets {
            bucket.upload(&mut self.backend)?;
        }

        self.created = true;
        log::debug!(
            "created buffers for {} objects ({} point, {} line, {} front face, {} back face vertices)",
            self.slots.len(),
            self.buckets[0].vertex_count(),
            self.buckets[1].vertex_count(),
            self.buckets[2].vertex_count(),
            self.buckets[3].vertex_count(),
        );
        Ok(())
    }

    /// Rewrites the transform of one object. Unknown objects are ignored.
    pub fn update_object_transform<O: RenderObject + ?Sized>(&mut self, obj: &O) -> Result<()> {
        let Some(slot) = self.slot(obj.id()) else {
            return Ok(());
        };

        let record = transform_record(obj.transformation());
        self.transforms
            .write_range(&mut self.backend, slot, &[record])
    }

    /// Rewrites the settings of one object if they differ from the last ones written.
    ///
    /// Unknown objects are ignored. Fails with
    /// [`PartitionChanged`](BufferError::PartitionChanged) when an opacity
    /// change would move faces between the opaque and transparent passes.
    /// The other fields are still written in that case, the opacity keeps its
    /// old value until the buffers are rebuilt.
    pub fn update_object_settings<O: RenderObject + ?Sized>(&mut self, obj: &O) -> Result<()> {
        let id = obj.id();
        let Some(slot) = self.slot(id) else {
            return Ok(());
        };

        let record = self.settings_record(obj, &obj.capabilities());
        if self.settings_cache.get(&id) == Some(&record) {
            return Ok(());
        }

        let current = self.settings.data()[slot];
        if record.opacity() != current.opacity() {
            let moved = BucketKind::FACES.into_iter().find(|kind| {
                self.buckets[kind.index()].partition_changes(slot, None, record.opacity())
            });
            if let Some(kind) = moved {
                let mut kept = record;
                kept.style[1] = current.opacity();
                if kept != current {
                    self.settings
                        .write_range(&mut self.backend, slot, &[kept])?;
                    let _ = self.settings_cache.insert(id, kept);
                }
                return Err(BufferError::PartitionChanged { object: id, kind });
            }
        }

        self.settings
            .write_range(&mut self.backend, slot, &[record])?;
        let _ = self.settings_cache.insert(id, record);
        Ok(())
    }

    /// [`update_object_settings`](Self::update_object_settings) for every given object.
    pub fn update_settings<'a, O, I>(&mut self, objects: I) -> Result<()>
    where
        O: RenderObject + ?Sized + 'a,
        I: IntoIterator<Item = &'a O>,
    {
        for obj in objects {
            self.update_object_settings(obj)?;
        }
        Ok(())
    }

    /// Re-reads the positions and colors of one object and rewrites them in place.
    ///
    /// Unknown objects are ignored. Fails without writing anything when the
    /// number of vertices in any bucket differs from what was ingested
    /// ([`TopologyChanged`](BufferError::TopologyChanged)) or when new alphas
    /// move faces between passes ([`PartitionChanged`](BufferError::PartitionChanged)).
    pub fn update_object_data<O: RenderObject + ?Sized>(&mut self, obj: &O) -> Result<()> {
        let id = obj.id();
        let Some(slot) = self.slot(id) else {
            return Ok(());
        };

        let caps = obj.capabilities();
        let opacity = self.settings.data()[slot].opacity();

        let mut updates = Vec::new();
        for kind in BucketKind::ALL {
            let bucket = &self.buckets[kind.index()];
            let data = if caps.buckets.has(kind) {
                obj.read(kind)
            } else {
                None
            };

            let found = data.as_ref().map_or(0, |d| d.vertex_count());
            let (start, expected) = bucket.vertex_range(slot).unwrap_or((0, 0));
            if found != expected {
                log::warn!(
                    "{} ({}): vertex count changed from {} to {}",
                    id,
                    kind,
                    expected,
                    found
                );
                return Err(BufferError::TopologyChanged {
                    object: id,
                    kind,
                    expected,
                    found,
                });
            }

            let Some(data) = data else { continue };
            if found == 0 {
                continue;
            }

            let colors = ingest::repair_colors(id, kind, &data.colors, found);
            if kind.is_face() && bucket.partition_changes(slot, Some(&colors), opacity) {
                return Err(BufferError::PartitionChanged { object: id, kind });
            }

            let positions: Vec<[f32; 3]> = data.positions.iter().map(|p| p.to_array()).collect();
            updates.push((kind, start, positions, colors));
        }

        for (kind, start, positions, colors) in updates {
            let bucket = &mut self.buckets[kind.index()];
            bucket
                .positions
                .write_range(&mut self.backend, start, &positions)?;
            bucket
                .colors
                .write_range(&mut self.backend, start, &colors)?;
        }

        Ok(())
    }

    /// Orders the transparent triangles of both face buckets back to front.
    ///
    /// Triangles are keyed by the view-space depth of their centroid. The
    /// transparent index buffers are rewritten in place, and only when the
    /// order changed. Returns whether anything was written.
    pub fn sort_transparent(&mut self, viewworld: Mat4) -> Result<bool> {
        let mut changed = false;

        for kind in BucketKind::FACES {
            let bucket = &mut self.buckets[kind.index()];
            if bucket.transparent.len() < 6 {
                continue;
            }

            let positions = bucket.positions.data();
            let object_indices = bucket.object_indices.data();
            let transforms = self.transforms.data();

            let mut keyed: Vec<(f32, &[u32])> = bucket
                .transparent
                .data()
                .chunks_exact(3)
                .map(|t| {
                    let slot = object_indices[t[0] as usize] as usize;
                    let model = transforms
                        .get(slot)
                        .map_or(Mat4::IDENTITY, Mat4::from_cols_array);
                    let centroid = t
                        .iter()
                        .map(|&i| Vec3::from_array(positions[i as usize]))
                        .sum::<Vec3>()
                        / 3.0;
                    ((viewworld * model).transform_point3(centroid).z, t)
                })
                .collect();

            // View space looks down -Z: the most negative depth is the farthest.
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            let sorted: Vec<u32> = keyed.iter().flat_map(|(_, t)| t.iter().copied()).collect();

            if sorted != bucket.transparent.data() {
                bucket
                    .transparent
                    .write_range(&mut self.backend, 0, &sorted)?;
                changed = true;
            }
        }

        Ok(changed)
    }

    /// Releases every GPU resource and empties every array, slot and cache.
    ///
    /// Safe to call at any time, including before `create_buffers`.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear(&mut self.backend);
        }
        self.transforms.clear(&mut self.backend);
        self.settings.clear(&mut self.backend);

        self.objects.clear();
        self.slots.clear();
        self.settings_cache.clear();
        self.created = false;
    }
}
