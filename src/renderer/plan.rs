//! Per-frame draw ordering.
//!
//! [`PartTable`] records, for every uploaded mesh, which parts it holds,
//! where they sit in the index buffer, which layer each belongs to, and the
//! picking IDs it was stamped with. [`FramePlan::build`] turns that table
//! plus an [`OpacityInfo`] into the draws for one frame:
//!
//! 1. opaque parts, one merged display list per mesh;
//! 2. translucent parts grouped by `(mesh, layer, opacity)`, inner layers
//!    first and back-to-front by distance within a layer.
//!
//! Fully transparent parts are never drawn.

use glam::Vec3;

use crate::catalog::{MeshEntry, ModelInfo};
use crate::error::ViewerError;
use crate::layers::OpacityInfo;
use crate::mesh::buffers::MAX_PICK_ID;
use crate::mesh::{BBox, DisplayList, PartRange, PartRanges};

/// One uploaded mesh as seen by the planner.
#[derive(Debug, Clone)]
pub struct MeshParts {
    /// Material the mesh is drawn with.
    pub material: String,
    /// Part names in index-buffer order.
    pub names: Vec<String>,
    /// Index range of each part.
    pub ranges: Vec<PartRange>,
    /// Layer of each part.
    pub layers: Vec<usize>,
    /// Bounding box of each part.
    pub bboxes: Vec<BBox>,
    /// Picking ID of the first part; part `i` has `first_id + i`.
    pub first_id: u32,
}

impl MeshParts {
    fn group_bounds(&self, ordinals: &[usize]) -> Option<BBox> {
        crate::mesh::union_bboxes(ordinals.iter().filter_map(|&i| self.bboxes.get(i)))
    }
}

/// Every part of the current model, by mesh and by name.
#[derive(Debug, Clone, Default)]
pub struct PartTable {
    meshes: Vec<MeshParts>,
    ranges: PartRanges,
    next_id: u32,
    base_id: u32,
}

impl PartTable {
    /// Empty table whose first part gets picking ID `base_id`. ID 0 is the
    /// background, so `base_id` is clamped to `1..=MAX_PICK_ID`.
    pub fn new(base_id: u32) -> Self {
        let clamped = base_id.clamp(1, MAX_PICK_ID);
        if clamped != base_id {
            log::warn!("picking base ID {base_id} clamped to {clamped}");
        }
        Self {
            base_id: clamped,
            next_id: clamped,
            ..Self::default()
        }
    }

    /// Picking ID the next registered mesh will start at.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Check that `entry` is well formed and that its parts still fit in the
    /// picking ID space. Returns the ID its first part would get.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Catalog`] if names and lengths disagree, and
    /// [`ViewerError::Format`] if the part lengths overflow a 32-bit index
    /// buffer or the parts would run past [`MAX_PICK_ID`].
    pub fn check_entry(&self, entry: &MeshEntry) -> Result<u32, ViewerError> {
        entry.validate()?;
        if u32::try_from(entry.total_index_count()).is_err() {
            return Err(ViewerError::Format(format!(
                "entry '{}' lists {} indices",
                entry.material,
                entry.total_index_count()
            )));
        }
        let last = u32::try_from(entry.part_count())
            .ok()
            .and_then(|count| self.next_id.checked_add(count))
            .filter(|&end| end <= MAX_PICK_ID + 1);
        if last.is_none() {
            return Err(ViewerError::Format(format!(
                "entry '{}' needs {} picking IDs from {}, past the limit of {MAX_PICK_ID}",
                entry.material,
                entry.part_count(),
                self.next_id
            )));
        }
        Ok(self.next_id)
    }

    /// Register an uploaded entry and return its mesh index. `bboxes` are
    /// the entry's decoded per-part boxes.
    ///
    /// # Errors
    ///
    /// Fails as [`PartTable::check_entry`] does; the table is left unchanged.
    pub fn add_mesh(
        &mut self,
        entry: &MeshEntry,
        model: &ModelInfo,
        bboxes: &[BBox],
    ) -> Result<usize, ViewerError> {
        let first_id = self.check_entry(entry)?;
        let mesh = self.meshes.len();
        let ranges = self.ranges.add_mesh(mesh, &entry.names, &entry.lengths);
        let layers = entry
            .names
            .iter()
            .map(|name| model.layer_of(name, &entry.material))
            .collect();
        self.next_id = first_id + entry.part_count() as u32;
        self.meshes.push(MeshParts {
            material: entry.material.clone(),
            names: entry.names.clone(),
            ranges,
            layers,
            bboxes: bboxes.to_vec(),
            first_id,
        });
        Ok(mesh)
    }

    /// Registered meshes, in upload order.
    pub fn meshes(&self) -> &[MeshParts] {
        &self.meshes
    }

    /// Model-wide name lookup.
    pub fn ranges(&self) -> &PartRanges {
        &self.ranges
    }

    /// Total parts across all meshes (a split part counts once per mesh).
    pub fn part_count(&self) -> usize {
        self.meshes.iter().map(|m| m.names.len()).sum()
    }

    /// Part name for a picking ID, or `None` for the background and
    /// unassigned IDs.
    pub fn part_for_id(&self, id: u32) -> Option<&str> {
        if id < self.base_id || id >= self.next_id {
            return None;
        }
        let mesh = self.meshes.partition_point(|m| m.first_id <= id).checked_sub(1)?;
        let parts = &self.meshes[mesh];
        parts
            .names
            .get((id - parts.first_id) as usize)
            .map(String::as_str)
    }

    /// Forget every mesh (model switch).
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.ranges.clear();
        self.next_id = self.base_id;
    }
}

/// One draw call batch: a display list over a single mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDraw {
    /// Mesh index in the [`PartTable`].
    pub mesh: usize,
    /// Layer the batch belongs to; opaque batches report their innermost
    /// layer.
    pub layer: usize,
    /// Opacity the batch is drawn with.
    pub opacity: f32,
    /// Merged spans to draw.
    pub list: DisplayList,
    /// Squared eye distance to the batch's bounds, used for sorting.
    pub distance_sq: f32,
}

/// Ordered draws for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    /// Drawn first with depth writes on.
    pub opaque: Vec<PlannedDraw>,
    /// Drawn after `opaque`, blended, in order.
    pub translucent: Vec<PlannedDraw>,
}

impl FramePlan {
    /// Plan a frame seen from `eye`.
    pub fn build(table: &PartTable, info: &OpacityInfo, eye: Vec3) -> Self {
        let mut plan = Self::default();
        for (mesh, parts) in table.meshes().iter().enumerate() {
            let mut opaque: Vec<usize> = Vec::new();
            // (layer, opacity, ordinals)
            let mut groups: Vec<(usize, f32, Vec<usize>)> = Vec::new();

            for (ordinal, name) in parts.names.iter().enumerate() {
                let layer = parts.layers[ordinal];
                let opacity = info.opacity_of(name, layer);
                if opacity <= 0.0 {
                    continue;
                }
                if opacity >= 1.0 {
                    opaque.push(ordinal);
                    continue;
                }
                match groups
                    .iter_mut()
                    .find(|(l, o, _)| *l == layer && *o == opacity)
                {
                    Some((_, _, ordinals)) => ordinals.push(ordinal),
                    None => groups.push((layer, opacity, vec![ordinal])),
                }
            }

            if !opaque.is_empty() {
                let layer = opaque.iter().map(|&i| parts.layers[i]).max().unwrap_or(0);
                plan.opaque
                    .push(Self::batch(parts, mesh, layer, 1.0, &opaque, eye));
            }
            for (layer, opacity, ordinals) in groups {
                plan.translucent
                    .push(Self::batch(parts, mesh, layer, opacity, &ordinals, eye));
            }
        }

        // Inner layers first, then farthest first.
        plan.translucent.sort_by(|a, b| {
            b.layer
                .cmp(&a.layer)
                .then(b.distance_sq.total_cmp(&a.distance_sq))
        });
        plan
    }

    fn batch(
        parts: &MeshParts,
        mesh: usize,
        layer: usize,
        opacity: f32,
        ordinals: &[usize],
        eye: Vec3,
    ) -> PlannedDraw {
        let list = DisplayList::from_ranges(
            ordinals
                .iter()
                .map(|&i| (parts.ranges[i].start, parts.ranges[i].length)),
        );
        let distance_sq = parts
            .group_bounds(ordinals)
            .map_or(0.0, |b| b.center().distance_squared(eye));
        PlannedDraw {
            mesh,
            layer,
            opacity,
            list,
            distance_sq,
        }
    }

    /// Total draw calls the plan issues.
    pub fn draw_call_count(&self) -> usize {
        self.opaque
            .iter()
            .chain(&self.translucent)
            .map(|d| d.list.len())
            .sum()
    }

    /// `true` when nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.translucent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LayerInfo, StreamRange};
    use crate::codec::DecodeParams;

    fn model() -> ModelInfo {
        ModelInfo {
            materials: Default::default(),
            decode_params: DecodeParams::new(vec![0.0; 3], vec![1.0; 3]).unwrap(),
            urls: Default::default(),
            layers: vec![
                LayerInfo {
                    name: "skin".into(),
                    parts: vec![],
                    materials: vec!["cuticle".into()],
                },
                LayerInfo {
                    name: "organs".into(),
                    parts: vec!["pharynx".into()],
                    materials: vec![],
                },
                LayerInfo {
                    name: "neurons".into(),
                    parts: vec![],
                    materials: vec![],
                },
            ],
            texture_path: String::new(),
            format: Default::default(),
        }
    }

    fn entry(material: &str, names: &[&str], lengths: &[u32]) -> MeshEntry {
        MeshEntry {
            material: material.into(),
            attrib_range: StreamRange { start: 0, length: 0 },
            index_range: StreamRange { start: 0, length: 0 },
            bboxes: 0,
            names: names.iter().map(|&n| n.to_owned()).collect(),
            lengths: lengths.to_vec(),
        }
    }

    fn cube_at(z: f32) -> BBox {
        BBox::from_min_max([-1.0, -1.0, z - 1.0], [1.0, 1.0, z + 1.0])
    }

    fn table() -> PartTable {
        let model = model();
        let mut table = PartTable::new(1);
        // mesh 0: cuticle at z=0, layer 0
        let _ = table
            .add_mesh(&entry("cuticle", &["cuticle"], &[30]), &model, &[cube_at(0.0)])
            .unwrap();
        // mesh 1: pharynx (layer 1) near, ala (layer 2) far
        let _ = table.add_mesh(
            &entry("neuron", &["pharynx", "ala"], &[12, 6]),
            &model,
            &[cube_at(-5.0), cube_at(-50.0)],
        )
        .unwrap();
        // mesh 2: one more layer-1 part, far away
        let _ = table.add_mesh(
            &entry("muscle", &["pharynx"], &[9]),
            &model,
            &[cube_at(-80.0)],
        )
        .unwrap();
        table
    }

    #[test]
    fn ids_are_assigned_sequentially() {
        let table = table();
        assert_eq!(table.part_for_id(0), None);
        assert_eq!(table.part_for_id(1), Some("cuticle"));
        assert_eq!(table.part_for_id(2), Some("pharynx"));
        assert_eq!(table.part_for_id(3), Some("ala"));
        assert_eq!(table.part_for_id(4), Some("pharynx"));
        assert_eq!(table.part_for_id(5), None);
        assert_eq!(table.next_id(), 5);
    }

    #[test]
    fn mismatched_entry_is_refused_and_table_untouched() {
        let model = model();
        let mut table = PartTable::new(1);
        let bad = entry("neuron", &["a", "b"], &[3]);
        assert!(matches!(
            table.add_mesh(&bad, &model, &[cube_at(0.0)]),
            Err(ViewerError::Catalog(_))
        ));
        assert!(table.meshes().is_empty());
        assert_eq!(table.next_id(), 1);
        let plan = FramePlan::build(&table, &OpacityInfo::new(&[1.0, 1.0, 1.0]), Vec3::ZERO);
        assert!(plan.is_empty());
    }

    #[test]
    fn picking_ids_stay_within_float_precision() {
        let model = model();
        assert_eq!(PartTable::new(0).next_id(), 1);
        assert_eq!(PartTable::new(u32::MAX).next_id(), MAX_PICK_ID);

        let mut table = PartTable::new(MAX_PICK_ID - 1);
        let two = entry("neuron", &["a", "b"], &[3, 3]);
        assert_eq!(table.add_mesh(&two, &model, &[]).unwrap(), 0);
        assert_eq!(table.part_for_id(MAX_PICK_ID), Some("b"));
        assert!(matches!(
            table.add_mesh(&entry("muscle", &["c"], &[3]), &model, &[]),
            Err(ViewerError::Format(_))
        ));
        assert_eq!(table.meshes().len(), 1);
    }

    #[test]
    fn layers_come_from_names_then_materials() {
        let table = table();
        assert_eq!(table.meshes()[0].layers, vec![0]);
        assert_eq!(table.meshes()[1].layers, vec![1, 2]);
    }

    #[test]
    fn all_opaque_is_one_batch_per_mesh() {
        let table = table();
        let plan = FramePlan::build(&table, &OpacityInfo::new(&[1.0, 1.0, 1.0]), Vec3::ZERO);
        assert!(plan.translucent.is_empty());
        assert_eq!(plan.opaque.len(), 3);
        assert_eq!(plan.opaque[1].list.to_flat(), vec![0, 18]);
        assert_eq!(plan.draw_call_count(), 3);
    }

    #[test]
    fn hidden_parts_are_skipped() {
        let table = table();
        let info = OpacityInfo::new(&[0.0, 1.0, 1.0]).with_override("ala", 0.0);
        let plan = FramePlan::build(&table, &info, Vec3::ZERO);
        let meshes: Vec<usize> = plan.opaque.iter().map(|d| d.mesh).collect();
        assert_eq!(meshes, vec![1, 2]);
        assert_eq!(plan.opaque[0].list.to_flat(), vec![0, 12]);
    }

    #[test]
    fn translucent_sorts_inner_layer_then_far_to_near() {
        let table = table();
        let info = OpacityInfo::new(&[0.5, 0.5, 0.5]);
        let plan = FramePlan::build(&table, &info, Vec3::new(0.0, 0.0, 10.0));
        assert!(plan.opaque.is_empty());
        let order: Vec<(usize, usize)> =
            plan.translucent.iter().map(|d| (d.layer, d.mesh)).collect();
        // layer 2 (ala), then layer 1 far (mesh 2) before near (mesh 1), then skin.
        assert_eq!(order, vec![(2, 1), (1, 2), (1, 1), (0, 0)]);
    }

    #[test]
    fn overrides_split_opaque_from_translucent() {
        let table = table();
        let info = OpacityInfo::new(&[0.3, 1.0, 1.0]).with_override("cuticle", 1.0);
        let plan = FramePlan::build(&table, &info, Vec3::ZERO);
        assert!(plan.translucent.is_empty());
        assert_eq!(plan.opaque.len(), 3);

        let ints = OpacityInfo::new(&[0.3, 1.0, 1.0]).int_valued();
        let picking = FramePlan::build(&table, &ints, Vec3::ZERO);
        assert!(picking.translucent.is_empty());
        assert!(picking.opaque.iter().all(|d| d.mesh != 0));
    }

    #[test]
    fn clear_resets_ids() {
        let mut table = table();
        table.clear();
        assert_eq!(table.part_count(), 0);
        assert_eq!(table.next_id(), 1);
        assert!(FramePlan::build(&table, &OpacityInfo::default(), Vec3::ZERO).is_empty());
    }
}
