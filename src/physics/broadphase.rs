//! Broadphase collision detection using a uniform grid on the horizontal plane.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use hecs::Entity;

use super::error::validate_cell_size;

/// Default grid cell size in world units.
pub const DEFAULT_CELL_SIZE: f32 = 2.0;

const MAX_PRESIZED_CELLS: usize = 1024;

/// Integer cell coordinate on the X/Z plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    pub x: i32,
    pub z: i32,
}

#[derive(Debug, Clone)]
struct GridEntry {
    cells: Vec<CellIndex>,
    position: Vec3,
    size: Vec3,
}

/// Uniform grid broadphase.
///
/// Each collider is stored in every cell its bounding box spans. Cells are kept
/// in a `BTreeMap` and each cell list keeps insertion order, so query results
/// are stable for a given sequence of inserts and removals.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: BTreeMap<CellIndex, Vec<Entity>>,
    entries: BTreeMap<Entity, GridEntry>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialGrid {
    /// Create an empty grid. An invalid cell size falls back to the default.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = match validate_cell_size(cell_size) {
            Ok(()) => cell_size,
            Err(e) => {
                tracing::warn!("{e}; using {DEFAULT_CELL_SIZE}");
                DEFAULT_CELL_SIZE
            }
        };
        Self {
            cell_size,
            cells: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of colliders stored in the grid.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.contains_key(&entity)
    }

    /// Cells currently holding `entity`, empty if it is not in the grid.
    pub fn cells_of(&self, entity: Entity) -> &[CellIndex] {
        self.entries
            .get(&entity)
            .map(|e| e.cells.as_slice())
            .unwrap_or(&[])
    }

    /// Colliders stored in a single cell.
    pub fn cell(&self, index: CellIndex) -> &[Entity] {
        self.cells.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell containing a world position (X/Z only).
    #[inline]
    pub fn cell_index_of(&self, position: Vec3) -> CellIndex {
        CellIndex {
            x: (position.x / self.cell_size).floor() as i32,
            z: (position.z / self.cell_size).floor() as i32,
        }
    }

    /// Every cell spanned by an axis-aligned box centered at `position` with
    /// full extents `bounding_size`, as an inclusive rectangle.
    pub fn occupied_cells(&self, position: Vec3, bounding_size: Vec3) -> Vec<CellIndex> {
        let half = bounding_size.abs() * 0.5;
        let min = self.cell_index_of(position - half);
        let max = self.cell_index_of(position + half);

        // Far-away coordinates saturate at the i32 range, so widen before subtracting
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as usize;
        let mut cells = Vec::with_capacity(
            span(min.x, max.x)
                .saturating_mul(span(min.z, max.z))
                .min(MAX_PRESIZED_CELLS),
        );
        for x in min.x..=max.x {
            for z in min.z..=max.z {
                cells.push(CellIndex { x, z });
            }
        }
        cells
    }

    /// Insert a collider. Inserting an entity already present moves it.
    pub fn insert(&mut self, entity: Entity, position: Vec3, bounding_size: Vec3) {
        if self.entries.contains_key(&entity) {
            self.remove(entity);
        }
        let cells = self.occupied_cells(position, bounding_size);
        for &cell in &cells {
            self.cells.entry(cell).or_default().push(entity);
        }
        self.entries.insert(
            entity,
            GridEntry {
                cells,
                position,
                size: bounding_size,
            },
        );
    }

    /// Remove a collider from every cell it occupies. Removing an absent entity is a no-op.
    pub fn remove(&mut self, entity: Entity) {
        let Some(entry) = self.entries.remove(&entity) else {
            return;
        };
        for cell in entry.cells {
            if let Some(list) = self.cells.get_mut(&cell) {
                list.retain(|&e| e != entity);
                if list.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Refresh a collider's bounds, re-inserting it only if its cell set changed.
    ///
    /// Returns `true` when the collider was (re-)inserted.
    pub fn update(&mut self, entity: Entity, position: Vec3, bounding_size: Vec3) -> bool {
        let cells = self.occupied_cells(position, bounding_size);
        match self.entries.get_mut(&entity) {
            Some(entry) if entry.cells == cells => {
                entry.position = position;
                entry.size = bounding_size;
                false
            }
            _ => {
                self.insert(entity, position, bounding_size);
                true
            }
        }
    }

    /// Candidates near a collider: the union of its occupied cells and their
    /// eight neighbours, without duplicates, excluding `entity` itself and any
    /// entity no longer alive in `world`.
    pub fn query(
        &self,
        world: &hecs::World,
        entity: Entity,
        position: Vec3,
        bounding_size: Vec3,
    ) -> Vec<Entity> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();

        for cell in self.occupied_cells(position, bounding_size) {
            for dx in -1..=1 {
                for dz in -1..=1 {
                    // Neighbours past the edge of the i32 range do not exist
                    let (Some(x), Some(z)) = (cell.x.checked_add(dx), cell.z.checked_add(dz))
                    else {
                        continue;
                    };
                    let Some(list) = self.cells.get(&CellIndex { x, z }) else {
                        continue;
                    };
                    for &other in list {
                        if other == entity || !world.contains(other) {
                            continue;
                        }
                        if seen.insert(other) {
                            result.push(other);
                        }
                    }
                }
            }
        }

        result
    }

    /// Colliders whose approximate bounding sphere reaches a query sphere.
    ///
    /// A candidate is accepted when the distance from `center` to its bounds
    /// center is at most `radius` plus half the length of its size vector.
    pub fn query_sphere(&self, world: &hecs::World, center: Vec3, radius: f32) -> Vec<Entity> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();

        for cell in self.occupied_cells(center, Vec3::splat(radius.max(0.0) * 2.0)) {
            let Some(list) = self.cells.get(&cell) else {
                continue;
            };
            for &other in list {
                if !seen.insert(other) || !world.contains(other) {
                    continue;
                }
                let Some(entry) = self.entries.get(&other) else {
                    continue;
                };
                let approx_radius = entry.size.length() * 0.5;
                if center.distance(entry.position) <= radius + approx_radius {
                    result.push(other);
                }
            }
        }

        result
    }

    /// Change the cell size and re-bucket every stored collider.
    ///
    /// Invalid sizes are logged and ignored.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        if let Err(e) = validate_cell_size(cell_size) {
            tracing::warn!("{e}; keeping {}", self.cell_size);
            return;
        }
        self.cell_size = cell_size;

        let entries = std::mem::take(&mut self.entries);
        self.cells.clear();
        for (entity, entry) in entries {
            self.insert(entity, entry.position, entry.size);
        }
        tracing::debug!(
            cell_size,
            colliders = self.entries.len(),
            cells = self.cells.len(),
            "rebuilt spatial grid"
        );
    }

    /// Remove every collider.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }
}
