//! Grid broad-phase for range queries
//!
//! Rebuilt from scratch every tick. Entities are bucketed by the grid cell that
//! contains their centre; queries sweep the surrounding cells and then apply an
//! exact circle test, so results never miss an overlapping entity.

use ahash::AHashMap;
use bitflags::bitflags;
use glam::Vec2;
use thiserror::Error;

use crate::entities::{Food, FoodKind, MovingMass, PowerUp, PowerUpKind, Virus};
use crate::keys::{EntityKey, FoodId, MassId, OrganismId, PowerUpId, VirusId};
use crate::math::is_finite_vec;

/// Errors emitted when constructing a spatial index
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("grid cell size must be positive and finite (got {0})")]
    InvalidCellSize(f32),
}

/// Query categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Food,
    OrganismCell,
    Virus,
    PowerUp,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::Food,
        Self::OrganismCell,
        Self::Virus,
        Self::PowerUp,
    ];

    fn slot(self) -> usize {
        match self {
            Self::Food => 0,
            Self::OrganismCell => 1,
            Self::Virus => 2,
            Self::PowerUp => 3,
        }
    }

    pub fn mask(self) -> CategoryMask {
        match self {
            Self::Food => CategoryMask::FOOD,
            Self::OrganismCell => CategoryMask::ORGANISM_CELL,
            Self::Virus => CategoryMask::VIRUS,
            Self::PowerUp => CategoryMask::POWER_UP,
        }
    }
}

bitflags! {
    /// Set of categories requested by a query
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategoryMask: u8 {
        const FOOD = 1 << 0;
        const ORGANISM_CELL = 1 << 1;
        const VIRUS = 1 << 2;
        const POWER_UP = 1 << 3;
    }
}

impl From<Category> for CategoryMask {
    fn from(category: Category) -> Self {
        category.mask()
    }
}

/// What an indexed entity is, with the detail the AI needs to score it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityKind {
    Food(FoodKind),
    /// Ejected mass, edible like food
    Mass,
    Virus,
    PowerUp(PowerUpKind),
    Cell { shielded: bool },
}

impl EntityKind {
    pub fn category(&self) -> Category {
        match self {
            Self::Food(_) | Self::Mass => Category::Food,
            Self::Virus => Category::Virus,
            Self::PowerUp(_) => Category::PowerUp,
            Self::Cell { .. } => Category::OrganismCell,
        }
    }
}

/// Snapshot of one entity as it stood when the index was rebuilt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRef {
    pub key: EntityKey,
    pub kind: EntityKind,
    pub position: Vec2,
    pub radius: f32,
    pub mass: f32,
}

impl EntityRef {
    pub fn food(id: FoodId, food: &Food) -> Self {
        Self {
            key: EntityKey::Food(id),
            kind: EntityKind::Food(food.kind),
            position: food.position,
            radius: food.radius(),
            mass: food.mass,
        }
    }

    pub fn moving_mass(id: MassId, mass: &MovingMass) -> Self {
        Self {
            key: EntityKey::Mass(id),
            kind: EntityKind::Mass,
            position: mass.position,
            radius: mass.radius(),
            mass: mass.mass,
        }
    }

    pub fn virus(id: VirusId, virus: &Virus) -> Self {
        Self {
            key: EntityKey::Virus(id),
            kind: EntityKind::Virus,
            position: virus.position,
            radius: virus.radius(),
            mass: virus.mass,
        }
    }

    pub fn power_up(id: PowerUpId, power_up: &PowerUp) -> Self {
        Self {
            key: EntityKey::PowerUp(id),
            kind: EntityKind::PowerUp(power_up.kind),
            position: power_up.position,
            radius: power_up.radius,
            mass: 0.0,
        }
    }

    pub fn cell(
        organism: OrganismId,
        slot: usize,
        position: Vec2,
        radius: f32,
        mass: f32,
        shielded: bool,
    ) -> Self {
        Self {
            key: EntityKey::Cell { organism, slot },
            kind: EntityKind::Cell { shielded },
            position,
            radius,
            mass,
        }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Owning organism for cell entries
    pub fn owner(&self) -> Option<OrganismId> {
        self.key.organism()
    }
}

/// Per-category query results; categories with no match are empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub food: Vec<EntityRef>,
    pub organism_cells: Vec<EntityRef>,
    pub viruses: Vec<EntityRef>,
    pub power_ups: Vec<EntityRef>,
}

impl QueryResult {
    pub fn get(&self, category: Category) -> &[EntityRef] {
        match category {
            Category::Food => &self.food,
            Category::OrganismCell => &self.organism_cells,
            Category::Virus => &self.viruses,
            Category::PowerUp => &self.power_ups,
        }
    }

    fn push(&mut self, entity: EntityRef) {
        match entity.category() {
            Category::Food => self.food.push(entity),
            Category::OrganismCell => self.organism_cells.push(entity),
            Category::Virus => self.viruses.push(entity),
            Category::PowerUp => self.power_ups.push(entity),
        }
    }

    pub fn len(&self) -> usize {
        self.food.len() + self.organism_cells.len() + self.viruses.len() + self.power_ups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Uniform grid spatial index
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    buckets: AHashMap<(i32, i32), Vec<u32>>,
    entries: Vec<EntityRef>,
    lookup: AHashMap<EntityKey, u32>,
    /// Largest inserted radius per category, widens the query sweep
    max_radius: [f32; 4],
}

impl SpatialIndex {
    /// Create an empty index with the given grid cell size
    pub fn new(cell_size: f32) -> Result<Self, IndexError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(IndexError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            buckets: AHashMap::new(),
            entries: Vec::new(),
            lookup: AHashMap::new(),
            max_radius: [0.0; 4],
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of indexed entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries (call at start of each tick before rebuilding)
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
        self.lookup.clear();
        self.max_radius = [0.0; 4];
    }

    fn grid_cell(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    /// Bucket an entity under the grid cell containing its centre
    pub fn insert(&mut self, entity: EntityRef) {
        if !is_finite_vec(entity.position) || !entity.radius.is_finite() {
            log::warn!(
                "SpatialIndex: skipping {:?} with non-finite position/radius",
                entity.key
            );
            return;
        }

        let index = self.entries.len() as u32;
        let cell = self.grid_cell(entity.position);
        let slot = entity.category().slot();
        self.max_radius[slot] = self.max_radius[slot].max(entity.radius.max(0.0));

        self.buckets
            .entry(cell)
            .or_insert_with(|| Vec::with_capacity(8))
            .push(index);
        self.lookup.insert(entity.key, index);
        self.entries.push(entity);
    }

    /// Find an entity inserted during the current rebuild
    pub fn locate(&self, key: EntityKey) -> Option<EntityRef> {
        self.lookup
            .get(&key)
            .and_then(|&i| self.entries.get(i as usize))
            .copied()
    }

    /// Iterate every indexed entity in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.entries.iter()
    }

    /// Visit every entity of the requested categories whose circle touches the
    /// query circle (`distance ≤ radius + entity.radius`)
    pub fn for_each_in_range(
        &self,
        center: Vec2,
        radius: f32,
        categories: CategoryMask,
        mut visitor: impl FnMut(&EntityRef),
    ) {
        if categories.is_empty() || !is_finite_vec(center) {
            return;
        }
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };

        let widest = Category::ALL
            .iter()
            .filter(|c| categories.contains(c.mask()))
            .map(|c| self.max_radius[c.slot()])
            .fold(0.0_f32, f32::max);
        let span = ((radius + widest) / self.cell_size).ceil() as i64 + 1;

        let mut check = |entity: &EntityRef| {
            if !categories.contains(entity.category().mask()) {
                return;
            }
            let reach = radius + entity.radius;
            if center.distance_squared(entity.position) <= reach * reach {
                visitor(entity);
            }
        };

        // A sweep wider than the populated grid is slower than a linear scan
        let side = span.saturating_mul(2).saturating_add(1);
        let swept_cells = side.saturating_mul(side);
        if swept_cells > self.buckets.len() as i64 * 2 + 16 {
            for entity in &self.entries {
                check(entity);
            }
            return;
        }

        let (cx, cy) = self.grid_cell(center);
        let span = span as i32;
        for dy in -span..=span {
            for dx in -span..=span {
                let cell = (cx.saturating_add(dx), cy.saturating_add(dy));
                if let Some(indices) = self.buckets.get(&cell) {
                    for &i in indices {
                        check(&self.entries[i as usize]);
                    }
                }
            }
        }
    }

    /// Range query returning matches grouped per category
    pub fn query(&self, center: Vec2, radius: f32, categories: CategoryMask) -> QueryResult {
        let mut result = QueryResult::default();
        self.for_each_in_range(center, radius, categories, |entity| result.push(*entity));
        result
    }
}
