use crate::entities::mob::{NpcId, PlayerId};
use crate::world::ground_item::GroundItemId;
use crate::world::location::{Location, MAX_X, MAX_Y};
use crate::world::object::ObjectId;
use std::collections::BTreeSet;

pub const REGION_SIZE: i32 = 48;
pub const HORIZONTAL_REGIONS: usize = (MAX_X / REGION_SIZE + 1) as usize;
pub const VERTICAL_REGIONS: usize = (MAX_Y / REGION_SIZE + 1) as usize;
/// Dividing line through the middle of a region, used to pick which
/// neighbouring regions are close enough to matter.
const LOWER_BOUND: i32 = REGION_SIZE / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoord {
    pub x: usize,
    pub y: usize,
}

impl RegionCoord {
    pub fn for_location(location: Location) -> Option<Self> {
        Self::for_index(
            i64::from(location.x.div_euclid(REGION_SIZE)),
            i64::from(location.y.div_euclid(REGION_SIZE)),
        )
    }

    fn for_index(area_x: i64, area_y: i64) -> Option<Self> {
        let area_x = area_x.max(0) as usize;
        let area_y = area_y.max(0) as usize;
        if area_x >= HORIZONTAL_REGIONS || area_y >= VERTICAL_REGIONS {
            return None;
        }
        Some(Self { x: area_x, y: area_y })
    }
}

/// Anything that occupies a region membership set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    Player(PlayerId),
    Npc(NpcId),
    Object(ObjectId),
    Item(GroundItemId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub players: BTreeSet<PlayerId>,
    pub npcs: BTreeSet<NpcId>,
    pub objects: BTreeSet<ObjectId>,
    pub items: BTreeSet<GroundItemId>,
}

impl Region {
    pub fn contains(&self, member: Member) -> bool {
        match member {
            Member::Player(id) => self.players.contains(&id),
            Member::Npc(id) => self.npcs.contains(&id),
            Member::Object(id) => self.objects.contains(&id),
            Member::Item(id) => self.items.contains(&id),
        }
    }

    fn insert(&mut self, member: Member) -> bool {
        match member {
            Member::Player(id) => self.players.insert(id),
            Member::Npc(id) => self.npcs.insert(id),
            Member::Object(id) => self.objects.insert(id),
            Member::Item(id) => self.items.insert(id),
        }
    }

    fn remove(&mut self, member: Member) -> bool {
        match member {
            Member::Player(id) => self.players.remove(&id),
            Member::Npc(id) => self.npcs.remove(&id),
            Member::Object(id) => self.objects.remove(&id),
            Member::Item(id) => self.items.remove(&id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
            && self.npcs.is_empty()
            && self.objects.is_empty()
            && self.items.is_empty()
    }
}

/// Dense grid of lazily allocated regions covering the whole world. Owned
/// by the `World`; every mutation goes through `&mut self`, so membership
/// changes are serialized with the tick.
#[derive(Debug)]
pub struct RegionGrid {
    cells: Vec<Option<Box<Region>>>,
}

impl Default for RegionGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionGrid {
    pub fn new() -> Self {
        Self {
            cells: (0..HORIZONTAL_REGIONS * VERTICAL_REGIONS)
                .map(|_| None)
                .collect(),
        }
    }

    fn slot(coord: RegionCoord) -> usize {
        coord.x * VERTICAL_REGIONS + coord.y
    }

    pub fn get(&self, coord: RegionCoord) -> Option<&Region> {
        self.cells
            .get(Self::slot(coord))
            .and_then(|cell| cell.as_deref())
    }

    fn get_or_allocate(&mut self, coord: RegionCoord) -> &mut Region {
        let slot = Self::slot(coord);
        self.cells[slot].get_or_insert_with(Box::default)
    }

    pub fn region_at(&self, location: Location) -> Option<&Region> {
        RegionCoord::for_location(location).and_then(|coord| self.get(coord))
    }

    pub fn allocated_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn insert(&mut self, member: Member, location: Location) -> bool {
        match RegionCoord::for_location(location) {
            Some(coord) => self.get_or_allocate(coord).insert(member),
            None => false,
        }
    }

    pub fn remove(&mut self, member: Member, location: Location) -> bool {
        let Some(coord) = RegionCoord::for_location(location) else {
            return false;
        };
        let slot = Self::slot(coord);
        match self.cells[slot].as_deref_mut() {
            Some(region) => region.remove(member),
            None => false,
        }
    }

    /// Moves `member` between cells when `from` and `to` fall in different
    /// regions. Returns true if membership changed.
    pub fn relocate(&mut self, member: Member, from: Location, to: Location) -> bool {
        let old = RegionCoord::for_location(from);
        let new = RegionCoord::for_location(to);
        if old == new {
            return false;
        }
        self.remove(member, from);
        self.insert(member, to);
        true
    }

    /// The region containing `location` plus the three neighbours on the
    /// near side of each half of that region.
    pub fn surrounding(&self, location: Location) -> Vec<&Region> {
        surrounding_coords(location)
            .into_iter()
            .filter_map(|coord| self.get(coord))
            .collect()
    }

    /// Every region whose set holds `member`; used to verify the membership
    /// invariant.
    pub fn regions_containing(&self, member: Member) -> Vec<RegionCoord> {
        let mut found = Vec::new();
        for x in 0..HORIZONTAL_REGIONS {
            for y in 0..VERTICAL_REGIONS {
                let coord = RegionCoord { x, y };
                if self
                    .get(coord)
                    .map_or(false, |region| region.contains(member))
                {
                    found.push(coord);
                }
            }
        }
        found
    }
}

pub fn surrounding_coords(location: Location) -> Vec<RegionCoord> {
    let area_x = i64::from(location.x.div_euclid(REGION_SIZE));
    let area_y = i64::from(location.y.div_euclid(REGION_SIZE));
    let rel_x = location.x.rem_euclid(REGION_SIZE);
    let rel_y = location.y.rem_euclid(REGION_SIZE);
    let step_x = if rel_x <= LOWER_BOUND { -1 } else { 1 };
    let step_y = if rel_y <= LOWER_BOUND { -1 } else { 1 };
    let candidates = [
        (area_x, area_y),
        (area_x + step_x, area_y),
        (area_x + step_x, area_y + step_y),
        (area_x, area_y + step_y),
    ];
    let mut coords = Vec::with_capacity(4);
    for (x, y) in candidates {
        if let Some(coord) = RegionCoord::for_index(x, y) {
            if !coords.contains(&coord) {
                coords.push(coord);
            }
        }
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_dimensions_cover_world() {
        assert_eq!(HORIZONTAL_REGIONS, 20);
        assert_eq!(VERTICAL_REGIONS, 79);
        assert!(RegionCoord::for_location(Location::new(MAX_X, MAX_Y)).is_some());
        assert!(RegionCoord::for_location(Location::new(MAX_X + REGION_SIZE, 0)).is_none());
    }

    #[test]
    fn regions_are_allocated_lazily() {
        let mut grid = RegionGrid::new();
        assert_eq!(grid.allocated_count(), 0);
        grid.insert(Member::Player(PlayerId(1)), Location::new(100, 100));
        assert_eq!(grid.allocated_count(), 1);
        assert!(grid
            .region_at(Location::new(96, 96))
            .map_or(false, |region| region.players.contains(&PlayerId(1))));
    }

    #[test]
    fn relocate_only_changes_cell_on_boundary_crossing() {
        let mut grid = RegionGrid::new();
        let member = Member::Npc(NpcId(7));
        grid.insert(member, Location::new(47, 10));
        assert!(!grid.relocate(member, Location::new(47, 10), Location::new(46, 11)));
        assert!(grid.relocate(member, Location::new(46, 11), Location::new(48, 11)));
        assert_eq!(
            grid.regions_containing(member),
            vec![RegionCoord { x: 1, y: 0 }]
        );
    }

    #[test]
    fn remove_from_unallocated_region_is_noop() {
        let mut grid = RegionGrid::new();
        assert!(!grid.remove(Member::Item(GroundItemId(3)), Location::new(400, 400)));
        assert_eq!(grid.allocated_count(), 0);
    }

    #[test]
    fn surrounding_picks_near_side_neighbours() {
        let near_origin = surrounding_coords(Location::new(50, 50));
        assert_eq!(
            near_origin,
            vec![
                RegionCoord { x: 1, y: 1 },
                RegionCoord { x: 0, y: 1 },
                RegionCoord { x: 0, y: 0 },
                RegionCoord { x: 1, y: 0 },
            ]
        );
        let far_side = surrounding_coords(Location::new(90, 90));
        assert!(far_side.contains(&RegionCoord { x: 2, y: 2 }));
        let corner = surrounding_coords(Location::new(0, 0));
        assert_eq!(corner, vec![RegionCoord { x: 0, y: 0 }]);
    }
}
