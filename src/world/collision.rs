use crate::world::location::{within_world, Location, MAX_X, MAX_Y};
use crate::world::object::{GameObject, ObjectFootprint};
use std::collections::HashMap;

pub const CLIP_NORTH: u8 = 0x01;
pub const CLIP_EAST: u8 = 0x02;
pub const CLIP_SOUTH: u8 = 0x04;
pub const CLIP_WEST: u8 = 0x08;
/// Tile cannot be stood on at all (water, diagonal walls, map scenery).
pub const CLIP_FULL: u8 = 0x10;
/// Tile is covered by a solid object footprint.
pub const CLIP_OCCUPIED: u8 = 0x20;

const WIDTH: usize = (MAX_X + 1) as usize;
const HEIGHT: usize = (MAX_Y + 1) as usize;

/// One edge of a tile. North is the -y edge and east the -x edge, matching
/// the world's westward-growing x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub fn bit(self) -> u8 {
        match self {
            Side::North => CLIP_NORTH,
            Side::East => CLIP_EAST,
            Side::South => CLIP_SOUTH,
            Side::West => CLIP_WEST,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::East => Side::West,
            Side::South => Side::North,
            Side::West => Side::East,
        }
    }

    /// Offset to the tile on the far side of this edge.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Side::North => (0, -1),
            Side::East => (-1, 0),
            Side::South => (0, 1),
            Side::West => (1, 0),
        }
    }

    /// Edge crossed when leaving a tile along the x axis by `dx`.
    pub fn toward_x(dx: i32) -> Side {
        if dx < 0 {
            Side::East
        } else {
            Side::West
        }
    }

    /// Edge crossed when leaving a tile along the y axis by `dy`.
    pub fn toward_y(dy: i32) -> Side {
        if dy < 0 {
            Side::North
        } else {
            Side::South
        }
    }
}

/// Reference counts for what dynamic objects contribute to one tile, so
/// overlapping placements can be removed independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ObjectClip {
    walls: [u16; 4],
    full: u16,
    occupied: u16,
}

impl ObjectClip {
    fn wall_slot(side: Side) -> usize {
        match side {
            Side::North => 0,
            Side::East => 1,
            Side::South => 2,
            Side::West => 3,
        }
    }

    fn mask(&self) -> u8 {
        let mut mask = 0;
        for side in [Side::North, Side::East, Side::South, Side::West] {
            if self.walls[Self::wall_slot(side)] > 0 {
                mask |= side.bit();
            }
        }
        if self.full > 0 {
            mask |= CLIP_FULL;
        }
        if self.occupied > 0 {
            mask |= CLIP_OCCUPIED;
        }
        mask
    }

    fn is_empty(&self) -> bool {
        self.mask() == 0
    }
}

/// Per-tile movement masks for the whole world: a dense array of static
/// terrain data plus sparse reference-counted contributions from objects.
#[derive(Debug)]
pub struct CollisionGrid {
    terrain: Vec<u8>,
    objects: HashMap<Location, ObjectClip>,
}

impl Default for CollisionGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionGrid {
    pub fn new() -> Self {
        Self {
            terrain: vec![0; WIDTH * HEIGHT],
            objects: HashMap::new(),
        }
    }

    fn slot(x: i32, y: i32) -> Option<usize> {
        if !within_world(x, y) {
            return None;
        }
        Some(y as usize * WIDTH + x as usize)
    }

    /// Sets the static terrain mask of a tile. Out-of-world tiles are ignored.
    pub fn set_terrain(&mut self, x: i32, y: i32, mask: u8) {
        if let Some(slot) = Self::slot(x, y) {
            self.terrain[slot] = mask;
        }
    }

    pub fn terrain(&self, x: i32, y: i32) -> u8 {
        Self::slot(x, y).map_or(CLIP_FULL, |slot| self.terrain[slot])
    }

    /// Combined terrain and object mask. Tiles outside the world read as
    /// fully blocked.
    pub fn mask(&self, x: i32, y: i32) -> u8 {
        let Some(slot) = Self::slot(x, y) else {
            return CLIP_FULL;
        };
        let dynamic = self
            .objects
            .get(&Location::new(x, y))
            .map_or(0, ObjectClip::mask);
        self.terrain[slot] | dynamic
    }

    /// Whether the `side` edge of tile `(x, y)` blocks movement.
    ///
    /// With `include_objects` the tile is being departed: the edge itself and
    /// a solid footprint on the neighbouring tile across it both count. Without
    /// it the tile is being entered: the edge and the tile's own full or
    /// occupied flags count.
    pub fn is_blocked(&self, x: i32, y: i32, side: Side, include_objects: bool) -> bool {
        let mask = self.mask(x, y);
        if mask & side.bit() != 0 {
            return true;
        }
        if include_objects {
            let (dx, dy) = side.delta();
            return self.mask(x + dx, y + dy) & (CLIP_FULL | CLIP_OCCUPIED) != 0;
        }
        mask & (CLIP_FULL | CLIP_OCCUPIED) != 0
    }

    pub fn add_object(&mut self, object: &GameObject, footprint: &ObjectFootprint) {
        self.apply(object, footprint, true);
    }

    pub fn remove_object(&mut self, object: &GameObject, footprint: &ObjectFootprint) {
        self.apply(object, footprint, false);
    }

    fn apply(&mut self, object: &GameObject, footprint: &ObjectFootprint, adding: bool) {
        let (x, y) = (object.location.x, object.location.y);
        match footprint {
            ObjectFootprint::Passable => {}
            ObjectFootprint::Wall { .. } => match object.direction {
                0 => {
                    self.adjust(Location::new(x, y), adding, |clip| {
                        &mut clip.walls[ObjectClip::wall_slot(Side::North)]
                    });
                    self.adjust(Location::new(x, y - 1), adding, |clip| {
                        &mut clip.walls[ObjectClip::wall_slot(Side::South)]
                    });
                }
                1 => {
                    self.adjust(Location::new(x, y), adding, |clip| {
                        &mut clip.walls[ObjectClip::wall_slot(Side::East)]
                    });
                    self.adjust(Location::new(x - 1, y), adding, |clip| {
                        &mut clip.walls[ObjectClip::wall_slot(Side::West)]
                    });
                }
                _ => {
                    self.adjust(Location::new(x, y), adding, |clip| &mut clip.full);
                }
            },
            ObjectFootprint::Solid { min, max } => {
                for tx in min.x..=max.x {
                    for ty in min.y..=max.y {
                        self.adjust(Location::new(tx, ty), adding, |clip| &mut clip.occupied);
                    }
                }
            }
        }
    }

    fn adjust(
        &mut self,
        tile: Location,
        adding: bool,
        counter: impl FnOnce(&mut ObjectClip) -> &mut u16,
    ) {
        if !tile.within_world() {
            return;
        }
        let entry = self.objects.entry(tile).or_default();
        let value = counter(&mut *entry);
        if adding {
            *value = value.saturating_add(1);
        } else {
            *value = value.saturating_sub(1);
        }
        if entry.is_empty() {
            self.objects.remove(&tile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::ObjectId;

    fn wall(direction: u8, x: i32, y: i32) -> GameObject {
        GameObject {
            id: ObjectId(1),
            definition: 1,
            direction,
            boundary: true,
            location: Location::new(x, y),
        }
    }

    #[test]
    fn out_of_world_is_blocked() {
        let grid = CollisionGrid::new();
        assert!(grid.is_blocked(-1, 0, Side::North, false));
        assert!(grid.is_blocked(0, 0, Side::North, true));
        assert!(!grid.is_blocked(5, 5, Side::North, true));
    }

    #[test]
    fn terrain_side_bits_block_only_their_side() {
        let mut grid = CollisionGrid::new();
        grid.set_terrain(10, 10, CLIP_NORTH);
        assert!(grid.is_blocked(10, 10, Side::North, false));
        assert!(!grid.is_blocked(10, 10, Side::South, false));
        grid.set_terrain(11, 10, CLIP_FULL);
        assert!(grid.is_blocked(11, 10, Side::South, false));
        assert!(grid.is_blocked(10, 10, Side::West, true));
        assert!(!grid.is_blocked(10, 10, Side::West, false));
    }

    #[test]
    fn boundary_wall_blocks_both_tiles_sharing_the_edge() {
        let mut grid = CollisionGrid::new();
        let object = wall(0, 20, 20);
        let footprint = ObjectFootprint::Wall {
            min: Location::new(20, 19),
            max: Location::new(20, 20),
        };
        grid.add_object(&object, &footprint);
        assert!(grid.is_blocked(20, 20, Side::North, true));
        assert!(grid.is_blocked(20, 19, Side::South, false));
        assert!(!grid.is_blocked(20, 20, Side::East, true));

        grid.remove_object(&object, &footprint);
        assert!(!grid.is_blocked(20, 20, Side::North, true));
        assert_eq!(grid.mask(20, 19), 0);
    }

    #[test]
    fn overlapping_solid_objects_are_reference_counted() {
        let mut grid = CollisionGrid::new();
        let object = GameObject {
            id: ObjectId(2),
            definition: 3,
            direction: 0,
            boundary: false,
            location: Location::new(30, 30),
        };
        let footprint = ObjectFootprint::Solid {
            min: Location::new(30, 30),
            max: Location::new(31, 30),
        };
        grid.add_object(&object, &footprint);
        grid.add_object(&object, &footprint);
        grid.remove_object(&object, &footprint);
        assert!(grid.is_blocked(31, 30, Side::North, false));
        grid.remove_object(&object, &footprint);
        assert!(!grid.is_blocked(31, 30, Side::North, false));
    }

    #[test]
    fn side_helpers_are_consistent() {
        for side in [Side::North, Side::East, Side::South, Side::West] {
            let (dx, dy) = side.delta();
            let toward = if dx != 0 {
                Side::toward_x(dx)
            } else {
                Side::toward_y(dy)
            };
            assert_eq!(toward, side);
            assert_eq!(side.opposite().opposite(), side);
        }
    }
}
