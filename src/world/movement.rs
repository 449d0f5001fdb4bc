use crate::entities::mob::{MobId, TRIED_REACH};
use crate::world::collision::{CollisionGrid, Side, CLIP_EAST, CLIP_NORTH, CLIP_SOUTH, CLIP_WEST};
use crate::world::location::{axis_step, Direction, Location};
use crate::world::object::GameObject;
use crate::world::state::World;

/// Attempts before a mob gives up trying to reach another mob.
pub const MAX_REACH_ATTEMPTS: i64 = 5;
/// Longest straight-line walk tried when checking whether a mob is reachable.
pub const REACH_WALK_STEPS: usize = 21;

/// Result of asking for one tile of progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(Location),
    Blocked,
}

/// What happened to a mob's path on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    Idle,
    Moved(Location),
    Finished,
    Aborted,
}

fn y_step_clear(grid: &CollisionGrid, x: i32, y: i32, dy: i32) -> bool {
    let exit = Side::toward_y(dy);
    !grid.is_blocked(x, y, exit, true) && !grid.is_blocked(x, y + dy, exit.opposite(), false)
}

fn x_step_clear(grid: &CollisionGrid, x: i32, y: i32, dx: i32) -> bool {
    let exit = Side::toward_x(dx);
    !grid.is_blocked(x, y, exit, true) && !grid.is_blocked(x + dx, y, exit.opposite(), false)
}

/// One tile of movement from `current` toward `destination`.
///
/// The y axis is tried first, then x from wherever the y step left the mob.
/// A diagonal step also needs the x-first corner open; otherwise the mob
/// settles for the y step alone. The tile finally entered is checked once
/// more from its own side, so a mob never ends up on a tile whose entry edge
/// blocks it.
pub fn resolve_step(grid: &CollisionGrid, current: Location, destination: Location) -> Step {
    let (x, y) = (current.x, current.y);
    let dx = axis_step(x, destination.x);
    let dy = axis_step(y, destination.y);
    let mut next = current;

    if dy != 0 && y_step_clear(grid, x, y, dy) {
        next.y += dy;
    }
    if dx != 0 && x_step_clear(grid, x, next.y, dx) {
        next.x += dx;
    }
    if next == current {
        return Step::Blocked;
    }
    if next.x != x && next.y != y && !(x_step_clear(grid, x, y, dx) && y_step_clear(grid, next.x, y, dy)) {
        next.x = x;
    }

    if next.x != x && grid.is_blocked(next.x, next.y, Side::toward_x(dx).opposite(), false) {
        return Step::Blocked;
    }
    if next.y != y && grid.is_blocked(next.x, next.y, Side::toward_y(dy).opposite(), false) {
        return Step::Blocked;
    }
    Step::Moved(next)
}

/// Whether a straight line from `from` to the adjacent `target` crosses no
/// wall and ends on an enterable tile.
pub fn next_to(grid: &CollisionGrid, from: Location, target: Location) -> bool {
    let dx = axis_step(from.x, target.x);
    let dy = axis_step(from.y, target.y);
    if dx != 0 {
        let exit = Side::toward_x(dx);
        if grid.is_blocked(from.x, from.y, exit, true)
            || grid.is_blocked(target.x, target.y, exit.opposite(), false)
        {
            return false;
        }
    }
    if dy != 0 {
        let exit = Side::toward_y(dy);
        if grid.is_blocked(from.x, from.y, exit, true)
            || grid.is_blocked(target.x, target.y, exit.opposite(), false)
        {
            return false;
        }
    }
    true
}

fn inside(tile: Location, bounds: (Location, Location)) -> bool {
    (bounds.0.x..=bounds.1.x).contains(&tile.x) && (bounds.0.y..=bounds.1.y).contains(&tile.y)
}

/// Whether `at` is inside `bounds` or orthogonally adjacent to it with no
/// wall on the facing edge of the neighbour.
pub fn can_reach_bounds(grid: &CollisionGrid, at: Location, bounds: (Location, Location)) -> bool {
    if inside(at, bounds) {
        return true;
    }
    [
        (-1, 0, CLIP_WEST),
        (1, 0, CLIP_EAST),
        (0, -1, CLIP_SOUTH),
        (0, 1, CLIP_NORTH),
    ]
    .into_iter()
    .any(|(dx, dy, facing)| {
        let tile = Location::new(at.x + dx, at.y + dy);
        inside(tile, bounds) && grid.mask(tile.x, tile.y) & facing == 0
    })
}

/// Diagonal counterpart of [`can_reach_bounds`]: both edges of the corner
/// tile facing `at` must be open.
pub fn can_reach_diagonal(grid: &CollisionGrid, at: Location, bounds: (Location, Location)) -> bool {
    [
        (-1, -1, CLIP_SOUTH | CLIP_WEST),
        (-1, 1, CLIP_NORTH | CLIP_WEST),
        (1, -1, CLIP_SOUTH | CLIP_EAST),
        (1, 1, CLIP_NORTH | CLIP_EAST),
    ]
    .into_iter()
    .any(|(dx, dy, facing)| {
        let tile = Location::new(at.x + dx, at.y + dy);
        inside(tile, bounds) && grid.mask(tile.x, tile.y) & facing == 0
    })
}

impl World {
    /// Advances a mob's path by at most one tile.
    pub fn traverse_path(&mut self, id: MobId) -> PathStep {
        let Some(mob) = self.mob_mut(id) else {
            return PathStep::Idle;
        };
        let current = mob.location;
        let Some(path) = mob.path.as_mut() else {
            return PathStep::Idle;
        };
        if current == path.next_waypoint_tile() {
            path.advance();
        }
        if path.is_finished() {
            mob.reset_path();
            return PathStep::Finished;
        }
        let destination = path.next_waypoint_tile();
        match resolve_step(&self.collision, current, destination) {
            Step::Blocked => {
                if let Some(mob) = self.mob_mut(id) {
                    mob.reset_path();
                }
                PathStep::Aborted
            }
            Step::Moved(next) => {
                self.set_location(id, next);
                if let Some(mob) = self.mob_mut(id) {
                    if let Some(direction) = Direction::from_delta(next.x - current.x, next.y - current.y) {
                        mob.direction = direction;
                    }
                }
                PathStep::Moved(next)
            }
        }
    }

    /// Whether a straight greedy walk from `id` reaches `target` without
    /// entering a blocked tile. Repeated failures are counted; after
    /// [`MAX_REACH_ATTEMPTS`] the mob's path is dropped and this reports
    /// false until a reach succeeds again.
    pub fn can_reach_mob(&mut self, id: MobId, target: Location) -> bool {
        let Some(mob) = self.mob_mut(id) else {
            return false;
        };
        if mob.transients.var_int(TRIED_REACH, 0) >= MAX_REACH_ATTEMPTS {
            mob.reset_path();
            return false;
        }
        mob.transients.inc_var(TRIED_REACH, 1);
        let transients = mob.transients.clone();
        let (mut x, mut y) = (mob.location.x, mob.location.y);

        for _ in 0..REACH_WALK_STEPS {
            if x == target.x && y == target.y {
                transients.unset_var(TRIED_REACH);
                return true;
            }
            if y != target.y {
                let dy = axis_step(y, target.y);
                y += dy;
                if self.collision.is_blocked(x, y, Side::toward_y(dy).opposite(), false) {
                    return false;
                }
            }
            if x != target.x {
                let dx = axis_step(x, target.x);
                x += dx;
                if self.collision.is_blocked(x, y, Side::toward_x(dx).opposite(), false) {
                    return false;
                }
            }
        }
        transients.unset_var(TRIED_REACH);
        x == target.x && y == target.y
    }

    /// Whether a player standing where it is can interact with `object`.
    pub fn at_object(&self, id: MobId, object: &GameObject) -> bool {
        let Some(mob) = self.mob(id) else {
            return false;
        };
        let at = mob.location;
        let bounds = object.boundaries(&self.definitions);
        let kind = self
            .definitions
            .object(object.definition)
            .filter(|_| !object.boundary)
            .map(|definition| definition.kind);
        if matches!(kind, Some(2) | Some(3)) {
            return (next_to(&self.collision, at, bounds.0) || next_to(&self.collision, at, bounds.1))
                && inside(at, bounds);
        }
        can_reach_bounds(&self.collision, at, bounds)
            || (mob.finished_path() && can_reach_diagonal(&self.collision, at, bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::attributes::AttributeStore;
    use crate::world::collision::{CLIP_FULL, CLIP_OCCUPIED};
    use crate::world::definitions::{Definitions, ObjectDefinition};
    use crate::world::pathway::Pathway;
    use crate::world::time::GameClock;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn world() -> World {
        let mut definitions = Definitions::default();
        definitions.insert_object(ObjectDefinition {
            id: 1,
            name: "Table".to_string(),
            commands: Vec::new(),
            kind: 1,
            width: 1,
            height: 1,
        });
        World::new(Arc::new(definitions), GameClock::default(), 1)
    }

    #[test]
    fn walks_a_diagonal_waypoint_then_finishes() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(10, 10), AttributeStore::new());
        let id = MobId::Player(handle.player);
        if let Some(mob) = world.mob_mut(id) {
            mob.set_path(Pathway::new(10, 10, vec![5], vec![5]));
        }
        for expected in 11..=15 {
            assert_eq!(
                world.traverse_path(id),
                PathStep::Moved(Location::new(expected, expected))
            );
        }
        assert_eq!(world.traverse_path(id), PathStep::Finished);
        assert!(world.mob(id).map_or(false, |mob| mob.path.is_none()));
        assert_eq!(world.traverse_path(id), PathStep::Idle);
    }

    #[test]
    fn empty_path_walks_to_its_origin() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(10, 10), AttributeStore::new());
        let id = MobId::Player(handle.player);
        if let Some(mob) = world.mob_mut(id) {
            mob.walk_to(Location::new(10, 13));
        }
        assert_eq!(world.traverse_path(id), PathStep::Moved(Location::new(10, 11)));
        assert_eq!(world.traverse_path(id), PathStep::Moved(Location::new(10, 12)));
        assert_eq!(world.traverse_path(id), PathStep::Moved(Location::new(10, 13)));
        assert_eq!(world.traverse_path(id), PathStep::Finished);
    }

    #[test]
    fn wall_aborts_the_path() {
        let mut world = world();
        world.collision.set_terrain(10, 11, CLIP_NORTH);
        let handle = world.connect_player("alice", Location::new(10, 10), AttributeStore::new());
        let id = MobId::Player(handle.player);
        if let Some(mob) = world.mob_mut(id) {
            mob.walk_to(Location::new(10, 14));
        }
        assert_eq!(world.traverse_path(id), PathStep::Aborted);
        assert_eq!(world.mob(id).map(|mob| mob.location), Some(Location::new(10, 10)));
    }

    #[test]
    fn blocked_corner_degrades_to_a_straight_step() {
        let mut grid = CollisionGrid::new();
        grid.set_terrain(11, 10, CLIP_FULL);
        assert_eq!(
            resolve_step(&grid, Location::new(10, 10), Location::new(12, 12)),
            Step::Moved(Location::new(10, 11))
        );
    }

    #[test]
    fn solid_object_blocks_departure_toward_it() {
        let mut world = world();
        world.add_object(1, 0, false, Location::new(10, 11));
        assert_eq!(
            resolve_step(&world.collision, Location::new(10, 10), Location::new(10, 12)),
            Step::Blocked
        );
    }

    #[test]
    fn next_to_respects_walls() {
        let mut grid = CollisionGrid::new();
        assert!(next_to(&grid, Location::new(5, 5), Location::new(6, 5)));
        grid.set_terrain(6, 5, CLIP_EAST);
        assert!(!next_to(&grid, Location::new(5, 5), Location::new(6, 5)));
        assert!(next_to(&grid, Location::new(5, 5), Location::new(5, 6)));
    }

    #[test]
    fn reach_checks_the_facing_edge() {
        let mut grid = CollisionGrid::new();
        let bounds = (Location::new(6, 5), Location::new(6, 5));
        assert!(can_reach_bounds(&grid, Location::new(7, 5), bounds));
        grid.set_terrain(6, 5, CLIP_WEST);
        assert!(!can_reach_bounds(&grid, Location::new(7, 5), bounds));
        assert!(can_reach_bounds(&grid, Location::new(6, 5), bounds));
        assert!(!can_reach_diagonal(&grid, Location::new(7, 6), bounds));
        let open = (Location::new(8, 8), Location::new(8, 8));
        assert!(can_reach_diagonal(&grid, Location::new(7, 7), open));
    }

    #[test]
    fn reach_attempts_are_capped() {
        let mut world = world();
        for x in 0..20 {
            world.collision.set_terrain(x, 12, CLIP_OCCUPIED);
        }
        let handle = world.connect_player("alice", Location::new(10, 10), AttributeStore::new());
        let id = MobId::Player(handle.player);
        let target = Location::new(10, 14);
        for _ in 0..MAX_REACH_ATTEMPTS {
            assert!(!world.can_reach_mob(id, target));
        }
        assert_eq!(handle.transients.var_int(TRIED_REACH, 0), MAX_REACH_ATTEMPTS);
        assert!(!world.can_reach_mob(id, target));
        for x in 0..20 {
            world.collision.set_terrain(x, 12, 0);
        }
        handle.transients.unset_var(TRIED_REACH);
        assert!(world.can_reach_mob(id, target));
        assert!(!handle.transients.snapshot().contains(TRIED_REACH));
    }

    fn mask_strategy() -> impl Strategy<Value = u8> {
        prop_oneof![
            4 => Just(0u8),
            1 => Just(CLIP_NORTH),
            1 => Just(CLIP_EAST),
            1 => Just(CLIP_SOUTH),
            1 => Just(CLIP_WEST),
            1 => Just(CLIP_FULL),
            1 => Just(CLIP_OCCUPIED),
        ]
    }

    proptest! {
        #[test]
        fn never_enters_a_tile_through_a_blocked_edge(
            masks in proptest::collection::vec(mask_strategy(), 25),
            dest_x in 0i32..5,
            dest_y in 0i32..5,
        ) {
            let mut grid = CollisionGrid::new();
            for (index, mask) in masks.iter().enumerate() {
                grid.set_terrain(100 + (index % 5) as i32, 100 + (index / 5) as i32, *mask);
            }
            let start = Location::new(102, 102);
            let destination = Location::new(100 + dest_x, 100 + dest_y);
            if let Step::Moved(next) = resolve_step(&grid, start, destination) {
                prop_assert!(next.longest_delta(start) == 1);
                if next.x != start.x {
                    let entry = Side::toward_x(next.x - start.x).opposite();
                    prop_assert!(!grid.is_blocked(next.x, next.y, entry, false));
                }
                if next.y != start.y {
                    let entry = Side::toward_y(next.y - start.y).opposite();
                    prop_assert!(!grid.is_blocked(next.x, next.y, entry, false));
                }
            }
        }
    }
}
