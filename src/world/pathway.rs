use crate::world::location::{axis_step, Location};
use serde::{Deserialize, Serialize};

/// A walk description: a starting tile plus waypoint offsets relative to it.
/// The mob first walks to the starting tile, then through each waypoint in
/// order. Waypoint sequences may differ in length; a missing offset reads as
/// zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathway {
    pub start_x: i32,
    pub start_y: i32,
    pub waypoints_x: Vec<i32>,
    pub waypoints_y: Vec<i32>,
    /// `None` until the starting tile has been reached.
    pub cursor: Option<usize>,
}

impl Pathway {
    pub fn new(start_x: i32, start_y: i32, waypoints_x: Vec<i32>, waypoints_y: Vec<i32>) -> Self {
        Self {
            start_x,
            start_y,
            waypoints_x,
            waypoints_y,
            cursor: None,
        }
    }

    /// A straight walk to `(x, y)` with no turns.
    pub fn to_coords(x: i32, y: i32) -> Self {
        Self::new(x, y, Vec::new(), Vec::new())
    }

    pub fn to_location(location: Location) -> Self {
        Self::to_coords(location.x, location.y)
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints_x.len().max(self.waypoints_y.len())
    }

    fn offset(waypoints: &[i32], index: Option<usize>) -> i32 {
        index
            .and_then(|index| waypoints.get(index))
            .copied()
            .unwrap_or(0)
    }

    pub fn waypoint(&self, index: Option<usize>) -> Location {
        Location::new(
            self.start_x.saturating_add(Self::offset(&self.waypoints_x, index)),
            self.start_y.saturating_add(Self::offset(&self.waypoints_y, index)),
        )
    }

    /// Whether the starting tile and every waypoint lie inside the world.
    pub fn within_world(&self) -> bool {
        self.starting_tile().within_world()
            && (0..self.waypoint_count()).all(|index| self.waypoint(Some(index)).within_world())
    }

    /// Tile currently being walked toward. Before departure, and for any
    /// out-of-range cursor, this is the starting tile.
    pub fn next_waypoint_tile(&self) -> Location {
        self.waypoint(self.cursor)
    }

    pub fn starting_tile(&self) -> Location {
        Location::new(self.start_x, self.start_y)
    }

    pub fn advance(&mut self) {
        self.cursor = Some(self.cursor.map_or(0, |cursor| cursor + 1));
    }

    pub fn is_finished(&self) -> bool {
        self.cursor
            .map_or(false, |cursor| cursor >= self.waypoint_count())
    }

    /// Prepends a waypoint, used when a detour must be walked first.
    pub fn add_first_waypoint(&mut self, x: i32, y: i32) -> &mut Self {
        self.waypoints_x.insert(0, x);
        self.waypoints_y.insert(0, y);
        self
    }

    /// One step from `current` toward the pending waypoint. Each axis moves
    /// independently, so the step may be diagonal. No collision is applied.
    pub fn next_tile_toward(&self, current: Location) -> Location {
        let dest = self.next_waypoint_tile();
        Location::new(
            current.x.saturating_add(axis_step(current.x, dest.x)),
            current.y.saturating_add(axis_step(current.y, dest.y)),
        )
    }
}
