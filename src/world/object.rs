use crate::world::definitions::Definitions;
use crate::world::location::Location;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// A scenery object or a boundary (wall, door, fence) placed in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameObject {
    pub id: ObjectId,
    /// Definition id, looked up in the object or boundary table depending on
    /// `boundary`.
    pub definition: u32,
    pub direction: u8,
    pub boundary: bool,
    pub location: Location,
}

/// What an object contributes to the collision grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFootprint {
    Passable,
    Wall { min: Location, max: Location },
    Solid { min: Location, max: Location },
}

impl GameObject {
    pub fn name<'a>(&self, definitions: &'a Definitions) -> &'a str {
        let name = if self.boundary {
            definitions
                .boundary(self.definition)
                .map(|definition| definition.name.as_str())
        } else {
            definitions
                .object(self.definition)
                .map(|definition| definition.name.as_str())
        };
        name.unwrap_or("nil")
    }

    /// Width and height after rotation. Boundaries are always one tile.
    pub fn size(&self, definitions: &Definitions) -> (i32, i32) {
        if self.boundary {
            return (1, 1);
        }
        let Some(definition) = definitions.object(self.definition) else {
            return (1, 1);
        };
        if self.direction != 0 && self.direction != 4 {
            (definition.height, definition.width)
        } else {
            (definition.width, definition.height)
        }
    }

    /// Inclusive rectangle a player must be within reach of to interact with
    /// this object. Door-like objects (types 2 and 3) extend over their frame;
    /// boundaries extend onto the tile across the edge they sit on.
    pub fn boundaries(&self, definitions: &Definitions) -> (Location, Location) {
        let dir = self.direction;
        let mut min_x = self.location.x;
        let mut min_y = self.location.y;
        let mut max_x = min_x;
        let mut max_y = min_y;
        if !self.boundary {
            let (mut width, mut height) = self.size(definitions);
            let kind = definitions
                .object(self.definition)
                .map_or(0, |definition| definition.kind);
            if kind == 2 || kind == 3 {
                match dir {
                    0 => {
                        width += 1;
                        min_x -= 1;
                    }
                    2 => height += 1,
                    4 => width += 1,
                    6 => {
                        min_y -= 1;
                        height += 1;
                    }
                    _ => {}
                }
            }
            max_x = width + self.location.x - 1;
            max_y = height + self.location.y - 1;
        } else {
            match dir {
                0 => min_y -= 1,
                1 => min_x -= 1,
                2 | 3 => {
                    min_x -= 1;
                    min_y -= 1;
                    max_x += 1;
                    max_y += 1;
                }
                _ => {}
            }
        }
        (Location::new(min_x, min_y), Location::new(max_x, max_y))
    }

    pub fn footprint(&self, definitions: &Definitions) -> ObjectFootprint {
        if self.boundary {
            let solid = definitions
                .boundary(self.definition)
                .map_or(false, |definition| definition.solid);
            if !solid {
                return ObjectFootprint::Passable;
            }
            let (min, max) = self.boundaries(definitions);
            return ObjectFootprint::Wall { min, max };
        }
        let solid = definitions
            .object(self.definition)
            .map_or(false, |definition| definition.kind != 0);
        if !solid {
            return ObjectFootprint::Passable;
        }
        let (width, height) = self.size(definitions);
        ObjectFootprint::Solid {
            min: self.location,
            max: Location::new(
                self.location.x + width.max(1) - 1,
                self.location.y + height.max(1) - 1,
            ),
        }
    }

    pub fn contains(&self, definitions: &Definitions, tile: Location) -> bool {
        let (min, max) = self.boundaries(definitions);
        (min.x..=max.x).contains(&tile.x) && (min.y..=max.y).contains(&tile.y)
    }
}

impl fmt::Display for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.definition, self.location)
    }
}
