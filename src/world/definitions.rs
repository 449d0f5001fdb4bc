use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Item every mob leaves behind on death (bones).
pub const DEFAULT_DROP: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub commands: Vec<String>,
    /// 0 passable, 1 solid, 2 and 3 door-like.
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default = "one")]
    pub width: i32,
    #[serde(default = "one")]
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryDefinition {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub solid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub base_price: u32,
    #[serde(default)]
    pub stackable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcDefinition {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub attackable: bool,
    #[serde(default = "one")]
    pub attack: i32,
    #[serde(default = "one")]
    pub defense: i32,
    #[serde(default = "one")]
    pub strength: i32,
    #[serde(default = "one")]
    pub hits: i32,
    #[serde(default = "default_respawn_ticks")]
    pub respawn_ticks: u64,
}

fn one() -> i32 {
    1
}

fn default_respawn_ticks() -> u64 {
    50
}

#[derive(Debug, Default, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    objects: Vec<ObjectDefinition>,
    #[serde(default)]
    boundaries: Vec<BoundaryDefinition>,
    #[serde(default)]
    items: Vec<ItemDefinition>,
    #[serde(default)]
    npcs: Vec<NpcDefinition>,
}

/// Immutable lookup tables, loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    objects: BTreeMap<u32, ObjectDefinition>,
    boundaries: BTreeMap<u32, BoundaryDefinition>,
    items: BTreeMap<u32, ItemDefinition>,
    npcs: BTreeMap<u32, NpcDefinition>,
}

impl Definitions {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = read(path)?;
        Self::from_yaml(&text).map_err(|err| err.with_path(path))
    }

    pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
        let file: DefinitionsFile =
            serde_yaml::from_str(text).map_err(|err| LoadError::Parse {
                path: None,
                message: err.to_string(),
            })?;
        let mut definitions = Self::default();
        for definition in file.objects {
            let id = definition.id;
            if definitions.insert_object(definition).is_some() {
                return Err(LoadError::Duplicate { table: "objects", id });
            }
        }
        for definition in file.boundaries {
            let id = definition.id;
            if definitions.insert_boundary(definition).is_some() {
                return Err(LoadError::Duplicate { table: "boundaries", id });
            }
        }
        for definition in file.items {
            let id = definition.id;
            if definitions.insert_item(definition).is_some() {
                return Err(LoadError::Duplicate { table: "items", id });
            }
        }
        for definition in file.npcs {
            let id = definition.id;
            if definitions.insert_npc(definition).is_some() {
                return Err(LoadError::Duplicate { table: "npcs", id });
            }
        }
        Ok(definitions)
    }

    pub fn insert_object(&mut self, definition: ObjectDefinition) -> Option<ObjectDefinition> {
        self.objects.insert(definition.id, definition)
    }

    pub fn insert_boundary(
        &mut self,
        definition: BoundaryDefinition,
    ) -> Option<BoundaryDefinition> {
        self.boundaries.insert(definition.id, definition)
    }

    pub fn insert_item(&mut self, definition: ItemDefinition) -> Option<ItemDefinition> {
        self.items.insert(definition.id, definition)
    }

    pub fn insert_npc(&mut self, definition: NpcDefinition) -> Option<NpcDefinition> {
        self.npcs.insert(definition.id, definition)
    }

    pub fn object(&self, id: u32) -> Option<&ObjectDefinition> {
        self.objects.get(&id)
    }

    pub fn boundary(&self, id: u32) -> Option<&BoundaryDefinition> {
        self.boundaries.get(&id)
    }

    pub fn item(&self, id: u32) -> Option<&ItemDefinition> {
        self.items.get(&id)
    }

    pub fn npc(&self, id: u32) -> Option<&NpcDefinition> {
        self.npcs.get(&id)
    }

    pub fn item_price(&self, id: u32) -> u32 {
        self.item(id).map_or(0, |item| item.base_price)
    }

    pub fn item_stackable(&self, id: u32) -> bool {
        self.item(id).map_or(false, |item| item.stackable)
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.objects.len(),
            self.boundaries.len(),
            self.items.len(),
            self.npcs.len(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPlacement {
    pub id: u32,
    #[serde(default)]
    pub direction: u8,
    #[serde(default)]
    pub boundary: bool,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcSpawn {
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMask {
    pub x: i32,
    pub y: i32,
    pub mask: u8,
}

/// Persisted world layout used to seed a fresh world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub tiles: Vec<TileMask>,
    #[serde(default)]
    pub objects: Vec<ObjectPlacement>,
    #[serde(default)]
    pub npcs: Vec<NpcSpawn>,
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = read(path)?;
        Self::from_yaml(&text).map_err(|err| err.with_path(path))
    }

    pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
        let layout: Layout = serde_yaml::from_str(text).map_err(|err| LoadError::Parse {
            path: None,
            message: err.to_string(),
        })?;
        let out_of_world = layout
            .tiles
            .iter()
            .map(|tile| (tile.x, tile.y))
            .chain(layout.objects.iter().map(|object| (object.x, object.y)))
            .chain(layout.npcs.iter().map(|npc| (npc.x, npc.y)))
            .find(|(x, y)| !crate::world::location::within_world(*x, *y));
        if let Some((x, y)) = out_of_world {
            return Err(LoadError::OutOfWorld { x, y });
        }
        Ok(layout)
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|err| LoadError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Io { path: PathBuf, message: String },
    Parse { path: Option<PathBuf>, message: String },
    Duplicate { table: &'static str, id: u32 },
    OutOfWorld { x: i32, y: i32 },
}

impl LoadError {
    fn with_path(self, path: &Path) -> Self {
        match self {
            LoadError::Parse { path: None, message } => LoadError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
            LoadError::Parse {
                path: Some(path),
                message,
            } => write!(f, "failed to parse {}: {}", path.display(), message),
            LoadError::Parse {
                path: None,
                message,
            } => write!(f, "parse error: {}", message),
            LoadError::Duplicate { table, id } => {
                write!(f, "duplicate id {} in {} table", id, table)
            }
            LoadError::OutOfWorld { x, y } => {
                write!(f, "placement at ({}, {}) is outside the world", x, y)
            }
        }
    }
}

impl std::error::Error for LoadError {}
