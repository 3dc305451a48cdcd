//! World snapshot payload pushed by the game client.
//!
//! A snapshot is the **only** view the agent has of the world. Field names
//! follow the client's wire format (`camelCase`, with a few legacy names
//! such as `nearbyNpcs` and `bank`); the Rust names describe what the data
//! means to the agent.
//!
//! Option lists on actors and objects keep their positions: the client
//! addresses options by 1-based index, so a `null` entry is read as an
//! empty string rather than dropped.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// A world-grid position on a single vertical level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// East-west coordinate.
    pub x: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl Tile {
    /// Create a tile from its two coordinates.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Euclidean distance to another tile, in tiles.
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dz = f64::from(self.z) - f64::from(other.z);
        dx.hypot(dz)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

// ---------------------------------------------------------------------------
// WorldSnapshot
// ---------------------------------------------------------------------------

/// Complete world state as reported by the client for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldSnapshot {
    /// Monotonic, non-decreasing tick counter assigned by the client.
    #[serde(default)]
    pub tick: u64,
    /// Whether the avatar is logged in and present in the world.
    #[serde(rename = "inGame", default)]
    #[serde(alias = "inWorld")]
    pub in_world: bool,
    /// Client session state code (used only for the waiting message).
    #[serde(rename = "gameState", default)]
    pub game_state: Option<i32>,
    /// Vertical level reported at the top level of the snapshot.
    #[serde(rename = "currentPlane", default)]
    pub current_plane: Option<i32>,
    /// World (server) number the client is connected to.
    #[serde(rename = "currentWorld", default)]
    pub current_world: Option<i32>,
    /// Account display name.
    #[serde(rename = "accountName", default)]
    pub account_name: Option<String>,
    /// The avatar itself, absent while loading.
    #[serde(default)]
    pub player: Option<PlayerState>,
    /// Skill table.
    #[serde(default)]
    pub skills: Vec<SkillState>,
    /// Carried items.
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    /// Actors (non-player characters and gathering spots) within view.
    #[serde(rename = "nearbyNpcs", default)]
    pub nearby_actors: Vec<NearbyActor>,
    /// Static world objects within view.
    #[serde(rename = "nearbyLocs", default)]
    pub nearby_objects: Vec<NearbyObject>,
    /// Modal prompt, if one is showing.
    #[serde(default)]
    pub dialog: Option<DialogState>,
    /// Deposit container interface, if the client reports one.
    #[serde(rename = "bank", default)]
    pub container: Option<ContainerState>,
}

impl WorldSnapshot {
    /// Avatar position. Reads as the origin while the avatar is absent.
    pub fn position(&self) -> Tile {
        self.player
            .as_ref()
            .map_or(Tile::new(0, 0), |p| Tile::new(p.world_x, p.world_z))
    }

    /// Current vertical level, preferring the top-level field.
    pub fn vertical_level(&self) -> i32 {
        self.current_plane
            .or_else(|| self.player.as_ref().and_then(|p| p.level))
            .unwrap_or(0)
    }

    /// Animation code the avatar is playing, `-1` when idle or absent.
    pub fn animation_code(&self) -> i32 {
        self.player.as_ref().map_or(-1, |p| p.animation)
    }

    /// Whether the deposit container interface is open.
    pub fn container_open(&self) -> bool {
        self.container.as_ref().is_some_and(|c| c.open)
    }

    /// Whether a modal prompt is showing.
    pub fn dialog_open(&self) -> bool {
        self.dialog.as_ref().is_some_and(|d| d.open)
    }

    /// Number of occupied inventory slots.
    pub fn occupied_slots(&self) -> usize {
        self.inventory.len()
    }

    /// Look up a skill by case-insensitive name.
    pub fn skill(&self, name: &str) -> Option<&SkillState> {
        self.skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Item in the given inventory slot, if any.
    pub fn item_in_slot(&self, slot: u32) -> Option<&InventoryItem> {
        self.inventory.iter().find(|i| i.slot == slot)
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// The avatar's own position and animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerState {
    /// Avatar display name.
    #[serde(default)]
    pub name: Option<String>,
    /// East-west world coordinate.
    #[serde(rename = "worldX")]
    pub world_x: i32,
    /// North-south world coordinate.
    #[serde(rename = "worldZ")]
    pub world_z: i32,
    /// Vertical level as carried on the player record.
    #[serde(default)]
    pub level: Option<i32>,
    /// Current animation code, `-1` when idle.
    #[serde(default = "idle_animation")]
    #[serde(alias = "animId")]
    pub animation: i32,
}

const fn idle_animation() -> i32 {
    -1
}

/// One row of the skill table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillState {
    /// Skill name, e.g. `Fishing`.
    pub name: String,
    /// Current (possibly boosted) level.
    #[serde(default)]
    pub level: u32,
    /// Unboosted level.
    #[serde(rename = "baseLevel", default)]
    pub base_level: u32,
    /// Accumulated experience points.
    #[serde(default)]
    pub experience: u64,
}

/// An item stack in a specific inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventoryItem {
    /// Zero-based inventory slot.
    pub slot: u32,
    /// Item type identifier.
    pub id: i32,
    /// Item display name.
    #[serde(default)]
    pub name: String,
    /// Stack size.
    #[serde(default = "single")]
    pub count: u32,
}

const fn single() -> u32 {
    1
}

/// An actor within view, including gathering spots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyActor {
    /// Client-side index used to address the actor in commands.
    pub index: i32,
    /// Actor type identifier.
    #[serde(default)]
    pub id: i32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// East-west coordinate.
    pub x: i32,
    /// North-south coordinate.
    pub z: i32,
    /// Distance from the avatar in tiles, as computed by the client.
    #[serde(default)]
    pub distance: i32,
    /// Interaction options, addressed by 1-based position.
    #[serde(default)]
    #[serde(deserialize_with = "positional_options")]
    #[ts(type = "Array<string>")]
    pub options: Vec<String>,
}

impl NearbyActor {
    /// Tile the actor stands on.
    pub const fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }
}

/// A static world object within view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyObject {
    /// Object type identifier.
    pub id: i32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// East-west coordinate.
    pub x: i32,
    /// North-south coordinate.
    pub z: i32,
    /// Distance from the avatar in tiles.
    #[serde(default)]
    pub distance: i32,
    /// Interaction options, addressed by 1-based position.
    #[serde(default)]
    #[serde(deserialize_with = "positional_options")]
    #[ts(type = "Array<string>")]
    pub options: Vec<String>,
}

impl NearbyObject {
    /// Tile the object occupies.
    pub const fn tile(&self) -> Tile {
        Tile::new(self.x, self.z)
    }
}

/// A modal prompt that blocks other input until answered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DialogState {
    /// Whether the prompt is showing.
    #[serde(rename = "isOpen", default)]
    pub open: bool,
    /// Selectable choices.
    #[serde(default)]
    pub options: Vec<DialogOption>,
}

/// One selectable choice in a modal prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DialogOption {
    /// Option index as reported by the client.
    pub index: u32,
    /// Choice text.
    #[serde(default)]
    pub text: String,
    /// Raw interface handle, when the client exposes one.
    #[serde(rename = "componentId", default)]
    pub handle: Option<i32>,
}

/// The deposit container interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ContainerState {
    /// Whether the interface is open.
    #[serde(rename = "isOpen", default)]
    pub open: bool,
    /// Items currently stored.
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

/// Read an option list whose `null` entries must keep their slot.
fn positional_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}
