use glam::IVec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::nbt::{network_bytes, CompoundTag};

pub const PROTOCOL_VERSION: u32 = 766;

/// Item entry version for data-driven (component based) items.
pub const ITEM_VERSION_DATA_DRIVEN: i32 = 1;
/// Item entry version for items with no client-side components, such as block items.
pub const ITEM_VERSION_NONE: i32 = 2;

pub const DATA_DRIVEN_ITEMS_EXPERIMENT: &str = "data_driven_items";

/// One item-table or block-palette entry as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub identifier: String,
    pub numeric_id: i32,
    pub component_based: bool,
    pub version: i32,
    #[serde(with = "network_bytes")]
    pub properties: CompoundTag,
}

/// Named experiment toggles; both the resource-pack stack and the world
/// start carry one and the client expects them to agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiments {
    pub entries: Vec<(String, bool)>,
    pub previously_used: bool,
}

impl Experiments {
    /// Custom blocks render as the "update" placeholder without this.
    pub fn data_driven_items() -> Self {
        Self {
            entries: vec![(DATA_DRIVEN_ITEMS_EXPERIMENT.to_string(), true)],
            previously_used: true,
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(entry, enabled)| entry == name && *enabled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRegistryPacket {
    entries: Vec<TypeEntry>,
}

impl ItemRegistryPacket {
    pub fn new(entries: Vec<TypeEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }

    /// Appends after whatever the packet already lists.
    pub fn append_entries(&mut self, entries: impl IntoIterator<Item = TypeEntry>) {
        self.entries.extend(entries);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSettings {
    pub seed: u64,
    pub spawn_position: IVec3,
    pub experiments: Experiments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGamePacket {
    pub runtime_entity_id: u64,
    pub world_name: String,
    pub level_settings: LevelSettings,
    pub block_palette: Vec<TypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackStackEntry {
    pub pack_id: String,
    pub version: String,
    pub sub_pack_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePackStackPacket {
    pub must_accept: bool,
    pub packs: Vec<PackStackEntry>,
    pub base_game_version: String,
    pub experiments: Experiments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientboundPacket {
    ResourcePackStack(ResourcePackStackPacket),
    StartGame(StartGamePacket),
    ItemRegistry(ItemRegistryPacket),
    Text { message: String },
    /// Already-serialized vanilla traffic passed through untouched.
    Raw { packet_id: u32, payload: Vec<u8> },
}

impl ClientboundPacket {
    pub fn name(&self) -> &'static str {
        match self {
            ClientboundPacket::ResourcePackStack(_) => "resource_pack_stack",
            ClientboundPacket::StartGame(_) => "start_game",
            ClientboundPacket::ItemRegistry(_) => "item_registry",
            ClientboundPacket::Text { .. } => "text",
            ClientboundPacket::Raw { .. } => "raw",
        }
    }
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(msg)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(data)
}
