use std::path::PathBuf;
use std::sync::Arc;

use glam::IVec3;
use lodestone_shared::connection::{ConnectionContext, TextureResolution};
use lodestone_shared::error::EncodingError;
use lodestone_shared::events::update_channel;
use lodestone_shared::nbt::CompoundTag;
use lodestone_shared::protocol::{
    self, ClientboundPacket, Experiments, ItemRegistryPacket, LevelSettings, PackStackEntry,
    ResourcePackStackPacket, StartGamePacket, TypeEntry, ITEM_VERSION_NONE, PROTOCOL_VERSION,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dictionary::{BlockItemIdMap, ItemTypeDictionary, TypeDictionary, VANILLA_ITEMS};
use crate::manifest::{ManifestError, TypeManifest};
use crate::registry::{BlockRegistry, EntryKind, EntrySource, ItemRegistry, RegistryError};
use crate::session::Connection;
use crate::sync::{Delivery, OutboundBatch, PacketSynchronizer};

/// Used when no `--manifest` is given.
pub const BUILTIN_MANIFEST: &str = r#"
[[items]]
identifier = "lodestone:ruby"
type_id = 9000
texture = "ruby"
display_name = "Ruby"

[[items]]
identifier = "lodestone:crystal_shard"
type_id = 9001
texture = "crystal_shard"
display_name = "Crystal Shard"
max_stack_size = 16
resolution_variants = true

[[blocks]]
identifier = "lodestone:marble"
type_id = 1001
texture = "marble"

[[blocks]]
identifier = "lodestone:lantern"
type_id = 1002
texture = "lantern"
render_method = "alpha_test"
geometry = "geometry.lodestone.lantern"
collision = { origin = [-3.0, 0.0, -3.0], size = [6.0, 9.0, 6.0] }
light_emission = 14
toggle = true
"#;

const WORLD_NAME: &str = "lodestone";
const BASE_GAME_VERSION: &str = "1.21.0";

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("failed to encode {packet} for connection {connection_id}: {source}")]
    Encode {
        packet: &'static str,
        connection_id: u64,
        #[source]
        source: bincode::Error,
    },
    #[error("block state rejected: {0}")]
    State(#[from] EncodingError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("type dictionary does not resolve '{0}' back to itself")]
    Unresolved(String),
}

/// Loads the manifest, registers its types and walks two clients through
/// the login sequence.
pub fn run(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Lodestone server (protocol {PROTOCOL_VERSION})");

    let manifest = match &config.manifest_path {
        Some(path) => {
            info!("Loading type manifest from {}", path.display());
            TypeManifest::load(path)?
        }
        None => TypeManifest::parse(BUILTIN_MANIFEST)?,
    };

    let dictionary = Arc::new(ItemTypeDictionary::with_vanilla(VANILLA_ITEMS));
    let items = Arc::new(ItemRegistry::new(
        Arc::clone(&dictionary) as Arc<dyn TypeDictionary>,
        Arc::new(BlockItemIdMap::new()),
    ));
    let blocks = Arc::new(BlockRegistry::new(Arc::clone(&items)));
    manifest.register_all(&items, &blocks)?;
    if items.is_empty() && blocks.is_empty() {
        warn!("Manifest declares no custom types");
    }
    resolve_registrations(&manifest, &items)?;
    info!("Type dictionary holds {} identifiers", dictionary.len());

    let synchronizer = PacketSynchronizer::new(Arc::clone(&items), Arc::clone(&blocks));
    let targets = vec![
        Connection::new(1, "steve", ConnectionContext::default()),
        Connection::new(
            2,
            "alex",
            ConnectionContext::with_resolution(TextureResolution::X32),
        ),
    ];
    for target in &targets {
        if target.context.wants_regeneration() {
            debug!(
                "{} gets {} connection-specific item entries",
                target.username,
                items.component_entries(Some(&target.context)).len()
            );
        }
    }
    let deliveries = synchronizer.dispatch(OutboundBatch {
        packets: login_packets(),
        targets,
    });

    let mut total_bytes = 0;
    for delivery in &deliveries {
        total_bytes += encode_delivery(delivery)?;
    }
    info!(
        "Delivered {} login packets ({total_bytes} bytes), {} custom items, {} custom blocks, \
         experiments {:?}",
        deliveries.len(),
        synchronizer.cached_item_table().len(),
        synchronizer.cached_block_palette().len(),
        synchronizer.experiments().entries
    );

    toggle_blocks(&manifest, &blocks)?;
    info!("{} custom blocks ready", blocks.len());
    Ok(())
}

/// Checks every manifest identifier against the dictionary in both
/// directions and against the item/block bridge.
fn resolve_registrations(
    manifest: &TypeManifest,
    items: &ItemRegistry,
) -> Result<(), ServerError> {
    let identifiers = manifest
        .items
        .iter()
        .map(|spec| &spec.identifier)
        .chain(manifest.blocks.iter().map(|spec| &spec.identifier));

    for identifier in identifiers {
        let entry = items.get(identifier)?;
        let numeric_id = items
            .dictionary()
            .numeric_id(identifier)
            .ok_or_else(|| ServerError::Unresolved(identifier.clone()))?;
        if items.dictionary().identifier(numeric_id).as_deref() != Some(identifier.as_str()) {
            return Err(ServerError::Unresolved(identifier.clone()));
        }

        let kind = match entry.kind {
            EntryKind::Item => "item",
            EntryKind::BlockItem => "block item",
        };
        match &entry.source {
            EntrySource::Item(item) => debug!(
                "{kind} {identifier} -> {numeric_id} (per connection: {})",
                item.is_connection_dependent()
            ),
            EntrySource::Block(block) => {
                let placed = items
                    .bridge()
                    .block_for_item(identifier)
                    .ok_or_else(|| ServerError::Unresolved(identifier.clone()))?;
                debug!(
                    "{kind} {identifier} -> {numeric_id} places {placed} (light {})",
                    block.light_emission()
                );
            }
        }
    }
    Ok(())
}

fn login_packets() -> Vec<ClientboundPacket> {
    let vanilla_items = VANILLA_ITEMS
        .iter()
        .map(|&(identifier, numeric_id)| TypeEntry {
            identifier: identifier.to_string(),
            numeric_id,
            component_based: false,
            version: ITEM_VERSION_NONE,
            properties: CompoundTag::new(),
        })
        .collect();

    vec![
        ClientboundPacket::ResourcePackStack(ResourcePackStackPacket {
            must_accept: false,
            packs: vec![PackStackEntry {
                pack_id: WORLD_NAME.to_string(),
                version: "1.0.0".to_string(),
                sub_pack_name: String::new(),
            }],
            base_game_version: BASE_GAME_VERSION.to_string(),
            experiments: Experiments::default(),
        }),
        ClientboundPacket::StartGame(StartGamePacket {
            runtime_entity_id: 1,
            world_name: WORLD_NAME.to_string(),
            level_settings: LevelSettings {
                seed: 0x10de_5701,
                spawn_position: IVec3::new(0, 64, 0),
                experiments: Experiments::default(),
            },
            block_palette: Vec::new(),
        }),
        ClientboundPacket::ItemRegistry(ItemRegistryPacket::new(vanilla_items)),
    ]
}

fn encode_delivery(delivery: &Delivery) -> Result<usize, ServerError> {
    let bytes = protocol::encode(&delivery.packet).map_err(|source| ServerError::Encode {
        packet: delivery.packet.name(),
        connection_id: delivery.connection_id,
        source,
    })?;
    debug!(
        "{} -> connection {}: {} bytes",
        delivery.packet.name(),
        delivery.connection_id,
        bytes.len()
    );
    Ok(bytes.len())
}

/// Flips every registered toggleable block on at a sample position, checks
/// the state the world is asked to store and rebuilds its palette entry.
fn toggle_blocks(manifest: &TypeManifest, blocks: &BlockRegistry) -> Result<(), ServerError> {
    let (world, updates) = update_channel();
    for (offset, spec) in manifest.blocks.iter().enumerate() {
        let block = blocks.get(&spec.identifier)?;
        let Some(declared) = block.toggle() else {
            continue;
        };
        let mut toggle = declared.clone();
        let position = IVec3::new(offset as i32, 64, 0);
        toggle.set_toggled(true, position, &world);

        for update in updates.drain() {
            let values = toggle.encoder().decode(&update.state)?;
            info!(
                "{} at {} is now {:?} (state {:#b})",
                spec.identifier,
                update.position,
                values,
                update.state.raw()
            );
        }

        let entry = blocks.regenerate(&spec.identifier)?;
        debug!(
            "rebuilt palette entry {} ({} top-level keys)",
            entry.identifier,
            entry.properties.len()
        );
    }
    Ok(())
}
