use std::sync::{Arc, OnceLock};

use lodestone_shared::connection::ConnectionContext;
use lodestone_shared::protocol::{ClientboundPacket, Experiments, TypeEntry};
use lodestone_shared::schema::{validate, EntryLayout};
use tracing::{debug, info, warn};

use crate::registry::{BlockRegistry, ItemRegistry};
use crate::session::Connection;

/// Packets queued for the same set of connections.
#[derive(Clone, Debug)]
pub struct OutboundBatch {
    pub packets: Vec<ClientboundPacket>,
    pub targets: Vec<Connection>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub connection_id: u64,
    pub packet: ClientboundPacket,
}

pub struct PacketSynchronizer {
    items: Arc<ItemRegistry>,
    blocks: Arc<BlockRegistry>,
    item_table: OnceLock<Vec<TypeEntry>>,
    block_palette: OnceLock<Vec<TypeEntry>>,
    experiments: Experiments,
}

impl PacketSynchronizer {
    pub fn new(items: Arc<ItemRegistry>, blocks: Arc<BlockRegistry>) -> Self {
        Self {
            items,
            blocks,
            item_table: OnceLock::new(),
            block_palette: OnceLock::new(),
            experiments: Experiments::data_driven_items(),
        }
    }

    pub fn experiments(&self) -> &Experiments {
        &self.experiments
    }

    /// Snapshot of the item table taken on first use. Later registrations
    /// are not visible through it.
    pub fn cached_item_table(&self) -> &[TypeEntry] {
        self.item_table.get_or_init(|| {
            let entries = well_formed(self.items.table_entries(), EntryLayout::for_item);
            info!("cached {} custom item entries", entries.len());
            entries
        })
    }

    pub fn cached_block_palette(&self) -> &[TypeEntry] {
        self.block_palette.get_or_init(|| {
            let entries = well_formed(self.blocks.palette_entries(), |_| {
                EntryLayout::BlockPalette
            });
            info!("cached {} custom block palette entries", entries.len());
            entries
        })
    }

    /// Custom item entries as `context` should see them: the cached table
    /// with this connection's regenerated entries laid over it.
    pub fn item_entries_for(&self, context: &ConnectionContext) -> Vec<TypeEntry> {
        let cached = self.cached_item_table();
        if !context.wants_regeneration() {
            return cached.to_vec();
        }

        let mut overrides = self.items.regenerate_for(context);
        cached
            .iter()
            .filter_map(|entry| match overrides.remove(&entry.identifier) {
                Some(regenerated) => match validate(EntryLayout::ItemComponents, &regenerated) {
                    Ok(()) => Some(regenerated),
                    Err(err) => {
                        warn!(
                            "dropping entry {} for this connection: {err}",
                            entry.identifier
                        );
                        None
                    }
                },
                None => Some(entry.clone()),
            })
            .collect()
    }

    /// Applies the custom-type rewrites to one packet bound for `connection`.
    pub fn patch(&self, packet: &mut ClientboundPacket, connection: &Connection) {
        match packet {
            ClientboundPacket::ResourcePackStack(stack) => {
                stack.experiments = self.experiments.clone();
            }
            ClientboundPacket::StartGame(start) => {
                start.block_palette = self.cached_block_palette().to_vec();
                start.level_settings.experiments = self.experiments.clone();
            }
            ClientboundPacket::ItemRegistry(registry) => {
                registry.append_entries(self.item_entries_for(&connection.context));
            }
            ClientboundPacket::Text { .. } | ClientboundPacket::Raw { .. } => {}
        }
    }

    /// One delivery per target and packet, each patched for its target.
    pub fn dispatch(&self, batch: OutboundBatch) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(batch.packets.len() * batch.targets.len());
        for target in &batch.targets {
            for packet in &batch.packets {
                let mut packet = packet.clone();
                self.patch(&mut packet, target);
                debug!("queued {} for {} ({})", packet.name(), target.username, target.id);
                deliveries.push(Delivery {
                    connection_id: target.id,
                    packet,
                });
            }
        }
        deliveries
    }
}

fn well_formed(
    entries: Vec<TypeEntry>,
    layout: impl Fn(&TypeEntry) -> EntryLayout,
) -> Vec<TypeEntry> {
    entries
        .into_iter()
        .filter(|entry| match validate(layout(entry), entry) {
            Ok(()) => true,
            Err(err) => {
                warn!("dropping cached entry {}: {err}", entry.identifier);
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::IVec3;
    use lodestone_shared::connection::{ConnectionContext, TextureResolution};
    use lodestone_shared::nbt::{CompoundTag, Tag};
    use lodestone_shared::protocol::{
        encode, ClientboundPacket, ItemRegistryPacket, LevelSettings, PackStackEntry,
        ResourcePackStackPacket, StartGamePacket, TypeEntry, DATA_DRIVEN_ITEMS_EXPERIMENT,
        ITEM_VERSION_DATA_DRIVEN,
    };
    use lodestone_shared::schema::EntryLayout;
    use rayon::prelude::*;

    use super::{well_formed, OutboundBatch, PacketSynchronizer};
    use crate::registry::fixtures::{
        registries, BrokenVariantItem, MixedListVariantItem, TestBlock, TestItem,
    };
    use crate::session::Connection;

    fn synchronizer() -> PacketSynchronizer {
        let (items, blocks) = registries();
        items
            .register_item("lodestone:ruby", TestItem::new(9000, "ruby"))
            .expect("ruby");
        items
            .register_item("lodestone:crystal", TestItem::resolution_aware(9001, "crystal"))
            .expect("crystal");
        blocks
            .register_block("lodestone:lamp", TestBlock::toggleable(1001, "lamp"))
            .expect("lamp");
        PacketSynchronizer::new(items, blocks)
    }

    fn vanilla_stick() -> TypeEntry {
        TypeEntry {
            identifier: "minecraft:stick".into(),
            numeric_id: 320,
            component_based: false,
            version: ITEM_VERSION_DATA_DRIVEN,
            properties: CompoundTag::new(),
        }
    }

    fn start_game() -> ClientboundPacket {
        ClientboundPacket::StartGame(StartGamePacket {
            runtime_entity_id: 1,
            world_name: "world".into(),
            level_settings: LevelSettings {
                seed: 7,
                spawn_position: IVec3::new(0, 64, 0),
                experiments: Default::default(),
            },
            block_palette: Vec::new(),
        })
    }

    fn pack_stack() -> ClientboundPacket {
        ClientboundPacket::ResourcePackStack(ResourcePackStackPacket {
            must_accept: false,
            packs: vec![PackStackEntry {
                pack_id: "lodestone".into(),
                version: "1.0.0".into(),
                sub_pack_name: String::new(),
            }],
            base_game_version: "*".into(),
            experiments: Default::default(),
        })
    }

    fn item_registry() -> ClientboundPacket {
        ClientboundPacket::ItemRegistry(ItemRegistryPacket::new(vec![vanilla_stick()]))
    }

    fn icon(entry: &TypeEntry) -> Option<&Tag> {
        entry
            .properties
            .get_compound("components")?
            .get_compound("minecraft:icon")?
            .get_compound("textures")?
            .get("default")
    }

    fn entries_of(packet: &ClientboundPacket) -> &[TypeEntry] {
        match packet {
            ClientboundPacket::ItemRegistry(registry) => registry.entries(),
            other => panic!("expected item registry, got {}", other.name()),
        }
    }

    #[test]
    fn item_registry_differs_per_connection_but_ids_match() {
        let sync = synchronizer();
        let plain = Connection::new(1, "steve", ConnectionContext::default());
        let sharp = Connection::new(
            2,
            "alex",
            ConnectionContext::with_resolution(TextureResolution::X32),
        );
        let deliveries = sync.dispatch(OutboundBatch {
            packets: vec![item_registry()],
            targets: vec![plain, sharp],
        });
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].connection_id, 1);
        assert_eq!(deliveries[1].connection_id, 2);

        let plain = entries_of(&deliveries[0].packet);
        let sharp = entries_of(&deliveries[1].packet);
        assert_eq!(plain.len(), 4);
        assert_eq!(sharp.len(), 4);
        assert_eq!(plain[0], vanilla_stick());
        assert_eq!(sharp[0], vanilla_stick());

        for (a, b) in plain.iter().zip(sharp) {
            assert_eq!(a.identifier, b.identifier);
            assert_eq!(a.numeric_id, b.numeric_id);
        }

        let crystal = |entries: &[TypeEntry]| {
            entries
                .iter()
                .find(|entry| entry.identifier == "lodestone:crystal")
                .cloned()
                .expect("crystal entry")
        };
        assert_eq!(icon(&crystal(plain)), Some(&Tag::String("crystal".into())));
        assert_eq!(icon(&crystal(sharp)), Some(&Tag::String("crystal_32".into())));
        assert_eq!(plain[1], sharp[1]);
    }

    #[test]
    fn experiments_agree_across_both_messages() {
        let sync = synchronizer();
        let target = Connection::new(1, "steve", ConnectionContext::default());
        let deliveries = sync.dispatch(OutboundBatch {
            packets: vec![pack_stack(), start_game()],
            targets: vec![target],
        });

        let ClientboundPacket::ResourcePackStack(stack) = &deliveries[0].packet else {
            panic!("expected resource pack stack");
        };
        let ClientboundPacket::StartGame(start) = &deliveries[1].packet else {
            panic!("expected start game");
        };
        assert_eq!(stack.experiments, start.level_settings.experiments);
        assert!(stack.experiments.is_enabled(DATA_DRIVEN_ITEMS_EXPERIMENT));
        assert!(stack.experiments.previously_used);
        assert_eq!(stack.packs.len(), 1);
    }

    #[test]
    fn start_game_carries_the_cached_palette() {
        let sync = synchronizer();
        let target = Connection::new(1, "steve", ConnectionContext::default());
        let mut packet = start_game();
        if let ClientboundPacket::StartGame(start) = &mut packet {
            start.block_palette.push(vanilla_stick());
        }
        sync.patch(&mut packet, &target);

        let ClientboundPacket::StartGame(start) = packet else {
            panic!("expected start game");
        };
        let ids: Vec<&str> = start
            .block_palette
            .iter()
            .map(|entry| entry.identifier.as_str())
            .collect();
        assert_eq!(ids, ["lodestone:lamp"]);
        assert_eq!(start.world_name, "world");
    }

    #[test]
    fn caches_fill_once_and_ignore_later_registrations() {
        let (items, blocks) = registries();
        items
            .register_item("lodestone:ruby", TestItem::new(9000, "ruby"))
            .expect("ruby");
        blocks
            .register_block("lodestone:marble", TestBlock::cube(1001, "marble"))
            .expect("marble");
        let sync = PacketSynchronizer::new(Arc::clone(&items), Arc::clone(&blocks));

        let addresses: Vec<(usize, usize)> = (0..32)
            .into_par_iter()
            .map(|_| {
                (
                    sync.cached_item_table().as_ptr() as usize,
                    sync.cached_block_palette().as_ptr() as usize,
                )
            })
            .collect();
        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(sync.cached_item_table(), items.table_entries().as_slice());
        assert_eq!(sync.cached_block_palette(), blocks.palette_entries().as_slice());
        let item_table = items.table_entries();
        let palette = blocks.palette_entries();

        items
            .register_item("lodestone:opal", TestItem::new(9002, "opal"))
            .expect("opal");
        blocks
            .register_block("lodestone:granite", TestBlock::cube(1003, "granite"))
            .expect("granite");
        assert_eq!(sync.cached_item_table(), item_table.as_slice());
        assert_eq!(sync.cached_block_palette(), palette.as_slice());
        assert_eq!(items.len(), 4);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn unencodable_override_is_dropped_and_the_packet_still_encodes() {
        let (items, blocks) = registries();
        items
            .register_item("lodestone:ruby", TestItem::new(9000, "ruby"))
            .expect("ruby");
        items
            .register_item("lodestone:mixed", Arc::new(MixedListVariantItem))
            .expect("canonical tree encodes");
        let sync = PacketSynchronizer::new(items, blocks);

        let plain = Connection::new(1, "steve", ConnectionContext::default());
        let sharp = Connection::new(
            2,
            "alex",
            ConnectionContext::with_resolution(TextureResolution::X64),
        );
        let deliveries = sync.dispatch(OutboundBatch {
            packets: vec![item_registry()],
            targets: vec![plain, sharp],
        });

        let ids = |packet: &ClientboundPacket| -> Vec<String> {
            entries_of(packet)
                .iter()
                .map(|entry| entry.identifier.clone())
                .collect()
        };
        assert_eq!(
            ids(&deliveries[0].packet),
            ["minecraft:stick", "lodestone:ruby", "lodestone:mixed"]
        );
        assert_eq!(
            ids(&deliveries[1].packet),
            ["minecraft:stick", "lodestone:ruby"]
        );
        for delivery in &deliveries {
            encode(&delivery.packet).expect("every delivery encodes");
        }
    }

    #[test]
    fn unencodable_entries_are_filtered_from_caches() {
        let good = TypeEntry {
            identifier: "lodestone:ruby".into(),
            numeric_id: 9000,
            component_based: true,
            version: ITEM_VERSION_DATA_DRIVEN,
            properties: CompoundTag::new()
                .with_tag("components", CompoundTag::new())
                .with_tag("id", Tag::Int(9000))
                .with_tag("name", Tag::String("lodestone:ruby".into())),
        };
        let mut bad = good.clone();
        bad.identifier = "lodestone:mixed".into();
        bad.numeric_id = 9700;
        bad.properties = CompoundTag::new()
            .with_tag(
                "components",
                CompoundTag::new().with_tag("bad", Tag::List(vec![Tag::Int(1), Tag::Byte(1)])),
            )
            .with_tag("id", Tag::Int(9700))
            .with_tag("name", Tag::String("lodestone:mixed".into()));

        let kept = well_formed(vec![good.clone(), bad], EntryLayout::for_item);
        assert_eq!(kept, vec![good]);
    }

    #[test]
    fn malformed_override_is_dropped_for_that_connection() {
        let (items, blocks) = registries();
        items
            .register_item("lodestone:ruby", TestItem::new(9000, "ruby"))
            .expect("ruby");
        items
            .register_item("lodestone:broken", Arc::new(BrokenVariantItem))
            .expect("broken");
        let sync = PacketSynchronizer::new(items, blocks);

        let plain = sync.item_entries_for(&ConnectionContext::default());
        assert_eq!(plain.len(), 2);

        let sharp = sync.item_entries_for(&ConnectionContext::with_resolution(
            TextureResolution::X64,
        ));
        let ids: Vec<&str> = sharp.iter().map(|entry| entry.identifier.as_str()).collect();
        assert_eq!(ids, ["lodestone:ruby"]);
    }

    #[test]
    fn unrelated_packets_pass_through() {
        let sync = synchronizer();
        let target = Connection::new(1, "steve", ConnectionContext::default());
        let text = ClientboundPacket::Text {
            message: "hello".into(),
        };
        let raw = ClientboundPacket::Raw {
            packet_id: 0x3c,
            payload: vec![1, 2, 3],
        };
        let deliveries = sync.dispatch(OutboundBatch {
            packets: vec![text.clone(), raw.clone()],
            targets: vec![target],
        });
        assert_eq!(deliveries[0].packet, text);
        assert_eq!(deliveries[1].packet, raw);
    }

    #[test]
    fn no_targets_means_no_deliveries() {
        let sync = synchronizer();
        let deliveries = sync.dispatch(OutboundBatch {
            packets: vec![item_registry()],
            targets: Vec::new(),
        });
        assert!(deliveries.is_empty());
    }
}
