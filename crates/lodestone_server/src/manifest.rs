use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lodestone_shared::connection::ConnectionContext;
use lodestone_shared::error::GeometryError;
use lodestone_shared::item::ItemComponents;
use lodestone_shared::material::{Material, MaterialTarget, RenderMethod};
use lodestone_shared::model::Model;
use lodestone_shared::nbt::{CompoundTag, Tag};
use lodestone_shared::permutation::{BlockProperty, Permutation};
use lodestone_shared::toggle::{Toggle, ToggleBlock};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::descriptor::{CustomBlock, CustomItem};
use crate::registry::{BlockRegistry, ItemRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("block '{identifier}': {source}")]
    Geometry {
        identifier: String,
        #[source]
        source: GeometryError,
    },
    #[error("failed to register '{identifier}': {source}")]
    Registry {
        identifier: String,
        #[source]
        source: RegistryError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TypeManifest {
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemSpec {
    pub identifier: String,
    pub type_id: i32,
    #[serde(flatten)]
    pub components: ItemComponents,
}

/// Box in model units; the block cell spans (-8, 0, -8)..=(8, 16, 8).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoxSpec {
    pub origin: [f32; 3],
    pub size: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockSpec {
    pub identifier: String,
    pub type_id: i32,
    pub texture: String,
    #[serde(default)]
    pub render_method: RenderMethod,
    #[serde(default)]
    pub geometry: Option<String>,
    #[serde(default)]
    pub collision: Option<BoxSpec>,
    #[serde(default)]
    pub selection: Option<BoxSpec>,
    #[serde(default = "default_collidable")]
    pub collidable: bool,
    #[serde(default)]
    pub light_emission: u8,
    #[serde(default)]
    pub toggle: bool,
}

fn default_collidable() -> bool {
    true
}

/// Counts of what [`TypeManifest::register_all`] registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    pub items: usize,
    pub blocks: usize,
}

impl TypeManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str::<Self>(contents)?)
    }

    /// Registers every listed type, stopping at the first failure. Types
    /// registered before the failure stay registered.
    pub fn register_all(
        &self,
        items: &ItemRegistry,
        blocks: &BlockRegistry,
    ) -> Result<RegistrationSummary, ManifestError> {
        let mut summary = RegistrationSummary::default();

        for spec in &self.items {
            items
                .register_item(&spec.identifier, Arc::new(ManifestItem::from_spec(spec)))
                .map_err(|source| ManifestError::Registry {
                    identifier: spec.identifier.clone(),
                    source,
                })?;
            summary.items += 1;
        }

        for spec in &self.blocks {
            let block = ManifestBlock::from_spec(spec).map_err(|source| ManifestError::Geometry {
                identifier: spec.identifier.clone(),
                source,
            })?;
            blocks
                .register_block(&spec.identifier, Arc::new(block))
                .map_err(|source| ManifestError::Registry {
                    identifier: spec.identifier.clone(),
                    source,
                })?;
            summary.blocks += 1;
        }

        info!(
            "manifest registered {} items and {} blocks",
            summary.items, summary.blocks
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone)]
pub struct ManifestItem {
    type_id: i32,
    components: ItemComponents,
}

impl ManifestItem {
    pub fn from_spec(spec: &ItemSpec) -> Self {
        Self {
            type_id: spec.type_id,
            components: spec.components.clone(),
        }
    }
}

impl CustomItem for ManifestItem {
    fn type_id(&self) -> i32 {
        self.type_id
    }

    fn components(&self, context: Option<&ConnectionContext>) -> CompoundTag {
        self.components.to_tree(context)
    }

    fn is_connection_dependent(&self) -> bool {
        self.components.resolution_variants
    }
}

#[derive(Debug, Clone)]
pub struct ManifestBlock {
    type_id: i32,
    texture: String,
    model: Model,
    light_emission: u8,
    toggle: Option<Toggle>,
}

impl ManifestBlock {
    pub fn from_spec(spec: &BlockSpec) -> Result<Self, GeometryError> {
        let material = Material::new(
            MaterialTarget::All,
            spec.texture.clone(),
            spec.render_method,
            true,
            true,
        );

        let custom_shape = spec.geometry.is_some()
            || spec.collision.is_some()
            || spec.selection.is_some()
            || !spec.collidable;
        let model = if custom_shape {
            let mut builder = Model::builder(vec![material]).collidable(spec.collidable);
            if let Some(geometry) = &spec.geometry {
                builder = builder.geometry(geometry.clone());
            }
            if let Some(collision) = spec.collision {
                builder = builder.collision(collision.origin.into(), collision.size.into());
            }
            if let Some(selection) = spec.selection {
                builder = builder.selection(selection.origin.into(), selection.size.into());
            }
            builder.build()?
        } else {
            Model::unit_cube(vec![material])
        };

        Ok(Self {
            type_id: spec.type_id,
            texture: spec.texture.clone(),
            model,
            light_emission: spec.light_emission.min(15),
            toggle: spec.toggle.then(Toggle::default),
        })
    }
}

impl ToggleBlock for ManifestBlock {
    fn base_texture(&self) -> &str {
        &self.texture
    }

    /// Toggled-off lights go dark.
    fn additional_components(&self, permutation: &mut Permutation, toggled: bool) {
        if self.light_emission == 0 {
            return;
        }
        let emission = if toggled { self.light_emission } else { 0 };
        permutation.add_component(
            "minecraft:light_emission",
            CompoundTag::new().with_tag("emission", Tag::Byte(emission as i8)),
        );
    }
}

impl CustomBlock for ManifestBlock {
    fn type_id(&self) -> i32 {
        self.type_id
    }

    fn model(&self) -> &Model {
        &self.model
    }

    fn light_emission(&self) -> u8 {
        self.light_emission
    }

    fn block_properties(&self) -> Vec<BlockProperty> {
        self.toggle
            .as_ref()
            .map(Toggle::declare_properties)
            .unwrap_or_default()
    }

    fn permutations(&self) -> Vec<Permutation> {
        self.toggle
            .as_ref()
            .map(|toggle| toggle.permutations_for(self))
            .unwrap_or_default()
    }

    fn toggle(&self) -> Option<&Toggle> {
        self.toggle.as_ref()
    }
}
