use serde::{Deserialize, Serialize};

/// Texture pack resolution a client asked for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureResolution {
    X16,
    X32,
    X64,
    X128,
}

impl TextureResolution {
    pub fn pixels(self) -> u16 {
        match self {
            TextureResolution::X16 => 16,
            TextureResolution::X32 => 32,
            TextureResolution::X64 => 64,
            TextureResolution::X128 => 128,
        }
    }
}

/// Connection-specific preferences that change what a client is sent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConnectionContext {
    pub texture_resolution: Option<TextureResolution>,
}

impl ConnectionContext {
    pub fn with_resolution(resolution: TextureResolution) -> Self {
        Self {
            texture_resolution: Some(resolution),
        }
    }

    /// Whether item entries must be rebuilt for this connection instead of
    /// reusing the shared table.
    pub fn wants_regeneration(&self) -> bool {
        self.texture_resolution.is_some()
    }
}
