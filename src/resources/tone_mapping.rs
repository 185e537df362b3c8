//! Tone Mapping Modes
//!
//! Selection of the final nonlinear mapping from scene radiance to display
//! color. The tone-map pass is always the terminal pass of the chain.
//!
//! - [`Linear`](ToneMappingMode::Linear): No tone mapping (for debugging or LDR workflows)
//! - [`Neutral`](ToneMappingMode::Neutral): Balanced, film-like response
//! - [`Reinhard`](ToneMappingMode::Reinhard): Classic operator, soft highlight rolloff
//! - [`Cineon`](ToneMappingMode::Cineon): Film emulation with extended range
//! - [`ACESFilmic`](ToneMappingMode::ACESFilmic): Industry standard filmic curve (default)
//! - [`AgX`](ToneMappingMode::AgX): Modern filmic tonemapper with excellent color handling

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMappingMode {
    /// No tone mapping (linear passthrough)
    Linear,
    /// Neutral tone mapping (balanced, film-like)
    Neutral,
    /// Reinhard operator (classic, soft highlights)
    Reinhard,
    /// Cineon film emulation
    Cineon,
    /// ACES Filmic (industry standard)
    #[default]
    #[serde(rename = "aces_filmic")]
    ACESFilmic,
    /// `AgX` tonemapper
    #[serde(rename = "agx")]
    AgX,
}

impl ToneMappingMode {
    /// Index written into the `mode` field of the tone-map uniform block.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Linear => 0,
            Self::Neutral => 1,
            Self::Reinhard => 2,
            Self::Cineon => 3,
            Self::ACESFilmic => 4,
            Self::AgX => 5,
        }
    }

    /// Returns a human-readable name for the mode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Neutral => "Neutral",
            Self::Reinhard => "Reinhard",
            Self::Cineon => "Cineon",
            Self::ACESFilmic => "ACES Filmic",
            Self::AgX => "AgX",
        }
    }
}
