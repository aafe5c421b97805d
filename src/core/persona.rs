//! Persona records, display palettes, and the seeded persona catalog.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

pub const PALETTE_SIZE: usize = 8;

pub const DEFAULT_PALETTE: [&str; PALETTE_SIZE] = [
    "#0061cd", "#ff79c6", "#1e40af", "#60a5fa", "#fbbf24", "#e5e7eb", "#22d3ee", "#950056",
];

/// Portrait shown for personas without extracted artwork.
pub const PLACEHOLDER_ART: &str = "  .---.\n ( o o )\n  ) ~ (\n (_____)";

/// What each palette entry colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteSlot {
    User = 0,
    Assistant = 1,
    Accent = 2,
    Border = 3,
    System = 4,
    Clock = 5,
    Label = 6,
    Value = 7,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteError(String);

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid palette: {}", self.0)
    }
}

impl std::error::Error for PaletteError {}

/// Exactly eight `#rrggbb` colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [String; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.map(str::to_string),
        }
    }
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Result<Self, PaletteError> {
        let count = colors.len();
        let colors: [String; PALETTE_SIZE] = colors.try_into().map_err(|_| {
            PaletteError(format!("expected {PALETTE_SIZE} colors, found {count}"))
        })?;
        if let Some(bad) = colors
            .iter()
            .find(|color| crate::utils::color::parse_hex_color(color).is_none())
        {
            return Err(PaletteError(format!("'{bad}' is not a hex color")));
        }
        Ok(Self { colors })
    }

    /// Parses the JSON array form stored in the database.
    pub fn from_json(raw: &str) -> Result<Self, PaletteError> {
        let colors: Vec<String> =
            serde_json::from_str(raw).map_err(|err| PaletteError(err.to_string()))?;
        Self::new(colors)
    }

    pub fn to_json(&self) -> String {
        serde_json::Value::from(self.colors.to_vec()).to_string()
    }

    pub fn get(&self, slot: PaletteSlot) -> &str {
        &self.colors[slot as usize]
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub id: i64,
    pub name: String,
    pub system_prompt: String,
    pub provider_name: String,
    pub model_name: String,
    pub palette: Palette,
    pub ascii_art: String,
    /// Source image for manifested personas.
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created: DateTime<Utc>,
}

impl Persona {
    pub fn ascii_art_or_placeholder(&self) -> &str {
        if self.ascii_art.trim().is_empty() {
            PLACEHOLDER_ART
        } else {
            &self.ascii_art
        }
    }
}

/// Fields needed to register a persona.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPersona {
    pub name: String,
    pub system_prompt: String,
    pub provider_name: String,
    pub model_name: String,
    pub palette: Palette,
    pub ascii_art: String,
    pub image_url: Option<String>,
}

impl NewPersona {
    /// A persona summoned by `manifest_character`.
    pub fn manifested(
        name: &str,
        description: &str,
        image_url: &str,
        provider_name: &str,
        model_name: &str,
    ) -> Self {
        let system_prompt = format!(
            "You are {name}. {description}\n\n\
             Stay in character. Keep messages short and chat-style, and be helpful \
             with coding and technical questions."
        );
        Self {
            name: name.to_string(),
            system_prompt,
            provider_name: provider_name.to_string(),
            model_name: model_name.to_string(),
            palette: Palette::default(),
            ascii_art: PLACEHOLDER_ART.to_string(),
            image_url: Some(image_url.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedPersona {
    name: String,
    system_prompt: String,
    #[serde(default)]
    ascii_art: String,
}

#[derive(Debug, Deserialize)]
struct SeedCatalog {
    personas: Vec<SeedPersona>,
}

/// Personas inserted into an empty database, in order. The first one starts
/// active.
pub fn builtin_personas(provider_name: &str, model_name: &str) -> Vec<NewPersona> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_personas.toml");

    let catalog: SeedCatalog =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_personas.toml");

    catalog
        .personas
        .into_iter()
        .map(|seed| NewPersona {
            name: seed.name,
            system_prompt: seed.system_prompt,
            provider_name: provider_name.to_string(),
            model_name: model_name.to_string(),
            palette: Palette::default(),
            ascii_art: seed.ascii_art,
            image_url: None,
        })
        .collect()
}
