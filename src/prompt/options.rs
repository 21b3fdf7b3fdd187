//! Option store: predefined catalogs and the user's current selections

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A predefined color palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub name: &'static str,
    pub colors: &'static [&'static str],
    /// Natural-language rendering used in the composed prompt
    pub description: &'static str,
}

pub const STYLES: &[&str] = &[
    "Modern Studio",
    "Casual Aesthetic",
    "Editorial Framing",
    "Cinematic Glow",
    "Clayboard Tone",
    "Animated Dream",
    "Soft Light Studio",
    "Golden Harmony",
    "Cyberpunk Neon",
    "Kawaii",
];

pub const PALETTES: &[Palette] = &[
    Palette {
        name: "Ocean Mist",
        colors: &["#A1C4FD", "#C2E9FB", "#7FDBDA"],
        description: "cool ocean tones of soft periwinkle blue, pale sky blue and sea-glass teal",
    },
    Palette {
        name: "Warm Sands",
        colors: &["#E8C07D", "#F5D6BA", "#A47148"],
        description: "warm desert hues of golden sand, soft peach and toasted caramel brown",
    },
    Palette {
        name: "Vibrant Pop",
        colors: &["#E63946", "#F1FAEE", "#A8DADC", "#457B9D"],
        description: "bold contrasting colors of punchy red, off-white, powder blue and steel blue",
    },
    Palette {
        name: "Midnight Glow",
        colors: &["#1B263B", "#415A77", "#778DA9", "#E0E1DD"],
        description: "deep night shades of navy, slate blue and misty gray with pale moonlit highlights",
    },
];

pub const CLOTHING_FOCUS: &[&str] = &[
    "Full Scene Outfit",
    "Portrait Crop",
    "Seasonal Looks",
    "Evening Glam",
    "Business or Elegant",
    "Streetwear / Cozy",
    "Full Dress or Gown",
];

pub fn find_palette(name: &str) -> Option<&'static Palette> {
    PALETTES.iter().find(|p| p.name == name)
}

/// One wizard step's value: nothing yet, a catalog entry, or custom text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Choice {
    #[default]
    Unset,
    Preset(String),
    Custom(String),
}

impl Choice {
    pub fn preset(label: impl Into<String>) -> Self {
        Choice::Preset(label.into())
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Choice::Custom(text.into())
    }

    /// The chosen text; a custom choice with blank text counts as unset
    pub fn resolved(&self) -> Option<&str> {
        match self {
            Choice::Unset => None,
            Choice::Preset(label) => Some(label.as_str()),
            Choice::Custom(text) => {
                let text = text.trim();
                (!text.is_empty()).then_some(text)
            }
        }
    }

    pub fn is_set(&self) -> bool {
        self.resolved().is_some()
    }
}

/// Which wizard step a choice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Style,
    Palette,
    ClothingFocus,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Style => "style",
            Field::Palette => "palette",
            Field::ClothingFocus => "clothing_focus",
        }
    }

    fn allows(&self, label: &str) -> bool {
        match self {
            Field::Style => STYLES.contains(&label),
            Field::Palette => find_palette(label).is_some(),
            Field::ClothingFocus => CLOTHING_FOCUS.contains(&label),
        }
    }
}

/// The user's current selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    #[serde(default)]
    pub style: Choice,
    #[serde(default)]
    pub palette: Choice,
    #[serde(default)]
    pub clothing_focus: Choice,
    #[serde(default)]
    pub free_text_scene: String,
}

impl SelectionSet {
    pub fn choice(&self, field: Field) -> &Choice {
        match field {
            Field::Style => &self.style,
            Field::Palette => &self.palette,
            Field::ClothingFocus => &self.clothing_focus,
        }
    }

    /// Set a step's choice; preset labels must come from the catalog
    pub fn set(&mut self, field: Field, choice: Choice) -> Result<()> {
        if let Choice::Preset(label) = &choice {
            if !field.allows(label) {
                return Err(AppError::InvalidRequest(format!(
                    "'{}' is not a known {} option",
                    label,
                    field.as_str()
                )));
            }
        }

        match field {
            Field::Style => self.style = choice,
            Field::Palette => self.palette = choice,
            Field::ClothingFocus => self.clothing_focus = choice,
        }
        Ok(())
    }

    /// Mandatory steps that are still unset
    pub fn missing_fields(&self) -> Vec<Field> {
        [Field::Style, Field::Palette, Field::ClothingFocus]
            .into_iter()
            .filter(|f| !self.choice(*f).is_set())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn scene_text(&self) -> Option<&str> {
        let text = self.free_text_scene.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Apply a partial update, validating every field before changing any
    pub fn apply(&mut self, update: SelectionUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(style) = update.style {
            next.set(Field::Style, style)?;
        }
        if let Some(palette) = update.palette {
            next.set(Field::Palette, palette)?;
        }
        if let Some(clothing) = update.clothing_focus {
            next.set(Field::ClothingFocus, clothing)?;
        }
        if let Some(text) = update.free_text_scene {
            next.free_text_scene = text;
        }
        *self = next;
        Ok(())
    }
}

/// Partial change to a selection set; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionUpdate {
    pub style: Option<Choice>,
    pub palette: Option<Choice>,
    pub clothing_focus: Option<Choice>,
    pub free_text_scene: Option<String>,
}
