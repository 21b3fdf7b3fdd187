//! Prompt composer: turns selections into the instruction sent to the model

use std::collections::HashMap;

use crate::prompt::options::{find_palette, Choice, SelectionSet};

pub const DEFAULT_STYLE: &str = "Default";
pub const DEFAULT_PALETTE: &str = "a balanced, natural color palette";
pub const DEFAULT_CLOTHING: &str = "Default";

pub const ASPECT_RATIO_DIRECTIVE: &str =
    "Frame the image as a vertical 9:16 portrait, full height, with no letterboxing.";
pub const IDENTITY_DIRECTIVE: &str = "Keep the person's face, skin tone, hair and body shape exactly as in the reference image so they remain instantly recognizable.";

/// System instruction for the text enhancement call
pub const ENHANCE_SYSTEM_INSTRUCTION: &str = "You are a creative director writing prompts for an image model. Expand the user's scene idea into one vivid paragraph describing setting, lighting, mood and composition. Respect the given style, palette and clothing focus. Reply with the paragraph only.";

/// Style labels whose wording is replaced before it reaches the model
#[derive(Debug, Clone)]
pub struct StyleDirectives {
    table: HashMap<String, String>,
}

impl StyleDirectives {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with(mut self, label: impl Into<String>, directive: impl Into<String>) -> Self {
        self.table.insert(label.into(), directive.into());
        self
    }

    /// Directive for a label, or the label itself when no entry exists
    pub fn apply<'a>(&'a self, label: &'a str) -> &'a str {
        self.table.get(label).map(String::as_str).unwrap_or(label)
    }
}

impl Default for StyleDirectives {
    fn default() -> Self {
        Self::empty().with(
            "Kawaii",
            "Kawaii-inspired pastel styling with photorealistic rendering",
        )
    }
}

/// Deterministic prompt builder
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    directives: StyleDirectives,
}

impl PromptComposer {
    pub fn new(directives: StyleDirectives) -> Self {
        Self { directives }
    }

    pub fn style_text<'a>(&'a self, selection: &'a SelectionSet) -> &'a str {
        match &selection.style {
            // custom text is taken literally
            Choice::Preset(label) => self.directives.apply(label),
            other => other.resolved().unwrap_or(DEFAULT_STYLE),
        }
    }

    pub fn palette_text<'a>(&self, selection: &'a SelectionSet) -> &'a str {
        match &selection.palette {
            Choice::Preset(name) => match find_palette(name) {
                Some(palette) => palette.description,
                None => name.as_str(),
            },
            other => other.resolved().unwrap_or(DEFAULT_PALETTE),
        }
    }

    pub fn clothing_text<'a>(&self, selection: &'a SelectionSet) -> &'a str {
        selection.clothing_focus.resolved().unwrap_or(DEFAULT_CLOTHING)
    }

    /// Compose the image-generation instruction
    pub fn compose(&self, selection: &SelectionSet) -> String {
        let mut prompt = format!(
            "Create a new scene featuring the person from the reference image. Style: {}. Color palette: {}. Clothing focus: {}.",
            self.style_text(selection),
            self.palette_text(selection),
            self.clothing_text(selection),
        );

        if let Some(scene) = selection.scene_text() {
            prompt.push_str(" Scene details: ");
            prompt.push_str(scene);
            if !scene.ends_with('.') {
                prompt.push('.');
            }
        }

        prompt.push(' ');
        prompt.push_str(ASPECT_RATIO_DIRECTIVE);
        prompt.push(' ');
        prompt.push_str(IDENTITY_DIRECTIVE);
        prompt
    }

    /// User message for the enhancement call
    pub fn enhancement_request(&self, selection: &SelectionSet, free_text: &str) -> String {
        let idea = free_text.trim();
        format!(
            "Style: {}\nColor palette: {}\nClothing focus: {}\nScene idea: {}",
            self.style_text(selection),
            self.palette_text(selection),
            self.clothing_text(selection),
            if idea.is_empty() { "(none, invent one that fits)" } else { idea },
        )
    }
}

/// Compose with the default directive table
pub fn compose(selection: &SelectionSet) -> String {
    PromptComposer::default().compose(selection)
}
