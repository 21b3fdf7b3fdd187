//! Unit tests for the option store and prompt composer

use scene_studio::prompt::composer::{
    ASPECT_RATIO_DIRECTIVE, DEFAULT_CLOTHING, DEFAULT_PALETTE, DEFAULT_STYLE, IDENTITY_DIRECTIVE,
};
use scene_studio::prompt::options::{Field, CLOTHING_FOCUS, PALETTES, STYLES};
use scene_studio::prompt::{compose, Choice, PromptComposer, SelectionSet};

const PHOTOREAL: &str = "photorealistic rendering";

fn selection(style: Choice, palette: Choice, clothing: Choice) -> SelectionSet {
    SelectionSet {
        style,
        palette,
        clothing_focus: clothing,
        free_text_scene: String::new(),
    }
}

#[test]
fn test_set_fields_never_show_placeholders() {
    for style in STYLES {
        for palette in PALETTES {
            for clothing in CLOTHING_FOCUS {
                let prompt = compose(&selection(
                    Choice::preset(*style),
                    Choice::preset(palette.name),
                    Choice::preset(*clothing),
                ));

                assert!(!prompt.contains(DEFAULT_STYLE), "{}", prompt);
                assert!(!prompt.contains(DEFAULT_PALETTE), "{}", prompt);
                assert!(!prompt.contains(DEFAULT_CLOTHING), "{}", prompt);
            }
        }
    }
}

#[test]
fn test_custom_text_replaces_placeholder() {
    let prompt = compose(&selection(
        Choice::custom("Watercolor sketch"),
        Choice::custom("sepia and rust"),
        Choice::custom("Hiking gear"),
    ));

    assert!(prompt.contains("Style: Watercolor sketch."));
    assert!(prompt.contains("Color palette: sepia and rust."));
    assert!(prompt.contains("Clothing focus: Hiking gear."));
    assert!(!prompt.contains(DEFAULT_PALETTE));
}

#[test]
fn test_only_unset_field_uses_placeholder() {
    let prompt = compose(&selection(
        Choice::preset("Modern Studio"),
        Choice::custom("   "),
        Choice::preset("Portrait Crop"),
    ));

    assert!(prompt.contains(DEFAULT_PALETTE));
    assert!(prompt.contains("Style: Modern Studio."));
}

#[test]
fn test_palette_uses_description() {
    let prompt = compose(&selection(
        Choice::preset("Cinematic Glow"),
        Choice::preset("Ocean Mist"),
        Choice::preset("Evening Glam"),
    ));

    let ocean = PALETTES.iter().find(|p| p.name == "Ocean Mist").unwrap();
    assert!(prompt.contains(ocean.description));
}

#[test]
fn test_kawaii_and_only_kawaii_gets_photorealism() {
    for style in STYLES {
        let prompt = compose(&selection(
            Choice::preset(*style),
            Choice::preset("Warm Sands"),
            Choice::preset("Seasonal Looks"),
        ));

        if *style == "Kawaii" {
            assert!(prompt.contains(PHOTOREAL));
            assert!(!prompt.contains("Style: Kawaii."));
        } else {
            assert!(!prompt.contains(PHOTOREAL), "{} picked up the qualifier", style);
            assert!(prompt.contains(&format!("Style: {}.", style)));
        }
    }
}

#[test]
fn test_fixed_directives_always_present() {
    let prompt = compose(&SelectionSet::default());
    assert!(prompt.contains(ASPECT_RATIO_DIRECTIVE));
    assert!(prompt.contains(IDENTITY_DIRECTIVE));
    assert!(ASPECT_RATIO_DIRECTIVE.contains("9:16"));
}

#[test]
fn test_scene_text_appended() {
    let mut set = selection(
        Choice::preset("Golden Harmony"),
        Choice::preset("Midnight Glow"),
        Choice::preset("Business or Elegant"),
    );
    set.free_text_scene = "  Standing on a futuristic bridge at dusk ".to_string();

    let prompt = compose(&set);
    assert!(prompt.contains("Scene details: Standing on a futuristic bridge at dusk."));
}

#[test]
fn test_compose_is_deterministic() {
    let set = selection(
        Choice::preset("Animated Dream"),
        Choice::preset("Vibrant Pop"),
        Choice::preset("Streetwear / Cozy"),
    );
    assert_eq!(compose(&set), compose(&set));
}

#[test]
fn test_enhancement_request_mentions_selection() {
    let set = selection(
        Choice::preset("Kawaii"),
        Choice::preset("Ocean Mist"),
        Choice::preset("Full Dress or Gown"),
    );
    let request = PromptComposer::default().enhancement_request(&set, "beach picnic");

    assert!(request.contains(PHOTOREAL));
    assert!(request.contains("Full Dress or Gown"));
    assert!(request.contains("Scene idea: beach picnic"));
}

#[test]
fn test_missing_fields_listed_in_order() {
    let mut set = SelectionSet::default();
    assert_eq!(
        set.missing_fields(),
        vec![Field::Style, Field::Palette, Field::ClothingFocus]
    );

    set.set(Field::Palette, Choice::preset("Ocean Mist")).unwrap();
    assert_eq!(set.missing_fields(), vec![Field::Style, Field::ClothingFocus]);
    assert!(!set.is_complete());
}
