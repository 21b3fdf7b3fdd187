//! Prompt module - selection catalogs and prompt composition

pub mod composer;
pub mod options;

pub use composer::{compose, PromptComposer, StyleDirectives};
pub use options::{Choice, Field, SelectionSet, SelectionUpdate};
