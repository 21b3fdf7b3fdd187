//! View module - the wizard state model and its sessions

pub mod session;
pub mod wizard;

pub use session::SessionStore;
pub use wizard::{
    AvatarAsset, PendingAction, ResultPane, SceneWizard, WizardDeps, WizardSnapshot,
};
