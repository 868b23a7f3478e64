//! Repositories for DevStudio
//!
//! Thin parameterized-query wrappers over the live connection. Each
//! repository borrows the connection for the duration of a call; none of
//! them owns it.

mod documents;
mod features;
mod projects;
mod providers;
mod settings;

pub use documents::{Document, DocumentRepository};
pub use features::{Feature, FeatureRepository};
pub use projects::{NewProject, Project, ProjectRepository, ProjectUpdate};
pub use providers::{LlmProvider, LlmProviderRepository};
pub use settings::{AppSettings, SettingsRepository};
