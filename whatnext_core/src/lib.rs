//! Browsing, picking and editing categories of activities, with per-viewer
//! visibility and ownership rules layered over an injected data gateway.

pub mod authorization;
pub mod config;
pub mod data;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod picker;
pub mod query;
pub mod session;
pub mod visibility;

pub use authorization::{authorize, can_mutate, Action};
pub use config::{Config, ConfigError};
pub use editor::CatalogEditor;
pub use error::CoreError;
pub use gateway::{DataGateway, GatewayError, MemoryGateway};
pub use picker::{Pick, RandomPicker};
pub use session::Session;
pub use visibility::{HidePolicy, VisibilityFilter, VisibleSet};
