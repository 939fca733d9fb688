//! wardrobe-core - Core library for Wardrobe
//!
//! This crate contains the shared models, image ingest rules, realtime
//! gallery sync and submission logic used by every Wardrobe front end
//! (CLI, validation API).

pub mod auth;
pub mod config;
pub mod error;
pub mod form;
pub mod gallery;
pub mod ingest;
pub mod media;
pub mod models;
pub mod services;
pub mod state;
pub mod status;
pub mod store;
pub mod util;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use media::EncodedImage;
pub use models::{ItemId, Session, SignInMethod, WardrobeItem};
pub use services::WardrobeClient;
