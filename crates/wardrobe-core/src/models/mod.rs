//! Data models for Wardrobe

mod item;
mod session;

pub use item::{ItemId, WardrobeItem};
pub use session::{Session, SignInMethod};
