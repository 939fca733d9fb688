//! Client-side services shared by every front end.

mod wardrobe;

pub use wardrobe::WardrobeClient;
