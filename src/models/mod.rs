pub mod location;
pub mod wire;

// Re-export commonly used types
pub use location::{Location, LocationPayload};
