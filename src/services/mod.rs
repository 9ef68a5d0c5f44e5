pub mod geocode;
pub mod location;
pub mod memory_store;
pub mod mlab;
pub mod store;
