pub mod enrichment;
pub mod retention;
