pub mod chat;
pub mod datasets;
pub mod prediction;
