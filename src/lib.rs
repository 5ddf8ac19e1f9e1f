// CSV Cloak - deterministic keyed pseudonymization for CSV columns
// Upload a CSV, pick columns, get back a copy with those columns replaced
// by keyed one-way tokens. Same value + same key = same token.

pub mod engine;
pub mod error;
pub mod http_server;
pub mod store;
pub mod table;
pub mod transform;

pub use error::ApiError;
pub use store::SessionStore;
pub use table::Document;
pub use transform::token_for;
