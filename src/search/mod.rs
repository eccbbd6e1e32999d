//! Search layer facade.
//!
//! - **[`store`]**: Tantivy store creation, schema management, and document indexing.
//! - **[`query`]**: Query parsing, execution, and snippet generation.

pub mod query;
pub mod store;

pub use query::{SearchHit, search};
pub use store::TabStore;
