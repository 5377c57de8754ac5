//! # Stockroom
//!
//! An inventory management API server, usable both as a standalone binary
//! and as a library.
//!
//! Products carry a materialized `current_stock` counter backed by an
//! append-only ledger of stock movements; every adjustment commits the
//! movement row and the counter update as one transaction, so the counter
//! always equals the net sum of the ledger.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! stockroom = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use stockroom::server::{AppState, create_router};
//! use stockroom::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/stockroom.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState { store: Arc::new(store) });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI binary. Disable with
//!   `default-features = false`.

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
