//! Dispatch Server - delivery marketplace fulfillment engine
//!
//! # Architecture
//!
//! The server exposes the order fulfillment and delivery dispatch core of
//! a multi-role delivery marketplace:
//!
//! - **Fulfillment engine** (`fulfillment`): checkout aggregation,
//!   inventory reservation, shipment state machine, agent dispatch,
//!   OTP-gated completion and earnings settlement
//! - **Catalog** (`catalog`): read-only product snapshot registry
//! - **Notifications** (`notify`): fire-and-forget notice fan-out
//! - **Authorization** (`auth`): one policy function per operation
//! - **HTTP API** (`api`): axum routes and handlers
//!
//! # Module structure
//!
//! ```text
//! dispatch-server/src/
//! ├── core/          # config, state, error, server bootstrap
//! ├── auth/          # role-based authorization policy
//! ├── fulfillment/   # engine: storage, manager, actions, appliers
//! ├── api/           # HTTP routes and handlers
//! ├── catalog.rs     # product snapshot registry
//! ├── notify.rs      # notification sink
//! └── utils/         # codes, geo, logging
//! ```

pub mod api;
pub mod auth;
pub mod catalog;
pub mod core;
pub mod fulfillment;
pub mod notify;
pub mod utils;

// Re-export public types
pub use catalog::CatalogService;
pub use core::{Config, Server, ServerError, ServerState};
pub use fulfillment::{DispatchManager, DispatchStorage};
pub use notify::{Notice, NoticeCategory, Notifier};
pub use utils::logger::{init_logger, init_logger_with_file};
