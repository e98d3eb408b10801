//! lanchat node - connection management and concurrent I/O
//!
//! This crate provides the runtime of one chat peer:
//! - `registry` - Connection registry actor (the single owner of live links)
//! - `server` - TCP listener and the per-connection receivers
//! - `connector` - Outbound dialing with self/duplicate checks
//! - `dispatcher` - Operator command loop
//! - `display` - Single writer for all terminal output
//! - `shutdown` - Closes every connection on exit
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          lanchat node                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌─────────────┐   register    ┌──────────────────┐              │
//! │  │  Listener   │──────────────▶│  RegistryActor   │◀──┐          │
//! │  └──────┬──────┘               │ (connection map) │   │ lookup/  │
//! │         │ spawn                └────────▲─────────┘   │ remove   │
//! │         ▼                               │ remove      │          │
//! │  ┌─────────────┐                        │        ┌────┴───────┐  │
//! │  │  Receiver   │────────────────────────┘        │ Dispatcher │  │
//! │  │ (per conn)  │                                 │ + Connector│  │
//! │  └──────┬──────┘                                 └────┬───────┘  │
//! │         │ notices            ┌──────────────┐         │ replies  │
//! │         └───────────────────▶│   Display    │◀────────┘          │
//! │                              └──────────────┘                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod display;
pub mod netinfo;
pub mod node;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use node::Node;
