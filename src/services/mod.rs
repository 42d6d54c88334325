//! Domain services used by HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the behavior of each screen (credentials, the
//! transaction adapter and view, the assistant chat) so route handlers can
//! stay focused on protocol translation and auth plumbing.

pub mod chat;
pub mod credentials;
pub mod ledger;
pub mod resources;
pub mod session;
pub mod transactions;
