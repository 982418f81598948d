//! Terminal and static-HTML front end for the ads server.
//!
//! [`Dashboard`] owns the view state and drives an [`AdsSource`]; the
//! credentials it works with live in an explicit [`SessionStore`].

pub mod client;
pub mod error;
pub mod output;
pub mod render;
pub mod session;
pub mod state;

pub use client::{AdsPayload, AdsSource, HttpAdsSource, SyncSummary};
pub use error::DashboardError;
pub use session::{Credentials, FileSessionStore, MemorySessionStore, SessionStore};
pub use state::{Dashboard, ViewState};
