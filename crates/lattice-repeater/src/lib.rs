//! Lattice Repeater - filtered-view reconciliation for editable row lists.
//!
//! A repeater renders a host-owned list of records as editable rows. Hosts
//! can narrow the rows through an async filter; every edit made against the
//! narrowed view is merged back into the full list, in its original order,
//! before it is reported.
//!
//! # Example
//!
//! ```no_run
//! use lattice_repeater::prelude::*;
//! use serde_json::json;
//!
//! async fn run() -> Result<()> {
//!     let repeater = Repeater::builder()
//!         .value(vec![json!({ "name": "Ada" }), json!({ "name": "Grace" })])
//!         .validate_config(ValidateConfig::new().rule("name", Validator::required()))
//!         .filter(|value, key| async move {
//!             Ok(value
//!                 .iter()
//!                 .filter(|row| row.record()["name"].as_str().is_some_and(|n| n.contains(&key)))
//!                 .cloned()
//!                 .collect::<Vec<_>>())
//!         })
//!         .on_change(|value| println!("new value: {value:?}"))
//!         .build()?;
//!
//!     repeater.search("Ada").await?;
//!     repeater.add_inline().await?;
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;
pub mod prelude;

pub use error::{Error, HandlerError, Result};
pub use lattice_repeater_core::{
    ConnectionGuard, ConnectionId, Generation, PerfSpan, Signal, Ticket, logging,
};
