//! Domain logic that sits between the HTTP handlers and the stores.

pub mod dispatcher;
pub mod ledger;
pub mod materialize;
pub mod quiz;
pub mod relay;
