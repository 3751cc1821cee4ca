//! Application services and ports for connection resolution.

#![forbid(unsafe_code)]

mod connection_filter;
mod connection_query;
mod connection_service;

pub use connection_filter::ConnectionFilter;
pub use connection_query::{ConnectionDirection, ConnectionQuery, MergeStrategy, QueryPlan, RuleSource};
pub use connection_service::{ConnectionGraphRepository, ConnectionService};
