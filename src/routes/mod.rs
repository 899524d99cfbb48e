//! Router assembly pieces.

pub mod common;
pub mod resource;

pub use common::{common_routes, route_not_found};
pub use resource::resource_routes;
