//! CrudService: generic CRUD using the safe SQL builder.

mod crud;
mod validation;
pub use crud::{CrudService, MutationAck};
pub use validation::RequestValidator;
