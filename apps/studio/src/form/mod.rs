// Form State Manager: job taxonomy, field validation, and the mapping from
// form input to the generation request.

pub mod handlers;
pub mod models;
pub mod state;
pub mod taxonomy;
pub mod validation;
