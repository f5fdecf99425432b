pub mod domain;

pub use domain::is_valid_domain;
