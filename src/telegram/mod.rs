pub mod decoder;
pub mod validator;

pub use validator::{validate, ValidationError};
