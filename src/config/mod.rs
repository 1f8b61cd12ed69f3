pub mod csrf;
pub mod env;
