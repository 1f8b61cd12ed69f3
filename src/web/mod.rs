pub mod context;
pub mod csrf;
pub mod error_handler;
pub mod middleware;
pub mod template;
pub mod validator;
