//! # Template Helpers
//!
//! An [Askama](https://crates.io/crates/askama) template for embedding the
//! CSRF token into server-rendered forms.
//!
//! # Example
//! ```rust
//! use askama::Template;
//! use wzs_csrf::web::template::CsrfField;
//!
//! let field = CsrfField { name: "csrfToken", token: "abc" };
//! assert_eq!(
//!     field.render().unwrap(),
//!     r#"<input type="hidden" name="csrfToken" value="abc">"#
//! );
//! ```

use askama::Template;

/// Hidden form input carrying the masked CSRF token.
///
/// Both attributes are HTML-escaped.
#[derive(Template)]
#[template(
    source = r#"<input type="hidden" name="{{ name }}" value="{{ token }}">"#,
    ext = "html"
)]
pub struct CsrfField<'a> {
    pub name: &'a str,
    pub token: &'a str,
}
