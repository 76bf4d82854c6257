//! Deterministic hotel reservation form widget.
//!
//! The widget reads a visitor's selection (hotel, room count, room type,
//! options) from a form, validates it, and toggles an error panel or a
//! confirmation panel. Because its entire boundary is a document tree, the
//! crate hosts it inside a small in-memory document model: fixtures are
//! parsed from HTML, events are dispatched synchronously, and assertions
//! read the resulting tree back. There is no network, no persistence, no
//! scripting and no timers; every run is reproducible.
//!
//! ```
//! use reservation_form::Harness;
//!
//! # fn main() -> reservation_form::Result<()> {
//! let mut page = Harness::from_html(
//!     r#"
//!     <div id='message' style='display: none'></div>
//!     <form>
//!       <select id='lis_hotel'>
//!         <option value='0'>-- Choisissez --</option>
//!         <option value='grand'>Grand Hôtel</option>
//!       </select>
//!       <input id='txt_nbrChambre' type='text'>
//!       <input type='radio' name='opt_type_chambre' value='suite'>
//!       <input type='checkbox' name='chk_options[]' value='wifi'>
//!       <button type='submit'>Réserver</button>
//!     </form>
//!     <div id='reservation' style='display: none'>
//!       <h2></h2>
//!       <span id='chambre_nombre'></span>
//!       <span id='chambre_type'></span>
//!       <ul id='options'></ul>
//!       <img src=''>
//!     </div>
//!     "#,
//! )?;
//!
//! page.select_option("#lis_hotel", "grand")?;
//! page.type_text("#txt_nbrChambre", "5")?;
//! page.set_checked("input[value='suite']", true)?;
//! page.submit("form")?;
//! page.assert_style("#reservation", "display", "block")?;
//! page.assert_text("#reservation h2", "grand")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

mod dom;
mod harness;
mod html;
mod selector;
mod widget;

pub use harness::Harness;
pub use widget::{HOTEL_ERROR, ROOM_COUNT_ERROR, ROOM_TYPE_ERROR, Selection, error_list_html};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    UnsupportedSelector(String),
    SelectorNotFound(String),
    BindingMissing {
        role: String,
        selector: String,
    },
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    Dom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::BindingMissing { role, selector } => {
                write!(f, "missing form binding: {role} ({selector})")
            }
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub(crate) fn truncate_chars(src: &str, max_chars: usize) -> String {
    let mut it = src.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings_intact() {
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }

    #[test]
    fn error_display_is_stable() {
        let err = Error::BindingMissing {
            role: "message container".into(),
            selector: "#message".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing form binding: message container (#message)"
        );
    }
}
