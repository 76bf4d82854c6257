//! The reservation form widget.
//!
//! A stateless controller bound to the host page once, at initialization:
//! every contract element is resolved into [`FieldBindings`] up front, so a
//! page that does not provide the expected fields fails fast with a
//! [`Error::BindingMissing`] instead of breaking mid-event. The controller
//! itself keeps no state between events; everything is re-read from the
//! document on each submit.

use crate::dom::{Dom, NodeId};
use crate::harness::EventState;
use crate::{Error, Result};

/// Message shown when no hotel is selected.
pub const HOTEL_ERROR: &str = "Sélectionnez un hôtel !";
/// Message shown when the room count is missing, non-numeric or out of range.
pub const ROOM_COUNT_ERROR: &str = "Saisissez un nombre de chambres entre 1 et 12 !";
/// Message shown when no room type is chosen.
pub const ROOM_TYPE_ERROR: &str = "Sélectionnez un type de chambre !";

// Sentinel value of the hotel list's placeholder option.
const UNSELECTED_HOTEL: &str = "0";

const ROOM_COUNT_MIN: f64 = 1.0;
const ROOM_COUNT_MAX: f64 = 12.0;

const ROOM_TYPE_GROUP: &str = "input[name='opt_type_chambre']:checked";
const OPTIONS_GROUP: &str = "[name='chk_options[]']:checked";

/// Snapshot of the visitor's input, read fresh on each event.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Selected hotel identifier; `"0"` means no selection.
    pub hotel: String,
    /// Parsed room count; NaN when the field is empty or non-numeric.
    pub room_count: f64,
    /// Checked room-type radio value; empty when none is checked.
    pub room_type: String,
    /// Checked option values, in document order.
    pub options: Vec<String>,
}

/// Formats accumulated validation messages the way the widget renders
/// them into the message region: one `<li>` per failed check.
pub fn error_list_html(errors: &[&str]) -> String {
    let mut out = String::from("<ul> ");
    for message in errors {
        out.push_str("<li>");
        out.push_str(message);
        out.push_str("</li> ");
    }
    out.push_str("</ul>");
    out
}

/// Integer-prefix parse with `parseInt` semantics: leading whitespace and
/// an optional sign are consumed, then base-10 digits; anything after the
/// digits is ignored. No digits at all yields NaN.
pub(crate) fn parse_int_prefix(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digit_count = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digit_count == 0 {
        return f64::NAN;
    }

    let mut magnitude = 0f64;
    for byte in rest.as_bytes()[..digit_count].iter() {
        magnitude = magnitude * 10.0 + f64::from(byte - b'0');
    }
    sign * magnitude
}

fn format_count(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{}", value as i64)
    }
}

/// Contract elements the host page must provide, resolved once.
#[derive(Debug, Clone)]
pub(crate) struct FieldBindings {
    pub(crate) form: NodeId,
    pub(crate) message: NodeId,
    pub(crate) hotel_select: NodeId,
    pub(crate) room_count_input: NodeId,
    pub(crate) confirmation: NodeId,
    pub(crate) hotel_heading: NodeId,
    pub(crate) room_count_out: NodeId,
    pub(crate) room_type_out: NodeId,
    pub(crate) options_list: NodeId,
    pub(crate) image: NodeId,
}

impl FieldBindings {
    pub(crate) fn resolve(dom: &Dom) -> Result<Self> {
        let form = require(dom.query_selector("form")?, "form", "form")?;
        let message = require(dom.query_selector("#message")?, "message container", "#message")?;
        let hotel_select = require(dom.query_selector("#lis_hotel")?, "hotel list", "#lis_hotel")?;
        let room_count_input = require(
            dom.query_selector("#txt_nbrChambre")?,
            "room count input",
            "#txt_nbrChambre",
        )?;
        let confirmation = require(
            dom.query_selector("#reservation")?,
            "confirmation panel",
            "#reservation",
        )?;
        let hotel_heading = require(
            dom.query_selector_from(confirmation, "h2")?,
            "hotel name heading",
            "#reservation h2",
        )?;
        let room_count_out = require(
            dom.query_selector_from(confirmation, "#chambre_nombre")?,
            "room count display",
            "#chambre_nombre",
        )?;
        let room_type_out = require(
            dom.query_selector_from(confirmation, "#chambre_type")?,
            "room type display",
            "#chambre_type",
        )?;
        let options_list = require(
            dom.query_selector_from(confirmation, "#options")?,
            "options list",
            "#options",
        )?;
        let image = require(
            dom.query_selector_from(confirmation, "img")?,
            "hotel image",
            "#reservation img",
        )?;

        Ok(Self {
            form,
            message,
            hotel_select,
            room_count_input,
            confirmation,
            hotel_heading,
            room_count_out,
            room_type_out,
            options_list,
            image,
        })
    }
}

fn require(found: Option<NodeId>, role: &str, selector: &str) -> Result<NodeId> {
    found.ok_or_else(|| Error::BindingMissing {
        role: role.to_string(),
        selector: selector.to_string(),
    })
}

/// Event callbacks the host wires to the form element.
pub(crate) trait FormHandlers {
    fn on_submit(&self, dom: &mut Dom, event: &mut EventState) -> Result<()>;
    fn on_reset(&self, dom: &mut Dom, event: &mut EventState) -> Result<()>;
}

/// Stateless controller translating form fields into an error display or
/// a confirmation display.
#[derive(Debug, Clone)]
pub(crate) struct ReservationForm {
    bindings: FieldBindings,
}

impl ReservationForm {
    pub(crate) fn bind(dom: &Dom) -> Result<Self> {
        Ok(Self {
            bindings: FieldBindings::resolve(dom)?,
        })
    }

    pub(crate) fn form_node(&self) -> NodeId {
        self.bindings.form
    }

    pub(crate) fn read_hotel(&self, dom: &Dom) -> Result<String> {
        dom.value(self.bindings.hotel_select)
    }

    pub(crate) fn read_room_count(&self, dom: &Dom) -> Result<f64> {
        Ok(parse_int_prefix(&dom.value(self.bindings.room_count_input)?))
    }

    pub(crate) fn read_room_type(&self, dom: &Dom) -> Result<String> {
        match dom.query_selector_from(self.bindings.form, ROOM_TYPE_GROUP)? {
            Some(radio) => dom.value(radio),
            None => Ok(String::new()),
        }
    }

    pub(crate) fn read_options(&self, dom: &Dom) -> Result<Vec<String>> {
        let mut options = Vec::new();
        for node in dom.query_selector_all_from(self.bindings.form, OPTIONS_GROUP)? {
            options.push(dom.value(node)?);
        }
        Ok(options)
    }

    pub(crate) fn selection(&self, dom: &Dom) -> Result<Selection> {
        Ok(Selection {
            hotel: self.read_hotel(dom)?,
            room_count: self.read_room_count(dom)?,
            room_type: self.read_room_type(dom)?,
            options: self.read_options(dom)?,
        })
    }

    /// Runs the three checks in fixed order, accumulating every failure.
    pub(crate) fn validate(&self, dom: &Dom) -> Result<Vec<&'static str>> {
        let mut errors = Vec::new();

        if self.read_hotel(dom)? == UNSELECTED_HOTEL {
            errors.push(HOTEL_ERROR);
        }

        let count = self.read_room_count(dom)?;
        if count.is_nan() || count < ROOM_COUNT_MIN || count > ROOM_COUNT_MAX {
            errors.push(ROOM_COUNT_ERROR);
        }

        if self.read_room_type(dom)?.is_empty() {
            errors.push(ROOM_TYPE_ERROR);
        }

        Ok(errors)
    }

    /// Projects the current (already validated) selection into the
    /// confirmation region. Option items are appended to whatever the
    /// list already holds; repeated submits therefore accumulate
    /// duplicates. That mirrors the widget's long-standing behavior and
    /// is covered by a regression test.
    fn render_confirmation(&self, dom: &mut Dom) -> Result<()> {
        let bindings = &self.bindings;

        let hotel = self.read_hotel(dom)?;
        dom.set_text_content(bindings.hotel_heading, &hotel)?;

        let count = self.read_room_count(dom)?;
        dom.set_text_content(bindings.room_count_out, &format_count(count))?;

        let room_type = self.read_room_type(dom)?;
        dom.set_text_content(bindings.room_type_out, &room_type)?;

        dom.set_attr(bindings.image, "src", &format!("./images/{hotel}.jpg"))?;

        let mut list_html = dom.inner_html(bindings.options_list)?;
        for option in self.read_options(dom)? {
            list_html.push_str("<li>");
            list_html.push_str(&option);
            list_html.push_str("</li>");
        }
        dom.set_inner_html(bindings.options_list, &list_html)?;
        Ok(())
    }
}

impl FormHandlers for ReservationForm {
    fn on_submit(&self, dom: &mut Dom, event: &mut EventState) -> Result<()> {
        event.prevent_default();

        dom.set_inner_html(self.bindings.message, "")?;

        let errors = self.validate(dom)?;
        if errors.is_empty() {
            self.render_confirmation(dom)?;
            dom.style_set(self.bindings.confirmation, "display", "block")?;
        } else {
            dom.style_set(self.bindings.message, "display", "block")?;
            dom.set_inner_html(self.bindings.message, &error_list_html(&errors))?;
        }
        Ok(())
    }

    fn on_reset(&self, dom: &mut Dom, _event: &mut EventState) -> Result<()> {
        dom.style_set(self.bindings.message, "display", "none")?;
        dom.style_set(self.bindings.confirmation, "display", "none")?;
        Ok(())
    }
}
