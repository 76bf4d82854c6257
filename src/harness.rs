//! Host-side harness: owns the document, routes events to the widget and
//! exposes user actions plus assertions for tests.

use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::widget::{FormHandlers, ReservationForm, Selection};
use crate::{Error, Result, truncate_chars};

const ACTION_STACK_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerKind {
    WidgetSubmit,
    WidgetReset,
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    capture: bool,
    handler: HandlerKind,
}

#[derive(Debug, Default)]
struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: String, listener: Listener) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Per-dispatch event state handed to handlers.
#[derive(Debug, Clone)]
pub(crate) struct EventState {
    event_type: String,
    target: NodeId,
    current_target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub(crate) fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub(crate) fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A parsed page with the reservation widget bound to it.
///
/// Listeners for `submit` and `reset` are registered on the form element
/// at construction time; every other interaction happens through the
/// user-action methods, which dispatch synthetic events exactly the way a
/// cooperative single-threaded host would: synchronously, one at a time.
#[derive(Debug)]
pub struct Harness {
    dom: Dom,
    listeners: ListenerStore,
    widget: ReservationForm,
    trace: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Harness {
    /// Parses the page fixture and binds the widget to it.
    ///
    /// Fails with [`Error::BindingMissing`] when the fixture does not
    /// provide the full field contract.
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        let widget = ReservationForm::bind(&dom)?;
        let form = widget.form_node();

        let mut harness = Self {
            dom,
            listeners: ListenerStore::default(),
            widget,
            trace: false,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        };
        harness.listeners.add(
            form,
            "submit".to_string(),
            Listener {
                capture: false,
                handler: HandlerKind::WidgetSubmit,
            },
        );
        harness.listeners.add(
            form,
            "reset".to_string(),
            Listener {
                capture: false,
                handler: HandlerKind::WidgetReset,
            },
        );
        Ok(harness)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Dom("set_trace_log_limit requires at least 1 entry".into()));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    /// Types into a text control: sets its value and fires `input`.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        if self.dom.readonly(target) {
            return Ok(());
        }

        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();

        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        stacker::grow(ACTION_STACK_BYTES, || {
            self.dom.set_value(target, text)?;
            self.dispatch_event(target, "input")?;
            Ok(())
        })
    }

    /// Checks or unchecks a checkbox/radio, enforcing radio-group
    /// exclusivity and firing `input` and `change` on a state change.
    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual: tag,
            });
        }

        let kind = self
            .dom
            .attr(target, "type")
            .unwrap_or_else(|| "text".into())
            .to_ascii_lowercase();
        if kind != "checkbox" && kind != "radio" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual: format!("input[type={kind}]"),
            });
        }

        stacker::grow(ACTION_STACK_BYTES, || {
            let current = self.dom.checked(target)?;
            if current != checked {
                if kind == "radio" && checked {
                    self.uncheck_other_radios_in_group(target)?;
                }
                self.dom.set_checked(target, checked)?;
                self.dispatch_event(target, "input")?;
                self.dispatch_event(target, "change")?;
            }
            Ok(())
        })
    }

    /// Picks an option of a select list by value and fires
    /// `input`/`change` when the value actually changed. An unknown value
    /// clears the selection, like assigning a bogus value to a real
    /// select.
    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "select" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".into(),
                actual: tag,
            });
        }

        stacker::grow(ACTION_STACK_BYTES, || {
            let current = self.dom.value(target)?;
            self.dom.set_value(target, value)?;
            if self.dom.value(target)? != current {
                self.dispatch_event(target, "input")?;
                self.dispatch_event(target, "change")?;
            }
            Ok(())
        })
    }

    /// Clicks an element. Checkbox/radio targets toggle first; a click on
    /// a submit or reset control whose default was not prevented then
    /// raises the corresponding form event.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }

        stacker::grow(ACTION_STACK_BYTES, || {
            let click_outcome = self.dispatch_event(target, "click")?;
            if click_outcome.default_prevented {
                return Ok(());
            }

            if is_checkbox_input(&self.dom, target) {
                let current = self.dom.checked(target)?;
                self.dom.set_checked(target, !current)?;
                self.dispatch_event(target, "input")?;
                self.dispatch_event(target, "change")?;
            }

            if is_radio_input(&self.dom, target) {
                let current = self.dom.checked(target)?;
                if !current {
                    self.uncheck_other_radios_in_group(target)?;
                    self.dom.set_checked(target, true)?;
                    self.dispatch_event(target, "input")?;
                    self.dispatch_event(target, "change")?;
                }
            }

            if is_submit_control(&self.dom, target) {
                if let Some(form_id) = self.form_owner(target) {
                    self.dispatch_event(form_id, "submit")?;
                }
            }

            if is_reset_control(&self.dom, target) {
                if let Some(form_id) = self.form_owner(target) {
                    self.dispatch_event(form_id, "reset")?;
                }
            }

            Ok(())
        })
    }

    /// Raises `submit` on the form owning the target (or the target
    /// itself when it is the form).
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || {
            if let Some(form_id) = self.form_owner(target) {
                self.dispatch_event(form_id, "submit")?;
            }
            Ok(())
        })
    }

    /// Raises `reset` on the form owning the target.
    pub fn reset(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || {
            if let Some(form_id) = self.form_owner(target) {
                self.dispatch_event(form_id, "reset")?;
            }
            Ok(())
        })
    }

    /// Dispatches an arbitrary event to the selected element.
    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || {
            self.dispatch_event(target, event)?;
            Ok(())
        })
    }

    pub fn text_of(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn value_of(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn checked_of(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.checked(target)
    }

    pub fn attr_of(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn style_of(&self, selector: &str, property: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.style_get(target, property)
    }

    pub fn inner_html_of(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.inner_html(target)
    }

    /// Runs the widget's validation against the current field state
    /// without dispatching an event.
    pub fn validate(&self) -> Result<Vec<&'static str>> {
        self.widget.validate(&self.dom)
    }

    /// Reads the visitor's current selection.
    pub fn selection(&self) -> Result<Selection> {
        self.widget.selection(&self.dom)
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.checked(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name).unwrap_or_default();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_style(&self, selector: &str, property: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.style_get(target, property)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn form_owner(&self, node_id: NodeId) -> Option<NodeId> {
        if self
            .dom
            .tag_name(node_id)
            .map(|t| t.eq_ignore_ascii_case("form"))
            .unwrap_or(false)
        {
            Some(node_id)
        } else {
            self.dom.find_ancestor_by_tag(node_id, "form")
        }
    }

    fn uncheck_other_radios_in_group(&mut self, target: NodeId) -> Result<()> {
        let target_name = self.dom.attr(target, "name").unwrap_or_default();
        if target_name.is_empty() {
            return Ok(());
        }
        let target_form = self.form_owner(target);

        for node in self.dom.all_element_nodes() {
            if node == target {
                continue;
            }
            if !is_radio_input(&self.dom, node) {
                continue;
            }
            if self.dom.attr(node, "name").unwrap_or_default() != target_name {
                continue;
            }
            if self.form_owner(node) != target_form {
                continue;
            }
            if self.dom.checked(node)? {
                self.dom.set_checked(node, false)?;
            }
        }

        Ok(())
    }

    fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        // Capture phase.
        if path.len() >= 2 {
            for node in &path[..path.len() - 1] {
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, true)?;
                if event.propagation_stopped {
                    self.trace_event(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        // Target phase: capture listeners first, then bubble listeners.
        event.current_target = target;
        self.invoke_listeners(target, &mut event, true)?;
        if event.propagation_stopped {
            self.trace_event(&event, "propagation_stopped");
            return Ok(event);
        }
        self.invoke_listeners(target, &mut event, false)?;
        if event.propagation_stopped {
            self.trace_event(&event, "propagation_stopped");
            return Ok(event);
        }

        // Bubble phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].iter().rev() {
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, false)?;
                if event.propagation_stopped {
                    self.trace_event(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        self.trace_event(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(
        &mut self,
        node_id: NodeId,
        event: &mut EventState,
        capture: bool,
    ) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type, capture);
        for listener in listeners {
            match listener.handler {
                HandlerKind::WidgetSubmit => self.widget.on_submit(&mut self.dom, event)?,
                HandlerKind::WidgetReset => self.widget.on_reset(&mut self.dom, event)?,
            }
            if event.propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    fn trace_event(&mut self, event: &EventState, outcome: &str) {
        if !self.trace {
            return;
        }
        let line = format!(
            "[event] {} target={} current={} default_prevented={} {}",
            event.event_type,
            self.node_label(event.target),
            self.node_label(event.current_target),
            event.default_prevented,
            outcome
        );
        self.trace_line(line);
    }

    fn node_label(&self, node_id: NodeId) -> String {
        let tag = self.dom.tag_name(node_id).unwrap_or("#text");
        match self.dom.attr(node_id, "id") {
            Some(id) if !id.is_empty() => format!("{tag}#{id}"),
            _ => tag.to_string(),
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        self.trace_logs.push(line);
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
    }
}

fn is_checkbox_input(dom: &Dom, node_id: NodeId) -> bool {
    input_type_is(dom, node_id, "checkbox")
}

fn is_radio_input(dom: &Dom, node_id: NodeId) -> bool {
    input_type_is(dom, node_id, "radio")
}

fn input_type_is(dom: &Dom, node_id: NodeId, kind: &str) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };
    if !element.tag_name.eq_ignore_ascii_case("input") {
        return false;
    }
    element
        .attrs
        .get("type")
        .map(|t| t.eq_ignore_ascii_case(kind))
        .unwrap_or(false)
}

fn is_submit_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("button") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }

    if element.tag_name.eq_ignore_ascii_case("input") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit") || kind.eq_ignore_ascii_case("image"))
            .unwrap_or(false);
    }

    false
}

fn is_reset_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    let is_button = element.tag_name.eq_ignore_ascii_case("button")
        || element.tag_name.eq_ignore_ascii_case("input");
    if !is_button {
        return false;
    }

    element
        .attrs
        .get("type")
        .map(|kind| kind.eq_ignore_ascii_case("reset"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div id="message" style="display: none"></div>
        <form>
          <select id="lis_hotel">
            <option value="0">-- Choisissez un hôtel --</option>
            <option value="grand">Grand Hôtel</option>
          </select>
          <input id="txt_nbrChambre" type="text">
          <input id="rad_simple" type="radio" name="opt_type_chambre" value="simple">
          <input id="rad_suite" type="radio" name="opt_type_chambre" value="suite">
          <input id="chk_wifi" type="checkbox" name="chk_options[]" value="wifi">
          <button id="btn_reserver" type="submit">Réserver</button>
          <button id="btn_effacer" type="reset">Effacer</button>
        </form>
        <div id="reservation" style="display: none">
          <h2></h2>
          <span id="chambre_nombre"></span>
          <span id="chambre_type"></span>
          <ul id="options"></ul>
          <img src="">
        </div>
    "#;

    #[test]
    fn from_html_requires_the_field_contract() {
        let err = Harness::from_html("<form></form>").unwrap_err();
        assert!(matches!(err, Error::BindingMissing { .. }));
    }

    #[test]
    fn radio_group_is_exclusive() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.set_checked("#rad_simple", true).unwrap();
        page.set_checked("#rad_suite", true).unwrap();
        page.assert_checked("#rad_simple", false).unwrap();
        page.assert_checked("#rad_suite", true).unwrap();
    }

    #[test]
    fn checkbox_click_toggles() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.click("#chk_wifi").unwrap();
        page.assert_checked("#chk_wifi", true).unwrap();
        page.click("#chk_wifi").unwrap();
        page.assert_checked("#chk_wifi", false).unwrap();
    }

    #[test]
    fn type_text_rejects_non_text_targets() {
        let mut page = Harness::from_html(PAGE).unwrap();
        let err = page.type_text("#lis_hotel", "grand").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn select_option_fires_only_on_change() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.select_option("#lis_hotel", "grand").unwrap();
        page.assert_value("#lis_hotel", "grand").unwrap();
        // Unknown value clears the selection.
        page.select_option("#lis_hotel", "inconnu").unwrap();
        page.assert_value("#lis_hotel", "").unwrap();
    }

    #[test]
    fn click_on_submit_button_raises_form_submit() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.click("#btn_reserver").unwrap();
        // Empty form: validation fails and the message region shows.
        page.assert_style("#message", "display", "block").unwrap();
    }

    #[test]
    fn click_on_reset_button_hides_panels() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.click("#btn_reserver").unwrap();
        page.click("#btn_effacer").unwrap();
        page.assert_style("#message", "display", "none").unwrap();
        page.assert_style("#reservation", "display", "none").unwrap();
    }

    #[test]
    fn trace_captures_event_lines() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.enable_trace(true);
        page.set_trace_stderr(false);
        page.submit("form").unwrap();
        let logs = page.take_trace_logs();
        assert!(logs.iter().any(|line| line.starts_with("[event] submit")));
        assert!(page.take_trace_logs().is_empty());
    }

    #[test]
    fn trace_log_limit_drops_oldest_lines() {
        let mut page = Harness::from_html(PAGE).unwrap();
        page.enable_trace(true);
        page.set_trace_stderr(false);
        page.set_trace_log_limit(2).unwrap();
        page.submit("form").unwrap();
        page.submit("form").unwrap();
        page.submit("form").unwrap();
        assert_eq!(page.take_trace_logs().len(), 2);
        assert!(page.set_trace_log_limit(0).is_err());
    }

    #[test]
    fn assertion_failure_carries_dom_snippet() {
        let page = Harness::from_html(PAGE).unwrap();
        let err = page.assert_text("#reservation h2", "grand").unwrap_err();
        match err {
            Error::AssertionFailed {
                expected, actual, ..
            } => {
                assert_eq!(expected, "grand");
                assert_eq!(actual, "");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
