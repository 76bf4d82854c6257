//! CSS selector subset used for field lookup.
//!
//! Supports tag, `*`, `#id`, `.class`, `[attr]`, `[attr='value']`,
//! `:checked`, `:disabled`, descendant/child combinators and
//! comma-separated groups. Anything else is an `UnsupportedSelector`
//! error rather than a silent non-match.

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorPseudoClass {
    Checked,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
    pub(crate) pseudo_classes: Vec<SelectorPseudoClass>,
}

impl SelectorStep {
    pub(crate) fn id_only(&self) -> Option<&str> {
        if !self.universal
            && self.tag.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudo_classes.is_empty()
        {
            self.id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to previous (left) selector part.
    pub(crate) combinator: Option<SelectorCombinator>,
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let groups = split_selector_groups(selector)?;
    let mut parsed = Vec::with_capacity(groups.len());
    for group in groups {
        parsed.push(parse_selector_chain(&group)?);
    }
    Ok(parsed)
}

fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let tokens = tokenize_selector(selector)?;
    let mut steps = Vec::new();
    let mut pending_combinator: Option<SelectorCombinator> = None;

    for token in tokens {
        if token == ">" {
            if pending_combinator.is_some() || steps.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending_combinator = Some(SelectorCombinator::Child);
            continue;
        }

        let step = parse_selector_step(&token)?;
        let combinator = if steps.is_empty() {
            None
        } else {
            Some(
                pending_combinator
                    .take()
                    .unwrap_or(SelectorCombinator::Descendant),
            )
        };
        steps.push(SelectorPart { step, combinator });
    }

    if steps.is_empty() || pending_combinator.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    Ok(steps)
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            ',' if bracket_depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            '>' if bracket_depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(">".to_string());
            }
            ch if ch.is_ascii_whitespace() && bracket_depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    Ok(tokens)
}

fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }

    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = SelectorStep::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                i += 1;
                let Some((id, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                if step.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            b'.' => {
                i += 1;
                let Some((class_name, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.classes.push(class_name);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_selector_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            b':' => {
                i += 1;
                let Some((name, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                let pseudo = match name.as_str() {
                    "checked" => SelectorPseudoClass::Checked,
                    "disabled" => SelectorPseudoClass::Disabled,
                    _ => return Err(Error::UnsupportedSelector(part.into())),
                };
                step.pseudo_classes.push(pseudo);
                i = next;
            }
            _ => {
                if step.tag.is_some() || step.universal || i != 0 {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let Some((tag, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    Ok(step)
}

fn parse_selector_ident(part: &str, from: usize) -> Option<(String, usize)> {
    let bytes = part.as_bytes();
    let mut i = from;
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    if i == from {
        return None;
    }
    part.get(from..i).map(|ident| (ident.to_string(), i))
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

fn parse_selector_attr_condition(part: &str, from: usize) -> Result<(SelectorAttrCondition, usize)> {
    let bytes = part.as_bytes();
    let mut i = from;
    if bytes.get(i) != Some(&b'[') {
        return Err(Error::UnsupportedSelector(part.into()));
    }
    i += 1;

    let key_start = i;
    while i < bytes.len() && bytes[i] != b']' && bytes[i] != b'=' {
        i += 1;
    }
    let key = part
        .get(key_start..i)
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| Error::UnsupportedSelector(part.into()))?
        .to_ascii_lowercase();

    match bytes.get(i) {
        Some(b']') => Ok((SelectorAttrCondition::Exists { key }, i + 1)),
        Some(b'=') => {
            i += 1;
            let value = if bytes.get(i) == Some(&b'\'') || bytes.get(i) == Some(&b'"') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let value = part
                    .get(value_start..i)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?
                    .to_string();
                i += 1;
                value
            } else {
                let value_start = i;
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
                part.get(value_start..i)
                    .map(str::trim)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?
                    .to_string()
            };

            if bytes.get(i) != Some(&b']') {
                return Err(Error::UnsupportedSelector(part.into()));
            }
            Ok((SelectorAttrCondition::Eq { key, value }, i + 1))
        }
        _ => Err(Error::UnsupportedSelector(part.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_step(selector: &str) -> SelectorStep {
        let groups = parse_selector_groups(selector).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
        groups[0][0].step.clone()
    }

    #[test]
    fn parses_compound_step() {
        let step = single_step("input.large[type='radio']:checked");
        assert_eq!(step.tag.as_deref(), Some("input"));
        assert_eq!(step.classes, vec!["large".to_string()]);
        assert_eq!(
            step.attrs,
            vec![SelectorAttrCondition::Eq {
                key: "type".into(),
                value: "radio".into()
            }]
        );
        assert_eq!(step.pseudo_classes, vec![SelectorPseudoClass::Checked]);
    }

    #[test]
    fn quoted_attr_value_may_contain_brackets() {
        let step = single_step("[name='chk_options[]']");
        assert_eq!(
            step.attrs,
            vec![SelectorAttrCondition::Eq {
                key: "name".into(),
                value: "chk_options[]".into()
            }]
        );
    }

    #[test]
    fn id_only_fast_path_detection() {
        assert_eq!(single_step("#message").id_only(), Some("message"));
        assert_eq!(single_step("div#message").id_only(), None);
    }

    #[test]
    fn splits_groups_on_top_level_commas() {
        let groups = parse_selector_groups("#a, #b").unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn chain_records_combinators() {
        let groups = parse_selector_groups("form > input[type='checkbox']").unwrap();
        let chain = &groups[0];
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].combinator, None);
        assert_eq!(chain[1].combinator, Some(SelectorCombinator::Child));
    }

    #[test]
    fn rejects_unsupported_pseudo_classes() {
        assert!(matches!(
            parse_selector_groups("li:first-child"),
            Err(Error::UnsupportedSelector(_))
        ));
    }

    #[test]
    fn rejects_dangling_combinator_and_empty_groups() {
        assert!(parse_selector_groups("div >").is_err());
        assert!(parse_selector_groups("div,,span").is_err());
        assert!(parse_selector_groups("").is_err());
    }
}
