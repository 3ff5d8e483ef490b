// src/core/substitution.rs

//! # Template substitution
//!
//! Expands `${name attr="value" ...}` references against a [`PropertyMaps`] context.
//!
//! Inside quoted values `\"` and `\\` are escapes; any other backslash is kept so that
//! nested templates (e.g. the `cmd` of a `for`) can carry their own escapes. Outside a
//! reference, `\${` produces a literal `${`. References to unknown properties are left
//! in the output unchanged.

use crate::core::{
    property::{PropertyError, PropertyRef},
    property_maps::PropertyMaps,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_RE: Regex =
        Regex::new(r"^\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)").expect("static regex");
    static ref ATTRIBUTE_RE: Regex =
        Regex::new(r#"^\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*=\s*""#).expect("static regex");
}

/// How referenced properties are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Always use an up-to-date value (`get_current`).
    #[default]
    Current,
    /// Let lazy properties return their cached value (`get_lazy`).
    Lazy,
}

/// One `${...}` reference, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference {
    offset: usize,
    source: String,
    name: String,
    attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Reference(Reference),
}

/// Expands every reference in `template`.
///
/// # Errors
/// Malformed references, undeclared attribute keys, a property without value, an
/// invalidation cycle or nesting deeper than `MAX_RECURSION_DEPTH`.
pub fn expand(
    template: &str,
    context: &mut PropertyMaps,
    mode: Mode,
) -> Result<String, PropertyError> {
    if !template.contains("${") {
        return Ok(template.to_string());
    }

    context.enter(template)?;
    let previous = context.swap_mode(mode);
    let result = tokenize(template).and_then(|segments| render(&segments, context, mode));
    context.swap_mode(previous);
    context.leave();
    result
}

fn render(
    segments: &[Segment],
    context: &mut PropertyMaps,
    mode: Mode,
) -> Result<String, PropertyError> {
    let mut output = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Reference(reference) => {
                output.push_str(&evaluate(reference, context, mode)?);
            }
        }
    }
    Ok(output)
}

fn evaluate(
    reference: &Reference,
    context: &mut PropertyMaps,
    mode: Mode,
) -> Result<String, PropertyError> {
    let Some(property) = context.get_property(&reference.name) else {
        log::debug!(
            "Unknown property '{}' at offset {}. Left as is.",
            reference.name,
            reference.offset
        );
        return Ok(reference.source.clone());
    };

    let values = property.expand_attributes(&reference.attributes, context, mode)?;
    property.reset_attributes();
    for (key, value) in values {
        property.set_attribute(&key, value)?;
    }

    let value = read(&property, context, mode);
    property.reset_attributes();
    let value = value?;

    if property.kind().yields_template() {
        expand(&value, context, mode)
    } else {
        Ok(value)
    }
}

fn read(
    property: &PropertyRef,
    context: &mut PropertyMaps,
    mode: Mode,
) -> Result<String, PropertyError> {
    match mode {
        Mode::Current => property.get_current(context),
        Mode::Lazy => property.get_lazy(context),
    }
}

// --- PARSING ---

fn syntax(offset: usize, reason: impl Into<String>) -> PropertyError {
    PropertyError::Syntax {
        offset,
        reason: reason.into(),
    }
}

/// Splits a template into literal text and references, merging adjacent literals.
fn tokenize(template: &str) -> Result<Vec<Segment>, PropertyError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while let Some(rest) = template.get(pos..) {
        if rest.starts_with("\\${") {
            literal.push_str("${");
            pos += 3;
        } else if rest.starts_with("${") {
            let end = reference_end(rest).ok_or_else(|| syntax(pos, "unterminated reference"))?;
            let source = rest.get(..=end).unwrap_or(rest);
            let body = rest.get(2..end).unwrap_or("");
            let reference = parse_reference(body, pos, source)?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Reference(reference));
            pos += end + 1;
        } else if let Some(ch) = rest.chars().next() {
            literal.push(ch);
            pos += ch.len_utf8();
        } else {
            break;
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Byte index of the `}` closing the reference that starts `text`, skipping quoted values.
fn reference_end(text: &str) -> Option<usize> {
    let mut in_quote = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices().skip(2) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            '}' if !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_reference(body: &str, offset: usize, source: &str) -> Result<Reference, PropertyError> {
    let captures = NAME_RE
        .captures(body)
        .ok_or_else(|| syntax(offset, "missing property name"))?;
    let name = captures.get(1).map_or("", |m| m.as_str()).to_string();
    let mut rest = captures.get(0).and_then(|m| body.get(m.end()..)).unwrap_or("");

    let mut attributes = Vec::new();
    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        let captures = ATTRIBUTE_RE.captures(trimmed).ok_or_else(|| {
            syntax(offset, format!("malformed attribute list near '{}'", trimmed))
        })?;
        let key = captures.get(1).map_or("", |m| m.as_str()).to_string();
        let after = captures
            .get(0)
            .and_then(|m| trimmed.get(m.end()..))
            .unwrap_or("");
        let (value, remaining) = read_quoted(after)
            .ok_or_else(|| syntax(offset, format!("unterminated value of attribute '{}'", key)))?;
        attributes.push((key, value));
        rest = remaining;
    }

    Ok(Reference {
        offset,
        source: source.to_string(),
        name,
        attributes,
    })
}

/// Reads a quoted value up to its closing quote. Returns the unescaped value and the
/// text after the quote.
fn read_quoted(text: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = text.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => value.push('\\'),
            },
            '"' => return Some((value, text.get(i + 1..).unwrap_or(""))),
            _ => value.push(ch),
        }
    }
    None
}
