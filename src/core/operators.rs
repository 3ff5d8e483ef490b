// src/core/operators.rs

//! # Operators
//!
//! One generic N-ary operator kind. Each slot names an attribute and a parse function;
//! the operator parses every slot, applies its function to the typed operands and
//! formats the result. Any missing attribute, parse failure or undefined result turns
//! into the in-band error value of the operator.

use crate::constants::PATH_SEPARATOR;
use crate::core::{
    attributes::AttributeSpec,
    property::{Freshness, Property, PropertyError, PropertyKind, PropertyRef, error_value},
    property_maps::PropertyMaps,
};

/// A typed operand parsed from an attribute string.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A floating point number.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// Raw text.
    Text(String),
    /// A non-negative integer (counts and positions).
    Index(usize),
}

/// Parses an attribute string into an operand. `None` means invalid input.
pub type ParseFn = fn(&str) -> Option<Operand>;

/// Formats a result back into a string.
pub type FormatFn = fn(&Operand) -> String;

type ApplyFn = dyn Fn(&[Operand]) -> Option<Operand>;

/// One operand slot of an operator.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    name: &'static str,
    default: Option<&'static str>,
    parse: ParseFn,
}

impl Slot {
    /// A required slot.
    pub const fn required(name: &'static str, parse: ParseFn) -> Self {
        Self {
            name,
            default: None,
            parse,
        }
    }

    /// A slot with a default value.
    pub const fn optional(name: &'static str, default: &'static str, parse: ParseFn) -> Self {
        Self {
            name,
            default: Some(default),
            parse,
        }
    }
}

/// An eager property computing `apply(parse(slot_1), ..., parse(slot_n))`.
pub struct OperatorKind {
    slots: Vec<Slot>,
    apply: Box<ApplyFn>,
    format: FormatFn,
}

impl OperatorKind {
    /// Builds an operator with the default result formatting.
    pub fn new(slots: Vec<Slot>, apply: impl Fn(&[Operand]) -> Option<Operand> + 'static) -> Self {
        Self {
            slots,
            apply: Box::new(apply),
            format: format_operand,
        }
    }

    /// Replaces the result formatting.
    pub fn with_format(mut self, format: FormatFn) -> Self {
        self.format = format;
        self
    }
}

impl std::fmt::Debug for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorKind")
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl PropertyKind for OperatorKind {
    fn freshness(&self) -> Freshness {
        Freshness::Eager
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        self.slots
            .iter()
            .map(|slot| AttributeSpec {
                name: slot.name,
                default: slot.default,
            })
            .collect()
    }

    fn update(
        &self,
        property: &Property,
        _context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        let operands: Option<Vec<Operand>> = self
            .slots
            .iter()
            .map(|slot| attrs.value(slot.name).and_then(slot.parse))
            .collect();

        let result = operands.and_then(|operands| (self.apply)(&operands));
        Ok(Some(match result {
            Some(result) => (self.format)(&result),
            None => {
                log::debug!("Operator '{}' could not be evaluated.", property.name());
                error_value(property.name())
            }
        }))
    }
}

// --- PARSING & FORMATTING ---

/// Parses a number, ignoring surrounding whitespace.
pub fn parse_number(text: &str) -> Option<Operand> {
    text.trim().parse::<f64>().ok().map(Operand::Number)
}

/// `true` iff the text equals `true` ignoring ASCII case. Never fails.
pub fn parse_bool(text: &str) -> Option<Operand> {
    Some(Operand::Bool(text.eq_ignore_ascii_case("true")))
}

/// Takes the text as is.
pub fn parse_text(text: &str) -> Option<Operand> {
    Some(Operand::Text(text.to_string()))
}

/// Parses a non-negative integer, ignoring surrounding whitespace.
pub fn parse_index(text: &str) -> Option<Operand> {
    text.trim().parse::<usize>().ok().map(Operand::Index)
}

/// Default result formatting.
pub fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Number(value) => format_number(*value),
        Operand::Bool(value) => value.to_string(),
        Operand::Text(value) => value.clone(),
        Operand::Index(value) => value.to_string(),
    }
}

/// Formats a number without trailing zeros or a trailing decimal point.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let text = value.to_string();
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Splits a list.
///
/// An empty list has no elements. Leading empty elements are kept, trailing ones are
/// dropped. An empty separator splits into characters.
pub fn split_list(list: &str, sep: &str) -> Vec<String> {
    if list.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return list.chars().map(String::from).collect();
    }
    let mut elements: Vec<String> = list.split(sep).map(str::to_string).collect();
    while elements.last().is_some_and(String::is_empty) {
        elements.pop();
    }
    elements
}

// --- OPERATORS ---

fn compare(name: &str, help: &str, cmp: fn(f64, f64) -> bool) -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("op1", parse_number),
            Slot::required("op2", parse_number),
        ],
        move |operands| match operands {
            [Operand::Number(a), Operand::Number(b)] => Some(Operand::Bool(cmp(*a, *b))),
            _ => None,
        },
    );
    Property::new(name, help, kind)
}

fn arithmetic(name: &str, help: &str, op: fn(f64, f64) -> f64) -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("op1", parse_number),
            Slot::required("op2", parse_number),
        ],
        move |operands| match operands {
            [Operand::Number(a), Operand::Number(b)] => Some(Operand::Number(op(*a, *b))),
            _ => None,
        },
    );
    Property::new(name, help, kind)
}

fn text_compare(name: &str, help: &str, equal: bool) -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("op1", parse_text),
            Slot::required("op2", parse_text),
        ],
        move |operands| match operands {
            [Operand::Text(a), Operand::Text(b)] => Some(Operand::Bool((a == b) == equal)),
            _ => None,
        },
    );
    Property::new(name, help, kind)
}

fn logic(name: &str, help: &str, op: fn(bool, bool) -> bool) -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("op1", parse_bool),
            Slot::required("op2", parse_bool),
        ],
        move |operands| match operands {
            [Operand::Bool(a), Operand::Bool(b)] => Some(Operand::Bool(op(*a, *b))),
            _ => None,
        },
    );
    Property::new(name, help, kind)
}

fn not() -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(vec![Slot::required("op", parse_bool)], |operands| {
        match operands {
            [Operand::Bool(a)] => Some(Operand::Bool(!a)),
            _ => None,
        }
    });
    Property::new("not", "Returns the negation of op.", kind)
}

fn strlen() -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(vec![Slot::required("op", parse_text)], |operands| {
        match operands {
            [Operand::Text(text)] => Some(Operand::Index(text.chars().count())),
            _ => None,
        }
    });
    Property::new("strlen", "Returns the number of characters in op.", kind)
}

fn count() -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("list", parse_text),
            Slot::optional("sep", PATH_SEPARATOR, parse_text),
        ],
        |operands| match operands {
            [Operand::Text(list), Operand::Text(sep)] => {
                Some(Operand::Index(split_list(list, sep).len()))
            }
            _ => None,
        },
    );
    Property::new(
        "count",
        "Returns the number of elements in list, separated by sep.",
        kind,
    )
}

fn sublist() -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("list", parse_text),
            Slot::required("index", parse_index),
            Slot::optional("count", "1", parse_index),
            Slot::optional("sep", PATH_SEPARATOR, parse_text),
        ],
        |operands| match operands {
            [
                Operand::Text(list),
                Operand::Index(index),
                Operand::Index(count),
                Operand::Text(sep),
            ] => {
                let elements = split_list(list, sep);
                let end = index.checked_add(*count)?;
                elements
                    .get(*index..end)
                    .map(|window| Operand::Text(window.join(sep.as_str())))
            }
            _ => None,
        },
    );
    Property::new(
        "sublist",
        "Returns count elements of list starting at index, separated by sep.",
        kind,
    )
}

fn change_sep() -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("list", parse_text),
            Slot::optional("old", PATH_SEPARATOR, parse_text),
            Slot::required("new", parse_text),
        ],
        |operands| match operands {
            [Operand::Text(list), Operand::Text(old), Operand::Text(new)] => {
                Some(Operand::Text(split_list(list, old).join(new.as_str())))
            }
            _ => None,
        },
    );
    Property::new(
        "change.sep",
        "Re-joins the elements of list, separated by old, with new.",
        kind,
    )
}

fn replace_string() -> Result<PropertyRef, PropertyError> {
    let kind = OperatorKind::new(
        vec![
            Slot::required("text", parse_text),
            Slot::required("old", parse_text),
            Slot::required("new", parse_text),
        ],
        |operands| match operands {
            [Operand::Text(text), Operand::Text(old), Operand::Text(new)] => {
                Some(Operand::Text(text.replace(old.as_str(), new)))
            }
            _ => None,
        },
    );
    Property::new(
        "replace.string",
        "Replaces every occurrence of old in text with new.",
        kind,
    )
}

/// Every built-in operator property.
pub fn properties() -> Result<Vec<PropertyRef>, PropertyError> {
    Ok(vec![
        compare("gt", "Returns true if op1 > op2.", |a, b| a > b)?,
        compare("lt", "Returns true if op1 < op2.", |a, b| a < b)?,
        compare("gte", "Returns true if op1 >= op2.", |a, b| a >= b)?,
        compare("lte", "Returns true if op1 <= op2.", |a, b| a <= b)?,
        text_compare("eq", "Returns true if op1 equals op2 as strings.", true)?,
        text_compare("neq", "Returns true if op1 differs from op2 as strings.", false)?,
        logic("and", "Returns true if op1 and op2 are both true.", |a, b| a && b)?,
        logic("or", "Returns true if op1 or op2 is true.", |a, b| a || b)?,
        not()?,
        arithmetic("add", "Returns op1 + op2.", |a, b| a + b)?,
        arithmetic("sub", "Returns op1 - op2.", |a, b| a - b)?,
        arithmetic("mul", "Returns op1 * op2.", |a, b| a * b)?,
        arithmetic("div", "Returns op1 / op2.", |a, b| a / b)?,
        strlen()?,
        count()?,
        sublist()?,
        change_sep()?,
        replace_string()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(name: &str, attrs: &[(&str, &str)]) -> String {
        let mut context = PropertyMaps::new();
        let property = properties()
            .unwrap()
            .into_iter()
            .find(|p| p.name() == name)
            .unwrap();
        property.reset_attributes();
        for (key, value) in attrs {
            property.set_attribute(key, *value).unwrap();
        }
        property.get_current(&mut context).unwrap()
    }

    #[test]
    fn test_arithmetic_formatting() {
        assert_eq!(eval("add", &[("op1", "30"), ("op2", "1.23")]), "31.23");
        assert_eq!(eval("div", &[("op1", "-90.6"), ("op2", "-3")]), "30.2");
        assert_eq!(eval("mul", &[("op1", "2.5"), ("op2", "4")]), "10");
        assert_eq!(eval("sub", &[("op1", " 1 "), ("op2", "3")]), "-2");
        assert_eq!(eval("div", &[("op1", "1"), ("op2", "0")]), "Infinity");
        assert_eq!(eval("div", &[("op1", "-1"), ("op2", "0")]), "-Infinity");
        assert_eq!(eval("div", &[("op1", "0"), ("op2", "0")]), "NaN");
    }

    #[test]
    fn test_arithmetic_errors_are_in_band() {
        assert_eq!(eval("add", &[("op1", "x"), ("op2", "1")]), "(add Error...)");
        assert_eq!(eval("add", &[("op1", "1")]), "(add Error...)");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("gt", &[("op1", "2"), ("op2", "10")]), "false");
        assert_eq!(eval("lte", &[("op1", "2"), ("op2", "2")]), "true");
        assert_eq!(eval("eq", &[("op1", "2"), ("op2", "2.0")]), "false");
        assert_eq!(eval("neq", &[("op1", "a"), ("op2", "b")]), "true");
    }

    #[test]
    fn test_boolean_parsing_never_fails() {
        assert_eq!(eval("not", &[("op", "TRUE")]), "false");
        assert_eq!(eval("not", &[("op", "2")]), "true");
        assert_eq!(eval("not", &[("op", "TRUE ")]), "true");
        assert_eq!(eval("and", &[("op1", "true"), ("op2", "True")]), "true");
        assert_eq!(eval("or", &[("op1", "yes"), ("op2", "no")]), "false");
    }

    #[test]
    fn test_strlen_counts_characters() {
        assert_eq!(eval("strlen", &[("op", "héllo")]), "5");
    }

    #[test]
    fn test_list_operators() {
        assert_eq!(eval("count", &[("list", "a;b;c"), ("sep", ";")]), "3");
        assert_eq!(eval("count", &[("list", ""), ("sep", ";")]), "0");
        assert_eq!(
            eval("sublist", &[("list", "a;b;c;d"), ("sep", ";"), ("index", "1"), ("count", "2")]),
            "b;c"
        );
        assert_eq!(
            eval("sublist", &[("list", "a;b"), ("sep", ";"), ("index", "1"), ("count", "2")]),
            "(sublist Error...)"
        );
        assert_eq!(
            eval("change.sep", &[("list", "a;b;c"), ("old", ";"), ("new", ",")]),
            "a,b,c"
        );
        assert_eq!(
            eval("replace.string", &[("text", "a-b-c"), ("old", "-"), ("new", "+")]),
            "a+b+c"
        );
    }

    #[test]
    fn test_list_operators_default_to_path_separator() {
        let ps = PATH_SEPARATOR;
        let two = format!("abc{ps}def");
        let three = format!("abc{ps}def{ps}ghi");
        let leading = format!("{ps}abc{ps}def");

        assert_eq!(eval("count", &[("list", two.as_str())]), "2");
        assert_eq!(eval("sublist", &[("list", three.as_str()), ("index", "1")]), "def");
        assert_eq!(
            eval("sublist", &[("list", three.as_str()), ("index", "1"), ("count", "2")]),
            format!("def{ps}ghi")
        );
        assert_eq!(
            eval("change.sep", &[("list", leading.as_str()), ("new", " ")]),
            " abc def"
        );
    }

    #[test]
    fn test_split_list_rules() {
        assert!(split_list("", ";").is_empty());
        assert_eq!(split_list(";a;;b;;", ";"), vec!["", "a", "", "b"]);
        assert_eq!(split_list("abc", ""), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-12.25), "-12.25");
    }

    #[test]
    fn test_custom_format() {
        let mut context = PropertyMaps::new();
        let kind = OperatorKind::new(vec![Slot::required("op", parse_number)], |ops| {
            ops.first().cloned()
        })
        .with_format(|operand| format!("<{}>", format_operand(operand)));
        let property = Property::new("wrap", "", kind).unwrap();
        property.set_attribute("op", "4.50").unwrap();
        assert_eq!(property.get_current(&mut context).unwrap(), "<4.5>");
    }
}
