// src/core/control_flow.rs

//! # Control flow
//!
//! `if`, `var`, `var.set` and `for`. Their template attributes (`then`, `else`, `cmd`)
//! are raw: they are stored unexpanded and only evaluated when the branch or body
//! actually runs.

use crate::constants::{PATH_SEPARATOR, PROCESS_SEPARATOR};
use crate::core::{
    attributes::AttributeSpec,
    operators::split_list,
    property::{
        Freshness, Property, PropertyError, PropertyKind, PropertyRef, error_detail, error_value,
    },
    property_maps::PropertyMaps,
    substitution,
};

/// `${if cond="true" then="..." else="..."}`.
///
/// Returns the chosen branch unexpanded; the call site expands it, so the branch not
/// taken is never evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct IfKind;

impl PropertyKind for IfKind {
    fn freshness(&self) -> Freshness {
        Freshness::Eager
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        vec![
            AttributeSpec::required("cond"),
            AttributeSpec::optional("then", ""),
            AttributeSpec::optional("else", ""),
        ]
    }

    fn is_raw_attribute(&self, name: &str) -> bool {
        matches!(name, "then" | "else")
    }

    fn yields_template(&self) -> bool {
        true
    }

    fn update(
        &self,
        property: &Property,
        _context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        let branch = match attrs.value("cond") {
            Some(cond) if cond.eq_ignore_ascii_case("true") => attrs.value("then"),
            Some(cond) if cond.eq_ignore_ascii_case("false") => attrs.value("else"),
            _ => None,
        };
        Ok(Some(match branch {
            Some(branch) => branch.to_string(),
            None => error_value(property.name()),
        }))
    }
}

/// `${var name="x" val="1" cmd="..."}`: binds `x` for the duration of `cmd`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarKind;

impl PropertyKind for VarKind {
    fn freshness(&self) -> Freshness {
        Freshness::Eager
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        vec![
            AttributeSpec::required("name"),
            AttributeSpec::required("val"),
            AttributeSpec::required("cmd"),
        ]
    }

    fn is_raw_attribute(&self, name: &str) -> bool {
        name == "cmd"
    }

    fn update(
        &self,
        property: &Property,
        context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        let (Some(name), Some(val), Some(cmd)) =
            (attrs.value("name"), attrs.value("val"), attrs.value("cmd"))
        else {
            return Ok(Some(error_value(property.name())));
        };

        if let Err(e) = context.add_variable(name, val) {
            return Ok(Some(error_detail(property.name(), e)));
        }
        let mode = context.mode();
        let result = substitution::expand(cmd, context, mode);
        context.remove_variable(name)?;
        result.map(Some)
    }
}

/// `${var.set name="x" val="2"}`: rebinds the innermost `x`. Produces `""`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarSetKind;

impl PropertyKind for VarSetKind {
    fn freshness(&self) -> Freshness {
        Freshness::Eager
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        vec![AttributeSpec::required("name"), AttributeSpec::required("val")]
    }

    fn update(
        &self,
        property: &Property,
        context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        let (Some(name), Some(val)) = (attrs.value("name"), attrs.value("val")) else {
            return Ok(Some(error_value(property.name())));
        };
        Ok(Some(match context.set_variable(name, val) {
            Ok(()) => String::new(),
            Err(e @ PropertyError::NoSuchVariable { .. }) => error_detail(property.name(), e),
            Err(e) => return Err(e),
        }))
    }
}

/// `${for list="a;b" sep=";" var="x" cmd="..."}`: expands `cmd` once per chunk of
/// `each` elements and joins the results with `outsep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForKind;

impl PropertyKind for ForKind {
    fn freshness(&self) -> Freshness {
        Freshness::Eager
    }

    fn attributes(&self) -> Vec<AttributeSpec> {
        vec![
            AttributeSpec::required("list"),
            AttributeSpec::optional("sep", PATH_SEPARATOR),
            AttributeSpec::required("var"),
            AttributeSpec::optional("each", "1"),
            AttributeSpec::required("cmd"),
            AttributeSpec::optional("outsep", PROCESS_SEPARATOR),
        ]
    }

    fn is_raw_attribute(&self, name: &str) -> bool {
        name == "cmd"
    }

    fn update(
        &self,
        property: &Property,
        context: &mut PropertyMaps,
    ) -> Result<Option<String>, PropertyError> {
        let attrs = property.attributes();
        let (Some(list), Some(sep), Some(var), Some(each), Some(cmd), Some(outsep)) = (
            attrs.value("list"),
            attrs.value("sep"),
            attrs.value("var"),
            attrs.value("each"),
            attrs.value("cmd"),
            attrs.value("outsep"),
        ) else {
            return Ok(Some(error_value(property.name())));
        };
        let each = match each.trim().parse::<usize>() {
            Ok(each) if each > 0 => each,
            _ => return Ok(Some(error_detail(property.name(), "each must be a positive integer"))),
        };

        if let Err(e) = context.add_variable(var, "") {
            return Ok(Some(error_detail(property.name(), e)));
        }

        let elements = split_list(list, sep);
        let mode = context.mode();
        let mut outputs = Vec::new();
        let mut failure = None;
        for chunk in elements.chunks(each) {
            let step = context
                .set_variable(var, &chunk.join(sep))
                .and_then(|()| substitution::expand(cmd, context, mode));
            match step {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        context.remove_variable(var)?;
        match failure {
            Some(e) => Err(e),
            None => Ok(Some(outputs.join(outsep))),
        }
    }
}

/// Every control flow property.
pub fn properties() -> Result<Vec<PropertyRef>, PropertyError> {
    Ok(vec![
        Property::new(
            "if",
            "If cond is true, evaluates then, otherwise else.",
            IfKind,
        )?,
        Property::new(
            "var",
            "Binds the variable name to val while evaluating cmd.",
            VarKind,
        )?,
        Property::new(
            "var.set",
            "Sets the innermost variable name to val. Evaluates to the empty string.",
            VarSetKind,
        )?,
        Property::new(
            "for",
            "Evaluates cmd once for every each elements of list, bound to var, joining the results with outsep.",
            ForKind,
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CONTROL_FLOW_CATEGORY, OPERATOR_CATEGORY};
    use crate::core::{
        operators,
        substitution::{Mode, expand},
    };
    use pretty_assertions::assert_eq;

    fn context() -> PropertyMaps {
        let mut maps = PropertyMaps::new();
        for property in operators::properties().unwrap() {
            maps.set_property(OPERATOR_CATEGORY, property);
        }
        for property in properties().unwrap() {
            maps.set_property(CONTROL_FLOW_CATEGORY, property);
        }
        maps
    }

    fn run(template: &str) -> String {
        let mut maps = context();
        expand(template, &mut maps, Mode::Current).unwrap()
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            run(r#"${for list="a;b;c" var="x" sep=";" cmd="[${x}]" outsep=","}"#),
            "[a],[b],[c]"
        );
    }

    #[test]
    fn test_for_loop_in_chunks() {
        assert_eq!(
            run(r#"${for list="a;b;c" var="x" sep=";" each="2" cmd="<${x}>" outsep=" "}"#),
            "<a;b> <c>"
        );
        assert_eq!(
            run(r#"${for list="a;b" var="x" sep=";" each="0" cmd="${x}"}"#),
            "(for Error: each must be a positive integer...)"
        );
    }

    #[test]
    fn test_for_loop_removes_its_variable() {
        let mut maps = context();
        expand(
            r#"${for list="1;2" var="i" sep=";" cmd="${i}"}"#,
            &mut maps,
            Mode::Current,
        )
        .unwrap();
        assert!(maps.get_property("i").is_none());
    }

    #[test]
    fn test_for_loop_removes_its_variable_on_failure() {
        let mut maps = context();
        let result = expand(
            r#"${for list="1;2" var="i" sep=";" cmd="${add bogus=\"1\"}"}"#,
            &mut maps,
            Mode::Current,
        );
        assert!(matches!(result, Err(PropertyError::UnknownAttribute { .. })));
        assert!(maps.get_property("i").is_none());
    }

    #[test]
    fn test_var_scoping_and_shadowing() {
        assert_eq!(run(r#"${var name="x" val="1" cmd="${x}"}"#), "1");
        assert_eq!(
            run(r#"${var name="x" val="outer" cmd="${x}-${var name=\"x\" val=\"inner\" cmd=\"${x}\"}-${x}"}"#),
            "outer-inner-outer"
        );

        let mut maps = context();
        expand(r#"${var name="x" val="1" cmd="${x}"}"#, &mut maps, Mode::Current).unwrap();
        assert!(maps.get_property("x").is_none());
    }

    #[test]
    fn test_var_set_changes_innermost_binding() {
        assert_eq!(
            run(r#"${var name="x" val="1" cmd="${var.set name=\"x\" val=\"2\"}${x}"}"#),
            "2"
        );
        assert_eq!(
            run(r#"${var.set name="nope" val="2"}"#),
            "(var.set Error: No variable named 'nope' is in scope....)"
        );
    }

    #[test]
    fn test_var_cannot_shadow_builtin() {
        assert!(run(r#"${var name="add" val="1" cmd="x"}"#).starts_with("(var Error: "));
    }

    #[test]
    fn test_if_evaluates_only_the_chosen_branch() {
        assert_eq!(
            run(r#"${if cond="${gt op1=\"3\" op2=\"2\"}" then="yes ${add op1=\"1\" op2=\"1\"}" else="no"}"#),
            "yes 2"
        );
        assert_eq!(run(r#"${if cond="FALSE" then="yes"}"#), "");
        assert_eq!(run(r#"${if cond="maybe" then="yes"}"#), "(if Error...)");

        // The branch not taken would fail to parse.
        assert_eq!(run(r#"${if cond="true" then="ok" else="${broken"}"#), "ok");
    }

    #[test]
    fn test_for_with_accumulator() {
        assert_eq!(
            run(r#"${var name="sum" val="0" cmd="${for list=\"1;2;3\" sep=\";\" var=\"n\" outsep=\"\" cmd=\"${var.set name=\\\"sum\\\" val=\\\"${add op1=\\\\\\\"${sum}\\\\\\\" op2=\\\\\\\"${n}\\\\\\\"}\\\"}\"}${sum}"}"#),
            "6"
        );
    }
}
