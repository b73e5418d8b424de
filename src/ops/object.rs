//! Object literal editing.

use crate::ast::{canonical, ArrayExpr, Expr, ExprKind, ObjectExpr, ObjectMember, Property};
use crate::errors::MutationError;
use tracing::debug;

/// Get or create property `name`, returning its value.
///
/// A fallback identifier equal to `name` is printed in shorthand form.
pub fn property<'a>(obj: &'a mut ObjectExpr, name: &str, fallback: Expr) -> &'a mut Expr {
    if obj.get(name).is_none() {
        debug!(name, "adding property");
        obj.members
            .push(ObjectMember::Property(Property::new(name, fallback)));
    }
    &mut obj
        .get_mut(name)
        .expect("property exists after insertion")
        .value
}

/// Get or create property `name` holding an object literal.
pub fn object_property<'a>(
    obj: &'a mut ObjectExpr,
    name: &str,
) -> Result<&'a mut ObjectExpr, MutationError> {
    let value = property(obj, name, Expr::object(vec![]));
    let found = value.kind_name();
    value
        .as_object_mut()
        .ok_or_else(|| MutationError::mismatch("object literal", format!("{found} at '{name}'")))
}

/// Get or create property `name` holding an array literal.
pub fn array_property<'a>(
    obj: &'a mut ObjectExpr,
    name: &str,
) -> Result<&'a mut ArrayExpr, MutationError> {
    let value = property(obj, name, Expr::array(vec![]));
    let found = value.kind_name();
    value
        .as_array_mut()
        .ok_or_else(|| MutationError::mismatch("array literal", format!("{found} at '{name}'")))
}

/// Get or create nested object properties, e.g. `["kit", "alias"]`.
pub fn property_path<'a>(
    obj: &'a mut ObjectExpr,
    path: &[&str],
) -> Result<&'a mut ObjectExpr, MutationError> {
    let mut current = obj;
    for name in path {
        current = object_property(current, name)?;
    }
    Ok(current)
}

/// Set property `name` to `value`, replacing any existing value.
///
/// When both the existing and the new value are object literals the new
/// properties are merged in recursively, so sibling keys survive.
pub fn override_property(obj: &mut ObjectExpr, name: &str, value: Expr) {
    let Some(existing) = obj.get_mut(name) else {
        debug!(name, "adding property");
        obj.members.push(ObjectMember::Property(Property::new(name, value)));
        return;
    };

    let merge = existing.value.as_object().is_some() && value.as_object().is_some();
    if merge {
        let (Some(target), ExprKind::Object(source)) = (existing.value.as_object_mut(), value.kind)
        else {
            return;
        };
        for member in source.members {
            if let ObjectMember::Property(p) = member {
                override_property(target, p.key.name(), p.value);
            }
        }
        return;
    }

    if !canonical::equal(&existing.value, &value) {
        debug!(name, "overriding property");
        existing.value = value;
    }
}

/// Apply [`override_property`] for every entry, in order.
pub fn override_properties<I, S>(obj: &mut ObjectExpr, properties: I)
where
    I: IntoIterator<Item = (S, Expr)>,
    S: AsRef<str>,
{
    for (name, value) in properties {
        override_property(obj, name.as_ref(), value);
    }
}

/// Remove property `name`. Returns whether it was present.
pub fn remove_property(obj: &mut ObjectExpr, name: &str) -> bool {
    let before = obj.members.len();
    obj.members.retain(|member| match member {
        ObjectMember::Property(p) => p.key.name() != name,
        ObjectMember::Other(_) => true,
    });
    let removed = obj.members.len() != before;
    if removed {
        debug!(name, "removed property");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{print, Statement, StatementKind};
    use crate::style::Style;

    fn printed(obj: &ObjectExpr) -> String {
        let expr = Expr::from(ExprKind::Object(obj.clone()));
        let statement = Statement::new(StatementKind::ExportDefault(expr));
        let text = print::statement(&statement, &Style::default());
        text.trim_start_matches("export default ")
            .trim_end_matches(';')
            .to_string()
    }

    #[test]
    fn property_is_get_or_create() {
        let mut obj = ObjectExpr::default();
        *property(&mut obj, "a", Expr::number(1)) = Expr::number(2);
        property(&mut obj, "a", Expr::number(3));
        assert_eq!(obj.members.len(), 1);
        assert_eq!(obj.get("a").map(|p| p.value.clone()), Some(Expr::number(2)));
    }

    #[test]
    fn identifier_fallback_is_shorthand() {
        let mut obj = ObjectExpr::default();
        property(&mut obj, "adapter", Expr::ident("adapter"));
        assert_eq!(printed(&obj), "{\n\tadapter\n}");
    }

    #[test]
    fn typed_properties_check_shape() {
        let mut obj = ObjectExpr::default();
        property(&mut obj, "plugins", Expr::number(1));
        assert!(matches!(
            array_property(&mut obj, "plugins"),
            Err(MutationError::StructuralMismatch { .. })
        ));
        assert!(array_property(&mut obj, "include").is_ok());

        let alias = property_path(&mut obj, &["kit", "alias"]).unwrap();
        property(alias, "$lib", Expr::string("./src/lib"));
        let kit = obj.get("kit").and_then(|p| p.value.as_object()).unwrap();
        assert!(kit.get("alias").is_some());
    }

    #[test]
    fn override_merges_nested_objects() {
        let mut obj = ObjectExpr::default();
        property(
            &mut obj,
            "server",
            Expr::object(vec![Property::new("port", Expr::number(3000))]),
        );
        override_properties(
            &mut obj,
            [(
                "server",
                Expr::object(vec![Property::new("host", Expr::bool(true))]),
            )],
        );
        let server = obj.get("server").and_then(|p| p.value.as_object()).unwrap();
        assert!(server.get("port").is_some());
        assert!(server.get("host").is_some());

        override_property(&mut obj, "server", Expr::null());
        assert_eq!(obj.get("server").map(|p| p.value.clone()), Some(Expr::null()));
    }

    #[test]
    fn remove_property_by_key() {
        let mut obj = ObjectExpr::default();
        property(&mut obj, "a", Expr::null());
        assert!(remove_property(&mut obj, "a"));
        assert!(!remove_property(&mut obj, "a"));
        assert!(obj.members.is_empty());
    }
}
