//! Identifier derivation shared by the message and service emitters.

/// Trailing marker the harvester puts on hidden/pseudo columns.
pub const HIDDEN_MARKER: char = '#';
/// What a trailing [`HIDDEN_MARKER`] becomes in a field identifier.
pub const HIDDEN_SUFFIX: &str = "_hidden";
/// Suffix of the synthesized record type name for untyped composites.
pub const RECORD_TYPE_SUFFIX: &str = "_rek_typ";

/// `snake_case` → `TitleCase`: underscores are dropped and the character
/// after each run of them is upper-cased. The rest is kept as is.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for part in text.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Lower-cases and turns package dots into double underscores.
pub fn flatten_qualified(name: &str) -> String {
    name.to_lowercase().replace('.', "__")
}

/// RPC method name of a function: `pkg.get_emp` → `PkgGetEmp`.
pub fn method_name(function: &str) -> String {
    title_case(&flatten_qualified(function))
}

/// Message name for one call direction: `get_emp` + `input` → `GetEmpInput`.
pub fn message_name(function: &str, suffix: &str) -> String {
    title_case(&format!("{}__{suffix}", flatten_qualified(function)))
}

/// Field identifier for an argument name, with the hidden marker desugared.
pub fn field_name(arg_name: &str) -> String {
    match arg_name.strip_suffix(HIDDEN_MARKER) {
        Some(stem) => format!("{stem}{HIDDEN_SUFFIX}"),
        None => arg_name.to_owned(),
    }
}

/// Placeholder type for a composite whose descriptor came back empty.
pub fn placeholder_type_name(arg_name: &str) -> String {
    format!("{}{RECORD_TYPE_SUFFIX}", arg_name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_drops_underscores() {
        assert_eq!(title_case("get_emp__input"), "GetEmpInput");
        assert_eq!(title_case("_leading"), "Leading");
        assert_eq!(title_case("p_2_x"), "P2X");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn qualified_names_flatten() {
        assert_eq!(method_name("HR.Get_Emp"), "HrGetEmp");
        assert_eq!(message_name("hr.get_emp", "output"), "HrGetEmpOutput");
    }

    #[test]
    fn hidden_marker_is_desugared() {
        assert_eq!(field_name("count#"), "count_hidden");
        assert!(!field_name("x#").contains(HIDDEN_MARKER));
        assert_eq!(field_name("plain"), "plain");
    }

    #[test]
    fn placeholder_is_deterministic() {
        assert_eq!(placeholder_type_name("P_Emp"), "p_emp_rek_typ");
        assert_eq!(placeholder_type_name("P_Emp"), placeholder_type_name("p_emp"));
    }
}
