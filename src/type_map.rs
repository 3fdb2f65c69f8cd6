//! Native scalar descriptor → wire scalar type.
//!
//! Unrecognized descriptors pass through lower-cased; the emitter treats
//! them as references to a message defined elsewhere in the schema.
use std::collections::BTreeMap;
use std::fmt;

/// Field option carrying the JSON tag for gogo-generated structs.
pub const JSON_TAG: &str = "gogoproto.jsontag";

// ------------------------------- Policy ---------------------------------- //

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeMapOptions {
    /// `gogoproto.*` options are only valid when the schema imports gogo.
    pub gogo: bool,
    /// Tag numeric fields so their JSON form is a string.
    pub numbers_as_strings: bool,
}

// ---------------------------- Scalar classes ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarClass {
    Timestamp,
    Text,
    Int32,
    Float64,
    Decimal,
    CustomDate,
    Binary,
}

impl ScalarClass {
    /// Expects a lower-cased descriptor.
    fn of(descriptor: &str) -> Option<Self> {
        let class = match descriptor {
            "time.time" | "sql.nulltime" => Self::Timestamp,
            "string" | "n" | "sql.nullstring" => Self::Text,
            "int32" | "sql.nullint32" => Self::Int32,
            "float64" | "sql.nullfloat64" => Self::Float64,
            "goracle.number" | "godror.number" => Self::Decimal,
            "custom.date" => Self::CustomDate,
            "raw" | "goracle.lob" | "godror.lob" | "ora.lob" => Self::Binary,
            _ => return None,
        };
        Some(class)
    }

    fn wire(self) -> &'static str {
        match self {
            Self::Timestamp | Self::Text | Self::Decimal | Self::CustomDate => "string",
            Self::Int32 => "sint32",
            Self::Float64 => "double",
            Self::Binary => "bytes",
        }
    }

    fn options(self, field_name: &str, policy: TypeMapOptions) -> FieldOptions {
        let mut options = FieldOptions::new();
        if !policy.gogo {
            return options;
        }
        match self {
            Self::Int32 | Self::Float64 if policy.numbers_as_strings => {
                options.insert(JSON_TAG, format!("{field_name},string,omitempty"));
            }
            Self::Decimal => {
                options.insert(JSON_TAG, format!("{field_name},omitempty"));
            }
            _ => {}
        }
        options
    }
}

/// Maps a (marker-stripped) native descriptor to its wire type and options.
pub fn map_type(descriptor: &str, field_name: &str, policy: TypeMapOptions) -> (String, FieldOptions) {
    let descriptor = descriptor.strip_prefix("[]").unwrap_or(descriptor);
    let trimmed = descriptor.strip_prefix('*').unwrap_or(descriptor).to_lowercase();
    match ScalarClass::of(&trimmed) {
        Some(class) => (class.wire().to_owned(), class.options(field_name, policy)),
        None => (trimmed, FieldOptions::new()),
    }
}

// ------------------------------- Options ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self { Self::Bool(value) }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self { Self::Text(value) }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Field options, rendered in key order so output is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions(BTreeMap<String, OptionValue>);

impl FieldOptions {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> { self.0.get(key) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
}

/// `[(key)=value, ...]`, or nothing at all when empty.
impl fmt::Display for FieldOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({key})={value}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLAIN: TypeMapOptions = TypeMapOptions { gogo: true, numbers_as_strings: false };
    const STRINGY: TypeMapOptions = TypeMapOptions { gogo: true, numbers_as_strings: true };

    fn wire(descriptor: &str) -> String {
        map_type(descriptor, "f", PLAIN).0
    }

    #[test]
    fn scalar_table() {
        assert_eq!(wire("time.Time"), "string");
        assert_eq!(wire("string"), "string");
        assert_eq!(wire("int32"), "sint32");
        assert_eq!(wire("float64"), "double");
        assert_eq!(wire("sql.NullFloat64"), "double");
        assert_eq!(wire("goracle.Number"), "string");
        assert_eq!(wire("custom.Date"), "string");
        assert_eq!(wire("goracle.Lob"), "bytes");
        assert_eq!(wire("raw"), "bytes");
    }

    #[test]
    fn unknown_passes_through_lower_cased() {
        let (typ, opts) = map_type("Db_Pkg__Emp_Rec", "f", PLAIN);
        assert_eq!(typ, "db_pkg__emp_rec");
        assert!(opts.is_empty());
        assert_eq!(wire("*Emp_Rec"), "emp_rec");
    }

    #[test]
    fn numbers_as_strings_tags_numeric_fields() {
        let (typ, opts) = map_type("float64", "amount", STRINGY);
        assert_eq!(typ, "double");
        assert_eq!(opts.to_string(), r#"[(gogoproto.jsontag)="amount,string,omitempty"]"#);

        let (_, opts) = map_type("int32", "n", STRINGY);
        assert_eq!(opts.len(), 1);

        let (_, opts) = map_type("float64", "amount", PLAIN);
        assert_eq!(opts.to_string(), "");
    }

    #[test]
    fn decimal_always_omits_empty() {
        let (_, opts) = map_type("goracle.Number", "price", PLAIN);
        assert_eq!(opts.get(JSON_TAG), Some(&OptionValue::from("price,omitempty")));
    }

    #[test]
    fn plain_mode_emits_no_gogo_options() {
        let plain = TypeMapOptions { gogo: false, numbers_as_strings: true };
        let (typ, opts) = map_type("goracle.Number", "price", plain);
        assert_eq!(typ, "string");
        assert!(opts.is_empty());
        assert!(map_type("float64", "amount", plain).1.is_empty());
    }

    #[test]
    fn options_render_sorted_and_typed() {
        let mut opts = FieldOptions::new();
        opts.insert("zeta", true);
        opts.insert("alpha", "a\"b");
        assert_eq!(opts.to_string(), r#"[(alpha)="a\"b", (zeta)=true]"#);
    }
}
