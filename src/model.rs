//! Typed model of harvested stored-procedure signatures.
//!
//! Produced upstream (one tree per function), consumed read-only by the
//! emitters. Nothing in here knows about the wire schema.
use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Native label the harvester uses for cursor-valued arguments.
const CURSOR_LABEL: &str = "REF CURSOR";

// ------------------------------- Direction -------------------------------- //

bitflags! {
    /// Call direction of an argument. `IN | OUT` is a legal value.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Direction: u8 {
        const IN = 1 << 0;
        const OUT = 1 << 1;
    }
}

impl Direction {
    pub fn is_input(self) -> bool { self.contains(Direction::IN) }
    pub fn is_output(self) -> bool { self.contains(Direction::OUT) }
}

impl Default for Direction {
    fn default() -> Self { Direction::IN }
}

// -------------------------------- Flavor ---------------------------------- //

/// Scalar vs. collection. Record-ness is signalled by `record_of`, the
/// explicit `Record` label is accepted for harvesters that emit it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flavor {
    #[default]
    Simple,
    Record,
    Table,
}

// ------------------------------- Argument --------------------------------- //

/// Ordered field-name → member mapping of a composite type.
pub type RecordOf = IndexMap<String, Argument>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub flavor: Flavor,
    /// Native label (`NUMBER(10)`, `VARCHAR2`, ...); documentation only.
    #[serde(default)]
    pub abs_type: String,
    /// Native type descriptor, possibly carrying `*` / `[]` markers.
    #[serde(default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_of: Option<Box<Argument>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub record_of: RecordOf,
}

impl Argument {
    pub fn scalar(
        name: impl Into<String>,
        direction: Direction,
        type_name: impl Into<String>,
        abs_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            type_name: type_name.into(),
            abs_type: abs_type.into(),
            ..Self::default()
        }
    }

    /// Composite argument; members are keyed by their own names.
    pub fn record<I>(
        name: impl Into<String>,
        direction: Direction,
        type_name: impl Into<String>,
        fields: I,
    ) -> Self
    where
        I: IntoIterator<Item = Argument>,
    {
        Self {
            name: name.into(),
            direction,
            flavor: Flavor::Record,
            type_name: type_name.into(),
            record_of: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            ..Self::default()
        }
    }

    /// Collection argument. `element` of `None` models a harvester that
    /// failed to resolve the element type.
    pub fn table(
        name: impl Into<String>,
        direction: Direction,
        type_name: impl Into<String>,
        element: Option<Argument>,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            flavor: Flavor::Table,
            type_name: type_name.into(),
            table_of: element.map(Box::new),
            ..Self::default()
        }
    }

    pub fn with_abs_type(mut self, abs_type: impl Into<String>) -> Self {
        self.abs_type = abs_type.into();
        self
    }

    pub fn is_table(&self) -> bool { self.flavor == Flavor::Table }

    /// Plain scalar: neither a collection nor a record.
    pub fn is_scalar(&self) -> bool {
        self.flavor == Flavor::Simple && self.record_of.is_empty()
    }

    /// Table flavor without element metadata.
    pub fn is_missing_table_of(&self) -> bool {
        self.is_table() && self.table_of.is_none()
    }

    pub fn is_cursor(&self) -> bool {
        self.abs_type.trim().eq_ignore_ascii_case(CURSOR_LABEL)
    }

    /// Record members keyed by name but harvested without one inherit the key.
    fn adopt_field_names(&mut self) {
        for (key, field) in self.record_of.iter_mut() {
            if field.name.is_empty() {
                field.name = key.clone();
            }
            field.adopt_field_names();
        }
        if let Some(element) = self.table_of.as_deref_mut() {
            element.adopt_field_names();
        }
    }
}

// ------------------------------- Function --------------------------------- //

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Possibly package-qualified (`pkg.proc`).
    pub name: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Box<Argument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    pub fn returns(mut self, arg: Argument) -> Self {
        self.returns = Some(Box::new(arg));
        self
    }

    pub fn documentation(mut self, text: impl Into<String>) -> Self {
        self.documentation = Some(text.into());
        self
    }

    /// Arguments carrying `direction`, in call-site order.
    pub fn args_with(&self, direction: Direction) -> impl Iterator<Item = &Argument> {
        self.args.iter().filter(move |arg| arg.direction.contains(direction))
    }

    /// Whether the function hands back a cursor, i.e. a streaming result.
    pub fn has_cursor_out(&self) -> bool {
        self.returns.as_deref().is_some_and(Argument::is_cursor)
            || self.args_with(Direction::OUT).any(Argument::is_cursor)
    }

    pub(crate) fn adopt_field_names(&mut self) {
        for arg in self.args.iter_mut().chain(self.returns.as_deref_mut()) {
            arg.adopt_field_names();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_membership() {
        let both = Direction::IN | Direction::OUT;
        assert!(both.is_input() && both.is_output());
        assert!(Direction::IN.is_input() && !Direction::IN.is_output());
        assert!(!Direction::OUT.is_input());
    }

    #[test]
    fn args_with_selects_by_bit() {
        let f = Function::new("p")
            .arg(Argument::scalar("a", Direction::IN, "int32", "NUMBER"))
            .arg(Argument::scalar("b", Direction::OUT, "string", "VARCHAR2"))
            .arg(Argument::scalar("c", Direction::IN | Direction::OUT, "string", "VARCHAR2"));
        let ins: Vec<_> = f.args_with(Direction::IN).map(|a| a.name.as_str()).collect();
        let outs: Vec<_> = f.args_with(Direction::OUT).map(|a| a.name.as_str()).collect();
        assert_eq!(ins, ["a", "c"]);
        assert_eq!(outs, ["b", "c"]);
    }

    #[test]
    fn scalar_vs_composite() {
        assert!(Argument::scalar("x", Direction::IN, "int32", "NUMBER").is_scalar());
        let rec = Argument::record("r", Direction::IN, "", [Argument::scalar("x", Direction::IN, "int32", "")]);
        assert!(!rec.is_scalar());
        let tab = Argument::table("t", Direction::IN, "", None);
        assert!(!tab.is_scalar());
        assert!(tab.is_missing_table_of());
    }

    #[test]
    fn cursor_detection_covers_returns_and_out_args() {
        let cur = Argument::scalar("c", Direction::OUT, "", "ref cursor");
        assert!(Function::new("f").arg(cur.clone()).has_cursor_out());
        assert!(Function::new("f").returns(cur.clone()).has_cursor_out());
        let in_only = Argument { direction: Direction::IN, ..cur };
        assert!(!Function::new("f").arg(in_only).has_cursor_out());
    }

    #[test]
    fn direction_decodes_from_text_flags() {
        let arg: Argument = serde_json::from_str(r#"{"name":"x","direction":"IN | OUT"}"#).unwrap();
        assert_eq!(arg.direction, Direction::IN | Direction::OUT);
        assert_eq!(arg.flavor, Flavor::Simple);
    }
}
