//! Schema emitter: one function's argument trees → flat message definitions.
//!
//! Every function yields an `<Name>Input` and an `<Name>Output` message.
//! Composite arguments (records, tables of records, tables of tables) are
//! flattened into their own messages, written after the message that first
//! references them. Names already in the [`DedupRegistry`] are only
//! referenced, never defined twice.
use std::fmt::Write as _;
use std::io;

use tracing::debug;

use crate::error::EmitError;
use crate::model::{Argument, Direction, Function};
use crate::naming;
use crate::registry::DedupRegistry;
use crate::type_map::{self, TypeMapOptions};

// ------------------------------- Sides ------------------------------------ //

/// One call direction of a function, emitted as its own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Input, Side::Output];

    pub fn direction(self) -> Direction {
        match self {
            Side::Input => Direction::IN,
            Side::Output => Direction::OUT,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Side::Input => "input",
            Side::Output => "output",
        }
    }

    /// Message name of this side of `function`.
    pub fn message_name(self, function: &Function) -> String {
        naming::message_name(&function.name, self.suffix())
    }

    /// Arguments this side carries: matching direction in call order, then
    /// the return value for the output side.
    pub fn arguments(self, function: &Function) -> Vec<&Argument> {
        let mut args: Vec<&Argument> = function.args_with(self.direction()).collect();
        if self == Side::Output {
            args.extend(function.returns.as_deref());
        }
        args
    }
}

// ------------------------------- Emission --------------------------------- //

/// Writes both messages of `function` (and any nested messages they pull
/// in) to `sink`.
///
/// The text is assembled completely before anything reaches `sink`. On
/// failure nothing is written and the registry is restored, so names the
/// failed function would have introduced stay available to later ones.
pub fn emit_function<W>(
    function: &Function,
    registry: &mut DedupRegistry,
    types: TypeMapOptions,
    sink: &mut W,
) -> Result<(), EmitError>
where
    W: io::Write + ?Sized,
{
    let checkpoint = registry.checkpoint();
    let text = match render_function(function, registry, types) {
        Ok(text) => text,
        Err(error) => {
            registry.rollback(checkpoint);
            return Err(error);
        }
    };
    sink.write_all(text.as_bytes())?;
    Ok(())
}

fn render_function(
    function: &Function,
    registry: &mut DedupRegistry,
    types: TypeMapOptions,
) -> Result<String, EmitError> {
    let mut emitter = MessageEmitter { registry, types };
    let mut out = String::new();
    for side in Side::ALL {
        emitter.write_message(&mut out, &side.message_name(function), &side.arguments(function))?;
    }
    Ok(out)
}

struct MessageEmitter<'r> {
    registry: &'r mut DedupRegistry,
    types: TypeMapOptions,
}

impl MessageEmitter<'_> {
    /// `message <name> { ... }` followed by the nested messages it introduced.
    fn write_message(&mut self, out: &mut String, name: &str, args: &[&Argument]) -> Result<(), EmitError> {
        if let Some(arg) = args.iter().find(|arg| arg.is_missing_table_of()) {
            return Err(EmitError::MissingTableOf {
                message: name.to_owned(),
                argument: arg.name.clone(),
            });
        }

        let mut nested = String::new();
        write!(out, "\nmessage {name} {{\n")?;
        for (i, arg) in args.iter().enumerate() {
            self.write_field(out, &mut nested, arg, i + 1)?;
        }
        out.push_str("}\n");
        out.push_str(&nested);
        Ok(())
    }

    fn write_field(
        &mut self,
        out: &mut String,
        nested: &mut String,
        arg: &Argument,
        number: usize,
    ) -> Result<(), EmitError> {
        let field = naming::field_name(&arg.name);
        let (repeated, descriptor) = normalize_descriptor(arg, &field);
        let (wire, options) = type_map::map_type(&descriptor, &field, self.types);
        let rule = if repeated { "repeated " } else { "" };
        let options = if options.is_empty() { String::new() } else { format!(" {options}") };

        let element_is_scalar = arg.table_of.as_deref().is_some_and(Argument::is_scalar);
        if arg.is_scalar() || (arg.is_table() && element_is_scalar) {
            writeln!(out, "\t// {}", arg.abs_type)?;
            writeln!(out, "\t{rule}{wire} {field} = {number}{options};")?;
            return Ok(());
        }

        let typ = naming::title_case(&naming::flatten_qualified(&wire));
        if self.registry.contains(&typ) {
            debug!(message = %typ, field = %field, "nested message already emitted");
        } else {
            debug!(message = %typ, field = %field, "emitting nested message");
            let members = members_of(arg);
            self.write_message(nested, &typ, &members)?;
            self.registry.insert(typ.clone());
        }
        writeln!(out, "\t{rule}{typ} {field} = {number}{options};")?;
        Ok(())
    }
}

/// Strips indirection/multi-value markers from the argument's descriptor.
///
/// Returns whether the field is repeated and the bare descriptor; an empty
/// descriptor becomes the placeholder record type named after the field.
fn normalize_descriptor(arg: &Argument, field: &str) -> (bool, String) {
    let mut descriptor = arg.type_name.trim();
    descriptor = descriptor.strip_prefix('*').unwrap_or(descriptor);
    let mut repeated = arg.is_table();
    if let Some(rest) = descriptor.strip_prefix("[]") {
        repeated = true;
        descriptor = rest;
    }
    descriptor = descriptor.strip_prefix('*').unwrap_or(descriptor);
    if descriptor.is_empty() {
        return (repeated, naming::placeholder_type_name(field));
    }
    (repeated, descriptor.to_owned())
}

/// Members of the message a composite argument flattens into.
fn members_of(arg: &Argument) -> Vec<&Argument> {
    match arg.table_of.as_deref() {
        Some(element) if element.record_of.is_empty() => vec![element],
        Some(element) => element.record_of.values().collect(),
        None => arg.record_of.values().collect(),
    }
}
