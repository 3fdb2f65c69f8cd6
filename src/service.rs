//! Service emitter: drives the schema emitter over every function and
//! assembles the complete schema file.
use std::io;

use tracing::{debug, warn};

use crate::emitter::{self, Side};
use crate::error::EmitError;
use crate::model::Function;
use crate::naming;
use crate::registry::DedupRegistry;
use crate::type_map::TypeMapOptions;

pub const SYNTAX: &str = "proto3";
/// Imported in gogo-compatible mode for the `gogoproto.*` field options.
pub const GOGO_IMPORT: &str = "github.com/gogo/protobuf/gogoproto/gogo.proto";
const DEFAULT_SERVICE_NAME: &str = "Service";

// ------------------------------- Options ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    pub package: Option<String>,
    /// Defaults to the title-cased package.
    pub service_name: Option<String>,
    /// Extended mode: import gogoproto and emit its field options.
    pub gogo: bool,
    pub numbers_as_strings: bool,
    /// Drop functions with missing TableOf metadata instead of failing.
    pub skip_missing_table_of: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            package: None,
            service_name: None,
            gogo: true,
            numbers_as_strings: false,
            skip_missing_table_of: true,
        }
    }
}

impl SchemaOptions {
    pub fn type_map(&self) -> TypeMapOptions {
        TypeMapOptions { gogo: self.gogo, numbers_as_strings: self.numbers_as_strings }
    }

    fn package(&self) -> Option<&str> {
        self.package.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn service_name(&self) -> String {
        if let Some(name) = self.service_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_owned();
        }
        self.package()
            .map(|pkg| naming::title_case(&naming::flatten_qualified(pkg)))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_owned())
    }
}

// ------------------------------- Report ----------------------------------- //

/// What one schema run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Functions that got an RPC, in output order.
    pub emitted: Vec<String>,
    /// Functions dropped under the skip policy.
    pub skipped: Vec<String>,
    /// Distinct nested messages defined.
    pub nested_messages: usize,
}

// ------------------------------- Emission --------------------------------- //

/// Writes the full schema for `functions` (expected sorted) to `dst`.
///
/// A function whose argument tree lacks TableOf metadata is either dropped
/// entirely (skip policy on) or aborts the run (skip policy off).
pub fn write_schema<W>(dst: &mut W, functions: &[Function], options: &SchemaOptions) -> Result<SchemaReport, EmitError>
where
    W: io::Write + ?Sized,
{
    write_header(dst, options)?;

    let mut registry = DedupRegistry::new();
    let mut report = SchemaReport::default();
    let mut rpcs = Vec::with_capacity(functions.len());
    for function in functions {
        match emitter::emit_function(function, &mut registry, options.type_map(), dst) {
            Ok(()) => {}
            Err(error) if error.is_missing_table_of() && options.skip_missing_table_of => {
                warn!(function = %function.name.to_lowercase(), %error, "skip function, missing TableOf info");
                report.skipped.push(function.name.clone());
                continue;
            }
            Err(error) => return Err(error),
        }
        rpcs.push(rpc_entry(function));
        report.emitted.push(function.name.clone());
    }

    write!(dst, "\nservice {} {{\n", options.service_name())?;
    for rpc in &rpcs {
        dst.write_all(rpc.as_bytes())?;
    }
    dst.write_all(b"}\n")?;

    report.nested_messages = registry.len();
    debug!(
        emitted = report.emitted.len(),
        skipped = report.skipped.len(),
        nested = report.nested_messages,
        "schema written"
    );
    Ok(report)
}

fn write_header<W>(dst: &mut W, options: &SchemaOptions) -> io::Result<()>
where
    W: io::Write + ?Sized,
{
    write!(dst, "syntax = \"{SYNTAX}\";\n\n")?;
    if let Some(package) = options.package() {
        writeln!(dst, "package {package};")?;
    }
    if options.gogo {
        write!(dst, "\nimport \"{GOGO_IMPORT}\";\n")?;
    }
    Ok(())
}

/// Doc comment (if any) and `rpc` line of one function, tab-indented.
fn rpc_entry(function: &Function) -> String {
    let mut entry = String::new();
    if let Some(doc) = function.documentation.as_deref().filter(|d| !d.trim().is_empty()) {
        for line in doc.lines() {
            entry.push_str("\t/// ");
            entry.push_str(line);
            entry.push('\n');
        }
    }
    let stream = if function.has_cursor_out() { "stream " } else { "" };
    entry.push_str(&format!(
        "\trpc {} ({}) returns ({stream}{}) {{}}\n",
        naming::method_name(&function.name),
        Side::Input.message_name(function),
        Side::Output.message_name(function),
    ));
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Argument, Direction};
    use pretty_assertions::assert_eq;

    fn render(functions: &[Function], options: &SchemaOptions) -> Result<(String, SchemaReport), EmitError> {
        let mut buf = Vec::new();
        let report = write_schema(&mut buf, functions, options)?;
        Ok((String::from_utf8(buf).unwrap(), report))
    }

    fn get_emp() -> Function {
        Function::new("get_emp")
            .arg(Argument::scalar("p_id", Direction::IN, "int32", "PLS_INTEGER"))
            .arg(Argument::record(
                "p_emp",
                Direction::OUT,
                "",
                [
                    Argument::scalar("name", Direction::OUT, "string", "VARCHAR2"),
                    Argument::scalar("salary", Direction::OUT, "float64", "NUMBER"),
                ],
            ))
    }

    fn broken() -> Function {
        Function::new("broken")
            .arg(Argument::scalar("p_in", Direction::IN, "string", "VARCHAR2"))
            .arg(Argument::table("p_tab", Direction::OUT, "", None))
    }

    #[test]
    fn get_emp_full_schema() {
        let options = SchemaOptions { package: Some("hr".into()), gogo: false, ..SchemaOptions::default() };
        let (text, report) = render(&[get_emp()], &options).unwrap();
        assert_eq!(
            text,
            "syntax = \"proto3\";\n\
             \n\
             package hr;\n\
             \n\
             message GetEmpInput {\n\
             \t// PLS_INTEGER\n\
             \tsint32 p_id = 1;\n\
             }\n\
             \n\
             message GetEmpOutput {\n\
             \tPEmpRekTyp p_emp = 1;\n\
             }\n\
             \n\
             message PEmpRekTyp {\n\
             \t// VARCHAR2\n\
             \tstring name = 1;\n\
             \t// NUMBER\n\
             \tdouble salary = 2;\n\
             }\n\
             \n\
             service Hr {\n\
             \trpc GetEmp (GetEmpInput) returns (GetEmpOutput) {}\n\
             }\n"
        );
        assert_eq!(report.emitted, ["get_emp"]);
        assert_eq!(report.nested_messages, 1);
    }

    #[test]
    fn skip_policy_on_drops_whole_function() {
        let (text, report) = render(&[broken(), get_emp()], &SchemaOptions::default()).unwrap();
        assert!(!text.contains("Broken"), "{text}");
        assert!(!text.contains("p_in"));
        assert_eq!(report.skipped, ["broken"]);
        assert_eq!(text.matches("\trpc ").count(), 1);
    }

    #[test]
    fn skip_policy_off_aborts_run() {
        let options = SchemaOptions { skip_missing_table_of: false, ..SchemaOptions::default() };
        let err = render(&[get_emp(), broken()], &options).unwrap_err();
        assert_eq!(err.to_string(), "no table of data for BrokenOutput.p_tab");
    }

    #[test]
    fn skipped_function_does_not_orphan_shared_record() {
        // `broken` would register the record on its input side, then fail.
        let rec = || Argument::record(
            "p_emp",
            Direction::IN,
            "",
            [Argument::scalar("name", Direction::IN, "string", "VARCHAR2")],
        );
        let broken = Function::new("a_broken")
            .arg(rec())
            .arg(Argument::table("p_tab", Direction::OUT, "", None));
        let ok = Function::new("b_ok").arg(rec());
        let (text, _) = render(&[broken, ok], &SchemaOptions::default()).unwrap();
        assert_eq!(text.matches("message PEmpRekTyp {").count(), 1);
    }

    #[test]
    fn cursor_output_streams_and_docs_are_prefixed() {
        let f = Function::new("pkg.list_emps")
            .arg(Argument::scalar("p_cur", Direction::OUT, "", "REF CURSOR"))
            .documentation("Lists employees.\nOrdered by id.");
        let (text, _) = render(&[f], &SchemaOptions::default()).unwrap();
        assert!(text.contains(
            "service Service {\n\
             \t/// Lists employees.\n\
             \t/// Ordered by id.\n\
             \trpc PkgListEmps (PkgListEmpsInput) returns (stream PkgListEmpsOutput) {}\n\
             }\n"
        ), "{text}");
    }

    #[test]
    fn gogo_mode_adds_import_and_tags() {
        let f = Function::new("f").arg(Argument::scalar("amount", Direction::IN, "float64", "NUMBER"));
        let options = SchemaOptions { numbers_as_strings: true, ..SchemaOptions::default() };
        let (text, _) = render(&[f], &options).unwrap();
        assert!(text.starts_with(
            "syntax = \"proto3\";\n\n\nimport \"github.com/gogo/protobuf/gogoproto/gogo.proto\";\n"
        ));
        assert!(text.contains("\tdouble amount = 1 [(gogoproto.jsontag)=\"amount,string,omitempty\"];\n"));
    }

    #[test]
    fn default_options_import_gogo_for_decimal_tags() {
        let f = Function::new("f").arg(Argument::scalar("price", Direction::IN, "goracle.Number", "NUMBER"));
        let (text, _) = render(&[f], &SchemaOptions::default()).unwrap();
        assert!(text.contains("\tstring price = 1 [(gogoproto.jsontag)=\"price,omitempty\"];\n"), "{text}");
        assert!(text.contains(&format!("import \"{GOGO_IMPORT}\";")), "{text}");
    }

    #[test]
    fn plain_mode_has_neither_import_nor_gogo_options() {
        let f = Function::new("f").arg(Argument::scalar("price", Direction::IN, "goracle.Number", "NUMBER"));
        let options = SchemaOptions { gogo: false, numbers_as_strings: true, ..SchemaOptions::default() };
        let (text, _) = render(&[f], &options).unwrap();
        assert!(!text.contains("import"), "{text}");
        assert!(!text.contains("gogoproto"), "{text}");
        assert!(text.contains("\tstring price = 1;\n"));
    }

    #[test]
    fn service_lists_exactly_surviving_functions_and_blocks_balance() {
        let fs = [broken(), get_emp(), Function::new("ping")];
        let (text, report) = render(&fs, &SchemaOptions::default()).unwrap();
        assert_eq!(report.emitted, ["get_emp", "ping"]);
        assert_eq!(text.matches("\trpc ").count(), 2);
        assert_eq!(text.matches('{').count(), text.matches('}').count());
    }

    #[test]
    fn service_name_fallbacks() {
        assert_eq!(SchemaOptions::default().service_name(), "Service");
        let pkg = SchemaOptions { package: Some("my_db.api".into()), ..SchemaOptions::default() };
        assert_eq!(pkg.service_name(), "MyDbApi");
        let named = SchemaOptions { service_name: Some("Calls".into()), ..pkg };
        assert_eq!(named.service_name(), "Calls");
    }
}
