//! Loading and selecting harvested function descriptions.
//!
//! Each input document is JSON holding either one function object or an
//! array of them; decoding errors point at the offending JSON path.
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::InputError;
use crate::model::Function;

// ————————————————————————————————————————————————————————————————————————————
// DECODING
// ————————————————————————————————————————————————————————————————————————————

/// Deserialize with JSON-path context in error messages.
fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, (String, String)> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        (path, err.into_inner().to_string())
    })
}

/// Decodes one harvested document. `path` is only used for error context.
pub fn parse_functions(source: &str, path: &Path) -> Result<Vec<Function>, InputError> {
    let decode_error = |(at, message): (String, String)| InputError::Decode {
        path: path.to_path_buf(),
        at,
        message,
    };
    let value: Value = serde_json::from_str(source)
        .map_err(|err| decode_error((".".to_owned(), err.to_string())))?;
    let mut functions = if value.is_array() {
        from_value_with_path::<Vec<Function>>(value).map_err(decode_error)?
    } else {
        vec![from_value_with_path::<Function>(value).map_err(decode_error)?]
    };
    for function in &mut functions {
        function.adopt_field_names();
    }
    Ok(functions)
}

/// Reads every file the patterns resolve to, concatenating their functions.
pub fn load_functions<I>(patterns: I) -> Result<Vec<Function>, InputError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut functions = Vec::new();
    for path in resolve_file_path_patterns(patterns)? {
        let source = std::fs::read_to_string(&path)
            .map_err(|source| InputError::Read { path: path.clone(), source })?;
        let found = parse_functions(&source, &path)?;
        debug!(file = %path.display(), functions = found.len(), "loaded harvested functions");
        functions.extend(found);
    }
    Ok(functions)
}

// ————————————————————————————————————————————————————————————————————————————
// SELECTION
// ————————————————————————————————————————————————————————————————————————————

/// Splits a `--except` style list on commas and whitespace.
pub fn parse_name_list(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Drops excepted functions (case-insensitive) and sorts the rest by name.
pub fn select_functions(mut functions: Vec<Function>, except: &[String]) -> Vec<Function> {
    functions.retain(|f| !except.iter().any(|e| e.eq_ignore_ascii_case(&f.name)));
    functions.sort_by(|a, b| a.name.cmp(&b.name));
    functions
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, InputError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let entries = glob::glob(pattern).map_err(|source| InputError::Pattern {
                pattern: pattern.to_owned(),
                source,
            })?;
            let before = out.len();
            for entry in entries {
                out.push(entry?);
            }
            if out.len() == before {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(InputError::NoMatch(pattern.to_owned()));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
