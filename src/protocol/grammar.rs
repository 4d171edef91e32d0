//! Canonical text form of commands.
//!
//! `build` and `parse` are pure text↔structure mappings with no I/O. For
//! every valid command `c`, `parse(&build(&c))` reproduces `c` exactly;
//! `build(&parse(x)?)` is a normalizing round trip.

use serde_json::Value;

use super::command::{Command, Path};
use crate::error::{GateError, GateResult};

/// Renders a command in its canonical wire form:
///
/// ```text
/// <operation>(<entityType>)
/// [values(<comma-or-JSON-serialized-values>)]
/// on(<database>[.<namespace>[.<entity>]])
/// ```
pub fn build(command: &Command) -> String {
    let mut text = format!("{}({})", command.operation, command.entity_type);
    if let Some(values) = &command.values {
        let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
        text.push_str("\nvalues(");
        text.push_str(&rendered.join(", "));
        text.push(')');
    }
    text.push_str("\non(");
    text.push_str(&command.path.to_string());
    text.push(')');
    text
}

/// Parses command text into a [`Command`].
///
/// The first non-blank line must be `<operation>(<entityType>)` with both
/// drawn from the closed sets; `values(...)` is rejected for `view` and
/// `drop`; an `on(...)` line is required. Anything else is a syntax error.
pub fn parse(text: &str) -> GateResult<Command> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| GateError::Syntax("empty command text".to_string()))?;
    let (operation, entity_type) = parse_header(header)?;

    let mut values = None;
    let mut seen_values = false;
    let mut path = None;
    for line in lines {
        if let Some(inner) = enclosed(line, "values") {
            if seen_values {
                return Err(GateError::Syntax("duplicate values(...) line".to_string()));
            }
            seen_values = true;
            if !operation.takes_values() {
                return Err(GateError::Syntax(format!(
                    "{operation} commands do not take a values payload"
                )));
            }
            values = parse_values(inner)?;
        } else if let Some(inner) = enclosed(line, "on") {
            if path.is_some() {
                return Err(GateError::Syntax("duplicate on(...) line".to_string()));
            }
            path = Some(Path::from_dotted(inner)?);
        } else {
            return Err(GateError::Syntax(format!(
                "unrecognized command line: {line}"
            )));
        }
    }

    let path = path.ok_or_else(|| GateError::Syntax("missing on(...) line".to_string()))?;
    Command::new(operation, entity_type, values, path)
}

fn parse_header(header: &str) -> GateResult<(super::Operation, super::EntityType)> {
    let malformed = || GateError::Syntax(format!("malformed command header: {header}"));
    let (operation, rest) = header.split_once('(').ok_or_else(malformed)?;
    let entity_type = rest.strip_suffix(')').ok_or_else(malformed)?;
    Ok((operation.trim().parse()?, entity_type.trim().parse()?))
}

/// Returns the text between `<keyword>(` and the final `)` of the line.
fn enclosed<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.strip_prefix(keyword)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_values(inner: &str) -> GateResult<Option<Vec<Value>>> {
    if inner.trim().is_empty() {
        return Ok(None);
    }
    let parsed: Vec<Value> = serde_json::from_str(&format!("[{inner}]"))
        .map_err(|e| GateError::Syntax(format!("malformed values payload: {e}")))?;
    Ok(Some(parsed))
}
