//! Variable interpolation
//!
//! Replaces `${name}` references with variable values:
//! - `${name}` is replaced by the value of `name`, itself interpolated
//! - `${name:-default}` falls back to `default` (interpolated) when `name` is unknown
//! - `$${name}` is an escaped, literal `${name}`
//! - unknown references without a default are left as they are
//!
//! A value that refers back to a variable being resolved is an error.
//!
//! # Example
//! ```
//! use indexmap::IndexMap;
//! use jobdesc::substitution::substitute;
//!
//! let mut values = IndexMap::new();
//! values.insert("user".to_string(), "alice".to_string());
//! values.insert("home".to_string(), "/home/${user}".to_string());
//!
//! assert_eq!(substitute("${home}/${dir:-data}", &values).unwrap(), "/home/alice/data");
//! ```

use indexmap::IndexMap;
use log::debug;

use crate::error::JobError;

const DEFAULT_SEPARATOR: &str = ":-";

/// Interpolates every reference found in `input`.
pub fn substitute(input: &str, values: &IndexMap<String, String>) -> Result<String, JobError> {
    substitute_within(input, values, &[])
}

/// Interpolates every value of `map`, keeping its keys and order.
pub fn substitute_map(
    map: &IndexMap<String, String>,
    values: &IndexMap<String, String>,
) -> Result<IndexMap<String, String>, JobError> {
    let mut resolved = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        resolved.insert(key.clone(), substitute(value, values)?);
    }
    Ok(resolved)
}

/// Checks whether a string contains at least one unescaped reference.
pub fn has_references(text: &str) -> bool {
    let mut rest = text;
    while let Some(pos) = rest.find("${") {
        if pos > 0 && rest.as_bytes()[pos - 1] == b'$' {
            rest = &rest[pos + 2..];
            continue;
        }
        return rest[pos + 2..].contains('}');
    }
    false
}

/// `resolving` holds the names whose values are being expanded above us.
fn substitute_within(
    input: &str,
    values: &IndexMap<String, String>,
    resolving: &[&str],
) -> Result<String, JobError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("$${") {
            output.push_str("${");
            rest = &tail[3..];
            continue;
        }
        if !tail.starts_with("${") {
            output.push('$');
            rest = &tail[1..];
            continue;
        }

        let Some(end) = find_closing_brace(&tail[2..]) else {
            // Unterminated reference, kept verbatim
            output.push_str(tail);
            rest = "";
            break;
        };
        let expression = &tail[2..2 + end];
        let reference = &tail[..2 + end + 1];
        rest = &tail[2 + end + 1..];

        let (name, default) = match expression.find(DEFAULT_SEPARATOR) {
            Some(i) => (&expression[..i], Some(&expression[i + DEFAULT_SEPARATOR.len()..])),
            None => (expression, None),
        };

        if resolving.contains(&name) {
            return Err(JobError::InfiniteInterpolation(name.to_string()));
        }

        match (values.get(name), default) {
            (Some(value), _) => {
                let mut stack = resolving.to_vec();
                stack.push(name);
                output.push_str(&substitute_within(value, values, &stack)?);
            }
            (None, Some(fallback)) => {
                output.push_str(&substitute_within(fallback, values, resolving)?);
            }
            (None, None) => {
                debug!("No value for '{}', reference kept", name);
                output.push_str(reference);
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}

/// Byte offset of the `}` closing a reference body, skipping nested references.
fn find_closing_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }

    None
}
