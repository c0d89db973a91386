use std::collections::HashMap;

use tracing::{debug, warn};

/// Expand `KEY=VALUE` assignments in order.
///
/// Each entry is expanded against the current environment overlaid with the
/// entries already expanded before it, so `PATH=$JAVA_HOME/bin:$PATH` sees a
/// `JAVA_HOME` set earlier in the same list. The process environment itself
/// is never modified. Entries that have no `=` once expanded are skipped.
pub fn expand_env(assignments: &[String]) -> Vec<String> {
    let mut overlay: HashMap<String, String> = HashMap::new();
    let mut expanded = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        let entry = expand(assignment, |name| {
            overlay.get(name).cloned().or_else(|| {
                std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
            })
        });
        let Some((key, value)) = entry.split_once('=') else {
            warn!(entry = %assignment, "skipping environment entry without `=`");
            continue;
        };
        if key.is_empty() {
            warn!(entry = %assignment, "skipping environment entry with an empty name");
            continue;
        }
        debug!(from = %assignment, to = %entry, "expanded environment entry");
        overlay.insert(key.to_string(), value.to_string());
        expanded.push(entry);
    }

    expanded
}

const SPECIAL_NAMES: &str = "*#$@!?-";

/// Replace `$NAME` and `${NAME}` with `lookup(NAME)`, or nothing when the
/// lookup fails. A `$` that starts neither form is kept as is.
pub fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                    rest = &braced[end + 1..];
                }
                None => {
                    out.push('$');
                    rest = after;
                }
            }
            continue;
        }

        // Digits and shell specials such as `$1` or `$$` name one character.
        let name_len = match after.chars().next() {
            Some(c) if c.is_ascii_digit() || SPECIAL_NAMES.contains(c) => 1,
            _ => after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len()),
        };
        if name_len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..name_len]).unwrap_or_default());
        }
        rest = &after[name_len..];
    }

    out.push_str(rest);
    out
}
