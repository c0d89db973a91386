//! Environment of a running process.
//!
//! Linux and Windows answer the query directly. macOS has no such API, so
//! its platform layer feeds the line printed by `ps -Eww -o command` into
//! [`recover_environ`], which splits the command line from the environment
//! that follows it.

use crate::error::{Result, check_pid};
use crate::system::platform;

/// Arguments of JVM command lines (`--add-opens java.base/x=ALL-UNNAMED`)
/// look like assignments; tokens with this prefix stay in the argument phase.
const RUNTIME_PREFIX: &str = "java";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Arguments,
    Environment,
}

pub fn get_environ(pid: i32) -> Result<Vec<String>> {
    let pid = check_pid(pid)?;
    platform::process_environ(pid)
}

/// Rebuild `KEY=VALUE` entries from a command line that is immediately
/// followed by the process environment, everything separated by single
/// spaces.
///
/// The first token is the command and is dropped. Tokens are then skipped as
/// arguments until the first one that contains `=`, does not start with `-`
/// and does not start with `java`; from there on every token belongs to the
/// environment. A token followed by a token without `=` opens a value that
/// contains spaces; words are appended until a token with `=` follows. A
/// final token without `=` is appended to the value before it.
///
/// This is a heuristic. Argument lists with assignment-looking tokens that
/// do not start with `-` end the argument phase early, and such arguments
/// are then reported as environment entries.
pub fn recover_environ(line: &str) -> Vec<String> {
    let mut envs = Vec::new();
    let Some((_command, mut rest)) = line.split_once(' ') else {
        return envs;
    };
    let mut phase = Phase::Arguments;
    let mut value = String::new();

    loop {
        let Some((token, after)) = rest.split_once(' ') else {
            // last token on the line
            if phase == Phase::Environment || !is_argument(rest) {
                if value.is_empty() || is_assignment(rest) {
                    envs.push(rest.to_string());
                } else {
                    push_word(&mut value, rest);
                    envs.push(value);
                }
            }
            break;
        };

        if phase == Phase::Arguments {
            if is_argument(token) {
                rest = after;
                continue;
            }
            phase = Phase::Environment;
        }

        let (next, remainder) = match after.split_once(' ') {
            Some((next, remainder)) => (next, Some(remainder)),
            None => (after, None),
        };

        if is_assignment(next) {
            push_word(&mut value, token);
            envs.push(std::mem::take(&mut value));
            rest = after;
            continue;
        }

        // `next` continues the value of `token`
        push_word(&mut value, token);
        push_word(&mut value, next);
        let Some(remainder) = remainder else {
            envs.push(value);
            break;
        };
        rest = remainder;
        if is_assignment(first_word(remainder)) {
            envs.push(std::mem::take(&mut value));
        }
    }

    envs
}

fn is_assignment(token: &str) -> bool {
    token.contains('=')
}

fn is_argument(token: &str) -> bool {
    token.starts_with('-') || token.starts_with(RUNTIME_PREFIX) || !is_assignment(token)
}

fn first_word(s: &str) -> &str {
    s.split(' ').next().unwrap_or(s)
}

fn push_word(value: &mut String, word: &str) {
    if !value.is_empty() {
        value.push(' ');
    }
    value.push_str(word);
}
