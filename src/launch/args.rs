use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unterminated {0} quote in argument string")]
pub struct UnterminatedQuote(pub char);

/// Split an argument string into words the way a POSIX shell would,
/// without any expansion.
///
/// Single quotes keep everything literally. Inside double quotes a backslash
/// only escapes `"`, `\`, `$` and `` ` ``. Outside quotes a backslash escapes
/// the next character.
pub fn split_args(input: &str) -> Result<Vec<String>, UnterminatedQuote> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    word.push(c);
                }
            }
            Some(_) => match c {
                '"' => quote = None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\' | '$' | '`')) => word.push(next),
                    Some('\n') => {}
                    Some(next) => {
                        word.push('\\');
                        word.push(next);
                    }
                    None => return Err(UnterminatedQuote('"')),
                },
                _ => word.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                '\\' => {
                    match chars.next() {
                        Some('\n') => {}
                        Some(next) => word.push(next),
                        None => word.push('\\'),
                    }
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut word));
                        in_word = false;
                    }
                }
                _ => {
                    word.push(c);
                    in_word = true;
                }
            },
        }
    }

    if let Some(q) = quote {
        return Err(UnterminatedQuote(q));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words() {
        assert_eq!(split_args("-l  ..").unwrap(), vec!["-l", ".."]);
        assert!(split_args("   ").unwrap().is_empty());
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            split_args(r#"-c 'echo "a b"' --name="my service""#).unwrap(),
            vec!["-c", r#"echo "a b""#, "--name=my service"]
        );
        assert_eq!(split_args(r#"'' """#).unwrap(), vec!["", ""]);
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(split_args(r"a\ b c").unwrap(), vec!["a b", "c"]);
        assert_eq!(split_args(r#""say \"hi\" \n""#).unwrap(), vec![r#"say "hi" \n"#]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(split_args("'oops"), Err(UnterminatedQuote('\'')));
        assert_eq!(split_args(r#"x "oops"#), Err(UnterminatedQuote('"')));
    }
}
