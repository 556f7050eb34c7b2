//! Shell-style command line splitting
//!
//! Follows POSIX shell word splitting for the subset that matters when
//! launching a program directly: blanks separate words, single quotes are
//! literal, double quotes honour `\$`, `` \` ``, `\"`, `\\` and
//! backslash-newline, a backslash outside quotes escapes the next character,
//! and `#` at the start of a word comments out the rest of the line.
//! No expansion of any kind is performed.

use crate::types::ArgvError;

/// Split a command line into an argument vector
pub fn split(command: &str) -> Result<Vec<String>, ArgvError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = command.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            ' ' | '\t' | '\n' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '#' if !in_word => {
                while chars.next_if(|&(_, c)| c != '\n').is_some() {}
            }
            '\\' => match chars.next() {
                Some((_, '\n')) => {}
                Some((_, escaped)) => {
                    word.push(escaped);
                    in_word = true;
                }
                None => return Err(ArgvError::TrailingBackslash),
            },
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, literal)) => word.push(literal),
                        None => return Err(ArgvError::UnterminatedSingleQuote(pos)),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, '\n')) => {}
                            Some((_, escaped @ ('$' | '`' | '"' | '\\'))) => word.push(escaped),
                            Some((_, other)) => {
                                word.push('\\');
                                word.push(other);
                            }
                            None => return Err(ArgvError::UnterminatedDoubleQuote(pos)),
                        },
                        Some((_, literal)) => word.push(literal),
                        None => return Err(ArgvError::UnterminatedDoubleQuote(pos)),
                    }
                }
            }
            _ => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        words.push(word);
    }

    if words.is_empty() {
        return Err(ArgvError::Empty);
    }

    Ok(words)
}

/// Quote a string so that [`split`] yields it back as a single word
pub fn quote(word: &str) -> String {
    let is_plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if is_plain {
        return word.to_string();
    }

    format!("'{}'", word.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(command: &str) -> Vec<String> {
        split(command).unwrap()
    }

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            words("/usr/libexec/helper --uid 1000 --pid 42"),
            ["/usr/libexec/helper", "--uid", "1000", "--pid", "42"]
        );
        assert_eq!(words("  a \t b\n c  "), ["a", "b", "c"]);
    }

    #[test]
    fn test_split_quotes() {
        assert_eq!(words(r#"echo 'a b' "c d""#), ["echo", "a b", "c d"]);
        assert_eq!(words(r#"x'y'"z""#), ["xyz"]);
        assert_eq!(words(r#"echo '' """#), ["echo", "", ""]);
        assert_eq!(words(r#"echo '$HOME \n'"#), ["echo", r"$HOME \n"]);
    }

    #[test]
    fn test_split_escapes() {
        assert_eq!(words(r"a\ b c"), ["a b", "c"]);
        assert_eq!(words(r#"echo "a \"q\" \$x \n""#), ["echo", r#"a "q" $x \n"#]);
        assert_eq!(words("a\\\nb"), ["ab"]);
    }

    #[test]
    fn test_split_comments() {
        assert_eq!(words("helper # trailing comment\n--uid"), ["helper", "--uid"]);
        assert_eq!(words("a#b"), ["a#b"]);
    }

    #[test]
    fn test_split_errors() {
        assert_eq!(split(""), Err(ArgvError::Empty));
        assert_eq!(split("   # only a comment"), Err(ArgvError::Empty));
        assert_eq!(split("echo 'open"), Err(ArgvError::UnterminatedSingleQuote(5)));
        assert_eq!(split("echo \"open"), Err(ArgvError::UnterminatedDoubleQuote(5)));
        assert_eq!(split("echo \\"), Err(ArgvError::TrailingBackslash));
    }

    #[test]
    fn test_quote_survives_split() {
        for word in ["plain", "/tmp/with space/helper.sh", "it's", "", "$(rm)"] {
            let command = format!("run {}", quote(word));
            assert_eq!(words(&command), ["run", word]);
        }
        assert_eq!(quote("/usr/bin/env"), "/usr/bin/env");
    }
}
