//! Enumerator recovery from raw source text.
//!
//! An enum documented across several blocks leaves its enumerators in the
//! raw source between those blocks, possibly without `\value` commands of
//! their own. This scanner recovers their names: strip comments, find the
//! `enum` keyword, skip an optional name, require a `{`, and collect the
//! comma-separated run of bare identifiers inside the brace pair.
//!
//! Collection stops at the first token that breaks the identifier-comma
//! rhythm (an `=` initializer, for instance), and at the first `}`; brace
//! matching is deliberately non-nested, as enum bodies cannot nest.

/// Recover enumerator names from the raw source span of an enum declaration.
///
/// Returns an empty vector when no `enum { ... }` shape is found; the
/// caller treats an empty result as nothing to merge.
pub fn recover_enumerators(source: &str) -> Vec<String> {
    let stripped = strip_comments(source);
    let mut tokens = tokenize(&stripped).into_iter().peekable();
    while let Some(token) = tokens.next() {
        if token != "enum" {
            continue;
        }
        // `enum class Name` and `enum Name` both land on the `{` after at
        // most two identifiers.
        let mut skipped = 0;
        while skipped < 2 && matches!(tokens.peek(), Some(t) if is_identifier(t)) {
            tokens.next();
            skipped += 1;
        }
        if tokens.next().as_deref() != Some("{") {
            continue;
        }
        let mut names = Vec::new();
        let mut expect_identifier = true;
        for token in tokens.by_ref() {
            if token == "}" {
                break;
            }
            match (expect_identifier, is_identifier(&token)) {
                (true, true) => {
                    names.push(token);
                    expect_identifier = false;
                }
                (false, _) if token == "," => expect_identifier = true,
                // The rhythm broke: an initializer or other construct.
                _ => break,
            }
        }
        return names;
    }
    Vec::new()
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for d in chars.by_ref() {
                        if d == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for d in chars.by_ref() {
                        if prev == '*' && d == '/' {
                            break;
                        }
                        prev = d;
                    }
                    // Keep token separation across the removed comment.
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphanumeric() || c == '_' {
            let mut word = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    word.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(word);
        } else {
            chars.next();
            tokens.push(c.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! recovery_tests {
        ($( ($name: ident, $input: expr, $want: expr), )+) => {
            $(
            #[test]
            fn $name() {
                let got = recover_enumerators($input);
                let want: Vec<&str> = $want;
                assert_eq!(got, want);
            }
            )+
        };
    }

    recovery_tests![
        (
            named_enum,
            "enum Corner { NorthWest, NorthEast, SouthWest, SouthEast };",
            vec!["NorthWest", "NorthEast", "SouthWest", "SouthEast"]
        ),
        (unnamed_enum, "enum { A, B };", vec!["A", "B"]),
        (enum_class, "enum class Color { Red, Green };", vec!["Red", "Green"]),
        (trailing_comma, "enum E { A, B, };", vec!["A", "B"]),
        (
            initializer_stops_collection,
            "enum E { A = 1, B };",
            vec!["A"]
        ),
        (no_enum, "struct S { int x; };", vec![]),
        (enum_without_body, "enum E;", vec![]),
        (
            comments_are_stripped,
            "enum E { A, /* B, */ C, // D,\n E };",
            vec!["A", "C", "E"]
        ),
        (
            enum_after_other_code,
            "int x = 0;\nenum Corner { NorthWest, NorthEast };",
            vec!["NorthWest", "NorthEast"]
        ),
        (
            line_comment_with_enum_word,
            "// the enum below\nenum E { A };",
            vec!["A"]
        ),
    ];
}
