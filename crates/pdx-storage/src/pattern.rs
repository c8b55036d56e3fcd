//! SQL LIKE matching.
//!
//! `%` matches any run of characters, `_` matches exactly one, and `\`
//! escapes either. Matching ignores case.

/// Returns true if `value` matches the LIKE `pattern`, ignoring case.
#[must_use]
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().flat_map(char::to_lowercase).collect();
    let pattern = tokenize(&pattern.to_lowercase());
    matches(&value, &pattern)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Char(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Char(chars.next().unwrap_or('\\')),
            c => Token::Char(c),
        });
    }
    tokens
}

/// Greedy scan that falls back to the most recent `%` on a mismatch, so
/// each `%` only ever resumes one position further along the value.
fn matches(value: &[char], pattern: &[Token]) -> bool {
    let (mut v, mut p) = (0, 0);
    // pattern index after the last `%`, and the value index it resumes from
    let mut resume: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some(Token::Any) => {
                p += 1;
                resume = Some((p, v));
            }
            Some(Token::One) => {
                p += 1;
                v += 1;
            }
            Some(Token::Char(c)) if *c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match resume {
                Some((after_any, from)) => {
                    p = after_any;
                    v = from + 1;
                    resume = Some((after_any, from + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&t| t == Token::Any)
}
