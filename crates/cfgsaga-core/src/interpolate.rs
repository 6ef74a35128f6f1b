//! # Environment Variable Interpolation
//!
//! Shell-style `${NAME}` expansion with `${NAME:-default}` fallback, applied
//! to middleware output paths before resource-conflict detection. An unset
//! variable with no fallback expands to the empty string, matching common
//! shell behavior rather than failing construction outright.

/// Expand `${NAME}` and `${NAME:-default}` references in `input` against
/// the process environment.
pub fn expand(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand `${NAME}` and `${NAME:-default}` references in `input` using a
/// caller-supplied lookup function. Exposed separately so tests can exercise
/// expansion without mutating the real process environment.
pub fn expand_with<F>(input: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(close) = input[i + 2..].find('}') {
                let body = &input[i + 2..i + 2 + close];
                let (name, default) = match body.find(":-") {
                    Some(at) => (&body[..at], Some(&body[at + 2..])),
                    None => (body, None),
                };
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(default.unwrap_or("")),
                }
                i += 2 + close + 1;
                continue;
            }
        }
        let ch = input[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl FnMut(&str) -> Option<String> {
        move |name| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn test_plain_substitution() {
        let out = expand_with("/var/log/${SERVICE}.log", env(&[("SERVICE", "echo1")]));
        assert_eq!(out, "/var/log/echo1.log");
    }

    #[test]
    fn test_fallback_when_unset() {
        let out = expand_with("/var/log/${SERVICE:-default}.log", env(&[]));
        assert_eq!(out, "/var/log/default.log");
    }

    #[test]
    fn test_unset_no_fallback_is_empty() {
        let out = expand_with("${MISSING}path", env(&[]));
        assert_eq!(out, "path");
    }

    #[test]
    fn test_multiple_references() {
        let out = expand_with(
            "${A}-${B:-b}",
            env(&[("A", "x")]),
        );
        assert_eq!(out, "x-b");
    }

    #[test]
    fn test_no_references_is_unchanged() {
        assert_eq!(expand_with("/var/log/static.log", env(&[])), "/var/log/static.log");
    }
}
