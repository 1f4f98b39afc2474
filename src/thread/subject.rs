//! Subject normalization: the grouping key of a conversation.

/// Which family a subject prefix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Reply,
    Forward,
}

/// Reply prefixes: English `Re`, German `AW`, Scandinavian `SV`.
const REPLY_PREFIXES: [&str; 3] = ["re", "aw", "sv"];

/// Forward prefixes: `Fwd`, `FW`, German `WG`.
const FORWARD_PREFIXES: [&str; 3] = ["fwd", "fw", "wg"];

/// Detect a reply/forward prefix at the very start of `subject`.
///
/// Returns the prefix family and the byte length of the prefix including
/// its colon. Matching is ASCII case-insensitive.
pub fn leading_prefix(subject: &str) -> Option<(Prefix, usize)> {
    let bytes = subject.as_bytes();
    let families = [
        (Prefix::Reply, &REPLY_PREFIXES[..]),
        (Prefix::Forward, &FORWARD_PREFIXES[..]),
    ];
    for (family, words) in families {
        for word in words {
            let n = word.len();
            if bytes.len() > n && bytes[n] == b':' && bytes[..n].eq_ignore_ascii_case(word.as_bytes())
            {
                return Some((family, n + 1));
            }
        }
    }
    None
}

/// Produce the grouping key for a subject.
///
/// Leading `Re:`/`Fwd:`/`FW:` (and localized) prefixes are removed together
/// with surrounding whitespace; the rest keeps its case.
///
/// # Examples
/// - `"Re: Re: Project Update"` → `"Project Update"`
/// - `"Fwd: Budget"` → `"Budget"`
/// - `""` → `""`
pub fn normalize(subject: &str) -> String {
    let mut s = subject.trim();
    // Every pass consumes at least one byte, so this terminates.
    while let Some((_, len)) = leading_prefix(s) {
        s = s[len..].trim_start();
    }
    s.trim_end().to_string()
}
