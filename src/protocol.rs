// src/protocol.rs

//! Wire codec for the line-oriented auction protocol.
//!
//! One logical message per line:
//!
//! ```text
//! <type> <k1>=<v1> <k2>=<v2> ... <kN>=<vN>
//! ```
//!
//! Tokens are separated by runs of ASCII whitespace, which makes the space
//! character unrepresentable inside a value; senders encode it as an
//! underscore. That transform is deliberately lossy and one-way: receivers
//! keep underscores as-is.

use std::collections::BTreeMap;

/// Argument map carried by a message. Ordered, so encoded lines are
/// deterministic.
pub type Params = BTreeMap<String, String>;

/// Encode a message type and its arguments into a wire line (no trailing
/// newline). Spaces inside values become underscores.
pub fn encode(msg_type: &str, args: &Params) -> String {
    let mut line = String::from(msg_type);
    for (key, value) in args {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(&value.replace(' ', "_"));
    }
    line
}

/// Decode a wire line into its message type and argument map.
///
/// Returns `None` for blank lines. Tokens that do not split into exactly
/// one non-empty `key=value` pair are dropped silently; key and value are
/// trimmed.
pub fn decode(line: &str) -> Option<(&str, Params)> {
    let mut tokens = line.split_whitespace();
    let msg_type = tokens.next()?;

    let mut args = Params::new();
    for token in tokens {
        let parts: Vec<&str> = token.split('=').collect();
        if parts.len() != 2 {
            continue;
        }
        let (key, value) = (parts[0].trim(), parts[1].trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        args.insert(key.to_string(), value.to_string());
    }
    Some((msg_type, args))
}
