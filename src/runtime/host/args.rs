//! Tokenizer shared by condition queries and action strings.

/// Splits `input` on whitespace, keeping double-quoted runs together.
///
/// Quotes are removed from the result; `\"` inside a quoted run is a literal quote.
///
/// ```rust
/// use dynpatch::runtime::host::split_args;
///
/// assert_eq!(
///     split_args(r#"PLAYER_HEARTS Current "Mayor Lewis" 4"#),
///     ["PLAYER_HEARTS", "Current", "Mayor Lewis", "4"]
/// );
/// ```
#[must_use]
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// Splits a condition string into its comma-separated queries, ignoring commas
/// inside double quotes.
#[must_use]
pub fn split_queries(condition: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, ch) in condition.char_indices() {
        match ch {
            '\\' if in_quotes && !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&condition[start..index]);
                start = index + 1;
            }
            _ => {}
        }
        escaped = false;
    }
    parts.push(&condition[start..]);
    parts
}
