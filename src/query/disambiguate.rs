//! Splitting dotted identifiers inside a single backtick-quoted token.
//!
//! `` `orders.id` `` becomes `` `orders`.`id` ``. Dots outside backticks are left
//! alone, so already-split identifiers pass through unchanged. The pass also trims the
//! statement and collapses whitespace runs into one space, which lets the builder glue
//! fragments together without tracking separators.

/// Normalise quoted compound identifiers and whitespace in `sql`
pub fn disambiguate(sql: &str) -> String {
    let mut solved = String::with_capacity(sql.len() + 8);
    let mut quoted = false;
    let mut pending_space = false;

    for ch in sql.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            solved.push(' ');
            pending_space = false;
        }
        match ch {
            '`' => {
                quoted = !quoted;
                solved.push(ch);
            }
            '.' if quoted => solved.push_str("`.`"),
            _ => solved.push(ch),
        }
    }

    solved
}
