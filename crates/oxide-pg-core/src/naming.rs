//! Conversions between field names and column names.

const ACRONYMS: &[&str] = &["id", "api", "url"];

/// Converts a camel or pascal case identifier to snake case, keeping acronyms together.
///
/// `userId` becomes `user_id`, `ID` becomes `id` and `ProviderAPIKey` becomes
/// `provider_api_key`. Identifiers already in snake case are returned unchanged.
#[must_use]
pub fn snake_case(camel: &str) -> String {
    let chars: Vec<char> = camel.chars().collect();
    let mut out = String::with_capacity(camel.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower)
                {
                    out.push('_');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Converts a snake case identifier to pascal case, upper-casing the `id`, `api`
/// and `url` acronyms.
///
/// `user_id` becomes `UserID` and `provider_api_key` becomes `ProviderAPIKey`.
#[must_use]
pub fn pascal_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());

    for part in snake.split('_').filter(|p| !p.is_empty()) {
        if ACRONYMS.iter().any(|a| a.eq_ignore_ascii_case(part)) {
            out.push_str(&part.to_ascii_uppercase());
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("userId"), "user_id");
        assert_eq!(snake_case("ID"), "id");
        assert_eq!(snake_case("ProviderAPIKey"), "provider_api_key");
        assert_eq!(snake_case("Option"), "option");
        assert_eq!(snake_case("URL"), "url");
        assert_eq!(snake_case("CreatedAt"), "created_at");
        assert_eq!(snake_case("source_id"), "source_id");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("user_id"), "UserID");
        assert_eq!(pascal_case("id"), "ID");
        assert_eq!(pascal_case("provider_api_key"), "ProviderAPIKey");
        assert_eq!(pascal_case("customer_provider"), "CustomerProvider");
        assert_eq!(pascal_case("blog_url"), "BlogURL");
    }
}
