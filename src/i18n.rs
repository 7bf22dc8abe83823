use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Default language for unknown or missing language codes.
pub const DEFAULT_LANG: &str = "uz";

/// Message tables embedded at compile time, one per supported language.
static LOCALES: LazyLock<HashMap<&'static str, Value>> = LazyLock::new(|| {
    let mut tables = HashMap::new();
    for (lang, raw) in [
        ("uz", include_str!("../locales/uz.json")),
        ("ru", include_str!("../locales/ru.json")),
        ("en", include_str!("../locales/en.json")),
    ] {
        let table = serde_json::from_str(raw).unwrap_or(Value::Null);
        tables.insert(lang, table);
    }
    tables
});

/// Looks up a message key in the given language's table, falling back to the
/// default language for unknown codes and to the key itself when the key is
/// missing everywhere.
pub fn message(lang: &str, key: &str) -> String {
    let table = LOCALES
        .get(lang)
        .filter(|t| !t.is_null())
        .or_else(|| LOCALES.get(DEFAULT_LANG));

    table
        .and_then(|t| t.get("messages"))
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .unwrap_or(key)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_languages_have_message_sent() {
        for lang in ["uz", "ru", "en"] {
            assert_ne!(message(lang, "message_sent"), "message_sent");
        }
    }

    #[test]
    fn unknown_language_falls_back_to_default() {
        assert_eq!(message("fr", "message_sent"), message("uz", "message_sent"));
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(message("uz", "no_such_key"), "no_such_key");
    }
}
