use tracing::warn;

/// Locales shipped in `locales/`
pub const SUPPORTED_LOCALES: &[&str] = &["en", "ru"];

/// Check whether a locale has a translation file
pub fn is_supported(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// Set the process-wide locale, falling back to English for unknown locales
pub fn set_locale(locale: &str) {
    if is_supported(locale) {
        rust_i18n::set_locale(locale);
    } else {
        warn!("Unsupported locale '{}', falling back to en", locale);
        rust_i18n::set_locale("en");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_locales() {
        assert!(is_supported("en"));
        assert!(is_supported("ru"));
        assert!(!is_supported("xx"));
    }
}
