use once_cell::sync::Lazy;

static RU_SPEAKING_LOCALES: [&str; 3] = ["ru", "uk", "be"];
static DEFAULT: Lazy<String> = Lazy::new(|| SupportedLanguage::RU.to_string());

#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SupportedLanguage {
    EN,
    RU,
}

impl SupportedLanguage {
    /// Russian is used unless the Telegram user's language is explicitly a non-Russian-speaking one.
    pub fn from_language_code(code: Option<&str>) -> Self {
        let Some(code) = code.map(str::trim).filter(|c| c.len() >= 2) else {
            log::debug!("no language code, using the default locale {}", *DEFAULT);
            return Self::RU
        };
        let code = code.to_ascii_lowercase();
        if code.get(..2).is_some_and(|prefix| RU_SPEAKING_LOCALES.contains(&prefix)) {
            Self::RU
        } else {
            Self::EN
        }
    }
}
