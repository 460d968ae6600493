use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub struct LanguageSpec {
    pub code: &'static str,
    pub name: &'static str,
}

/// Target languages accepted by the translation service.
pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec { code: "BG", name: "Bulgarian" },
    LanguageSpec { code: "CS", name: "Czech" },
    LanguageSpec { code: "DA", name: "Danish" },
    LanguageSpec { code: "DE", name: "German" },
    LanguageSpec { code: "EL", name: "Greek" },
    LanguageSpec { code: "EN", name: "English" },
    LanguageSpec { code: "EN-GB", name: "English (British)" },
    LanguageSpec { code: "EN-US", name: "English (American)" },
    LanguageSpec { code: "ES", name: "Spanish" },
    LanguageSpec { code: "ET", name: "Estonian" },
    LanguageSpec { code: "FI", name: "Finnish" },
    LanguageSpec { code: "FR", name: "French" },
    LanguageSpec { code: "HU", name: "Hungarian" },
    LanguageSpec { code: "ID", name: "Indonesian" },
    LanguageSpec { code: "IT", name: "Italian" },
    LanguageSpec { code: "JA", name: "Japanese" },
    LanguageSpec { code: "KO", name: "Korean" },
    LanguageSpec { code: "LT", name: "Lithuanian" },
    LanguageSpec { code: "LV", name: "Latvian" },
    LanguageSpec { code: "NL", name: "Dutch" },
    LanguageSpec { code: "PL", name: "Polish" },
    LanguageSpec { code: "PT", name: "Portuguese" },
    LanguageSpec { code: "PT-BR", name: "Portuguese (Brazilian)" },
    LanguageSpec { code: "PT-PT", name: "Portuguese (European)" },
    LanguageSpec { code: "RO", name: "Romanian" },
    LanguageSpec { code: "RU", name: "Russian" },
    LanguageSpec { code: "SK", name: "Slovak" },
    LanguageSpec { code: "SL", name: "Slovenian" },
    LanguageSpec { code: "SV", name: "Swedish" },
    LanguageSpec { code: "TR", name: "Turkish" },
    LanguageSpec { code: "UK", name: "Ukrainian" },
    LanguageSpec { code: "ZH", name: "Chinese (simplified)" },
];

static BY_CODE: Lazy<HashMap<&'static str, &'static LanguageSpec>> =
    Lazy::new(|| LANGUAGES.iter().map(|spec| (spec.code, spec)).collect());

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized language code '{0}'")]
pub struct UnknownLanguage(pub String);

/// A target language validated against [`LANGUAGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct Language {
    code: &'static str,
}

// The `&'static str` field makes serde's derived `Deserialize` specialize to
// `Deserialize<'static>`, so it isn't `DeserializeOwned`. Hand-write the impl
// the `try_from = "String"` attribute would otherwise generate: deserialize a
// `String`, then validate it through `TryFrom`.
impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Language::try_from(code).map_err(serde::de::Error::custom)
    }
}

impl Language {
    pub fn from_code(code: impl AsRef<str>) -> Result<Self, UnknownLanguage> {
        let normalized = code.as_ref().trim().to_uppercase();
        BY_CODE
            .get(normalized.as_str())
            .map(|spec| Self { code: spec.code })
            .ok_or(UnknownLanguage(normalized))
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        BY_CODE[self.code].name
    }

    /// The detection-side counterpart, if the detector knows this language.
    pub fn detection_language(&self) -> Option<lingua::Language> {
        let base = self.code.split('-').next().unwrap_or(self.code);
        lingua_of(base)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl TryFrom<String> for Language {
    type Error = UnknownLanguage;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code.to_owned()
    }
}

/// All distinct detectable languages in the table, for building the detector.
pub fn detection_languages() -> Vec<lingua::Language> {
    let mut langs = Vec::new();
    for spec in LANGUAGES {
        let base = spec.code.split('-').next().unwrap_or(spec.code);
        if let Some(lang) = lingua_of(base) {
            if !langs.contains(&lang) {
                langs.push(lang);
            }
        }
    }
    langs
}

fn lingua_of(base_code: &str) -> Option<lingua::Language> {
    use lingua::Language::*;

    Some(match base_code {
        "BG" => Bulgarian,
        "CS" => Czech,
        "DA" => Danish,
        "DE" => German,
        "EL" => Greek,
        "EN" => English,
        "ES" => Spanish,
        "ET" => Estonian,
        "FI" => Finnish,
        "FR" => French,
        "HU" => Hungarian,
        "ID" => Indonesian,
        "IT" => Italian,
        "JA" => Japanese,
        "KO" => Korean,
        "LT" => Lithuanian,
        "LV" => Latvian,
        "NL" => Dutch,
        "PL" => Polish,
        "PT" => Portuguese,
        "RO" => Romanian,
        "RU" => Russian,
        "SK" => Slovak,
        "SL" => Slovene,
        "SV" => Swedish,
        "TR" => Turkish,
        "UK" => Ukrainian,
        "ZH" => Chinese,
        _ => return None,
    })
}

/// Sanity-checks the table once at startup.
pub fn validate_table() -> anyhow::Result<()> {
    let mut seen = HashMap::new();
    for spec in LANGUAGES {
        anyhow::ensure!(
            spec.code == spec.code.to_uppercase(),
            "language code '{}' is not uppercase",
            spec.code
        );
        anyhow::ensure!(
            seen.insert(spec.code, spec.name).is_none(),
            "duplicate language code '{}'",
            spec.code
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_valid() {
        validate_table().unwrap();
    }

    #[test]
    fn from_code_is_case_insensitive() {
        assert_eq!(Language::from_code("de").unwrap().code(), "DE");
        assert_eq!(Language::from_code(" pt-br ").unwrap().code(), "PT-BR");
        assert_eq!(Language::from_code("DE").unwrap().name(), "German");
    }

    #[test]
    fn from_code_rejects_unknown() {
        assert_eq!(
            Language::from_code("tlh"),
            Err(UnknownLanguage("TLH".into()))
        );
        assert!(Language::from_code("").is_err());
    }

    #[test]
    fn serde_round_trip() {
        let lang = Language::from_code("ja").unwrap();
        let json = serde_json::to_string(&lang).unwrap();
        assert_eq!(json, r#""JA""#);
        let back: Language = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lang);

        assert!(serde_json::from_str::<Language>(r#""XX""#).is_err());
    }

    #[test]
    fn regional_variants_share_detection_language() {
        let en = Language::from_code("EN").unwrap();
        let en_gb = Language::from_code("EN-GB").unwrap();
        assert_eq!(en.detection_language(), en_gb.detection_language());
        assert!(en.detection_language().is_some());
    }

    #[test]
    fn detection_languages_are_distinct() {
        let langs = detection_languages();
        assert!(langs.len() >= 2);
        for (i, lang) in langs.iter().enumerate() {
            assert!(!langs[i + 1..].contains(lang));
        }
    }
}
