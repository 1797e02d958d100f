use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Languages a story can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Es,
    Nl,
    Pt,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Fr,
        Language::Es,
        Language::Nl,
        Language::Pt,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::Nl => "nl",
            Language::Pt => "pt",
        }
    }

    fn stopwords(self) -> &'static [&'static str] {
        match self {
            Language::En => &[
                "the", "and", "is", "was", "were", "of", "to", "in", "that", "it", "with", "he",
                "she", "for", "we", "my", "his", "her", "you", "this", "our", "had",
            ],
            Language::Fr => &[
                "le", "la", "les", "et", "est", "était", "de", "des", "une", "un", "que", "qui",
                "dans", "pour", "avec", "il", "elle", "nous", "je", "pas", "du", "au", "sommes",
            ],
            Language::Es => &[
                "el", "la", "los", "las", "y", "es", "era", "de", "que", "en", "un", "una", "con",
                "por", "para", "su", "nosotros", "fue", "muy", "pero", "nuestra",
            ],
            Language::Nl => &[
                "de", "het", "een", "en", "is", "was", "van", "dat", "die", "in", "met", "voor",
                "op", "hij", "zij", "wij", "niet", "ook", "maar", "ik", "ons",
            ],
            Language::Pt => &[
                "o", "a", "os", "as", "e", "é", "era", "de", "que", "em", "um", "uma", "com",
                "por", "para", "não", "ele", "ela", "nós", "foi", "muito", "nossa",
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported language `{s}`"))
    }
}

/// Texts shorter than this are not analysed.
pub const MIN_DETECT_CHARS: usize = 10;

/// Guesses the language of a story from stop-word frequency.
///
/// Falls back to English for short texts and texts with no signal. Ties go to
/// the earlier entry of [`Language::ALL`].
pub fn detect_language(text: &str) -> Language {
    if text.chars().count() < MIN_DETECT_CHARS {
        return Language::En;
    }

    let words: Vec<String> = text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut best = (Language::En, 0usize);
    for lang in Language::ALL {
        let stop = lang.stopwords();
        let hits = words.iter().filter(|w| stop.contains(&w.as_str())).count();
        if hits > best.1 {
            best = (lang, hits);
        }
    }
    best.0
}
