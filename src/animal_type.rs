//! Animal species codes and their display labels.
//!
//! Reports carry a canonical snake_case code. Imported rows may use either the
//! code itself or the Japanese display label, so resolution accepts both and
//! returns `None` for anything else.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---

/// Species reported by the damage-report application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalType {
    // Native mammals
    Monkey,
    Deer,
    WildBoar,
    Bear,
    RaccoonDog,
    Fox,
    Badger,
    MaskedPalmCivet,
    Hare,
    Serow,
    Marten,
    Weasel,
    Dog,
    Cat,
    // Invasive mammals
    Raccoon,
    Nutria,
    Muntjac,
    FormosanSquirrel,
    AmericanMink,
    Mongoose,
    SiberianWeasel,
    // Birds
    Pheasant,
    Crow,
    Bulbul,
    Starling,
    Sparrow,
    Duck,
    Heron,
    Cormorant,
    Kite,
    Pigeon,
    Other,
}

impl AnimalType {
    // ---
    pub const ALL: [AnimalType; 32] = [
        AnimalType::Monkey,
        AnimalType::Deer,
        AnimalType::WildBoar,
        AnimalType::Bear,
        AnimalType::RaccoonDog,
        AnimalType::Fox,
        AnimalType::Badger,
        AnimalType::MaskedPalmCivet,
        AnimalType::Hare,
        AnimalType::Serow,
        AnimalType::Marten,
        AnimalType::Weasel,
        AnimalType::Dog,
        AnimalType::Cat,
        AnimalType::Raccoon,
        AnimalType::Nutria,
        AnimalType::Muntjac,
        AnimalType::FormosanSquirrel,
        AnimalType::AmericanMink,
        AnimalType::Mongoose,
        AnimalType::SiberianWeasel,
        AnimalType::Pheasant,
        AnimalType::Crow,
        AnimalType::Bulbul,
        AnimalType::Starling,
        AnimalType::Sparrow,
        AnimalType::Duck,
        AnimalType::Heron,
        AnimalType::Cormorant,
        AnimalType::Kite,
        AnimalType::Pigeon,
        AnimalType::Other,
    ];

    /// Canonical code, as stored in the `reports.animal_type` column.
    pub fn code(self) -> &'static str {
        // ---
        match self {
            AnimalType::Monkey => "monkey",
            AnimalType::Deer => "deer",
            AnimalType::WildBoar => "wild_boar",
            AnimalType::Bear => "bear",
            AnimalType::RaccoonDog => "raccoon_dog",
            AnimalType::Fox => "fox",
            AnimalType::Badger => "badger",
            AnimalType::MaskedPalmCivet => "masked_palm_civet",
            AnimalType::Hare => "hare",
            AnimalType::Serow => "serow",
            AnimalType::Marten => "marten",
            AnimalType::Weasel => "weasel",
            AnimalType::Dog => "dog",
            AnimalType::Cat => "cat",
            AnimalType::Raccoon => "raccoon",
            AnimalType::Nutria => "nutria",
            AnimalType::Muntjac => "muntjac",
            AnimalType::FormosanSquirrel => "formosan_squirrel",
            AnimalType::AmericanMink => "american_mink",
            AnimalType::Mongoose => "mongoose",
            AnimalType::SiberianWeasel => "siberian_weasel",
            AnimalType::Pheasant => "pheasant",
            AnimalType::Crow => "crow",
            AnimalType::Bulbul => "bulbul",
            AnimalType::Starling => "starling",
            AnimalType::Sparrow => "sparrow",
            AnimalType::Duck => "duck",
            AnimalType::Heron => "heron",
            AnimalType::Cormorant => "cormorant",
            AnimalType::Kite => "kite",
            AnimalType::Pigeon => "pigeon",
            AnimalType::Other => "other",
        }
    }

    /// Japanese display label used in spreadsheets and the admin UI.
    pub fn label(self) -> &'static str {
        // ---
        match self {
            AnimalType::Monkey => "サル",
            AnimalType::Deer => "シカ",
            AnimalType::WildBoar => "イノシシ",
            AnimalType::Bear => "クマ",
            AnimalType::RaccoonDog => "タヌキ",
            AnimalType::Fox => "キツネ",
            AnimalType::Badger => "アナグマ",
            AnimalType::MaskedPalmCivet => "ハクビシン",
            AnimalType::Hare => "ノウサギ",
            AnimalType::Serow => "カモシカ",
            AnimalType::Marten => "テン",
            AnimalType::Weasel => "イタチ",
            AnimalType::Dog => "イヌ",
            AnimalType::Cat => "ネコ",
            AnimalType::Raccoon => "アライグマ",
            AnimalType::Nutria => "ヌートリア",
            AnimalType::Muntjac => "キョン",
            AnimalType::FormosanSquirrel => "タイワンリス",
            AnimalType::AmericanMink => "アメリカミンク",
            AnimalType::Mongoose => "マングース",
            AnimalType::SiberianWeasel => "シベリアイタチ",
            AnimalType::Pheasant => "キジ",
            AnimalType::Crow => "カラス",
            AnimalType::Bulbul => "ヒヨドリ",
            AnimalType::Starling => "ムクドリ",
            AnimalType::Sparrow => "スズメ",
            AnimalType::Duck => "カモ",
            AnimalType::Heron => "サギ",
            AnimalType::Cormorant => "カワウ",
            AnimalType::Kite => "トビ",
            AnimalType::Pigeon => "ハト",
            AnimalType::Other => "その他",
        }
    }

    /// Look up a species by its canonical code.
    pub fn from_code(code: &str) -> Option<AnimalType> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Resolve free text (a code or a display label) to a species.
    ///
    /// Input is trimmed first; codes win over labels. Returns `None` when the
    /// text matches neither.
    pub fn resolve(input: &str) -> Option<AnimalType> {
        // ---
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        Self::from_code(trimmed).or_else(|| Self::ALL.into_iter().find(|t| t.label() == trimmed))
    }
}

impl fmt::Display for AnimalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_resolve_accepts_codes_and_labels() {
        // ---
        assert_eq!(AnimalType::resolve("monkey"), Some(AnimalType::Monkey));
        assert_eq!(AnimalType::resolve("サル"), Some(AnimalType::Monkey));
        assert_eq!(AnimalType::resolve("  イノシシ "), Some(AnimalType::WildBoar));
        assert_eq!(AnimalType::resolve("wild_boar"), Some(AnimalType::WildBoar));
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        // ---
        assert_eq!(AnimalType::resolve("ドラゴン"), None);
        assert_eq!(AnimalType::resolve("Monkey"), None);
        assert_eq!(AnimalType::resolve(""), None);
        assert_eq!(AnimalType::resolve("   "), None);
    }

    #[test]
    fn test_codes_and_labels_are_unique() {
        // ---
        for (i, a) in AnimalType::ALL.iter().enumerate() {
            for b in &AnimalType::ALL[i + 1..] {
                assert_ne!(a.code(), b.code());
                assert_ne!(a.label(), b.label());
            }
        }
    }

    #[test]
    fn test_serde_uses_codes() {
        // ---
        for t in AnimalType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.code()));
        }
    }
}
