//! Document metadata: content rating and language
//!
//! Both enums are stored as integer ordinals. The lists are append-only:
//! existing documents depend on every ordinal keeping its meaning.

use serde::{Deserialize, Serialize};

macro_rules! ordinal_enum {
    (
        $(#[$meta:meta])*
        $name:ident (default $default:ident) {
            $($variant:ident => $label:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "i64", into = "i64")]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            /// Every variant, in ordinal order
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Variant for an ordinal, if known
            pub fn from_index(index: i64) -> Option<Self> {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| Self::ALL.get(i).copied())
            }

            /// Ordinal stored in documents
            pub fn index(self) -> i64 {
                self as i64
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),*
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl From<i64> for $name {
            fn from(index: i64) -> Self {
                Self::from_index(index).unwrap_or_else(|| {
                    log::warn!(
                        "{}: unknown ordinal {}, using {:?}",
                        stringify!($name),
                        index,
                        $name::$default
                    );
                    $name::$default
                })
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> i64 {
                value.index()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

ordinal_enum! {
    /// Age/content rating of a space
    ContentRating (default Everyone) {
        Unrated => "Unrated",
        EarlyChildhood => "ESRB EC",
        Everyone => "ESRB E",
        Everyone10Plus => "ESRB E10+",
        Teen => "ESRB T",
        Mature => "ESRB M",
        AdultsOnly => "ESRB AO",
        RatingPending => "ESRB RP",
        Pegi3 => "PEGI 3",
        Pegi7 => "PEGI 7",
        Pegi12 => "PEGI 12",
        Pegi16 => "PEGI 16",
        Pegi18 => "PEGI 18",
        Usk0 => "USK 0",
        Usk6 => "USK 6",
        Usk12 => "USK 12",
        Usk16 => "USK 16",
        Usk18 => "USK 18",
        CeroA => "CERO A",
        CeroB => "CERO B",
        CeroC => "CERO C",
        CeroD => "CERO D",
        CeroZ => "CERO Z",
        Kids => "Kids",
        FamilyFriendly => "Family Friendly",
        TeenFriendly => "Teen Friendly",
        MatureOnly => "Mature Only",
    }
}

ordinal_enum! {
    /// Primary language of a space; the label is the BCP-47 code
    Language (default English) {
        English => "en",
        Spanish => "es",
        French => "fr",
        German => "de",
        Italian => "it",
        Portuguese => "pt",
        Russian => "ru",
        ChineseSimplified => "zh-CN",
        ChineseTraditional => "zh-TW",
        Japanese => "ja",
        Korean => "ko",
        Arabic => "ar",
        Hindi => "hi",
        Turkish => "tr",
        Dutch => "nl",
        Polish => "pl",
        Swedish => "sv",
        Danish => "da",
        Finnish => "fi",
        Norwegian => "no",
        Greek => "el",
        Czech => "cs",
        Hungarian => "hu",
        Romanian => "ro",
        Thai => "th",
        Vietnamese => "vi",
        Hebrew => "he",
        Indonesian => "id",
        Malay => "ms",
        Ukrainian => "uk",
    }
}

impl ContentRating {
    /// Ratings that restrict a space to adults
    pub fn is_adults_only(self) -> bool {
        matches!(
            self,
            ContentRating::AdultsOnly
                | ContentRating::Pegi18
                | ContentRating::Usk18
                | ContentRating::CeroZ
                | ContentRating::MatureOnly
        )
    }
}

impl Language {
    /// BCP-47 language tag
    pub fn code(self) -> &'static str {
        self.label()
    }
}
