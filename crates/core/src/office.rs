use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An office/branch label attached to every deposit.
///
/// The canonical set is closed; `Other` carries labels that predate this
/// system (compound sheet labels like "Livingston/Kearny") and `Unknown` is
/// the fallback when no source can resolve a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Office {
    Union,
    Kearny,
    Livingston,
    Hackensack,
    JerseyCity,
    Unknown,
    Other(String),
}

/// Canonical offices in filename-match priority order.
/// Two-word names come first so "Jersey City" never loses to a one-word
/// substring collision.
const MATCH_ORDER: [Office; 5] = [
    Office::JerseyCity,
    Office::Hackensack,
    Office::Livingston,
    Office::Kearny,
    Office::Union,
];

/// Allowed values for the office dropdown in the sheet, including the
/// compound legacy label already in use there.
pub const DROPDOWN_OPTIONS: [&str; 6] = [
    "Union",
    "Kearny",
    "Livingston",
    "Hackensack",
    "Livingston/Kearny",
    "Jersey City",
];

impl Office {
    /// Uppercase key used for substring matching against filenames and
    /// statement text.
    fn match_key(&self) -> &'static str {
        match self {
            Office::Union => "UNION",
            Office::Kearny => "KEARNY",
            Office::Livingston => "LIVINGSTON",
            Office::Hackensack => "HACKENSACK",
            Office::JerseyCity => "JERSEY CITY",
            Office::Unknown | Office::Other(_) => "",
        }
    }

    /// Derive an office from an uploaded file's name.
    ///
    /// Strips the extension, uppercases, and tests the canonical offices in
    /// priority order. `None` is a legitimate not-found outcome — the caller
    /// decides the fallback; this function never guesses.
    pub fn from_filename(filename: &str) -> Option<Office> {
        let stem = match filename.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => filename,
        };
        // Separator-insensitive: "Jersey_City_June" must match "JERSEY CITY".
        let upper = stem.to_uppercase().replace(['_', '-'], " ");
        MATCH_ORDER
            .iter()
            .find(|office| upper.contains(office.match_key()))
            .cloned()
    }

    /// Case-insensitive parse of a free-form office label.
    ///
    /// Canonical names map to their variants; anything else non-empty is
    /// preserved verbatim as `Other` so legacy sheet labels survive a
    /// round-trip through the export payload.
    pub fn parse(label: &str) -> Office {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Office::Unknown;
        }
        let upper = trimmed.to_uppercase();
        match upper.as_str() {
            "UNION" => Office::Union,
            "KEARNY" => Office::Kearny,
            "LIVINGSTON" => Office::Livingston,
            "HACKENSACK" => Office::Hackensack,
            "JERSEY CITY" => Office::JerseyCity,
            "UNKNOWN" => Office::Unknown,
            _ => Office::Other(trimmed.to_string()),
        }
    }

    /// Match an office hint embedded in statement text (Account Owner line).
    pub fn from_hint(text: &str) -> Option<Office> {
        let upper = text.to_uppercase();
        MATCH_ORDER
            .iter()
            .find(|office| upper.contains(office.match_key()))
            .cloned()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Office::Unknown)
    }
}

impl fmt::Display for Office {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Office::Union => write!(f, "Union"),
            Office::Kearny => write!(f, "Kearny"),
            Office::Livingston => write!(f, "Livingston"),
            Office::Hackensack => write!(f, "Hackensack"),
            Office::JerseyCity => write!(f, "Jersey City"),
            Office::Unknown => write!(f, "Unknown"),
            Office::Other(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for Office {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Office {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Office::parse(&label))
    }
}
