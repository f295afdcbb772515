//! Country → continent classification.
//!
//! The loader only depends on the [`ContinentLookup`] trait, so callers can
//! inject any classifier. [`CountryTable::builtin`] covers the countries that
//! appear in the WHO and Kaggle suicide-rate datasets, including the common
//! long-form aliases ("Russian Federation", "Republic of Korea", ...).

use crate::data::normalize_column_name;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Continent {
    Africa,
    Asia,
    Europe,
    NorthAmerica,
    SouthAmerica,
    Oceania,
    Unknown,
}

impl Continent {
    pub fn name(&self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::SouthAmerica => "South America",
            Continent::Oceania => "Oceania",
            Continent::Unknown => "Unknown",
        }
    }

    /// Two-letter continent code as used by ISO-3166 tooling.
    pub fn from_code(code: &str) -> Option<Continent> {
        match code.trim().to_ascii_uppercase().as_str() {
            "AF" => Some(Continent::Africa),
            "AS" => Some(Continent::Asia),
            "EU" => Some(Continent::Europe),
            "NA" => Some(Continent::NorthAmerica),
            "SA" => Some(Continent::SouthAmerica),
            "OC" => Some(Continent::Oceania),
            _ => None,
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pure classifier from a country name to its continent.
pub trait ContinentLookup {
    /// `None` when the name cannot be resolved (unknown, ambiguous, ...).
    fn resolve(&self, country: &str) -> Option<Continent>;

    /// Total form of [`resolve`](Self::resolve): never fails.
    fn classify(&self, country: &str) -> Continent {
        self.resolve(country).unwrap_or(Continent::Unknown)
    }
}

impl<F> ContinentLookup for F
where
    F: Fn(&str) -> Option<Continent>,
{
    fn resolve(&self, country: &str) -> Option<Continent> {
        self(country)
    }
}

/// Name-keyed lookup table. Keys are matched after trimming and case-folding.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    entries: HashMap<String, Continent>,
}

impl CountryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (name, code) in BUILTIN_COUNTRIES {
            if let Some(continent) = Continent::from_code(code) {
                table.insert(name, continent);
            }
        }
        table
    }

    pub fn insert(&mut self, country: &str, continent: Continent) {
        self.entries.insert(normalize_column_name(country), continent);
    }
}

impl ContinentLookup for CountryTable {
    fn resolve(&self, country: &str) -> Option<Continent> {
        self.entries.get(&normalize_column_name(country)).copied()
    }
}

const BUILTIN_COUNTRIES: &[(&str, &str)] = &[
    // Africa
    ("Algeria", "AF"),
    ("Angola", "AF"),
    ("Botswana", "AF"),
    ("Cabo Verde", "AF"),
    ("Cape Verde", "AF"),
    ("Egypt", "AF"),
    ("Ethiopia", "AF"),
    ("Ghana", "AF"),
    ("Kenya", "AF"),
    ("Mauritius", "AF"),
    ("Morocco", "AF"),
    ("Mozambique", "AF"),
    ("Namibia", "AF"),
    ("Nigeria", "AF"),
    ("Reunion", "AF"),
    ("Rwanda", "AF"),
    ("Senegal", "AF"),
    ("Seychelles", "AF"),
    ("South Africa", "AF"),
    ("Tunisia", "AF"),
    ("Uganda", "AF"),
    ("Zambia", "AF"),
    ("Zimbabwe", "AF"),
    // Asia
    ("Armenia", "AS"),
    ("Azerbaijan", "AS"),
    ("Bahrain", "AS"),
    ("Bangladesh", "AS"),
    ("China", "AS"),
    ("Georgia", "AS"),
    ("Hong Kong", "AS"),
    ("India", "AS"),
    ("Indonesia", "AS"),
    ("Iran", "AS"),
    ("Iran (Islamic Rep of)", "AS"),
    ("Iraq", "AS"),
    ("Israel", "AS"),
    ("Japan", "AS"),
    ("Jordan", "AS"),
    ("Kazakhstan", "AS"),
    ("Kuwait", "AS"),
    ("Kyrgyzstan", "AS"),
    ("Macau", "AS"),
    ("Malaysia", "AS"),
    ("Maldives", "AS"),
    ("Mongolia", "AS"),
    ("Oman", "AS"),
    ("Pakistan", "AS"),
    ("Philippines", "AS"),
    ("Qatar", "AS"),
    ("Republic of Korea", "AS"),
    ("Saudi Arabia", "AS"),
    ("Singapore", "AS"),
    ("South Korea", "AS"),
    ("Sri Lanka", "AS"),
    ("Syrian Arab Republic", "AS"),
    ("Tajikistan", "AS"),
    ("Thailand", "AS"),
    ("Turkey", "AS"),
    ("Turkmenistan", "AS"),
    ("United Arab Emirates", "AS"),
    ("Uzbekistan", "AS"),
    ("Viet Nam", "AS"),
    ("Vietnam", "AS"),
    // Europe
    ("Albania", "EU"),
    ("Austria", "EU"),
    ("Belarus", "EU"),
    ("Belgium", "EU"),
    ("Bosnia and Herzegovina", "EU"),
    ("Bulgaria", "EU"),
    ("Croatia", "EU"),
    ("Cyprus", "EU"),
    ("Czech Republic", "EU"),
    ("Czechia", "EU"),
    ("Denmark", "EU"),
    ("Estonia", "EU"),
    ("Finland", "EU"),
    ("France", "EU"),
    ("Germany", "EU"),
    ("Greece", "EU"),
    ("Hungary", "EU"),
    ("Iceland", "EU"),
    ("Ireland", "EU"),
    ("Italy", "EU"),
    ("Latvia", "EU"),
    ("Lithuania", "EU"),
    ("Luxembourg", "EU"),
    ("Malta", "EU"),
    ("Montenegro", "EU"),
    ("Netherlands", "EU"),
    ("North Macedonia", "EU"),
    ("Norway", "EU"),
    ("Poland", "EU"),
    ("Portugal", "EU"),
    ("Republic of Moldova", "EU"),
    ("Moldova", "EU"),
    ("Romania", "EU"),
    ("Russia", "EU"),
    ("Russian Federation", "EU"),
    ("San Marino", "EU"),
    ("Serbia", "EU"),
    ("Slovakia", "EU"),
    ("Slovenia", "EU"),
    ("Spain", "EU"),
    ("Sweden", "EU"),
    ("Switzerland", "EU"),
    ("Ukraine", "EU"),
    ("United Kingdom", "EU"),
    // North America (incl. Central America and the Caribbean)
    ("Antigua and Barbuda", "NA"),
    ("Aruba", "NA"),
    ("Bahamas", "NA"),
    ("Barbados", "NA"),
    ("Belize", "NA"),
    ("Canada", "NA"),
    ("Costa Rica", "NA"),
    ("Cuba", "NA"),
    ("Dominica", "NA"),
    ("Dominican Republic", "NA"),
    ("El Salvador", "NA"),
    ("Grenada", "NA"),
    ("Guatemala", "NA"),
    ("Haiti", "NA"),
    ("Honduras", "NA"),
    ("Jamaica", "NA"),
    ("Mexico", "NA"),
    ("Nicaragua", "NA"),
    ("Panama", "NA"),
    ("Puerto Rico", "NA"),
    ("Saint Kitts and Nevis", "NA"),
    ("Saint Lucia", "NA"),
    ("Saint Vincent and Grenadines", "NA"),
    ("Saint Vincent and the Grenadines", "NA"),
    ("Trinidad and Tobago", "NA"),
    ("United States", "NA"),
    ("United States of America", "NA"),
    // South America
    ("Argentina", "SA"),
    ("Bolivia", "SA"),
    ("Brazil", "SA"),
    ("Chile", "SA"),
    ("Colombia", "SA"),
    ("Ecuador", "SA"),
    ("Guyana", "SA"),
    ("Paraguay", "SA"),
    ("Peru", "SA"),
    ("Suriname", "SA"),
    ("Uruguay", "SA"),
    ("Venezuela", "SA"),
    // Oceania
    ("Australia", "OC"),
    ("Fiji", "OC"),
    ("Kiribati", "OC"),
    ("New Zealand", "OC"),
    ("Papua New Guinea", "OC"),
    ("Samoa", "OC"),
    ("Tonga", "OC"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolves_known_countries() {
        let table = CountryTable::builtin();
        assert_eq!(table.classify("Japan"), Continent::Asia);
        assert_eq!(table.classify("Germany"), Continent::Europe);
        assert_eq!(table.classify("United States"), Continent::NorthAmerica);
        assert_eq!(table.classify("Brazil"), Continent::SouthAmerica);
        assert_eq!(table.classify("New Zealand"), Continent::Oceania);
        assert_eq!(table.classify("South Africa"), Continent::Africa);
    }

    #[test]
    fn test_lookup_ignores_case_and_padding() {
        let table = CountryTable::builtin();
        assert_eq!(table.classify("  russian federation "), Continent::Europe);
    }

    #[test]
    fn test_classify_is_total() {
        let table = CountryTable::builtin();
        for input in ["", "   ", "Atlantis", "Kosovo?", "日本", "\u{0}"] {
            assert_eq!(table.classify(input), Continent::Unknown);
        }
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |name: &str| (name == "Narnia").then_some(Continent::Europe);
        assert_eq!(lookup.classify("Narnia"), Continent::Europe);
        assert_eq!(lookup.classify("Gondor"), Continent::Unknown);
    }

    #[test]
    fn test_continent_codes() {
        assert_eq!(Continent::from_code("na"), Some(Continent::NorthAmerica));
        assert_eq!(Continent::from_code("AN"), None);
        assert_eq!(Continent::NorthAmerica.to_string(), "North America");
    }

    #[test]
    fn test_custom_table() {
        let mut table = CountryTable::new();
        table.insert("Gondor", Continent::Europe);
        assert_eq!(table.classify("GONDOR"), Continent::Europe);
        assert_eq!(table.classify("Japan"), Continent::Unknown);
        assert_eq!(Continent::SouthAmerica.name(), "South America");
    }
}
