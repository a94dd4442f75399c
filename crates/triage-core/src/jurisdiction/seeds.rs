//! Static per-jurisdiction defaults used to seed profiles on first lookup

use super::Difficulty;

pub struct Seed {
    pub code: &'static str,
    pub name: &'static str,
    pub approval_rate: f64,
    pub average_processing_days: u32,
    pub difficulty: Difficulty,
}

macro_rules! seeds {
    ($(($code:literal, $name:literal, $rate:literal, $days:literal, $difficulty:ident)),* $(,)?) => {
        &[$(Seed {
            code: $code,
            name: $name,
            approval_rate: $rate,
            average_processing_days: $days,
            difficulty: Difficulty::$difficulty,
        }),*]
    };
}

pub const SEEDS: &[Seed] = seeds![
    ("AL", "Alabama", 0.38, 45, Moderate),
    ("AK", "Alaska", 0.42, 50, Moderate),
    ("AZ", "Arizona", 0.45, 40, Moderate),
    ("AR", "Arkansas", 0.41, 45, Moderate),
    ("CA", "California", 0.30, 60, Hard),
    ("CO", "Colorado", 0.44, 40, Moderate),
    ("CT", "Connecticut", 0.36, 50, Moderate),
    ("DE", "Delaware", 0.43, 35, Moderate),
    ("DC", "District of Columbia", 0.35, 55, Hard),
    ("FL", "Florida", 0.37, 50, Moderate),
    ("GA", "Georgia", 0.40, 45, Moderate),
    ("HI", "Hawaii", 0.46, 40, Moderate),
    ("ID", "Idaho", 0.52, 30, Easy),
    ("IL", "Illinois", 0.34, 55, Hard),
    ("IN", "Indiana", 0.47, 35, Moderate),
    ("IA", "Iowa", 0.53, 30, Easy),
    ("KS", "Kansas", 0.50, 30, Easy),
    ("KY", "Kentucky", 0.42, 40, Moderate),
    ("LA", "Louisiana", 0.36, 50, Moderate),
    ("ME", "Maine", 0.48, 35, Easy),
    ("MD", "Maryland", 0.33, 55, Hard),
    ("MA", "Massachusetts", 0.35, 55, Hard),
    ("MI", "Michigan", 0.39, 45, Moderate),
    ("MN", "Minnesota", 0.46, 40, Moderate),
    ("MS", "Mississippi", 0.41, 45, Moderate),
    ("MO", "Missouri", 0.44, 40, Moderate),
    ("MT", "Montana", 0.54, 30, Easy),
    ("NE", "Nebraska", 0.51, 30, Easy),
    ("NV", "Nevada", 0.43, 40, Moderate),
    ("NH", "New Hampshire", 0.47, 35, Moderate),
    ("NJ", "New Jersey", 0.32, 60, Hard),
    ("NM", "New Mexico", 0.45, 40, Moderate),
    ("NY", "New York", 0.31, 60, Hard),
    ("NC", "North Carolina", 0.40, 45, Moderate),
    ("ND", "North Dakota", 0.55, 25, Easy),
    ("OH", "Ohio", 0.42, 40, Moderate),
    ("OK", "Oklahoma", 0.46, 35, Moderate),
    ("OR", "Oregon", 0.39, 45, Moderate),
    ("PA", "Pennsylvania", 0.35, 50, Hard),
    ("RI", "Rhode Island", 0.37, 45, Moderate),
    ("SC", "South Carolina", 0.41, 45, Moderate),
    ("SD", "South Dakota", 0.53, 25, Easy),
    ("TN", "Tennessee", 0.43, 40, Moderate),
    ("TX", "Texas", 0.38, 50, Moderate),
    ("UT", "Utah", 0.49, 30, Easy),
    ("VT", "Vermont", 0.48, 35, Easy),
    ("VA", "Virginia", 0.39, 45, Moderate),
    ("WA", "Washington", 0.36, 50, Moderate),
    ("WV", "West Virginia", 0.44, 40, Moderate),
    ("WI", "Wisconsin", 0.47, 35, Moderate),
    ("WY", "Wyoming", 0.56, 25, Easy),
];

pub fn find(code: &str) -> Option<&'static Seed> {
    SEEDS.iter().find(|s| s.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_codes_are_unique_and_rates_valid() {
        let mut seen = HashSet::new();
        for seed in SEEDS {
            assert!(seen.insert(seed.code), "duplicate seed {}", seed.code);
            assert!((0.0..=1.0).contains(&seed.approval_rate));
            assert_eq!(seed.code, seed.code.to_uppercase());
        }
        assert_eq!(SEEDS.len(), 51);
    }
}
