/// Activity profile catalog for the weather risk service.
///
/// Defines the canonical set of outdoor activities and the threshold
/// quadruple that marks a day as unfavorable for each. This is the single
/// source of truth for thresholds. All other modules should look profiles
/// up from here (or from a [`ProfileCatalog`] built from it) rather than
/// hardcoding numbers.

use crate::model::ActivityThresholds;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Profile metadata
// ---------------------------------------------------------------------------

/// A named bundle of thresholds for one activity type.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityProfile {
    /// Display name, also the lookup key (case-insensitive).
    pub name: String,
    /// One-line description of the conditions the activity wants.
    pub description: String,
    pub thresholds: ActivityThresholds,
}

struct BuiltinProfile {
    name: &'static str,
    description: &'static str,
    thresholds: ActivityThresholds,
}

const fn thresholds(temp_min: f64, temp_max: f64, rain: f64, wind: f64) -> ActivityThresholds {
    ActivityThresholds {
        temp_min,
        temp_max,
        rain,
        wind,
    }
}

/// Built-in activities, in display order.
static BUILTIN_PROFILES: &[BuiltinProfile] = &[
    BuiltinProfile {
        name: "Beach Day",
        description: "Sunshine, warm temps, light winds",
        thresholds: thresholds(22.0, 38.0, 2.0, 10.0),
    },
    BuiltinProfile {
        name: "Hiking",
        description: "Moderate temps, dry conditions",
        thresholds: thresholds(5.0, 32.0, 5.0, 15.0),
    },
    BuiltinProfile {
        name: "Picnic",
        description: "Pleasant weather, no rain",
        thresholds: thresholds(15.0, 35.0, 1.0, 12.0),
    },
    BuiltinProfile {
        name: "Parade",
        description: "Comfortable for crowds",
        thresholds: thresholds(0.0, 35.0, 3.0, 15.0),
    },
    BuiltinProfile {
        name: "Fishing",
        description: "Calm waters, low wind",
        thresholds: thresholds(10.0, 38.0, 8.0, 8.0),
    },
    BuiltinProfile {
        name: "Camping",
        description: "Dry, mild conditions",
        thresholds: thresholds(5.0, 35.0, 5.0, 15.0),
    },
    BuiltinProfile {
        name: "Sports",
        description: "Cool, dry weather ideal",
        thresholds: thresholds(8.0, 28.0, 2.0, 12.0),
    },
    BuiltinProfile {
        name: "General Outdoor",
        description: "Comfortable conditions",
        thresholds: thresholds(10.0, 32.0, 3.0, 12.0),
    },
];

/// A `[[profiles]]` entry from the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileOverride {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub rain: f64,
    pub wind: f64,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Read-only set of profiles, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCatalog {
    profiles: Vec<ActivityProfile>,
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileCatalog {
    /// The eight built-in activities.
    pub fn builtin() -> Self {
        let profiles = BUILTIN_PROFILES
            .iter()
            .map(|p| ActivityProfile {
                name: p.name.to_string(),
                description: p.description.to_string(),
                thresholds: p.thresholds,
            })
            .collect();
        Self { profiles }
    }

    /// Built-in catalog with settings-file entries applied.
    ///
    /// An override whose name matches an existing profile (case-insensitive)
    /// replaces its thresholds, keeping the old description unless a new one
    /// is given; any other name is appended.
    pub fn with_overrides(overrides: &[ProfileOverride]) -> Self {
        let mut catalog = Self::builtin();
        for o in overrides {
            let thresholds = ActivityThresholds {
                temp_min: o.temp_min,
                temp_max: o.temp_max,
                rain: o.rain,
                wind: o.wind,
            };
            match catalog
                .profiles
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(&o.name))
            {
                Some(existing) => {
                    existing.thresholds = thresholds;
                    if let Some(desc) = &o.description {
                        existing.description = desc.clone();
                    }
                }
                None => catalog.profiles.push(ActivityProfile {
                    name: o.name.clone(),
                    description: o.description.clone().unwrap_or_default(),
                    thresholds,
                }),
            }
        }
        catalog
    }

    /// Looks up a profile by name. Returns `None` if not found.
    pub fn find(&self, name: &str) -> Option<&ActivityProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityProfile> {
        self.profiles.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_contains_all_expected_activities() {
        let catalog = ProfileCatalog::builtin();
        let expected = [
            "Beach Day",
            "Hiking",
            "Picnic",
            "Parade",
            "Fishing",
            "Camping",
            "Sports",
            "General Outdoor",
        ];
        assert_eq!(catalog.len(), expected.len());
        for name in &expected {
            assert!(
                catalog.find(name).is_some(),
                "catalog missing expected profile '{}'",
                name
            );
        }
    }

    #[test]
    fn test_no_duplicate_profile_names() {
        let mut seen = std::collections::HashSet::new();
        for p in ProfileCatalog::builtin().iter() {
            assert!(
                seen.insert(p.name.to_ascii_lowercase()),
                "duplicate profile '{}' in catalog",
                p.name
            );
        }
    }

    #[test]
    fn test_temperature_bounds_are_ordered() {
        // A profile with temp_min >= temp_max would make every day unfavorable.
        for p in ProfileCatalog::builtin().iter() {
            assert!(
                p.thresholds.temp_min < p.thresholds.temp_max,
                "temp_min must be below temp_max for '{}'",
                p.name
            );
            assert!(p.thresholds.rain > 0.0, "rain threshold must be positive for '{}'", p.name);
            assert!(p.thresholds.wind > 0.0, "wind threshold must be positive for '{}'", p.name);
        }
    }

    #[test]
    fn test_beach_day_thresholds() {
        let catalog = ProfileCatalog::builtin();
        let beach = catalog.find("beach day").expect("lookup is case-insensitive");
        assert_eq!(beach.thresholds, thresholds(22.0, 38.0, 2.0, 10.0));
    }

    #[test]
    fn test_find_returns_none_for_unknown_name() {
        assert!(ProfileCatalog::builtin().find("Skydiving").is_none());
    }

    #[test]
    fn test_override_replaces_existing_thresholds() {
        let catalog = ProfileCatalog::with_overrides(&[ProfileOverride {
            name: "PICNIC".to_string(),
            description: None,
            temp_min: 18.0,
            temp_max: 30.0,
            rain: 0.5,
            wind: 9.0,
        }]);
        assert_eq!(catalog.len(), 8);
        let picnic = catalog.find("Picnic").unwrap();
        assert_eq!(picnic.thresholds, thresholds(18.0, 30.0, 0.5, 9.0));
        assert_eq!(picnic.description, "Pleasant weather, no rain");
    }

    #[test]
    fn test_override_with_new_name_is_appended() {
        let catalog = ProfileCatalog::with_overrides(&[ProfileOverride {
            name: "Stargazing".to_string(),
            description: Some("Clear, calm nights".to_string()),
            temp_min: -5.0,
            temp_max: 30.0,
            rain: 0.2,
            wind: 6.0,
        }]);
        assert_eq!(catalog.len(), 9);
        assert_eq!(catalog.names().last(), Some(&"Stargazing"));
    }
}
