//! Preset location registry.
//!
//! A short list of named cities so callers can ask for "Toronto" instead of
//! typing coordinates. Several city names repeat across countries (London,
//! Sydney, Vancouver), so lookups accept an optional `, Region` or
//! `, Region, Country` qualifier and report ambiguity rather than guessing.

/// A named preset coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub country: &'static str,
    pub region: &'static str,
    pub city: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

impl Location {
    /// "City, Region, Country".
    pub fn display_name(&self) -> String {
        format!("{}, {}, {}", self.city, self.region, self.country)
    }
}

macro_rules! loc {
    ($country:expr, $region:expr, $city:expr, $lat:expr, $lon:expr) => {
        Location {
            country: $country,
            region: $region,
            city: $city,
            latitude: $lat,
            longitude: $lon,
        }
    };
}

pub static LOCATION_REGISTRY: &[Location] = &[
    // Canada
    loc!("Canada", "Alberta", "Calgary", 51.0447, -114.0719),
    loc!("Canada", "Alberta", "Edmonton", 53.5461, -113.4938),
    loc!("Canada", "British Columbia", "Vancouver", 49.2827, -123.1207),
    loc!("Canada", "British Columbia", "Victoria", 48.4284, -123.3656),
    loc!("Canada", "Manitoba", "Winnipeg", 49.8951, -97.1384),
    loc!("Canada", "Nova Scotia", "Halifax", 44.6488, -63.5752),
    loc!("Canada", "Nova Scotia", "Sydney", 46.1368, -60.1942),
    loc!("Canada", "Ontario", "Toronto", 43.6532, -79.3832),
    loc!("Canada", "Ontario", "Ottawa", 45.4215, -75.6972),
    loc!("Canada", "Ontario", "London", 42.9849, -81.2453),
    loc!("Canada", "Quebec", "Montreal", 45.5017, -73.5673),
    loc!("Canada", "Quebec", "Quebec City", 46.8139, -71.2080),
    loc!("Canada", "Saskatchewan", "Regina", 50.4452, -104.6189),
    // United States
    loc!("United States", "California", "Los Angeles", 34.0522, -118.2437),
    loc!("United States", "California", "San Francisco", 37.7749, -122.4194),
    loc!("United States", "California", "San Diego", 32.7157, -117.1611),
    loc!("United States", "Texas", "Houston", 29.7604, -95.3698),
    loc!("United States", "Texas", "Austin", 30.2672, -97.7431),
    loc!("United States", "Florida", "Miami", 25.7617, -80.1918),
    loc!("United States", "Florida", "Orlando", 28.5383, -81.3792),
    loc!("United States", "New York", "New York City", 40.7128, -74.0060),
    loc!("United States", "Illinois", "Chicago", 41.8781, -87.6298),
    loc!("United States", "Illinois", "Peoria", 40.6936, -89.5890),
    loc!("United States", "Washington", "Seattle", 47.6062, -122.3321),
    loc!("United States", "Washington", "Vancouver", 45.6387, -122.6615),
    loc!("United States", "Colorado", "Denver", 39.7392, -104.9903),
    loc!("United States", "Michigan", "Detroit", 42.3314, -83.0458),
    // United Kingdom
    loc!("United Kingdom", "England", "London", 51.5074, -0.1278),
    loc!("United Kingdom", "England", "Manchester", 53.4808, -2.2426),
    loc!("United Kingdom", "Scotland", "Edinburgh", 55.9533, -3.1883),
    loc!("United Kingdom", "Wales", "Cardiff", 51.4816, -3.1791),
    loc!("United Kingdom", "Northern Ireland", "Belfast", 54.5973, -5.9301),
    // Australia
    loc!("Australia", "New South Wales", "Sydney", -33.8688, 151.2093),
    loc!("Australia", "New South Wales", "Canberra", -35.2809, 149.1300),
    loc!("Australia", "Victoria", "Melbourne", -37.8136, 144.9631),
    loc!("Australia", "Queensland", "Brisbane", -27.4698, 153.0251),
    loc!("Australia", "Queensland", "Cairns", -16.9186, 145.7781),
    loc!("Australia", "Western Australia", "Perth", -31.9505, 115.8605),
    loc!("Australia", "South Australia", "Adelaide", -34.9285, 138.6007),
];

/// Why a location query could not be resolved to exactly one entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationLookupError {
    #[error("unknown location: {0}")]
    NotFound(String),
    #[error("'{query}' matches several locations: {}", .candidates.join("; "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
}

/// All entries matching a `City[, Region[, Country]]` query, case-insensitive.
pub fn find_locations(query: &str) -> Vec<&'static Location> {
    let parts: Vec<&str> = query.split(',').map(str::trim).collect();
    LOCATION_REGISTRY
        .iter()
        .filter(|l| match parts.as_slice() {
            [city] => l.city.eq_ignore_ascii_case(city),
            [city, region] => {
                l.city.eq_ignore_ascii_case(city)
                    && (l.region.eq_ignore_ascii_case(region)
                        || l.country.eq_ignore_ascii_case(region))
            }
            [city, region, country] => {
                l.city.eq_ignore_ascii_case(city)
                    && l.region.eq_ignore_ascii_case(region)
                    && l.country.eq_ignore_ascii_case(country)
            }
            _ => false,
        })
        .collect()
}

/// Resolves a query to a single entry.
pub fn resolve_location(query: &str) -> Result<&'static Location, LocationLookupError> {
    let matches = find_locations(query);
    match matches.as_slice() {
        [] => Err(LocationLookupError::NotFound(query.to_string())),
        [only] => Ok(*only),
        many => Err(LocationLookupError::Ambiguous {
            query: query.to_string(),
            candidates: many.iter().map(|l| l.display_name()).collect(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
