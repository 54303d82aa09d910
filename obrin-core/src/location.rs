use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A resolved geographic location. Gazetteer hits carry city/state metadata,
/// geocoded results carry a formatted address, raw coordinates carry neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub formatted_address: Option<String>,
}

impl Location {
    pub fn coordinates(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            city: None,
            state: None,
            country: None,
            formatted_address: None,
        }
    }
}

/// External geocoding lookup. Implementations resolve free text to
/// coordinates; the parser swallows their errors.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<Location>>;
}

/// Phrases that indicate ordinary conversation rather than a place name.
const NON_LOCATION_PHRASES: &[&str] = &[
    // Greetings
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    // Health-related but not location
    "i need help",
    "i have symptoms",
    "i feel",
    "pain",
    "discharge",
    "bleeding",
    "clinic",
    "hospital",
    "doctor",
    "help me",
    "i need",
    "thank you",
    "thanks",
    // Questions
    "how",
    "what",
    "when",
    "where",
    "why",
    "can you",
    "do you",
    // General responses
    "yes",
    "no",
    "okay",
    "ok",
    "sure",
    "maybe",
    "probably",
    // Service types
    "gynecology",
    "sti testing",
    "family planning",
    "emergency contraception",
];

const LOCATION_INDICATORS: &[&str] = &[
    "i'm in",
    "i am in",
    "located in",
    "live in",
    "stay in",
    "near",
    "close to",
    "around",
    "area",
    "street",
    "road",
    "my location is",
    "i'm at",
    "i am at",
];

/// Common English words that are never place names, used to filter the
/// single-word geocoding fallback.
const COMMON_WORDS: &[&str] = &[
    "hello", "help", "need", "want", "have", "feel", "pain", "sick", "good", "bad", "yes", "no",
    "okay", "sure", "maybe", "very", "much", "some", "any", "all", "none", "more", "less", "most",
];

/// Static gazetteer of Nigerian settlements: (key, lat, lng, city, state).
const GAZETTEER: &[(&str, f64, f64, &str, &str)] = &[
    // Lagos areas
    ("lagos", 6.5244, 3.3792, "Lagos", "Lagos"),
    ("ikeja", 6.6018, 3.3515, "Ikeja", "Lagos"),
    ("victoria island", 6.4281, 3.4219, "Victoria Island", "Lagos"),
    ("lekki", 6.455, 3.4731, "Lekki", "Lagos"),
    ("surulere", 6.5015, 3.358, "Surulere", "Lagos"),
    ("ogudu", 6.6051, 3.3958, "Ogudu", "Lagos"),
    ("ketu", 6.6018, 3.3515, "Ketu", "Lagos"),
    ("maryland", 6.6018, 3.3515, "Maryland", "Lagos"),
    ("alausa", 6.6018, 3.3515, "Alausa", "Lagos"),
    ("omole", 6.6018, 3.3515, "Omole", "Lagos"),
    ("gbagada", 6.5483, 3.3897, "Gbagada", "Lagos"),
    ("yaba", 6.5095, 3.3711, "Yaba", "Lagos"),
    ("oshodi", 6.5483, 3.3897, "Oshodi", "Lagos"),
    ("mushin", 6.5095, 3.3711, "Mushin", "Lagos"),
    ("agege", 6.6157, 3.3233, "Agege", "Lagos"),
    ("isolo", 6.5483, 3.3897, "Isolo", "Lagos"),
    ("ikotun", 6.5483, 3.3897, "Ikotun", "Lagos"),
    ("ejigbo", 6.5483, 3.3897, "Ejigbo", "Lagos"),
    ("ikorodu", 6.6157, 3.3233, "Ikorodu", "Lagos"),
    ("badagry", 6.415, 2.8813, "Badagry", "Lagos"),
    ("epe", 6.5854, 3.9836, "Epe", "Lagos"),
    // Abuja areas
    ("abuja", 9.082, 7.3986, "Abuja", "FCT"),
    ("wuse", 9.082, 7.3986, "Wuse", "FCT"),
    ("garki", 9.082, 7.3986, "Garki", "FCT"),
    ("asokoro", 9.082, 7.3986, "Asokoro", "FCT"),
    ("maitama", 9.082, 7.3986, "Maitama", "FCT"),
    ("jabi", 9.082, 7.3986, "Jabi", "FCT"),
    // Kano areas
    ("kano", 11.9914, 8.5317, "Kano", "Kano"),
    ("nasarawa", 11.9914, 8.5317, "Nasarawa", "Kano"),
    ("fagge", 11.9914, 8.5317, "Fagge", "Kano"),
    // Other major cities
    ("ibadan", 7.3961, 3.8969, "Ibadan", "Oyo"),
    ("port harcourt", 4.8156, 7.0498, "Port Harcourt", "Rivers"),
    ("kaduna", 10.5222, 7.4384, "Kaduna", "Kaduna"),
    ("benin", 6.3176, 5.6145, "Benin City", "Edo"),
    ("maiduguri", 11.8333, 13.15, "Maiduguri", "Borno"),
    ("zaria", 11.1113, 7.7227, "Zaria", "Kaduna"),
    ("bauchi", 10.3103, 9.8439, "Bauchi", "Bauchi"),
    ("akure", 7.2526, 5.1931, "Akure", "Ondo"),
    ("calabar", 4.9757, 8.3417, "Calabar", "Cross River"),
    ("jos", 9.8965, 8.8583, "Jos", "Plateau"),
    ("enugu", 6.4584, 7.5464, "Enugu", "Enugu"),
    ("sokoto", 13.0533, 5.2333, "Sokoto", "Sokoto"),
    ("oyo", 7.8526, 3.9312, "Oyo", "Oyo"),
    ("abeokuta", 7.1557, 3.3451, "Abeokuta", "Ogun"),
    ("warri", 5.556, 5.7936, "Warri", "Delta"),
    ("onitsha", 6.1375, 6.7797, "Onitsha", "Anambra"),
    ("owerri", 5.4833, 7.0333, "Owerri", "Imo"),
    ("uyo", 5.0513, 7.9335, "Uyo", "Akwa Ibom"),
    ("asaba", 6.1833, 6.75, "Asaba", "Delta"),
    ("awka", 6.2109, 7.0744, "Awka", "Anambra"),
    ("osogbo", 7.7669, 4.5601, "Osogbo", "Osun"),
    ("ilorin", 8.5, 4.55, "Ilorin", "Kwara"),
    ("jalingo", 8.9, 11.3667, "Jalingo", "Taraba"),
    ("damaturu", 11.7483, 11.9669, "Damaturu", "Yobe"),
    ("gombe", 10.2897, 11.1673, "Gombe", "Gombe"),
    ("lafia", 8.4833, 8.5167, "Lafia", "Nasarawa"),
    ("minna", 9.6139, 6.5569, "Minna", "Niger"),
    ("lokoja", 7.8023, 6.733, "Lokoja", "Kogi"),
    ("makurdi", 7.7333, 8.5333, "Makurdi", "Benue"),
    ("yola", 9.2, 12.4833, "Yola", "Adamawa"),
    ("birnin kebbi", 12.4539, 4.1975, "Birnin Kebbi", "Kebbi"),
    ("katsina", 12.9908, 7.6018, "Katsina", "Katsina"),
    ("dutse", 11.8283, 9.3158, "Dutse", "Jigawa"),
    ("gusau", 12.17, 6.6644, "Gusau", "Zamfara"),
    ("kebbi", 12.4539, 4.1975, "Kebbi", "Kebbi"),
    ("jigawa", 11.8283, 9.3158, "Jigawa", "Jigawa"),
    ("zamfara", 12.17, 6.6644, "Zamfara", "Zamfara"),
];

fn gazetteer_location(entry: &(&str, f64, f64, &str, &str)) -> Location {
    Location {
        lat: entry.1,
        lng: entry.2,
        city: Some(entry.3.to_string()),
        state: Some(entry.4.to_string()),
        country: Some("Nigeria".to_string()),
        formatted_address: None,
    }
}

/// Turns free text into coordinates via (in strict order) a non-location
/// denylist, an explicit coordinate pair, the Nigerian gazetteer, and a
/// geocoding fallback for text that looks like a place name.
pub struct LocationParser {
    geocoder: Arc<dyn Geocoder>,
    coordinate_re: Regex,
}

impl LocationParser {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            // signed decimals separated by comma and/or whitespace
            coordinate_re: Regex::new(r"([+-]?\d+\.\d+)[,\s]+([+-]?\d+\.\d+)")
                .unwrap_or_else(|e| unreachable!("coordinate regex is valid: {e}")),
        }
    }

    /// Parse a location from user input. Geocoding failures are swallowed
    /// and reported as "no location found".
    pub async fn parse(&self, input: &str) -> Option<Location> {
        let lower = input.to_lowercase().trim().to_string();

        if is_non_location_phrase(&lower) {
            return None;
        }

        if let Some(coords) = self.extract_coordinates(input) {
            return Some(coords);
        }

        if let Some(hit) = gazetteer_lookup(&lower) {
            return Some(hit);
        }

        if looks_like_location(&lower) {
            match self.geocoder.geocode(input).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!(error = %e, "geocoding failed, treating as no location");
                    return None;
                }
            }
        }

        None
    }

    fn extract_coordinates(&self, input: &str) -> Option<Location> {
        let caps = self.coordinate_re.captures(input)?;
        let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
        let lng: f64 = caps.get(2)?.as_str().parse().ok()?;
        debug!(lat, lng, "extracted raw coordinates");
        Some(Location::coordinates(lat, lng))
    }
}

fn is_non_location_phrase(input: &str) -> bool {
    NON_LOCATION_PHRASES.iter().any(|p| input.contains(p))
}

/// Exact key match first, then substring containment in either direction.
/// Among partial matches the longest gazetteer key wins, so "victoria
/// island" beats a shorter accidental substring hit.
fn gazetteer_lookup(input: &str) -> Option<Location> {
    if let Some(entry) = GAZETTEER.iter().find(|(key, ..)| *key == input) {
        return Some(gazetteer_location(entry));
    }

    GAZETTEER
        .iter()
        .filter(|(key, ..)| input.contains(key) || key.contains(input))
        .max_by_key(|(key, ..)| key.len())
        .map(gazetteer_location)
}

fn looks_like_location(input: &str) -> bool {
    if LOCATION_INDICATORS.iter().any(|ind| input.contains(ind)) {
        return true;
    }

    // A lone word longer than 3 characters may be a place name.
    let words: Vec<&str> = input.split_whitespace().collect();
    words.len() == 1 && words[0].len() > 3 && !COMMON_WORDS.contains(&words[0])
}

/// User-facing display form: "City, State" when known, otherwise the
/// formatted address, otherwise bare coordinates.
pub fn format_location(location: &Location) -> String {
    if let Some(city) = &location.city {
        let region = location
            .state
            .as_deref()
            .or(location.country.as_deref())
            .unwrap_or("");
        return if region.is_empty() {
            city.clone()
        } else {
            format!("{city}, {region}")
        };
    }
    if let Some(address) = &location.formatted_address {
        return address.clone();
    }
    format!("{:.4}, {:.4}", location.lat, location.lng)
}

pub fn location_instructions() -> String {
    "📍 To help you find clinics, please share your location in any of these ways:\n\n\
     1️⃣ *City/Area name*: \"I'm in Ogudu\" or \"Lagos\"\n\
     2️⃣ *Coordinates*: \"6.6051, 3.3958\"\n\
     3️⃣ *Address*: \"Near Ikeja Mall\" or \"Victoria Island\"\n\n\
     Just type your location and I'll find clinics near you! 🏥"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopGeocoder;

    #[async_trait]
    impl Geocoder for NoopGeocoder {
        async fn geocode(&self, _query: &str) -> anyhow::Result<Option<Location>> {
            Ok(None)
        }
    }

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn geocode(&self, _query: &str) -> anyhow::Result<Option<Location>> {
            anyhow::bail!("upstream unavailable")
        }
    }

    fn parser() -> LocationParser {
        LocationParser::new(Arc::new(NoopGeocoder))
    }

    #[tokio::test]
    async fn coordinates_take_priority_over_gazetteer() {
        let result = parser().parse("6.5244, 3.3792").await.unwrap();
        assert_eq!(result.lat, 6.5244);
        assert_eq!(result.lng, 3.3792);
        assert!(result.city.is_none());
    }

    #[tokio::test]
    async fn gazetteer_resolves_embedded_city_name() {
        let result = parser().parse("I'm in Lagos").await.unwrap();
        assert_eq!(result.city.as_deref(), Some("Lagos"));
        assert_eq!(result.state.as_deref(), Some("Lagos"));
        assert_eq!(result.lat, 6.5244);
    }

    #[tokio::test]
    async fn ogudu_resolves_to_lagos_suburb() {
        let result = parser().parse("I'm in Ogudu").await.unwrap();
        assert_eq!(result.lat, 6.6051);
        assert_eq!(result.lng, 3.3958);
        assert_eq!(result.city.as_deref(), Some("Ogudu"));
        assert_eq!(result.state.as_deref(), Some("Lagos"));
        assert_eq!(result.country.as_deref(), Some("Nigeria"));
    }

    #[tokio::test]
    async fn non_location_phrases_are_rejected() {
        for input in ["hello", "clinic", "yes"] {
            assert!(parser().parse(input).await.is_none(), "{input:?}");
        }
    }

    #[tokio::test]
    async fn longest_gazetteer_key_wins_on_partial_match() {
        let result = parser().parse("victoria island lagos").await.unwrap();
        assert_eq!(result.city.as_deref(), Some("Victoria Island"));
    }

    #[tokio::test]
    async fn geocoder_errors_are_swallowed() {
        let parser = LocationParser::new(Arc::new(FailingGeocoder));
        assert!(parser.parse("somewhere nonexistent area").await.is_none());
    }

    #[tokio::test]
    async fn single_long_word_falls_through_to_geocoder() {
        struct Fixed;
        #[async_trait]
        impl Geocoder for Fixed {
            async fn geocode(&self, query: &str) -> anyhow::Result<Option<Location>> {
                assert_eq!(query, "Ajegunle");
                Ok(Some(Location {
                    formatted_address: Some("Ajegunle, Lagos, Nigeria".to_string()),
                    ..Location::coordinates(6.4633, 3.3903)
                }))
            }
        }
        let parser = LocationParser::new(Arc::new(Fixed));
        let result = parser.parse("Ajegunle").await.unwrap();
        assert_eq!(
            result.formatted_address.as_deref(),
            Some("Ajegunle, Lagos, Nigeria")
        );
    }

    #[test]
    fn format_prefers_city_then_address_then_coords() {
        let mut loc = Location::coordinates(6.6051, 3.3958);
        assert_eq!(format_location(&loc), "6.6051, 3.3958");
        loc.formatted_address = Some("12 Ogudu Rd, Lagos".to_string());
        assert_eq!(format_location(&loc), "12 Ogudu Rd, Lagos");
        loc.city = Some("Ogudu".to_string());
        loc.state = Some("Lagos".to_string());
        assert_eq!(format_location(&loc), "Ogudu, Lagos");
    }
}
