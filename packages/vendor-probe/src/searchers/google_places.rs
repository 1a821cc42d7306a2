//! Google Places (New) text search for business listings.

use async_trait::async_trait;
use tracing::debug;

use super::{check_status, malformed};
use crate::error::SearchResult;
use crate::security::SecretString;
use crate::traits::searcher::{ProviderKind, SearchProvider, SearchQuery};
use crate::types::link::{BusinessListing, Link};

const PROVIDER: &str = "Google Maps";
const ENDPOINT: &str = "https://places.googleapis.com/v1/places:searchText";
const FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.websiteUri,\
places.nationalPhoneNumber,places.rating,places.userRatingCount,places.location";

pub struct GooglePlaces {
    api_key: SecretString,
    client: reqwest::Client,
}

impl GooglePlaces {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(serde::Deserialize)]
struct Response {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    display_name: Option<DisplayName>,
    formatted_address: Option<String>,
    national_phone_number: Option<String>,
    website_uri: Option<String>,
    rating: Option<f32>,
    user_rating_count: Option<u32>,
    location: Option<LatLng>,
}

#[derive(serde::Deserialize)]
struct DisplayName {
    #[serde(default)]
    text: String,
}

#[derive(serde::Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

/// Listings without a website have nothing to harvest and are skipped.
fn to_links(places: Vec<Place>, query: &str) -> Vec<Link> {
    places
        .into_iter()
        .filter_map(|place| {
            let website = place.website_uri.filter(|w| !w.trim().is_empty())?;
            let title = place.display_name.map(|d| d.text).unwrap_or_default();
            let listing = BusinessListing {
                latitude: place.location.as_ref().map(|l| l.latitude),
                longitude: place.location.as_ref().map(|l| l.longitude),
                rating: place.rating,
                rating_count: place.user_rating_count,
                phone: place.national_phone_number,
                address: place.formatted_address,
            };
            Some(Link::new(website, title, PROVIDER, query).with_listing(listing))
        })
        .collect()
}

#[async_trait]
impl SearchProvider for GooglePlaces {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Business
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Link>> {
        let body = serde_json::json!({
            "textQuery": query.text,
            "regionCode": query.country_code,
            "pageSize": query.limit.clamp(1, 20),
        });

        let response = self
            .client
            .post(ENDPOINT)
            .header("X-Goog-Api-Key", self.api_key.expose())
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        let data: Response = response.json().await.map_err(|e| malformed(PROVIDER, e))?;
        let total = data.places.len();
        let links = to_links(data.places, &query.text);

        debug!(query = %query.text, total, with_website = links.len(), "Places search complete");

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_places_without_website_skipped() {
        let data: Response = serde_json::from_value(serde_json::json!({
            "places": [
                {
                    "displayName": {"text": "Anu Caterers"},
                    "websiteUri": "https://anucaterers.in",
                    "rating": 4.6,
                    "userRatingCount": 212,
                    "formattedAddress": "MG Road, Ernakulam, Kochi, Kerala 682016",
                    "nationalPhoneNumber": "0484 235 1234",
                    "location": {"latitude": 9.93, "longitude": 76.26}
                },
                {
                    "displayName": {"text": "No Site Catering"},
                    "nationalPhoneNumber": "0484 299 0000",
                    "rating": 4.1
                }
            ]
        }))
        .unwrap();

        let links = to_links(data.places, "caterers in kochi");

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Anu Caterers");
        let listing = links[0].listing.as_ref().unwrap();
        assert_eq!(listing.rating_count, Some(212));
        assert_eq!(listing.latitude, Some(9.93));
        assert_eq!(listing.phone.as_deref(), Some("0484 235 1234"));
        assert_eq!(
            listing.address.as_deref(),
            Some("MG Road, Ernakulam, Kochi, Kerala 682016")
        );
    }
}
