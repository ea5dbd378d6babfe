use chrono::{Datelike, NaiveDate};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::ops::Deref;

use crate::images::{ImageResolver, ImageSize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "rating")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_count: u64,
    /// TMDB sends an empty string when the date is unknown.
    #[serde(default)]
    pub release_date: Option<String>,
}

impl MovieSummary {
    pub fn released_on(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .and_then(|d| d.parse().ok())
    }

    pub fn release_year(&self) -> Option<i32> {
        self.released_on().map(|d| d.year())
    }

    pub fn poster_url(&self, images: &ImageResolver, size: ImageSize) -> String {
        images.resolve(self.poster_path.as_deref(), size)
    }

    pub fn backdrop_url(&self, images: &ImageResolver, size: ImageSize) -> String {
        images.resolve(self.backdrop_path.as_deref(), size)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub budget: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub revenue: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
}

impl Deref for MovieDetail {
    type Target = MovieSummary;

    fn deref(&self) -> &MovieSummary {
        &self.summary
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PopularPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    #[serde(default)]
    pub results: Vec<MovieSummary>,
}

/// A decoded upstream record kept alongside the JSON it was decoded from.
///
/// Serializes as the original JSON, so relaying it never drops fields the
/// typed model does not name or reformats numbers.
#[derive(Debug, Clone)]
pub struct Verbatim<T> {
    value: T,
    raw: Value,
}

impl<T: DeserializeOwned> Verbatim<T> {
    pub fn from_json(raw: Value) -> Result<Self, serde_json::Error> {
        let value = T::deserialize(&raw)?;
        Ok(Self { value, raw })
    }
}

impl<T> Verbatim<T> {
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Verbatim<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Serialize for Verbatim<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

// TMDB occasionally sends `null` where a count or list is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
    if !(0.0..=10.0).contains(&value) {
        return Err(de::Error::custom(format!(
            "vote_average {} outside 0..=10",
            value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail_json() -> Value {
        json!({
            "id": 550,
            "title": "Fight Club",
            "overview": "A ticking-time-bomb insomniac...",
            "poster_path": "/poster.jpg",
            "backdrop_path": null,
            "vote_average": 8,
            "vote_count": 26280,
            "release_date": "1999-10-15",
            "tagline": "Mischief. Mayhem. Soap.",
            "runtime": 139,
            "budget": 63000000,
            "revenue": 100853753,
            "status": "Released",
            "original_language": "en",
            "genres": [{ "id": 18, "name": "Drama" }],
            "popularity": 61.416
        })
    }

    #[test]
    fn verbatim_keeps_original_json() {
        let detail = Verbatim::<MovieDetail>::from_json(detail_json()).unwrap();
        assert_eq!(detail.title, "Fight Club");
        assert_eq!(detail.genres[0].name, "Drama");
        assert_eq!(serde_json::to_value(&detail).unwrap(), detail_json());
    }

    #[test]
    fn release_year_handles_empty_dates() {
        let detail = Verbatim::<MovieDetail>::from_json(detail_json())
            .unwrap()
            .into_inner();
        assert_eq!(detail.release_year(), Some(1999));

        let mut raw = detail_json();
        raw["release_date"] = json!("");
        let blank: MovieDetail = serde_json::from_value(raw).unwrap();
        assert_eq!(blank.release_year(), None);
    }

    #[test]
    fn null_fields_still_decode() {
        let mut raw = detail_json();
        for field in [
            "overview",
            "status",
            "original_language",
            "tagline",
            "runtime",
            "release_date",
            "vote_average",
            "vote_count",
            "budget",
            "revenue",
            "genres",
        ] {
            raw[field] = Value::Null;
        }
        let detail = Verbatim::<MovieDetail>::from_json(raw.clone()).unwrap();
        assert_eq!(detail.overview, None);
        assert_eq!(detail.status, None);
        assert_eq!(detail.original_language, None);
        assert_eq!(detail.vote_average, 0.0);
        assert_eq!(detail.budget, 0);
        assert!(detail.genres.is_empty());
        assert_eq!(detail.release_year(), None);
        assert_eq!(serde_json::to_value(&detail).unwrap(), raw);
    }

    #[test]
    fn rating_outside_range_is_rejected() {
        let mut raw = detail_json();
        raw["vote_average"] = json!(11.5);
        assert!(serde_json::from_value::<MovieDetail>(raw).is_err());
    }

    #[test]
    fn image_helpers_fall_back_to_placeholder() {
        let detail: MovieDetail = serde_json::from_value(detail_json()).unwrap();
        let images = ImageResolver::default();
        assert_eq!(
            detail.poster_url(&images, ImageSize::W500),
            "https://image.tmdb.org/t/p/w500/poster.jpg"
        );
        assert_eq!(
            detail.backdrop_url(&images, ImageSize::Original),
            crate::images::PLACEHOLDER_IMAGE
        );
    }
}
