use crate::DocId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "rating_from_any")]
    pub rating: i64,
    pub date: String,
}

/// A product page as delivered by the crawler. `url` is the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: DocId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub product_features: BTreeMap<String, String>,
    #[serde(default)]
    pub product_reviews: Vec<Review>,
    #[serde(default, alias = "region")]
    pub origin: Option<String>,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            product_features: BTreeMap::new(),
            product_reviews: Vec::new(),
            origin: None,
        }
    }

    pub fn with_feature(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.product_features.insert(key.into(), value.into());
        self
    }

    pub fn with_review(mut self, rating: i64, date: impl Into<String>) -> Self {
        self.product_reviews.push(Review { rating, date: date.into() });
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Last path segment of the url, query string removed.
    pub fn product_id(&self) -> &str {
        let last = last_segment(&self.url);
        last.split('?').next().unwrap_or(last)
    }

    /// Value of the query parameter carried by the last path segment, e.g.
    /// `variant=blue-42` gives `blue-42`.
    pub fn variant(&self) -> Option<&str> {
        let (_, query) = last_segment(&self.url).split_once('?')?;
        query.split_once('=').map(|(_, v)| v)
    }
}

/// A searchable text field of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Description,
}

impl Field {
    pub fn text(self, doc: &Document) -> &str {
        match self {
            Field::Title => &doc.title,
            Field::Description => &doc.description,
        }
    }
}

fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn rating_from_any<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }
    match Raw::deserialize(de)? {
        Raw::Int(v) => Ok(v),
        Raw::Float(v) if v.fract() == 0.0 => Ok(v as i64),
        Raw::Float(v) => Err(serde::de::Error::custom(format!("rating {v} is not an integer"))),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("rating '{s}' is not an integer"))),
    }
}
