use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};

// --- Normalized feed ---

/// A wall post that survived normalization: not an ad, not a duplicate,
/// and carrying at least one image URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub text: String,
    /// Image URLs in attachment order, without repeats.
    pub images: Vec<String>,
}

// --- Classification ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Cat,
    Dog,
}

impl Species {
    /// Map a species classifier label. `Ok(None)` means "neither cat nor dog".
    pub fn from_label(label: &str) -> Result<Option<Self>> {
        match label {
            "Cat" => Ok(Some(Species::Cat)),
            "Dog" => Ok(Some(Species::Dog)),
            "Other" => Ok(None),
            other => Err(CrawlError::UnexpectedClassifierLabel {
                classifier: "species",
                label: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Lost,
    Found,
}

impl CardType {
    pub fn from_label(label: &str) -> Result<Option<Self>> {
        match label {
            "Lost" => Ok(Some(CardType::Lost)),
            "Found" => Ok(Some(CardType::Found)),
            "NotRelevant/Other" => Ok(None),
            other => Err(CrawlError::UnexpectedClassifierLabel {
                classifier: "lost/found",
                label: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn from_label(label: &str) -> Result<Option<Self>> {
        match label {
            "Female" => Ok(Some(Sex::Female)),
            "Male" => Ok(Some(Sex::Male)),
            "NotDescribed/Other" => Ok(None),
            other => Err(CrawlError::UnexpectedClassifierLabel {
                classifier: "sex",
                label: other.to_string(),
            }),
        }
    }
}

/// Classification of a post that passed both gates. Species and card type
/// are never absent here; sex may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub species: Species,
    pub card_type: CardType,
    pub sex: Option<Sex>,
}

/// Outcome of running the classification pipeline over a post's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Classification),
    /// Species classifier answered "Other"; nothing else was asked.
    NoSpecies,
    /// Lost/found classifier answered "NotRelevant/Other"; sex was not asked.
    NoCardType(Species),
}

// --- Images ---

/// Downloaded image bytes with the extension used on disk (`jpg`, `png`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub mime_kind: String,
    pub bytes: Vec<u8>,
}

// --- Card ---

/// Location attached to every card. The source has no geodata, so it is
/// configured per crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "CoordsProvenance")]
    pub coords_provenance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "Tel")]
    pub tel: Vec<String>,
    #[serde(rename = "Website")]
    pub website: Vec<String>,
    #[serde(rename = "Email")]
    pub email: Vec<String>,
    #[serde(rename = "Name")]
    pub name: String,
}

/// An image entry of a card. Before persistence `kind` is the image
/// extension and `data` the base64 payload; afterwards `kind` is `"file"` and
/// `data` the file name inside the card directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardImage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub uid: String,
    pub animal: Species,
    pub location: Location,
    pub event_time: String,
    pub event_time_provenance: String,
    pub card_type: CardType,
    pub contact_info: ContactInfo,
    pub images: Vec<CardImage>,
    pub provenance_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub animal_sex: Option<Sex>,
}
