use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::types::{Card, CardImage, Classification, ContactInfo, Location, Post, ResolvedImage};

/// Prefix of every card uid produced by this crawler.
pub const SOURCE_PREFIX: &str = "vk";

pub const COORDS_PROVENANCE: &str = "Hardcoded in crawler configuration";

/// "Time the post was published".
pub const EVENT_TIME_PROVENANCE: &str = "Время публикации поста";

/// Strip the characters used as uid delimiters from a group name.
pub fn escape_group_name(name: &str) -> String {
    name.chars().filter(|c| *c != '_' && *c != '.').collect()
}

pub fn location(address: &str, lat: f64, lon: f64) -> Location {
    Location {
        address: address.to_string(),
        lat,
        lon,
        coords_provenance: COORDS_PROVENANCE.to_string(),
    }
}

/// Build the card for a classified post. Images are embedded as base64 until
/// the emitter swaps them for file names.
pub fn assemble(
    escaped_group: &str,
    location: &Location,
    post: &Post,
    classification: &Classification,
    images: &[ResolvedImage],
) -> Card {
    Card {
        uid: format!("{SOURCE_PREFIX}-{escaped_group}_{}", post.id),
        animal: classification.species,
        location: location.clone(),
        event_time: post.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        event_time_provenance: EVENT_TIME_PROVENANCE.to_string(),
        card_type: classification.card_type,
        contact_info: ContactInfo {
            comment: post.text.clone(),
            tel: Vec::new(),
            website: Vec::new(),
            email: Vec::new(),
            name: String::new(),
        },
        images: images
            .iter()
            .map(|image| CardImage {
                kind: image.mime_kind.clone(),
                data: STANDARD.encode(&image.bytes),
            })
            .collect(),
        provenance_url: format!("https://vk.com/wall{}_{}", post.owner_id, post.id),
        animal_sex: classification.sex,
    }
}
