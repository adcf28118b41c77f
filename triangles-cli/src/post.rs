//! Picture post composition

use crate::photo::Photo;
use regex::Regex;
use std::sync::OnceLock;
use triangles_core::{BuildError, KIND_PICTURE, Record, RecordBuilder, Tag, XOnlyPublicKey};

pub const FALLBACK_URLS: [&str; 2] = [
    "https://nostrcheck.me/alt2.jpg",
    "https://void.cat/alt2.jpg",
];

static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_whitespace_regex() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s").expect("Failed to compile whitespace regex"))
}

/// Hashtag form of a label: whitespace becomes `_`
pub fn hashtag(label: &str) -> String {
    get_whitespace_regex().replace_all(label.trim(), "_").into_owned()
}

/// Description line followed by ` #tag ` for every provider and extra tag
pub fn compose_content(photo: &Photo, additional_tags: &[String]) -> String {
    let mut content = format!("{}\n", photo.description);
    for label in photo.tags.iter().chain(additional_tags) {
        content.push_str(&format!(" #{} ", hashtag(label)));
    }
    content
}

/// NIP-92 media entry for one image URL
pub fn imeta(url: &str, photo: &Photo) -> Tag {
    let mut values = vec![
        "imeta".to_string(),
        format!("url {url}"),
        "m image/jpeg".to_string(),
        format!("blurhash {}", photo.blur_hash),
        format!("dim {}x{}", photo.width, photo.height),
        format!("alt {}", photo.description),
        format!("location {}", photo.location_name),
    ];
    values.extend(FALLBACK_URLS.iter().map(|url| format!("fallback {url}")));
    Tag::new(values)
}

/// Tag list of a picture post: title, rendered and original media, then topics
pub fn post_tags(photo: &Photo, hosted_url: &str, additional_tags: &[String]) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(3 + photo.tags.len() + additional_tags.len());
    tags.push(Tag::new(["title", photo.description.as_str()]));
    tags.push(imeta(hosted_url, photo));
    tags.push(imeta(&photo.image_url, photo));
    tags.extend(
        photo
            .tags
            .iter()
            .chain(additional_tags)
            .map(|label| Tag::new(["t", label.as_str()])),
    );
    tags
}

/// Build the unsigned kind 20 post for a photo and its hosted rendering
pub fn picture_post(
    photo: &Photo,
    hosted_url: &str,
    additional_tags: &[String],
    author: XOnlyPublicKey,
    created_at: u64,
) -> Result<Record, BuildError> {
    RecordBuilder::new()
        .author(author)
        .created_at(created_at)
        .kind(KIND_PICTURE)
        .content(compose_content(photo, additional_tags))
        .tags(post_tags(photo, hosted_url, additional_tags))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use triangles_core::Keys;

    fn photo() -> Photo {
        Photo {
            id: "abc".to_string(),
            image_url: "https://images.unsplash.com/abc".to_string(),
            width: 1080,
            height: 720,
            description: "a quiet cafe".to_string(),
            blur_hash: "LKO2?U%2Tw=w".to_string(),
            location_name: "Lisbon".to_string(),
            tags: vec!["coffee shop".to_string(), "interior".to_string()],
        }
    }

    #[test]
    fn test_hashtag() {
        assert_eq!(hashtag("coffee shop"), "coffee_shop");
        assert_eq!(hashtag(" art "), "art");
        assert_eq!(hashtag("a b\tc"), "a_b_c");
    }

    #[test]
    fn test_compose_content() {
        let content = compose_content(&photo(), &["triangles".to_string()]);
        assert_eq!(
            content,
            "a quiet cafe\n #coffee_shop  #interior  #triangles "
        );
    }

    #[test]
    fn test_post_tags_layout() {
        let tags = post_tags(&photo(), "https://cdn.example/r.png", &["art".to_string()]);

        assert_eq!(tags.len(), 6);
        assert_eq!(tags[0].values, vec!["title", "a quiet cafe"]);
        assert_eq!(tags[1].key(), Some("imeta"));
        assert_eq!(tags[1].get(1), Some("url https://cdn.example/r.png"));
        assert_eq!(tags[2].get(1), Some("url https://images.unsplash.com/abc"));
        assert_eq!(tags[3].values, vec!["t", "coffee shop"]);
        assert_eq!(tags[4].values, vec!["t", "interior"]);
        assert_eq!(tags[5].values, vec!["t", "art"]);
    }

    #[test]
    fn test_imeta_fields() {
        let tag = imeta("https://cdn.example/r.png", &photo());
        assert_eq!(
            tag.values,
            vec![
                "imeta",
                "url https://cdn.example/r.png",
                "m image/jpeg",
                "blurhash LKO2?U%2Tw=w",
                "dim 1080x720",
                "alt a quiet cafe",
                "location Lisbon",
                "fallback https://nostrcheck.me/alt2.jpg",
                "fallback https://void.cat/alt2.jpg",
            ]
        );
    }

    #[test]
    fn test_picture_post() {
        let keys = Keys::generate();
        let record = picture_post(
            &photo(),
            "https://cdn.example/r.png",
            &[],
            keys.public_key(),
            1_700_000_000,
        )
        .unwrap();

        assert_eq!(record.kind, KIND_PICTURE);
        assert_eq!(record.author, Some(keys.public_key()));
        assert_eq!(record.created_at, 1_700_000_000);
        assert!(record.id.is_some());
        assert!(record.sig.is_none());
    }
}
