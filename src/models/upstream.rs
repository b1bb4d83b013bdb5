// ============================================================================
// Upstream content API types
// ============================================================================

use serde::Deserialize;

use super::{metadata_from_json, Metadata, NewPost, RATING_RANGE};

/// User record from the upstream user listing
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UpstreamUser {
    #[serde(default)]
    pub username: Option<String>,
}

/// Post record from the upstream catalog or a user's engagement listing
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UpstreamPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub post_title: Option<String>,
    /// Either a plain name or an object with a `name` field
    #[serde(default)]
    pub category: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Present on rating listings; number or numeric string
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
}

impl UpstreamPost {
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.post_title.as_deref())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled")
    }

    pub fn category_name(&self) -> Option<String> {
        let name = match self.category.as_ref()? {
            serde_json::Value::String(name) => Some(name.clone()),
            serde_json::Value::Object(fields) => fields
                .get("name")
                .and_then(|name| name.as_str())
                .map(str::to_string),
            _ => None,
        };
        name.filter(|name| !name.is_empty())
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata
            .clone()
            .map(metadata_from_json)
            .unwrap_or_default()
    }

    /// The rating carried by the record, if it is a whole number in 1..=5
    pub fn rating_score(&self) -> Option<i16> {
        let score = match self.rating.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }?;

        i16::try_from(score)
            .ok()
            .filter(|score| RATING_RANGE.contains(score))
    }

    pub fn to_new_post(&self) -> NewPost {
        NewPost {
            title: self.title().to_string(),
            category: self.category_name(),
            metadata: Some(self.metadata()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> UpstreamPost {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_title_fallbacks() {
        assert_eq!(parse(json!({"title": "Focus"})).title(), "Focus");
        assert_eq!(parse(json!({"post_title": "Breathe"})).title(), "Breathe");
        assert_eq!(parse(json!({"title": "A", "post_title": "B"})).title(), "A");
        assert_eq!(parse(json!({})).title(), "Untitled");
        assert_eq!(parse(json!({"title": "  "})).title(), "Untitled");
    }

    #[test]
    fn test_category_shapes() {
        assert_eq!(
            parse(json!({"category": "fitness"})).category_name(),
            Some("fitness".to_string())
        );
        assert_eq!(
            parse(json!({"category": {"id": 2, "name": "Business"}})).category_name(),
            Some("Business".to_string())
        );
        assert_eq!(parse(json!({"category": null})).category_name(), None);
        assert_eq!(parse(json!({"category": ""})).category_name(), None);
        assert_eq!(parse(json!({"category": 4})).category_name(), None);
    }

    #[test]
    fn test_rating_score_parsing() {
        assert_eq!(parse(json!({"rating": 4})).rating_score(), Some(4));
        assert_eq!(parse(json!({"rating": "5"})).rating_score(), Some(5));
        assert_eq!(parse(json!({"rating": 9})).rating_score(), None);
        assert_eq!(parse(json!({"rating": 0})).rating_score(), None);
        assert_eq!(parse(json!({"rating": 3.5})).rating_score(), None);
        assert_eq!(parse(json!({})).rating_score(), None);
    }

    #[test]
    fn test_to_new_post_defaults_metadata() {
        let new_post = parse(json!({"title": "Calm", "category": "wellness"})).to_new_post();
        assert_eq!(new_post.title, "Calm");
        assert_eq!(new_post.category.as_deref(), Some("wellness"));
        assert_eq!(new_post.metadata, Some(Metadata::new()));
    }
}
