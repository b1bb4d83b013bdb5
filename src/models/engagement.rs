use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::{PostId, UserId};

/// Kind of interaction a user had with a post
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    View,
    Like,
    Inspire,
    Rating,
}

impl EngagementKind {
    pub const ALL: [EngagementKind; 4] = [
        EngagementKind::View,
        EngagementKind::Like,
        EngagementKind::Inspire,
        EngagementKind::Rating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::View => "view",
            EngagementKind::Like => "like",
            EngagementKind::Inspire => "inspire",
            EngagementKind::Rating => "rating",
        }
    }
}

impl Display for EngagementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EngagementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(EngagementKind::View),
            "like" => Ok(EngagementKind::Like),
            "inspire" => Ok(EngagementKind::Inspire),
            "rating" => Ok(EngagementKind::Rating),
            other => Err(format!("unknown engagement kind: {}", other)),
        }
    }
}

/// Lowest and highest rating a user can give
pub const RATING_RANGE: std::ops::RangeInclusive<i16> = 1..=5;

/// A recorded, immutable user interaction with a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Engagement {
    pub id: i64,
    pub user_id: UserId,
    pub post_id: PostId,
    pub kind: EngagementKind,
    /// Only set for `rating` engagements
    pub rating_score: Option<i16>,
    pub created_at: DateTime<Utc>,
}

/// Engagement waiting to be written to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewEngagement {
    pub user_id: UserId,
    pub post_id: PostId,
    pub kind: EngagementKind,
    pub rating_score: Option<i16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in EngagementKind::ALL {
            assert_eq!(kind.as_str().parse::<EngagementKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!("share".parse::<EngagementKind>().is_err());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&EngagementKind::Inspire).unwrap();
        assert_eq!(json, "\"inspire\"");
    }

    #[test]
    fn test_rating_range() {
        assert!(RATING_RANGE.contains(&1));
        assert!(RATING_RANGE.contains(&5));
        assert!(!RATING_RANGE.contains(&0));
        assert!(!RATING_RANGE.contains(&6));
    }
}
