use serde::{Deserialize, Serialize};

/// Highest rating a review can carry (number of star icons on the page).
pub const MAX_RATING: u8 = 5;

/// Key used to recognise the same review rendered twice on a page.
/// The source page has no stable per-review id, so `(date, content)` stands in for one.
pub type DedupKey = (String, String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub date: String, // Display string as rendered, never parsed
    pub rating: u8, // Full stars, 0-5
    pub content: String, // May be empty
    pub useful_count: u32, // "Helpful" votes, 0 when missing
}

impl Review {
    pub fn new(date: impl Into<String>, rating: u8, content: impl Into<String>, useful_count: u32) -> Self {
        Self {
            date: date.into(),
            rating: rating.min(MAX_RATING),
            content: content.into(),
            useful_count,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        (self.date.clone(), self.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_is_clamped() {
        let review = Review::new("12 may", 9, "Excelente producto", 3);
        assert_eq!(review.rating, MAX_RATING);
    }

    #[test]
    fn test_serialized_field_names() {
        let review = Review::new("12 may", 4, "Excelente producto", 3);
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["date"], "12 may");
        assert_eq!(value["rating"], 4);
        assert_eq!(value["content"], "Excelente producto");
        assert_eq!(value["useful_count"], 3);
    }

    #[test]
    fn test_dedup_key_ignores_rating_and_votes() {
        let a = Review::new("12 may", 4, "Excelente producto", 3);
        let b = Review::new("12 may", 2, "Excelente producto", 0);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
