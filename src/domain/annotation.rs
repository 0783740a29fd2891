use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Self-reported difficulty of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }

  /// Capitalized label for buttons and badges
  pub fn label(&self) -> &'static str {
    match self {
      Self::Easy => "Easy",
      Self::Medium => "Medium",
      Self::Hard => "Hard",
    }
  }
}

/// A user's private note on a problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
  pub id: i64,
  pub owner: i64,
  pub problem_id: i64,
  pub content: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
  pub id: i64,
  pub owner: i64,
  pub problem_id: i64,
  pub date: NaiveDate,
}

/// One rating per user per problem; re-rating overwrites the value and date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
  pub id: i64,
  pub owner: i64,
  pub problem_id: i64,
  pub rating: Difficulty,
  pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_difficulty_from_str() {
    assert_eq!(Difficulty::from_str("easy"), Some(Difficulty::Easy));
    assert_eq!(Difficulty::from_str("medium"), Some(Difficulty::Medium));
    assert_eq!(Difficulty::from_str("hard"), Some(Difficulty::Hard));
  }

  #[test]
  fn test_difficulty_from_str_is_case_sensitive() {
    assert_eq!(Difficulty::from_str("Easy"), None);
    assert_eq!(Difficulty::from_str(""), None);
    assert_eq!(Difficulty::from_str("extreme"), None);
  }

  #[test]
  fn test_difficulty_as_str_roundtrip() {
    for d in Difficulty::ALL {
      assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
    }
  }

  #[test]
  fn test_difficulty_serde_lowercase() {
    let json = serde_json::to_string(&Difficulty::Medium).unwrap();
    assert_eq!(json, "\"medium\"");
    let parsed: Difficulty = serde_json::from_str("\"hard\"").unwrap();
    assert_eq!(parsed, Difficulty::Hard);
  }
}
