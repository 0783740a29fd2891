use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: i64,
  pub name: String,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub course_id: Option<i64>,
  pub sort_order: i64,
  /// Number of problems linked to this topic (filled by list queries)
  pub problem_count: i64,
}

impl Topic {
  /// Case-insensitive match on name or description, used by the topic search box
  pub fn matches(&self, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
      return true;
    }
    self.name.to_lowercase().contains(&query) || self.description.to_lowercase().contains(&query)
  }
}
