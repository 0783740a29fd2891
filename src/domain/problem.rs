use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Date format used for publish dates everywhere (forms, URLs, database)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
  pub id: i64,
  /// Problem statement; may contain HTML from the editor and LaTeX
  pub content: String,
  /// Day the problem is shown as "problem of the day"
  pub publish_date: Option<NaiveDate>,
  pub hint: Option<String>,
  pub tags: Vec<String>,
  /// Link to a written solution
  pub w_solution: Option<String>,
  /// Link to a video solution
  pub v_solution: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a problem
#[derive(Debug, Clone, Default)]
pub struct ProblemDraft {
  pub content: String,
  pub publish_date: Option<NaiveDate>,
  pub hint: Option<String>,
  pub tags: Vec<String>,
  pub w_solution: Option<String>,
  pub v_solution: Option<String>,
}

/// Join row between a problem and a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemTopic {
  pub id: i64,
  pub problem_id: i64,
  pub topic_id: i64,
}

/// Hint detail requested from the LLM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
  Subtle,
  Medium,
  Detailed,
  #[serde(other)]
  General,
}

impl HintLevel {
  /// Unknown levels fall back to a general hint
  pub fn from_str(s: &str) -> Self {
    match s {
      "subtle" => Self::Subtle,
      "medium" => Self::Medium,
      "detailed" => Self::Detailed,
      _ => Self::General,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Subtle => "subtle",
      Self::Medium => "medium",
      Self::Detailed => "detailed",
      Self::General => "general",
    }
  }
}

/// Split a comma-separated tag string, trimming and dropping empty entries
pub fn parse_tags(input: &str) -> Vec<String> {
  input
    .split(',')
    .map(|t| t.trim())
    .filter(|t| !t.is_empty())
    .map(|t| t.to_string())
    .collect()
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

/// Plain-text preview of problem content: tags stripped, whitespace collapsed
pub fn preview(content: &str, max_chars: usize) -> String {
  let text = crate::latex::strip_html(content);
  let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
  if collapsed.chars().count() <= max_chars {
    collapsed
  } else {
    let truncated: String = collapsed.chars().take(max_chars).collect();
    format!("{}…", truncated.trim_end())
  }
}
