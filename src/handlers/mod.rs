pub mod admin;
pub mod annotations;
pub mod api;
pub mod exam;
pub mod home;

use axum::response::Redirect;
use serde::Deserialize;

use crate::auth::AuthContext;

/// One-shot toast messages carried in the query string after a redirect
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
  pub notice: Option<String>,
  pub error: Option<String>,
}

/// Fields every page needs for the navbar and toasts
#[derive(Debug, Clone, Default)]
pub struct PageContext {
  pub username: String,
  pub is_admin: bool,
  pub notice: Option<String>,
  pub error: Option<String>,
}

impl PageContext {
  pub fn new(auth: &AuthContext, flash: Flash) -> Self {
    Self {
      username: auth.username.clone(),
      is_admin: auth.is_admin,
      notice: flash.notice.filter(|s| !s.trim().is_empty()),
      error: flash.error.filter(|s| !s.trim().is_empty()),
    }
  }
}

fn with_query(path: &str, key: &str, message: &str) -> String {
  let (base, fragment) = match path.split_once('#') {
    Some((base, fragment)) => (base, Some(fragment)),
    None => (path, None),
  };
  let sep = if base.contains('?') { '&' } else { '?' };
  let mut url = format!("{}{}{}={}", base, sep, key, urlencoding::encode(message));
  if let Some(fragment) = fragment {
    url.push('#');
    url.push_str(fragment);
  }
  url
}

/// Redirect showing a success toast
pub fn redirect_notice(path: &str, message: &str) -> Redirect {
  Redirect::to(&with_query(path, "notice", message))
}

/// Redirect showing an error toast
pub fn redirect_error(path: &str, message: &str) -> Redirect {
  Redirect::to(&with_query(path, "error", message))
}

/// Parse a comma-separated id list, ignoring anything that is not a number
pub fn parse_id_list(input: &str) -> Vec<i64> {
  input
    .split(',')
    .filter_map(|s| s.trim().parse().ok())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_with_query_appends_encoded_message() {
    assert_eq!(with_query("/", "notice", "Note saved"), "/?notice=Note%20saved");
    assert_eq!(
      with_query("/?date=2024-03-01", "error", "a&b"),
      "/?date=2024-03-01&error=a%26b"
    );
  }

  #[test]
  fn test_with_query_keeps_fragment_last() {
    assert_eq!(
      with_query("/exam/abc#problem-3", "notice", "ok"),
      "/exam/abc?notice=ok#problem-3"
    );
  }

  #[test]
  fn test_parse_id_list() {
    assert_eq!(parse_id_list("3, 1,x,,2"), vec![3, 1, 2]);
    assert!(parse_id_list("").is_empty());
  }

  #[test]
  fn test_page_context_drops_blank_flash() {
    let auth = AuthContext {
      user_id: 1,
      username: "alice".into(),
      email: "a@b.co".into(),
      groups: vec![],
      is_admin: false,
    };
    let page = PageContext::new(
      &auth,
      Flash {
        notice: Some("  ".into()),
        error: Some("Oops".into()),
      },
    );
    assert!(page.notice.is_none());
    assert_eq!(page.error.as_deref(), Some("Oops"));
  }
}
