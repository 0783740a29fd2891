//! Admin pages: course/topic taxonomy, problem authoring, the scheduling
//! calendar and user management. Every handler takes `AdminContext`.

mod courses;
mod problems;
mod schedule;
mod users;

pub use courses::{
  create_course, create_topic, delete_topic, sort_page, sort_submit, topic_details, topics_page,
  update_course, update_topic, CourseForm, CoursesQuery, CoursesTemplate, DeleteTopicForm,
  SortForm, SortTemplate, TopicDetailsTemplate, TopicForm,
};
pub use problems::{
  delete_problem, new_problem, save_problem, ProblemForm, ProblemFormQuery, ProblemFormTemplate,
  TopicOption,
};
pub use schedule::{schedule_page, ScheduleCard, ScheduleDay, ScheduleMonth, ScheduleTemplate};
pub use users::{set_admin, users_page, AdminToggleForm, UsersTemplate};

/// Parse an optional id from a form field; blank or malformed means none
pub(crate) fn parse_optional_id(value: &str) -> Option<i64> {
  value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_optional_id() {
    assert_eq!(parse_optional_id(" 12 "), Some(12));
    assert_eq!(parse_optional_id(""), None);
    assert_eq!(parse_optional_id("abc"), None);
  }
}
