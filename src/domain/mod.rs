pub mod annotation;
pub mod problem;
pub mod taxonomy;

pub use annotation::{Bookmark, Difficulty, Note, Rating};
pub use problem::{HintLevel, Problem, ProblemDraft, ProblemTopic};
pub use taxonomy::{Course, Topic};
