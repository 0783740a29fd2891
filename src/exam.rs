//! Practice exams built from a user's own difficulty ratings.
//!
//! Generated exams live in an in-memory store keyed by a random id and
//! expire after a day of inactivity.

use crate::auth::password::random_token;
use crate::config;
use crate::domain::Difficulty;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::{BTreeSet, HashMap};
use std::sync::{LazyLock, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamError {
  NoDifficultySelected,
  NoRatedProblems,
}

impl std::fmt::Display for ExamError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::NoDifficultySelected => write!(f, "Select at least one difficulty level"),
      Self::NoRatedProblems => write!(f, "No rated problems match the selected difficulties"),
    }
  }
}

impl std::error::Error for ExamError {}

#[derive(Debug, Clone)]
pub struct Exam {
  pub id: String,
  pub owner: i64,
  pub problem_ids: Vec<i64>,
  /// Rating each problem had when the exam was generated
  pub difficulties: HashMap<i64, Difficulty>,
  pub created_at: DateTime<Utc>,
}

/// Sample up to `size` problems from the user's rated problems.
///
/// Each selected difficulty contributes at most `ceil(size / n_selected)`
/// distinct problems; the union is then sampled down to `size`.
pub fn sample_problems<R: Rng + ?Sized>(
  ratings: &[(i64, Difficulty)],
  selected: &[Difficulty],
  size: usize,
  rng: &mut R,
) -> Result<(Vec<i64>, HashMap<i64, Difficulty>), ExamError> {
  let selected: BTreeSet<Difficulty> = selected.iter().copied().collect();
  if selected.is_empty() {
    return Err(ExamError::NoDifficultySelected);
  }

  let per_level = size.div_ceil(selected.len());
  let mut difficulty_map = HashMap::new();
  let mut pool = Vec::new();

  for level in &selected {
    let ids: Vec<i64> = ratings
      .iter()
      .filter(|(_, d)| d == level)
      .map(|(id, _)| *id)
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    for id in ids.choose_multiple(rng, per_level) {
      if !difficulty_map.contains_key(id) {
        difficulty_map.insert(*id, *level);
        pool.push(*id);
      }
    }
  }

  if pool.is_empty() {
    return Err(ExamError::NoRatedProblems);
  }

  let problem_ids: Vec<i64> = pool.choose_multiple(rng, size).copied().collect();
  difficulty_map.retain(|id, _| problem_ids.contains(id));
  Ok((problem_ids, difficulty_map))
}

/// Build an exam for `owner` and keep it in the store
pub fn generate_exam(
  owner: i64,
  ratings: &[(i64, Difficulty)],
  selected: &[Difficulty],
) -> Result<Exam, ExamError> {
  let (problem_ids, difficulties) =
    sample_problems(ratings, selected, config::EXAM_SIZE, &mut rand::rng())?;
  let exam = Exam {
    id: random_token(16),
    owner,
    problem_ids,
    difficulties,
    created_at: Utc::now(),
  };
  store_exam(exam.clone());
  Ok(exam)
}

struct ExamEntry {
  exam: Exam,
  last_access: DateTime<Utc>,
}

static EXAMS: LazyLock<Mutex<HashMap<String, ExamEntry>>> =
  LazyLock::new(|| Mutex::new(HashMap::new()));

pub fn store_exam(exam: Exam) {
  let mut exams = EXAMS.lock().unwrap_or_else(PoisonError::into_inner);

  // Drop stale exams now and then (~10% of inserts)
  if rand::random::<u8>() < config::EXAM_CLEANUP_THRESHOLD {
    cleanup_expired(&mut exams);
  }

  exams.insert(
    exam.id.clone(),
    ExamEntry {
      exam,
      last_access: Utc::now(),
    },
  );
}

/// Look up an exam; other users' exams are invisible
pub fn get_exam(id: &str, owner: i64) -> Option<Exam> {
  let mut exams = EXAMS.lock().unwrap_or_else(PoisonError::into_inner);
  let expiry = Utc::now() - Duration::hours(config::EXAM_EXPIRY_HOURS);

  let entry = exams.get_mut(id)?;
  if entry.exam.owner != owner || entry.last_access <= expiry {
    return None;
  }
  entry.last_access = Utc::now();
  Some(entry.exam.clone())
}

fn cleanup_expired(exams: &mut HashMap<String, ExamEntry>) {
  let expiry = Utc::now() - Duration::hours(config::EXAM_EXPIRY_HOURS);
  exams.retain(|_, entry| entry.last_access > expiry);
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  fn ratings() -> Vec<(i64, Difficulty)> {
    let mut r = Vec::new();
    for id in 1..=8 {
      r.push((id, Difficulty::Easy));
    }
    for id in 11..=18 {
      r.push((id, Difficulty::Medium));
    }
    for id in 21..=23 {
      r.push((id, Difficulty::Hard));
    }
    r
  }

  #[test]
  fn test_sample_requires_a_difficulty() {
    let mut rng = StdRng::seed_from_u64(1);
    let err = sample_problems(&ratings(), &[], 10, &mut rng).unwrap_err();
    assert_eq!(err, ExamError::NoDifficultySelected);
  }

  #[test]
  fn test_sample_no_matching_ratings() {
    let mut rng = StdRng::seed_from_u64(1);
    let only_easy = vec![(1, Difficulty::Easy)];
    let err = sample_problems(&only_easy, &[Difficulty::Hard], 10, &mut rng).unwrap_err();
    assert_eq!(err, ExamError::NoRatedProblems);
  }

  #[test]
  fn test_sample_single_level_caps_at_size() {
    let mut rng = StdRng::seed_from_u64(7);
    let (ids, map) = sample_problems(&ratings(), &[Difficulty::Easy], 5, &mut rng).unwrap();
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|id| (1..=8).contains(id)));
    assert!(map.values().all(|d| *d == Difficulty::Easy));
  }

  #[test]
  fn test_sample_splits_quota_between_levels() {
    let mut rng = StdRng::seed_from_u64(3);
    // ceil(10 / 2) = 5 from each level
    let (ids, map) =
      sample_problems(&ratings(), &[Difficulty::Easy, Difficulty::Medium], 10, &mut rng).unwrap();
    assert_eq!(ids.len(), 10);
    let easy = map.values().filter(|d| **d == Difficulty::Easy).count();
    assert_eq!(easy, 5);
  }

  #[test]
  fn test_sample_small_level_contributes_everything() {
    let mut rng = StdRng::seed_from_u64(9);
    let (ids, _) = sample_problems(&ratings(), &[Difficulty::Hard], 10, &mut rng).unwrap();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(sorted, vec![21, 22, 23]);
  }

  #[test]
  fn test_sample_ids_are_unique() {
    let mut rng = StdRng::seed_from_u64(11);
    let (ids, map) = sample_problems(&ratings(), &Difficulty::ALL, 10, &mut rng).unwrap();
    let unique: BTreeSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(map.len(), ids.len());
  }

  #[test]
  fn test_store_scopes_exams_to_owner() {
    let exam = generate_exam(42, &ratings(), &[Difficulty::Medium]).unwrap();
    assert!(get_exam(&exam.id, 42).is_some());
    assert!(get_exam(&exam.id, 43).is_none());
    assert!(get_exam("missing", 42).is_none());
  }
}
