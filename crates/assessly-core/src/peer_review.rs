//! Peer-review assignment.
//!
//! Builds a balanced reviewer/reviewee graph for a cohort: a circulant design
//! laid over a uniformly random relabeling of the students. Every student
//! reviews exactly `r` peers and is reviewed by exactly `r` peers, and nobody
//! reviews their own work.

use std::collections::HashMap;
use std::hash::Hash;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AssignmentError;

/// One reviewer/reviewee pair within a coursework instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewAssignment<T> {
    pub reviewer: T,
    pub reviewee: T,
}

/// Assign `review_count` reviews per student using the thread-local RNG.
pub fn assign<T>(
    cohort: &[T],
    review_count: i64,
) -> Result<Vec<ReviewAssignment<T>>, AssignmentError>
where
    T: Clone + Eq + Hash,
{
    assign_with_rng(cohort, review_count, &mut rand::thread_rng())
}

/// Assign reviews with an explicit RNG, for reproducible assignments.
pub fn assign_with_rng<T, R>(
    cohort: &[T],
    review_count: i64,
    rng: &mut R,
) -> Result<Vec<ReviewAssignment<T>>, AssignmentError>
where
    T: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let n = cohort.len();
    if n < 2 {
        return Err(AssignmentError::InsufficientCohort { size: n });
    }
    let r = match usize::try_from(review_count) {
        Ok(r) if r >= 1 && r < n => r,
        _ => {
            return Err(AssignmentError::InvalidReviewCount {
                count: review_count,
                cohort: n,
            })
        }
    };

    let mut shuffled: Vec<&T> = cohort.iter().collect();
    shuffled.shuffle(rng);

    let mut assignments = Vec::with_capacity(n * r);
    for i in 0..n {
        for offset in 1..=r {
            assignments.push(ReviewAssignment {
                reviewer: shuffled[i].clone(),
                reviewee: shuffled[(i + offset) % n].clone(),
            });
        }
    }

    verify_balance(cohort, &assignments, r)?;
    tracing::debug!(cohort = n, reviews = r, "assigned {} peer reviews", assignments.len());
    Ok(assignments)
}

/// Check that every cohort member reviews and is reviewed exactly
/// `review_count` times and that nobody reviews themselves.
pub fn verify_balance<T>(
    cohort: &[T],
    assignments: &[ReviewAssignment<T>],
    review_count: usize,
) -> Result<(), AssignmentError>
where
    T: Eq + Hash,
{
    let mut given: HashMap<&T, usize> = HashMap::new();
    let mut received: HashMap<&T, usize> = HashMap::new();

    for assignment in assignments {
        if assignment.reviewer == assignment.reviewee {
            let position = cohort
                .iter()
                .position(|m| *m == assignment.reviewer)
                .unwrap_or(cohort.len());
            return Err(AssignmentError::AssignmentImbalance { position });
        }
        *given.entry(&assignment.reviewer).or_default() += 1;
        *received.entry(&assignment.reviewee).or_default() += 1;
    }

    for (position, member) in cohort.iter().enumerate() {
        let gave = given.get(member).copied().unwrap_or(0);
        let got = received.get(member).copied().unwrap_or(0);
        if gave != review_count || got != review_count {
            return Err(AssignmentError::AssignmentImbalance { position });
        }
    }

    Ok(())
}

/// Parse the review count from a coursework review-set string such as
/// `"count: 2, anonymous: true"`. The count is the value of the first field.
pub fn parse_review_count(review_set: &str) -> Result<i64, AssignmentError> {
    review_set
        .split(',')
        .next()
        .and_then(|field| field.split(':').nth(1))
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| AssignmentError::MalformedReviewSet(review_set.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn cohort(n: u32) -> Vec<u32> {
        (1..=n).collect()
    }

    fn counts(assignments: &[ReviewAssignment<u32>]) -> (HashMap<u32, usize>, HashMap<u32, usize>) {
        let mut given = HashMap::new();
        let mut received = HashMap::new();
        for a in assignments {
            *given.entry(a.reviewer).or_default() += 1;
            *received.entry(a.reviewee).or_default() += 1;
        }
        (given, received)
    }

    #[test]
    fn five_students_two_reviews_each() {
        let students = cohort(5);
        let assignments = assign(&students, 2).unwrap();
        assert_eq!(assignments.len(), 10);

        let (given, received) = counts(&assignments);
        for s in &students {
            assert_eq!(given[s], 2, "student {s} reviews");
            assert_eq!(received[s], 2, "student {s} is reviewed");
        }
        assert!(assignments.iter().all(|a| a.reviewer != a.reviewee));
    }

    #[test]
    fn pairs_are_distinct() {
        let assignments = assign(&cohort(8), 7).unwrap();
        let unique: HashSet<_> = assignments.iter().collect();
        assert_eq!(unique.len(), assignments.len());
    }

    #[test]
    fn balanced_for_every_valid_count() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 2..=9 {
            let students = cohort(n);
            for r in 1..n as i64 {
                let assignments = assign_with_rng(&students, r, &mut rng).unwrap();
                assert!(verify_balance(&students, &assignments, r as usize).is_ok());
            }
        }
    }

    #[test]
    fn seeded_assignment_is_reproducible() {
        let students = cohort(6);
        let a = assign_with_rng(&students, 2, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = assign_with_rng(&students, 2, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_student_is_insufficient() {
        assert_eq!(
            assign(&cohort(1), 1).unwrap_err(),
            AssignmentError::InsufficientCohort { size: 1 }
        );
        assert!(matches!(
            assign::<u32>(&[], 1).unwrap_err(),
            AssignmentError::InsufficientCohort { size: 0 }
        ));
    }

    #[test]
    fn review_count_must_be_below_cohort_size() {
        assert_eq!(
            assign(&cohort(5), 5).unwrap_err(),
            AssignmentError::InvalidReviewCount {
                count: 5,
                cohort: 5
            }
        );
        assert!(matches!(
            assign(&cohort(5), 0).unwrap_err(),
            AssignmentError::InvalidReviewCount { .. }
        ));
        assert!(matches!(
            assign(&cohort(5), -1).unwrap_err(),
            AssignmentError::InvalidReviewCount { .. }
        ));
    }

    #[test]
    fn duplicate_identities_are_caught_by_verification() {
        let students = vec![1, 2, 2];
        let err = assign(&students, 2).unwrap_err();
        assert!(matches!(err, AssignmentError::AssignmentImbalance { .. }));
    }

    #[test]
    fn verify_balance_detects_missing_review() {
        let students = cohort(3);
        let assignments = vec![
            ReviewAssignment { reviewer: 1, reviewee: 2 },
            ReviewAssignment { reviewer: 2, reviewee: 3 },
        ];
        assert_eq!(
            verify_balance(&students, &assignments, 1).unwrap_err(),
            AssignmentError::AssignmentImbalance { position: 0 }
        );
    }

    #[test]
    fn review_set_parsing() {
        assert_eq!(parse_review_count("count: 2, anonymous: true").unwrap(), 2);
        assert_eq!(parse_review_count("count:3").unwrap(), 3);
        assert!(matches!(
            parse_review_count("two reviews"),
            Err(AssignmentError::MalformedReviewSet(_))
        ));
    }
}
