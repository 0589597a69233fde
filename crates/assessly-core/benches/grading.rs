use criterion::{black_box, criterion_group, criterion_main, Criterion};

use assessly_core::grading::grade_submission;
use assessly_core::model::{AnswerKind, Question, QuestionBank, SubmittedAnswers};
use assessly_core::peer_review::assign_with_rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bank(size: u32) -> QuestionBank {
    let questions = (1..=size)
        .map(|number| {
            if number > size / 2 {
                Question {
                    number,
                    answer: "AC".into(),
                    kind: AnswerKind::PairedChoice,
                }
            } else {
                Question {
                    number,
                    answer: "river|stream".into(),
                    kind: AnswerKind::ExactMatch,
                }
            }
        })
        .collect();
    QuestionBank {
        id: 1,
        name: "Bench".into(),
        essay: None,
        questions,
    }
}

fn answers(size: u32) -> SubmittedAnswers {
    let mut exact = serde_json::Map::new();
    let mut paired = serde_json::Map::new();
    for number in 1..=size {
        if number > size / 2 {
            paired.insert(number.to_string(), "CA".into());
        } else {
            exact.insert(number.to_string(), "stream".into());
        }
    }
    let json = serde_json::json!({ "judgement": exact, "multiChoice": paired });
    SubmittedAnswers::from_json(&json).expect("valid answers")
}

fn bench_grading(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade_submission");

    for size in [40, 400] {
        let bank = bank(size);
        let submitted = answers(size);
        group.bench_function(format!("{size}_questions"), |b| {
            b.iter(|| grade_submission(black_box(&bank), black_box(&submitted)))
        });
    }

    group.finish();
}

fn bench_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("peer_review_assign");

    for (cohort, reviews) in [(30, 3), (300, 5)] {
        let students: Vec<u32> = (0..cohort).collect();
        group.bench_function(format!("{cohort}x{reviews}"), |b| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| assign_with_rng(black_box(&students), reviews, &mut rng))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grading, bench_assignment);
criterion_main!(benches);
