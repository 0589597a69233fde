use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use assessly_core::bank::parse_bank_str;
use assessly_core::parser::parse_evaluation;

fn bench_parse_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_evaluation");

    let plain = "TR: 7\nCC: 6\nLR: 8\nGRA: 7\nEvaluation: Good structure.";

    let verbose = {
        let mut s = String::from("Here is my assessment of the essay.\n\n");
        for _ in 0..20 {
            s.push_str("The candidate addresses the prompt but develops ideas unevenly. ");
        }
        s.push_str("\n\n**TA: 6**\n**CC: 7**\n**LR: 6**\n**GRA: 5**\n\nEvaluation:\n");
        for _ in 0..40 {
            s.push_str("Vary sentence structure and use more precise vocabulary. ");
        }
        s
    };

    let missing_task = "CC: 6\nLR: 6\nGRA: 6";

    group.bench_function("plain", |b| b.iter(|| parse_evaluation(black_box(plain))));
    group.bench_function("verbose", |b| {
        b.iter(|| parse_evaluation(black_box(&verbose)))
    });
    group.bench_function("missing_task", |b| {
        b.iter(|| parse_evaluation(black_box(missing_task)))
    });

    group.finish();
}

fn bench_bank_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("bank_parsing");

    for size in [10, 40, 200] {
        let toml = generate_bank_toml(size);
        group.bench_function(format!("{size}_questions"), |b| {
            b.iter(|| parse_bank_str(black_box(&toml), Path::new("bench.toml")))
        });
    }

    group.finish();
}

fn generate_bank_toml(questions: u32) -> String {
    let mut s = String::from("[bank]\nid = 1\nname = \"Bench\"\n");
    for n in 1..=questions {
        let (answer, kind) = if n % 5 == 0 || n % 5 == 1 {
            ("BD", "paired_choice")
        } else {
            ("TRUE|YES", "exact_match")
        };
        s.push_str(&format!(
            "\n[[questions]]\nnumber = {n}\nanswer = \"{answer}\"\nkind = \"{kind}\"\n"
        ));
    }
    s
}

criterion_group!(benches, bench_parse_evaluation, bench_bank_parsing);
criterion_main!(benches);
