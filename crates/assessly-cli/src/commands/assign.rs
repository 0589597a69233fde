//! The `assessly assign` command.

use anyhow::Result;
use comfy_table::{Cell, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;

use assessly_core::peer_review::{assign, assign_with_rng, parse_review_count};

use crate::OutputFormat;

pub fn execute(
    cohort: Vec<String>,
    reviews: Option<i64>,
    review_set: Option<String>,
    seed: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let cohort: Vec<String> = cohort
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let review_count = match (reviews, review_set) {
        (Some(count), _) => count,
        (None, Some(set)) => parse_review_count(&set)?,
        (None, None) => anyhow::bail!("either --reviews or --review-set is required"),
    };

    let assignments = match seed {
        Some(seed) => assign_with_rng(&cohort, review_count, &mut StdRng::seed_from_u64(seed))?,
        None => assign(&cohort, review_count)?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&assignments)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["Reviewer", "Reviewee"]);
            for a in &assignments {
                table.add_row(vec![Cell::new(&a.reviewer), Cell::new(&a.reviewee)]);
            }
            println!("{table}");
            println!(
                "{} assignment(s): {} student(s), {} review(s) each",
                assignments.len(),
                cohort.len(),
                review_count
            );
        }
    }

    Ok(())
}
