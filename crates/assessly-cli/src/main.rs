//! assessly CLI: runs the assessment core from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "assessly",
    version,
    about = "Coursework assessment: grading, essay evaluation, and peer review"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission against a question bank
    Grade {
        /// Path to the .toml question bank
        #[arg(long)]
        bank: PathBuf,

        /// Path to the submitted answers (JSON object keyed by answer type)
        #[arg(long)]
        answers: PathBuf,

        /// Also evaluate the first free-text answer with the configured provider
        #[arg(long)]
        evaluate: bool,

        /// Submission id recorded with the grade
        #[arg(long, default_value = "1")]
        submission: i64,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Assign peer reviews across a cohort
    Assign {
        /// Comma-separated student identifiers
        #[arg(long, value_delimiter = ',', required = true)]
        cohort: Vec<String>,

        /// Reviews each student gives and receives
        #[arg(long, conflicts_with = "review_set", required_unless_present = "review_set")]
        reviews: Option<i64>,

        /// Coursework review-set string, e.g. "count: 2, anonymous: true"
        #[arg(long)]
        review_set: Option<String>,

        /// Seed for a reproducible assignment
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Evaluate an essay with the configured provider
    Evaluate {
        /// Path to the essay text
        #[arg(long)]
        essay: PathBuf,

        /// Writing task: 1/report or 2/argument
        #[arg(long, default_value = "argument")]
        task: String,

        /// Essay question or title
        #[arg(long)]
        title: Option<String>,

        /// Chart description for report essays
        #[arg(long)]
        chart: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Parse raw provider output into scores and a band
    Parse {
        /// File holding the provider output; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Audit a peer review against the provider's evaluation of the essay
    Audit {
        /// Path to the reviewed essay
        #[arg(long)]
        essay: PathBuf,

        /// Path to the provider's evaluation of the essay (KEY: score lines)
        #[arg(long)]
        reference: PathBuf,

        /// Path to the review (JSON with reviewer, scores, comments)
        #[arg(long)]
        review: PathBuf,

        /// Submission the review belongs to
        #[arg(long, default_value = "1")]
        submission: i64,

        /// Id the verdict is recorded under
        #[arg(long, default_value = "1")]
        review_id: i64,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and example bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("assessly=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            bank,
            answers,
            evaluate,
            submission,
            format,
            config,
        } => commands::grade::execute(bank, answers, evaluate, submission, format, config).await,
        Commands::Assign {
            cohort,
            reviews,
            review_set,
            seed,
            format,
        } => commands::assign::execute(cohort, reviews, review_set, seed, format),
        Commands::Evaluate {
            essay,
            task,
            title,
            chart,
            format,
            config,
        } => commands::evaluate::execute(essay, task, title, chart, format, config).await,
        Commands::Audit {
            essay,
            reference,
            review,
            submission,
            review_id,
            format,
            config,
        } => {
            commands::audit::execute(
                essay, reference, review, submission, review_id, format, config,
            )
            .await
        }
        Commands::Parse { input, format } => commands::parse::execute(input, format),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
