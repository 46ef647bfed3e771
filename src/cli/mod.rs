// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// A typical k-fold run:
//   1. `split`           — labelled csv → data_0 … data_{k-1}
//   2. `cross-validate`  — train + predict each fold, then combine
// or step by step with `train`, `predict` and `combine`.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{
    CombineArgs, Commands, CrossValidateArgs, PredictArgs, SplitArgs, TrainArgs, VocabArgs,
};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "pair-match",
    version,
    about = "Chinese sentence-pair classification with pinyin and word side channels."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Split(args)         => run_split(args),
            Commands::Vocab(args)         => run_vocab(args),
            Commands::Train(args)         => run_train(args),
            Commands::Predict(args)       => run_predict(args),
            Commands::CrossValidate(args) => run_cross_validate(args),
            Commands::Combine(args)       => run_combine(args),
        }
    }
}

fn run_split(args: SplitArgs) -> Result<()> {
    use crate::application::split_use_case::SplitUseCase;

    let dirs = SplitUseCase::new(args.input, args.test, args.out_dir, args.folds, args.seed).execute()?;
    for dir in &dirs {
        println!("Wrote {}", dir.display());
    }
    Ok(())
}

fn run_vocab(args: VocabArgs) -> Result<()> {
    use crate::application::vocab_use_case::VocabUseCase;

    let report = VocabUseCase::new(args.data_dir, &args.out_dir, args.user_dict).execute()?;
    println!(
        "Pinyin vocabulary: {} entries, word vocabulary: {} entries ({})",
        report.pinyin,
        report.words,
        args.out_dir.display()
    );
    Ok(())
}

/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on fold: {}", args.data_dir);
    let summary = TrainUseCase::new(args.into()).execute()?;

    match summary.best_f1 {
        Some(f1) => println!("Training complete after {} steps. Best dev F1: {:.5}", summary.steps, f1),
        None     => println!("Training complete after {} steps. Final model saved.", summary.steps),
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let report = PredictUseCase::new(args.data_dir, args.model_dir, args.output_dir, args.eval_batch_size)
        .execute()?;
    if let Some(f1) = report.dev_f1 {
        println!("Dev F1: {:.5}", f1);
    }
    println!("Wrote {} predictions to {}", report.rows, report.sub_path.display());
    Ok(())
}

fn run_cross_validate(args: CrossValidateArgs) -> Result<()> {
    use crate::application::cross_validate_use_case::CrossValidateUseCase;

    let report = CrossValidateUseCase::new(
        args.hyper.into(),
        args.data_prefix,
        args.output_prefix,
        args.folds,
        args.out_path,
    )
    .execute()?;

    for (i, f1) in report.fold_f1.iter().enumerate() {
        match f1 {
            Some(f1) => println!("Fold {i}: dev F1 {f1:.5}"),
            None     => println!("Fold {i}: no dev set"),
        }
    }
    if let Some(mean) = report.mean_f1() {
        println!("Mean dev F1: {:.5}", mean);
    }
    print_ensemble(&report.ensemble);
    Ok(())
}

fn run_combine(args: CombineArgs) -> Result<()> {
    use crate::application::combine_use_case::CombineUseCase;

    let report = CombineUseCase::new(args.model_prefix, args.folds, args.out_path).execute()?;
    print_ensemble(&report);
    Ok(())
}

fn print_ensemble(report: &crate::application::combine_use_case::CombineReport) {
    println!(
        "Ensembled {} rows → {} (probabilities in {})",
        report.rows,
        report.out_path.display(),
        report.prob_path.display()
    );
    println!("Mean probability of label 0: {:.5}", report.class0_mean);
}
