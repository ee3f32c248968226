//! Subcommand dispatch: validate, load, prepare, train, evaluate.

use std::fs;

use anyhow::{Context, Result, bail};
use legal_ner_core::{
    DatasetAdapter, DatasetKind, EncodedExample, HfTokenizer, LabelScheme, LoadedDataset,
    SubwordTokenizer, dataset_adapter,
};
use tracing::info;

use crate::backend::{ExternalCommandBackend, TrainingBackend};
use crate::config::{Cli, Commands, EvaluateOptions, TrainConfig, TrainOptions};
use crate::metrics::compute_metrics;
use crate::models::uses_prefix_space;
use crate::plan::RunPlan;
use crate::prepare::{PreparedRun, prepare_run};

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train(opts) => train(&opts),
        Commands::Prepare(opts) => prepare(&opts).map(|_| ()),
        Commands::Evaluate(opts) => evaluate(&opts),
    }
}

/// Fine-tune every selected checkpoint with the configured command.
pub fn train(opts: &TrainOptions) -> Result<()> {
    let config = opts.resolve()?;
    let backend = ExternalCommandBackend::from_command_line(config.require_trainer_cmd()?)?;
    train_with(&config, &backend)
}

/// Fine-tune every selected checkpoint with `backend`, one after another.
pub fn train_with(config: &TrainConfig, backend: &dyn TrainingBackend) -> Result<()> {
    let mut trained = 0usize;
    for_each_run(config, |run| {
        backend
            .fit(&run)
            .with_context(|| format!("failed to train {}", run.plan.checkpoint))?;
        trained += 1;
        Ok(())
    })?;
    info!(
        checkpoints = trained,
        output = %config.output_folder.display(),
        "all trainings complete"
    );
    Ok(())
}

/// Write run artifacts for every selected checkpoint.
pub fn prepare(opts: &TrainOptions) -> Result<Vec<PreparedRun>> {
    let config = opts.resolve()?;
    let mut runs = Vec::new();
    for_each_run(&config, |run| {
        runs.push(run);
        Ok(())
    })?;
    Ok(runs)
}

fn for_each_run(
    config: &TrainConfig,
    on_run: impl FnMut(PreparedRun) -> Result<()>,
) -> Result<()> {
    for_each_run_with(config, load_hf_tokenizer(config), on_run)
}

fn load_hf_tokenizer(
    config: &TrainConfig,
) -> impl Fn(&str) -> Result<Box<dyn SubwordTokenizer>> + '_ {
    move |checkpoint| {
        let path = config.tokenizer_path(checkpoint);
        let add_prefix_space = uses_prefix_space(checkpoint);
        let tokenizer = HfTokenizer::from_file_with_prefix_space(path, add_prefix_space)
            .with_context(|| format!("failed to load tokenizer for {checkpoint}"))?;
        Ok(Box::new(tokenizer) as Box<dyn SubwordTokenizer>)
    }
}

fn for_each_run_with(
    config: &TrainConfig,
    load_tokenizer: impl Fn(&str) -> Result<Box<dyn SubwordTokenizer>>,
    mut on_run: impl FnMut(PreparedRun) -> Result<()>,
) -> Result<()> {
    let adapter = dataset_adapter(config.dataset)?;
    let train = adapter.load(&config.train).with_context(|| {
        format!("failed to load train split {}", config.train.primary.display())
    })?;
    let valid = adapter.load(&config.valid).with_context(|| {
        format!("failed to load validation split {}", config.valid.primary.display())
    })?;
    info!(
        dataset = %config.dataset,
        train = train.len(),
        valid = valid.len(),
        warnings = train.warnings.len() + valid.warnings.len(),
        "loaded dataset"
    );

    for checkpoint in config.models.checkpoints() {
        let tokenizer = load_tokenizer(checkpoint)?;
        let run = prepare_checkpoint(
            config,
            adapter.as_ref(),
            &train,
            &valid,
            tokenizer.as_ref(),
            checkpoint,
        )?;
        on_run(run)?;
    }
    Ok(())
}

/// Encode both splits for one checkpoint and write its artifacts.
pub fn prepare_checkpoint(
    config: &TrainConfig,
    adapter: &dyn DatasetAdapter,
    train: &LoadedDataset,
    valid: &LoadedDataset,
    tokenizer: &dyn SubwordTokenizer,
    checkpoint: &str,
) -> Result<PreparedRun> {
    let budget = config
        .alignment
        .content_budget_for(tokenizer)
        .with_context(|| format!("alignment settings do not fit the {checkpoint} tokenizer"))?;
    info!(checkpoint, budget, "encoding splits");

    let encode = |split: &str, data: &LoadedDataset| -> Result<Vec<EncodedExample>> {
        let examples =
            adapter.produce_token_sequences(&data.sequences, tokenizer, &config.alignment);
        if examples.is_empty() && !data.sequences.is_empty() {
            bail!(
                "none of the {} {split} sequences could be encoded for {checkpoint}",
                data.sequences.len()
            );
        }
        Ok(examples)
    };
    let train_examples = encode("train", train)?;
    let valid_examples = encode("validation", valid)?;

    let plan = RunPlan::new(config, adapter.label_vocabulary(), checkpoint);
    prepare_run(plan, &train_examples, &valid_examples)
}

/// Score a prediction file and print the metrics as JSON.
pub fn evaluate(opts: &EvaluateOptions) -> Result<()> {
    let dataset: DatasetKind = opts.dataset.parse()?;
    let scheme = LabelScheme::for_dataset(dataset);
    let output = compute_metrics(&scheme, &opts.predictions, opts.lenient_partial)?;

    if let Some(path) = &opts.report {
        let json = serde_json::to_string_pretty(&output.report)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    println!("{}", serde_json::to_string_pretty(&output.metrics)?);
    Ok(())
}
