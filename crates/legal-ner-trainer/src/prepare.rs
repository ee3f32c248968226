//! Writes the artifacts of a run plan to its output directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use legal_ner_core::EncodedExample;
use serde::Serialize;
use tracing::info;

use crate::plan::RunPlan;

pub const TRAINING_ARGS_FILE: &str = "training_args.json";
pub const LABEL_MAP_FILE: &str = "label_map.json";
pub const TRAIN_FILE: &str = "train.jsonl";
pub const VALID_FILE: &str = "validation.jsonl";
pub const MANIFEST_FILE: &str = "run.json";

/// A run whose artifacts are on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRun {
    pub plan: RunPlan,
    pub run_dir: PathBuf,
    pub training_args: PathBuf,
    pub label_map: PathBuf,
    pub train_file: PathBuf,
    pub valid_file: PathBuf,
    pub train_examples: usize,
    pub valid_examples: usize,
}

/// Create the run directory and write arguments, label map, both splits and
/// a `run.json` manifest.
pub fn prepare_run(
    plan: RunPlan,
    train: &[EncodedExample],
    valid: &[EncodedExample],
) -> Result<PreparedRun> {
    let run_dir = plan.output_dir.clone();
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create run directory {}", run_dir.display()))?;

    let training_args = run_dir.join(TRAINING_ARGS_FILE);
    write_json(&training_args, &plan.args)?;
    let label_map = run_dir.join(LABEL_MAP_FILE);
    write_json(&label_map, &plan.label_map)?;
    let train_file = run_dir.join(TRAIN_FILE);
    write_jsonl(&train_file, train)?;
    let valid_file = run_dir.join(VALID_FILE);
    write_jsonl(&valid_file, valid)?;

    let prepared = PreparedRun {
        plan,
        run_dir,
        training_args,
        label_map,
        train_file,
        valid_file,
        train_examples: train.len(),
        valid_examples: valid.len(),
    };
    write_json(&prepared.run_dir.join(MANIFEST_FILE), &prepared)?;

    info!(
        checkpoint = %prepared.plan.checkpoint,
        dir = %prepared.run_dir.display(),
        train = prepared.train_examples,
        valid = prepared.valid_examples,
        "prepared run"
    );
    Ok(prepared)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    out.flush()?;
    Ok(())
}

fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use legal_ner_core::{DatasetKind, LabelScheme};

    use super::*;
    use crate::config::{Cli, Commands};
    use crate::plan::{LabelMap, TrainingArguments};

    fn example(id: &str) -> EncodedExample {
        EncodedExample {
            id: id.to_string(),
            window: 0,
            input_ids: vec![1, 10, 11, 2],
            attention_mask: vec![1, 1, 1, 1],
            labels: vec![-100, 1, 15, -100],
            offsets: vec![(0, 0), (0, 5), (0, 5), (0, 0)],
            word_ids: vec![None, Some(0), Some(1), None],
        }
    }

    fn plan(output: &Path) -> RunPlan {
        let cli = Cli::try_parse_from([
            "train",
            "prepare",
            "--output-folder",
            output.to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Prepare(opts) = cli.command else {
            panic!("expected prepare");
        };
        RunPlan::new(
            &opts.resolve().unwrap(),
            &LabelScheme::for_dataset(DatasetKind::Indian),
            "saibo/legal-roberta-base",
        )
    }

    #[test]
    fn test_prepare_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let prepared =
            prepare_run(plan(dir.path()), &[example("a"), example("b")], &[example("c")]).unwrap();

        assert_eq!(
            prepared.run_dir,
            dir.path().join("all").join("saibo/legal-roberta-base")
        );
        assert_eq!(prepared.train_examples, 2);
        assert_eq!(prepared.valid_examples, 1);

        let args: TrainingArguments =
            serde_json::from_str(&fs::read_to_string(&prepared.training_args).unwrap()).unwrap();
        assert_eq!(args, prepared.plan.args);

        let labels: LabelMap =
            serde_json::from_str(&fs::read_to_string(&prepared.label_map).unwrap()).unwrap();
        assert_eq!(labels.num_labels, 29);

        let train = fs::read_to_string(&prepared.train_file).unwrap();
        let rows: Vec<EncodedExample> = train
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows, vec![example("a"), example("b")]);

        assert!(prepared.run_dir.join(MANIFEST_FILE).is_file());
    }

    #[test]
    fn test_prepare_empty_splits() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = prepare_run(plan(dir.path()), &[], &[]).unwrap();
        assert_eq!(fs::read_to_string(&prepared.valid_file).unwrap(), "");
    }
}
