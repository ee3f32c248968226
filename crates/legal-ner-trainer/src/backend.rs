//! Delegation of the optimisation loop to an external training framework.

use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::prepare::PreparedRun;

/// Fine-tunes one prepared checkpoint.
pub trait TrainingBackend {
    fn fit(&self, run: &PreparedRun) -> Result<()>;
}

/// Runs a configured command once per checkpoint.
///
/// The command finds its inputs through `LEGAL_NER_*` environment variables
/// and must exit with status zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommandBackend {
    program: String,
    args: Vec<String>,
}

impl ExternalCommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line on whitespace. No shell quoting is interpreted.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().context("training command is empty")?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self, run: &PreparedRun) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("LEGAL_NER_RUN_DIR", &run.run_dir)
            .env("LEGAL_NER_OUTPUT_DIR", &run.plan.output_dir)
            .env("LEGAL_NER_FINAL_MODEL_DIR", &run.plan.final_model_dir)
            .env("LEGAL_NER_CHECKPOINT", &run.plan.checkpoint)
            .env("LEGAL_NER_TRAINING_ARGS", &run.training_args)
            .env("LEGAL_NER_LABEL_MAP", &run.label_map)
            .env("LEGAL_NER_TRAIN_FILE", &run.train_file)
            .env("LEGAL_NER_VALID_FILE", &run.valid_file);
        cmd
    }
}

impl TrainingBackend for ExternalCommandBackend {
    fn fit(&self, run: &PreparedRun) -> Result<()> {
        info!(
            checkpoint = %run.plan.checkpoint,
            program = %self.program,
            "starting external trainer"
        );
        let status = self
            .command(run)
            .status()
            .with_context(|| format!("failed to run {}", self.program))?;

        if !status.success() {
            bail!(
                "training {} failed with status {}",
                run.plan.checkpoint,
                status
            );
        }
        info!(checkpoint = %run.plan.checkpoint, "training complete");
        Ok(())
    }
}
