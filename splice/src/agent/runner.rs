use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::action::AgentAction;
use crate::agent::retry::{with_capacity_retry, CapacityRetryPolicy};
use crate::agent::tools::{ToolOutcome, Toolbox};
use crate::config::AgentConfig;
use crate::error::SpliceError;
use crate::llm::{prompts, ReasoningBackend};
use crate::session::SessionContext;

/// What one user turn produced. Always carries natural-language text;
/// artifact handles are present only when a tool call created one.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub plot_filename: Option<String>,
    pub report_filename: Option<String>,
}

struct TurnStep {
    action: AgentAction,
    outcome: ToolOutcome,
}

/// The orchestration loop: drives the reasoning model turn by turn through
/// `Idle → Reasoning → (ToolCall → Observation → Reasoning)* → FinalAnswer`,
/// bounded by a step budget and a wall-clock budget.
#[derive(Clone)]
pub struct Agent {
    action_backend: Arc<dyn ReasoningBackend>,
    response_backend: Arc<dyn ReasoningBackend>,
    toolbox: Arc<Toolbox>,
    config: AgentConfig,
    retry_policy: CapacityRetryPolicy,
}

impl Agent {
    pub fn new(
        action_backend: Arc<dyn ReasoningBackend>,
        response_backend: Arc<dyn ReasoningBackend>,
        toolbox: Arc<Toolbox>,
        config: AgentConfig,
    ) -> Self {
        let retry_policy = CapacityRetryPolicy {
            max_attempts: config.capacity_max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(config.capacity_max_delay_secs),
        };
        Self {
            action_backend,
            response_backend,
            toolbox,
            config,
            retry_policy,
        }
    }

    /// Process one user question. Never fails: loop-level errors degrade to
    /// an apologetic or "at capacity" answer.
    pub async fn ask(&self, session: &SessionContext, question: &str) -> TurnOutcome {
        tracing::info!(session_id = %session.id, question, "Processing question");

        let outcome = self.run_turn(session, question).await;

        let completed = session.record_turn(question, &outcome.answer);
        if self.config.memory_reset_interval > 0
            && completed % self.config.memory_reset_interval == 0
        {
            tracing::info!(
                session_id = %session.id,
                completed_turns = completed,
                "Periodic conversation reset"
            );
            session.reset();
        }

        outcome
    }

    async fn run_turn(&self, session: &SessionContext, question: &str) -> TurnOutcome {
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.max_turn_secs);
        let system = prompts::system_prompt();
        let chat_history = session.memory_rendered();

        let mut steps: Vec<TurnStep> = Vec::new();
        let mut corrective: Option<String> = None;
        let mut draft_answer: Option<String> = None;
        let mut degraded = false;

        for _ in 0..self.config.max_steps {
            if started.elapsed() >= budget {
                tracing::warn!(
                    elapsed_secs = started.elapsed().as_secs(),
                    "Turn wall-clock budget exceeded, forcing final answer"
                );
                break;
            }

            let transcript = render_transcript(&steps);
            let prompt =
                prompts::action_prompt(&chat_history, question, &transcript, corrective.as_deref());

            let raw = match with_capacity_retry(&self.retry_policy, || {
                self.action_backend.complete(&prompt, Some(&system))
            })
            .await
            {
                Ok(raw) => raw,
                Err(SpliceError::LlmRateLimit { .. }) => {
                    degraded = true;
                    break;
                }
                Err(error) => {
                    tracing::error!(error = %error, "Reasoning call failed, falling back");
                    return outcome_from(prompts::fallback_answer(), &steps);
                }
            };

            match AgentAction::parse(&raw) {
                Err(error) => {
                    tracing::warn!(error = %error, "Malformed reasoning output, re-prompting");
                    corrective = Some(error.to_string());
                    continue;
                }
                Ok(AgentAction::Answer { text }) => {
                    draft_answer = Some(text);
                    break;
                }
                Ok(action) => {
                    corrective = None;
                    tracing::debug!(action = action.name(), "Dispatching tool");
                    let outcome = self.toolbox.dispatch(session, &action).await;
                    steps.push(TurnStep { action, outcome });
                }
            }
        }

        if degraded {
            return outcome_from(prompts::degraded_capacity_answer(), &steps);
        }

        let incomplete = draft_answer.is_none();
        let report = render_turn_report(&steps, draft_answer.as_deref());
        let final_prompt = prompts::final_answer_prompt(question, &report, incomplete);

        let answer = match with_capacity_retry(&self.retry_policy, || {
            self.response_backend.complete(&final_prompt, None)
        })
        .await
        {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(error = %error, "Final answer synthesis failed");
                draft_answer.unwrap_or_else(prompts::fallback_answer)
            }
        };

        outcome_from(answer, &steps)
    }
}

fn outcome_from(answer: String, steps: &[TurnStep]) -> TurnOutcome {
    TurnOutcome {
        answer,
        plot_filename: steps
            .iter()
            .find_map(|step| step.outcome.plot_filename.clone()),
        report_filename: steps
            .iter()
            .find_map(|step| step.outcome.report_filename.clone()),
    }
}

fn render_transcript(steps: &[TurnStep]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(idx, step)| {
            format!(
                "{}. Action: {}\n   Observation: {}",
                idx + 1,
                step.action.describe(),
                step.outcome.observation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Structured summary of the turn for the response model.
fn render_turn_report(steps: &[TurnStep], draft_answer: Option<&str>) -> String {
    const OBSERVATION_LIMIT: usize = 1200;

    let queries: Vec<&str> = steps
        .iter()
        .filter_map(|step| match &step.action {
            AgentAction::Query { sql } => Some(sql.as_str()),
            _ => None,
        })
        .collect();

    let data_results: Vec<String> = steps
        .iter()
        .filter(|step| matches!(step.action, AgentAction::Query { .. }) && !step.outcome.is_error)
        .take(2)
        .map(|step| truncate(&step.outcome.observation, OBSERVATION_LIMIT))
        .collect();

    let plots: Vec<String> = steps
        .iter()
        .filter_map(|step| step.outcome.plot_filename.as_ref())
        .map(|filename| format!("Created plot: {filename}"))
        .collect();

    let errors: Vec<String> = steps
        .iter()
        .filter(|step| step.outcome.is_error)
        .map(|step| truncate(&step.outcome.observation, OBSERVATION_LIMIT))
        .collect();

    let mut report = format!("SQL queries executed: {}\n", queries.len());
    for query in &queries {
        report.push_str(&format!("- {query}\n"));
    }

    report.push_str("\nData results:\n");
    if data_results.is_empty() {
        report.push_str("No data retrieved\n");
    } else {
        for result in &data_results {
            report.push_str(&format!("{result}\n"));
        }
    }

    report.push_str("\nPlot information:\n");
    if plots.is_empty() {
        report.push_str("No plots created\n");
    } else {
        for plot in &plots {
            report.push_str(&format!("{plot}\n"));
        }
    }

    report.push_str("\nErrors:\n");
    if errors.is_empty() {
        report.push_str("No errors\n");
    } else {
        for error in &errors {
            report.push_str(&format!("{error}\n"));
        }
    }

    if let Some(draft) = draft_answer {
        report.push_str(&format!("\nDraft technical answer:\n{draft}\n"));
    }

    report
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        text.to_string()
    } else {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{} ... [truncated]", &text[..end])
    }
}
