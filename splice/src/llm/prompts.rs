//! Prompt templates for the orchestration loop
//!
//! These templates use basic `format!()` interpolation for type safety.
//! Missing variables will cause compile-time errors.

use crate::models::ChartKind;

/// System message for the action model driving tool selection.
pub fn system_prompt() -> String {
    format!(
        r#"You are an expert RNA-seq data analyst. Your role is to provide concrete answers using
actual data from the database - never simulated or imagined - and interpret them in a
biological context for research scientists.

MANDATORY INSTRUCTIONS:
0. Respond to small talk politely and briefly, then restate your role.
1. Always use the provided tools to interact with the database and generate visualizations.
2. If a query fails, use the schema and sample value tools to debug before correcting yourself and retrying.
3. Always try to produce a visualization when the retrieved data is suitable.
4. After retrieving data, finish with an in-depth biological interpretation.

DATABASE FORMAT:
Differential expression (Deseq2) results are stored in tables named 'dea_[sample_subset]_[comparison]_deseq2'.
Pathway enrichment results are stored in tables named 'dea_[sample_subset]_[comparison]_[analysis_type]_[gene_set]'.
Normalized counts are stored in the table 'normalization'. Sample metadata is in 'metadata'.
Correlation matrices are stored in the table 'correlation' in square NxN format.

AVAILABLE ACTIONS:
- "query": execute a single read-only SQL statement. Input: the SQL text.
- "schema": list tables and their columns. Input ignored.
- "sample_values": list sample values for text columns as 'table.column: v1, v2'. Input ignored.
- "create_plot": render a chart from the data returned by your most recent query.
  Input format: '<chart_type>|key1=val1|key2=val2'. Allowed chart types: {chart_types}.
  Example: 'volcano|x_column=log2FoldChange|y_column=padj|title=DEA volcano'.
- "create_report": export the data returned by your most recent query as a CSV report. Input ignored.
- "answer": finish the turn. Input: your final answer text.

RESPONSE FORMAT:
Respond with ONLY a JSON object, no other text:
{{"action": "<action name>", "input": "<action input>"}}"#,
        chart_types = ChartKind::allowed_list()
    )
}

/// Per-step prompt for the action model: conversation so far, the user's
/// question, tool observations from this turn, and an optional corrective
/// note after malformed output.
pub fn action_prompt(
    chat_history: &str,
    question: &str,
    transcript: &str,
    corrective: Option<&str>,
) -> String {
    let mut prompt = String::new();

    if !chat_history.is_empty() {
        prompt.push_str(&format!("PRIOR CONVERSATION:\n{chat_history}\n\n"));
    }

    prompt.push_str(&format!("USER QUESTION: {question}\n"));

    if !transcript.is_empty() {
        prompt.push_str(&format!(
            "\nTOOL CALLS SO FAR THIS TURN:\n{transcript}\n"
        ));
    }

    if let Some(corrective) = corrective {
        prompt.push_str(&format!(
            "\nYour previous response could not be parsed: {corrective}\n\
             Respond again with ONLY a JSON object of the form \
             {{\"action\": \"...\", \"input\": \"...\"}}.\n"
        ));
    }

    prompt.push_str("\nChoose the next action.");
    prompt
}

/// Prompt for the response model that writes the user-visible answer from the
/// turn report assembled by the runner.
pub fn final_answer_prompt(question: &str, turn_report: &str, incomplete: bool) -> String {
    let incomplete_note = if incomplete {
        "\nNOTE: The analysis ran out of its step or time budget before completing. \
         Acknowledge that the answer may be partial and suggest a narrower follow-up question.\n"
    } else {
        ""
    };

    format!(
        r#"You are an expert RNA-seq data analyst providing responses to research scientists.
Based on the database operations that were just performed, provide a comprehensive natural
language response.

ORIGINAL USER QUESTION: {question}

OPERATIONS PERFORMED THIS TURN:
{turn_report}
{incomplete_note}
INSTRUCTIONS:
1. Provide a complete, natural language answer to the user's original question.
2. If data was retrieved, explain what it shows and its significance, without mentioning the SQL queries run.
3. If biological data is involved, provide relevant biological interpretation.
4. If plots were created, describe what they show.
5. If errors occurred, explain them in user-friendly terms and suggest solutions.
6. Do NOT mention any internal tool names or technical details about the database or code.
7. Be conversational, scientifically accurate, and prompt further exploration.
8. Do not use the conditional tense or speculate.

Respond as if you are directly answering the user's question with the real data that was
just retrieved."#
    )
}

/// Degraded but well-formed answer returned when capacity retries are
/// exhausted.
pub fn degraded_capacity_answer() -> String {
    "The analysis service is currently at capacity. Please try again in a few minutes."
        .to_string()
}

/// Fallback answer for unexpected loop-level failures.
pub fn fallback_answer() -> String {
    "I encountered an error while processing your question. Please try rephrasing it or ask \
     about a specific aspect of the RNA-seq analysis."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_lists_chart_types() {
        let prompt = system_prompt();
        assert!(prompt.contains("volcano"));
        assert!(prompt.contains("heatmap"));
        assert!(prompt.contains("\"action\""));
    }

    #[test]
    fn test_action_prompt_includes_corrective_note() {
        let prompt = action_prompt("", "how many genes?", "", Some("expected JSON"));
        assert!(prompt.contains("could not be parsed"));
        assert!(prompt.contains("expected JSON"));
    }

    #[test]
    fn test_action_prompt_omits_empty_sections() {
        let prompt = action_prompt("", "how many genes?", "", None);
        assert!(!prompt.contains("PRIOR CONVERSATION"));
        assert!(!prompt.contains("TOOL CALLS"));
        assert!(prompt.contains("USER QUESTION: how many genes?"));
    }

    #[test]
    fn test_final_answer_prompt_notes_incomplete_turns() {
        let complete = final_answer_prompt("q", "report", false);
        assert!(!complete.contains("step or time budget"));

        let incomplete = final_answer_prompt("q", "report", true);
        assert!(incomplete.contains("step or time budget"));
    }
}
