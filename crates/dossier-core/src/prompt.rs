//! Prompt composition for analysis and conversation turns.

use crate::completion::{ChatMessage, ChatRole};
use crate::models::{AnalysisMode, Message, MessageRole};

/// Prior turns included when composing a conversation prompt.
pub const MAX_HISTORY_TURNS: usize = 10;

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert business analyst assistant that \
provides detailed, accurate, and insightful analysis of business data.";

const CONVERSATION_SYSTEM_PROMPT: &str = "You are an expert business analyst assistant that \
provides helpful, detailed, and accurate responses to user questions. You can analyze \
business data, provide insights, and answer general questions.";

const SUMMARIZE_TEMPLATE: &str = "You are an expert business analyst. Analyze the following \
data and provide a comprehensive summary:\n\n{file_content}\n\nFocus on the main points, key \
findings, and overall trends. Be concise but thorough.";

const TRENDS_TEMPLATE: &str = "You are an expert data analyst. Analyze the following data and \
identify key trends:\n\n{file_content}\n\nFocus on patterns over time, growth or decline in \
metrics, and any notable shifts or anomalies.\nExplain what these trends mean for the business.";

const KPIS_TEMPLATE: &str = "You are an expert business intelligence analyst. Extract and \
analyze the key performance indicators from the following data:\n\n{file_content}\n\nIdentify \
the most important metrics, their current values, historical performance, and what they \
indicate about business health.\nHighlight any KPIs that require attention or show exceptional \
performance.";

const ACTIONS_TEMPLATE: &str = "You are an expert business consultant. Based on the following \
data, generate actionable recommendations:\n\n{file_content}\n\nProvide specific, practical \
steps that can be taken to address issues or capitalize on opportunities.\nPrioritize your \
recommendations and explain the expected impact of each action.";

const COMPARE_TEMPLATE: &str = "You are an expert comparative analyst. Compare the information \
in the following data:\n\n{file_content}\n\nIdentify similarities and differences, highlight \
strengths and weaknesses, and provide insights on what these comparisons reveal.\nFocus on \
meaningful comparisons that can drive business decisions.";

/// Extracted content for one attached file.
pub struct FileReport {
    pub file_name: String,
    pub content: String,
}

fn template_for(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Summarize => SUMMARIZE_TEMPLATE,
        AnalysisMode::Trends => TRENDS_TEMPLATE,
        AnalysisMode::Kpis => KPIS_TEMPLATE,
        AnalysisMode::Actions => ACTIONS_TEMPLATE,
        AnalysisMode::Compare => COMPARE_TEMPLATE,
    }
}

/// Compose the message list for a file-analysis turn.
///
/// Every file report is labeled with its original name, concatenated, and
/// substituted into the template for the requested mode. A non-empty user
/// note is appended as additional context.
pub fn analysis_messages(
    mode: AnalysisMode,
    reports: &[FileReport],
    user_note: &str,
) -> Vec<ChatMessage> {
    let combined: String = reports
        .iter()
        .map(|report| format!("File: {}\n\n{}\n\n", report.file_name, report.content))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = template_for(mode).replace("{file_content}", &combined);
    if !user_note.trim().is_empty() {
        prompt.push_str(&format!("\n\nAdditional context from user: {user_note}"));
    }

    vec![
        ChatMessage::new(ChatRole::System, ANALYSIS_SYSTEM_PROMPT),
        ChatMessage::new(ChatRole::User, prompt),
    ]
}

/// Compose the message list for a plain conversation turn.
///
/// Includes the persona, at most the last [`MAX_HISTORY_TURNS`] prior
/// messages in chronological order, and the current user message last.
pub fn conversation_messages(history: &[Message], user_message: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(ChatRole::System, CONVERSATION_SYSTEM_PROMPT)];

    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    for message in &history[start..] {
        let role = match message.role {
            MessageRole::User => ChatRole::User,
            MessageRole::Assistant => ChatRole::Assistant,
        };
        messages.push(ChatMessage::new(role, message.content.clone()));
    }

    messages.push(ChatMessage::new(ChatRole::User, user_message));
    messages
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
