use super::*;
use chrono::Utc;
use uuid::Uuid;

fn history_message(role: MessageRole, content: &str) -> Message {
    Message {
        id: Uuid::new_v4(),
        session_id: Uuid::new_v4(),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
        status: crate::models::MessageStatus::Sent,
        streaming: false,
        analysis_mode: None,
        attachment_ids: Vec::new(),
    }
}

#[test]
fn analysis_prompt_labels_each_file() {
    let reports = vec![
        FileReport {
            file_name: "q1.csv".to_string(),
            content: "FILE: q1.csv".to_string(),
        },
        FileReport {
            file_name: "q2.csv".to_string(),
            content: "FILE: q2.csv".to_string(),
        },
    ];
    let messages = analysis_messages(AnalysisMode::Summarize, &reports, "");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[1].role, ChatRole::User);
    assert!(messages[1].content.contains("File: q1.csv"));
    assert!(messages[1].content.contains("File: q2.csv"));
    assert!(messages[1].content.contains("comprehensive summary"));
    assert!(!messages[1].content.contains("{file_content}"));
}

#[test]
fn each_mode_uses_its_own_template() {
    let reports = vec![FileReport {
        file_name: "data.csv".to_string(),
        content: "rows".to_string(),
    }];
    let phrase = |mode| {
        let messages = analysis_messages(mode, &reports, "");
        messages[1].content.clone()
    };

    assert!(phrase(AnalysisMode::Summarize).contains("comprehensive summary"));
    assert!(phrase(AnalysisMode::Trends).contains("identify key trends"));
    assert!(phrase(AnalysisMode::Kpis).contains("key performance indicators"));
    assert!(phrase(AnalysisMode::Actions).contains("actionable recommendations"));
    assert!(phrase(AnalysisMode::Compare).contains("Compare the information"));
}

#[test]
fn user_note_appends_additional_context() {
    let reports = vec![FileReport {
        file_name: "data.csv".to_string(),
        content: "rows".to_string(),
    }];
    let messages = analysis_messages(AnalysisMode::Kpis, &reports, "focus on churn");
    assert!(
        messages[1]
            .content
            .ends_with("Additional context from user: focus on churn")
    );

    let without_note = analysis_messages(AnalysisMode::Kpis, &reports, "   ");
    assert!(!without_note[1].content.contains("Additional context"));
}

#[test]
fn conversation_keeps_only_recent_history() {
    let history: Vec<Message> = (0..25)
        .map(|i| {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            history_message(role, &format!("turn {i}"))
        })
        .collect();

    let messages = conversation_messages(&history, "current question");

    // System + 10 history turns + current user message.
    assert_eq!(messages.len(), 12);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[1].content, "turn 15");
    assert_eq!(messages[10].content, "turn 24");
    let last = messages.last().expect("last message");
    assert_eq!(last.role, ChatRole::User);
    assert_eq!(last.content, "current question");
}

#[test]
fn conversation_preserves_roles_in_order() {
    let history = vec![
        history_message(MessageRole::User, "hi"),
        history_message(MessageRole::Assistant, "hello"),
    ];
    let messages = conversation_messages(&history, "next");

    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[2].role, ChatRole::Assistant);
    assert_eq!(messages[3].role, ChatRole::User);
}
