//! Human-readable transcript of trace events.

use colored::*;

use crate::agent::TraceEvent;
use crate::conversation::Message;
use crate::tools::truncate;

/// Tool output longer than this is shortened in the transcript
const TOOL_PREVIEW_CHARS: usize = 500;

/// Render one event as transcript text, or None for events with nothing to show
pub fn render(event: &TraceEvent) -> Option<String> {
    match event {
        TraceEvent::SessionStarted { query, prior_messages } => {
            let mut line = format!("{} '{}'", "Starting research for:".green().bold(), query);
            if *prior_messages > 0 {
                line.push_str(&format!(" ({} earlier messages)", prior_messages).dimmed().to_string());
            }
            Some(format!("\n{}\n", line))
        }
        TraceEvent::NodeEntered(node) => Some(format!("\n{}", format!("--- [Node: {}] ---", node).cyan())),
        TraceEvent::MessageAppended(message) => render_message(message),
        TraceEvent::Terminated { .. } => None,
        TraceEvent::Failed { error } => Some(format!("{} {}", "An error occurred:".red().bold(), error)),
    }
}

fn render_message(message: &Message) -> Option<String> {
    match message {
        Message::Human { .. } => None,
        Message::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
            let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
            Some(format!("{} Calling tools: {:?}", "[System/Agent]:".yellow(), names))
        }
        Message::Assistant { content, .. } if content.is_blank() => None,
        Message::Assistant { content, .. } => Some(format!("{} {}", "[Assistant]:".green(), content.text())),
        Message::ToolResult {
            name, content, is_error, ..
        } => {
            let label = format!("[Tool: {}]:", name);
            let label = if *is_error { label.red() } else { label.blue() };
            Some(format!("{} {}", label, truncate(content, TOOL_PREVIEW_CHARS)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Node;
    use crate::conversation::ToolCall;
    use serde_json::json;

    #[test]
    fn test_node_header() {
        let line = render(&TraceEvent::NodeEntered(Node::Supervisor)).unwrap();
        assert!(line.contains("--- [Node: supervisor] ---"));
    }

    #[test]
    fn test_tool_calls_listed() {
        let msg = Message::assistant(
            "",
            vec![
                ToolCall::new("c1", "document_search", json!({})),
                ToolCall::new("c2", "web_search", json!({})),
            ],
        );
        let line = render(&TraceEvent::MessageAppended(msg)).unwrap();
        assert!(line.contains(r#"Calling tools: ["document_search", "web_search"]"#));
    }

    #[test]
    fn test_final_answer() {
        let line = render(&TraceEvent::MessageAppended(Message::assistant("The answer.", vec![]))).unwrap();
        assert!(line.contains("[Assistant]:"));
        assert!(line.ends_with("The answer."));
    }

    #[test]
    fn test_silent_events() {
        assert!(render(&TraceEvent::MessageAppended(Message::human("q"))).is_none());
        assert!(render(&TraceEvent::MessageAppended(Message::assistant("  ", vec![]))).is_none());
        assert!(
            render(&TraceEvent::Terminated {
                answer: "a".to_string(),
                turns: 1
            })
            .is_none()
        );
    }

    #[test]
    fn test_tool_output_shortened() {
        let long = "x".repeat(2000);
        let msg = Message::tool_result("c1", "web_search", long, false);
        let line = render(&TraceEvent::MessageAppended(msg)).unwrap();
        assert!(line.contains("[Tool: web_search]:"));
        assert!(line.ends_with("..."));
        assert!(line.len() < 700);
    }
}
