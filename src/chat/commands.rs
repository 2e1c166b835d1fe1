//! Slash commands for the terminal front end.
//!
//! Input starting with `/` drives the session (model, template, context file,
//! export) and never reaches the backend as a message.

use crate::chat::export::ExportFormat;
use crate::types::TemplateKey;

/// A slash command typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the transcript.
    Clear,

    /// Select a model by name, optionally naming its manufacturer.
    Model {
        /// Model name.
        name: String,
        /// Manufacturer; looked up in the catalog when absent.
        manufacturer: Option<String>,
    },

    /// List the models in the catalog.
    Models,

    /// Select a template, or clear the selection with `None`.
    Template(Option<TemplateKey>),

    /// List the template categories in the catalog.
    Templates,

    /// Upload a file and use it as context.
    Upload(String),

    /// Stop using the uploaded context file.
    ClearContext,

    /// Export the transcript.
    Export(ExportFormat),

    /// Print the command summary.
    Help,

    /// Leave the REPL.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show backend, selection and limits.
    ShowConfig,

    /// A malformed command, with the reason.
    Invalid(String),
}

/// Parse a line of input.
///
/// Returns `None` for anything that is not a slash command; such input is a
/// message for the backend. Unknown or malformed commands come back as
/// [`ChatCommand::Invalid`].
///
/// # Examples
///
/// ```
/// # use parley::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model qwen2.5:latest ollama").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => parse_model_command(argument),
        "models" => ChatCommand::Models,
        "template" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::Template(None),
            Some(arg) => match arg.parse::<TemplateKey>() {
                Ok(key) => ChatCommand::Template(Some(key)),
                Err(_) => ChatCommand::Invalid(
                    "/template expects <type> or <type>.<subtype>".to_string(),
                ),
            },
            None => ChatCommand::Invalid("/template requires a template key".to_string()),
        },
        "templates" => ChatCommand::Templates,
        "upload" => match argument {
            Some(path) => ChatCommand::Upload(path.to_string()),
            None => ChatCommand::Invalid("/upload requires a file path".to_string()),
        },
        "context" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearContext,
            _ => ChatCommand::Invalid("/context expects 'clear'".to_string()),
        },
        "export" => match argument.unwrap_or("text").parse::<ExportFormat>() {
            Ok(format) => ChatCommand::Export(format),
            Err(_) => ChatCommand::Invalid("/export expects 'text' or 'html'".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_model_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/model requires a model name".to_string());
    };
    let mut parts = arg.split_whitespace();
    let name = parts.next().unwrap_or_default().to_string();
    let manufacturer = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return ChatCommand::Invalid("/model expects <name> [manufacturer]".to_string());
    }
    ChatCommand::Model { name, manufacturer }
}

/// One line per command, for `/help`.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                   Clear the conversation
  /model <name> [vendor]   Change the model (e.g., /model qwen2.5:latest ollama)
  /models                  List available models
  /template <type[.sub]>   Select a prompt template (use 'clear' to reset)
  /templates               List available prompt templates
  /upload <path>           Upload a PDF or text file as context
  /context clear           Stop using the uploaded file
  /export [text|html]      Export the conversation to a file
  /stats                   Show session statistics
  /config                  Show current configuration
  /help                    Show this help message
  /quit                    Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model gpt-4"),
            Some(ChatCommand::Model {
                name: "gpt-4".to_string(),
                manufacturer: None,
            })
        );
        assert_eq!(
            parse_command("/model   qwen2.5:latest   ollama "),
            Some(ChatCommand::Model {
                name: "qwen2.5:latest".to_string(),
                manufacturer: Some("ollama".to_string()),
            })
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid("/model requires a model name".to_string()))
        );
        assert!(matches!(
            parse_command("/model a b c"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
    }

    #[test]
    fn parse_template() {
        assert_eq!(
            parse_command("/template academic.context"),
            Some(ChatCommand::Template(Some(
                TemplateKey::new("academic").with_subtype("context")
            )))
        );
        assert_eq!(
            parse_command("/template clear"),
            Some(ChatCommand::Template(None))
        );
        assert!(matches!(
            parse_command("/template"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert!(matches!(
            parse_command("/template .sub"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
        assert_eq!(parse_command("/templates"), Some(ChatCommand::Templates));
    }

    #[test]
    fn parse_upload_and_context() {
        assert_eq!(
            parse_command("/upload ~/papers/attention is all you need.pdf"),
            Some(ChatCommand::Upload(
                "~/papers/attention is all you need.pdf".to_string()
            ))
        );
        assert!(matches!(
            parse_command("/upload"),
            Some(ChatCommand::Invalid(_))
        ));
        assert_eq!(
            parse_command("/context clear"),
            Some(ChatCommand::ClearContext)
        );
        assert!(matches!(
            parse_command("/context"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_export() {
        assert_eq!(
            parse_command("/export"),
            Some(ChatCommand::Export(ExportFormat::Text))
        );
        assert_eq!(
            parse_command("/export html"),
            Some(ChatCommand::Export(ExportFormat::Html))
        );
        assert!(matches!(
            parse_command("/export pdf"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("html")
        ));
    }

    #[test]
    fn parse_stats_and_config() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert!(matches!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid(msg)) if msg == "Unknown command: /frobnicate"
        ));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(!help.is_empty());
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/model"));
        assert!(help.contains("/upload"));
        assert!(help.contains("/export"));
    }
}
