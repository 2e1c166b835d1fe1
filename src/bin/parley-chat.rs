//! Interactive chat application for a streaming chat backend.
//!
//! This binary provides a streaming REPL interface on top of a backend that
//! serves `POST /chat/stream`, `GET /models`, `GET /prompt/templates` and
//! `POST /upload`.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage against http://localhost:8000/api/v1/
//! parley-chat
//!
//! # Another backend, a specific model
//! parley-chat --base-url http://chat.internal:8000/api/v1/ --model deepseek-chat --manufacturer deepseek
//!
//! # Read settings from a file and disable colors
//! parley-chat --config chat.yaml --no-color
//! ```
//!
//! Set `RUST_LOG=parley=debug` to see log output on stderr.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/model <name> [manufacturer]` - Change the model
//! - `/template <type[.subtype]>` - Select a prompt template
//! - `/upload <path>` - Use a PDF or text file as context
//! - `/export [text|html]` - Save the conversation
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley::chat::{
    Catalog, ChatArgs, ChatCommand, ChatConfig, Session, help_text, parse_command,
};
use parley::{
    ChatClient, ModelDescriptor, NotificationLevel, PlainTextSink, PresentationSink, UploadFile,
};

type ChatSession = Session<ChatClient, Arc<PlainTextSink>>;

/// Main entry point for the parley-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("parley-chat [OPTIONS]");
    let config = ChatConfig::load(args)?;

    let client = ChatClient::with_options(Some(&config.base_url), Some(config.timeout()))?;
    let sink = Arc::new(PlainTextSink::with_color(config.use_color));
    let session =
        Session::new(client, Arc::clone(&sink)).with_history_window(config.history_window);

    let catalog = session.initialize().await;
    if let Some(model) = config.model_descriptor() {
        let _ = session.set_model(resolve_model(&catalog, model));
    }
    match config.template_key() {
        Ok(Some(template)) => session.set_template(Some(template)),
        Ok(None) => {}
        Err(err) => sink.notify(NotificationLevel::Error, &err.to_string()),
    }

    let mut rl = DefaultEditor::new()?;

    println!("Parley Chat ({})", session.transport().base_url());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            let _ = session.clear_transcript();
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model { name, manufacturer } => {
                            let descriptor = ModelDescriptor::named(name);
                            let descriptor = match manufacturer {
                                Some(manufacturer) => descriptor.with_manufacturer(manufacturer),
                                None => descriptor,
                            };
                            let _ = session.set_model(resolve_model(&catalog, descriptor));
                        }
                        ChatCommand::Models => {
                            print_models(&catalog, &session);
                        }
                        ChatCommand::Template(template) => {
                            session.set_template(template);
                        }
                        ChatCommand::Templates => {
                            print_templates(&catalog);
                        }
                        ChatCommand::Upload(path) => match UploadFile::from_path(&path) {
                            Ok(file) => {
                                let _ = session.upload_context_file(file).await;
                            }
                            Err(err) => sink.notify(NotificationLevel::Error, &err.to_string()),
                        },
                        ChatCommand::ClearContext => {
                            let _ = session.set_context_file(None);
                        }
                        ChatCommand::Export(format) => {
                            if let Ok(artifact) = session.export_transcript(format) {
                                match artifact.write_to(&config.export_dir) {
                                    Ok(path) => sink.notify(
                                        NotificationLevel::Info,
                                        &format!("Wrote {}", path.display()),
                                    ),
                                    Err(err) => {
                                        sink.notify(NotificationLevel::Error, &err.to_string())
                                    }
                                }
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&config, &session);
                        }
                        ChatCommand::Invalid(message) => {
                            sink.notify(NotificationLevel::Error, &message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                session.send_message(line).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                sink.notify(NotificationLevel::Error, &format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Fill in the manufacturer and description from the catalog when the user
/// named a known model.
fn resolve_model(catalog: &Catalog, descriptor: ModelDescriptor) -> ModelDescriptor {
    let Some(name) = descriptor.name.as_deref() else {
        return descriptor;
    };
    match catalog.find_model(name) {
        Some(known) if descriptor.manufacturer.is_none() => known.clone().into(),
        _ => descriptor,
    }
}

fn print_models(catalog: &Catalog, session: &ChatSession) {
    let selected = session.selection().model;
    println!("    Models:");
    for model in &catalog.models {
        let marker = if selected.as_ref() == Some(model) {
            "*"
        } else {
            " "
        };
        if model.description.is_empty() {
            println!("    {marker} {model}");
        } else {
            println!("    {marker} {model} - {}", model.description);
        }
    }
}

fn print_templates(catalog: &Catalog) {
    println!("    Templates:");
    for template in &catalog.templates {
        println!("      {} ({})", template.kind, template.name);
        for subtype in &template.subtypes {
            println!("        {}.{}", template.kind, subtype.name);
        }
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    let selection = session.selection();
    println!("    Session Statistics:");
    match selection.model {
        Some(model) => println!("      Model: {model}"),
        None => println!("      Model: (none)"),
    }
    println!("      Turns: {}", stats.turn_count);
    println!(
        "      Requests: {} ({} failed)",
        stats.requests_sent, stats.failures
    );
    println!("      Phase: {:?}", session.phase());
}

fn print_config(config: &ChatConfig, session: &ChatSession) {
    let selection = session.selection();
    println!("    Current Configuration:");
    println!("      Backend: {}", session.transport().base_url());
    match selection.model {
        Some(model) => println!("      Model: {model}"),
        None => println!("      Model: (none)"),
    }
    match selection.template {
        Some(template) => println!("      Template: {template}"),
        None => println!("      Template: query (default)"),
    }
    match selection.context_file {
        Some(file) => println!("      Context file: {file}"),
        None => println!("      Context file: (none)"),
    }
    println!("      History window: {} turns", session.history_window());
    println!("      Timeout: {}s", config.timeout_secs);
    println!("      Export directory: {}", config.export_dir.display());
}
