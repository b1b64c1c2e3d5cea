use std::io::{self, Write};

use anyhow::Result;
use chatui_core::config::Config;
use chatui_core::ollama::{ChatRequest, GenerationOptions, OllamaClient};
use chatui_core::session::ChatSession;
use chatui_core::store::{ChatStore, ConversationSummary};
use chatui_core::thinking;
use chatui_core::title::generate_title;

use crate::markdown;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

pub struct App {
    pub client: OllamaClient,
    pub store: Option<ChatStore>,
    pub config: Config,
    pub session: ChatSession,
}

impl App {
    pub fn new(config: Config, store: Option<ChatStore>) -> Self {
        Self {
            client: OllamaClient::new(config.ollama_url.clone()),
            store,
            session: ChatSession::from_config(&config),
            config,
        }
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.config.temperature,
            num_ctx: self.config.num_ctx,
            ..GenerationOptions::default()
        }
    }
}

pub async fn single_message(app: &mut App, message: String) -> Result<()> {
    if let Err(e) = send_message(app, message).await {
        eprintln!("Error: {}", e);
    }
    Ok(())
}

pub async fn interactive_chat(app: &mut App) -> Result<()> {
    println!("chatui started. Type '/help' for commands, 'quit' to exit.\n");

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        if let Some(command) = input.strip_prefix('/') {
            handle_command(app, command).await?;
            continue;
        }

        println!();
        if let Err(e) = send_message(app, input.to_string()).await {
            eprintln!("Error: {}\n", e);
        }
    }

    Ok(())
}

async fn handle_command(app: &mut App, command: &str) -> Result<()> {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "new" => {
            app.session.reset();
            println!("Started a new conversation.\n");
        }
        "list" => print_conversations(app.store.as_ref()),
        "load" => load_conversation(app, arg),
        "delete" => delete_conversation(app, arg),
        "title" => retitle_conversation(app).await,
        "temp" => {
            app.session.flags.temporary = !app.session.flags.temporary;
            println!("Temporary session: {}\n", on_off(app.session.flags.temporary));
        }
        "stream" => {
            app.session.flags.stream = !app.session.flags.stream;
            println!("Streaming: {}\n", on_off(app.session.flags.stream));
        }
        "markdown" => {
            app.session.flags.markdown = !app.session.flags.markdown;
            println!("Markdown rendering: {}\n", on_off(app.session.flags.markdown));
        }
        "help" => print_help(),
        other => println!("Unknown command '/{}'. Try '/help'.\n", other),
    }

    Ok(())
}

async fn send_message(app: &mut App, message: String) -> Result<()> {
    app.session.push_user(message);

    let request = ChatRequest::new(
        app.config.model.clone(),
        app.session.request_messages(),
        app.session.flags.stream,
        app.config.keep_alive,
        app.options(),
    );

    let response = if app.session.flags.stream {
        let mut printer = StreamPrinter::new();
        let mut accumulated = String::new();
        let response = app.client
            .chat_stream(&request, |chunk| {
                accumulated.push_str(chunk);
                printer.update(&accumulated);
            })
            .await?;
        printer.finish();
        response
    } else {
        let response = app.client.chat(&request).await?;
        print_response(&response.content, app.session.flags.markdown);
        response
    };

    app.session.push_assistant(response.content);
    persist(app).await;
    Ok(())
}

/// Save the session after a completed exchange. Failures are user-visible
/// and non-fatal; the in-memory conversation is kept as-is.
async fn persist(app: &mut App) {
    if app.session.flags.temporary {
        return;
    }
    let Some(store) = &app.store else {
        return;
    };

    if app.session.conversation_id.is_none() {
        app.session.begin_conversation();
    }
    let id = app.session.conversation_id.clone().unwrap_or_default();
    let first_save = app.session.first_save();

    let title = if first_save && app.session.flags.auto_title {
        auto_title(app).await
    } else {
        None
    };

    match store.save(
        &id,
        &app.session.messages,
        &app.session.system_prompt,
        title.as_deref(),
        first_save,
    ) {
        Ok(()) => app.session.mark_saved(),
        Err(e) => eprintln!("Warning: Failed to save conversation: {}", e),
    }
}

/// Model-generated title for the first save. Falls back to `None`, which
/// lets the store derive one from the first user message.
async fn auto_title(app: &App) -> Option<String> {
    let first_user = app.session.first_user_message()?;

    match generate_title(&app.client, &app.config.model, app.options(), first_user).await {
        Ok(title) => Some(title),
        Err(e) => {
            eprintln!("Warning: Title generation failed: {}", e);
            None
        }
    }
}

pub fn print_conversations(store: Option<&ChatStore>) {
    let Some(store) = store else {
        println!("Persistence is disabled.\n");
        return;
    };

    let mut conversations = store.list();
    if conversations.is_empty() {
        println!("No saved conversations.\n");
        return;
    }

    // Backend order is unspecified; newest first for display.
    conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    for conversation in &conversations {
        println!("{}  {}", short_id(&conversation.id), conversation.title);
    }
    println!();
}

fn load_conversation(app: &mut App, prefix: &str) {
    let Some(found) = resolve_id(app.store.as_ref(), prefix) else {
        println!("No conversation matches '{}'.\n", prefix);
        return;
    };

    let loaded = app.store.as_ref().and_then(|store| store.load(&found.id));
    match loaded {
        Some(conversation) => {
            println!("Loaded: {}\n", conversation.title);
            app.session.adopt(conversation);
        }
        None => println!("Could not load conversation '{}'.\n", short_id(&found.id)),
    }
}

fn delete_conversation(app: &mut App, prefix: &str) {
    let Some(found) = resolve_id(app.store.as_ref(), prefix) else {
        println!("No conversation matches '{}'.\n", prefix);
        return;
    };

    let removed = app.store.as_ref().is_some_and(|store| store.delete(&found.id));
    if removed {
        println!("Deleted: {}\n", found.title);
        if app.session.conversation_id.as_deref() == Some(found.id.as_str()) {
            app.session.reset();
        }
    } else {
        println!("Could not delete '{}'.\n", short_id(&found.id));
    }
}

/// Explicitly regenerate the current conversation's title.
async fn retitle_conversation(app: &mut App) {
    let Some(id) = app.session.conversation_id.clone() else {
        println!("No saved conversation to retitle.\n");
        return;
    };
    let Some(store) = &app.store else {
        println!("Persistence is disabled.\n");
        return;
    };

    let title = auto_title(app).await;
    match store.save(
        &id,
        &app.session.messages,
        &app.session.system_prompt,
        title.as_deref(),
        true,
    ) {
        Ok(()) => {
            if let Some(conversation) = store.load(&id) {
                println!("Title: {}\n", conversation.title);
            }
        }
        Err(e) => eprintln!("Warning: Failed to save conversation: {}", e),
    }
}

pub fn resolve_id(store: Option<&ChatStore>, prefix: &str) -> Option<ConversationSummary> {
    if prefix.is_empty() {
        return None;
    }
    store?
        .list()
        .into_iter()
        .find(|summary| summary.id.starts_with(prefix))
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn print_response(content: &str, render_markdown: bool) {
    let split = thinking::extract(content);

    if let Some(thinking) = &split.thinking {
        println!("{DIM}(thinking) {}{RESET}\n", thinking);
    }
    if let Some(answer) = &split.content {
        if render_markdown {
            println!("{}\n", markdown::render(answer));
        } else {
            println!("{}\n", answer);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /new            Start a new conversation");
    println!("  /list           List saved conversations");
    println!("  /load <id>      Continue a saved conversation");
    println!("  /delete <id>    Delete a saved conversation");
    println!("  /title          Regenerate the current conversation's title");
    println!("  /temp           Toggle temporary (non-persisted) mode");
    println!("  /stream         Toggle response streaming");
    println!("  /markdown       Toggle markdown rendering");
    println!("  quit            Exit\n");
}

/// Prints a streamed response incrementally. Every accumulated prefix is
/// re-classified by the extractor; the printer only ever emits the new tail
/// of each segment, so the reasoning text appears live and the answer starts
/// once the close marker has arrived.
struct StreamPrinter {
    thinking_printed: usize,
    content_printed: usize,
    content_started: bool,
}

impl StreamPrinter {
    fn new() -> Self {
        Self {
            thinking_printed: 0,
            content_printed: 0,
            content_started: false,
        }
    }

    fn update(&mut self, accumulated: &str) {
        let split = thinking::extract(accumulated);

        if !self.content_started {
            if let (Some(thinking), None) = (&split.thinking, &split.content) {
                if self.thinking_printed == 0 && !thinking.is_empty() {
                    print!("{DIM}(thinking) ");
                }
                if thinking.len() > self.thinking_printed {
                    print!("{}", &thinking[self.thinking_printed..]);
                    self.thinking_printed = thinking.len();
                }
            }
        }

        if let Some(content) = &split.content {
            if !self.content_started {
                self.content_started = true;
                if self.thinking_printed > 0 {
                    print!("{RESET}\n\n");
                }
            }
            if content.len() > self.content_printed {
                print!("{}", &content[self.content_printed..]);
                self.content_printed = content.len();
            }
        }

        io::stdout().flush().ok();
    }

    fn finish(&mut self) {
        if self.thinking_printed > 0 && !self.content_started {
            // Stream ended inside the thinking block.
            print!("{RESET}");
        }
        println!("\n");
        io::stdout().flush().ok();
    }
}
