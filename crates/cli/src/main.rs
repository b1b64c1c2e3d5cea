mod markdown;
mod ui;

use anyhow::Result;
use chatui_core::config::Config;
use chatui_core::store::{ChatStore, StoreTarget};
use ui::App;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return Err(e);
        }
    };

    let args: Vec<String> = std::env::args().collect();

    // Handle commands — default to chat if no args
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("chat");

    match command {
        "chat" => {
            let mut app = App::new(config.clone(), connect_store(&config));
            ui::interactive_chat(&mut app).await?;
        }
        "list" => {
            ui::print_conversations(connect_store(&config).as_ref());
        }
        "delete" => {
            let Some(prefix) = args.get(2) else {
                print_usage();
                return Ok(());
            };
            let store = connect_store(&config);
            match ui::resolve_id(store.as_ref(), prefix) {
                Some(found) if store.as_ref().is_some_and(|s| s.delete(&found.id)) => {
                    println!("Deleted: {}", found.title);
                }
                Some(found) => println!("Could not delete '{}'.", ui::short_id(&found.id)),
                None => println!("No conversation matches '{}'.", prefix),
            }
        }
        "config" => {
            if args.len() < 3 {
                print_config(&config);
            } else if args[2] == "set" && args.len() >= 5 {
                config.set(&args[3], &args[4])?;
                config.save()?;
                println!("{} updated.", args[3]);
            } else {
                print_usage();
            }
        }
        "help" | "--help" | "-h" => print_usage(),
        message => {
            // Treat any other argument as a message
            let mut app = App::new(config.clone(), connect_store(&config));
            ui::single_message(&mut app, message.to_string()).await?;
        }
    }

    Ok(())
}

/// A store that cannot be opened downgrades the session to non-persisted
/// instead of aborting.
fn connect_store(config: &Config) -> Option<ChatStore> {
    if config.temporary {
        return None;
    }

    let target = StoreTarget::new(config.store_path.clone(), config.collection.clone());
    match ChatStore::connect(&target) {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!(
                "Warning: Could not open chat store at {}: {}",
                config.store_path.display(),
                e
            );
            eprintln!("Continuing without persistence.\n");
            None
        }
    }
}

fn print_config(config: &Config) {
    println!("Current config:");
    println!("  Ollama URL:    {}", config.ollama_url);
    println!("  Model:         {}", config.model);
    println!("  Temperature:   {}", config.temperature);
    println!("  Context size:  {}", config.num_ctx);
    println!("  Keep alive:    {}", config.keep_alive);
    println!("  Streaming:     {}", config.stream);
    println!("  Markdown:      {}", config.markdown);
    println!("  Auto title:    {}", config.auto_title);
    println!("  Temporary:     {}", config.temporary);
    println!("  Store path:    {}", config.store_path.display());
    println!("  Collection:    {}", config.collection);
}

fn print_usage() {
    println!("chatui - Chat with a local LLM over Ollama");
    println!("\nUsage:");
    println!("  chatui                          Start interactive chat");
    println!("  chatui \"your message\"           Send a single message");
    println!("  chatui list                     List saved conversations");
    println!("  chatui delete ID                Delete a conversation by id prefix");
    println!("  chatui config                   Show current configuration");
    println!("  chatui config set KEY VALUE     Update a configuration value");
}
