use clap::{Parser, Subcommand};
use inquire::Text;

use crate::error::ParseEventError;
use crate::handlers::parse_event::EventExtractionHandler;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an event draft from TEXT
    Extract { text: String },
    /// Ask for the event text interactively
    Prompt {},
}

/// Runs one extraction from the command line. Returns false on failure.
pub async fn cli(handler: &EventExtractionHandler) -> bool {
    // Fine to exit here on bad arguments
    let cli = Cli::parse();
    let text = match cli.command {
        Commands::Extract { text } => text,
        Commands::Prompt {} => match Text::new("Describe the event:").prompt() {
            Ok(text) => text,
            Err(e) => {
                eprintln!("No event text supplied: {}", e);
                return false;
            }
        },
    };

    match handler.extract(&text).await {
        Ok(draft) => match serde_json::to_string_pretty(&draft) {
            Ok(json) => {
                println!("{}", json);
                true
            }
            Err(e) => print_error(&ParseEventError::upstream(e)),
        },
        Err(err) => print_error(&err),
    }
}

fn print_error(err: &ParseEventError) -> bool {
    eprintln!("{}", err.envelope().to_json());
    false
}
