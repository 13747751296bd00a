use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trackedit_core::Document;

#[derive(Parser)]
#[command(name = "trackedit")]
#[command(about = "Tracked-changes editor for WordprocessingML documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Document to edit
    file: PathBuf,

    /// Author name recorded on new revisions
    #[arg(short, long)]
    author: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace text as a tracked deletion plus insertion
    Replace {
        find: String,
        with: String,

        /// Which occurrence to edit (0 = first)
        #[arg(short = 'n', long, default_value = "0")]
        occurrence: usize,
    },
    /// Mark text as a tracked deletion
    Delete {
        find: String,

        #[arg(short = 'n', long, default_value = "0")]
        occurrence: usize,
    },
    /// Insert text before an anchor as a tracked insertion
    InsertBefore {
        anchor: String,
        text: String,

        #[arg(short = 'n', long, default_value = "0")]
        occurrence: usize,
    },
    /// Insert text after an anchor as a tracked insertion
    InsertAfter {
        anchor: String,
        text: String,

        #[arg(short = 'n', long, default_value = "0")]
        occurrence: usize,
    },
    /// Accept one revision by id
    Accept { id: i32 },
    /// Reject one revision by id
    Reject { id: i32 },
    /// Accept all revisions, optionally one author's
    AcceptAll {
        #[arg(long)]
        by: Option<String>,
    },
    /// Reject all revisions, optionally one author's
    RejectAll {
        #[arg(long)]
        by: Option<String>,
    },
    /// List revisions
    Revisions {
        #[arg(long)]
        by: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether text occurs in the visible projection
    Find { text: String },
    /// Count occurrences of text in the visible projection
    Count { text: String },
    /// Print the visible text
    Text,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut doc = Document::open(&cli.file, cli.author.as_deref())
        .map_err(|e| format!("Failed to open {}: {}", cli.file.display(), e))?;

    match cli.command {
        Commands::Replace {
            find,
            with,
            occurrence,
        } => {
            let id = doc.replace(&find, &with, occurrence).map_err(stringify)?;
            save(&mut doc)?;
            report_id("Replaced", id);
        }
        Commands::Delete { find, occurrence } => {
            let id = doc.delete(&find, occurrence).map_err(stringify)?;
            save(&mut doc)?;
            report_id("Deleted", id);
        }
        Commands::InsertBefore {
            anchor,
            text,
            occurrence,
        } => {
            let id = doc
                .insert_before(&anchor, &text, occurrence)
                .map_err(stringify)?;
            save(&mut doc)?;
            report_id("Inserted", id);
        }
        Commands::InsertAfter {
            anchor,
            text,
            occurrence,
        } => {
            let id = doc
                .insert_after(&anchor, &text, occurrence)
                .map_err(stringify)?;
            save(&mut doc)?;
            report_id("Inserted", id);
        }
        Commands::Accept { id } => {
            let found = doc.accept(id);
            if !found {
                return Err(format!("No revision with id {}", id));
            }
            save(&mut doc)?;
            println!("Accepted revision {}", id);
        }
        Commands::Reject { id } => {
            let found = doc.reject(id);
            if !found {
                return Err(format!("No revision with id {}", id));
            }
            save(&mut doc)?;
            println!("Rejected revision {}", id);
        }
        Commands::AcceptAll { by } => {
            let count = doc.accept_all(by.as_deref());
            save(&mut doc)?;
            println!("Accepted {} revision(s)", count);
        }
        Commands::RejectAll { by } => {
            let count = doc.reject_all(by.as_deref());
            save(&mut doc)?;
            println!("Rejected {} revision(s)", count);
        }
        Commands::Revisions { by, json } => {
            let revisions = doc.list_revisions(by.as_deref());
            if json {
                let out = serde_json::to_string_pretty(&revisions)
                    .map_err(|e| format!("Failed to serialize revisions: {}", e))?;
                println!("{}", out);
            } else if revisions.is_empty() {
                println!("No revisions");
            } else {
                for rev in revisions {
                    let kind = match rev.kind {
                        trackedit_core::RevisionKind::Insertion => "+",
                        trackedit_core::RevisionKind::Deletion => "-",
                    };
                    println!("{}{}  {}  '{}'", kind, rev.id, rev.author, rev.text);
                }
            }
        }
        Commands::Find { text } => {
            let found = doc.find(&text).map_err(stringify)?;
            println!("{}", found);
        }
        Commands::Count { text } => {
            let count = doc.count(&text).map_err(stringify)?;
            println!("{}", count);
        }
        Commands::Text => {
            println!("{}", doc.visible_text());
        }
    }

    Ok(())
}

fn save(doc: &mut Document) -> Result<(), String> {
    doc.save().map_err(|e| format!("Failed to save: {}", e))
}

fn report_id(verb: &str, id: i32) {
    if id < 0 {
        println!("{} inside an existing insertion (no new revision)", verb);
    } else {
        println!("{} (revision {})", verb, id);
    }
}

fn stringify(e: trackedit_core::EditError) -> String {
    e.to_string()
}
