mod render;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use catalog_app::modules::books::CATEGORY_OPTIONS;
use catalog_app::{CatalogStore, Field, Filter, Outcome, RecordEditor, SubmitError};
use catalog_http::{BookRegistry, HttpBookService};
use catalog_kernel::settings::Settings;
use catalog_kernel::{BookId, BookService};

#[derive(Debug, Parser)]
#[command(name = "catalog", version, about = "Manage a remote book catalog")]
struct Cli {
    /// Base URL of the book service (overrides `remote.base_url`)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List books in the catalog
    List {
        /// all, active, or deactivated (defaults to `catalog.default_filter`)
        #[arg(long)]
        filter: Option<Filter>,
    },
    /// Add a new book
    Add(RecordArgs),
    /// Edit an existing book; omitted fields keep their current value
    Edit {
        id: BookId,
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Mark an active book as deactivated
    Deactivate { id: BookId },
    /// Re-activate a deactivated book
    Activate { id: BookId },
    /// Delete a deactivated book
    Delete { id: BookId },
    /// Run the in-memory development book service
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, clap::Args)]
struct RecordArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    /// One of: Fiction, Non-fiction, Sci-Fi
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
}

impl RecordArgs {
    fn apply(self, editor: &mut RecordEditor) {
        let values = [
            (Field::Title, self.title),
            (Field::Author, self.author),
            (Field::Category, self.category),
            (Field::Isbn, self.isbn),
        ];
        for (field, value) in values {
            if let Some(value) = value {
                editor.set_field(field, value);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load catalog settings")?;
    if let Some(base_url) = cli.base_url {
        settings.remote.base_url = base_url;
    }

    catalog_telemetry::init(&settings.telemetry)?;

    tracing::debug!(
        env = ?settings.environment,
        remote = %settings.remote.base_url,
        "catalog cli starting"
    );

    run(cli.command, &mut settings).await
}

fn client(settings: &Settings) -> anyhow::Result<Arc<dyn BookService>> {
    let service = HttpBookService::from_settings(&settings.remote)
        .context("failed to create book service client")?;
    Ok(Arc::new(service))
}

async fn run(command: Command, settings: &mut Settings) -> anyhow::Result<()> {
    match command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            catalog_http::start_server(&settings.server, BookRegistry::new()).await
        }
        Command::List { filter } => {
            let filter = match filter {
                Some(filter) => filter,
                None => settings
                    .catalog
                    .default_filter
                    .parse()
                    .context("invalid catalog.default_filter")?,
            };
            let store = CatalogStore::with_filter(client(settings)?, filter);
            store.load().await.context("failed to load catalog")?;

            println!("Filter: {}    {}", store.filter(), store.summary());
            println!("{}", render::book_table(&store.filtered_view()));
            Ok(())
        }
        Command::Add(record) => {
            let mut editor = RecordEditor::new(client(settings)?);
            record.apply(&mut editor);
            submit(editor).await
        }
        Command::Edit { id, record } => {
            let mut editor = RecordEditor::new(client(settings)?);
            editor
                .hydrate(Some(id))
                .await
                .with_context(|| format!("failed to fetch book {id}"))?;
            record.apply(&mut editor);
            submit(editor).await
        }
        Command::Deactivate { id } => status_change(client(settings)?, id, false).await,
        Command::Activate { id } => status_change(client(settings)?, id, true).await,
        Command::Delete { id } => {
            let store = CatalogStore::with_filter(client(settings)?, Filter::All);
            store.load().await.context("failed to load catalog")?;
            match store.delete(id).await {
                Ok(book) => {
                    println!("Deleted \"{}\" ({})", book.title, store.summary());
                    Ok(())
                }
                Err(err) => bail!(store.notice().unwrap_or_else(|| err.to_string())),
            }
        }
    }
}

async fn status_change(service: Arc<dyn BookService>, id: BookId, active: bool) -> anyhow::Result<()> {
    let store = CatalogStore::with_filter(service, Filter::All);
    store.load().await.context("failed to load catalog")?;

    match store.set_status(id, active).await {
        Ok(book) => {
            let verb = if book.active { "Activated" } else { "Deactivated" };
            println!("{verb} \"{}\"", book.title);
            Ok(())
        }
        Err(err) => bail!(store.notice().unwrap_or_else(|| err.to_string())),
    }
}

async fn submit(mut editor: RecordEditor) -> anyhow::Result<()> {
    match editor.submit().await {
        Ok(submission) => {
            if let Outcome::Success(message) = editor.outcome() {
                println!("{message}");
            }
            println!("{}", render::book_table(std::slice::from_ref(submission.book())));
            Ok(())
        }
        Err(SubmitError::Invalid(validation)) => {
            for (field, message) in validation.iter() {
                eprintln!("{}: {}", field.label(), message);
            }
            if validation.get(Field::Category).is_some() {
                eprintln!("Categories: {}", CATEGORY_OPTIONS.join(", "));
            }
            bail!("book was not saved")
        }
        Err(SubmitError::Remote(err)) => match editor.outcome() {
            Outcome::Failure(message) => bail!(message.clone()),
            _ => Err(err.into()),
        },
    }
}
