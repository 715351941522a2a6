// Bookshelf CLI binary

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use bookshelf_lib::commands::{AddBookPayload, BookTagPayload, LocationUpdate};
use bookshelf_lib::search::{self, SearchConfig, SortConfig, SortKey, SortOrder};
use bookshelf_lib::{
    open_catalog, AppConfig, Book, Catalog, CatalogError, NdlClient, Request, Response, Result,
};

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Catalogue your books by ISBN and organise them with tags", long_about = None)]
#[command(version)]
struct Cli {
    /// Database file (defaults to BOOKSHELF_DB_PATH or the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Title,
    Creators,
    Ndc,
    Publisher,
    Location1,
    Location2,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Title => SortKey::Title,
            SortArg::Creators => SortKey::Creators,
            SortArg::Ndc => SortKey::Ndc,
            SortArg::Publisher => SortKey::Publisher,
            SortArg::Location1 => SortKey::Location1,
            SortArg::Location2 => SortKey::Location2,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Look up registry metadata for an ISBN without saving it
    Lookup {
        isbn: String,
    },

    /// Look up an ISBN and add it to the catalogue
    Add {
        isbn: String,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value = "")]
        location1: String,
        #[arg(long, default_value = "")]
        location2: String,
    },

    /// List books, optionally filtered and sorted
    List {
        /// Only books carrying every given tag id
        #[arg(short, long = "tag")]
        tags: Vec<i64>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        creator: Option<String>,
        #[arg(long, value_enum, default_value = "title")]
        sort: SortArg,
        #[arg(long)]
        desc: bool,
    },

    /// Show one book as JSON
    Show {
        id: i64,
    },

    /// Delete a book and its tag links
    Delete {
        id: i64,
    },

    /// Set the shelf location of a book
    Locate {
        id: i64,
        location1: String,
        #[arg(default_value = "")]
        location2: String,
    },

    /// List all tags
    Tags,

    /// Create a tag (returns the existing one if the name is taken)
    TagAdd {
        name: String,
    },

    /// Attach a tag to a book
    TagLink {
        book_id: i64,
        tag_id: i64,
    },

    /// Detach a tag from a book
    TagUnlink {
        book_id: i64,
        tag_id: i64,
    },

    /// Run a raw request, e.g. '{"op":"get-all-tags"}'
    Invoke {
        json: String,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::from_env()?.with_db_path(cli.db);
    let catalog = open_catalog(&config)?;

    match cli.command {
        Commands::Lookup { isbn } => {
            let response = catalog.handle(Request::FetchBookData(isbn))?;
            print_json(&response)?;
        }

        Commands::Add {
            isbn,
            tags,
            location1,
            location2,
        } => {
            let mut book = match catalog.handle(Request::FetchBookData(isbn))? {
                Response::BookData(book) => book,
                other => return unexpected("fetch-book-data", other),
            };
            book.location1 = location1;
            book.location2 = location2;
            let title = book.title.clone();
            match catalog.handle(Request::AddBook(AddBookPayload { book, tags }))? {
                Response::Created { id } => println!("Added #{} {}", id, title),
                other => return unexpected("add-book", other),
            }
        }

        Commands::List {
            tags,
            title,
            publisher,
            creator,
            sort,
            desc,
        } => {
            // Tag ids are already applied by the query.
            let books = books_with_tags(&catalog, tags)?;
            let filtered = search::search_books(
                &books,
                &SearchConfig {
                    title,
                    publisher,
                    creators: creator,
                    tag_ids: Vec::new(),
                },
            );
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            let sorted = search::sort_books(
                &filtered,
                SortConfig {
                    key: sort.into(),
                    order,
                },
            );
            for book in &sorted {
                print_book_line(book);
            }
            println!("{} book(s)", sorted.len());
        }

        Commands::Show { id } => match catalog.book(id)? {
            Some(book) => print_json(&book)?,
            None => println!("No book with id {}", id),
        },

        Commands::Delete { id } => match catalog.handle(Request::DeleteBook(id))? {
            Response::Deleted { changes } => println!("Deleted {} book(s)", changes),
            other => return unexpected("delete-book", other),
        },

        Commands::Locate {
            id,
            location1,
            location2,
        } => {
            catalog.handle(Request::UpdateBookLocation(LocationUpdate {
                id,
                location1,
                location2,
            }))?;
            println!("Updated location of #{}", id);
        }

        Commands::Tags => match catalog.handle(Request::GetAllTags)? {
            Response::Tags(tags) => {
                for tag in tags {
                    println!("{:>5}  {}", tag.id, tag.name);
                }
            }
            other => return unexpected("get-all-tags", other),
        },

        Commands::TagAdd { name } => match catalog.handle(Request::AddTag(name))? {
            Response::Tag(tag) => println!("Tag #{} {}", tag.id, tag.name),
            other => return unexpected("add-tag", other),
        },

        Commands::TagLink { book_id, tag_id } => {
            catalog.handle(Request::AddBookTag(BookTagPayload { book_id, tag_id }))?;
            println!("Linked book #{} to tag #{}", book_id, tag_id);
        }

        Commands::TagUnlink { book_id, tag_id } => {
            catalog.handle(Request::RemoveBookTag(BookTagPayload { book_id, tag_id }))?;
            println!("Unlinked book #{} from tag #{}", book_id, tag_id);
        }

        Commands::Invoke { json } => match catalog.handle_json(&json) {
            Ok(body) => println!("{}", body),
            Err(body) => {
                println!("{}", body);
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn books_with_tags(catalog: &Catalog<NdlClient>, tag_ids: Vec<i64>) -> Result<Vec<Book>> {
    match catalog.handle(Request::GetBooksByTags(tag_ids))? {
        Response::Books(books) => Ok(books),
        other => unexpected("get-books-by-tags", other),
    }
}

fn print_book_line(book: &Book) {
    let tags = book
        .tags
        .iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{:>5}  {}  / {}  [{}]  {} {}  {{{}}}",
        book.id, book.title, book.creators, book.ndc, book.location1, book.location2, tags
    );
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn unexpected<T>(op: &str, response: Response) -> Result<T> {
    log::debug!("{} answered {:?}", op, response);
    Err(CatalogError::UnexpectedResponse(op.to_string()))
}
