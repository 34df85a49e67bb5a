use chrono::Utc;
use clap::{Parser, Subcommand};
use kb_search_core::{
    normalize_whitespace, paginate, ChatHistory, FaqBook, FileType, Granularity, IndexOutcome,
    IndexWorker, Indexer, IndexerOptions, JsonRecordStore, RegexPreset, SearchCoordinator,
    SearchFilters, SearchOutcome, SearchSession, SearchSettings, StoreError, SynonymDictionary,
    TagStrategy, ALL_FILTER, DEFAULT_MAX_IMAGES_PER_DOCUMENT, DEFAULT_MAX_RESULTS,
    DEFAULT_PAGE_SIZE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const RECORDS_FILE: &str = "records.json";
const SYNONYMS_FILE: &str = "synonyms.json";
const FAQS_FILE: &str = "faqs.json";

#[derive(Parser)]
#[command(name = "kb-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the record store and the synonym dictionary.
    #[arg(long, env = "KB_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory extracted images are written to. Defaults to `<data-dir>/images`.
    #[arg(long, env = "KB_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Synonym dictionary file. Defaults to `<data-dir>/synonyms.json`.
    #[arg(long, env = "KB_SYNONYMS")]
    synonyms: Option<PathBuf>,

    /// FAQ file. Defaults to `<data-dir>/faqs.json`.
    #[arg(long, env = "KB_FAQS")]
    faqs: Option<PathBuf>,

    /// Index whole documents (`document`) or sentence/paragraph chunks (`chunk`).
    #[arg(long, env = "KB_GRANULARITY", default_value = "chunk")]
    granularity: Granularity,

    /// Keyword strategy: `frequency` or `weighted`.
    #[arg(long, env = "KB_TAG_STRATEGY", default_value = "frequency")]
    tag_strategy: TagStrategy,

    /// Maximum number of images extracted per document.
    #[arg(long, env = "KB_MAX_IMAGES", default_value_t = DEFAULT_MAX_IMAGES_PER_DOCUMENT)]
    max_images: usize,

    /// Maximum number of ranked results kept per search.
    #[arg(long, env = "KB_MAX_RESULTS", default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Documents shown per result page.
    #[arg(long, env = "KB_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Category attached to documents indexed in `document` granularity.
    #[arg(long, env = "KB_CATEGORY")]
    category: Option<String>,

    /// Replace a corrupted record store with an empty one instead of running read-only.
    #[arg(long, env = "KB_RESET_STORE", default_value_t = false)]
    reset_store: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Index files in the background worker, one at a time.
    Index {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Index every supported file under a folder.
    IndexFolder { folder: PathBuf },
    /// Search the knowledge base.
    Search {
        #[arg(required_unless_present = "preset")]
        query: Option<String>,
        /// Search with a canned pattern (email, phone) instead of a query.
        #[arg(long, conflicts_with = "query")]
        preset: Option<RegexPreset>,
        /// Only records carrying this tag.
        #[arg(long, default_value = ALL_FILTER)]
        tag: String,
        /// Only records of this file type (txt, docx, pdf).
        #[arg(long = "type", default_value = ALL_FILTER)]
        filetype: String,
        /// Treat the query as a regular expression.
        #[arg(long, default_value_t = false)]
        regex: bool,
        #[arg(long, default_value_t = false)]
        case_sensitive: bool,
        /// Result page to print, 1-based.
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Add or replace a synonym group: `word1,word2,...`.
    AddSynonym { words: String },
    /// Remove the synonym group stored under a key.
    RemoveSynonym { key: String },
    /// List synonym groups.
    Synonyms,
    /// List indexed documents.
    Documents,
    /// List every tag in the store.
    Tags,
    /// Delete a document's records and extracted images.
    Delete { filename: String },
    /// Recompute a document's tags with the current strategy.
    Retag { filename: String },
    /// Manage stored questions and answers.
    Faq {
        #[command(subcommand)]
        action: FaqAction,
    },
    /// Interactive search loop with query history.
    Repl,
}

#[derive(Subcommand)]
enum FaqAction {
    Add { question: String, answer: String },
    Edit {
        id: String,
        question: String,
        answer: String,
    },
    Remove { id: String },
    List,
    /// Run a stored question as a search.
    Ask {
        id: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "kb-search boot"
    );

    tokio::fs::create_dir_all(&cli.data_dir).await?;
    let store = Arc::new(open_store(&cli.data_dir.join(RECORDS_FILE), cli.reset_store)?);
    info!(
        path = %store.path().display(),
        read_only = store.is_read_only(),
        "record store opened"
    );
    let synonyms_path = cli
        .synonyms
        .clone()
        .unwrap_or_else(|| cli.data_dir.join(SYNONYMS_FILE));
    let faqs_path = cli
        .faqs
        .clone()
        .unwrap_or_else(|| cli.data_dir.join(FAQS_FILE));

    let options = IndexerOptions {
        granularity: cli.granularity,
        image_dir: cli
            .image_dir
            .clone()
            .unwrap_or_else(|| cli.data_dir.join("images")),
        max_images_per_document: cli.max_images,
        tag_strategy: cli.tag_strategy,
        category: cli.category.clone(),
    };
    let indexer = Arc::new(Indexer::new(store.clone(), options));
    let settings = SearchSettings {
        max_results: cli.max_results,
        page_size: cli.page_size,
    };

    match cli.command {
        Command::Index { paths } => {
            let worker = IndexWorker::spawn(indexer);
            for path in paths {
                worker.submit(path, |done| match done.result {
                    Ok(IndexOutcome::Indexed { records }) => {
                        println!("indexed {} ({records} records)", done.filename)
                    }
                    Ok(IndexOutcome::Duplicate) => {
                        println!("skipped {} (already indexed)", done.filename)
                    }
                    Ok(IndexOutcome::Empty) => {
                        println!("skipped {} (no indexable text)", done.filename)
                    }
                    Err(error) => println!("failed {}: {error}", done.filename),
                })?;
            }
            tokio::task::spawn_blocking(move || worker.shutdown()).await??;
        }
        Command::IndexFolder { folder } => {
            let report =
                tokio::task::spawn_blocking(move || indexer.index_folder(&folder)).await??;

            for failed in &report.failed {
                warn!(path = %failed.path.display(), reason = %failed.reason, "skipped document");
            }
            println!(
                "{} indexed, {} already indexed, {} without text, {} failed",
                report.indexed,
                report.duplicates,
                report.empty,
                report.failed.len()
            );
        }
        Command::Search {
            query,
            preset,
            tag,
            filetype,
            regex,
            case_sensitive,
            page,
        } => {
            let filters = SearchFilters {
                case_sensitive,
                regex: regex || preset.is_some(),
                ..SearchFilters::from_selection(&tag, &filetype).map_err(anyhow::Error::msg)?
            };
            let query = match preset {
                Some(preset) => preset.pattern().to_string(),
                None => query.unwrap_or_default(),
            };
            let synonyms = SynonymDictionary::load(&synonyms_path)?;
            let coordinator = SearchCoordinator::new(store, settings);

            let outcome = coordinator.search(&query, &filters, &synonyms)?;
            print_outcome(&outcome, settings.page_size, page);
        }
        Command::AddSynonym { words } => {
            let mut synonyms = SynonymDictionary::load(&synonyms_path)?;
            let key = synonyms.add_group(&words)?;
            println!("saved synonym group `{key}`");
        }
        Command::RemoveSynonym { key } => {
            let mut synonyms = SynonymDictionary::load(&synonyms_path)?;
            if synonyms.remove_group(&key)? {
                println!("removed synonym group `{key}`");
            } else {
                println!("no synonym group `{key}`");
            }
        }
        Command::Synonyms => {
            let synonyms = SynonymDictionary::load(&synonyms_path)?;
            for (key, words) in synonyms.groups() {
                println!("{key}: {}", words.join(", "));
            }
        }
        Command::Documents => {
            for filename in indexer.indexed_documents()? {
                println!("{filename}");
            }
        }
        Command::Tags => {
            for tag in indexer.all_tags()? {
                println!("{tag}");
            }
        }
        Command::Delete { filename } => {
            let removed = indexer.delete_document(&filename)?;
            println!("removed {removed} records of {filename}");
        }
        Command::Retag { filename } => {
            let updated = indexer.regenerate_tags(&filename)?;
            println!("retagged {updated} records of {filename}");
        }
        Command::Faq { action } => {
            let mut faqs = FaqBook::load(&faqs_path)?;
            match action {
                FaqAction::Add { question, answer } => {
                    let id = faqs.add(&question, &answer)?;
                    println!("saved faq {id}");
                }
                FaqAction::Edit {
                    id,
                    question,
                    answer,
                } => {
                    if faqs.edit(&id, &question, &answer)? {
                        println!("updated faq {id}");
                    } else {
                        println!("no faq {id}");
                    }
                }
                FaqAction::Remove { id } => {
                    if faqs.remove(&id)? {
                        println!("removed faq {id}");
                    } else {
                        println!("no faq {id}");
                    }
                }
                FaqAction::List => {
                    for entry in faqs.entries() {
                        println!("{}\n  Q: {}\n  A: {}", entry.id, entry.question, entry.answer);
                    }
                }
                FaqAction::Ask { id, page } => {
                    let Some(entry) = faqs.get(&id) else {
                        anyhow::bail!("no faq {id}");
                    };
                    println!("A: {}", entry.answer);

                    let synonyms = SynonymDictionary::load(&synonyms_path)?;
                    let coordinator = SearchCoordinator::new(store, settings);
                    let outcome =
                        coordinator.search(&entry.question, &SearchFilters::default(), &synonyms)?;
                    print_outcome(&outcome, settings.page_size, page);
                }
            }
        }
        Command::Repl => {
            let synonyms = SynonymDictionary::load(&synonyms_path)?;
            let session = SearchSession::new(
                SearchCoordinator::new(store, settings),
                ChatHistory::default(),
            );
            run_repl(session, &synonyms).await?;
        }
    }

    Ok(())
}

/// Opens the record store. A corrupted file is reset when requested, otherwise the tool keeps
/// running on an empty read-only store and leaves the file untouched.
fn open_store(path: &Path, reset: bool) -> anyhow::Result<JsonRecordStore> {
    if reset {
        return Ok(JsonRecordStore::open_or_reset(path)?);
    }

    match JsonRecordStore::open(path) {
        Ok(store) => Ok(store),
        Err(StoreError::Corrupted { path, details }) => {
            warn!(
                path = %path.display(),
                %details,
                "record store is corrupted; running read-only (pass --reset-store to clear it)"
            );
            Ok(JsonRecordStore::degraded(path))
        }
        Err(error) => Err(error.into()),
    }
}

fn print_outcome(outcome: &SearchOutcome, page_size: usize, page_number: usize) {
    if outcome.is_empty() {
        println!("no matches for `{}`", outcome.query);
        return;
    }

    let groups = outcome.groups();
    let page = paginate(&groups, page_size, page_number);
    println!(
        "{} results in {} documents (page {}/{})",
        outcome.results.len(),
        groups.len(),
        page.page_number,
        page.total_pages
    );

    for group in page.items {
        println!("== {}", group.filename);
        for result in &group.results {
            let location = result
                .line_number
                .map(|line| format!("line {line}, "))
                .unwrap_or_default();
            println!(
                "  [{location}score {}] {}",
                result.score,
                normalize_whitespace(&result.highlighted("**", "**"))
            );
            if !result.tags.is_empty() {
                println!("    tags: {}", result.tags.join(", "));
            }
        }

        let images = group
            .results
            .first()
            .map(|result| result.image_paths.as_slice())
            .unwrap_or_default();
        for image in images {
            if image.exists() {
                println!("    image: {}", image.display());
            } else {
                println!("    image: {} (missing)", image.display());
            }
        }
    }
}

async fn run_repl(
    mut session: SearchSession<JsonRecordStore>,
    synonyms: &SynonymDictionary,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let page_size = session.settings().page_size;
    let mut filters = SearchFilters::default();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            (":quit", _) => break,
            (":history", needle) => {
                for (index, query) in session.history().filter(needle).into_iter().enumerate() {
                    println!("{:>3}  {query}", index + 1);
                }
            }
            (":clear", _) => {
                session.history_mut().clear();
                println!("history cleared");
            }
            (":export", target) if !target.trim().is_empty() => {
                let target = PathBuf::from(target.trim());
                match session.history().export(&target) {
                    Ok(()) => println!("history written to {}", target.display()),
                    Err(error) => println!("export failed: {error}"),
                }
            }
            (":page", number) => match (session.last(), number.trim().parse::<usize>()) {
                (Some(outcome), Ok(number)) => print_outcome(outcome, page_size, number),
                (None, _) => println!("no search yet"),
                (_, Err(_)) => println!("usage: :page <number>"),
            },
            (":preset", name) => match name.parse::<RegexPreset>() {
                Ok(preset) => {
                    let preset_filters = SearchFilters {
                        regex: true,
                        ..filters.clone()
                    };
                    match session.run(preset.pattern(), &preset_filters, synonyms) {
                        Ok(outcome) => print_outcome(outcome, page_size, 1),
                        Err(error) => println!("search failed: {error}"),
                    }
                }
                Err(error) => println!("{error}"),
            },
            (setting @ (":regex" | ":case" | ":tag" | ":type"), value) => {
                match apply_setting(&mut filters, setting, value) {
                    Ok(()) => println!("{}", describe_filters(&filters)),
                    Err(error) => println!("{error}"),
                }
            }
            (command, _) if command.starts_with(':') => {
                println!(
                    "commands: :history [text], :export <path>, :clear, :page <n>, \
                     :preset email|phone, :regex on|off, :case on|off, :tag <tag|All>, \
                     :type <txt|docx|pdf|All>, :quit"
                );
            }
            _ => match session.run(line, &filters, synonyms) {
                Ok(outcome) => print_outcome(outcome, page_size, 1),
                Err(error) => println!("search failed: {error}"),
            },
        }
    }

    Ok(())
}

fn apply_setting(filters: &mut SearchFilters, setting: &str, value: &str) -> Result<(), String> {
    let value = value.trim();
    let switch = || match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(format!("usage: {setting} on|off")),
    };

    match setting {
        ":regex" => filters.regex = switch()?,
        ":case" => filters.case_sensitive = switch()?,
        ":tag" => {
            filters.tag = match value {
                "" => return Err(format!("usage: :tag <tag|{ALL_FILTER}>")),
                ALL_FILTER => None,
                tag => Some(tag.to_string()),
            }
        }
        ":type" => {
            filters.filetype = match value {
                "" => return Err(format!("usage: :type <txt|docx|pdf|{ALL_FILTER}>")),
                ALL_FILTER => None,
                filetype => Some(filetype.parse::<FileType>()?),
            }
        }
        other => return Err(format!("unknown setting {other}")),
    }
    Ok(())
}

fn describe_filters(filters: &SearchFilters) -> String {
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    format!(
        "regex {}, case {}, tag {}, type {}",
        on_off(filters.regex),
        on_off(filters.case_sensitive),
        filters.tag.as_deref().unwrap_or(ALL_FILTER),
        filters.filetype.map(|filetype| filetype.as_str()).unwrap_or(ALL_FILTER)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repl_settings_update_filters() -> Result<(), Box<dyn std::error::Error>> {
        let mut filters = SearchFilters::default();

        apply_setting(&mut filters, ":regex", "on")?;
        apply_setting(&mut filters, ":case", " on ")?;
        apply_setting(&mut filters, ":tag", "billing")?;
        apply_setting(&mut filters, ":type", "pdf")?;
        assert_eq!(
            filters,
            SearchFilters {
                tag: Some("billing".to_string()),
                filetype: Some(FileType::Pdf),
                case_sensitive: true,
                regex: true,
            }
        );
        assert_eq!(describe_filters(&filters), "regex on, case on, tag billing, type pdf");

        apply_setting(&mut filters, ":tag", ALL_FILTER)?;
        apply_setting(&mut filters, ":type", ALL_FILTER)?;
        apply_setting(&mut filters, ":regex", "off")?;
        apply_setting(&mut filters, ":case", "off")?;
        assert_eq!(filters, SearchFilters::default());
        Ok(())
    }

    #[test]
    fn invalid_repl_settings_leave_filters_alone() {
        let mut filters = SearchFilters::default();
        assert!(apply_setting(&mut filters, ":regex", "maybe").is_err());
        assert!(apply_setting(&mut filters, ":type", "xlsx").is_err());
        assert!(apply_setting(&mut filters, ":tag", "").is_err());
        assert_eq!(filters, SearchFilters::default());
    }

    #[test]
    fn search_requires_a_query_or_a_preset() {
        assert!(Cli::try_parse_from(["kb-search", "search"]).is_err());
        assert!(Cli::try_parse_from(["kb-search", "search", "--preset", "email"]).is_ok());
        assert!(Cli::try_parse_from(["kb-search", "search", "refund"]).is_ok());
        assert!(Cli::try_parse_from(["kb-search", "search", "--preset", "fax"]).is_err());
    }
}
