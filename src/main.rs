// src/main.rs

use clap::{Parser, Subcommand};
use restock_keeper::app_logic::{RestockApp, ui_constants};
use restock_keeper::core::query::{self, DisplayDate};
use restock_keeper::core::{
    ClockOperations, CoreConfigManager, FileBlobStore, ListSortKey, ListStore, MutationOutcome,
    ProductFields, ProductSortKey, QrCodeRenderer, RestockList, SortOrder, SystemClock,
    parse_quantity_input, path_utils,
};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use time::macros::format_description;

const LOG_FILE_NAME: &str = "restock_keeper.log";

#[derive(Parser)]
#[command(name = "restock-keeper", version, about = "Keep track of restock lists")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Store lists in this directory instead of the platform data directory.
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show all lists, filtered and sorted.
    Lists {
        #[arg(long, default_value = "")]
        search: String,
        /// name, count or date
        #[arg(long = "sort")]
        sort_by: Option<ListSortKey>,
        /// asc or desc
        #[arg(long)]
        order: Option<SortOrder>,
        /// Keep the given sort settings for later runs.
        #[arg(long)]
        remember: bool,
    },
    /// Create a new list.
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a list.
    Delete { list: String },
    /// Show the products of a list.
    Show {
        list: String,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<String>,
        /// name, quantity, completion, stock or category
        #[arg(long = "sort")]
        sort_by: Option<ProductSortKey>,
        #[arg(long)]
        order: Option<SortOrder>,
        #[arg(long)]
        remember: bool,
    },
    /// Open a list: mark it viewed and show its products.
    Open { list: String },
    /// Show the categories used in a list.
    Categories { list: String },
    /// Add a product to a list.
    Add {
        list: String,
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long = "image-url")]
        image_url: Option<String>,
    },
    /// Replace the name, category, comment and image of a product.
    Edit {
        list: String,
        product: String,
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long = "image-url")]
        image_url: Option<String>,
    },
    /// Remove a product from a list.
    Remove { list: String, product: String },
    /// Set the quantity of a product.
    Qty {
        list: String,
        product: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Change the quantity of a product by a delta.
    Adjust {
        list: String,
        product: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Reset the quantity of one product to zero.
    Reset { list: String, product: String },
    /// Reset every product of a list.
    ResetAll { list: String },
    /// Toggle the completion of a product.
    Complete { list: String, product: String },
    /// Toggle the out-of-stock flag of a product.
    Stock { list: String, product: String },
    /// Print the share code for a list.
    Share { list: String },
    /// Import a list from a share code.
    ImportCode { code: String },
    /// Import a list from a CSV file.
    ImportCsv { path: PathBuf },
}

fn init_logging() {
    let term_logger = TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
    let file_logger = path_utils::get_base_app_config_local_dir(ui_constants::APP_NAME)
        .and_then(|dir| File::create(dir.join(LOG_FILE_NAME)).ok())
        .map(|file| WriteLogger::new(LevelFilter::Debug, Config::default(), file));

    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![term_logger as Box<dyn simplelog::SharedLogger>];
    if let Some(file_logger) = file_logger {
        loggers.push(file_logger);
    }
    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

/* Accepts a list id, a unique id prefix or a case-insensitive list name. */
fn resolve_list(store: &ListStore, reference: &str) -> Result<String, String> {
    let lists = store.lists();
    if let Some(list) = lists.iter().find(|l| l.id == reference) {
        return Ok(list.id.clone());
    }
    let matches: Vec<&RestockList> = lists
        .iter()
        .filter(|l| l.id.starts_with(reference) || l.name.eq_ignore_ascii_case(reference))
        .collect();
    match matches.as_slice() {
        [list] => Ok(list.id.clone()),
        [] => Err(format!("{}: {reference}", ui_constants::MSG_LIST_NOT_FOUND)),
        _ => Err(format!("'{reference}' matches more than one list")),
    }
}

fn resolve_product(store: &ListStore, list_id: &str, reference: &str) -> Result<String, String> {
    let list = store
        .get_list(list_id)
        .ok_or_else(|| ui_constants::MSG_LIST_NOT_FOUND.to_string())?;
    if let Some(product) = list.find_product(reference) {
        return Ok(product.id.clone());
    }
    let matches: Vec<_> = list
        .products
        .iter()
        .filter(|p| p.id.starts_with(reference) || p.name.eq_ignore_ascii_case(reference))
        .collect();
    match matches.as_slice() {
        [product] => Ok(product.id.clone()),
        [] => Err(format!("Product not found: {reference}")),
        _ => Err(format!("'{reference}' matches more than one product")),
    }
}

fn fields(
    name: String,
    category: Option<String>,
    comment: Option<String>,
    image_url: Option<String>,
) -> ProductFields {
    ProductFields {
        name,
        image_url,
        comment,
        category,
    }
}

fn report(outcome: MutationOutcome) -> Result<(), String> {
    match outcome {
        MutationOutcome::Applied => Ok(()),
        MutationOutcome::Rejected(e) => Err(e.to_string()),
        MutationOutcome::NotFound => Err("Nothing to change".to_string()),
    }
}

/* First eight characters of an id, for compact listings. */
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn format_date(date: time::OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    date.format(format).unwrap_or_else(|_| date.to_string())
}

fn print_list_line(list: &RestockList) {
    let progress = query::list_progress(list);
    let date = match query::display_date(list) {
        DisplayDate::LastViewed(d) => format!("viewed {}", format_date(d)),
        DisplayDate::Created(d) => format!("created {}", format_date(d)),
    };
    let done = if list.is_fully_completed() { " [done]" } else { "" };
    println!(
        "{}  {}  {}/{} ({:.0}%)  {}{done}",
        short_id(&list.id),
        list.name,
        progress.completed,
        progress.total,
        progress.percentage,
        date
    );
}

fn print_products(app: &RestockApp, list_id: &str, search: &str, category: Option<String>) {
    let Some(list) = app.store().get_list(list_id) else {
        return;
    };
    println!("{} - {}", list.name, list.description);
    for product in app.visible_products(list_id, search, category).unwrap_or_default() {
        let mut flags = String::new();
        if product.is_completed {
            flags.push_str(" [x]");
        }
        if product.is_out_of_stock {
            flags.push_str(" [out of stock]");
        }
        let category = product
            .category
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        let comment = product
            .comment
            .as_deref()
            .map(|c| format!(" - {c}"))
            .unwrap_or_default();
        println!(
            "  {}  {} x{}{category}{comment}{flags}",
            short_id(&product.id),
            product.name,
            product.quantity
        );
    }
}

fn build_app(data_dir: Option<PathBuf>) -> Result<RestockApp, String> {
    let persistence = match data_dir {
        Some(dir) => FileBlobStore::new(dir, restock_keeper::core::persistence::STORAGE_KEY),
        None => FileBlobStore::in_app_data_dir(ui_constants::APP_NAME).map_err(|e| e.to_string())?,
    };
    log::debug!("Main: Using list storage at {:?}.", persistence.blob_path());
    let clock: Arc<dyn ClockOperations> = Arc::new(SystemClock::new());
    let store = ListStore::load(Arc::new(persistence), Arc::clone(&clock));
    Ok(RestockApp::new(
        store,
        Arc::new(QrCodeRenderer::new()),
        clock,
        Arc::new(CoreConfigManager::new()),
    ))
}

fn run(cli: Cli) -> Result<(), String> {
    let mut app = build_app(cli.data_dir)?;

    match cli.command {
        Command::Lists {
            search,
            sort_by,
            order,
            remember,
        } => {
            let current = app.preferences();
            app.set_list_sort(
                sort_by.unwrap_or(current.list_sort_by),
                order.unwrap_or(current.list_sort_order),
            );
            if remember {
                app.save_preferences()?;
            }
            for list in app.visible_lists(&search) {
                print_list_line(list);
            }
        }
        Command::Create { name, description } => {
            let id = app
                .store_mut()
                .create_list(&name, &description)
                .ok_or("List name must not be blank")?;
            println!("{id}");
        }
        Command::Delete { list } => {
            let list_id = resolve_list(app.store(), &list)?;
            report(app.store_mut().delete_list(&list_id))?;
        }
        Command::Show {
            list,
            search,
            category,
            sort_by,
            order,
            remember,
        } => {
            let list_id = resolve_list(app.store(), &list)?;
            let current = app.preferences();
            app.set_product_sort(
                sort_by.unwrap_or(current.product_sort_by),
                order.unwrap_or(current.product_sort_order),
            );
            if remember {
                app.save_preferences()?;
            }
            print_products(&app, &list_id, &search, category);
        }
        Command::Open { list } => {
            let list_id = resolve_list(app.store(), &list)?;
            report(app.store_mut().select_list(&list_id))?;
            print_products(&app, &list_id, "", None);
        }
        Command::Categories { list } => {
            let list_id = resolve_list(app.store(), &list)?;
            if let Some(list) = app.store().get_list(&list_id) {
                for category in query::available_categories(list) {
                    println!("{category}");
                }
            }
        }
        Command::Add {
            list,
            name,
            category,
            comment,
            image_url,
        } => {
            let list_id = resolve_list(app.store(), &list)?;
            let id = app
                .store_mut()
                .add_product(&list_id, fields(name, category, comment, image_url))
                .ok_or("Product name must not be blank")?;
            println!("{id}");
        }
        Command::Edit {
            list,
            product,
            name,
            category,
            comment,
            image_url,
        } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            report(app.store_mut().edit_product(
                &list_id,
                &product_id,
                fields(name, category, comment, image_url),
            ))?;
        }
        Command::Remove { list, product } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            report(app.store_mut().delete_product(&list_id, &product_id))?;
        }
        Command::Qty {
            list,
            product,
            value,
        } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            let quantity = parse_quantity_input(&value);
            report(app.store_mut().set_quantity(&list_id, &product_id, quantity))?;
        }
        Command::Adjust {
            list,
            product,
            delta,
        } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            report(app.store_mut().adjust_quantity(&list_id, &product_id, delta))?;
        }
        Command::Reset { list, product } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            report(app.store_mut().reset_product(&list_id, &product_id))?;
        }
        Command::ResetAll { list } => {
            let list_id = resolve_list(app.store(), &list)?;
            report(app.store_mut().reset_all_products(&list_id))?;
        }
        Command::Complete { list, product } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            report(app.store_mut().toggle_completion(&list_id, &product_id))?;
        }
        Command::Stock { list, product } => {
            let list_id = resolve_list(app.store(), &list)?;
            let product_id = resolve_product(app.store(), &list_id, &product)?;
            report(app.store_mut().toggle_out_of_stock(&list_id, &product_id))?;
        }
        Command::Share { list } => {
            let list_id = resolve_list(app.store(), &list)?;
            app.request_share(&list_id)?;
            if let Some(state) = app.wait_for_render() {
                println!("{}", state.token);
                match &state.visual_code {
                    Some(code) => {
                        eprintln!("{}", code.image);
                        eprintln!(
                            "QR code: version {} ({}x{} modules)",
                            code.version, code.width, code.width
                        );
                    }
                    None => eprintln!(
                        "{}",
                        state
                            .notice
                            .as_deref()
                            .unwrap_or(ui_constants::MSG_VISUAL_CODE_UNAVAILABLE)
                    ),
                }
            }
        }
        Command::ImportCode { code } => {
            let id = app.import_code(&code)?;
            println!("{id}");
        }
        Command::ImportCsv { path } => {
            let id = app.import_csv_file(&path)?;
            println!("{id}");
        }
    }

    if let Some(e) = app.store_mut().take_persist_error() {
        return Err(format!("Changes could not be saved: {e}"));
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    log::debug!("Main: Starting restock-keeper.");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
