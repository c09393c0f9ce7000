/*
 * Parses the simple line-oriented CSV layout used for bulk list import:
 *
 *   List name
 *   product name,category,image url,comment
 *   ...
 *
 * Records are read with `csv::ReaderBuilder` with quoting turned off, so a
 * comma inside a value always starts a new field. Rows may have any number
 * of fields; columns beyond the fourth are ignored.
 */
use super::models::{DEFAULT_IMPORTED_LIST_NAME, ListSource, Product, ProductFields, RestockList, new_id};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::io;
use std::path::Path;
use time::OffsetDateTime;
use time::macros::format_description;

const CSV_EXTENSION: &str = "csv";

#[derive(Debug)]
pub enum CsvImportError {
    EmptyContent,
    Format(String),
    ResourceAccess(io::Error),
}

impl From<io::Error> for CsvImportError {
    fn from(err: io::Error) -> Self {
        CsvImportError::ResourceAccess(err)
    }
}

impl From<csv::Error> for CsvImportError {
    fn from(err: csv::Error) -> Self {
        CsvImportError::Format(err.to_string())
    }
}

impl std::fmt::Display for CsvImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvImportError::EmptyContent => write!(f, "CSV content is empty"),
            CsvImportError::Format(msg) => write!(f, "Invalid CSV: {msg}"),
            CsvImportError::ResourceAccess(e) => write!(f, "Could not read CSV file: {e}"),
        }
    }
}

impl std::error::Error for CsvImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CsvImportError::ResourceAccess(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CsvImportError>;

fn import_date(now: OffsetDateTime) -> String {
    let format = format_description!("[month padding:none]/[day padding:none]/[year]");
    now.format(format).unwrap_or_else(|e| {
        log::warn!("CsvImport: Could not format import date: {e}");
        now.date().to_string()
    })
}

fn optional_column(record: &StringRecord, index: usize) -> Option<String> {
    record.get(index).map(str::to_string)
}

/* Reads every record, trimmed. Lines holding only whitespace are skipped. */
fn read_records(content: &str) -> Result<Vec<StringRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(content.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record.get(0) == Some("") {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/*
 * Builds a new list from CSV text. The first non-blank record names the list;
 * every following non-blank record becomes one product.
 */
pub fn parse_csv(content: &str, now: OffsetDateTime) -> Result<RestockList> {
    let records = read_records(content)?;
    let Some((header, rows)) = records.split_first() else {
        return Err(CsvImportError::EmptyContent);
    };

    let name = header
        .get(0)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_IMPORTED_LIST_NAME);

    let products: Vec<Product> = rows
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let product_name = record
                .get(0)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Product {}", index + 1));
            let fields = ProductFields {
                name: product_name,
                category: optional_column(record, 1),
                image_url: optional_column(record, 2),
                comment: optional_column(record, 3),
            };
            Product::new(new_id(), fields)
        })
        .collect();

    let mut list = RestockList::new(
        new_id(),
        name.to_string(),
        format!("Imported from CSV on {}", import_date(now)),
        now,
        ListSource::ImportedFromCsv,
    );
    list.products = products;
    log::debug!(
        "CsvImport: Parsed list '{}' with {} products.",
        list.name,
        list.products.len()
    );
    Ok(list)
}

/*
 * Reads a CSV file for import. Only `.csv` files are accepted and the content
 * must hold something other than whitespace.
 */
pub fn read_csv_file(path: &Path) -> Result<String> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == CSV_EXTENSION);
    if !is_csv {
        log::debug!("CsvImport: Rejected non-CSV file {path:?}.");
        return Err(CsvImportError::Format(format!("{} is not a .csv file", path.display())));
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        log::debug!("CsvImport: File {path:?} has no content.");
        return Err(CsvImportError::EmptyContent);
    }
    log::trace!("CsvImport: Read {} bytes from {path:?}.", content.len());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-07-04 15:30:00 UTC);

    #[test]
    fn test_parse_csv_snacks_scenario() {
        let list = parse_csv("Snacks\nChips,Food,,Tasty\nSoda,Drinks,,", NOW).unwrap();

        assert_eq!(list.name, "Snacks");
        assert_eq!(list.source, Some(ListSource::ImportedFromCsv));
        assert_eq!(list.description, "Imported from CSV on 7/4/2025");
        assert_eq!(list.created_at, NOW);
        assert_eq!(list.products.len(), 2);

        let chips = &list.products[0];
        assert_eq!(chips.name, "Chips");
        assert_eq!(chips.category.as_deref(), Some("Food"));
        assert_eq!(chips.image_url, None);
        assert_eq!(chips.comment.as_deref(), Some("Tasty"));

        let soda = &list.products[1];
        assert_eq!(soda.name, "Soda");
        assert_eq!(soda.category.as_deref(), Some("Drinks"));
        assert_eq!(soda.comment, None);
        assert!(list.products.iter().all(|p| p.quantity == 0 && !p.is_completed && !p.is_out_of_stock));
    }

    #[test]
    fn test_parse_csv_handles_crlf_blank_lines_and_extra_columns() {
        let content = "\r\n  Pantry , ignored\r\n\r\nRice , Grains , https://x/rice.png , long grain , extra\r\n   \r\nBeans\r\n";

        let list = parse_csv(content, NOW).unwrap();

        assert_eq!(list.name, "Pantry");
        assert_eq!(list.products.len(), 2);
        assert_eq!(list.products[0].name, "Rice");
        assert_eq!(list.products[0].image_url.as_deref(), Some("https://x/rice.png"));
        assert_eq!(list.products[0].comment.as_deref(), Some("long grain"));
        assert_eq!(list.products[1].name, "Beans");
        assert_eq!(list.products[1].category, None);
    }

    #[test]
    fn test_parse_csv_defaults_blank_names() {
        let list = parse_csv(",x\nA\n,Cat\n", NOW).unwrap();
        assert_eq!(list.name, DEFAULT_IMPORTED_LIST_NAME);
        assert_eq!(list.products[0].name, "A");
        assert_eq!(list.products[1].name, "Product 2");
        assert_eq!(list.products[1].category.as_deref(), Some("Cat"));
    }

    #[test]
    fn test_parse_csv_comma_in_value_is_a_delimiter() {
        let list = parse_csv("L\n\"Salt, sea\",Spice", NOW).unwrap();
        assert_eq!(list.products[0].name, "\"Salt");
        assert_eq!(list.products[0].category.as_deref(), Some("sea\""));
    }

    #[test]
    fn test_parse_csv_rows_of_only_commas_become_default_products() {
        let list = parse_csv("Tools\n  \t \nHammer,,,\n , ,\n", NOW).unwrap();
        assert_eq!(list.name, "Tools");
        assert_eq!(list.products.len(), 2);
        assert_eq!(list.products[0].name, "Hammer");
        assert_eq!(list.products[0].category, None);
        assert_eq!(list.products[1].name, "Product 2");
        assert_eq!(list.products[1].comment, None);
    }

    #[test]
    fn test_parse_csv_empty_content() {
        assert!(matches!(parse_csv("", NOW), Err(CsvImportError::EmptyContent)));
        assert!(matches!(parse_csv(" \n\r\n\t", NOW), Err(CsvImportError::EmptyContent)));
    }

    #[test]
    fn test_parse_csv_header_only_gives_empty_list() {
        let list = parse_csv("Just a name", NOW).unwrap();
        assert_eq!(list.name, "Just a name");
        assert!(list.products.is_empty());
    }

    #[test]
    fn test_read_csv_file_accepts_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("restock.csv");
        fs::write(&path, "Snacks\nChips").unwrap();
        assert_eq!(read_csv_file(&path).unwrap(), "Snacks\nChips");
    }

    #[test]
    fn test_read_csv_file_rejects_other_extensions() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "Snacks").unwrap();
        assert!(matches!(read_csv_file(file.path()), Err(CsvImportError::Format(_))));
    }

    #[test]
    fn test_read_csv_file_missing_file_is_resource_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(matches!(read_csv_file(&path), Err(CsvImportError::ResourceAccess(_))));
    }

    #[test]
    fn test_read_csv_file_whitespace_only_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        fs::write(&path, "  \n ").unwrap();
        assert!(matches!(read_csv_file(&path), Err(CsvImportError::EmptyContent)));
    }
}
