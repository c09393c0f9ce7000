/*
 * Encodes lists into compact share tokens and decodes tokens back into new
 * lists. A token is standard base64 over a small JSON record with one-letter
 * keys. Two record sizes exist: the primary tier carries most of the list, the
 * minimal tier is a smaller fallback used when the primary token does not fit
 * into a visual code.
 *
 * Decoding accepts both tiers plus the older long-key record shape
 * (`name`, `quantity`, `imageUrl`, ...), filling in defaults for anything
 * missing. Decoded lists always get fresh ids and start with every product
 * open and in stock.
 */
use super::models::{DEFAULT_IMPORTED_LIST_NAME, ListSource, Product, ProductFields, RestockList, new_id};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose};
use base64::engine::DecodePaddingMode;
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

pub const DEFAULT_PRODUCT_NAME: &str = "Unnamed Product";

/* Accepts tokens with or without trailing `=` padding. */
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareTier {
    Primary,
    Minimal,
}

/* Per-tier size bounds, counted in characters. */
struct TierLimits {
    list_name: usize,
    max_products: usize,
    product_name: usize,
    comment: Option<usize>,
    category: Option<usize>,
    description: Option<usize>,
}

impl ShareTier {
    fn limits(self) -> TierLimits {
        match self {
            ShareTier::Primary => TierLimits {
                list_name: 50,
                max_products: 20,
                product_name: 30,
                comment: Some(50),
                category: Some(20),
                description: Some(100),
            },
            ShareTier::Minimal => TierLimits {
                list_name: 20,
                max_products: 10,
                product_name: 15,
                comment: None,
                category: None,
                description: None,
            },
        }
    }
}

#[derive(Debug)]
pub enum EncodeError {
    Serde(serde_json::Error),
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        EncodeError::Serde(err)
    }
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::Serde(e) => write!(f, "Could not serialize share record: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Serde(e) => Some(e),
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    Empty,
    InvalidEncoding(base64::DecodeError),
    InvalidText(std::string::FromUtf8Error),
    InvalidRecord(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "Share code is empty"),
            DecodeError::InvalidEncoding(e) => write!(f, "Share code is not valid base64: {e}"),
            DecodeError::InvalidText(e) => write!(f, "Share code is not valid UTF-8: {e}"),
            DecodeError::InvalidRecord(msg) => write!(f, "Share code does not hold a list: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::InvalidEncoding(e) => Some(e),
            DecodeError::InvalidText(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct CompactProduct {
    n: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cat: Option<String>,
}

#[derive(Serialize)]
struct CompactList {
    n: String,
    p: Vec<CompactProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    d: Option<String>,
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn bounded_text(value: Option<&str>, max_chars: Option<usize>) -> Option<String> {
    let max_chars = max_chars?;
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| truncate_chars(v, max_chars))
}

fn compact_record(list: &RestockList, tier: ShareTier) -> CompactList {
    let limits = tier.limits();
    let products = list
        .products
        .iter()
        .take(limits.max_products)
        .map(|p| CompactProduct {
            n: truncate_chars(&p.name, limits.product_name),
            q: (p.quantity > 0).then_some(p.quantity),
            c: bounded_text(p.comment.as_deref(), limits.comment),
            cat: bounded_text(p.category.as_deref(), limits.category),
        })
        .collect();
    CompactList {
        n: truncate_chars(&list.name, limits.list_name),
        p: products,
        d: bounded_text(Some(list.description.as_str()), limits.description),
    }
}

/*
 * Builds the share token for `list` at the given tier. Image URLs are never
 * included at any tier.
 */
pub fn encode_share_code(list: &RestockList, tier: ShareTier) -> Result<String, EncodeError> {
    let record = compact_record(list, tier);
    let json = serde_json::to_string(&record)?;
    let token = general_purpose::STANDARD.encode(json.as_bytes());
    log::debug!(
        "ShareCodec: Encoded list '{}' at {tier:?} tier: {} products, {} chars.",
        list.id,
        record.p.len(),
        token.len()
    );
    Ok(token)
}

/* First non-null value among the given alias keys. */
fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|v| !v.is_null())
}

fn text_field(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    match field(object, aliases)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn quantity_field(object: &Map<String, Value>) -> u32 {
    let Some(Value::Number(n)) = field(object, &["q", "quantity"]) else {
        return 0;
    };
    if let Some(q) = n.as_u64() {
        return u32::try_from(q).unwrap_or(u32::MAX);
    }
    match n.as_f64() {
        Some(q) if q > 0.0 => q.trunc().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn decode_product(value: &Value) -> Product {
    let empty = Map::new();
    let object = value.as_object().unwrap_or(&empty);
    let name = text_field(object, &["n", "name"])
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string());
    let fields = ProductFields {
        name,
        image_url: text_field(object, &["i", "img", "imageUrl"]),
        comment: text_field(object, &["c", "comment"]),
        category: text_field(object, &["cat", "category"]),
    };
    let mut product = Product::new(new_id(), fields);
    product.quantity = quantity_field(object);
    product
}

/*
 * Decodes a pasted or scanned token into a brand-new list stamped with `now`.
 * Fails when the token is blank, not base64, not UTF-8 or not a JSON object.
 */
pub fn decode_share_code(token: &str, now: OffsetDateTime) -> Result<RestockList, DecodeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = LENIENT_STANDARD
        .decode(token)
        .map_err(DecodeError::InvalidEncoding)?;
    let text = String::from_utf8(bytes).map_err(DecodeError::InvalidText)?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| DecodeError::InvalidRecord(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(DecodeError::InvalidRecord("expected a JSON object".to_string()));
    };

    let products: Vec<Product> = match field(&object, &["p", "products"]) {
        Some(Value::Array(items)) => items.iter().map(decode_product).collect(),
        _ => Vec::new(),
    };
    let name = text_field(&object, &["n", "name"])
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMPORTED_LIST_NAME.to_string());
    let description = text_field(&object, &["d", "description"])
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("Imported {} items from QR code", products.len()));

    let mut list = RestockList::new(new_id(), name, description, now, ListSource::ImportedFromCode);
    list.products = products;
    log::debug!(
        "ShareCodec: Decoded list '{}' with {} products.",
        list.name,
        list.products.len()
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-07-30 12:00:00 UTC);

    fn list_with(products: Vec<Product>) -> RestockList {
        let mut list = RestockList::new(
            "src".to_string(),
            "Groceries".to_string(),
            "Weekly run".to_string(),
            datetime!(2025-07-01 08:00:00 UTC),
            ListSource::ManualEntry,
        );
        list.products = products;
        list
    }

    fn product(name: &str, quantity: u32) -> Product {
        let mut p = Product::new(new_id(), ProductFields::new(name));
        p.quantity = quantity;
        p
    }

    fn decode_json(token: &str) -> Value {
        let bytes = general_purpose::STANDARD.decode(token).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn encode_json(json: &str) -> String {
        general_purpose::STANDARD.encode(json.as_bytes())
    }

    #[test]
    fn test_primary_round_trip_keeps_names_and_quantities() {
        let mut milk = product("Milk", 2);
        milk.comment = Some("2%".to_string());
        milk.category = Some("Dairy".to_string());
        milk.image_url = Some("https://example.com/milk.png".to_string());
        milk.is_completed = true;
        milk.completed_at = Some(NOW);
        let list = list_with(vec![milk, product("Bread", 0)]);

        let token = encode_share_code(&list, ShareTier::Primary).unwrap();
        let decoded = decode_share_code(&token, NOW).unwrap();

        assert_eq!(decoded.name, "Groceries");
        assert_eq!(decoded.description, "Weekly run");
        assert_eq!(decoded.source, Some(ListSource::ImportedFromCode));
        assert_eq!(decoded.created_at, NOW);
        assert_ne!(decoded.id, list.id);
        let names: Vec<_> = decoded.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Milk", "Bread"]);
        assert_eq!(decoded.products[0].quantity, 2);
        assert_eq!(decoded.products[0].comment.as_deref(), Some("2%"));
        assert_eq!(decoded.products[0].category.as_deref(), Some("Dairy"));
        assert_eq!(decoded.products[0].image_url, None);
        assert!(decoded.products.iter().all(|p| !p.is_completed && !p.is_out_of_stock));
        assert_ne!(decoded.products[0].id, list.products[0].id);
    }

    #[test]
    fn test_primary_record_omits_empty_fields_and_image_urls() {
        let mut p = product("Eggs", 0);
        p.image_url = Some("https://example.com/eggs.png".to_string());
        let mut list = list_with(vec![p]);
        list.description = "  ".to_string();

        let token = encode_share_code(&list, ShareTier::Primary).unwrap();

        assert_eq!(decode_json(&token), serde_json::json!({"n": "Groceries", "p": [{"n": "Eggs"}]}));
        assert!(!token.is_empty());
    }

    #[test]
    fn test_primary_tier_truncates_by_character() {
        let long_name = "é".repeat(60);
        let mut p = product(&"x".repeat(40), 1);
        p.comment = Some("c".repeat(80));
        p.category = Some("k".repeat(30));
        let mut list = list_with((0..25).map(|i| product(&format!("P{i}"), 0)).collect());
        list.products.insert(0, p);
        list.name = long_name;
        list.description = "d".repeat(150);

        let json = decode_json(&encode_share_code(&list, ShareTier::Primary).unwrap());

        assert_eq!(json["n"].as_str().unwrap().chars().count(), 50);
        assert_eq!(json["d"].as_str().unwrap().len(), 100);
        let products = json["p"].as_array().unwrap();
        assert_eq!(products.len(), 20);
        assert_eq!(products[0]["n"].as_str().unwrap().len(), 30);
        assert_eq!(products[0]["c"].as_str().unwrap().len(), 50);
        assert_eq!(products[0]["cat"].as_str().unwrap().len(), 20);
    }

    #[test]
    fn test_minimal_tier_drops_comments_categories_and_description() {
        let mut p = product("A very long product name", 3);
        p.comment = Some("note".to_string());
        p.category = Some("Food".to_string());
        let mut products = vec![p];
        products.extend((0..15).map(|i| product(&format!("P{i}"), 0)));
        let mut list = list_with(products);
        list.name = "An extremely long list name".to_string();

        let json = decode_json(&encode_share_code(&list, ShareTier::Minimal).unwrap());

        assert_eq!(json["n"], "An extremely long li");
        assert!(json.get("d").is_none());
        let products = json["p"].as_array().unwrap();
        assert_eq!(products.len(), 10);
        assert_eq!(products[0], serde_json::json!({"n": "A very long pro", "q": 3}));
    }

    #[test]
    fn test_decode_legacy_long_key_record() {
        let token = encode_json(
            r#"{"name":"Legacy","description":"old","products":[{"name":"Tea","quantity":4,"comment":"green","category":"Drinks","imageUrl":"https://x/tea.png"},{"img":"https://x/y.png"}]}"#,
        );

        let list = decode_share_code(&token, NOW).unwrap();

        assert_eq!(list.name, "Legacy");
        assert_eq!(list.description, "old");
        assert_eq!(list.products[0].name, "Tea");
        assert_eq!(list.products[0].quantity, 4);
        assert_eq!(list.products[0].image_url.as_deref(), Some("https://x/tea.png"));
        assert_eq!(list.products[1].name, DEFAULT_PRODUCT_NAME);
        assert_eq!(list.products[1].image_url.as_deref(), Some("https://x/y.png"));
    }

    #[test]
    fn test_decode_fills_defaults_for_missing_fields() {
        let token = encode_json(r#"{"p":[{"q":-2},{"n":"Jam","q":2.7},{"n":"Oil","q":"many"}]}"#);

        let list = decode_share_code(&token, NOW).unwrap();

        assert_eq!(list.name, DEFAULT_IMPORTED_LIST_NAME);
        assert_eq!(list.description, "Imported 3 items from QR code");
        assert_eq!(list.products[0].name, DEFAULT_PRODUCT_NAME);
        assert_eq!(list.products[0].quantity, 0);
        assert_eq!(list.products[1].quantity, 2);
        assert_eq!(list.products[2].quantity, 0);
    }

    #[test]
    fn test_decode_trims_whitespace_and_accepts_missing_padding() {
        let padded = encode_json(r#"{"n":"Ab"}"#);
        let unpadded = padded.trim_end_matches('=').to_string();
        assert_ne!(padded, unpadded);

        let list = decode_share_code(&format!("  {unpadded}\n"), NOW).unwrap();
        assert_eq!(list.name, "Ab");
        assert!(list.products.is_empty());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_share_code("   ", NOW), Err(DecodeError::Empty)));
        assert!(matches!(
            decode_share_code("not-a-valid-token", NOW),
            Err(DecodeError::InvalidEncoding(_))
        ));
        let invalid_utf8 = general_purpose::STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(
            decode_share_code(&invalid_utf8, NOW),
            Err(DecodeError::InvalidText(_))
        ));
        assert!(matches!(
            decode_share_code(&encode_json("[1,2]"), NOW),
            Err(DecodeError::InvalidRecord(_))
        ));
        assert!(matches!(
            decode_share_code(&encode_json("plain words"), NOW),
            Err(DecodeError::InvalidRecord(_))
        ));
    }
}
