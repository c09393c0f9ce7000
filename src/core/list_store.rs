/*
 * This module defines `ListStore`, the single owner and writer of the list
 * collection. Every mutation reads the current value of one list, builds an
 * updated copy and replaces the entry with the same id; afterwards the whole
 * collection is written through to the injected persistence port.
 *
 * Blank required input (list or product names) is a validation failure that
 * silently blocks the operation: nothing changes, nothing is persisted and the
 * caller receives `MutationOutcome::Rejected`. Persistence failures never undo
 * an in-memory change; they are logged and kept for the caller to inspect via
 * `take_persist_error`.
 */
use super::clock::ClockOperations;
use super::models::{ListSource, Product, ProductFields, RestockList, new_id};
use super::persistence::{self, ListPersistenceOperations, PersistenceError};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    BlankListName,
    BlankProductName,
    NoListSelected,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::BlankListName => write!(f, "List name must not be blank"),
            ValidationError::BlankProductName => write!(f, "Product name must not be blank"),
            ValidationError::NoListSelected => write!(f, "No list is selected"),
        }
    }
}

impl std::error::Error for ValidationError {}

/* Result of a mutating call. Only `Applied` changes state and persists. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Rejected(ValidationError),
    NotFound,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        self == MutationOutcome::Applied
    }
}

/*
 * Parses the text of an inline quantity editor. An optional sign followed by
 * the leading run of digits is taken and the rest ignored, so "3.7" reads as 3
 * and "12abc" as 12. Text without leading digits counts as 0. Overflow
 * saturates; the store clamps negatives afterwards.
 */
pub fn parse_quantity_input(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });
    if negative { -magnitude } else { magnitude }
}

fn clamp_quantity(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

pub struct ListStore {
    lists: Vec<RestockList>,
    selected_list_id: Option<String>,
    persistence: Arc<dyn ListPersistenceOperations>,
    clock: Arc<dyn ClockOperations>,
    last_persist_error: Option<PersistenceError>,
}

impl ListStore {
    /*
     * Hydrates a store from the persistence port. A missing blob starts an
     * empty collection. A blob that cannot be read or parsed is logged and
     * also starts an empty collection; it is left untouched until the next
     * mutation overwrites it.
     */
    pub fn load(
        persistence: Arc<dyn ListPersistenceOperations>,
        clock: Arc<dyn ClockOperations>,
    ) -> Self {
        let lists = match persistence.load() {
            Ok(Some(blob)) => match persistence::deserialize_lists(&blob) {
                Ok(lists) => {
                    log::debug!("ListStore: Hydrated {} lists from storage.", lists.len());
                    lists
                }
                Err(e) => {
                    log::error!("ListStore: Stored lists could not be parsed, starting empty: {e}");
                    Vec::new()
                }
            },
            Ok(None) => {
                log::debug!("ListStore: No stored lists, starting empty.");
                Vec::new()
            }
            Err(e) => {
                log::error!("ListStore: Failed to load stored lists, starting empty: {e}");
                Vec::new()
            }
        };
        ListStore {
            lists,
            selected_list_id: None,
            persistence,
            clock,
            last_persist_error: None,
        }
    }

    pub fn lists(&self) -> &[RestockList] {
        &self.lists
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn get_list(&self, list_id: &str) -> Option<&RestockList> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    pub fn selected_list_id(&self) -> Option<&str> {
        self.selected_list_id.as_deref()
    }

    pub fn selected_list(&self) -> Option<&RestockList> {
        self.selected_list_id
            .as_deref()
            .and_then(|id| self.get_list(id))
    }

    /* Returns and clears the error from the most recent failed write-through. */
    pub fn take_persist_error(&mut self) -> Option<PersistenceError> {
        self.last_persist_error.take()
    }

    fn persist(&mut self) {
        let result = persistence::serialize_lists(&self.lists)
            .and_then(|blob| self.persistence.save(&blob));
        match result {
            Ok(()) => {
                log::trace!("ListStore: Persisted {} lists.", self.lists.len());
                self.last_persist_error = None;
            }
            Err(e) => {
                log::error!("ListStore: Failed to persist lists: {e}");
                self.last_persist_error = Some(e);
            }
        }
    }

    /*
     * Builds an updated copy of one list with `update` and swaps it in by id.
     * `update` returns `None` to signal that the target (e.g. a product) was
     * not found, in which case nothing changes.
     */
    fn replace_list<F>(&mut self, list_id: &str, operation: &str, update: F) -> MutationOutcome
    where
        F: FnOnce(&RestockList) -> Option<RestockList>,
    {
        let Some(index) = self.lists.iter().position(|l| l.id == list_id) else {
            log::debug!("ListStore: {operation}: list '{list_id}' not found.");
            return MutationOutcome::NotFound;
        };
        let Some(updated) = update(&self.lists[index]) else {
            log::debug!("ListStore: {operation}: target in list '{list_id}' not found.");
            return MutationOutcome::NotFound;
        };
        self.lists[index] = updated;
        log::debug!("ListStore: {operation} applied to list '{list_id}'.");
        self.persist();
        MutationOutcome::Applied
    }

    fn replace_product<F>(
        &mut self,
        list_id: &str,
        product_id: &str,
        operation: &str,
        update: F,
    ) -> MutationOutcome
    where
        F: FnOnce(&Product) -> Product,
    {
        self.replace_list(list_id, operation, |list| {
            let index = list.products.iter().position(|p| p.id == product_id)?;
            let mut updated = list.clone();
            updated.products[index] = update(&list.products[index]);
            Some(updated)
        })
    }

    /*
     * Appends a new, empty, manually entered list. Returns its id, or `None`
     * when the name is blank.
     */
    pub fn create_list(&mut self, name: &str, description: &str) -> Option<String> {
        if name.trim().is_empty() {
            log::debug!("ListStore: create_list rejected: {}", ValidationError::BlankListName);
            return None;
        }
        let list = RestockList::new(
            new_id(),
            name.to_string(),
            description.to_string(),
            self.clock.now(),
            ListSource::ManualEntry,
        );
        let id = list.id.clone();
        self.lists.push(list);
        log::info!("ListStore: Created list '{name}' ({id}).");
        self.persist();
        Some(id)
    }

    /* Removes a list. Deleting an unknown id is a no-op. */
    pub fn delete_list(&mut self, list_id: &str) -> MutationOutcome {
        let before = self.lists.len();
        self.lists.retain(|l| l.id != list_id);
        if self.lists.len() == before {
            log::debug!("ListStore: delete_list: list '{list_id}' not found.");
            return MutationOutcome::NotFound;
        }
        if self.selected_list_id.as_deref() == Some(list_id) {
            self.selected_list_id = None;
        }
        log::info!("ListStore: Deleted list '{list_id}'.");
        self.persist();
        MutationOutcome::Applied
    }

    pub fn touch_last_viewed(&mut self, list_id: &str) -> MutationOutcome {
        let now = self.clock.now();
        self.replace_list(list_id, "touch_last_viewed", |list| {
            Some(RestockList {
                last_viewed_at: Some(now),
                ..list.clone()
            })
        })
    }

    /* Opens a list: marks it selected and stamps its last-viewed time. */
    pub fn select_list(&mut self, list_id: &str) -> MutationOutcome {
        let outcome = self.touch_last_viewed(list_id);
        if outcome.is_applied() {
            self.selected_list_id = Some(list_id.to_string());
        }
        outcome
    }

    pub fn clear_selection(&mut self) {
        self.selected_list_id = None;
    }

    /*
     * Appends a product with quantity 0, not completed and in stock. Returns
     * the new product id, or `None` if the name is blank or the list is unknown.
     */
    pub fn add_product(&mut self, list_id: &str, fields: ProductFields) -> Option<String> {
        if fields.has_blank_name() {
            log::debug!("ListStore: add_product rejected: {}", ValidationError::BlankProductName);
            return None;
        }
        let product = Product::new(new_id(), fields);
        let product_id = product.id.clone();
        let outcome = self.replace_list(list_id, "add_product", move |list| {
            let mut updated = list.clone();
            updated.products.push(product);
            Some(updated)
        });
        outcome.is_applied().then_some(product_id)
    }

    /* Adds a product to the currently selected list. */
    pub fn add_product_to_selected(&mut self, fields: ProductFields) -> Result<String, MutationOutcome> {
        let Some(list_id) = self.selected_list_id.clone() else {
            log::debug!("ListStore: add_product rejected: {}", ValidationError::NoListSelected);
            return Err(MutationOutcome::Rejected(ValidationError::NoListSelected));
        };
        if fields.has_blank_name() {
            return Err(MutationOutcome::Rejected(ValidationError::BlankProductName));
        }
        self.add_product(&list_id, fields)
            .ok_or(MutationOutcome::NotFound)
    }

    /*
     * Replaces name, image URL, comment and category. Quantity, completion
     * and stock status are left as they are.
     */
    pub fn edit_product(&mut self, list_id: &str, product_id: &str, fields: ProductFields) -> MutationOutcome {
        if fields.has_blank_name() {
            log::debug!("ListStore: edit_product rejected: {}", ValidationError::BlankProductName);
            return MutationOutcome::Rejected(ValidationError::BlankProductName);
        }
        let fields = fields.normalized();
        self.replace_product(list_id, product_id, "edit_product", move |p| Product {
            name: fields.name,
            image_url: fields.image_url,
            comment: fields.comment,
            category: fields.category,
            ..p.clone()
        })
    }

    pub fn delete_product(&mut self, list_id: &str, product_id: &str) -> MutationOutcome {
        self.replace_list(list_id, "delete_product", |list| {
            if list.find_product(product_id).is_none() {
                return None;
            }
            let mut updated = list.clone();
            updated.products.retain(|p| p.id != product_id);
            Some(updated)
        })
    }

    /* Sets the quantity, clamping negative values to zero. */
    pub fn set_quantity(&mut self, list_id: &str, product_id: &str, value: i64) -> MutationOutcome {
        let quantity = clamp_quantity(value);
        self.replace_product(list_id, product_id, "set_quantity", |p| Product {
            quantity,
            ..p.clone()
        })
    }

    /* Adds `delta` to the quantity; the result never drops below zero. */
    pub fn adjust_quantity(&mut self, list_id: &str, product_id: &str, delta: i64) -> MutationOutcome {
        self.replace_product(list_id, product_id, "adjust_quantity", |p| Product {
            quantity: clamp_quantity(i64::from(p.quantity).saturating_add(delta)),
            ..p.clone()
        })
    }

    /*
     * Flips completion. Becoming completed stamps `completed_at` with the
     * current time; becoming open clears it.
     */
    pub fn toggle_completion(&mut self, list_id: &str, product_id: &str) -> MutationOutcome {
        let now = self.clock.now();
        self.replace_product(list_id, product_id, "toggle_completion", |p| {
            let is_completed = !p.is_completed;
            Product {
                is_completed,
                completed_at: is_completed.then_some(now),
                ..p.clone()
            }
        })
    }

    pub fn toggle_out_of_stock(&mut self, list_id: &str, product_id: &str) -> MutationOutcome {
        self.replace_product(list_id, product_id, "toggle_out_of_stock", |p| Product {
            is_out_of_stock: !p.is_out_of_stock,
            ..p.clone()
        })
    }

    /* Zeroes the quantity of one product; flags are untouched. */
    pub fn reset_product(&mut self, list_id: &str, product_id: &str) -> MutationOutcome {
        self.replace_product(list_id, product_id, "reset_product", |p| Product {
            quantity: 0,
            ..p.clone()
        })
    }

    /*
     * Zeroes every quantity and reopens every product. Stock status survives
     * the reset.
     */
    pub fn reset_all_products(&mut self, list_id: &str) -> MutationOutcome {
        self.replace_list(list_id, "reset_all_products", |list| {
            let products = list
                .products
                .iter()
                .map(|p| Product {
                    quantity: 0,
                    is_completed: false,
                    completed_at: None,
                    ..p.clone()
                })
                .collect();
            Some(RestockList {
                products,
                ..list.clone()
            })
        })
    }

    /*
     * Adopts a list built by an importer and selects it. Returns the id of the
     * adopted list.
     */
    pub fn import_list(&mut self, list: RestockList) -> String {
        let id = list.id.clone();
        log::info!(
            "ListStore: Imported list '{}' ({id}) with {} products, source {:?}.",
            list.name,
            list.products.len(),
            list.source.as_ref().map(|s| s.as_str())
        );
        self.lists.push(list);
        self.selected_list_id = Some(id.clone());
        self.persist();
        id
    }
}
