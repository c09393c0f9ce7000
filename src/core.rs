/*
 * This module consolidates the core, platform-agnostic logic of the application.
 * It re-exports the data model, the list store with its persistence port, the
 * query helpers that derive sorted and filtered views, the share-code codec,
 * the CSV importer and the contracts for the external collaborators (visual-code
 * renderer, scan bridge, clock and configuration storage).
 */
pub mod clock;
pub mod config;
pub mod csv_import;
pub mod list_store;
pub mod models;
pub mod path_utils;
pub mod persistence;
pub mod query;
pub mod scan_session;
pub mod share_codec;
pub mod visual_code;

// Re-export the data model
pub use models::{ListSource, Product, ProductFields, RestockList};

// Re-export store and persistence related items
pub use list_store::{ListStore, MutationOutcome, ValidationError, parse_quantity_input};
pub use persistence::{FileBlobStore, ListPersistenceOperations, PersistenceError};

// Re-export query related items
pub use query::{
    DisplayDate, ListProgress, ListQuery, ListSortKey, ProductQuery, ProductSortKey, SortOrder,
};

// Re-export codec and importer items
pub use csv_import::CsvImportError;
pub use share_codec::{DecodeError, EncodeError, ShareTier};

// Re-export collaborator contracts
pub use clock::{ClockOperations, SystemClock};
pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, ViewPreferences};
pub use scan_session::{ScanBridgeOperations, ScanError, ScanSession};
pub use visual_code::{
    CapacityMode, QrCodeRenderer, RenderError, VisualCode, VisualCodeRendererOperations,
};
