/*
 * Defines the user-facing strings the application logic hands to whatever
 * front end is presenting it, plus the application name used to resolve
 * per-user directories.
 */

// Name used for the platform config and data directories.
pub const APP_NAME: &str = "RestockKeeper";

// --- Share code import ---
pub const MSG_ENTER_SHARE_CODE: &str = "Please enter a share code";
pub const MSG_INVALID_SHARE_CODE: &str = "Invalid share code. Please check the code and try again.";

// --- Scanning ---
pub const MSG_INVALID_QR_CODE: &str = "Invalid QR code. Please try again.";
pub const MSG_CAMERA_UNAVAILABLE: &str = "Unable to access camera. Please check permissions.";

// --- CSV import ---
pub const MSG_SELECT_CSV_FILE: &str = "Please select a CSV file";
pub const MSG_ERROR_READING_FILE: &str = "Error reading file. Please try again.";
pub const MSG_UNABLE_TO_READ_CONTENT: &str = "Unable to read file content. Please try again.";
pub const MSG_CSV_EMPTY: &str = "CSV content is empty";
pub const MSG_INVALID_CSV: &str = "Invalid CSV format";

// --- Sharing ---
pub const MSG_VISUAL_CODE_UNAVAILABLE: &str = "QR code unavailable (List too large)";
pub const MSG_SHARE_FAILED: &str = "Unable to create a share code for this list.";
pub const MSG_LIST_NOT_FOUND: &str = "List not found";
