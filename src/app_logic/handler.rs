use crate::app_logic::render_job::{self, RenderOutcome, SharePlan};
use crate::app_logic::ui_constants;
use crate::core::csv_import::{self, CsvImportError};
use crate::core::query;
use crate::core::share_codec::{self, DecodeError, ShareTier};
use crate::core::{
    ClockOperations, ConfigManagerOperations, ListSortKey, ListStore, Product, ProductSortKey,
    RestockList, ScanBridgeOperations, ScanSession, SortOrder, ViewPreferences,
    VisualCode, VisualCodeRendererOperations,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

/* How often `wait_for_render` checks that the render worker is still alive. */
const RENDER_WAIT_INTERVAL: Duration = Duration::from_millis(50);

/*
 * What the share dialog shows for one list. The token is available as soon as
 * the share is requested; the visual code arrives when rendering completes.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareState {
    pub list_id: String,
    pub token: String,
    pub tier: ShareTier,
    pub visual_code: Option<VisualCode>,
    pub notice: Option<String>,
    pub pending_request: Option<u64>,
}

impl ShareState {
    pub fn is_rendering(&self) -> bool {
        self.pending_request.is_some()
    }

    fn apply_plan(&mut self, plan: SharePlan) {
        self.notice = plan
            .visual_code
            .is_none()
            .then(|| ui_constants::MSG_VISUAL_CODE_UNAVAILABLE.to_string());
        self.token = plan.token;
        self.tier = plan.tier;
        self.visual_code = plan.visual_code;
        self.pending_request = None;
    }
}

/*
 * Manages the application state on behalf of a front end. It owns the
 * `ListStore`, orchestrates sharing (encode, render, fallback) and importing
 * (share codes, scanned codes, CSV), and converts every core error into a
 * user-facing message kept in `import_error`. View preferences are loaded
 * through `ConfigManagerOperations` and saved only on request.
 */
pub struct RestockApp {
    pub(crate) store: ListStore,
    pub(crate) renderer: Arc<dyn VisualCodeRendererOperations>,
    pub(crate) clock: Arc<dyn ClockOperations>,
    pub(crate) config_manager: Arc<dyn ConfigManagerOperations>,
    pub(crate) preferences: ViewPreferences,
    pub(crate) share_state: Option<ShareState>,
    pub(crate) import_error: Option<String>,
    next_render_request_id: u64,
    render_sender: Sender<RenderOutcome>,
    render_receiver: Receiver<RenderOutcome>,
    render_worker: Option<JoinHandle<()>>,
}

impl RestockApp {
    /*
     * Creates the application logic around an already hydrated store. Stored
     * view preferences are applied; if they cannot be read the defaults are
     * used and the problem is logged.
     */
    pub fn new(
        store: ListStore,
        renderer: Arc<dyn VisualCodeRendererOperations>,
        clock: Arc<dyn ClockOperations>,
        config_manager: Arc<dyn ConfigManagerOperations>,
    ) -> Self {
        let preferences = match config_manager.load_view_preferences(ui_constants::APP_NAME) {
            Ok(preferences) => preferences,
            Err(e) => {
                log::warn!("AppLogic: Failed to load view preferences, using defaults: {e}");
                ViewPreferences::default()
            }
        };
        let (render_sender, render_receiver) = mpsc::channel();
        RestockApp {
            store,
            renderer,
            clock,
            config_manager,
            preferences,
            share_state: None,
            import_error: None,
            next_render_request_id: 1,
            render_sender,
            render_receiver,
            render_worker: None,
        }
    }

    pub fn store(&self) -> &ListStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ListStore {
        &mut self.store
    }

    pub fn preferences(&self) -> ViewPreferences {
        self.preferences
    }

    pub fn import_error(&self) -> Option<&str> {
        self.import_error.as_deref()
    }

    pub fn clear_import_error(&mut self) {
        self.import_error = None;
    }

    pub fn share_state(&self) -> Option<&ShareState> {
        self.share_state.as_ref()
    }

    pub fn close_share(&mut self) {
        self.share_state = None;
    }

    // --- Views ---

    pub fn set_list_sort(&mut self, sort_by: ListSortKey, order: SortOrder) {
        self.preferences.list_sort_by = sort_by;
        self.preferences.list_sort_order = order;
    }

    pub fn set_product_sort(&mut self, sort_by: ProductSortKey, order: SortOrder) {
        self.preferences.product_sort_by = sort_by;
        self.preferences.product_sort_order = order;
    }

    /* Persists the current sort preferences. Returns a message on failure. */
    pub fn save_preferences(&self) -> Result<(), String> {
        self.config_manager
            .save_view_preferences(ui_constants::APP_NAME, &self.preferences)
            .map_err(|e| {
                log::error!("AppLogic: Failed to save view preferences: {e}");
                e.to_string()
            })
    }

    pub fn visible_lists(&self, search: &str) -> Vec<&RestockList> {
        query::filter_and_sort_lists(self.store.lists(), &self.preferences.list_query(search))
    }

    pub fn visible_products(
        &self,
        list_id: &str,
        search: &str,
        category: Option<String>,
    ) -> Option<Vec<&Product>> {
        let list = self.store.get_list(list_id)?;
        let product_query = self.preferences.product_query(search, category);
        Some(query::filter_and_sort_products(list, &product_query))
    }

    // --- Sharing ---

    fn share_list_snapshot(&self, list_id: &str) -> Result<RestockList, String> {
        match self.store.get_list(list_id) {
            Some(list) => Ok(list.clone()),
            None => {
                log::debug!("AppLogic: Share requested for unknown list '{list_id}'.");
                Err(ui_constants::MSG_LIST_NOT_FOUND.to_string())
            }
        }
    }

    /*
     * Builds the share state for a list synchronously: token, fallback and
     * visual code are all settled before returning.
     */
    pub fn share_list(&mut self, list_id: &str) -> Result<&ShareState, String> {
        let list = self.share_list_snapshot(list_id)?;
        let plan = render_job::plan_share(&list, self.renderer.as_ref()).map_err(|e| {
            log::error!("AppLogic: Failed to encode list '{list_id}': {e}");
            ui_constants::MSG_SHARE_FAILED.to_string()
        })?;
        let mut state = ShareState {
            list_id: list_id.to_string(),
            token: String::new(),
            tier: plan.tier,
            visual_code: None,
            notice: None,
            pending_request: None,
        };
        state.apply_plan(plan);
        let state = self.share_state.insert(state);
        Ok(&*state)
    }

    /*
     * Starts sharing a list with rendering on a worker thread. The primary
     * token is available immediately; the final token and visual code are
     * applied by `poll_render` or `wait_for_render`. Only the most recent
     * request is ever applied. Returns the request id.
     */
    pub fn request_share(&mut self, list_id: &str) -> Result<u64, String> {
        let list = self.share_list_snapshot(list_id)?;
        let token = share_codec::encode_share_code(&list, ShareTier::Primary).map_err(|e| {
            log::error!("AppLogic: Failed to encode list '{list_id}': {e}");
            ui_constants::MSG_SHARE_FAILED.to_string()
        })?;
        let request_id = self.next_render_request_id;
        self.next_render_request_id += 1;
        self.share_state = Some(ShareState {
            list_id: list_id.to_string(),
            token,
            tier: ShareTier::Primary,
            visual_code: None,
            notice: None,
            pending_request: Some(request_id),
        });
        self.render_worker = Some(render_job::spawn_render(
            request_id,
            list,
            Arc::clone(&self.renderer),
            self.render_sender.clone(),
        ));
        Ok(request_id)
    }

    /*
     * Applies a finished render if it belongs to the pending request. Returns
     * true when the share state changed.
     */
    pub(crate) fn apply_render_outcome(&mut self, outcome: RenderOutcome) -> bool {
        let Some(state) = self.share_state.as_mut() else {
            log::debug!(
                "AppLogic: Dropping render result {} with no open share.",
                outcome.request_id
            );
            return false;
        };
        if state.pending_request != Some(outcome.request_id) {
            log::debug!(
                "AppLogic: Dropping stale render result {} (pending {:?}).",
                outcome.request_id,
                state.pending_request
            );
            return false;
        }
        match outcome.result {
            Ok(plan) => state.apply_plan(plan),
            Err(e) => {
                log::error!("AppLogic: Render request {} failed: {e}", outcome.request_id);
                state.pending_request = None;
                state.notice = Some(ui_constants::MSG_VISUAL_CODE_UNAVAILABLE.to_string());
            }
        }
        true
    }

    /*
     * Settles the pending request when its worker has ended without reporting,
     * for example after a panic. The text token stays; only the visual code is
     * withheld. Returns true when the share state changed.
     */
    fn reap_dead_render_worker(&mut self) -> bool {
        let rendering = self.share_state.as_ref().is_some_and(ShareState::is_rendering);
        let worker_done = self
            .render_worker
            .as_ref()
            .is_none_or(JoinHandle::is_finished);
        if !rendering || !worker_done {
            return false;
        }
        while let Ok(outcome) = self.render_receiver.try_recv() {
            if self.apply_render_outcome(outcome) {
                return true;
            }
        }
        if let Some(worker) = self.render_worker.take() {
            if worker.join().is_err() {
                log::error!("AppLogic: Render worker panicked.");
            }
        }
        let Some(state) = self.share_state.as_mut() else {
            return false;
        };
        log::error!(
            "AppLogic: Render request {:?} ended without a result.",
            state.pending_request
        );
        state.pending_request = None;
        state.notice = Some(ui_constants::MSG_VISUAL_CODE_UNAVAILABLE.to_string());
        true
    }

    /* Drains finished renders without blocking. */
    pub fn poll_render(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.render_receiver.try_recv() {
                Ok(outcome) => changed |= self.apply_render_outcome(outcome),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::error!("AppLogic: Render channel disconnected.");
                    break;
                }
            }
        }
        changed | self.reap_dead_render_worker()
    }

    /*
     * Blocks until the pending render, if any, has been applied or its worker
     * has died.
     */
    pub fn wait_for_render(&mut self) -> Option<&ShareState> {
        while self
            .share_state
            .as_ref()
            .is_some_and(ShareState::is_rendering)
        {
            match self.render_receiver.recv_timeout(RENDER_WAIT_INTERVAL) {
                Ok(outcome) => {
                    self.apply_render_outcome(outcome);
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.reap_dead_render_worker();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("AppLogic: Render channel closed while waiting.");
                    break;
                }
            }
        }
        self.share_state.as_ref()
    }

    // --- Importing ---

    fn adopt_imported(&mut self, list: RestockList) -> String {
        self.import_error = None;
        self.store.import_list(list)
    }

    fn fail_import<T>(&mut self, message: &str) -> Result<T, String> {
        self.import_error = Some(message.to_string());
        Err(message.to_string())
    }

    /* Imports a pasted share code. Returns the new list id. */
    pub fn import_code(&mut self, code: &str) -> Result<String, String> {
        match share_codec::decode_share_code(code, self.clock.now()) {
            Ok(list) => Ok(self.adopt_imported(list)),
            Err(DecodeError::Empty) => self.fail_import(ui_constants::MSG_ENTER_SHARE_CODE),
            Err(e) => {
                log::warn!("AppLogic: Failed to decode share code: {e}");
                self.fail_import(ui_constants::MSG_INVALID_SHARE_CODE)
            }
        }
    }

    /* Imports a token delivered by the scan bridge. */
    pub fn handle_scanned_code(&mut self, token: &str) -> Result<String, String> {
        match share_codec::decode_share_code(token, self.clock.now()) {
            Ok(list) => Ok(self.adopt_imported(list)),
            Err(e) => {
                log::warn!("AppLogic: Failed to decode scanned code: {e}");
                self.fail_import(ui_constants::MSG_INVALID_QR_CODE)
            }
        }
    }

    /*
     * Runs one scan session and imports the token it yields. `Ok(None)` means
     * the user cancelled. The camera is released before this returns.
     */
    pub fn scan_and_import(
        &mut self,
        bridge: Arc<dyn ScanBridgeOperations>,
    ) -> Result<Option<String>, String> {
        self.import_error = None;
        let scanned = ScanSession::start(bridge).and_then(|mut session| session.next_token());
        match scanned {
            Ok(Some(token)) => self.handle_scanned_code(&token).map(Some),
            Ok(None) => {
                log::debug!("AppLogic: Scan cancelled.");
                Ok(None)
            }
            Err(e) => {
                log::warn!("AppLogic: Scan failed: {e}");
                self.fail_import(ui_constants::MSG_CAMERA_UNAVAILABLE)
            }
        }
    }

    /* Imports CSV text. Returns the new list id. */
    pub fn import_csv_content(&mut self, content: &str) -> Result<String, String> {
        match csv_import::parse_csv(content, self.clock.now()) {
            Ok(list) => Ok(self.adopt_imported(list)),
            Err(CsvImportError::EmptyContent) => self.fail_import(ui_constants::MSG_CSV_EMPTY),
            Err(e) => {
                log::warn!("AppLogic: Failed to parse CSV: {e}");
                self.fail_import(ui_constants::MSG_INVALID_CSV)
            }
        }
    }

    /* Reads and imports a CSV file. Returns the new list id. */
    pub fn import_csv_file(&mut self, path: &Path) -> Result<String, String> {
        let content = match csv_import::read_csv_file(path) {
            Ok(content) => content,
            Err(CsvImportError::Format(reason)) => {
                log::debug!("AppLogic: {reason}");
                return self.fail_import(ui_constants::MSG_SELECT_CSV_FILE);
            }
            Err(CsvImportError::ResourceAccess(e)) => {
                log::warn!("AppLogic: Failed to read CSV file {path:?}: {e}");
                return self.fail_import(ui_constants::MSG_ERROR_READING_FILE);
            }
            Err(CsvImportError::EmptyContent) => {
                return self.fail_import(ui_constants::MSG_UNABLE_TO_READ_CONTENT);
            }
        };
        self.import_csv_content(&content)
    }
}
