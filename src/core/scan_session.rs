/*
 * Scan bridge contract and the session guard around it. A bridge wraps a
 * camera-backed code reader; a `ScanSession` owns one started bridge, hands
 * out at most one decoded token and stops the bridge exactly once when it is
 * dropped, whichever way the caller leaves.
 */
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    CameraUnavailable(String),
    PermissionDenied,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::CameraUnavailable(reason) => write!(f, "Camera unavailable: {reason}"),
            ScanError::PermissionDenied => write!(f, "Camera permission denied"),
        }
    }
}

impl std::error::Error for ScanError {}

pub type Result<T> = std::result::Result<T, ScanError>;

pub trait ScanBridgeOperations: Send + Sync {
    fn start(&self) -> Result<()>;
    /* Blocks until a code is read. `Ok(None)` means the user cancelled. */
    fn next_token(&self) -> Result<Option<String>>;
    fn stop(&self);
}

pub struct ScanSession {
    bridge: Arc<dyn ScanBridgeOperations>,
    token_delivered: bool,
}

impl ScanSession {
    /*
     * Starts the bridge. If starting fails the bridge is not considered
     * running and no stop is issued.
     */
    pub fn start(bridge: Arc<dyn ScanBridgeOperations>) -> Result<Self> {
        bridge.start()?;
        log::debug!("ScanSession: Started.");
        Ok(ScanSession {
            bridge,
            token_delivered: false,
        })
    }

    /*
     * Waits for the one token this session may deliver. Later calls return
     * `Ok(None)` without touching the bridge.
     */
    pub fn next_token(&mut self) -> Result<Option<String>> {
        if self.token_delivered {
            return Ok(None);
        }
        let token = self.bridge.next_token()?;
        if token.is_some() {
            self.token_delivered = true;
        }
        Ok(token)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        log::debug!("ScanSession: Stopping.");
        self.bridge.stop();
    }
}

/* Scripted bridge for tests: yields queued results and counts calls. */
#[cfg(test)]
pub struct MockScanBridge {
    start_result: std::sync::Mutex<Result<()>>,
    tokens: std::sync::Mutex<std::collections::VecDeque<Result<Option<String>>>>,
    start_calls: std::sync::Mutex<usize>,
    stop_calls: std::sync::Mutex<usize>,
}

#[cfg(test)]
impl MockScanBridge {
    pub fn new() -> Self {
        MockScanBridge {
            start_result: std::sync::Mutex::new(Ok(())),
            tokens: std::sync::Mutex::new(std::collections::VecDeque::new()),
            start_calls: std::sync::Mutex::new(0),
            stop_calls: std::sync::Mutex::new(0),
        }
    }

    pub fn set_start_result(&self, result: Result<()>) {
        *self.start_result.lock().unwrap() = result;
    }

    pub fn push_result(&self, result: Result<Option<String>>) {
        self.tokens.lock().unwrap().push_back(result);
    }

    pub fn push_token(&self, token: &str) {
        self.push_result(Ok(Some(token.to_string())));
    }

    pub fn start_calls(&self) -> usize {
        *self.start_calls.lock().unwrap()
    }

    pub fn stop_calls(&self) -> usize {
        *self.stop_calls.lock().unwrap()
    }
}

#[cfg(test)]
impl ScanBridgeOperations for MockScanBridge {
    fn start(&self) -> Result<()> {
        *self.start_calls.lock().unwrap() += 1;
        self.start_result.lock().unwrap().clone()
    }

    fn next_token(&self) -> Result<Option<String>> {
        self.tokens.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    fn stop(&self) {
        *self.stop_calls.lock().unwrap() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_delivers_one_token_and_stops_once() {
        let bridge = Arc::new(MockScanBridge::new());
        bridge.push_token("first");
        bridge.push_token("second");

        {
            let mut session = ScanSession::start(bridge.clone()).unwrap();
            assert_eq!(session.next_token().unwrap().as_deref(), Some("first"));
            assert_eq!(session.next_token().unwrap(), None);
        }

        assert_eq!(bridge.start_calls(), 1);
        assert_eq!(bridge.stop_calls(), 1);
    }

    #[test]
    fn test_session_stops_on_cancel() {
        let bridge = Arc::new(MockScanBridge::new());
        let mut session = ScanSession::start(bridge.clone()).unwrap();
        assert_eq!(session.next_token().unwrap(), None);
        drop(session);
        assert_eq!(bridge.stop_calls(), 1);
    }

    #[test]
    fn test_session_stops_on_scan_error() {
        let bridge = Arc::new(MockScanBridge::new());
        bridge.push_result(Err(ScanError::CameraUnavailable("lost".to_string())));

        let outcome = (|| -> Result<Option<String>> {
            let mut session = ScanSession::start(bridge.clone())?;
            session.next_token()
        })();

        assert!(outcome.is_err());
        assert_eq!(bridge.stop_calls(), 1);
    }

    #[test]
    fn test_failed_start_never_stops() {
        let bridge = Arc::new(MockScanBridge::new());
        bridge.set_start_result(Err(ScanError::PermissionDenied));

        let result = ScanSession::start(bridge.clone());

        assert!(matches!(result, Err(ScanError::PermissionDenied)));
        assert_eq!(bridge.stop_calls(), 0);
    }
}
