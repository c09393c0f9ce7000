/*
 * Builds the shareable form of a list: the text token plus, when it fits, a
 * visual code. The primary token is tried first; if the renderer reports that
 * it exceeds capacity, the minimal token is built and rendered instead. The
 * minimal token is only adopted once its visual code exists; when neither
 * renders, the primary token is returned without a visual code.
 *
 * `spawn_render` runs the same planning on a worker thread and delivers a
 * `RenderOutcome` tagged with the caller's request id over an mpsc channel.
 */
use crate::core::share_codec::{self, EncodeError, ShareTier};
use crate::core::{CapacityMode, RenderError, RestockList, VisualCode, VisualCodeRendererOperations};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

/* Capacity setting used for every share render. */
pub const SHARE_CAPACITY_MODE: CapacityMode = CapacityMode::Dense;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePlan {
    pub tier: ShareTier,
    pub token: String,
    pub visual_code: Option<VisualCode>,
}

#[derive(Debug)]
pub struct RenderOutcome {
    pub request_id: u64,
    pub result: Result<SharePlan, EncodeError>,
}

pub fn plan_share(
    list: &RestockList,
    renderer: &dyn VisualCodeRendererOperations,
) -> Result<SharePlan, EncodeError> {
    let primary = share_codec::encode_share_code(list, ShareTier::Primary)?;
    match renderer.render(&primary, SHARE_CAPACITY_MODE) {
        Ok(code) => {
            return Ok(SharePlan {
                tier: ShareTier::Primary,
                token: primary,
                visual_code: Some(code),
            });
        }
        Err(RenderError::CapacityExceeded { .. }) => {
            log::warn!(
                "RenderJob: Primary share code for list '{}' too large, trying minimal format.",
                list.id
            );
        }
        Err(e) => {
            log::error!("RenderJob: Visual code failed for list '{}': {e}", list.id);
            return Ok(SharePlan {
                tier: ShareTier::Primary,
                token: primary,
                visual_code: None,
            });
        }
    }

    let minimal = share_codec::encode_share_code(list, ShareTier::Minimal)?;
    match renderer.render(&minimal, SHARE_CAPACITY_MODE) {
        Ok(code) => Ok(SharePlan {
            tier: ShareTier::Minimal,
            token: minimal,
            visual_code: Some(code),
        }),
        Err(e) => {
            log::error!("RenderJob: Visual code failed even with minimal data, keeping primary token: {e}");
            Ok(SharePlan {
                tier: ShareTier::Primary,
                token: primary,
                visual_code: None,
            })
        }
    }
}

/*
 * Plans the share for `list` on a background thread. A closed receiver is not
 * an error; the result is simply discarded.
 */
pub fn spawn_render(
    request_id: u64,
    list: RestockList,
    renderer: Arc<dyn VisualCodeRendererOperations>,
    sender: Sender<RenderOutcome>,
) -> thread::JoinHandle<()> {
    log::debug!("RenderJob: Spawning render request {request_id} for list '{}'.", list.id);
    thread::spawn(move || {
        let result = plan_share(&list, renderer.as_ref());
        if sender.send(RenderOutcome { request_id, result }).is_err() {
            log::debug!("RenderJob: Receiver gone, dropping result of request {request_id}.");
        }
    })
}
