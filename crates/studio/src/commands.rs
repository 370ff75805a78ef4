//! Editing API requests and responses.
//!
//! Each request is one JSON object tagged by `command`:
//!
//! ```json
//! {"command": "reorder_slide", "slide_id": "demo", "index": 1}
//! ```
//!
//! Responses are `{"ok": true, "data": ...}` or
//! `{"ok": false, "error": {"code": ..., "message": ...}}`.

use deck_core::{Error, OutputFormat, Result};
use deck_project::DraftProposal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::{SessionUpdate, StudioState};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    GetContext,
    GetEvidence,
    GetMedia,
    GetSlides,
    ReplaceSlides {
        slides: Vec<DraftProposal>,
    },
    ReorderSlide {
        slide_id: String,
        index: usize,
    },
    GetSession,
    UpdateSession {
        #[serde(default)]
        session: SessionUpdate,
    },
    SaveSession,
    Validate,
    AutoFix {
        #[serde(default)]
        issues: Vec<String>,
    },
    FixAll {
        #[serde(default)]
        max_passes: Option<usize>,
    },
    AutoFixVisuals {
        #[serde(default)]
        slide_ids: Option<Vec<String>>,
    },
    Export {
        format: OutputFormat,
        #[serde(default)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

impl From<Error> for Response {
    fn from(e: Error) -> Self {
        Response::failure(e.code(), e.to_string())
    }
}

/// Parse one request line and run it.
pub fn handle_line(state: &StudioState, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(state, request),
        Err(e) => Response::failure("INVALID_INPUT", format!("Invalid request: {}", e)),
    }
}

/// Run a request against the studio state.
pub fn dispatch(state: &StudioState, request: Request) -> Response {
    log::debug!("Studio request: {:?}", request);
    match execute(state, request) {
        Ok(data) => Response::success(data),
        Err(e) => {
            log::warn!("Studio request failed: {}", e);
            Response::from(e)
        }
    }
}

fn execute(state: &StudioState, request: Request) -> Result<Value> {
    let value = match request {
        Request::GetContext => serde_json::to_value(state.context_view())?,
        Request::GetEvidence => json!({ "evidence": state.evidence() }),
        Request::GetMedia => json!({ "media_catalog": state.media() }),
        Request::GetSlides => json!({ "slides": state.slides() }),
        Request::ReplaceSlides { slides } => serde_json::to_value(state.replace_slides(&slides)?)?,
        Request::ReorderSlide { slide_id, index } => {
            serde_json::to_value(state.reorder_slide(&slide_id, index)?)?
        }
        Request::GetSession => json!({ "session": state.session(), "state": state.session_state() }),
        Request::UpdateSession { session } => serde_json::to_value(state.update_session(session)?)?,
        Request::SaveSession => serde_json::to_value(state.save_session()?)?,
        Request::Validate => json!({ "quality_report": state.validate() }),
        Request::AutoFix { issues } => serde_json::to_value(state.auto_fix(&issues)?)?,
        Request::FixAll { max_passes } => serde_json::to_value(state.fix_all(max_passes)?)?,
        Request::AutoFixVisuals { slide_ids } => {
            serde_json::to_value(state.auto_fix_visuals(slide_ids.as_deref())?)?
        }
        Request::Export { format, output } => {
            serde_json::to_value(state.export(format, output.as_deref())?)?
        }
    };
    Ok(value)
}
