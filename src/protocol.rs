use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    classifier::types::{ProviderDialect, SenderProfile},
    core_loop::PipelineView,
};

fn default_source() -> String {
    "unknown".to_string()
}

/// One NDJSON request line from a socket client.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ClientRequest {
    Ingest {
        text: String,
        #[serde(default = "default_source")]
        source: String,
    },
    CheckIn {
        percentage: u8,
    },
    Promote {
        id: Uuid,
    },
    ClearDeferred,
    Dismiss {
        id: Uuid,
    },
    State,
    SetProvider {
        provider: ProviderDialect,
    },
    SetProfile {
        profile: Option<SenderProfile>,
    },
    Reset,
    Exit,
}

/// One NDJSON response line back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerResponse {
    Ok,
    Promoted { promoted: bool },
    Cleared { cleared: usize },
    Dismissed { dismissed: bool },
    State { state: PipelineView },
    Error { message: String },
}

pub fn parse_client_request(line: &str) -> Result<ClientRequest, serde_json::Error> {
    serde_json::from_str(line)
}
