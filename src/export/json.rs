//! Export assembled conversations as a JSON document.

use std::path::Path;

use serde::Serialize;

use crate::model::record::MessageRecord;
use crate::thread::Conversation;

/// Chain label written for every chain. Chains are anchored on a root
/// message, so each one reads as a new mail followed by its replies.
const CHAIN_TYPE: &str = "new-mail";

#[derive(Serialize)]
struct ThreadDoc<'a> {
    thread: &'a str,
    chains: Vec<ChainDoc<'a>>,
}

#[derive(Serialize)]
struct ChainDoc<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    messages: &'a [&'a MessageRecord],
}

/// Render conversations as pretty-printed JSON.
pub fn to_json(conversations: &[Conversation<'_>]) -> serde_json::Result<String> {
    let docs: Vec<ThreadDoc<'_>> = conversations
        .iter()
        .map(|conv| ThreadDoc {
            thread: &conv.thread_key,
            chains: conv
                .chains
                .iter()
                .map(|chain| ChainDoc {
                    kind: CHAIN_TYPE,
                    messages: chain.as_slice(),
                })
                .collect(),
        })
        .collect();
    serde_json::to_string_pretty(&docs)
}

/// Write conversations to `output_path` as JSON.
pub fn export_json(conversations: &[Conversation<'_>], output_path: &Path) -> anyhow::Result<()> {
    let json = to_json(conversations)?;
    std::fs::write(output_path, json)?;
    tracing::info!(
        path = %output_path.display(),
        threads = conversations.len(),
        "Exported threads as JSON"
    );
    Ok(())
}
