use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;

use qqb_core::{
    config::Config,
    domain::AttachmentDescriptor,
    upload::{AttachmentUploader, UploadError, UploadOutcome, UploadProgress},
};
use qqb_graph::GraphClient;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    qqb_core::logging::init("qqb")?;

    let mut args = std::env::args_os().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("usage: qqb <file> [content-type]");
    };
    let content_type = args
        .next()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let cfg = Config::load()?;
    let (Some(tasklist_id), Some(task_id)) = (cfg.tasklist_id.as_deref(), cfg.task_id.as_deref())
    else {
        bail!("TODO_TASKLIST_ID and TODO_TASK_ID environment variables are required");
    };

    let size = tokio::fs::metadata(&path)
        .await
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("attachment")
        .to_string();
    let descriptor = AttachmentDescriptor::new(name, content_type, size)?;

    let graph = GraphClient::new(
        cfg.graph_access_token.clone(),
        cfg.graph_base_url.clone(),
        cfg.request_timeout,
    )?;
    let uploader = AttachmentUploader::from_transport(
        Arc::new(graph.task_attachments(tasklist_id, task_id)),
        cfg.upload_options(),
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling upload after the current chunk");
            on_ctrl_c.cancel();
        }
    });

    let mut report = |p: UploadProgress| {
        tracing::info!(
            chunks = p.chunks_sent,
            acknowledged = p.bytes_acknowledged,
            total = p.total_size,
            "chunk accepted"
        );
    };

    match uploader
        .upload(&path, &descriptor, &cancel, &mut report)
        .await
    {
        UploadOutcome::Success { location } => {
            println!("{location}");
            Ok(ExitCode::SUCCESS)
        }
        UploadOutcome::Failure { error } => {
            eprintln!("{}", failure_line(&error));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn failure_line(error: &UploadError) -> String {
    format!("upload failed: {} {}", error.code(), error.message())
}
