use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, upload::UploadOptions, Result};

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_UPLOAD_LIMIT_MB: u64 = 3;
/// Graph rejects single requests above 60MiB; stay at or below it.
const MAX_UPLOAD_LIMIT_MB: u64 = 60;

/// Typed configuration for the uploader.
#[derive(Clone, Debug)]
pub struct Config {
    // Graph
    pub graph_access_token: String,
    pub graph_base_url: String,

    // Target task (To Do list + task the attachment is added to)
    pub tasklist_id: Option<String>,
    pub task_id: Option<String>,

    // Upload
    pub upload_limit_mb: u64,
    pub request_timeout: Duration,
    pub max_chunks: Option<usize>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let graph_access_token = env_str("GRAPH_ACCESS_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("GRAPH_ACCESS_TOKEN environment variable is required".to_string())
            })?;
        let graph_base_url = env_str("GRAPH_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string());

        let tasklist_id = env_str("TODO_TASKLIST_ID").and_then(non_empty);
        let task_id = env_str("TODO_TASK_ID").and_then(non_empty);

        let upload_limit_mb = match env_str("UPLOAD_LIMIT_MB") {
            Some(raw) => parse_upload_limit(&raw)?,
            None => DEFAULT_UPLOAD_LIMIT_MB,
        };
        let request_timeout =
            Duration::from_millis(env_u64("REQUEST_TIMEOUT_MS").unwrap_or(30_000));
        let max_chunks = env_usize("UPLOAD_MAX_CHUNKS").filter(|n| *n > 0);

        Ok(Self {
            graph_access_token,
            graph_base_url,
            tasklist_id,
            task_id,
            upload_limit_mb,
            request_timeout,
            max_chunks,
        })
    }

    /// Bytes per chunk request when the server leaves the size open.
    pub fn transfer_cap(&self) -> u64 {
        self.upload_limit_mb * 1024 * 1024
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            transfer_cap: self.transfer_cap(),
            request_timeout: Some(self.request_timeout),
            max_chunks: self.max_chunks,
        }
    }
}

fn parse_upload_limit(raw: &str) -> Result<u64> {
    let mb = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("UPLOAD_LIMIT_MB must be an integer, got {raw:?}")))?;
    if mb == 0 || mb > MAX_UPLOAD_LIMIT_MB {
        return Err(Error::Config(format!(
            "UPLOAD_LIMIT_MB must be between 1 and {MAX_UPLOAD_LIMIT_MB}, got {mb}"
        )));
    }
    Ok(mb)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
