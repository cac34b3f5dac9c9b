use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{
    ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const APP_DIR: &str = "betrun";
const STORE_FILE: &str = "upstream_cache.json";
const STORE_VERSION: u32 = 2;
const MAX_ENTRIES: usize = 512;
const SNIPPET_CHARS: usize = 220;

static STORE: Mutex<Option<ResponseStore>> = Mutex::new(None);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Validators {
    etag: Option<String>,
    last_modified: Option<String>,
}

impl Validators {
    fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            etag: text(ETAG),
            last_modified: text(LAST_MODIFIED),
        }
    }

    fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }

    fn attach(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(etag) = &self.etag {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(since) = &self.last_modified {
            req = req.header(IF_MODIFIED_SINCE, since);
        }
        req
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredResponse {
    body: String,
    validators: Validators,
    stored_at: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResponseStore {
    version: u32,
    responses: HashMap<String, StoredResponse>,
}

impl ResponseStore {
    fn load(path: Option<&Path>) -> Self {
        let parsed = path
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|raw| serde_json::from_str::<ResponseStore>(&raw).ok());
        match parsed {
            Some(store) if store.version == STORE_VERSION => store,
            _ => Self {
                version: STORE_VERSION,
                responses: HashMap::new(),
            },
        }
    }

    fn insert(&mut self, url: &str, stored: StoredResponse) {
        self.responses.insert(url.to_string(), stored);
        let excess = self.responses.len().saturating_sub(MAX_ENTRIES);
        if excess > 0 {
            self.evict_oldest(excess);
        }
    }

    fn evict_oldest(&mut self, count: usize) {
        let mut ages: Vec<(i64, String)> = self
            .responses
            .iter()
            .map(|(url, r)| (r.stored_at, url.clone()))
            .collect();
        ages.sort();
        for (_, url) in ages.into_iter().take(count) {
            self.responses.remove(&url);
        }
    }

    fn persist(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string(self).context("serialize upstream cache")?;
        fs::write(&tmp, raw).context("write upstream cache")?;
        fs::rename(&tmp, path).context("replace upstream cache")?;
        Ok(())
    }
}

fn with_store<T>(f: impl FnOnce(&mut ResponseStore) -> T) -> T {
    let mut guard = STORE.lock().expect("upstream cache lock poisoned");
    let store = guard.get_or_insert_with(|| ResponseStore::load(store_path().as_deref()));
    f(store)
}

/// GETs `url`, revalidating any stored copy. Non-2xx answers are errors.
pub fn fetch_json_cached(
    client: &Client,
    url: &Url,
    extra_headers: &[(&str, &str)],
) -> Result<String> {
    let key = url.as_str();
    let stored = with_store(|s| s.responses.get(key).cloned());

    let mut req = client.get(url.clone());
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    if let Some(prev) = &stored {
        req = prev.validators.attach(req);
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let validators = Validators::from_headers(resp.headers());

    if status == StatusCode::NOT_MODIFIED {
        let prev = stored.ok_or_else(|| anyhow!("upstream sent 304 for an uncached url"))?;
        debug!(url = %key, "served from upstream cache");
        return Ok(prev.body);
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, snippet(&body)));
    }

    if !validators.is_empty() {
        let entry = StoredResponse {
            body: body.clone(),
            validators,
            stored_at: Utc::now().timestamp(),
        };
        with_store(|s| {
            s.insert(key, entry);
            if let Some(path) = store_path() {
                if let Err(err) = s.persist(&path) {
                    warn!(error = %format!("{err:#}"), "upstream cache not saved");
                }
            }
        });
    }
    Ok(body)
}

fn store_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(STORE_FILE))
}

/// Per-user cache directory: `$XDG_CACHE_HOME/betrun` or `~/.cache/betrun`.
pub fn app_cache_dir() -> Option<PathBuf> {
    let non_blank = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    if let Some(base) = non_blank("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    non_blank("HOME").map(|home| PathBuf::from(home).join(".cache").join(APP_DIR))
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(at: i64) -> StoredResponse {
        StoredResponse {
            body: "{}".to_string(),
            validators: Validators {
                etag: Some("\"v1\"".to_string()),
                last_modified: None,
            },
            stored_at: at,
        }
    }

    #[test]
    fn store_evicts_oldest_past_capacity() {
        let mut store = ResponseStore::default();
        for i in 0..MAX_ENTRIES as i64 {
            store.insert(&format!("https://api/{i}"), stored(100 + i));
        }
        store.insert("https://api/new", stored(10_000));
        assert_eq!(store.responses.len(), MAX_ENTRIES);
        assert!(!store.responses.contains_key("https://api/0"));
        assert!(store.responses.contains_key("https://api/new"));
    }

    #[test]
    fn validators_read_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, "\"abc\"".parse().unwrap());
        let v = Validators::from_headers(&headers);
        assert_eq!(v.etag.as_deref(), Some("\"abc\""));
        assert!(v.last_modified.is_none());
        assert!(!v.is_empty());
        assert!(Validators::from_headers(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn stale_version_is_discarded() {
        let dir = std::env::temp_dir().join(format!("betrun-cache-{}", std::process::id()));
        let path = dir.join(STORE_FILE);
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, r#"{"version": 1, "responses": {}}"#).unwrap();
        let store = ResponseStore::load(Some(&path));
        assert_eq!(store.version, STORE_VERSION);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn snippet_flattens_and_truncates() {
        let body = format!("line1\nline2\r{}", "x".repeat(400));
        let out = snippet(&body);
        assert!(out.starts_with("line1 line2 "));
        assert_eq!(out.chars().count(), SNIPPET_CHARS);
    }
}
