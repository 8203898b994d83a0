use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    collect::members::{DEFAULT_PARTICIPANT_PAGE_SIZE, MAX_PARTICIPANT_PAGE_SIZE},
    errors::Error,
    paginate::DEFAULT_PAGE_SIZE,
    Result,
};

/// Typed runtime configuration, read from `PP_*` environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    // Gateway
    pub gateway_url: String,
    pub gateway_token: Option<String>,
    pub request_timeout: Duration,
    pub min_call_interval: Duration,

    // Operators
    pub allowed_operators: Vec<i64>,
    pub operator_id: i64,

    // Storage
    pub data_dir: PathBuf,

    // Paging
    pub results_page_size: usize,
    pub participant_page_size: u32,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build from an arbitrary key lookup; `load` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gateway_url = lookup("PP_GATEWAY_URL")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("PP_GATEWAY_URL environment variable is required".to_string())
            })?
            .trim_end_matches('/')
            .to_string();
        let gateway_token = lookup("PP_GATEWAY_TOKEN").and_then(non_empty);

        let allowed_operators = parse_csv_i64(lookup("PP_ALLOWED_OPERATORS"));
        if allowed_operators.is_empty() {
            return Err(Error::Config(
                "PP_ALLOWED_OPERATORS environment variable is required".to_string(),
            ));
        }
        let operator_id = match lookup("PP_OPERATOR_ID").and_then(non_empty) {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("PP_OPERATOR_ID is not a numeric id: {raw}"))
            })?,
            None => allowed_operators[0],
        };

        let data_dir = PathBuf::from(lookup("PP_DATA_DIR").unwrap_or("uploads".to_string()));

        let results_page_size = parse_num::<usize>(lookup("PP_RESULTS_PAGE_SIZE"))
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let participant_page_size = parse_num::<u32>(lookup("PP_PARTICIPANT_PAGE_SIZE"))
            .unwrap_or(DEFAULT_PARTICIPANT_PAGE_SIZE)
            .clamp(1, MAX_PARTICIPANT_PAGE_SIZE);

        let min_call_interval =
            Duration::from_millis(parse_num(lookup("PP_MIN_CALL_INTERVAL_MS")).unwrap_or(50));
        let request_timeout =
            Duration::from_millis(parse_num(lookup("PP_REQUEST_TIMEOUT_MS")).unwrap_or(30_000));

        let audit_log_path = PathBuf::from(
            lookup("PP_AUDIT_LOG_PATH").unwrap_or("/tmp/parser-pro-audit.log".to_string()),
        );
        let audit_log_json = lookup("PP_AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            gateway_url,
            gateway_token,
            request_timeout,
            min_call_interval,
            allowed_operators,
            operator_id,
            data_dir,
            results_page_size,
            participant_page_size,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
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

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
