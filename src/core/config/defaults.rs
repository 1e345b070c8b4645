pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 64;
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

pub const DEFAULT_CHUNK_WORDS: usize = 500;
pub const DEFAULT_SEARCH_K: usize = 5;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 4000;

pub const DEFAULT_JOB_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_DAYS_BACK: u32 = 7;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_GMAIL_MAX_RESULTS: u32 = 100;

pub fn default_flag_keywords() -> Vec<String> {
    [
        "urgent",
        "critical",
        "important",
        "action required",
        "deadline",
        "immediate attention",
        "high priority",
    ]
    .iter()
    .map(|keyword| keyword.to_string())
    .collect()
}
