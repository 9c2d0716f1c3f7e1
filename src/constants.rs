pub(crate) const DEFAULT_FEED_URL: &str = "wss://rtdb.scorestream.app/ws/leaderboard";
pub(crate) const DEFAULT_FEED_PATH: &str = "Leaderboard";
pub(crate) const DEFAULT_PORT: u16 = 8080;
pub(crate) const DEFAULT_STATIC_DIR: &str = "static";
pub(crate) const DEFAULT_ARCHIVE_BASE: &str = "./archives";

pub(crate) const DEFAULT_LOAD_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_RECONNECT_GRACE_MS: u64 = 20_000;
pub(crate) const DEFAULT_HEARTBEAT_MS: u64 = 15_000;
pub(crate) const DEFAULT_WS_PING_MS: u64 = 20_000;
pub(crate) const FEED_MAX_BACKOFF_MS: u64 = 30_000;
pub(crate) const FEED_BASE_BACKOFF_MS: u64 = 1_000;

pub(crate) const BROADCAST_BUFFER: usize = 64;

pub(crate) const TOP_TIER_RANK: usize = 10;

pub(crate) const LIVE_SOURCE_ID: &str = "current";
pub(crate) const LIVE_SOURCE_LABEL: &str = "Current";

pub(crate) const LOAD_TIMEOUT_MESSAGE: &str =
    "Connection timeout!\nPlease check your internet connection.";
pub(crate) const BACKEND_ERROR_MESSAGE: &str =
    "Database connection error.\nPlease try again later.";
