/// Number of messages fetched per window load or extension.
pub const PAGE_SIZE: u64 = 50;

/// Messages kept before the target when centring a window on a message.
pub const JUMP_CONTEXT: u64 = PAGE_SIZE / 2;

/// Maximum gap in seconds for two consecutive messages to share a header.
pub const GROUP_GAP_SECS: i64 = 300;

/// Default cap on search results handed back to the navigator.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Minimum interval between two scroll-position writes for one conversation.
pub const POSITION_SAVE_MIN_INTERVAL_MS: u64 = 1_000;

/// Sentinel guild id marking a direct-message conversation.
pub const DM_GUILD_ID: &str = "0";

/// Directory name under an import's path where attachment files live.
pub const ATTACHMENTS_DIR: &str = "attachments";
