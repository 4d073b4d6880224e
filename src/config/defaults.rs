//! Default configuration values

/// Workspace directory scanned for packages, relative to the project directory
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

/// Package descriptor looked up in every package directory
pub const DESCRIPTOR_FILE: &str = "package.json";

/// Project configuration file name
pub const CONFIG_FILE: &str = "monoforge.toml";

/// Global configuration file name inside the config directory
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Command run in a package directory to build it
pub const DEFAULT_BUILD_COMMAND: &str = "pnpm run build";

/// Command run in the entry package directory by `dev`
pub const DEFAULT_DEV_COMMAND: &str = "pnpm run dev";

/// Live-reload server host
pub const DEFAULT_RELOAD_HOST: &str = "127.0.0.1";

/// Live-reload server port
pub const DEFAULT_RELOAD_PORT: u16 = 4000;

/// Message sent to live-reload clients after a rebuild
pub const RELOAD_TOKEN: &str = "reload";

/// Window in which file change events are coalesced (in milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Time the dev process gets to exit after SIGTERM (in milliseconds)
pub const DEV_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Persisted build cache, relative to the project directory
pub const DEFAULT_CACHE_PATH: &str = ".monoforge/cache.json";

/// Persisted build cache format version
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Directories never hashed or watched
pub const IGNORED_DIRS: &[&str] = &["node_modules", "dist", ".git", ".next", ".nuxt", ".output"];

/// OS and editor artifacts never hashed or watched
pub const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", ".gitkeep"];

/// Extensions whose content is folded into a digest
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "js", "jsx", "tsx", "vue", "svelte", "css", "scss", "less", "json",
];

/// Files at or above this size only contribute their size to a digest
pub const MAX_CONTENT_HASH_BYTES: u64 = 1024 * 1024;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
