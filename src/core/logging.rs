use tracing::Level;

/// Install a formatting subscriber at the given level.
///
/// Returns false when a global subscriber was already set.
pub fn init_tracing(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init()
        .is_ok()
}
