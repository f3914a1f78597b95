use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 级别由 `RUST_LOG` 控制，默认 `info`；重复调用无副作用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S".to_string()))
        .try_init();
}
