
use common::config;
use once_cell::sync::Lazy;
pub use slog::*;
use std::sync::Mutex;

/// ワーカースレッドの終了待ち用。shutdown で取り出して drop する
static GUARD: Mutex<Option<slog_async::AsyncGuard>> = Mutex::new(None);

fn wrap<D>(drain: D) -> IgnoreResult<slog_async::Async>
where
    D: Drain<Err = Never, Ok = ()> + Send + 'static,
{
    let (drain, guard) = slog_async::Async::new(slog_envlogger::new(drain))
        .chan_size(2 << 16)
        .thread_name("slog-async".into())
        .build_with_guard();
    if let Ok(mut slot) = GUARD.lock() {
        *slot = Some(guard);
    }
    // shutdown 後に届いたレコードは捨てる
    drain.ignore_res()
}

pub static DEFAULT: Lazy<Logger> = Lazy::new(|| {
    let mk_term = || {
        slog_term::FullFormat::new(slog_term::TermDecorator::new().build())
            .build()
            .fuse()
    };

    let mk_json = || slog_json::Json::default(std::io::stdout()).fuse();

    let format = config::get("RUST_LOG_FORMAT").unwrap_or_default();
    let drain = match format.as_str() {
        "json" => wrap(mk_json()),
        _ => wrap(mk_term()),
    };

    Logger::root(
        drain,
        o!(
            "version" => env!("CARGO_PKG_VERSION"),
            "commit" => option_env!("GIT_COMMIT_HASH").unwrap_or("unknown"),
        ),
    )
});

/// 溜まっているレコードを書き出してからワーカースレッドを止める。
/// プロセス終了直前に呼ぶ。二度目以降は何もしない
pub fn shutdown() {
    let guard = GUARD.lock().ok().and_then(|mut slot| slot.take());
    drop(guard);
}
