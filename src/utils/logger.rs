//! ロギングユーティリティモジュール
//!
//! `log`ファサードの出力先として`wasm-logger`を使い、ブラウザのコンソールへ出力します。

use std::sync::Once;

static INIT: Once = Once::new();

/// ビルド設定に応じたデフォルトのログレベル
///
/// `debug`フィーチャーが有効ならDebug、そうでなければInfoです。
pub fn default_level() -> log::Level {
    if cfg!(feature = "debug") {
        log::Level::Debug
    } else {
        log::Level::Info
    }
}

/// ロギング初期化
///
/// 何度呼んでも最初の1回だけ有効です。
pub fn init_logging(level: log::Level) {
    INIT.call_once(|| {
        wasm_logger::init(wasm_logger::Config::new(level).module_prefix(env!("CARGO_PKG_NAME")));
        log::info!("ロガーが初期化されました (最小レベル: {:?})", level);
    });
}
