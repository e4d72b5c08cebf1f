//! Mitsuba ブリッジ・ディスパッチャ
//!
//! このクレートは、長命なワーカーサブプロセスが発行するテキスト形式の
//! リクエストストリームを、一度に1コマンドしか実行できないホストの
//! 直列実行コンテキストへ多重化します。逆方向には、ホストの実行状態
//! 変化を相関IDなしのイベント行としてワーカーへ送り出します。

pub mod request;
pub mod registry;
pub mod session;
pub mod launch;
pub mod bridge;

pub use request::{parse_request, recover_tag, Argument, Request, RequestError};
pub use registry::{ArgSpec, CommandContext, CommandRegistry};
pub use session::SessionState;
pub use launch::{resolve, spawn_worker, LaunchConfig, LaunchPlan};
pub use bridge::{Bridge, BridgeOwner, BridgeState, Dispatcher, Hook, NullOwner};

/// ブリッジの結果型
pub type Result<T> = anyhow::Result<T>;
