//! イントロスペクション層のエラー型

use thiserror::Error;

/// イントロスペクション操作のエラー
///
/// ルックアップの失敗はすべてリクエスト単位で回復され、
/// ワイヤ上の失敗応答行に変換されます。致命的なものはありません。
#[derive(Debug, Error)]
pub enum InspectError {
    /// 型名を解決できなかった
    #[error("Type {module}!{name} not found")]
    TypeNotFound { module: String, name: String },

    /// シンボル名を解決できなかった
    #[error("Symbol {0} not found")]
    SymbolNotFound(String),

    /// ロード済みモジュールが見つからなかった
    #[error("Module {0} not found")]
    ModuleNotFound(String),

    /// 式の評価に失敗した
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// メモリ読み取りに失敗した（未マップ領域など）
    #[error("Unable to read {size} bytes at 0x{address:x}")]
    MemoryRead { address: u64, size: usize },

    /// メモリ書き込みに失敗した
    #[error("Unable to write {size} bytes at 0x{address:x}")]
    MemoryWrite { address: u64, size: usize },

    /// 指定されたプロセスが存在しない
    #[error("No such process {0}")]
    NoSuchProcess(u32),

    /// 指定されたスレッドが存在しない
    #[error("No such thread {0}")]
    NoSuchThread(u64),

    /// ターゲットの状態が要求を受け付けられない
    #[error("{0}")]
    Unavailable(String),
}
