//! イントロスペクション能力のトレイト定義
//!
//! ネイティブデバッガごとのバックエンドはこのトレイトを実装します。
//! すべてのメソッドはホストのシリアル実行コンテキストから呼ばれるため、
//! 実装側で排他制御を行う必要はありません（Send + Syncは
//! ディスパッチャスレッドへ移動するための要件です）。

use crate::descriptors::StackFrame;
use crate::error::InspectError;
use crate::raw::RawType;

/// グローバル・静的シンボルの解決結果（生の形）
#[derive(Debug, Clone)]
pub struct RawSymbol {
    /// シンボルの型
    pub ty: RawType,
    /// 値のアドレス（値そのものではない）
    pub address: u64,
}

/// スタックフレーム内のローカルシンボル（生の形）
#[derive(Debug, Clone)]
pub struct RawFrameSymbol {
    /// シンボル名
    pub name: String,
    /// シンボルの型
    pub ty: RawType,
    /// 値のアドレス
    pub address: u64,
}

/// アドレスからの逆引き結果
#[derive(Debug, Clone)]
pub struct ResolvedSymbol {
    /// シンボル名（マングルされたままの可能性がある）
    pub symbol: String,
    /// シンボル先頭からのバイト変位
    pub displacement: u64,
}

/// イントロスペクション能力
///
/// デバッグ対象プロセスのメモリ・型グラフ・コールスタックを記述する、
/// ネイティブデバッガへの唯一の窓口です。
pub trait Inspector: Send + Sync {
    /// 型名を解決する
    fn find_type(&self, module: &str, name: &str) -> Option<RawType>;

    /// ポインタのバイトサイズ
    fn pointer_size(&self) -> u64;

    /// 式を評価して整数値を得る
    fn evaluate_integer(&self, expr: &str) -> Result<u64, InspectError>;

    /// グローバルまたは静的シンボルを解決する
    fn global_symbol(&self, module: &str, name: &str) -> Option<RawSymbol>;

    /// アドレス以前で最も近いシンボルを逆引きする
    fn symbol_at(&self, address: u64) -> Option<ResolvedSymbol>;

    /// アドレスを含む動的ロード済みイメージのパス
    fn module_containing(&self, address: u64) -> Option<String>;

    /// メイン実行ファイルのパス
    fn executable_path(&self) -> String;

    /// 正規化済みモジュール名に対応するベースアドレス
    ///
    /// モジュールがロードされていなければNone、ベースアドレスを
    /// 報告できないデバッガではSome(0)を返します。
    fn module_base(&self, canonical_name: &str) -> Option<u64>;

    /// メモリを読み取る
    fn read_memory(&self, address: u64, size: usize) -> Result<Vec<u8>, InspectError>;

    /// メモリへ書き込む
    fn write_memory(&self, address: u64, bytes: &[u8]) -> Result<(), InspectError>;

    /// コールスタックのスナップショットを取得する（最内フレームが先頭）
    fn call_stack(&self, limit: usize) -> Vec<StackFrame>;

    /// 指定フレームで可視なローカルシンボルを列挙する
    ///
    /// フレームが見つからなければNone、シンボル情報が欠けていれば
    /// Some(空列)を返します。
    fn frame_locals(
        &self,
        instruction: u64,
        stack: u64,
        frame: u64,
    ) -> Option<Vec<RawFrameSymbol>>;

    /// アタッチ中のプロセス一覧
    fn attached_processes(&self) -> Vec<u32>;

    /// 現在のプロセスのスレッド一覧
    fn process_threads(&self) -> Vec<u64>;

    /// 現在選択中のプロセスID
    fn current_process(&self) -> Result<u32, InspectError>;

    /// 現在選択中のスレッドID
    fn current_thread(&self) -> Result<u64, InspectError>;

    /// 対象プロセスを切り替える
    fn set_process(&self, pid: u32) -> Result<(), InspectError>;

    /// 対象スレッドを切り替える
    fn set_thread(&self, tid: u64) -> Result<(), InspectError>;

    /// デバッガ自身のコマンドインタープリタへ1コマンドを渡す
    fn execute_command(&self, command: &str) -> Result<(), InspectError>;
}
