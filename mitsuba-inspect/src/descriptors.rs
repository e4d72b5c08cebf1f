//! クエリ層へ返すフラットな記述子型
//!
//! すべての記述子は問い合わせごとにライブなスナップショットから構築され、
//! 即座にシリアライズされる一時データです。コアはこれらをキャッシュしません。
//! Display実装がそのままワイヤ形式（`{a#b#…}`の位置タプル）になります。

use std::fmt;

/// 1データメンバのレイアウト記述子
///
/// byteOffsetに対してstorageSizeちょうどをサイズ境界に揃えて読めば、
/// [bitOffset, bitOffset+bitCount) のマスクでフィールド値を取り出せる
/// ことを保証します（ビットフィールドの正規化規則）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// 型先頭からのバイトオフセット（静的メンバは-1）
    pub byte_offset: i64,
    /// 記憶域のバイトサイズ
    pub storage_size: u64,
    /// 記憶域内のビットオフセット（ビットフィールドでなければ-1）
    pub bit_offset: i64,
    /// ビット幅（ビットフィールドでなければ0）
    pub bit_count: u64,
    /// メンバ名（無名なら空文字列）
    pub name: String,
    /// 正規化済み型名（関数ポインタは総称ポインタ型に置換）
    pub type_name: String,
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}#{}#{}#{}#{}#{}}}",
            self.byte_offset,
            self.storage_size,
            self.bit_offset,
            self.bit_count,
            self.name,
            self.type_name
        )
    }
}

/// 継承チェーン中の1基底型の記述子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTypeDescriptor {
    /// 基底型が属するモジュール名
    pub module: String,
    /// 基底型の型名
    pub type_name: String,
    /// 派生型の先頭からの累積バイトオフセット
    pub byte_offset: u64,
}

impl BaseTypeDescriptor {
    /// 新しい基底型記述子を作る
    pub fn new(module: &str, type_name: &str, byte_offset: u64) -> Self {
        Self {
            module: module.to_string(),
            type_name: type_name.to_string(),
            byte_offset,
        }
    }
}

impl fmt::Display for BaseTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}#{}#{}}}", self.module, self.type_name, self.byte_offset)
    }
}

/// 解決済みシンボルの記述子
///
/// addressは値の格納先アドレスであり、値そのものではありません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDescriptor {
    /// 正規化済み型名
    pub type_name: String,
    /// 値のアドレス
    pub address: u64,
}

impl fmt::Display for SymbolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}#{}}}", self.type_name, self.address)
    }
}

/// スタックフレーム内で可視なシンボル
///
/// moduleはフレームの命令ポインタから導出されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSymbol {
    /// シンボルが属するモジュール名
    pub module: String,
    /// シンボル名
    pub name: String,
    /// 解決結果
    pub symbol: SymbolDescriptor,
}

impl fmt::Display for NamedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}#{}#{}#{}}}",
            self.module, self.name, self.symbol.address, self.symbol.type_name
        )
    }
}

/// コールスタックの1エントリ（スナップショット）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    /// 命令ポインタ
    pub instruction_address: u64,
    /// スタックポインタ
    pub stack_address: u64,
    /// フレームポインタ
    pub frame_address: u64,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}#{}#{}}}",
            self.instruction_address, self.stack_address, self.frame_address
        )
    }
}

/// 1列挙子の記述子（スコープ修飾子は除去済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDescriptor {
    /// 列挙子名
    pub name: String,
    /// 整数値
    pub value: i64,
}

impl fmt::Display for ConstantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}#{}}}", self.name, self.value)
    }
}

/// ロード済みモジュールの記述子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// 正規化済みモジュール名
    pub name: String,
    /// ベースアドレス（デバッガが報告できない場合は0）
    pub base_address: u64,
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}#{}}}", self.name, self.base_address)
    }
}

/// アドレス逆引きの結果（モジュール・シンボル名・変位）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNameDescriptor {
    /// シンボルが属するモジュール名
    pub module: String,
    /// デマングル済みシンボル名
    pub name: String,
    /// シンボル先頭からのバイト変位
    pub displacement: u64,
}

impl fmt::Display for SymbolNameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}#{}#{}}}", self.module, self.name, self.displacement)
    }
}
