//! Mitsuba 型レイアウト・シンボル解決
//!
//! このクレートは、デバッガ内部の型・フィールド・継承表現を
//! 外部メモリキャッシュが扱えるフラットなオフセット/サイズ記述子へ変換する
//! レイアウト解決器と、アドレスからモジュール名・シンボル名への
//! 解決器を提供します。すべてInspectorトレイト越しの純粋な問い合わせで、
//! 状態は持ちません。

pub mod typename;
pub mod fields;
pub mod bases;
pub mod constants;
pub mod modules;
pub mod symbols;
pub mod memory;

pub use fields::{get_all_fields, lookup_field};
pub use bases::get_base_types;
pub use constants::{is_enum_type, lookup_constant, lookup_constants};
pub use typename::{format_type, lookup_type_size};
pub use modules::{format_module, module_descriptor, module_for_address};
pub use symbols::{
    demangle, get_call_stack, lookup_global_symbol, lookup_symbol_name, symbols_in_stack_frame,
};
pub use memory::{read_memory_hex, write_memory_hex};

/// レイアウト解決の結果型
pub type Result<T> = anyhow::Result<T>;
