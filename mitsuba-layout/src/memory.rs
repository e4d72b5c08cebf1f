//! メモリ読み書きの16進エンコード
//!
//! ワイヤ上ではメモリ内容を16進文字列で運びます。

use anyhow::Context;
use mitsuba_inspect::Inspector;

use crate::Result;

/// メモリを読み取って16進文字列にする
pub fn read_memory_hex(inspector: &dyn Inspector, address: u64, size: usize) -> Result<String> {
    let bytes = inspector.read_memory(address, size)?;
    Ok(hex::encode(bytes))
}

/// 16進文字列をデコードしてメモリへ書き込む
pub fn write_memory_hex(inspector: &dyn Inspector, address: u64, hex_string: &str) -> Result<()> {
    let bytes = hex::decode(hex_string).context("Invalid hex string")?;
    inspector.write_memory(address, &bytes)?;
    Ok(())
}
