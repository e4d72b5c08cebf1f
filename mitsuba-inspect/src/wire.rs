//! 記述子のワイヤ形式エンコード・デコード
//!
//! ワイヤ形式は改行区切りのテキストで、各記述子は`#`区切りの位置タプルを
//! 波括弧で囲んだものです。列は`[{…}, {…}]`の形になります。
//! 真偽値と値なしは、ワーカー側の既存パーサに合わせて
//! `True`/`False`/`None`と綴ります。
//!
//! デコードは往復テストとハーネスのために提供します。コア自身は
//! 受信した記述子を解釈しません。

use std::fmt::Display;

use anyhow::{anyhow, Context};

use crate::descriptors::{
    BaseTypeDescriptor, ConstantDescriptor, FieldDescriptor, ModuleDescriptor, NamedSymbol,
    StackFrame, SymbolDescriptor, SymbolNameDescriptor,
};
use crate::Result;

/// 値なしを表すワイヤ表現
pub const NONE: &str = "None";

/// 真偽値をエンコードする
pub fn encode_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// 記述子の列をエンコードする
pub fn encode_list<T: Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// 整数の列をエンコードする
pub fn encode_int_list<T: Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// 波括弧を外して固定個の`#`区切りフィールドに分解する
///
/// 最後のフィールドには残りすべてが入るため、型名のように
/// 任意の文字を含み得る列は末尾に置く必要があります。
fn split_tuple(encoded: &str, count: usize) -> Result<Vec<&str>> {
    let inner = encoded
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| anyhow!("Not a tuple: {}", encoded))?;
    let parts: Vec<&str> = inner.splitn(count, '#').collect();
    if parts.len() != count {
        return Err(anyhow!(
            "Expected {} fields, found {} in {}",
            count,
            parts.len(),
            encoded
        ));
    }
    Ok(parts)
}

/// FieldDescriptorをデコードする
pub fn decode_field(encoded: &str) -> Result<FieldDescriptor> {
    let parts = split_tuple(encoded, 6)?;
    Ok(FieldDescriptor {
        byte_offset: parts[0].parse().context("byte offset")?,
        storage_size: parts[1].parse().context("storage size")?,
        bit_offset: parts[2].parse().context("bit offset")?,
        bit_count: parts[3].parse().context("bit count")?,
        name: parts[4].to_string(),
        type_name: parts[5].to_string(),
    })
}

/// BaseTypeDescriptorをデコードする
pub fn decode_base_type(encoded: &str) -> Result<BaseTypeDescriptor> {
    let parts = split_tuple(encoded, 3)?;
    Ok(BaseTypeDescriptor {
        module: parts[0].to_string(),
        type_name: parts[1].to_string(),
        byte_offset: parts[2].parse().context("byte offset")?,
    })
}

/// SymbolDescriptorをデコードする
pub fn decode_symbol(encoded: &str) -> Result<SymbolDescriptor> {
    let parts = split_tuple(encoded, 2)?;
    Ok(SymbolDescriptor {
        type_name: parts[0].to_string(),
        address: parts[1].parse().context("address")?,
    })
}

/// NamedSymbolをデコードする
pub fn decode_named_symbol(encoded: &str) -> Result<NamedSymbol> {
    let parts = split_tuple(encoded, 4)?;
    Ok(NamedSymbol {
        module: parts[0].to_string(),
        name: parts[1].to_string(),
        symbol: SymbolDescriptor {
            address: parts[2].parse().context("address")?,
            type_name: parts[3].to_string(),
        },
    })
}

/// StackFrameをデコードする
pub fn decode_stack_frame(encoded: &str) -> Result<StackFrame> {
    let parts = split_tuple(encoded, 3)?;
    Ok(StackFrame {
        instruction_address: parts[0].parse().context("instruction address")?,
        stack_address: parts[1].parse().context("stack address")?,
        frame_address: parts[2].parse().context("frame address")?,
    })
}

/// ConstantDescriptorをデコードする
pub fn decode_constant(encoded: &str) -> Result<ConstantDescriptor> {
    let parts = split_tuple(encoded, 2)?;
    Ok(ConstantDescriptor {
        name: parts[0].to_string(),
        value: parts[1].parse().context("constant value")?,
    })
}

/// ModuleDescriptorをデコードする
pub fn decode_module(encoded: &str) -> Result<ModuleDescriptor> {
    let parts = split_tuple(encoded, 2)?;
    Ok(ModuleDescriptor {
        name: parts[0].to_string(),
        base_address: parts[1].parse().context("base address")?,
    })
}

/// SymbolNameDescriptorをデコードする
pub fn decode_symbol_name(encoded: &str) -> Result<SymbolNameDescriptor> {
    let parts = split_tuple(encoded, 3)?;
    Ok(SymbolNameDescriptor {
        module: parts[0].to_string(),
        name: parts[1].to_string(),
        displacement: parts[2].parse().context("displacement")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_round_trip() {
        let field = FieldDescriptor {
            byte_offset: 8,
            storage_size: 4,
            bit_offset: 3,
            bit_count: 5,
            name: "flags".to_string(),
            type_name: "unsigned int".to_string(),
        };
        let encoded = field.to_string();
        assert_eq!(encoded, "{8#4#3#5#flags#unsigned int}");
        assert_eq!(decode_field(&encoded).unwrap(), field);
    }

    #[test]
    fn test_static_field_round_trip() {
        let field = FieldDescriptor {
            byte_offset: -1,
            storage_size: 8,
            bit_offset: -1,
            bit_count: 0,
            name: "instance_".to_string(),
            type_name: "Tree *".to_string(),
        };
        assert_eq!(decode_field(&field.to_string()).unwrap(), field);
    }

    #[test]
    fn test_anonymous_field_round_trip() {
        // 無名メンバは空文字列の名前を持つ
        let field = FieldDescriptor {
            byte_offset: 4,
            storage_size: 4,
            bit_offset: -1,
            bit_count: 0,
            name: String::new(),
            type_name: "int".to_string(),
        };
        assert_eq!(decode_field(&field.to_string()).unwrap(), field);
    }

    #[test]
    fn test_base_type_round_trip() {
        let base = BaseTypeDescriptor::new("chrome", "Node", 16);
        let encoded = base.to_string();
        assert_eq!(encoded, "{chrome#Node#16}");
        assert_eq!(decode_base_type(&encoded).unwrap(), base);
    }

    #[test]
    fn test_symbol_round_trip() {
        let symbol = SymbolDescriptor {
            type_name: "Document *".to_string(),
            address: 0x7fff_1234,
        };
        assert_eq!(decode_symbol(&symbol.to_string()).unwrap(), symbol);
    }

    #[test]
    fn test_named_symbol_round_trip() {
        let named = NamedSymbol {
            module: "blink".to_string(),
            name: "document".to_string(),
            symbol: SymbolDescriptor {
                type_name: "Document".to_string(),
                address: 140_737_488_355_328,
            },
        };
        assert_eq!(decode_named_symbol(&named.to_string()).unwrap(), named);
    }

    #[test]
    fn test_stack_frame_round_trip() {
        let frame = StackFrame {
            instruction_address: 0x4004f1,
            stack_address: 0x7ffd_0000,
            frame_address: 0x7ffd_0040,
        };
        assert_eq!(decode_stack_frame(&frame.to_string()).unwrap(), frame);
    }

    #[test]
    fn test_constant_round_trip() {
        let constant = ConstantDescriptor {
            name: "kVisible".to_string(),
            value: -3,
        };
        assert_eq!(decode_constant(&constant.to_string()).unwrap(), constant);
    }

    #[test]
    fn test_module_round_trip() {
        let module = ModuleDescriptor {
            name: "Foo".to_string(),
            base_address: 0,
        };
        assert_eq!(encode_list(&[module.clone()]), "[{Foo#0}]");
        assert_eq!(decode_module(&module.to_string()).unwrap(), module);
    }

    #[test]
    fn test_symbol_name_round_trip() {
        let resolved = SymbolNameDescriptor {
            module: "chrome".to_string(),
            name: "main".to_string(),
            displacement: 17,
        };
        assert_eq!(decode_symbol_name(&resolved.to_string()).unwrap(), resolved);
    }

    #[test]
    fn test_list_encoding() {
        let frames = [
            StackFrame {
                instruction_address: 1,
                stack_address: 2,
                frame_address: 3,
            },
            StackFrame {
                instruction_address: 4,
                stack_address: 5,
                frame_address: 6,
            },
        ];
        assert_eq!(encode_list(&frames), "[{1#2#3}, {4#5#6}]");
        assert_eq!(encode_list::<StackFrame>(&[]), "[]");
    }

    #[test]
    fn test_int_list_encoding() {
        assert_eq!(encode_int_list(&[4821u64, 4829]), "[4821, 4829]");
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(encode_bool(true), "True");
        assert_eq!(encode_bool(false), "False");
    }
}
