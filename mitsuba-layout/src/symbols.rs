//! シンボルの解決
//!
//! グローバルシンボルのアドレス解決、アドレスからのシンボル逆引き、
//! コールスタックとフレーム内シンボルの列挙を行います。

use mitsuba_inspect::{
    InspectError, Inspector, NamedSymbol, StackFrame, SymbolDescriptor, SymbolNameDescriptor,
};

use crate::modules::module_for_address;
use crate::typename::format_type;
use crate::Result;

/// シンボル名をデマングルする
///
/// Rustのマングル名はデマングルし、それ以外はそのまま返します。
pub fn demangle(name: &str) -> String {
    if let Ok(demangled) = rustc_demangle::try_demangle(name) {
        return format!("{:#}", demangled);
    }
    name.to_string()
}

/// グローバルまたは静的シンボルを解決する
///
/// 返るアドレスは値の格納先であり、値そのものではありません。
pub fn lookup_global_symbol(
    inspector: &dyn Inspector,
    module: &str,
    symbol: &str,
) -> Result<SymbolDescriptor> {
    let raw = inspector
        .global_symbol(module, symbol)
        .ok_or_else(|| InspectError::SymbolNotFound(format!("{}!{}", module, symbol)))?;
    Ok(SymbolDescriptor {
        type_name: format_type(&raw.ty),
        address: raw.address,
    })
}

/// アドレスをモジュール名・シンボル名・変位へ逆引きする
pub fn lookup_symbol_name(
    inspector: &dyn Inspector,
    address: u64,
) -> Result<SymbolNameDescriptor> {
    let module = module_for_address(inspector, address);
    let resolved = inspector
        .symbol_at(address)
        .ok_or_else(|| InspectError::SymbolNotFound(format!("0x{:x}", address)))?;
    Ok(SymbolNameDescriptor {
        module,
        name: demangle(&resolved.symbol),
        displacement: resolved.displacement,
    })
}

/// コールスタックのスナップショットを取得する（最内フレームが先頭）
pub fn get_call_stack(inspector: &dyn Inspector, frame_count: usize) -> Vec<StackFrame> {
    inspector.call_stack(frame_count)
}

/// 指定フレームで可視なシンボルを列挙する
///
/// 各シンボルのモジュール名は、シンボル自身の検索経路ではなく
/// フレームの命令ポインタから導出します。フレームが見つからなければ
/// None、シンボル情報が欠けているフレームではSome(空列)になります。
pub fn symbols_in_stack_frame(
    inspector: &dyn Inspector,
    instruction: u64,
    stack: u64,
    frame: u64,
) -> Option<Vec<NamedSymbol>> {
    let locals = inspector.frame_locals(instruction, stack, frame)?;
    let module = module_for_address(inspector, instruction);
    Some(
        locals
            .into_iter()
            .map(|local| NamedSymbol {
                module: module.clone(),
                name: local.name,
                symbol: SymbolDescriptor {
                    type_name: format_type(&local.ty),
                    address: local.address,
                },
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitsuba_inspect::{MockInspector, RawFrameSymbol, RawType};

    #[test]
    fn test_lookup_global_symbol() {
        let mock = MockInspector::new();
        mock.add_global(
            "chrome",
            "g_instance",
            RawType::pointer(RawType::base("struct Browser", 64)),
            0x6020_0010,
        );

        let symbol = lookup_global_symbol(&mock, "chrome", "g_instance").unwrap();
        assert_eq!(symbol.type_name, "Browser *");
        assert_eq!(symbol.address, 0x6020_0010);

        assert!(lookup_global_symbol(&mock, "chrome", "g_missing").is_err());
    }

    #[test]
    fn test_lookup_symbol_name() {
        let mock = MockInspector::new();
        mock.set_executable("/opt/chrome");
        mock.add_symbol(0x400400, "twiddle");

        let resolved = lookup_symbol_name(&mock, 0x400411).unwrap();
        assert_eq!(resolved.module, "chrome");
        assert_eq!(resolved.name, "twiddle");
        assert_eq!(resolved.displacement, 0x11);

        assert!(lookup_symbol_name(&mock, 0x1000).is_err());
    }

    #[test]
    fn test_demangle_rust_symbol() {
        // Rustのマングル名はデマングルされる
        let mangled = "_ZN4core3fmt9Arguments6new_v117h1c0b7b8f0c3a5c8dE";
        assert!(demangle(mangled).contains("core::fmt"));
        // マングルされていない名前はそのまま
        assert_eq!(demangle("main"), "main");
    }

    #[test]
    fn test_symbols_in_stack_frame_derives_module_from_pc() {
        let mock = MockInspector::new();
        mock.add_module("/usr/lib/libBlink.so", "Blink", 0, 0x7000_0000, 0x7100_0000);
        mock.add_frame_locals(
            0x7000_1000,
            0x7ffd_2000,
            vec![RawFrameSymbol {
                name: "node".to_string(),
                ty: RawType::pointer(RawType::base("Node", 32)),
                address: 0x7ffd_2010,
            }],
        );

        let symbols = symbols_in_stack_frame(&mock, 0x7000_1000, 0x7ffd_2000, 0x7ffd_2040).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].module, "Blink");
        assert_eq!(symbols[0].name, "node");
        assert_eq!(symbols[0].symbol.type_name, "Node *");

        // 一致するフレームがなければNone
        assert!(symbols_in_stack_frame(&mock, 0x1, 0x2, 0x3).is_none());
    }
}
