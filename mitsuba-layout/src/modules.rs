//! モジュール名の解決と正規化

use std::sync::OnceLock;

use mitsuba_inspect::{InspectError, Inspector, ModuleDescriptor};
use regex::Regex;

use crate::Result;

/// モジュールパスを正規名へ変換する純粋関数
///
/// パス部分を取り除いたうえで、record-replay系ツールのリネーム
/// ラッパー（`mmap_pack_123_`/`mmap_hardlink_123_`）、`lib`接頭辞、
/// `.so`接尾辞とそれに続く版数をすべて剥がします。
///
/// 例: `/foo/libFoo.so.1.2.3` → `Foo`
pub fn format_module(path: &str) -> String {
    let name = match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    };

    static MODULE_RE: OnceLock<Regex> = OnceLock::new();
    let re = MODULE_RE.get_or_init(|| {
        Regex::new(r"^(mmap_(pack|hardlink)_[0-9]+_)?(lib)?(.*?)(\.so)?[.0-9]*$")
            .expect("module name regex")
    });

    match re.captures(name) {
        Some(captures) => captures
            .get(4)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        None => name.to_string(),
    }
}

/// アドレスを含むモジュールの正規名を解決する
///
/// どの動的ロード済みイメージにも含まれない場合は
/// メイン実行ファイル自身とみなします。
pub fn module_for_address(inspector: &dyn Inspector, address: u64) -> String {
    let path = inspector
        .module_containing(address)
        .unwrap_or_else(|| inspector.executable_path());
    format_module(&path)
}

/// 正規名からモジュール記述子を解決する
///
/// ベースアドレスを報告できないデバッガでは0になります。
pub fn module_descriptor(inspector: &dyn Inspector, name: &str) -> Result<ModuleDescriptor> {
    let base_address = inspector
        .module_base(name)
        .ok_or_else(|| InspectError::ModuleNotFound(name.to_string()))?;
    Ok(ModuleDescriptor {
        name: name.to_string(),
        base_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_module_shared_library() {
        assert_eq!(format_module("/foo/libFoo.so.1.2.3"), "Foo");
        assert_eq!(format_module("/usr/lib/libc.so.6"), "c");
        assert_eq!(format_module("libBar.so"), "Bar");
    }

    #[test]
    fn test_format_module_plain_executable() {
        assert_eq!(format_module("/foo/chrome"), "chrome");
        assert_eq!(format_module("chrome"), "chrome");
    }

    #[test]
    fn test_format_module_record_replay_wrapper() {
        assert_eq!(format_module("/foo/mmap_hardlink_0_libFoo.so"), "Foo");
        assert_eq!(format_module("/foo/mmap_pack_42_chrome"), "chrome");
    }

    #[test]
    fn test_module_for_address_fallback() {
        use mitsuba_inspect::MockInspector;

        let mock = MockInspector::new();
        mock.set_executable("/opt/app/chrome");
        mock.add_module("/usr/lib/libBlink.so.2", "Blink", 0x7000_0000, 0x7000_0000, 0x7100_0000);

        assert_eq!(module_for_address(&mock, 0x7000_1234), "Blink");
        // どのイメージにも含まれないアドレスはメイン実行ファイル
        assert_eq!(module_for_address(&mock, 0x4000_0000), "chrome");
    }

    #[test]
    fn test_module_descriptor() {
        use mitsuba_inspect::MockInspector;

        let mock = MockInspector::new();
        mock.add_module("/usr/lib/libBlink.so", "Blink", 0, 0x7000_0000, 0x7100_0000);

        let descriptor = module_descriptor(&mock, "Blink").unwrap();
        assert_eq!(descriptor.name, "Blink");
        assert_eq!(descriptor.base_address, 0);

        assert!(module_descriptor(&mock, "Missing").is_err());
    }
}
