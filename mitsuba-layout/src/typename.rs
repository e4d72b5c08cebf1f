//! 型名の正規化
//!
//! typedefの展開、`class`/`struct`等のキーワード除去、
//! 関数ポインタの総称ポインタ型への置換を行います。

use std::sync::OnceLock;

use anyhow::anyhow;
use mitsuba_inspect::{InspectError, Inspector, RawType, TypeKind};
use regex::Regex;

use crate::Result;

/// typedefの連鎖をたどって実体の型を得る
pub fn strip_typedefs(ty: &RawType) -> &RawType {
    let mut current = ty;
    while current.kind == TypeKind::Typedef {
        match &current.target {
            Some(target) => current = target,
            None => break,
        }
    }
    current
}

/// ポインタ・配列の連鎖の先が関数型かどうか
pub fn is_function_pointer(ty: &RawType) -> bool {
    let mut current = strip_typedefs(ty);
    while matches!(current.kind, TypeKind::Pointer | TypeKind::Array) {
        match &current.target {
            Some(target) => current = strip_typedefs(target),
            None => return false,
        }
    }
    current.kind == TypeKind::Function
}

/// 型の表示名を組み立てる
fn display_name(ty: &RawType) -> String {
    let ty = strip_typedefs(ty);
    match ty.kind {
        TypeKind::Pointer => match &ty.target {
            Some(target) => format!("{} *", display_name(target)),
            None => "void *".to_string(),
        },
        TypeKind::Array => match &ty.target {
            Some(element) => format!("{} []", display_name(element)),
            None => "void []".to_string(),
        },
        _ => ty
            .name
            .clone()
            .unwrap_or_else(|| "<anonymous>".to_string()),
    }
}

/// 型名を正規化する
///
/// 関数ポインタは照会層へ安全に返す手段がないため、
/// ネストの深さによらず総称ポインタ型として報告します。
pub fn format_type(ty: &RawType) -> String {
    let stripped = strip_typedefs(ty);
    if is_function_pointer(stripped) {
        return "void *".to_string();
    }
    static KEYWORD_RE: OnceLock<Regex> = OnceLock::new();
    let re = KEYWORD_RE
        .get_or_init(|| Regex::new(r"(class|struct|enum|union) ").expect("keyword regex"));
    re.replace_all(&display_name(stripped), "").into_owned()
}

/// 型のバイトサイズを解決する
///
/// 末尾が`*`ならポインタサイズを返します（型本体の解決は不要）。
pub fn lookup_type_size(inspector: &dyn Inspector, module: &str, type_name: &str) -> Result<u64> {
    let type_name = type_name.trim();
    if type_name.ends_with('*') {
        return Ok(inspector.pointer_size());
    }
    let ty = inspector
        .find_type(module, type_name)
        .ok_or_else(|| InspectError::TypeNotFound {
            module: module.to_string(),
            name: type_name.to_string(),
        })?;
    let size = strip_typedefs(&ty).byte_size;
    if size == 0 {
        return Err(anyhow!("Type {} has unknown size", type_name));
    }
    Ok(size)
}
