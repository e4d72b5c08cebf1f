//! 列挙型と定数の解決

use anyhow::anyhow;
use mitsuba_inspect::{ConstantDescriptor, InspectError, Inspector, TypeKind};

use crate::Result;

/// スコープ修飾子を取り除いて末尾の識別子だけを返す
///
/// デバッガは`EnumType::Value`の形で列挙子名を報告することがあるため、
/// 最後のスコープ区切り以降だけを報告します。
fn strip_scope(name: &str) -> &str {
    match name.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

/// 型が列挙型かどうか
///
/// 型名が解決できない場合はエラーではなくfalseを返します。
pub fn is_enum_type(inspector: &dyn Inspector, module: &str, type_name: &str) -> bool {
    match inspector.find_type(module, type_name) {
        Some(ty) => ty.kind == TypeKind::Enum,
        None => false,
    }
}

/// 整数値に一致する列挙子をすべて列挙する
pub fn lookup_constants(
    inspector: &dyn Inspector,
    module: &str,
    type_name: &str,
    value: i64,
) -> Result<Vec<ConstantDescriptor>> {
    let ty = inspector
        .find_type(module, type_name)
        .ok_or_else(|| InspectError::TypeNotFound {
            module: module.to_string(),
            name: type_name.to_string(),
        })?;

    if ty.kind != TypeKind::Enum {
        return Err(anyhow!("Type {}!{} is not an enum", module, type_name));
    }

    let constants = ty
        .fields
        .iter()
        .filter(|f| f.enum_value == Some(value))
        .filter_map(|f| {
            f.name.as_deref().map(|name| ConstantDescriptor {
                name: strip_scope(name).to_string(),
                value,
            })
        })
        .collect();

    Ok(constants)
}

/// 定数名から整数値を解決する
///
/// 型名がある場合はまず列挙子として探します。enum classの列挙子は
/// `Scope::Value`の形で格納されるため、末尾一致でも照合します。
/// 列挙子でなければスコープ付きの式として評価します。
/// 型名がない場合は自由なシンボルとして評価します。
pub fn lookup_constant(
    inspector: &dyn Inspector,
    module: &str,
    type_name: Option<&str>,
    constant_name: &str,
) -> Result<String> {
    match type_name {
        Some(type_name) => {
            let ty = inspector
                .find_type(module, type_name)
                .ok_or_else(|| InspectError::TypeNotFound {
                    module: module.to_string(),
                    name: type_name.to_string(),
                })?;

            let scoped = format!("::{}", constant_name);
            let matched = ty.fields.iter().find(|f| {
                f.name
                    .as_deref()
                    .is_some_and(|n| n == constant_name || n.ends_with(&scoped))
            });
            if let Some(value) = matched.and_then(|f| f.enum_value) {
                return Ok(value.to_string());
            }

            // 列挙型以外の定数は式として評価する
            let value = inspector.evaluate_integer(&format!("{}::{}", type_name, constant_name))?;
            Ok(value.to_string())
        }
        None => {
            let value = inspector.evaluate_integer(constant_name)?;
            Ok(value.to_string())
        }
    }
}
