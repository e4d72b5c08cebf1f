//! フィールドレイアウトの解決
//!
//! デバッガが報告する入れ子の型表現を平坦なFieldDescriptor列へ変換します。
//! 無名共用体・構造体のメンバは、親コンテナのビット位置を合成したうえで
//! 外側の型へ昇格させます。継承チェーンは幅優先で平坦化します。

use std::collections::VecDeque;

use anyhow::anyhow;
use mitsuba_inspect::{FieldDescriptor, InspectError, Inspector, RawField, TypeKind};
use tracing::trace;

use crate::typename::format_type;
use crate::Result;

/// RawFieldからFieldDescriptorを作る
///
/// extra_bit_offsetは無名コンテナを展開する際に合成する親のビット位置です。
///
/// ビットフィールドは記憶域型のサイズ境界に揃え直します。下流のメモリ
/// アクセスはサイズ境界に揃った語の読み取りしか行わないため、コンパイラが
/// 自然に揃えて配置したかどうかには依存しません。幅情報を持たない通常
/// メンバの記憶域は8ビット（バイト粒度）を明示的な既定値とします。
pub(crate) fn field_descriptor(field: &RawField, extra_bit_offset: u64) -> FieldDescriptor {
    let (byte_offset, bit_offset) = match field.bit_pos {
        Some(pos) => {
            let bit_pos = pos + extra_bit_offset;
            let storage_bits = if field.bit_size > 0 && field.ty.byte_size > 0 {
                field.ty.byte_size * 8
            } else {
                8
            };
            let rem = bit_pos % storage_bits;
            let byte_offset = ((bit_pos - rem) / 8) as i64;
            // ビットフィールドでなければビットオフセットは報告しない
            let bit_offset = if field.bit_size > 0 { rem as i64 } else { -1 };
            (byte_offset, bit_offset)
        }
        // 静的メンバは記憶域を持たない
        None => (-1, -1),
    };

    FieldDescriptor {
        byte_offset,
        storage_size: field.ty.byte_size,
        bit_offset,
        bit_count: field.bit_size,
        name: field.name.clone().unwrap_or_default(),
        type_name: format_type(&field.ty),
    }
}

/// 無名の共用体・構造体メンバかどうか
fn is_anonymous_container(field: &RawField) -> bool {
    field.name.is_none()
        && matches!(field.ty.kind, TypeKind::Union | TypeKind::Struct)
}

/// 型の全フィールドを宣言順に列挙する
///
/// - 記憶域を持たない静的メンバは飛ばす
/// - コンパイラが注入した人工メンバ（vtableポインタなど）は飛ばす
/// - 基底クラスはinclude_base_typesのときだけメンバを幅優先で平坦化する
///   （オフセットは基底型内の相対値のまま。派生型内での位置は
///   get_base_typesの累積オフセットと組み合わせて求める）
/// - 無名の共用体・構造体はビット位置を合成しながらメンバを昇格させる
pub fn get_all_fields(
    inspector: &dyn Inspector,
    module: &str,
    type_name: &str,
    include_base_types: bool,
) -> Result<Vec<FieldDescriptor>> {
    let ty = inspector
        .find_type(module, type_name)
        .ok_or_else(|| InspectError::TypeNotFound {
            module: module.to_string(),
            name: type_name.to_string(),
        })?;

    let mut queue: VecDeque<(RawField, u64)> =
        ty.fields.into_iter().map(|field| (field, 0)).collect();
    let mut result = Vec::new();

    while let Some((field, extra)) = queue.pop_front() {
        if field.is_base {
            if !include_base_types {
                continue;
            }
            // 基底クラスのメンバは作業キューの末尾に足す（幅優先の平坦化）
            for inner in &field.ty.fields {
                queue.push_back((inner.clone(), extra));
            }
            continue;
        }

        if field.bit_pos.is_none() {
            continue;
        }

        if field.artificial {
            continue;
        }

        if field.name.is_none() {
            if matches!(field.ty.kind, TypeKind::Union | TypeKind::Struct) {
                // 無名コンテナ: メンバを宣言位置のまま昇格させる。
                // 入れ子の無名コンテナはキュー経由で再度ここを通る。
                let container_pos = field.bit_pos.unwrap_or(0);
                for inner in field.ty.fields.iter().filter(|f| !f.is_base).rev() {
                    queue.push_front((inner.clone(), extra + container_pos));
                }
            } else {
                trace!("Skipping unnamed non-composite member in {}", type_name);
            }
            continue;
        }

        result.push(field_descriptor(&field, extra));
    }

    Ok(result)
}

/// 型から1フィールドを名前で検索する
///
/// 浅い方から順に探します: (1)自身の宣言フィールド、(2)自身の無名
/// 共用体・構造体メンバ、(3)全基底クラスのフィールド集合に置き換えて
/// (1)から繰り返し。最浅の一致が勝つため、派生型のフィールドは
/// 同名の基底型フィールドを隠蔽します。
pub fn lookup_field(
    inspector: &dyn Inspector,
    module: &str,
    type_name: &str,
    field_name: &str,
) -> Result<FieldDescriptor> {
    let ty = inspector
        .find_type(module, type_name)
        .ok_or_else(|| InspectError::TypeNotFound {
            module: module.to_string(),
            name: type_name.to_string(),
        })?;

    let mut fields = ty.fields;
    while !fields.is_empty() {
        if let Some(field) = fields
            .iter()
            .find(|f| f.name.as_deref() == Some(field_name))
        {
            return Ok(field_descriptor(field, 0));
        }

        // 無名共用体・構造体を1段降りる。コンテナ自身のビット位置を
        // 合成しながらメンバを探す。
        for container in fields.iter().filter(|f| is_anonymous_container(f)) {
            let container_pos = container.bit_pos.unwrap_or(0);
            if let Some(inner) = container
                .ty
                .fields
                .iter()
                .find(|f| f.name.as_deref() == Some(field_name))
            {
                return Ok(field_descriptor(inner, container_pos));
            }
        }

        // 一致がなければ基底クラスのフィールド集合へ置き換える
        // （宣言順に連結するため、兄弟基底の間では先に現れた方が勝つ）
        fields = fields
            .iter()
            .filter(|f| f.is_base)
            .flat_map(|base| base.ty.fields.clone())
            .collect();
    }

    Err(anyhow!(
        "No field {} in type {}!{}",
        field_name,
        module,
        type_name
    ))
}
