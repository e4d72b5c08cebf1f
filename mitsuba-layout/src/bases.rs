//! 基底型チェーンの解決
//!
//! 継承グラフを先行順の深さ優先でたどり、派生型の先頭からの
//! 累積バイトオフセット付きで基底型を列挙します。

use mitsuba_inspect::{BaseTypeDescriptor, Inspector, RawField};

/// 継承グラフ上の基底型を列挙する
///
/// 各直接基底について累積オフセット付きの記述子を出力し、
/// 次の兄弟基底へ進む前にその基底自身の基底へ降ります。
///
/// 型名が複合型として解決できない場合（プリミティブ型や未知の型）は、
/// その型自身をオフセット0で1件返します。呼び出し側はこれにより
/// 「これ以上基底がない」ことを一様に扱えます。
pub fn get_base_types(
    inspector: &dyn Inspector,
    module: &str,
    type_name: &str,
) -> Vec<BaseTypeDescriptor> {
    let Some(ty) = inspector.find_type(module, type_name) else {
        return vec![BaseTypeDescriptor::new(module, type_name, 0)];
    };

    if !ty.is_composite() {
        let name = ty.name.as_deref().unwrap_or(type_name);
        return vec![BaseTypeDescriptor::new(module, name, 0)];
    }

    // 明示的スタックによる先行順DFS。各要素は(基底メンバ, ここまでの
    // 累積ビットオフセット)で、兄弟を逆順に積むことで宣言順を保つ。
    let mut result = Vec::new();
    let mut stack: Vec<(RawField, u64)> = ty
        .fields
        .iter()
        .filter(|f| f.is_base)
        .rev()
        .map(|f| (f.clone(), 0))
        .collect();

    while let Some((field, extra)) = stack.pop() {
        let cumulative_bits = extra + field.bit_pos.unwrap_or(0);
        let name = field.ty.name.clone().unwrap_or_default();
        result.push(BaseTypeDescriptor::new(module, &name, cumulative_bits / 8));

        for inner in field.ty.fields.iter().filter(|f| f.is_base).rev() {
            stack.push((inner.clone(), cumulative_bits));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitsuba_inspect::{MockInspector, RawType};

    #[test]
    fn test_primitive_type_returns_self() {
        let mock = MockInspector::new();
        mock.add_type("app", "int", RawType::base("int", 4));

        let bases = get_base_types(&mock, "app", "int");
        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].type_name, "int");
        assert_eq!(bases[0].byte_offset, 0);
    }

    #[test]
    fn test_unknown_type_returns_self() {
        let mock = MockInspector::new();
        let bases = get_base_types(&mock, "app", "Mystery");
        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].type_name, "Mystery");
        assert_eq!(bases[0].byte_offset, 0);
    }

    #[test]
    fn test_composite_without_bases_is_empty() {
        let mock = MockInspector::new();
        mock.add_type(
            "app",
            "Point",
            RawType::structure(
                "Point",
                8,
                vec![mitsuba_inspect::RawField::data("x", 0, RawType::base("int", 4))],
            ),
        );

        assert!(get_base_types(&mock, "app", "Point").is_empty());
    }

    #[test]
    fn test_multiple_inheritance_preorder() {
        use mitsuba_inspect::RawField;

        // struct D : A, C {};  struct C : B {};
        let b = RawType::structure("B", 4, vec![]);
        let a = RawType::structure("A", 8, vec![]);
        let c = RawType::structure("C", 12, vec![RawField::base_class(0, b)]);
        let d = RawType::structure(
            "D",
            24,
            vec![RawField::base_class(0, a), RawField::base_class(8, c)],
        );
        let mock = MockInspector::new();
        mock.add_type("app", "D", d);

        let bases = get_base_types(&mock, "app", "D");
        let names: Vec<&str> = bases.iter().map(|b| b.type_name.as_str()).collect();
        // 先行順: A、次にCとその基底B
        assert_eq!(names, vec!["A", "C", "B"]);
        assert_eq!(bases[0].byte_offset, 0);
        assert_eq!(bases[1].byte_offset, 8);
        // Bのオフセットは外側レベルからの累積になる
        assert_eq!(bases[2].byte_offset, 8);
    }
}
