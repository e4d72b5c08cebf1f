//! 現実的な型グラフに対するレイアウト解決の結合テスト
//!
//! DOMツリー風の継承階層（ビットフィールド・無名共用体・多重継承入り)を
//! 1つ組み立て、フィールド列挙・基底型列挙・単一フィールド検索が
//! 同じグラフ上で辻褄の合う答えを返すことを確かめます。

use mitsuba_inspect::{MockInspector, RawField, RawType, TypeKind};
use mitsuba_layout::{get_all_fields, get_base_types, lookup_constants, lookup_field};

/// struct EventTarget { void* vtable(人工); };
/// struct Node : EventTarget {
///     Node* parent_;
///     unsigned int flags_ : 3;  // ビット位置64
///     unsigned int depth_ : 13; // ビット位置67
///     union { long as_int_; void* as_ptr_; }; // オフセット16
/// };
/// struct Element : Node { char* tag_; };
fn build_dom(mock: &MockInspector) {
    let event_target = RawType::structure(
        "EventTarget",
        8,
        vec![RawField::artificial(
            "_vptr$EventTarget",
            0,
            RawType::pointer(RawType::base("void", 1)),
        )],
    );
    let node = RawType::structure(
        "Node",
        24,
        vec![
            RawField::base_class(0, event_target.clone()),
            RawField::data("parent_", 8, RawType::pointer(RawType::base("Node", 24))),
            RawField::bitfield("flags_", 64, 3, RawType::base("unsigned int", 4)),
            RawField::bitfield("depth_", 67, 13, RawType::base("unsigned int", 4)),
            RawField::anonymous(
                16,
                RawType::anonymous(
                    TypeKind::Union,
                    8,
                    vec![
                        RawField::data("as_int_", 0, RawType::base("long", 8)),
                        RawField::data("as_ptr_", 0, RawType::pointer(RawType::base("void", 1))),
                    ],
                ),
            ),
        ],
    );
    let element = RawType::structure(
        "Element",
        32,
        vec![
            RawField::base_class(0, node.clone()),
            RawField::data("tag_", 24, RawType::pointer(RawType::base("char", 1))),
        ],
    );
    mock.add_type("blink", "EventTarget", event_target);
    mock.add_type("blink", "Node", node);
    mock.add_type("blink", "Element", element);
    mock.add_type(
        "blink",
        "NodeFlags",
        RawType::enumeration(
            "NodeFlags",
            4,
            vec![("kConnected", 1), ("kDirty", 2), ("kAttached", 1)],
        ),
    );
}

#[test]
fn test_own_fields_compose_with_base_offsets() {
    let mock = MockInspector::new();
    build_dom(&mock);

    // Element自身のフィールドだけ
    let own = get_all_fields(&mock, "blink", "Element", false).unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].name, "tag_");
    assert_eq!(own[0].byte_offset, 24);

    // 基底込みではNodeのメンバが基底内相対オフセットのまま続く
    let all = get_all_fields(&mock, "blink", "Element", true).unwrap();
    let names: Vec<&str> = all.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["tag_", "parent_", "flags_", "depth_", "as_int_", "as_ptr_"]
    );

    // Node内相対のオフセットを基底型の累積オフセットと突き合わせる
    let bases = get_base_types(&mock, "blink", "Element");
    let node_base = bases.iter().find(|b| b.type_name == "Node").unwrap();
    let parent = all.iter().find(|f| f.name == "parent_").unwrap();
    assert_eq!(node_base.byte_offset as i64 + parent.byte_offset, 8);
}

#[test]
fn test_base_chain_is_preorder_with_cumulative_offsets() {
    let mock = MockInspector::new();
    build_dom(&mock);

    let bases = get_base_types(&mock, "blink", "Element");
    let names: Vec<&str> = bases.iter().map(|b| b.type_name.as_str()).collect();
    assert_eq!(names, vec!["Node", "EventTarget"]);
    assert_eq!(bases[0].byte_offset, 0);
    assert_eq!(bases[1].byte_offset, 0);
}

#[test]
fn test_bitfields_and_promoted_union_members() {
    let mock = MockInspector::new();
    build_dom(&mock);

    let flags = lookup_field(&mock, "blink", "Node", "flags_").unwrap();
    assert_eq!(flags.byte_offset, 8);
    assert_eq!(flags.bit_offset, 0);
    assert_eq!(flags.bit_count, 3);

    let depth = lookup_field(&mock, "blink", "Node", "depth_").unwrap();
    assert_eq!(depth.byte_offset, 8);
    assert_eq!(depth.bit_offset, 3);
    assert_eq!(depth.bit_count, 13);

    // 無名共用体のメンバは外側の型から直接引ける
    let as_ptr = lookup_field(&mock, "blink", "Node", "as_ptr_").unwrap();
    assert_eq!(as_ptr.byte_offset, 16);
    assert_eq!(as_ptr.type_name, "void *");

    // 派生型からは基底を降りて同じフィールドへ届く
    let via_derived = lookup_field(&mock, "blink", "Element", "parent_").unwrap();
    assert_eq!(via_derived.byte_offset, 8);
    assert_eq!(via_derived.type_name, "Node *");
}

#[test]
fn test_enum_constants_share_values() {
    let mock = MockInspector::new();
    build_dom(&mock);

    // 値1を持つ列挙子は2つある
    let hits = lookup_constants(&mock, "blink", "NodeFlags", 1).unwrap();
    let names: Vec<&str> = hits.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["kConnected", "kAttached"]);
}
