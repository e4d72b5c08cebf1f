//! ネイティブデバッガが報告する生の型表現
//!
//! レイアウト解決器への入力となるモデルです。デバッガごとのバックエンドは
//! 自身の型グラフをこの形に写し取って返します。オフセットはすべて
//! 型の先頭からのビット位置で表現されます（コンパイラの報告をそのまま保持）。

/// 型の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// プリミティブ型（int、charなど）
    Base,
    /// 構造体・クラス
    Struct,
    /// 共用体
    Union,
    /// 列挙型
    Enum,
    /// ポインタ型
    Pointer,
    /// 配列型
    Array,
    /// 関数型
    Function,
    /// typedefによる別名
    Typedef,
}

/// デバッガが報告する型
#[derive(Debug, Clone)]
pub struct RawType {
    /// 型名（ポインタ・配列など宣言子型では無名）
    pub name: Option<String>,
    /// 型の種別
    pub kind: TypeKind,
    /// 型全体のバイトサイズ
    pub byte_size: u64,
    /// 宣言順のメンバ（基底クラスも1メンバとして現れる）
    pub fields: Vec<RawField>,
    /// ポインタ・配列・typedefの指す先
    pub target: Option<Box<RawType>>,
}

/// デバッガが報告する1メンバ
#[derive(Debug, Clone)]
pub struct RawField {
    /// メンバ名（無名共用体などではNone）
    pub name: Option<String>,
    /// 型先頭からのビット位置（静的メンバなど記憶域を持たない場合はNone）
    pub bit_pos: Option<u64>,
    /// ビットフィールドの幅（ビットフィールドでなければ0）
    pub bit_size: u64,
    /// 基底クラスを表すメンバかどうか
    pub is_base: bool,
    /// コンパイラが注入した人工メンバ（vtableポインタなど）かどうか
    pub artificial: bool,
    /// 列挙子の値（列挙型のメンバのみ）
    pub enum_value: Option<i64>,
    /// メンバの型
    pub ty: RawType,
}

impl RawType {
    /// プリミティブ型を作る
    pub fn base(name: &str, byte_size: u64) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: TypeKind::Base,
            byte_size,
            fields: Vec::new(),
            target: None,
        }
    }

    /// 構造体型を作る
    pub fn structure(name: &str, byte_size: u64, fields: Vec<RawField>) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: TypeKind::Struct,
            byte_size,
            fields,
            target: None,
        }
    }

    /// 無名の構造体・共用体を作る
    pub fn anonymous(kind: TypeKind, byte_size: u64, fields: Vec<RawField>) -> Self {
        Self {
            name: None,
            kind,
            byte_size,
            fields,
            target: None,
        }
    }

    /// 共用体型を作る
    pub fn union(name: &str, byte_size: u64, fields: Vec<RawField>) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: TypeKind::Union,
            byte_size,
            fields,
            target: None,
        }
    }

    /// 列挙型を作る
    pub fn enumeration(name: &str, byte_size: u64, enumerators: Vec<(&str, i64)>) -> Self {
        let fields = enumerators
            .into_iter()
            .map(|(name, value)| RawField {
                name: Some(name.to_string()),
                bit_pos: None,
                bit_size: 0,
                is_base: false,
                artificial: false,
                enum_value: Some(value),
                ty: RawType::base("int", 4),
            })
            .collect();
        Self {
            name: Some(name.to_string()),
            kind: TypeKind::Enum,
            byte_size,
            fields,
            target: None,
        }
    }

    /// ポインタ型を作る
    pub fn pointer(target: RawType) -> Self {
        Self {
            name: None,
            kind: TypeKind::Pointer,
            byte_size: 8,
            fields: Vec::new(),
            target: Some(Box::new(target)),
        }
    }

    /// 配列型を作る
    pub fn array(element: RawType, length: u64) -> Self {
        let byte_size = element.byte_size * length;
        Self {
            name: None,
            kind: TypeKind::Array,
            byte_size,
            fields: Vec::new(),
            target: Some(Box::new(element)),
        }
    }

    /// 関数型を作る
    pub fn function() -> Self {
        Self {
            name: None,
            kind: TypeKind::Function,
            byte_size: 1,
            fields: Vec::new(),
            target: None,
        }
    }

    /// typedefを作る
    pub fn typedef(name: &str, target: RawType) -> Self {
        let byte_size = target.byte_size;
        Self {
            name: Some(name.to_string()),
            kind: TypeKind::Typedef,
            byte_size,
            fields: Vec::new(),
            target: Some(Box::new(target)),
        }
    }

    /// 複合型（メンバを列挙できる型）かどうか
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, TypeKind::Struct | TypeKind::Union | TypeKind::Enum)
    }
}

impl RawField {
    /// 通常のデータメンバを作る（ビット位置はバイトオフセット*8）
    pub fn data(name: &str, byte_offset: u64, ty: RawType) -> Self {
        Self {
            name: Some(name.to_string()),
            bit_pos: Some(byte_offset * 8),
            bit_size: 0,
            is_base: false,
            artificial: false,
            enum_value: None,
            ty,
        }
    }

    /// ビットフィールドメンバを作る
    pub fn bitfield(name: &str, bit_pos: u64, bit_size: u64, ty: RawType) -> Self {
        Self {
            name: Some(name.to_string()),
            bit_pos: Some(bit_pos),
            bit_size,
            is_base: false,
            artificial: false,
            enum_value: None,
            ty,
        }
    }

    /// 基底クラスメンバを作る
    pub fn base_class(byte_offset: u64, ty: RawType) -> Self {
        let name = ty.name.clone();
        Self {
            name,
            bit_pos: Some(byte_offset * 8),
            bit_size: 0,
            is_base: true,
            artificial: false,
            enum_value: None,
            ty,
        }
    }

    /// 無名の構造体・共用体メンバを作る
    pub fn anonymous(byte_offset: u64, ty: RawType) -> Self {
        Self {
            name: None,
            bit_pos: Some(byte_offset * 8),
            bit_size: 0,
            is_base: false,
            artificial: false,
            enum_value: None,
            ty,
        }
    }

    /// 静的メンバを作る（記憶域を持たない）
    pub fn static_member(name: &str, ty: RawType) -> Self {
        Self {
            name: Some(name.to_string()),
            bit_pos: None,
            bit_size: 0,
            is_base: false,
            artificial: false,
            enum_value: None,
            ty,
        }
    }

    /// 人工メンバ（vtableポインタなど）を作る
    pub fn artificial(name: &str, byte_offset: u64, ty: RawType) -> Self {
        Self {
            name: Some(name.to_string()),
            bit_pos: Some(byte_offset * 8),
            bit_size: 0,
            is_base: false,
            artificial: true,
            enum_value: None,
            ty,
        }
    }
}
