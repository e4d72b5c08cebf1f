//! Mitsuba イントロスペクション境界
//!
//! このクレートは、ネイティブデバッガが公開する型・シンボル・メモリ・
//! コールスタック情報への抽象境界（Inspectorトレイト）と、
//! 外部のクエリ層へ返すフラットな記述子型およびそのワイヤ形式を提供します。

pub mod raw;
pub mod inspector;
pub mod descriptors;
pub mod wire;
pub mod error;
pub mod mock;

pub use raw::{RawField, RawType, TypeKind};
pub use inspector::{Inspector, RawFrameSymbol, RawSymbol, ResolvedSymbol};
pub use descriptors::{
    BaseTypeDescriptor, ConstantDescriptor, FieldDescriptor, ModuleDescriptor, NamedSymbol,
    StackFrame, SymbolDescriptor, SymbolNameDescriptor,
};
pub use error::InspectError;
pub use mock::MockInspector;

/// イントロスペクションの結果型
pub type Result<T> = anyhow::Result<T>;
