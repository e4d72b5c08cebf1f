//! コマンドレジストリ
//!
//! リクエスト行のコマンド名を固定の語彙表で引き、引数の形を検証して
//! からハンドラへ渡します。任意の式を評価する経路は存在しないため、
//! ワーカーが送れるのはここに列挙された操作だけです。

use std::collections::HashMap;

use anyhow::Context;
use mitsuba_inspect::{wire, Inspector};

use crate::bridge::BridgeOwner;
use crate::request::{Argument, Request, RequestError};

/// 引数1個の期待形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSpec {
    /// 文字列
    Str,
    /// 文字列またはNone
    OptStr,
    /// 整数
    Int,
    /// True/False
    Bool,
}

impl ArgSpec {
    fn matches(self, arg: &Argument) -> bool {
        match self {
            ArgSpec::Str => matches!(arg, Argument::Str(_)),
            ArgSpec::OptStr => matches!(arg, Argument::Str(_) | Argument::None),
            ArgSpec::Int => matches!(arg, Argument::Int(_)),
            ArgSpec::Bool => matches!(arg, Argument::Bool(_)),
        }
    }
}

/// ハンドラから見えるホスト側の依存
pub struct CommandContext<'a> {
    pub inspector: &'a dyn Inspector,
    pub owner: &'a dyn BridgeOwner,
}

type Handler = fn(&CommandContext<'_>, &Args<'_>) -> anyhow::Result<String>;

struct CommandSpec {
    args: &'static [ArgSpec],
    handler: Handler,
}

/// 検証済み引数列
///
/// レジストリの形検査を通った後にだけ構築されるので、アクセサの
/// 型不一致エラーは実際には起きません。
pub struct Args<'a>(&'a [Argument]);

impl Args<'_> {
    fn str(&self, index: usize) -> anyhow::Result<&str> {
        match self.0.get(index) {
            Some(Argument::Str(s)) => Ok(s),
            _ => Err(anyhow::anyhow!("argument {} is not a string", index)),
        }
    }

    fn opt_str(&self, index: usize) -> anyhow::Result<Option<&str>> {
        match self.0.get(index) {
            Some(Argument::Str(s)) => Ok(Some(s)),
            Some(Argument::None) => Ok(None),
            _ => Err(anyhow::anyhow!("argument {} is not a string or None", index)),
        }
    }

    fn int(&self, index: usize) -> anyhow::Result<i128> {
        match self.0.get(index) {
            Some(Argument::Int(value)) => Ok(*value),
            _ => Err(anyhow::anyhow!("argument {} is not an integer", index)),
        }
    }

    fn u64(&self, index: usize) -> anyhow::Result<u64> {
        u64::try_from(self.int(index)?).context("argument out of range")
    }

    fn i64(&self, index: usize) -> anyhow::Result<i64> {
        i64::try_from(self.int(index)?).context("argument out of range")
    }

    fn usize(&self, index: usize) -> anyhow::Result<usize> {
        usize::try_from(self.int(index)?).context("argument out of range")
    }

    fn u32(&self, index: usize) -> anyhow::Result<u32> {
        u32::try_from(self.int(index)?).context("argument out of range")
    }

    fn bool(&self, index: usize) -> anyhow::Result<bool> {
        match self.0.get(index) {
            Some(Argument::Bool(value)) => Ok(*value),
            _ => Err(anyhow::anyhow!("argument {} is not a boolean", index)),
        }
    }
}

/// コマンド名からハンドラへの固定マップ
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    /// 全コマンドを備えた標準レジストリを作る
    pub fn standard() -> Self {
        use ArgSpec::{Bool, Int, OptStr, Str};

        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };
        registry.register("GetAllFields", &[Str, Str, Bool], handlers::get_all_fields);
        registry.register("GetBaseTypes", &[Str, Str], handlers::get_base_types);
        registry.register("IsTypeEnum", &[Str, Str], handlers::is_type_enum);
        registry.register("LookupField", &[Str, Str, Str], handlers::lookup_field);
        registry.register("LookupConstants", &[Str, Str, Int], handlers::lookup_constants);
        registry.register("LookupConstant", &[Str, OptStr, Str], handlers::lookup_constant);
        registry.register(
            "LookupGlobalSymbol",
            &[Str, Str],
            handlers::lookup_global_symbol,
        );
        registry.register("GetModuleForName", &[Str], handlers::get_module_for_name);
        registry.register("GetCallStack", &[Int], handlers::get_call_stack);
        registry.register(
            "GetSymbolsInStackFrame",
            &[Int, Int, Int],
            handlers::get_symbols_in_stack_frame,
        );
        registry.register("LookupTypeSize", &[Str, Str], handlers::lookup_type_size);
        registry.register("ReadMemoryBytes", &[Int, Int], handlers::read_memory_bytes);
        registry.register(
            "WriteMemoryBytes",
            &[Int, Str],
            handlers::write_memory_bytes,
        );
        registry.register("GetAttachedProcesses", &[], handlers::get_attached_processes);
        registry.register(
            "GetCurrentProcessThreads",
            &[],
            handlers::get_current_process_threads,
        );
        registry.register("GetTargetProcess", &[], handlers::get_target_process);
        registry.register("GetTargetThread", &[], handlers::get_target_thread);
        registry.register("SetTargetProcess", &[Int], handlers::set_target_process);
        registry.register("SetTargetThread", &[Int], handlers::set_target_thread);
        registry.register("LookupSymbolName", &[Int], handlers::lookup_symbol_name);
        registry.register("ExecuteCommand", &[Str], handlers::execute_command);
        registry.register("ServerStarted", &[Str], handlers::server_started);
        registry
    }

    fn register(&mut self, name: &'static str, args: &'static [ArgSpec], handler: Handler) {
        self.commands.insert(name, CommandSpec { args, handler });
    }

    /// リクエストを検証して実行する
    ///
    /// 成功時は応答の値部分の文字列を返します。
    pub fn dispatch(
        &self,
        context: &CommandContext<'_>,
        request: &Request,
    ) -> anyhow::Result<String> {
        let spec = self
            .commands
            .get(request.command.as_str())
            .ok_or_else(|| RequestError::UnknownCommand(request.command.clone()))?;

        if request.args.len() != spec.args.len() {
            return Err(RequestError::InvalidArguments {
                command: request.command.clone(),
                reason: format!(
                    "expected {} arguments, got {}",
                    spec.args.len(),
                    request.args.len()
                ),
            }
            .into());
        }
        for (index, (expected, actual)) in spec.args.iter().zip(&request.args).enumerate() {
            if !expected.matches(actual) {
                return Err(RequestError::InvalidArguments {
                    command: request.command.clone(),
                    reason: format!("argument {} has the wrong type", index),
                }
                .into());
            }
        }

        (spec.handler)(context, &Args(&request.args))
    }
}

mod handlers {
    use super::*;
    use mitsuba_layout as layout;

    pub(super) fn get_all_fields(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let fields = layout::get_all_fields(
            ctx.inspector,
            args.str(0)?,
            args.str(1)?,
            args.bool(2)?,
        )?;
        Ok(wire::encode_list(&fields))
    }

    pub(super) fn get_base_types(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let bases = layout::get_base_types(ctx.inspector, args.str(0)?, args.str(1)?);
        Ok(wire::encode_list(&bases))
    }

    pub(super) fn is_type_enum(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let is_enum = layout::is_enum_type(ctx.inspector, args.str(0)?, args.str(1)?);
        Ok(wire::encode_bool(is_enum).to_string())
    }

    pub(super) fn lookup_field(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let field =
            layout::lookup_field(ctx.inspector, args.str(0)?, args.str(1)?, args.str(2)?)?;
        Ok(field.to_string())
    }

    pub(super) fn lookup_constants(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let constants =
            layout::lookup_constants(ctx.inspector, args.str(0)?, args.str(1)?, args.i64(2)?)?;
        Ok(wire::encode_list(&constants))
    }

    pub(super) fn lookup_constant(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        layout::lookup_constant(ctx.inspector, args.str(0)?, args.opt_str(1)?, args.str(2)?)
    }

    pub(super) fn lookup_global_symbol(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let symbol = layout::lookup_global_symbol(ctx.inspector, args.str(0)?, args.str(1)?)?;
        Ok(symbol.to_string())
    }

    pub(super) fn get_module_for_name(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let descriptor = layout::module_descriptor(ctx.inspector, args.str(0)?)?;
        Ok(descriptor.to_string())
    }

    pub(super) fn get_call_stack(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let frames = layout::get_call_stack(ctx.inspector, args.usize(0)?);
        Ok(wire::encode_list(&frames))
    }

    pub(super) fn get_symbols_in_stack_frame(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let symbols = layout::symbols_in_stack_frame(
            ctx.inspector,
            args.u64(0)?,
            args.u64(1)?,
            args.u64(2)?,
        );
        match symbols {
            Some(symbols) => Ok(wire::encode_list(&symbols)),
            None => Ok(wire::NONE.to_string()),
        }
    }

    pub(super) fn lookup_type_size(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let size = layout::lookup_type_size(ctx.inspector, args.str(0)?, args.str(1)?)?;
        Ok(size.to_string())
    }

    pub(super) fn read_memory_bytes(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        layout::read_memory_hex(ctx.inspector, args.u64(0)?, args.usize(1)?)
    }

    pub(super) fn write_memory_bytes(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        layout::write_memory_hex(ctx.inspector, args.u64(0)?, args.str(1)?)?;
        Ok(wire::NONE.to_string())
    }

    pub(super) fn get_attached_processes(
        ctx: &CommandContext<'_>,
        _args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let pids = ctx.inspector.attached_processes();
        Ok(wire::encode_int_list(&pids))
    }

    pub(super) fn get_current_process_threads(
        ctx: &CommandContext<'_>,
        _args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let tids = ctx.inspector.process_threads();
        Ok(wire::encode_int_list(&tids))
    }

    pub(super) fn get_target_process(
        ctx: &CommandContext<'_>,
        _args: &Args<'_>,
    ) -> anyhow::Result<String> {
        Ok(ctx.inspector.current_process()?.to_string())
    }

    pub(super) fn get_target_thread(
        ctx: &CommandContext<'_>,
        _args: &Args<'_>,
    ) -> anyhow::Result<String> {
        Ok(ctx.inspector.current_thread()?.to_string())
    }

    pub(super) fn set_target_process(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        ctx.inspector.set_process(args.u32(0)?)?;
        Ok(wire::NONE.to_string())
    }

    pub(super) fn set_target_thread(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        ctx.inspector.set_thread(args.u64(0)?)?;
        Ok(wire::NONE.to_string())
    }

    pub(super) fn lookup_symbol_name(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        let resolved = layout::lookup_symbol_name(ctx.inspector, args.u64(0)?)?;
        Ok(resolved.to_string())
    }

    pub(super) fn execute_command(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        ctx.inspector.execute_command(args.str(0)?)?;
        Ok(wire::NONE.to_string())
    }

    pub(super) fn server_started(
        ctx: &CommandContext<'_>,
        args: &Args<'_>,
    ) -> anyhow::Result<String> {
        ctx.owner.server_started(args.str(0)?);
        Ok(wire::NONE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::NullOwner;
    use crate::request::parse_request;
    use mitsuba_inspect::{MockInspector, RawType};

    fn dispatch(mock: &MockInspector, line: &str) -> anyhow::Result<String> {
        let registry = CommandRegistry::standard();
        let context = CommandContext {
            inspector: mock,
            owner: &NullOwner,
        };
        registry.dispatch(&context, &parse_request(line).unwrap())
    }

    #[test]
    fn test_dispatch_rejects_unknown_command() {
        let mock = MockInspector::new();
        let err = dispatch(&mock, "DebuggerQuery(1,'FormatHardDrive()')").unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }

    #[test]
    fn test_dispatch_rejects_wrong_arity_and_types() {
        let mock = MockInspector::new();

        let err = dispatch(&mock, r#"DebuggerQuery(1,'IsTypeEnum("app")')"#).unwrap_err();
        assert!(err.to_string().contains("expected 2 arguments"));

        let err = dispatch(&mock, "DebuggerQuery(2,'IsTypeEnum(1, 2)')").unwrap_err();
        assert!(err.to_string().contains("wrong type"));
    }

    #[test]
    fn test_dispatch_is_type_enum() {
        let mock = MockInspector::new();
        let color = RawType::enumeration("Color", 4, vec![("Red", 0), ("Blue", 1)]);
        mock.add_type("app", "Color", color);

        assert_eq!(
            dispatch(&mock, r#"DebuggerQuery(5,'IsTypeEnum("app","Color")')"#).unwrap(),
            "True"
        );
        assert_eq!(
            dispatch(&mock, r#"DebuggerQuery(6,'IsTypeEnum("app","Missing")')"#).unwrap(),
            "False"
        );
    }

    #[test]
    fn test_dispatch_read_write_memory() {
        let mock = MockInspector::new();
        mock.add_memory(0x1000, &[0xaa, 0xbb, 0xcc]);

        assert_eq!(
            dispatch(&mock, "DebuggerQuery(7,'ReadMemoryBytes(0x1000, 3)')").unwrap(),
            "aabbcc"
        );
        assert_eq!(
            dispatch(&mock, r#"DebuggerQuery(8,'WriteMemoryBytes(0x1001, "ff")')"#).unwrap(),
            "None"
        );
        assert_eq!(
            dispatch(&mock, "DebuggerQuery(9,'ReadMemoryBytes(0x1000, 3)')").unwrap(),
            "aaffcc"
        );
    }

    #[test]
    fn test_dispatch_target_process_and_thread() {
        let mock = MockInspector::new();
        mock.set_processes(vec![100, 200]);
        mock.set_threads(vec![1001, 1002]);
        mock.set_current(Some(100), Some(1001));

        assert_eq!(
            dispatch(&mock, "DebuggerQuery(1,'GetAttachedProcesses()')").unwrap(),
            "[100, 200]"
        );
        assert_eq!(
            dispatch(&mock, "DebuggerQuery(2,'GetTargetProcess()')").unwrap(),
            "100"
        );
        assert_eq!(
            dispatch(&mock, "DebuggerQuery(3,'SetTargetThread(1002)')").unwrap(),
            "None"
        );
        assert_eq!(
            dispatch(&mock, "DebuggerQuery(4,'GetTargetThread()')").unwrap(),
            "1002"
        );
    }

    #[test]
    fn test_dispatch_server_started_reaches_owner() {
        use std::sync::Mutex;

        struct RecordingOwner {
            url: Mutex<Option<String>>,
        }
        impl crate::bridge::BridgeOwner for RecordingOwner {
            fn server_started(&self, url: &str) {
                *self.url.lock().unwrap() = Some(url.to_string());
            }
        }

        let mock = MockInspector::new();
        let owner = RecordingOwner {
            url: Mutex::new(None),
        };
        let registry = CommandRegistry::standard();
        let context = CommandContext {
            inspector: &mock,
            owner: &owner,
        };
        let request =
            parse_request(r#"DebuggerQuery(1,'ServerStarted("http://localhost:50000/")')"#)
                .unwrap();
        assert_eq!(registry.dispatch(&context, &request).unwrap(), "None");
        assert_eq!(
            owner.url.lock().unwrap().as_deref(),
            Some("http://localhost:50000/")
        );
    }
}
