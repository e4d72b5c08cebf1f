//! テスト・ハーネス用のインメモリInspector実装
//!
//! 型・シンボル・メモリ領域・モジュールマップ・コールスタックを
//! テーブルとして登録し、ライブなデバッガの代わりに返します。
//! プロセス・スレッドIDはスクリプトから書き換えられるため、
//! 実行状態遷移イベントの検証にも使えます。

use std::collections::HashMap;
use std::sync::Mutex;

use crate::descriptors::StackFrame;
use crate::error::InspectError;
use crate::inspector::{Inspector, RawFrameSymbol, RawSymbol, ResolvedSymbol};
use crate::raw::RawType;

/// モックが保持するロード済みモジュール
struct MockModule {
    path: String,
    canonical: String,
    base: u64,
    range: (u64, u64),
}

/// モックが保持するメモリ領域
struct MemoryRegion {
    base: u64,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    types: HashMap<(String, String), RawType>,
    globals: HashMap<(String, String), RawSymbol>,
    symbols: Vec<(u64, String)>,
    evals: HashMap<String, u64>,
    memory: Vec<MemoryRegion>,
    modules: Vec<MockModule>,
    executable: String,
    frames: Vec<StackFrame>,
    locals: Vec<(u64, u64, Vec<RawFrameSymbol>)>,
    processes: Vec<u32>,
    threads: Vec<u64>,
    current_pid: Option<u32>,
    current_tid: Option<u64>,
    pointer_size: u64,
    executed: Vec<String>,
}

/// インメモリのInspector実装
pub struct MockInspector {
    state: Mutex<MockState>,
}

impl MockInspector {
    /// 空のモックを作る
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.pointer_size = 8;
        state.executable = "/proc/self/exe".to_string();
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// 型を登録する
    pub fn add_type(&self, module: &str, name: &str, ty: RawType) -> &Self {
        self.lock()
            .types
            .insert((module.to_string(), name.to_string()), ty);
        self
    }

    /// グローバルシンボルを登録する
    pub fn add_global(&self, module: &str, name: &str, ty: RawType, address: u64) -> &Self {
        self.lock()
            .globals
            .insert((module.to_string(), name.to_string()), RawSymbol { ty, address });
        self
    }

    /// 逆引き用のシンボルアドレスを登録する
    pub fn add_symbol(&self, address: u64, name: &str) -> &Self {
        let mut state = self.lock();
        state.symbols.push((address, name.to_string()));
        state.symbols.sort_by_key(|(addr, _)| *addr);
        self
    }

    /// 式評価の結果を登録する
    pub fn add_eval(&self, expr: &str, value: u64) -> &Self {
        self.lock().evals.insert(expr.to_string(), value);
        self
    }

    /// メモリ領域を登録する
    pub fn add_memory(&self, base: u64, bytes: &[u8]) -> &Self {
        self.lock().memory.push(MemoryRegion {
            base,
            bytes: bytes.to_vec(),
        });
        self
    }

    /// ロード済みモジュールを登録する
    pub fn add_module(&self, path: &str, canonical: &str, base: u64, lo: u64, hi: u64) -> &Self {
        self.lock().modules.push(MockModule {
            path: path.to_string(),
            canonical: canonical.to_string(),
            base,
            range: (lo, hi),
        });
        self
    }

    /// メイン実行ファイルのパスを設定する
    pub fn set_executable(&self, path: &str) -> &Self {
        self.lock().executable = path.to_string();
        self
    }

    /// コールスタックを設定する
    pub fn set_frames(&self, frames: Vec<StackFrame>) -> &Self {
        self.lock().frames = frames;
        self
    }

    /// フレームのローカルシンボルを登録する
    pub fn add_frame_locals(
        &self,
        instruction: u64,
        stack: u64,
        symbols: Vec<RawFrameSymbol>,
    ) -> &Self {
        self.lock().locals.push((instruction, stack, symbols));
        self
    }

    /// アタッチ中のプロセス一覧を設定する
    pub fn set_processes(&self, pids: Vec<u32>) -> &Self {
        self.lock().processes = pids;
        self
    }

    /// スレッド一覧を設定する
    pub fn set_threads(&self, tids: Vec<u64>) -> &Self {
        self.lock().threads = tids;
        self
    }

    /// 現在のプロセス・スレッドIDを書き換える（遷移イベントの検証用）
    pub fn set_current(&self, pid: Option<u32>, tid: Option<u64>) -> &Self {
        let mut state = self.lock();
        state.current_pid = pid;
        state.current_tid = tid;
        self
    }

    /// execute_commandで渡されたコマンドの履歴
    pub fn executed_commands(&self) -> Vec<String> {
        self.lock().executed.clone()
    }
}

impl Default for MockInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector for MockInspector {
    fn find_type(&self, module: &str, name: &str) -> Option<RawType> {
        self.lock()
            .types
            .get(&(module.to_string(), name.to_string()))
            .cloned()
    }

    fn pointer_size(&self) -> u64 {
        self.lock().pointer_size
    }

    fn evaluate_integer(&self, expr: &str) -> Result<u64, InspectError> {
        self.lock()
            .evals
            .get(expr)
            .copied()
            .ok_or_else(|| InspectError::Evaluation(format!("No symbol \"{}\" in current context", expr)))
    }

    fn global_symbol(&self, module: &str, name: &str) -> Option<RawSymbol> {
        self.lock()
            .globals
            .get(&(module.to_string(), name.to_string()))
            .cloned()
    }

    fn symbol_at(&self, address: u64) -> Option<ResolvedSymbol> {
        let state = self.lock();
        // 最も近い手前のシンボルを二分探索で見つける
        match state.symbols.binary_search_by_key(&address, |(addr, _)| *addr) {
            Ok(idx) => Some(ResolvedSymbol {
                symbol: state.symbols[idx].1.clone(),
                displacement: 0,
            }),
            Err(0) => None,
            Err(idx) => {
                let (addr, name) = &state.symbols[idx - 1];
                Some(ResolvedSymbol {
                    symbol: name.clone(),
                    displacement: address - addr,
                })
            }
        }
    }

    fn module_containing(&self, address: u64) -> Option<String> {
        let state = self.lock();
        state
            .modules
            .iter()
            .find(|m| address >= m.range.0 && address < m.range.1)
            .map(|m| m.path.clone())
    }

    fn executable_path(&self) -> String {
        self.lock().executable.clone()
    }

    fn module_base(&self, canonical_name: &str) -> Option<u64> {
        let state = self.lock();
        state
            .modules
            .iter()
            .find(|m| m.canonical == canonical_name)
            .map(|m| m.base)
    }

    fn read_memory(&self, address: u64, size: usize) -> Result<Vec<u8>, InspectError> {
        let state = self.lock();
        for region in &state.memory {
            let end = region.base + region.bytes.len() as u64;
            if address >= region.base && address + size as u64 <= end {
                let start = (address - region.base) as usize;
                return Ok(region.bytes[start..start + size].to_vec());
            }
        }
        Err(InspectError::MemoryRead { address, size })
    }

    fn write_memory(&self, address: u64, bytes: &[u8]) -> Result<(), InspectError> {
        let mut state = self.lock();
        for region in &mut state.memory {
            let end = region.base + region.bytes.len() as u64;
            if address >= region.base && address + bytes.len() as u64 <= end {
                let start = (address - region.base) as usize;
                region.bytes[start..start + bytes.len()].copy_from_slice(bytes);
                return Ok(());
            }
        }
        Err(InspectError::MemoryWrite {
            address,
            size: bytes.len(),
        })
    }

    fn call_stack(&self, limit: usize) -> Vec<StackFrame> {
        let state = self.lock();
        state.frames.iter().take(limit).copied().collect()
    }

    fn frame_locals(
        &self,
        instruction: u64,
        stack: u64,
        _frame: u64,
    ) -> Option<Vec<RawFrameSymbol>> {
        let state = self.lock();
        state
            .locals
            .iter()
            .find(|(ip, sp, _)| *ip == instruction && *sp == stack)
            .map(|(_, _, symbols)| symbols.clone())
    }

    fn attached_processes(&self) -> Vec<u32> {
        self.lock().processes.clone()
    }

    fn process_threads(&self) -> Vec<u64> {
        self.lock().threads.clone()
    }

    fn current_process(&self) -> Result<u32, InspectError> {
        self.lock()
            .current_pid
            .ok_or_else(|| InspectError::Unavailable("No target process".to_string()))
    }

    fn current_thread(&self) -> Result<u64, InspectError> {
        self.lock()
            .current_tid
            .ok_or_else(|| InspectError::Unavailable("No target thread".to_string()))
    }

    fn set_process(&self, pid: u32) -> Result<(), InspectError> {
        let mut state = self.lock();
        if !state.processes.contains(&pid) {
            return Err(InspectError::NoSuchProcess(pid));
        }
        state.current_pid = Some(pid);
        Ok(())
    }

    fn set_thread(&self, tid: u64) -> Result<(), InspectError> {
        let mut state = self.lock();
        if !state.threads.contains(&tid) {
            return Err(InspectError::NoSuchThread(tid));
        }
        state.current_tid = Some(tid);
        Ok(())
    }

    fn execute_command(&self, command: &str) -> Result<(), InspectError> {
        self.lock().executed.push(command.to_string());
        Ok(())
    }
}
