//! Mitsuba CLI - ブリッジ動作確認用のREPL
//!
//! ネイティブデバッガなしでブリッジ一式を動かすためのハーネスです。
//! 組み込みのサンプルターゲット（インメモリInspector）を相手に
//! ワーカーを起動し、デバッガのライフサイクルフックを手で
//! 発火させられます。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use mitsuba_bridge::{Bridge, BridgeOwner, LaunchConfig};
use mitsuba_inspect::{Inspector, MockInspector, RawField, RawType, StackFrame};

/// Mitsuba - debugger visualization bridge
#[derive(Parser)]
#[command(name = "mitsuba")]
#[command(version = "0.1.0")]
#[command(about = "Type layout resolver and worker bridge harness", long_about = None)]
struct Cli {
    /// Path to the worker executable (candidate search when omitted)
    #[arg(long)]
    worker: Option<PathBuf>,

    /// Path to the extensions directory (candidate search when omitted)
    #[arg(long)]
    extensions: Option<PathBuf>,
}

/// サーバーURLの報告とセッション終了を端末へ流すオーナー
struct ConsoleOwner;

impl BridgeOwner for ConsoleOwner {
    fn server_started(&self, url: &str) {
        println!();
        println!("Visualization server started: {}", url);
    }

    fn session_exited(&self) {
        println!();
        println!("Worker session exited");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("Mitsuba - debugger visualization bridge");
    println!("Version 0.1.0");
    println!();

    let cli = Cli::parse();
    let config = build_config(&cli);

    let target = Arc::new(sample_target());
    let bridge = Bridge::activate(target.clone(), Arc::new(ConsoleOwner), &config)?;
    println!("Worker launched against the built-in sample target");

    run_repl(&bridge, &target)?;
    Ok(())
}

/// コマンドライン引数から起動設定を組み立てる
fn build_config(cli: &Cli) -> LaunchConfig {
    match (&cli.worker, &cli.extensions) {
        (Some(worker), Some(extensions)) => {
            LaunchConfig::explicit(worker.clone(), extensions.clone())
        }
        _ => {
            let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let mut config = LaunchConfig::search_from(&root);
            if let Some(worker) = &cli.worker {
                config.worker_candidates = vec![worker.clone()];
            }
            if let Some(extensions) = &cli.extensions {
                config.extensions_candidates = vec![extensions.clone()];
            }
            config
        }
    }
}

/// 組み込みのサンプルターゲットを作る
///
/// 継承・無名共用体・ビットフィールドを含む小さな型グラフと、
/// 2フレームのコールスタックを持ちます。
fn sample_target() -> MockInspector {
    let mock = MockInspector::new();

    let node = RawType::structure(
        "Node",
        24,
        vec![
            RawField::data("parent_", 0, RawType::pointer(RawType::base("Node", 24))),
            RawField::data("flags_", 8, RawType::base("unsigned int", 4)),
            RawField::bitfield("dirty_", 96, 1, RawType::base("unsigned int", 4)),
            RawField::bitfield("depth_", 97, 7, RawType::base("unsigned int", 4)),
            RawField::anonymous(
                16,
                RawType::anonymous(
                    mitsuba_inspect::TypeKind::Union,
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
    mock.add_type("sample", "Node", node);
    mock.add_type("sample", "Element", element);
    mock.add_type(
        "sample",
        "NodeKind",
        RawType::enumeration("NodeKind", 4, vec![("Text", 0), ("Element", 1), ("Comment", 2)]),
    );

    mock.set_executable("/opt/sample/sample");
    mock.add_symbol(0x400000, "main");
    mock.add_symbol(0x400200, "render");
    mock.add_global(
        "sample",
        "g_root",
        RawType::pointer(RawType::base("Node", 24)),
        0x602000,
    );
    mock.add_memory(0x602000, &[0x10, 0x20, 0x40, 0x60, 0, 0, 0, 0]);
    mock.set_frames(vec![
        StackFrame {
            instruction_address: 0x400210,
            stack_address: 0x7ffd_1000,
            frame_address: 0x7ffd_1040,
        },
        StackFrame {
            instruction_address: 0x400030,
            stack_address: 0x7ffd_1050,
            frame_address: 0x7ffd_1090,
        },
    ]);
    mock.set_processes(vec![4821]);
    mock.set_threads(vec![4821, 4829]);
    mock.set_current(Some(4821), Some(4821));

    mock
}

/// REPLループを実行する
fn run_repl(bridge: &Bridge, target: &MockInspector) -> Result<()> {
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(mitsuba) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                if !handle_command(bridge, target, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

/// 1コマンドを処理する（継続するならtrue）
fn handle_command(bridge: &Bridge, target: &MockInspector, line: &str) -> bool {
    match line {
        "help" => print_help(),
        "quit" | "exit" | "q" => {
            println!("Goodbye!");
            return false;
        }
        "stop" => bridge.notify_stopped(),
        "cont" | "c" => bridge.notify_continued(),
        "dead" => bridge.notify_exited(),
        "prompt" => bridge.notify_prompt(),
        "status" => println!("Bridge state: {:?}", bridge.state()),
        _ => handle_target_command(bridge, target, line),
    }
    true
}

/// サンプルターゲットの選択状態を書き換えるコマンドを処理する
///
/// 書き換えた後にプロンプトフックを発火させるので、ワーカー側には
/// 対応する遷移イベントが届きます。
fn handle_target_command(bridge: &Bridge, target: &MockInspector, line: &str) {
    if let Some(pid) = line.strip_prefix("proc ") {
        match pid.trim().parse::<u32>() {
            Ok(pid) => {
                target.set_current(Some(pid), target.current_thread().ok());
                println!("Target process is now {}", pid);
                bridge.notify_prompt();
            }
            Err(_) => println!("Usage: proc <pid>"),
        }
    } else if let Some(tid) = line.strip_prefix("thread ") {
        match tid.trim().parse::<u64>() {
            Ok(tid) => {
                target.set_current(target.current_process().ok(), Some(tid));
                println!("Target thread is now {}", tid);
                bridge.notify_prompt();
            }
            Err(_) => println!("Usage: thread <tid>"),
        }
    } else {
        println!("Unknown command: {}", line);
        println!("Type 'help' for available commands.");
    }
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help           - Show this help message");
    println!("  quit/exit/q    - Exit the harness");
    println!();
    println!("Lifecycle hooks:");
    println!("  stop           - Signal that execution stopped");
    println!("  cont (c)       - Signal that execution resumed");
    println!("  dead           - Signal that the target exited");
    println!("  prompt         - Signal a return to the debugger prompt");
    println!();
    println!("Sample target:");
    println!("  proc <pid>     - Switch the target process");
    println!("  thread <tid>   - Switch the target thread");
    println!();
    println!("  status         - Show the bridge state");
}
