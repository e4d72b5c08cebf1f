//! ブリッジ本体
//!
//! ワーカーの標準出力・標準エラーをそれぞれ専用スレッドで読み、
//! 行単位のタスクとして単一のホストキューへ流し込みます。コマンドの
//! 実行と応答・イベントの書き込みはすべて1本の実行スレッドが直列に
//! 行うため、イントロスペクション層とワーカーへの書き込み口は
//! ロックなしで所有できます。

use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, warn};

use mitsuba_inspect::Inspector;

use crate::launch::{self, LaunchConfig};
use crate::registry::{CommandContext, CommandRegistry};
use crate::request::parse_request;
use crate::request::recover_tag;
use crate::session::SessionState;
use crate::Result;

/// ブリッジの外側（組み込み先）が受け取る通知
///
/// どちらのメソッドもホストの実行スレッドから呼ばれます。
pub trait BridgeOwner: Send + Sync {
    /// ワーカーが可視化サーバーのURLを報告してきたとき
    fn server_started(&self, _url: &str) {}

    /// セッションが終了したとき（セッションごとに一度だけ）
    fn session_exited(&self) {}
}

/// 通知を握りつぶすオーナー
pub struct NullOwner;

impl BridgeOwner for NullOwner {}

/// ホスト側のライフサイクルフック
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// 実行が停止した（ブレークポイント到達など）
    Stopped,
    /// 実行が再開した
    Continued,
    /// デバッグ対象が終了した
    Exited,
    /// デバッガがプロンプトへ戻った
    Prompt,
}

impl Hook {
    /// フック自身が持つイベント名（プロンプトは遷移検査のみ）
    fn event_name(self) -> Option<&'static str> {
        match self {
            Hook::Stopped => Some("stop"),
            Hook::Continued => Some("cont"),
            Hook::Exited => Some("exit"),
            Hook::Prompt => None,
        }
    }
}

/// ブリッジの生存状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// 起動処理中
    Starting,
    /// ワーカーと通信中
    Running,
    /// セッション終了後
    Exited,
}

/// ホストキューに積まれる1タスク
enum HostTask {
    /// ワーカーからの1リクエスト行
    Request(String),
    /// ライフサイクルフック
    Notify(Hook),
    /// ワーカー側ストリームの終端
    WorkerEof,
    /// 明示的な停止要求
    Shutdown,
}

/// リクエストとフックを直列に処理する実行器
///
/// ブリッジの実行スレッドが内部で使うものですが、入出力を差し替えて
/// プロセスなしで駆動できるよう公開しています。
pub struct Dispatcher {
    registry: CommandRegistry,
    session: SessionState,
    inspector: Arc<dyn Inspector>,
    owner: Arc<dyn BridgeOwner>,
    sink: Box<dyn Write + Send>,
}

impl Dispatcher {
    pub fn new(
        inspector: Arc<dyn Inspector>,
        owner: Arc<dyn BridgeOwner>,
        sink: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            registry: CommandRegistry::standard(),
            session: SessionState::new(),
            inspector,
            owner,
            sink,
        }
    }

    /// 1リクエスト行を実行し、応答を1行書き込む
    ///
    /// コマンドの失敗は失敗応答になるだけで、このメソッド自体は
    /// 書き込みが壊れたときにだけエラーを返します。
    pub fn handle_line(&mut self, line: &str) -> io::Result<()> {
        debug!("request: {}", line);
        let response = match parse_request(line) {
            Ok(request) => {
                let context = CommandContext {
                    inspector: &*self.inspector,
                    owner: &*self.owner,
                };
                match self.registry.dispatch(&context, &request) {
                    Ok(value) => format!("{}~{}\n", request.tag, value),
                    Err(err) => format!("{}!{}\n", request.tag, single_line(&err.to_string())),
                }
            }
            Err(err) => format!(
                "{}!{}\n",
                recover_tag(line),
                single_line(&err.to_string())
            ),
        };
        self.sink.write_all(response.as_bytes())?;
        self.sink.flush()
    }

    /// ライフサイクルフックを処理する
    ///
    /// まず対象プロセス・スレッドの遷移を検査してイベント化し、
    /// その後フック自身のイベントを無条件に送ります。
    pub fn handle_hook(&mut self, hook: Hook) -> io::Result<()> {
        for payload in self.session.check_transitions(&*self.inspector) {
            self.send_event(&payload)?;
        }
        if let Some(name) = hook.event_name() {
            self.send_event(name)?;
        }
        Ok(())
    }

    /// 相関IDなしのイベント行を送る
    pub fn send_event(&mut self, payload: &str) -> io::Result<()> {
        debug!("event: %{}", payload);
        self.sink.write_all(format!("%{}\n", payload).as_bytes())?;
        self.sink.flush()
    }
}

/// 応答は1行でなければならないため、メッセージ中の改行を潰す
fn single_line(message: &str) -> String {
    message.replace(['\r', '\n'], " ")
}

/// ワーカーサブプロセスとの接続
///
/// dropすると実行スレッドへ停止要求を送り、ワーカーを終了させます。
pub struct Bridge {
    tasks: Sender<HostTask>,
    state: Arc<Mutex<BridgeState>>,
}

impl Bridge {
    /// ワーカーを起動してブリッジを開始する
    pub fn activate(
        inspector: Arc<dyn Inspector>,
        owner: Arc<dyn BridgeOwner>,
        config: &LaunchConfig,
    ) -> Result<Self> {
        let plan = launch::resolve(config)?;
        let mut child = launch::spawn_worker(&plan)?;
        info!("worker launched: {}", plan.worker.display());

        let stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("worker stdin not piped"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow::anyhow!("worker stdout not piped"))?;
        let stderr = child.stderr.take().ok_or_else(|| anyhow::anyhow!("worker stderr not piped"))?;

        let state = Arc::new(Mutex::new(BridgeState::Starting));
        let (tasks, queue) = mpsc::channel::<HostTask>();

        // stdoutリーダー: 行を切り出してキューへ渡すだけで、
        // 自分ではいっさい実行しない
        let producer = tasks.clone();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if producer.send(HostTask::Request(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = producer.send(HostTask::WorkerEof);
        });

        // stderrリーダー: 診断ログへ転送するだけ
        let producer = tasks.clone();
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(line) => info!("worker: {}", line),
                    Err(_) => break,
                }
            }
            let _ = producer.send(HostTask::WorkerEof);
        });

        // 実行スレッド: ワーカーへの書き込み口とセッション状態を
        // 単独で所有し、キューのタスクを到着順に処理する
        let shared_state = state.clone();
        let exit_owner = owner.clone();
        thread::spawn(move || {
            let mut dispatcher = Dispatcher::new(inspector, owner, Box::new(stdin));
            let mut worker_lost = false;
            for task in queue {
                let result = match task {
                    HostTask::Request(line) => dispatcher.handle_line(&line),
                    HostTask::Notify(hook) => dispatcher.handle_hook(hook),
                    HostTask::WorkerEof => {
                        worker_lost = true;
                        break;
                    }
                    HostTask::Shutdown => break,
                };
                if let Err(err) = result {
                    warn!("worker pipe broken: {}", err);
                    worker_lost = true;
                    break;
                }
            }
            set_state(&shared_state, BridgeState::Exited);
            // 書き込み口を閉じてからワーカーを回収する
            drop(dispatcher);
            let _ = child.kill();
            let _ = child.wait();
            if worker_lost {
                exit_owner.session_exited();
            }
        });

        set_state(&state, BridgeState::Running);
        Ok(Self { tasks, state })
    }

    pub fn state(&self) -> BridgeState {
        *self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.state() == BridgeState::Running
    }

    pub fn notify_stopped(&self) {
        self.post(Hook::Stopped);
    }

    pub fn notify_continued(&self) {
        self.post(Hook::Continued);
    }

    pub fn notify_exited(&self) {
        self.post(Hook::Exited);
    }

    pub fn notify_prompt(&self) {
        self.post(Hook::Prompt);
    }

    /// セッション終了後のフックは黙って捨てる
    fn post(&self, hook: Hook) {
        if self.is_running() {
            let _ = self.tasks.send(HostTask::Notify(hook));
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        let _ = self.tasks.send(HostTask::Shutdown);
    }
}

fn set_state(state: &Mutex<BridgeState>, next: BridgeState) {
    *state.lock().unwrap_or_else(|poison| poison.into_inner()) = next;
}
