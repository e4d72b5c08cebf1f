//! 対象プロセス・スレッドの遷移検出
//!
//! ワーカーは「いまどのプロセス・スレッドを見ているか」を自前で
//! 追跡できないため、ホスト側で直近に通知した選択を覚えておき、
//! 変化したときだけイベントを発行します。

use mitsuba_inspect::Inspector;

/// セッションをまたいで保持する選択状態
#[derive(Debug, Default)]
pub struct SessionState {
    last_pid: Option<u32>,
    last_tid: Option<u64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記憶している選択を忘れる（次の遷移検査で必ずイベントが出る）
    pub fn reset(&mut self) {
        self.last_pid = None;
        self.last_tid = None;
    }

    /// 現在の選択と比較し、変化ごとのイベントペイロードを返す
    ///
    /// 選択が取得できない状態（デタッチ直後など）への変化では
    /// イベントを出さず、記憶だけを更新します。同じ選択のままなら
    /// 何も返しません。
    pub fn check_transitions(&mut self, inspector: &dyn Inspector) -> Vec<String> {
        let pid = inspector.current_process().ok();
        let tid = inspector.current_thread().ok();

        let mut events = Vec::new();
        if pid != self.last_pid {
            if let Some(pid) = pid {
                events.push(format!("proc {}", pid));
            }
        }
        if tid != self.last_tid {
            if let Some(tid) = tid {
                events.push(format!("thread {}", tid));
            }
        }
        self.last_pid = pid;
        self.last_tid = tid;
        events
    }
}
