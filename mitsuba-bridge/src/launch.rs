//! ワーカーサブプロセスの探索と起動
//!
//! ワーカー実行ファイルと拡張ディレクトリをそれぞれ候補パスの列から
//! 探し、最初に実在したものを使います。起動時は標準入出力をすべて
//! パイプにし、拡張ディレクトリのパスを唯一の引数として渡します。

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{anyhow, Context};
use tracing::debug;

use crate::Result;

/// 探索する候補パスの集合
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub worker_candidates: Vec<PathBuf>,
    pub extensions_candidates: Vec<PathBuf>,
}

impl LaunchConfig {
    /// 指定ディレクトリを起点とする既定の探索順を作る
    ///
    /// 同じディレクトリに置かれた配布物を最優先し、開発ツリーの
    /// ビルド出力、システムインストールの順に落ちていきます。
    pub fn search_from(root: &Path) -> Self {
        Self {
            worker_candidates: vec![
                root.join("mitsuba-worker"),
                root.join("../target/debug/mitsuba-worker"),
                root.join("../target/release/mitsuba-worker"),
                PathBuf::from("/usr/lib/mitsuba/mitsuba-worker"),
            ],
            extensions_candidates: vec![
                root.join("extensions"),
                root.join("../extensions"),
                PathBuf::from("/usr/lib/mitsuba/extensions"),
            ],
        }
    }

    /// 候補探索を行わず、与えられたパスだけを使う
    pub fn explicit(worker: PathBuf, extensions: PathBuf) -> Self {
        Self {
            worker_candidates: vec![worker],
            extensions_candidates: vec![extensions],
        }
    }
}

/// 解決済みの起動計画
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub worker: PathBuf,
    pub extensions: PathBuf,
}

/// 候補から実在するパスを選んで起動計画を作る
pub fn resolve(config: &LaunchConfig) -> Result<LaunchPlan> {
    let worker = first_existing(&config.worker_candidates)
        .ok_or_else(|| anyhow!("worker executable not found in any candidate path"))?;
    let extensions = first_existing(&config.extensions_candidates)
        .ok_or_else(|| anyhow!("extensions directory not found in any candidate path"))?;
    debug!("resolved worker: {}", worker.display());
    Ok(LaunchPlan { worker, extensions })
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.exists()).cloned()
}

/// ワーカーを起動する
///
/// stdin/stdout/stderrはすべてパイプになり、呼び出し側が所有します。
pub fn spawn_worker(plan: &LaunchPlan) -> Result<Child> {
    Command::new(&plan.worker)
        .arg(&plan.extensions)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to launch worker: {}", plan.worker.display()))
}
