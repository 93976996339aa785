//! 后台任务执行
//!
//! 每种任务同一时间最多运行一个。任务在阻塞线程池中执行，结果通过事件通道
//! 送回交互循环，由交互循环调用 [`TaskRunner::complete`] 更新状态。

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Refresh,
    Install,
    Compress,
    Clean,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Refresh,
        TaskKind::Install,
        TaskKind::Compress,
        TaskKind::Clean,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskKind::Refresh => "更新数据库",
            TaskKind::Install => "安装",
            TaskKind::Compress => "压缩",
            TaskKind::Clean => "清理重复",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub message: String,
    pub finished_at: Option<DateTime<Local>>,
    /// 每次启动递增，用于丢弃过期结果
    generation: u64,
}

impl TaskRecord {
    fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            status: TaskStatus::Idle,
            message: String::new(),
            finished_at: None,
            generation: 0,
        }
    }
}

/// 任务成功时返回的不可变结果
#[derive(Debug)]
pub enum TaskOutput {
    Catalog(CatalogSnapshot),
    Installed(usize),
    Done,
}

#[derive(Debug)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    pub generation: u64,
    pub result: CoreResult<TaskOutput>,
}

/// 任务执行器，结果以 `E` 类型事件发送到交互循环
pub struct TaskRunner<E> {
    records: HashMap<TaskKind, TaskRecord>,
    tx: mpsc::Sender<E>,
}

impl<E> TaskRunner<E>
where
    E: From<TaskOutcome> + Send + 'static,
{
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        let records = TaskKind::ALL
            .iter()
            .map(|&kind| (kind, TaskRecord::new(kind)))
            .collect();
        Self { records, tx }
    }

    pub fn record(&self, kind: TaskKind) -> &TaskRecord {
        &self.records[&kind]
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        TaskKind::ALL.iter().map(|kind| &self.records[kind])
    }

    pub fn status(&self, kind: TaskKind) -> TaskStatus {
        self.record(kind).status
    }

    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.status(kind) == TaskStatus::Running
    }

    pub fn any_running(&self) -> bool {
        self.records.values().any(|r| r.status == TaskStatus::Running)
    }

    /// 启动任务；同类任务正在运行时直接忽略并返回 false
    ///
    /// 必须在 tokio 运行时中调用。
    pub fn start<F>(&mut self, kind: TaskKind, work: F) -> bool
    where
        F: FnOnce() -> CoreResult<TaskOutput> + Send + 'static,
    {
        if self.is_running(kind) {
            log::debug!("{} 已在运行，忽略重复请求", kind);
            return false;
        }
        if self.status(kind).is_finished() {
            self.acknowledge(kind);
        }

        let Some(record) = self.records.get_mut(&kind) else {
            return false;
        };
        record.generation += 1;
        record.status = TaskStatus::Running;
        record.message = format!("正在{}...", kind);
        let generation = record.generation;
        log::info!("任务开始: {} (#{})", kind, generation);

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(work).await {
                Ok(result) => result,
                Err(e) => Err(CoreError::TaskAborted(e.to_string())),
            };
            let outcome = TaskOutcome {
                kind,
                generation,
                result,
            };
            if tx.send(E::from(outcome)).await.is_err() {
                log::warn!("{} 结束时事件通道已关闭", kind);
            }
        });
        true
    }

    /// 应用任务结果，每次运行只生效一次；返回新状态
    pub fn complete(&mut self, outcome: &TaskOutcome) -> Option<TaskStatus> {
        let record = self.records.get_mut(&outcome.kind)?;
        if record.status != TaskStatus::Running || record.generation != outcome.generation {
            log::warn!("忽略过期的任务结果: {} (#{})", outcome.kind, outcome.generation);
            return None;
        }

        let (status, message) = match &outcome.result {
            Ok(output) => (TaskStatus::Succeeded, success_message(outcome.kind, output)),
            Err(e) => (TaskStatus::Failed, e.to_string()),
        };
        match status {
            TaskStatus::Failed => log::warn!("任务失败: {}: {}", outcome.kind, message),
            _ => log::info!("任务完成: {}: {}", outcome.kind, message),
        }
        record.status = status;
        record.message = message;
        record.finished_at = Some(Local::now());
        Some(status)
    }

    /// 已结束的任务回到空闲，保留最后的消息
    pub fn acknowledge(&mut self, kind: TaskKind) {
        if let Some(record) = self.records.get_mut(&kind) {
            if record.status.is_finished() {
                record.status = TaskStatus::Idle;
            }
        }
    }
}

fn success_message(kind: TaskKind, output: &TaskOutput) -> String {
    match output {
        TaskOutput::Catalog(snapshot) => format!(
            "数据库已更新：{} 个平台共 {} 个游戏",
            snapshot.systems().len(),
            snapshot.entries().len()
        ),
        TaskOutput::Installed(count) => format!("已安装 {} 个游戏", count),
        TaskOutput::Done => format!("{}完成", kind),
    }
}
