//! 核心错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// 搜索内容为空
    #[error("请输入搜索关键词")]
    InvalidQuery,

    /// 尚未加载目录快照
    #[error("没有可用的游戏目录，请先执行 update 更新数据库")]
    CatalogUnavailable,

    #[error("条目 {entry} 引用了未知平台 {system}")]
    UnknownSystem { system: String, entry: String },

    /// 平台标识或文件名不是单个路径组成部分
    #[error("{0:?} 不能用作文件名")]
    UnsafeName(String),

    #[error("更新目录失败: {0}")]
    FetchFailed(String),

    #[error("安装失败: {0}")]
    InstallFailed(String),

    #[error("压缩失败: {0}")]
    CompressFailed(String),

    #[error("清理重复文件失败: {0}")]
    CleanFailed(String),

    #[error("无效的地区优先级 {0:?}")]
    InvalidRegionPriority(String),

    #[error("没有选中任何游戏")]
    NothingSelected,

    /// 后台任务异常退出（panic）
    #[error("后台任务异常终止: {0}")]
    TaskAborted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
