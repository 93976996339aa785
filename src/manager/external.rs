//! 外部工具调用（压缩 / 去重）

use super::RegionPriority;
use crate::config::ToolsConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ExternalTools {
    tools: ToolsConfig,
    work_dir: PathBuf,
}

impl ExternalTools {
    pub fn new(tools: ToolsConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            work_dir: work_dir.into(),
        }
    }

    pub fn compress(&self) -> Result<String, String> {
        run(&self.tools.compress, &[], &self.work_dir)
    }

    pub fn clean(&self, priority: &RegionPriority) -> Result<String, String> {
        run(&self.tools.clean, &[priority.to_string()], &self.work_dir)
    }
}

/// 执行命令，合并 stdout/stderr；退出码非 0 时返回输出内容作为错误
fn run(argv: &[String], extra: &[String], dir: &Path) -> Result<String, String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "未配置外部命令".to_string())?;
    let args: Vec<&String> = args.iter().chain(extra.iter()).collect();

    log::info!("执行外部命令: {} {:?}", program, args);
    let output = duct::cmd(program, args)
        .dir(dir)
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked()
        .run()
        .map_err(|e| format!("无法执行 {}: {}", program, e))?;

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() {
        Ok(text)
    } else {
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Err(format!("{} 退出码 {}: {}", program, code, text))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tools(compress: &[&str], clean: &[&str]) -> ToolsConfig {
        ToolsConfig {
            compress: compress.iter().map(|s| s.to_string()).collect(),
            clean: clean.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn clean_receives_priority_argument() {
        let dir = tempdir().unwrap();
        let ext = ExternalTools::new(tools(&["true"], &["echo", "--priority"]), dir.path());
        let out = ext.clean(&RegionPriority::default()).unwrap();
        assert_eq!(out, "--priority W,E,U,J");
    }

    #[test]
    fn runs_in_install_root() {
        let dir = tempdir().unwrap();
        let ext = ExternalTools::new(tools(&["pwd"], &["true"]), dir.path());
        let out = ext.compress().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(PathBuf::from(out).canonicalize().unwrap(), expected);
    }

    #[test]
    fn nonzero_exit_carries_output() {
        let dir = tempdir().unwrap();
        let ext = ExternalTools::new(tools(&["sh", "-c", "echo chdman missing; exit 3"], &["true"]), dir.path());
        let err = ext.compress().unwrap_err();
        assert!(err.contains("退出码 3"), "{err}");
        assert!(err.contains("chdman missing"), "{err}");
    }

    #[test]
    fn empty_command_is_an_error() {
        let dir = tempdir().unwrap();
        let ext = ExternalTools::new(tools(&[], &["true"]), dir.path());
        assert!(ext.compress().is_err());
    }
}
