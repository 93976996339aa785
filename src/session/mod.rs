//! 交互会话
//!
//! 单一事件循环：控制台输入和后台任务结果都经同一个通道进入，状态只在这里修改。

pub mod command;
mod render;
pub mod state;

pub use state::{AppEvent, SearchView, Session, TaskReport};

use crate::config::Config;
use crate::manager::ManagerFactory;
use anyhow::Result;
use command::Command;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

fn prompt() {
    print!("retro> ");
    let _ = std::io::stdout().flush();
}

/// 逐行读取标准输入
fn spawn_input_reader(tx: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(AppEvent::Input(line)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("读取输入失败: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(AppEvent::InputClosed).await;
    });
}

pub async fn run(config: Config, make_manager: ManagerFactory) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(32);
    let mut session = Session::new(config, make_manager, tx.clone());

    match session.initial_load() {
        Ok(()) => println!("{}", render::catalog_summary(session.catalog())),
        Err(e) => println!("{}，请先执行 update", e),
    }
    println!("游戏目录: {}", session.config().roms_dir.display());
    println!("输入 help 查看命令");

    spawn_input_reader(tx);
    prompt();

    let mut quitting = false;
    let mut waiting_notice = false;
    while let Some(event) = rx.recv().await {
        match event {
            AppEvent::Input(line) if !quitting => match command::parse(&line) {
                Ok(Some(Command::Quit)) => quitting = true,
                Ok(Some(cmd)) => println!("{}", command::execute(&mut session, cmd)),
                Ok(None) => {}
                Err(e) => println!("{}", e),
            },
            AppEvent::Input(_) => {}
            AppEvent::InputClosed => quitting = true,
            AppEvent::TaskFinished(outcome) => {
                if let Some(report) = session.apply_outcome(outcome) {
                    println!("\n{}", render::task_report(&report));
                }
            }
        }

        if quitting {
            if !session.tasks().any_running() {
                break;
            }
            if !waiting_notice {
                println!("等待后台任务结束...");
                waiting_notice = true;
            }
        } else {
            prompt();
        }
    }

    log::info!("会话结束");
    Ok(())
}
