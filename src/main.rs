use anyhow::Result;
use retro_shelf::config::Config;
use retro_shelf::manager::{CatalogManager, ManagerFactory, RemoteCatalog};
use retro_shelf::session;
use std::sync::Arc;

fn print_usage() {
    println!("retro-shelf {}", env!("CARGO_PKG_VERSION"));
    println!("复古游戏目录浏览与安装");
    println!();
    println!("配置文件: {}", Config::config_path().display());
    println!("环境变量: RETRO_ROMS_DIR 覆盖游戏目录, RUST_LOG 控制日志级别");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    if std::env::args().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    // 加载配置
    let config = Config::load_or_default()?;

    let make_manager: ManagerFactory =
        Box::new(|config: &Config| -> Arc<dyn CatalogManager> { Arc::new(RemoteCatalog::new(config)) });
    session::run(config, make_manager).await?;

    Ok(())
}
