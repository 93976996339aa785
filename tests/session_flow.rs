use pretty_assertions::assert_eq;
use retro_shelf::catalog::{CatalogEntry, CatalogSnapshot, System};
use retro_shelf::config::Config;
use retro_shelf::error::{CoreError, CoreResult};
use retro_shelf::manager::{CatalogManager, RegionPriority};
use retro_shelf::selection::{LeafKey, TreeId};
use retro_shelf::session::{AppEvent, Session};
use retro_shelf::task::{TaskKind, TaskStatus};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

/// 内存目录，安装时在安装根目录下创建空文件
struct FakeManager {
    roms_dir: PathBuf,
    cached: Option<CatalogSnapshot>,
    remote: Mutex<CoreResult<CatalogSnapshot>>,
    fail_install: bool,
}

impl FakeManager {
    fn new(roms_dir: PathBuf, cached: Option<CatalogSnapshot>) -> Self {
        Self {
            roms_dir,
            cached,
            remote: Mutex::new(Ok(snapshot())),
            fail_install: false,
        }
    }
}

impl CatalogManager for FakeManager {
    fn load(&self) -> CoreResult<Option<CatalogSnapshot>> {
        Ok(self.cached.clone())
    }

    fn fetch(&self) -> CoreResult<CatalogSnapshot> {
        let remote = self.remote.lock().unwrap();
        match &*remote {
            Ok(snapshot) => Ok(snapshot.clone()),
            Err(e) => Err(CoreError::FetchFailed(e.to_string())),
        }
    }

    fn install(&self, entries: &[CatalogEntry]) -> CoreResult<usize> {
        // 只安装第一个，再报告失败
        for entry in entries.iter().take(if self.fail_install { 1 } else { entries.len() }) {
            let dir = self.roms_dir.join(&entry.system);
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(&entry.name), b"rom")?;
        }
        if self.fail_install {
            return Err(CoreError::InstallFailed("网络中断".to_string()));
        }
        Ok(entries.len())
    }

    fn compress(&self) -> CoreResult<()> {
        Ok(())
    }

    fn clean(&self, _priority: &RegionPriority) -> CoreResult<()> {
        Err(CoreError::CleanFailed("退出码 1".to_string()))
    }
}

fn snapshot() -> CatalogSnapshot {
    CatalogSnapshot::new(
        vec![
            System::new("SNES", "Super Nintendo"),
            System::new("GBA", "Game Boy Advance"),
        ],
        vec![
            CatalogEntry::new("SNES", "Mario World.zip", 500_000),
            CatalogEntry::new("SNES", "Mario Kart.zip", 600_000),
            CatalogEntry::new("GBA", "Zelda.zip", 400_000),
        ],
    )
    .unwrap()
}

fn setup(manager: impl FnOnce(PathBuf) -> FakeManager) -> (TempDir, Session, mpsc::Receiver<AppEvent>) {
    let dir = tempdir().unwrap();
    let config = Config {
        roms_dir: dir.path().join("roms"),
        data_dir: dir.path().join("data"),
        ..Config::default()
    };
    let (tx, rx) = mpsc::channel(32);
    let manager: Arc<dyn CatalogManager> = Arc::new(manager(config.roms_dir.clone()));
    let session = Session::new(config, Box::new(move |_: &Config| manager.clone()), tx)
        .with_config_path(dir.path().join("config.toml"));
    (dir, session, rx)
}

async fn finish(session: &mut Session, rx: &mut mpsc::Receiver<AppEvent>) -> TaskStatus {
    match rx.recv().await {
        Some(AppEvent::TaskFinished(outcome)) => session.apply_outcome(outcome).unwrap().status,
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn search_before_any_catalog_is_unavailable() {
    let (_dir, mut session, _rx) = setup(|roms| FakeManager::new(roms, None));
    assert!(matches!(session.initial_load(), Err(CoreError::CatalogUnavailable)));
    assert!(matches!(session.search("mario"), Err(CoreError::CatalogUnavailable)));
    assert!(matches!(session.search("  "), Err(CoreError::InvalidQuery)));
}

#[tokio::test]
async fn refresh_search_select_install() {
    let (_dir, mut session, mut rx) = setup(|roms| FakeManager::new(roms, None));

    assert!(session.start_refresh());
    assert_eq!(finish(&mut session, &mut rx).await, TaskStatus::Succeeded);
    assert_eq!(session.tasks().status(TaskKind::Refresh), TaskStatus::Idle);

    let view = session.search("mario snes").unwrap();
    assert_eq!(view.results.total, 2);
    assert_eq!(view.results.total_size, 1_100_000);
    assert!(view.groups[0].installed.iter().all(|i| !i));

    // 取消一个后安装
    session.select_all(TreeId::Search);
    let first = session.leaf_at(TreeId::Search, 1).unwrap();
    assert_eq!(session.toggle(TreeId::Search, &first), Some(false));
    let selected = session.selected_entries();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name, "Mario Kart.zip");

    assert!(session.install_selected().unwrap());
    assert_eq!(finish(&mut session, &mut rx).await, TaskStatus::Succeeded);

    let view = session.search_view().unwrap();
    assert_eq!(view.groups[0].installed, vec![false, true]);
    // 安装不改变当前勾选
    assert_eq!(session.selection().selected_count(TreeId::Search), 1);

    assert_eq!(session.installed().len(), 1);
    assert_eq!(session.installed()[0].files[0].name, "Mario Kart.zip");
}

#[tokio::test]
async fn install_without_selection_is_rejected() {
    let (_dir, mut session, _rx) = setup(|roms| FakeManager::new(roms, Some(snapshot())));
    session.initial_load().unwrap();
    session.search("zelda").unwrap();
    assert!(matches!(session.install_selected(), Err(CoreError::NothingSelected)));
}

#[tokio::test]
async fn duplicate_start_is_ignored_while_running() {
    let (_dir, mut session, mut rx) = setup(|roms| FakeManager::new(roms, Some(snapshot())));
    session.initial_load().unwrap();

    assert!(session.start_refresh());
    assert!(!session.start_refresh());
    assert_eq!(finish(&mut session, &mut rx).await, TaskStatus::Succeeded);
    assert!(session.start_refresh());
}

#[tokio::test]
async fn partial_install_failure_still_updates_flags() {
    let (_dir, mut session, mut rx) = setup(|roms| FakeManager {
        fail_install: true,
        ..FakeManager::new(roms, Some(snapshot()))
    });
    session.initial_load().unwrap();
    session.search("snes").unwrap();
    session.select_all(TreeId::Search);

    assert!(session.install_selected().unwrap());
    assert_eq!(finish(&mut session, &mut rx).await, TaskStatus::Failed);
    assert!(session.tasks().record(TaskKind::Install).message.contains("网络中断"));

    let installed = &session.search_view().unwrap().groups[0].installed;
    assert_eq!(installed.iter().filter(|i| **i).count(), 1);
}

#[tokio::test]
async fn refresh_reruns_search_and_drops_selection() {
    let (_dir, mut session, mut rx) = setup(|roms| FakeManager::new(roms, Some(snapshot())));
    session.initial_load().unwrap();
    session.search("mario").unwrap();
    session.select_all(TreeId::Search);
    assert_eq!(session.selection().selected_count(TreeId::Search), 2);

    assert!(session.start_refresh());
    finish(&mut session, &mut rx).await;

    assert_eq!(session.search_view().unwrap().query, "mario");
    assert_eq!(session.selection().selected_count(TreeId::Search), 0);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_catalog() {
    let (_dir, mut session, mut rx) = setup(|roms| {
        let manager = FakeManager::new(roms, Some(snapshot()));
        *manager.remote.lock().unwrap() = Err(CoreError::FetchFailed("connection refused".to_string()));
        manager
    });
    session.initial_load().unwrap();

    assert!(session.start_refresh());
    assert_eq!(finish(&mut session, &mut rx).await, TaskStatus::Failed);
    assert_eq!(session.catalog().unwrap().entries().len(), 3);
    assert!(session
        .tasks()
        .record(TaskKind::Refresh)
        .message
        .contains("connection refused"));
}

#[tokio::test]
async fn clean_failure_is_reported() {
    let (_dir, mut session, mut rx) = setup(|roms| FakeManager::new(roms, Some(snapshot())));
    session.initial_load().unwrap();
    assert!(session.start_clean());
    assert_eq!(finish(&mut session, &mut rx).await, TaskStatus::Failed);
}

#[tokio::test]
async fn remove_selected_installed_files() {
    let (dir, mut session, _rx) = setup(|roms| FakeManager::new(roms, Some(snapshot())));
    let snes = dir.path().join("roms/SNES");
    fs::create_dir_all(&snes).unwrap();
    fs::write(snes.join("Mario World.zip"), b"rom").unwrap();
    fs::write(snes.join("Mario Kart.zip"), b"rom").unwrap();

    session.initial_load().unwrap();
    session.search("mario").unwrap();
    assert_eq!(session.search_view().unwrap().groups[0].installed, vec![true, true]);

    assert!(matches!(session.remove_selected(), Err(CoreError::NothingSelected)));

    // 已安装列表按文件名排序
    let key = LeafKey::new("SNES", 0);
    assert_eq!(session.installed()[0].files[0].name, "Mario Kart.zip");
    assert_eq!(session.toggle(TreeId::Installed, &key), Some(true));
    assert_eq!(session.remove_selected().unwrap(), 1);

    assert!(!snes.join("Mario Kart.zip").exists());
    assert_eq!(session.search_view().unwrap().groups[0].installed, vec![true, false]);
    assert_eq!(session.installed()[0].files.len(), 1);
}

#[tokio::test]
async fn settings_change_moves_install_root_and_is_saved() {
    let (dir, mut session, mut rx) = setup(|roms| FakeManager::new(roms, Some(snapshot())));
    let other = dir.path().join("other");
    fs::create_dir_all(other.join("GBA")).unwrap();
    fs::write(other.join("GBA/Zelda.gba"), b"rom").unwrap();

    session.initial_load().unwrap();
    session.search("zelda").unwrap();
    assert_eq!(session.search_view().unwrap().groups[0].installed, vec![false]);

    session
        .set_option("roms_dir", other.to_str().unwrap())
        .unwrap();
    assert_eq!(session.config().roms_dir, other);
    assert_eq!(session.search_view().unwrap().groups[0].installed, vec![true]);
    assert_eq!(session.installed()[0].system, "GBA");

    let saved = Config::load_from(&dir.path().join("config.toml")).unwrap();
    assert_eq!(saved.roms_dir, other);

    // 无效值不生效
    assert!(session.set_option("install_workers", "0").is_err());
    assert_eq!(session.config().install_workers, Config::default().install_workers);

    // 后台任务运行时不能修改
    assert!(session.start_refresh());
    assert!(session.set_option("install_workers", "2").is_err());
    finish(&mut session, &mut rx).await;
    session.set_option("install_workers", "2").unwrap();
    assert_eq!(session.config().install_workers, 2);
}
